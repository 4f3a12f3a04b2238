use std::collections::VecDeque;
use std::io;

use encoding_rs::Encoding;
use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::QualName;

use super::node::{Dom, NodeData, NodeId};

/// 可被 html5ever 序列化的竞技场节点
pub struct SerializableNode<'a> {
    pub dom: &'a Dom,
    pub node: NodeId,
}

enum SerializeOp {
    Open(NodeId),
    Close(QualName),
}

impl Serialize for SerializableNode<'_> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let dom = self.dom;
        let mut ops = VecDeque::new();
        match traversal_scope {
            TraversalScope::IncludeNode => ops.push_back(SerializeOp::Open(self.node)),
            TraversalScope::ChildrenOnly(_) => ops.extend(
                dom.children(self.node)
                    .iter()
                    .map(|child| SerializeOp::Open(*child)),
            ),
        }

        while let Some(op) = ops.pop_front() {
            match op {
                SerializeOp::Open(node) => {
                    let children = dom.children(node);
                    match dom.data(node) {
                        NodeData::Element { name, attrs } => {
                            serializer.start_elem(
                                name.clone(),
                                attrs.iter().map(|attr| (&attr.name, &attr.value[..])),
                            )?;

                            ops.reserve(1 + children.len());
                            ops.push_front(SerializeOp::Close(name.clone()));
                            for child in children.iter().rev() {
                                ops.push_front(SerializeOp::Open(*child));
                            }
                        }
                        NodeData::Document => {
                            for child in children.iter().rev() {
                                ops.push_front(SerializeOp::Open(*child));
                            }
                        }
                        NodeData::Doctype { name } => serializer.write_doctype(name)?,
                        NodeData::Text { contents } => serializer.write_text(contents)?,
                        NodeData::Comment { contents } => serializer.write_comment(contents)?,
                        NodeData::ProcessingInstruction { target, contents } => {
                            serializer.write_processing_instruction(target, contents)?
                        }
                    }
                }
                SerializeOp::Close(name) => serializer.end_elem(name)?,
            }
        }

        Ok(())
    }
}

/// 序列化节点的全部子节点
pub fn serialize_children(dom: &Dom, node: NodeId) -> io::Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable = SerializableNode { dom, node };
    serialize(&mut buf, &serializable, SerializeOpts::default())?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// 序列化节点自身（含起止标签）
pub fn serialize_node(dom: &Dom, node: NodeId) -> io::Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable = SerializableNode { dom, node };
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    serialize(&mut buf, &serializable, opts)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// 序列化文档
pub fn serialize_document(dom: &Dom, document_encoding: &str) -> io::Result<Vec<u8>> {
    let html = serialize_children(dom, dom.document())?;

    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            let (data, _, _) = encoding.encode(&html);
            return Ok(data.to_vec());
        }
    }

    Ok(html.into_bytes())
}
