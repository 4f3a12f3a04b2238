use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use super::node::{Dom, NodeData, NodeId};

/// 将 HTML 字节转换为 DOM
///
/// 先由 html5ever 解析为 `RcDom`，再降级为以句柄寻址的竞技场。
/// 无法识别的编码按 UTF-8（有损）处理。
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> std::io::Result<Dom> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.to_string()
        }
        None => String::from_utf8_lossy(data).to_string(),
    };

    parse_html(&s)
}

/// 解析 UTF-8 HTML 字符串
pub fn parse_html(html: &str) -> std::io::Result<Dom> {
    let rcdom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;

    let mut dom = Dom::new();
    lower_tree(&mut dom, &rcdom.document);
    Ok(dom)
}

fn lower_data(data: &RcNodeData) -> Option<NodeData> {
    let data = match data {
        RcNodeData::Document => return None,
        RcNodeData::Doctype { name, .. } => NodeData::Doctype {
            name: name.to_string(),
        },
        RcNodeData::Text { contents } => NodeData::Text {
            contents: contents.borrow().to_string(),
        },
        RcNodeData::Comment { contents } => NodeData::Comment {
            contents: contents.to_string(),
        },
        RcNodeData::Element { name, attrs, .. } => NodeData::Element {
            name: name.clone(),
            attrs: attrs.borrow().clone(),
        },
        RcNodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.to_string(),
                contents: contents.to_string(),
            }
        }
    };
    Some(data)
}

/// 把 `RcDom` 复制到竞技场中（显式栈，深层嵌套不会耗尽调用栈）
fn lower_tree(dom: &mut Dom, document: &Handle) {
    let root = dom.document();
    let mut stack: Vec<(NodeId, Handle)> = document
        .children
        .borrow()
        .iter()
        .rev()
        .map(|child| (root, child.clone()))
        .collect();

    while let Some((parent, handle)) = stack.pop() {
        let Some(data) = lower_data(&handle.data) else {
            continue;
        };
        let id = dom.create_raw(data);
        dom.append(parent, id);

        for child in handle.children.borrow().iter().rev() {
            stack.push((id, child.clone()));
        }

        // <template> 的内容保存在独立的文档片段中，排在普通子节点之前
        if let RcNodeData::Element {
            template_contents, ..
        } = &handle.data
        {
            if let Some(contents) = template_contents.borrow().as_ref() {
                for child in contents.children.borrow().iter().rev() {
                    stack.push((id, child.clone()));
                }
            }
        }
    }
}

/// 查找指定路径的DOM节点
pub fn find_nodes(dom: &Dom, node: NodeId, node_names: &[&str]) -> Vec<NodeId> {
    let mut found_nodes = Vec::new();
    let mut stack: Vec<(NodeId, usize)> = dom
        .children(node)
        .iter()
        .rev()
        .map(|&child| (child, 0))
        .collect();

    while let Some((current, matched)) = stack.pop() {
        let Some(name) = node_names.get(matched) else {
            continue;
        };
        let next = if dom.element_name(current) == Some(*name) {
            if matched + 1 == node_names.len() {
                found_nodes.push(current);
                continue;
            }
            matched + 1
        } else {
            matched
        };
        stack.extend(dom.children(current).iter().rev().map(|&child| (child, next)));
    }

    found_nodes
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(dom: &Dom, parent: NodeId, node_name: &str) -> Option<NodeId> {
    dom.children(parent)
        .iter()
        .find(|child| dom.element_name(**child) == Some(node_name))
        .copied()
}

/// 文档声明的语言（`<html lang>`）
pub fn get_document_lang(dom: &Dom) -> Option<String> {
    let html = get_child_node_by_name(dom, dom.document(), "html")?;
    dom.attr(html, "lang")
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
}
