//! DOM 节点竞技场
//!
//! 所有节点存放在同一个 `Vec` 中，通过稳定的 `NodeId` 句柄引用。
//! 节点从不被释放：被移出文档树的节点只是失去父节点，句柄仍然有效，
//! 这样翻译模型可以在原文与译文之间来回切换而不丢失任何元素。

use html5ever::interface::{Attribute, QualName};
use html5ever::tendril::format_tendril;
use html5ever::{namespace_url, ns, LocalName};
use serde::{Deserialize, Serialize};

/// 节点句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// 竞技场中的下标
    pub fn index(self) -> usize {
        self.0
    }
}

/// 布局矩形（由宿主环境提供，单位为CSS像素）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// `other` 是否完全落在当前矩形内
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// 两个矩形是否有面积大于零的交集
    pub fn intersects(&self, other: &Rect) -> bool {
        other.x < self.right()
            && other.right() > self.x
            && other.y < self.bottom()
            && other.bottom() > self.y
    }
}

/// 节点数据
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Doctype {
        name: String,
    },
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
    },
    Text {
        contents: String,
    },
    Comment {
        contents: String,
    },
    ProcessingInstruction {
        target: String,
        contents: String,
    },
}

/// 单个节点
#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    layout: Option<Rect>,
    /// 由翻译过程创建的文本节点
    translation_output: bool,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            layout: None,
            translation_output: false,
        }
    }
}

/// DOM 竞技场
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    document: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// 创建只包含文档节点的空树
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            document: NodeId(0),
        }
    }

    /// 文档根节点
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// 节点总数（包括已脱离文档树的节点）
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// 句柄是否属于当前竞技场
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// 创建（未挂载的）元素节点
    pub fn create_element(&mut self, local_name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: QualName::new(None, ns!(), LocalName::from(*name)),
                value: format_tendril!("{}", value),
            })
            .collect();
        self.create_element_qual(QualName::new(None, ns!(html), LocalName::from(local_name)), attrs)
    }

    pub fn create_element_qual(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        self.push(Node::new(NodeData::Element { name, attrs }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::new(NodeData::Text {
            contents: text.to_string(),
        }))
    }

    /// 创建带有“翻译输出”标记的文本节点
    pub fn create_translation_text(&mut self, text: &str) -> NodeId {
        let id = self.create_text(text);
        self.nodes[id.0].translation_output = true;
        id
    }

    pub(crate) fn create_raw(&mut self, data: NodeData) -> NodeId {
        self.push(Node::new(data))
    }

    /// 改写文本节点的内容，其他节点不受影响
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let NodeData::Text { contents } = &mut self.nodes[id.0].data {
            contents.clear();
            contents.push_str(text);
        }
    }

    /// 将节点从其父节点中移除
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    /// 追加子节点（会先从原父节点上移除）
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// 一次性替换全部子节点
    ///
    /// 旧子节点全部脱离；新子节点若挂在其他父节点下会先被移走。
    /// `parent` 自身的属性不受影响。
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        let old = std::mem::take(&mut self.nodes[parent.0].children);
        for child in old {
            self.nodes[child.0].parent = None;
        }

        for &child in &children {
            debug_assert!(child != parent, "节点不能成为自己的子节点");
            if let Some(previous) = self.nodes[child.0].parent {
                self.nodes[previous.0].children.retain(|c| *c != child);
            }
            self.nodes[child.0].parent = Some(parent);
        }

        self.nodes[parent.0].children = children;
    }

    /// 元素本地名称
    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { name, .. } => Some(name.local.as_ref()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].data, NodeData::Element { .. })
    }

    /// 文本节点内容
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text { contents } => Some(contents.as_str()),
            _ => None,
        }
    }

    /// 获取节点属性值
    pub fn attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|attr| &*attr.name.local == attr_name)
                .map(|attr| &*attr.value),
            _ => None,
        }
    }

    /// 元素的全部属性（名称, 值）
    pub fn attrs(&self, id: NodeId) -> Vec<(String, String)> {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// 设置节点属性，`None` 表示删除
    pub fn set_attr(&mut self, id: NodeId, attr_name: &str, attr_value: Option<&str>) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            match attr_value {
                Some(value) => {
                    if let Some(existing) = attrs.iter_mut().find(|a| &*a.name.local == attr_name)
                    {
                        existing.value = format_tendril!("{}", value);
                    } else {
                        attrs.push(Attribute {
                            name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                            value: format_tendril!("{}", value),
                        });
                    }
                }
                None => attrs.retain(|a| &*a.name.local != attr_name),
            }
        }
    }

    pub fn is_translation_output(&self, id: NodeId) -> bool {
        self.nodes[id.0].translation_output
    }

    pub fn layout(&self, id: NodeId) -> Option<Rect> {
        self.nodes[id.0].layout
    }

    /// 设置宿主提供的布局矩形
    pub fn set_layout(&mut self, id: NodeId, rect: Rect) {
        self.nodes[id.0].layout = Some(rect);
    }

    /// 先序遍历的全部后代（不含自身）
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// 拼接子树中全部文本
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.text(id) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// 先序查找第一个指定名称的元素
    pub fn find_first(&self, from: NodeId, local_name: &str) -> Option<NodeId> {
        if self.element_name(from) == Some(local_name) {
            return Some(from);
        }
        self.descendants(from)
            .into_iter()
            .find(|node| self.element_name(*node) == Some(local_name))
    }

    /// 文档的 `<body>`，没有则返回文档节点
    pub fn body(&self) -> NodeId {
        self.find_first(self.document, "body")
            .unwrap_or(self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_children_moves_nodes_between_parents() {
        let mut dom = Dom::new();
        let root = dom.document();
        let p = dom.create_element("p", &[]);
        let b = dom.create_element("b", &[("class", "x")]);
        let text = dom.create_text("hello");
        dom.append(root, p);
        dom.append(p, b);
        dom.append(b, text);

        dom.replace_children(p, vec![text, b]);

        assert_eq!(dom.children(p), &[text, b]);
        assert!(dom.children(b).is_empty());
        assert_eq!(dom.parent(text), Some(p));
        assert_eq!(dom.attr(b, "class"), Some("x"));
    }

    #[test]
    fn test_descendants_preorder() {
        let mut dom = Dom::new();
        let root = dom.document();
        let div = dom.create_element("div", &[]);
        let p1 = dom.create_element("p", &[]);
        let t1 = dom.create_text("a");
        let p2 = dom.create_element("p", &[]);
        dom.append(root, div);
        dom.append(div, p1);
        dom.append(p1, t1);
        dom.append(div, p2);

        assert_eq!(dom.descendants(root), vec![div, p1, t1, p2]);
        assert_eq!(dom.text_content(div), "a");
    }

    #[test]
    fn test_rect_geometry() {
        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        assert!(viewport.contains(&Rect::new(10.0, 10.0, 100.0, 20.0)));
        assert!(!viewport.contains(&Rect::new(790.0, 10.0, 100.0, 20.0)));
        assert!(viewport.intersects(&Rect::new(790.0, 10.0, 100.0, 20.0)));
        assert!(!viewport.intersects(&Rect::new(0.0, 700.0, 100.0, 20.0)));
    }

    #[test]
    fn test_set_attr_add_update_remove() {
        let mut dom = Dom::new();
        let a = dom.create_element("a", &[("href", "/x")]);
        dom.set_attr(a, "href", Some("/y"));
        dom.set_attr(a, "title", Some("t"));
        assert_eq!(dom.attr(a, "href"), Some("/y"));
        assert_eq!(dom.attr(a, "title"), Some("t"));
        dom.set_attr(a, "href", None);
        assert_eq!(dom.attr(a, "href"), None);
    }
}
