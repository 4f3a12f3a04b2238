//! 翻译节点提取器
//!
//! 先序遍历一棵子树，找出全部翻译条目：
//!
//! - 元素至少有一个非空白的直接文本子节点时成为条目
//! - 父元素不是条目，或自身不是行内元素时，该条目是根条目（翻译单元）
//! - 其余条目嵌在所属根条目的标记文本中，以 `<b id=N>` 表示
//! - 嵌套超过 `MAX_MARKUP_DEPTH` 层的行内条目同样成为根条目
//!
//! 每个条目把自己的子节点记录为片段序列，供之后生成标记文本与还原结构。

use std::collections::HashMap;

use crate::parsers::css::inline_style_hides;
use crate::parsers::html::utils::{is_inline_element, is_skip_element, is_whitespace_only, NO_TRANSLATE_CLASS};
use crate::parsers::html::{Dom, NodeId};
use crate::translation::pipeline::markup::MAX_MARKUP_DEPTH;

/// 条目编号（文档内的先序序号）
pub type ItemId = usize;

/// 条目子节点片段
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// 文本节点及其内容快照
    Text { node: NodeId, text: String },
    /// 嵌套的行内条目
    Item(ItemId),
    /// 不参与翻译的节点，原样保留
    Opaque(NodeId),
}

/// 翻译条目
#[derive(Debug, Clone)]
pub struct TranslationItem {
    pub id: ItemId,
    pub node: NodeId,
    pub is_root: bool,
    /// 所属的上级条目（根条目为 `None`）
    pub parent: Option<ItemId>,
    pub original: Vec<Fragment>,
    pub translation: Option<Vec<Fragment>>,
}

impl TranslationItem {
    /// 原文中不透明节点的数量
    pub fn opaque_count(&self) -> usize {
        self.original
            .iter()
            .filter(|fragment| matches!(fragment, Fragment::Opaque(_)))
            .count()
    }

    /// 原文中第 `ordinal` 个不透明节点
    pub fn opaque_node(&self, ordinal: usize) -> Option<NodeId> {
        self.original
            .iter()
            .filter_map(|fragment| match fragment {
                Fragment::Opaque(node) => Some(*node),
                _ => None,
            })
            .nth(ordinal)
    }

    /// 直接嵌套的子条目
    pub fn child_items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.original.iter().filter_map(|fragment| match fragment {
            Fragment::Item(id) => Some(*id),
            _ => None,
        })
    }
}

/// 节点提取器
#[derive(Debug, Clone, Default)]
pub struct NodeExtractor {
    /// 额外排除的元素名
    extra_skip: Vec<String>,
}

impl NodeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加需要整棵跳过的元素
    pub fn with_skipped_elements(mut self, names: &[&str]) -> Self {
        self.extra_skip
            .extend(names.iter().map(|name| name.to_ascii_lowercase()));
        self
    }

    /// 从 `root` 开始提取全部条目（按先序排列）
    pub fn extract(&self, dom: &Dom, root: NodeId) -> Vec<TranslationItem> {
        let mut items = Vec::new();
        self.collect(dom, root, &mut items);

        let index: HashMap<NodeId, (ItemId, bool)> = items
            .iter()
            .map(|item| (item.node, (item.id, item.is_root)))
            .collect();

        for item in &mut items {
            item.original = Self::fragments_for(dom, item.node, &index);
        }

        tracing::debug!(
            "提取到 {} 个翻译条目，其中 {} 个翻译单元",
            items.len(),
            items.iter().filter(|item| item.is_root).count()
        );

        items
    }

    /// 第一遍：确定哪些元素是条目
    ///
    /// 使用显式栈做先序遍历，嵌套深度不受调用栈限制。
    fn collect(
        &self,
        dom: &Dom,
        root: NodeId,
        items: &mut Vec<TranslationItem>,
    ) {
        // (节点, 所属条目及其嵌套层数)
        let mut stack: Vec<(NodeId, Option<(ItemId, usize)>)> = vec![(root, None)];

        while let Some((node, parent_item)) = stack.pop() {
            let Some(name) = dom.element_name(node) else {
                // 文档节点本身也需要继续向下遍历
                if node == dom.document() {
                    stack.extend(dom.children(node).iter().rev().map(|&child| (child, None)));
                }
                continue;
            };

            if self.is_excluded(dom, node, name) {
                continue;
            }

            let has_text = dom.children(node).iter().any(|&child| {
                !dom.is_translation_output(child)
                    && dom.text(child).is_some_and(|text| !is_whitespace_only(text))
            });

            let next_parent = if has_text {
                let id = items.len();
                let nested = parent_item
                    .filter(|&(_, depth)| is_inline_element(name) && depth < MAX_MARKUP_DEPTH);
                items.push(TranslationItem {
                    id,
                    node,
                    is_root: nested.is_none(),
                    parent: nested.map(|(parent, _)| parent),
                    original: Vec::new(),
                    translation: None,
                });
                Some((id, nested.map_or(0, |(_, depth)| depth + 1)))
            } else {
                None
            };

            stack.extend(
                dom.children(node)
                    .iter()
                    .rev()
                    .map(|&child| (child, next_parent)),
            );
        }
    }

    /// 第二遍：把条目的子节点转换为片段
    fn fragments_for(
        dom: &Dom,
        node: NodeId,
        index: &HashMap<NodeId, (ItemId, bool)>,
    ) -> Vec<Fragment> {
        let mut fragments = Vec::new();

        for &child in dom.children(node) {
            if let Some(text) = dom.text(child) {
                fragments.push(Fragment::Text {
                    node: child,
                    text: text.to_string(),
                });
                continue;
            }

            match index.get(&child) {
                Some(&(id, false)) => fragments.push(Fragment::Item(id)),
                _ => fragments.push(Fragment::Opaque(child)),
            }
        }

        fragments
    }

    /// 元素及其子树是否被排除
    fn is_excluded(&self, dom: &Dom, node: NodeId, name: &str) -> bool {
        if is_skip_element(name) || self.extra_skip.iter().any(|skip| skip == name) {
            return true;
        }

        if dom.attr(node, "hidden").is_some() {
            return true;
        }

        if dom
            .attr(node, "aria-hidden")
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
        {
            return true;
        }

        if dom
            .attr(node, "translate")
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("no"))
        {
            return true;
        }

        if dom
            .attr(node, "class")
            .is_some_and(|class| class.split_ascii_whitespace().any(|c| c == NO_TRANSLATE_CLASS))
        {
            return true;
        }

        dom.attr(node, "style").is_some_and(inline_style_hides)
    }
}
