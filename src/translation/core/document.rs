//! 翻译文档模型
//!
//! 一个 frame 对应一个 `TranslationDocument`。模型保存提取时的原文片段，
//! 生成带占位标记的文本，并把译文按原有的行内结构写回 DOM：
//!
//! - 译文中的 `<b id=N>` 映射回原来的元素节点（属性与身份不变）
//! - `<br id=K>` 映射回原来的不透明节点
//! - 标记缺失、重复或未知时，该单元降级为纯文本译文加上全部不透明节点
//!
//! 原文与译文两份片段都保留，可以随时切换而无需重新提取。

use std::collections::HashSet;

use crate::frame::ContentWindow;
use crate::parsers::html::utils::{collapse_whitespace, WHITESPACES};
use crate::parsers::html::{Dom, NodeId};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::extractor::{Fragment, ItemId, NodeExtractor, TranslationItem};
use crate::translation::pipeline::markup::{
    escape_text, item_open, opaque_marker, parse_markup, strip_markers, MarkupNode, ITEM_CLOSE,
};

/// 写回译文的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// 按原结构还原
    Reconstructed,
    /// 结构无法还原，显示纯文本
    Degraded { reason: String },
}

impl ApplyOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ApplyOutcome::Degraded { .. })
    }
}

/// 翻译文档模型
#[derive(Debug)]
pub struct TranslationDocument {
    window: ContentWindow,
    root: NodeId,
    items: Vec<TranslationItem>,
    roots: Vec<ItemId>,
    languages: Option<(String, String)>,
    has_error: bool,
    showing_translation: bool,
    /// 上一轮译文留下的文本节点，重新翻译时复用
    spare_text: Vec<NodeId>,
}

impl TranslationDocument {
    /// 从窗口的 `<body>` 提取翻译条目
    pub fn new(window: ContentWindow, extractor: &NodeExtractor) -> TranslationResult<Self> {
        let (root, items) = {
            let dom = window.read_dom()?;
            let root = dom.body();
            (root, extractor.extract(&dom, root))
        };
        Ok(Self::from_items(window, root, items))
    }

    /// 由已提取的条目构建模型
    pub fn from_items(window: ContentWindow, root: NodeId, items: Vec<TranslationItem>) -> Self {
        let roots = items
            .iter()
            .filter(|item| item.is_root)
            .map(|item| item.id)
            .collect();

        Self {
            window,
            root,
            items,
            roots,
            languages: None,
            has_error: false,
            showing_translation: false,
            spare_text: Vec::new(),
        }
    }

    pub fn window(&self) -> &ContentWindow {
        &self.window
    }

    pub fn root_node(&self) -> NodeId {
        self.root
    }

    /// 全部条目（含嵌套条目）
    pub fn items(&self) -> &[TranslationItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&TranslationItem> {
        self.items.get(id)
    }

    /// 翻译单元（根条目）按文档顺序排列
    pub fn roots(&self) -> &[ItemId] {
        &self.roots
    }

    pub fn unit_count(&self) -> usize {
        self.roots.len()
    }

    pub fn languages(&self) -> Option<(&str, &str)> {
        self.languages
            .as_ref()
            .map(|(from, to)| (from.as_str(), to.as_str()))
    }

    pub fn set_languages(&mut self, from: &str, to: &str) {
        self.languages = Some((from.to_string(), to.to_string()));
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn set_error(&mut self, has_error: bool) {
        self.has_error = has_error;
    }

    pub fn is_showing_translation(&self) -> bool {
        self.showing_translation
    }

    /// 单元是否已有译文
    pub fn is_translated(&self, unit: ItemId) -> bool {
        self.items
            .get(unit)
            .is_some_and(|item| item.translation.is_some())
    }

    /// 生成带占位标记的文本（始终基于原文快照）
    pub fn generate_text_for_unit(&self, unit: ItemId) -> String {
        let mut out = String::new();
        if unit < self.items.len() {
            self.write_markup(unit, &mut out);
        }
        collapse_whitespace(&out)
            .trim_matches(WHITESPACES)
            .to_string()
    }

    /// 生成不含标记的纯文本
    pub fn generate_plain_text(&self, unit: ItemId) -> String {
        let mut out = String::new();
        if unit < self.items.len() {
            self.write_plain(unit, &mut out);
        }
        collapse_whitespace(&out)
            .trim_matches(WHITESPACES)
            .to_string()
    }

    fn write_markup(&self, item: ItemId, out: &mut String) {
        let mut ordinal = 0;
        for fragment in &self.items[item].original {
            match fragment {
                Fragment::Text { text, .. } => out.push_str(&escape_text(text)),
                Fragment::Item(child) => {
                    out.push_str(&item_open(*child));
                    self.write_markup(*child, out);
                    out.push_str(ITEM_CLOSE);
                }
                Fragment::Opaque(_) => {
                    out.push_str(&opaque_marker(ordinal));
                    ordinal += 1;
                }
            }
        }
    }

    fn write_plain(&self, item: ItemId, out: &mut String) {
        for fragment in &self.items[item].original {
            match fragment {
                Fragment::Text { text, .. } => out.push_str(text),
                Fragment::Item(child) => self.write_plain(*child, out),
                Fragment::Opaque(_) => {}
            }
        }
    }

    fn check_unit(&self, unit: ItemId) -> TranslationResult<()> {
        match self.items.get(unit) {
            Some(item) if item.is_root => Ok(()),
            Some(_) => Err(TranslationError::InvalidInput(format!(
                "条目 {} 不是翻译单元",
                unit
            ))),
            None => Err(TranslationError::InvalidInput(format!(
                "条目 {} 不存在",
                unit
            ))),
        }
    }

    /// 把后端返回的标记文本写回 DOM
    ///
    /// 标记不匹配时该单元降级，其他单元不受影响。
    pub fn apply_translated_text(
        &mut self,
        dom: &mut Dom,
        unit: ItemId,
        text: &str,
    ) -> TranslationResult<ApplyOutcome> {
        self.check_unit(unit)?;
        self.recycle_translation(unit);

        let parsed = parse_markup(text).and_then(|tree| self.validate(unit, &tree).map(|_| tree));
        let outcome = match parsed {
            Ok(tree) => {
                self.build_translation(dom, unit, tree);
                ApplyOutcome::Reconstructed
            }
            Err(e) => {
                tracing::warn!("单元 {} 的译文无法还原行内结构，改为纯文本: {}", unit, e);
                let plain = collapse_whitespace(&strip_markers(text))
                    .trim_matches(WHITESPACES)
                    .to_string();
                self.build_plain_translation(dom, unit, &plain);
                ApplyOutcome::Degraded {
                    reason: e.to_string(),
                }
            }
        };

        self.swap_item(dom, unit, true);
        self.showing_translation = true;
        Ok(outcome)
    }

    /// 后端没有返回该单元的译文时，以纯文本显示原文
    pub fn degrade_unit(&mut self, dom: &mut Dom, unit: ItemId) -> TranslationResult<()> {
        self.check_unit(unit)?;
        self.recycle_translation(unit);

        let plain = self.generate_plain_text(unit);
        self.build_plain_translation(dom, unit, &plain);
        self.swap_item(dom, unit, true);
        self.showing_translation = true;
        Ok(())
    }

    /// 显示全部译文
    pub fn show_translation(&mut self, dom: &mut Dom) {
        for &unit in &self.roots {
            self.swap_item(dom, unit, true);
        }
        self.showing_translation = true;
    }

    /// 恢复全部原文
    pub fn show_original(&mut self, dom: &mut Dom) {
        for &unit in &self.roots {
            self.swap_item(dom, unit, false);
        }
        self.showing_translation = false;
    }

    /// 校验标记树与原文结构一致
    fn validate(&self, item: ItemId, nodes: &[MarkupNode]) -> TranslationResult<()> {
        let expected: Vec<ItemId> = self.items[item].child_items().collect();
        let opaque_count = self.items[item].opaque_count();

        let mut seen_items = HashSet::new();
        let mut seen_opaque = HashSet::new();

        for node in nodes {
            match node {
                MarkupNode::Text(_) => {}
                MarkupNode::Item { id, children } => {
                    if !expected.contains(id) {
                        return Err(TranslationError::ReconstructionError(format!(
                            "条目 {} 中出现未知标记 <b id={}>",
                            item, id
                        )));
                    }
                    if !seen_items.insert(*id) {
                        return Err(TranslationError::ReconstructionError(format!(
                            "标记 <b id={}> 重复",
                            id
                        )));
                    }
                    self.validate(*id, children)?;
                }
                MarkupNode::Opaque(ordinal) => {
                    if *ordinal >= opaque_count {
                        return Err(TranslationError::ReconstructionError(format!(
                            "条目 {} 中出现未知标记 <br id={}>",
                            item, ordinal
                        )));
                    }
                    if !seen_opaque.insert(*ordinal) {
                        return Err(TranslationError::ReconstructionError(format!(
                            "标记 <br id={}> 重复",
                            ordinal
                        )));
                    }
                }
            }
        }

        if seen_items.len() != expected.len() || seen_opaque.len() != opaque_count {
            return Err(TranslationError::ReconstructionError(format!(
                "条目 {} 缺少 {} 个标记",
                item,
                expected.len() + opaque_count - seen_items.len() - seen_opaque.len()
            )));
        }

        Ok(())
    }

    fn build_translation(&mut self, dom: &mut Dom, item: ItemId, nodes: Vec<MarkupNode>) {
        let mut fragments = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                MarkupNode::Text(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    let node = self.translation_text(dom, &text);
                    fragments.push(Fragment::Text { node, text });
                }
                MarkupNode::Item { id, children } => {
                    self.build_translation(dom, id, children);
                    fragments.push(Fragment::Item(id));
                }
                MarkupNode::Opaque(ordinal) => {
                    if let Some(node) = self.items[item].opaque_node(ordinal) {
                        fragments.push(Fragment::Opaque(node));
                    }
                }
            }
        }

        self.items[item].translation = Some(fragments);
    }

    fn build_plain_translation(&mut self, dom: &mut Dom, unit: ItemId, plain: &str) {
        let mut fragments = Vec::new();
        if !plain.is_empty() {
            let node = self.translation_text(dom, plain);
            fragments.push(Fragment::Text {
                node,
                text: plain.to_string(),
            });
        }

        let mut opaque = Vec::new();
        self.collect_opaque(unit, &mut opaque);
        fragments.extend(opaque.into_iter().map(Fragment::Opaque));

        self.items[unit].translation = Some(fragments);
    }

    /// 收回单元及其嵌套条目现有译文中的文本节点
    fn recycle_translation(&mut self, unit: ItemId) {
        let mut pending = vec![unit];
        while let Some(item) = pending.pop() {
            pending.extend(self.items[item].child_items());
            if let Some(fragments) = self.items[item].translation.take() {
                self.spare_text
                    .extend(fragments.into_iter().filter_map(|fragment| match fragment {
                        Fragment::Text { node, .. } => Some(node),
                        _ => None,
                    }));
            }
        }
    }

    fn translation_text(&mut self, dom: &mut Dom, text: &str) -> NodeId {
        match self.spare_text.pop() {
            Some(node) => {
                dom.set_text(node, text);
                node
            }
            None => dom.create_translation_text(text),
        }
    }

    fn collect_opaque(&self, item: ItemId, out: &mut Vec<NodeId>) {
        for fragment in &self.items[item].original {
            match fragment {
                Fragment::Opaque(node) => out.push(*node),
                Fragment::Item(child) => self.collect_opaque(*child, out),
                Fragment::Text { .. } => {}
            }
        }
    }

    /// 用原文或译文片段替换条目的子节点
    fn swap_item(&self, dom: &mut Dom, item: ItemId, translated: bool) {
        let entry = &self.items[item];
        let fragments = match (&entry.translation, translated) {
            (Some(translation), true) => translation,
            _ => &entry.original,
        };

        let mut children = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            match fragment {
                Fragment::Text { node, .. } | Fragment::Opaque(node) => children.push(*node),
                Fragment::Item(child) => {
                    self.swap_item(dom, *child, translated);
                    children.push(self.items[*child].node);
                }
            }
        }

        dom.replace_children(entry.node, children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Viewport;
    use crate::parsers::html::{parse_html, serialize_children};

    fn document(html: &str) -> TranslationDocument {
        let window = ContentWindow::new(parse_html(html).unwrap(), Viewport::default());
        TranslationDocument::new(window, &NodeExtractor::new()).unwrap()
    }

    #[test]
    fn test_generate_text_for_unit() {
        let doc = document("<body><p>Hello  <b class=\"k\">big\n world</b> <img src=a.png> &lt;ok&gt;</p></body>");
        assert_eq!(doc.roots(), &[0]);
        assert_eq!(
            doc.generate_text_for_unit(0),
            "Hello <b id=1>big world</b> <br id=0> &lt;ok&gt;"
        );
        assert_eq!(doc.generate_plain_text(0), "Hello big world <ok>");
    }

    #[test]
    fn test_apply_reorders_inline_elements_and_keeps_identity() {
        let mut doc = document("<body><p>A <i id=\"x\">b</i> <img src=a.png> c</p></body>");
        let window = doc.window().clone();
        let mut dom = window.write_dom().unwrap();
        let p = doc.item(0).unwrap().node;
        let i = doc.item(1).unwrap().node;

        let outcome = doc
            .apply_translated_text(&mut dom, 0, "<br id=0> C <b id=1>B</b> a")
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Reconstructed);
        assert_eq!(
            serialize_children(&dom, p).unwrap(),
            "<img src=\"a.png\"> C <i id=\"x\">B</i> a"
        );
        assert_eq!(dom.parent(i), Some(p));
    }

    #[test]
    fn test_missing_marker_degrades_to_plain_text() {
        let mut doc = document("<body><p>A <i>b</i> <img src=a.png> c</p></body>");
        let window = doc.window().clone();
        let mut dom = window.write_dom().unwrap();
        let p = doc.item(0).unwrap().node;

        let outcome = doc
            .apply_translated_text(&mut dom, 0, "A <b id=1>B</b> c")
            .unwrap();

        assert!(outcome.is_degraded());
        assert_eq!(serialize_children(&dom, p).unwrap(), "A B c<img src=\"a.png\">");
    }

    #[test]
    fn test_show_original_restores_original_nodes() {
        let html = "<body><p>One <em>two</em></p><div>Three</div></body>";
        let mut doc = document(html);
        let window = doc.window().clone();
        let mut dom = window.write_dom().unwrap();
        let body = dom.body();
        let before = serialize_children(&dom, body).unwrap();

        doc.apply_translated_text(&mut dom, 0, "Uno <b id=1>dos</b>").unwrap();
        doc.apply_translated_text(&mut dom, 2, "Tres").unwrap();
        doc.show_translation(&mut dom);
        assert_eq!(
            serialize_children(&dom, body).unwrap(),
            "<p>Uno <em>dos</em></p><div>Tres</div>"
        );

        doc.show_original(&mut dom);
        assert_eq!(serialize_children(&dom, body).unwrap(), before);
        assert!(!doc.is_showing_translation());
    }

    #[test]
    fn test_retranslation_reuses_text_nodes() {
        let mut doc = document("<body><p>One <em>two</em> three</p></body>");
        let window = doc.window().clone();
        let mut dom = window.write_dom().unwrap();
        let p = doc.item(0).unwrap().node;

        doc.apply_translated_text(&mut dom, 0, "Uno <b id=1>dos</b> tres").unwrap();
        let allocated = dom.len();

        doc.apply_translated_text(&mut dom, 0, "Eins <b id=1>zwei</b> drei").unwrap();
        assert_eq!(dom.len(), allocated);
        assert_eq!(serialize_children(&dom, p).unwrap(), "Eins <em>zwei</em> drei");

        // 降级与还原之间来回切换也不会继续分配
        doc.apply_translated_text(&mut dom, 0, "Un deux").unwrap();
        doc.apply_translated_text(&mut dom, 0, "Un <b id=1>deux</b> trois").unwrap();
        assert_eq!(dom.len(), allocated);
        assert_eq!(serialize_children(&dom, p).unwrap(), "Un <em>deux</em> trois");

        doc.show_original(&mut dom);
        assert_eq!(serialize_children(&dom, p).unwrap(), "One <em>two</em> three");
    }

    #[test]
    fn test_degrade_unit_shows_original_plain_text() {
        let mut doc = document("<body><p>Keep <b>this</b></p></body>");
        let window = doc.window().clone();
        let mut dom = window.write_dom().unwrap();
        let p = doc.item(0).unwrap().node;

        doc.degrade_unit(&mut dom, 0).unwrap();
        assert_eq!(serialize_children(&dom, p).unwrap(), "Keep this");
        assert!(doc.degrade_unit(&mut dom, 1).is_err());
    }
}
