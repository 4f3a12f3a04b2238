//! 视口统计
//!
//! 对每个翻译单元计算词数、是否完全位于视口内、是否在视觉上可见，
//! 并汇总三个词数指标。只读，不修改 DOM。

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::parsers::html::NodeId;
use crate::translation::core::document::TranslationDocument;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::extractor::ItemId;
use crate::translation::services::broadcast::{paths, PatchOperation};
use crate::translation::services::visibility::VisibilityObserver;

/// 单个翻译单元的可见性
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitVisibility {
    pub unit: ItemId,
    pub node: NodeId,
    pub words: usize,
    pub in_viewport: bool,
    pub visible: bool,
}

/// 视口统计结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportStats {
    pub word_count: usize,
    pub word_count_in_viewport: usize,
    pub word_count_visible_in_viewport: usize,
    pub units: Vec<UnitVisibility>,
}

impl ViewportStats {
    fn from_units(units: Vec<UnitVisibility>) -> Self {
        let word_count = units.iter().map(|unit| unit.words).sum();
        let word_count_in_viewport = units
            .iter()
            .filter(|unit| unit.in_viewport)
            .map(|unit| unit.words)
            .sum();
        let word_count_visible_in_viewport = units
            .iter()
            .filter(|unit| unit.visible)
            .map(|unit| unit.words)
            .sum();

        Self {
            word_count,
            word_count_in_viewport,
            word_count_visible_in_viewport,
            units,
        }
    }

    /// 发布到状态存储的 patch
    pub fn to_patches(&self) -> Vec<PatchOperation> {
        vec![
            PatchOperation::add(paths::WORD_COUNT, json!(self.word_count)),
            PatchOperation::add(paths::WORD_COUNT_IN_VIEWPORT, json!(self.word_count_in_viewport)),
            PatchOperation::add(
                paths::WORD_COUNT_VISIBLE_IN_VIEWPORT,
                json!(self.word_count_visible_in_viewport),
            ),
        ]
    }
}

/// 词数（按空白切分）
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 视口统计器
#[derive(Clone)]
pub struct ViewportReporter {
    observer: Arc<dyn VisibilityObserver>,
}

impl ViewportReporter {
    pub fn new(observer: Arc<dyn VisibilityObserver>) -> Self {
        Self { observer }
    }

    pub async fn report(&self, document: &TranslationDocument) -> TranslationResult<ViewportStats> {
        let window = document.window();
        let viewport = window.viewport().rect();

        let mut units: Vec<UnitVisibility> = {
            let dom = window.read_dom()?;
            document
                .roots()
                .iter()
                .filter_map(|&unit| document.item(unit).map(|item| (unit, item.node)))
                .map(|(unit, node)| UnitVisibility {
                    unit,
                    node,
                    words: count_words(&document.generate_plain_text(unit)),
                    in_viewport: dom
                        .layout(node)
                        .is_some_and(|rect| viewport.contains(&rect)),
                    visible: false,
                })
                .collect()
        };

        let nodes = units.iter().map(|unit| unit.node).collect();
        let visible = self.observer.observe(window, nodes).first().await;

        if !window.is_alive() {
            return Err(TranslationError::StaleOwner("视口统计完成前窗口已关闭".to_string()));
        }

        for unit in &mut units {
            unit.visible = visible.contains(&unit.node);
        }

        let stats = ViewportStats::from_units(units);
        tracing::debug!(
            "词数统计: 总计 {}, 视口内 {}, 可见 {}",
            stats.word_count,
            stats.word_count_in_viewport,
            stats.word_count_visible_in_viewport
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ContentWindow, Viewport};
    use crate::parsers::html::{parse_html, Rect};
    use crate::translation::pipeline::extractor::NodeExtractor;
    use crate::translation::services::visibility::GeometricVisibilityObserver;

    #[tokio::test]
    async fn test_word_counts() {
        let mut dom =
            parse_html("<body><p>one two three</p><p>four five</p><p>six</p></body>").unwrap();
        let paragraphs: Vec<_> = dom
            .descendants(dom.body())
            .into_iter()
            .filter(|node| dom.element_name(*node) == Some("p"))
            .collect();
        // 完全在视口内 / 跨越视口底边 / 视口外
        dom.set_layout(paragraphs[0], Rect::new(0.0, 0.0, 100.0, 20.0));
        dom.set_layout(paragraphs[1], Rect::new(0.0, 590.0, 100.0, 40.0));
        dom.set_layout(paragraphs[2], Rect::new(0.0, 900.0, 100.0, 20.0));

        let window = ContentWindow::new(dom, Viewport::new(800.0, 600.0));
        let document = TranslationDocument::new(window, &NodeExtractor::new()).unwrap();
        let reporter = ViewportReporter::new(Arc::new(GeometricVisibilityObserver));

        let stats = reporter.report(&document).await.unwrap();
        assert_eq!(stats.word_count, 6);
        assert_eq!(stats.word_count_in_viewport, 3);
        assert_eq!(stats.word_count_visible_in_viewport, 5);
        assert_eq!(stats.to_patches().len(), 3);
    }
}
