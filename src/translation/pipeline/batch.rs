//! 翻译批次管理器模块
//!
//! 把翻译单元的标记文本按后端限制划分为若干批次（分区）。
//!
//! ## 划分规则
//!
//! - 单元按文档顺序依次放入当前批次
//! - 放入后会超出 `max_items` 或 `max_chars` 时，先结束当前批次
//! - 单个超长文本独占一个批次，不做拆分
//! - 空文本不发送
//!
//! 批次编号从 0 开始，与文档顺序一致，翻译器据此按顺序回填结果。
//!
//! ## 使用示例
//!
//! ```rust
//! use page_translator::translation::pipeline::batch::{BatchLimits, BatchManager};
//!
//! let manager = BatchManager::new(BatchLimits::new(2, 100));
//! let batches = manager.create_batches(vec![
//!     (0, "Hello".to_string()),
//!     (3, "World".to_string()),
//!     (5, "Again".to_string()),
//! ]);
//!
//! assert_eq!(batches.len(), 2);
//! assert_eq!(batches[1].units, vec![5]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::translation::config::{constants, TranslationConfig};
use crate::translation::pipeline::extractor::ItemId;

/// 后端单次请求的限制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLimits {
    /// 单次请求的最大文本条数
    pub max_items: usize,
    /// 单次请求的最大字符数
    pub max_chars: usize,
}

impl BatchLimits {
    pub fn new(max_items: usize, max_chars: usize) -> Self {
        Self {
            max_items: max_items.max(1),
            max_chars: max_chars.max(1),
        }
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self::new(
            constants::DEFAULT_MAX_ITEMS_PER_BATCH,
            constants::DEFAULT_MAX_CHARS_PER_BATCH,
        )
    }
}

impl From<&TranslationConfig> for BatchLimits {
    fn from(config: &TranslationConfig) -> Self {
        Self::new(config.max_items_per_batch, config.max_chars_per_batch)
    }
}

/// 翻译批次
///
/// `units` 与 `texts` 一一对应；后端响应中第 `i` 条译文属于 `units[i]`。
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// 批次序号（文档顺序）
    pub id: usize,
    /// 批次中的翻译单元
    pub units: Vec<ItemId>,
    /// 发送给后端的标记文本
    pub texts: Vec<String>,
    /// 字符总数
    pub estimated_chars: usize,
}

impl Batch {
    fn new(id: usize) -> Self {
        Self {
            id,
            units: Vec::new(),
            texts: Vec::new(),
            estimated_chars: 0,
        }
    }

    fn push(&mut self, unit: ItemId, text: String, chars: usize) {
        self.units.push(unit);
        self.texts.push(text);
        self.estimated_chars += chars;
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 是否只包含一个超出字符限制的文本
    pub fn is_oversized(&self, limits: &BatchLimits) -> bool {
        self.units.len() == 1 && self.estimated_chars > limits.max_chars
    }
}

/// 批次管理器
#[derive(Debug)]
pub struct BatchManager {
    limits: BatchLimits,
    stats: BatchStats,
}

impl BatchManager {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            limits,
            stats: BatchStats::default(),
        }
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// 按文档顺序划分批次
    pub fn create_batches(&self, texts: Vec<(ItemId, String)>) -> Vec<Batch> {
        let mut batches: Vec<Batch> = Vec::new();
        let mut current = Batch::new(0);
        let mut input = 0;

        for (unit, text) in texts {
            if text.trim().is_empty() {
                continue;
            }
            input += 1;

            let chars = text.chars().count();
            let would_overflow = current.len() + 1 > self.limits.max_items
                || current.estimated_chars + chars > self.limits.max_chars;

            if !current.is_empty() && would_overflow {
                let next = Batch::new(batches.len() + 1);
                batches.push(std::mem::replace(&mut current, next));
            }

            if chars > self.limits.max_chars {
                tracing::debug!("单元 {} 超出单批次字符限制（{} > {}），单独发送", unit, chars, self.limits.max_chars);
                self.stats.oversized.fetch_add(1, Ordering::Relaxed);
            }

            current.push(unit, text, chars);
        }

        if !current.is_empty() {
            batches.push(current);
        }

        self.stats.input_items.fetch_add(input, Ordering::Relaxed);
        self.stats
            .output_batches
            .fetch_add(batches.len(), Ordering::Relaxed);

        tracing::debug!("{} 个单元划分为 {} 个批次", input, batches.len());
        batches
    }

    pub fn get_stats(&self) -> &BatchStats {
        &self.stats
    }
}

/// 批次统计
#[derive(Debug, Default)]
pub struct BatchStats {
    /// 输入的单元总数
    pub input_items: AtomicUsize,
    /// 输出的批次总数
    pub output_batches: AtomicUsize,
    /// 超长单元数量
    pub oversized: AtomicUsize,
}

impl BatchStats {
    pub fn get_input_items(&self) -> usize {
        self.input_items.load(Ordering::Relaxed)
    }

    pub fn get_output_batches(&self) -> usize {
        self.output_batches.load(Ordering::Relaxed)
    }

    pub fn get_oversized(&self) -> usize {
        self.oversized.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(values: &[&str]) -> Vec<(ItemId, String)> {
        values
            .iter()
            .enumerate()
            .map(|(i, text)| (i * 2, text.to_string()))
            .collect()
    }

    #[test]
    fn test_respects_item_limit() {
        let manager = BatchManager::new(BatchLimits::new(2, 1000));
        let batches = manager.create_batches(texts(&["a", "b", "c", "d", "e"]));

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].units, vec![0, 2]);
        assert_eq!(batches[2].units, vec![8]);
        assert_eq!(batches.iter().map(|b| b.id).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_respects_char_limit_and_isolates_oversize() {
        let manager = BatchManager::new(BatchLimits::new(10, 10));
        let batches = manager.create_batches(texts(&["12345", "123456", "this one is far too long", "ab"]));

        assert_eq!(batches.len(), 4);
        assert_eq!(batches[0].texts, vec!["12345"]);
        assert!(batches[2].is_oversized(&manager.limits()));
        assert_eq!(batches[3].texts, vec!["ab"]);
        assert_eq!(manager.get_stats().get_oversized(), 1);
    }

    #[test]
    fn test_empty_texts_are_skipped() {
        let manager = BatchManager::new(BatchLimits::default());
        let batches = manager.create_batches(texts(&["", "  ", "x"]));

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].units, vec![4]);
        assert_eq!(manager.get_stats().get_input_items(), 1);
    }
}
