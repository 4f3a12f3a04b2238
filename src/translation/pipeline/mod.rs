//! 翻译管道模块
//!
//! 提供文本处理管道，包括节点提取、占位标记和批次划分

pub mod batch;
pub mod extractor;
pub mod markup;

// 重新导出主要类型
pub use batch::{Batch, BatchLimits, BatchManager, BatchStats};
pub use extractor::{Fragment, ItemId, NodeExtractor, TranslationItem};
pub use markup::{escape_text, parse_markup, strip_markers, MarkupNode};
