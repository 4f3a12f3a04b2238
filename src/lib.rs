//! # Page Translator Library
//!
//! 在原有 DOM 上就地完成网页机器翻译：提取可翻译文本并保留行内结构，
//! 按后端限制分批发送，再把译文写回原来的节点，不破坏图片、链接、脚本等
//! 非文本节点，也不改变任何元素的身份。
//!
//! ## 模块组织
//!
//! - `parsers` - HTML 解析、DOM 竞技场与序列化，行内样式解析
//! - `frame` - frame 标识、内容窗口与视口
//! - `translation` - 提取、翻译文档模型、批量翻译引擎与状态机
//! - `env` - 进程级环境变量

pub mod env;
pub mod frame;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use frame::{ContentWindow, FrameInfo, Viewport};
pub use parsers::html::{parse_html, serialize_document, Dom, NodeId};
pub use translation::{TranslationError, TranslationResult, TranslationStatus};
