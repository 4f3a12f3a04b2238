//! 翻译系统核心模块
//!
//! - **文档层** (`document.rs`): 翻译文档模型，生成标记文本并写回译文
//! - **引擎层** (`engine.rs`): 批次划分、并发请求与按序写回
//! - **编排层** (`orchestrator.rs`): 每个 frame 的状态机与控制器注册表
//! - **状态** (`status.rs`): 对外发布的翻译状态
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use page_translator::frame::{ContentWindow, FrameInfo, Viewport};
//! use page_translator::parsers::html::parse_html;
//! use page_translator::translation::config::TranslationConfig;
//! use page_translator::translation::core::{TranslationCapabilities, TranslationOrchestrator};
//! use page_translator::translation::services::{
//!     DeclaredLanguageDetector, HttpTranslationBackend, LoggingBroadcaster,
//! };
//!
//! # async fn run() -> page_translator::translation::TranslationResult<()> {
//! let config = TranslationConfig::default();
//! let capabilities = TranslationCapabilities::new(
//!     Arc::new(DeclaredLanguageDetector::new(Some("en".to_string()))),
//!     Arc::new(HttpTranslationBackend::new(&config)?),
//!     Arc::new(LoggingBroadcaster),
//! );
//! let orchestrator = TranslationOrchestrator::new(capabilities, &config)?;
//!
//! let frame = FrameInfo::new(1, 0);
//! let window = ContentWindow::new(parse_html("<p>Hello</p>")?, Viewport::default());
//! orchestrator.attach_frame(frame, "https://example.com/", window)?;
//! orchestrator.translate(&frame, "en", "zh").await?;
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod engine;
pub mod orchestrator;
pub mod status;

pub use document::{ApplyOutcome, TranslationDocument};
pub use engine::{BatchingTranslator, EngineConfig, EngineStats, TranslateReport};
pub use orchestrator::{FrameTranslator, TranslationCapabilities, TranslationOrchestrator};
pub use status::TranslationStatus;
