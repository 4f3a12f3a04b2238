//! 翻译模块
//!
//! 采用分层的模块化结构：
//! - **pipeline**: 节点提取、占位标记与批次划分
//! - **core**: 翻译文档模型、批量翻译引擎与每个 frame 的状态机
//! - **services**: 注入的外部能力（检测、后端、状态广播、可见性）
//! - **viewport**: 视口词数统计
//! - **config**: 配置管理
//! - **error**: 错误处理

/// 配置管理模块 - 处理翻译相关的所有配置
pub mod config;

/// 核心模块 - 文档模型、引擎与编排器
pub mod core;

/// 错误处理模块 - 统一的错误类型和处理机制
pub mod error;

/// 文本处理管道模块 - 节点提取、占位标记和批次划分
pub mod pipeline;

/// 外部能力接口
pub mod services;

/// 视口统计
pub mod viewport;

pub use config::{ConfigManager, TranslationConfig};
pub use core::{
    ApplyOutcome, BatchingTranslator, FrameTranslator, TranslateReport, TranslationCapabilities,
    TranslationDocument, TranslationOrchestrator, TranslationStatus,
};
pub use error::{TranslationError, TranslationResult};
pub use pipeline::{NodeExtractor, TranslationItem};
pub use viewport::{ViewportReporter, ViewportStats};
