//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 本地读写错误
    #[error("IO错误: {0}")]
    IoError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 当前状态不允许该操作
    #[error("状态错误: {0}")]
    InvalidState(String),

    /// 翻译后端错误（某个分区请求失败）
    #[error("翻译服务错误: {0}")]
    BackendError(String),

    /// 语言检测错误
    #[error("语言检测错误: {0}")]
    DetectionError(String),

    /// 译文无法还原为原有的行内结构
    #[error("结构还原错误: {0}")]
    ReconstructionError(String),

    /// 所属窗口已销毁，结果被丢弃
    #[error("所属窗口已失效: {0}")]
    StaleOwner(String),

    /// 并发错误
    #[error("并发操作错误: {0}")]
    ConcurrencyError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::NetworkError(_) => true,
            TranslationError::BackendError(_) => true,
            TranslationError::DetectionError(_) => true,
            TranslationError::ConcurrencyError(_) => true,
            TranslationError::ConfigError(_) => false,
            TranslationError::IoError(_) => false,
            TranslationError::InvalidInput(_) => false,
            TranslationError::InvalidState(_) => false,
            TranslationError::ReconstructionError(_) => false,
            TranslationError::StaleOwner(_) => false,
            TranslationError::ParseError(_) => false,
            TranslationError::SerializationError(_) => false,
            TranslationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::NetworkError(_) => ErrorSeverity::Warning,
            TranslationError::IoError(_) => ErrorSeverity::Error,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            TranslationError::InvalidState(_) => ErrorSeverity::Info,
            TranslationError::BackendError(_) => ErrorSeverity::Error,
            TranslationError::DetectionError(_) => ErrorSeverity::Warning,
            TranslationError::ReconstructionError(_) => ErrorSeverity::Warning,
            TranslationError::StaleOwner(_) => ErrorSeverity::Info,
            TranslationError::ConcurrencyError(_) => ErrorSeverity::Warning,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 过期结果是否应当被静默丢弃
    pub fn is_stale(&self) -> bool {
        matches!(self, TranslationError::StaleOwner(_))
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let new_msg = match &self {
            TranslationError::ConfigError(msg)
            | TranslationError::NetworkError(msg)
            | TranslationError::IoError(msg)
            | TranslationError::InvalidInput(msg)
            | TranslationError::InvalidState(msg)
            | TranslationError::BackendError(msg)
            | TranslationError::DetectionError(msg)
            | TranslationError::ReconstructionError(msg)
            | TranslationError::StaleOwner(msg)
            | TranslationError::ConcurrencyError(msg)
            | TranslationError::ParseError(msg)
            | TranslationError::SerializationError(msg)
            | TranslationError::InternalError(msg) => format!("{} (上下文: {})", msg, context),
        };

        match &mut self {
            TranslationError::ConfigError(msg)
            | TranslationError::NetworkError(msg)
            | TranslationError::IoError(msg)
            | TranslationError::InvalidInput(msg)
            | TranslationError::InvalidState(msg)
            | TranslationError::BackendError(msg)
            | TranslationError::DetectionError(msg)
            | TranslationError::ReconstructionError(msg)
            | TranslationError::StaleOwner(msg)
            | TranslationError::ConcurrencyError(msg)
            | TranslationError::ParseError(msg)
            | TranslationError::SerializationError(msg)
            | TranslationError::InternalError(msg) => *msg = new_msg,
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 标准错误转换
impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<config::ConfigError> for TranslationError {
    fn from(error: config::ConfigError) -> Self {
        TranslationError::ConfigError(error.to_string())
    }
}

impl From<url::ParseError> for TranslationError {
    fn from(error: url::ParseError) -> Self {
        TranslationError::InvalidInput(format!("URL解析失败: {}", error))
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            TranslationError::SerializationError(format!("响应解析失败: {}", error))
        } else if error.is_status() {
            TranslationError::BackendError(format!("HTTP状态错误: {}", error))
        } else {
            TranslationError::NetworkError(error.to_string())
        }
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }

    /// 创建状态错误
    pub fn state_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::InvalidState(msg.to_string())
    }

    /// 创建内部错误
    pub fn internal_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::InternalError(msg.to_string())
    }
}
