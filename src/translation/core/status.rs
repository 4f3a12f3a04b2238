//! 每个 frame 的翻译状态

use std::fmt;

use serde::{Deserialize, Serialize};

/// 翻译状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranslationStatus {
    /// 不是网页（或尚未检测）
    #[default]
    Unavailable,
    DetectingLanguage,
    LanguageNotDetected,
    /// 已确定语言，等待用户发起翻译
    Offer,
    Translating,
    Translated,
    Error,
}

impl TranslationStatus {
    /// 当前状态下是否接受翻译请求
    pub fn accepts_translate(self) -> bool {
        !matches!(self, TranslationStatus::DetectingLanguage)
    }

    /// 状态名（与序列化结果一致）
    pub fn as_str(self) -> &'static str {
        match self {
            TranslationStatus::Unavailable => "UNAVAILABLE",
            TranslationStatus::DetectingLanguage => "DETECTING_LANGUAGE",
            TranslationStatus::LanguageNotDetected => "LANGUAGE_NOT_DETECTED",
            TranslationStatus::Offer => "OFFER",
            TranslationStatus::Translating => "TRANSLATING",
            TranslationStatus::Translated => "TRANSLATED",
            TranslationStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
