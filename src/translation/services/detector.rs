//! 语言检测代理
//!
//! 检测模型本身由外部提供；这里只定义能力接口、检测样本的构造规则，
//! 以及一个读取文档声明语言的简单实现。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::translation::error::TranslationResult;

/// 检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedLanguage {
    pub language: String,
    pub confident: bool,
}

impl DetectedLanguage {
    pub fn confident(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            confident: true,
        }
    }

    pub fn uncertain(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            confident: false,
        }
    }
}

/// 语言检测器
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect_language(&self, text: &str) -> TranslationResult<DetectedLanguage>;
}

/// 只认可文档 `<html lang>` 声明的检测器
#[derive(Debug, Clone, Default)]
pub struct DeclaredLanguageDetector {
    declared: Option<String>,
}

impl DeclaredLanguageDetector {
    pub fn new(declared: Option<String>) -> Self {
        Self {
            declared: declared.map(|lang| primary_subtag(&lang)),
        }
    }
}

#[async_trait]
impl LanguageDetector for DeclaredLanguageDetector {
    async fn detect_language(&self, _text: &str) -> TranslationResult<DetectedLanguage> {
        Ok(match &self.declared {
            Some(lang) => DetectedLanguage::confident(lang.clone()),
            None => DetectedLanguage::uncertain("und"),
        })
    }
}

/// 语言标签的主子标签（`en-US` → `en`）
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// 只有 http/https 页面才做检测
pub fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// 把各单元的纯文本用空格连接，截断到 `cap` 字节（不切断字符）
pub fn build_detection_sample<I>(texts: I, cap: usize) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut sample = String::new();

    for text in texts {
        if text.is_empty() {
            continue;
        }
        if !sample.is_empty() {
            if sample.len() + 1 > cap {
                break;
            }
            sample.push(' ');
        }

        let remaining = cap.saturating_sub(sample.len());
        if text.len() <= remaining {
            sample.push_str(&text);
        } else {
            let mut end = remaining;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            sample.push_str(&text[..end]);
            break;
        }
    }

    sample
}
