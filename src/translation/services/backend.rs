//! 翻译后端能力接口

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::translation::error::TranslationResult;
use crate::translation::pipeline::batch::BatchLimits;

/// 一次批量翻译请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub texts: Vec<String>,
    pub from: String,
    pub to: String,
}

/// 批量翻译响应，`translated_texts[i]` 对应请求中的 `texts[i]`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResponse {
    #[serde(default)]
    pub translated_texts: Vec<String>,
}

/// 翻译后端
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// 后端名称，仅用于日志
    fn name(&self) -> &str {
        "backend"
    }

    /// 单次请求的限制
    fn limits(&self) -> BatchLimits {
        BatchLimits::default()
    }

    /// 翻译一批文本；文本中可能带有 `<b id=N>` 与 `<br id=K>` 标记，
    /// 后端应原样保留
    async fn translate(&self, request: TranslationRequest) -> TranslationResult<TranslationResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_camel_case() {
        let response: TranslationResponse =
            serde_json::from_str(r#"{"translatedTexts":["a","b"]}"#).unwrap();
        assert_eq!(response.translated_texts, vec!["a", "b"]);

        let request = TranslationRequest {
            texts: vec!["x".to_string()],
            from: "en".to_string(),
            to: "fr".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"texts":["x"],"from":"en","to":"fr"}"#
        );
    }
}
