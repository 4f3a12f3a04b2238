//! 基于 HTTP JSON 接口的翻译后端
//!
//! 请求体为 `{"texts": [...], "from": "en", "to": "zh"}`，
//! 期望响应 `{"translatedTexts": [...]}`。

use async_trait::async_trait;
use reqwest::Client;

use crate::translation::config::TranslationConfig;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::batch::BatchLimits;
use crate::translation::services::backend::{
    TranslationBackend, TranslationRequest, TranslationResponse,
};

/// HTTP 翻译后端
#[derive(Debug, Clone)]
pub struct HttpTranslationBackend {
    client: Client,
    api_url: String,
    limits: BatchLimits,
}

impl HttpTranslationBackend {
    /// 根据配置创建后端
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;

        url::Url::parse(&config.api_url)?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            limits: BatchLimits::from(config),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl TranslationBackend for HttpTranslationBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn limits(&self) -> BatchLimits {
        self.limits
    }

    async fn translate(&self, request: TranslationRequest) -> TranslationResult<TranslationResponse> {
        tracing::debug!(
            "POST {} ({} 条文本, {} -> {})",
            self.api_url,
            request.texts.len(),
            request.from,
            request.to
        );

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::BackendError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(response.json::<TranslationResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_follow_config() {
        let config = TranslationConfig {
            max_items_per_batch: 7,
            max_chars_per_batch: 700,
            ..TranslationConfig::default()
        };
        let backend = HttpTranslationBackend::new(&config).unwrap();
        assert_eq!(backend.limits(), BatchLimits::new(7, 700));
        assert_eq!(backend.api_url(), config.api_url);
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let config = TranslationConfig {
            api_url: "not a url".to_string(),
            ..TranslationConfig::default()
        };
        assert!(HttpTranslationBackend::new(&config).is_err());
    }
}
