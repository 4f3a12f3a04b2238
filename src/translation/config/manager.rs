//! 简化的配置管理器
//!
//! 配置来源按优先级从低到高：默认值 → 配置文件（TOML）→ `.env` → 环境变量

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use super::constants;
use crate::env::{core::ConfigPath, EnvVar};
use crate::translation::error::{TranslationError, TranslationResult};

/// 简化的翻译配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 基础配置
    pub target_lang: String,
    pub source_lang: String,
    pub api_url: String,

    // 批次与并发
    pub max_items_per_batch: usize,
    pub max_chars_per_batch: usize,
    pub max_concurrent_requests: usize,
    pub retry_attempts: usize,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,

    // 语言检测
    pub detection_sample_cap: usize,
    pub min_detection_chars: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            source_lang: constants::DEFAULT_SOURCE_LANG.to_string(),
            api_url: constants::DEFAULT_API_URL.to_string(),

            max_items_per_batch: constants::DEFAULT_MAX_ITEMS_PER_BATCH,
            max_chars_per_batch: constants::DEFAULT_MAX_CHARS_PER_BATCH,
            max_concurrent_requests: constants::DEFAULT_MAX_CONCURRENT_REQUESTS,
            retry_attempts: constants::DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: constants::DEFAULT_RETRY_DELAY_MS,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,

            detection_sample_cap: constants::DETECTION_SAMPLE_CAP,
            min_detection_chars: constants::MIN_DETECTION_CHARS,
        }
    }
}

impl TranslationConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.target_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError("目标语言不能为空".to_string()));
        }

        if self.max_items_per_batch == 0 || self.max_chars_per_batch == 0 {
            return Err(TranslationError::ConfigError("批次大小不能为0".to_string()));
        }

        if self.max_concurrent_requests == 0 {
            return Err(TranslationError::ConfigError("最大并发数不能为0".to_string()));
        }

        if self.retry_attempts > constants::MAX_RETRY_ATTEMPTS {
            return Err(TranslationError::ConfigError(format!(
                "重试次数不能超过{}",
                constants::MAX_RETRY_ATTEMPTS
            )));
        }

        if self.min_detection_chars > self.detection_sample_cap {
            return Err(TranslationError::ConfigError(
                "检测样本上限不能小于最小检测长度".to_string(),
            ));
        }

        url::Url::parse(&self.api_url)
            .map_err(|e| TranslationError::ConfigError(format!("API URL 无效: {}", e)))?;

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 简化的配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: TranslationConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 按默认搜索路径创建配置管理器
    pub fn new() -> TranslationResult<Self> {
        Self::load_dotenv();

        let explicit = ConfigPath::get().ok();
        let path = explicit.or_else(Self::find_config_file);
        Self::build(path.as_deref())
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(path: &str) -> TranslationResult<Self> {
        Self::load_dotenv();

        let expanded = shellexpand::tilde(path).to_string();
        if !Path::new(&expanded).exists() {
            return Err(TranslationError::ConfigError(format!(
                "配置文件不存在: {}",
                expanded
            )));
        }
        Self::build(Some(&expanded))
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    /// 实际加载的配置文件
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 以当前配置为基础覆盖目标语言与 API 地址
    pub fn create_simple_config(&self, target_lang: &str, api_url: Option<&str>) -> TranslationConfig {
        let mut config = self.config.clone();
        config.target_lang = target_lang.to_string();
        if let Some(url) = api_url {
            config.api_url = url.to_string();
        }
        config
    }

    fn find_config_file() -> Option<String> {
        constants::CONFIG_PATHS
            .iter()
            .map(|path| shellexpand::tilde(path).to_string())
            .find(|path| Path::new(path).exists())
    }

    fn build(path: Option<&str>) -> TranslationResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&TranslationConfig::default())?);

        if let Some(path) = path {
            tracing::info!("加载配置文件: {}", path);
            builder = builder.add_source(File::with_name(path));
        } else {
            tracing::debug!("未找到配置文件，使用默认配置");
        }

        // 添加环境变量覆盖（启用类型转换）
        builder = builder.add_source(
            Environment::with_prefix(constants::ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config: TranslationConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(Self {
            config,
            source: path.map(PathBuf::from),
        })
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TranslationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detection_sample_cap, 60 * 1024);
        assert_eq!(config.min_detection_chars, 100);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = TranslationConfig {
            max_concurrent_requests: 0,
            ..TranslationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TranslationError::ConfigError(_))
        ));
    }

    #[test]
    fn test_validate_bounds_retry_attempts() {
        let config = TranslationConfig {
            retry_attempts: constants::MAX_RETRY_ATTEMPTS,
            ..TranslationConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = TranslationConfig {
            retry_attempts: 64,
            ..TranslationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TranslationError::ConfigError(_))
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TranslationConfig =
            toml::from_str("target_lang = \"fr\"\nmax_items_per_batch = 5\n").unwrap();
        assert_eq!(config.target_lang, "fr");
        assert_eq!(config.max_items_per_batch, 5);
        assert_eq!(config.max_chars_per_batch, constants::DEFAULT_MAX_CHARS_PER_BATCH);
    }

    #[test]
    fn test_example_config_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "page-translator-example-{}.toml",
            std::process::id()
        ));
        let path_str = path.to_string_lossy().to_string();

        ConfigManager::generate_example_config(&path_str).unwrap();
        let manager = ConfigManager::from_file(&path_str).unwrap();
        assert_eq!(manager.get_config().api_url, constants::DEFAULT_API_URL);
        assert_eq!(manager.source_path(), Some(path.as_path()));

        let _ = std::fs::remove_file(path);
    }
}
