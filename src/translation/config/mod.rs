//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, TranslationConfig};

/// 配置常量
pub mod constants {
    // 语言检测相关
    /// 检测样本的最大字节数
    pub const DETECTION_SAMPLE_CAP: usize = 60 * 1024;
    /// 低于该字符数的样本不做检测
    pub const MIN_DETECTION_CHARS: usize = 100;

    // 批次处理相关
    pub const DEFAULT_MAX_ITEMS_PER_BATCH: usize = 100;
    pub const DEFAULT_MAX_CHARS_PER_BATCH: usize = 9000;
    pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;
    pub const DEFAULT_RETRY_ATTEMPTS: usize = 0;
    pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
    /// 重试次数上限
    pub const MAX_RETRY_ATTEMPTS: usize = 10;
    /// 单次退避等待的上限
    pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

    // 默认API设置
    pub const DEFAULT_API_URL: &str = "http://localhost:1188/translate";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_TARGET_LANG: &str = "zh";
    pub const DEFAULT_SOURCE_LANG: &str = "auto";

    /// 环境变量前缀
    pub const ENV_PREFIX: &str = "PAGE_TRANSLATOR";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "page-translator.toml",
        ".page-translator.toml",
        "~/.config/page-translator/config.toml",
        "/etc/page-translator/config.toml",
    ];
}
