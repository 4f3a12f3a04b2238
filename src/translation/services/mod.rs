//! 外部能力接口
//!
//! 语言检测、翻译后端、状态广播与可见性观察都通过构造函数注入
//! （`Arc<dyn Trait>`），核心逻辑不依赖具体实现。

pub mod backend;
pub mod broadcast;
pub mod detector;
#[cfg(feature = "http")]
pub mod http;
pub mod visibility;

pub use backend::{TranslationBackend, TranslationRequest, TranslationResponse};
pub use broadcast::{
    paths, BroadcastEvent, LoggingBroadcaster, MemoryBroadcaster, PatchOp, PatchOperation,
    StateBroadcaster, StateNotifier,
};
pub use detector::{DeclaredLanguageDetector, DetectedLanguage, LanguageDetector};
#[cfg(feature = "http")]
pub use http::HttpTranslationBackend;
pub use visibility::{
    GeometricVisibilityObserver, VisibilityObserver, VisibilityResolver, VisibilitySubscription,
};
