// 集成测试公共模块
//
// 提供可编排的翻译后端、语言检测器以及 HTML 辅助工具

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use page_translator::parsers::html::{parse_html, serialize_children};
use page_translator::translation::pipeline::BatchLimits;
use page_translator::translation::services::{
    DetectedLanguage, LanguageDetector, MemoryBroadcaster, TranslationBackend, TranslationRequest,
    TranslationResponse,
};
use page_translator::translation::{
    TranslationCapabilities, TranslationConfig, TranslationError, TranslationOrchestrator,
    TranslationResult,
};
use page_translator::{ContentWindow, FrameInfo, Viewport};

type TranslateFn = dyn Fn(&str, &str) -> String + Send + Sync;

/// 按闭包逐条翻译的后端，可选地在每次请求前等待放行
pub struct ScriptedBackend {
    translate: Box<TranslateFn>,
    limits: BatchLimits,
    gate: Option<Semaphore>,
    calls: AtomicUsize,
    requests: Mutex<Vec<TranslationRequest>>,
    omit_last: bool,
}

impl ScriptedBackend {
    pub fn new<F>(translate: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        Self {
            translate: Box::new(translate),
            limits: BatchLimits::default(),
            gate: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            omit_last: false,
        }
    }

    /// 原样返回（保留全部标记）
    pub fn echo() -> Self {
        Self::new(|text, _| text.to_string())
    }

    /// 在译文后追加目标语言
    pub fn tagging() -> Self {
        Self::new(|text, to| format!("{} [{}]", text, to))
    }

    pub fn with_limits(mut self, max_items: usize, max_chars: usize) -> Self {
        self.limits = BatchLimits::new(max_items, max_chars);
        self
    }

    /// 请求需要 `release` 放行后才返回
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// 每个批次都丢掉最后一条译文
    pub fn omitting_last(mut self) -> Self {
        self.omit_last = true;
        self
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TranslationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// 等待后端至少收到 `count` 次请求
    pub async fn wait_for_calls(&self, count: usize) {
        while self.calls() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl TranslationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn limits(&self) -> BatchLimits {
        self.limits
    }

    async fn translate(&self, request: TranslationRequest) -> TranslationResult<TranslationResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| TranslationError::InternalError(e.to_string()))?
                .forget();
        }

        let mut translated_texts: Vec<String> = request
            .texts
            .iter()
            .map(|text| (self.translate)(text, &request.to))
            .collect();
        if self.omit_last {
            translated_texts.pop();
        }

        Ok(TranslationResponse { translated_texts })
    }
}

/// 总是失败的后端
#[derive(Default)]
pub struct RejectingBackend {
    calls: AtomicUsize,
}

impl RejectingBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationBackend for RejectingBackend {
    fn name(&self) -> &str {
        "rejecting"
    }

    fn limits(&self) -> BatchLimits {
        BatchLimits::default()
    }

    async fn translate(&self, _request: TranslationRequest) -> TranslationResult<TranslationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TranslationError::BackendError("service unavailable".to_string()))
    }
}

/// 返回预设结果的检测器
pub struct ScriptedDetector {
    result: DetectedLanguage,
    gate: Option<Semaphore>,
    calls: AtomicUsize,
    samples: Mutex<Vec<String>>,
}

impl ScriptedDetector {
    pub fn confident(language: &str) -> Self {
        Self::returning(DetectedLanguage::confident(language))
    }

    pub fn uncertain(language: &str) -> Self {
        Self::returning(DetectedLanguage::uncertain(language))
    }

    fn returning(result: DetectedLanguage) -> Self {
        Self {
            result,
            gate: None,
            calls: AtomicUsize::new(0),
            samples: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> Vec<String> {
        self.samples.lock().unwrap().clone()
    }

    pub async fn wait_for_calls(&self, count: usize) {
        while self.calls() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl LanguageDetector for ScriptedDetector {
    async fn detect_language(&self, text: &str) -> TranslationResult<DetectedLanguage> {
        self.samples.lock().unwrap().push(text.to_string());
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| TranslationError::InternalError(e.to_string()))?
                .forget();
        }
        Ok(self.result.clone())
    }
}

/// 测试环境：编排器加上记录状态的广播器
pub struct TestEnvironment {
    pub orchestrator: TranslationOrchestrator,
    pub broadcaster: Arc<MemoryBroadcaster>,
    pub frame: FrameInfo,
}

impl TestEnvironment {
    pub fn new(detector: Arc<dyn LanguageDetector>, backend: Arc<dyn TranslationBackend>) -> Self {
        Self::with_config(detector, backend, &TranslationConfig::default())
    }

    pub fn with_config(
        detector: Arc<dyn LanguageDetector>,
        backend: Arc<dyn TranslationBackend>,
        config: &TranslationConfig,
    ) -> Self {
        let broadcaster = Arc::new(MemoryBroadcaster::new());
        let capabilities = TranslationCapabilities::new(detector, backend, broadcaster.clone());
        let orchestrator = TranslationOrchestrator::new(capabilities, config)
            .expect("orchestrator should start inside a tokio runtime");

        Self {
            orchestrator,
            broadcaster,
            frame: FrameInfo::new(1, 0),
        }
    }

    /// 注册页面并返回其窗口
    pub fn attach(&self, url: &str, html: &str) -> ContentWindow {
        let window = HtmlTestHelper::window(html);
        self.orchestrator
            .attach_frame(self.frame, url, window.clone())
            .expect("frame should attach");
        window
    }

    pub async fn status_history(&self) -> Vec<String> {
        self.orchestrator.flush_notifications().await;
        self.broadcaster.status_history(&self.frame)
    }
}

/// HTML 测试辅助工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn window(html: &str) -> ContentWindow {
        let dom = parse_html(html).expect("test html should parse");
        ContentWindow::new(dom, Viewport::default())
    }

    /// 当前 body 的序列化结果
    pub fn body_html(window: &ContentWindow) -> String {
        let dom = window.read_dom().unwrap();
        serialize_children(&dom, dom.body()).unwrap()
    }

    /// 文本总量超过检测下限的英文页面
    pub fn long_english_page() -> String {
        r#"<!DOCTYPE html>
<html lang="en">
<head><title>Field notes</title><style>p { color: red; }</style></head>
<body>
  <h1>Field notes from the northern coast</h1>
  <p>The tide came in early this morning, and the <a href="/birds">shore birds</a> moved up the beach.</p>
  <p>We counted <b>forty</b> gulls, <i>twelve</i> terns and a single heron standing in the reeds.</p>
  <script>var ignored = "not translated";</script>
</body>
</html>"#
            .to_string()
    }

    pub fn short_page() -> String {
        "<html><body><p>Hi there</p></body></html>".to_string()
    }
}
