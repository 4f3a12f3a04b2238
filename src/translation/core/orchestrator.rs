//! 翻译编排器
//!
//! 每个 frame 由一个 `FrameTranslator` 管理，维护如下状态机：
//!
//! ```text
//! (初始) --非网页--> UNAVAILABLE
//! (初始) --网页--> DETECTING_LANGUAGE --样本过短/置信度低--> LANGUAGE_NOT_DETECTED
//!                                     --置信--> OFFER
//! OFFER / LANGUAGE_NOT_DETECTED --translate--> TRANSLATING --成功--> TRANSLATED
//!                                                         --失败--> ERROR
//! ```
//!
//! 显式的翻译请求自带语言对，因此在 UNAVAILABLE、TRANSLATED、ERROR 下同样接受，
//! 只有检测进行中会被拒绝。同一 frame 的翻译通过文档锁排队执行。
//!
//! `TranslationOrchestrator` 以 `FrameInfo` 为键保存全部控制器。

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::json;
use tokio::task::JoinHandle;
use url::Url;

use crate::frame::{ContentWindow, FrameInfo};
use crate::translation::config::TranslationConfig;
use crate::translation::core::document::TranslationDocument;
use crate::translation::core::engine::{BatchingTranslator, EngineConfig, EngineStats, TranslateReport};
use crate::translation::core::status::TranslationStatus;
use crate::translation::error::{helpers, TranslationError, TranslationResult};
use crate::translation::pipeline::extractor::NodeExtractor;
use crate::translation::services::backend::TranslationBackend;
use crate::translation::services::broadcast::{paths, PatchOperation, StateBroadcaster, StateNotifier};
use crate::translation::services::detector::{
    build_detection_sample, is_web_url, DetectedLanguage, LanguageDetector,
};
use crate::translation::services::visibility::{GeometricVisibilityObserver, VisibilityObserver};
use crate::translation::viewport::{ViewportReporter, ViewportStats};

/// 注入的外部能力
#[derive(Clone)]
pub struct TranslationCapabilities {
    pub detector: Arc<dyn LanguageDetector>,
    pub backend: Arc<dyn TranslationBackend>,
    pub broadcaster: Arc<dyn StateBroadcaster>,
    pub observer: Arc<dyn VisibilityObserver>,
}

impl TranslationCapabilities {
    /// 使用几何求交作为默认的可见性观察器
    pub fn new(
        detector: Arc<dyn LanguageDetector>,
        backend: Arc<dyn TranslationBackend>,
        broadcaster: Arc<dyn StateBroadcaster>,
    ) -> Self {
        Self {
            detector,
            backend,
            broadcaster,
            observer: Arc::new(GeometricVisibilityObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn VisibilityObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// 所有 frame 共享的服务
struct FrameServices {
    detector: Arc<dyn LanguageDetector>,
    engine: BatchingTranslator,
    notifier: StateNotifier,
    reporter: ViewportReporter,
    extractor: NodeExtractor,
    detection_sample_cap: usize,
    min_detection_chars: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 单个 frame 的翻译控制器
pub struct FrameTranslator {
    frame: FrameInfo,
    url: Url,
    window: ContentWindow,
    services: Arc<FrameServices>,
    status: Mutex<TranslationStatus>,
    detected: Mutex<Option<DetectedLanguage>>,
    last_report: Mutex<Option<TranslateReport>>,
    /// 已删除外部状态后不再发布任何更新
    detached: Mutex<bool>,
    /// 翻译模型；持锁期间其他翻译请求排队
    document: tokio::sync::Mutex<Option<TranslationDocument>>,
}

impl FrameTranslator {
    fn new(frame: FrameInfo, url: Url, window: ContentWindow, services: Arc<FrameServices>) -> Self {
        services.notifier.patch(
            frame,
            vec![PatchOperation::add(
                paths::TRANSLATION_STATUS,
                json!(TranslationStatus::Unavailable),
            )],
        );

        Self {
            frame,
            url,
            window,
            services,
            status: Mutex::new(TranslationStatus::Unavailable),
            detected: Mutex::new(None),
            last_report: Mutex::new(None),
            detached: Mutex::new(false),
            document: tokio::sync::Mutex::new(None),
        }
    }

    pub fn frame(&self) -> FrameInfo {
        self.frame
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn window(&self) -> &ContentWindow {
        &self.window
    }

    pub fn status(&self) -> TranslationStatus {
        *lock(&self.status)
    }

    pub fn detected_language(&self) -> Option<DetectedLanguage> {
        lock(&self.detected).clone()
    }

    pub fn last_report(&self) -> Option<TranslateReport> {
        lock(&self.last_report).clone()
    }

    fn set_status(&self, status: TranslationStatus) {
        let mut current = lock(&self.status);
        *current = status;
        self.publish_status(status);
    }

    /// 检查与切换在同一把锁内完成，并发请求只有一个能通过
    fn transition(
        &self,
        allowed: impl FnOnce(TranslationStatus) -> bool,
        next: TranslationStatus,
        action: &str,
    ) -> TranslationResult<()> {
        let mut current = lock(&self.status);
        if !allowed(*current) {
            return Err(helpers::state_error(format!("{} 状态下不能{}", *current, action)));
        }
        *current = next;
        self.publish_status(next);
        Ok(())
    }

    fn publish_status(&self, status: TranslationStatus) {
        tracing::debug!("[{}] 状态 -> {}", self.frame, status);
        self.publish(vec![PatchOperation::replace(
            paths::TRANSLATION_STATUS,
            json!(status),
        )]);
    }

    fn publish(&self, patches: Vec<PatchOperation>) {
        let detached = lock(&self.detached);
        if !*detached {
            self.services.notifier.patch(self.frame, patches);
        }
    }

    /// 关闭窗口并删除外部状态，只执行一次
    fn detach(&self) {
        let mut detached = lock(&self.detached);
        if *detached {
            return;
        }
        *detached = true;
        self.window.close();
        self.services.notifier.delete(self.frame);
    }

    /// 窗口已关闭：丢弃结果并删除外部状态
    fn discard(&self, operation: &str) {
        tracing::debug!("[{}] 窗口已关闭，丢弃{}结果", self.frame, operation);
        self.detach();
    }

    /// 检测页面语言
    ///
    /// 返回 `Ok(None)` 表示窗口已关闭、结果被丢弃。
    pub async fn detect_language(&self) -> TranslationResult<Option<TranslationStatus>> {
        if !is_web_url(&self.url) {
            tracing::debug!("[{}] {} 不是网页，跳过语言检测", self.frame, self.url);
            self.set_status(TranslationStatus::Unavailable);
            return Ok(Some(TranslationStatus::Unavailable));
        }

        if !self.window.is_alive() {
            self.discard("语言检测");
            return Ok(None);
        }

        self.transition(
            |current| {
                !matches!(
                    current,
                    TranslationStatus::DetectingLanguage | TranslationStatus::Translating
                )
            },
            TranslationStatus::DetectingLanguage,
            "开始检测",
        )?;

        let sample = match self.detection_sample() {
            Ok(sample) => sample,
            Err(e) => {
                self.set_status(TranslationStatus::LanguageNotDetected);
                return Err(e);
            }
        };

        let length = sample.chars().count();
        if length < self.services.min_detection_chars {
            tracing::debug!(
                "[{}] 检测样本只有 {} 个字符，不调用检测器",
                self.frame,
                length
            );
            self.set_status(TranslationStatus::LanguageNotDetected);
            return Ok(Some(TranslationStatus::LanguageNotDetected));
        }

        let result = self.services.detector.detect_language(&sample).await;

        if !self.window.is_alive() {
            self.discard("语言检测");
            return Ok(None);
        }

        match result {
            Ok(detected) => {
                tracing::info!(
                    "[{}] 检测到语言 {} (置信: {})",
                    self.frame,
                    detected.language,
                    detected.confident
                );
                self.publish(vec![PatchOperation::add(
                    paths::DETECTED_LANGUAGE_RESULTS,
                    serde_json::to_value(&detected)?,
                )]);

                let status = if detected.confident {
                    TranslationStatus::Offer
                } else {
                    TranslationStatus::LanguageNotDetected
                };
                *lock(&self.detected) = Some(detected);
                self.set_status(status);
                Ok(Some(status))
            }
            Err(e) => {
                tracing::warn!("[{}] 语言检测失败: {}", self.frame, e);
                self.set_status(TranslationStatus::LanguageNotDetected);
                Err(e)
            }
        }
    }

    fn detection_sample(&self) -> TranslationResult<String> {
        let snapshot = TranslationDocument::new(self.window.clone(), &self.services.extractor)?;
        Ok(build_detection_sample(
            snapshot
                .roots()
                .iter()
                .map(|&unit| snapshot.generate_plain_text(unit)),
            self.services.detection_sample_cap,
        ))
    }

    /// 翻译整个 frame
    ///
    /// 返回 `Ok(None)` 表示窗口已关闭、结果被丢弃。
    pub async fn translate(&self, from: &str, to: &str) -> TranslationResult<Option<TranslationStatus>> {
        if from.trim().is_empty() || to.trim().is_empty() {
            return Err(TranslationError::InvalidInput("语言对不能为空".to_string()));
        }
        self.check_translate_allowed()?;

        let mut slot = self.document.lock().await;

        if !self.window.is_alive() {
            self.discard("翻译");
            return Ok(None);
        }

        if slot.is_none() {
            *slot = Some(TranslationDocument::new(
                self.window.clone(),
                &self.services.extractor,
            )?);
        }
        let Some(document) = slot.as_mut() else {
            return Err(helpers::internal_error("翻译模型缺失"));
        };

        self.transition(
            TranslationStatus::accepts_translate,
            TranslationStatus::Translating,
            "翻译",
        )?;
        document.set_languages(from, to);
        document.set_error(false);

        match self.services.engine.translate(document, from, to).await {
            Ok(report) => {
                if !self.window.is_alive() {
                    self.discard("翻译");
                    return Ok(None);
                }
                *lock(&self.last_report) = Some(report);
                self.set_status(TranslationStatus::Translated);
                Ok(Some(TranslationStatus::Translated))
            }
            Err(e) if e.is_stale() => {
                self.discard("翻译");
                Ok(None)
            }
            Err(e) => {
                helpers::log_error(&e);
                self.set_status(TranslationStatus::Error);
                Err(e)
            }
        }
    }

    fn check_translate_allowed(&self) -> TranslationResult<()> {
        let status = self.status();
        if status.accepts_translate() {
            Ok(())
        } else {
            Err(helpers::state_error(format!("{} 状态下不能翻译", status)))
        }
    }

    /// 恢复原文
    pub async fn show_original(&self) -> TranslationResult<()> {
        self.toggle(false).await
    }

    /// 重新显示译文
    pub async fn show_translation(&self) -> TranslationResult<()> {
        self.toggle(true).await
    }

    async fn toggle(&self, translated: bool) -> TranslationResult<()> {
        let mut slot = self.document.lock().await;
        let Some(document) = slot.as_mut() else {
            return Err(helpers::state_error("页面尚未翻译"));
        };
        if !self.window.is_alive() {
            return Err(TranslationError::StaleOwner(format!("{}", self.frame)));
        }

        let mut dom = self.window.write_dom()?;
        if translated {
            document.show_translation(&mut dom);
        } else {
            document.show_original(&mut dom);
        }
        Ok(())
    }

    /// 统计视口词数并发布
    ///
    /// 返回 `Ok(None)` 表示窗口已关闭、结果被丢弃。
    pub async fn report_statistics(&self) -> TranslationResult<Option<ViewportStats>> {
        let slot = self.document.lock().await;
        let result = match slot.as_ref() {
            Some(document) => self.services.reporter.report(document).await,
            None => {
                let snapshot =
                    TranslationDocument::new(self.window.clone(), &self.services.extractor)?;
                self.services.reporter.report(&snapshot).await
            }
        };

        match result {
            Ok(stats) => {
                self.publish(stats.to_patches());
                Ok(Some(stats))
            }
            Err(e) if e.is_stale() => {
                self.discard("视口统计");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// frame 被销毁或载入了新文档
    ///
    /// 之后仍在进行的操作只会丢弃结果，不会再触碰外部状态。
    pub fn tear_down(&self) {
        self.detach();
    }
}

/// 翻译编排器：按 frame 管理翻译控制器
pub struct TranslationOrchestrator {
    services: Arc<FrameServices>,
    frames: DashMap<FrameInfo, Arc<FrameTranslator>>,
    dispatcher: JoinHandle<()>,
}

impl TranslationOrchestrator {
    /// 创建编排器，需要在 tokio 运行时中调用
    pub fn new(capabilities: TranslationCapabilities, config: &TranslationConfig) -> TranslationResult<Self> {
        config.validate()?;
        let (notifier, dispatcher) = StateNotifier::spawn(capabilities.broadcaster)?;

        let services = FrameServices {
            detector: capabilities.detector,
            engine: BatchingTranslator::new(capabilities.backend, EngineConfig::from(config)),
            notifier,
            reporter: ViewportReporter::new(capabilities.observer),
            extractor: NodeExtractor::new(),
            detection_sample_cap: config.detection_sample_cap,
            min_detection_chars: config.min_detection_chars,
        };

        Ok(Self {
            services: Arc::new(services),
            frames: DashMap::new(),
            dispatcher,
        })
    }

    /// 注册 frame；同一窗口重复注册时返回已有控制器
    ///
    /// 载入新文档时先销毁原控制器，其删除通知排在新控制器的初始状态之前。
    pub fn attach_frame(
        &self,
        frame: FrameInfo,
        url: &str,
        window: ContentWindow,
    ) -> TranslationResult<Arc<FrameTranslator>> {
        let url = Url::parse(url)?;

        match self.frames.entry(frame) {
            Entry::Occupied(mut entry) => {
                if entry.get().window().id() == window.id() {
                    return Ok(entry.get().clone());
                }
                tracing::debug!("[{}] 加载了新文档，替换原有控制器", frame);
                entry.get().tear_down();

                let controller = Arc::new(FrameTranslator::new(
                    frame,
                    url,
                    window,
                    self.services.clone(),
                ));
                entry.insert(controller.clone());
                Ok(controller)
            }
            Entry::Vacant(entry) => {
                let controller = Arc::new(FrameTranslator::new(
                    frame,
                    url,
                    window,
                    self.services.clone(),
                ));
                entry.insert(controller.clone());
                Ok(controller)
            }
        }
    }

    pub fn frame(&self, frame: &FrameInfo) -> Option<Arc<FrameTranslator>> {
        self.frames.get(frame).map(|entry| entry.value().clone())
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn status(&self, frame: &FrameInfo) -> Option<TranslationStatus> {
        self.frame(frame).map(|controller| controller.status())
    }

    fn controller(&self, frame: &FrameInfo) -> TranslationResult<Arc<FrameTranslator>> {
        self.frame(frame)
            .ok_or_else(|| TranslationError::InvalidInput(format!("未知的 frame: {}", frame)))
    }

    /// 结果被丢弃时注销对应的控制器
    fn forget_if_stale<T>(&self, controller: &Arc<FrameTranslator>, result: &TranslationResult<Option<T>>) {
        if matches!(result, Ok(None)) {
            self.frames
                .remove_if(&controller.frame(), |_, current| Arc::ptr_eq(current, controller));
        }
    }

    pub async fn detect_language(&self, frame: &FrameInfo) -> TranslationResult<Option<TranslationStatus>> {
        let controller = self.controller(frame)?;
        let result = controller.detect_language().await;
        self.forget_if_stale(&controller, &result);
        result
    }

    pub async fn translate(
        &self,
        frame: &FrameInfo,
        from: &str,
        to: &str,
    ) -> TranslationResult<Option<TranslationStatus>> {
        let controller = self.controller(frame)?;
        let result = controller.translate(from, to).await;
        self.forget_if_stale(&controller, &result);
        result
    }

    pub async fn show_original(&self, frame: &FrameInfo) -> TranslationResult<()> {
        self.controller(frame)?.show_original().await
    }

    pub async fn show_translation(&self, frame: &FrameInfo) -> TranslationResult<()> {
        self.controller(frame)?.show_translation().await
    }

    pub async fn report_statistics(&self, frame: &FrameInfo) -> TranslationResult<Option<ViewportStats>> {
        let controller = self.controller(frame)?;
        let result = controller.report_statistics().await;
        self.forget_if_stale(&controller, &result);
        result
    }

    /// frame 被销毁：关闭窗口并删除外部状态
    pub fn tear_down_frame(&self, frame: &FrameInfo) {
        if let Some((_, controller)) = self.frames.remove(frame) {
            controller.tear_down();
        }
    }

    /// 等待已入队的状态通知全部送达
    pub async fn flush_notifications(&self) {
        self.services.notifier.flush().await;
    }

    pub fn engine_stats(&self) -> &EngineStats {
        self.services.engine.get_stats()
    }
}

impl Drop for TranslationOrchestrator {
    fn drop(&mut self) {
        // 控制器仍持有通知发送端，分发任务不会自行退出
        self.dispatcher.abort();
    }
}
