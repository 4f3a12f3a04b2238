//! 批量翻译引擎
//!
//! 把文档的全部翻译单元发送给翻译后端并写回译文：
//!
//! ## 工作流程
//! 1. 基于原文快照为每个单元生成标记文本（重复翻译结果一致）
//! 2. 按后端限制划分批次
//! 3. 以有限并发发送批次（`buffer_unordered`）
//! 4. 按批次序号重新排序，依文档顺序写回 DOM
//! 5. 任一批次失败时整体失败：设置错误标志，已写回的部分保持不变
//!
//! 每次写回之前都会检查窗口是否仍然存活，窗口关闭后的结果一律丢弃。

use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::time::{sleep, Duration};

use crate::frame::ContentWindow;
use crate::translation::config::{constants, TranslationConfig};
use crate::translation::core::document::{ApplyOutcome, TranslationDocument};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::batch::{Batch, BatchManager};
use crate::translation::pipeline::extractor::ItemId;
use crate::translation::services::backend::{
    TranslationBackend, TranslationRequest, TranslationResponse,
};

/// 批量翻译引擎
pub struct BatchingTranslator {
    backend: Arc<dyn TranslationBackend>,
    config: EngineConfig,
    stats: EngineStats,
}

impl BatchingTranslator {
    pub fn new(backend: Arc<dyn TranslationBackend>, config: EngineConfig) -> Self {
        Self {
            backend,
            config,
            stats: EngineStats::default(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn TranslationBackend> {
        &self.backend
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 翻译整个文档
    pub async fn translate(
        &self,
        document: &mut TranslationDocument,
        from: &str,
        to: &str,
    ) -> TranslationResult<TranslateReport> {
        let start = Instant::now();
        let window = document.window().clone();
        ensure_alive(&window)?;

        let texts: Vec<(ItemId, String)> = document
            .roots()
            .iter()
            .map(|&unit| (unit, document.generate_text_for_unit(unit)))
            .collect();

        let manager = BatchManager::new(self.backend.limits());
        let batches = manager.create_batches(texts);
        let mut report = TranslateReport {
            batches: batches.len(),
            units: batches.iter().map(Batch::len).sum(),
            ..Default::default()
        };

        if batches.is_empty() {
            tracing::info!("没有需要翻译的文本");
            return Ok(report);
        }

        tracing::info!(
            "开始翻译 {} -> {}: {} 个单元, {} 个批次 (后端: {})",
            from,
            to,
            report.units,
            batches.len(),
            self.backend.name()
        );

        let concurrency = self.config.max_concurrent_requests.max(1);
        let mut responses = stream::iter(batches.iter())
            .map(|batch| {
                let request = TranslationRequest {
                    texts: batch.texts.clone(),
                    from: from.to_string(),
                    to: to.to_string(),
                };
                self.stats.add_characters_sent(batch.estimated_chars);
                async move { (batch.id, self.submit(batch.id, request).await) }
            })
            .buffer_unordered(concurrency);

        // 按批次序号暂存，保证按文档顺序写回
        let mut ready: BTreeMap<usize, TranslationResponse> = BTreeMap::new();
        let mut next = 0;

        while let Some((id, result)) = responses.next().await {
            match result {
                Ok(response) => {
                    ready.insert(id, response);
                }
                Err(e) => {
                    self.stats.inc_translation_errors();
                    if !window.is_alive() {
                        tracing::debug!("窗口已关闭，忽略批次 {} 的错误: {}", id, e);
                        return Err(stale());
                    }
                    document.set_error(true);
                    return Err(e.with_context(format!("批次 {}", id)));
                }
            }

            ensure_alive(&window)?;

            while let Some(response) = ready.remove(&next) {
                self.apply_batch(document, &window, &batches[next], response, &mut report)?;
                next += 1;
            }
        }

        self.stats.add_processing_time(start.elapsed());
        tracing::info!(
            "翻译完成: {} 个单元还原, {} 个降级, {} 个缺失, 耗时 {:?}",
            report.reconstructed,
            report.degraded,
            report.missing,
            start.elapsed()
        );

        Ok(report)
    }

    /// 发送单个批次，可按配置重试
    async fn submit(
        &self,
        batch_id: usize,
        request: TranslationRequest,
    ) -> TranslationResult<TranslationResponse> {
        let max_attempts = self.config.max_retry_attempts + 1;
        let mut attempt = 0;

        loop {
            match self.backend.translate(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_attempts || !e.is_retryable() {
                        return Err(e);
                    }

                    let delay = backoff_delay(self.config.retry_delay_ms, attempt);
                    tracing::warn!(
                        "批次 {} 翻译失败，{}ms后重试 (尝试 {}/{}): {}",
                        batch_id,
                        delay.as_millis(),
                        attempt + 1,
                        max_attempts,
                        e
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    fn apply_batch(
        &self,
        document: &mut TranslationDocument,
        window: &ContentWindow,
        batch: &Batch,
        response: TranslationResponse,
        report: &mut TranslateReport,
    ) -> TranslationResult<()> {
        let received = response.translated_texts.len();
        if received != batch.len() {
            tracing::warn!(
                "批次 {} 期望 {} 条译文，实际收到 {} 条",
                batch.id,
                batch.len(),
                received
            );
        }

        let mut dom = window.write_dom()?;
        for (position, &unit) in batch.units.iter().enumerate() {
            match response.translated_texts.get(position) {
                Some(text) => {
                    self.stats.add_characters_received(text.chars().count());
                    match document.apply_translated_text(&mut dom, unit, text)? {
                        ApplyOutcome::Reconstructed => report.reconstructed += 1,
                        ApplyOutcome::Degraded { .. } => {
                            report.degraded += 1;
                            self.stats.inc_degraded_units();
                        }
                    }
                }
                None => {
                    document.degrade_unit(&mut dom, unit)?;
                    report.missing += 1;
                    self.stats.inc_missing_translations();
                }
            }
        }

        self.stats.inc_batches_processed();
        Ok(())
    }

    pub fn get_stats(&self) -> &EngineStats {
        &self.stats
    }
}

/// 指数退避：base_delay * 2^attempt，不超过 `MAX_RETRY_DELAY_MS`
fn backoff_delay(base_ms: u64, attempt: usize) -> Duration {
    let factor = u32::try_from(attempt)
        .ok()
        .and_then(|shift| 1u64.checked_shl(shift))
        .unwrap_or(u64::MAX);
    Duration::from_millis(
        base_ms
            .saturating_mul(factor)
            .min(constants::MAX_RETRY_DELAY_MS),
    )
}

fn stale() -> TranslationError {
    TranslationError::StaleOwner("翻译完成前窗口已关闭".to_string())
}

fn ensure_alive(window: &ContentWindow) -> TranslationResult<()> {
    if window.is_alive() {
        Ok(())
    } else {
        Err(stale())
    }
}

/// 一次翻译的结果汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateReport {
    pub batches: usize,
    pub units: usize,
    pub reconstructed: usize,
    pub degraded: usize,
    pub missing: usize,
}

/// 引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 失败后的重试次数（0 表示不重试）
    pub max_retry_attempts: usize,
    /// 重试的基础延迟（毫秒），实际延迟 = retry_delay_ms * 2^attempt，有上限
    pub retry_delay_ms: u64,
    /// 同时进行中的批次上限
    pub max_concurrent_requests: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: constants::DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: constants::DEFAULT_RETRY_DELAY_MS,
            max_concurrent_requests: constants::DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}

impl From<&TranslationConfig> for EngineConfig {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            max_retry_attempts: config.retry_attempts,
            retry_delay_ms: config.retry_delay_ms,
            max_concurrent_requests: config.max_concurrent_requests,
        }
    }
}

/// 翻译引擎统计信息（线程安全版本）
#[derive(Debug, Default)]
pub struct EngineStats {
    /// 已写回的批次总数
    pub batches_processed: AtomicUsize,
    /// 发送给后端的字符总数
    pub characters_sent: AtomicUsize,
    /// 从后端收到的字符总数
    pub characters_received: AtomicUsize,
    /// 最终失败的批次数（重试成功的不计）
    pub translation_errors: AtomicUsize,
    /// 后端未返回译文的单元数
    pub missing_translations: AtomicUsize,
    /// 结构无法还原而降级的单元数
    pub degraded_units: AtomicUsize,
    /// 总处理时间（微秒）
    pub total_processing_time: AtomicU64,
}

impl EngineStats {
    pub fn inc_batches_processed(&self) {
        self.batches_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_characters_sent(&self, count: usize) {
        self.characters_sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_characters_received(&self, count: usize) {
        self.characters_received.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_translation_errors(&self) {
        self.translation_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_missing_translations(&self) {
        self.missing_translations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_degraded_units(&self) {
        self.degraded_units.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_processing_time(&self, duration: std::time::Duration) {
        self.total_processing_time
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn get_batches_processed(&self) -> usize {
        self.batches_processed.load(Ordering::Relaxed)
    }

    pub fn get_translation_errors(&self) -> usize {
        self.translation_errors.load(Ordering::Relaxed)
    }
}
