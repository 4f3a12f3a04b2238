//! 状态广播
//!
//! 核心只写不读：每次状态变化都生成一组 JSON patch，放入无界队列，
//! 由单独的分发任务逐条交给 `StateBroadcaster`。这样即使同一时刻
//! 发生多次转换，订阅方也能依次观察到每一个状态。

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::frame::FrameInfo;
use crate::translation::error::{TranslationError, TranslationResult};

/// patch 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
}

/// 单条 JSON patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    pub value: Value,
}

impl PatchOperation {
    pub fn add(path: &str, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.to_string(),
            value,
        }
    }

    pub fn replace(path: &str, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.to_string(),
            value,
        }
    }
}

/// 状态存储使用的路径
pub mod paths {
    pub const TRANSLATION_STATUS: &str = "/translationStatus";
    pub const DETECTED_LANGUAGE_RESULTS: &str = "/detectedLanguageResults";
    pub const WORD_COUNT: &str = "/wordCount";
    pub const WORD_COUNT_IN_VIEWPORT: &str = "/wordCountInViewport";
    pub const WORD_COUNT_VISIBLE_IN_VIEWPORT: &str = "/wordCountVisibleInViewport";
}

/// 外部状态存储
pub trait StateBroadcaster: Send + Sync {
    fn patch_state_by_frame(&self, frame: &FrameInfo, patches: Vec<PatchOperation>);
    fn delete_state_by_frame(&self, frame: &FrameInfo);
}

/// 队列中的消息
#[derive(Debug)]
pub enum StateMessage {
    Patch {
        frame: FrameInfo,
        patches: Vec<PatchOperation>,
    },
    Delete {
        frame: FrameInfo,
    },
    /// 之前的消息全部送达后回应
    Flush(oneshot::Sender<()>),
}

/// 状态通知队列的发送端
#[derive(Debug, Clone)]
pub struct StateNotifier {
    sender: mpsc::UnboundedSender<StateMessage>,
}

impl StateNotifier {
    /// 启动分发任务，需要在 tokio 运行时中调用
    pub fn spawn(broadcaster: Arc<dyn StateBroadcaster>) -> TranslationResult<(Self, JoinHandle<()>)> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| TranslationError::InternalError(format!("没有可用的 tokio 运行时: {}", e)))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let task = handle.spawn(dispatch(receiver, broadcaster));

        Ok((Self { sender }, task))
    }

    pub fn patch(&self, frame: FrameInfo, patches: Vec<PatchOperation>) {
        if self.sender.send(StateMessage::Patch { frame, patches }).is_err() {
            tracing::debug!("状态分发任务已结束，丢弃 {} 的更新", frame);
        }
    }

    pub fn delete(&self, frame: FrameInfo) {
        if self.sender.send(StateMessage::Delete { frame }).is_err() {
            tracing::debug!("状态分发任务已结束，丢弃 {} 的删除", frame);
        }
    }

    /// 等待已入队的消息全部送达
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(StateMessage::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

async fn dispatch(
    mut receiver: mpsc::UnboundedReceiver<StateMessage>,
    broadcaster: Arc<dyn StateBroadcaster>,
) {
    while let Some(message) = receiver.recv().await {
        match message {
            StateMessage::Patch { frame, patches } => {
                broadcaster.patch_state_by_frame(&frame, patches);
            }
            StateMessage::Delete { frame } => broadcaster.delete_state_by_frame(&frame),
            StateMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
        // 每条消息之间让出执行权
        tokio::task::yield_now().await;
    }
    tracing::debug!("状态分发任务退出");
}

/// 广播记录
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastEvent {
    Patch {
        frame: FrameInfo,
        patches: Vec<PatchOperation>,
    },
    Delete {
        frame: FrameInfo,
    },
}

/// 把收到的状态写入内存的广播器，供宿主轮询或测试断言
#[derive(Debug, Default)]
pub struct MemoryBroadcaster {
    events: Mutex<Vec<BroadcastEvent>>,
}

impl MemoryBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BroadcastEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// 某个 frame 依次收到的 `/translationStatus` 值
    pub fn status_history(&self, frame: &FrameInfo) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                BroadcastEvent::Patch { frame: f, patches } if f == *frame => Some(patches),
                _ => None,
            })
            .flatten()
            .filter(|patch| patch.path == paths::TRANSLATION_STATUS)
            .filter_map(|patch| patch.value.as_str().map(str::to_string))
            .collect()
    }

    /// 某个路径最后一次写入的值
    pub fn latest(&self, frame: &FrameInfo, path: &str) -> Option<Value> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                BroadcastEvent::Patch { frame: f, patches } if f == *frame => Some(patches),
                _ => None,
            })
            .flatten()
            .filter(|patch| patch.path == path)
            .last()
            .map(|patch| patch.value)
    }

    pub fn was_deleted(&self, frame: &FrameInfo) -> bool {
        self.events()
            .iter()
            .any(|event| matches!(event, BroadcastEvent::Delete { frame: f } if f == frame))
    }

    fn record(&self, event: BroadcastEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl StateBroadcaster for MemoryBroadcaster {
    fn patch_state_by_frame(&self, frame: &FrameInfo, patches: Vec<PatchOperation>) {
        self.record(BroadcastEvent::Patch {
            frame: *frame,
            patches,
        });
    }

    fn delete_state_by_frame(&self, frame: &FrameInfo) {
        self.record(BroadcastEvent::Delete { frame: *frame });
    }
}

/// 以 tracing 日志输出状态变化
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBroadcaster;

impl StateBroadcaster for LoggingBroadcaster {
    fn patch_state_by_frame(&self, frame: &FrameInfo, patches: Vec<PatchOperation>) {
        for patch in patches {
            tracing::info!("[{}] {} = {}", frame, patch.path, patch.value);
        }
    }

    fn delete_state_by_frame(&self, frame: &FrameInfo) {
        tracing::info!("[{}] 状态已删除", frame);
    }
}
