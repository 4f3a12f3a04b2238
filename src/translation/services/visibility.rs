//! 可见性观察
//!
//! 宿主通过 `VisibilityObserver` 报告哪些节点在视觉上与视口相交。
//! 订阅只产生一个值：收到第一次结果后即失效，丢弃订阅同样会使其失效。

use std::collections::HashSet;

use tokio::sync::oneshot;

use crate::frame::ContentWindow;
use crate::parsers::html::NodeId;

/// 一次性可见性订阅（接收端）
#[derive(Debug)]
pub struct VisibilitySubscription {
    receiver: oneshot::Receiver<HashSet<NodeId>>,
}

/// 一次性可见性订阅（发送端）
#[derive(Debug)]
pub struct VisibilityResolver {
    sender: oneshot::Sender<HashSet<NodeId>>,
}

impl VisibilitySubscription {
    pub fn channel() -> (VisibilityResolver, VisibilitySubscription) {
        let (sender, receiver) = oneshot::channel();
        (VisibilityResolver { sender }, VisibilitySubscription { receiver })
    }

    /// 立即给出结果的订阅
    pub fn resolved(visible: HashSet<NodeId>) -> Self {
        let (resolver, subscription) = Self::channel();
        resolver.resolve(visible);
        subscription
    }

    /// 等待第一次结果；观察方放弃时视为没有可见节点
    pub async fn first(self) -> HashSet<NodeId> {
        self.receiver.await.unwrap_or_default()
    }
}

impl VisibilityResolver {
    /// 发送结果（仅一次）
    pub fn resolve(self, visible: HashSet<NodeId>) {
        if self.sender.send(visible).is_err() {
            tracing::trace!("可见性订阅已被丢弃");
        }
    }

    /// 订阅方是否已经放弃
    pub fn is_disposed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// 可见性观察器
pub trait VisibilityObserver: Send + Sync {
    fn observe(&self, window: &ContentWindow, nodes: Vec<NodeId>) -> VisibilitySubscription;
}

/// 用布局矩形与视口求交的默认实现
#[derive(Debug, Default, Clone, Copy)]
pub struct GeometricVisibilityObserver;

impl VisibilityObserver for GeometricVisibilityObserver {
    fn observe(&self, window: &ContentWindow, nodes: Vec<NodeId>) -> VisibilitySubscription {
        let viewport = window.viewport().rect();
        let visible = match window.read_dom() {
            Ok(dom) => nodes
                .into_iter()
                .filter(|&node| {
                    dom.layout(node)
                        .is_some_and(|rect| rect.intersects(&viewport))
                })
                .collect(),
            Err(e) => {
                tracing::warn!("读取布局失败: {}", e);
                HashSet::new()
            }
        };
        VisibilitySubscription::resolved(visible)
    }
}
