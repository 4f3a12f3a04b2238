//! 浏览上下文（frame）相关的基础类型
//!
//! `FrameInfo` 是外部状态存储使用的不透明键；`ContentWindow` 持有
//! 一份共享的 DOM 竞技场、视口信息以及“所有者存活”标志。翻译过程中的
//! 每个挂起点之后都要检查该标志，窗口关闭后到达的结果一律丢弃。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::parsers::html::{Dom, Rect};
use crate::translation::error::{TranslationError, TranslationResult};

/// 标识一个标签页内的浏览上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub tab_id: u64,
    pub frame_id: u64,
}

impl FrameInfo {
    pub fn new(tab_id: u64, frame_id: u64) -> Self {
        Self { tab_id, frame_id }
    }
}

impl std::fmt::Display for FrameInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab {} / frame {}", self.tab_id, self.frame_id)
    }
}

/// 视口（窗口尺寸与滚动位置）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// 视口在文档坐标系中的矩形
    pub fn rect(&self) -> Rect {
        Rect::new(self.scroll_x, self.scroll_y, self.width, self.height)
    }
}

/// 共享的 DOM 竞技场
pub type SharedDom = Arc<RwLock<Dom>>;

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

/// 内容窗口：一个已加载文档的实例
///
/// 克隆得到的是同一个窗口的另一个引用。
#[derive(Debug, Clone)]
pub struct ContentWindow {
    id: u64,
    dom: SharedDom,
    alive: Arc<AtomicBool>,
    viewport: Arc<RwLock<Viewport>>,
}

impl ContentWindow {
    pub fn new(dom: Dom, viewport: Viewport) -> Self {
        Self {
            id: NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed),
            dom: Arc::new(RwLock::new(dom)),
            alive: Arc::new(AtomicBool::new(true)),
            viewport: Arc::new(RwLock::new(viewport)),
        }
    }

    /// 窗口唯一标识，用于判断翻译模型能否复用
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// 销毁窗口；之后到达的异步结果都会被丢弃
    pub fn close(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn dom(&self) -> &SharedDom {
        &self.dom
    }

    pub fn read_dom(&self) -> TranslationResult<RwLockReadGuard<'_, Dom>> {
        self.dom
            .read()
            .map_err(|_| TranslationError::ConcurrencyError("DOM 读锁已中毒".to_string()))
    }

    pub fn write_dom(&self) -> TranslationResult<RwLockWriteGuard<'_, Dom>> {
        self.dom
            .write()
            .map_err(|_| TranslationError::ConcurrencyError("DOM 写锁已中毒".to_string()))
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
            .read()
            .map(|viewport| *viewport)
            .unwrap_or_default()
    }

    /// 宿主在滚动或缩放后更新视口
    pub fn set_viewport(&self, viewport: Viewport) {
        if let Ok(mut current) = self.viewport.write() {
            *current = viewport;
        }
    }
}
