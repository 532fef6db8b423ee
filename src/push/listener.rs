//! 事件监听管理
//!
//! 两个状态：`Detached`（初始 / 终止）和 `Attached`。
//! 管理器是订阅句柄的唯一持有者；`detach()` 幂等，drop 时自动 detach，
//! 保证登出 / 重新登录后不会残留监听器导致重复导航。

use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::platform::{EventHandler, EventKind, EventSource, Subscription};

/// 监听器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Detached,
    Attached,
}

/// 两类事件的回调
#[derive(Clone)]
pub struct ListenerHandlers {
    /// 前台送达
    pub on_delivered: EventHandler,
    /// 用户点击
    pub on_interacted: EventHandler,
}

struct Attachment {
    _delivered: Subscription,
    _interacted: Subscription,
}

/// 事件监听管理器
pub struct ListenerManager {
    source: Arc<dyn EventSource>,
    attachment: Mutex<Option<Attachment>>,
}

impl ListenerManager {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self {
            source,
            attachment: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ListenerState {
        let attachment = self.attachment.lock().unwrap_or_else(|e| e.into_inner());
        if attachment.is_some() {
            ListenerState::Attached
        } else {
            ListenerState::Detached
        }
    }

    pub fn is_attached(&self) -> bool {
        self.state() == ListenerState::Attached
    }

    /// 订阅两类事件，各一个监听器
    ///
    /// 已处于 `Attached` 时先释放旧订阅，不会重复订阅。
    pub fn attach(&self, handlers: ListenerHandlers) {
        let mut attachment = self.attachment.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(previous) = attachment.take() {
            debug!("Re-attaching notification listeners, releasing previous subscriptions");
            drop(previous);
        }

        *attachment = Some(Attachment {
            _delivered: self.source.add_listener(EventKind::Delivered, handlers.on_delivered),
            _interacted: self.source.add_listener(EventKind::Interacted, handlers.on_interacted),
        });
        debug!("Notification listeners attached");
    }

    /// 取消两个订阅，返回之前是否处于 `Attached`
    pub fn detach(&self) -> bool {
        let previous = self
            .attachment
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        match previous {
            Some(attachment) => {
                drop(attachment);
                debug!("Notification listeners detached");
                true
            }
            None => false,
        }
    }
}

impl Drop for ListenerManager {
    fn drop(&mut self) {
        self.detach();
    }
}
