//! 通知事件源
//!
//! 事件回调在宿主的事件循环上同步执行。订阅以 `Subscription` 句柄表示，
//! 句柄被 drop 或调用 `remove()` 时回调即被移除。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

/// 通知携带的业务数据
pub type Payload = serde_json::Map<String, Value>;

/// 事件类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 应用在前台时收到通知
    Delivered,
    /// 用户点击了通知（包括冷启动）
    Interacted,
}

/// 运行时通知事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    Delivered {
        payload: Payload,
        received_at: DateTime<Utc>,
    },
    Interacted {
        payload: Payload,
        received_at: DateTime<Utc>,
    },
}

impl NotificationEvent {
    pub fn delivered(payload: Payload) -> Self {
        Self::Delivered {
            payload,
            received_at: Utc::now(),
        }
    }

    pub fn interacted(payload: Payload) -> Self {
        Self::Interacted {
            payload,
            received_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Delivered { .. } => EventKind::Delivered,
            Self::Interacted { .. } => EventKind::Interacted,
        }
    }

    pub fn payload(&self) -> &Payload {
        match self {
            Self::Delivered { payload, .. } | Self::Interacted { payload, .. } => payload,
        }
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        match self {
            Self::Delivered { received_at, .. } | Self::Interacted { received_at, .. } => {
                *received_at
            }
        }
    }
}

/// 事件回调
pub type EventHandler = Arc<dyn Fn(&NotificationEvent) + Send + Sync>;

/// 订阅句柄，drop 时自动取消订阅
#[must_use = "dropping a Subscription removes the listener immediately"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// 取消订阅
    pub fn remove(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

/// 通知事件源 trait
pub trait EventSource: Send + Sync {
    /// 注册监听器
    fn add_listener(&self, kind: EventKind, handler: EventHandler) -> Subscription;

    /// 取出导致冷启动的那次点击（只能取一次）
    fn take_launch_interaction(&self) -> Option<NotificationEvent> {
        None
    }
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, (EventKind, EventHandler)>>,
    launch_interaction: Mutex<Option<NotificationEvent>>,
}

/// 进程内事件源
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次冷启动点击，等待首次 attach 时取出
    pub fn set_launch_interaction(&self, payload: Payload) {
        let mut launch = self
            .inner
            .launch_interaction
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *launch = Some(NotificationEvent::interacted(payload));
    }

    /// 把事件分发给对应类别的所有监听器，返回被调用的监听器数量
    pub fn emit(&self, event: &NotificationEvent) -> usize {
        // 先复制回调再释放锁，回调内部可以安全地增删监听器
        let handlers: Vec<EventHandler> = {
            let listeners = self.inner.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners
                .values()
                .filter(|(kind, _)| *kind == event.kind())
                .map(|(_, handler)| Arc::clone(handler))
                .collect()
        };

        debug!(kind = ?event.kind(), listeners = handlers.len(), "Emitting notification event");
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn emit_delivered(&self, payload: Payload) -> usize {
        self.emit(&NotificationEvent::delivered(payload))
    }

    pub fn emit_interacted(&self, payload: Payload) -> usize {
        self.emit(&NotificationEvent::interacted(payload))
    }

    /// 某类别当前的监听器数量
    pub fn listener_count(&self, kind: EventKind) -> usize {
        let listeners = self.inner.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.values().filter(|(k, _)| *k == kind).count()
    }
}

impl EventSource for EventHub {
    fn add_listener(&self, kind: EventKind, handler: EventHandler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, (kind, handler));

        let hub: Weak<HubInner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(hub) = hub.upgrade() {
                hub.listeners
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&id);
            }
        })
    }

    fn take_launch_interaction(&self) -> Option<NotificationEvent> {
        self.inner
            .launch_interaction
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}
