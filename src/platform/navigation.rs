//! 导航分发

use std::sync::Mutex;
use tracing::debug;

use crate::push::router::RouteTarget;

/// 导航分发器，fire-and-forget，不等待导航完成
pub trait NavigationSink: Send + Sync {
    fn dispatch(&self, target: RouteTarget);
}

/// 记录所有分发过的路由目标
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    dispatched: Mutex<Vec<RouteTarget>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> Vec<RouteTarget> {
        self.dispatched.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatched.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl NavigationSink for RecordingNavigator {
    fn dispatch(&self, target: RouteTarget) {
        debug!(
            stack = %target.stack_name,
            screen = target.screen_name.as_deref().unwrap_or("-"),
            "Navigate"
        );
        self.dispatched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(target);
    }
}
