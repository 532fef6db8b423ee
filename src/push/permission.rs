//! 权限协商
//!
//! 权限状态的唯一来源。只有在 OS 报告 `Undetermined` 时才弹窗，
//! 被拒绝后不会再次弹窗。并发调用共享同一次弹窗。
//! OS 调用失败后，本会话内一律视为 `Denied`，直到 `reset_failure()`。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::platform::NotificationPlatform;

/// 通知权限状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Undetermined,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionState::Undetermined => "undetermined",
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
        }
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "undetermined" => Ok(PermissionState::Undetermined),
            "granted" => Ok(PermissionState::Granted),
            "denied" => Ok(PermissionState::Denied),
            other => Err(format!("unknown permission state: {}", other)),
        }
    }
}

/// 权限协商器
pub struct PermissionNegotiator {
    platform: Arc<dyn NotificationPlatform>,
    /// 串行化弹窗
    prompt_lock: tokio::sync::Mutex<()>,
    last_known: Mutex<PermissionState>,
    /// 本会话内 OS 调用是否失败过
    failed: AtomicBool,
}

impl PermissionNegotiator {
    pub fn new(platform: Arc<dyn NotificationPlatform>) -> Self {
        Self {
            platform,
            prompt_lock: tokio::sync::Mutex::new(()),
            last_known: Mutex::new(PermissionState::Undetermined),
            failed: AtomicBool::new(false),
        }
    }

    /// 查询 OS 当前的权限状态（不弹窗），查询失败视为 Denied
    pub async fn current_status(&self) -> PermissionState {
        if self.has_failed() {
            self.record(PermissionState::Denied);
            return PermissionState::Denied;
        }
        let status = match self.platform.permission_status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Permission status query failed, treating as denied");
                self.failed.store(true, Ordering::SeqCst);
                PermissionState::Denied
            }
        };
        self.record(status);
        status
    }

    /// 确保已获得权限
    ///
    /// `Undetermined` 时弹出系统对话框并等待结果；`Granted` / `Denied` 直接返回。
    pub async fn ensure_granted(&self) -> PermissionState {
        let status = self.current_status().await;
        if status != PermissionState::Undetermined {
            return status;
        }

        let _guard = self.prompt_lock.lock().await;

        // 等锁期间可能已经有人弹过窗
        let status = self.current_status().await;
        if status != PermissionState::Undetermined {
            debug!(status = %status, "Permission resolved by a concurrent prompt");
            return status;
        }

        info!("Requesting notification permission");
        let status = match self.platform.request_permission().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Permission request failed, treating as denied");
                self.failed.store(true, Ordering::SeqCst);
                PermissionState::Denied
            }
        };
        self.record(status);

        if status != PermissionState::Granted {
            info!(status = %status, "Push notification permission not granted");
        }
        status
    }

    /// 最近一次观察到的权限状态（仅限当前进程）
    pub fn last_known(&self) -> PermissionState {
        *self.last_known.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 本会话内 OS 调用是否失败过
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// 会话结束时清除失败标记，下个会话重新询问 OS
    pub fn reset_failure(&self) {
        if self.failed.swap(false, Ordering::SeqCst) {
            debug!("Clearing permission failure for the next session");
        }
    }

    fn record(&self, status: PermissionState) {
        *self.last_known.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }
}
