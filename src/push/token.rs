//! Push token 获取
//!
//! 只在真机且权限为 `Granted` 时获取 token。任何失败都降级为 `None`，
//! 没有 token 的应用仍然可以正常使用。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::permission::{PermissionNegotiator, PermissionState};
use crate::platform::{NotificationPlatform, TokenRequest};

/// 默认项目标识
pub const DEFAULT_PROJECT_ID: &str = "mien-kingdom";

/// 默认通知渠道 ID
pub const DEFAULT_CHANNEL_ID: &str = "default";

/// 设备平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePlatform {
    Ios,
    Android,
    Web,
}

impl DevicePlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevicePlatform::Ios => "ios",
            DevicePlatform::Android => "android",
            DevicePlatform::Web => "web",
        }
    }

    /// 是否需要创建通知渠道
    pub fn uses_channels(&self) -> bool {
        matches!(self, DevicePlatform::Android)
    }
}

impl fmt::Display for DevicePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DevicePlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(DevicePlatform::Ios),
            "android" => Ok(DevicePlatform::Android),
            "web" => Ok(DevicePlatform::Web),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// 平台签发的 push token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushToken {
    pub value: String,
    pub platform: DevicePlatform,
}

impl PushToken {
    pub fn new(value: impl Into<String>, platform: DevicePlatform) -> Self {
        Self {
            value: value.into(),
            platform,
        }
    }
}

/// 通知渠道重要性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelImportance {
    Min,
    Low,
    Default,
    High,
    Max,
}

/// 通知渠道配置（Android 类平台）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub name: String,
    pub importance: ChannelImportance,
    /// 振动模式（毫秒）：等待、振动、等待、振动……
    pub vibration_pattern: Vec<u64>,
    pub light_color: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            importance: ChannelImportance::Max,
            vibration_pattern: vec![0, 250, 250, 250],
            light_color: "#DC2626".to_string(),
        }
    }
}

/// Token 获取器
pub struct TokenProvisioner {
    platform: Arc<dyn NotificationPlatform>,
    permissions: Arc<PermissionNegotiator>,
    project_id: String,
    channel: ChannelConfig,
}

impl TokenProvisioner {
    pub fn new(
        platform: Arc<dyn NotificationPlatform>,
        permissions: Arc<PermissionNegotiator>,
    ) -> Self {
        Self {
            platform,
            permissions,
            project_id: DEFAULT_PROJECT_ID.to_string(),
            channel: ChannelConfig::default(),
        }
    }

    /// 设置项目标识
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    /// 设置默认通知渠道
    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channel = channel;
        self
    }

    /// 获取 push token，任何失败都返回 `None`
    pub async fn provision(&self) -> Option<PushToken> {
        if !self.platform.is_physical_device() {
            info!("Push notifications only work on physical devices");
            return None;
        }

        if self.permissions.ensure_granted().await != PermissionState::Granted {
            return None;
        }

        let platform = self.platform.device_platform();
        let request = TokenRequest {
            project_id: self.project_id.clone(),
        };

        let value = match self.platform.push_token(&request).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, platform = %platform, "Failed to get push token");
                return None;
            }
        };

        if value.trim().is_empty() {
            warn!(platform = %platform, "Platform returned an empty push token");
            return None;
        }

        if platform.uses_channels() {
            self.ensure_channel().await;
        }

        debug!(platform = %platform, "Push token provisioned");
        Some(PushToken::new(value, platform))
    }

    async fn ensure_channel(&self) {
        if let Err(e) = self
            .platform
            .create_channel(DEFAULT_CHANNEL_ID, &self.channel)
            .await
        {
            warn!(
                error = %e,
                channel = DEFAULT_CHANNEL_ID,
                "Failed to set up notification channel"
            );
        }
    }
}
