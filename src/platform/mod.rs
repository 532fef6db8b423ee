//! 平台能力抽象层
//!
//! 本 crate 只依赖能力接口，不依赖具体的移动端 SDK：
//! 1. `NotificationPlatform`：权限、push token、通知渠道
//! 2. `EventSource`：前台送达 / 用户点击事件
//! 3. `NavigationSink`：接收路由目标的导航分发器
//!
//! `simulated` 和 `events::EventHub` 是进程内实现，供 CLI 和测试使用。

pub mod events;
pub mod navigation;
pub mod simulated;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PlatformError;
use crate::push::permission::PermissionState;
use crate::push::token::{ChannelConfig, DevicePlatform};

pub use events::{
    EventHandler, EventHub, EventKind, EventSource, NotificationEvent, Payload, Subscription,
};
pub use navigation::{NavigationSink, RecordingNavigator};
pub use simulated::{SimulatedPlatform, SimulatedPlatformBuilder};

/// 获取 token 时传给平台的参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    /// 推送服务的项目标识
    pub project_id: String,
}

/// 应用在前台时收到通知的展示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForegroundPresentation {
    pub show_alert: bool,
    pub play_sound: bool,
    pub set_badge: bool,
}

impl Default for ForegroundPresentation {
    fn default() -> Self {
        Self {
            show_alert: true,
            play_sound: true,
            set_badge: true,
        }
    }
}

/// OS 级通知服务（只暴露能力，不暴露实现）
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    /// 是否运行在真机上（模拟器 / 浏览器上拿不到 token）
    fn is_physical_device(&self) -> bool;

    /// 当前设备平台
    fn device_platform(&self) -> DevicePlatform;

    /// 查询当前权限状态，不弹窗
    async fn permission_status(&self) -> Result<PermissionState, PlatformError>;

    /// 弹出系统权限对话框并等待结果
    async fn request_permission(&self) -> Result<PermissionState, PlatformError>;

    /// 获取 push token
    async fn push_token(&self, request: &TokenRequest) -> Result<String, PlatformError>;

    /// 创建通知渠道（仅 Android 类平台），重复调用是安全的
    async fn create_channel(&self, id: &str, config: &ChannelConfig) -> Result<(), PlatformError>;

    /// 设置前台通知的展示方式
    async fn set_foreground_presentation(
        &self,
        _presentation: &ForegroundPresentation,
    ) -> Result<(), PlatformError> {
        Ok(())
    }
}
