//! 模拟平台 - 在没有真机的环境里驱动完整的生命周期

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::debug;

use super::{ForegroundPresentation, NotificationPlatform, TokenRequest};
use crate::error::PlatformError;
use crate::push::permission::PermissionState;
use crate::push::token::{ChannelConfig, DevicePlatform};

/// 可配置的模拟平台
pub struct SimulatedPlatform {
    physical_device: bool,
    device_platform: DevicePlatform,
    status: Mutex<PermissionState>,
    prompt_answer: PermissionState,
    token: Option<String>,
    fail_permission_query: bool,
    fail_permission_prompt: bool,
    fail_channel: bool,
    token_gate: Option<Arc<Notify>>,
    prompts: AtomicUsize,
    token_requests: AtomicUsize,
    channels: Mutex<Vec<(String, ChannelConfig)>>,
    presentation: Mutex<Option<ForegroundPresentation>>,
}

impl SimulatedPlatform {
    pub fn builder() -> SimulatedPlatformBuilder {
        SimulatedPlatformBuilder::default()
    }

    /// 系统权限对话框弹出的次数
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn token_request_count(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    /// 已创建的通知渠道
    pub fn channels(&self) -> Vec<(String, ChannelConfig)> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn presentation(&self) -> Option<ForegroundPresentation> {
        *self.presentation.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 模拟用户在系统设置里修改权限
    pub fn set_permission(&self, state: PermissionState) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

#[async_trait]
impl NotificationPlatform for SimulatedPlatform {
    fn is_physical_device(&self) -> bool {
        self.physical_device
    }

    fn device_platform(&self) -> DevicePlatform {
        self.device_platform
    }

    async fn permission_status(&self) -> Result<PermissionState, PlatformError> {
        if self.fail_permission_query {
            return Err(PlatformError::Permission("permission service unavailable".to_string()));
        }
        Ok(*self.status.lock().unwrap_or_else(|e| e.into_inner()))
    }

    async fn request_permission(&self) -> Result<PermissionState, PlatformError> {
        if self.fail_permission_query {
            return Err(PlatformError::Permission("permission service unavailable".to_string()));
        }
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if self.fail_permission_prompt {
            return Err(PlatformError::Permission("permission dialog failed to open".to_string()));
        }
        // 让出执行权，模拟用户点击前的等待
        tokio::task::yield_now().await;

        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        if *status == PermissionState::Undetermined {
            *status = self.prompt_answer;
        }
        debug!(status = ?*status, "Simulated permission prompt resolved");
        Ok(*status)
    }

    async fn push_token(&self, request: &TokenRequest) -> Result<String, PlatformError> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        if !self.physical_device {
            return Err(PlatformError::Unsupported("push token on emulator".to_string()));
        }
        if let Some(gate) = &self.token_gate {
            gate.notified().await;
        }
        debug!(project_id = %request.project_id, "Simulated token request");
        self.token
            .clone()
            .ok_or_else(|| PlatformError::Token("push service unreachable".to_string()))
    }

    async fn create_channel(&self, id: &str, config: &ChannelConfig) -> Result<(), PlatformError> {
        if self.fail_channel {
            return Err(PlatformError::Channel(format!("cannot create channel {}", id)));
        }
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        // 同 id 覆盖，保持幂等
        channels.retain(|(existing, _)| existing != id);
        channels.push((id.to_string(), config.clone()));
        Ok(())
    }

    async fn set_foreground_presentation(
        &self,
        presentation: &ForegroundPresentation,
    ) -> Result<(), PlatformError> {
        *self.presentation.lock().unwrap_or_else(|e| e.into_inner()) = Some(*presentation);
        Ok(())
    }
}

/// `SimulatedPlatform` 构建器
pub struct SimulatedPlatformBuilder {
    physical_device: bool,
    device_platform: DevicePlatform,
    initial: PermissionState,
    prompt_answer: PermissionState,
    token: Option<String>,
    fail_permission_query: bool,
    fail_permission_prompt: bool,
    fail_channel: bool,
    token_gate: Option<Arc<Notify>>,
}

impl Default for SimulatedPlatformBuilder {
    fn default() -> Self {
        Self {
            physical_device: true,
            device_platform: DevicePlatform::Ios,
            initial: PermissionState::Undetermined,
            prompt_answer: PermissionState::Granted,
            token: Some("ExponentPushToken[simulated]".to_string()),
            fail_permission_query: false,
            fail_permission_prompt: false,
            fail_channel: false,
            token_gate: None,
        }
    }
}

impl SimulatedPlatformBuilder {
    pub fn physical_device(mut self, physical: bool) -> Self {
        self.physical_device = physical;
        self
    }

    pub fn device_platform(mut self, platform: DevicePlatform) -> Self {
        self.device_platform = platform;
        self
    }

    /// 初始权限状态
    pub fn permission(mut self, state: PermissionState) -> Self {
        self.initial = state;
        self
    }

    /// 弹窗时用户的选择
    pub fn prompt_answer(mut self, state: PermissionState) -> Self {
        self.prompt_answer = state;
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// token 请求总是失败
    pub fn token_failure(mut self) -> Self {
        self.token = None;
        self
    }

    pub fn fail_permission_query(mut self) -> Self {
        self.fail_permission_query = true;
        self
    }

    /// 状态查询正常，但弹窗请求失败
    pub fn fail_permission_prompt(mut self) -> Self {
        self.fail_permission_prompt = true;
        self
    }

    pub fn fail_channel(mut self) -> Self {
        self.fail_channel = true;
        self
    }

    /// token 请求挂起直到 `gate` 被通知
    pub fn hold_token_until(mut self, gate: Arc<Notify>) -> Self {
        self.token_gate = Some(gate);
        self
    }

    pub fn build(self) -> SimulatedPlatform {
        SimulatedPlatform {
            physical_device: self.physical_device,
            device_platform: self.device_platform,
            status: Mutex::new(self.initial),
            prompt_answer: self.prompt_answer,
            token: self.token,
            fail_permission_query: self.fail_permission_query,
            fail_permission_prompt: self.fail_permission_prompt,
            fail_channel: self.fail_channel,
            token_gate: self.token_gate,
            prompts: AtomicUsize::new(0),
            token_requests: AtomicUsize::new(0),
            channels: Mutex::new(Vec::new()),
            presentation: Mutex::new(None),
        }
    }
}
