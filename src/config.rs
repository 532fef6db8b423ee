//! 配置加载
//!
//! 读取优先级（后者覆盖前者）：
//! 1. 默认值
//! 2. 配置文件 `~/.config/push-link/config.json`
//! 3. 环境变量 `PUSH_LINK_API_URL` / `PUSH_LINK_SESSION_TOKEN` / `PUSH_LINK_USER_ID`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::platform::ForegroundPresentation;
use crate::push::registry::{HttpRegistryConfig, RetryPolicy, Session};
use crate::push::token::{ChannelConfig, DEFAULT_PROJECT_ID};

/// 配置文件相对 home 的路径
pub const CONFIG_FILE: &str = ".config/push-link/config.json";

pub const ENV_API_URL: &str = "PUSH_LINK_API_URL";
pub const ENV_SESSION_TOKEN: &str = "PUSH_LINK_SESSION_TOKEN";
pub const ENV_USER_ID: &str = "PUSH_LINK_USER_ID";

/// 默认后端地址
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// 默认超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// 后端地址
    pub api_url: String,
    /// 会话凭证（bearer）
    pub session_token: Option<String>,
    pub user_id: Option<String>,
    /// 推送服务项目标识
    pub project_id: String,
    /// HTTP 超时（秒）
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
    /// Android 默认通知渠道
    pub channel: ChannelConfig,
    pub foreground: ForegroundPresentation,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_token: None,
            user_id: None,
            project_id: DEFAULT_PROJECT_ID.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            channel: ChannelConfig::default(),
            foreground: ForegroundPresentation::default(),
        }
    }
}

impl PushConfig {
    /// 默认配置文件路径
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE))
    }

    /// 从默认位置和环境变量加载
    pub fn auto_load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// 从指定文件加载（不读环境变量）
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!(path = %path.display(), "Loaded push config");
        Ok(config)
    }

    /// 用 `lookup` 提供的值覆盖配置，空字符串忽略
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(token) = get(ENV_SESSION_TOKEN) {
            self.session_token = Some(token);
        }
        if let Some(user_id) = get(ENV_USER_ID) {
            self.user_id = Some(user_id);
        }
    }

    /// 配置中的会话；没有凭证时返回 `None`
    pub fn session(&self) -> Option<Session> {
        let credential = self.session_token.as_deref().filter(|t| !t.trim().is_empty())?;
        let user_id = self.user_id.clone().unwrap_or_else(|| "local".to_string());
        Some(Session::new(user_id, credential))
    }

    pub fn registry_config(&self) -> HttpRegistryConfig {
        HttpRegistryConfig {
            api_url: self.api_url.clone(),
            timeout_secs: self.timeout_secs,
            retry: self.retry.clone(),
        }
    }

    /// 隐藏凭证后的副本（用于打印）
    pub fn redacted(&self) -> Self {
        Self {
            session_token: self.session_token.as_ref().map(|_| "<redacted>".to_string()),
            ..self.clone()
        }
    }
}
