//! Token 注册表同步
//!
//! 把 push token 注册到后端 / 从后端注销。所有调用对调用方都是 fire-and-forget：
//! 失败只记录日志并以 `SyncResult::Failed` 返回，不会向上传播。
//!
//! 后端协议：
//! - `POST   {api_url}/api/push-tokens  {token, platform}`
//! - `DELETE {api_url}/api/push-tokens  {token}`
//!
//! 两者都带 `Authorization: Bearer <session credential>`。

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::token::{DevicePlatform, PushToken};
use crate::error::RegistryError;

/// Registry 路径
pub const PUSH_TOKENS_PATH: &str = "/api/push-tokens";

/// 已登录的会话
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    /// 发给后端的 bearer 凭证
    pub credential: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            credential: credential.into(),
        }
    }

    /// 凭证为空的会话视为未登录
    pub fn is_authenticated(&self) -> bool {
        !self.credential.trim().is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// 同步结果
#[derive(Debug, Clone, PartialEq)]
pub enum SyncResult {
    /// 后端已确认
    Synced,
    /// 跳过（未登录、没有 token）
    Skipped(String),
    /// 失败（已记录日志，不重试）
    Failed(String),
}

/// Registry 传输层 trait
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// 传输层名称（用于日志）
    fn name(&self) -> &str;

    /// 创建或替换 `(token, platform, session)` 记录
    async fn register(&self, credential: &str, token: &PushToken) -> Result<(), RegistryError>;

    /// 删除 `(token, session)` 记录，记录不存在时也应成功
    async fn deregister(&self, credential: &str, token: &str) -> Result<(), RegistryError>;
}

#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
    token: &'a str,
    platform: DevicePlatform,
}

#[derive(Debug, Serialize)]
struct DeregisterBody<'a> {
    token: &'a str,
}

/// 传输层重试策略
///
/// 默认不重试。开启后只重试连接错误和 5xx，4xx 视为永久失败。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次请求）
    pub max_retries: u32,
    /// 首次退避（毫秒）
    pub initial_backoff_ms: u64,
    /// 退避上限（毫秒）
    pub max_backoff_ms: u64,
    /// 退避倍数
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 100,
            max_backoff_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次重试前的等待时间（从 0 开始）
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(attempt as i32);
        let ms = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
        Duration::from_millis(ms as u64)
    }
}

/// HTTP Registry 客户端配置
#[derive(Debug, Clone)]
pub struct HttpRegistryConfig {
    /// 后端地址（如 http://localhost:5000）
    pub api_url: String,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for HttpRegistryConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

/// HTTP Registry 客户端
#[derive(Debug)]
pub struct HttpRegistry {
    client: Client,
    endpoint: Url,
    retry: RetryPolicy,
}

impl HttpRegistry {
    pub fn new(config: HttpRegistryConfig) -> Result<Self, RegistryError> {
        let base = config.api_url.trim_end_matches('/');
        let endpoint = Url::parse(&format!("{}{}", base, PUSH_TOKENS_PATH))
            .map_err(|e| RegistryError::InvalidUrl(format!("{}: {}", config.api_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            retry: config.retry,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        credential: &str,
        body: &B,
    ) -> Result<StatusCode, RegistryError> {
        if credential.trim().is_empty() {
            return Err(RegistryError::MissingCredential);
        }

        let response = self
            .client
            .request(method, self.endpoint.clone())
            .bearer_auth(credential)
            .json(body)
            .send()
            .await?;

        response_status(response).await
    }

    async fn with_retry<F, Fut>(&self, op: &str, mut call: F) -> Result<(), RegistryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), RegistryError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        op,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Registry call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// 2xx 原样返回，其余转为 `RegistryError::Status`（DELETE 的 404 由调用方处理）
async fn response_status(response: reqwest::Response) -> Result<StatusCode, RegistryError> {
    let status = response.status();
    if status.is_success() || status == StatusCode::NOT_FOUND {
        return Ok(status);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RegistryError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RegistryTransport for HttpRegistry {
    fn name(&self) -> &str {
        "http"
    }

    async fn register(&self, credential: &str, token: &PushToken) -> Result<(), RegistryError> {
        let body = RegisterBody {
            token: &token.value,
            platform: token.platform,
        };
        let body = &body;
        self.with_retry("register", move || async move {
            match self.send(Method::POST, credential, body).await? {
                StatusCode::NOT_FOUND => Err(RegistryError::Status {
                    status: StatusCode::NOT_FOUND.as_u16(),
                    body: "push-tokens endpoint not found".to_string(),
                }),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn deregister(&self, credential: &str, token: &str) -> Result<(), RegistryError> {
        let body = &DeregisterBody { token };
        self.with_retry("deregister", move || async move {
            let status = self.send(Method::DELETE, credential, body).await?;
            if status == StatusCode::NOT_FOUND {
                debug!("Token already removed from registry");
            }
            Ok(())
        })
        .await
    }
}

/// Dry-run 传输层：只打印日志，不发请求
#[derive(Debug, Default)]
pub struct DryRunRegistry;

#[async_trait]
impl RegistryTransport for DryRunRegistry {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn register(&self, _credential: &str, token: &PushToken) -> Result<(), RegistryError> {
        info!(platform = %token.platform, "[DRY-RUN] Would POST {}", PUSH_TOKENS_PATH);
        Ok(())
    }

    async fn deregister(&self, _credential: &str, _token: &str) -> Result<(), RegistryError> {
        info!("[DRY-RUN] Would DELETE {}", PUSH_TOKENS_PATH);
        Ok(())
    }
}

/// Registry 同步器
pub struct RegistrySynchronizer {
    transport: Arc<dyn RegistryTransport>,
}

impl RegistrySynchronizer {
    pub fn new(transport: Arc<dyn RegistryTransport>) -> Self {
        Self { transport }
    }

    /// 注册 token；未登录时静默跳过
    pub async fn register(&self, session: Option<&Session>, token: &PushToken) -> SyncResult {
        let Some(session) = session.filter(|s| s.is_authenticated()) else {
            debug!("No authenticated session, skipping token registration");
            return SyncResult::Skipped("no session".to_string());
        };
        if token.value.trim().is_empty() {
            return SyncResult::Skipped("empty token".to_string());
        }

        match self.transport.register(&session.credential, token).await {
            Ok(()) => {
                info!(
                    transport = self.transport.name(),
                    user_id = %session.user_id,
                    platform = %token.platform,
                    "Push token registered"
                );
                SyncResult::Synced
            }
            Err(e) => {
                warn!(
                    transport = self.transport.name(),
                    error = %e,
                    "Failed to register push token with server"
                );
                SyncResult::Failed(e.to_string())
            }
        }
    }

    /// 注销 token；未登录时静默跳过
    pub async fn deregister(&self, session: Option<&Session>, token: &str) -> SyncResult {
        let Some(session) = session.filter(|s| s.is_authenticated()) else {
            debug!("No authenticated session, skipping token deregistration");
            return SyncResult::Skipped("no session".to_string());
        };

        match self.transport.deregister(&session.credential, token).await {
            Ok(()) => {
                info!(
                    transport = self.transport.name(),
                    user_id = %session.user_id,
                    "Push token deactivated"
                );
                SyncResult::Synced
            }
            Err(e) => {
                warn!(
                    transport = self.transport.name(),
                    error = %e,
                    "Failed to deactivate push token"
                );
                SyncResult::Failed(e.to_string())
            }
        }
    }
}
