//! 错误类型
//!
//! 组件边界内部使用的错误。它们在边界处被捕获并降级为
//! `PermissionState::Denied`、`None` 或 `SyncResult::Failed`，不会传到 UI 层。

use thiserror::Error;

/// 平台通知服务的调用失败
#[derive(Debug, Error)]
pub enum PlatformError {
    /// 查询或请求权限失败
    #[error("permission query failed: {0}")]
    Permission(String),
    /// 获取 push token 失败（网络、平台 API）
    #[error("token request failed: {0}")]
    Token(String),
    /// 创建通知渠道失败
    #[error("channel setup failed: {0}")]
    Channel(String),
    /// 当前环境不支持该能力
    #[error("unsupported on this device: {0}")]
    Unsupported(String),
}

/// Registry 后端同步失败
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("registry returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid registry url: {0}")]
    InvalidUrl(String),
    #[error("session credential is missing")]
    MissingCredential,
}

impl RegistryError {
    /// 是否为可重试的瞬时错误（连接失败、5xx）
    pub fn is_transient(&self) -> bool {
        match self {
            RegistryError::Http(e) => e.is_connect() || e.is_timeout(),
            RegistryError::Status { status, .. } => *status >= 500,
            RegistryError::InvalidUrl(_) | RegistryError::MissingCredential => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_transient_only_for_5xx() {
        let server_error = RegistryError::Status { status: 503, body: String::new() };
        let auth_error = RegistryError::Status { status: 401, body: "Unauthorized".to_string() };

        assert!(server_error.is_transient());
        assert!(!auth_error.is_transient());
        assert!(!RegistryError::MissingCredential.is_transient());
    }

    #[test]
    fn test_error_messages() {
        let err = PlatformError::Token("offline".to_string());
        assert_eq!(err.to_string(), "token request failed: offline");

        let err = RegistryError::Status { status: 500, body: "boom".to_string() };
        assert_eq!(err.to_string(), "registry returned 500: boom");
    }
}
