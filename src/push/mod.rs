//! 推送通知生命周期
//!
//! 组件（自底向上）：
//! 1. `permission`：权限协商
//! 2. `token`：push token 获取
//! 3. `registry`：与后端 registry 同步
//! 4. `listener`：事件监听管理
//! 5. `router`：deep-link 路由
//! 6. `lifecycle`：把以上组件串成会话流水线
//!
//! # 使用示例
//! ```ignore
//! use push_link::push::{PushLifecycle, Session};
//!
//! let lifecycle = PushLifecycle::builder(platform, events, navigator, registry).build();
//! lifecycle.activate(Session::new(user_id, session_token)).await;
//! // ...
//! lifecycle.deactivate().await;
//! ```

pub mod lifecycle;
pub mod listener;
pub mod permission;
pub mod registry;
pub mod router;
pub mod token;

pub use lifecycle::{ActivationOutcome, PushLifecycle, PushLifecycleBuilder};
pub use listener::{ListenerHandlers, ListenerManager, ListenerState};
pub use permission::{PermissionNegotiator, PermissionState};
pub use registry::{
    DryRunRegistry, HttpRegistry, HttpRegistryConfig, RegistrySynchronizer, RegistryTransport,
    RetryPolicy, Session, SyncResult,
};
pub use router::{
    route, DeepLinkRouter, NotificationType, ParamRule, RouteRule, RouteTarget, TaggedPayload,
    ROUTE_TABLE,
};
pub use token::{ChannelConfig, ChannelImportance, DevicePlatform, PushToken, TokenProvisioner};
