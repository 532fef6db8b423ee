//! push-link - 推送 token 生命周期与通知 deep-link 路由

pub mod cli;
pub mod config;
pub mod error;
pub mod platform;
pub mod push;

pub use config::PushConfig;
pub use error::{PlatformError, RegistryError};
pub use platform::{
    EventHub, EventKind, EventSource, ForegroundPresentation, NavigationSink,
    NotificationEvent, NotificationPlatform, Payload, RecordingNavigator, SimulatedPlatform,
    Subscription, TokenRequest,
};
pub use push::{
    route, ActivationOutcome, DeepLinkRouter, DevicePlatform, HttpRegistry, HttpRegistryConfig,
    ListenerManager, ListenerState, PermissionNegotiator, PermissionState, PushLifecycle,
    PushToken, RegistrySynchronizer, RegistryTransport, RetryPolicy, RouteTarget, Session,
    SyncResult, TokenProvisioner,
};
