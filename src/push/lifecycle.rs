//! 推送生命周期
//!
//! 会话激活：权限 → token → 注册 → 挂载监听器。
//! 会话结束：注销 token → 卸载监听器。
//!
//! 每次激活 / 结束都会推进会话代数（generation）。流水线的后续阶段在执行前
//! 检查代数，登出后才拿到的 token 不会被注册。注册和注销通过同一把异步锁串行，
//! 新会话的注册不会和旧会话的注销交错。

use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::listener::{ListenerHandlers, ListenerManager};
use super::permission::{PermissionNegotiator, PermissionState};
use super::registry::{RegistrySynchronizer, RegistryTransport, Session, SyncResult};
use super::router::{DeepLinkRouter, RouteTarget};
use super::token::{ChannelConfig, PushToken, TokenProvisioner, DEFAULT_PROJECT_ID};
use crate::platform::{
    EventHandler, EventSource, ForegroundPresentation, NavigationSink, NotificationEvent,
    NotificationPlatform,
};

/// 激活结果
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationOutcome {
    /// 已拿到 token、尝试注册并挂载了监听器
    Active { token: PushToken, sync: SyncResult },
    /// 没有 token（模拟器、权限未授予、平台失败）
    NoToken { permission: PermissionState },
    /// 流水线执行期间会话已结束
    Cancelled,
    /// 会话没有有效凭证
    Unauthenticated,
    /// 同一会话已处于激活状态
    AlreadyActive,
}

#[derive(Default)]
struct SessionState {
    session: Option<Session>,
    token: Option<PushToken>,
    generation: u64,
}

/// 推送生命周期管理器
pub struct PushLifecycle {
    platform: Arc<dyn NotificationPlatform>,
    permissions: Arc<PermissionNegotiator>,
    provisioner: TokenProvisioner,
    registry: RegistrySynchronizer,
    listeners: ListenerManager,
    source: Arc<dyn EventSource>,
    router: DeepLinkRouter,
    navigator: Arc<dyn NavigationSink>,
    foreground: ForegroundPresentation,
    state: Mutex<SessionState>,
    /// 串行化 registry 调用
    sync_lock: tokio::sync::Mutex<()>,
    last_notification: Arc<Mutex<Option<NotificationEvent>>>,
}

impl PushLifecycle {
    pub fn builder(
        platform: Arc<dyn NotificationPlatform>,
        source: Arc<dyn EventSource>,
        navigator: Arc<dyn NavigationSink>,
        transport: Arc<dyn RegistryTransport>,
    ) -> PushLifecycleBuilder {
        PushLifecycleBuilder {
            platform,
            source,
            navigator,
            transport,
            project_id: DEFAULT_PROJECT_ID.to_string(),
            channel: ChannelConfig::default(),
            foreground: ForegroundPresentation::default(),
            router: DeepLinkRouter::default(),
        }
    }

    /// 激活会话
    ///
    /// 若另一个会话仍处于激活状态，先注销它的 token 并卸载监听器。
    pub async fn activate(&self, session: Session) -> ActivationOutcome {
        if !session.is_authenticated() {
            debug!(user_id = %session.user_id, "Session has no credential, push stays inactive");
            return ActivationOutcome::Unauthenticated;
        }

        let previous = self.lock_state().session.clone();
        if let Some(previous) = previous {
            if previous == session && self.listeners.is_attached() {
                return ActivationOutcome::AlreadyActive;
            }
            if previous != session {
                info!(from = %previous.user_id, to = %session.user_id, "Switching push session");
                self.deactivate().await;
            }
        }

        let generation = {
            let mut state = self.lock_state();
            state.session = Some(session.clone());
            state.generation += 1;
            state.generation
        };

        if let Err(e) = self.platform.set_foreground_presentation(&self.foreground).await {
            debug!(error = %e, "Could not configure foreground presentation");
        }

        let Some(token) = self.provisioner.provision().await else {
            return ActivationOutcome::NoToken {
                permission: self.permissions.last_known(),
            };
        };

        {
            let mut state = self.lock_state();
            if state.generation != generation {
                info!("Session ended while provisioning, discarding push token");
                return ActivationOutcome::Cancelled;
            }
            state.token = Some(token.clone());
        }

        let sync = {
            let _guard = self.sync_lock.lock().await;
            if !self.is_current(generation) {
                info!("Session ended before registration, skipping");
                return ActivationOutcome::Cancelled;
            }
            self.registry.register(Some(&session), &token).await
        };

        {
            // 持锁检查代数并挂载，与 deactivate 的代数推进互斥
            let state = self.lock_state();
            if state.generation != generation {
                return ActivationOutcome::Cancelled;
            }
            self.listeners.attach(self.handlers());
        }

        if let Some(event) = self.source.take_launch_interaction() {
            debug!("Routing notification that launched the app");
            handle_interaction(&self.router, self.navigator.as_ref(), &event);
        }

        ActivationOutcome::Active { token, sync }
    }

    /// 结束会话：注销 token（若本会话拿到过）再卸载监听器
    ///
    /// 返回注销结果；本会话没有 token 时返回 `None`。可重复调用。
    pub async fn deactivate(&self) -> Option<SyncResult> {
        let (session, token) = {
            let mut state = self.lock_state();
            state.generation += 1;
            (state.session.take(), state.token.take())
        };
        self.permissions.reset_failure();

        let sync = match (session, token) {
            (Some(session), Some(token)) => {
                let _guard = self.sync_lock.lock().await;
                Some(self.registry.deregister(Some(&session), &token.value).await)
            }
            _ => None,
        };

        if self.listeners.detach() {
            info!("Push notifications deactivated");
        }
        sync
    }

    /// 按需请求权限并获取 token（设置页使用），不注册
    pub async fn request_permissions(&self) -> Option<PushToken> {
        self.provisioner.provision().await
    }

    /// 最近观察到的权限状态
    pub fn permission_state(&self) -> PermissionState {
        self.permissions.last_known()
    }

    pub fn current_token(&self) -> Option<PushToken> {
        self.lock_state().token.clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.lock_state().session.clone()
    }

    /// 前台最近收到的一条通知
    pub fn last_notification(&self) -> Option<NotificationEvent> {
        self.last_notification
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_attached(&self) -> bool {
        self.listeners.is_attached()
    }

    /// 路由 payload（不分发导航）
    pub fn route(&self, event: &NotificationEvent) -> Option<RouteTarget> {
        self.router.route(event.payload())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock_state().generation == generation
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handlers(&self) -> ListenerHandlers {
        let last = Arc::clone(&self.last_notification);
        let on_delivered: EventHandler = Arc::new(move |event: &NotificationEvent| {
            let kind = event.payload().get("type").and_then(|t| t.as_str()).unwrap_or("-");
            debug!(notification_type = kind, "Notification received in foreground");
            *last.lock().unwrap_or_else(|e| e.into_inner()) = Some(event.clone());
        });

        let router = self.router;
        let navigator = Arc::clone(&self.navigator);
        let on_interacted: EventHandler = Arc::new(move |event: &NotificationEvent| {
            handle_interaction(&router, navigator.as_ref(), event);
        });

        ListenerHandlers {
            on_delivered,
            on_interacted,
        }
    }
}

fn handle_interaction(
    router: &DeepLinkRouter,
    navigator: &dyn NavigationSink,
    event: &NotificationEvent,
) {
    match router.route(event.payload()) {
        Some(target) => {
            debug!(stack = %target.stack_name, "Dispatching deep link");
            navigator.dispatch(target);
        }
        None => debug!("Notification has no route, ignoring tap"),
    }
}

/// `PushLifecycle` 构建器
pub struct PushLifecycleBuilder {
    platform: Arc<dyn NotificationPlatform>,
    source: Arc<dyn EventSource>,
    navigator: Arc<dyn NavigationSink>,
    transport: Arc<dyn RegistryTransport>,
    project_id: String,
    channel: ChannelConfig,
    foreground: ForegroundPresentation,
    router: DeepLinkRouter,
}

impl PushLifecycleBuilder {
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn channel(mut self, channel: ChannelConfig) -> Self {
        self.channel = channel;
        self
    }

    pub fn foreground(mut self, foreground: ForegroundPresentation) -> Self {
        self.foreground = foreground;
        self
    }

    pub fn router(mut self, router: DeepLinkRouter) -> Self {
        self.router = router;
        self
    }

    pub fn build(self) -> PushLifecycle {
        let permissions = Arc::new(PermissionNegotiator::new(Arc::clone(&self.platform)));
        let provisioner =
            TokenProvisioner::new(Arc::clone(&self.platform), Arc::clone(&permissions))
                .with_project_id(self.project_id)
                .with_channel(self.channel);

        PushLifecycle {
            platform: self.platform,
            permissions,
            provisioner,
            registry: RegistrySynchronizer::new(self.transport),
            listeners: ListenerManager::new(Arc::clone(&self.source)),
            source: self.source,
            router: self.router,
            navigator: self.navigator,
            foreground: self.foreground,
            state: Mutex::new(SessionState::default()),
            sync_lock: tokio::sync::Mutex::new(()),
            last_notification: Arc::new(Mutex::new(None)),
        }
    }
}
