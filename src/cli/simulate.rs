// src/cli/simulate.rs
//! Simulate 命令 - 用模拟平台跑一遍完整的推送生命周期
//!
//! 登录 → 权限 → token → 注册 → 挂载监听器 → 逐个发出点击 → 登出。

use anyhow::{anyhow, Result};
use clap::Args;
use std::sync::Arc;

use super::output::format_output;
use super::route::parse_payload;
use crate::config::PushConfig;
use crate::platform::{EventHub, NotificationEvent, RecordingNavigator, SimulatedPlatform};
use crate::push::lifecycle::{ActivationOutcome, PushLifecycle};
use crate::push::permission::PermissionState;
use crate::push::registry::{DryRunRegistry, HttpRegistry, RegistryTransport, Session};
use crate::push::token::DevicePlatform;

/// Simulate 命令参数
#[derive(Args)]
pub struct SimulateArgs {
    /// 初始权限状态: undetermined, granted, denied
    #[arg(long, default_value = "undetermined")]
    pub permission: PermissionState,

    /// 弹窗时用户的选择
    #[arg(long, default_value = "granted")]
    pub prompt_answer: PermissionState,

    /// 设备平台: ios, android, web
    #[arg(long, default_value = "ios")]
    pub os: DevicePlatform,

    /// 模拟器（拿不到 token）
    #[arg(long)]
    pub emulator: bool,

    /// token 请求失败
    #[arg(long)]
    pub token_failure: bool,

    /// 不请求后端，只打印
    #[arg(long)]
    pub dry_run: bool,

    /// 用户 ID
    #[arg(long)]
    pub user_id: Option<String>,

    /// 前台送达的 payload（JSON，可重复）
    #[arg(long = "deliver")]
    pub deliveries: Vec<String>,

    /// 用户点击的 payload（JSON，可重复）
    #[arg(long = "tap")]
    pub taps: Vec<String>,
}

/// 处理 simulate 命令
pub async fn handle_simulate(args: SimulateArgs, config: &PushConfig) -> Result<()> {
    let mut builder = SimulatedPlatform::builder()
        .physical_device(!args.emulator)
        .device_platform(args.os)
        .permission(args.permission)
        .prompt_answer(args.prompt_answer);
    if args.token_failure {
        builder = builder.token_failure();
    }

    let transport: Arc<dyn RegistryTransport> = if args.dry_run {
        Arc::new(DryRunRegistry)
    } else {
        Arc::new(HttpRegistry::new(config.registry_config())?)
    };

    let session = match config.session() {
        Some(session) => session,
        None if args.dry_run => Session::new("demo", "dry-run"),
        None => {
            return Err(anyhow!(
                "No session token; pass --dry-run or set PUSH_LINK_SESSION_TOKEN"
            ))
        }
    };
    let session = match args.user_id {
        Some(user_id) => Session::new(user_id, session.credential),
        None => session,
    };

    let hub = EventHub::new();
    let navigator = Arc::new(RecordingNavigator::new());
    let lifecycle = PushLifecycle::builder(
        Arc::new(builder.build()),
        Arc::new(hub.clone()),
        navigator.clone(),
        transport,
    )
    .project_id(config.project_id.clone())
    .channel(config.channel.clone())
    .foreground(config.foreground)
    .build();

    match lifecycle.activate(session).await {
        ActivationOutcome::Active { token, sync } => {
            println!(
                "active: token={} platform={} registry={:?}",
                token.value, token.platform, sync
            );
        }
        ActivationOutcome::NoToken { permission } => {
            println!("no token (permission: {})", permission);
        }
        other => println!("not activated: {:?}", other),
    }

    for raw in &args.deliveries {
        let listeners = hub.emit(&NotificationEvent::delivered(parse_payload(raw)?));
        match lifecycle.last_notification() {
            Some(last) => println!(
                "deliver -> {} listener(s), received_at={}",
                listeners,
                last.received_at().to_rfc3339()
            ),
            None => println!("deliver -> {} listener(s)", listeners),
        }
    }

    for raw in &args.taps {
        let event = NotificationEvent::interacted(parse_payload(raw)?);
        let before = navigator.dispatch_count();
        hub.emit(&event);
        let dispatched = navigator.dispatch_count() > before;
        match lifecycle.route(&event) {
            Some(target) if dispatched => println!("tap -> {}", format_output(&target, false)),
            Some(target) => println!(
                "tap -> {} (not dispatched, listeners detached)",
                format_output(&target, false)
            ),
            None => println!("tap -> no route"),
        }
    }

    match lifecycle.deactivate().await {
        Some(result) => println!("deactivated: registry={:?}", result),
        None => println!("deactivated: no token to remove"),
    }

    Ok(())
}
