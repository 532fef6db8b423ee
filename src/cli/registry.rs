// src/cli/registry.rs
//! Register / Deregister 命令 - 手动同步 token 到后端 registry

use anyhow::{anyhow, bail, Result};
use clap::Args;
use std::sync::Arc;

use crate::config::PushConfig;
use crate::push::registry::{HttpRegistry, RegistrySynchronizer, SyncResult};
use crate::push::token::{DevicePlatform, PushToken};

/// Register 命令参数
#[derive(Args)]
pub struct RegisterArgs {
    /// Push token
    #[arg(long, short)]
    pub token: String,

    /// 设备平台: ios, android, web
    #[arg(long, short, default_value = "ios")]
    pub platform: DevicePlatform,
}

/// Deregister 命令参数
#[derive(Args)]
pub struct DeregisterArgs {
    /// Push token
    #[arg(long, short)]
    pub token: String,
}

const MISSING_SESSION: &str =
    "No session token; set session_token in config or PUSH_LINK_SESSION_TOKEN";

fn synchronizer(config: &PushConfig) -> Result<RegistrySynchronizer> {
    let registry = HttpRegistry::new(config.registry_config())?;
    Ok(RegistrySynchronizer::new(Arc::new(registry)))
}

fn report(action: &str, result: SyncResult) -> Result<()> {
    match result {
        SyncResult::Synced => {
            println!("{}: ok", action);
            Ok(())
        }
        SyncResult::Skipped(reason) => {
            println!("{}: skipped ({})", action, reason);
            Ok(())
        }
        SyncResult::Failed(reason) => bail!("{} failed: {}", action, reason),
    }
}

/// 处理 register 命令
pub async fn handle_register(args: RegisterArgs, config: &PushConfig) -> Result<()> {
    let session = config
        .session()
        .ok_or_else(|| anyhow!(MISSING_SESSION))?;
    let token = PushToken::new(args.token, args.platform);

    let result = synchronizer(config)?.register(Some(&session), &token).await;
    report("register", result)
}

/// 处理 deregister 命令
pub async fn handle_deregister(args: DeregisterArgs, config: &PushConfig) -> Result<()> {
    let session = config
        .session()
        .ok_or_else(|| anyhow!(MISSING_SESSION))?;
    let result = synchronizer(config)?.deregister(Some(&session), &args.token).await;
    report("deregister", result)
}
