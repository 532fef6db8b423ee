//! pushctl CLI
//!
//! 推送 token 生命周期与通知 deep-link 路由的运维工具

use anyhow::Result;
use clap::{Parser, Subcommand};
use push_link::{
    cli::{
        handle_deregister, handle_register, handle_route, handle_simulate, DeregisterArgs,
        RegisterArgs, RouteArgs, SimulateArgs,
    },
    PushConfig,
};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "pushctl")]
#[command(about = "pushctl - push token lifecycle and notification deep-link routing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 计算通知 payload 的导航目标
    Route(RouteArgs),
    /// 把 token 注册到后端 registry
    Register(RegisterArgs),
    /// 从后端 registry 注销 token
    Deregister(DeregisterArgs),
    /// 用模拟平台跑一遍完整生命周期
    Simulate(SimulateArgs),
    /// 打印生效的配置
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("push_link=info,pushctl=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Route(args) => {
            handle_route(args)?;
        }
        Commands::Register(args) => {
            let config = PushConfig::auto_load()?;
            debug!(api_url = %config.api_url, "Using registry");
            handle_register(args, &config).await?;
        }
        Commands::Deregister(args) => {
            let config = PushConfig::auto_load()?;
            debug!(api_url = %config.api_url, "Using registry");
            handle_deregister(args, &config).await?;
        }
        Commands::Simulate(args) => {
            let config = PushConfig::auto_load()?;
            handle_simulate(args, &config).await?;
        }
        Commands::Config => {
            let config = PushConfig::auto_load()?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}
