// src/cli/route.rs
//! Route 命令 - 离线计算 payload 的 deep-link 目标
//!
//! payload 从参数或 stdin 读取（与推送 `data` 字段相同的 JSON 对象）。

use anyhow::{anyhow, Context, Result};
use clap::Args;

use super::output::format_output;
use crate::platform::Payload;
use crate::push::router::{route, RouteTarget};

/// Route 命令参数
#[derive(Args)]
pub struct RouteArgs {
    /// 通知 payload（JSON 对象），省略时从 stdin 读取
    #[arg(long, short)]
    pub payload: Option<String>,

    /// 美化输出
    #[arg(long)]
    pub pretty: bool,
}

/// 解析 payload JSON
pub fn parse_payload(raw: &str) -> Result<Payload> {
    let value: serde_json::Value =
        serde_json::from_str(raw.trim()).context("Payload is not valid JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(anyhow!("Payload must be a JSON object, got: {}", other)),
    }
}

/// 计算路由目标
pub fn resolve(raw: &str) -> Result<Option<RouteTarget>> {
    Ok(route(&parse_payload(raw)?))
}

/// 处理 route 命令
pub fn handle_route(args: RouteArgs) -> Result<()> {
    let raw = match args.payload {
        Some(payload) => payload,
        None => std::io::read_to_string(std::io::stdin())
            .context("Failed to read payload from stdin")?,
    };

    match resolve(&raw)? {
        Some(target) => println!("{}", format_output(&target, args.pretty)),
        None => println!("no route"),
    }
    Ok(())
}
