//! wxchat CLI（离线版）
//!
//! 读取群聊数据文件，在回放传输层上构建会话，展示成员、群主和搜索结果，
//! 并可按回放脚本执行一次改名。

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use wxchat_core::{ChatPayload, Keywords, ReplayTransport, Session, SessionConfig};

/// wxchat CLI
#[derive(Parser, Debug)]
#[command(name = "wxchat-cli")]
#[command(about = "wxchat CLI - 离线查看和操作群聊数据", long_about = None)]
struct Args {
    /// 群聊数据文件（JSON，包含 UserName、NickName、MemberList 等字段）
    #[arg(short, long)]
    group: PathBuf,

    /// 回放脚本（JSON 对象，键为传输层操作名）
    #[arg(short, long)]
    replies: Option<PathBuf>,

    /// 在群成员中搜索的关键词
    #[arg(short, long)]
    search: Option<String>,

    /// 新的群名称
    #[arg(long)]
    rename: Option<String>,

    /// 当前账号的 UserName，用于判断是否为群主
    #[arg(long, default_value = "@me")]
    self_user_name: String,

    /// 成员列表刷新时是否拉取成员详细信息
    #[arg(long)]
    member_details: bool,

    /// 日志级别（默认: info,wxchat_core=debug）
    #[arg(long, default_value = "info,wxchat_core=debug")]
    log_level: String,
}

/// 初始化日志
fn init_logger(log_level: &str) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .init();
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取文件: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("无法解析 JSON: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level);

    let transport = match &args.replies {
        Some(path) => ReplayTransport::from_script(read_json(path)?)?,
        None => ReplayTransport::new(),
    };
    let transport = Arc::new(transport);

    let mut config = SessionConfig::new();
    config.member_details = args.member_details;
    let session = Session::with_config(
        transport.clone(),
        ChatPayload::with_user_name(args.self_user_name.as_str()),
        config,
    );

    let mut group = session.group_from_value(read_json(&args.group)?)?;
    info!("[CLI] 已加载 {}", group);

    let title = group.to_string();
    let members = group.members().await?;
    println!("{} 共 {} 位成员", title, members.len());
    for (index, member) in members.iter().enumerate() {
        println!(
            "  {:>3}. {} ({})",
            index + 1,
            member.name().unwrap_or_default(),
            member.user_name()
        );
    }

    match group.owner().await? {
        Some(owner) => println!("群主: {}", owner),
        None => println!("群主: 未找到"),
    }
    println!("当前账号是否为群主: {}", group.is_owner().await?);

    if let Some(keywords) = &args.search {
        let found = group.search(Keywords::from(keywords.as_str()), &[]).await?;
        println!("搜索 \"{}\" 命中 {} 位成员", keywords, found.len());
        for member in &found {
            println!("  {}", member);
        }
    }

    if let Some(name) = &args.rename {
        let reply = group.rename_group(name).await?;
        match reply {
            Some(_) => println!("已改名为: {}", group.name().unwrap_or_default()),
            None => println!("名称未变化: {}", group.name().unwrap_or_default()),
        }
    }

    info!("[CLI] 共发出 {} 次传输层调用", transport.calls().len());
    Ok(())
}
