use actix::prelude::*;
use anyhow::Context;
use log::LevelFilter;
use std::path::Path;

use coursedown::cli::{self, Account};
use coursedown::config::Config;
use coursedown::core::{Credentials, DownloadError, LinkGroup, Orchestrator, ProgressAggregator};
use coursedown::session::{select_groups, Authenticator, CourseSession, LinkSource};
use coursedown::ui::{self, ProgressDisplay};
use coursedown::utils::logger::{Logger, LoggerActor, LoggerExt};

#[actix::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // 解析参数和配置
    let (args, config) = match cli::Args::parse_args() {
        Ok((args, config)) => (args, config),
        Err(e) => {
            log::error!("参数解析失败: {}", e);
            ui::print_error(&format!("参数解析失败: {}", e));
            std::process::exit(1);
        }
    };

    let logger = match LoggerActor::new(&config.log_file, LevelFilter::Info, config.log_max_size) {
        Ok(actor) => Logger::new(actor.start()),
        Err(e) => {
            eprintln!("无法打开日志文件 {}: {}，日志只输出到控制台", config.log_file, e);
            Logger::detached("coursedown")
        }
    };
    logger.info(&format!(
        "程序启动 v{} ({}, 构建于 {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
    ));
    logger.info(&format!("配置文件路径: {}", args.config));
    logger.info(&config.get_summary());

    let account = match args.account() {
        Ok(account) => account,
        Err(e) => {
            report_error(&logger, &e.to_string()).await;
            std::process::exit(1);
        }
    };

    let (credentials, groups) = match collect_groups(&config, &account, args.chapter, &logger).await {
        Ok(found) => found,
        Err(e) => {
            let hint = match e.downcast_ref::<DownloadError>() {
                Some(err) if err.is_fatal() => "请检查课程名、用户名和密码",
                _ => "请检查网络连接",
            };
            report_error(&logger, &format!("无法获取下载列表，{}: {:#}", hint, e)).await;
            std::process::exit(1);
        }
    };
    if groups.is_empty() {
        logger.info("Nothing to download");
        println!("Nothing to download");
        logger.flush().await;
        return Ok(());
    }

    let orchestrator = match Orchestrator::new(&config, credentials, logger.scoped("orchestrator")) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            report_error(&logger, &format!("初始化下载器失败: {}", e)).await;
            std::process::exit(1);
        }
    };

    ui::print_banner(groups.iter().map(|g| g.urls.len()).sum());

    let (aggregator, done) = ProgressAggregator::new(ProgressDisplay::new(), logger.scoped("progress"));
    let progress = aggregator.start().recipient();
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // 无法监听信号时不中断
            std::future::pending::<()>().await;
        }
    };

    let summary = match orchestrator
        .run(&groups, Path::new(&config.download_dir), progress, shutdown)
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            report_error(&logger, &format!("下载失败: {}", e)).await;
            std::process::exit(1);
        }
    };

    match done.await {
        Ok(report) => logger.info(&format!(
            "完成 {} / 跳过 {} / 共 {}, {} 字节, 用时 {:.1} 秒",
            report.finished,
            report.skipped,
            report.total_files,
            report.total_bytes,
            report.elapsed.as_secs_f64()
        )),
        Err(_) => logger.warn("进度汇总器未返回统计"),
    }
    if summary.interrupted {
        println!("下载已中断，已写入的部分文件保留在磁盘上");
    }

    logger.flush().await;
    Ok(())
}

/// 登录并取得从起始章节开始的链接分组
async fn collect_groups(
    config: &Config,
    account: &Account,
    chapter: Option<usize>,
    logger: &Logger,
) -> anyhow::Result<(Credentials, Vec<LinkGroup>)> {
    let session = CourseSession::new(config, logger.scoped("session")).context("无法创建 HTTP 客户端")?;
    let credentials = session.authenticate(account).await.context("登录失败")?;
    let groups = session
        .fetch_groups(&account.class_name, &credentials)
        .await
        .context("获取课程页面失败")?;
    Ok((credentials, select_groups(groups, chapter)))
}

async fn report_error(logger: &Logger, message: &str) {
    logger.error(message);
    ui::print_error(message);
    logger.flush().await;
}
