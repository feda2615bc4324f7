use actix::Recipient;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};

use crate::config::Config;
use crate::core::credentials::Credentials;
use crate::core::error::DownloadResult;
use crate::core::gate::CapacityGate;
use crate::core::task::util::sanitize_dir_name;
use crate::core::task::{DownloadRequest, DownloadTask, FileResolver, FileStreamer, ProgressEvent, TaskOutcome};
use crate::utils::logger::{Logger, LoggerExt};

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// 一个章节及其资源链接，顺序即页面顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkGroup {
    pub name: String,
    pub urls: Vec<String>,
}

impl LinkGroup {
    pub fn new(name: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            urls,
        }
    }
}

/// 一批下载的结果统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub finished: usize,
    pub skipped: usize,
    pub aborted: usize,
    pub interrupted: bool,
}

impl BatchSummary {
    fn record(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Finished { .. } => self.finished += 1,
            TaskOutcome::Skipped { .. } => self.skipped += 1,
            TaskOutcome::Aborted { .. } => self.aborted += 1,
        }
    }

    /// 已进入终态的任务数
    pub fn terminal(&self) -> usize {
        self.finished + self.skipped + self.aborted
    }
}

/// 批量调度：建章节目录，在容量闸门下为每个 URL 启动一个下载任务，全部结束后通知汇总器
pub struct Orchestrator {
    gate: CapacityGate,
    resolver: FileResolver,
    streamer: FileStreamer,
    spinner_interval: Duration,
    logger: Logger,
}

impl Orchestrator {
    pub fn new(config: &Config, credentials: Credentials, logger: Logger) -> DownloadResult<Self> {
        let credentials = Arc::new(credentials);
        // 探测阶段自己处理每一跳重定向
        let probe = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(config.connect_timeout())
            .build()?;
        let fetch = Client::builder()
            .redirect(Policy::limited(config.max_redirects))
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            gate: CapacityGate::new(config.max_concurrent_downloads),
            resolver: FileResolver::new(probe, Arc::clone(&credentials), config.max_redirects, logger.scoped("resolve")),
            streamer: FileStreamer::new(
                fetch,
                credentials,
                config.chunk_size,
                config.read_timeout(),
                logger.scoped("download"),
            ),
            spinner_interval: config.spinner_interval(),
            logger,
        })
    }

    pub fn gate(&self) -> &CapacityGate {
        &self.gate
    }

    /// 按顺序创建章节目录并生成下载请求；路径被普通文件占用时直接报错
    pub fn prepare(&self, groups: &[LinkGroup], root: &Path) -> DownloadResult<Vec<DownloadRequest>> {
        let mut requests = Vec::new();
        for group in groups {
            let dir: PathBuf = root.join(sanitize_dir_name(&group.name));
            if let Err(e) = fs::create_dir_all(&dir) {
                self.logger.error(&format!("无法创建目录 {}: {}", dir.display(), e));
                return Err(e.into());
            }
            requests.extend(group.urls.iter().map(|url| DownloadRequest {
                url: url.clone(),
                destination_dir: dir.clone(),
            }));
        }
        Ok(requests)
    }

    /// 单个任务的失败不会影响其它任务；`shutdown` 完成时取消剩余任务，
    /// 已下载的部分文件保留在磁盘上。
    pub async fn run<F>(
        &self,
        groups: &[LinkGroup],
        root: &Path,
        progress: Recipient<ProgressEvent>,
        shutdown: F,
    ) -> DownloadResult<BatchSummary>
    where
        F: Future<Output = ()>,
    {
        let requests = self.prepare(groups, root)?;
        let mut summary = BatchSummary {
            total: requests.len(),
            ..Default::default()
        };

        progress.do_send(ProgressEvent::SessionStart(summary.total));
        self.logger.info(&format!(
            "开始下载 {} 个文件, 共 {} 个章节, 并发 {}",
            summary.total,
            groups.len(),
            self.gate.capacity()
        ));
        let spinner = self.spawn_spinner(progress.clone());

        let mut tasks = JoinSet::new();
        for request in requests {
            let task = DownloadTask::new(
                request,
                self.gate.clone(),
                self.resolver.clone(),
                self.streamer.clone(),
                progress.clone(),
                self.logger.scoped("task"),
            );
            tasks.spawn(task.run());
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(outcome)) => summary.record(&outcome),
                    Some(Err(e)) => {
                        if !e.is_cancelled() {
                            self.logger.error(&format!("下载任务异常退出: {}", e));
                        }
                        summary.aborted += 1;
                    }
                    None => break,
                },
                _ = &mut shutdown, if !summary.interrupted => {
                    self.logger.warn("收到中断信号，正在取消剩余下载");
                    summary.interrupted = true;
                    self.gate.close();
                    tasks.abort_all();
                }
            }
        }

        spinner.abort();
        if let Err(e) = progress.send(ProgressEvent::SessionDone).await {
            self.logger.warn(&format!("进度汇总器已停止: {}", e));
        }
        self.logger.info(&format!(
            "下载结束: 完成 {} 跳过 {} 失败 {} / 共 {}",
            summary.finished, summary.skipped, summary.aborted, summary.total
        ));
        Ok(summary)
    }

    fn spawn_spinner(&self, progress: Recipient<ProgressEvent>) -> JoinHandle<()> {
        let interval = self.spinner_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            for symbol in SPINNER.iter().cycle() {
                ticker.tick().await;
                progress.do_send(ProgressEvent::SpinnerTick(*symbol));
            }
        })
    }
}
