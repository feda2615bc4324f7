use actix::Recipient;
use uuid::Uuid;

use crate::core::error::{DownloadError, DownloadResult};
use crate::core::gate::CapacityGate;
use crate::utils::logger::{Logger, LoggerExt};
use super::download::FileStreamer;
use super::messages::ProgressEvent;
use super::resolve::FileResolver;
use super::state::{TaskOutcome, TaskState};
use super::util::{existing_size, should_skip, DownloadRequest};

/// 单个 URL 的下载任务：探测 -> 跳过判断 -> 流式下载
///
/// 任务内部的任何错误都在 `run` 中收口，只记日志，不影响其它任务。
pub struct DownloadTask {
    pub id: Uuid,
    pub request: DownloadRequest,
    pub state: TaskState,
    gate: CapacityGate,
    resolver: FileResolver,
    streamer: FileStreamer,
    progress: Recipient<ProgressEvent>,
    logger: Logger,
}

impl DownloadTask {
    pub fn new(
        request: DownloadRequest,
        gate: CapacityGate,
        resolver: FileResolver,
        streamer: FileStreamer,
        progress: Recipient<ProgressEvent>,
        logger: Logger,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            state: TaskState::Pending,
            gate,
            resolver,
            streamer,
            progress,
            logger,
        }
    }

    pub async fn run(mut self) -> TaskOutcome {
        let lease = match self.gate.acquire().await {
            Ok(lease) => lease,
            Err(e) => return self.abort(e),
        };
        self.transition(TaskState::Resolving);
        debug_assert!(self.state.holds_lease());

        let outcome = match self.execute().await {
            Ok(outcome) => outcome,
            Err(e) => self.abort(e),
        };
        debug_assert!(self.state.is_terminal() && !self.state.holds_lease());
        // 所有离开 Resolving/Downloading 的路径都在这里归还；被 abort 时随 drop 归还
        lease.release();
        outcome
    }

    async fn execute(&mut self) -> DownloadResult<TaskOutcome> {
        let target = self.resolver.resolve(&self.request.url).await?;
        self.transition(TaskState::SkipCheck);

        let path = self.request.destination_dir.join(&target.filename);
        if should_skip(existing_size(&path).await, target.expected_size) {
            self.transition(TaskState::Skipped);
            self.logger.info(&format!("[{}] 跳过已存在文件: {}", self.id, path.display()));
            self.progress.do_send(ProgressEvent::Skipped(target.filename.clone()));
            return Ok(TaskOutcome::Skipped {
                filename: target.filename,
            });
        }

        self.transition(TaskState::Downloading);
        self.logger.info(&format!("[{}] 开始下载: {} -> {}", self.id, target.url, path.display()));
        let size = self.streamer.stream(&target.url, &path, &self.progress).await?;

        self.transition(TaskState::Finished);
        self.progress.do_send(ProgressEvent::Finished {
            filename: target.filename.clone(),
            total_size: size,
        });
        Ok(TaskOutcome::Finished {
            filename: target.filename,
            size,
        })
    }

    fn abort(&mut self, error: DownloadError) -> TaskOutcome {
        self.transition(TaskState::Aborted);
        if error.is_skip_like() {
            self.logger.warn(&format!("[{}] 已放弃: {}", self.id, error));
        } else {
            self.logger.error(&format!("[{}] 下载失败 {}: {}", self.id, self.request.url, error));
        }
        TaskOutcome::Aborted {
            url: self.request.url.clone(),
            reason: error.to_string(),
        }
    }

    fn transition(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "非法状态转换: {:?} -> {:?}",
            self.state,
            next
        );
        self.logger.debug(&format!("[{}] {:?} -> {:?}", self.id, self.state, next));
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credentials::Credentials;
    use crate::core::testing::{drain, recorder};
    use reqwest::redirect::Policy;
    use reqwest::Client;
    use std::path::Path;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn task(url: String, dir: &Path, gate: CapacityGate, progress: Recipient<ProgressEvent>) -> DownloadTask {
        let creds = Arc::new(Credentials::new("coursera-client").unwrap());
        let logger = Logger::detached("test");
        let resolver = FileResolver::new(
            Client::builder().redirect(Policy::none()).build().unwrap(),
            Arc::clone(&creds),
            20,
            logger.clone(),
        );
        let streamer = FileStreamer::new(Client::new(), creds, 2048, None, logger.clone());
        DownloadTask::new(
            DownloadRequest {
                url,
                destination_dir: dir.to_path_buf(),
            },
            gate,
            resolver,
            streamer,
            progress,
            logger,
        )
    }

    async fn mount_file(server: &MockServer, route: &str, name: &str, body: &[u8]) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Disposition", format!("attachment; filename=\"{}\"", name).as_str())
                    .set_body_bytes(body.to_vec()),
            )
            .mount(server)
            .await;
    }

    #[actix_rt::test]
    async fn test_download_then_skip_on_rerun() {
        let server = MockServer::start().await;
        mount_file(&server, "/download/1", "notes.pdf", &[9u8; 3000]).await;
        let dir = tempfile::tempdir().unwrap();
        let gate = CapacityGate::new(1);
        let url = format!("{}/download/1", server.uri());

        let (progress, events) = recorder();
        let outcome = task(url.clone(), dir.path(), gate.clone(), progress.clone()).run().await;
        assert_eq!(
            outcome,
            TaskOutcome::Finished {
                filename: "notes.pdf".to_string(),
                size: 3000
            }
        );
        assert_eq!(gate.outstanding(), 0);
        let first = drain(&progress, &events).await;
        assert_eq!(first.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(
            first.last(),
            Some(&ProgressEvent::Finished {
                filename: "notes.pdf".to_string(),
                total_size: 3000
            })
        );

        // 同样的预期大小再跑一次：跳过
        let (progress, events) = recorder();
        let outcome = task(url, dir.path(), gate.clone(), progress.clone()).run().await;
        assert_eq!(
            outcome,
            TaskOutcome::Skipped {
                filename: "notes.pdf".to_string()
            }
        );
        assert_eq!(
            drain(&progress, &events).await,
            vec![ProgressEvent::Skipped("notes.pdf".to_string())]
        );
        assert_eq!(gate.outstanding(), 0);
    }

    #[actix_rt::test]
    async fn test_size_mismatch_redownloads() {
        let server = MockServer::start().await;
        mount_file(&server, "/download/2", "slides.pdf", &[1u8; 100]).await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("slides.pdf"), [0u8; 40]).unwrap();

        let (progress, _events) = recorder();
        let outcome = task(
            format!("{}/download/2", server.uri()),
            dir.path(),
            CapacityGate::new(1),
            progress,
        )
        .run()
        .await;
        assert!(matches!(outcome, TaskOutcome::Finished { size: 100, .. }));
        assert_eq!(std::fs::metadata(dir.path().join("slides.pdf")).unwrap().len(), 100);
    }

    #[actix_rt::test]
    async fn test_failed_probe_aborts_silently() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/3"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let gate = CapacityGate::new(1);

        let (progress, events) = recorder();
        let outcome = task(format!("{}/download/3", server.uri()), dir.path(), gate.clone(), progress.clone())
            .run()
            .await;
        assert!(matches!(outcome, TaskOutcome::Aborted { .. }));
        assert!(drain(&progress, &events).await.is_empty());
        assert_eq!(gate.outstanding(), 0);
    }

    #[actix_rt::test]
    async fn test_closed_gate_aborts_before_network() {
        let gate = CapacityGate::new(1);
        gate.close();
        let dir = tempfile::tempdir().unwrap();
        let (progress, _events) = recorder();

        let outcome = task("http://127.0.0.1:9/never".to_string(), dir.path(), gate, progress)
            .run()
            .await;
        match outcome {
            TaskOutcome::Aborted { reason, .. } => assert_eq!(reason, DownloadError::Cancelled.to_string()),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
