//! 进度汇总器：唯一的事件消费者
//!
//! 所有下载任务和旋转计时器把 `ProgressEvent` 投进同一个 actor 邮箱，
//! 汇总状态只在这里被修改，生产者之间无需加锁。

use actix::prelude::*;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::core::task::ProgressEvent;
use crate::ui::{self, DownloadSummary, ProgressDisplay};
use crate::utils::logger::{Logger, LoggerExt};

/// 吞吐量统计窗口
pub const THROUGHPUT_WINDOW: Duration = Duration::from_secs(2);

/// 汇总状态，只由 `ProgressAggregator` 持有
#[derive(Debug, Clone)]
pub struct AggregateState {
    pub files_completed: usize,
    pub total_files: usize,
    pub bytes_in_window: u64,
    pub window_start: Instant,
    pub spinner_symbol: char,
}

impl AggregateState {
    pub fn new(now: Instant) -> Self {
        Self {
            files_completed: 0,
            total_files: 0,
            bytes_in_window: 0,
            window_start: now,
            spinner_symbol: '|',
        }
    }

    pub fn record_bytes(&mut self, bytes: u64) {
        self.bytes_in_window += bytes;
    }

    /// 当前窗口的瞬时吞吐量（字节/秒）；窗口满 2 秒后清零并从 `now` 重新计时
    pub fn sample(&mut self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.window_start);
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 {
            self.bytes_in_window as f64 / secs
        } else {
            0.0
        };
        if elapsed >= THROUGHPUT_WINDOW {
            self.bytes_in_window = 0;
            self.window_start = now;
        }
        throughput
    }

    pub fn status_line(&self, throughput: f64) -> String {
        format!(
            "[{}][{}/{}][{}]",
            self.spinner_symbol,
            self.files_completed,
            self.total_files,
            ui::format_speed(throughput)
        )
    }
}

/// 会话结束时交出的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub total_files: usize,
    pub finished: usize,
    pub skipped: usize,
    pub total_bytes: u64,
    pub elapsed: Duration,
}

impl SessionReport {
    pub fn completed(&self) -> usize {
        self.finished + self.skipped
    }
}

pub struct ProgressAggregator {
    state: AggregateState,
    report: SessionReport,
    started: Instant,
    display: ProgressDisplay,
    done: Option<oneshot::Sender<SessionReport>>,
    logger: Logger,
}

impl Actor for ProgressAggregator {
    type Context = Context<Self>;
}

impl ProgressAggregator {
    /// 返回的 receiver 在收到 `SessionDone` 后得到最终统计
    pub fn new(display: ProgressDisplay, logger: Logger) -> (Self, oneshot::Receiver<SessionReport>) {
        let (tx, rx) = oneshot::channel();
        let now = Instant::now();
        let aggregator = Self {
            state: AggregateState::new(now),
            report: SessionReport::default(),
            started: now,
            display,
            done: Some(tx),
            logger,
        };
        (aggregator, rx)
    }

    fn refresh(&mut self, now: Instant) {
        let throughput = self.state.sample(now);
        self.display.set_status(self.state.status_line(throughput));
    }

    fn finish(&mut self, now: Instant) {
        self.refresh(now);
        self.display.finish();
        self.report.total_files = self.state.total_files;
        self.report.elapsed = now.saturating_duration_since(self.started);

        let summary = DownloadSummary {
            total_files: self.report.total_files,
            finished: self.report.finished,
            skipped: self.report.skipped,
            total_size: self.report.total_bytes,
            elapsed_time: self.report.elapsed,
        };
        self.display.print_summary(summary.to_string());
        self.logger.info(&format!(
            "会话结束: 完成 {} 跳过 {} 共 {} 个文件, {} 字节",
            self.report.finished, self.report.skipped, self.report.total_files, self.report.total_bytes
        ));

        if let Some(done) = self.done.take() {
            let _ = done.send(self.report.clone());
        }
    }
}

impl Handler<ProgressEvent> for ProgressAggregator {
    type Result = ();

    fn handle(&mut self, msg: ProgressEvent, ctx: &mut Self::Context) {
        let now = Instant::now();
        if msg.is_terminal() {
            self.state.files_completed += 1;
        }
        match msg {
            ProgressEvent::SessionStart(total) => {
                self.state.total_files = total;
                self.state.window_start = now;
                self.started = now;
                self.refresh(now);
            }
            ProgressEvent::BytesWritten(bytes) => {
                self.state.record_bytes(bytes);
                self.report.total_bytes += bytes;
                self.refresh(now);
            }
            ProgressEvent::SpinnerTick(symbol) => {
                self.state.spinner_symbol = symbol;
                self.refresh(now);
            }
            ProgressEvent::Skipped(filename) => {
                self.report.skipped += 1;
                let line = if self.display.styled() {
                    ui::skipped_line(&filename)
                } else {
                    ui::skipped_message(&filename)
                };
                self.display.println(line);
                self.refresh(now);
            }
            ProgressEvent::Finished { filename, total_size } => {
                self.report.finished += 1;
                let line = if self.display.styled() {
                    ui::finished_line(&filename, total_size)
                } else {
                    ui::finished_message(&filename, total_size)
                };
                self.display.println(line);
                self.refresh(now);
            }
            ProgressEvent::SessionDone => {
                self.finish(now);
                ctx.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::SharedBuf;
    use indicatif::ProgressBar;

    #[test]
    fn test_throughput_over_window() {
        let start = Instant::now();
        let mut state = AggregateState::new(start);
        state.record_bytes(4096);

        // 不满 2 秒：不重置
        let speed = state.sample(start + Duration::from_secs(1));
        assert!((speed - 4096.0).abs() < 1e-6);
        assert_eq!(state.bytes_in_window, 4096);
        assert_eq!(state.window_start, start);

        // 恰好 2 秒：B/T 并开启新窗口
        state.record_bytes(4096);
        let end = start + Duration::from_secs(2);
        let speed = state.sample(end);
        assert!((speed - 4096.0).abs() < 1e-6);
        assert_eq!(state.bytes_in_window, 0);
        assert_eq!(state.window_start, end);
    }

    #[test]
    fn test_throughput_long_window() {
        let start = Instant::now();
        let mut state = AggregateState::new(start);
        state.record_bytes(10_000);
        let speed = state.sample(start + Duration::from_millis(2500));
        assert!((speed - 4000.0).abs() < 1e-6);
        assert_eq!(state.bytes_in_window, 0);
    }

    #[test]
    fn test_zero_elapsed() {
        let start = Instant::now();
        let mut state = AggregateState::new(start);
        state.record_bytes(100);
        assert_eq!(state.sample(start), 0.0);
        assert_eq!(state.bytes_in_window, 100);
    }

    #[test]
    fn test_status_line() {
        let mut state = AggregateState::new(Instant::now());
        state.total_files = 6;
        state.files_completed = 2;
        state.spinner_symbol = '/';
        assert_eq!(state.status_line(2048.0), "[/][2/6][2.00 KB/s]");
    }

    #[actix_rt::test]
    async fn test_aggregator_counts_events() {
        let (aggregator, done) = ProgressAggregator::new(ProgressDisplay::quiet(), Logger::detached("test"));
        let addr = aggregator.start();

        addr.do_send(ProgressEvent::SessionStart(3));
        addr.do_send(ProgressEvent::SpinnerTick('-'));
        addr.do_send(ProgressEvent::BytesWritten(2048));
        addr.do_send(ProgressEvent::BytesWritten(1000));
        addr.do_send(ProgressEvent::Finished {
            filename: "a.pdf".to_string(),
            total_size: 3048,
        });
        addr.do_send(ProgressEvent::Skipped("b.pdf".to_string()));
        addr.send(ProgressEvent::SessionDone).await.unwrap();

        let report = done.await.unwrap();
        assert_eq!(report.total_files, 3);
        assert_eq!(report.finished, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.completed(), 2);
        assert_eq!(report.total_bytes, 3048);
    }

    #[actix_rt::test]
    async fn test_completion_lines_without_terminal() {
        let buf = SharedBuf::default();
        let display = ProgressDisplay::with_output(ProgressBar::hidden(), Box::new(buf.clone()));
        let (aggregator, done) = ProgressAggregator::new(display, Logger::detached("test"));
        let addr = aggregator.start();

        addr.do_send(ProgressEvent::SessionStart(2));
        addr.do_send(ProgressEvent::BytesWritten(10));
        addr.do_send(ProgressEvent::Finished {
            filename: "a.pdf".to_string(),
            total_size: 10,
        });
        addr.do_send(ProgressEvent::Skipped("b.pdf".to_string()));
        addr.send(ProgressEvent::SessionDone).await.unwrap();
        done.await.unwrap();

        let output = buf.contents();
        assert!(output.starts_with("Finished: a.pdf. Size 10 bytes\nSkipped: b.pdf\n"));
        assert!(output.contains("下载摘要"));
        assert!(output.contains("总文件数: 2"));
        assert!(output.contains("未完成: 0"));
        // 非终端输出不带颜色控制符
        assert!(!output.contains('\u{1b}'));
    }

    #[actix_rt::test]
    async fn test_empty_session() {
        let (aggregator, done) = ProgressAggregator::new(ProgressDisplay::quiet(), Logger::detached("test"));
        let addr = aggregator.start();
        addr.do_send(ProgressEvent::SessionStart(0));
        addr.send(ProgressEvent::SessionDone).await.unwrap();

        let report = done.await.unwrap();
        assert_eq!(report.total_files, 0);
        assert_eq!(report.completed(), 0);
        assert_eq!(report.total_bytes, 0);
    }
}
