//! `task` 模块包含了与单个下载任务相关的所有逻辑
//!
//! 主要包括：
//! - `state`: 任务状态 `TaskState` 与结果 `TaskOutcome`
//! - `messages`: 发往进度汇总器的 `ProgressEvent`
//! - `util`: 请求/目标类型、跳过判断、文件名提取
//! - `resolve`: 跟随重定向并确定文件名的探测器
//! - `download`: 分块写盘的流式下载
//! - `runner`: 串起以上步骤的 `DownloadTask`

pub mod state;
pub mod messages;
pub mod util;
pub mod resolve;
pub mod download;
pub mod runner;

pub use download::FileStreamer;
pub use messages::ProgressEvent;
pub use resolve::FileResolver;
pub use runner::DownloadTask;
pub use state::{TaskOutcome, TaskState};
pub use util::{should_skip, DownloadRequest, ResolvedTarget};
