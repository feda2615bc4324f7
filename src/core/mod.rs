//! Core: 容量闸门、下载任务、进度汇总与批量调度

pub mod aggregator;
pub mod credentials;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

// 只导出主流程实际用到的类型
pub use aggregator::{ProgressAggregator, SessionReport};
pub use credentials::Credentials;
pub use error::{DownloadError, DownloadResult};
pub use gate::CapacityGate;
pub use orchestrator::{BatchSummary, LinkGroup, Orchestrator};
