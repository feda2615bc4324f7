//! 容量闸门：限制同时进行网络 I/O 的下载任务数
//!
//! 基于 `tokio::sync::Semaphore`，等待者按 FIFO 顺序获得许可，不会饿死。

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::core::error::DownloadError;

#[derive(Clone, Debug)]
pub struct CapacityGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// 一次下载的租约，drop 时归还
#[derive(Debug)]
pub struct Lease {
    _permit: OwnedSemaphorePermit,
}

impl Lease {
    /// 显式归还，等价于 drop
    pub fn release(self) {}
}

impl CapacityGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// 挂起直到未归还的租约少于容量；只有闸门被关闭（中断）时才返回错误
    pub async fn acquire(&self) -> Result<Lease, DownloadError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| DownloadError::Cancelled)?;
        Ok(Lease { _permit: permit })
    }

    /// 关闭后所有等待中和后续的 acquire 立即返回 `Cancelled`
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前已借出的租约数
    pub fn outstanding(&self) -> usize {
        self.capacity.saturating_sub(self.semaphore.available_permits())
    }
}
