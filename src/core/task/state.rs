/// 单个下载任务的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Resolving,
    SkipCheck,
    Downloading,
    Finished,
    Skipped,
    Aborted,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Skipped | TaskState::Aborted)
    }

    /// 持有租约的状态
    pub fn holds_lease(&self) -> bool {
        matches!(self, TaskState::Resolving | TaskState::SkipCheck | TaskState::Downloading)
    }

    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Resolving)
                | (Pending, Aborted)
                | (Resolving, SkipCheck)
                | (Resolving, Aborted)
                | (SkipCheck, Skipped)
                | (SkipCheck, Downloading)
                | (SkipCheck, Aborted)
                | (Downloading, Finished)
                | (Downloading, Aborted)
        )
    }
}

/// 任务结束时交回调度器的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Finished { filename: String, size: u64 },
    Skipped { filename: String },
    Aborted { url: String, reason: String },
}
