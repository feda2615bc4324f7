use actix::Message;

/// 下载任务与旋转计时器发往进度汇总器的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// 已确认写入磁盘的字节数
    BytesWritten(u64),
    Skipped(String),
    Finished { filename: String, total_size: u64 },
    SpinnerTick(char),
    /// 本次会话的文件总数，先于任何任务开始发送
    SessionStart(usize),
    SessionDone,
}
impl Message for ProgressEvent { type Result = (); }

impl ProgressEvent {
    /// Skipped / Finished 这类每个任务至多出现一次的事件
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Skipped(_) | ProgressEvent::Finished { .. })
    }
}
