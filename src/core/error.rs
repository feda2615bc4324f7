use std::borrow::Cow;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("网络错误: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("无法解析文件信息: {url} ({reason})")]
    ResolutionFailed { url: String, reason: String },

    #[error("无法从URL获取文件名: {0}")]
    NoFilename(String),

    #[error("重定向次数超过限制({limit}): {url}")]
    TooManyRedirects { url: String, limit: usize },

    #[error("无法打开目标文件 {}: {source}", path.display())]
    FileOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("下载流中断: {0}")]
    StreamFailure(String),

    #[error("下载被取消")]
    Cancelled,

    #[error("认证失败: {0}")]
    Auth(Cow<'static, str>),

    #[error("页面解析失败: {0}")]
    Parse(Cow<'static, str>),

    #[error("配置错误: {0}")]
    Config(Cow<'static, str>),
}

impl DownloadError {
    pub fn resolution_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        DownloadError::ResolutionFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<Cow<'static, str>>) -> Self {
        DownloadError::Config(msg.into())
    }

    pub fn auth(msg: impl Into<Cow<'static, str>>) -> Self {
        DownloadError::Auth(msg.into())
    }

    pub fn parse(msg: impl Into<Cow<'static, str>>) -> Self {
        DownloadError::Parse(msg.into())
    }

    /// 不算真正失败的中止：记 warn 而不是 error
    pub fn is_skip_like(&self) -> bool {
        matches!(self, DownloadError::NoFilename(_) | DownloadError::Cancelled)
    }

    /// 整批下载无法开始的错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DownloadError::Auth(_) | DownloadError::Parse(_) | DownloadError::Config(_)
        )
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;
