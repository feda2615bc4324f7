use actix::Recipient;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::core::credentials::Credentials;
use crate::core::error::{DownloadError, DownloadResult};
use crate::utils::logger::{Logger, LoggerExt};
use super::messages::ProgressEvent;

/// 把响应体按固定块大小写入磁盘，每写成功一块就上报一次字节数
#[derive(Clone)]
pub struct FileStreamer {
    client: Client,
    credentials: Arc<Credentials>,
    chunk_size: usize,
    /// 单次读取的超时，None 表示不限
    read_timeout: Option<Duration>,
    logger: Logger,
}

impl FileStreamer {
    pub fn new(
        client: Client,
        credentials: Arc<Credentials>,
        chunk_size: usize,
        read_timeout: Option<Duration>,
        logger: Logger,
    ) -> Self {
        Self {
            client,
            credentials,
            chunk_size: chunk_size.max(1),
            read_timeout,
            logger,
        }
    }

    /// 返回写入的总字节数。任何退出路径上文件句柄和连接都会随作用域释放，
    /// 中途失败时已写入的部分文件保留在磁盘上。
    pub async fn stream(
        &self,
        url: &Url,
        path: &Path,
        progress: &Recipient<ProgressEvent>,
    ) -> DownloadResult<u64> {
        // 截断已有内容，不做续传
        let mut file = File::create(path).map_err(|source| DownloadError::FileOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let response = self.credentials.apply(self.client.get(url.clone())).send().await?;
        let status = response.status();
        if status.as_u16() >= 400 {
            self.logger.error(&format!("下载失败: {} [{}]", url, status));
            return Err(DownloadError::StreamFailure(format!("HTTP {}: {}", status, url)));
        }

        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        loop {
            let next = match self.read_timeout {
                Some(limit) => tokio::time::timeout(limit, stream.next()).await.map_err(|_| {
                    DownloadError::StreamFailure(format!("读取超时({}秒): {}", limit.as_secs(), url))
                })?,
                None => stream.next().await,
            };
            let Some(chunk) = next else {
                break;
            };
            let mut chunk: Bytes = chunk.map_err(|e| DownloadError::StreamFailure(e.to_string()))?;

            while !chunk.is_empty() {
                let piece = chunk.split_to(self.chunk_size.min(chunk.len()));
                file.write_all(&piece)?;
                written += piece.len() as u64;
                progress.do_send(ProgressEvent::BytesWritten(piece.len() as u64));
            }
        }

        file.flush()?;
        self.logger.debug(&format!("写入完成: {} ({} 字节)", path.display(), written));
        Ok(written)
    }
}
