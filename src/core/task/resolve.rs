use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, LOCATION};
use reqwest::Client;
use std::sync::Arc;
use url::Url;

use crate::core::credentials::Credentials;
use crate::core::error::{DownloadError, DownloadResult};
use crate::utils::logger::{Logger, LoggerExt};
use super::util::{filename_from_content_disposition, filename_from_url, parse_content_length, ResolvedTarget};

/// 只看响应头的探测：逐跳跟随重定向，确定最终地址、文件名和预期大小
#[derive(Clone)]
pub struct FileResolver {
    /// 必须关闭自动重定向
    client: Client,
    credentials: Arc<Credentials>,
    max_redirects: usize,
    logger: Logger,
}

impl FileResolver {
    pub fn new(client: Client, credentials: Arc<Credentials>, max_redirects: usize, logger: Logger) -> Self {
        Self {
            client,
            credentials,
            max_redirects,
            logger,
        }
    }

    pub async fn resolve(&self, url: &str) -> DownloadResult<ResolvedTarget> {
        let mut current = Url::parse(url).map_err(|e| DownloadError::InvalidUrl(format!("{} ({})", url, e)))?;

        for hop in 0..=self.max_redirects {
            let response = self
                .credentials
                .apply(self.client.get(current.clone()))
                .send()
                .await?;
            let status = response.status();
            let headers = response.headers().clone();
            // 不读取响应体，直接关闭
            drop(response);

            if status.as_u16() >= 400 {
                self.logger.error(&format!("探测失败: {} [{}]", current, status));
                return Err(DownloadError::resolution_failed(current.as_str(), format!("HTTP {}", status)));
            }

            if let Some(location) = headers.get(LOCATION) {
                let location = location
                    .to_str()
                    .map_err(|_| DownloadError::resolution_failed(current.as_str(), "Location 头不是有效文本"))?;
                let next = current
                    .join(location)
                    .map_err(|e| DownloadError::resolution_failed(current.as_str(), format!("无效的重定向地址 {}: {}", location, e)))?;
                self.logger.debug(&format!("重定向 #{}: {} -> {}", hop + 1, current, next));
                current = next;
                continue;
            }

            let filename = headers
                .get(CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .and_then(filename_from_content_disposition)
                .or_else(|| filename_from_url(&current))
                .ok_or_else(|| DownloadError::NoFilename(current.to_string()))?;

            return Ok(ResolvedTarget {
                expected_size: parse_content_length(headers.get(CONTENT_LENGTH)),
                url: current,
                filename,
            });
        }

        Err(DownloadError::TooManyRedirects {
            url: url.to_string(),
            limit: self.max_redirects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::redirect::Policy;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(max_redirects: usize) -> FileResolver {
        let client = Client::builder().redirect(Policy::none()).build().unwrap();
        let creds = Credentials::new("coursera-client").unwrap().with_cookie("CAUTH", "secret");
        FileResolver::new(client, Arc::new(creds), max_redirects, Logger::detached("test"))
    }

    #[tokio::test]
    async fn test_content_disposition_filename() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lecture/download/7"))
            .and(header("User-Agent", "coursera-client"))
            .and(header("Cookie", "CAUTH=secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Disposition", r#"attachment; filename="notes.pdf""#)
                    .set_body_bytes(vec![0u8; 64]),
            )
            .mount(&server)
            .await;

        let target = resolver(20)
            .resolve(&format!("{}/lecture/download/7", server.uri()))
            .await
            .unwrap();
        assert_eq!(target.filename, "notes.pdf");
        assert_eq!(target.expected_size, Some(64));
    }

    #[tokio::test]
    async fn test_redirect_chain_uses_final_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/b", server.uri()))
                    .insert_header("Content-Disposition", r#"attachment; filename="wrong.pdf""#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/files/c"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/c"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "video.mp4"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/video.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 10]))
            .mount(&server)
            .await;

        let target = resolver(20).resolve(&format!("{}/a", server.uri())).await.unwrap();
        assert_eq!(target.filename, "video.mp4");
        assert_eq!(target.url.path(), "/files/video.mp4");
        assert_eq!(target.expected_size, Some(10));
    }

    #[tokio::test]
    async fn test_error_status_fails_resolution() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = resolver(20)
            .resolve(&format!("{}/missing.pdf", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::ResolutionFailed { .. }));
    }

    #[tokio::test]
    async fn test_directory_url_has_no_filename() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lecture/view/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = resolver(20)
            .resolve(&format!("{}/lecture/view/", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::NoFilename(_)));
        assert!(err.is_skip_like());
    }

    #[tokio::test]
    async fn test_redirect_cycle_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
            .expect(4)
            .mount(&server)
            .await;

        let err = resolver(3).resolve(&format!("{}/loop", server.uri())).await.unwrap_err();
        assert!(matches!(err, DownloadError::TooManyRedirects { limit: 3, .. }));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = resolver(20).resolve("not a url").await.unwrap_err();
        assert!(matches!(err, DownloadError::InvalidUrl(_)));
    }
}
