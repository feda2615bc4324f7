use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, COOKIE, USER_AGENT};
use reqwest::RequestBuilder;
use std::collections::BTreeMap;

use crate::core::error::DownloadError;

/// cookie 名 -> 值，对引擎不透明
pub type CookieBag = BTreeMap<String, String>;

/// 附加到每个请求上的固定请求头与 cookie
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub headers: HeaderMap,
    pub cookies: CookieBag,
}

impl Credentials {
    /// `Accept: */*` 与 `User-Agent: <client_id>`
    pub fn new(client_id: &str) -> Result<Self, DownloadError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(client_id)
                .map_err(|_| DownloadError::config(format!("无效的 User-Agent: {}", client_id)))?,
        );
        Ok(Self {
            headers,
            cookies: CookieBag::new(),
        })
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// `Cookie` 请求头内容，cookie 为空时返回 None
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.headers(self.headers.clone());
        match self.cookie_header() {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let creds = Credentials::new("coursera-client").unwrap();
        assert_eq!(creds.headers.get(ACCEPT).unwrap(), "*/*");
        assert_eq!(creds.headers.get(USER_AGENT).unwrap(), "coursera-client");
        assert!(creds.cookie_header().is_none());
    }

    #[test]
    fn test_cookie_header_is_joined() {
        let creds = Credentials::new("ua")
            .unwrap()
            .with_cookie("CAUTH", "abc")
            .with_cookie("csrftoken", "xyz");
        assert_eq!(creds.cookie_header().unwrap(), "CAUTH=abc; csrftoken=xyz");
    }

    #[test]
    fn test_invalid_user_agent() {
        assert!(Credentials::new("bad\nagent").is_err());
    }
}
