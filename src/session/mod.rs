//! Session: 登录课程站点并取得按章节分组的资源链接

pub mod page;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, REFERER};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};

use crate::cli::Account;
use crate::config::{Config, SiteConfig};
use crate::core::credentials::Credentials;
use crate::core::error::{DownloadError, DownloadResult};
use crate::core::orchestrator::LinkGroup;
use crate::utils::logger::{Logger, LoggerExt};

pub use page::{parse_lecture_page, select_groups};

const CSRF_COOKIE: &str = "csrf_token";
const CSRF_REQUEST_COOKIE: &str = "csrftoken";
const AUTH_COOKIE: &str = "CAUTH";

/// 用账号换取后续请求所需的凭据
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, account: &Account) -> DownloadResult<Credentials>;
}

/// 按章节提供待下载链接
#[async_trait]
pub trait LinkSource: Send + Sync {
    async fn fetch_groups(&self, class_name: &str, credentials: &Credentials) -> DownloadResult<Vec<LinkGroup>>;
}

pub struct CourseSession {
    client: Client,
    probe: Client,
    site: SiteConfig,
    user_agent: String,
    logger: Logger,
}

impl CourseSession {
    pub fn new(config: &Config, logger: Logger) -> DownloadResult<Self> {
        let client = Client::builder()
            .redirect(Policy::limited(config.max_redirects))
            .connect_timeout(config.connect_timeout())
            .build()?;
        let probe = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self {
            client,
            probe,
            site: config.site.clone(),
            user_agent: config.user_agent.clone(),
            logger,
        })
    }

    fn class_url(&self, class_name: &str, tail: &str) -> String {
        format!("{}/{}/{}", self.site.class_base_url.trim_end_matches('/'), class_name, tail)
    }

    fn base_credentials(&self) -> DownloadResult<Credentials> {
        Credentials::new(&self.user_agent)
    }

    async fn csrf_token(&self, class_name: &str) -> DownloadResult<String> {
        let url = self.class_url(class_name, "lecture");
        let response = self.base_credentials()?.apply(self.probe.get(&url)).send().await?;
        find_cookie(&response, CSRF_COOKIE).ok_or_else(|| DownloadError::auth(format!("未能从 {} 获取 csrf_token", url)))
    }

    async fn login(&self, account: &Account, csrf_token: &str) -> DownloadResult<String> {
        let referer = HeaderValue::from_str(&self.site.referrer_url)
            .map_err(|_| DownloadError::config(format!("无效的 Referer: {}", self.site.referrer_url)))?;
        let token = HeaderValue::from_str(csrf_token).map_err(|_| DownloadError::auth("csrf_token 含有非法字符"))?;
        let credentials = self
            .base_credentials()?
            .with_header(REFERER, referer)
            .with_header(HeaderName::from_static("x-csrftoken"), token)
            .with_cookie(CSRF_REQUEST_COOKIE, csrf_token);

        let response = credentials
            .apply(self.client.post(&self.site.login_url))
            .form(&[("email", account.username.as_str()), ("password", account.password.as_str())])
            .send()
            .await?;
        self.logger.debug(&format!("登录响应: {}", response.status()));

        find_cookie(&response, AUTH_COOKIE).ok_or_else(|| DownloadError::auth("登录失败，请检查用户名和密码"))
    }
}

#[async_trait]
impl Authenticator for CourseSession {
    async fn authenticate(&self, account: &Account) -> DownloadResult<Credentials> {
        self.logger.info(&format!("正在登录课程 {} ...", account.class_name));
        let csrf_token = self.csrf_token(&account.class_name).await?;
        let auth_token = self.login(account, &csrf_token).await?;
        let credentials = self.base_credentials()?.with_cookie(AUTH_COOKIE, auth_token);

        // 让课程站点登记本次会话，响应内容不需要
        let url = self.class_url(&account.class_name, "auth/auth_redirector?type=login&subtype=normal");
        let response = credentials.apply(self.client.get(&url)).send().await?;
        if response.status().is_client_error() || response.status().is_server_error() {
            self.logger.warn(&format!("会话跳转返回 {}", response.status()));
        }

        self.logger.info("登录成功");
        Ok(credentials)
    }
}

#[async_trait]
impl LinkSource for CourseSession {
    async fn fetch_groups(&self, class_name: &str, credentials: &Credentials) -> DownloadResult<Vec<LinkGroup>> {
        self.logger.info("正在获取文件列表...");
        let url = self.class_url(class_name, "lecture/index");
        let response = credentials.apply(self.client.get(&url)).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DownloadError::auth(format!("会话无效或已过期: HTTP {}", status)));
        }
        let html = response.error_for_status()?.text().await?;
        let groups = parse_lecture_page(&html);
        self.logger.info(&format!(
            "解析到 {} 个章节, {} 个文件",
            groups.len(),
            groups.iter().map(|g| g.urls.len()).sum::<usize>()
        ));
        Ok(groups)
    }
}

fn find_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .cookies()
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}
