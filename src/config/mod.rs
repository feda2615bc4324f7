use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use crate::core::error::DownloadError;
use crate::utils::validator::{is_valid_url, validate_concurrency};

/// 课程站点地址
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SiteConfig {
    /// 课程页面根地址，后接 `/<课程名>/...`
    pub class_base_url: String,
    /// 登录接口
    pub login_url: String,
    /// 登录请求的 Referer
    pub referrer_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            class_base_url: "https://class.coursera.org".to_string(),
            login_url: "https://accounts.coursera.org/api/v1/login".to_string(),
            referrer_url: "https://accounts.coursera.org/signin".to_string(),
        }
    }
}

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// 默认下载目录
    pub download_dir: String,
    /// 最大并发下载数
    pub max_concurrent_downloads: usize,
    /// 连接超时时间（秒）
    pub connect_timeout: u64,
    /// 单次读取超时时间（秒），0 表示不限
    pub read_timeout: u64,
    /// User-Agent
    pub user_agent: String,
    /// 写盘块大小（字节）
    pub chunk_size: usize,
    /// 探测时最多跟随的重定向次数
    pub max_redirects: usize,
    /// 状态行旋转符号刷新间隔（毫秒）
    pub spinner_interval_ms: u64,
    /// 日志文件路径
    pub log_file: String,
    /// 日志文件轮转大小（字节）
    pub log_max_size: u64,
    /// 站点地址
    pub site: SiteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: ".".to_string(),
            max_concurrent_downloads: 10,
            connect_timeout: 30,
            read_timeout: 120,
            user_agent: "coursera-client".to_string(),
            chunk_size: 2048,
            max_redirects: 20,
            spinner_interval_ms: 100,
            log_file: "logs/coursedown.log".to_string(),
            log_max_size: 10 * 1024 * 1024,
            site: SiteConfig::default(),
        }
    }
}

impl Config {
    /// 加载配置文件；文件不存在时写出默认配置，格式错误时使用默认配置
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            match toml::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    log::warn!("配置文件格式错误: {}，将使用默认配置", e);
                    eprintln!("配置文件格式错误: {}，将使用默认配置", e);
                    Ok(Config::default())
                }
            }
        } else {
            let config = Config::default();
            config.save_with_tutorial(path)?;
            Ok(config)
        }
    }

    /// 保存带说明的配置文件（唯一写入方法）
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::config(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n{}", Config::tutorial_header(), config_content);
        fs::write(path, full_content)?;
        Ok(())
    }

    fn tutorial_header() -> &'static str {
        r#"# coursedown 配置文件
# ====================
#
# TOML 格式。命令行参数会覆盖这里的设置，优先级：命令行 > 配置文件 > 默认值
#
# download_dir             下载根目录，每个章节在其下建一个子目录
# max_concurrent_downloads 同时下载的文件数，建议 2-16
# connect_timeout          连接超时（秒）
# read_timeout             两次收到数据之间的最长等待（秒），0 表示不限
# user_agent               所有请求附带的 User-Agent
# chunk_size               每次写盘的块大小（字节）
# max_redirects            解析文件名时最多跟随的重定向次数
# spinner_interval_ms      状态行旋转符号刷新间隔（毫秒）
# log_file / log_max_size  日志文件与轮转大小
#
# [site] 下是课程站点的地址，一般不需要修改
#
# 使用示例：
#   coursedown -n algo-003 -u me@example.com -p secret
#   coursedown -n algo-003 -u me@example.com -p secret -s 3 -d ./algo
#   coursedown -e       # 编辑配置文件
"#
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), DownloadError> {
        validate_concurrency(self.max_concurrent_downloads).map_err(|e| DownloadError::config(e.to_string()))?;
        if self.download_dir.is_empty() {
            return Err(DownloadError::config("下载目录不能为空"));
        }
        if self.chunk_size == 0 {
            return Err(DownloadError::config("块大小必须大于0"));
        }
        if self.max_redirects == 0 {
            return Err(DownloadError::config("重定向上限必须大于0"));
        }
        if self.spinner_interval_ms == 0 {
            return Err(DownloadError::config("刷新间隔必须大于0"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(DownloadError::config("User-Agent 不能为空"));
        }
        for url in [&self.site.class_base_url, &self.site.login_url, &self.site.referrer_url] {
            if !is_valid_url(url) {
                return Err(DownloadError::config(format!("无效的站点地址: {}", url)));
            }
        }
        Ok(())
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(dir) = &args.directory {
            self.download_dir = dir.clone();
        }
        if let Some(concurrency) = args.concurrency {
            self.max_concurrent_downloads = concurrency;
        }
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout > 0).then(|| Duration::from_secs(self.read_timeout))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn spinner_interval(&self) -> Duration {
        Duration::from_millis(self.spinner_interval_ms)
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 下载目录: {}\n\
            - 并发数: {}\n\
            - 连接超时: {} 秒\n\
            - 读取超时: {}\n\
            - 块大小: {} 字节\n\
            - 重定向上限: {}\n\
            - 站点: {}",
            self.download_dir,
            self.max_concurrent_downloads,
            self.connect_timeout,
            if self.read_timeout == 0 { "不限".to_string() } else { format!("{} 秒", self.read_timeout) },
            self.chunk_size,
            self.max_redirects,
            self.site.class_base_url,
        )
    }
}
