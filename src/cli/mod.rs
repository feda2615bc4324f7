//! CLI: 命令行接口和参数解析模块
//!
//! ## 支持的命令
//!
//! - 下载整门课程：`coursedown -n <课程名> -u <邮箱> -p <密码>`
//! - 从第 N 章开始：`coursedown ... -s 3`
//! - 编辑配置：`coursedown -e`
//! - 指定配置：`coursedown -c config.conf ...`
//!
//! ## 平台默认配置路径
//!
//! - Windows: `%APPDATA%/coursedown/coursedown.conf`
//! - macOS: `~/Library/Application Support/coursedown/coursedown.conf`
//! - Linux: `~/.config/coursedown/coursedown.conf`

use clap::Parser;
use std::env;
use std::path::Path;

use crate::config::Config;
use crate::core::error::DownloadError;
use crate::utils::validator;

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/coursedown/coursedown.conf", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/coursedown/coursedown.conf", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/coursedown/coursedown.conf", home)
    }
}

/// 打开配置文件编辑器
pub fn open_config_in_editor(config_path: &str) {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("notepad").arg(config_path).status().ok();
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg("-e").arg(config_path).status().ok();
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // 优先 $EDITOR，其次 xdg-open，最后 nano
        if let Ok(editor) = env::var("EDITOR") {
            if std::process::Command::new(editor).arg(config_path).status().is_ok() {
                return;
            }
        }
        if std::process::Command::new("xdg-open").arg(config_path).status().is_err() {
            let _ = std::process::Command::new("nano").arg(config_path).status();
        }
    }
}

/// coursedown 命令行参数
///
/// 示例用法：
///   coursedown -n algo-003 -u me@example.com -p secret
///   coursedown -n algo-003 -u me@example.com -p secret -s 2 -d ./algo --concurrency 4
///   coursedown -e  # 编辑配置文件
#[derive(Parser, Debug, Clone)]
#[command(
    name = "coursedown",
    author = "panzhifu",
    version = env!("CARGO_PKG_VERSION"),
    about = "一个用 Rust 编写的课程资源并发下载工具",
    long_about = "登录课程站点，解析讲义页面中的资源链接，按章节目录并发下载，已完整的文件自动跳过。\n\n示例：\n  coursedown -n algo-003 -u me@example.com -p secret\n  coursedown -n algo-003 -u me@example.com -p secret -s 3 -d ./algo\n  coursedown -e\n"
)]
pub struct Args {
    /// 课程名（课程地址中的标识）
    #[arg(short = 'n', long = "name", required_unless_present = "edit_config")]
    pub name: Option<String>,

    /// 登录邮箱
    #[arg(short = 'u', long, required_unless_present = "edit_config")]
    pub username: Option<String>,

    /// 登录密码
    #[arg(short = 'p', long, env = "COURSEDOWN_PASSWORD", hide_env_values = true, required_unless_present = "edit_config")]
    pub password: Option<String>,

    /// 从第几章开始下载（从 1 开始）
    #[arg(short = 's', long = "chapter")]
    pub chapter: Option<usize>,

    /// 下载目录（必须已存在），覆盖配置文件中的设置
    #[arg(short = 'd', long)]
    pub directory: Option<String>,

    /// 同时下载的文件数，覆盖配置文件中的设置
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path())]
    pub config: String,

    /// 用系统默认编辑器打开配置文件并退出
    #[arg(short = 'e', long = "edit")]
    pub edit_config: bool,
}

/// 校验后的登录信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub class_name: String,
    pub username: String,
    pub password: String,
}

impl Args {
    /// 解析命令行参数并加载配置
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        let args = Args::parse();

        if args.edit_config {
            // 确保文件存在再打开
            Config::load(&args.config)?;
            open_config_in_editor(&args.config);
            std::process::exit(0);
        }

        let config = args.load_config()?;
        Ok((args, config))
    }

    /// 读取（或创建）配置文件，合并命令行参数并校验
    pub fn load_config(&self) -> Result<Config, DownloadError> {
        if let Some(parent) = Path::new(&self.config).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DownloadError::config(format!("无法创建配置目录: {}", e)))?;
        }
        let mut config = Config::load(&self.config)?;
        config.merge_from_args(self);
        config.validate()?;

        validator::validate_output_dir(&config.download_dir).map_err(|e| DownloadError::config(e.to_string()))?;
        if let Some(chapter) = self.chapter {
            validator::validate_chapter(chapter).map_err(|e| DownloadError::config(e.to_string()))?;
        }
        Ok(config)
    }

    pub fn account(&self) -> Result<Account, DownloadError> {
        let class_name = self.name.clone().unwrap_or_default();
        validator::validate_class_name(&class_name).map_err(|e| DownloadError::config(e.to_string()))?;
        match (&self.username, &self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => Ok(Account {
                class_name,
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(DownloadError::auth("缺少用户名或密码")),
        }
    }
}
