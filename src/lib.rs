//! coursedown: 课程页面资源的并发下载工具
//!
//! - `core`: 并发下载引擎（容量闸门、文件名解析、流式写盘、进度汇总、批量调度）
//! - `session`: 登录与课程页面解析，产出按章节分组的链接列表
//! - `config` / `cli`: 配置文件与命令行参数
//! - `ui`: 控制台输出
//! - `utils`: 日志与参数校验

pub mod cli;
pub mod config;
pub mod core;
pub mod session;
pub mod ui;
pub mod utils;
