use chrono::Local; // 用于获取本地时间
use log::LevelFilter; // 用于设置日志级别
use std::io::{Write, BufWriter};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use actix::prelude::*;

/// 日志消息
pub struct LogMsg {
    pub level: LevelFilter,
    pub scope: &'static str,
    pub message: String,
}
impl Message for LogMsg { type Result = (); }

/// 文件日志 Actor，超过 `max_size` 时轮转为 `<file>.backup`
pub struct LoggerActor {
    pub writer: BufWriter<File>,
    pub level: LevelFilter,
    pub file_path: PathBuf,
    pub max_size: u64, // 最大文件大小 (bytes)
    pub current_size: u64,
}

impl LoggerActor {
    /// 创建新的日志Actor
    pub fn new(file_path: impl AsRef<Path>, level: LevelFilter, max_size: u64) -> Result<Self, std::io::Error> {
        let file_path = file_path.as_ref().to_path_buf();
        // 确保日志目录存在
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            writer: BufWriter::new(file),
            level,
            file_path,
            max_size,
            current_size,
        })
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.file_path.as_os_str().to_owned();
        name.push(".backup");
        PathBuf::from(name)
    }

    /// 检查并执行日志轮转
    fn check_rotation(&mut self) -> Result<(), std::io::Error> {
        if self.current_size > self.max_size {
            self.writer.flush()?;

            let backup_path = self.backup_path();
            if backup_path.exists() {
                std::fs::remove_file(&backup_path)?;
            }
            std::fs::rename(&self.file_path, &backup_path)?;

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)?;

            self.writer = BufWriter::new(file);
            self.current_size = 0;
        }
        Ok(())
    }

    /// 写入日志并处理错误
    fn write_log(&mut self, level: LevelFilter, scope: &str, message: &str) -> Result<(), std::io::Error> {
        if level <= self.level {
            let log_entry = format!(
                "{} [{}] {} - {}\n",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                level,
                scope,
                message
            );

            self.check_rotation()?;

            self.writer.write_all(log_entry.as_bytes())?;
            self.current_size += log_entry.len() as u64;

            // 错误立即落盘，其余按 1KB 边界刷新
            if level <= LevelFilter::Warn || self.current_size % 1024 < log_entry.len() as u64 {
                self.writer.flush()?;
            }
        }
        Ok(())
    }
}

impl Actor for LoggerActor {
    type Context = Context<Self>;

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let _ = self.writer.flush();
    }
}

impl Handler<LogMsg> for LoggerActor {
    type Result = ();
    fn handle(&mut self, msg: LogMsg, _ctx: &mut Self::Context) {
        if let Err(e) = self.write_log(msg.level, msg.scope, &msg.message) {
            eprintln!("日志写入失败: {}", e);
        }
    }
}

/// 刷新缓冲区，用于退出前
pub struct FlushLog;
impl Message for FlushLog { type Result = (); }

impl Handler<FlushLog> for LoggerActor {
    type Result = ();
    fn handle(&mut self, _msg: FlushLog, _ctx: &mut Self::Context) {
        let _ = self.writer.flush();
    }
}

/// 注入到各组件的日志句柄：同时写 `log` 门面和（可选的）文件日志 Actor
#[derive(Clone)]
pub struct Logger {
    scope: &'static str,
    sink: Option<Addr<LoggerActor>>,
}

impl Logger {
    pub fn new(sink: Addr<LoggerActor>) -> Self {
        Self {
            scope: "coursedown",
            sink: Some(sink),
        }
    }

    /// 只走 `log` 门面，不写文件
    pub fn detached(scope: &'static str) -> Self {
        Self { scope, sink: None }
    }

    /// 同一个文件日志，换一个模块名
    pub fn scoped(&self, scope: &'static str) -> Self {
        Self {
            scope,
            sink: self.sink.clone(),
        }
    }

    /// 等待文件日志写盘
    pub async fn flush(&self) {
        if let Some(sink) = &self.sink {
            let _ = sink.send(FlushLog).await;
        }
    }

    fn emit(&self, level: LevelFilter, message: &str) {
        match level {
            LevelFilter::Error => log::error!(target: self.scope, "{}", message),
            LevelFilter::Warn => log::warn!(target: self.scope, "{}", message),
            LevelFilter::Info => log::info!(target: self.scope, "{}", message),
            _ => log::debug!(target: self.scope, "{}", message),
        }
        if let Some(sink) = &self.sink {
            sink.do_send(LogMsg {
                level,
                scope: self.scope,
                message: message.to_string(),
            });
        }
    }
}

// 便捷的日志方法
pub trait LoggerExt {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn debug(&self, message: &str);
}

impl LoggerExt for Logger {
    fn info(&self, message: &str) {
        self.emit(LevelFilter::Info, message);
    }

    fn error(&self, message: &str) {
        self.emit(LevelFilter::Error, message);
    }

    fn warn(&self, message: &str) {
        self.emit(LevelFilter::Warn, message);
    }

    fn debug(&self, message: &str) {
        self.emit(LevelFilter::Debug, message);
    }
}
