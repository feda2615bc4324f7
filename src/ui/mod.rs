mod progress;

use crossterm::style::Stylize;
use std::fmt;
pub use progress::ProgressDisplay;

pub fn finished_message(filename: &str, size: u64) -> String {
    format!("Finished: {}. Size {} bytes", filename, size)
}

pub fn skipped_message(filename: &str) -> String {
    format!("Skipped: {}", filename)
}

pub fn finished_line(filename: &str, size: u64) -> String {
    finished_message(filename, size).green().to_string()
}

pub fn skipped_line(filename: &str) -> String {
    skipped_message(filename).red().to_string()
}

pub fn print_banner(total_files: usize) {
    println!("{}", format!("Starting to download {} files", total_files).red());
}

pub fn print_error(message: &str) {
    eprintln!("✗ {}", message.red());
}

pub struct DownloadSummary {
    pub total_files: usize,
    pub finished: usize,
    pub skipped: usize,
    pub total_size: u64,
    pub elapsed_time: std::time::Duration,
}

impl fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n下载摘要:")?;
        writeln!(f, "总文件数: {}", self.total_files)?;
        writeln!(f, "完成: {}", self.finished)?;
        writeln!(f, "跳过: {}", self.skipped)?;
        writeln!(
            f,
            "未完成: {}",
            self.total_files.saturating_sub(self.finished + self.skipped)
        )?;
        writeln!(f, "总大小: {}", format_size(self.total_size))?;
        writeln!(f, "耗时: {:.2}秒", self.elapsed_time.as_secs_f64())?;
        Ok(())
    }
}

pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// 速度（字节/秒）格式化，例如 `1.50 MB/s`
pub fn format_speed(bytes_per_sec: f64) -> String {
    let speed = if bytes_per_sec.is_finite() && bytes_per_sec > 0.0 {
        bytes_per_sec as u64
    } else {
        0
    };
    format!("{}/s", format_size(speed))
}
