use anyhow::Result;
use std::path::Path;

pub fn is_valid_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub fn validate_concurrency(concurrency: usize) -> Result<()> {
    if concurrency == 0 {
        anyhow::bail!("并发数必须大于0");
    }
    Ok(())
}

/// 起始章节从 1 开始计数
pub fn validate_chapter(chapter: usize) -> Result<()> {
    if chapter == 0 {
        anyhow::bail!("起始章节必须从1开始");
    }
    Ok(())
}

/// 下载根目录必须已存在
pub fn validate_output_dir(path: &str) -> Result<()> {
    if path.is_empty() {
        anyhow::bail!("输出路径不能为空");
    }
    if !Path::new(path).is_dir() {
        anyhow::bail!("目录不存在: {}", path);
    }
    Ok(())
}

pub fn validate_class_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.contains('/') {
        anyhow::bail!("无效的课程名: {:?}", name);
    }
    Ok(())
}
