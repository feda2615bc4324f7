use reqwest::header::HeaderValue;
use std::path::{Path, PathBuf};
use url::Url;

/// 单个下载任务的输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub destination_dir: PathBuf,
}

/// 探测得到的下载目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// 跟随重定向之后的最终地址
    pub url: Url,
    pub filename: String,
    /// 来自 Content-Length，仅用于跳过判断，不保证准确
    pub expected_size: Option<u64>,
}

/// 跳过判断：文件存在且（大小未知或与预期一致）时跳过
///
/// 大小未知时直接视为已完成，这是沿用下来的兼容策略，并不校验内容。
pub fn should_skip(on_disk: Option<u64>, expected: Option<u64>) -> bool {
    match (on_disk, expected) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(actual), Some(expected)) => actual == expected,
    }
}

/// 已存在普通文件时返回其大小
pub async fn existing_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
}

/// 只接受纯数字的 Content-Length
pub fn parse_content_length(value: Option<&HeaderValue>) -> Option<u64> {
    let raw = value?.to_str().ok()?.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u64>().ok()
}

/// 从 Content-Disposition 中取文件名，`filename*=` 优先于 `filename=`
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in value.split(';') {
        let Some((key, raw)) = part.trim().split_once('=') else {
            continue;
        };
        let raw = raw.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "filename" => {
                let unquoted = raw.trim_matches(|c| c == '"' || c == '\'');
                plain = Some(percent_decode(unquoted));
            }
            "filename*" => {
                // charset'lang'encoded
                let encoded = raw.rsplit('\'').next().unwrap_or(raw);
                extended = Some(percent_decode(encoded.trim_matches('"')));
            }
            _ => {}
        }
    }

    extended.or(plain).and_then(|name| sanitize_filename(&name))
}

/// URL 路径最后一段；以 `/` 结尾的路径不是文件
pub fn filename_from_url(url: &Url) -> Option<String> {
    if url.path().ends_with('/') {
        return None;
    }
    let last = url.path_segments()?.next_back()?;
    sanitize_filename(&percent_decode(last))
}

/// 只保留最后一个路径分量，防止写出目标目录
pub fn sanitize_filename(name: &str) -> Option<String> {
    let normalized = name.replace('\\', "/");
    let last = normalized.rsplit('/').next().unwrap_or("").trim();
    if last.is_empty() || last == "." || last == ".." {
        None
    } else {
        Some(last.to_string())
    }
}

/// 章节名作为目录名
pub fn sanitize_dir_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

fn percent_decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
