//! 讲义页面解析
//!
//! 每个 `<h3>` 标题开启一个章节，直到下一个 `<h3>` 为止；章节内含
//! `course-item-list-section-list` 列表时才保留，链接取自其中每个
//! `course-lecture-item-resource` 块里的 `href`，按页面顺序排列。

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::core::orchestrator::LinkGroup;

const SECTION_LIST: &str = "course-item-list-section-list";
const RESOURCE_BLOCK: &str = "course-lecture-item-resource";

static HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h3[^>]*>(.*?)</h3>").expect("HEADER_PATTERN is a valid regex")
});

static HREF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("HREF_PATTERN is a valid regex")
});

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("TAG_PATTERN is a valid regex"));

static ENTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("ENTITY_PATTERN is a valid regex")
});

pub fn parse_lecture_page(html: &str) -> Vec<LinkGroup> {
    let headers: Vec<(usize, usize, &str)> = HEADER_PATTERN
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), caps.get(1)?.as_str()))
        })
        .collect();

    headers
        .iter()
        .enumerate()
        .filter_map(|(i, &(_, end, title))| {
            let section_end = headers.get(i + 1).map_or(html.len(), |next| next.0);
            let section = &html[end..section_end];
            if !section.contains(SECTION_LIST) {
                return None;
            }
            Some(LinkGroup::new(header_text(title), resource_links(section)))
        })
        .collect()
}

/// 从第 `start` 章（1 起）开始；None 表示全部
pub fn select_groups(groups: Vec<LinkGroup>, start: Option<usize>) -> Vec<LinkGroup> {
    match start {
        Some(start) => groups.into_iter().skip(start.saturating_sub(1)).collect(),
        None => groups,
    }
}

fn resource_links(section: &str) -> Vec<String> {
    section
        .split(RESOURCE_BLOCK)
        .skip(1)
        .flat_map(|block| {
            // 资源块内只有链接，到第一个 </div> 为止
            let block = block.find("</div>").map_or(block, |end| &block[..end]);
            HREF_PATTERN
                .captures_iter(block)
                .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
                .map(|href| decode_url(href.as_str()))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn header_text(raw: &str) -> String {
    let text = TAG_PATTERN.replace_all(raw, "");
    decode_entities(&text).replace('\u{a0}', "").trim().to_string()
}

fn decode_url(href: &str) -> String {
    let unescaped = decode_entities(href);
    match urlencoding::decode(&unescaped) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => unescaped,
    }
}

fn decode_entities(text: &str) -> String {
    ENTITY_PATTERN
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => {
                    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                    } else if let Some(dec) = name.strip_prefix('#') {
                        dec.parse().ok().and_then(char::from_u32)
                    } else {
                        None
                    }
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
