use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PullError, Result};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:-(\d+))?$").expect("token pattern is valid"));

/// One comma-separated token: a single page `N` or an inclusive range `N-M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: Option<u32>,
}

impl PageRange {
    /// Parse a single token like "5" or "1-5". Bounds are not checked here.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PullError::Format("Empty page range".to_string()));
        }

        let caps = TOKEN
            .captures(s)
            .ok_or_else(|| PullError::Format(format!("Invalid page range: {}", s)))?;

        let start = parse_page_number(&caps[1])?;
        let end = caps
            .get(2)
            .map(|m| parse_page_number(m.as_str()))
            .transpose()?;

        Ok(PageRange { start, end })
    }

    fn last(&self) -> u32 {
        self.end.unwrap_or(self.start)
    }

    /// Whether every page of this token lies within `[1, total_pages]` and the
    /// bounds are ascending.
    pub fn is_within(&self, total_pages: u32) -> bool {
        self.start >= 1 && self.start <= self.last() && self.last() <= total_pages
    }

    /// Expand this range into a list of 1-based page numbers
    pub fn expand(&self, total_pages: u32) -> Result<Vec<u32>> {
        if !self.is_within(total_pages) {
            return Err(PullError::OutOfRange {
                tokens: vec![self.to_string()],
                total: total_pages,
            });
        }
        Ok((self.start..=self.last()).collect())
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}", self.start),
        }
    }
}

/// Digits too long for a `u32` saturate, so they read as a page past the end
/// of any document rather than as a syntax error.
fn parse_page_number(s: &str) -> Result<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PullError::Format(format!("Invalid page number: {}", s)));
    }
    Ok(s.parse::<u32>().unwrap_or(u32::MAX))
}

/// Parse a comma-separated list of page ranges like "1-5,10,15-20"
pub fn parse_page_ranges(s: &str) -> Result<Vec<PageRange>> {
    s.split(',').map(PageRange::parse).collect()
}

/// Each parsed range next to the trimmed text it came from.
fn parse_tokens(s: &str) -> Result<Vec<(&str, PageRange)>> {
    s.split(',')
        .map(|token| Ok((token.trim(), PageRange::parse(token)?)))
        .collect()
}

/// Expand a page range string into a list of 1-based page numbers.
///
/// Every token outside `[1, total_pages]` (or with start > end) is collected
/// into a single [`PullError::OutOfRange`] so callers can report them together.
pub fn expand_page_ranges(s: &str, total_pages: u32) -> Result<Vec<u32>> {
    let tokens = parse_tokens(s)?;

    let offending: Vec<String> = tokens
        .iter()
        .filter(|(_, r)| !r.is_within(total_pages))
        .map(|(text, _)| text.to_string())
        .collect();
    if !offending.is_empty() {
        return Err(PullError::OutOfRange {
            tokens: offending,
            total: total_pages,
        });
    }

    let mut pages = Vec::new();
    for (_, range) in tokens {
        pages.extend(range.expand(total_pages)?);
    }
    Ok(pages)
}

/// Pages kept and tokens dropped by [`resolve_lenient`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub pages: Vec<u32>,
    pub dropped: Vec<String>,
}

/// Like [`expand_page_ranges`], but pages outside the document are dropped
/// rather than rejected. Malformed tokens are still an error.
pub fn resolve_lenient(s: &str, total_pages: u32) -> Result<Resolved> {
    let mut resolved = Resolved::default();
    for (text, range) in parse_tokens(s)? {
        if !range.is_within(total_pages) {
            resolved.dropped.push(text.to_string());
        }
        let first = range.start.max(1);
        let last = range.last().min(total_pages);
        if first <= last {
            resolved.pages.extend(first..=last);
        }
    }
    Ok(resolved)
}
