//! Text shaping for search snippets and HTML output

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_SNIPPET_LENGTH: usize = 200;

const CONTEXT_BEFORE: usize = 50;
const CONTEXT_AFTER: usize = 150;
const ELLIPSIS: &str = "...";

lazy_static! {
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").expect("static whitespace pattern");
}

pub struct TextUtils;

impl TextUtils {
    /// A window of context around the first case-insensitive occurrence of
    /// `query`, measured in characters. Falls back to the first `max_length`
    /// characters when there is no match. `None` for empty or missing text.
    pub fn create_snippet(text: Option<&str>, query: &str, max_length: usize) -> Option<String> {
        let text = text.filter(|t| !t.is_empty())?;
        let chars: Vec<char> = text.chars().collect();
        let needle: Vec<char> = query.chars().collect();

        let Some(position) = Self::find_ignore_case(&chars, &needle) else {
            if chars.len() > max_length {
                let mut snippet: String = chars[..max_length].iter().collect();
                snippet.push_str(ELLIPSIS);
                return Some(snippet);
            }
            return Some(text.to_string());
        };

        let start = position.saturating_sub(CONTEXT_BEFORE);
        let end = chars.len().min(position + needle.len() + CONTEXT_AFTER);

        let mut snippet = String::with_capacity(end - start + 2 * ELLIPSIS.len());
        if start > 0 {
            snippet.push_str(ELLIPSIS);
        }
        snippet.extend(&chars[start..end]);
        if end < chars.len() {
            snippet.push_str(ELLIPSIS);
        }
        Some(snippet)
    }

    /// Character index of the first case-insensitive match.
    fn find_ignore_case(haystack: &[char], needle: &[char]) -> Option<usize> {
        if needle.is_empty() {
            return Some(0);
        }
        if needle.len() > haystack.len() {
            return None;
        }
        (0..=haystack.len() - needle.len()).find(|&start| {
            haystack[start..start + needle.len()]
                .iter()
                .zip(needle)
                .all(|(a, b)| Self::chars_eq_ignore_case(*a, *b))
        })
    }

    fn chars_eq_ignore_case(a: char, b: char) -> bool {
        a == b || a.to_lowercase().eq(b.to_lowercase())
    }

    /// Escape text for interpolation into HTML element content or attribute values.
    pub fn escape_html(text: &str) -> Cow<'_, str> {
        if !text.contains(['&', '<', '>', '"', '\'']) {
            return Cow::Borrowed(text);
        }
        let mut escaped = String::with_capacity(text.len() + 16);
        for c in text.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#x27;"),
                other => escaped.push(other),
            }
        }
        Cow::Owned(escaped)
    }

    /// Collapse runs of whitespace (newlines included) into single spaces.
    pub fn normalize_whitespace(text: &str) -> Cow<'_, str> {
        if WHITESPACE_REGEX.find_iter(text).any(|m| m.as_str() != " ") || text.trim() != text {
            Cow::Owned(WHITESPACE_REGEX.replace_all(text, " ").trim().to_string())
        } else {
            Cow::Borrowed(text)
        }
    }

    /// At most `max_chars` characters, ending in an ellipsis when cut.
    pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> Cow<'_, str> {
        if text.chars().count() <= max_chars {
            Cow::Borrowed(text)
        } else if max_chars <= ELLIPSIS.len() {
            Cow::Borrowed(ELLIPSIS)
        } else {
            let mut result: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();
            result.push_str(ELLIPSIS);
            Cow::Owned(result)
        }
    }

    /// Single-line preview for table cells.
    pub fn preview(text: Option<&str>, max_chars: usize) -> String {
        let text = text.unwrap_or_default();
        Self::truncate_with_ellipsis(&Self::normalize_whitespace(text), max_chars).into_owned()
    }

    /// `1234567` -> `1,234,567`
    pub fn format_count(value: i64) -> String {
        let digits = value.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
        if value < 0 {
            grouped.push('-');
        }
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        grouped
    }

    pub fn format_duration(duration_ms: Option<f64>) -> String {
        match duration_ms {
            None => "-".to_string(),
            Some(ms) if ms < 1000.0 => format!("{:.0}ms", ms),
            Some(ms) => format!("{:.2}s", ms / 1000.0),
        }
    }
}
