//! Input normalization for names and free text.
//!
//! Author names arrive from the front-end, the spreadsheet, and the graph in
//! slightly different spellings (`[唐]李白`, `唐·李白`, ` 李 白 `). Every lookup
//! key goes through [`clean_author_name`] so the three sources agree.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading dynasty marker in brackets: `[唐]`, `【唐】`, `(唐)`, `（唐）`.
static BRACKET_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\[【(（][^\]】)）]{1,4}[\]】)）]").unwrap());

/// Leading dynasty marker before a separator dot: `唐·`, `唐•`, `唐.`.
static DOT_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[^\s·•.]{1,2}[·•.]").unwrap());

/// Normalize an author name into a lookup key.
///
/// Returns an empty string when nothing usable remains.
pub fn clean_author_name(raw: &str) -> String {
    let without_brackets = BRACKET_PREFIX_RE.replace(raw, "");
    let without_dynasty = DOT_PREFIX_RE.replace(&without_brackets, "");
    without_dynasty
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Make `name` safe to embed in a file name.
///
/// Path separators and characters reserved on common filesystems are dropped;
/// an empty result becomes `"unnamed"`.
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
