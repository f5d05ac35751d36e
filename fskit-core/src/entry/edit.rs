//! Pure text-editing primitives behind [`FileEntry`](super::file::FileEntry)'s
//! in-place operations. Everything here is read-modify-write at the string
//! level; positions are byte offsets into UTF-8 text.

use anyhow::{bail, Result};

/// Byte offsets of every occurrence of `pattern`, left to right,
/// non-overlapping. Literal substring search, not regex.
pub fn find_all(text: &str, pattern: &str) -> Vec<usize> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(i) = text[from..].find(pattern) {
        let at = from + i;
        out.push(at);
        from = at + pattern.len();
    }
    out
}

/// Replace up to `limit` occurrences of `old` with `new`, left to right
/// (all occurrences when `limit` is `None`). Scanning resumes after each
/// inserted replacement, so `new` containing `old` cannot loop. Returns
/// the rewritten text and the number of replacements made.
pub fn replace_limited(
    text: &str,
    old: &str,
    new: &str,
    limit: Option<usize>,
) -> (String, usize) {
    if old.is_empty() || limit == Some(0) {
        return (text.to_string(), 0);
    }
    let mut out = text.to_string();
    let mut count = 0;
    let mut from = 0;
    while let Some(i) = out[from..].find(old) {
        let at = from + i;
        out.replace_range(at..at + old.len(), new);
        from = at + new.len();
        count += 1;
        if limit.is_some_and(|limit| count >= limit) {
            break;
        }
    }
    (out, count)
}

/// Replace the whole line containing each occurrence of `pattern` with
/// `new_line`, up to `limit` lines. The trailing newline of the original
/// line is preserved. Returns the rewritten text and the line count.
pub fn replace_lines_limited(
    text: &str,
    pattern: &str,
    new_line: &str,
    limit: Option<usize>,
) -> (String, usize) {
    if pattern.is_empty() || limit == Some(0) {
        return (text.to_string(), 0);
    }
    let mut out = text.to_string();
    let mut count = 0;
    let mut from = 0;
    while let Some(i) = out[from..].find(pattern) {
        let at = from + i;
        let line_start = out[..at].rfind('\n').map(|p| p + 1).unwrap_or(0);
        let line_end = out[at..].find('\n').map(|p| at + p).unwrap_or(out.len());
        out.replace_range(line_start..line_end, new_line);
        from = line_start + new_line.len();
        count += 1;
        if limit.is_some_and(|limit| count >= limit) {
            break;
        }
    }
    (out, count)
}

/// One bound of a crop span: either an explicit byte offset or a pattern
/// whose first occurrence marks the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CropBound {
    Index(usize),
    Pattern(String),
}

impl CropBound {
    fn locate(&self, text: &str, from: usize) -> Option<usize> {
        match self {
            CropBound::Index(i) => Some(*i),
            CropBound::Pattern(p) => text.get(from..)?.find(p).map(|i| from + i),
        }
    }
}

/// Cut the `(start, end)` spans out of `text`. A span whose bounds cannot
/// be located, come out of order, or fall on a non-boundary offset is
/// skipped with a warning rather than aborting the whole edit. In
/// `coherent` mode each span's patterns are searched from where the
/// previous span was cut, so repeated patterns walk forward through the
/// text. Returns the cropped text and the number of spans applied.
pub fn crop_spans(text: &str, spans: &[(CropBound, CropBound)], coherent: bool) -> (String, usize) {
    let mut out = text.to_string();
    let mut applied = 0;
    let mut resume = 0;
    for (start_bound, end_bound) in spans {
        let search_from = if coherent { resume } else { 0 };
        let Some(start) = start_bound.locate(&out, search_from) else {
            tracing::warn!(?start_bound, "crop span start not found, skipped");
            continue;
        };
        let end_from = if coherent { start.max(resume) + 1 } else { start + 1 };
        let Some(end) = end_bound.locate(&out, end_from.min(out.len())) else {
            tracing::warn!(?end_bound, "crop span end not found, skipped");
            continue;
        };
        if !(start < end && end <= out.len())
            || !out.is_char_boundary(start)
            || !out.is_char_boundary(end)
        {
            tracing::warn!(start, end, "invalid crop span, skipped");
            continue;
        }
        out.replace_range(start..end, "");
        resume = start;
        applied += 1;
    }
    (out, applied)
}

/// Insert `insertion` at byte offset `position`.
pub fn insert_at(text: &str, insertion: &str, position: usize) -> Result<String> {
    if position > text.len() || !text.is_char_boundary(position) {
        bail!(
            "Insert position {position} is not a valid offset into {} bytes of text",
            text.len()
        );
    }
    let mut out = text.to_string();
    out.insert_str(position, insertion);
    Ok(out)
}
