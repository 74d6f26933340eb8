//! Mid-state buffer normalization.
//!
//! A streaming buffer is a prefix of its final content. Some prefixes make the
//! tokenizer commit to a block type that disappears a character later: a lone
//! `-` line is an empty list item until the next `-` turns it into a rule, a
//! trailing `<di` is text until it becomes a `<div>`. The rules in this module
//! rewrite those prefixes before tokenization, so the rendered tree does not
//! flicker.
//!
//! Each rule is a pure function of the buffer and can be tested on its own.

use std::borrow::Cow;

use tracing::trace;

use crate::{
    config::ControlBytes,
    html,
    scan::{FenceTracker, LineKind},
};

/// Lines that the tokenizer commits to a block type too early.
const LONE_MARKERS: &[&str] = &["-", "--", ">", "*", "+"];

/// Normalize `buffer` before tokenization.
///
/// The mid-state rules only run while the stream is incomplete. The rules that
/// repair the buffer itself (`control_byte_latex`, `closing_tag_boundary`) run
/// in both modes.
#[must_use]
pub fn normalize(
    buffer: &str,
    is_final: bool,
    custom_tags: &[String],
    control_bytes: ControlBytes,
) -> String {
    let mut out = control_byte_latex(buffer, control_bytes).into_owned();

    if !is_final {
        apply(&mut out, "dangling_tag", strip_dangling_tag);
        apply(&mut out, "dash_star", escape_dash_star);
        apply(&mut out, "lone_marker_line", strip_lone_marker_line);
        apply(&mut out, "dangling_bracket", strip_dangling_bracket);
    }

    apply(&mut out, "closing_tag_boundary", |buffer| {
        closing_tag_boundary(buffer, custom_tags)
    });

    out
}

/// Maps offsets of a normalized buffer back to the buffer it was built from.
///
/// Normalization only inserts ASCII bytes, turns a control byte into its
/// escape letter, and cuts the tail of the buffer. Aligning the two buffers
/// byte by byte is enough to recover the inserted bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    /// Offsets in the normalized buffer of the bytes it does not share with
    /// the source.
    inserted: Vec<usize>,
}

impl SourceMap {
    #[must_use]
    pub fn new(source: &str, normalized: &str) -> Self {
        let source = source.as_bytes();
        let mut inserted = vec![];
        let mut idx = 0;

        for (offset, &byte) in normalized.as_bytes().iter().enumerate() {
            match source.get(idx) {
                Some(&b) if b == byte => idx += 1,
                Some(b'\r') if byte == b'r' => idx += 1,
                Some(b'\n') if byte == b'n' => idx += 1,
                _ => inserted.push(offset),
            }
        }

        Self { inserted }
    }

    /// The source offset of normalized offset `offset`.
    #[must_use]
    pub fn to_source(&self, offset: usize) -> usize {
        offset - self.inserted.partition_point(|&idx| idx < offset)
    }
}

fn apply(buffer: &mut String, rule: &'static str, f: impl Fn(&str) -> Cow<'_, str>) {
    let changed = match f(buffer) {
        Cow::Owned(changed) => changed,
        Cow::Borrowed(_) => return,
    };

    trace!(rule, before = buffer.len(), after = changed.len(), "Normalized buffer.");
    *buffer = changed;
}

/// Returns `true` if byte `pos` lies inside a fenced code block that is still
/// open at the start of its line.
fn in_open_fence(buffer: &str, pos: usize) -> bool {
    let line_start = buffer[..pos].rfind('\n').map_or(0, |i| i + 1);
    if line_start == 0 {
        return false;
    }

    let mut fences = FenceTracker::new();
    for line in buffer[..line_start - 1].split('\n') {
        fences.push_line(line);
    }

    fences.in_fence()
}

/// The start offset and text of the last line, ignoring one trailing newline.
fn last_line(buffer: &str) -> (usize, &str) {
    let body = buffer.strip_suffix('\n').unwrap_or(buffer);
    let start = body.rfind('\n').map_or(0, |i| i + 1);
    (start, &body[start..])
}

/// Strip a trailing `<...` that is the unfinished prefix of an HTML tag.
///
/// Kept when the `<` is inside an open fence or code span, or directly follows
/// a word character (`a<b` is a comparison, not a tag).
#[must_use]
pub fn strip_dangling_tag(buffer: &str) -> Cow<'_, str> {
    let Some(pos) = buffer.rfind('<') else {
        return Cow::Borrowed(buffer);
    };

    let tail = &buffer[pos..];
    if tail.contains("\n\n") || !html::is_partial_tag(tail) {
        return Cow::Borrowed(buffer);
    }

    if buffer[..pos]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
    {
        return Cow::Borrowed(buffer);
    }

    let line_start = buffer[..pos].rfind('\n').map_or(0, |i| i + 1);
    if buffer[line_start..pos].matches('`').count() % 2 == 1 || in_open_fence(buffer, pos) {
        return Cow::Borrowed(buffer);
    }

    Cow::Owned(buffer[..pos].to_owned())
}

/// Blank a trailing line that only holds `-`, `--`, `>`, `*` or `+`.
#[must_use]
pub fn strip_lone_marker_line(buffer: &str) -> Cow<'_, str> {
    let (start, line) = last_line(buffer);
    if !LONE_MARKERS.contains(&line.trim()) || in_open_fence(buffer, start) {
        return Cow::Borrowed(buffer);
    }

    Cow::Owned(buffer[..start].to_owned())
}

/// Blank a trailing line that only holds `[` or `(` characters.
#[must_use]
pub fn strip_dangling_bracket(buffer: &str) -> Cow<'_, str> {
    let line_start = buffer.rfind('\n').map_or(0, |i| i + 1);
    let line = buffer[line_start..].trim();
    if line.is_empty()
        || !line.chars().all(|c| c == '[' || c == '(')
        || in_open_fence(buffer, line_start)
    {
        return Cow::Borrowed(buffer);
    }

    Cow::Owned(buffer[..line_start].to_owned())
}

/// Escape the `*` of a trailing `- *` line, which would otherwise open a
/// nested list.
#[must_use]
pub fn escape_dash_star(buffer: &str) -> Cow<'_, str> {
    let line_start = buffer.rfind('\n').map_or(0, |i| i + 1);
    let line = &buffer[line_start..];
    if line.trim() != "- *" || in_open_fence(buffer, line_start) {
        return Cow::Borrowed(buffer);
    }

    let Some(star) = line.rfind('*') else {
        return Cow::Borrowed(buffer);
    };

    let star = line_start + star;
    Cow::Owned(format!("{}\\{}", &buffer[..star], &buffer[star..]))
}

/// Restore TeX commands whose backslash was emitted as a raw control byte.
///
/// Turns `\r` (carriage return) followed by `ight` or `ho`, and `\n` (line
/// feed) followed by `abla`, `eq`, `ot` or `exists`, back into the two
/// character escape. The control byte must follow text, not a line break.
///
/// With [`ControlBytes::Guarded`], the suffix must also end at a non-letter,
/// and a line feed is only considered after a character that typically
/// precedes a command inside math: whitespace, an opening delimiter, an
/// operator or a digit.
#[must_use]
pub fn control_byte_latex(buffer: &str, mode: ControlBytes) -> Cow<'_, str> {
    const CR_SUFFIXES: &[&str] = &["ight", "ho"];
    const LF_SUFFIXES: &[&str] = &["abla", "eq", "ot", "exists"];

    if !buffer.contains(['\r', '\n']) {
        return Cow::Borrowed(buffer);
    }

    let mut out = String::new();
    let mut copied = 0;
    let guarded = mode == ControlBytes::Guarded;
    let mut prev: Option<char> = None;

    for (idx, c) in buffer.char_indices() {
        let after_text = prev.is_some_and(|p| !matches!(p, '\n' | '\r'));
        let (suffixes, escape, prev_ok) = match c {
            '\r' => (CR_SUFFIXES, "\\r", after_text),
            '\n' if guarded => (LF_SUFFIXES, "\\n", prev.is_some_and(precedes_command)),
            '\n' => (LF_SUFFIXES, "\\n", after_text),
            _ => {
                prev = Some(c);
                continue;
            }
        };
        prev = Some(c);

        let rest = &buffer[idx + 1..];
        let matched = suffixes.iter().any(|suffix| {
            rest.starts_with(suffix)
                && !(guarded
                    && rest[suffix.len()..]
                        .chars()
                        .next()
                        .is_some_and(|c| c.is_ascii_alphabetic()))
        });

        if prev_ok && matched {
            out.push_str(&buffer[copied..idx]);
            out.push_str(escape);
            copied = idx + 1;
        }
    }

    if copied == 0 {
        return Cow::Borrowed(buffer);
    }

    out.push_str(&buffer[copied..]);
    Cow::Owned(out)
}

fn precedes_command(c: char) -> bool {
    (c.is_whitespace() && c != '\n')
        || c.is_ascii_digit()
        || matches!(c, '{' | '(' | '[' | '$' | '=' | '&' | '^' | '_' | '+' | '-')
}

/// Insert a blank line after a line that only holds the closing tag of a
/// custom element, when content follows on the next line.
///
/// Without the blank line, the tokenizer keeps the following lines inside the
/// HTML block.
#[must_use]
pub fn closing_tag_boundary<'a>(buffer: &'a str, custom_tags: &[String]) -> Cow<'a, str> {
    if custom_tags.is_empty() || !buffer.contains("</") {
        return Cow::Borrowed(buffer);
    }

    let lines: Vec<&str> = buffer.split('\n').collect();
    let mut fences = FenceTracker::new();
    let mut out = String::with_capacity(buffer.len() + 8);
    let mut changed = false;

    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(line);

        let kind = fences.push_line(line);
        if kind == LineKind::Text
            && is_closing_tag_line(line, custom_tags)
            && lines.get(idx + 1).is_some_and(|next| !next.trim().is_empty())
        {
            out.push('\n');
            changed = true;
        }
    }

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(buffer)
    }
}

fn is_closing_tag_line(line: &str, custom_tags: &[String]) -> bool {
    let line = line.trim();
    match html::parse_tag(line) {
        Some(tag) => {
            tag.closing && tag.len == line.len() && custom_tags.iter().any(|t| *t == tag.name)
        }
        None => false,
    }
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
