//! The `::: name {json}` fenced container rule.
//!
//! ```markdown
//! ::: card {"id": 3} Optional title
//! Any *Markdown*, including nested containers.
//! :::
//! ```
//!
//! The inner lines are tokenized recursively and wrapped in a container open
//! and close pair. Admonition names (`note`, `warning`, ...) produce
//! `admonition` tokens, any other name a `vmr_container`.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::{
    scan::{FenceTracker, split_prefix, strip_prefix_like},
    token::{Token, TokenKind},
    tokenizer::{BlockClaim, BlockRule, BlockState, MarkdownTokenizer},
};

/// Container names rendered as admonitions.
pub const ADMONITIONS: &[&str] = &[
    "note",
    "tip",
    "info",
    "warning",
    "danger",
    "caution",
    "important",
    "error",
];

/// Register the `container` block rule.
pub fn install(tokenizer: &mut MarkdownTokenizer) {
    tokenizer
        .block
        .push("container", Arc::new(container) as BlockRule);
}

/// The parsed opening line of a container.
#[derive(Debug, PartialEq)]
pub struct Opener<'a> {
    pub name: &'a str,
    pub attrs: Option<Value>,
    pub title: &'a str,
}

/// Parse a container opening line, without its container prefix.
#[must_use]
pub fn parse_opener(line: &str) -> Option<Opener<'_>> {
    let line = line.trim();
    let colons = line.chars().take_while(|&c| c == ':').count();
    if colons < 3 {
        return None;
    }

    let rest = line[colons..].trim_start();
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }

    let name = &rest[..name_len];
    let rest = rest[name_len..].trim();
    if !rest.starts_with('{') {
        return Some(Opener {
            name,
            attrs: None,
            title: rest,
        });
    }

    // Attributes still streaming in are dropped until their brace closes.
    let Some(end) = json_end(rest) else {
        return Some(Opener {
            name,
            attrs: None,
            title: "",
        });
    };

    let attrs = match serde_json::from_str(&rest[..end]) {
        Ok(attrs) => Some(attrs),
        Err(error) => {
            trace!(name, %error, "Ignoring invalid container attributes.");
            None
        }
    };

    Some(Opener {
        name,
        attrs,
        title: rest[end..].trim(),
    })
}

/// Byte position after the brace closing the JSON object at the start of
/// `text`. Braces inside strings do not count.
fn json_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// A line of colons only.
fn is_closing(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && line.chars().all(|c| c == ':')
}

fn container(state: &BlockState<'_>, line: usize) -> Option<BlockClaim> {
    let lines = state.lines;
    let (prefix, content) = split_prefix(lines[line]);
    let opener = parse_opener(content)?;

    let mut fences = FenceTracker::new();
    let mut depth = 0usize;
    let mut close = None;

    for (idx, next) in lines.iter().enumerate().skip(line + 1) {
        let text = strip_prefix_like(next, prefix);
        if fences.push_line(text).in_code() {
            continue;
        }

        if parse_opener(text).is_some() {
            depth += 1;
        } else if is_closing(text) {
            if depth == 0 {
                close = Some(idx);
                break;
            }
            depth -= 1;
        }
    }

    let (inner_end, end) = match close {
        Some(idx) => (idx, idx + 1),
        None => {
            let end = lines
                .iter()
                .rposition(|l| !l.trim().is_empty())
                .map_or(line + 1, |idx| idx.max(line) + 1);

            // A closing fence that is still being typed.
            let last = strip_prefix_like(lines[end - 1], prefix).trim();
            let partial = end > line + 1
                && !state.env.final_
                && !last.is_empty()
                && last.chars().all(|c| c == ':');

            (if partial { end - 1 } else { end }, end)
        }
    };

    let inner = lines[line + 1..inner_end]
        .iter()
        .map(|l| strip_prefix_like(l, prefix))
        .collect::<Vec<_>>()
        .join("\n");

    let loading = close.is_none() && !state.env.final_;
    let kind = if ADMONITIONS.contains(&opener.name) {
        TokenKind::Admonition
    } else {
        TokenKind::VmrContainer
    };

    trace!(
        name = opener.name,
        line = state.offset + line,
        closed = close.is_some(),
        "Matched container."
    );

    let mut open = Token::open(kind)
        .with_tag("div")
        .with_markup(":::")
        .with_info(opener.name)
        .with_content(opener.title)
        .with_map(Some([state.offset + line, state.offset + end]))
        .with_raw(lines[line..end].join("\n"))
        .with_loading(loading);
    open.meta = opener.attrs;

    let mut tokens = vec![open];
    tokens.extend(
        state
            .tokenizer
            .tokenize_at(&inner, state.env, state.offset + line + 1),
    );
    tokens.push(
        Token::close(kind)
            .with_tag("div")
            .with_markup(":::")
            .with_loading(loading),
    );

    Some(BlockClaim { end, tokens })
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
