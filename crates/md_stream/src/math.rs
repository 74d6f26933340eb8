//! Math delimiter rules.
//!
//! Inline math is recognized between `$...$`, `$$...$$`, `\(...\)` and
//! `\[...\]` on a single line. Block math spans lines between `$$`, `\[ ... \]`
//! and, outside strict mode, bare `[` and `]` lines.
//!
//! An opener without a close is only math if the rest of the buffer looks like
//! math; it then becomes a loading node until the close arrives.

pub mod heuristics;

use std::sync::Arc;

use fancy_regex::Regex;
use heuristics::{currency_like, dollar_closes, dollar_opens, looks_like_math, strong_wrapper_split};
use tracing::warn;

use crate::{
    config::MathOptions,
    error::Result,
    scan::{split_prefix, strip_prefix_like},
    token::{Token, TokenKind},
    tokenizer::{
        BlockClaim, BlockRule, BlockState, InlineClaim, InlineRule, InlineState, MarkdownTokenizer,
    },
};

/// Register the `math_inline` and `math_block` rules.
///
/// `math_inline` runs before `escape`, so `\(` and `\[` reach it intact.
pub fn install(tokenizer: &mut MarkdownTokenizer, options: &MathOptions) -> Result<()> {
    let rules = Arc::new(MathRules {
        normalizer: MathNormalizer::new(options)?,
        strict: options.strict_delimiters,
    });

    let inline = Arc::clone(&rules);
    tokenizer.inline.before(
        "escape",
        "math_inline",
        Arc::new(move |state: &InlineState<'_>, pos: usize| inline.inline(state, pos))
            as InlineRule,
    )?;

    tokenizer.block.push(
        "math_block",
        Arc::new(move |state: &BlockState<'_>, line: usize| rules.block(state, line))
            as BlockRule,
    );

    Ok(())
}

/// Cleans up the content of math spans produced by upstream token streams.
#[derive(Debug)]
pub struct MathNormalizer {
    /// Matches known TeX commands missing their backslash.
    commands: Option<Regex>,
    escape_exclamation: bool,
}

impl MathNormalizer {
    /// Compile the TeX command pattern of `options`.
    pub fn new(options: &MathOptions) -> Result<Self> {
        let commands = commands_pattern(&options.commands)
            .map(|pattern| Regex::new(&pattern))
            .transpose()?;

        Ok(Self {
            commands,
            escape_exclamation: options.escape_exclamation,
        })
    }

    #[must_use]
    pub fn normalize(&self, content: &str) -> String {
        let content = escape_control_chars(content);
        let content = self.restore_commands(&content);
        let content = double_trailing_backslash(&content);

        if self.escape_exclamation {
            escape_exclamation(&content)
        } else {
            content
        }
    }

    /// Prefix known TeX commands that lost their backslash with one.
    ///
    /// A command matches when it is followed by `{`, or, for names of at least
    /// four letters, when it is a whole word.
    fn restore_commands(&self, content: &str) -> String {
        let Some(re) = &self.commands else {
            return content.to_owned();
        };

        let mut out = String::with_capacity(content.len());
        let mut copied = 0;

        for found in re.find_iter(content) {
            let found = match found {
                Ok(found) => found,
                Err(error) => {
                    warn!(%error, "Failed to match TeX commands.");
                    break;
                }
            };

            out.push_str(&content[copied..found.start()]);
            out.push('\\');
            out.push_str(found.as_str());
            copied = found.end();
        }

        out.push_str(&content[copied..]);
        out
    }
}

/// The TeX command pattern, with names sorted longest first so a command is
/// never matched by one of its prefixes.
fn commands_pattern(commands: &[String]) -> Option<String> {
    let mut names: Vec<&str> = commands.iter().map(String::as_str).collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    names.dedup();

    if names.is_empty() {
        return None;
    }

    let all = names.join("|");
    let long = names
        .iter()
        .filter(|name| name.len() >= 4)
        .copied()
        .collect::<Vec<_>>()
        .join("|");

    Some(if long.is_empty() {
        format!(r"(?<![\\A-Za-z])(?:{all})(?=\{{)")
    } else {
        format!(r"(?<![\\A-Za-z])(?:(?:{all})(?=\{{)|(?:{long})(?![A-Za-z]))")
    })
}

/// Control bytes become their two-character escape, e.g. a tab byte becomes
/// `\t`.
#[must_use]
pub fn escape_control_chars(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{b}' => out.push_str("\\v"),
            c => out.push(c),
        }
    }

    out
}

/// A lone backslash at the end of a line is a line break command missing its
/// second backslash.
#[must_use]
pub fn double_trailing_backslash(content: &str) -> String {
    content
        .split('\n')
        .map(|line| {
            let run = line.chars().rev().take_while(|&c| c == '\\').count();
            if run == 1 {
                format!("{line}\\")
            } else {
                line.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_exclamation(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut prev = None;
    for c in content.chars() {
        if c == '!' && prev != Some('\\') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }

    out
}

/// Find the byte position of `close` in `line`, starting at `from`.
///
/// Closing delimiters inside braces or escaped by a backslash do not count.
fn find_closing(line: &str, from: usize, close: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = from;

    while let Some(c) = line[pos..].chars().next() {
        if depth == 0
            && line[pos..].starts_with(close)
            && (close != "$" || dollar_closes(line, pos))
        {
            return Some(pos);
        }

        match c {
            '\\' => {
                pos += 1;
                if let Some(next) = line[pos..].chars().next() {
                    pos += next.len_utf8();
                }
                continue;
            }
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }

        pos += c.len_utf8();
    }

    None
}

#[derive(Debug)]
struct MathRules {
    normalizer: MathNormalizer,
    strict: bool,
}

impl MathRules {
    fn token(&self, kind: TokenKind, content: &str, markup: &str, raw: &str) -> Token {
        Token::leaf(kind)
            .with_content(self.normalizer.normalize(content.trim()))
            .with_markup(markup)
            .with_raw(raw)
    }

    fn inline(&self, state: &InlineState<'_>, pos: usize) -> Option<InlineClaim> {
        let line = state.text;
        let rest = &line[pos..];

        let (open, close) = if rest.starts_with("$$") {
            ("$$", "$$")
        } else if rest.starts_with('$') && dollar_opens(line, pos) {
            ("$", "$")
        } else if rest.starts_with("\\(") {
            ("\\(", "\\)")
        } else if rest.starts_with("\\[") {
            ("\\[", "\\]")
        } else {
            return None;
        };

        let start = pos + open.len();
        if let Some(close_at) = find_closing(line, start, close) {
            let content = &line[start..close_at];
            if content.trim().is_empty() || content.contains('`') {
                return None;
            }

            let end = close_at + close.len();
            return Some(InlineClaim {
                len: end - pos,
                token: self.token(TokenKind::MathInline, content, open, &line[pos..end]),
            });
        }

        // Only the end of the buffer can still receive the close.
        if !state.at_end {
            return None;
        }

        let rest = &line[start..];
        let content = &rest[..strong_wrapper_split(&line[..pos], rest)];
        if content.trim().is_empty()
            || content.contains('`')
            || !looks_like_math(content)
            || (open == "$" && currency_like(content))
        {
            return None;
        }

        let final_ = state.env.final_;
        if final_ && self.strict {
            return None;
        }

        let end = start + content.len();
        Some(InlineClaim {
            len: end - pos,
            token: self
                .token(TokenKind::MathInline, content, open, &line[pos..end])
                .with_loading(!final_),
        })
    }

    fn block(&self, state: &BlockState<'_>, line: usize) -> Option<BlockClaim> {
        let lines = state.lines;
        let (prefix, first) = split_prefix(lines[line]);
        let first = first.trim_end();

        let (open, close) = if first.starts_with("$$") {
            ("$$", "$$")
        } else if first.starts_with("\\[") {
            ("\\[", "\\]")
        } else if !self.strict && first == "[" {
            ("[", "]")
        } else {
            return None;
        };
        let bare = open == "[";
        let after_open = &first[open.len()..];

        // `$$x$$` on a line of its own.
        if !bare && let Some(idx) = find_closing(after_open, 0, close) {
            if !after_open[idx + close.len()..].trim().is_empty()
                || after_open[..idx].trim().is_empty()
            {
                return None;
            }

            return Some(self.claim(state, line, line + 1, &after_open[..idx], open, false));
        }

        let mut content = vec![after_open];
        for (idx, next) in lines.iter().enumerate().skip(line + 1) {
            let text = strip_prefix_like(next, prefix).trim_end();
            let closes = if bare {
                text.trim() == close
            } else {
                text.ends_with(close)
            };

            if closes {
                content.push(&text[..text.len() - close.len()]);
                let content = content.join("\n");
                if bare && !looks_like_math(&content) {
                    return None;
                }

                return Some(self.claim(state, line, idx + 1, &content, open, false));
            }

            content.push(text);
        }

        let content = content.join("\n");
        if (bare && !looks_like_math(&content)) || (state.env.final_ && self.strict) {
            return None;
        }

        let end = lines
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map_or(line + 1, |idx| idx.max(line) + 1);

        Some(self.claim(state, line, end, &content, open, !state.env.final_))
    }

    fn claim(
        &self,
        state: &BlockState<'_>,
        start: usize,
        end: usize,
        content: &str,
        open: &str,
        loading: bool,
    ) -> BlockClaim {
        let raw = state.lines[start..end].join("\n");
        let token = self
            .token(TokenKind::MathBlock, content, open, &raw)
            .with_map(Some([state.offset + start, state.offset + end]))
            .with_loading(loading);

        BlockClaim {
            end,
            tokens: vec![token],
        }
    }
}

#[cfg(test)]
#[path = "math_tests.rs"]
mod tests;
