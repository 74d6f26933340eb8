//! Placeholders for spans claimed by extension rules.
//!
//! Extension rules run on the source text before comrak sees it. A claimed span
//! is replaced by a placeholder made of private-use characters and a numeric
//! id, which comrak treats as plain text. When the comrak tree is flattened,
//! placeholders are swapped for the tokens the rule produced, or for the
//! original source inside literal content such as code and raw HTML.
//!
//! The placeholder characters are picked per source, among private-use
//! characters the source does not contain, so text that looks like a
//! placeholder is never mistaken for one.

use std::{collections::HashSet, ops::RangeInclusive};

use tracing::warn;

use crate::token::{Token, TokenKind};

/// Private-use ranges placeholder characters are taken from, four at a time.
const PRIVATE_USE: [RangeInclusive<u32>; 2] = [0xE000..=0xF8FC, 0xF_0000..=0xF_FFFA];

/// Inline open, inline close, block open and block close.
const DEFAULT_MARKS: [char; 4] = ['\u{E000}', '\u{E001}', '\u{E002}', '\u{E003}'];

#[derive(Debug)]
struct Entry {
    /// The source text the placeholder replaced.
    raw: String,

    /// The tokens the placeholder stands for.
    tokens: Vec<Token>,
}

#[derive(Debug)]
pub(crate) struct Stash {
    entries: Vec<Entry>,
    inline_open: char,
    inline_close: char,
    block_open: char,
    block_close: char,
}

impl Default for Stash {
    fn default() -> Self {
        Self::with_marks(DEFAULT_MARKS)
    }
}

/// A placeholder located in text.
struct Found {
    start: usize,
    end: usize,
    id: usize,
}

impl Stash {
    /// A stash for placeholders inserted into `source`.
    pub fn new(source: &str) -> Self {
        let used: HashSet<char> = source
            .chars()
            .filter(|&c| is_private_use(c))
            .collect();
        if used.is_empty() {
            return Self::default();
        }

        let marks = PRIVATE_USE
            .iter()
            .flat_map(|range| range.clone().step_by(4))
            .filter_map(|base| {
                Some([
                    char::from_u32(base)?,
                    char::from_u32(base + 1)?,
                    char::from_u32(base + 2)?,
                    char::from_u32(base + 3)?,
                ])
            })
            .find(|marks| marks.iter().all(|c| !used.contains(c)));

        match marks {
            Some(marks) => Self::with_marks(marks),
            None => {
                warn!("No free placeholder characters, placeholders may collide.");
                Self::default()
            }
        }
    }

    const fn with_marks([inline_open, inline_close, block_open, block_close]: [char; 4]) -> Self {
        Self {
            entries: Vec::new(),
            inline_open,
            inline_close,
            block_open,
            block_close,
        }
    }

    /// Stash an inline token, returning its placeholder.
    pub fn inline(&mut self, raw: impl Into<String>, token: Token) -> String {
        self.entries.push(Entry {
            raw: raw.into(),
            tokens: vec![token],
        });

        format!(
            "{}{}{}",
            self.inline_open,
            self.entries.len() - 1,
            self.inline_close
        )
    }

    /// Stash a run of block tokens, returning its placeholder.
    pub fn block(&mut self, raw: impl Into<String>, tokens: Vec<Token>) -> String {
        self.entries.push(Entry {
            raw: raw.into(),
            tokens,
        });

        format!(
            "{}{}{}",
            self.block_open,
            self.entries.len() - 1,
            self.block_close
        )
    }

    /// Returns `true` if `line` holds a block placeholder.
    pub fn is_block_line(&self, line: &str) -> bool {
        line.contains(self.block_open)
    }

    /// The block tokens of `text`, if it consists of exactly one block
    /// placeholder.
    pub fn block_tokens(&self, text: &str) -> Option<Vec<Token>> {
        let text = text.trim();
        let found = self.find(text, 0, self.block_open, self.block_close)?;
        if found.start != 0 || found.end != text.len() {
            return None;
        }

        Some(self.entries[found.id].tokens.clone())
    }

    /// Replace every placeholder in `text` with the source it replaced.
    pub fn restore(&self, text: &str) -> String {
        self.replace(text, |entry| entry.raw.clone())
    }

    /// Replace every placeholder in `text` with its literal value: the content
    /// of an escaped character, or the source otherwise.
    pub fn restore_literal(&self, text: &str) -> String {
        self.replace(text, |entry| match entry.tokens.as_slice() {
            [token] if token.kind == TokenKind::Text => token.content.clone(),
            _ => entry.raw.clone(),
        })
    }

    /// Split `text` into text tokens and the inline tokens of its
    /// placeholders.
    pub fn expand(&self, text: &str) -> Vec<Token> {
        let mut tokens = vec![];
        let mut pos = 0;

        while let Some(found) = self.find(text, pos, self.inline_open, self.inline_close) {
            if found.start > pos {
                tokens.push(Token::text(self.restore(&text[pos..found.start])));
            }
            tokens.extend(self.entries[found.id].tokens.iter().cloned());
            pos = found.end;
        }

        if pos < text.len() {
            tokens.push(Token::text(self.restore(&text[pos..])));
        }

        tokens
    }

    fn replace(&self, text: &str, value: impl Fn(&Entry) -> String) -> String {
        if !text.contains([self.inline_open, self.block_open]) {
            return text.to_owned();
        }

        let mut out = String::with_capacity(text.len());
        let mut pos = 0;

        loop {
            let inline = self.find(text, pos, self.inline_open, self.inline_close);
            let block = self.find(text, pos, self.block_open, self.block_close);
            let next = match (inline, block) {
                (Some(a), Some(b)) => Some(if a.start < b.start { a } else { b }),
                (a, b) => a.or(b),
            };

            let Some(found) = next else {
                break;
            };

            out.push_str(&text[pos..found.start]);
            out.push_str(&value(&self.entries[found.id]));
            pos = found.end;
        }

        out.push_str(&text[pos..]);
        out
    }

    /// Find the next placeholder with a known id at or after `from`.
    fn find(&self, text: &str, from: usize, open: char, close: char) -> Option<Found> {
        let mut search = from;

        while let Some(idx) = text[search..].find(open) {
            let start = search + idx;
            let digits_start = start + open.len_utf8();
            let digits_len = text[digits_start..]
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(text.len() - digits_start);
            let digits_end = digits_start + digits_len;

            if text[digits_end..].starts_with(close)
                && let Ok(id) = text[digits_start..digits_end].parse::<usize>()
                && id < self.entries.len()
            {
                return Some(Found {
                    start,
                    end: digits_end + close.len_utf8(),
                    id,
                });
            }

            search = digits_start;
        }

        None
    }
}

fn is_private_use(c: char) -> bool {
    matches!(
        u32::from(c),
        0xE000..=0xF8FF | 0xF_0000..=0xF_FFFD | 0x10_0000..=0x10_FFFD
    )
}

#[cfg(test)]
#[path = "stash_tests.rs"]
mod tests;
