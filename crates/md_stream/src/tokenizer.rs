//! The tokenizer: comrak extended with ordered, named rule chains.
//!
//! comrak parses CommonMark and GFM, but offers no hooks to add syntax. The
//! extension rules therefore run around it:
//!
//! 1. **block rules** scan source lines. A claimed line range is replaced by a
//!    block placeholder.
//! 2. **inline rules** scan the text of each paragraph outside fenced code and
//!    code spans. A claimed span is replaced by an inline placeholder, so
//!    comrak's emphasis and escape handling cannot split it. A span may cross
//!    the soft line breaks of its paragraph.
//! 3. comrak parses the rewritten text, and the tree is flattened into tokens,
//!    swapping placeholders for the tokens the rules produced.
//! 4. **core rules** rewrite the flat token array.

mod flatten;
mod ruler;
mod stash;

use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use comrak::{
    Arena,
    options::{Extension, Parse},
};
pub(crate) use flatten::{merge_text, plain_text};
pub use ruler::Ruler;
use stash::Stash;
use tracing::{trace, warn};

use crate::{
    error::Result,
    scan::{FenceTracker, fence_start, is_thematic_break, split_prefix},
    token::Token,
};

/// Per-parse state shared by all rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Env {
    /// The stream is complete.
    pub final_: bool,

    /// Unclosed `**` stays literal text.
    pub require_closing_strong: bool,
}

/// What a block rule sees.
pub struct BlockState<'a> {
    /// The lines of the text being tokenized.
    pub lines: &'a [&'a str],

    /// Line offset of `lines` within the document.
    pub offset: usize,

    pub env: &'a Env,

    /// The tokenizer running the rule, for nested tokenization.
    pub tokenizer: &'a MarkdownTokenizer,
}

/// A line range claimed by a block rule.
#[derive(Debug)]
pub struct BlockClaim {
    /// The (exclusive) line the claim ends at.
    pub end: usize,

    pub tokens: Vec<Token>,
}

/// What an inline rule sees.
pub struct InlineState<'a> {
    /// The lines of one paragraph, joined by `\n`.
    pub text: &'a str,

    /// Only blank lines follow the text. Unclosed constructs here may still be
    /// closed by the stream.
    pub at_end: bool,

    pub env: &'a Env,
}

/// A span claimed by an inline rule.
#[derive(Debug)]
pub struct InlineClaim {
    /// Byte length of the claimed span.
    pub len: usize,

    pub token: Token,
}

pub type BlockRule = Arc<dyn Fn(&BlockState<'_>, usize) -> Option<BlockClaim> + Send + Sync>;
pub type InlineRule = Arc<dyn Fn(&InlineState<'_>, usize) -> Option<InlineClaim> + Send + Sync>;
pub type CoreRule = Arc<dyn Fn(Vec<Token>, &Env) -> Result<Vec<Token>> + Send + Sync>;

/// The base tokenizer with its extension rule chains.
#[derive(Default)]
pub struct MarkdownTokenizer {
    pub block: Ruler<BlockRule>,
    pub inline: Ruler<InlineRule>,
    pub core: Ruler<CoreRule>,
}

impl fmt::Debug for MarkdownTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkdownTokenizer")
            .field("block", &self.block)
            .field("inline", &self.inline)
            .field("core", &self.core)
            .finish()
    }
}

/// The lines comrak parses, and the source lines each one stands for.
#[derive(Debug, Default)]
struct Rewritten {
    lines: Vec<String>,
    map: Vec<[usize; 2]>,
}

impl Rewritten {
    fn push(&mut self, line: String, map: [usize; 2]) {
        self.lines.push(line);
        self.map.push(map);
    }

    fn ends_with_blank(&self) -> bool {
        self.lines.last().is_none_or(|l| l.trim().is_empty())
    }
}

impl MarkdownTokenizer {
    /// A tokenizer with the base `escape` inline rule and no extensions.
    #[must_use]
    pub fn new() -> Self {
        let mut tokenizer = Self::default();
        tokenizer.inline.push("escape", Arc::new(escape) as InlineRule);
        tokenizer
    }

    /// Tokenize `source` and run the core rules.
    #[must_use]
    pub fn parse(&self, source: &str, env: &Env) -> Vec<Token> {
        let tokens = self.tokenize(source, env);
        self.run_core(tokens, env)
    }

    /// Run the block and inline stages and comrak, without the core rules.
    #[must_use]
    pub fn tokenize(&self, source: &str, env: &Env) -> Vec<Token> {
        self.tokenize_at(source, env, 0)
    }

    /// Tokenize `source` as the lines of a document starting at line
    /// `offset`. Token maps are relative to the document.
    #[must_use]
    pub fn tokenize_at(&self, source: &str, env: &Env, offset: usize) -> Vec<Token> {
        let lines: Vec<&str> = source.split('\n').collect();
        let mut stash = Stash::new(source);

        let mut rewritten = self.run_block(&lines, env, offset, &mut stash);
        self.run_inline(&mut rewritten, env, &mut stash);

        let text = rewritten.lines.join("\n");
        let arena = Arena::new();
        let root = comrak::parse_document(&arena, &text, &comrak_options());

        let tokens =
            flatten::Flattener::new(source, &rewritten.map, &stash, offset, env.final_)
                .flatten(root);

        trace!(offset, lines = lines.len(), tokens = tokens.len(), "Tokenized source.");
        tokens
    }

    /// Run the core rules over `tokens`.
    ///
    /// A rule that fails or panics is logged and skipped; the tokens from
    /// before the rule are kept.
    #[must_use]
    pub fn run_core(&self, mut tokens: Vec<Token>, env: &Env) -> Vec<Token> {
        for (name, rule) in self.core.iter() {
            let input = tokens.clone();
            match catch_unwind(AssertUnwindSafe(|| rule(input, env))) {
                Ok(Ok(repaired)) => tokens = repaired,
                Ok(Err(error)) => {
                    warn!(rule = name, %error, "Core rule failed, keeping tokens.");
                }
                Err(_) => warn!(rule = name, "Core rule panicked, keeping tokens."),
            }
        }

        tokens
    }

    fn run_block(
        &self,
        lines: &[&str],
        env: &Env,
        offset: usize,
        stash: &mut Stash,
    ) -> Rewritten {
        let state = BlockState {
            lines,
            offset,
            env,
            tokenizer: self,
        };

        let mut out = Rewritten::default();
        let mut fences = FenceTracker::new();
        let mut idx = 0;

        while idx < lines.len() {
            let line = lines[idx];
            if fences.push_line(line).in_code() {
                out.push(line.to_owned(), [idx, idx + 1]);
                idx += 1;
                continue;
            }

            let claim = self.block.iter().find_map(|(name, rule)| {
                rule(&state, idx).inspect(|claim| {
                    trace!(
                        rule = name,
                        line = idx + offset,
                        end = claim.end + offset,
                        "Block rule matched."
                    );
                })
            });

            let Some(claim) = claim else {
                out.push(line.to_owned(), [idx, idx + 1]);
                idx += 1;
                continue;
            };

            let end = if claim.end <= idx {
                warn!(line = idx + offset, "Block rule stalled, forcing progress.");
                idx + 1
            } else {
                claim.end.min(lines.len())
            };

            let (prefix, _) = split_prefix(line);
            let raw = lines[idx..end].join("\n");
            let placeholder = stash.block(&raw[prefix.len()..], claim.tokens);

            if !out.ends_with_blank() {
                out.push(prefix.trim_end().to_owned(), [idx, idx]);
            }
            out.push(format!("{prefix}{placeholder}"), [idx, end]);
            if lines.get(end).is_some_and(|next| !next.trim().is_empty()) {
                out.push(prefix.trim_end().to_owned(), [end, end]);
            }

            idx = end;
        }

        out
    }

    fn run_inline(&self, rewritten: &mut Rewritten, env: &Env, stash: &mut Stash) {
        let lines = std::mem::take(&mut rewritten.lines);
        let map = std::mem::take(&mut rewritten.map);

        let mut fences = FenceTracker::new();
        let scannable: Vec<bool> = lines
            .iter()
            .map(|line| !fences.push_line(line).in_code() && !stash.is_block_line(line))
            .collect();

        let mut idx = 0;
        while idx < lines.len() {
            if !scannable[idx] {
                rewritten.push(lines[idx].clone(), map[idx]);
                idx += 1;
                continue;
            }

            let mut end = idx + 1;
            while end < lines.len()
                && scannable[end]
                && continues_paragraph(&lines[end - 1], &lines[end])
            {
                end += 1;
            }

            let text = lines[idx..end].join("\n");
            let state = InlineState {
                text: &text,
                at_end: lines[end..].iter().all(|line| line.trim().is_empty()),
                env,
            };

            let Some((scanned, joined)) = self.scan_text(&state, stash) else {
                for (line, map) in lines[idx..end].iter().zip(&map[idx..end]) {
                    rewritten.push(line.clone(), *map);
                }
                idx = end;
                continue;
            };

            // A claim spanning a line break merges its lines into one.
            let mut joined = joined.into_iter().peekable();
            let mut parts = scanned.split('\n');
            let mut line = idx;
            let mut newline = 0;
            while line < end {
                let first = line;
                loop {
                    newline += lines[line].len();
                    line += 1;
                    let merged = joined.next_if_eq(&newline).is_some();
                    newline += 1;
                    if !merged || line >= end {
                        break;
                    }
                }

                let part = parts.next().unwrap_or_default();
                rewritten.push(part.to_owned(), [map[first][0], map[line - 1][1]]);
            }

            idx = end;
        }
    }

    /// Apply the inline rules to the text of one paragraph.
    ///
    /// Returns the rewritten text and the offsets of the line breaks that
    /// ended up inside a claim, or `None` if no rule matched.
    fn scan_text(
        &self,
        state: &InlineState<'_>,
        stash: &mut Stash,
    ) -> Option<(String, Vec<usize>)> {
        let text = state.text;
        let mut out = String::new();
        let mut joined = vec![];
        let mut copied = 0;
        let mut pos = 0;

        while let Some(c) = text[pos..].chars().next() {
            if c == '`' {
                pos = skip_code_span(text, pos);
                continue;
            }

            let claim = self
                .inline
                .iter()
                .find_map(|(name, rule)| rule(state, pos).map(|claim| (name, claim)));

            let Some((name, claim)) = claim else {
                pos += c.len_utf8();
                continue;
            };

            let end = pos + claim.len;
            if claim.len == 0 || end > text.len() || !text.is_char_boundary(end) {
                warn!(rule = name, pos, "Inline rule stalled, forcing progress.");
                pos += c.len_utf8();
                continue;
            }

            joined.extend(text[pos..end].match_indices('\n').map(|(idx, _)| pos + idx));
            out.push_str(&text[copied..pos]);
            out.push_str(&stash.inline(&text[pos..end], claim.token));
            pos = end;
            copied = end;
        }

        if copied == 0 {
            return None;
        }

        out.push_str(&text[copied..]);
        Some((out, joined))
    }
}

/// Returns `true` if `next` continues the paragraph text of `prev`, so an
/// inline span may cross the line break between them.
fn continues_paragraph(prev: &str, next: &str) -> bool {
    let (prev_prefix, prev_content) = split_prefix(prev);
    let (next_prefix, next_content) = split_prefix(next);

    !prev_content.trim().is_empty()
        && !next_content.trim().is_empty()
        && prev_prefix.matches('>').count() == next_prefix.matches('>').count()
        && !prev_content.starts_with(['#', '|'])
        && fence_start(next).is_none()
        && !is_thematic_break(next_content)
        && !starts_block(next_content)
}

/// Returns `true` if a line starting with `content` opens a block of its own.
fn starts_block(content: &str) -> bool {
    const OPENERS: &[&str] = &["#", ">", "|", "<", "=", ":::", "$$", "\\[", "[^", ": "];
    if OPENERS.iter().any(|opener| content.starts_with(opener)) {
        return true;
    }

    let marker_end = |rest: &str| rest.is_empty() || rest.starts_with([' ', '\t']);
    let bullet = content
        .strip_prefix(['-', '*', '+'])
        .is_some_and(marker_end);
    let digits = content.chars().take_while(char::is_ascii_digit).count();
    let ordered = (1..=9).contains(&digits)
        && content[digits..]
            .strip_prefix(['.', ')'])
            .is_some_and(marker_end);
    let delimiter_row = content.contains('-')
        && content
            .trim()
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'));

    bullet || ordered || delimiter_row
}

/// The comrak options of the base tokenizer.
///
/// Raw HTML is always parsed. `autolink` links bare URLs and `smart` applies
/// typographic replacements.
fn comrak_options() -> comrak::Options<'static> {
    comrak::Options {
        extension: Extension {
            strikethrough: true,
            table: true,
            autolink: true,
            tasklist: true,
            superscript: true,
            subscript: true,
            footnotes: true,
            description_lists: true,
            ..Default::default()
        },
        parse: Parse {
            smart: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Skip the code span starting with the backtick run at `pos`, or just the run
/// if it is never closed on this line.
fn skip_code_span(line: &str, pos: usize) -> usize {
    let run = line[pos..].chars().take_while(|&c| c == '`').count();
    let mut search = pos + run;

    while let Some(idx) = line[search..].find('`') {
        let start = search + idx;
        let len = line[start..].chars().take_while(|&c| c == '`').count();
        if len == run {
            return start + len;
        }
        search = start + len;
    }

    pos + run
}

/// Backslash escapes of ASCII punctuation become literal text.
fn escape(state: &InlineState<'_>, pos: usize) -> Option<InlineClaim> {
    let mut chars = state.text[pos..].chars();
    if chars.next()? != '\\' {
        return None;
    }

    let c = chars.next().filter(char::is_ascii_punctuation)?;
    Some(InlineClaim {
        len: 1 + c.len_utf8(),
        token: Token::text(c.to_string()).with_markup("escape"),
    })
}

#[cfg(test)]
#[path = "tokenizer_tests.rs"]
mod tests;
