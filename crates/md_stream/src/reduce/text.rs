//! Inline syntax recovered from plain text.
//!
//! comrak only builds inline nodes for complete syntax. While a response is
//! streaming, `**bold` or `[label](https://exa` arrives as plain text; these
//! parsers turn such runs into nodes, marked as loading when their closing
//! syntax is missing. They also cover syntax comrak does not know, like
//! `==mark==`, `++ins++`, `[1]` references and `:emoji:` shortcodes.

use std::collections::HashMap;

use super::Siblings;
use crate::node::ParsedNode;

/// Nodes recovered from a text run, and the byte offset after them.
type Found = (Vec<ParsedNode>, usize);

/// Emphasis markers that may open a loading span.
const MARKERS: [&str; 3] = ["*", "**", "__"];

#[derive(Debug, Clone, Copy)]
pub(super) struct TextParser {
    pub final_: bool,
    pub require_closing_strong: bool,

    /// Bit set of the [`MARKERS`] already opened by an enclosing loading
    /// span. These stay literal text.
    open: u8,
}

impl TextParser {
    pub const fn new(final_: bool, require_closing_strong: bool) -> Self {
        Self {
            final_,
            require_closing_strong,
            open: 0,
        }
    }

    /// The parser for content whose end is known, such as the inside of a
    /// closed span.
    const fn complete(self) -> Self {
        Self {
            final_: true,
            ..self
        }
    }

    pub fn parse(&self, text: &str) -> Vec<ParsedNode> {
        let mut closers = Closers::new(text);
        let mut out = Siblings::default();
        let mut plain = 0;
        let mut pos = 0;

        while let Some(c) = text[pos..].chars().next() {
            let found = match c {
                '`' => Some(code(text, pos, &mut closers)),
                '*' | '_' => self.emphasis(text, pos, &mut closers),
                '~' => self.delimited(text, pos, "~~", &mut closers),
                '=' => self.delimited(text, pos, "==", &mut closers),
                '+' => self.delimited(text, pos, "++", &mut closers),
                '!' => self.image(text, pos),
                '[' => self.link(text, pos).or_else(|| reference(text, pos)),
                ':' => emoji(text, pos),
                _ => None,
            };

            let Some((nodes, end)) = found else {
                pos += c.len_utf8();
                continue;
            };

            if plain < pos {
                out.push(ParsedNode::text(&text[plain..pos]));
            }
            out.extend(nodes);
            pos = end;
            plain = end;
        }

        if plain < text.len() {
            out.push(ParsedNode::text(&text[plain..]));
        }

        out.finish()
    }

    /// `*em*`, `**strong**` or `__strong__`.
    ///
    /// While streaming, an unclosed marker opens a loading span over the rest
    /// of the text. Inside it, markers of the same kind stay literal, so
    /// loading spans nest at most once per marker kind.
    fn emphasis(&self, text: &str, pos: usize, closers: &mut Closers<'_>) -> Option<Found> {
        let marker_char = text[pos..].chars().next()?;
        let run = run_length(text, pos, marker_char);
        let len = run.min(2);
        let kind = match (marker_char, len) {
            ('*', 1) => 0,
            ('*', _) => 1,
            (_, 1) => return None,
            _ => 2,
        };

        let marker = MARKERS[kind];
        let bit = 1 << kind;
        let literal = || Some((vec![ParsedNode::text(&text[pos..pos + run])], pos + run));
        let after = pos + len;
        let strong = len == 2;
        let may_load =
            !self.final_ && !(strong && self.require_closing_strong) && self.open & bit == 0;

        if text[..pos].chars().next_back().is_some_and(char::is_alphanumeric) {
            return literal();
        }

        match text[after..].chars().next() {
            // A marker at the end of a streaming chunk is dropped until its
            // content arrives.
            None if may_load && run == len => return Some((vec![], after)),
            None => return literal(),
            Some(c) if c.is_whitespace() => return literal(),
            Some(_) => {}
        }

        let (children, end, loading) = match closers.after(marker, after) {
            Some(close) => (
                self.complete().parse(&text[after..close]),
                close + len,
                false,
            ),
            None if may_load => {
                let inner = Self {
                    open: self.open | bit,
                    ..*self
                };
                (inner.parse(&text[after..]), text.len(), true)
            }
            None => return literal(),
        };

        let raw = text[pos..end].to_owned();
        let node = if strong {
            ParsedNode::Strong {
                children,
                loading,
                raw,
            }
        } else {
            ParsedNode::Emphasis {
                children,
                loading,
                raw,
            }
        };

        Some((vec![node], end))
    }

    /// `~~del~~`, `==mark==` or `++ins++`. Only complete spans are recovered.
    fn delimited(
        &self,
        text: &str,
        pos: usize,
        marker: &'static str,
        closers: &mut Closers<'_>,
    ) -> Option<Found> {
        if !text[pos..].starts_with(marker)
            || text[..pos].chars().next_back().is_some_and(char::is_alphanumeric)
        {
            return None;
        }

        let after = pos + marker.len();
        if text[after..].chars().next().is_none_or(char::is_whitespace) {
            return None;
        }

        let close = closers.after(marker, after)?;
        let children = self.complete().parse(&text[after..close]);
        let end = close + marker.len();
        let raw = text[pos..end].to_owned();

        let node = match marker {
            "~~" => ParsedNode::Strikethrough { children, raw },
            "==" => ParsedNode::Highlight { children, raw },
            _ => ParsedNode::Insert { children, raw },
        };

        Some((vec![node], end))
    }

    /// `![alt](src)`, or `![alt](src` while streaming.
    fn image(&self, text: &str, pos: usize) -> Option<Found> {
        let rest = text[pos..].strip_prefix("![")?;
        let split = rest.find("](")?;
        let alt = &rest[..split];
        if alt.contains(['[', ']']) {
            return None;
        }

        let (src, len, loading) = self.target(&rest[split + 2..])?;
        let end = pos + 2 + split + 2 + len;

        Some((
            vec![ParsedNode::Image {
                src: src.to_owned(),
                alt: alt.to_owned(),
                title: None,
                loading,
                raw: text[pos..end].to_owned(),
            }],
            end,
        ))
    }

    /// `[label](href)`, or `[label](href` while streaming.
    fn link(&self, text: &str, pos: usize) -> Option<Found> {
        let rest = text[pos..].strip_prefix('[')?;
        let split = rest.find("](")?;
        let label = &rest[..split];
        if label.contains(['[', ']']) {
            return None;
        }

        let (href, len, loading) = self.target(&rest[split + 2..])?;
        let end = pos + 1 + split + 2 + len;

        Some((
            vec![ParsedNode::Link {
                href: href.to_owned(),
                title: None,
                text: label.to_owned(),
                children: self.complete().parse(label),
                loading,
                raw: text[pos..end].to_owned(),
            }],
            end,
        ))
    }

    /// The destination after `](`: the href, the bytes consumed, and whether
    /// the `)` is still missing.
    fn target<'t>(&self, rest: &'t str) -> Option<(&'t str, usize, bool)> {
        match rest.find(')') {
            Some(close) => Some((&rest[..close], close + 1, false)),
            None if !self.final_ && !rest.contains(char::is_whitespace) => {
                Some((rest, rest.len(), true))
            }
            None => None,
        }
    }
}

/// A code span, or the literal backtick run when no matching run follows.
fn code(text: &str, pos: usize, closers: &mut Closers<'_>) -> Found {
    let run = run_length(text, pos, '`');
    let after = pos + run;

    let Some(start) = closers.backtick_run(run, after) else {
        return (vec![ParsedNode::text(&text[pos..after])], after);
    };

    let inner = &text[after..start];
    let code = match inner.strip_prefix(' ').and_then(|s| s.strip_suffix(' ')) {
        Some(stripped) if !inner.trim().is_empty() => stripped,
        _ => inner,
    };

    (
        vec![ParsedNode::InlineCode {
            code: code.to_owned(),
            raw: text[pos..start + run].to_owned(),
        }],
        start + run,
    )
}

/// `[12]` not followed by a link destination.
fn reference(text: &str, pos: usize) -> Option<Found> {
    if text[..pos].chars().next_back().is_some_and(char::is_alphanumeric) {
        return None;
    }

    let rest = text[pos..].strip_prefix('[')?;
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || !rest[digits..].starts_with(']') {
        return None;
    }

    let end = pos + 1 + digits + 1;
    if text[end..].starts_with(['(', '[', ':']) {
        return None;
    }

    Some((
        vec![ParsedNode::Reference {
            id: rest[..digits].to_owned(),
            raw: text[pos..end].to_owned(),
        }],
        end,
    ))
}

/// A `:shortcode:` naming a known emoji.
fn emoji(text: &str, pos: usize) -> Option<Found> {
    let rest = text[pos..].strip_prefix(':')?;
    let len = rest
        .chars()
        .take_while(|&c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'))
        .count();
    if len == 0 || !rest[len..].starts_with(':') {
        return None;
    }

    let name = &rest[..len];
    let emoji = emojis::get_by_shortcode(name)?;
    let end = pos + 1 + len + 1;

    Some((
        vec![ParsedNode::Emoji {
            name: name.to_owned(),
            markup: emoji.as_str().to_owned(),
            raw: text[pos..end].to_owned(),
        }],
        end,
    ))
}

/// Number of consecutive `c` at `pos`. `c` must be ASCII.
fn run_length(text: &str, pos: usize, c: char) -> usize {
    text[pos..].bytes().take_while(|&b| char::from(b) == c).count()
}

/// Closing delimiter candidates of a text run, collected on first use.
///
/// Looking a closer up is a binary search, so a run full of unmatched
/// markers is scanned once rather than once per marker.
#[derive(Debug)]
struct Closers<'t> {
    text: &'t str,
    markers: HashMap<&'static str, Vec<usize>>,

    /// Start offsets of maximal backtick runs, by run length.
    backticks: Option<HashMap<usize, Vec<usize>>>,
}

impl<'t> Closers<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            text,
            markers: HashMap::new(),
            backticks: None,
        }
    }

    /// Offset of the first `marker` after `from` that can close a span.
    fn after(&mut self, marker: &'static str, from: usize) -> Option<usize> {
        let text = self.text;
        let found = self
            .markers
            .entry(marker)
            .or_insert_with(|| closing_positions(text, marker));

        found.get(found.partition_point(|&idx| idx <= from)).copied()
    }

    /// Offset of the first backtick run of exactly `len` at or after `from`.
    fn backtick_run(&mut self, len: usize, from: usize) -> Option<usize> {
        let text = self.text;
        let runs = self.backticks.get_or_insert_with(|| {
            let mut runs: HashMap<usize, Vec<usize>> = HashMap::new();
            let mut idx = 0;
            while let Some(found) = text[idx..].find('`') {
                let start = idx + found;
                let len = run_length(text, start, '`');
                runs.entry(len).or_default().push(start);
                idx = start + len;
            }
            runs
        });

        let starts = runs.get(&len)?;
        starts.get(starts.partition_point(|&idx| idx < from)).copied()
    }
}

/// Offsets of every `marker` in `text` that can close a span: it has content
/// before it and is not preceded by whitespace. `marker` must be ASCII.
fn closing_positions(text: &str, marker: &str) -> Vec<usize> {
    let bytes = text.as_bytes();

    (1..text.len())
        .filter(|&idx| bytes[idx..].starts_with(marker.as_bytes()))
        .filter(|&idx| {
            text[..idx]
                .chars()
                .next_back()
                .is_some_and(|c| !c.is_whitespace())
        })
        .collect()
}

#[cfg(test)]
#[path = "text_tests.rs"]
mod tests;
