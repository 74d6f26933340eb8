//! Reduction of the flat token array into a [`ParsedNode`] tree.
//!
//! Block tokens are walked with explicit indices: an `*_open` token and its
//! matching close delimit the tokens reduced into the node's children. A
//! construct whose close never arrives extends to the end of the slice.
//!
//! Custom tags are handled here rather than by the tokenizer. comrak sees
//! `<thinking>` as an HTML block (or inline HTML at the start of a paragraph),
//! and the HTML block ends at the first blank line. The reducer re-locates the
//! element in the source, re-parses its content as Markdown, and skips every
//! token the element's lines produced. The content is sliced from the caller's
//! input, not from the normalized buffer the tokens were built from.

mod html_inline;
mod inline;
mod text;

use tracing::trace;

use crate::{
    html::{Extracted, extract_block, is_void, opening_tag_name},
    node::{DefinitionItem, ListItem, ParsedNode, TableCell, TableRow},
    normalize::SourceMap,
    scan::LineIndex,
    token::{self, Nesting, Token, TokenKind},
    tokenizer::plain_text,
};
use inline::InlineReducer;

/// Options of a single reduction.
#[derive(Debug, Clone, Copy)]
pub struct ReduceOptions<'a> {
    /// The source is complete; nothing is loading.
    pub final_: bool,

    /// Tag names reduced to [`ParsedNode::CustomElement`].
    pub custom_tags: &'a [String],

    /// An unclosed `**` stays literal text.
    pub require_closing_strong: bool,
}

/// Parses the content of a custom element. The flag tells whether the content
/// is complete.
pub type Reparse<'a> = dyn Fn(&str, bool) -> Vec<ParsedNode> + 'a;

/// Reduce `tokens`, produced from the normalized buffer `source`, into a node
/// tree. `original` is the input `source` was normalized from.
#[must_use]
pub fn reduce<'a>(
    tokens: &[Token],
    source: &'a str,
    original: &'a str,
    options: ReduceOptions<'a>,
    reparse: &'a Reparse<'a>,
) -> Vec<ParsedNode> {
    Reducer {
        source,
        original,
        map: SourceMap::new(original, source),
        index: LineIndex::new(source),
        options,
        inline: InlineReducer::new(options),
        reparse,
        cursor: 0,
        consumed: 0,
    }
    .blocks(tokens)
}

/// Sibling nodes under construction. Adjacent text nodes are merged.
#[derive(Debug, Default)]
struct Siblings {
    nodes: Vec<ParsedNode>,
}

impl Siblings {
    fn push(&mut self, node: ParsedNode) {
        if let ParsedNode::Text { content, raw } = &node {
            if content.is_empty() && raw.is_empty() {
                return;
            }

            if let Some(ParsedNode::Text {
                content: prev,
                raw: prev_raw,
            }) = self.nodes.last_mut()
            {
                prev.push_str(content);
                prev_raw.push_str(raw);
                return;
            }
        }

        self.nodes.push(node);
    }

    fn extend(&mut self, nodes: impl IntoIterator<Item = ParsedNode>) {
        for node in nodes {
            self.push(node);
        }
    }

    fn finish(self) -> Vec<ParsedNode> {
        self.nodes
    }
}

struct Reducer<'a> {
    source: &'a str,
    original: &'a str,
    map: SourceMap,
    index: LineIndex,
    options: ReduceOptions<'a>,
    inline: InlineReducer<'a>,
    reparse: &'a Reparse<'a>,

    /// Byte offset from which the next custom element is searched.
    cursor: usize,

    /// Lines before this one belong to an already reduced custom element.
    consumed: usize,
}

impl Reducer<'_> {
    fn blocks(&mut self, tokens: &[Token]) -> Vec<ParsedNode> {
        let mut nodes = vec![];
        let mut idx = 0;

        while idx < tokens.len() {
            let token = &tokens[idx];
            let (inner, next) = match token.nesting {
                Nesting::Open => {
                    let (close, _) = token::close_or_end(tokens, idx);
                    (&tokens[idx + 1..close], close + 1)
                }
                _ => (&tokens[..0], idx + 1),
            };

            if token.map.is_some_and(|[start, _]| start < self.consumed) {
                trace!(kind = token.kind.name(), "Skipping token inside custom element.");
            } else if token.nesting != Nesting::Close {
                self.block(token, inner, &mut nodes);
            }

            idx = next;
        }

        nodes
    }

    fn block(&mut self, token: &Token, inner: &[Token], nodes: &mut Vec<ParsedNode>) {
        let raw = token.raw.clone().unwrap_or_default();

        match token.kind {
            TokenKind::Paragraph => {
                let children = inline_children(inner);
                if let Some(tag) = self.leading_custom_tag(children)
                    && self.custom_element(token, &tag, nodes)
                {
                    return;
                }

                nodes.push(ParsedNode::Paragraph {
                    children: self.inline.reduce(children),
                    raw,
                });
            }
            TokenKind::Heading => {
                let children = inline_children(inner);
                nodes.push(ParsedNode::Heading {
                    level: token.tag.get(1..).and_then(|l| l.parse().ok()).unwrap_or(1),
                    text: plain_text(children),
                    children: self.inline.reduce(children),
                    raw,
                });
            }
            TokenKind::BulletList | TokenKind::OrderedList => {
                let ordered = token.kind == TokenKind::OrderedList;
                let items = groups(inner)
                    .into_iter()
                    .filter(|(open, _)| open.kind == TokenKind::ListItem)
                    .map(|(open, body)| ListItem {
                        children: self.blocks(body),
                        raw: open.raw.clone().unwrap_or_default(),
                    })
                    .collect();

                nodes.push(ParsedNode::List {
                    ordered,
                    start: ordered
                        .then(|| token.attr("start").and_then(|s| s.parse().ok()).unwrap_or(1)),
                    items,
                    raw,
                });
            }
            TokenKind::Blockquote => nodes.push(ParsedNode::Blockquote {
                children: self.blocks(inner),
                raw,
            }),
            TokenKind::Table => nodes.push(self.table(token, inner, raw)),
            TokenKind::Fence | TokenKind::CodeBlock => nodes.push(code_block(token, raw)),
            TokenKind::HtmlBlock => {
                if let Some(tag) = opening_tag_name(&token.content)
                    && self.options.custom_tags.contains(&tag)
                    && self.custom_element(token, &tag, nodes)
                {
                    return;
                }

                nodes.push(self.html_block(token, raw));
            }
            TokenKind::Hr => nodes.push(ParsedNode::ThematicBreak { raw }),
            TokenKind::MathBlock => nodes.push(ParsedNode::MathBlock {
                content: token.content.clone(),
                markup: token.markup.clone(),
                loading: token.loading,
                raw,
            }),
            TokenKind::Footnote => nodes.push(ParsedNode::Footnote {
                id: token.attr("label").unwrap_or_default().to_owned(),
                children: self.blocks(inner),
                raw,
            }),
            TokenKind::FootnoteAnchor => nodes.push(ParsedNode::FootnoteAnchor {
                id: token.attr("label").unwrap_or_default().to_owned(),
                raw,
            }),
            TokenKind::Dl => nodes.push(self.definition_list(inner, raw)),
            TokenKind::Admonition => nodes.push(ParsedNode::Admonition {
                kind: token.info.clone(),
                title: token.content.clone(),
                children: self.blocks(inner),
                loading: token.loading,
                raw,
            }),
            TokenKind::VmrContainer => nodes.push(ParsedNode::VmrContainer {
                name: token.info.clone(),
                attrs: token
                    .meta
                    .clone()
                    .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
                children: self.blocks(inner),
                loading: token.loading,
                raw,
            }),
            TokenKind::Inline => nodes.extend(self.inline.reduce(&token.children)),
            _ => nodes.extend(self.blocks(inner)),
        }
    }

    /// The custom tag opening a paragraph, if its first inline token is one.
    fn leading_custom_tag(&self, children: &[Token]) -> Option<String> {
        let first = children.first().filter(|t| t.kind == TokenKind::HtmlInline)?;
        opening_tag_name(&first.content).filter(|tag| self.options.custom_tags.contains(tag))
    }

    /// Reduce the custom element starting on the first line of `token`.
    ///
    /// Returns `false`, pushing nothing, if the element cannot be located in
    /// the source.
    fn custom_element(&mut self, token: &Token, tag: &str, nodes: &mut Vec<ParsedNode>) -> bool {
        let source = self.source;
        let from = token
            .map
            .map_or(self.cursor, |[start, _]| self.index.offset(start))
            .max(self.cursor);

        let Some(ext) = extract_block(source, tag, from) else {
            return false;
        };

        if let Some([start, _]) = token.map
            && self.index.line_of(ext.start) != start
        {
            return false;
        }

        let original = self.original;
        let (text, found) = match self.in_original(&ext, tag) {
            Some(found) => (original, found),
            None => (source, ext.clone()),
        };

        let content = found.content(text).trim_matches('\n');
        let children = (self.reparse)(content, found.closed || self.options.final_);

        let mut raw = found.raw(text).to_owned();
        if !found.closed {
            raw.push_str(&format!("</{tag}>"));
        }

        let end_line = self.index.line_of(ext.end.saturating_sub(1).max(ext.start));
        let [_, token_end] = token.map.unwrap_or([end_line, end_line + 1]);
        let rest_end = self.index.offset(token_end).max(ext.end);

        trace!(tag, closed = ext.closed, end_line, "Reduced custom element.");

        nodes.push(ParsedNode::CustomElement {
            tag: tag.to_owned(),
            attrs: found.attrs,
            content: content.to_owned(),
            children,
            loading: !found.closed && !self.options.final_,
            auto_closed: !found.closed,
            raw,
        });

        // Text after the closing tag on the element's last lines.
        let rest = source[ext.end..rest_end].trim();
        if !rest.is_empty() {
            nodes.extend((self.reparse)(rest, self.options.final_));
        }

        self.consumed = self.consumed.max(end_line + 1).max(token_end);
        self.cursor = rest_end;
        true
    }

    /// The element `ext` of the normalized buffer, located in the original
    /// input.
    fn in_original(&self, ext: &Extracted, tag: &str) -> Option<Extracted> {
        let start = self.map.to_source(ext.start);
        extract_block(self.original, tag, start).filter(|found| found.start == start)
    }

    fn html_block(&self, token: &Token, raw: String) -> ParsedNode {
        let content = token.content.clone();
        let tag = opening_tag_name(&content).unwrap_or_default();
        let loading = !self.options.final_
            && !tag.is_empty()
            && !is_void(&tag)
            && !self.html_closed(token, &tag);

        ParsedNode::HtmlBlock {
            loading,
            tag,
            content,
            raw,
        }
    }

    /// Whether the element opened by the HTML block `token` is closed
    /// somewhere in the source. comrak ends the block at a blank line, so the
    /// closing tag may belong to a later block.
    fn html_closed(&self, token: &Token, tag: &str) -> bool {
        if let Some([start, _]) = token.map
            && let Some(ext) = extract_block(self.source, tag, self.index.offset(start))
            && self.index.line_of(ext.start) == start
        {
            return ext.closed;
        }

        token
            .content
            .to_ascii_lowercase()
            .contains(&format!("</{tag}"))
    }

    fn table(&self, token: &Token, inner: &[Token], raw: String) -> ParsedNode {
        let mut header = TableRow::default();
        let mut rows = vec![];
        let mut in_head = false;
        let mut idx = 0;

        while idx < inner.len() {
            let t = &inner[idx];
            match (t.kind, t.nesting) {
                (TokenKind::Thead, Nesting::Open) => in_head = true,
                (TokenKind::Thead, Nesting::Close) => in_head = false,
                (TokenKind::Tr, Nesting::Open) => {
                    let (close, _) = token::close_or_end(inner, idx);
                    let row = self.row(t, &inner[idx + 1..close], in_head);
                    if in_head {
                        header = row;
                    } else {
                        rows.push(row);
                    }
                    idx = close;
                }
                _ => {}
            }
            idx += 1;
        }

        ParsedNode::Table {
            header,
            rows,
            loading: !self.options.final_
                && token
                    .map
                    .is_some_and(|[_, end]| end > self.last_content_line()),
            raw,
        }
    }

    /// The last line of the source holding more than whitespace.
    fn last_content_line(&self) -> usize {
        let end = self.source.trim_end().len();
        self.index.line_of(end.saturating_sub(1))
    }

    fn row(&self, open: &Token, inner: &[Token], header: bool) -> TableRow {
        let cells = groups(inner)
            .into_iter()
            .map(|(cell, body)| {
                let children = inline_children(body);
                TableCell {
                    header,
                    align: cell
                        .attr("style")
                        .and_then(|style| style.strip_prefix("text-align:"))
                        .map(str::to_owned),
                    children: self.inline.reduce(children),
                    raw: token::inline_source(children),
                }
            })
            .collect();

        TableRow {
            cells,
            raw: open.raw.clone().unwrap_or_default(),
        }
    }

    fn definition_list(&mut self, inner: &[Token], raw: String) -> ParsedNode {
        let mut items: Vec<DefinitionItem> = vec![];

        for (open, body) in groups(inner) {
            let nodes = self.blocks(body);
            match open.kind {
                TokenKind::Dt => items.push(DefinitionItem {
                    term: nodes
                        .into_iter()
                        .flat_map(|node| match node {
                            ParsedNode::Paragraph { children, .. } => children,
                            other => vec![other],
                        })
                        .collect(),
                    definition: vec![],
                }),
                _ => match items.last_mut() {
                    Some(item) => item.definition.extend(nodes),
                    None => items.push(DefinitionItem {
                        term: vec![],
                        definition: nodes,
                    }),
                },
            }
        }

        ParsedNode::DefinitionList { items, raw }
    }
}

/// The children of the first `inline` token in `tokens`.
fn inline_children(tokens: &[Token]) -> &[Token] {
    tokens
        .iter()
        .find(|t| t.kind == TokenKind::Inline)
        .map_or(&[][..], |t| t.children.as_slice())
}

/// The top-level open tokens in `tokens`, each with the tokens up to its
/// close.
fn groups(tokens: &[Token]) -> Vec<(&Token, &[Token])> {
    let mut out = vec![];
    let mut idx = 0;

    while idx < tokens.len() {
        if tokens[idx].nesting == Nesting::Open {
            let (close, _) = token::close_or_end(tokens, idx);
            out.push((&tokens[idx], &tokens[idx + 1..close]));
            idx = close;
        }
        idx += 1;
    }

    out
}

fn code_block(token: &Token, raw: String) -> ParsedNode {
    let language = token
        .info
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_owned();
    let diff = language == "diff";
    let (original_code, updated_code) = if diff {
        let (original, updated) = split_diff(&token.content);
        (Some(original), Some(updated))
    } else {
        (None, None)
    };

    ParsedNode::CodeBlock {
        language,
        code: token.content.clone(),
        loading: token.loading,
        diff,
        original_code,
        updated_code,
        raw,
    }
}

/// Split a unified diff into its original and updated sides.
fn split_diff(code: &str) -> (String, String) {
    let mut original = String::new();
    let mut updated = String::new();

    for line in code.lines() {
        if line.starts_with("---") || line.starts_with("+++") || line.starts_with("@@") {
            continue;
        }

        let (side_a, side_b, rest) = match line.chars().next() {
            Some('-') => (true, false, &line[1..]),
            Some('+') => (false, true, &line[1..]),
            Some(' ') => (true, true, &line[1..]),
            _ => (true, true, line),
        };

        if side_a {
            original.push_str(rest);
            original.push('\n');
        }
        if side_b {
            updated.push_str(rest);
            updated.push('\n');
        }
    }

    (original, updated)
}

#[cfg(test)]
#[path = "reduce_tests.rs"]
mod tests;
