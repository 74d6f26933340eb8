//! Flattening of the comrak tree into tokens.

use comrak::{
    Node,
    nodes::{ListDelimType, ListType, NodeValue, TableAlignment},
};

use super::stash::Stash;
use crate::{
    scan::{LineIndex, strip_quote_prefix},
    token::{self, Token, TokenKind},
};

/// Walks a comrak tree and emits markdown-it style tokens.
pub(super) struct Flattener<'s> {
    /// The text the block stage ran on, before placeholders were inserted.
    source: &'s str,
    index: LineIndex,

    /// For each line of the text comrak parsed, the `[start, end)` range of
    /// source lines it stands for.
    lines: &'s [[usize; 2]],

    stash: &'s Stash,

    /// Line offset of `source` within the document.
    offset: usize,

    is_final: bool,

    /// Checked state of a task item whose checkbox has not been emitted yet.
    pending_checkbox: Option<bool>,

    tokens: Vec<Token>,
}

impl<'s> Flattener<'s> {
    pub fn new(
        source: &'s str,
        lines: &'s [[usize; 2]],
        stash: &'s Stash,
        offset: usize,
        is_final: bool,
    ) -> Self {
        Self {
            source,
            index: LineIndex::new(source),
            lines,
            stash,
            offset,
            is_final,
            pending_checkbox: None,
            tokens: vec![],
        }
    }

    pub fn flatten(mut self, root: Node<'_>) -> Vec<Token> {
        for child in root.children() {
            self.block(child);
        }

        self.tokens
    }

    /// The `[start, end)` range of source lines a node covers.
    fn local_map(&self, node: Node<'_>) -> [usize; 2] {
        let pos = node.data().sourcepos;
        let last = self.lines.len().saturating_sub(1);
        let start = pos.start.line.saturating_sub(1).min(last);
        let end = pos.end.line.saturating_sub(1).clamp(start, last);

        match (self.lines.get(start), self.lines.get(end)) {
            (Some(first), Some(last)) => [first[0], last[1].max(first[0])],
            _ => [0, 0],
        }
    }

    fn map(&self, local: [usize; 2]) -> Option<[usize; 2]> {
        Some([local[0] + self.offset, local[1] + self.offset])
    }

    fn raw(&self, local: [usize; 2]) -> String {
        self.index.slice(self.source, local).to_owned()
    }

    fn line(&self, line: usize) -> &'s str {
        self.index.slice(self.source, [line, line + 1])
    }

    fn block(&mut self, node: Node<'_>) {
        let local = self.local_map(node);
        let value = node.data().value.clone();

        match value {
            NodeValue::Paragraph => self.paragraph(node, local),
            NodeValue::Heading(heading) => {
                let tag = format!("h{}", heading.level);
                let markup = if heading.setext {
                    (if heading.level == 1 { "=" } else { "-" }).to_owned()
                } else {
                    "#".repeat(usize::from(heading.level))
                };

                self.open(TokenKind::Heading, &tag, &markup, local);
                self.inline_token(node);
                self.close(TokenKind::Heading, &tag, &markup);
            }
            NodeValue::BlockQuote => {
                self.container(node, TokenKind::Blockquote, "blockquote", ">", local);
            }
            NodeValue::List(list) => {
                let (kind, tag, markup) = match list.list_type {
                    ListType::Bullet => (
                        TokenKind::BulletList,
                        "ul",
                        char::from(list.bullet_char).to_string(),
                    ),
                    ListType::Ordered => (
                        TokenKind::OrderedList,
                        "ol",
                        match list.delimiter {
                            ListDelimType::Paren => ")",
                            ListDelimType::Period => ".",
                        }
                        .to_owned(),
                    ),
                };

                self.open(kind, tag, &markup, local);
                if matches!(list.list_type, ListType::Ordered)
                    && list.start != 1
                    && let Some(open) = self.tokens.last_mut()
                {
                    open.attrs.push(("start".to_owned(), list.start.to_string()));
                }

                self.children(node);
                self.close(kind, tag, &markup);
            }
            NodeValue::Item(_) => self.list_item(node, local),
            NodeValue::TaskItem(task) => {
                self.pending_checkbox = Some(task.symbol.is_some_and(|c| c != ' '));
                self.list_item(node, local);
            }
            NodeValue::CodeBlock(code) => {
                let content = self.stash.restore(&code.literal);
                let token = if code.fenced {
                    let column = node.data().sourcepos.start.column;
                    let closed = self.fence_closed(local, column);

                    Token::leaf(TokenKind::Fence)
                        .with_info(self.stash.restore(code.info.trim()))
                        .with_markup(char::from(code.fence_char).to_string().repeat(code.fence_length))
                        .with_loading(!closed && !self.is_final)
                } else {
                    Token::leaf(TokenKind::CodeBlock)
                };

                self.tokens.push(
                    token
                        .with_tag("code")
                        .with_content(content)
                        .with_map(self.map(local))
                        .with_raw(self.raw(local)),
                );
            }
            NodeValue::HtmlBlock(html) => {
                self.tokens.push(
                    Token::leaf(TokenKind::HtmlBlock)
                        .with_content(self.stash.restore(&html.literal))
                        .with_map(self.map(local))
                        .with_raw(self.raw(local)),
                );
            }
            NodeValue::ThematicBreak => {
                let raw = self.raw(local);
                self.tokens.push(
                    Token::leaf(TokenKind::Hr)
                        .with_tag("hr")
                        .with_markup(raw.trim())
                        .with_map(self.map(local))
                        .with_raw(raw),
                );
            }
            NodeValue::Table(table) => self.table(node, &table.alignments, local),
            NodeValue::FootnoteDefinition(def) => {
                self.open(TokenKind::Footnote, "section", "", local);
                if let Some(open) = self.tokens.last_mut() {
                    open.attrs.push(("label".to_owned(), def.name.clone()));
                }

                self.children(node);
                self.tokens.push(
                    Token::leaf(TokenKind::FootnoteAnchor)
                        .with_attr("label", &def.name)
                        .with_raw(format!("[^{}]", def.name)),
                );
                self.close(TokenKind::Footnote, "section", "");
            }
            NodeValue::DescriptionList => {
                self.container(node, TokenKind::Dl, "dl", "", local);
            }
            NodeValue::DescriptionTerm => {
                self.container(node, TokenKind::Dt, "dt", "", local);
            }
            NodeValue::DescriptionDetails => {
                self.container(node, TokenKind::Dd, "dd", ":", local);
            }
            _ => self.children(node),
        }
    }

    fn children(&mut self, node: Node<'_>) {
        for child in node.children() {
            self.block(child);
        }
    }

    fn open(&mut self, kind: TokenKind, tag: &str, markup: &str, local: [usize; 2]) {
        self.tokens.push(
            Token::open(kind)
                .with_tag(tag)
                .with_markup(markup)
                .with_map(self.map(local))
                .with_raw(self.raw(local)),
        );
    }

    fn close(&mut self, kind: TokenKind, tag: &str, markup: &str) {
        self.tokens
            .push(Token::close(kind).with_tag(tag).with_markup(markup));
    }

    fn container(
        &mut self,
        node: Node<'_>,
        kind: TokenKind,
        tag: &str,
        markup: &str,
        local: [usize; 2],
    ) {
        self.open(kind, tag, markup, local);
        self.children(node);
        self.close(kind, tag, markup);
    }

    fn list_item(&mut self, node: Node<'_>, local: [usize; 2]) {
        self.open(TokenKind::ListItem, "li", "", local);
        self.children(node);

        // A task item without content still shows its checkbox.
        if let Some(checked) = self.pending_checkbox.take() {
            self.tokens.push(Token::open(TokenKind::Paragraph).with_tag("p"));
            self.tokens.push(
                Token::leaf(TokenKind::Inline).with_children(vec![checkbox(checked)]),
            );
            self.tokens.push(Token::close(TokenKind::Paragraph).with_tag("p"));
        }

        self.close(TokenKind::ListItem, "li", "");
    }

    fn paragraph(&mut self, node: Node<'_>, local: [usize; 2]) {
        if let Some(child) = node.first_child()
            && child.next_sibling().is_none()
            && let NodeValue::Text(ref text) = child.data().value
            && let Some(tokens) = self.stash.block_tokens(text)
        {
            self.tokens.extend(tokens);
            return;
        }

        self.open(TokenKind::Paragraph, "p", "", local);
        self.inline_token(node);
        self.close(TokenKind::Paragraph, "p", "");
    }

    fn table(&mut self, node: Node<'_>, alignments: &[TableAlignment], local: [usize; 2]) {
        self.open(TokenKind::Table, "table", "", local);
        let mut in_body = false;

        for row in node.children() {
            let header = matches!(row.data().value, NodeValue::TableRow(true));
            if header {
                self.tokens.push(Token::open(TokenKind::Thead).with_tag("thead"));
            } else if !in_body {
                self.tokens.push(Token::open(TokenKind::Tbody).with_tag("tbody"));
                in_body = true;
            }

            let row_map = self.local_map(row);
            self.open(TokenKind::Tr, "tr", "", row_map);

            let (kind, tag) = if header {
                (TokenKind::Th, "th")
            } else {
                (TokenKind::Td, "td")
            };

            for (col, cell) in row.children().enumerate() {
                let mut open = Token::open(kind).with_tag(tag);
                if let Some(style) = alignments.get(col).and_then(align_style) {
                    open = open.with_attr("style", style);
                }

                self.tokens.push(open);
                self.inline_token(cell);
                self.close(kind, tag, "");
            }

            self.close(TokenKind::Tr, "tr", "");
            if header {
                self.tokens.push(Token::close(TokenKind::Thead).with_tag("thead"));
            }
        }

        if in_body {
            self.tokens.push(Token::close(TokenKind::Tbody).with_tag("tbody"));
        }
        self.close(TokenKind::Table, "table", "");
    }

    /// Push the `inline` token holding the inline content of `node`.
    fn inline_token(&mut self, node: Node<'_>) {
        let mut children = vec![];
        if let Some(checked) = self.pending_checkbox.take() {
            children.push(checkbox(checked));
        }

        for child in node.children() {
            self.inline(child, &mut children);
        }

        let children = merge_text(children);
        self.tokens.push(
            Token::leaf(TokenKind::Inline)
                .with_content(token::inline_source(&children))
                .with_children(children),
        );
    }

    fn inline(&self, node: Node<'_>, out: &mut Vec<Token>) {
        let value = node.data().value.clone();

        match value {
            NodeValue::Text(text) => out.extend(self.stash.expand(&text)),
            NodeValue::SoftBreak => out.push(Token::leaf(TokenKind::Softbreak)),
            NodeValue::LineBreak => out.push(Token::leaf(TokenKind::Hardbreak).with_tag("br")),
            NodeValue::Code(code) => out.push(
                Token::leaf(TokenKind::CodeInline)
                    .with_tag("code")
                    .with_content(self.stash.restore(&code.literal))
                    .with_markup("`".repeat(code.num_backticks.max(1))),
            ),
            NodeValue::HtmlInline(html) => out.push(
                Token::leaf(TokenKind::HtmlInline).with_content(self.stash.restore(&html)),
            ),
            NodeValue::Emph => self.wrap(node, TokenKind::Em, "em", "*", out),
            NodeValue::Strong => self.wrap(node, TokenKind::Strong, "strong", "**", out),
            NodeValue::Strikethrough => self.wrap(node, TokenKind::S, "s", "~~", out),
            NodeValue::Superscript => self.wrap(node, TokenKind::Sup, "sup", "^", out),
            NodeValue::Subscript => self.wrap(node, TokenKind::Sub, "sub", "~", out),
            NodeValue::Link(link) => {
                let mut open = Token::open(TokenKind::Link)
                    .with_tag("a")
                    .with_attr("href", self.stash.restore_literal(&link.url));
                if !link.title.is_empty() {
                    open = open.with_attr("title", self.stash.restore_literal(&link.title));
                }

                out.push(open);
                for child in node.children() {
                    self.inline(child, out);
                }
                out.push(Token::close(TokenKind::Link).with_tag("a"));
            }
            NodeValue::Image(link) => {
                let mut children = vec![];
                for child in node.children() {
                    self.inline(child, &mut children);
                }

                let alt = plain_text(&children);
                let mut image = Token::leaf(TokenKind::Image)
                    .with_tag("img")
                    .with_attr("src", self.stash.restore_literal(&link.url))
                    .with_attr("alt", &alt)
                    .with_content(alt)
                    .with_children(children);
                if !link.title.is_empty() {
                    image = image.with_attr("title", self.stash.restore_literal(&link.title));
                }

                out.push(image);
            }
            NodeValue::FootnoteReference(reference) => out.push(
                Token::leaf(TokenKind::FootnoteRef)
                    .with_attr("label", &reference.name)
                    .with_raw(format!("[^{}]", reference.name)),
            ),
            _ => {
                for child in node.children() {
                    self.inline(child, out);
                }
            }
        }
    }

    fn wrap(&self, node: Node<'_>, kind: TokenKind, tag: &str, markup: &str, out: &mut Vec<Token>) {
        out.push(Token::open(kind).with_tag(tag).with_markup(markup));
        for child in node.children() {
            self.inline(child, out);
        }
        out.push(Token::close(kind).with_tag(tag).with_markup(markup));
    }

    /// Returns `true` if the fenced block covering `local` ends with a closing
    /// fence line.
    fn fence_closed(&self, local: [usize; 2], column: usize) -> bool {
        if local[1] < local[0] + 2 {
            return false;
        }

        let first = self.line(local[0]);
        let first = first
            .get(column.saturating_sub(1)..)
            .unwrap_or(first)
            .trim();
        let last = strip_quote_prefix(self.line(local[1] - 1)).trim();

        let Some(fence) = first.chars().next() else {
            return false;
        };

        let open = first.chars().take_while(|&c| c == fence).count();
        let close = last.chars().take_while(|&c| c == fence).count();
        close >= open && close == last.chars().count()
    }
}

fn checkbox(checked: bool) -> Token {
    let token = Token::leaf(TokenKind::Checkbox).with_raw(if checked { "[x]" } else { "[ ]" });
    if checked {
        token.with_attr("checked", "true")
    } else {
        token
    }
}

fn align_style(alignment: &TableAlignment) -> Option<&'static str> {
    match alignment {
        TableAlignment::Left => Some("text-align:left"),
        TableAlignment::Center => Some("text-align:center"),
        TableAlignment::Right => Some("text-align:right"),
        TableAlignment::None => None,
    }
}

/// The text content of a run of inline tokens.
pub(crate) fn plain_text(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter_map(|t| match t.kind {
            TokenKind::Text | TokenKind::CodeInline | TokenKind::MathInline => {
                Some(t.content.as_str())
            }
            TokenKind::Softbreak | TokenKind::Hardbreak => Some(" "),
            _ => None,
        })
        .collect()
}

/// Merge adjacent text tokens. Escaped characters stay separate, so the text
/// sub-parsers never treat them as delimiters.
pub(crate) fn merge_text(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());

    for token in tokens {
        if token.is_text() && token.content.is_empty() {
            continue;
        }

        if let Some(last) = out.last_mut()
            && last.is_text()
            && token.is_text()
            && last.markup.is_empty()
            && token.markup.is_empty()
        {
            last.content.push_str(&token.content);
            continue;
        }

        out.push(token);
    }

    out
}

#[cfg(test)]
#[path = "flatten_tests.rs"]
mod tests;
