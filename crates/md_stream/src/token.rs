//! The flat token representation shared by the tokenizer, the repair passes
//! and the reducer.
//!
//! Tokens follow the markdown-it model: container constructs are emitted as an
//! `*_open`/`*_close` pair, leaf constructs as a single token, and the inline
//! content of a paragraph, heading or table cell lives in the `children` of an
//! `inline` token.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The construct a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    Table,
    Thead,
    Tbody,
    Tr,
    Th,
    Td,
    Fence,
    CodeBlock,
    HtmlBlock,
    Hr,
    MathBlock,
    Footnote,
    FootnoteAnchor,
    Dl,
    Dt,
    Dd,
    VmrContainer,
    Admonition,
    Inline,
    Text,
    Softbreak,
    Hardbreak,
    CodeInline,
    Strong,
    Em,
    S,
    Mark,
    Ins,
    Sub,
    Sup,
    Link,
    Image,
    HtmlInline,
    MathInline,
    FootnoteRef,
    Checkbox,
}

impl TokenKind {
    /// The markdown-it name of this kind, without the `_open`/`_close` suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::BulletList => "bullet_list",
            Self::OrderedList => "ordered_list",
            Self::ListItem => "list_item",
            Self::Blockquote => "blockquote",
            Self::Table => "table",
            Self::Thead => "thead",
            Self::Tbody => "tbody",
            Self::Tr => "tr",
            Self::Th => "th",
            Self::Td => "td",
            Self::Fence => "fence",
            Self::CodeBlock => "code_block",
            Self::HtmlBlock => "html_block",
            Self::Hr => "hr",
            Self::MathBlock => "math_block",
            Self::Footnote => "footnote",
            Self::FootnoteAnchor => "footnote_anchor",
            Self::Dl => "dl",
            Self::Dt => "dt",
            Self::Dd => "dd",
            Self::VmrContainer => "vmr_container",
            Self::Admonition => "admonition",
            Self::Inline => "inline",
            Self::Text => "text",
            Self::Softbreak => "softbreak",
            Self::Hardbreak => "hardbreak",
            Self::CodeInline => "code_inline",
            Self::Strong => "strong",
            Self::Em => "em",
            Self::S => "s",
            Self::Mark => "mark",
            Self::Ins => "ins",
            Self::Sub => "sub",
            Self::Sup => "sup",
            Self::Link => "link",
            Self::Image => "image",
            Self::HtmlInline => "html_inline",
            Self::MathInline => "math_inline",
            Self::FootnoteRef => "footnote_ref",
            Self::Checkbox => "checkbox",
        }
    }
}

/// Whether a token opens, closes, or is a self-contained construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nesting {
    Open,
    Close,
    Leaf,
}

/// A single token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub nesting: Nesting,

    /// HTML tag name of the construct (`p`, `h2`, `strong`, ...).
    pub tag: String,

    /// Ordered name/value pairs.
    pub attrs: Vec<(String, String)>,

    /// Source line range `[start, end)`, 0-based, for block tokens.
    pub map: Option<[usize; 2]>,

    pub content: String,

    /// The literal delimiter text, e.g. `**` or a fence.
    pub markup: String,

    /// Fence info string, container arguments.
    pub info: String,

    /// Inline children of an `inline` (or `image`) token.
    pub children: Vec<Token>,

    /// The construct's closing syntax has not appeared yet.
    pub loading: bool,

    /// Verbatim source of the construct, when known.
    pub raw: Option<String>,

    /// Structured payload of extension tokens (container JSON attributes).
    pub meta: Option<serde_json::Value>,
}

impl Token {
    /// Create an empty token.
    #[must_use]
    pub fn new(kind: TokenKind, nesting: Nesting) -> Self {
        Self {
            kind,
            nesting,
            tag: String::new(),
            attrs: vec![],
            map: None,
            content: String::new(),
            markup: String::new(),
            info: String::new(),
            children: vec![],
            loading: false,
            raw: None,
            meta: None,
        }
    }

    #[must_use]
    pub fn open(kind: TokenKind) -> Self {
        Self::new(kind, Nesting::Open)
    }

    #[must_use]
    pub fn close(kind: TokenKind) -> Self {
        Self::new(kind, Nesting::Close)
    }

    #[must_use]
    pub fn leaf(kind: TokenKind) -> Self {
        Self::new(kind, Nesting::Leaf)
    }

    /// A `text` token.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::leaf(TokenKind::Text).with_content(content)
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    #[must_use]
    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = markup.into();
        self
    }

    #[must_use]
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn with_map(mut self, map: Option<[usize; 2]>) -> Self {
        self.map = map;
        self
    }

    #[must_use]
    pub const fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Token>) -> Self {
        self.children = children;
        self
    }

    /// The markdown-it type string, e.g. `paragraph_open` or `text`.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self.nesting {
            Nesting::Open => format!("{}_open", self.kind.name()),
            Nesting::Close => format!("{}_close", self.kind.name()),
            Nesting::Leaf => self.kind.name().to_owned(),
        }
    }

    /// Look up an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if this is an open token of the given kind.
    #[must_use]
    pub fn opens(&self, kind: TokenKind) -> bool {
        self.kind == kind && self.nesting == Nesting::Open
    }

    /// Returns `true` if this is a close token of the given kind.
    #[must_use]
    pub fn closes(&self, kind: TokenKind) -> bool {
        self.kind == kind && self.nesting == Nesting::Close
    }

    /// Returns `true` if this is a `text` token.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.kind == TokenKind::Text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())?;
        if !self.content.is_empty() {
            write!(f, "({:?})", self.content)?;
        }
        if self.loading {
            write!(f, "[loading]")?;
        }
        Ok(())
    }
}

/// Find the index of the token closing the one at `open`.
///
/// Nested open tokens of the same kind increase the depth, so the close of an
/// outer list is not confused with the close of a nested one. Returns `None`
/// if `open` is not an open token, or if the stream ends before the matching
/// close.
#[must_use]
pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let kind = tokens.get(open).filter(|t| t.nesting == Nesting::Open)?.kind;
    let mut depth = 0usize;

    for (idx, token) in tokens.iter().enumerate().skip(open + 1) {
        if token.kind != kind {
            continue;
        }

        match token.nesting {
            Nesting::Open => depth += 1,
            Nesting::Close if depth == 0 => return Some(idx),
            Nesting::Close => depth -= 1,
            Nesting::Leaf => {}
        }
    }

    None
}

/// Like [`matching_close`], but returns the end of the slice for an
/// unterminated construct, together with whether a close was found.
#[must_use]
pub fn close_or_end(tokens: &[Token], open: usize) -> (usize, bool) {
    matching_close(tokens, open).map_or((tokens.len(), false), |idx| (idx, true))
}

/// Reconstruct Markdown source text from a run of inline tokens.
///
/// Used for the `raw` of inline nodes and the `content` of inline custom
/// elements.
#[must_use]
pub fn inline_source(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut hrefs = vec![];

    for token in tokens {
        if let Some(raw) = token.raw.as_deref()
            && matches!(
                token.kind,
                TokenKind::MathInline | TokenKind::Image | TokenKind::Checkbox
            )
        {
            out.push_str(raw);
            continue;
        }

        match (token.kind, token.nesting) {
            (TokenKind::Softbreak, _) => out.push('\n'),
            (TokenKind::Hardbreak, _) => out.push_str("  \n"),
            (TokenKind::CodeInline, _) => {
                out.push_str(&token.markup);
                out.push_str(&token.content);
                out.push_str(&token.markup);
            }
            (TokenKind::MathInline, _) => {
                out.push_str(&token.markup);
                out.push_str(&token.content);
                out.push_str(math_close_markup(&token.markup));
            }
            (TokenKind::Image, _) => {
                out.push_str("![");
                out.push_str(&token.content);
                out.push_str("](");
                out.push_str(token.attr("src").unwrap_or_default());
                out.push(')');
            }
            (TokenKind::Text, _) if token.markup == "escape" => {
                out.push('\\');
                out.push_str(&token.content);
            }
            (TokenKind::FootnoteRef, _) => {
                out.push_str("[^");
                out.push_str(token.attr("label").unwrap_or_default());
                out.push(']');
            }
            (TokenKind::Link, Nesting::Open) => {
                hrefs.push(token.attr("href").unwrap_or_default());
                out.push('[');
            }
            (TokenKind::Link, Nesting::Close) => {
                out.push_str("](");
                out.push_str(hrefs.pop().unwrap_or_default());
                out.push(')');
            }
            (_, Nesting::Open | Nesting::Close) => out.push_str(&token.markup),
            (_, Nesting::Leaf) => out.push_str(&token.content),
        }
    }

    out
}

/// The closing delimiter matching an opening math delimiter.
#[must_use]
pub fn math_close_markup(open: &str) -> &'static str {
    match open {
        "$$" => "$$",
        "\\(" => "\\)",
        "\\[" => "\\]",
        "[" => "]",
        _ => "$",
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
