//! The parsed document tree.
//!
//! [`ParsedNode`] serializes as a plain object with a `type` discriminant, the
//! wire format between the parser and a renderer:
//!
//! ```json
//! {"type": "strong", "children": [{"type": "text", "content": "hi", "raw": "hi"}], "loading": false, "raw": "**hi**"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node of the document tree.
///
/// Every node carries `raw`, the source text it was built from (or a
/// reconstruction of it for inline nodes). Nodes for constructs that can be
/// seen before their closing syntax arrives carry `loading`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsedNode {
    Text {
        content: String,
        raw: String,
    },
    Paragraph {
        children: Vec<ParsedNode>,
        raw: String,
    },
    Heading {
        level: u8,
        /// Plain text of the heading.
        text: String,
        children: Vec<ParsedNode>,
        raw: String,
    },
    List {
        ordered: bool,
        /// First number of an ordered list.
        start: Option<u64>,
        items: Vec<ListItem>,
        raw: String,
    },
    Blockquote {
        children: Vec<ParsedNode>,
        raw: String,
    },
    Table {
        header: TableRow,
        rows: Vec<TableRow>,
        loading: bool,
        raw: String,
    },
    ThematicBreak {
        raw: String,
    },
    CodeBlock {
        language: String,
        code: String,
        loading: bool,
        /// The block is a `diff`; `original_code` and `updated_code` hold its
        /// two sides.
        diff: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        original_code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_code: Option<String>,
        raw: String,
    },
    HtmlBlock {
        tag: String,
        content: String,
        loading: bool,
        raw: String,
    },
    HtmlInline {
        tag: String,
        content: String,
        children: Vec<ParsedNode>,
        loading: bool,
        raw: String,
    },
    /// An element whose tag is one of the configured custom tags.
    CustomElement {
        tag: String,
        attrs: Vec<(String, String)>,
        /// The source between the opening and closing tags.
        content: String,
        children: Vec<ParsedNode>,
        loading: bool,
        /// The closing tag has not been seen; `raw` ends with a synthetic one.
        auto_closed: bool,
        raw: String,
    },
    MathInline {
        content: String,
        markup: String,
        loading: bool,
        raw: String,
    },
    MathBlock {
        content: String,
        markup: String,
        loading: bool,
        raw: String,
    },
    Link {
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        text: String,
        children: Vec<ParsedNode>,
        loading: bool,
        raw: String,
    },
    Image {
        src: String,
        alt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        loading: bool,
        raw: String,
    },
    Strong {
        children: Vec<ParsedNode>,
        loading: bool,
        raw: String,
    },
    Emphasis {
        children: Vec<ParsedNode>,
        loading: bool,
        raw: String,
    },
    Strikethrough {
        children: Vec<ParsedNode>,
        raw: String,
    },
    Highlight {
        children: Vec<ParsedNode>,
        raw: String,
    },
    Insert {
        children: Vec<ParsedNode>,
        raw: String,
    },
    Subscript {
        children: Vec<ParsedNode>,
        raw: String,
    },
    Superscript {
        children: Vec<ParsedNode>,
        raw: String,
    },
    InlineCode {
        code: String,
        raw: String,
    },
    Hardbreak {
        raw: String,
    },
    Footnote {
        id: String,
        children: Vec<ParsedNode>,
        raw: String,
    },
    FootnoteReference {
        id: String,
        raw: String,
    },
    FootnoteAnchor {
        id: String,
        raw: String,
    },
    DefinitionList {
        items: Vec<DefinitionItem>,
        raw: String,
    },
    Admonition {
        kind: String,
        title: String,
        children: Vec<ParsedNode>,
        loading: bool,
        raw: String,
    },
    VmrContainer {
        name: String,
        attrs: Value,
        children: Vec<ParsedNode>,
        loading: bool,
        raw: String,
    },
    Checkbox {
        checked: bool,
        raw: String,
    },
    CheckboxInput {
        checked: bool,
        raw: String,
    },
    Reference {
        id: String,
        raw: String,
    },
    Emoji {
        name: String,
        markup: String,
        raw: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub children: Vec<ParsedNode>,
    pub raw: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub header: bool,

    /// `left`, `center` or `right`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,

    pub children: Vec<ParsedNode>,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionItem {
    pub term: Vec<ParsedNode>,
    pub definition: Vec<ParsedNode>,
}

impl ParsedNode {
    /// A text node.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::Text {
            raw: content.clone(),
            content,
        }
    }

    /// The `type` discriminant of the node.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Paragraph { .. } => "paragraph",
            Self::Heading { .. } => "heading",
            Self::List { .. } => "list",
            Self::Blockquote { .. } => "blockquote",
            Self::Table { .. } => "table",
            Self::ThematicBreak { .. } => "thematic_break",
            Self::CodeBlock { .. } => "code_block",
            Self::HtmlBlock { .. } => "html_block",
            Self::HtmlInline { .. } => "html_inline",
            Self::CustomElement { .. } => "custom_element",
            Self::MathInline { .. } => "math_inline",
            Self::MathBlock { .. } => "math_block",
            Self::Link { .. } => "link",
            Self::Image { .. } => "image",
            Self::Strong { .. } => "strong",
            Self::Emphasis { .. } => "emphasis",
            Self::Strikethrough { .. } => "strikethrough",
            Self::Highlight { .. } => "highlight",
            Self::Insert { .. } => "insert",
            Self::Subscript { .. } => "subscript",
            Self::Superscript { .. } => "superscript",
            Self::InlineCode { .. } => "inline_code",
            Self::Hardbreak { .. } => "hardbreak",
            Self::Footnote { .. } => "footnote",
            Self::FootnoteReference { .. } => "footnote_reference",
            Self::FootnoteAnchor { .. } => "footnote_anchor",
            Self::DefinitionList { .. } => "definition_list",
            Self::Admonition { .. } => "admonition",
            Self::VmrContainer { .. } => "vmr_container",
            Self::Checkbox { .. } => "checkbox",
            Self::CheckboxInput { .. } => "checkbox_input",
            Self::Reference { .. } => "reference",
            Self::Emoji { .. } => "emoji",
        }
    }

    /// Returns `true` if the node is of the given kind. A custom element also
    /// matches its tag name.
    #[must_use]
    pub fn is(&self, kind: &str) -> bool {
        match self {
            Self::CustomElement { tag, .. } if tag == kind => true,
            _ => self.kind() == kind,
        }
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Text { raw, .. }
            | Self::Paragraph { raw, .. }
            | Self::Heading { raw, .. }
            | Self::List { raw, .. }
            | Self::Blockquote { raw, .. }
            | Self::Table { raw, .. }
            | Self::ThematicBreak { raw }
            | Self::CodeBlock { raw, .. }
            | Self::HtmlBlock { raw, .. }
            | Self::HtmlInline { raw, .. }
            | Self::CustomElement { raw, .. }
            | Self::MathInline { raw, .. }
            | Self::MathBlock { raw, .. }
            | Self::Link { raw, .. }
            | Self::Image { raw, .. }
            | Self::Strong { raw, .. }
            | Self::Emphasis { raw, .. }
            | Self::Strikethrough { raw, .. }
            | Self::Highlight { raw, .. }
            | Self::Insert { raw, .. }
            | Self::Subscript { raw, .. }
            | Self::Superscript { raw, .. }
            | Self::InlineCode { raw, .. }
            | Self::Hardbreak { raw }
            | Self::Footnote { raw, .. }
            | Self::FootnoteReference { raw, .. }
            | Self::FootnoteAnchor { raw, .. }
            | Self::DefinitionList { raw, .. }
            | Self::Admonition { raw, .. }
            | Self::VmrContainer { raw, .. }
            | Self::Checkbox { raw, .. }
            | Self::CheckboxInput { raw, .. }
            | Self::Reference { raw, .. }
            | Self::Emoji { raw, .. } => raw,
        }
    }

    /// Returns `true` if the node's closing syntax has not been seen yet.
    #[must_use]
    pub const fn loading(&self) -> bool {
        match self {
            Self::Table { loading, .. }
            | Self::CodeBlock { loading, .. }
            | Self::HtmlBlock { loading, .. }
            | Self::HtmlInline { loading, .. }
            | Self::CustomElement { loading, .. }
            | Self::MathInline { loading, .. }
            | Self::MathBlock { loading, .. }
            | Self::Link { loading, .. }
            | Self::Image { loading, .. }
            | Self::Strong { loading, .. }
            | Self::Emphasis { loading, .. }
            | Self::Admonition { loading, .. }
            | Self::VmrContainer { loading, .. } => *loading,
            _ => false,
        }
    }

    /// The direct child nodes, including those of list items, table cells
    /// and definition items.
    #[must_use]
    pub fn child_nodes(&self) -> Vec<&Self> {
        match self {
            Self::Paragraph { children, .. }
            | Self::Heading { children, .. }
            | Self::Blockquote { children, .. }
            | Self::HtmlInline { children, .. }
            | Self::CustomElement { children, .. }
            | Self::Link { children, .. }
            | Self::Strong { children, .. }
            | Self::Emphasis { children, .. }
            | Self::Strikethrough { children, .. }
            | Self::Highlight { children, .. }
            | Self::Insert { children, .. }
            | Self::Subscript { children, .. }
            | Self::Superscript { children, .. }
            | Self::Footnote { children, .. }
            | Self::Admonition { children, .. }
            | Self::VmrContainer { children, .. } => children.iter().collect(),
            Self::List { items, .. } => items.iter().flat_map(|i| &i.children).collect(),
            Self::Table { header, rows, .. } => std::iter::once(header)
                .chain(rows)
                .flat_map(|row| &row.cells)
                .flat_map(|cell| &cell.children)
                .collect(),
            Self::DefinitionList { items, .. } => items
                .iter()
                .flat_map(|item| item.term.iter().chain(&item.definition))
                .collect(),
            _ => vec![],
        }
    }
}

/// Returns `true` if any node in the tree is of the given kind (or is a custom
/// element with that tag).
#[must_use]
pub fn has_node(nodes: &[ParsedNode], kind: &str) -> bool {
    !find_nodes(nodes, kind).is_empty()
}

/// All nodes in the tree of the given kind, in document order.
#[must_use]
pub fn find_nodes<'a>(nodes: &'a [ParsedNode], kind: &str) -> Vec<&'a ParsedNode> {
    let mut found = vec![];
    let mut stack: Vec<&ParsedNode> = nodes.iter().rev().collect();

    while let Some(node) = stack.pop() {
        if node.is(kind) {
            found.push(node);
        }
        stack.extend(node.child_nodes().into_iter().rev());
    }

    found
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
