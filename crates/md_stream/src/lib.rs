//! Streaming Markdown to node tree parser.
//!
//! Built for rendering Markdown while it is still being generated. The whole
//! buffer is parsed again on every chunk; constructs whose closing syntax has
//! not arrived yet (an unclosed fence, `**bold`, `$x`, `<thinking>`) come back
//! as nodes with `loading: true` instead of flickering between literal text and
//! their final form.
//!
//! ```ignore
//! let parser = MarkdownParser::new(ParserConfig::default().with_custom_html_tags(["thinking"]))?;
//! let nodes = parse_markdown_to_structure("<thinking>\nhmm", &parser, &ParseOptions::streaming());
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod html;
pub mod math;
pub mod node;
pub mod normalize;
pub mod parser;
pub mod reduce;
pub mod repair;
pub mod scan;
pub mod token;
pub mod tokenizer;

pub use config::{ControlBytes, MathOptions, ParseOptions, ParserConfig, TokenTransform};
pub use error::{Error, Result};
pub use node::{
    DefinitionItem, ListItem, ParsedNode, TableCell, TableRow, find_nodes, has_node,
};
pub use parser::MarkdownParser;
pub use token::{Nesting, Token, TokenKind};
pub use tokenizer::{Env, MarkdownTokenizer};

/// Parse `markdown` with `parser` into a node tree.
#[must_use]
pub fn parse_markdown_to_structure(
    markdown: &str,
    parser: &MarkdownParser,
    options: &ParseOptions,
) -> Vec<ParsedNode> {
    parser.parse(markdown, options)
}
