use super::{ReduceOptions, Siblings, html_inline, text::TextParser};
use crate::{
    node::ParsedNode,
    token::{self, Nesting, Token, TokenKind},
    tokenizer::plain_text,
};

/// Reduces the children of an `inline` token.
pub(super) struct InlineReducer<'a> {
    pub options: ReduceOptions<'a>,
    text: TextParser,
}

impl<'a> InlineReducer<'a> {
    pub fn new(options: ReduceOptions<'a>) -> Self {
        Self {
            options,
            text: TextParser::new(options.final_, options.require_closing_strong),
        }
    }

    pub fn reduce(&self, tokens: &[Token]) -> Vec<ParsedNode> {
        let mut out = Siblings::default();
        let mut idx = 0;

        while idx < tokens.len() {
            let token = &tokens[idx];
            let mut next = idx + 1;

            match (token.kind, token.nesting) {
                (TokenKind::Text, _) if token.markup == "escape" => out.push(ParsedNode::Text {
                    content: token.content.clone(),
                    raw: format!("\\{}", token.content),
                }),
                (TokenKind::Text, _) => out.extend(self.text.parse(&token.content)),
                (TokenKind::Softbreak, _) => out.push(ParsedNode::text("\n")),
                (TokenKind::Hardbreak, _) => out.push(ParsedNode::Hardbreak {
                    raw: "  \n".to_owned(),
                }),
                (TokenKind::CodeInline, _) => out.push(ParsedNode::InlineCode {
                    code: token.content.clone(),
                    raw: token::inline_source(std::slice::from_ref(token)),
                }),
                (TokenKind::MathInline, _) => out.push(ParsedNode::MathInline {
                    content: token.content.clone(),
                    markup: token.markup.clone(),
                    loading: token.loading,
                    raw: token::inline_source(std::slice::from_ref(token)),
                }),
                (TokenKind::Image, _) => out.push(ParsedNode::Image {
                    src: token.attr("src").unwrap_or_default().to_owned(),
                    alt: token.attr("alt").unwrap_or(&token.content).to_owned(),
                    title: token.attr("title").map(str::to_owned),
                    loading: token.loading,
                    raw: token::inline_source(std::slice::from_ref(token)),
                }),
                (TokenKind::Checkbox, _) => out.push(ParsedNode::Checkbox {
                    checked: token.attr("checked").is_some(),
                    raw: token.raw.clone().unwrap_or_default(),
                }),
                (TokenKind::FootnoteRef, _) => {
                    let id = token.attr("label").unwrap_or_default();
                    out.push(ParsedNode::FootnoteReference {
                        id: id.to_owned(),
                        raw: format!("[^{id}]"),
                    });
                }
                (TokenKind::HtmlInline, _) => {
                    let (node, end) = html_inline::reduce(self, tokens, idx);
                    out.push(node);
                    next = end;
                }
                (
                    TokenKind::Strong
                    | TokenKind::Em
                    | TokenKind::S
                    | TokenKind::Mark
                    | TokenKind::Ins
                    | TokenKind::Sub
                    | TokenKind::Sup
                    | TokenKind::Link,
                    Nesting::Open,
                ) => {
                    let (node, end) = self.wrapped(tokens, idx);
                    out.push(node);
                    next = end;
                }
                // A close without its open.
                (_, Nesting::Close) => {}
                _ => out.push(ParsedNode::text(token.content.clone())),
            }

            idx = next;
        }

        out.finish()
    }

    /// Reduce the construct opened at `idx`. Returns the node and the index
    /// after its close.
    fn wrapped(&self, tokens: &[Token], idx: usize) -> (ParsedNode, usize) {
        let open = &tokens[idx];
        let (close, found) = token::close_or_end(tokens, idx);
        let inner = &tokens[idx + 1..close];
        let end = (close + 1).min(tokens.len());

        let children = self.reduce(inner);
        let raw = token::inline_source(&tokens[idx..end]);
        let loading = open.loading || (!found && !self.options.final_);

        let node = match open.kind {
            TokenKind::Strong => ParsedNode::Strong {
                children,
                loading,
                raw,
            },
            TokenKind::Em => ParsedNode::Emphasis {
                children,
                loading,
                raw,
            },
            TokenKind::S => ParsedNode::Strikethrough { children, raw },
            TokenKind::Mark => ParsedNode::Highlight { children, raw },
            TokenKind::Ins => ParsedNode::Insert { children, raw },
            TokenKind::Sub => ParsedNode::Subscript { children, raw },
            TokenKind::Sup => ParsedNode::Superscript { children, raw },
            _ => ParsedNode::Link {
                href: open.attr("href").unwrap_or_default().to_owned(),
                title: open.attr("title").map(str::to_owned),
                text: plain_text(inner),
                children,
                loading,
                raw,
            },
        };

        (node, end)
    }
}

#[cfg(test)]
#[path = "inline_tests.rs"]
mod tests;
