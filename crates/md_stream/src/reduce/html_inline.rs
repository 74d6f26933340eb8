use super::inline::InlineReducer;
use crate::{
    html::{self, Tag},
    node::ParsedNode,
    token::{self, Token, TokenKind},
    tokenizer::plain_text,
};

/// Reduce the `html_inline` token at `idx`, together with the tokens up to
/// its closing tag. Returns the node and the index after the consumed tokens.
pub(super) fn reduce(reducer: &InlineReducer<'_>, tokens: &[Token], idx: usize) -> (ParsedNode, usize) {
    let open = &tokens[idx];
    let leaf = |tag: &str| ParsedNode::HtmlInline {
        tag: tag.to_owned(),
        content: open.content.clone(),
        children: vec![],
        loading: false,
        raw: open.content.clone(),
    };

    let Some(tag) = html::parse_tag(&open.content) else {
        return (leaf(""), idx + 1);
    };

    if tag.name == "input" && tag.attr("type") == Some("checkbox") {
        return (
            ParsedNode::CheckboxInput {
                checked: tag.attr("checked").is_some(),
                raw: open.content.clone(),
            },
            idx + 1,
        );
    }

    if tag.closing || tag.is_leaf() {
        return (leaf(&tag.name), idx + 1);
    }

    let close = find_close(tokens, idx, &tag.name);
    let inner = &tokens[idx + 1..close.unwrap_or(tokens.len())];
    let end = close.map_or(tokens.len(), |close| close + 1);
    let closing = close.map_or_else(|| format!("</{}>", tag.name), |c| tokens[c].content.clone());

    let source = token::inline_source(inner);
    let raw = format!("{}{source}{closing}", open.content);
    let loading = close.is_none() && !reducer.options.final_;
    let children = reducer.reduce(inner);

    let node = if tag.name == "a" {
        ParsedNode::Link {
            href: tag.attr("href").unwrap_or_default().to_owned(),
            title: tag.attr("title").map(str::to_owned),
            text: plain_text(inner),
            children,
            loading,
            raw,
        }
    } else if reducer.options.custom_tags.contains(&tag.name) {
        let Tag { name, attrs, .. } = tag;
        ParsedNode::CustomElement {
            tag: name,
            attrs,
            content: source,
            children,
            loading,
            auto_closed: close.is_none(),
            raw,
        }
    } else {
        ParsedNode::HtmlInline {
            tag: tag.name,
            content: source,
            children,
            loading,
            raw,
        }
    };

    (node, end)
}

/// Index of the `html_inline` token closing the `name` element opened at
/// `open`, counting nested elements of the same name.
fn find_close(tokens: &[Token], open: usize, name: &str) -> Option<usize> {
    let mut depth = 0usize;

    for (idx, token) in tokens.iter().enumerate().skip(open + 1) {
        if token.kind != TokenKind::HtmlInline {
            continue;
        }

        let Some(tag) = html::parse_tag(&token.content).filter(|t| t.name == name) else {
            continue;
        };

        if tag.closing {
            if depth == 0 {
                return Some(idx);
            }
            depth -= 1;
        } else if !tag.self_closing {
            depth += 1;
        }
    }

    None
}
