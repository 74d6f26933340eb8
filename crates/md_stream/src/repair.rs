//! Token repair passes.
//!
//! These run as core rules after the inline stage. Each pass takes the flat
//! token array and returns a new one; none of them mutate in place. A pass that
//! finds nothing to repair returns its input unchanged, so running a pass twice
//! gives the same result as running it once.

use std::{slice::SliceIndex, sync::Arc};

use tracing::trace;

use crate::{
    error::{Error, Result},
    math::heuristics::count_unescaped,
    token::{self, Nesting, Token, TokenKind},
    tokenizer::{CoreRule, Env, MarkdownTokenizer, merge_text},
};

/// Register the `link_repair`, `strong_repair` and `inline_cleanup` core
/// rules, in that order.
pub fn install(tokenizer: &mut MarkdownTokenizer) {
    tokenizer
        .core
        .push("link_repair", Arc::new(link_repair) as CoreRule);
    tokenizer
        .core
        .push("strong_repair", Arc::new(strong_repair) as CoreRule);
    tokenizer
        .core
        .push("inline_cleanup", Arc::new(inline_cleanup) as CoreRule);
}

/// Apply `f` to the children of every `inline` token.
fn map_inline<F>(tokens: Vec<Token>, mut f: F) -> Result<Vec<Token>>
where
    F: FnMut(Vec<Token>) -> Result<Vec<Token>>,
{
    tokens
        .into_iter()
        .map(|mut token| {
            if token.kind == TokenKind::Inline && !token.children.is_empty() {
                token.children = f(std::mem::take(&mut token.children))?;
            }
            Ok(token)
        })
        .collect()
}

fn slice<I>(text: &str, range: I) -> Result<&str>
where
    I: SliceIndex<str, Output = str>,
{
    text.get(range).ok_or_else(|| Error::Repair {
        pass: "link_repair",
        reason: format!("invalid slice of {text:?}"),
    })
}

/// Rejoin a `[label](href` that the inline stage split into several tokens.
///
/// This happens when the label holds an inline construct claimed before
/// comrak saw the line, such as math, and the link is not complete yet.
pub fn link_repair(tokens: Vec<Token>, env: &Env) -> Result<Vec<Token>> {
    map_inline(tokens, |children| repair_links(children, env))
}

fn repair_links(children: Vec<Token>, env: &Env) -> Result<Vec<Token>> {
    let mut out = Vec::with_capacity(children.len());
    let mut idx = 0;

    while idx < children.len() {
        let token = &children[idx];

        // `[label](https://exa` where comrak autolinked the partial href.
        if let Some(open) = dangling_label(token)
            && children.get(idx + 1).is_some_and(|t| t.opens(TokenKind::Link))
            && let Some(auto_close) = token::matching_close(&children, idx + 1)
        {
            let head = &token.content;
            let href = children[idx + 1].attr("href").unwrap_or_default();
            let rest = children
                .get(auto_close + 1)
                .filter(|t| is_plain_text(t))
                .and_then(|t| t.content.strip_prefix(')'));

            trace!(href, closed = rest.is_some(), "Repaired autolinked href.");

            if open > 0 {
                out.push(Token::text(slice(head, ..open)?));
            }
            out.push(
                Token::open(TokenKind::Link)
                    .with_tag("a")
                    .with_attr("href", href)
                    .with_loading(rest.is_none() && !env.final_),
            );
            out.push(Token::text(slice(head, open + 1..head.len() - 2)?));
            out.push(
                Token::close(TokenKind::Link)
                    .with_tag("a")
                    .with_loading(rest.is_none() && !env.final_),
            );

            match rest {
                Some(rest) => {
                    out.push(Token::text(rest));
                    idx = auto_close + 2;
                }
                None => idx = auto_close + 1,
            }
            continue;
        }

        let Some(open) = unmatched_bracket(token) else {
            out.push(token.clone());
            idx += 1;
            continue;
        };

        // The `](` must come in a later text token, with only inline leaves in
        // between.
        let tail = children[idx + 1..]
            .iter()
            .position(|t| is_plain_text(t) && t.content.contains("]("))
            .map(|pos| idx + 1 + pos);

        let Some(tail) = tail.filter(|&tail| {
            children[idx + 1..tail]
                .iter()
                .all(|t| t.nesting == Nesting::Leaf && !t.content.contains(']'))
        }) else {
            out.push(token.clone());
            idx += 1;
            continue;
        };

        let head = &token.content;
        let tail_text = &children[tail].content;
        let split = tail_text.find("](").unwrap_or_default();
        let after = slice(tail_text, split + 2..)?;
        let (href, rest, closed) = match after.find(')') {
            Some(close) => (slice(after, ..close)?, slice(after, close + 1..)?, true),
            None => (after, "", false),
        };

        trace!(href, closed, "Repaired split link.");

        if open > 0 {
            out.push(Token::text(slice(head, ..open)?));
        }
        out.push(
            Token::open(TokenKind::Link)
                .with_tag("a")
                .with_attr("href", href)
                .with_loading(!closed && !env.final_),
        );
        out.push(Token::text(slice(head, open + 1..)?));
        out.extend(children[idx + 1..tail].iter().cloned());
        out.push(Token::text(slice(tail_text, ..split)?));
        out.push(
            Token::close(TokenKind::Link)
                .with_tag("a")
                .with_loading(!closed && !env.final_),
        );
        out.push(Token::text(rest));

        idx = tail + 1;
    }

    Ok(merge_text(out))
}

fn is_plain_text(token: &Token) -> bool {
    token.is_text() && token.markup.is_empty()
}

/// Byte position of the `[` of a text token ending in `[label](`.
fn dangling_label(token: &Token) -> Option<usize> {
    if !is_plain_text(token) {
        return None;
    }

    let body = token.content.strip_suffix("](")?;
    let open = body.rfind('[')?;
    (!body[open..].contains(']')).then_some(open)
}

/// Byte position of the last `[` in a text token that has no `]` after it.
fn unmatched_bracket(token: &Token) -> Option<usize> {
    if !is_plain_text(token) {
        return None;
    }

    let open = token.content.rfind('[')?;
    (!token.content[open..].contains(']')).then_some(open)
}

/// Turn an unclosed `**` (or `__`) that is followed by other inline tokens
/// into a loading strong pair.
///
/// Only applies to streaming parses that do not require a closing marker. An
/// unclosed marker inside a single text token is left to the reducer.
pub fn strong_repair(tokens: Vec<Token>, env: &Env) -> Result<Vec<Token>> {
    if env.final_ || env.require_closing_strong {
        return Ok(tokens);
    }

    map_inline(tokens, |children| Ok(repair_strong(children)))
}

fn repair_strong(children: Vec<Token>) -> Vec<Token> {
    let counts: Vec<[usize; 2]> = children
        .iter()
        .map(|token| {
            if is_plain_text(token) {
                [
                    count_unescaped(&token.content, "**"),
                    count_unescaped(&token.content, "__"),
                ]
            } else {
                [0, 0]
            }
        })
        .collect();
    let totals = counts.iter().fold([0, 0], |acc, here| [acc[0] + here[0], acc[1] + here[1]]);

    // Walking back from the end, `after` counts the markers of later tokens.
    let mut after = [0, 0];
    let mut found = None;
    for idx in (0..children.len()).rev() {
        let here = counts[idx];
        if idx + 1 < children.len() {
            found = ["**", "__"].into_iter().enumerate().find_map(|(kind, marker)| {
                let through = totals[kind] - after[kind];

                // The last marker of an odd total is the unclosed one.
                if here[kind] == 0 || through % 2 == 0 {
                    return None;
                }

                children[idx].content.rfind(marker).map(|pos| (idx, pos, marker))
            });
            if found.is_some() {
                break;
            }
        }
        after = [after[0] + here[0], after[1] + here[1]];
    }

    let Some((idx, pos, marker)) = found else {
        return children;
    };

    // Markers after the unclosed one would have closed it.
    if children[idx + 1..]
        .iter()
        .any(|t| is_plain_text(t) && t.content.contains(marker))
    {
        return children;
    }

    trace!(marker, "Repaired unclosed strong emphasis.");

    let content = &children[idx].content;
    let mut out = children[..idx].to_vec();
    out.push(Token::text(&content[..pos]));
    out.push(
        Token::open(TokenKind::Strong)
            .with_tag("strong")
            .with_markup(marker)
            .with_loading(true),
    );
    out.push(Token::text(&content[pos + marker.len()..]));
    out.extend(children[idx + 1..].iter().cloned());
    out.push(
        Token::close(TokenKind::Strong)
            .with_tag("strong")
            .with_markup(marker)
            .with_loading(true),
    );

    merge_text(out)
}

/// Normalize the inline content of table cells and list items.
///
/// In cells, empty text is dropped and trailing whitespace trimmed. In list
/// items, a leading `[ ]` or `[x]` that was not recognized as a task marker
/// becomes a checkbox.
pub fn inline_cleanup(tokens: Vec<Token>, _env: &Env) -> Result<Vec<Token>> {
    let mut stack: Vec<TokenKind> = vec![];
    let mut out = Vec::with_capacity(tokens.len());

    for mut token in tokens {
        match token.nesting {
            Nesting::Open => stack.push(token.kind),
            Nesting::Close => {
                stack.pop();
            }
            Nesting::Leaf if token.kind == TokenKind::Inline => {
                match stack.iter().rev().find(|&&k| k != TokenKind::Paragraph) {
                    Some(TokenKind::Th | TokenKind::Td) => {
                        token.children = clean_cell(std::mem::take(&mut token.children));
                    }
                    Some(TokenKind::ListItem) if stack.last() == Some(&TokenKind::Paragraph) => {
                        token.children = task_marker(std::mem::take(&mut token.children));
                    }
                    _ => {}
                }
            }
            Nesting::Leaf => {}
        }

        out.push(token);
    }

    Ok(out)
}

fn clean_cell(children: Vec<Token>) -> Vec<Token> {
    let mut children = merge_text(children);
    if let Some(last) = children.last_mut()
        && is_plain_text(last)
    {
        let trimmed = last.content.trim_end().len();
        last.content.truncate(trimmed);
    }

    children.retain(|t| !(t.is_text() && t.content.is_empty()));
    children
}

fn task_marker(children: Vec<Token>) -> Vec<Token> {
    let Some(first) = children.first().filter(|t| is_plain_text(t)) else {
        return children;
    };

    let checked = match first.content.get(..3) {
        Some("[ ]") => false,
        Some("[x]" | "[X]") => true,
        _ => return children,
    };

    let rest = &first.content[3..];
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return children;
    }

    let mut checkbox = Token::leaf(TokenKind::Checkbox).with_raw(&first.content[..3]);
    if checked {
        checkbox = checkbox.with_attr("checked", "true");
    }

    let mut out = vec![checkbox, Token::text(rest.trim_start())];
    out.extend(children.into_iter().skip(1));
    merge_text(out)
}

#[cfg(test)]
#[path = "repair_tests.rs"]
mod tests;
