use pretty_assertions::assert_eq;
use test_log::test;

use super::*;

fn list() -> Vec<Token> {
    vec![
        Token::open(TokenKind::BulletList),
        Token::open(TokenKind::ListItem),
        Token::open(TokenKind::BulletList),
        Token::open(TokenKind::ListItem),
        Token::close(TokenKind::ListItem),
        Token::close(TokenKind::BulletList),
        Token::close(TokenKind::ListItem),
        Token::close(TokenKind::BulletList),
    ]
}

#[test]
fn test_type_name() {
    assert_eq!(Token::open(TokenKind::Paragraph).type_name(), "paragraph_open");
    assert_eq!(Token::close(TokenKind::Em).type_name(), "em_close");
    assert_eq!(Token::leaf(TokenKind::MathBlock).type_name(), "math_block");
}

#[test]
fn test_display() {
    assert_eq!(Token::text("a").to_string(), "text(\"a\")");
    assert_eq!(
        Token::open(TokenKind::Strong).with_loading(true).to_string(),
        "strong_open[loading]"
    );
}

#[test]
fn test_matching_close() {
    let tokens = list();

    assert_eq!(matching_close(&tokens, 0), Some(7));
    assert_eq!(matching_close(&tokens, 2), Some(5));
    assert_eq!(matching_close(&tokens, 4), None);
    assert_eq!(matching_close(&tokens[..7], 0), None);
    assert_eq!(matching_close(&tokens, 99), None);
}

#[test]
fn test_close_or_end() {
    let tokens = list();

    assert_eq!(close_or_end(&tokens, 1), (6, true));
    assert_eq!(close_or_end(&tokens[..5], 0), (5, false));
}

#[test]
fn test_attr() {
    let token = Token::open(TokenKind::Link)
        .with_attr("href", "/a")
        .with_attr("title", "t");

    assert_eq!(token.attr("href"), Some("/a"));
    assert_eq!(token.attr("title"), Some("t"));
    assert_eq!(token.attr("rel"), None);
    assert!(token.opens(TokenKind::Link));
    assert!(!token.closes(TokenKind::Link));
}

#[test]
fn test_inline_source() {
    let tokens = vec![
        Token::text("a "),
        Token::open(TokenKind::Strong).with_markup("**"),
        Token::text("b"),
        Token::close(TokenKind::Strong).with_markup("**"),
        Token::leaf(TokenKind::Softbreak),
        Token::text("*").with_markup("escape"),
        Token::open(TokenKind::Link).with_attr("href", "/x"),
        Token::leaf(TokenKind::CodeInline)
            .with_content("c")
            .with_markup("``"),
        Token::close(TokenKind::Link),
        Token::leaf(TokenKind::MathInline)
            .with_content("y")
            .with_markup("\\["),
        Token::leaf(TokenKind::Image)
            .with_content("alt")
            .with_attr("src", "i.png"),
        Token::leaf(TokenKind::FootnoteRef).with_attr("label", "1"),
        Token::leaf(TokenKind::Hardbreak),
        Token::leaf(TokenKind::HtmlInline).with_content("<br>"),
    ];

    assert_eq!(
        inline_source(&tokens),
        "a **b**\n\\*[``c``](/x)\\[y\\]![alt](i.png)[^1]  \n<br>"
    );
}

#[test]
fn test_inline_source_prefers_raw() {
    let math = Token::leaf(TokenKind::MathInline)
        .with_content("x")
        .with_markup("$")
        .with_raw("$x");

    assert_eq!(inline_source(&[math]), "$x");
}

#[test]
fn test_math_close_markup() {
    let cases = vec![("$", "$"), ("$$", "$$"), ("\\(", "\\)"), ("\\[", "\\]"), ("[", "]")];

    for (open, close) in cases {
        assert_eq!(math_close_markup(open), close, "failed case: {open}");
    }
}

#[test]
fn test_token_serializes() {
    let value = serde_json::to_value(Token::text("a")).unwrap();
    assert_eq!(value["kind"], "text");
    assert_eq!(value["nesting"], "leaf");
}
