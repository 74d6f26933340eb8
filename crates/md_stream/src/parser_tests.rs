use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use assert_matches::assert_matches;
use indoc::indoc;
use pretty_assertions::assert_eq;
use test_log::test;

use super::*;
use crate::{Error, MathOptions, node::has_node};

fn parser() -> MarkdownParser {
    MarkdownParser::new(ParserConfig::default()).unwrap()
}

fn kinds(nodes: &[ParsedNode]) -> Vec<&'static str> {
    nodes.iter().map(ParsedNode::kind).collect()
}

fn paragraph_children(nodes: &[ParsedNode]) -> &[ParsedNode] {
    match nodes {
        [ParsedNode::Paragraph { children, .. }] => children,
        _ => panic!("expected a single paragraph, got {nodes:#?}"),
    }
}

#[test]
fn test_inline_math() {
    let nodes = parser().parse("Energy $E=mc^2$ here", &ParseOptions::complete());

    assert_eq!(paragraph_children(&nodes), &[
        ParsedNode::text("Energy "),
        ParsedNode::MathInline {
            content: "E=mc^2".to_owned(),
            markup: "$".to_owned(),
            loading: false,
            raw: "$E=mc^2$".to_owned(),
        },
        ParsedNode::text(" here"),
    ]);
}

#[test]
fn test_block_math_loading() {
    let parser = parser();
    let cases = vec![
        ("closed", "$$\nx^2\n$$", ParseOptions::streaming(), false),
        ("streaming", "$$\nx^2", ParseOptions::streaming(), true),
        ("final", "$$\nx^2", ParseOptions::complete(), false),
    ];

    for (name, source, options, loading) in cases {
        let nodes = parser.parse(source, &options);
        assert_matches!(&nodes[..], [ParsedNode::MathBlock { content, loading: l, .. }] => {
            assert_eq!(content.trim(), "x^2", "failed case: {name}");
            assert_eq!(*l, loading, "failed case: {name}");
        }, "failed case: {name}");
    }
}

#[test]
fn test_strict_math_delimiters() {
    let strict = MarkdownParser::new(ParserConfig::default().with_math(MathOptions {
        strict_delimiters: true,
        ..MathOptions::default()
    }))
    .unwrap();

    let nodes = strict.parse("$$\nx^2", &ParseOptions::complete());
    assert!(!has_node(&nodes, "math_block"));

    let nodes = strict.parse("[\na = b\n]", &ParseOptions::complete());
    assert!(!has_node(&nodes, "math_block"));

    let nodes = parser().parse("[\na = b\n]", &ParseOptions::complete());
    assert!(has_node(&nodes, "math_block"));
}

#[test]
fn test_escaped_dollars_are_not_math() {
    let nodes = parser().parse("costs \\$5 and \\$6", &ParseOptions::complete());
    assert!(!has_node(&nodes, "math_inline"));
}

#[test]
fn test_extensions_disabled() {
    let config = ParserConfig::default()
        .with_math_enabled(false)
        .with_containers_enabled(false);
    let parser = MarkdownParser::new(config).unwrap();

    let nodes = parser.parse("$x$\n\n::: note\nbody\n:::", &ParseOptions::complete());
    assert!(!has_node(&nodes, "math_inline"));
    assert!(!has_node(&nodes, "admonition"));
}

#[test]
fn test_admonition() {
    let nodes = parser().parse(
        indoc! {"
            ::: warning Careful
            Do **not** do this.
            :::"},
        &ParseOptions::streaming(),
    );

    assert_matches!(&nodes[..], [ParsedNode::Admonition { kind, title, children, loading: false, .. }] => {
        assert_eq!(kind, "warning");
        assert_eq!(title, "Careful");
        assert!(has_node(children, "strong"));
    });
}

#[test]
fn test_require_closing_strong() {
    let parser = parser();

    let nodes = parser.parse("some **bold", &ParseOptions::streaming());
    assert_matches!(paragraph_children(&nodes), [_, ParsedNode::Strong { loading: true, .. }]);

    let nodes = parser.parse(
        "some **bold",
        &ParseOptions::streaming().with_require_closing_strong(true),
    );
    assert_eq!(paragraph_children(&nodes), &[ParsedNode::text("some **bold")]);
}

#[test]
fn test_custom_tags_per_call() {
    let parser = MarkdownParser::new(ParserConfig::default().with_custom_html_tags(["thinking"]))
        .unwrap();
    let source = "<thinking>\na\n</thinking>\n\n<answer>\nb\n</answer>";

    let nodes = parser.parse(source, &ParseOptions::complete());
    assert_eq!(kinds(&nodes), vec!["custom_element", "html_block"]);

    let nodes = parser.parse(
        source,
        &ParseOptions::complete().with_custom_html_tags(["Answer"]),
    );
    assert_eq!(kinds(&nodes), vec!["custom_element", "custom_element"]);
    assert!(nodes[1].is("answer"));
}

#[test]
fn test_nested_custom_elements() {
    let parser = MarkdownParser::new(
        ParserConfig::default().with_custom_html_tags(["outer", "inner"]),
    )
    .unwrap();

    let nodes = parser.parse(
        indoc! {"
            <outer>
            <inner>
            deep
            </inner>
            </outer>"},
        &ParseOptions::complete(),
    );

    assert_matches!(&nodes[..], [ParsedNode::CustomElement { tag, children, .. }] => {
        assert_eq!(tag, "outer");
        assert_eq!(kinds(children), vec!["custom_element"]);
        assert!(children[0].is("inner"));
    });
}

#[test]
fn test_custom_element_content_matches_source() {
    let parser = MarkdownParser::new(ParserConfig::default().with_custom_html_tags(["thinking"]))
        .unwrap();
    let source = "<thinking>\n<thinking>\ninner\n</thinking>\nouter\n</thinking>\nafter";

    for options in [ParseOptions::complete(), ParseOptions::streaming()] {
        let nodes = parser.parse(source, &options);

        assert_eq!(kinds(&nodes), vec!["custom_element", "paragraph"]);
        assert_matches!(&nodes[0], ParsedNode::CustomElement { content, .. } => {
            assert_eq!(content, "<thinking>\ninner\n</thinking>\nouter");
        });
    }
}

#[test]
fn test_private_use_text_is_kept() {
    let source = "$$\nx\n$$\n\n\u{E002}0\u{E003}\n";
    let nodes = parser().parse(source, &ParseOptions::complete());

    assert_eq!(kinds(&nodes), vec!["math_block", "paragraph"]);
    assert_eq!(paragraph_children(&nodes[1..]), &[ParsedNode::text(
        "\u{E002}0\u{E003}"
    )]);
}

#[test]
#[ntest::timeout(5000)]
fn test_long_emphasis_runs() {
    for unit in ["*a ", "**a ", "x *a"] {
        let source = unit.repeat(20_000);
        for options in [ParseOptions::streaming(), ParseOptions::complete()] {
            let nodes = parser().parse(&source, &options);
            assert_eq!(kinds(&nodes), vec!["paragraph"], "failed case: {unit}");
        }
    }
}

#[test]
fn test_transform_hooks() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let options = ParseOptions::complete()
        .with_pre_transform(move |tokens| {
            counter.fetch_add(1, Ordering::SeqCst);
            tokens
        })
        .with_post_transform(|tokens| {
            tokens
                .into_iter()
                .filter(|t| t.kind != crate::token::TokenKind::Hr)
                .collect()
        });

    let nodes = parser().parse("a\n\n---\n\nb", &options);
    assert_eq!(kinds(&nodes), vec!["paragraph", "paragraph"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_tokenize() {
    let tokens = parser().tokenize("# Hi", &ParseOptions::complete());
    let names: Vec<_> = tokens.iter().map(Token::type_name).collect();
    assert_eq!(names, vec!["heading_open", "inline", "heading_close"]);
}

#[test]
fn test_is_current() {
    let config = ParserConfig::default();
    let parser = MarkdownParser::new(config.clone()).unwrap();

    assert!(parser.is_current(&config));
    assert!(!parser.is_current(&config.revised()));
}

#[test]
fn test_invalid_config() {
    let config = ParserConfig::default().with_custom_html_tags(["1bad"]);
    assert_matches!(MarkdownParser::new(config), Err(Error::InvalidConfig(_)));
}

#[test]
fn test_debug_option_does_not_change_output() {
    let parser = parser();
    let source = "- a\n- **b";

    assert_eq!(
        parser.parse(source, &ParseOptions::streaming().with_debug(true)),
        parser.parse(source, &ParseOptions::streaming())
    );
}
