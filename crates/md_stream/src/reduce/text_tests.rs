use pretty_assertions::assert_eq;
use test_log::test;

use super::*;

const STREAMING: TextParser = TextParser::new(false, false);

const FINAL: TextParser = TextParser::new(true, false);

fn strong(children: Vec<ParsedNode>, loading: bool, raw: &str) -> ParsedNode {
    ParsedNode::Strong {
        children,
        loading,
        raw: raw.to_owned(),
    }
}

#[test]
fn test_plain_text() {
    assert_eq!(STREAMING.parse("just text"), vec![ParsedNode::text("just text")]);
    assert_eq!(STREAMING.parse(""), vec![]);
}

#[test]
fn test_emphasis() {
    let cases = vec![
        (
            "unclosed strong streaming",
            STREAMING,
            "a **bold",
            vec![
                ParsedNode::text("a "),
                strong(vec![ParsedNode::text("bold")], true, "**bold"),
            ],
        ),
        (
            "unclosed strong final",
            FINAL,
            "a **bold",
            vec![ParsedNode::text("a **bold")],
        ),
        (
            "strict strong",
            TextParser::new(false, true),
            "a **bold",
            vec![ParsedNode::text("a **bold")],
        ),
        (
            "unclosed emphasis",
            STREAMING,
            "*soft",
            vec![ParsedNode::Emphasis {
                children: vec![ParsedNode::text("soft")],
                loading: true,
                raw: "*soft".to_owned(),
            }],
        ),
        (
            "trailing marker dropped",
            STREAMING,
            "a **",
            vec![ParsedNode::text("a ")],
        ),
        (
            "trailing marker final",
            FINAL,
            "a **",
            vec![ParsedNode::text("a **")],
        ),
        (
            "followed by space",
            STREAMING,
            "2 * 3",
            vec![ParsedNode::text("2 * 3")],
        ),
        (
            "intraword",
            STREAMING,
            "snake__case",
            vec![ParsedNode::text("snake__case")],
        ),
        (
            "single underscore",
            STREAMING,
            "_x",
            vec![ParsedNode::text("_x")],
        ),
        (
            "closed in text",
            FINAL,
            "__x__ y",
            vec![
                strong(vec![ParsedNode::text("x")], false, "__x__"),
                ParsedNode::text(" y"),
            ],
        ),
    ];

    for (name, parser, text, expected) in cases {
        assert_eq!(parser.parse(text), expected, "failed case: {name}");
    }
}

#[test]
fn test_code() {
    let cases = vec![
        ("closed", "a `b` c", vec![
            ParsedNode::text("a "),
            ParsedNode::InlineCode {
                code: "b".to_owned(),
                raw: "`b`".to_owned(),
            },
            ParsedNode::text(" c"),
        ]),
        ("padded", "`` `x` ``", vec![ParsedNode::InlineCode {
            code: "`x`".to_owned(),
            raw: "`` `x` ``".to_owned(),
        }]),
        ("unclosed", "a `b", vec![ParsedNode::text("a `b")]),
        ("run mismatch", "``b`", vec![ParsedNode::text("``b`")]),
    ];

    for (name, text, expected) in cases {
        assert_eq!(STREAMING.parse(text), expected, "failed case: {name}");
    }
}

#[test]
fn test_delimited() {
    let cases = vec![
        ("strike", "~~x~~", "strikethrough"),
        ("mark", "==x==", "highlight"),
        ("insert", "++x++", "insert"),
    ];

    for (name, text, kind) in cases {
        let nodes = FINAL.parse(text);
        assert_eq!(nodes.len(), 1, "failed case: {name}");
        assert_eq!(nodes[0].kind(), kind, "failed case: {name}");
        assert_eq!(nodes[0].raw(), text, "failed case: {name}");
    }

    assert_eq!(STREAMING.parse("a == b"), vec![ParsedNode::text("a == b")]);
    assert_eq!(STREAMING.parse("==open"), vec![ParsedNode::text("==open")]);
    assert_eq!(STREAMING.parse("c++"), vec![ParsedNode::text("c++")]);
}

#[test]
fn test_links_and_images() {
    let cases = vec![
        (
            "streaming link",
            STREAMING,
            "see [docs](https://exa",
            vec![ParsedNode::text("see "), ParsedNode::Link {
                href: "https://exa".to_owned(),
                title: None,
                text: "docs".to_owned(),
                children: vec![ParsedNode::text("docs")],
                loading: true,
                raw: "[docs](https://exa".to_owned(),
            }],
        ),
        (
            "final link",
            FINAL,
            "see [docs](https://exa",
            vec![ParsedNode::text("see [docs](https://exa")],
        ),
        (
            "href with space",
            STREAMING,
            "[a](b c",
            vec![ParsedNode::text("[a](b c")],
        ),
        (
            "streaming image",
            STREAMING,
            "![cat](cat.pn",
            vec![ParsedNode::Image {
                src: "cat.pn".to_owned(),
                alt: "cat".to_owned(),
                title: None,
                loading: true,
                raw: "![cat](cat.pn".to_owned(),
            }],
        ),
        (
            "closed image",
            FINAL,
            "![cat](cat.png)!",
            vec![
                ParsedNode::Image {
                    src: "cat.png".to_owned(),
                    alt: "cat".to_owned(),
                    title: None,
                    loading: false,
                    raw: "![cat](cat.png)".to_owned(),
                },
                ParsedNode::text("!"),
            ],
        ),
    ];

    for (name, parser, text, expected) in cases {
        assert_eq!(parser.parse(text), expected, "failed case: {name}");
    }
}

#[test]
fn test_reference() {
    assert_eq!(STREAMING.parse("as shown [12]."), vec![
        ParsedNode::text("as shown "),
        ParsedNode::Reference {
            id: "12".to_owned(),
            raw: "[12]".to_owned(),
        },
        ParsedNode::text("."),
    ]);

    assert_eq!(STREAMING.parse("[a]"), vec![ParsedNode::text("[a]")]);
    assert_eq!(STREAMING.parse("[1]: x"), vec![ParsedNode::text("[1]: x")]);
    assert_eq!(FINAL.parse("x[0] = 5"), vec![ParsedNode::text("x[0] = 5")]);
    assert_eq!(FINAL.parse("(see [2])"), vec![
        ParsedNode::text("(see "),
        ParsedNode::Reference {
            id: "2".to_owned(),
            raw: "[2]".to_owned(),
        },
        ParsedNode::text(")"),
    ]);
}

#[test]
fn test_emoji() {
    assert_eq!(STREAMING.parse("ok :rocket:"), vec![
        ParsedNode::text("ok "),
        ParsedNode::Emoji {
            name: "rocket".to_owned(),
            markup: "🚀".to_owned(),
            raw: ":rocket:".to_owned(),
        },
    ]);

    assert_eq!(STREAMING.parse("at 10:30:45"), vec![ParsedNode::text("at 10:30:45")]);
    assert_eq!(STREAMING.parse(":not_an_emoji_name:"), vec![ParsedNode::text(
        ":not_an_emoji_name:"
    )]);
}

#[test]
fn test_closing_positions() {
    assert_eq!(closing_positions("**a **b**", "**"), vec![7]);
    assert_eq!(closing_positions("****", "**"), vec![1, 2]);
    assert_eq!(closing_positions("a *b* c", "*"), vec![4]);

    let mut closers = Closers::new("**a **b**");
    assert_eq!(closers.after("**", 2), Some(7));
    assert_eq!(closers.after("**", 7), None);

    let mut closers = Closers::new("****");
    assert_eq!(closers.after("**", 2), None);
}

#[test]
fn test_backtick_runs() {
    let mut closers = Closers::new("`a ``b`` c`");
    assert_eq!(closers.backtick_run(1, 1), Some(10));
    assert_eq!(closers.backtick_run(2, 3), Some(3));
    assert_eq!(closers.backtick_run(2, 4), Some(6));
    assert_eq!(closers.backtick_run(3, 0), None);
}

#[test]
fn test_nested_loading_spans() {
    let cases = vec![
        (
            "different markers nest",
            "**a *b",
            vec![strong(
                vec![ParsedNode::text("a "), ParsedNode::Emphasis {
                    children: vec![ParsedNode::text("b")],
                    loading: true,
                    raw: "*b".to_owned(),
                }],
                true,
                "**a *b",
            )],
        ),
        (
            "same marker stays literal",
            "*a *b *c",
            vec![ParsedNode::Emphasis {
                children: vec![ParsedNode::text("a *b *c")],
                loading: true,
                raw: "*a *b *c".to_owned(),
            }],
        ),
        (
            "unclosed inside closed span",
            "**a *b** c",
            vec![
                strong(vec![ParsedNode::text("a *b")], false, "**a *b**"),
                ParsedNode::text(" c"),
            ],
        ),
    ];

    for (name, text, expected) in cases {
        assert_eq!(STREAMING.parse(text), expected, "failed case: {name}");
    }
}

#[test]
#[ntest::timeout(2000)]
fn test_long_marker_runs() {
    for text in ["*a ".repeat(20_000), "x *a".repeat(20_000), "**a ".repeat(20_000)] {
        for parser in [STREAMING, FINAL] {
            let nodes = parser.parse(&text);
            assert!(nodes.len() <= 2);
        }
    }

    let nodes = STREAMING.parse(&"`a ".repeat(20_000));
    assert_eq!(nodes.len(), 20_000);
    assert_eq!(nodes[0].kind(), "inline_code");
}
