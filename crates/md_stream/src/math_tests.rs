use pretty_assertions::assert_eq;
use test_log::test;

use super::*;
use crate::tokenizer::Env;

fn tokenizer(options: &MathOptions) -> MarkdownTokenizer {
    let mut tokenizer = MarkdownTokenizer::new();
    install(&mut tokenizer, options).unwrap();
    tokenizer
}

fn env(final_: bool) -> Env {
    Env {
        final_,
        ..Env::default()
    }
}

fn strict() -> MathOptions {
    MathOptions {
        strict_delimiters: true,
        ..MathOptions::default()
    }
}

/// The inline children of the first `inline` token.
fn inline(tokens: &[Token]) -> Vec<Token> {
    tokens
        .iter()
        .find(|t| t.kind == TokenKind::Inline)
        .map(|t| t.children.clone())
        .unwrap_or_default()
}

fn math_inline(tokens: &[Token]) -> Vec<Token> {
    inline(tokens)
        .into_iter()
        .filter(|t| t.kind == TokenKind::MathInline)
        .collect()
}

#[test]
fn test_normalize_content() {
    let normalizer = MathNormalizer::new(&MathOptions::default()).unwrap();

    let cases = vec![
        ("braced command", "frac{1}{2}", "\\frac{1}{2}"),
        ("whole word", "alpha + beta", "\\alpha + \\beta"),
        ("already escaped", "\\alpha", "\\alpha"),
        ("short word", "x in y", "x in y"),
        ("short braced", "sin{x}", "\\sin{x}"),
        ("inside a word", "alphabet", "alphabet"),
        ("longest first", "rightarrow", "\\rightarrow"),
        ("tab byte", "\times y", "\\times y"),
        ("carriage return", "\rightarrow", "\\rightarrow"),
        ("trailing backslash", "a \\", "a \\\\"),
        ("backslash before newline", "a \\\nb", "a \\\\\nb"),
        ("line break command", "a \\\\", "a \\\\"),
        ("exclamation kept", "n!", "n!"),
    ];

    for (name, input, expected) in cases {
        assert_eq!(normalizer.normalize(input), expected, "failed case: {name}");
    }
}

#[test]
fn test_normalize_options() {
    let normalizer = MathNormalizer::new(&MathOptions {
        commands: vec![],
        escape_exclamation: true,
        ..MathOptions::default()
    })
    .unwrap();

    assert_eq!(normalizer.normalize("frac{n!}{2}"), "frac{n\\!}{2}");
    assert_eq!(normalizer.normalize("\\!"), "\\!");
}

#[test]
fn test_escape_control_chars() {
    assert_eq!(
        escape_control_chars("\u{8}\u{c}\u{b}"),
        "\\b\\f\\v".to_owned()
    );
}

#[test]
fn test_find_closing() {
    let cases = vec![
        ("simple", "$x$", 1, "$", Some(2)),
        ("escaped dollar", "$a\\$b$", 1, "$", Some(5)),
        ("inside braces", "$\\text{$}x$", 1, "$", Some(10)),
        ("before digit", "$5 and $10", 1, "$", None),
        ("paren", "\\(a\\)", 2, "\\)", Some(3)),
        ("unclosed", "$x", 1, "$", None),
    ];

    for (name, line, from, close, expected) in cases {
        assert_eq!(find_closing(line, from, close), expected, "failed case: {name}");
    }
}

#[test]
fn test_inline_math() {
    let tokens = tokenizer(&MathOptions::default())
        .tokenize("Euler $e^{i\\pi}$ *done*", &env(false));

    let children = inline(&tokens);
    assert_eq!(
        children.iter().map(Token::type_name).collect::<Vec<_>>(),
        vec!["text", "math_inline", "text", "em_open", "text", "em_close"]
    );
    assert_eq!(children[1].content, "e^{i\\pi}");
    assert_eq!(children[1].markup, "$");
    assert_eq!(children[1].raw.as_deref(), Some("$e^{i\\pi}$"));
    assert!(!children[1].loading);
}

#[test]
fn test_inline_delimiters() {
    let cases = vec![
        ("paren", "a \\(x^2\\) b", "\\(", "x^2"),
        ("bracket", "a \\[x\\] b", "\\[", "x"),
        ("double dollar", "a $$x+1$$ b", "$$", "x+1"),
    ];

    let tokenizer = tokenizer(&MathOptions::default());
    for (name, source, markup, content) in cases {
        let math = math_inline(&tokenizer.tokenize(source, &env(false)));

        assert_eq!(math.len(), 1, "failed case: {name}");
        assert_eq!(math[0].markup, markup, "failed case: {name}");
        assert_eq!(math[0].content, content, "failed case: {name}");
    }
}

#[test]
fn test_not_math() {
    let cases = vec![
        ("currency", "it costs $5 and $10"),
        ("currency unclosed", "it costs $5 = a lot"),
        ("comparison", "(0 <= t < S-1)"),
        ("escaped dollar", "\\$x$ y"),
        ("code span", "`$x$`"),
        ("backtick in content", "$a `b` c$"),
        ("unclosed words", "send $ to bob"),
        ("unclosed prose", "a $word here"),
    ];

    let tokenizer = tokenizer(&MathOptions::default());
    for (name, source) in cases {
        let tokens = tokenizer.tokenize(source, &env(false));
        assert_eq!(math_inline(&tokens), vec![], "failed case: {name}");
    }
}

#[test]
fn test_inline_unclosed() {
    struct TestCase {
        options: MathOptions,
        final_: bool,
        loading: Option<bool>,
    }

    let cases = vec![
        ("streaming", TestCase {
            options: MathOptions::default(),
            final_: false,
            loading: Some(true),
        }),
        ("final", TestCase {
            options: MathOptions::default(),
            final_: true,
            loading: Some(false),
        }),
        ("final strict", TestCase {
            options: strict(),
            final_: true,
            loading: None,
        }),
        ("streaming strict", TestCase {
            options: strict(),
            final_: false,
            loading: Some(true),
        }),
    ];

    for (name, case) in cases {
        let tokens = tokenizer(&case.options).tokenize("sum $x^2 + ", &env(case.final_));
        let math = math_inline(&tokens);

        assert_eq!(
            math.first().map(|t| t.loading),
            case.loading,
            "failed case: {name}"
        );
        if let Some(token) = math.first() {
            assert_eq!(token.content, "x^2 +", "failed case: {name}");
        }
    }
}

#[test]
fn test_inline_unclosed_only_at_end() {
    let tokens = tokenizer(&MathOptions::default()).tokenize("a $x^2\n\nb", &env(false));
    assert_eq!(math_inline(&tokens), vec![]);

    let tokens = tokenizer(&MathOptions::default()).tokenize("a $x^2\nb", &env(false));
    let math = math_inline(&tokens);
    assert_eq!(math.len(), 1);
    assert_eq!(math[0].content, "x^2\nb");
    assert!(math[0].loading);
}

#[test]
fn test_inline_across_soft_break() {
    let tokens = tokenizer(&MathOptions::default()).tokenize("Let $a +\nb$ be", &env(true));
    let math = math_inline(&tokens);

    assert_eq!(math.len(), 1);
    assert_eq!(math[0].content, "a +\nb");
    assert!(!math[0].loading);

    let tokens = tokenizer(&MathOptions::default()).tokenize("Let $a +\n\nb$ be", &env(true));
    assert_eq!(math_inline(&tokens), vec![]);
}

#[test]
fn test_inline_unclosed_before_trailing_newline() {
    let tokens = tokenizer(&MathOptions::default()).tokenize("$x^2\n", &env(false));
    let math = math_inline(&tokens);

    assert_eq!(math.len(), 1);
    assert_eq!(math[0].content, "x^2");
    assert!(math[0].loading);
}

#[test]
fn test_inline_inside_strong() {
    let tokens = tokenizer(&MathOptions::default()).tokenize("**E = $mc^2**", &env(false));
    let children = inline(&tokens);

    assert_eq!(
        children.iter().map(Token::type_name).collect::<Vec<_>>(),
        vec!["strong_open", "text", "math_inline", "strong_close"]
    );
    assert_eq!(children[2].content, "mc^2");
    assert!(children[2].loading);
}

#[test]
fn test_block_math() {
    let tokens = tokenizer(&MathOptions::default())
        .tokenize("intro\n$$\nx^2 + y^2\n$$\noutro", &env(false));

    assert_eq!(
        tokens.iter().map(Token::type_name).collect::<Vec<_>>(),
        vec![
            "paragraph_open",
            "inline",
            "paragraph_close",
            "math_block",
            "paragraph_open",
            "inline",
            "paragraph_close",
        ]
    );

    let math = &tokens[3];
    assert_eq!(math.content, "x^2 + y^2");
    assert_eq!(math.markup, "$$");
    assert_eq!(math.map, Some([1, 4]));
    assert_eq!(math.raw.as_deref(), Some("$$\nx^2 + y^2\n$$"));
    assert!(!math.loading);
}

#[test]
fn test_block_math_variants() {
    struct TestCase {
        source: &'static str,
        options: MathOptions,
        final_: bool,
        expected: Option<(&'static str, &'static str, bool)>,
    }

    let cases = vec![
        ("single line", TestCase {
            source: "$$x^2$$",
            options: MathOptions::default(),
            final_: false,
            expected: Some(("$$", "x^2", false)),
        }),
        ("brackets", TestCase {
            source: "\\[\na = b\n\\]",
            options: MathOptions::default(),
            final_: false,
            expected: Some(("\\[", "a = b", false)),
        }),
        ("bare brackets", TestCase {
            source: "[\na = b\n]",
            options: MathOptions::default(),
            final_: false,
            expected: Some(("[", "a = b", false)),
        }),
        ("bare brackets strict", TestCase {
            source: "[\na = b\n]",
            options: strict(),
            final_: false,
            expected: None,
        }),
        ("bare brackets prose", TestCase {
            source: "[\nnot math\n]",
            options: MathOptions::default(),
            final_: false,
            expected: None,
        }),
        ("unclosed", TestCase {
            source: "$$\n\\frac{a}{b}\n",
            options: MathOptions::default(),
            final_: false,
            expected: Some(("$$", "\\frac{a}{b}", true)),
        }),
        ("unclosed final", TestCase {
            source: "$$\n\\frac{a}{b}",
            options: MathOptions::default(),
            final_: true,
            expected: Some(("$$", "\\frac{a}{b}", false)),
        }),
        ("unclosed final strict", TestCase {
            source: "$$\n\\frac{a}{b}",
            options: strict(),
            final_: true,
            expected: None,
        }),
        ("trailing text", TestCase {
            source: "$$a$$ and more",
            options: MathOptions::default(),
            final_: false,
            expected: None,
        }),
    ];

    for (name, case) in cases {
        let tokens = tokenizer(&case.options).tokenize(case.source, &env(case.final_));
        let math = tokens
            .iter()
            .find(|t| t.kind == TokenKind::MathBlock)
            .map(|t| (t.markup.as_str(), t.content.as_str(), t.loading));

        assert_eq!(math, case.expected, "failed case: {name}");
    }
}

#[test]
fn test_block_math_in_blockquote() {
    let tokens = tokenizer(&MathOptions::default())
        .tokenize("> $$\n> a + b\n> $$", &env(false));

    assert_eq!(
        tokens.iter().map(Token::type_name).collect::<Vec<_>>(),
        vec!["blockquote_open", "math_block", "blockquote_close"]
    );
    assert_eq!(tokens[1].content, "a + b");
}

#[test]
fn test_commands_pattern() {
    assert_eq!(commands_pattern(&[]), None);
    assert_eq!(
        commands_pattern(&["in".to_owned(), "to".to_owned()]).as_deref(),
        Some(r"(?<![\\A-Za-z])(?:in|to)(?=\{)")
    );
}
