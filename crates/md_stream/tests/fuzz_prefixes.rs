use std::sync::LazyLock;

use md_stream::{MarkdownParser, ParseOptions, ParsedNode, ParserConfig, find_nodes};
use proptest::prelude::*;

static PARSER: LazyLock<MarkdownParser> = LazyLock::new(|| {
    MarkdownParser::new(ParserConfig::default().with_custom_html_tags(["thinking"])).unwrap()
});

const FIXTURES: &[&str] = &[
    "# Title\n\nSome **bold** and *soft* text with `code` and $x^2$.\n",
    "- [x] done\n- [ ] todo\n  - nested **item\n",
    "| a | b |\n|:--|--:|\n| 1 | $\\alpha$ |\n| 2 | [x](https://e.com) |\n",
    "<thinking>\nLet me think about $E=mc^2$.\n\n- step 1\n</thinking>\n\nAnswer.\n",
    "::: warning Careful\n```rust\nfn main() {}\n```\n:::\n",
    "$$\n\\frac{a}{b}\n$$\n\nand \\(x\\) then \\[y\\]\n",
    "Term\n\n: Definition [^1]\n\n[^1]: Note.\n",
    "> quote with <span>html</span> and :rocket:\n",
];

fn parse(markdown: &str, final_: bool) -> Vec<ParsedNode> {
    PARSER.parse(markdown, &ParseOptions::default().with_final(final_))
}

fn prefixes(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .map(|(idx, _)| &text[..idx])
        .chain(std::iter::once(text))
}

/// The `loading` flag of the first node of one of `kinds`, if any.
fn first_loading(nodes: &[ParsedNode], kinds: &[&str]) -> Option<bool> {
    kinds
        .iter()
        .flat_map(|kind| find_nodes(nodes, kind))
        .next()
        .map(ParsedNode::loading)
}

fn has_loading(node: &ParsedNode) -> bool {
    node.loading() || node.child_nodes().into_iter().any(has_loading)
}

#[test]
fn test_loading_converges_once_closed() {
    // Each case is closed once the last occurrence of its closing text is in.
    let cases: &[(&str, &str, &[&str], &str)] = &[
        ("fence", "```rust\nfn main() {}\n```", &["code_block"], "```"),
        ("strong", "a **bold** b", &["strong"], "**"),
        ("custom tag", "<thinking>\nhi\n</thinking>\nafter", &["thinking"], "</thinking>"),
        ("math block", "$$\nx^2\n$$\n\nnext", &["math_block"], "$$"),
        ("container", "::: note\nbody\n:::\n\nnext", &["admonition", "vmr_container"], ":::"),
        ("html block", "<div>\n\ntext\n\n</div>\n\nafter", &["html_block"], "</div>"),
        ("table", "| a | b |\n|---|---|\n| 1 | 2 |\n\nafter", &["table"], "\n\na"),
        ("link", "see [x](https://e.com) now", &["link"], ")"),
        ("image", "an ![alt](pic.png) here", &["image"], ")"),
        ("math inline", "so $x^2$ ok", &["math_inline"], "$"),
    ];

    for (name, source, kinds, close) in cases {
        let closed_at = source.rfind(close).map(|idx| idx + close.len()).unwrap();

        for prefix in prefixes(source) {
            let loading = first_loading(&parse(prefix, false), kinds);
            if prefix.len() >= closed_at {
                assert_eq!(loading, Some(false), "{name}: {prefix:?}");
            } else if let Some(loading) = loading {
                assert!(loading, "{name}: not loading before close: {prefix:?}");
            }
        }
    }
}

#[test]
#[ntest::timeout(5000)]
fn test_long_marker_runs_terminate() {
    for unit in ["*a ", "**a ", "a** ", "_a *b "] {
        let source = unit.repeat(10_000);
        let nodes = parse(&source, false);
        assert!(!nodes.is_empty(), "{unit:?}");
        let nodes = parse(&source, true);
        assert!(!nodes.iter().any(has_loading), "{unit:?}");
    }
}

#[test]
#[ntest::timeout(500)]
fn test_unterminated_strong_with_math_terminates() {
    let source = format!("**{} $a$ $b", "word ".repeat(10));
    for prefix in prefixes(&source) {
        let _nodes = parse(prefix, false);
    }
}

fn markdown_strategy() -> impl Strategy<Value = String> {
    let fixture = proptest::sample::select(FIXTURES).prop_map(str::to_owned);
    let noise = proptest::string::string_regex(r"[-*_`$\\\[\]()<>/:!=+~|# \na-z0-9]{0,80}")
        .expect("valid regex");

    prop_oneof![
        2 => fixture,
        3 => noise,
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn fuzz_prefixes_do_not_panic(markdown in markdown_strategy()) {
        for prefix in prefixes(&markdown) {
            let _nodes = parse(prefix, false);
        }
    }

    #[test]
    fn fuzz_final_is_idempotent_and_settled(markdown in markdown_strategy()) {
        let first = parse(&markdown, true);
        let second = parse(&markdown, true);

        prop_assert_eq!(&first, &second);
        prop_assert!(!first.iter().any(has_loading), "loading node in final parse: {first:#?}");
    }

    #[test]
    fn fuzz_trees_serialize(markdown in markdown_strategy()) {
        let nodes = parse(&markdown, false);
        let json = serde_json::to_string(&nodes).unwrap();
        let back: Vec<ParsedNode> = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, nodes);
    }
}
