use pretty_assertions::assert_eq;
use test_log::test;

use super::*;

#[test]
fn test_scan_tag() {
    struct TestCase {
        input: &'static str,
        expected: TagScan,
    }

    let tag = |name: &str, attrs: &[(&str, &str)], len: usize| Tag {
        name: name.to_owned(),
        attrs: attrs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect(),
        closing: false,
        self_closing: false,
        len,
    };

    let cases = vec![
        ("simple", TestCase {
            input: "<div>",
            expected: TagScan::Complete(tag("div", &[], 5)),
        }),
        ("uppercase", TestCase {
            input: "<DIV>rest",
            expected: TagScan::Complete(tag("div", &[], 5)),
        }),
        ("attributes", TestCase {
            input: r#"<a href="x" data-id='1' hidden>"#,
            expected: TagScan::Complete(tag(
                "a",
                &[("href", "x"), ("data-id", "1"), ("hidden", "")],
                31,
            )),
        }),
        ("quoted gt", TestCase {
            input: r#"<a title="a > b">"#,
            expected: TagScan::Complete(tag("a", &[("title", "a > b")], 17)),
        }),
        ("unquoted value", TestCase {
            input: "<td colspan=2>",
            expected: TagScan::Complete(tag("td", &[("colspan", "2")], 14)),
        }),
        ("closing", TestCase {
            input: "</thinking >",
            expected: TagScan::Complete(Tag {
                closing: true,
                ..tag("thinking", &[], 12)
            }),
        }),
        ("self closing", TestCase {
            input: "<br/>",
            expected: TagScan::Complete(Tag {
                self_closing: true,
                ..tag("br", &[], 5)
            }),
        }),
        ("lone angle", TestCase {
            input: "<",
            expected: TagScan::Partial,
        }),
        ("partial name", TestCase {
            input: "<thin",
            expected: TagScan::Partial,
        }),
        ("partial closing", TestCase {
            input: "</",
            expected: TagScan::Partial,
        }),
        ("partial attribute", TestCase {
            input: "<a href=\"https://exa",
            expected: TagScan::Partial,
        }),
        ("comparison", TestCase {
            input: "< y",
            expected: TagScan::Invalid,
        }),
        ("less or equal", TestCase {
            input: "<= t",
            expected: TagScan::Invalid,
        }),
        ("digit", TestCase {
            input: "<3",
            expected: TagScan::Invalid,
        }),
        ("attribute without space", TestCase {
            input: "<a\"b\">",
            expected: TagScan::Invalid,
        }),
    ];

    for (name, case) in cases {
        assert_eq!(scan_tag(case.input), case.expected, "failed case: {name}");
    }
}

#[test]
fn test_extract_block() {
    struct TestCase {
        source: &'static str,
        tag: &'static str,
        from: usize,
        expected: Option<(&'static str, &'static str, bool)>,
    }

    let cases = vec![
        ("closed", TestCase {
            source: "<thinking>\nalpha\n</thinking>\n- item",
            tag: "thinking",
            from: 0,
            expected: Some(("<thinking>\nalpha\n</thinking>", "\nalpha\n", true)),
        }),
        ("streaming", TestCase {
            source: "<thinking>\nalpha\n- item",
            tag: "thinking",
            from: 0,
            expected: Some(("<thinking>\nalpha\n- item", "\nalpha\n- item", false)),
        }),
        ("partial close tag", TestCase {
            source: "<thinking>alpha</thin",
            tag: "thinking",
            from: 0,
            expected: Some(("<thinking>alpha</thin", "alpha", false)),
        }),
        ("partial open tag", TestCase {
            source: "text <thinking class=\"a",
            tag: "thinking",
            from: 0,
            expected: Some(("<thinking class=\"a", "", false)),
        }),
        ("nested", TestCase {
            source: "<note>a<note>b</note>c</note>d",
            tag: "note",
            from: 0,
            expected: Some(("<note>a<note>b</note>c</note>", "a<note>b</note>c", true)),
        }),
        ("cursor skips first", TestCase {
            source: "<x>1</x>\n<x>2</x>",
            tag: "x",
            from: 8,
            expected: Some(("<x>2</x>", "2", true)),
        }),
        ("prefix of other tag", TestCase {
            source: "<thinkingcap>a</thinkingcap>",
            tag: "thinking",
            from: 0,
            expected: None,
        }),
        ("case insensitive", TestCase {
            source: "<Thinking>a</THINKING>",
            tag: "thinking",
            from: 0,
            expected: Some(("<Thinking>a</THINKING>", "a", true)),
        }),
        ("missing", TestCase {
            source: "no tags here",
            tag: "thinking",
            from: 0,
            expected: None,
        }),
    ];

    for (name, case) in cases {
        let actual = extract_block(case.source, case.tag, case.from).map(|block| {
            (
                block.raw(case.source),
                block.content(case.source),
                block.closed,
            )
        });

        assert_eq!(actual, case.expected, "failed case: {name}");
    }
}

#[test]
fn test_extract_block_attrs() {
    let source = r#"<thinking mode="deep">x</thinking>"#;
    let block = extract_block(source, "thinking", 0).unwrap();

    assert_eq!(block.attrs, vec![("mode".to_owned(), "deep".to_owned())]);
    assert_eq!(block.end, source.len());
}

#[test]
fn test_opening_tag_name() {
    assert_eq!(opening_tag_name("<thinking>\nfoo"), Some("thinking".to_owned()));
    assert_eq!(opening_tag_name("  <div class=\"a\">"), Some("div".to_owned()));
    assert_eq!(opening_tag_name("</div>"), None);
    assert_eq!(opening_tag_name("<!-- comment -->"), None);
}
