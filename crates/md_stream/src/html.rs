//! HTML tag scanning and custom tag extraction.
//!
//! Tags are scanned character by character. Streaming buffers routinely end in
//! the middle of a tag, so the scanner distinguishes a complete tag from a
//! plausible prefix of one, and from text that is not a tag at all (`x < y`).

/// Elements that never have content or a closing tag.
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Returns `true` if `name` is a void element.
#[must_use]
pub fn is_void(name: &str) -> bool {
    VOID_TAGS.contains(&name)
}

/// A complete HTML tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased tag name.
    pub name: String,

    /// Attributes in source order. Valueless attributes have an empty value.
    pub attrs: Vec<(String, String)>,

    /// `</name>`
    pub closing: bool,

    /// `<name />`
    pub self_closing: bool,

    /// Byte length of the tag, including the final `>`.
    pub len: usize,
}

impl Tag {
    /// Look up an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if the tag has no matching close tag to look for.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.self_closing || is_void(&self.name)
    }
}

/// The result of scanning text that starts with `<`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagScan {
    /// A complete tag.
    Complete(Tag),

    /// The text ends before the tag does, but everything so far follows tag
    /// grammar.
    Partial,

    /// Not a tag.
    Invalid,
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            return true;
        }

        false
    }

    fn eat_while(&mut self, f: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !f(c) {
                break;
            }
            self.pos += c.len_utf8();
        }

        &self.src[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.eat_while(char::is_whitespace);
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn is_attr_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '>' | '/' | '=' | '"' | '\'' | '<')
}

/// Scan the tag at the start of `src`.
#[must_use]
pub fn scan_tag(src: &str) -> TagScan {
    let mut cur = Cursor { src, pos: 0 };
    if !cur.eat('<') {
        return TagScan::Invalid;
    }

    let closing = cur.eat('/');
    match cur.peek() {
        None => return TagScan::Partial,
        Some(c) if c.is_ascii_alphabetic() => {}
        Some(_) => return TagScan::Invalid,
    }

    let name = cur.eat_while(is_name_char).to_ascii_lowercase();
    let mut tag = Tag {
        name,
        attrs: vec![],
        closing,
        self_closing: false,
        len: 0,
    };

    if closing {
        cur.skip_whitespace();
        return match cur.bump() {
            None => TagScan::Partial,
            Some('>') => {
                tag.len = cur.pos;
                TagScan::Complete(tag)
            }
            Some(_) => TagScan::Invalid,
        };
    }

    loop {
        let before_ws = cur.pos;
        cur.skip_whitespace();
        let had_ws = cur.pos > before_ws;

        match cur.peek() {
            None => return TagScan::Partial,
            Some('>') => {
                cur.bump();
                tag.len = cur.pos;
                return TagScan::Complete(tag);
            }
            Some('/') => {
                cur.bump();
                match cur.peek() {
                    None => return TagScan::Partial,
                    Some('>') => {
                        cur.bump();
                        tag.self_closing = true;
                        tag.len = cur.pos;
                        return TagScan::Complete(tag);
                    }
                    Some(_) => return TagScan::Invalid,
                }
            }
            Some(c) if is_attr_name_char(c) && had_ws => {
                let name = cur.eat_while(is_attr_name_char).to_owned();
                let value = match scan_attr_value(&mut cur) {
                    Ok(value) => value,
                    Err(scan) => return scan,
                };
                tag.attrs.push((name, value));
            }
            Some(_) => return TagScan::Invalid,
        }
    }
}

/// Scan an optional `= value` after an attribute name.
fn scan_attr_value(cur: &mut Cursor<'_>) -> Result<String, TagScan> {
    let before = cur.pos;
    cur.skip_whitespace();
    if !cur.eat('=') {
        cur.pos = before;
        return Ok(String::new());
    }

    cur.skip_whitespace();
    match cur.peek() {
        None => Err(TagScan::Partial),
        Some(quote @ ('"' | '\'')) => {
            cur.bump();
            let value = cur.eat_while(|c| c != quote).to_owned();
            if cur.at_end() {
                return Err(TagScan::Partial);
            }
            cur.bump();
            Ok(value)
        }
        Some(_) => {
            let value = cur.eat_while(|c| !c.is_whitespace() && !matches!(c, '>' | '"' | '\''));
            if value.is_empty() {
                return Err(TagScan::Invalid);
            }
            Ok(value.to_owned())
        }
    }
}

/// Parse the complete tag at the start of `src`.
#[must_use]
pub fn parse_tag(src: &str) -> Option<Tag> {
    match scan_tag(src) {
        TagScan::Complete(tag) => Some(tag),
        TagScan::Partial | TagScan::Invalid => None,
    }
}

/// The lowercased name of the opening tag `src` starts with, if any.
#[must_use]
pub fn opening_tag_name(src: &str) -> Option<String> {
    match scan_tag(src.trim_start()) {
        TagScan::Complete(tag) if !tag.closing => Some(tag.name),
        _ => None,
    }
}

/// Returns `true` if `src` at `pos` starts `<tag` (or `</tag` when `closing`)
/// followed by a tag-name boundary.
fn tag_at(src: &str, pos: usize, tag: &str, closing: bool) -> bool {
    let prefix_len = if closing { 2 } else { 1 };
    let rest = &src[pos..];
    if !rest.starts_with(if closing { "</" } else { "<" }) {
        return false;
    }

    let rest = &rest[prefix_len..];
    rest.get(..tag.len())
        .is_some_and(|name| name.eq_ignore_ascii_case(tag))
        && rest[tag.len()..]
            .chars()
            .next()
            .is_none_or(|c| c == '>' || c == '/' || c.is_whitespace())
}

/// A custom tag block located in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Offset of the opening `<`.
    pub start: usize,

    /// Offset just past the opening tag's `>`.
    pub open_end: usize,

    /// Offset of the closing tag's `<`, or the end of the source.
    pub content_end: usize,

    /// Offset just past the closing tag, or the end of the source.
    pub end: usize,

    /// The closing tag was found.
    pub closed: bool,

    /// Attributes of the opening tag.
    pub attrs: Vec<(String, String)>,
}

impl Extracted {
    /// The block including its opening and closing tags.
    #[must_use]
    pub fn raw<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    /// The block without its opening and closing tags.
    #[must_use]
    pub fn content<'a>(&self, src: &'a str) -> &'a str {
        &src[self.open_end..self.content_end]
    }
}

/// Locate the next `<tag ...>...</tag>` block at or after `from`.
///
/// Nested blocks of the same tag are balanced. A block that is still open at
/// the end of the source is returned with `closed: false`, spanning to the
/// end of the source.
#[must_use]
pub fn extract_block(src: &str, tag: &str, from: usize) -> Option<Extracted> {
    let from = from.min(src.len());

    for (start, _) in src[from..].match_indices('<').map(|(i, m)| (i + from, m)) {
        if !tag_at(src, start, tag, false) {
            continue;
        }

        let open = match scan_tag(&src[start..]) {
            TagScan::Complete(open) => open,
            TagScan::Partial => {
                return Some(Extracted {
                    start,
                    open_end: src.len(),
                    content_end: src.len(),
                    end: src.len(),
                    closed: false,
                    attrs: vec![],
                });
            }
            TagScan::Invalid => continue,
        };

        let open_end = start + open.len;
        if open.self_closing {
            return Some(Extracted {
                start,
                open_end,
                content_end: open_end,
                end: open_end,
                closed: true,
                attrs: open.attrs,
            });
        }

        let (content_end, end, closed) = find_close(src, tag, open_end);
        return Some(Extracted {
            start,
            open_end,
            content_end,
            end,
            closed,
            attrs: open.attrs,
        });
    }

    None
}

/// Find the close tag balancing an open tag that ended at `from`.
///
/// Returns `(content_end, end, closed)`.
fn find_close(src: &str, tag: &str, from: usize) -> (usize, usize, bool) {
    let mut depth = 1usize;

    for (pos, _) in src[from..].match_indices('<').map(|(i, m)| (i + from, m)) {
        if tag_at(src, pos, tag, true) {
            depth -= 1;
            if depth > 0 {
                continue;
            }

            return match scan_tag(&src[pos..]) {
                TagScan::Complete(close) => (pos, pos + close.len, true),
                TagScan::Partial | TagScan::Invalid => (pos, src.len(), false),
            };
        }

        if tag_at(src, pos, tag, false)
            && let TagScan::Complete(nested) = scan_tag(&src[pos..])
            && !nested.self_closing
        {
            depth += 1;
        }
    }

    // A close tag still being typed is not content.
    let close = format!("</{tag}>");
    let content_end = src[from..]
        .rfind('<')
        .map(|i| i + from)
        .filter(|&pos| {
            let tail = &src[pos..];
            tail.len() < close.len()
                && close
                    .get(..tail.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(tail))
        })
        .unwrap_or(src.len());

    (content_end, src.len(), false)
}

/// Returns `true` if `src` (which starts at a `<`) is the unfinished prefix of
/// an HTML tag.
#[must_use]
pub fn is_partial_tag(src: &str) -> bool {
    matches!(scan_tag(src), TagScan::Partial)
}

#[cfg(test)]
#[path = "html_tests.rs"]
mod tests;
