//! Line-level scanning helpers shared by the normalizer and the block rules.
//!
//! These do not parse Markdown. They answer the few structural questions the
//! pre-tokenizer stages need: where lines start, and whether a line sits inside
//! a fenced code block.

/// Represents the type of fence character used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceType {
    /// \`
    Backtick,

    /// ~
    Tilde,
}

impl FenceType {
    /// Returns the character corresponding to this fence type.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Backtick => '`',
            Self::Tilde => '~',
        }
    }
}

/// An opening code fence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence {
    /// The type of fence character used.
    pub fence_type: FenceType,

    /// The length of the fence marker.
    pub length: usize,

    /// The info string after the marker.
    pub info: String,
}

impl Fence {
    /// Returns `true` if `line` closes this fence.
    ///
    /// A closing fence has less than 4 spaces of indent, uses the same fence
    /// character, is at least as long as the opening fence, and has nothing
    /// but whitespace after it.
    #[must_use]
    pub fn is_closed_by(&self, line: &str) -> bool {
        let (indent, content) = get_indent(strip_quote_prefix(line));
        if indent >= 4 {
            return false;
        }

        let expected = self.fence_type.as_char();
        let len = content.chars().take_while(|&c| c == expected).count();
        len >= self.length && content[len..].trim().is_empty()
    }
}

/// Calculate the indentation of a line, and return the line content without the
/// indentation.
///
/// Tabs advance to the next column that is a multiple of 4.
///
/// Returns (`effective_indent_in_spaces`, `content_after_indentation`)
#[must_use]
pub fn get_indent(line: &str) -> (usize, &str) {
    let mut column = 0;
    let mut bytes_consumed = 0;

    for ch in line.chars() {
        match ch {
            ' ' => {
                column += 1;
                bytes_consumed += 1;
            }
            '\t' => {
                column = (column + 4) / 4 * 4;
                bytes_consumed += 1;
            }
            _ => break,
        }
    }

    (column, &line[bytes_consumed..])
}

/// Strip any blockquote markers (`>`, optionally followed by a space) from the
/// start of a line.
#[must_use]
pub fn strip_quote_prefix(line: &str) -> &str {
    let mut rest = line;
    loop {
        let (indent, content) = get_indent(rest);
        if indent > 3 {
            return rest;
        }
        let Some(after) = content.strip_prefix('>') else {
            return rest;
        };
        rest = after.strip_prefix(' ').unwrap_or(after);
    }
}

/// Split a line into its container prefix (indentation and blockquote markers)
/// and the content after it.
#[must_use]
pub fn split_prefix(line: &str) -> (&str, &str) {
    let content = strip_quote_prefix(line).trim_start_matches([' ', '\t']);
    line.split_at(line.len() - content.len())
}

/// Strip the container prefix of a continuation line, given the prefix of the
/// line that opened the block.
///
/// Blockquote markers are always stripped when the opening line had them.
/// Indentation is stripped up to the opening line's indentation.
#[must_use]
pub fn strip_prefix_like<'a>(line: &'a str, prefix: &str) -> &'a str {
    let quoted = prefix.contains('>');
    let line = if quoted {
        strip_quote_prefix(line)
    } else {
        line
    };

    let (width, _) = get_indent(if quoted {
        strip_quote_prefix(prefix)
    } else {
        prefix
    });

    let (indent, content) = get_indent(line);
    if indent <= width {
        return content;
    }

    let mut rest = line;
    let mut removed = 0;
    while removed < width {
        let Some(after) = rest.strip_prefix(' ') else {
            break;
        };
        rest = after;
        removed += 1;
    }

    rest
}

/// Checks if a line opens a fenced code block, returning the fence.
#[must_use]
pub fn fence_start(line: &str) -> Option<Fence> {
    let (indent, content) = get_indent(strip_quote_prefix(line));
    if indent >= 4 {
        return None;
    }

    let s = content.trim_end();
    let fence_char = s.chars().next()?;
    let fence_type = match fence_char {
        '`' => FenceType::Backtick,
        '~' => FenceType::Tilde,
        _ => return None,
    };

    let length = s.chars().take_while(|&c| c == fence_char).count();
    if length < 3 {
        return None;
    }

    let info = s[length..].trim();

    // Info string for backticks cannot contain backticks
    if fence_type == FenceType::Backtick && info.contains('`') {
        return None;
    }

    Some(Fence {
        fence_type,
        length,
        info: info.to_owned(),
    })
}

/// Checks if a line (without indent) is a thematic break.
#[must_use]
pub fn is_thematic_break(line: &str) -> bool {
    let s = line.trim();
    let Some(first) = s.chars().next() else {
        return false;
    };

    if !(first == '*' || first == '-' || first == '_') {
        return false;
    }
    let mut count = 0;
    for c in s.chars() {
        if c == first {
            count += 1;
        } else if !c.is_whitespace() {
            return false;
        }
    }
    count >= 3
}

/// How a line relates to fenced code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Regular Markdown.
    Text,

    /// The opening line of a fence.
    FenceOpen,

    /// A line inside a fence.
    FenceBody,

    /// The closing line of a fence.
    FenceClose,
}

impl LineKind {
    /// Returns `true` if the line belongs to a fenced code block.
    #[must_use]
    pub const fn in_code(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Tracks fenced code blocks while feeding lines in order.
#[derive(Debug, Default)]
pub struct FenceTracker {
    open: Option<Fence>,
}

impl FenceTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self { open: None }
    }

    /// Classify the next line and update the tracked state.
    pub fn push_line(&mut self, line: &str) -> LineKind {
        if let Some(fence) = &self.open {
            if fence.is_closed_by(line) {
                self.open = None;
                return LineKind::FenceClose;
            }
            return LineKind::FenceBody;
        }

        if let Some(fence) = fence_start(line) {
            self.open = Some(fence);
            return LineKind::FenceOpen;
        }

        LineKind::Text
    }

    /// Returns `true` if a fence is open after the last pushed line.
    #[must_use]
    pub const fn in_fence(&self) -> bool {
        self.open.is_some()
    }
}

/// Byte offsets of line starts, for converting between line numbers and
/// offsets.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            starts,
            len: text.len(),
        }
    }

    /// Number of lines, counting a trailing empty line after a final `\n`.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Byte offset of the start of `line`, clamped to the end of the text.
    #[must_use]
    pub fn offset(&self, line: usize) -> usize {
        self.starts.get(line).copied().unwrap_or(self.len)
    }

    /// The 0-based line containing byte `offset`.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        }
    }

    /// The source text of lines `[start, end)`, without the trailing newline.
    #[must_use]
    pub fn slice<'a>(&self, text: &'a str, [start, end]: [usize; 2]) -> &'a str {
        let from = self.offset(start).min(text.len());
        let to = self.offset(end).min(text.len()).max(from);
        text[from..to].strip_suffix('\n').unwrap_or(&text[from..to])
    }
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
