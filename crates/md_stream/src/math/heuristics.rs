//! Named heuristics for math delimiter detection.
//!
//! These encode empirically discovered cases (currency amounts, comparison
//! operators, math wrapped in strong emphasis) rather than general Markdown
//! semantics. Each one is tested on its own in `heuristics_tests.rs`.

/// A `$` at `pos` can open inline math: it is followed by a non-whitespace
/// character.
#[must_use]
pub fn dollar_opens(line: &str, pos: usize) -> bool {
    line[pos + 1..]
        .chars()
        .next()
        .is_some_and(|c| !c.is_whitespace())
}

/// A `$` at `pos` can close inline math: it is not preceded by whitespace, and
/// not followed by a digit (`$5 and $10` is two amounts, not math).
#[must_use]
pub fn dollar_closes(line: &str, pos: usize) -> bool {
    let after_ok = !line[pos + 1..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit());
    let before_ok = line[..pos]
        .chars()
        .next_back()
        .is_some_and(|c| !c.is_whitespace());

    before_ok && after_ok
}

/// The content after an unclosed `$` starts like an amount of money, e.g.
/// `$5 = a coffee`.
#[must_use]
pub fn currency_like(content: &str) -> bool {
    content.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Whether the content after an unclosed math opener looks like math.
///
/// Matches TeX commands, sub/superscripts, braces, `=`, and a digit followed by
/// an arithmetic operator and another digit. Plain words and comparisons such
/// as `x < y` do not match.
#[must_use]
pub fn looks_like_math(content: &str) -> bool {
    let chars: Vec<char> = content.chars().collect();

    for (idx, &c) in chars.iter().enumerate() {
        match c {
            '\\' if chars.get(idx + 1).is_some_and(char::is_ascii_alphabetic) => return true,
            '^' | '_' | '{' | '}' | '=' => return true,
            c if c.is_ascii_digit() && digit_operator_digit(&chars[idx + 1..]) => return true,
            _ => {}
        }
    }

    false
}

fn digit_operator_digit(rest: &[char]) -> bool {
    let mut iter = rest.iter().skip_while(|c| c.is_ascii_digit() || **c == '.');
    let mut next = iter.next();
    while next.is_some_and(|c| *c == ' ') {
        next = iter.next();
    }

    if !next.is_some_and(|c| matches!(c, '+' | '-' | '*' | '/')) {
        return false;
    }

    let mut next = iter.next();
    while next.is_some_and(|c| *c == ' ') {
        next = iter.next();
    }

    next.is_some_and(char::is_ascii_digit)
}

/// Count occurrences of `marker` in `text` that are not preceded by a
/// backslash.
#[must_use]
pub fn count_unescaped(text: &str, marker: &str) -> usize {
    let mut count = 0;
    let mut pos = 0;

    while let Some(idx) = text[pos..].find(marker) {
        let at = pos + idx;
        if !text[..at].ends_with('\\') {
            count += 1;
        }
        pos = at + marker.len();
    }

    count
}

/// Length of the part of `rest` that belongs to an unclosed math span.
///
/// When the text before the opener holds an odd number of `**` (or `__`)
/// markers, the math sits inside strong emphasis, and the first matching marker
/// in `rest` closes the emphasis rather than being part of the math.
#[must_use]
pub fn strong_wrapper_split(prefix: &str, rest: &str) -> usize {
    for marker in ["**", "__"] {
        if count_unescaped(prefix, marker) % 2 == 1
            && let Some(idx) = rest.find(marker)
        {
            return idx;
        }
    }

    rest.len()
}

#[cfg(test)]
#[path = "heuristics_tests.rs"]
mod tests;
