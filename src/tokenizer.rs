//! Line-level tokenizing of the comma separated exports.

use std::borrow::Cow;

pub const FIELD_SEPARATOR: char = ',';
pub const QUOTE: char = '"';
const BOM: char = '\u{feff}';

/// Splits one line into trimmed fields.
///
/// A separator inside a quoted span does not split. A doubled quote inside a
/// quoted span is a literal quote. An unterminated quote is tolerated: the
/// remainder of the line becomes the last field.
pub fn split_line(line: &str) -> Vec<String> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            QUOTE if in_quotes && chars.peek() == Some(&QUOTE) => {
                current.push(QUOTE);
                chars.next();
            }
            QUOTE => in_quotes = !in_quotes,
            FIELD_SEPARATOR if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());

    fields
}

/// Blank lines and lines made only of separators (`,,,,`) carry no data.
pub fn is_filler_line(line: &str) -> bool {
    line.chars()
        .all(|c| c == FIELD_SEPARATOR || c == BOM || c.is_whitespace())
}

pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}

/// Drops separators inside closed `[...]` spans so bracketed annotations
/// such as `[A, B]` stay in one field. A `[` with no `]` later on its line is
/// left alone.
pub fn repair_bracketed_commas(text: &str) -> Cow<'_, str> {
    if !text.contains('[') {
        return Cow::Borrowed(text);
    }

    let mut repaired = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let mut rest = line;
        while let Some(open) = rest.find('[') {
            let Some(close) = rest[open..].find(']').map(|offset| open + offset) else {
                break;
            };
            repaired.push_str(&rest[..open]);
            repaired.extend(rest[open..=close].chars().filter(|&c| c != FIELD_SEPARATOR));
            rest = &rest[close + 1..];
        }
        repaired.push_str(rest);
    }

    if repaired == text {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(repaired)
    }
}
