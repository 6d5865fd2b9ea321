//! Cell formatting following accounting display conventions.
//!
//! Negative amounts render in parentheses with thousands separators and in
//! whole units. Percentages drop a zero fraction and otherwise keep one
//! decimal place. Anything that cannot be read or rendered is shown as-is.

use crate::schema::{ColumnKind, RowPolarity};
use serde::{Deserialize, Serialize};

const NEGATIVE_GLYPHS: [char; 4] = ['△', '▲', '▽', '▼'];
const CURRENCY_SYMBOLS: [char; 6] = ['$', '₩', '€', '£', '¥', '원'];
const EMPTY_DISPLAY: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Sign {
    pub fn trend(self) -> Trend {
        match self {
            Sign::Positive => Trend::Up,
            Sign::Negative => Trend::Down,
            Sign::Neutral => Trend::Flat,
        }
    }
}

/// Good/bad coloring of a year-over-year ratio, which depends on whether the
/// row is revenue-like or expense-like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tone {
    Favorable,
    Unfavorable,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedCell {
    pub display: String,
    pub sign: Sign,
    /// Only set for year-over-year ratio columns.
    pub tone: Option<Tone>,
}

impl FormattedCell {
    fn new(display: impl Into<String>, sign: Sign) -> Self {
        Self {
            display: display.into(),
            sign,
            tone: None,
        }
    }

    fn passthrough(raw: &str) -> Self {
        Self::new(raw, Sign::Neutral)
    }
}

fn is_blank(value: &str) -> bool {
    value.chars().all(|c| c == '-' || c.is_whitespace())
}

fn strip_quotes(value: &str) -> &str {
    value.trim().trim_matches('"').trim()
}

fn is_parenthesized(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('(') && value.ends_with(')')
}

/// Removes currency symbols, thousands separators, spaces and percent signs,
/// then parses what is left. Only digits, sign characters and the decimal
/// point may remain.
fn parse_plain_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && !matches!(c, ',' | '%') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-')) {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reads a raw cell as a signed amount. Parenthesized values and values
/// carrying a negative glyph are negative.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let value = strip_quotes(raw);
    if is_blank(value) {
        return None;
    }

    if let Some(rest) = value.strip_prefix(&NEGATIVE_GLYPHS[..]) {
        return parse_plain_number(rest).map(|v| -v.abs());
    }
    if is_parenthesized(value) {
        return parse_plain_number(&value[1..value.len() - 1]).map(|v| -v.abs());
    }
    parse_plain_number(value)
}

/// Groups an integer with thousands separators: `1234567` -> `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Magnitude with thousands separators and `decimals` fraction digits.
/// `None` when the whole part does not fit a `u64`.
fn render_magnitude(value: f64, decimals: usize) -> Option<String> {
    let magnitude = if decimals == 0 {
        value.abs().round()
    } else {
        value.abs()
    };
    let fixed = format!("{:.*}", decimals, magnitude);
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (fixed.as_str(), None),
    };
    let grouped = group_thousands(whole.parse::<u64>().ok()?);
    Some(match fraction {
        Some(fraction) => format!("{}.{}", grouped, fraction),
        None => grouped,
    })
}

/// Amounts print in whole units.
fn rounds_to_zero(value: f64) -> bool {
    value.abs().round() == 0.0
}

/// Percentages keep one decimal place unless the fraction is exactly zero.
fn percent_decimals(value: f64) -> usize {
    if value.fract() == 0.0 {
        0
    } else {
        1
    }
}

fn render_amount(value: f64) -> Option<String> {
    if rounds_to_zero(value) {
        return Some("0".to_string());
    }
    let magnitude = render_magnitude(value, 0)?;
    Some(if value < 0.0 {
        format!("({})", magnitude)
    } else {
        magnitude
    })
}

/// Renders an amount the way statements print it: `1,234` or `(1,234)`.
/// Amounts too large to group fall back to their plain float rendering.
pub fn format_amount(value: f64) -> String {
    render_amount(value).unwrap_or_else(|| value.to_string())
}

fn format_percentage(value: &str) -> Option<FormattedCell> {
    let parsed = parse_plain_number(value)?;
    if parsed == 0.0 {
        return Some(FormattedCell::new("0%", Sign::Neutral));
    }
    let magnitude = render_magnitude(parsed, percent_decimals(parsed))?;
    let (prefix, sign) = if parsed < 0.0 {
        ("-", Sign::Negative)
    } else {
        ("", Sign::Positive)
    };
    Some(FormattedCell::new(format!("{}{}%", prefix, magnitude), sign))
}

fn format_number(value: &str) -> Option<FormattedCell> {
    let parsed = parse_plain_number(value)?;
    let sign = if rounds_to_zero(parsed) {
        Sign::Neutral
    } else if parsed < 0.0 {
        Sign::Negative
    } else {
        Sign::Positive
    };
    Some(FormattedCell::new(render_amount(parsed)?, sign))
}

fn format_parenthesized(inner: &str, percent: bool) -> Option<FormattedCell> {
    let magnitude = parse_plain_number(inner)?.abs();
    let (zero, decimals, suffix) = if percent {
        (magnitude == 0.0, percent_decimals(magnitude), "%")
    } else {
        (rounds_to_zero(magnitude), 0, "")
    };
    if zero {
        return Some(FormattedCell::new(format!("0{}", suffix), Sign::Neutral));
    }
    Some(FormattedCell::new(
        format!("({}{})", render_magnitude(magnitude, decimals)?, suffix),
        Sign::Negative,
    ))
}

/// Formats one raw cell for a column of the given kind. Never fails; values
/// that cannot be interpreted come back trimmed and unchanged.
pub fn format_value(raw: &str, kind: ColumnKind) -> FormattedCell {
    let value = raw.trim();

    if is_blank(value) {
        return FormattedCell::new(EMPTY_DISPLAY, Sign::Neutral);
    }

    if kind == ColumnKind::Text {
        return FormattedCell::passthrough(strip_quotes(value));
    }

    if value.contains(&NEGATIVE_GLYPHS[..]) {
        return FormattedCell::new(value, Sign::Negative);
    }
    if value.starts_with('+') {
        return FormattedCell::new(value, Sign::Positive);
    }

    let percent = value.contains('%') || matches!(kind, ColumnKind::Percentage | ColumnKind::YoyRatio);

    if is_parenthesized(value) {
        return format_parenthesized(&value[1..value.len() - 1], percent)
            .unwrap_or_else(|| FormattedCell::passthrough(value));
    }

    let formatted = if percent {
        format_percentage(value)
    } else {
        format_number(value)
    };
    formatted.unwrap_or_else(|| FormattedCell::passthrough(value))
}

/// Tone of a year-over-year ratio, where 100 means flat. Revenue-like rows
/// are favorable at or above 100, expense-like rows below it.
pub fn yoy_tone(raw: &str, polarity: RowPolarity) -> Tone {
    let Some(ratio) = parse_amount(raw) else {
        return Tone::Neutral;
    };
    let grew = ratio >= 100.0;
    match (polarity, grew) {
        (RowPolarity::Revenue, true) | (RowPolarity::Expense, false) => Tone::Favorable,
        (RowPolarity::Revenue, false) | (RowPolarity::Expense, true) => Tone::Unfavorable,
    }
}

/// [`format_value`] plus the year-over-year tone for ratio columns.
pub fn format_cell(raw: &str, kind: ColumnKind, polarity: RowPolarity) -> FormattedCell {
    let mut cell = format_value(raw, kind);
    if kind == ColumnKind::YoyRatio {
        cell.tone = Some(yoy_tone(raw, polarity));
    }
    cell
}
