use chrono::{Datelike, Days, Month, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

static MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)([a-z]{3,9})[-\s'](\d{2})([af])?$").expect("valid month-year regex")
});

static PRIOR_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})-(?i)([a-z]{3,9})$").expect("valid prior-year regex"));

static YOY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)([a-z]{3,9})\s+yoy$").expect("valid yoy regex"));

static KOREAN_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})월$").expect("valid korean month regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodBasis {
    /// Closed month, e.g. `Jan-25A`.
    Actual,
    /// Forecast month, e.g. `Dec-25F`.
    Forecast,
    /// Same month one year earlier, e.g. `24-Dec`.
    PriorYear,
    /// Year-over-year ratio for a month, e.g. `Dec YoY`.
    YearOverYear,
    /// Bare month or date without a basis marker.
    Unspecified,
}

/// A column header recognised as a monthly period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLabel {
    pub month: u32,
    pub year: Option<i32>,
    pub basis: PeriodBasis,
}

impl PeriodLabel {
    pub fn month_end(&self) -> Option<NaiveDate> {
        self.year.and_then(|year| last_day_of_month(year, self.month))
    }

    pub fn is_actual(&self) -> bool {
        self.basis == PeriodBasis::Actual
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

fn month_number(name: &str) -> Option<u32> {
    Month::from_str(name).ok().map(|m| m.number_from_month())
}

fn two_digit_year(yy: &str) -> Option<i32> {
    yy.parse::<i32>().ok().map(|y| 2000 + y)
}

/// Recognises the period headers used by the monthly exports:
/// `Jan-25A`, `Nov-25F`, `Jan-25`, `24-Nov`, `Nov YoY`, `Jan`, `1월`, `2025-01`.
pub fn parse_period_label(name: &str) -> Option<PeriodLabel> {
    let name = name.trim();

    if let Some(caps) = MONTH_YEAR_RE.captures(name) {
        let month = month_number(&caps[1])?;
        let basis = match caps.get(3).map(|m| m.as_str().to_ascii_uppercase()) {
            Some(ref s) if s == "A" => PeriodBasis::Actual,
            Some(_) => PeriodBasis::Forecast,
            None => PeriodBasis::Unspecified,
        };
        return Some(PeriodLabel {
            month,
            year: two_digit_year(&caps[2]),
            basis,
        });
    }

    if let Some(caps) = PRIOR_YEAR_RE.captures(name) {
        return Some(PeriodLabel {
            month: month_number(&caps[2])?,
            year: two_digit_year(&caps[1]),
            basis: PeriodBasis::PriorYear,
        });
    }

    if let Some(caps) = YOY_RE.captures(name) {
        return Some(PeriodLabel {
            month: month_number(&caps[1])?,
            year: None,
            basis: PeriodBasis::YearOverYear,
        });
    }

    if let Some(caps) = KOREAN_MONTH_RE.captures(name) {
        let month = caps[1].parse::<u32>().ok().filter(|m| (1..=12).contains(m))?;
        return Some(PeriodLabel {
            month,
            year: None,
            basis: PeriodBasis::Unspecified,
        });
    }

    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", name), "%Y-%m-%d") {
        return Some(PeriodLabel {
            month: date.month(),
            year: Some(date.year()),
            basis: PeriodBasis::Unspecified,
        });
    }

    month_number(name).map(|month| PeriodLabel {
        month,
        year: None,
        basis: PeriodBasis::Unspecified,
    })
}

/// `Dec-25F` -> `Dec-25`. Returns `None` for anything that is not a
/// forecast-suffixed month column.
pub fn shorten_forecast_label(name: &str) -> Option<String> {
    let trimmed = name.trim();
    let label = parse_period_label(trimmed)?;
    if label.basis != PeriodBasis::Forecast {
        return None;
    }
    Some(trimmed[..trimmed.len() - 1].to_string())
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// `(2025, 12)` -> `Dec-25F`
pub fn forecast_label(year: i32, month: u32) -> Option<String> {
    first_of_month(year, month).map(|d| format!("{}F", d.format("%b-%y")))
}

/// `(2025, 12)` -> `24-Dec`, the same month of the previous year.
pub fn prior_year_label(year: i32, month: u32) -> Option<String> {
    first_of_month(year - 1, month).map(|d| d.format("%y-%b").to_string())
}

/// `12` -> `Dec YoY`
pub fn yoy_label(month: u32) -> Option<String> {
    first_of_month(2000, month).map(|d| format!("{} YoY", d.format("%b")))
}
