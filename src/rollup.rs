//! Column-wise sums of existing rows, for statements that need a parent
//! figure the export does not carry (e.g. fixed deposits = 유형자산 + 보증금).

use crate::format::{format_amount, parse_amount};
use crate::schema::ColumnKind;
use crate::FinancialStatement;
use log::debug;

/// Sums the rows whose label is in `labels`, per column. Only numeric
/// columns are summed; the rest are `None`. Returns `None` when no row
/// matched.
pub fn sum_row_amounts(statement: &FinancialStatement, labels: &[&str]) -> Option<Vec<Option<f64>>> {
    let matched: Vec<_> = statement
        .rows
        .iter()
        .filter(|row| labels.contains(&row.label.as_str()))
        .collect();

    if matched.is_empty() {
        debug!("No rows matched {:?} in '{}'", labels, statement.table_id);
        return None;
    }

    let totals = statement
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            (column.kind == ColumnKind::Numeric).then(|| {
                matched
                    .iter()
                    .filter_map(|row| parse_amount(row.value(i)))
                    .sum::<f64>()
            })
        })
        .collect();

    Some(totals)
}

/// Like [`sum_row_amounts`] but rendered as raw cell strings: `1,234` or
/// `(1,234)`, empty for zero totals and non-numeric columns.
pub fn sum_rows(statement: &FinancialStatement, labels: &[&str]) -> Option<Vec<String>> {
    let totals = sum_row_amounts(statement, labels)?;
    Some(
        totals
            .into_iter()
            .map(|total| match total {
                Some(value) if value != 0.0 => format_amount(value),
                _ => String::new(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_statement, StatementConfig};

    fn balance_sheet() -> FinancialStatement {
        parse_statement(
            "BS,,,,\n\
             구분,Jan-25A,Feb-25A,Total,Jan 비중\n\
             1. 비유동자산,,,,\n\
             유형자산,\"1,200\",\"1,300\",,10%\n\
             보증금,300,(100),,5%\n\
             유동리스부채,(40),-,,\n",
            &StatementConfig::balance_sheet(),
        )
        .unwrap()
    }

    #[test]
    fn test_sum_rows() {
        let statement = balance_sheet();
        let sums = sum_rows(&statement, &["유형자산", "보증금"]).unwrap();
        // Jan-25A, Feb-25A, Total, Jan 비중
        assert_eq!(sums, vec!["1,500", "1,200", "", ""]);
    }

    #[test]
    fn test_negative_sum_in_parentheses() {
        let statement = balance_sheet();
        let sums = sum_rows(&statement, &["유동리스부채"]).unwrap();
        assert_eq!(sums[0], "(40)");
        assert_eq!(sums[1], "");
    }

    #[test]
    fn test_no_match_is_none() {
        assert!(sum_rows(&balance_sheet(), &["없는계정"]).is_none());
    }

    #[test]
    fn test_sum_row_amounts_skips_percentage_columns() {
        let amounts = sum_row_amounts(&balance_sheet(), &["유형자산", "보증금"]).unwrap();
        assert_eq!(amounts[0], Some(1500.0));
        assert_eq!(amounts[2], Some(0.0));
        assert_eq!(amounts[3], None);
    }
}
