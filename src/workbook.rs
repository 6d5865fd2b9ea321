//! Blobs holding several tables, and parsing independent tables in parallel.

use crate::error::Result;
use crate::schema::StatementConfig;
use crate::sections::{locate_sections, SectionSpan};
use crate::tokenizer::strip_bom;
use crate::{FinancialStatement, StatementParser};
use log::{info, warn};
use rayon::prelude::*;

/// A marker line opening one table in a multi-table blob, and the config
/// that table is parsed with.
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub marker: String,
    pub config: StatementConfig,
}

impl SectionSpec {
    pub fn new(marker: impl Into<String>, config: StatementConfig) -> Self {
        Self {
            marker: marker.into(),
            config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSection {
    pub marker: String,
    pub span: SectionSpan,
    pub statement: FinancialStatement,
}

/// The cash-flow export: the statement itself, followed by the loan
/// schedule and the factors table.
pub fn cash_flow_sections() -> Vec<SectionSpec> {
    let loan_status = StatementConfig {
        total_delta_label: None,
        ..StatementConfig::default().with_table_id("loan-status")
    };
    let factors = StatementConfig {
        total_delta_label: None,
        ..StatementConfig::default().with_table_id("factors")
    };

    vec![
        SectionSpec::new("3. CASH FLOW", StatementConfig::cash_flow()),
        SectionSpec::new("3-2. LOAN STATUS", loan_status),
        SectionSpec::new("3-3. FACTORS", factors),
    ]
}

/// Locates every section marker in `text` and parses each found section with
/// its own config. Missing sections are left out of the result. Fails only
/// when a config is invalid.
pub fn parse_sections(text: &str, specs: &[SectionSpec]) -> Result<Vec<ParsedSection>> {
    let parsers = specs
        .iter()
        .map(|spec| StatementParser::new(spec.config.clone()))
        .collect::<Result<Vec<_>>>()?;

    let markers: Vec<&str> = specs.iter().map(|s| s.marker.as_str()).collect();
    let lines: Vec<&str> = strip_bom(text).lines().collect();

    let found: Vec<(usize, SectionSpan)> = locate_sections(text, &markers)
        .into_iter()
        .enumerate()
        .filter_map(|(i, span)| span.map(|span| (i, span)))
        .collect();

    if found.len() < specs.len() {
        warn!("Found {} of {} sections", found.len(), specs.len());
    }

    let sections = found
        .into_par_iter()
        .map(|(i, span)| {
            let section_text = lines[span.start..span.end].join("\n");
            ParsedSection {
                marker: specs[i].marker.clone(),
                span,
                statement: parsers[i].parse(&section_text),
            }
        })
        .collect();

    Ok(sections)
}

/// One independent table: its text and the config to parse it with.
#[derive(Debug, Clone)]
pub struct TableJob<'a> {
    pub config: StatementConfig,
    pub text: &'a str,
}

/// Parses independent tables concurrently. Results come back in the order
/// of `jobs`.
pub fn parse_tables(jobs: &[TableJob<'_>]) -> Result<Vec<FinancialStatement>> {
    let statements = jobs
        .par_iter()
        .map(|job| StatementParser::new(job.config.clone()).map(|parser| parser.parse(job.text)))
        .collect::<Result<Vec<_>>>()?;

    info!("Parsed {} tables", statements.len());
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RowKind;
    use crate::StatementError;

    const CASH_FLOW: &str = "\u{feff}3. CASH FLOW,,,
구분,Jan-25A,Feb-25F,Total
1. 기초현금,100,120,100
영업활동현금흐름,20,30,50
,,,
3-2. LOAN STATUS,,,
구분,차입처,잔액,금리
본사 차입금,KB,500,4.5%
3-3. FACTORS,,,
구분,Jan-25A,Feb-25F
환율,1350,1360
";

    #[test]
    fn test_parse_cash_flow_sections() {
        let sections = parse_sections(CASH_FLOW, &cash_flow_sections()).unwrap();
        assert_eq!(sections.len(), 3);

        let cash = &sections[0].statement;
        assert_eq!(cash.table_id, "cash-flow");
        assert_eq!(cash.banner.as_deref(), Some("3. CASH FLOW"));
        assert_eq!(cash.rows.len(), 2);
        assert_eq!(cash.rows[1].kind, RowKind::Aggregate);

        let loan = &sections[1].statement;
        assert_eq!(loan.table_id, "loan-status");
        let names: Vec<&str> = loan.columns.iter().map(|c| c.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["차입처", "잔액", "금리", "Total"]);
        assert_eq!(loan.rows[0].raw_values, vec!["KB", "500", "4.5%", ""]);

        assert_eq!(sections[2].span, SectionSpan { start: 8, end: 11 });
        assert_eq!(sections[2].statement.rows[0].label, "환율");
    }

    #[test]
    fn test_missing_section_left_out() {
        let text = "3. CASH FLOW,,\n구분,Jan-25A,Total\n1. 기초현금,100,100";
        let sections = parse_sections(text, &cash_flow_sections()).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].marker, "3. CASH FLOW");
    }

    #[test]
    fn test_invalid_section_config_is_error() {
        let mut specs = cash_flow_sections();
        specs[1].config.total_label = String::new();
        assert!(matches!(
            parse_sections(CASH_FLOW, &specs),
            Err(StatementError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_parse_tables_keeps_input_order() {
        let income = "PL\n구분,Jan-25A,Total\n1. 매출액,100,100";
        let balance = "BS\n구분,Jan-25A\n1. 자산,500";
        let jobs = vec![
            TableJob {
                config: StatementConfig::income_statement(),
                text: income,
            },
            TableJob {
                config: StatementConfig::balance_sheet(),
                text: balance,
            },
            TableJob {
                config: StatementConfig::operating_expense(),
                text: "",
            },
        ];

        let statements = parse_tables(&jobs).unwrap();
        let ids: Vec<&str> = statements.iter().map(|s| s.table_id.as_str()).collect();
        assert_eq!(ids, vec!["income-statement", "balance-sheet", "operating-expense"]);
        assert!(statements[2].is_empty());
        assert_eq!(statements[1].rows[0].label, "자산");
    }
}
