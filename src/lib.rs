//! # Financial Statement Tree
//!
//! A library for turning flat, section-delimited accounting exports (income
//! statement, balance sheet, cash flow, operating-expense ledgers) into a
//! navigable, hierarchical financial statement model.
//!
//! ## Core Concepts
//!
//! - **Canonical Columns**: Header rows are normalized into a unique, ordered column list
//!   with synthesized totals, relocated comparison periods and visual column sets
//! - **Row Kinds**: Each data row is a main category, sub-category, leaf item or aggregate,
//!   decided by an ordered `(pattern, kind)` rule table
//! - **Category Keys**: Grouping rows get a typed key (table id + label path) that leaf rows
//!   point back at, so the tree can be collapsed and expanded
//! - **Views**: An [`ExpansionState`] picks which categories are open; the view assembler
//!   returns the visible rows with every cell formatted for display
//!
//! Parsing is a pure function of the input text: it never fails on textual input and
//! re-parsing the same text yields an equal [`FinancialStatement`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_statement_tree::*;
//!
//! let text = "손익계산서,,\n구분,Jan-25A,Total\n1. 매출액,100,1200\n온라인,60,700";
//! let parser = StatementParser::new(StatementConfig::income_statement()).unwrap();
//! let statement = parser.parse(text);
//!
//! let state = ExpansionState::default().toggle(CategoryKey::main("income-statement", "매출액"));
//! let view = assemble_view(&statement, &state, ViewOptions { show_all_periods: true });
//! assert_eq!(view.rows.len(), 2);
//! ```

pub mod classifier;
pub mod error;
pub mod format;
pub mod header;
pub mod rollup;
pub mod schema;
pub mod sections;
pub mod tokenizer;
pub mod tree;
pub mod utils;
pub mod view;
pub mod workbook;

pub use classifier::{align_values, Classification, RowClassifier};
pub use error::{Result, StatementError};
pub use format::{
    format_amount, format_cell, format_value, parse_amount, yoy_tone, FormattedCell, Sign, Tone,
    Trend,
};
pub use header::{trailing_window_start, HeaderNormalizer};
pub use rollup::sum_rows;
pub use schema::*;
pub use sections::{extract_tables, locate_sections, RawTable, SectionSpan};
pub use tokenizer::split_line;
pub use tree::{assemble_tree, CategoryKey, ClassifiedRow};
pub use utils::*;
pub use view::{
    assemble_view, ColumnSetSpan, ExpansionState, StatementView, ViewColumn, ViewOptions, ViewRow,
};
pub use workbook::{parse_sections, parse_tables, ParsedSection, SectionSpec, TableJob};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// What a canonical column stands for, as far as the view is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    /// An ordinary period or value column
    Data,
    /// The canonical total column
    Total,
    /// The delta-percent column that follows the total
    TotalDelta,
    /// A comparison column placed in front of its anchor (e.g. prior-year same month)
    Comparison,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Header text as it appeared in the source, empty for synthesized columns
    pub source_name: String,
    /// Unique name within the table
    pub canonical_name: String,
    pub display_name: String,
    pub kind: ColumnKind,
    pub role: ColumnRole,
    /// Position of the backing field among the source values, `None` when synthesized
    pub source_index: Option<usize>,
    pub set_id: Option<String>,
    pub is_set_start: bool,
    pub is_set_end: bool,
}

impl ColumnSpec {
    pub fn is_synthesized(&self) -> bool {
        self.source_index.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Label with any category marker stripped
    pub label: String,
    /// One value per canonical column, empty string when missing
    pub raw_values: Vec<String>,
    pub kind: RowKind,
    /// Set for main and sub-categories only
    pub category_key: Option<CategoryKey>,
    pub parent_key: Option<CategoryKey>,
    pub indent_level: usize,
    pub polarity: RowPolarity,
    pub has_children: bool,
}

impl Row {
    pub fn is_grouping(&self) -> bool {
        matches!(self.kind, RowKind::MainCategory | RowKind::SubCategory)
    }

    pub fn value(&self, column: usize) -> &str {
        self.raw_values.get(column).map(String::as_str).unwrap_or_default()
    }
}

/// One parsed table. Immutable once parsed and cheap to re-derive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialStatement {
    pub table_id: String,
    pub banner: Option<String>,
    /// Header text of the row-label column (e.g. `구분`)
    pub label_header: String,
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Row>,
    /// First column of the recent-period window, `None` keeps every column
    pub window_start: Option<usize>,
}

impl FinancialStatement {
    pub fn empty(table_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            banner: None,
            label_header: String::new(),
            columns: Vec::new(),
            rows: Vec::new(),
            window_start: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    pub fn column_index(&self, canonical_name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.canonical_name == canonical_name)
    }

    pub fn find_row(&self, label: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn category_keys(&self) -> impl Iterator<Item = &CategoryKey> {
        self.rows.iter().filter_map(|r| r.category_key.as_ref())
    }
}

/// Checks the parts of a config that cannot be expressed in its types.
pub fn validate_config(config: &StatementConfig) -> Result<()> {
    if config.total_label.trim().is_empty() {
        return Err(StatementError::InvalidConfig {
            table: config.table_id.clone(),
            details: "total_label must not be empty".to_string(),
        });
    }

    let mut owner: HashMap<&str, &str> = HashMap::new();
    for set in &config.column_sets {
        if set.columns.is_empty() {
            return Err(StatementError::InvalidConfig {
                table: config.table_id.clone(),
                details: format!("column set '{}' has no columns", set.id),
            });
        }
        for column in &set.columns {
            if let Some(first) = owner.insert(column.as_str(), set.id.as_str()) {
                if first != set.id {
                    return Err(StatementError::OverlappingColumnSets {
                        column: column.clone(),
                        first: first.to_string(),
                        second: set.id.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Parses single tables with one validated config.
#[derive(Debug, Clone)]
pub struct StatementParser {
    config: StatementConfig,
    header: HeaderNormalizer,
    classifier: RowClassifier,
}

impl StatementParser {
    pub fn new(config: StatementConfig) -> Result<Self> {
        validate_config(&config)?;
        let classifier = RowClassifier::from_config(&config)?;
        let header = HeaderNormalizer::new(&config);
        debug!(
            "Built parser for table '{}' with {} row rules and {} column sets",
            config.table_id,
            config.row_rules.len(),
            config.column_sets.len()
        );
        Ok(Self {
            config,
            header,
            classifier,
        })
    }

    pub fn config(&self) -> &StatementConfig {
        &self.config
    }

    /// Parses one logical table: optional banner line, header line, data
    /// lines. Missing structure yields an empty statement.
    pub fn parse(&self, text: &str) -> FinancialStatement {
        let table_id = &self.config.table_id;
        let text = tokenizer::strip_bom(text);
        if text.trim().is_empty() {
            warn!("No input text for table '{}'", table_id);
            return FinancialStatement::empty(table_id.as_str());
        }

        let text = if self.config.repair_bracketed_commas {
            tokenizer::repair_bracketed_commas(text)
        } else {
            Cow::Borrowed(text)
        };

        let mut lines = text.lines().filter(|line| !tokenizer::is_filler_line(line));

        let banner = if self.config.has_banner {
            lines.next().map(|line| {
                split_line(line)
                    .into_iter()
                    .find(|field| !field.is_empty())
                    .unwrap_or_default()
            })
        } else {
            None
        };

        let Some(header_line) = lines.next() else {
            warn!("Table '{}' has no header line", table_id);
            return FinancialStatement::empty(table_id.as_str());
        };

        let header_fields = split_line(header_line);
        let (label_header, value_headers) = match header_fields.split_first() {
            Some((label, rest)) => (label.clone(), rest),
            None => (String::new(), &header_fields[..]),
        };
        let columns = self.header.normalize(value_headers);

        let classified = lines.filter_map(|line| {
            let fields = split_line(line);
            let (raw_label, values) = fields.split_first()?;
            let classification = self.classifier.classify(raw_label)?;
            Some(ClassifiedRow {
                label: classification.label,
                kind: classification.kind,
                values: align_values(values, &columns),
            })
        });
        let rows = assemble_tree(&self.config, classified);
        let window_start = trailing_window_start(&columns, &self.config);

        info!(
            "Parsed table '{}': {} columns, {} rows",
            table_id,
            columns.len(),
            rows.len()
        );

        FinancialStatement {
            table_id: table_id.clone(),
            banner,
            label_header,
            columns,
            rows,
            window_start,
        }
    }
}

/// Validates `config` and parses `text` with it.
pub fn parse_statement(text: &str, config: &StatementConfig) -> Result<FinancialStatement> {
    Ok(StatementParser::new(config.clone())?.parse(text))
}
