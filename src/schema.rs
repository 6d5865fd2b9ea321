use crate::error::Result;
use crate::utils::{forecast_label, prior_year_label, yoy_label};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum RowKind {
    #[schemars(description = "Top-level grouping row, e.g. '1. 매출액'. Always visible; its children show when expanded.")]
    MainCategory,

    #[schemars(description = "Second-level grouping row nested under a main category, e.g. '(1) 인건비'.")]
    SubCategory,

    #[schemars(description = "Ordinary line item belonging to the nearest enclosing category.")]
    LeafItem,

    #[schemars(description = "Computed summary row such as gross or operating profit. Never collapsible, always visible.")]
    Aggregate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ColumnKind {
    #[schemars(description = "Amounts rendered with thousands separators and parenthesized negatives.")]
    Numeric,

    #[schemars(description = "Percentages rendered as whole numbers or with one decimal place.")]
    Percentage,

    #[schemars(description = "Free text or footnotes, passed through verbatim.")]
    Text,

    #[schemars(description = "Year-over-year ratio. Rendered like a percentage and additionally toned favorable/unfavorable.")]
    YoyRatio,
}

/// Direction used when toning year-over-year ratios.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema, Default)]
#[serde(rename_all = "PascalCase")]
pub enum RowPolarity {
    /// Revenue and profit rows: growth is good.
    #[default]
    Revenue,
    /// Expense rows: growth is bad.
    Expense,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct RowRule {
    #[schemars(description = "Regular expression tested against the trimmed row label. The matched text is stripped from the display label.")]
    pub pattern: String,

    #[schemars(description = "Row kind assigned when the pattern matches. Rules are checked in order; first match wins.")]
    pub kind: RowKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ColumnKindRule {
    #[schemars(description = "Case-insensitive substring of the canonical column name.")]
    pub contains: String,

    pub kind: ColumnKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ComparisonRule {
    #[schemars(description = "Canonical name of the comparison column, e.g. the prior-year same month '24-Dec'.")]
    pub column: String,

    #[schemars(description = "Canonical name of the column the comparison must sit immediately before, e.g. 'Dec-25F'.")]
    pub before: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ColumnSetDef {
    #[schemars(description = "Identifier of the visually grouped set.")]
    pub id: String,

    #[schemars(description = "Canonical names of the member columns. A column may belong to at most one set.")]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct StatementConfig {
    #[schemars(description = "Identifier of the table; becomes part of every category key.")]
    pub table_id: String,

    #[schemars(description = "Whether the first non-blank line is a banner/title line preceding the header.")]
    pub has_banner: bool,

    #[schemars(description = "Remove commas inside [...] spans before tokenizing.")]
    pub repair_bracketed_commas: bool,

    #[schemars(description = "Columns dropped by exact name, e.g. forecast placeholders past the data horizon.")]
    pub obsolete_columns: Vec<String>,

    #[schemars(description = "Canonical label of the total column.")]
    pub total_label: String,

    #[schemars(description = "Accepted source spellings of the total column.")]
    pub total_synonyms: Vec<String>,

    #[schemars(description = "Canonical label of the total delta-percent column, inserted after the total when absent.")]
    pub total_delta_label: Option<String>,

    pub comparison_rules: Vec<ComparisonRule>,

    pub column_sets: Vec<ColumnSetDef>,

    #[schemars(description = "Canonical name to display name substitutions.")]
    pub display_names: BTreeMap<String, String>,

    #[schemars(description = "Display forecast-suffixed period columns without the suffix ('Dec-25F' -> 'Dec-25').")]
    pub shorten_forecast_suffix: bool,

    #[schemars(description = "Columns holding free text or footnotes.")]
    pub text_columns: Vec<String>,

    pub column_kind_rules: Vec<ColumnKindRule>,

    pub row_rules: Vec<RowRule>,

    #[schemars(description = "Labels of computed summary rows, matched exactly.")]
    pub aggregate_labels: Vec<String>,

    #[schemars(description = "Labels of rows dropped from the statement, matched exactly.")]
    pub excluded_labels: Vec<String>,

    #[schemars(description = "Label prefixes of rows dropped from the statement.")]
    pub excluded_prefixes: Vec<String>,

    #[schemars(description = "Main category labels whose rows are expense-like when toning year-over-year ratios.")]
    pub expense_categories: Vec<String>,

    #[schemars(description = "Main category labels expanded in a freshly seeded expansion state.")]
    pub initially_expanded: Vec<String>,

    #[schemars(description = "Canonical column that starts the recent-period window. Defaults to the last actual period.")]
    pub window_start: Option<String>,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            table_id: "statement".to_string(),
            has_banner: true,
            repair_bracketed_commas: false,
            obsolete_columns: Vec::new(),
            total_label: "Total".to_string(),
            total_synonyms: strings(&["Total", "합계", "총계", "연간합계", "FY Total"]),
            total_delta_label: Some("Total YoY".to_string()),
            comparison_rules: Vec::new(),
            column_sets: Vec::new(),
            display_names: BTreeMap::new(),
            shorten_forecast_suffix: false,
            text_columns: strings(&["비고", "Note", "Notes", "Remarks"]),
            column_kind_rules: vec![
                ColumnKindRule {
                    contains: "YoY".to_string(),
                    kind: ColumnKind::YoyRatio,
                },
                ColumnKindRule {
                    contains: "%".to_string(),
                    kind: ColumnKind::Percentage,
                },
                ColumnKindRule {
                    contains: "비중".to_string(),
                    kind: ColumnKind::Percentage,
                },
                ColumnKindRule {
                    contains: "달성률".to_string(),
                    kind: ColumnKind::Percentage,
                },
            ],
            row_rules: default_row_rules(),
            aggregate_labels: strings(&[
                "매출총이익",
                "직접이익",
                "영업이익",
                "공헌이익",
                "Gross Profit",
                "Direct Profit",
                "Operating Profit",
            ]),
            excluded_labels: Vec::new(),
            excluded_prefixes: Vec::new(),
            expense_categories: Vec::new(),
            initially_expanded: Vec::new(),
            window_start: None,
        }
    }
}

impl StatementConfig {
    pub fn income_statement() -> Self {
        Self {
            table_id: "income-statement".to_string(),
            shorten_forecast_suffix: true,
            excluded_labels: strings(&[
                "영업외수익",
                "영업외비용",
                "법인세비용차감전순이익",
                "법인세비용",
                "당기순이익",
                "Non-operating Income",
                "Non-operating Expenses",
                "Income Tax",
                "Net Income",
            ]),
            expense_categories: strings(&[
                "매출원가",
                "판매관리비",
                "판매비와관리비",
                "직접비",
                "영업비용",
                "Cost of Sales",
                "Operating Expenses",
            ]),
            ..Self::default()
        }
    }

    pub fn balance_sheet() -> Self {
        Self {
            table_id: "balance-sheet".to_string(),
            // Balance sheets carry point-in-time balances; a summed total is meaningless.
            total_delta_label: None,
            shorten_forecast_suffix: true,
            aggregate_labels: strings(&["자산총계", "부채총계", "자본총계", "Total Assets", "Total Liabilities"]),
            initially_expanded: strings(&["운전자본"]),
            ..Self::default()
        }
    }

    pub fn cash_flow() -> Self {
        Self {
            table_id: "cash-flow".to_string(),
            shorten_forecast_suffix: true,
            aggregate_labels: strings(&[
                "영업활동현금흐름",
                "투자활동현금흐름",
                "재무활동현금흐름",
                "기말현금",
                "Net Cash Flow",
                "Ending Cash",
            ]),
            ..Self::default()
        }
    }

    pub fn operating_expense() -> Self {
        Self {
            table_id: "operating-expense".to_string(),
            shorten_forecast_suffix: true,
            aggregate_labels: strings(&["판매관리비 합계", "Total Operating Expenses"]),
            excluded_prefixes: strings(&["팝업_SEM광고비_"]),
            ..Self::default()
        }
        .all_expense()
    }

    /// Marks every main category of this table as expense-like.
    pub fn all_expense(mut self) -> Self {
        self.expense_categories = vec!["*".to_string()];
        self
    }

    pub fn with_table_id(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = table_id.into();
        self
    }

    pub fn with_obsolete_columns(mut self, columns: &[&str]) -> Self {
        self.obsolete_columns.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Adds the prior-year comparison layout for each month of `fiscal_year`:
    /// `24-Nov` is moved in front of `Nov-25F`, and `{24-Nov, Nov-25F, Nov YoY}`
    /// becomes one column set.
    pub fn with_period_comparisons(mut self, fiscal_year: i32, months: &[u32]) -> Self {
        for &month in months {
            let (Some(current), Some(prior), Some(yoy)) = (
                forecast_label(fiscal_year, month),
                prior_year_label(fiscal_year, month),
                yoy_label(month),
            ) else {
                continue;
            };

            self.comparison_rules.push(ComparisonRule {
                column: prior.clone(),
                before: current.clone(),
            });
            self.column_sets.push(ColumnSetDef {
                id: format!("{}-{:02}", fiscal_year, month),
                columns: vec![prior, current, yoy],
            });
        }
        self
    }

    pub fn is_expense_category(&self, main_label: &str) -> bool {
        self.expense_categories
            .iter()
            .any(|c| c == "*" || c == main_label)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(StatementConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

pub fn default_row_rules() -> Vec<RowRule> {
    vec![
        RowRule {
            pattern: r"^\s*\d+\.\s*".to_string(),
            kind: RowKind::MainCategory,
        },
        RowRule {
            pattern: r"^\s*\(\d+\)\s*".to_string(),
            kind: RowKind::SubCategory,
        },
    ]
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
