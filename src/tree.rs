use crate::schema::{RowKind, RowPolarity, StatementConfig};
use crate::Row;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a collapsible grouping row: the table it lives in plus the
/// label path from its main category down.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct CategoryKey {
    pub table: String,
    pub path: Vec<String>,
}

impl CategoryKey {
    pub fn main(table: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            path: vec![label.into()],
        }
    }

    pub fn child(&self, label: impl Into<String>) -> Self {
        let mut path = self.path.clone();
        path.push(label.into());
        Self {
            table: self.table.clone(),
            path,
        }
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn label(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    pub fn is_main(&self) -> bool {
        self.path.len() == 1
    }

    pub fn is_ancestor_of(&self, other: &CategoryKey) -> bool {
        self.table == other.table
            && self.path.len() < other.path.len()
            && other.path.starts_with(&self.path)
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.path.join("/"))
    }
}

/// Classifier output for one data line, values already in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRow {
    pub label: String,
    pub kind: RowKind,
    pub values: Vec<String>,
}

/// Tracks the open main/sub category while folding rows front to back.
/// The stored indices point at the grouping rows in `rows` so their
/// `has_children` flag can be set once a child shows up.
pub struct TreeAccumulator<'a> {
    config: &'a StatementConfig,
    current_main: Option<(CategoryKey, usize, RowPolarity)>,
    current_sub: Option<(CategoryKey, usize)>,
    rows: Vec<Row>,
}

impl<'a> TreeAccumulator<'a> {
    pub fn new(config: &'a StatementConfig) -> Self {
        Self {
            config,
            current_main: None,
            current_sub: None,
            rows: Vec::new(),
        }
    }

    /// Aggregates are looked up by their own label, so a `"*"` table totals
    /// as expense too.
    fn polarity_of(&self, label: &str) -> RowPolarity {
        if self.config.is_expense_category(label) {
            RowPolarity::Expense
        } else {
            RowPolarity::Revenue
        }
    }

    pub fn push(mut self, row: ClassifiedRow) -> Self {
        let kind = match row.kind {
            RowKind::SubCategory | RowKind::LeafItem if self.current_main.is_none() => {
                debug!(
                    "Promoting '{}' to a main category: no enclosing category precedes it",
                    row.label
                );
                RowKind::MainCategory
            }
            kind => kind,
        };

        let index = self.rows.len();
        let built = match kind {
            RowKind::MainCategory => {
                let key = CategoryKey::main(&self.config.table_id, &row.label);
                let polarity = self.polarity_of(&row.label);
                self.current_main = Some((key.clone(), index, polarity));
                self.current_sub = None;
                Row {
                    label: row.label,
                    raw_values: row.values,
                    kind,
                    category_key: Some(key),
                    parent_key: None,
                    indent_level: 0,
                    polarity,
                    has_children: false,
                }
            }
            RowKind::SubCategory => {
                let Some((main_key, main_index, polarity)) = self.current_main.clone() else {
                    return self;
                };
                let key = main_key.child(&row.label);
                self.rows[main_index].has_children = true;
                self.current_sub = Some((key.clone(), index));
                Row {
                    label: row.label,
                    raw_values: row.values,
                    kind,
                    category_key: Some(key),
                    parent_key: Some(main_key),
                    indent_level: 1,
                    polarity,
                    has_children: false,
                }
            }
            RowKind::LeafItem => {
                let Some((main_key, main_index, polarity)) = self.current_main.clone() else {
                    return self;
                };
                let (parent_key, parent_index, indent_level) = match &self.current_sub {
                    Some((sub_key, sub_index)) => (sub_key.clone(), *sub_index, 2),
                    None => (main_key, main_index, 1),
                };
                self.rows[parent_index].has_children = true;
                Row {
                    label: row.label,
                    raw_values: row.values,
                    kind,
                    category_key: None,
                    parent_key: Some(parent_key),
                    indent_level,
                    polarity,
                    has_children: false,
                }
            }
            RowKind::Aggregate => Row {
                polarity: self.polarity_of(&row.label),
                label: row.label,
                raw_values: row.values,
                kind,
                category_key: None,
                // Alignment only; aggregates never collapse.
                parent_key: self.current_main.as_ref().map(|(key, _, _)| key.clone()),
                indent_level: 0,
                has_children: false,
            },
        };

        self.rows.push(built);
        self
    }

    pub fn finish(self) -> Vec<Row> {
        self.rows
    }
}

/// Threads classified rows into the category tree in one forward pass.
pub fn assemble_tree(
    config: &StatementConfig,
    rows: impl IntoIterator<Item = ClassifiedRow>,
) -> Vec<Row> {
    rows.into_iter()
        .fold(TreeAccumulator::new(config), TreeAccumulator::push)
        .finish()
}

/// Index of the first sub-category or leaf row whose `parent_key` does not
/// name a category key assigned to an earlier row.
pub fn find_dangling_parent(rows: &[Row]) -> Option<usize> {
    let mut seen: Vec<&CategoryKey> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if matches!(row.kind, RowKind::SubCategory | RowKind::LeafItem) {
            match &row.parent_key {
                Some(parent) if seen.contains(&parent) => {}
                _ => return Some(i),
            }
        }
        if let Some(key) = &row.category_key {
            seen.push(key);
        }
    }
    None
}
