use crate::format::{format_cell, FormattedCell};
use crate::schema::{ColumnKind, RowKind, StatementConfig};
use crate::tree::CategoryKey;
use crate::{ColumnRole, FinancialStatement, Row};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The set of category keys currently shown open. Owned by the caller and
/// never stored in the parsed statement; every operation returns a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionState {
    open: BTreeSet<CategoryKey>,
}

impl ExpansionState {
    pub fn toggle(mut self, key: CategoryKey) -> Self {
        if !self.open.remove(&key) {
            self.open.insert(key);
        }
        self
    }

    pub fn expand(mut self, key: CategoryKey) -> Self {
        self.open.insert(key);
        self
    }

    pub fn collapse(mut self, key: &CategoryKey) -> Self {
        self.open.remove(key);
        self
    }

    /// Opens every grouping row of `statement`.
    pub fn expand_all(mut self, statement: &FinancialStatement) -> Self {
        self.open.extend(statement.category_keys().cloned());
        self
    }

    pub fn collapse_all(self) -> Self {
        Self::default()
    }

    /// Initial state for a table type: the main categories the config lists
    /// as initially expanded, as far as they occur in `statement`.
    pub fn seeded(statement: &FinancialStatement, config: &StatementConfig) -> Self {
        let open = statement
            .rows
            .iter()
            .filter(|row| row.kind == RowKind::MainCategory)
            .filter(|row| config.initially_expanded.contains(&row.label))
            .filter_map(|row| row.category_key.clone())
            .collect();
        Self { open }
    }

    pub fn contains(&self, key: &CategoryKey) -> bool {
        self.open.contains(key)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CategoryKey> {
        self.open.iter()
    }

    /// A key's children are visible only when it and every ancestor are open.
    fn shows_children_of(&self, key: &CategoryKey) -> bool {
        (1..=key.path.len()).all(|depth| {
            self.open.contains(&CategoryKey {
                table: key.table.clone(),
                path: key.path[..depth].to_vec(),
            })
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOptions {
    /// Keep every period instead of only the recent window.
    pub show_all_periods: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewColumn {
    pub canonical_name: String,
    pub display_name: String,
    pub kind: ColumnKind,
    pub role: ColumnRole,
    pub set_id: Option<String>,
    pub is_set_start: bool,
    pub is_set_end: bool,
}

/// Inclusive range of visible column indices forming one visual set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSetSpan {
    pub id: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRow {
    pub label: String,
    pub kind: RowKind,
    pub category_key: Option<CategoryKey>,
    pub parent_key: Option<CategoryKey>,
    pub indent_level: usize,
    pub is_expanded: bool,
    pub has_children: bool,
    pub cells: Vec<FormattedCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementView {
    pub table_id: String,
    pub banner: Option<String>,
    pub label_header: String,
    pub columns: Vec<ViewColumn>,
    pub column_sets: Vec<ColumnSetSpan>,
    pub rows: Vec<ViewRow>,
}

impl StatementView {
    /// Header labels in render order, row-label column first.
    pub fn header_labels(&self) -> Vec<&str> {
        std::iter::once(self.label_header.as_str())
            .chain(self.columns.iter().map(|c| c.display_name.as_str()))
            .collect()
    }
}

fn visible_columns(statement: &FinancialStatement, options: ViewOptions) -> Vec<usize> {
    let start = match statement.window_start {
        Some(start) if !options.show_all_periods => start,
        _ => return (0..statement.columns.len()).collect(),
    };

    statement
        .columns
        .iter()
        .enumerate()
        .filter(|(i, column)| {
            *i >= start || matches!(column.role, ColumnRole::Total | ColumnRole::TotalDelta)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Builds view columns with set boundaries recomputed over the visible
/// columns, so a set cut by the window still opens and closes.
fn build_columns(
    statement: &FinancialStatement,
    visible: &[usize],
) -> (Vec<ViewColumn>, Vec<ColumnSetSpan>) {
    let mut bounds: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (pos, &i) in visible.iter().enumerate() {
        if let Some(set_id) = &statement.columns[i].set_id {
            bounds
                .entry(set_id.as_str())
                .and_modify(|(_, end)| *end = pos)
                .or_insert((pos, pos));
        }
    }

    let columns = visible
        .iter()
        .enumerate()
        .map(|(pos, &i)| {
            let spec = &statement.columns[i];
            let bound = spec
                .set_id
                .as_deref()
                .and_then(|id| bounds.get(id).copied());
            ViewColumn {
                canonical_name: spec.canonical_name.clone(),
                display_name: spec.display_name.clone(),
                kind: spec.kind,
                role: spec.role,
                set_id: spec.set_id.clone(),
                is_set_start: bound.is_some_and(|(start, _)| start == pos),
                is_set_end: bound.is_some_and(|(_, end)| end == pos),
            }
        })
        .collect();

    let mut spans: Vec<ColumnSetSpan> = bounds
        .into_iter()
        .map(|(id, (start, end))| ColumnSetSpan {
            id: id.to_string(),
            start,
            end,
        })
        .collect();
    spans.sort_by_key(|span| span.start);

    (columns, spans)
}

fn is_visible(row: &Row, state: &ExpansionState) -> bool {
    match row.kind {
        RowKind::MainCategory | RowKind::Aggregate => true,
        RowKind::SubCategory | RowKind::LeafItem => row
            .parent_key
            .as_ref()
            .is_some_and(|parent| state.shows_children_of(parent)),
    }
}

/// Visible rows and columns of `statement` for the given expansion state.
pub fn assemble_view(
    statement: &FinancialStatement,
    state: &ExpansionState,
    options: ViewOptions,
) -> StatementView {
    let visible = visible_columns(statement, options);
    let (columns, column_sets) = build_columns(statement, &visible);

    let rows: Vec<ViewRow> = statement
        .rows
        .iter()
        .filter(|row| is_visible(row, state))
        .map(|row| ViewRow {
            label: row.label.clone(),
            kind: row.kind,
            category_key: row.category_key.clone(),
            parent_key: row.parent_key.clone(),
            indent_level: row.indent_level,
            is_expanded: row.category_key.as_ref().is_some_and(|k| state.contains(k)),
            has_children: row.has_children,
            cells: visible
                .iter()
                .map(|&i| format_cell(row.value(i), statement.columns[i].kind, row.polarity))
                .collect(),
        })
        .collect();

    debug!(
        "View of '{}': {} of {} rows, {} of {} columns",
        statement.table_id,
        rows.len(),
        statement.rows.len(),
        columns.len(),
        statement.columns.len()
    );

    StatementView {
        table_id: statement.table_id.clone(),
        banner: statement.banner.clone(),
        label_header: statement.label_header.clone(),
        columns,
        column_sets,
        rows,
    }
}
