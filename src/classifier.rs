use crate::error::{Result, StatementError};
use crate::schema::{RowKind, StatementConfig};
use crate::ColumnSpec;
use log::debug;
use regex::Regex;
use std::collections::HashSet;

#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: Regex,
    kind: RowKind,
}

/// Outcome of classifying one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: RowKind,
    /// Label with any matched marker (`1.`, `(1)`) removed.
    pub label: String,
}

/// Classifies row labels against an ordered `(pattern, kind)` table, then
/// the aggregate label list. Anything unmatched is a leaf item.
#[derive(Debug, Clone)]
pub struct RowClassifier {
    rules: Vec<CompiledRule>,
    aggregate_labels: HashSet<String>,
    excluded_labels: HashSet<String>,
    excluded_prefixes: Vec<String>,
}

impl RowClassifier {
    pub fn from_config(config: &StatementConfig) -> Result<Self> {
        let rules = config
            .row_rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|pattern| CompiledRule {
                        pattern,
                        kind: rule.kind,
                    })
                    .map_err(|source| StatementError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            aggregate_labels: config.aggregate_labels.iter().cloned().collect(),
            excluded_labels: config.excluded_labels.iter().cloned().collect(),
            excluded_prefixes: config.excluded_prefixes.clone(),
        })
    }

    /// Returns `None` for rows on the exclusion lists.
    pub fn classify(&self, raw_label: &str) -> Option<Classification> {
        let raw = raw_label.trim();

        if self.excluded_prefixes.iter().any(|p| raw.starts_with(p.as_str())) {
            debug!("Excluding row '{}' by prefix", raw);
            return None;
        }

        let matched = self
            .rules
            .iter()
            .find_map(|rule| rule.pattern.find(raw).map(|m| (rule.kind, m)));

        let (kind, label) = match matched {
            Some((kind, m)) => {
                let mut stripped = String::with_capacity(raw.len());
                stripped.push_str(&raw[..m.start()]);
                stripped.push_str(&raw[m.end()..]);
                let stripped = stripped.trim();
                let label = if stripped.is_empty() { raw } else { stripped };
                (kind, label.to_string())
            }
            None if self.aggregate_labels.contains(raw) => (RowKind::Aggregate, raw.to_string()),
            None => (RowKind::LeafItem, raw.to_string()),
        };

        if self.excluded_labels.contains(raw) || self.excluded_labels.contains(&label) {
            debug!("Excluding row '{}'", raw);
            return None;
        }

        Some(Classification { kind, label })
    }
}

/// Re-maps one data row's values (label excluded) from source order into
/// canonical column order. Columns without a source yield empty strings.
pub fn align_values(values: &[String], columns: &[ColumnSpec]) -> Vec<String> {
    columns
        .iter()
        .map(|column| {
            column
                .source_index
                .and_then(|i| values.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .collect()
}
