use crate::schema::{ColumnKind, ColumnSetDef, ComparisonRule, StatementConfig};
use crate::utils::{parse_period_label, shorten_forecast_label};
use crate::{ColumnRole, ColumnSpec};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Working copy of a column while the rewrites run.
#[derive(Debug, Clone)]
struct Draft {
    source_name: String,
    canonical_name: String,
    source_index: Option<usize>,
}

impl Draft {
    fn synthesized(name: &str) -> Self {
        Self {
            source_name: String::new(),
            canonical_name: name.to_string(),
            source_index: None,
        }
    }
}

/// Turns a raw header row into the canonical, ordered column list.
#[derive(Debug, Clone)]
pub struct HeaderNormalizer {
    obsolete_columns: Vec<String>,
    total_label: String,
    total_synonyms: Vec<String>,
    total_delta_label: Option<String>,
    comparison_rules: Vec<ComparisonRule>,
    column_sets: Vec<ColumnSetDef>,
    display_names: BTreeMap<String, String>,
    shorten_forecast_suffix: bool,
    text_columns: Vec<String>,
    kind_rules: Vec<(String, ColumnKind)>,
}

impl HeaderNormalizer {
    pub fn new(config: &StatementConfig) -> Self {
        Self {
            obsolete_columns: config.obsolete_columns.clone(),
            total_label: config.total_label.clone(),
            total_synonyms: config.total_synonyms.clone(),
            total_delta_label: config.total_delta_label.clone(),
            comparison_rules: config.comparison_rules.clone(),
            column_sets: config.column_sets.clone(),
            display_names: config.display_names.clone(),
            shorten_forecast_suffix: config.shorten_forecast_suffix,
            text_columns: config.text_columns.clone(),
            kind_rules: config
                .column_kind_rules
                .iter()
                .map(|r| (r.contains.to_lowercase(), r.kind))
                .collect(),
        }
    }

    /// `fields` is the header row with the row-label column already removed;
    /// field `i` lines up with value `i` of every data row.
    pub fn normalize(&self, fields: &[String]) -> Vec<ColumnSpec> {
        let mut drafts: Vec<Draft> = fields
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.trim().is_empty())
            .map(|(i, name)| Draft {
                source_name: name.clone(),
                canonical_name: name.trim().to_string(),
                source_index: Some(i),
            })
            .collect();

        self.drop_obsolete(&mut drafts);
        dedupe_names(&mut drafts);
        let total_pos = self.canonicalize_total(&mut drafts);
        self.insert_total_delta(&mut drafts, total_pos);
        for rule in &self.comparison_rules {
            apply_comparison_rule(&mut drafts, rule);
        }

        let mut columns: Vec<ColumnSpec> = drafts
            .into_iter()
            .map(|d| {
                let kind = self.column_kind(&d.canonical_name);
                let role = self.column_role(&d.canonical_name);
                let display_name = self.display_name(&d.canonical_name);
                ColumnSpec {
                    source_name: d.source_name,
                    canonical_name: d.canonical_name,
                    display_name,
                    kind,
                    role,
                    source_index: d.source_index,
                    set_id: None,
                    is_set_start: false,
                    is_set_end: false,
                }
            })
            .collect();

        self.assign_sets(&mut columns);
        columns
    }

    fn drop_obsolete(&self, drafts: &mut Vec<Draft>) {
        drafts.retain(|d| {
            let obsolete = self.obsolete_columns.contains(&d.canonical_name);
            if obsolete {
                debug!("Dropping obsolete column '{}'", d.canonical_name);
            }
            !obsolete
        });
    }

    /// Renames the first total synonym to the canonical label, or appends a
    /// synthesized total. Returns the total's position.
    fn canonicalize_total(&self, drafts: &mut Vec<Draft>) -> usize {
        if let Some(pos) = position(drafts, &self.total_label) {
            return pos;
        }

        let synonym = drafts.iter().position(|d| {
            self.total_synonyms
                .iter()
                .any(|s| s.trim().eq_ignore_ascii_case(&d.canonical_name))
        });

        match synonym {
            Some(pos) => {
                debug!(
                    "Renaming total column '{}' to '{}'",
                    drafts[pos].canonical_name, self.total_label
                );
                drafts[pos].canonical_name = self.total_label.clone();
                pos
            }
            None => {
                debug!("Appending synthesized total column '{}'", self.total_label);
                drafts.push(Draft::synthesized(&self.total_label));
                drafts.len() - 1
            }
        }
    }

    fn insert_total_delta(&self, drafts: &mut Vec<Draft>, total_pos: usize) {
        let Some(delta) = &self.total_delta_label else {
            return;
        };
        if position(drafts, delta).is_some() {
            return;
        }
        debug!("Inserting synthesized delta column '{}'", delta);
        drafts.insert(total_pos + 1, Draft::synthesized(delta));
    }

    fn assign_sets(&self, columns: &mut [ColumnSpec]) {
        let mut membership: HashMap<&str, &str> = HashMap::new();
        for set in &self.column_sets {
            for name in &set.columns {
                membership.entry(name.as_str()).or_insert(set.id.as_str());
            }
        }

        let mut bounds: HashMap<String, (usize, usize)> = HashMap::new();
        for (i, column) in columns.iter_mut().enumerate() {
            if let Some(set_id) = membership.get(column.canonical_name.as_str()) {
                column.set_id = Some(set_id.to_string());
                bounds
                    .entry(set_id.to_string())
                    .and_modify(|(_, end)| *end = i)
                    .or_insert((i, i));
            }
        }

        for (start, end) in bounds.values() {
            columns[*start].is_set_start = true;
            columns[*end].is_set_end = true;
        }
    }

    fn column_kind(&self, name: &str) -> ColumnKind {
        if self.text_columns.iter().any(|t| t == name) {
            return ColumnKind::Text;
        }
        if self.total_delta_label.as_deref() == Some(name) {
            return ColumnKind::YoyRatio;
        }
        let lower = name.to_lowercase();
        self.kind_rules
            .iter()
            .find(|(needle, _)| lower.contains(needle.as_str()))
            .map(|(_, kind)| *kind)
            .unwrap_or(ColumnKind::Numeric)
    }

    fn column_role(&self, name: &str) -> ColumnRole {
        if name == self.total_label {
            ColumnRole::Total
        } else if self.total_delta_label.as_deref() == Some(name) {
            ColumnRole::TotalDelta
        } else if self.comparison_rules.iter().any(|r| r.column == name) {
            ColumnRole::Comparison
        } else {
            ColumnRole::Data
        }
    }

    fn display_name(&self, name: &str) -> String {
        if let Some(display) = self.display_names.get(name) {
            return display.clone();
        }
        if self.shorten_forecast_suffix {
            if let Some(short) = shorten_forecast_label(name) {
                return short;
            }
        }
        name.to_string()
    }
}

fn position(drafts: &[Draft], name: &str) -> Option<usize> {
    drafts.iter().position(|d| d.canonical_name == name)
}

/// Repeated names get ` (2)`, ` (3)`, ... so canonical names stay unique.
fn dedupe_names(drafts: &mut [Draft]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut taken: Vec<String> = drafts.iter().map(|d| d.canonical_name.clone()).collect();

    for draft in drafts.iter_mut() {
        let count = seen.entry(draft.canonical_name.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            continue;
        }

        let mut n = *count;
        let mut candidate = format!("{} ({})", draft.canonical_name, n);
        while taken.contains(&candidate) {
            n += 1;
            candidate = format!("{} ({})", draft.canonical_name, n);
        }
        *count = n;
        taken.push(candidate.clone());
        debug!("Renaming duplicate column '{}' to '{}'", draft.canonical_name, candidate);
        draft.canonical_name = candidate;
    }
}

fn apply_comparison_rule(drafts: &mut Vec<Draft>, rule: &ComparisonRule) {
    let Some(anchor) = position(drafts, &rule.before) else {
        return;
    };

    match position(drafts, &rule.column) {
        Some(pos) if pos + 1 == anchor => {}
        Some(pos) => {
            let column = drafts.remove(pos);
            let anchor = position(drafts, &rule.before).unwrap_or(drafts.len());
            debug!("Moving '{}' before '{}'", rule.column, rule.before);
            drafts.insert(anchor, column);
        }
        None => {
            debug!("Synthesizing comparison column '{}' before '{}'", rule.column, rule.before);
            drafts.insert(anchor, Draft::synthesized(&rule.column));
        }
    }
}

/// Start of the recent-period window: the configured column, else the latest
/// actual period by month end (rightmost on ties). Widened back to the start of that column's set so a
/// comparison column in front of it is kept.
pub fn trailing_window_start(columns: &[ColumnSpec], config: &StatementConfig) -> Option<usize> {
    let start = match &config.window_start {
        Some(name) => columns.iter().position(|c| &c.canonical_name == name),
        None => columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.source_index.is_some())
            .filter_map(|(i, c)| {
                parse_period_label(&c.canonical_name)
                    .filter(|p| p.is_actual())
                    .map(|p| (p.month_end(), i))
            })
            .max()
            .map(|(_, i)| i),
    }?;

    let widened = match &columns[start].set_id {
        Some(set_id) if !columns[start].is_set_start => columns[..start]
            .iter()
            .rposition(|c| c.set_id.as_ref() == Some(set_id) && c.is_set_start)
            .unwrap_or(start),
        _ => start,
    };
    Some(widened)
}
