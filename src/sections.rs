use crate::tokenizer::{strip_bom, QUOTE};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Half-open line range `[start, end)` of one logical table inside a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpan {
    pub start: usize,
    pub end: usize,
}

impl SectionSpan {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// The lines of one logical table, banner first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable<'a> {
    pub lines: Vec<&'a str>,
}

impl<'a> RawTable<'a> {
    pub fn from_text(text: &'a str) -> Self {
        Self {
            lines: strip_bom(text).lines().collect(),
        }
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

fn starts_with_marker(line: &str, marker: &str) -> bool {
    let line = line.trim_start().trim_start_matches(QUOTE);
    line.starts_with(marker)
}

/// Finds the first line starting with each marker. A section ends where the
/// next found section starts, or at the end of the text. Missing markers
/// yield `None` in the corresponding slot.
pub fn locate_sections(text: &str, markers: &[&str]) -> Vec<Option<SectionSpan>> {
    let lines: Vec<&str> = strip_bom(text).lines().collect();

    let starts: Vec<Option<usize>> = markers
        .iter()
        .map(|marker| {
            let found = lines.iter().position(|line| starts_with_marker(line, marker));
            if found.is_none() {
                warn!("Section marker '{}' not found", marker);
            }
            found
        })
        .collect();

    let mut boundaries: Vec<usize> = starts.iter().flatten().copied().collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    starts
        .iter()
        .zip(markers)
        .map(|(start, marker)| {
            let start = (*start)?;
            let end = boundaries
                .iter()
                .copied()
                .find(|&b| b > start)
                .unwrap_or(lines.len());
            debug!("Section '{}' spans lines {}..{}", marker, start, end);
            Some(SectionSpan { start, end })
        })
        .collect()
}

/// Like [`locate_sections`], but returns the lines of each found section.
pub fn extract_tables<'a>(text: &'a str, markers: &[&str]) -> Vec<Option<RawTable<'a>>> {
    let lines: Vec<&'a str> = strip_bom(text).lines().collect();

    locate_sections(text, markers)
        .into_iter()
        .map(|span| {
            span.map(|s| RawTable {
                lines: lines[s.start..s.end].to_vec(),
            })
        })
        .collect()
}
