//! Generic header resolver.
//!
//! Every import flow faces the same problem: a canonical schema on one side
//! and source files that name their columns six different ways on the other,
//! sometimes with banner rows above the real header. One table-driven
//! resolver handles all of them; flows only supply their synonym tables.

use anyhow::{anyhow, Result};
use std::collections::HashMap;

use super::cell::normalize_header;

/// How a field's synonyms are matched against a normalized header cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Substring,
}

/// Canonical field plus the header text variants that map to it
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: &'static str,
    pub synonyms: &'static [&'static str],
    pub mode: MatchMode,
}

impl FieldSpec {
    pub const fn exact(field: &'static str, synonyms: &'static [&'static str]) -> Self {
        FieldSpec {
            field,
            synonyms,
            mode: MatchMode::Exact,
        }
    }

    pub const fn substring(field: &'static str, synonyms: &'static [&'static str]) -> Self {
        FieldSpec {
            field,
            synonyms,
            mode: MatchMode::Substring,
        }
    }

    fn matches(&self, cell: &str) -> bool {
        self.synonyms.iter().any(|synonym| match self.mode {
            MatchMode::Exact => cell == *synonym,
            MatchMode::Substring => cell == *synonym || cell.contains(synonym),
        })
    }
}

/// Canonical field -> source column index, built from one header row
#[derive(Debug, Default)]
pub struct ColumnMap {
    map: HashMap<&'static str, usize>,
}

impl ColumnMap {
    pub fn index(&self, field: &str) -> Option<usize> {
        self.map.get(field).copied()
    }

    /// Cell text for a mapped field, None when unmapped or out of range
    pub fn cell<'a>(&self, row: &'a [String], field: &str) -> Option<&'a str> {
        self.index(field).and_then(|idx| row.get(idx)).map(String::as_str)
    }

    /// Fail the whole file when required canonical fields are unmapped.
    /// The error names every missing field so the fix is obvious.
    pub fn require(&self, fields: &[&'static str]) -> Result<()> {
        let missing: Vec<&str> = fields
            .iter()
            .filter(|field| !self.map.contains_key(**field))
            .copied()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "Could not map required columns: {}. Check the file's header row.",
                missing.join(", ")
            ))
        }
    }
}

/// Locate the true header row in a raw matrix.
///
/// Export files often prepend metadata banners, so row 0 cannot be trusted.
/// A row qualifies when it contains an anchor synonym (exact, or substring
/// when `anchor_substring` is set) and at least one hint synonym. First
/// qualifying row wins.
pub fn find_header_row(
    rows: &[Vec<String>],
    anchors: &[&str],
    anchor_substring: bool,
    hints: &[&str],
) -> Result<usize> {
    for (idx, row) in rows.iter().enumerate() {
        let normalized: Vec<String> = row.iter().map(|c| normalize_header(c)).collect();

        let has_anchor = normalized.iter().any(|cell| {
            anchors.iter().any(|anchor| {
                cell == anchor || (anchor_substring && cell.contains(anchor))
            })
        });
        if !has_anchor {
            continue;
        }

        if hints.is_empty()
            || normalized
                .iter()
                .any(|cell| hints.iter().any(|hint| cell.contains(hint)))
        {
            return Ok(idx);
        }
    }

    Err(anyhow!(
        "Could not find a header row containing a '{}' column.",
        anchors.first().copied().unwrap_or("?")
    ))
}

/// Build the field -> column index map from a header row.
///
/// For each canonical field the first matching header cell wins; fields with
/// no match are simply left unmapped (callers decide which are required).
pub fn resolve_columns(header: &[String], specs: &[FieldSpec]) -> ColumnMap {
    let normalized: Vec<String> = header.iter().map(|c| normalize_header(c)).collect();
    let mut map = HashMap::new();

    for spec in specs {
        if let Some(idx) = normalized.iter().position(|cell| spec.matches(cell)) {
            map.entry(spec.field).or_insert(idx);
        }
    }

    ColumnMap { map }
}
