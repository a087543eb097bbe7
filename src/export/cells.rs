//! A1-style cell references and merged ranges.

use regex::Regex;
use std::sync::OnceLock;

fn cell_ref_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]{1,7})$").ok())
        .as_ref()
}

/// 1-based column number to letters (1 → A, 27 → AA).
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Letters to 1-based column number.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    letters.bytes().try_fold(0u32, |acc, b| {
        b.is_ascii_alphabetic()
            .then(|| acc * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1))
    })
}

/// `"L12"` → `(12, 12)` as (column, row).
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let caps = cell_ref_regex()?.captures(reference.trim())?;
    let col = column_index(caps.get(1)?.as_str())?;
    let row = caps.get(2)?.as_str().parse().ok()?;
    (row > 0).then_some((col, row))
}

pub fn cell_ref(col: u32, row: u32) -> String {
    format!("{}{row}", column_letters(col))
}

/// Inclusive rectangle of cells, e.g. `A5:B6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_col: u32,
    pub first_row: u32,
    pub last_col: u32,
    pub last_row: u32,
}

impl CellRange {
    /// Parses `A1:B2` or a single `A1`. Corners may come in either order.
    pub fn parse(text: &str) -> Option<Self> {
        let (a, b) = text.split_once(':').unwrap_or((text, text));
        let (c1, r1) = parse_cell_ref(a)?;
        let (c2, r2) = parse_cell_ref(b)?;
        Some(Self {
            first_col: c1.min(c2),
            first_row: r1.min(r2),
            last_col: c1.max(c2),
            last_row: r1.max(r2),
        })
    }

    pub fn contains(&self, col: u32, row: u32) -> bool {
        (self.first_col..=self.last_col).contains(&col)
            && (self.first_row..=self.last_row).contains(&row)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            first_col: self.first_col.min(other.first_col),
            first_row: self.first_row.min(other.first_row),
            last_col: self.last_col.max(other.last_col),
            last_row: self.last_row.max(other.last_row),
        }
    }

    pub fn to_ref(self) -> String {
        let first = cell_ref(self.first_col, self.first_row);
        if self.first_col == self.last_col && self.first_row == self.last_row {
            first
        } else {
            format!("{first}:{}", cell_ref(self.last_col, self.last_row))
        }
    }
}
