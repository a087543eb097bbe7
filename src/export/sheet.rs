//! Worksheet XML patching.
//!
//! Streams `xl/worksheets/sheetN.xml` through quick-xml, replacing the cells
//! being written and passing everything else through unchanged: other
//! cells, row attributes, styles, merges, conditional formats, drawings.
//!
//! Rules applied to target rows:
//! - An existing cell keeps its `s` (style) attribute; its type, formula
//!   and value are replaced.
//! - Missing rows are inserted in row order; missing cells in column order.
//! - `spans` is dropped from patched rows (it is an optional hint).
//! - Cells inside a `<mergeCell>` range are never written.
//! - `<dimension ref>` is widened to include the written block.

use super::cells::{cell_ref, parse_cell_ref, CellRange};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;

type XmlResult<T> = std::result::Result<T, quick_xml::Error>;

/// Value written into one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

/// Row number → (column, value) pairs sorted by column.
pub type RowWrites = BTreeMap<u32, Vec<(u32, CellValue)>>;

#[derive(Debug)]
pub struct PatchOutcome {
    pub xml: Vec<u8>,
    pub rows_written: usize,
    pub cells_written: usize,
    pub merged_cells_skipped: usize,
}

/// Minimal empty worksheet for a newly created sheet.
pub fn blank_sheet_xml() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        r#"<dimension ref="A1"/><sheetData/></worksheet>"#
    )
    .to_string()
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> XmlResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn qualified_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Every `<mergeCell ref>` in the sheet.
pub fn merged_ranges(xml: &str) -> XmlResult<Vec<CellRange>> {
    let mut reader = Reader::from_str(xml);
    let mut ranges = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"mergeCell" => {
                if let Some(range) = attr_value(&e, b"ref")?.as_deref().and_then(CellRange::parse) {
                    ranges.push(range);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ranges)
}

// ============================================================================
// Row buffering
// ============================================================================

struct ExistingCell {
    col: u32,
    style: Option<String>,
    events: Vec<Event<'static>>,
}

struct OpenRow {
    start: BytesStart<'static>,
    number: u32,
    writes: Vec<(u32, CellValue)>,
    cells: Vec<ExistingCell>,
    current: Option<ExistingCell>,
    next_col: u32,
}

impl OpenRow {
    fn begin_cell(&mut self, e: &BytesStart<'_>) -> XmlResult<ExistingCell> {
        let col = attr_value(e, b"r")?
            .as_deref()
            .and_then(parse_cell_ref)
            .map_or(self.next_col, |(c, _)| c);
        self.next_col = col + 1;
        Ok(ExistingCell {
            col,
            style: attr_value(e, b"s")?,
            events: Vec::new(),
        })
    }
}

struct Patcher {
    writer: Writer<Vec<u8>>,
    prefix: String,
    pending: RowWrites,
    rows_written: usize,
    cells_written: usize,
}

impl Patcher {
    fn tag(&self, local: &str) -> String {
        format!("{}{local}", self.prefix)
    }

    fn write_cell(&mut self, row: u32, col: u32, value: &CellValue, style: Option<&str>) -> XmlResult<()> {
        let c_tag = self.tag("c");
        let mut c = BytesStart::new(c_tag.as_str());
        c.push_attribute(("r", cell_ref(col, row).as_str()));
        if let Some(s) = style {
            c.push_attribute(("s", s));
        }
        match value {
            CellValue::Number(v) => {
                let v_tag = self.tag("v");
                self.writer.write_event(Event::Start(c))?;
                self.writer.write_event(Event::Start(BytesStart::new(v_tag.as_str())))?;
                self.writer.write_event(Event::Text(BytesText::new(&v.to_string())))?;
                self.writer.write_event(Event::End(BytesEnd::new(v_tag.as_str())))?;
            }
            CellValue::Text(text) => {
                c.push_attribute(("t", "inlineStr"));
                let is_tag = self.tag("is");
                let t_tag = self.tag("t");
                self.writer.write_event(Event::Start(c))?;
                self.writer.write_event(Event::Start(BytesStart::new(is_tag.as_str())))?;
                self.writer.write_event(Event::Start(BytesStart::new(t_tag.as_str())))?;
                self.writer.write_event(Event::Text(BytesText::new(text)))?;
                self.writer.write_event(Event::End(BytesEnd::new(t_tag.as_str())))?;
                self.writer.write_event(Event::End(BytesEnd::new(is_tag.as_str())))?;
            }
        }
        self.writer.write_event(Event::End(BytesEnd::new(c_tag.as_str())))?;
        self.cells_written += 1;
        Ok(())
    }

    /// Write a brand-new row.
    fn write_new_row(&mut self, row: u32, cells: &[(u32, CellValue)]) -> XmlResult<()> {
        let row_tag = self.tag("row");
        let mut start = BytesStart::new(row_tag.as_str());
        start.push_attribute(("r", row.to_string().as_str()));
        self.writer.write_event(Event::Start(start))?;
        for (col, value) in cells {
            self.write_cell(row, *col, value, None)?;
        }
        self.writer.write_event(Event::End(BytesEnd::new(row_tag.as_str())))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Write pending rows numbered below `limit` (all rows when `None`).
    fn flush_pending_before(&mut self, limit: Option<u32>) -> XmlResult<()> {
        let due: Vec<u32> = self
            .pending
            .keys()
            .copied()
            .take_while(|r| limit.map_or(true, |l| *r < l))
            .collect();
        for row in due {
            if let Some(cells) = self.pending.remove(&row) {
                self.write_new_row(row, &cells)?;
            }
        }
        Ok(())
    }

    /// Emit a patched existing row: its own cells merged with the writes.
    fn close_row(&mut self, row: OpenRow) -> XmlResult<()> {
        let end_name = qualified_name(&row.start);
        self.writer.write_event(Event::Start(row.start))?;

        let mut existing = row.cells.into_iter().peekable();
        let mut writes = row.writes.into_iter().peekable();
        loop {
            let take_write = match (existing.peek(), writes.peek()) {
                (None, None) => break,
                (Some(_), None) => false,
                (None, Some(_)) => true,
                (Some(cell), Some((col, _))) => *col <= cell.col,
            };
            if take_write {
                if let Some((col, value)) = writes.next() {
                    let mut style = None;
                    if existing.peek().is_some_and(|c| c.col == col) {
                        style = existing.next().and_then(|c| c.style);
                    }
                    self.write_cell(row.number, col, &value, style.as_deref())?;
                }
            } else if let Some(cell) = existing.next() {
                for event in cell.events {
                    self.writer.write_event(event)?;
                }
            }
        }

        self.writer.write_event(Event::End(BytesEnd::new(end_name.as_str())))?;
        self.rows_written += 1;
        Ok(())
    }
}

/// Copy of a `<row>` start tag without `spans`, with `r` made explicit.
fn row_start(e: &BytesStart<'_>, number: u32) -> XmlResult<BytesStart<'static>> {
    let mut out = BytesStart::new(qualified_name(e));
    let mut has_r = false;
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"spans" => continue,
            b"r" => has_r = true,
            _ => {}
        }
        out.push_attribute(attr);
    }
    if !has_r {
        out.push_attribute(("r", number.to_string().as_str()));
    }
    Ok(out)
}

fn row_number(e: &BytesStart<'_>, last_row: u32) -> XmlResult<u32> {
    Ok(attr_value(e, b"r")?
        .and_then(|r| r.trim().parse().ok())
        .unwrap_or(last_row + 1))
}

fn is_whitespace(e: &BytesText<'_>) -> bool {
    e.iter().all(u8::is_ascii_whitespace)
}

/// Apply `writes` to a worksheet document.
pub fn patch_sheet(xml: &str, writes: &RowWrites) -> XmlResult<PatchOutcome> {
    let merged = merged_ranges(xml)?;

    let mut pending = RowWrites::new();
    let mut merged_cells_skipped = 0usize;
    for (&row, cells) in writes {
        let kept: Vec<(u32, CellValue)> = cells
            .iter()
            .filter(|(col, _)| {
                let blocked = merged.iter().any(|m| m.contains(*col, row));
                merged_cells_skipped += usize::from(blocked);
                !blocked
            })
            .cloned()
            .collect();
        if !kept.is_empty() {
            pending.insert(row, kept);
        }
    }

    let written_extent = pending.iter().fold(None::<CellRange>, |acc, (&row, cells)| {
        let first_col = cells.iter().map(|(c, _)| *c).min().unwrap_or(1);
        let last_col = cells.iter().map(|(c, _)| *c).max().unwrap_or(1);
        let r = CellRange {
            first_col,
            first_row: row,
            last_col,
            last_row: row,
        };
        Some(acc.map_or(r, |a| a.union(&r)))
    });

    let mut reader = Reader::from_str(xml);
    let mut patcher = Patcher {
        writer: Writer::new(Vec::with_capacity(xml.len() + 256)),
        prefix: String::new(),
        pending,
        rows_written: 0,
        cells_written: 0,
    };
    let mut in_sheet_data = false;
    let mut last_row = 0u32;
    let mut open: Option<OpenRow> = None;

    loop {
        let event = reader.read_event()?;

        // Inside a target row: buffer cells until </row>.
        if let Some(row) = open.as_mut() {
            match event {
                Event::Start(ref e) if e.local_name().as_ref() == b"c" => {
                    let mut cell = row.begin_cell(e)?;
                    cell.events.push(event.into_owned());
                    row.current = Some(cell);
                }
                Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                    let mut cell = row.begin_cell(e)?;
                    cell.events.push(event.into_owned());
                    row.cells.push(cell);
                }
                Event::End(ref e) if e.local_name().as_ref() == b"c" => {
                    if let Some(mut cell) = row.current.take() {
                        cell.events.push(event.into_owned());
                        row.cells.push(cell);
                    }
                }
                Event::End(ref e) if e.local_name().as_ref() == b"row" => {
                    if let Some(row) = open.take() {
                        patcher.close_row(row)?;
                    }
                }
                Event::Eof => break,
                other => {
                    if let Some(cell) = row.current.as_mut() {
                        cell.events.push(other.into_owned());
                    }
                }
            }
            continue;
        }

        match event {
            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                let name = qualified_name(e);
                patcher.prefix = name
                    .rsplit_once(':')
                    .map(|(p, _)| format!("{p}:"))
                    .unwrap_or_default();
                in_sheet_data = true;
                patcher.writer.write_event(event)?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                let name = qualified_name(e);
                patcher.prefix = name
                    .rsplit_once(':')
                    .map(|(p, _)| format!("{p}:"))
                    .unwrap_or_default();
                patcher.writer.write_event(Event::Start(e.to_owned()))?;
                patcher.flush_pending_before(None)?;
                patcher.writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                patcher.flush_pending_before(None)?;
                in_sheet_data = false;
                patcher.writer.write_event(event)?;
            }
            Event::Start(ref e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let number = row_number(e, last_row)?;
                last_row = number;
                patcher.flush_pending_before(Some(number))?;
                match patcher.pending.remove(&number) {
                    Some(writes) => {
                        open = Some(OpenRow {
                            start: row_start(e, number)?,
                            number,
                            writes,
                            cells: Vec::new(),
                            current: None,
                            next_col: 1,
                        });
                    }
                    None => patcher.writer.write_event(event)?,
                }
            }
            Event::Empty(ref e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let number = row_number(e, last_row)?;
                last_row = number;
                patcher.flush_pending_before(Some(number))?;
                match patcher.pending.remove(&number) {
                    Some(writes) => {
                        let row = OpenRow {
                            start: row_start(e, number)?,
                            number,
                            writes,
                            cells: Vec::new(),
                            current: None,
                            next_col: 1,
                        };
                        patcher.close_row(row)?;
                    }
                    None => patcher.writer.write_event(event)?,
                }
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"dimension" => {
                let existing = attr_value(e, b"ref")?.as_deref().and_then(CellRange::parse);
                let widened = match (existing, written_extent) {
                    (Some(a), Some(b)) => Some(a.union(&b)),
                    (a, b) => a.or(b),
                };
                let mut dim = BytesStart::new(qualified_name(e));
                if let Some(range) = widened {
                    dim.push_attribute(("ref", range.to_ref().as_str()));
                }
                patcher.writer.write_event(Event::Empty(dim))?;
            }
            Event::Text(ref t) if in_sheet_data && is_whitespace(t) => {}
            Event::Eof => break,
            other => patcher.writer.write_event(other)?,
        }
    }

    Ok(PatchOutcome {
        xml: patcher.writer.into_inner(),
        rows_written: patcher.rows_written,
        cells_written: patcher.cells_written,
        merged_cells_skipped,
    })
}
