//! Shared fixtures for integration tests: a minimal xlsx template writer
//! and a cell reader for checking exported sheets.

#![allow(dead_code)]

use earthworm::{Dataset, DatasetOptions, LithologyRule, RangeBound, RangeRuleSet, Sample, Schema};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// `{"SS": {"GR": (0, 80)}, "CO": {"GR": (80, None)}}`
pub fn ss_co_rules() -> RangeRuleSet {
    RangeRuleSet::new(vec![
        LithologyRule::new("SS").with_bound("GR", RangeBound::finite(0.0, 80.0).expect("SS bound")),
        LithologyRule::new("CO").with_bound("GR", RangeBound::at_least(80.0).expect("CO bound")),
    ])
    .expect("rule set")
}

/// GR-only dataset with samples at `start + i * step`.
pub fn gr_dataset(start: f64, step: f64, gr: &[f64]) -> Dataset {
    let samples = gr
        .iter()
        .enumerate()
        .map(|(i, v)| Sample::new(start + i as f64 * step, vec![Some(*v)]))
        .collect();
    Dataset::new(Schema::new(["GR"]).expect("schema"), samples, DatasetOptions::default())
        .expect("dataset")
}

/// Worksheet XML with a header in row 1 and optional merged ranges.
pub fn sheet_xml(header: &str, merges: &[&str]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><dimension ref="A1:R4"/><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>{header}</t></is></c></row><row r="3" spans="1:3"><c r="A3" s="2"><v>42</v></c></row></sheetData>"#
    );
    if !merges.is_empty() {
        xml.push_str(&format!(r#"<mergeCells count="{}">"#, merges.len()));
        for m in merges {
            xml.push_str(&format!(r#"<mergeCell ref="{m}"/>"#));
        }
        xml.push_str("</mergeCells>");
    }
    xml.push_str("</worksheet>");
    xml
}

/// Write an xlsx package with the given `(sheet name, sheet xml)` pairs.
pub fn write_template(path: &Path, sheets: &[(&str, String)]) {
    let file = File::create(path).expect("create template");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    let mut workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>"#
    );
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        workbook.push_str(&format!(r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
    }
    content_types.push_str("</Types>");
    workbook.push_str("</sheets></workbook>");
    rels.push_str("</Relationships>");

    let root_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    );

    let mut put = |name: &str, body: &str| {
        zip.start_file(name, options).expect("start part");
        zip.write_all(body.as_bytes()).expect("write part");
    };
    put("[Content_Types].xml", &content_types);
    put("_rels/.rels", &root_rels);
    put("xl/workbook.xml", &workbook);
    put("xl/_rels/workbook.xml.rels", &rels);
    for (i, (_, xml)) in sheets.iter().enumerate() {
        put(&format!("xl/worksheets/sheet{}.xml", i + 1), xml);
    }
    zip.finish().expect("finish template");
}

fn read_part(archive: &mut ZipArchive<File>, name: &str) -> String {
    let mut part = archive.by_name(name).expect("part present");
    let mut out = String::new();
    part.read_to_string(&mut out).expect("read part");
    out
}

fn attr(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> Vec<String> {
    let mut archive = ZipArchive::new(File::open(path).expect("open workbook")).expect("zip");
    let xml = read_part(&mut archive, "xl/workbook.xml");
    let mut reader = Reader::from_str(&xml);
    let mut names = Vec::new();
    loop {
        match reader.read_event().expect("workbook xml") {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                names.extend(attr(&e, b"name"));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    names
}

/// Cell reference → displayed text for every valued cell in the named sheet.
pub fn read_cells(path: &Path, sheet: &str) -> BTreeMap<String, String> {
    let mut archive = ZipArchive::new(File::open(path).expect("open workbook")).expect("zip");

    let workbook = read_part(&mut archive, "xl/workbook.xml");
    let mut rel_id = None;
    let mut reader = Reader::from_str(&workbook);
    loop {
        match reader.read_event().expect("workbook xml") {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                if attr(&e, b"name").as_deref() == Some(sheet) {
                    rel_id = attr(&e, b"r:id");
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    let rel_id = rel_id.expect("sheet listed in workbook");

    let rels = read_part(&mut archive, "xl/_rels/workbook.xml.rels");
    let mut target = None;
    let mut reader = Reader::from_str(&rels);
    loop {
        match reader.read_event().expect("rels xml") {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if attr(&e, b"Id").as_deref() == Some(rel_id.as_str()) {
                    target = attr(&e, b"Target");
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    let target = target.expect("relationship for sheet");
    let part = match target.strip_prefix('/') {
        Some(abs) => abs.to_string(),
        None => format!("xl/{target}"),
    };

    let xml = read_part(&mut archive, &part);
    let mut cells = BTreeMap::new();
    let mut reader = Reader::from_str(&xml);
    let mut current: Option<String> = None;
    let mut in_value = false;
    loop {
        match reader.read_event().expect("sheet xml") {
            Event::Start(e) => match e.local_name().as_ref() {
                b"c" => current = attr(&e, b"r"),
                b"v" | b"t" => in_value = current.is_some(),
                _ => {}
            },
            Event::Text(t) if in_value => {
                if let Some(r) = &current {
                    let text = t.unescape().expect("cell text").into_owned();
                    cells.entry(r.clone()).or_insert_with(String::new).push_str(&text);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"c" => current = None,
                b"v" | b"t" => in_value = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    cells
}

/// Parsed numeric cell.
pub fn number(cells: &BTreeMap<String, String>, r: &str) -> f64 {
    cells
        .get(r)
        .unwrap_or_else(|| panic!("cell {r} missing"))
        .parse()
        .unwrap_or_else(|_| panic!("cell {r} is not numeric"))
}
