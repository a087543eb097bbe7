//! xlsx package access: part lookup, sheet resolution and creation, and
//! rewriting the archive with replaced parts.
//!
//! Untouched parts are copied as raw compressed bytes, so everything the
//! exporter does not own (styles, drawings, other sheets, macros) survives
//! byte-for-byte.

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const WORKSHEET_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

/// Failure reading or writing the package, before a path is attached.
#[derive(Debug)]
pub enum PackageError {
    Zip(zip::result::ZipError),
    Xml(quick_xml::Error),
    Io(std::io::Error),
    Structure(String),
}

impl std::fmt::Display for PackageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zip(e) => write!(f, "zip: {e}"),
            Self::Xml(e) => write!(f, "xml: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Structure(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<zip::result::ZipError> for PackageError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Zip(e)
    }
}

impl From<quick_xml::Error> for PackageError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e)
    }
}

impl From<quick_xml::events::attributes::AttrError> for PackageError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(e.into())
    }
}

impl From<std::io::Error> for PackageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

type PkgResult<T> = std::result::Result<T, PackageError>;

// ============================================================================
// Reading
// ============================================================================

/// Open archive plus the list of its part names.
pub struct Package {
    archive: ZipArchive<File>,
    names: HashSet<String>,
}

impl Package {
    pub fn open(path: &Path) -> PkgResult<Self> {
        let archive = ZipArchive::new(File::open(path)?)?;
        let names = archive.file_names().map(str::to_string).collect();
        Ok(Self { archive, names })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn read_part(&mut self, name: &str) -> PkgResult<String> {
        let mut entry = self.archive.by_name(name)?;
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        Ok(content)
    }
}

/// Parts to change in the package.
#[derive(Debug, Default)]
pub struct PackageEdits {
    pub parts: BTreeMap<String, Vec<u8>>,
}

impl PackageEdits {
    pub fn set(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.parts.insert(name.into(), content.into());
    }
}

fn attr(e: &BytesStart<'_>, matches: impl Fn(&[u8]) -> bool) -> PkgResult<Option<String>> {
    for a in e.attributes() {
        let a = a?;
        if matches(a.key.as_ref()) {
            return Ok(Some(a.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// `<sheet>` entries of workbook.xml.
#[derive(Debug, Clone)]
pub struct SheetEntry {
    pub name: String,
    pub sheet_id: u32,
    pub rel_id: String,
}

/// Sheet list and the qualified name used for the relationship id attribute.
pub struct WorkbookSheets {
    pub sheets: Vec<SheetEntry>,
    pub rel_attr: String,
}

fn is_rel_id(key: &[u8]) -> bool {
    key.ends_with(b":id")
}

pub fn read_sheets(workbook_xml: &str) -> PkgResult<WorkbookSheets> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut sheets = Vec::new();
    let mut rel_attr = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, |k| k == b"name")?.unwrap_or_default();
                let sheet_id = attr(&e, |k| k == b"sheetId")?
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                let mut rel_id = String::new();
                for a in e.attributes() {
                    let a = a?;
                    if is_rel_id(a.key.as_ref()) {
                        rel_attr.get_or_insert_with(|| {
                            String::from_utf8_lossy(a.key.as_ref()).into_owned()
                        });
                        rel_id = a.unescape_value()?.into_owned();
                    }
                }
                sheets.push(SheetEntry {
                    name,
                    sheet_id,
                    rel_id,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(WorkbookSheets {
        sheets,
        rel_attr: rel_attr.unwrap_or_else(|| "r:id".to_string()),
    })
}

/// Relationship id → part path inside the package.
pub fn read_relationships(rels_xml: &str) -> PkgResult<BTreeMap<String, String>> {
    let mut reader = Reader::from_str(rels_xml);
    let mut rels = BTreeMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attr(&e, |k| k == b"Id")?, attr(&e, |k| k == b"Target")?)
                {
                    rels.insert(id, resolve_target(&target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => {
            let mut parts: Vec<&str> = vec!["xl"];
            for seg in target.split('/') {
                match seg {
                    ".." => {
                        parts.pop();
                    }
                    "." | "" => {}
                    s => parts.push(s),
                }
            }
            parts.join("/")
        }
    }
}

// ============================================================================
// Sheet creation
// ============================================================================

/// Parts added or rewritten to register a new worksheet.
pub struct NewSheet {
    pub part: String,
    pub workbook_xml: Vec<u8>,
    pub rels_xml: Vec<u8>,
    pub content_types_xml: Vec<u8>,
}

/// Register a new worksheet called `name` in the workbook.
pub fn add_sheet(
    package: &Package,
    name: &str,
    workbook_xml: &str,
    rels_xml: &str,
    content_types_xml: &str,
) -> PkgResult<NewSheet> {
    let sheets = read_sheets(workbook_xml)?;
    let rels = read_relationships(rels_xml)?;

    let index = (1..)
        .find(|n| !package.contains(&format!("xl/worksheets/sheet{n}.xml")))
        .unwrap_or(1);
    let part = format!("xl/worksheets/sheet{index}.xml");
    let rel_id = (1..)
        .map(|n| format!("rId{n}"))
        .find(|id| !rels.contains_key(id))
        .unwrap_or_else(|| "rIdLithology".to_string());
    let sheet_id = sheets.sheets.iter().map(|s| s.sheet_id).max().unwrap_or(0) + 1;

    let mut sheet = BytesStart::new("sheet");
    sheet.push_attribute(("name", name));
    sheet.push_attribute(("sheetId", sheet_id.to_string().as_str()));
    sheet.push_attribute((sheets.rel_attr.as_str(), rel_id.as_str()));

    let mut rel = BytesStart::new("Relationship");
    rel.push_attribute(("Id", rel_id.as_str()));
    rel.push_attribute(("Type", WORKSHEET_REL_TYPE));
    rel.push_attribute(("Target", format!("worksheets/sheet{index}.xml").as_str()));

    let mut override_ct = BytesStart::new("Override");
    override_ct.push_attribute(("PartName", format!("/{part}").as_str()));
    override_ct.push_attribute(("ContentType", WORKSHEET_CONTENT_TYPE));

    Ok(NewSheet {
        workbook_xml: append_child(workbook_xml, b"sheets", sheet)?,
        rels_xml: append_child(rels_xml, b"Relationships", rel)?,
        content_types_xml: append_child(content_types_xml, b"Types", override_ct)?,
        part,
    })
}

/// Insert `child` as the last element of the first `parent` element.
fn append_child(xml: &str, parent: &[u8], mut child: BytesStart<'_>) -> PkgResult<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256));
    let mut done = false;
    loop {
        match reader.read_event()? {
            Event::End(e) if !done && e.local_name().as_ref() == parent => {
                child = with_prefix(child, e.name().as_ref());
                writer.write_event(Event::Empty(child.borrow()))?;
                writer.write_event(Event::End(e))?;
                done = true;
            }
            Event::Empty(e) if !done && e.local_name().as_ref() == parent => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                child = with_prefix(child, name.as_bytes());
                writer.write_event(Event::Start(e))?;
                writer.write_event(Event::Empty(child.borrow()))?;
                writer.write_event(Event::End(BytesEnd::new(name)))?;
                done = true;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }
    if !done {
        return Err(PackageError::Structure(format!(
            "element <{}> not found",
            String::from_utf8_lossy(parent)
        )));
    }
    Ok(writer.into_inner())
}

/// Give `child` the namespace prefix its parent uses, if any.
fn with_prefix<'a>(child: BytesStart<'a>, parent_qname: &[u8]) -> BytesStart<'a> {
    let parent = String::from_utf8_lossy(parent_qname);
    match parent.rsplit_once(':') {
        Some((prefix, _)) => {
            let local = String::from_utf8_lossy(child.name().as_ref()).into_owned();
            let mut renamed = BytesStart::new(format!("{prefix}:{local}"));
            renamed.extend_attributes(child.attributes().flatten());
            renamed
        }
        None => child,
    }
}

// ============================================================================
// Writing
// ============================================================================

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook.xlsx".to_string());
    path.with_file_name(format!(".{file_name}.earthworm-tmp"))
}

/// Rewrite the package at `path` with `edits` applied, via a temporary
/// sibling file renamed into place. On failure the temporary is removed and
/// `path` is left as it was.
pub fn write_package(path: &Path, edits: &PackageEdits) -> PkgResult<()> {
    let tmp = temp_sibling(path);
    let result = write_to(path, &tmp, edits).and_then(|()| Ok(fs::rename(&tmp, path)?));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_to(src: &Path, dst: &Path, edits: &PackageEdits) -> PkgResult<()> {
    let mut archive = ZipArchive::new(File::open(src)?)?;
    let mut writer = ZipWriter::new(File::create(dst)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut written: HashSet<String> = HashSet::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name().to_string();
        match edits.parts.get(&name) {
            Some(content) => {
                drop(entry);
                writer.start_file(name.as_str(), options)?;
                writer.write_all(content)?;
            }
            None => writer.raw_copy_file(entry)?,
        }
        written.insert(name);
    }
    for (name, content) in &edits.parts {
        if !written.contains(name) {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(content)?;
        }
    }
    writer.finish()?.sync_all()?;
    Ok(())
}
