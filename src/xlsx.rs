//! XLSX reader for the first worksheet of a workbook.
//!
//! Cells come back as display text: shared and inline strings are resolved,
//! booleans become `TRUE`/`FALSE`, and numbers styled with a date or time
//! format become ISO 8601 text. Other numbers keep their stored
//! representation.

use std::{
    collections::HashMap,
    io::{BufRead, Cursor, Read, Seek},
};

use quick_xml::{
    Reader,
    escape::resolve_xml_entity,
    events::{BytesRef, BytesStart, Event},
};
use zip::ZipArchive;

use crate::{decode::Grid, error::DecodeError, number_format::CellFormat};

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const STYLES: &str = "xl/styles.xml";

/// Largest row number a worksheet can hold.
const MAX_ROWS: usize = 1_048_576;
/// Largest column number a worksheet can hold (`XFD`).
const MAX_COLUMNS: usize = 16_384;

/// Read the first worksheet in workbook order. `Ok(None)` means the workbook
/// declares no worksheets at all.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Option<Grid>, DecodeError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;

    let workbook = read_part(&mut zip, WORKBOOK)?
        .ok_or_else(|| DecodeError::MissingPart(WORKBOOK.to_string()))?;
    let workbook = load_workbook(&workbook)?;
    let Some(sheet_id) = workbook.first_sheet else {
        return Ok(None);
    };

    let rels = read_part(&mut zip, WORKBOOK_RELS)?
        .ok_or_else(|| DecodeError::MissingPart(WORKBOOK_RELS.to_string()))?;
    let targets = load_relationships(&rels)?;
    let sheet_path = targets
        .get(&sheet_id)
        .cloned()
        .ok_or_else(|| DecodeError::MissingPart(format!("relationship {sheet_id}")))?;

    let shared_strings = match read_part(&mut zip, SHARED_STRINGS)? {
        Some(xml) => load_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let formats = match read_part(&mut zip, STYLES)? {
        Some(xml) => load_cell_formats(&xml)?,
        None => Vec::new(),
    };
    let styles = Styles {
        formats,
        date1904: workbook.date1904,
    };

    let sheet = read_part(&mut zip, &sheet_path)?
        .ok_or_else(|| DecodeError::MissingPart(sheet_path.clone()))?;
    read_cells(&sheet, &shared_strings, &styles).map(Some)
}

struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    fn new(inner: R) -> Self {
        let mut reader = Reader::from_reader(inner);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);
        Self {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    fn next(&mut self) -> Result<Option<Event<'_>>, DecodeError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

/// Archive member by name, ignoring case and path separator style.
fn read_part<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, DecodeError> {
    let wanted = name.replace('\\', "/");
    let found = zip
        .file_names()
        .find(|file_name| wanted.eq_ignore_ascii_case(file_name))
        .map(str::to_owned);
    let Some(path) = found else {
        return Ok(None);
    };
    let mut file = zip.by_name(&path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

fn attribute(event: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>, DecodeError> {
    for attribute in event.attributes() {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == local_name {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[derive(Debug, Default)]
struct Workbook {
    /// Relationship id of the first `<sheet>`.
    first_sheet: Option<String>,
    date1904: bool,
}

fn load_workbook(xml: &[u8]) -> Result<Workbook, DecodeError> {
    let mut reader = XmlReader::new(xml);
    let mut workbook = Workbook::default();
    while let Some(event) = reader.next()? {
        let Event::Start(start) = event else {
            continue;
        };
        match start.local_name().as_ref() {
            b"workbookPr" => {
                workbook.date1904 = attribute(&start, b"date1904")?
                    .is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true"));
            }
            b"sheet" if workbook.first_sheet.is_none() => {
                let id = attribute(&start, b"id")?.ok_or_else(|| {
                    DecodeError::MissingPart("sheet relationship id".to_string())
                })?;
                workbook.first_sheet = Some(id);
            }
            _ => {}
        }
    }
    Ok(workbook)
}

fn load_relationships(xml: &[u8]) -> Result<HashMap<String, String>, DecodeError> {
    let mut reader = XmlReader::new(xml);
    let mut targets = HashMap::new();
    while let Some(event) = reader.next()? {
        if let Event::Start(start) = event {
            if start.local_name().as_ref() == b"Relationship" {
                let id = attribute(&start, b"Id")?;
                let target = attribute(&start, b"Target")?;
                if let Some((id, target)) = id.zip(target) {
                    targets.insert(id, to_zip_path(&target));
                }
            }
        }
    }
    Ok(targets)
}

/// Relationship targets are relative to `xl/` unless they start with `/`.
fn to_zip_path(target: &str) -> String {
    let target = target.replace('\\', "/");
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

/// Display format of every cell style, indexed by the `s` attribute of `<c>`.
fn load_cell_formats(xml: &[u8]) -> Result<Vec<CellFormat>, DecodeError> {
    let mut reader = XmlReader::new(xml);
    let mut custom = HashMap::new();
    let mut style_format_ids = Vec::new();
    let mut in_cell_styles = false;

    while let Some(event) = reader.next()? {
        match event {
            Event::Start(start) => match start.local_name().as_ref() {
                b"numFmt" => {
                    let id = attribute(&start, b"numFmtId")?;
                    let code = attribute(&start, b"formatCode")?;
                    if let Some((id, code)) = id.zip(code) {
                        if let Ok(id) = id.trim().parse::<u32>() {
                            custom.insert(id, CellFormat::parse_custom(&code));
                        }
                    }
                }
                b"cellXfs" => in_cell_styles = true,
                b"xf" if in_cell_styles => {
                    let id = attribute(&start, b"numFmtId")?
                        .and_then(|id| id.trim().parse::<u32>().ok())
                        .unwrap_or(0);
                    style_format_ids.push(id);
                }
                _ => {}
            },
            Event::End(end) if end.local_name().as_ref() == b"cellXfs" => in_cell_styles = false,
            _ => {}
        }
    }

    Ok(style_format_ids
        .into_iter()
        .map(|id| custom.get(&id).copied().unwrap_or_else(|| CellFormat::builtin(id)))
        .collect())
}

#[derive(Debug, Default)]
struct Styles {
    formats: Vec<CellFormat>,
    date1904: bool,
}

impl Styles {
    /// Unknown or malformed style indexes fall back to the general format.
    fn format(&self, style: Option<&str>) -> CellFormat {
        style
            .and_then(|s| s.trim().parse::<usize>().ok())
            .and_then(|idx| self.formats.get(idx).copied())
            .unwrap_or_default()
    }
}

fn push_reference(text: &mut String, reference: &BytesRef<'_>) -> Result<(), DecodeError> {
    let raw = reference.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse::<u32>(),
        }
        .map_err(|_| DecodeError::Entity(raw.to_string()))?;
        if let Some(character) = char::from_u32(code) {
            text.push(character);
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        text.push_str(entity);
    } else {
        return Err(DecodeError::Entity(raw.to_string()));
    }
    Ok(())
}

/// Shared string table. Phonetic runs (`rPh`) are skipped.
fn load_shared_strings(xml: &[u8]) -> Result<Vec<String>, DecodeError> {
    let mut reader = XmlReader::new(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    while let Some(event) = reader.next()? {
        match event {
            Event::Start(start) => match start.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"rPh" => phonetic_depth += 1,
                b"t" if in_item && phonetic_depth == 0 => in_text = true,
                _ => {}
            },
            Event::End(end) => match end.local_name().as_ref() {
                b"si" => {
                    in_item = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(text) if in_text => current.push_str(&text.xml_content()?),
            Event::CData(data) if in_text => current.push_str(&data.xml_content()?),
            Event::GeneralRef(reference) if in_text => {
                push_reference(&mut current, &reference)?
            }
            _ => {}
        }
    }
    Ok(strings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Number,
    SharedString,
    InlineString,
    Boolean,
    Other,
}

impl CellKind {
    fn from_attribute(value: Option<&str>) -> Self {
        match value {
            None | Some("n") => CellKind::Number,
            Some("s") => CellKind::SharedString,
            Some("inlineStr") => CellKind::InlineString,
            Some("b") => CellKind::Boolean,
            Some(_) => CellKind::Other,
        }
    }
}

fn read_cells(
    xml: &[u8],
    shared_strings: &[String],
    styles: &Styles,
) -> Result<Grid, DecodeError> {
    let mut reader = XmlReader::new(xml);
    let mut grid = Grid::new();

    let mut next_row = 0usize;
    let mut current_row = 0usize;
    let mut next_col = 0usize;
    let mut position = (0usize, 0usize);
    let mut kind = CellKind::Number;
    let mut format = CellFormat::General;
    let mut value = String::new();
    let mut in_value = false;
    let mut in_inline = false;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    while let Some(event) = reader.next()? {
        match event {
            Event::Start(start) => match start.local_name().as_ref() {
                b"row" => {
                    current_row = match attribute(&start, b"r")? {
                        Some(r) => row_number_to_index(&r).ok_or(DecodeError::CellReference(r))?,
                        None if next_row < MAX_ROWS => next_row,
                        None => {
                            let row = format!("row {}", next_row + 1);
                            return Err(DecodeError::CellReference(row));
                        }
                    };
                    next_row = current_row + 1;
                    next_col = 0;
                }
                b"c" => {
                    position = match attribute(&start, b"r")? {
                        Some(reference) => reference_to_index(&reference)
                            .ok_or(DecodeError::CellReference(reference))?,
                        None if next_col < MAX_COLUMNS => (current_row, next_col),
                        None => {
                            return Err(DecodeError::CellReference(format!(
                                "column {} of row {}",
                                next_col + 1,
                                current_row + 1
                            )));
                        }
                    };
                    next_col = position.1 + 1;
                    kind = CellKind::from_attribute(attribute(&start, b"t")?.as_deref());
                    format = styles.format(attribute(&start, b"s")?.as_deref());
                    value.clear();
                }
                b"v" => in_value = true,
                b"is" => in_inline = true,
                b"rPh" => phonetic_depth += 1,
                b"t" if in_inline && phonetic_depth == 0 => in_text = true,
                _ => {}
            },
            Event::End(end) => match end.local_name().as_ref() {
                b"v" => in_value = false,
                b"is" => in_inline = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                b"c" => {
                    let resolved =
                        resolve_value(kind, format, &value, shared_strings, styles.date1904)?;
                    if !resolved.is_empty() {
                        place(&mut grid, position, resolved);
                    }
                    value.clear();
                }
                _ => {}
            },
            Event::Text(text) if in_value || in_text => value.push_str(&text.xml_content()?),
            Event::CData(data) if in_value || in_text => value.push_str(&data.xml_content()?),
            Event::GeneralRef(reference) if in_value || in_text => {
                push_reference(&mut value, &reference)?
            }
            _ => {}
        }
    }
    Ok(grid)
}

fn resolve_value(
    kind: CellKind,
    format: CellFormat,
    raw: &str,
    shared_strings: &[String],
    date1904: bool,
) -> Result<String, DecodeError> {
    let resolved = match kind {
        CellKind::SharedString => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(String::new());
            }
            let index = trimmed
                .parse::<usize>()
                .map_err(|_| DecodeError::CellReference(raw.to_string()))?;
            shared_strings
                .get(index)
                .cloned()
                .ok_or(DecodeError::SharedString(index))?
        }
        CellKind::Boolean => match raw.trim() {
            "" => String::new(),
            "0" => "FALSE".to_string(),
            _ => "TRUE".to_string(),
        },
        CellKind::Number => format
            .render(raw, date1904)
            .unwrap_or_else(|| raw.to_string()),
        CellKind::InlineString | CellKind::Other => raw.to_string(),
    };
    Ok(resolved)
}

/// Positions come from validated references, so the grid never grows past
/// the worksheet limits.
fn place(grid: &mut Grid, (row, col): (usize, usize), value: String) {
    if grid.len() <= row {
        grid.resize_with(row + 1, Vec::new);
    }
    let cells = &mut grid[row];
    if cells.len() <= col {
        cells.resize(col + 1, String::new());
    }
    cells[col] = value;
}

/// `"12"` -> `11`. Rows outside the worksheet are rejected.
fn row_number_to_index(number: &str) -> Option<usize> {
    number
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|row| (1..=MAX_ROWS).contains(row))
        .map(|row| row - 1)
}

/// `"B12"` -> `(11, 1)`: zero-based row and column.
fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.trim().replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters.chars().try_fold(0usize, |acc, c| {
        let col = acc * 26 + (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        (col <= MAX_COLUMNS).then_some(col)
    })?;
    let row = row_number_to_index(digits)?;
    Some((row, col - 1))
}
