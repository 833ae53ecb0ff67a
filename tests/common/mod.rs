#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use zip::{ZipWriter, write::SimpleFileOptions};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

const WORKBOOK_NS: &str = concat!(
    r#"xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#,
);
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const WORKSHEET_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";

/// Minimal XLSX package. `sheets` are listed in workbook order as
/// (relationship id, part name under `xl/worksheets/`, sheet XML body).
pub fn xlsx(sheets: &[(&str, &str, &str)], shared_strings: &[&str]) -> Vec<u8> {
    xlsx_styled(sheets, shared_strings, None)
}

/// Same as [`xlsx`], plus an `xl/styles.xml` holding `styles` as the body of
/// its `<styleSheet>`.
pub fn xlsx_styled(
    sheets: &[(&str, &str, &str)],
    shared_strings: &[&str],
    styles: Option<&str>,
) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let sheet_entries = sheets
        .iter()
        .enumerate()
        .map(|(idx, (rel_id, _, _))| {
            format!(r#"<sheet name="Sheet{0}" sheetId="{0}" r:id="{rel_id}"/>"#, idx + 1)
        })
        .collect::<String>();
    let workbook =
        format!("{XML_DECL}<workbook {WORKBOOK_NS}><sheets>{sheet_entries}</sheets></workbook>");
    add(&mut zip, "xl/workbook.xml", &workbook, options);

    let relationships = sheets
        .iter()
        .map(|(rel_id, part, _)| {
            format!(
                r#"<Relationship Id="{rel_id}" Type="{WORKSHEET_REL}" Target="worksheets/{part}"/>"#
            )
        })
        .collect::<String>();
    let rels = format!(
        r#"{XML_DECL}<Relationships xmlns="{}">{relationships}</Relationships>"#,
        "http://schemas.openxmlformats.org/package/2006/relationships"
    );
    add(&mut zip, "xl/_rels/workbook.xml.rels", &rels, options);

    if !shared_strings.is_empty() {
        let items = shared_strings
            .iter()
            .map(|s| format!("<si><t>{s}</t></si>"))
            .collect::<String>();
        let sst = format!(
            r#"{XML_DECL}<sst {WORKBOOK_NS} count="{0}" uniqueCount="{0}">{items}</sst>"#,
            shared_strings.len()
        );
        add(&mut zip, "xl/sharedStrings.xml", &sst, options);
    }

    if let Some(styles) = styles {
        let styles = format!("{XML_DECL}<styleSheet {WORKBOOK_NS}>{styles}</styleSheet>");
        add(&mut zip, "xl/styles.xml", &styles, options);
    }

    for (_, part, body) in sheets {
        let sheet =
            format!("{XML_DECL}<worksheet {WORKBOOK_NS}><sheetData>{body}</sheetData></worksheet>");
        add(&mut zip, &format!("xl/worksheets/{part}"), &sheet, options);
    }

    zip.finish().expect("finish xlsx").into_inner()
}

fn add(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    contents: &str,
    options: SimpleFileOptions,
) {
    zip.start_file(name, options).expect("start zip entry");
    zip.write_all(contents.as_bytes()).expect("write zip entry");
}
