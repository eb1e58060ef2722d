//! Streaming XLSX backend.
//!
//! Each worksheet's `<row>` elements are spooled to an anonymous temporary
//! file while rows arrive, so no sheet is ever held in memory. On save the
//! package is assembled as a ZIP archive:
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! xl/workbook.xml
//! xl/_rels/workbook.xml.rels
//! xl/styles.xml
//! xl/worksheets/sheet{N}.xml   (prefix + spooled rows + suffix)
//! ```
//!
//! Column widths live in the worksheet prefix, which is only written at save
//! time; that is why widths can still be set after all rows were streamed.
//! Cells are written as inline strings, so no shared-string table is kept.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;
use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::backend::{SheetSink, SpreadsheetBackend, HEADER_FILL_COLOR, HEADER_ROW};
use super::SheetError;

/// Largest row index a worksheet can hold
pub const MAX_ROWS: u32 = 1_048_576;

/// Cell style index of the bold, shaded header style in `styles.xml`
const HEADER_STYLE: u32 = 1;

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// XLSX workbook encoder
#[derive(Debug, Clone)]
pub struct XlsxBackend {
    compression: CompressionMethod,
}

impl Default for XlsxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxBackend {
    /// Backend producing Deflate-compressed packages
    pub fn new() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
        }
    }

    /// Backend with an explicit ZIP compression method
    pub fn with_compression(compression: CompressionMethod) -> Self {
        Self { compression }
    }
}

/// One worksheet being spooled to a temporary file
pub struct XlsxSheet {
    name: String,
    spool: BufWriter<File>,
    last_row: u32,
    max_columns: usize,
    widths: BTreeMap<usize, f64>,
}

impl XlsxSheet {
    fn write_cells<'a>(
        &mut self,
        row_index: u32,
        cells: impl Iterator<Item = &'a str>,
        style: Option<u32>,
    ) -> Result<(), SheetError> {
        if row_index <= self.last_row {
            debug!(
                "Row {} of sheet {} already written, skipping",
                row_index, self.name
            );
            return Ok(());
        }
        if row_index > MAX_ROWS {
            return Err(SheetError::RowLimitExceeded {
                sheet: self.name.clone(),
                max: MAX_ROWS,
            });
        }

        let mut xml = String::with_capacity(256);
        let _ = write!(xml, r#"<row r="{}">"#, row_index);
        let mut columns = 0;
        for (column, value) in cells.enumerate() {
            columns = column + 1;
            if value.is_empty() {
                continue;
            }
            let reference = cell_reference(column, row_index);
            match style {
                Some(style) => {
                    let _ = write!(xml, r#"<c r="{}" s="{}" t="inlineStr">"#, reference, style);
                }
                None => {
                    let _ = write!(xml, r#"<c r="{}" t="inlineStr">"#, reference);
                }
            }
            let _ = write!(xml, "<is><t>{}</t></is></c>", escape(&*xml_text(value)));
        }
        xml.push_str("</row>");

        self.spool.write_all(xml.as_bytes())?;
        self.last_row = row_index;
        self.max_columns = self.max_columns.max(columns);
        Ok(())
    }

    /// Write the complete worksheet part to `out`
    fn write_part<W: Write>(self, out: &mut W, selected: bool) -> Result<(), SheetError> {
        let mut spool = self.spool.into_inner().map_err(io::IntoInnerError::into_error)?;
        spool.seek(SeekFrom::Start(0))?;

        let mut prefix = String::with_capacity(512);
        prefix.push_str(XML_DECLARATION);
        let _ = write!(
            prefix,
            r#"<worksheet xmlns="{}" xmlns:r="{}">"#,
            SPREADSHEET_NS, RELATIONSHIPS_NS
        );
        if self.last_row > 0 && self.max_columns > 0 {
            let _ = write!(
                prefix,
                r#"<dimension ref="A1:{}"/>"#,
                cell_reference(self.max_columns - 1, self.last_row)
            );
        }
        prefix.push_str("<sheetViews><sheetView ");
        if selected {
            prefix.push_str(r#"tabSelected="1" "#);
        }
        prefix.push_str(r#"workbookViewId="0"/></sheetViews>"#);
        prefix.push_str(r#"<sheetFormatPr defaultRowHeight="15"/>"#);
        if !self.widths.is_empty() {
            prefix.push_str("<cols>");
            for (column, width) in &self.widths {
                let _ = write!(
                    prefix,
                    r#"<col min="{0}" max="{0}" width="{1}" customWidth="1"/>"#,
                    column + 1,
                    width
                );
            }
            prefix.push_str("</cols>");
        }
        prefix.push_str("<sheetData>");

        out.write_all(prefix.as_bytes())?;
        io::copy(&mut spool, out)?;
        out.write_all(b"</sheetData></worksheet>")?;
        Ok(())
    }
}

impl SheetSink for XlsxSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_header(&mut self, headers: &[String]) -> Result<(), SheetError> {
        self.write_cells(
            HEADER_ROW,
            headers.iter().map(String::as_str),
            Some(HEADER_STYLE),
        )
    }

    fn stream_row(&mut self, row_index: u32, cells: &[&str]) -> Result<(), SheetError> {
        self.write_cells(row_index, cells.iter().copied(), None)
    }

    fn set_column_width(&mut self, column_index: usize, width: f64) -> Result<(), SheetError> {
        self.widths.insert(column_index, width);
        Ok(())
    }
}

impl SpreadsheetBackend for XlsxBackend {
    type Sheet = XlsxSheet;

    fn new_sheet(&mut self, name: &str) -> Result<XlsxSheet, SheetError> {
        let spool = tempfile::tempfile()?;
        Ok(XlsxSheet {
            name: name.to_owned(),
            spool: BufWriter::new(spool),
            last_row: 0,
            max_columns: 0,
            widths: BTreeMap::new(),
        })
    }

    fn save(self, sheets: Vec<XlsxSheet>, path: &Path) -> Result<(), SheetError> {
        let names: Vec<String> = sheets.iter().map(|s| s.name.clone()).collect();

        let file = File::create(path)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = SimpleFileOptions::default().compression_method(self.compression);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(content_types_xml(names.len()).as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(root_rels_xml().as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(workbook_xml(&names).as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(workbook_rels_xml(names.len()).as_bytes())?;

        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(styles_xml().as_bytes())?;

        for (position, sheet) in sheets.into_iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", position + 1), options)?;
            sheet.write_part(&mut zip, position == 0)?;
        }

        let mut inner = zip.finish()?;
        inner.flush()?;
        debug!("Wrote XLSX package with {} sheets to {}", names.len(), path.display());
        Ok(())
    }
}

/// Convert a 0-based column index to its letter name (0=A, 25=Z, 26=AA)
pub fn column_letter(column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column;
    loop {
        letters.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// A1-style reference of a 0-based column and 1-based row
pub fn cell_reference(column: usize, row: u32) -> String {
    format!("{}{}", column_letter(column), row)
}

/// Drop characters XML 1.0 cannot carry (C0 controls other than tab, LF and
/// CR, plus U+FFFE and U+FFFF). Escaping cannot represent them either.
fn xml_text(value: &str) -> Cow<'_, str> {
    if value.chars().all(is_xml_char) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(value.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECLARATION);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    for sheet in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            sheet
        );
    }
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    xml.push_str("</Types>");
    xml
}

fn root_rels_xml() -> String {
    format!(
        r#"{}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
        XML_DECLARATION, RELATIONSHIPS_NS
    )
}

fn workbook_xml(names: &[String]) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str(XML_DECLARATION);
    let _ = write!(
        xml,
        r#"<workbook xmlns="{}" xmlns:r="{}">"#,
        SPREADSHEET_NS, RELATIONSHIPS_NS
    );
    xml.push_str(r#"<bookViews><workbookView activeTab="0"/></bookViews><sheets>"#);
    for (position, name) in names.iter().enumerate() {
        let _ = write!(
            xml,
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(name.as_str()),
            position + 1,
            position + 1
        );
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str(XML_DECLARATION);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    for sheet in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{0}" Type="{1}/worksheet" Target="worksheets/sheet{0}.xml"/>"#,
            sheet, RELATIONSHIPS_NS
        );
    }
    let _ = write!(
        xml,
        r#"<Relationship Id="rId{}" Type="{}/styles" Target="styles.xml"/>"#,
        sheet_count + 1,
        RELATIONSHIPS_NS
    );
    xml.push_str("</Relationships>");
    xml
}

fn styles_xml() -> String {
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECLARATION);
    let _ = write!(xml, r#"<styleSheet xmlns="{}">"#, SPREADSHEET_NS);
    xml.push_str(concat!(
        r#"<fonts count="2">"#,
        r#"<font><sz val="11"/><name val="Calibri"/></font>"#,
        r#"<font><b/><sz val="11"/><name val="Calibri"/></font>"#,
        r#"</fonts>"#,
    ));
    let _ = write!(
        xml,
        concat!(
            r#"<fills count="3">"#,
            r#"<fill><patternFill patternType="none"/></fill>"#,
            r#"<fill><patternFill patternType="gray125"/></fill>"#,
            r#"<fill><patternFill patternType="solid"><fgColor rgb="FF{}"/><bgColor indexed="64"/></patternFill></fill>"#,
            r#"</fills>"#,
        ),
        HEADER_FILL_COLOR
    );
    xml.push_str(concat!(
        r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
        r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
        r#"<cellXfs count="2">"#,
        r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
        r#"<xf numFmtId="0" fontId="1" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1"/>"#,
        r#"</cellXfs>"#,
        r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
        r#"</styleSheet>"#,
    ));
    xml
}
