use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::backend::{SheetSink, SpreadsheetBackend, HEADER_ROW};
use super::config::WriterConfig;
use super::error::SheetError;
use super::stats::{SheetStats, WriterStats};
use crate::Record;

/// Maximum length of a worksheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_NAME_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// One sheet with its frozen headers and pending row buffer.
///
/// Records are rendered in header order when flushed: missing keys become
/// blank cells, keys outside the headers are dropped.
pub struct BufferedSheet<S> {
    sink: S,
    headers: Vec<String>,
    buffer: Vec<Record>,
    batch_size: usize,
    next_row: u32,
    rows_written: usize,
    flushes: usize,
}

impl<S: SheetSink> BufferedSheet<S> {
    fn new(sink: S, headers: Vec<String>, batch_size: usize) -> Self {
        Self {
            sink,
            headers,
            buffer: Vec::with_capacity(batch_size.min(4096)),
            batch_size,
            next_row: HEADER_ROW + 1,
            rows_written: 0,
            flushes: 0,
        }
    }

    /// Sheet name
    pub fn name(&self) -> &str {
        self.sink.name()
    }

    /// Frozen column headers
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Backend handle
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Records waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Data rows already streamed to the backend
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Buffer a record, flushing when the batch is full
    pub fn push(&mut self, record: Record) -> Result<(), SheetError> {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Stream all buffered records to the backend in order.
    ///
    /// Flushing an empty buffer does nothing.
    pub fn flush(&mut self) -> Result<(), SheetError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let count = self.buffer.len();
        for record in self.buffer.drain(..) {
            let cells: Vec<&str> = self
                .headers
                .iter()
                .map(|header| record.get(header).map(String::as_str).unwrap_or(""))
                .collect();
            self.sink.stream_row(self.next_row, &cells)?;
            self.next_row += 1;
            self.rows_written += 1;
        }
        self.flushes += 1;

        debug!(
            "Flushed {} rows to sheet {} ({} total)",
            count,
            self.sink.name(),
            self.rows_written
        );
        Ok(())
    }

    fn stats(&self) -> SheetStats {
        SheetStats {
            name: self.sink.name().to_owned(),
            columns: self.headers.len(),
            rows_written: self.rows_written,
            flushes: self.flushes,
        }
    }
}

/// Batched multi-sheet writer.
///
/// Every sheet is created once with its headers, then receives rows through
/// [`write_row`](Self::write_row). Rows are buffered per sheet and streamed
/// to the backend in batches of [`WriterConfig::batch_size`].
/// [`close`](Self::close) flushes the remainder, sets column widths and
/// saves the workbook once.
///
/// For concurrent consumers, [`sheets_mut`](Self::sheets_mut) hands out
/// independent mutable borrows of every sheet, so one thread per sheet can
/// write without locking.
///
/// # Example
///
/// ```rust,no_run
/// use xml2sheet::sheet::{SheetWriter, WriterConfig, XlsxBackend};
/// use xml2sheet::Record;
///
/// let mut writer = SheetWriter::new(XlsxBackend::new(), "out.xlsx", WriterConfig::default());
/// writer.create_sheet("Sheet1", vec!["name".to_string(), "qty".to_string()])?;
///
/// let mut record = Record::new();
/// record.insert("name".to_string(), "X".to_string());
/// writer.write_row("Sheet1", record)?;
///
/// let stats = writer.close()?;
/// println!("{}", stats);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SheetWriter<B: SpreadsheetBackend> {
    backend: B,
    path: PathBuf,
    config: WriterConfig,
    sheets: Vec<BufferedSheet<B::Sheet>>,
    index: HashMap<String, usize>,
}

impl<B: SpreadsheetBackend> SheetWriter<B> {
    /// Create a writer that will save to `path` on close
    pub fn new<P: AsRef<Path>>(backend: B, path: P, config: WriterConfig) -> Self {
        Self {
            backend,
            path: path.as_ref().to_path_buf(),
            config,
            sheets: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Output path of the workbook
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writer configuration
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Create a sheet and write its header row.
    ///
    /// # Errors
    ///
    /// Fails if the name is already used (ignoring case) or is not a valid worksheet name.
    pub fn create_sheet(&mut self, name: &str, headers: Vec<String>) -> Result<(), SheetError> {
        validate_sheet_name(name)?;
        // Worksheet names are unique regardless of case.
        let folded = name.to_lowercase();
        if self.sheets.iter().any(|sheet| sheet.name().to_lowercase() == folded) {
            return Err(SheetError::DuplicateSheet(name.to_owned()));
        }

        let mut sink = self.backend.new_sheet(name)?;
        sink.write_header(&headers)?;

        debug!("Created sheet {} with {} columns", name, headers.len());
        self.index.insert(name.to_owned(), self.sheets.len());
        self.sheets
            .push(BufferedSheet::new(sink, headers, self.config.batch_size));
        Ok(())
    }

    /// Buffer a row for `sheet`, flushing its batch when full.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::UnknownSheet`] if the sheet was never created,
    /// or a backend error if the flush fails.
    pub fn write_row(&mut self, sheet: &str, record: Record) -> Result<(), SheetError> {
        self.sheet_mut(sheet)?.push(record)
    }

    /// Look up a sheet by name
    pub fn sheet(&self, name: &str) -> Result<&BufferedSheet<B::Sheet>, SheetError> {
        let slot = *self
            .index
            .get(name)
            .ok_or_else(|| SheetError::UnknownSheet(name.to_owned()))?;
        Ok(&self.sheets[slot])
    }

    /// Look up a sheet by name for writing
    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut BufferedSheet<B::Sheet>, SheetError> {
        let slot = *self
            .index
            .get(name)
            .ok_or_else(|| SheetError::UnknownSheet(name.to_owned()))?;
        Ok(&mut self.sheets[slot])
    }

    /// All sheets in creation order, borrowed independently
    pub fn sheets_mut(&mut self) -> &mut [BufferedSheet<B::Sheet>] {
        &mut self.sheets
    }

    /// Flush every sheet's buffer
    pub fn flush_all(&mut self) -> Result<(), SheetError> {
        for sheet in &mut self.sheets {
            sheet.flush()?;
        }
        Ok(())
    }

    /// Flush remaining rows, apply column widths and save the workbook.
    pub fn close(mut self) -> Result<WriterStats, SheetError> {
        self.flush_all()?;

        let width = self.config.column_width;
        for sheet in &mut self.sheets {
            for column in 0..sheet.headers.len() {
                sheet.sink.set_column_width(column, width)?;
            }
        }

        let stats = WriterStats {
            sheets: self.sheets.iter().map(BufferedSheet::stats).collect(),
        };
        let sinks = self.sheets.into_iter().map(|sheet| sheet.sink).collect();
        self.backend.save(sinks, &self.path)?;

        info!("Saved workbook {}", self.path.display());
        Ok(stats)
    }
}

/// Check the worksheet naming rules shared by spreadsheet applications
pub fn validate_sheet_name(name: &str) -> Result<(), SheetError> {
    let invalid = |reason| SheetError::InvalidSheetName {
        name: name.to_owned(),
        reason,
    };

    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(invalid("name is longer than 31 characters"));
    }
    if name.contains(FORBIDDEN_NAME_CHARS) {
        return Err(invalid("name contains one of [ ] : * ? / \\"));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(invalid("name starts or ends with an apostrophe"));
    }
    Ok(())
}
