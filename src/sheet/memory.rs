//! In-memory backend used by tests and by callers that post-process rows.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::backend::{SheetSink, SpreadsheetBackend, HEADER_ROW};
use super::SheetError;

/// A saved sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySheet {
    /// Sheet name
    pub name: String,
    /// Rows by 1-based index; the header is row 1
    pub rows: BTreeMap<u32, Vec<String>>,
    /// Column widths by 0-based index
    pub widths: BTreeMap<usize, f64>,
    /// Number of `stream_row` calls received, including ignored repeats
    pub stream_calls: usize,
}

impl MemorySheet {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    /// Header row, if written
    pub fn header(&self) -> Option<&[String]> {
        self.rows.get(&HEADER_ROW).map(Vec::as_slice)
    }

    /// Data rows in row order
    pub fn data_rows(&self) -> impl Iterator<Item = &Vec<String>> {
        self.rows.range(HEADER_ROW + 1..).map(|(_, row)| row)
    }

    /// Number of data rows
    pub fn data_row_count(&self) -> usize {
        self.data_rows().count()
    }

    /// Cell value by 1-based row and column header name
    pub fn cell(&self, row: u32, header: &str) -> Option<&str> {
        let column = self.header()?.iter().position(|h| h == header)?;
        self.rows.get(&row)?.get(column).map(String::as_str)
    }
}

impl SheetSink for MemorySheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_header(&mut self, headers: &[String]) -> Result<(), SheetError> {
        self.rows.entry(HEADER_ROW).or_insert_with(|| headers.to_vec());
        Ok(())
    }

    fn stream_row(&mut self, row_index: u32, cells: &[&str]) -> Result<(), SheetError> {
        self.stream_calls += 1;
        self.rows
            .entry(row_index)
            .or_insert_with(|| cells.iter().map(|c| (*c).to_owned()).collect());
        Ok(())
    }

    fn set_column_width(&mut self, column_index: usize, width: f64) -> Result<(), SheetError> {
        self.widths.insert(column_index, width);
        Ok(())
    }
}

/// A saved workbook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryWorkbook {
    /// Path the workbook was saved to
    pub path: PathBuf,
    /// Sheets in creation order
    pub sheets: Vec<MemorySheet>,
}

impl MemoryWorkbook {
    /// Sheet by name
    pub fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Sheet names in order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Handle to the workbook a [`MemoryBackend`] saves
#[derive(Debug, Clone, Default)]
pub struct SavedWorkbook {
    slot: Arc<Mutex<Option<MemoryWorkbook>>>,
}

impl SavedWorkbook {
    /// The saved workbook, or `None` if save was never called
    pub fn get(&self) -> Option<MemoryWorkbook> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a workbook was saved
    pub fn is_saved(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Backend that keeps every sheet in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    saved: SavedWorkbook,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that observes the workbook once the writer saves it
    pub fn saved(&self) -> SavedWorkbook {
        self.saved.clone()
    }
}

impl SpreadsheetBackend for MemoryBackend {
    type Sheet = MemorySheet;

    fn new_sheet(&mut self, name: &str) -> Result<MemorySheet, SheetError> {
        Ok(MemorySheet::new(name))
    }

    fn save(self, sheets: Vec<MemorySheet>, path: &Path) -> Result<(), SheetError> {
        let workbook = MemoryWorkbook {
            path: path.to_path_buf(),
            sheets,
        };
        *self
            .saved
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(workbook);
        Ok(())
    }
}
