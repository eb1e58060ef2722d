use std::path::Path;

use super::SheetError;

/// Background color of the header row (RGB hex)
pub const HEADER_FILL_COLOR: &str = "E0E0E0";

/// Row index of the header row; data rows follow it
pub const HEADER_ROW: u32 = 1;

/// One sheet of a workbook under construction.
///
/// Row indices are 1-based. Writing a row index that was already written is
/// idempotent: backends must not produce a duplicate row for it.
pub trait SheetSink: Send {
    /// Sheet name as shown in the workbook
    fn name(&self) -> &str;

    /// Write the styled header row at [`HEADER_ROW`]
    fn write_header(&mut self, headers: &[String]) -> Result<(), SheetError>;

    /// Stream one data row; empty strings are blank cells
    fn stream_row(&mut self, row_index: u32, cells: &[&str]) -> Result<(), SheetError>;

    /// Set the width of a 0-based column
    fn set_column_width(&mut self, column_index: usize, width: f64) -> Result<(), SheetError>;
}

/// Workbook encoder that the sheet writer streams into.
pub trait SpreadsheetBackend {
    /// Handle for one sheet
    type Sheet: SheetSink;

    /// Add a sheet to the workbook; sheets keep creation order
    fn new_sheet(&mut self, name: &str) -> Result<Self::Sheet, SheetError>;

    /// Persist the workbook with the given sheets, in order
    fn save(self, sheets: Vec<Self::Sheet>, path: &Path) -> Result<(), SheetError>;
}
