use std::fmt;

/// Statistics for one written sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetStats {
    /// Sheet name
    pub name: String,
    /// Number of data columns
    pub columns: usize,
    /// Data rows streamed to the backend (header excluded)
    pub rows_written: usize,
    /// Non-empty flushes performed
    pub flushes: usize,
}

/// Statistics from a closed workbook
#[derive(Debug, Clone, Default)]
pub struct WriterStats {
    /// Per-sheet statistics in creation order
    pub sheets: Vec<SheetStats>,
}

impl WriterStats {
    /// Total data rows across all sheets
    pub fn total_rows(&self) -> usize {
        self.sheets.iter().map(|s| s.rows_written).sum()
    }

    /// Statistics for one sheet
    pub fn sheet(&self, name: &str) -> Option<&SheetStats> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for WriterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} rows in {} sheets",
            self.total_rows(),
            self.sheets.len()
        )?;
        for sheet in &self.sheets {
            write!(f, "\n  {}: {} rows", sheet.name, sheet.rows_written)?;
        }
        Ok(())
    }
}
