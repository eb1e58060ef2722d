/// Errors that can occur while writing sheets
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    /// I/O error while spooling rows or saving the workbook
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the ZIP packager
    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// A row was written to a sheet that was never created
    #[error("Sheet not found: {0}")]
    UnknownSheet(String),

    /// A sheet with this name already exists in the workbook
    #[error("Sheet already exists: {0}")]
    DuplicateSheet(String),

    /// The name cannot be used as a worksheet name
    #[error("Invalid sheet name {name:?}: {reason}")]
    InvalidSheetName {
        /// Rejected name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// The sheet has no room for more rows
    #[error("Sheet {sheet} exceeds the maximum of {max} rows")]
    RowLimitExceeded {
        /// Sheet that overflowed
        sheet: String,
        /// Maximum row index supported by the backend
        max: u32,
    },
}
