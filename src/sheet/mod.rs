//! # Sheet Writing Module
//!
//! Batched, streaming writer for multi-sheet workbooks.
//!
//! [`SheetWriter`] owns the sheets of one workbook. Each sheet is created
//! with frozen headers; records are buffered per sheet and streamed to a
//! [`SpreadsheetBackend`] in batches. The backend decides how rows are
//! encoded:
//!
//! - [`XlsxBackend`]: spools rows to temporary files and packages an XLSX
//!   workbook on save
//! - [`MemoryBackend`]: keeps everything in memory for inspection
//!
//! The header row (row 1) is bold with a light gray fill. Data rows start at
//! row 2, every header column gets the configured width on close.

mod backend;
mod config;
mod error;
mod memory;
mod stats;
mod writer;
pub mod xlsx;


pub use backend::{SheetSink, SpreadsheetBackend, HEADER_FILL_COLOR, HEADER_ROW};
pub use config::{WriterConfig, DEFAULT_BATCH_SIZE, DEFAULT_COLUMN_WIDTH};
pub use error::SheetError;
pub use memory::{MemoryBackend, MemorySheet, MemoryWorkbook, SavedWorkbook};
pub use stats::{SheetStats, WriterStats};
pub use writer::{validate_sheet_name, BufferedSheet, SheetWriter, MAX_SHEET_NAME_LEN};
pub use xlsx::{XlsxBackend, XlsxSheet};
