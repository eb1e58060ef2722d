//! # xml2sheet - Streaming XML to Spreadsheet Conversion
//!
//! `xml2sheet` converts arbitrarily large XML documents into XLSX workbooks
//! without materializing the document in memory.
//!
//! ## Conversion Modes
//!
//! - **Generic flattening**: the element that repeats most often below the
//!   root becomes one row, its direct children become columns. Columns are
//!   sampled from the leading rows and sorted.
//!
//! - **CMSIS-SVD extraction**: peripherals, registers and fields are written
//!   to three linked sheets. Every entity carries a synthetic id (`P0000`,
//!   `R0000`, `F0000`) and copies of its parents' ids and names.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  bounded channel   ┌──────────────┐   batches   ┌──────────┐
//! │ XML producer │ ──── Record ─────▶ │ BufferedSheet│ ──────────▶ │ backend  │
//! │   thread     │ ◀── error slot ─── │  consumer(s) │             │  (XLSX)  │
//! └──────────────┘                    └──────────────┘             └──────────┘
//! ```
//!
//! The parser can never run further ahead of the writer than the channel
//! capacity, which bounds memory regardless of document size.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xml2sheet::converter::XmlConverter;
//!
//! let converter = XmlConverter::new();
//! let stats = converter.convert("catalog.xml", "catalog.xlsx")?;
//! println!("{}", stats);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod converter;
pub mod format;
pub mod sheet;
pub mod xml;

/// One row of tabular data: column name to cell text.
///
/// A missing key renders as a blank cell; keys that are not part of a sheet's
/// headers are dropped when the row is written.
pub type Record = std::collections::HashMap<String, String>;

pub use converter::{
    ConversionConfig, ConversionError, ConversionStats, DocumentSummary, XmlConverter,
};
pub use format::InputFormat;
