//! # xml2sheet
//!
//! A command-line tool for converting large XML documents to XLSX workbooks.
//!
//! ## Supported Input Formats
//!
//! - **Generic XML**: the most frequent element below the root becomes a row
//! - **CMSIS-SVD**: peripherals, registers and fields in three linked sheets
//!
//! ## Usage
//!
//! ```bash
//! # Convert, output defaults to catalog.xlsx
//! xml2sheet convert catalog.xml
//!
//! # Show the detected row element and columns
//! xml2sheet detect catalog.xml
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
