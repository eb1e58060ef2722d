//! XML to spreadsheet converter
//!
//! This module wires the XML scanners to the sheet writer. A producer thread
//! parses the document and feeds bounded channels; consumers buffer records
//! per sheet and stream them to the backend. Any parse or write error aborts
//! the conversion before the workbook is saved.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::info;

use crate::format::InputFormat;
use crate::sheet::{SheetError, SpreadsheetBackend, WriterConfig, WriterStats, XlsxBackend};
use crate::xml::{
    detect_repeating_element, ExtractionCounts, ParseError, RecordStreamer, RepeatingElement,
    SvdExtractor, DEFAULT_INPUT_BUFFER_SIZE,
};

mod generic;
mod pipeline;
mod svd;


pub use generic::sample_headers;

/// Default name of the single sheet written in generic mode
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Default number of leading records sampled for generic column headers
pub const DEFAULT_HEADER_SAMPLE_SIZE: usize = 128;

/// Default capacity of every record queue
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Errors that can occur during conversion
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The input file could not be opened
    #[error("Cannot open input {path}: {source}")]
    OpenInput {
        /// Input path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Malformed XML, detection failure or read error
    #[error("XML parsing error: {0}")]
    Parse(#[from] ParseError),

    /// Error writing the workbook
    #[error("Writer error: {0}")]
    Sheet(#[from] SheetError),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The sampled records have no non-empty child elements
    #[error("No columns found: the first {sampled} <{element}> elements have no non-empty children")]
    NoColumns {
        /// Repeating element name
        element: String,
        /// Records inspected
        sampled: usize,
    },

    /// A worker thread could not be started
    #[error("Failed to spawn thread {name}: {source}")]
    ThreadSpawn {
        /// Thread name
        name: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked
    #[error("Thread {0} panicked")]
    ThreadPanicked(String),
}

/// Configuration for a conversion
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Read buffer size for the input document
    pub input_buffer_size: usize,

    /// Sheet writer configuration (batch size, column width)
    pub writer_config: WriterConfig,

    /// Leading records inspected to build generic column headers
    pub header_sample_size: usize,

    /// Capacity of every producer/consumer queue
    pub channel_capacity: usize,

    /// Log a progress line every this many rows per sheet (0 disables)
    pub progress_interval: usize,

    /// Sheet name used in generic mode
    pub sheet_name: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            input_buffer_size: DEFAULT_INPUT_BUFFER_SIZE,
            writer_config: WriterConfig::default(),
            header_sample_size: DEFAULT_HEADER_SAMPLE_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            progress_interval: 1000,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

impl ConversionConfig {
    /// Small read buffer and batches
    pub fn low_memory() -> Self {
        Self {
            input_buffer_size: 16 * 1024,
            writer_config: WriterConfig::low_memory(),
            ..Self::default()
        }
    }

    /// Large read buffer and batches
    pub fn throughput() -> Self {
        Self {
            input_buffer_size: 256 * 1024,
            writer_config: WriterConfig::throughput(),
            ..Self::default()
        }
    }

    /// Balanced configuration (default)
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Read buffer capacity actually used; a zero-sized buffer would read
    /// nothing at all, so it is raised to one byte.
    pub fn read_buffer_size(&self) -> usize {
        self.input_buffer_size.max(1)
    }
}

/// Statistics from a conversion
#[derive(Debug, Clone)]
pub struct ConversionStats {
    /// Mode the document was converted in
    pub format: InputFormat,
    /// Row boundary element (generic mode)
    pub repeating_element: Option<RepeatingElement>,
    /// Entities extracted per kind (SVD mode)
    pub entity_counts: Option<ExtractionCounts>,
    /// Per-sheet row counts
    pub writer: WriterStats,
    /// Size of the source document in bytes
    pub source_file_size: u64,
    /// Size of the written workbook in bytes (0 if not on disk)
    pub output_file_size: u64,
    /// Wall time of the conversion
    pub elapsed: Duration,
}

impl ConversionStats {
    /// Total data rows across all sheets
    pub fn total_rows(&self) -> usize {
        self.writer.total_rows()
    }
}

impl fmt::Display for ConversionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Format: {}", self.format)?;
        if let Some(element) = &self.repeating_element {
            writeln!(
                f,
                "Repeating element: <{}> ({} occurrences)",
                element.name, element.occurrences
            )?;
        }
        if let Some(counts) = &self.entity_counts {
            writeln!(f, "Extracted: {}", counts)?;
        }
        writeln!(f, "{}", self.writer)?;
        write!(
            f,
            "Input: {} bytes, output: {} bytes, {:.2}s",
            self.source_file_size,
            self.output_file_size,
            self.elapsed.as_secs_f64()
        )
    }
}

/// What a document would convert to, without writing anything
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    /// Classified format
    pub format: InputFormat,
    /// Row boundary element (generic mode)
    pub repeating_element: Option<RepeatingElement>,
    /// Sampled, sorted column headers (generic mode)
    pub columns: Vec<String>,
    /// Entities per kind (SVD mode)
    pub entity_counts: Option<ExtractionCounts>,
}

/// Converter from XML documents to spreadsheet workbooks
pub struct XmlConverter {
    config: ConversionConfig,
}

impl XmlConverter {
    /// Create a new converter with default configuration
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }

    /// Create a new converter with custom configuration
    pub fn with_config(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// Set the writer batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.writer_config.batch_size = batch_size;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Classify `input` and convert it to an XLSX workbook at `output`
    pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<ConversionStats, ConversionError> {
        let format = InputFormat::classify(input.as_ref());
        self.convert_as(input, output, format)
    }

    /// Convert `input` to an XLSX workbook in the given mode
    pub fn convert_as<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
        format: InputFormat,
    ) -> Result<ConversionStats, ConversionError> {
        let input = input.as_ref();
        let output = output.as_ref();
        let file = open_input(input)?;

        info!(
            "Converting {} to {} ({})",
            input.display(),
            output.display(),
            format
        );
        let mut stats = self.convert_source(file, format, output, XlsxBackend::new())?;
        stats.output_file_size = fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        Ok(stats)
    }

    /// Convert any seekable source with any backend.
    ///
    /// The workbook is saved to `output` only if every stage succeeds.
    pub fn convert_source<S, B>(
        &self,
        mut source: S,
        format: InputFormat,
        output: &Path,
        backend: B,
    ) -> Result<ConversionStats, ConversionError>
    where
        S: Read + Seek + Send + 'static,
        B: SpreadsheetBackend,
    {
        let start = Instant::now();
        let source_file_size = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        let (repeating_element, entity_counts, writer) = match format {
            InputFormat::Generic => {
                let (element, writer) =
                    generic::convert_generic(&self.config, source, output, backend)?;
                (Some(element), None, writer)
            }
            InputFormat::Svd => {
                let (counts, writer) = svd::convert_svd(&self.config, source, output, backend)?;
                (None, Some(counts), writer)
            }
        };

        let stats = ConversionStats {
            format,
            repeating_element,
            entity_counts,
            writer,
            source_file_size,
            output_file_size: 0,
            elapsed: start.elapsed(),
        };
        info!(
            "Conversion complete: {} rows in {:.2}s",
            stats.total_rows(),
            stats.elapsed.as_secs_f64()
        );
        Ok(stats)
    }

    /// Classify and scan `input` without writing a workbook
    pub fn inspect<P: AsRef<Path>>(&self, input: P) -> Result<DocumentSummary, ConversionError> {
        let format = InputFormat::classify(input.as_ref());
        self.inspect_as(input, format)
    }

    /// Scan `input` in the given mode without writing a workbook
    pub fn inspect_as<P: AsRef<Path>>(
        &self,
        input: P,
        format: InputFormat,
    ) -> Result<DocumentSummary, ConversionError> {
        let input = input.as_ref();
        let buffer_size = self.config.read_buffer_size();

        match format {
            InputFormat::Generic => {
                let detected = detect_repeating_element(BufReader::with_capacity(
                    buffer_size,
                    open_input(input)?,
                ))?;
                let streamer = RecordStreamer::new(
                    BufReader::with_capacity(buffer_size, open_input(input)?),
                    detected.name.clone(),
                );
                let columns = sample_headers(streamer.records(), self.config.header_sample_size)?;
                Ok(DocumentSummary {
                    format,
                    repeating_element: Some(detected),
                    columns,
                    entity_counts: None,
                })
            }
            InputFormat::Svd => {
                let mut entities =
                    SvdExtractor::new(BufReader::with_capacity(buffer_size, open_input(input)?))
                        .entities();
                for entity in entities.by_ref() {
                    entity?;
                }
                Ok(DocumentSummary {
                    format,
                    repeating_element: None,
                    columns: Vec::new(),
                    entity_counts: Some(entities.counts()),
                })
            }
        }
    }
}

impl Default for XmlConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// `input.xml` → `input.xlsx`
pub fn default_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
    input.as_ref().with_extension("xlsx")
}

fn open_input(path: &Path) -> Result<File, ConversionError> {
    File::open(path).map_err(|source| ConversionError::OpenInput {
        path: path.to_path_buf(),
        source,
    })
}
