//! Generic flattening: one sheet, one row per repeating element.

use std::collections::BTreeSet;
use std::io::{Read, Seek};
use std::path::Path;

use log::{info, warn};

use super::pipeline::RecordStream;
use super::{ConversionConfig, ConversionError};
use crate::sheet::{SheetWriter, SpreadsheetBackend, WriterStats};
use crate::xml::{ParseError, RecordStreamer, RepeatingElement};
use crate::Record;

/// Sorted union of the keys of `records`
fn column_set<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<String> {
    let columns: BTreeSet<&str> = records
        .into_iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect();
    columns.into_iter().map(str::to_owned).collect()
}

/// Sorted column headers of the first `sample_size` records.
///
/// Columns that first appear after the sample are not part of the result,
/// and their values are dropped when rows are written.
pub fn sample_headers<I>(records: I, sample_size: usize) -> Result<Vec<String>, ParseError>
where
    I: IntoIterator<Item = Result<Record, ParseError>>,
{
    let sample = records
        .into_iter()
        .take(sample_size.max(1))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(column_set(&sample))
}

/// Detect, flatten and write `source` into a single sheet
pub(super) fn convert_generic<S, B>(
    config: &ConversionConfig,
    source: S,
    output: &Path,
    backend: B,
) -> Result<(RepeatingElement, WriterStats), ConversionError>
where
    S: Read + Seek + Send + 'static,
    B: SpreadsheetBackend,
{
    let (streamer, detected) = RecordStreamer::from_seekable(source, config.read_buffer_size())?;
    let stream = RecordStream::spawn(streamer, config.channel_capacity)?;

    let mut writer = SheetWriter::new(backend, output, config.writer_config.clone());
    let written = write_records(config, &mut writer, &stream, &detected);
    let produced = stream.finish()?;
    let rows = written?;

    if rows != produced {
        warn!("Producer sent {} records but {} rows were written", produced, rows);
    }

    let stats = writer.close()?;
    Ok((detected, stats))
}

/// Consume the stream on the calling thread: sample headers, create the
/// sheet, then write the sample and every following record.
fn write_records<B: SpreadsheetBackend>(
    config: &ConversionConfig,
    writer: &mut SheetWriter<B>,
    stream: &RecordStream,
    detected: &RepeatingElement,
) -> Result<usize, ConversionError> {
    let sample_size = config.header_sample_size.max(1);
    let sample: Vec<Record> = stream.records().iter().take(sample_size).collect();
    let headers = column_set(&sample);
    if headers.is_empty() {
        return Err(ConversionError::NoColumns {
            element: detected.name.clone(),
            sampled: sample.len(),
        });
    }

    info!(
        "Sampled {} columns from {} <{}> records",
        headers.len(),
        sample.len(),
        detected.name
    );

    let sheet_name = config.sheet_name.as_str();
    writer.create_sheet(sheet_name, headers)?;
    let sheet = writer.sheet_mut(sheet_name)?;

    let mut rows = 0;
    for record in sample.into_iter().chain(stream.records().iter()) {
        sheet.push(record)?;
        rows += 1;
        if config.progress_interval > 0 && rows % config.progress_interval == 0 {
            info!("Processed {} rows", rows);
        }
    }
    Ok(rows)
}
