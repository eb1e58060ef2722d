//! CMSIS-SVD conversion: three linked sheets written by three consumers.

use std::io::{BufReader, Read};
use std::path::Path;
use std::thread;

use crossbeam_channel::Receiver;
use log::{debug, info};

use super::pipeline::SvdStreams;
use super::{ConversionConfig, ConversionError};
use crate::sheet::{BufferedSheet, SheetError, SheetSink, SheetWriter, SpreadsheetBackend, WriterStats};
use crate::xml::{EntityKind, ExtractionCounts, SvdExtractor};
use crate::Record;

/// Extract peripherals, registers and fields from `source` into their sheets
pub(super) fn convert_svd<S, B>(
    config: &ConversionConfig,
    source: S,
    output: &Path,
    backend: B,
) -> Result<(ExtractionCounts, WriterStats), ConversionError>
where
    S: Read + Send + 'static,
    B: SpreadsheetBackend,
{
    let mut writer = SheetWriter::new(backend, output, config.writer_config.clone());
    for kind in EntityKind::ALL {
        let headers = kind.headers().iter().map(|h| h.to_string()).collect();
        writer.create_sheet(kind.sheet_name(), headers)?;
    }

    let extractor = SvdExtractor::new(BufReader::with_capacity(config.read_buffer_size(), source));
    let (receivers, producer) =
        SvdStreams::spawn(extractor, config.channel_capacity)?.into_parts();

    let interval = config.progress_interval;
    let consumed: Vec<Result<usize, ConversionError>> = thread::scope(|scope| {
        let handles: Vec<_> = writer
            .sheets_mut()
            .iter_mut()
            .zip(receivers)
            .zip(EntityKind::ALL)
            .map(|((sheet, records), kind)| {
                let name = format!("xml2sheet-{}", kind.tag());
                thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(scope, move || drain(sheet, records, interval))
                    .map_err(|source| ConversionError::ThreadSpawn { name, source })
            })
            .collect();

        handles
            .into_iter()
            .zip(EntityKind::ALL)
            .map(|(handle, kind)| -> Result<usize, ConversionError> {
                let rows = handle?
                    .join()
                    .map_err(|_| ConversionError::ThreadPanicked(format!("xml2sheet-{}", kind.tag())))??;
                debug!("{} consumer finished after {} rows", kind, rows);
                Ok(rows)
            })
            .collect()
    });

    let counts = producer.finish()?;
    for result in consumed {
        result?;
    }
    info!("Extracted {}", counts);

    let stats = writer.close()?;
    Ok((counts, stats))
}

/// Push every record of one stream into its sheet.
///
/// Returning early drops `records`, which stops the producer.
fn drain<S: SheetSink>(
    sheet: &mut BufferedSheet<S>,
    records: Receiver<Record>,
    progress_interval: usize,
) -> Result<usize, SheetError> {
    let mut rows = 0;
    for record in records {
        sheet.push(record)?;
        rows += 1;
        if progress_interval > 0 && rows % progress_interval == 0 {
            info!("{}: {} rows", sheet.name(), rows);
        }
    }
    Ok(rows)
}
