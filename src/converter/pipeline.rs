//! Producer threads and the bounded channels that connect them to sheet
//! consumers.
//!
//! ```text
//!                    ┌──── bounded(capacity) ────▶ consumer
//! producer thread ───┤
//!                    └──── bounded(1) errors ────▶ orchestrator
//! ```
//!
//! A producer blocks while its queue is full. It stops quietly as soon as a
//! consumer drops its receiver, and reports at most one parse error.

use std::io::BufRead;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, warn};

use super::ConversionError;
use crate::xml::{ExtractionCounts, ParseError, RecordStreamer, SvdExtractor};
use crate::Record;

/// Error slot shared by a producer and its orchestrator
fn error_channel() -> (Sender<ParseError>, Receiver<ParseError>) {
    bounded(1)
}

fn spawn_producer<T, F>(name: &str, body: F) -> Result<JoinHandle<T>, ConversionError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|source| ConversionError::ThreadSpawn {
            name: name.to_string(),
            source,
        })
}

/// Join a producer, then take the error it reported, if any
fn join_producer<T>(
    handle: JoinHandle<T>,
    errors: &Receiver<ParseError>,
    name: &str,
) -> Result<T, ConversionError> {
    let value = handle
        .join()
        .map_err(|_| ConversionError::ThreadPanicked(name.to_string()))?;
    match errors.try_recv() {
        Ok(err) => Err(ConversionError::Parse(err)),
        Err(_) => Ok(value),
    }
}

const FLATTENER_THREAD: &str = "xml2sheet-flattener";
const EXTRACTOR_THREAD: &str = "xml2sheet-svd";

/// Flattened records streamed from a background thread
pub(crate) struct RecordStream {
    records: Receiver<Record>,
    errors: Receiver<ParseError>,
    handle: JoinHandle<usize>,
}

impl RecordStream {
    /// Run `streamer` on a producer thread
    pub(crate) fn spawn<R>(streamer: RecordStreamer<R>, capacity: usize) -> Result<Self, ConversionError>
    where
        R: BufRead + Send + 'static,
    {
        let (sender, records) = bounded(capacity);
        let (error_sender, errors) = error_channel();

        let handle = spawn_producer(FLATTENER_THREAD, move || {
            let mut sent = 0;
            for result in streamer.records() {
                match result {
                    Ok(record) => {
                        if sender.send(record).is_err() {
                            debug!("Record consumer went away after {} records", sent);
                            break;
                        }
                        sent += 1;
                    }
                    Err(e) => {
                        let _ = error_sender.try_send(e);
                        break;
                    }
                }
            }
            sent
        })?;

        Ok(Self {
            records,
            errors,
            handle,
        })
    }

    /// Receiving end of the record queue
    pub(crate) fn records(&self) -> &Receiver<Record> {
        &self.records
    }

    /// Close the queue, join the producer and surface its parse error.
    ///
    /// Returns the number of records the producer sent.
    pub(crate) fn finish(self) -> Result<usize, ConversionError> {
        drop(self.records);
        join_producer(self.handle, &self.errors, FLATTENER_THREAD)
    }
}

/// The three entity streams of one SVD extraction
pub(crate) struct SvdStreams {
    receivers: [Receiver<Record>; 3],
    producer: SvdProducer,
}

/// Handle used to join the SVD producer once consumers are done
pub(crate) struct SvdProducer {
    errors: Receiver<ParseError>,
    handle: JoinHandle<ExtractionCounts>,
}

impl SvdStreams {
    /// Run `extractor` on a producer thread, routing entities by kind
    pub(crate) fn spawn<R>(extractor: SvdExtractor<R>, capacity: usize) -> Result<Self, ConversionError>
    where
        R: BufRead + Send + 'static,
    {
        let (peripheral_tx, peripheral_rx) = bounded(capacity);
        let (register_tx, register_rx) = bounded(capacity);
        let (field_tx, field_rx) = bounded(capacity);
        let (error_sender, errors) = error_channel();

        let handle = spawn_producer(EXTRACTOR_THREAD, move || {
            let senders: [Sender<Record>; 3] = [peripheral_tx, register_tx, field_tx];
            let mut entities = extractor.entities();
            for result in entities.by_ref() {
                match result {
                    Ok(entity) => {
                        if senders[entity.kind.index()].send(entity.record).is_err() {
                            warn!("{} consumer stopped, ending extraction", entity.kind);
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = error_sender.try_send(e);
                        break;
                    }
                }
            }
            entities.counts()
        })?;

        Ok(Self {
            receivers: [peripheral_rx, register_rx, field_rx],
            producer: SvdProducer { errors, handle },
        })
    }

    /// Split into per-kind receivers, ordered as [`EntityKind::ALL`](crate::xml::EntityKind::ALL), and the
    /// producer handle
    pub(crate) fn into_parts(self) -> ([Receiver<Record>; 3], SvdProducer) {
        (self.receivers, self.producer)
    }
}

impl SvdProducer {
    /// Join the producer and surface its parse error
    pub(crate) fn finish(self) -> Result<ExtractionCounts, ConversionError> {
        join_producer(self.handle, &self.errors, EXTRACTOR_THREAD)
    }
}
