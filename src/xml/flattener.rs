use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::info;

use super::detector::{detect_repeating_element, RepeatingElement};
use super::tokens::{Token, TokenReader};
use super::{ParseError, DEFAULT_INPUT_BUFFER_SIZE};
use crate::Record;

/// Streaming flattener: one [`Record`] per occurrence of the repeating
/// element, keyed by the names of its direct children.
///
/// Children with empty (whitespace-only) content are omitted. Elements nested
/// deeper than one level below the repeating element do not contribute
/// columns.
pub struct RecordStreamer<R: BufRead> {
    tokens: TokenReader<R>,
    element: String,
    current: Option<Record>,
    text: String,
    records_emitted: usize,
}

impl RecordStreamer<BufReader<File>> {
    /// Open a file, detect its repeating element and position the streamer
    /// at the start of the document.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<(Self, RepeatingElement), ParseError> {
        Self::open_with_buffer_size(path, DEFAULT_INPUT_BUFFER_SIZE)
    }

    /// Open a file with a custom read buffer size
    pub fn open_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> Result<(Self, RepeatingElement), ParseError> {
        let file = File::open(path.as_ref())?;
        Self::from_seekable(file, buffer_size)
    }
}

impl<S: Read + Seek> RecordStreamer<BufReader<S>> {
    /// Two-pass setup over a rewindable source: the first pass detects the
    /// repeating element, then the source is rewound for streaming.
    pub fn from_seekable(
        mut source: S,
        buffer_size: usize,
    ) -> Result<(Self, RepeatingElement), ParseError> {
        // An empty BufReader reports EOF on its first fill.
        let buffer_size = buffer_size.max(1);
        let detected = detect_repeating_element(BufReader::with_capacity(buffer_size, &mut source))?;
        info!(
            "Detected repeating element: <{}> ({} occurrences)",
            detected.name, detected.occurrences
        );

        source.seek(SeekFrom::Start(0))?;
        let streamer = Self::new(
            BufReader::with_capacity(buffer_size, source),
            detected.name.clone(),
        );
        Ok((streamer, detected))
    }
}

impl<R: BufRead> RecordStreamer<R> {
    /// Stream records for an already known repeating element
    pub fn new(source: R, element: impl Into<String>) -> Self {
        Self {
            tokens: TokenReader::new(source),
            element: element.into(),
            current: None,
            text: String::new(),
            records_emitted: 0,
        }
    }

    /// The row boundary element name
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Number of records returned so far
    pub fn records_emitted(&self) -> usize {
        self.records_emitted
    }

    /// Read the next record from the stream
    pub fn next_record(&mut self) -> Result<Option<Record>, ParseError> {
        loop {
            match self.tokens.next_token()? {
                Token::Start(name) => {
                    self.text.clear();
                    if name == self.element {
                        self.current = Some(Record::new());
                    }
                }
                Token::Text(text) => self.text.push_str(&text),
                Token::End(name) => {
                    if let Some(record) = self.current.as_mut() {
                        if name != self.element && self.tokens.parent() == Some(self.element.as_str()) {
                            let value = self.text.trim();
                            if !value.is_empty() {
                                record.insert(name.clone(), value.to_owned());
                            }
                        }
                    }
                    self.text.clear();

                    if name == self.element {
                        if let Some(record) = self.current.take() {
                            self.records_emitted += 1;
                            return Ok(Some(record));
                        }
                    }
                }
                Token::Eof => return Ok(None),
            }
        }
    }

    /// Iterate over all remaining records
    pub fn records(self) -> RecordIterator<R> {
        RecordIterator {
            streamer: self,
            done: false,
        }
    }
}

/// Iterator over flattened records; stops after the first error
pub struct RecordIterator<R: BufRead> {
    streamer: RecordStreamer<R>,
    done: bool,
}

impl<R: BufRead> Iterator for RecordIterator<R> {
    type Item = Result<Record, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.streamer.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
