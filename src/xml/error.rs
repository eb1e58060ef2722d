/// Errors that can occur while scanning an XML document
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Malformed XML (unbalanced tags, invalid tokens, bad entities)
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// I/O error while reading or rewinding the source
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Element names or CDATA sections that are not valid UTF-8
    #[error("UTF-8 encoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// The document ended while elements were still open
    #[error("Unexpected end of document: <{0}> is never closed")]
    UnexpectedEof(String),

    /// No element below the root occurs often enough to be treated as a row
    #[error(
        "Failed to detect repeating XML element: no element below the root occurs at least {min_occurrences} times"
    )]
    NoRepeatingElement {
        /// Occurrence threshold that no element reached
        min_occurrences: usize,
    },
}
