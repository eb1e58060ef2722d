//! # XML Scanning Module
//!
//! Pull-based scanners built on quick-xml. None of them hold more than the
//! current element path and one in-flight record per level in memory.
//!
//! - [`detector`]: counts elements below the root and picks the row boundary
//! - [`RecordStreamer`]: flattens each repeating element into a [`Record`](crate::Record)
//! - [`SvdExtractor`]: extracts linked peripheral/register/field records
//!
//! Namespace prefixes are ignored; elements are matched by local name.

pub mod detector;
mod error;
mod flattener;
pub mod svd;
mod tokens;

#[cfg(test)]
mod tests;

pub use detector::{count_elements, detect_repeating_element, ElementCounts, RepeatingElement};
pub use error::ParseError;
pub use flattener::{RecordIterator, RecordStreamer};
pub use svd::{EntityKind, ExtractionCounts, IdSequence, SvdEntity, SvdEntityIterator, SvdExtractor};

/// Default read buffer size for input files (64 KiB)
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 64 * 1024;

/// Local name of the document's root element, or `None` for a document
/// without elements.
pub fn root_element<R: std::io::BufRead>(source: R) -> Result<Option<String>, ParseError> {
    let mut tokens = tokens::TokenReader::new(source);
    loop {
        match tokens.next_token()? {
            tokens::Token::Start(name) => return Ok(Some(name)),
            tokens::Token::Eof => return Ok(None),
            _ => {}
        }
    }
}
