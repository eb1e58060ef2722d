//! Repeating-element detection.
//!
//! One full pass over the document counts every element below the root. The
//! most frequent name becomes the row boundary for flattening.

use std::collections::HashMap;
use std::io::BufRead;

use log::debug;

use super::tokens::{Token, TokenReader};
use super::ParseError;

/// Minimum number of occurrences for an element to count as repeating
pub const MIN_OCCURRENCES: usize = 2;

/// The element chosen as the row boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatingElement {
    /// Local tag name
    pub name: String,
    /// Number of occurrences below the root
    pub occurrences: usize,
}

/// Occurrence counts per element name, kept in first-seen document order
#[derive(Debug, Clone, Default)]
pub struct ElementCounts {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl ElementCounts {
    /// Create an empty counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `name`
    pub fn record(&mut self, name: &str) {
        match self.index.get(name) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(name.to_owned(), self.entries.len());
                self.entries.push((name.to_owned(), 1));
            }
        }
    }

    /// Occurrences of `name` (0 if never seen)
    pub fn get(&self, name: &str) -> usize {
        self.index
            .get(name)
            .map(|&slot| self.entries[slot].1)
            .unwrap_or(0)
    }

    /// Number of distinct names seen
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was counted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names and counts in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// The most frequent name with at least [`MIN_OCCURRENCES`].
    ///
    /// On a tie the name encountered first in the document wins.
    pub fn most_repeated(&self) -> Option<RepeatingElement> {
        let mut best: Option<(&str, usize)> = None;
        for (name, count) in self.iter() {
            if count < MIN_OCCURRENCES {
                continue;
            }
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((name, count)),
            }
        }
        best.map(|(name, occurrences)| RepeatingElement {
            name: name.to_owned(),
            occurrences,
        })
    }
}

/// Count every start tag below the root element
pub fn count_elements<R: BufRead>(source: R) -> Result<ElementCounts, ParseError> {
    let mut tokens = TokenReader::new(source);
    let mut counts = ElementCounts::new();

    loop {
        match tokens.next_token()? {
            Token::Start(name) => {
                if tokens.depth() > 1 {
                    counts.record(&name);
                }
            }
            Token::Eof => break,
            _ => {}
        }
    }

    debug!("Counted {} distinct elements below the root", counts.len());
    Ok(counts)
}

/// Scan the whole document and pick the element that represents one row.
///
/// # Errors
///
/// Returns [`ParseError::NoRepeatingElement`] when no element below the root
/// occurs at least [`MIN_OCCURRENCES`] times, or any parse error hit during
/// the scan.
pub fn detect_repeating_element<R: BufRead>(source: R) -> Result<RepeatingElement, ParseError> {
    count_elements(source)?
        .most_repeated()
        .ok_or(ParseError::NoRepeatingElement {
            min_occurrences: MIN_OCCURRENCES,
        })
}
