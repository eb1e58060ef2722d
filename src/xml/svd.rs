//! CMSIS-SVD hierarchical extraction.
//!
//! ## SVD Structure
//!
//! ```text
//! device
//! └── peripherals
//!     └── peripheral* (→ Peripherals sheet)
//!         ├── name, description, baseAddress, ...
//!         └── registers
//!             └── register* (→ Registers sheet)
//!                 ├── name, addressOffset, resetValue, ...
//!                 └── fields
//!                     └── field* (→ Fields sheet)
//!                         └── name, bitOffset, bitWidth, ...
//! ```
//!
//! Each entity is emitted when its end tag is reached. Ids are assigned when
//! the start tag is seen, so they follow the document order of opening.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use super::tokens::{Token, TokenReader};
use super::{ParseError, DEFAULT_INPUT_BUFFER_SIZE};
use crate::Record;

/// Minimum digit count of the numeric part of a synthetic id
pub const ID_WIDTH: usize = 4;

/// Column holding an entity's own synthetic id
pub const ID_COLUMN: &str = "_id";
/// Column holding the owning peripheral's id
pub const PERIPHERAL_ID_COLUMN: &str = "_peripheral_id";
/// Column holding the owning peripheral's name
pub const PERIPHERAL_NAME_COLUMN: &str = "_peripheral_name";
/// Column holding the owning register's id
pub const REGISTER_ID_COLUMN: &str = "_register_id";
/// Column holding the owning register's name
pub const REGISTER_NAME_COLUMN: &str = "_register_name";

const NAME_ELEMENT: &str = "name";

const PERIPHERAL_HEADERS: &[&str] = &[
    ID_COLUMN,
    "name",
    "description",
    "groupName",
    "baseAddress",
    "size",
    "access",
    "resetValue",
];

const REGISTER_HEADERS: &[&str] = &[
    ID_COLUMN,
    PERIPHERAL_ID_COLUMN,
    PERIPHERAL_NAME_COLUMN,
    "name",
    "displayName",
    "description",
    "addressOffset",
    "size",
    "access",
    "resetValue",
];

const FIELD_HEADERS: &[&str] = &[
    ID_COLUMN,
    REGISTER_ID_COLUMN,
    REGISTER_NAME_COLUMN,
    PERIPHERAL_ID_COLUMN,
    PERIPHERAL_NAME_COLUMN,
    "name",
    "description",
    "bitOffset",
    "bitWidth",
    "access",
];

/// The three entity levels of an SVD document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Peripheral,
    Register,
    Field,
}

impl EntityKind {
    /// All kinds, outermost first
    pub const ALL: [EntityKind; 3] = [EntityKind::Peripheral, EntityKind::Register, EntityKind::Field];

    /// Element name of one entity
    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::Peripheral => "peripheral",
            EntityKind::Register => "register",
            EntityKind::Field => "field",
        }
    }

    /// Element name of the container the entity must appear in
    pub fn container(&self) -> &'static str {
        match self {
            EntityKind::Peripheral => "peripherals",
            EntityKind::Register => "registers",
            EntityKind::Field => "fields",
        }
    }

    /// Child container that is not an attribute of this entity
    fn child_container(&self) -> Option<&'static str> {
        match self {
            EntityKind::Peripheral => Some("registers"),
            EntityKind::Register => Some("fields"),
            EntityKind::Field => None,
        }
    }

    /// Prefix of the synthetic id
    pub fn id_prefix(&self) -> char {
        match self {
            EntityKind::Peripheral => 'P',
            EntityKind::Register => 'R',
            EntityKind::Field => 'F',
        }
    }

    /// Name of the output sheet for this kind
    pub fn sheet_name(&self) -> &'static str {
        match self {
            EntityKind::Peripheral => "Peripherals",
            EntityKind::Register => "Registers",
            EntityKind::Field => "Fields",
        }
    }

    /// Fixed column headers of the output sheet
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Peripheral => PERIPHERAL_HEADERS,
            EntityKind::Register => REGISTER_HEADERS,
            EntityKind::Field => FIELD_HEADERS,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            EntityKind::Peripheral => 0,
            EntityKind::Register => 1,
            EntityKind::Field => 2,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Per-kind sequence of synthetic ids (`P0000`, `P0001`, ...)
#[derive(Debug, Clone)]
pub struct IdSequence {
    prefix: char,
    next: usize,
}

impl IdSequence {
    /// Start a sequence at 0
    pub fn new(prefix: char) -> Self {
        Self { prefix, next: 0 }
    }

    /// Allocate the next id
    pub fn next_id(&mut self) -> String {
        let id = format_id(self.prefix, self.next);
        self.next += 1;
        id
    }

    /// Number of ids allocated so far
    pub fn allocated(&self) -> usize {
        self.next
    }
}

/// Format a synthetic id: prefix plus zero-padded sequence number
pub fn format_id(prefix: char, sequence: usize) -> String {
    format!("{}{:0width$}", prefix, sequence, width = ID_WIDTH)
}

/// One completed entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvdEntity {
    pub kind: EntityKind,
    pub record: Record,
}

/// Number of entities opened per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionCounts {
    pub peripherals: usize,
    pub registers: usize,
    pub fields: usize,
}

impl ExtractionCounts {
    /// Count for one kind
    pub fn get(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Peripheral => self.peripherals,
            EntityKind::Register => self.registers,
            EntityKind::Field => self.fields,
        }
    }
}

impl fmt::Display for ExtractionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} peripherals, {} registers, {} fields",
            self.peripherals, self.registers, self.fields
        )
    }
}

/// Single-pass extractor of peripherals, registers and fields
pub struct SvdExtractor<R: BufRead> {
    tokens: TokenReader<R>,
    text: String,
    /// Open entity per kind, indexed by [`EntityKind::index`]
    open: [Option<Record>; 3],
    ids: [IdSequence; 3],
}

impl SvdExtractor<BufReader<File>> {
    /// Open an SVD file with the default buffer size
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        Self::open_with_buffer_size(path, DEFAULT_INPUT_BUFFER_SIZE)
    }

    /// Open an SVD file with a custom read buffer size
    pub fn open_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> Result<Self, ParseError> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::with_capacity(buffer_size.max(1), file)))
    }
}

impl<R: BufRead> SvdExtractor<R> {
    /// Create an extractor over a buffered source
    pub fn new(source: R) -> Self {
        Self {
            tokens: TokenReader::new(source),
            text: String::new(),
            open: [None, None, None],
            ids: EntityKind::ALL.map(|kind| IdSequence::new(kind.id_prefix())),
        }
    }

    /// Entities opened so far, per kind
    pub fn counts(&self) -> ExtractionCounts {
        ExtractionCounts {
            peripherals: self.ids[EntityKind::Peripheral.index()].allocated(),
            registers: self.ids[EntityKind::Register.index()].allocated(),
            fields: self.ids[EntityKind::Field.index()].allocated(),
        }
    }

    /// Read the next completed entity
    pub fn next_entity(&mut self) -> Result<Option<SvdEntity>, ParseError> {
        loop {
            match self.tokens.next_token()? {
                Token::Start(name) => {
                    self.text.clear();
                    self.open_entity(&name);
                }
                Token::Text(text) => self.text.push_str(&text),
                Token::End(name) => {
                    self.store_attribute(&name);
                    self.text.clear();

                    if let Some(kind) = kind_for_tag(&name) {
                        if let Some(record) = self.open[kind.index()].take() {
                            return Ok(Some(SvdEntity { kind, record }));
                        }
                    }
                }
                Token::Eof => {
                    info!("SVD parsing completed: {}", self.counts());
                    return Ok(None);
                }
            }
        }
    }

    /// Iterate over all remaining entities
    pub fn entities(self) -> SvdEntityIterator<R> {
        SvdEntityIterator {
            extractor: self,
            done: false,
        }
    }

    fn open_entity(&mut self, name: &str) {
        let Some(kind) = kind_for_tag(name) else {
            return;
        };
        if !self.tokens.in_path(kind.container()) {
            return;
        }

        let mut record = match kind {
            EntityKind::Peripheral => Record::new(),
            EntityKind::Register => {
                let Some(peripheral) = &self.open[EntityKind::Peripheral.index()] else {
                    return;
                };
                let mut record = Record::new();
                copy_reference(peripheral, ID_COLUMN, &mut record, PERIPHERAL_ID_COLUMN);
                copy_reference(peripheral, NAME_ELEMENT, &mut record, PERIPHERAL_NAME_COLUMN);
                record
            }
            EntityKind::Field => {
                let Some(register) = &self.open[EntityKind::Register.index()] else {
                    return;
                };
                let mut record = Record::new();
                copy_reference(register, ID_COLUMN, &mut record, REGISTER_ID_COLUMN);
                copy_reference(register, NAME_ELEMENT, &mut record, REGISTER_NAME_COLUMN);
                copy_reference(register, PERIPHERAL_ID_COLUMN, &mut record, PERIPHERAL_ID_COLUMN);
                copy_reference(register, PERIPHERAL_NAME_COLUMN, &mut record, PERIPHERAL_NAME_COLUMN);
                record
            }
        };

        record.insert(ID_COLUMN.to_owned(), self.ids[kind.index()].next_id());
        self.open[kind.index()] = Some(record);
    }

    fn store_attribute(&mut self, name: &str) {
        let value = self.text.trim();
        if value.is_empty() {
            return;
        }
        let Some(kind) = self.tokens.parent().and_then(kind_for_tag) else {
            return;
        };
        if name == kind.tag() || kind.child_container() == Some(name) {
            return;
        }
        if let Some(record) = self.open[kind.index()].as_mut() {
            record.insert(name.to_owned(), value.to_owned());
        }
    }
}

fn kind_for_tag(tag: &str) -> Option<EntityKind> {
    EntityKind::ALL.into_iter().find(|kind| kind.tag() == tag)
}

fn copy_reference(parent: &Record, from: &str, child: &mut Record, to: &str) {
    let value = parent.get(from).cloned().unwrap_or_default();
    child.insert(to.to_owned(), value);
}

/// Iterator over extracted entities; stops after the first error
pub struct SvdEntityIterator<R: BufRead> {
    extractor: SvdExtractor<R>,
    done: bool,
}

impl<R: BufRead> SvdEntityIterator<R> {
    /// Entities opened so far, per kind
    pub fn counts(&self) -> ExtractionCounts {
        self.extractor.counts()
    }
}

impl<R: BufRead> Iterator for SvdEntityIterator<R> {
    type Item = Result<SvdEntity, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.extractor.next_entity() {
            Ok(Some(entity)) => Some(Ok(entity)),
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
