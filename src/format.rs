//! Input format classification.
//!
//! A document is treated as CMSIS-SVD when its extension is `.svd` (any
//! case) or when its root element is `<device>`. Everything else, including
//! files whose root cannot be read, uses generic flattening.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::xml::root_element;

/// Root element name of a CMSIS-SVD document
pub const SVD_ROOT_ELEMENT: &str = "device";

/// How a document is converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFormat {
    /// Repeating element flattened into one sheet
    Generic,
    /// Peripherals, registers and fields in three linked sheets
    Svd,
}

impl InputFormat {
    /// Classify a file by extension, falling back to its root element
    pub fn classify<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if let Some(format) = Self::from_extension(path) {
            return format;
        }

        let root = File::open(path)
            .map_err(|e| e.to_string())
            .and_then(|file| root_element(BufReader::new(file)).map_err(|e| e.to_string()));
        match root {
            Ok(Some(name)) if name == SVD_ROOT_ELEMENT => Self::Svd,
            Ok(_) => Self::Generic,
            Err(e) => {
                debug!(
                    "Could not read root element of {}: {}; using generic mode",
                    path.display(),
                    e
                );
                Self::Generic
            }
        }
    }

    /// `Svd` for a `.svd` extension, `None` when the extension is not decisive
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.eq_ignore_ascii_case("svd"))
            .map(|_| Self::Svd)
    }

    /// Short lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Svd => "svd",
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "generic XML"),
            Self::Svd => write!(f, "CMSIS-SVD"),
        }
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "xml" => Ok(Self::Generic),
            "svd" | "cmsis-svd" => Ok(Self::Svd),
            other => Err(format!("unknown input format: {}", other)),
        }
    }
}
