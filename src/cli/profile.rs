//! Conversion profiles for common use cases.
//!
//! Profiles trade memory for speed by sizing the input read buffer and the
//! per-sheet row batches. They never change the written content.

use std::fmt;

use xml2sheet::sheet::WriterConfig;
use xml2sheet::ConversionConfig;

/// Conversion profiles for common use cases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    /// Smallest buffers.
    ///
    /// - Read buffer: 16 KiB
    /// - Batch size: 256 rows
    LowMemory,

    /// Balance between memory and speed (default).
    ///
    /// - Read buffer: 64 KiB
    /// - Batch size: 2,048 rows
    #[default]
    Balanced,

    /// Fewer, larger reads and flushes.
    ///
    /// - Read buffer: 256 KiB
    /// - Batch size: 8,192 rows
    Throughput,
}

impl Profile {
    /// Returns the input read buffer size in bytes for this profile.
    pub fn buffer_size(&self) -> usize {
        match self {
            Profile::LowMemory => 16 * 1024,
            Profile::Balanced => 64 * 1024,
            Profile::Throughput => 256 * 1024,
        }
    }

    /// Returns the number of rows buffered per sheet before a flush.
    pub fn batch_size(&self) -> usize {
        match self {
            Profile::LowMemory => 256,
            Profile::Balanced => 2_048,
            Profile::Throughput => 8_192,
        }
    }

    /// Conversion configuration preset for this profile.
    pub fn conversion_config(&self) -> ConversionConfig {
        ConversionConfig {
            input_buffer_size: self.buffer_size(),
            writer_config: WriterConfig::default().with_batch_size(self.batch_size()),
            ..ConversionConfig::default()
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::LowMemory => write!(f, "low-memory"),
            Profile::Balanced => write!(f, "balanced"),
            Profile::Throughput => write!(f, "throughput"),
        }
    }
}
