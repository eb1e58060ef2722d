/// Default number of rows buffered per sheet before a flush
pub const DEFAULT_BATCH_SIZE: usize = 2048;

/// Default column width applied to every header column
pub const DEFAULT_COLUMN_WIDTH: f64 = 15.0;

/// Configuration for the batched sheet writer
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Rows buffered per sheet before they are streamed to the backend.
    /// Only affects flush timing, never the written content.
    pub batch_size: usize,

    /// Width applied to every header column when the workbook is closed
    pub column_width: f64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            column_width: DEFAULT_COLUMN_WIDTH,
        }
    }
}

impl WriterConfig {
    /// Small batches for constrained memory
    pub fn low_memory() -> Self {
        Self {
            batch_size: 256,
            ..Self::default()
        }
    }

    /// Large batches for fewer, bigger flushes
    pub fn throughput() -> Self {
        Self {
            batch_size: 8192,
            ..Self::default()
        }
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}
