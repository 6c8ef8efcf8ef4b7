use std::fmt;

/// Result alias that carries the custom [`PixelError`] type.
pub type Result<T> = std::result::Result<T, PixelError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum PixelError {
    /// Malformed construction parameters. Raised while building buffers,
    /// layouts, schedulers or runners and never recovered from.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Pixel index outside the buffer bounds.
    #[error("pixel index {index} is out of range for a buffer of {len} pixels")]
    OutOfRange { index: usize, len: usize },
    /// A single driver failed while the layout runs in fail-fast mode.
    #[error("driver #{index} (`{name}`) failed: {source}")]
    Driver {
        index: usize,
        name: String,
        #[source]
        source: DriverError,
    },
    /// One or more drivers failed during a best-effort broadcast.
    #[error("{0}")]
    Push(PushFailures),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Failure while serializing a configuration dump.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl PixelError {
    /// Creates an [`PixelError::InvalidConfiguration`] from a message.
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// True for errors a frame loop may skip over.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Push(_))
    }
}

/// Failure reported by a [`crate::Driver`] while accepting a frame.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("frame holds {actual} pixels but the driver expects {expected}")]
    FrameLength { expected: usize, actual: usize },
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
}

impl DriverError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

/// One failed driver inside a [`PushFailures`] set.
#[derive(Debug)]
pub struct DriverFailure {
    /// Attachment position of the driver inside its layout.
    pub index: usize,
    pub name: String,
    pub error: DriverError,
}

/// Every driver that rejected a frame during one best-effort push, in
/// attachment order.
#[derive(Debug, Default)]
pub struct PushFailures {
    failures: Vec<DriverFailure>,
}

impl PushFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: DriverFailure) {
        self.failures.push(failure);
    }

    pub fn failures(&self) -> &[DriverFailure] {
        &self.failures
    }

    /// Attachment indices of the drivers that failed.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|failure| failure.index).collect()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for PushFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} driver(s) failed to accept the frame", self.failures.len())?;
        for failure in &self.failures {
            write!(
                f,
                "; #{} (`{}`): {}",
                failure.index, failure.name, failure.error
            )?;
        }
        Ok(())
    }
}
