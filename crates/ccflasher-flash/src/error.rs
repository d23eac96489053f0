//! Error types for job orchestration

use std::io;

use thiserror::Error;

/// Why a job ended early
///
/// The `Display` text is the body of the terminal status message, which is
/// published as `"Error: <body>"`.
#[derive(Debug, Error)]
pub enum JobError {
    /// The dump image could not be created or written
    #[error("FS Write Fail")]
    StorageWrite(#[source] io::Error),

    /// A stored image could not be read back
    #[error("FS Read Fail")]
    StorageRead(#[source] io::Error),

    /// No firmware image was uploaded
    #[error("File missing!")]
    FileMissing,

    /// Chip erase failed before a flash write
    #[error("Erase Fail!")]
    EraseFailed(#[source] ccflasher_core::Error),

    /// Standalone chip erase timed out
    #[error("Erase failed (Timeout)!")]
    EraseTimeout(#[source] ccflasher_core::Error),

    /// A flash write chunk failed
    #[error("Write Fail @ 0x{address:04X}")]
    WriteFailed {
        /// Start of the chunk that failed
        address: u32,
        /// Underlying protocol error
        #[source]
        source: ccflasher_core::Error,
    },

    /// Code memory could not be read
    #[error("Read Fail @ 0x{address:04X}")]
    ReadFailed {
        /// Start of the chunk that failed
        address: u32,
        /// Underlying protocol error
        #[source]
        source: ccflasher_core::Error,
    },

    /// Code memory differs from the image
    #[error("Mismatch @ 0x{address:04X} (Exp:{expected:02X} Act:{actual:02X})")]
    Mismatch {
        /// Offset of the first differing byte
        address: u32,
        /// Byte in the image
        expected: u8,
        /// Byte read from the chip
        actual: u8,
    },

    /// The job thread panicked
    #[error("Job aborted")]
    Panicked,
}

impl JobError {
    /// Map a failed compare of the chunk at `address`
    pub(crate) fn from_verify(address: u32, error: ccflasher_core::Error) -> Self {
        match error {
            ccflasher_core::Error::VerifyMismatch {
                address,
                expected,
                actual,
            } => Self::Mismatch {
                address,
                expected,
                actual,
            },
            source => Self::ReadFailed { address, source },
        }
    }
}

/// Errors from the controller and programmer registry
#[derive(Debug, Error)]
pub enum FlashError {
    /// Another job holds the busy gate
    #[error("another job is already running")]
    Busy,

    /// The job thread could not be started
    #[error("failed to start job thread: {0}")]
    Spawn(#[source] io::Error),

    /// Image storage failed outside a job
    #[error("storage error: {0}")]
    Storage(#[source] io::Error),

    /// A job ended early
    #[error("{0}")]
    Job(#[from] JobError),

    /// A protocol operation failed
    #[error(transparent)]
    Core(#[from] ccflasher_core::Error),
}

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, FlashError>;
