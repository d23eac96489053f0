//! Shared job status record
//!
//! The status is the only state a running job shares with whoever polls it.
//! Both sides take the lock with a bounded wait: a writer that cannot get it
//! drops the update, a reader that cannot get it sees [`Status::busy_placeholder`].

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;

/// How long a job waits to publish a status update
pub const STATUS_WRITE_WAIT: Duration = Duration::from_millis(100);
/// How long a status query waits for the lock
pub const STATUS_READ_WAIT: Duration = Duration::from_millis(50);

/// Prefix of every in-progress message
pub const BUSY_PREFIX: &str = "BUSY:";
/// Prefix of every failure message
pub const ERROR_PREFIX: &str = "Error:";
/// Terminal message of a successful dump
pub const DUMP_READY: &str = "DUMP_READY";
/// Message before any job has run
pub const SYSTEM_READY: &str = "System ready.";
/// Message returned when the status lock could not be taken in time
pub const BUSY_TIMEOUT: &str = "Busy/Timeout";

/// Snapshot of the status record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Human readable message
    pub message: String,
    /// Overall progress, 0 to 100
    pub percent: u8,
}

impl Status {
    /// Snapshot handed out when the lock is contended
    pub fn busy_placeholder() -> Self {
        Self {
            message: BUSY_TIMEOUT.to_string(),
            percent: 0,
        }
    }

    /// Whether a job is still working
    pub fn is_in_progress(&self) -> bool {
        self.message.starts_with(BUSY_PREFIX)
    }

    /// Whether the last job failed
    pub fn is_error(&self) -> bool {
        self.message.starts_with(ERROR_PREFIX)
    }

    /// Whether a dump has finished and its image can be collected
    pub fn is_dump_ready(&self) -> bool {
        self.message == DUMP_READY
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}%)", self.message, self.percent)
    }
}

/// Mutex-guarded status record with bounded waits on both sides
pub struct StatusBoard {
    inner: Mutex<Status>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    /// Create a board showing [`SYSTEM_READY`]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Status {
                message: SYSTEM_READY.to_string(),
                percent: 0,
            }),
        }
    }

    /// Publish a message, and the percentage if given
    ///
    /// Returns false when the lock was not available in time and the update
    /// was dropped.
    pub fn update(&self, message: impl Into<String>, percent: Option<u8>) -> bool {
        let message = message.into();
        match self.inner.try_lock_for(STATUS_WRITE_WAIT) {
            Some(mut status) => {
                log::debug!("status: {}", message);
                status.message = message;
                if let Some(percent) = percent {
                    status.percent = percent.min(100);
                }
                true
            }
            None => {
                log::warn!("status update dropped: {}", message);
                false
            }
        }
    }

    /// Current status, or the placeholder if the lock is held too long
    pub fn snapshot(&self) -> Status {
        match self.inner.try_lock_for(STATUS_READ_WAIT) {
            Some(status) => status.clone(),
            None => Status::busy_placeholder(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_initial_status() {
        let board = StatusBoard::new();
        let status = board.snapshot();
        assert_eq!(status.message, "System ready.");
        assert_eq!(status.percent, 0);
        assert!(!status.is_in_progress());
    }

    #[test]
    fn test_update_keeps_percent_when_absent() {
        let board = StatusBoard::new();
        assert!(board.update("BUSY: [1/2] Writing...", Some(30)));
        assert!(board.update("BUSY: Erasing Chip...", None));
        let status = board.snapshot();
        assert_eq!(status.percent, 30);
        assert!(status.is_in_progress());

        board.update("Error: Erase Fail!", None);
        assert!(board.snapshot().is_error());
    }

    #[test]
    fn test_percent_is_clamped() {
        let board = StatusBoard::new();
        board.update(DUMP_READY, Some(250));
        let status = board.snapshot();
        assert_eq!(status.percent, 100);
        assert!(status.is_dump_ready());
    }

    #[test]
    fn test_contended_read_returns_placeholder() {
        let board = StatusBoard::new();
        board.update("BUSY: [2/2] Verifying...", Some(50));

        let held = board.inner.lock();
        let start = Instant::now();
        let status = board.snapshot();
        assert!(start.elapsed() >= STATUS_READ_WAIT);
        assert_eq!(status, Status::busy_placeholder());
        assert_eq!(status.message, "Busy/Timeout");
        drop(held);

        assert_eq!(board.snapshot().percent, 50);
    }

    #[test]
    fn test_contended_write_is_dropped() {
        let board = StatusBoard::new();
        let held = board.inner.lock();
        assert!(!board.update("BUSY: Preparing...", Some(10)));
        drop(held);
        assert_eq!(board.snapshot().message, SYSTEM_READY);
    }

    #[test]
    fn test_display() {
        let status = Status {
            message: "Success: Chip identical!".to_string(),
            percent: 100,
        };
        assert_eq!(status.to_string(), "Success: Chip identical! (100%)");
    }
}
