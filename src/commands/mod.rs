//! CLI command implementations
//!
//! Every command opens the programmer, wraps it in a
//! [`FlasherController`] and goes through the controller from there on:
//! long jobs run on the controller's worker thread and are watched through
//! the status query, short actions run inline.

pub mod chip;
pub mod debug;
pub mod jobs;
mod list;

pub use list::{format_size, list_programmers};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ccflasher_flash::{open_programmer, DirStore, FlasherController};
use thiserror::Error;

/// Errors reported by the command layer
#[derive(Debug, Error)]
pub enum CommandError {
    /// A job or action ended with an error status
    #[error("{0}")]
    Failed(String),

    /// The image store directory could not be prepared
    #[error("cannot use work directory {path:?}: {source}")]
    Workdir {
        /// Requested directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Default image store location
fn default_workdir() -> PathBuf {
    std::env::temp_dir().join("ccflasher")
}

/// Open the programmer and build a controller with a directory image store
pub fn open_controller(
    programmer: &str,
    workdir: Option<&Path>,
) -> Result<FlasherController, Box<dyn std::error::Error>> {
    let root = workdir.map(Path::to_path_buf).unwrap_or_else(default_workdir);
    let store = DirStore::new(&root).map_err(|source| CommandError::Workdir {
        path: root.clone(),
        source,
    })?;
    log::debug!("Image store at {}", root.display());

    let link = open_programmer(programmer)?;
    Ok(FlasherController::new(link, Arc::new(store)))
}
