//! Job orchestration for CC111x/CC253x programming
//!
//! This crate sits between a front end and the protocol engine. The front
//! end opens a programmer through the registry, wraps it in a
//! [`FlasherController`], and from then on only starts jobs and polls the
//! status.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CLI (bin/ccflasher)                      │
//! │  - Starts jobs, polls status, renders progress               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ccflasher-flash (this crate)                │
//! │  - FlasherController: session, busy gate, status, images    │
//! │  - Jobs: dump, flash, verify; lock and erase actions         │
//! │  - Registry: opens programmers by name                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │    ccflasher-core        │   │  Programmer crates       │
//! │  - DebugSession          │   │  - linux-gpio, dummy     │
//! │  - Flash loader, lock    │   │  - Implement DebugLink   │
//! │  - Chip identity         │   │                          │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ccflasher_flash::{open_programmer, DirStore, FlasherController};
//!
//! let link = open_programmer("linux_gpio:gpiochip=0,clk=4,data=5,rst=6")?;
//! let store = Arc::new(DirStore::new("/var/lib/ccflasher")?);
//! let controller = FlasherController::new(link, store);
//!
//! let job = controller.start_dump()?;
//! while !job.is_finished() {
//!     println!("{}", controller.status());
//!     std::thread::sleep(std::time::Duration::from_millis(200));
//! }
//! job.join()?;
//! ```

mod controller;
mod error;
mod jobs;
mod registry;
mod status;
mod storage;

pub use controller::{BoxedLink, FlasherController, JobHandle, Session};
pub use error::{FlashError, JobError, Result};
pub use jobs::{
    run_erase, run_job, run_lock, JobKind, JOB_CHUNK_SIZE, LOCK_BYTE_READ_PROTECT, STATUS_STRIDE,
};
pub use registry::{
    available_programmers, open_programmer, parse_programmer_params, programmer_names_short,
    ProgrammerInfo, ProgrammerParams,
};
pub use status::{
    Status, StatusBoard, BUSY_PREFIX, BUSY_TIMEOUT, DUMP_READY, ERROR_PREFIX, STATUS_READ_WAIT,
    STATUS_WRITE_WAIT, SYSTEM_READY,
};
pub use storage::{DirStore, ImageStore, MemoryStore, DUMP_IMAGE, FIRMWARE_IMAGE};

// Re-export core types the CLI needs
pub use ccflasher_core::chip::{ChipIdentity, ChipModel};
pub use ccflasher_core::debug::RegisterSnapshot;
