//! Dump, flash and verify jobs, plus the lock and erase actions
//!
//! Every job publishes its progress to a [`StatusBoard`] and ends with a
//! terminal message: a success text, [`DUMP_READY`], or `"Error: ..."`.
//! Chip data moves in [`JOB_CHUNK_SIZE`] pieces; the status is refreshed each
//! time the address crosses a [`STATUS_STRIDE`] boundary.

use std::fmt;
use std::io::Write;

use ccflasher_core::programmer::DebugLink;
use ccflasher_core::protocol::DebugSession;

use crate::error::JobError;
use crate::status::{StatusBoard, DUMP_READY, ERROR_PREFIX};
use crate::storage::{ImageStore, DUMP_IMAGE, FIRMWARE_IMAGE};

/// Bytes moved between chip and image per step
pub const JOB_CHUNK_SIZE: usize = 1024;
/// Address stride between status updates
pub const STATUS_STRIDE: u32 = 2048;
/// Lock byte that enables read protection
pub const LOCK_BYTE_READ_PROTECT: u8 = 0x00;
/// Filler for the odd last byte of a firmware image
const PAD_BYTE: u8 = 0xFF;

/// Background jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Read the whole flash into [`DUMP_IMAGE`] and check it
    Dump,
    /// Erase, program [`FIRMWARE_IMAGE`] and check it
    Flash,
    /// Compare [`FIRMWARE_IMAGE`] against the chip
    Verify,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dump => write!(f, "dump"),
            Self::Flash => write!(f, "flash"),
            Self::Verify => write!(f, "verify"),
        }
    }
}

fn hex_addr(address: u32) -> String {
    format!("0x{:04X}", address)
}

/// `done / total` scaled to `span` percent
fn scaled(done: u32, total: u32, span: u8) -> u8 {
    if total == 0 {
        return span;
    }
    (u64::from(done) * u64::from(span) / u64::from(total)) as u8
}

fn job_chunks(image: &[u8]) -> impl Iterator<Item = (u32, &[u8])> {
    image
        .chunks(JOB_CHUNK_SIZE)
        .enumerate()
        .map(|(i, chunk)| ((i * JOB_CHUNK_SIZE) as u32, chunk))
}

fn at_stride(end: u32) -> bool {
    end % STATUS_STRIDE == 0
}

fn publish_failure(status: &StatusBoard, error: &JobError, percent: Option<u8>) {
    log::error!("{}", error);
    status.update(format!("{} {}", ERROR_PREFIX, error), percent);
}

fn init_target<L: DebugLink>(session: &mut DebugSession<L>) {
    let id = session.connect();
    log::info!("Target: {} ({})", id.model(), id);
}

fn discard_firmware(store: &dyn ImageStore) {
    if let Err(e) = store.remove(FIRMWARE_IMAGE) {
        log::warn!("could not remove {}: {}", FIRMWARE_IMAGE, e);
    }
}

/// Run a background job to completion and publish its outcome
pub fn run_job<L: DebugLink>(
    kind: JobKind,
    session: &mut DebugSession<L>,
    status: &StatusBoard,
    store: &dyn ImageStore,
) -> Result<(), JobError> {
    let result = match kind {
        JobKind::Dump => dump(session, status, store),
        JobKind::Flash => flash(session, status, store),
        JobKind::Verify => verify(session, status, store),
    };
    match &result {
        Ok(()) => log::info!("{} job finished", kind),
        Err(e) => publish_failure(status, e, None),
    }
    result
}

fn dump<L: DebugLink>(
    session: &mut DebugSession<L>,
    status: &StatusBoard,
    store: &dyn ImageStore,
) -> Result<(), JobError> {
    status.update("BUSY: Init Debug-Mode...", Some(0));
    // Storage is settled before the target sees any traffic
    if store.exists(DUMP_IMAGE) {
        store.remove(DUMP_IMAGE).map_err(JobError::StorageWrite)?;
    }
    let mut file = store.create(DUMP_IMAGE).map_err(JobError::StorageWrite)?;
    init_target(session);

    status.update("BUSY: Detecting Chip...", Some(0));
    let size = session
        .detect_flash_size()
        .map_err(|source| JobError::ReadFailed { address: 0, source })?;

    status.update("BUSY: [1/2] Reading Flash...", Some(0));
    let mut buf = vec![0u8; JOB_CHUNK_SIZE];
    let mut address = 0u32;
    while address < size {
        let len = JOB_CHUNK_SIZE.min((size - address) as usize);
        let chunk = &mut buf[..len];
        session
            .read_code(address, chunk)
            .map_err(|source| JobError::ReadFailed { address, source })?;
        file.write_all(chunk).map_err(JobError::StorageWrite)?;
        address += len as u32;
        if at_stride(address) {
            status.update(
                format!("BUSY: [1/2] Reading @ {}", hex_addr(address)),
                Some(scaled(address, size, 50)),
            );
        }
    }
    file.flush().map_err(JobError::StorageWrite)?;
    drop(file);

    status.update("BUSY: [2/2] Verifying...", Some(50));
    let image = store.read(DUMP_IMAGE).map_err(JobError::StorageRead)?;
    let checked = image.len().min(size as usize);
    for (address, expected) in job_chunks(&image[..checked]) {
        session
            .verify_code(address, expected)
            .map_err(|e| JobError::from_verify(address, e))?;
        let end = address + expected.len() as u32;
        if at_stride(end) {
            status.update(
                format!("BUSY: [2/2] Verifying @ {}", hex_addr(end)),
                Some(50 + scaled(end, size, 50)),
            );
        }
    }

    status.update(DUMP_READY, Some(100));
    Ok(())
}

fn flash<L: DebugLink>(
    session: &mut DebugSession<L>,
    status: &StatusBoard,
    store: &dyn ImageStore,
) -> Result<(), JobError> {
    status.update("BUSY: Preparing...", Some(0));
    if !store.exists(FIRMWARE_IMAGE) {
        return Err(JobError::FileMissing);
    }
    let firmware = store.read(FIRMWARE_IMAGE).map_err(JobError::StorageRead)?;
    init_target(session);

    // The image is used up whatever the outcome
    let result = program_and_check(session, status, &firmware);
    discard_firmware(store);
    result?;

    session.reset_target();
    status.update("Success: Flash & Verify OK!", Some(100));
    Ok(())
}

fn program_and_check<L: DebugLink>(
    session: &mut DebugSession<L>,
    status: &StatusBoard,
    firmware: &[u8],
) -> Result<(), JobError> {
    let total = firmware.len() as u32;

    status.update("BUSY: Erasing Chip...", None);
    session.chip_erase().map_err(JobError::EraseFailed)?;

    status.update("BUSY: [1/2] Writing...", Some(0));
    for (address, chunk) in job_chunks(firmware) {
        let padded;
        let data = if chunk.len() % 2 == 0 {
            chunk
        } else {
            padded = [chunk, &[PAD_BYTE][..]].concat();
            &padded[..]
        };
        session
            .write_code(address, data)
            .map_err(|source| JobError::WriteFailed { address, source })?;
        let end = address + chunk.len() as u32;
        if at_stride(end) {
            status.update(
                format!("BUSY: [1/2] Writing @ {}", hex_addr(end)),
                Some(scaled(end, total, 50)),
            );
        }
    }

    status.update("BUSY: [2/2] Verifying...", Some(50));
    for (address, expected) in job_chunks(firmware) {
        session
            .verify_code(address, expected)
            .map_err(|e| JobError::from_verify(address, e))?;
        let end = address + expected.len() as u32;
        if at_stride(end) {
            status.update(
                format!("BUSY: [2/2] Checking @ {}", hex_addr(end)),
                Some(50 + scaled(end, total, 50)),
            );
        }
    }
    Ok(())
}

fn verify<L: DebugLink>(
    session: &mut DebugSession<L>,
    status: &StatusBoard,
    store: &dyn ImageStore,
) -> Result<(), JobError> {
    status.update("BUSY: Start Verify...", Some(0));
    if !store.exists(FIRMWARE_IMAGE) {
        return Err(JobError::FileMissing);
    }
    let firmware = store.read(FIRMWARE_IMAGE).map_err(JobError::StorageRead)?;
    init_target(session);
    let total = firmware.len() as u32;

    for (address, expected) in job_chunks(&firmware) {
        session
            .verify_code(address, expected)
            .map_err(|e| JobError::from_verify(address, e))?;
        let end = address + expected.len() as u32;
        if at_stride(end) {
            status.update(
                format!("BUSY: Checking @ {}", hex_addr(end)),
                Some(scaled(end, total, 100)),
            );
        }
    }

    status.update("Success: Chip identical!", Some(100));
    Ok(())
}

/// Read-protect the chip and reset it
pub fn run_lock<L: DebugLink>(session: &mut DebugSession<L>, status: &StatusBoard) {
    status.update("BUSY: Setting Lock-Bits...", Some(0));
    session.connect();
    session.set_lock_byte(LOCK_BYTE_READ_PROTECT);
    session.reset_target();
    status.update("Success: Chip Locked (Read Protected)!", Some(100));
}

/// Erase the chip, lock bits included, and reset it
pub fn run_erase<L: DebugLink>(
    session: &mut DebugSession<L>,
    status: &StatusBoard,
) -> Result<(), JobError> {
    status.update("BUSY: Starting Chip Erase...", Some(0));
    session.connect();
    match session.chip_erase() {
        Ok(()) => {
            session.reset_target();
            status.update("Success: Chip erased & unlocked!", Some(100));
            Ok(())
        }
        Err(e) => {
            let error = JobError::EraseTimeout(e);
            publish_failure(status, &error, Some(0));
            Err(error)
        }
    }
}
