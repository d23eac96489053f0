//! Job commands: dump, flash, verify, erase and lock
//!
//! The long jobs run on the controller's worker thread. This side only
//! polls the status query and mirrors it on a progress bar.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use ccflasher_flash::{FlasherController, JobHandle, Status, DUMP_IMAGE};
use indicatif::{ProgressBar, ProgressStyle};

use super::CommandError;

/// How often the status is polled while a job runs
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Create the percent progress bar used for all jobs
fn create_job_progress_bar() -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Mirror one status snapshot on the bar
fn show_status(pb: &ProgressBar, status: &Status) {
    // Contended reads return a placeholder; keep the last real state
    if status == &Status::busy_placeholder() {
        return;
    }
    pb.set_position(status.percent as u64);
    pb.set_message(status.message.clone());
}

/// Follow a job until it ends and return its final status
fn follow_job(
    controller: &FlasherController,
    job: JobHandle,
) -> Result<Status, Box<dyn std::error::Error>> {
    let pb = create_job_progress_bar()?;
    log::debug!("Following {} job", job.kind());

    while !job.is_finished() {
        show_status(&pb, &controller.status());
        thread::sleep(POLL_INTERVAL);
    }

    let result = job.join();
    let status = controller.status();
    show_status(&pb, &status);

    match result {
        Ok(()) => {
            pb.finish_with_message(status.message.clone());
            Ok(status)
        }
        Err(e) => {
            pb.abandon_with_message(status.message.clone());
            log::debug!("Job failed: {:?}", e);
            Err(CommandError::Failed(status.message).into())
        }
    }
}

/// Read a firmware image and hand it to the controller
fn upload_firmware(
    controller: &FlasherController,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    println!("Read {} bytes from {:?}", data.len(), input);
    controller.store_firmware(&data)?;
    Ok(())
}

/// Dump the whole flash to `output`
pub fn run_dump(
    controller: &FlasherController,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let job = controller.start_dump()?;
    let status = follow_job(controller, job)?;

    if !status.is_dump_ready() {
        return Err(CommandError::Failed(status.message).into());
    }

    let image = controller.store().read(DUMP_IMAGE)?;
    fs::write(output, &image)?;
    println!(
        "Wrote {} bytes ({}) to {:?}",
        image.len(),
        super::format_size(image.len() as u32),
        output
    );
    Ok(())
}

/// Erase, program and verify `input`
pub fn run_flash(
    controller: &FlasherController,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    upload_firmware(controller, input)?;
    let job = controller.start_flash()?;
    let status = follow_job(controller, job)?;
    println!("{}", status.message);
    Ok(())
}

/// Compare flash against `input`
pub fn run_verify(
    controller: &FlasherController,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    upload_firmware(controller, input)?;
    let job = controller.start_verify()?;
    let status = follow_job(controller, job)?;
    println!("{}", status.message);
    Ok(())
}

/// Erase the whole chip
pub fn run_erase(controller: &FlasherController) -> Result<(), Box<dyn std::error::Error>> {
    let result = controller.erase_chip();
    let status = controller.status();
    match result {
        Ok(()) => {
            println!("{}", status.message);
            Ok(())
        }
        Err(e) => {
            log::debug!("Erase failed: {:?}", e);
            Err(CommandError::Failed(status.message).into())
        }
    }
}

/// Read-protect the chip
pub fn run_lock(controller: &FlasherController) -> Result<(), Box<dyn std::error::Error>> {
    controller.lock_chip()?;
    println!("{}", controller.status().message);
    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::commands::open_controller;

    fn workdir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("ccflasher-cli-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_dump_writes_output() {
        let dir = workdir("dump");
        let controller = open_controller("dummy:size=8K", Some(&dir)).unwrap();
        let output = dir.join("out.bin");

        run_dump(&controller, &output).unwrap();

        // Erased flash does not alias visibly, so the nominal size is dumped
        let image = fs::read(&output).unwrap();
        assert_eq!(image.len(), 32 * 1024);
        assert!(image.iter().all(|&b| b == 0xFF));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_flash_then_verify() {
        let dir = workdir("flash");
        let controller = open_controller("dummy", Some(&dir)).unwrap();
        let input = dir.join("fw.bin");
        let firmware: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&input, &firmware).unwrap();

        run_flash(&controller, &input).unwrap();
        assert_eq!(controller.status().message, "Success: Flash & Verify OK!");

        run_verify(&controller, &input).unwrap();
        assert_eq!(controller.status().message, "Success: Chip identical!");

        // A different image is reported as a mismatch
        fs::write(&input, [0x00u8; 4]).unwrap();
        let err = run_verify(&controller, &input).unwrap_err();
        assert_eq!(err.to_string(), "Error: Mismatch @ 0x0001 (Exp:00 Act:01)");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_lock_and_erase() {
        let dir = workdir("lock");
        let controller = open_controller("dummy:chip=cc2530", Some(&dir)).unwrap();

        run_lock(&controller).unwrap();
        assert_eq!(
            controller.status().message,
            "Success: Chip Locked (Read Protected)!"
        );
        run_erase(&controller).unwrap();
        assert_eq!(controller.status().message, "Success: Chip erased & unlocked!");
        let _ = fs::remove_dir_all(&dir);
    }
}
