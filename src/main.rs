//! ccflasher - Programmer and debugger for TI CC111x/CC253x radio SoCs
//!
//! Talks to the 8051 core of the target over the two-wire debug interface
//! (DC/DD plus reset) to dump, program, verify, erase and lock the on-chip
//! flash, and to halt, step and inspect the CPU.
//!
//! # Architecture
//!
//! Every command opens a programmer from the registry and wraps it in a
//! `FlasherController`. Dump, flash and verify run on the controller's job
//! thread and are followed through its status query; everything else runs
//! inline while holding the controller's busy gate.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let workdir = cli.workdir.as_deref();

    let result = match cli.command {
        Commands::Info { programmer } => {
            let controller = commands::open_controller(&programmer, workdir)?;
            let report = commands::chip::probe_chip(&controller)?;
            commands::chip::print_chip_info(&report);
            Ok(())
        }
        Commands::Dump { programmer, output } => {
            let controller = commands::open_controller(&programmer, workdir)?;
            commands::jobs::run_dump(&controller, &output)
        }
        Commands::Flash { programmer, input } => {
            let controller = commands::open_controller(&programmer, workdir)?;
            commands::jobs::run_flash(&controller, &input)
        }
        Commands::Verify { programmer, input } => {
            let controller = commands::open_controller(&programmer, workdir)?;
            commands::jobs::run_verify(&controller, &input)
        }
        Commands::Erase { programmer } => {
            let controller = commands::open_controller(&programmer, workdir)?;
            commands::jobs::run_erase(&controller)
        }
        Commands::Lock { programmer } => {
            let controller = commands::open_controller(&programmer, workdir)?;
            commands::jobs::run_lock(&controller)
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::Debug {
            programmer,
            command,
        } => {
            let controller = commands::open_controller(&programmer, workdir)?;
            commands::debug::run_debug(&controller, &command)
        }
    };

    if let Err(e) = result {
        match e.downcast_ref::<commands::CommandError>() {
            // Already carries the "Error:" status prefix
            Some(commands::CommandError::Failed(message)) => eprintln!("{}", message),
            _ => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }

    Ok(())
}
