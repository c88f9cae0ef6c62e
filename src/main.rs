use lc3_vm::{Console, ExecutionState, TerminalConsole, Vm, VmError};

use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

/// LC-3 virtual machine
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Object files to load, in order, before execution starts
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let console = match TerminalConsole::new() {
        Ok(console) => console,
        Err(err) => {
            log::error!("failed to initialize terminal: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut vm = Vm::new(console);

    if let Err(err) = load_images(&mut vm, &args.images) {
        log::error!("{err}");
        return ExitCode::FAILURE;
    }

    let interrupted = vm.interrupt_flag();
    if let Err(err) = ctrlc::set_handler(move || {
        interrupted.store(true, std::sync::atomic::Ordering::Relaxed);
    }) {
        log::warn!("failed to install Ctrl-C handler: {err}");
    }

    match vm.run() {
        ExecutionState::Halted => ExitCode::SUCCESS,
        ExecutionState::Interrupted => ExitCode::FAILURE,
        ExecutionState::Aborted(_) => ExitCode::FAILURE,
    }
}

/// Loads every image in order, logging each path, and stops at the first failure — later
/// images (and execution itself) never happen if an earlier one doesn't load.
fn load_images<C: Console>(vm: &mut Vm<C>, paths: &[PathBuf]) -> Result<(), VmError> {
    for path in paths {
        log::info!("loading image {}", path.display());
        load_image(vm, path)?;
    }
    Ok(())
}

fn load_image<C: Console>(vm: &mut Vm<C>, path: &PathBuf) -> Result<(), VmError> {
    let file = File::open(path).map_err(|source| VmError::ImageLoad {
        path: path.clone(),
        source,
    })?;
    vm.load_image(file).map_err(|source| VmError::ImageLoad {
        path: path.clone(),
        source,
    })
}
