//! codepad - terminal code playground
//!
//! Usage:
//!   codepad                          # defaults, plus ~/.config/codepad/config.toml if present
//!   codepad --config pad.toml        # explicit config file
//!   codepad --log-file codepad.log   # write logs (filter with CODEPAD_LOG)
//!
//! Keys:
//!   Ctrl-R, F5        # Run the buffer
//!   Ctrl-Q, Ctrl-C    # Quit
//!   F1                # Help

use clap::Parser as ClapParser;
use codepad::{PlaygroundConfig, logging};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ClapParser)]
#[command(name = "codepad")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Terminal code playground with a live console", long_about = None)]
struct Args {
    /// Config file (default: ~/.config/codepad/config.toml if it exists)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Width in columns at or below which the panes stack vertically
    #[arg(long, value_name = "N")]
    breakpoint: Option<u16>,

    /// Maximum interpreter steps per run
    #[arg(long, value_name = "N")]
    step_limit: Option<u64>,
}

fn load_config(args: &Args) -> Result<PlaygroundConfig, String> {
    let mut config = PlaygroundConfig::load(args.config.as_deref()).map_err(|e| e.to_string())?;
    if let Some(breakpoint) = args.breakpoint {
        config.breakpoint = breakpoint;
    }
    if let Some(step_limit) = args.step_limit {
        config.step_limit = step_limit;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(path) = &args.log_file
        && let Err(e) = logging::init(path)
    {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match codepad::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
