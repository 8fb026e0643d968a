//! clean-spawn binary
//!
//! Runs one program through a clean spawn and exits 0 if it succeeded, 1 if
//! it did not, and 2 on configuration errors.

#![allow(unused_crate_dependencies)]

use clap::Parser;
use cli::{exit_code, run, Args, EXIT_USAGE};
use cleanspawn_core::logging::init_tracing;
use tracing::error;

fn main() {
    let args = Args::parse();

    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("clean-spawn: {} ({})", e, e.code());
            std::process::exit(EXIT_USAGE);
        }
    };

    if let Err(e) = init_tracing(&config.log_level) {
        eprintln!("clean-spawn: {}", e);
    }

    let result = run(&args, &config);
    if let Err(e) = &result {
        error!("{} ({})", e, e.code());
    }
    std::process::exit(exit_code(&result));
}
