//! Tea ledger CLI
//!
//! Replays a journal of ledger operations and prints the resulting accounts.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- journal.csv > accounts.csv
//! cargo run -- --config engine.yaml journal.csv > accounts.csv
//! cargo run -- --statement u:1 journal.csv > statement.csv
//! RUST_LOG=debug cargo run -- journal.csv
//! ```
//!
//! Logs go to stderr; stdout carries only CSV.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (bad config, journal not found or not readable, ledger mismatch)

use std::process;
use tea_ledger::cli;
use tea_ledger::config::EngineConfig;
use tea_ledger::logging::init_logging;
use tea_ledger::replay::run_journal;

fn main() {
    let args = cli::parse_args();

    let config = match &args.config {
        Some(path) => match EngineConfig::read(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    if let Err(e) = init_logging(level) {
        eprintln!("Warning: {}", e);
    }
    let config = config.validated();

    let mut output = std::io::stdout();
    if let Err(e) = run_journal(&args.input_file, &config, args.statement, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
