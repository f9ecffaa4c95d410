use crate::types::OwnerRef;
use clap::Parser;
use std::path::PathBuf;

/// Replay a tea-ledger journal
#[derive(Parser, Debug)]
#[command(name = "tea-ledger")]
#[command(
    about = "Replay a tea-ledger journal and print account balances",
    long_about = None
)]
pub struct CliArgs {
    /// Journal CSV file path
    #[arg(value_name = "JOURNAL", help = "Path to the journal CSV file")]
    pub input_file: PathBuf,

    /// YAML engine configuration
    #[arg(
        long = "config",
        value_name = "FILE",
        help = "YAML engine configuration (defaults are used when omitted)"
    )]
    pub config: Option<PathBuf>,

    /// Print one owner's ledger entries instead of the account table
    #[arg(
        long = "statement",
        value_name = "OWNER",
        value_parser = parse_owner,
        help = "Write the ledger statement of OWNER (u:<id> or t:<id>)"
    )]
    pub statement: Option<OwnerRef>,

    /// Log filter, overriding the configured level
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        help = "Log level or filter directive (RUST_LOG takes precedence)"
    )]
    pub log_level: Option<String>,
}

fn parse_owner(value: &str) -> Result<OwnerRef, String> {
    value.parse()
}
