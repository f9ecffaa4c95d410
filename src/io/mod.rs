//! I/O module
//!
//! Handles journal CSV parsing and ledger output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, output serialization)
//! - `journal_reader` - Streaming journal reader with iterator interface

pub mod csv_format;
pub mod journal_reader;

pub use csv_format::{
    convert_journal_record, write_accounts_csv, write_statement_csv, JournalCsvRecord, JournalOp,
};
pub use journal_reader::JournalReader;
