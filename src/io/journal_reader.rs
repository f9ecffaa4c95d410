//! Streaming reader over journal CSV files
//!
//! Yields one [`JournalOp`] per row. Delegates format concerns to the
//! `csv_format` module.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as `Err` items carrying the line
//!   number, so callers can report them and keep going
//!
//! ```no_run
//! use tea_ledger::io::JournalReader;
//! use std::path::Path;
//!
//! let reader = JournalReader::new(Path::new("journal.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(op) => println!("{:?}", op),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! ```

use crate::io::csv_format::{convert_journal_record, JournalCsvRecord, JournalOp};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Journal CSV reader
#[derive(Debug)]
pub struct JournalReader<R: Read = File> {
    reader: csv::Reader<R>,
    line_num: usize,
}

impl JournalReader<File> {
    /// Open a journal file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> JournalReader<R> {
    /// Read a journal from any byte source
    ///
    /// The CSV reader trims every field and accepts short rows, so trailing
    /// empty columns may be left out.
    pub fn from_reader(source: R) -> Self {
        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(source);

        Self {
            reader,
            line_num: 1,
        }
    }
}

impl<R: Read> Iterator for JournalReader<R> {
    type Item = Result<JournalOp, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<JournalCsvRecord>();
        let row = deserializer.next()?;
        self.line_num += 1;

        Some(match row {
            Ok(record) => convert_journal_record(record)
                .map_err(|e| format!("Line {}: {}", self.line_num, e)),
            Err(e) => Err(format!("Line {}: CSV parse error: {}", self.line_num, e)),
        })
    }
}
