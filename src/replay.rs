//! Journal replay pipeline
//!
//! Drives a fresh engine from a journal CSV and writes the resulting account
//! states (or one owner's statement) as CSV. Time is a [`ManualClock`]
//! starting at the Unix epoch and moved only by `advance` rows, so a
//! journal always replays to the same output. Team membership comes from
//! `member` rows.
//!
//! # Error Handling
//!
//! Fatal errors (file not found, I/O errors) are returned. Row errors and
//! business errors are logged with their line number and processing
//! continues with the next row.

use crate::config::EngineConfig;
use crate::core::{
    AccountStore, ApprovalGate, LedgerRecorder, ManualClock, StaticTeamDirectory, TransferEngine,
};
use crate::io::{write_accounts_csv, write_statement_csv, JournalOp, JournalReader};
use crate::types::{LedgerEntry, LedgerError, OwnerRef, Page, MAX_PAGE_SIZE};
use chrono::{DateTime, Duration, Utc};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine plus the collaborators a journal controls
pub struct JournalReplay {
    engine: Arc<TransferEngine>,
    clock: Arc<ManualClock>,
    directory: Arc<StaticTeamDirectory>,
}

impl JournalReplay {
    pub fn new(config: &EngineConfig) -> Self {
        let clock = Arc::new(ManualClock::new(DateTime::<Utc>::UNIX_EPOCH));
        let directory = Arc::new(StaticTeamDirectory::new());
        let ledger = Arc::new(LedgerRecorder::new(clock.clone()));
        let accounts = Arc::new(AccountStore::new(ledger));
        let gate = ApprovalGate::new(directory.clone(), config.allow_self_approval);
        let engine = Arc::new(TransferEngine::new(
            accounts,
            gate,
            clock.clone(),
            config,
        ));

        Self {
            engine,
            clock,
            directory,
        }
    }

    pub fn engine(&self) -> &Arc<TransferEngine> {
        &self.engine
    }

    /// Apply one journal operation
    pub fn apply(&self, op: JournalOp) -> Result<(), LedgerError> {
        let accounts = self.engine.accounts();
        match op {
            JournalOp::Member { team, actor } => {
                self.directory.add_core_member(team, actor);
            }
            JournalOp::Ensure { owner } => {
                accounts.ensure_account(owner)?;
            }
            JournalOp::Deposit { owner, amount } => {
                accounts.deposit(owner, amount)?;
            }
            JournalOp::Withdraw { owner, amount } => {
                accounts.withdraw(owner, amount)?;
            }
            JournalOp::Freeze { owner, reason } => {
                accounts.freeze(owner, &reason)?;
            }
            JournalOp::Unfreeze { owner } => {
                accounts.unfreeze(owner)?;
            }
            JournalOp::Create(request) => {
                self.engine.create(request)?;
            }
            JournalOp::Confirm { transfer, actor } => {
                self.engine.confirm(transfer, actor)?;
            }
            JournalOp::Reject {
                transfer,
                actor,
                reason,
            } => {
                self.engine.reject(transfer, actor, &reason)?;
            }
            JournalOp::Advance { hours } => {
                let by = Duration::try_hours(hours).ok_or_else(|| {
                    LedgerError::invalid_input(format!("cannot advance by {} hours", hours))
                })?;
                let now = self.clock.try_advance(by)?;
                debug!(hours, now = %now, "clock advanced");
            }
            JournalOp::Sweep => {
                let expired = self.engine.sweep_expired();
                info!(expired, "sweep row applied");
            }
        }
        Ok(())
    }

    /// Every ledger entry of `owner`, newest first
    pub fn statement(&self, owner: OwnerRef) -> Result<Vec<LedgerEntry>, LedgerError> {
        let ledger = self.engine.accounts().ledger();
        let mut entries = Vec::new();
        let mut page = Page::new(0, MAX_PAGE_SIZE);
        loop {
            let batch = ledger.entries(owner, page)?;
            let more = batch.has_next();
            entries.extend(batch.items);
            if !more {
                return Ok(entries);
            }
            page = Page::new(page.number + 1, page.size);
        }
    }
}

/// Replay a journal file and write the outcome
///
/// # Arguments
///
/// * `input_path` - Journal CSV to replay
/// * `config` - Engine configuration
/// * `statement` - When set, write this owner's ledger entries instead of
///   the account table
/// * `output` - Writer receiving the CSV
///
/// # Returns
///
/// * `Ok(())` if the journal was replayed (possibly with row errors)
/// * `Err(String)` if a fatal error occurred
pub fn run_journal(
    input_path: &Path,
    config: &EngineConfig,
    statement: Option<OwnerRef>,
    output: &mut dyn Write,
) -> Result<(), String> {
    let replay = JournalReplay::new(config);
    let reader = JournalReader::new(input_path)?;

    let mut applied = 0usize;
    let mut failed = 0usize;
    for (index, result) in reader.enumerate() {
        let line = index + 2;
        match result {
            Ok(op) => match replay.apply(op) {
                Ok(()) => applied += 1,
                Err(e) => {
                    failed += 1;
                    warn!(line, kind = e.kind(), error = %e, "journal operation failed");
                }
            },
            Err(e) => {
                failed += 1;
                warn!(error = %e, "journal row skipped");
            }
        }
    }
    info!(applied, failed, "journal replayed");

    let mismatched = replay
        .engine()
        .accounts()
        .ledger()
        .reconcile(replay.engine().accounts())
        .map_err(|e| e.to_string())?;
    if !mismatched.is_empty() {
        return Err(format!(
            "Ledger does not reconcile for {} account(s)",
            mismatched.len()
        ));
    }

    match statement {
        Some(owner) => {
            let entries = replay.statement(owner).map_err(|e| e.to_string())?;
            write_statement_csv(&entries, output)
        }
        None => {
            let accounts = replay
                .engine()
                .accounts()
                .list_accounts()
                .map_err(|e| e.to_string())?;
            write_accounts_csv(&accounts, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransferId, TransferRequest, TransferStatus, UserId};
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn run(content: &str, statement: Option<OwnerRef>) -> String {
        let file = create_temp_csv(content);
        let mut output = Vec::new();
        run_journal(file.path(), &EngineConfig::default(), statement, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_replay_confirmed_transfer() {
        let output = run(
            "op,actor,from,to,amount,transfer,hours,note\n\
             deposit,,u:1,,100,,,\n\
             create,1,u:1,u:2,40,,1,\n\
             confirm,2,,,,1,,\n",
            None,
        );

        assert_eq!(
            output,
            "owner,kind,balance,locked,available,status,frozen_reason\n\
             u:1,user,60.000,0.000,60.000,normal,\n\
             u:2,user,40.000,0.000,40.000,normal,\n"
        );
    }

    #[test]
    fn test_replay_continues_after_errors() {
        let output = run(
            "op,actor,from,to,amount,transfer,hours,note\n\
             deposit,,u:1,,10,,,\n\
             create,1,u:1,u:2,50,,,\n\
             nonsense,,,,,,,\n\
             withdraw,,u:1,,4,,,\n",
            None,
        );

        assert!(output.contains("u:1,user,6.000,0.000,6.000,normal,"));
        assert!(output.contains("u:2,user,0.000,0.000,0.000,normal,"));
    }

    #[test]
    fn test_replay_statement() {
        let output = run(
            "op,actor,from,to,amount,transfer,hours,note\n\
             deposit,,u:1,,5,,,\n\
             create,1,u:1,u:2,2,,,\n\
             reject,2,,,,1,,no thanks\n",
            Some(OwnerRef::user(1)),
        );

        assert_eq!(
            output,
            "id,transfer,type,amount,before,after\n\
             3,1,release,2.000,5.000,5.000\n\
             2,1,hold,2.000,5.000,5.000\n\
             1,,credit,5.000,0.000,5.000\n"
        );
    }

    #[test]
    fn test_missing_journal_is_fatal() {
        let mut output = Vec::new();
        let result = run_journal(
            Path::new("missing.csv"),
            &EngineConfig::default(),
            None,
            &mut output,
        );
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_advance_and_sweep_expire_transfer() {
        let replay = JournalReplay::new(&EngineConfig::default());
        let owner = OwnerRef::user(1);
        replay
            .apply(JournalOp::Deposit {
                owner,
                amount: 1_000,
            })
            .unwrap();
        replay
            .apply(JournalOp::Create(
                TransferRequest::new(owner, OwnerRef::user(2), 500, UserId(1))
                    .with_expire_hours(3),
            ))
            .unwrap();

        replay.apply(JournalOp::Advance { hours: 3 }).unwrap();
        replay.apply(JournalOp::Sweep).unwrap();
        assert!(replay.engine().get_transfer(TransferId(1)).unwrap().is_pending());

        replay.apply(JournalOp::Advance { hours: 1 }).unwrap();
        replay.apply(JournalOp::Sweep).unwrap();
        assert_eq!(
            replay.engine().get_transfer(TransferId(1)).unwrap().status,
            TransferStatus::Expired
        );
    }

    #[test]
    fn test_advance_out_of_clock_range_is_rejected() {
        let replay = JournalReplay::new(&EngineConfig::default());

        let result = replay.apply(JournalOp::Advance { hours: i64::MAX });

        assert!(matches!(result.unwrap_err(), LedgerError::InvalidInput { .. }));
        replay.apply(JournalOp::Advance { hours: 1 }).unwrap();
    }

    #[test]
    fn test_oversized_advance_row_is_skipped() {
        let output = run(
            "op,actor,from,to,amount,transfer,hours,note\n\
             deposit,,u:1,,1,,,\n\
             advance,,,,,,9000000000000,\n\
             create,1,u:1,u:2,1,,1,\n\
             advance,,,,,,2,\n\
             sweep,,,,,,,\n",
            None,
        );

        assert_eq!(
            output,
            "owner,kind,balance,locked,available,status,frozen_reason\n\
             u:1,user,1.000,0.000,1.000,normal,\n\
             u:2,user,0.000,0.000,0.000,normal,\n"
        );
    }

    #[test]
    fn test_statement_spans_pages() {
        let replay = JournalReplay::new(&EngineConfig::default());
        let owner = OwnerRef::team(1);
        for _ in 0..(MAX_PAGE_SIZE + 5) {
            replay.apply(JournalOp::Deposit { owner, amount: 1 }).unwrap();
        }

        let entries = replay.statement(owner).unwrap();

        assert_eq!(entries.len(), MAX_PAGE_SIZE + 5);
        assert_eq!(entries[0].balance_after, (MAX_PAGE_SIZE + 5) as u64);
    }
}
