//! CSV format handling for journal records and ledger output
//!
//! This module centralizes all CSV format concerns, providing:
//! - `JournalCsvRecord` structure for deserialization
//! - Conversion from CSV records to [`JournalOp`]
//! - Account and statement output serialization
//!
//! All functions are pure (no I/O beyond the supplied writer) for easy testing.

use crate::types::{
    format_grams, parse_grams, Account, ActorId, Amount, LedgerEntry, OwnerRef, TeamId,
    TransferId, TransferRequest, UserId,
};
use serde::Deserialize;
use std::io::Write;

/// Largest clock step a single `advance` row may take (about a century)
pub const MAX_ADVANCE_HOURS: i64 = 100 * 365 * 24;

/// CSV record structure for deserialization
///
/// Matches the journal columns `op,actor,from,to,amount,transfer,hours,note`.
/// Every column but `op` is optional; which ones an operation needs is
/// checked by [`convert_journal_record`].
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct JournalCsvRecord {
    pub op: String,
    pub actor: Option<u64>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<String>,
    pub transfer: Option<u64>,
    pub hours: Option<i64>,
    pub note: Option<String>,
}

/// One replayable journal operation
#[derive(Debug, Clone)]
pub enum JournalOp {
    /// `actor` becomes a core member of `team`
    Member { team: TeamId, actor: ActorId },
    Ensure { owner: OwnerRef },
    Deposit { owner: OwnerRef, amount: Amount },
    Withdraw { owner: OwnerRef, amount: Amount },
    Freeze { owner: OwnerRef, reason: String },
    Unfreeze { owner: OwnerRef },
    Create(TransferRequest),
    Confirm { transfer: TransferId, actor: ActorId },
    Reject {
        transfer: TransferId,
        actor: ActorId,
        reason: String,
    },
    /// Move the replay clock forward
    Advance { hours: i64 },
    Sweep,
}

/// Convert a JournalCsvRecord to a JournalOp
///
/// # Arguments
///
/// * `record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(JournalOp) - Successfully converted operation
/// - Err(String) - Error message describing the conversion failure
pub fn convert_journal_record(record: JournalCsvRecord) -> Result<JournalOp, String> {
    let op = record.op.trim().to_lowercase();

    let op = match op.as_str() {
        "member" => {
            let team = match owner_column(&record.to, "to", &op)? {
                OwnerRef::Team(team) => team,
                OwnerRef::User(_) => {
                    return Err("member requires a team in 'to'".to_string());
                }
            };
            JournalOp::Member {
                team,
                actor: actor_column(&record, &op)?,
            }
        }
        "ensure" => JournalOp::Ensure {
            owner: owner_column(&record.from, "from", &op)?,
        },
        "deposit" => JournalOp::Deposit {
            owner: owner_column(&record.from, "from", &op)?,
            amount: amount_column(&record, &op)?,
        },
        "withdraw" => JournalOp::Withdraw {
            owner: owner_column(&record.from, "from", &op)?,
            amount: amount_column(&record, &op)?,
        },
        "freeze" => JournalOp::Freeze {
            owner: owner_column(&record.from, "from", &op)?,
            reason: note(&record)
                .filter(|reason| !reason.is_empty())
                .ok_or_else(|| "freeze requires a reason in 'note'".to_string())?,
        },
        "unfreeze" => JournalOp::Unfreeze {
            owner: owner_column(&record.from, "from", &op)?,
        },
        "create" => {
            let mut request = TransferRequest::new(
                owner_column(&record.from, "from", &op)?,
                owner_column(&record.to, "to", &op)?,
                amount_column(&record, &op)?,
                actor_column(&record, &op)?,
            );
            request.expire_hours = record.hours;
            if let Some(notes) = note(&record) {
                request = request.with_notes(notes);
            }
            JournalOp::Create(request)
        }
        "confirm" => JournalOp::Confirm {
            transfer: transfer_column(&record, &op)?,
            actor: actor_column(&record, &op)?,
        },
        "reject" => JournalOp::Reject {
            transfer: transfer_column(&record, &op)?,
            actor: actor_column(&record, &op)?,
            reason: note(&record).unwrap_or_default(),
        },
        "advance" => match record.hours {
            Some(hours) if hours > 0 && hours <= MAX_ADVANCE_HOURS => JournalOp::Advance { hours },
            Some(hours) if hours > MAX_ADVANCE_HOURS => {
                return Err(format!(
                    "advance of {} hours exceeds the limit of {}",
                    hours, MAX_ADVANCE_HOURS
                ));
            }
            _ => return Err("advance requires a positive 'hours'".to_string()),
        },
        "sweep" => JournalOp::Sweep,
        _ => return Err(format!("Invalid operation: '{}'", record.op)),
    };

    Ok(op)
}

fn owner_column(value: &Option<String>, column: &str, op: &str) -> Result<OwnerRef, String> {
    match value.as_deref().map(str::trim) {
        Some(owner) if !owner.is_empty() => owner.parse(),
        _ => Err(format!("{} requires an owner in '{}'", op, column)),
    }
}

fn actor_column(record: &JournalCsvRecord, op: &str) -> Result<ActorId, String> {
    record
        .actor
        .map(UserId)
        .ok_or_else(|| format!("{} requires an 'actor'", op))
}

fn transfer_column(record: &JournalCsvRecord, op: &str) -> Result<TransferId, String> {
    record
        .transfer
        .map(TransferId)
        .ok_or_else(|| format!("{} requires a 'transfer'", op))
}

fn amount_column(record: &JournalCsvRecord, op: &str) -> Result<Amount, String> {
    match record.amount.as_deref().map(str::trim) {
        Some(amount) if !amount.is_empty() => parse_grams(amount).map_err(|e| e.to_string()),
        _ => Err(format!("{} requires an 'amount'", op)),
    }
}

fn note(record: &JournalCsvRecord) -> Option<String> {
    record.note.as_deref().map(|note| note.trim().to_string())
}

/// Write account states to CSV format
///
/// Columns: owner, kind, balance, locked, available, status, frozen_reason.
/// Amounts are in grams with three decimals. Accounts are sorted by owner
/// for deterministic output.
///
/// # Arguments
///
/// * `accounts` - Slice of account states to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "owner",
            "kind",
            "balance",
            "locked",
            "available",
            "status",
            "frozen_reason",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.owner);

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.owner.to_string(),
                account.owner_kind().to_string(),
                format_grams(account.balance),
                format_grams(account.locked_balance),
                format_grams(account.available_balance()),
                account.status.as_str().to_string(),
                account.frozen_reason().unwrap_or_default().to_string(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write ledger entries to CSV format, in the order given
///
/// Columns: id, transfer, type, amount, before, after. Entries without a
/// transfer leave that column empty.
pub fn write_statement_csv(entries: &[LedgerEntry], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["id", "transfer", "type", "amount", "before", "after"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for entry in entries {
        writer
            .write_record(&[
                entry.id.to_string(),
                entry
                    .transfer
                    .map(|transfer| transfer.to_string())
                    .unwrap_or_default(),
                entry.entry_type.to_string(),
                format_grams(entry.amount),
                format_grams(entry.balance_before),
                format_grams(entry.balance_after),
            ])
            .map_err(|e| format!("Failed to write ledger record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
