//! Periodic expiry of past-due transfers
//!
//! The `ExpirySweeper` runs beside request handling on the tokio runtime. On
//! every tick it asks the engine for pages of past-due transfers until a page
//! comes back short, so no single pass holds locks across the whole table.
//! Per-transfer failures are logged by the engine and retried on the next
//! tick.

use crate::core::engine::{SweepReport, TransferEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ExpirySweeper {
    engine: Arc<TransferEngine>,
    interval: Duration,
    page_size: usize,
}

impl ExpirySweeper {
    /// # Arguments
    ///
    /// * `engine` - Engine whose pending transfers are swept
    /// * `interval` - Time between passes; zero is raised to one second
    /// * `page_size` - Transfers expired per page; zero is raised to one
    pub fn new(engine: Arc<TransferEngine>, interval: Duration, page_size: usize) -> Self {
        Self {
            engine,
            interval: interval.max(Duration::from_secs(1)),
            page_size: page_size.max(1),
        }
    }

    /// Sweeper configured from the engine's own settings
    pub fn from_engine(engine: Arc<TransferEngine>) -> Self {
        let interval = engine.config().sweep_interval();
        let page_size = engine.config().sweep_page_size;
        Self::new(engine, interval, page_size)
    }

    /// One full pass: pages through the backlog until a short page
    pub async fn sweep_once(&self) -> SweepReport {
        let mut total = SweepReport::default();
        loop {
            let page = self
                .engine
                .sweep_expired_page(total.last_id, self.page_size);
            total.absorb(page);

            if page.scanned < self.page_size {
                break;
            }
            tokio::task::yield_now().await;
        }

        if total.failed > 0 {
            warn!(
                expired = total.expired,
                failed = total.failed,
                "sweep finished with failures"
            );
        } else if total.scanned > 0 {
            info!(
                expired = total.expired,
                already_finalized = total.already_finalized,
                "sweep finished"
            );
        }
        total
    }

    /// Sweep on every tick until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            page_size = self.page_size,
            "expiry sweeper started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let report = self.sweep_once().await;
                    debug!(scanned = report.scanned, "sweeper tick");
                }
            }
        }

        info!("expiry sweeper stopped");
    }

    /// Run on the current tokio runtime
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::account_store::AccountStore;
    use crate::core::approval::ApprovalGate;
    use crate::core::ledger::LedgerRecorder;
    use crate::core::traits::{ManualClock, StaticTeamDirectory};
    use crate::types::{OwnerRef, TransferRequest, TransferStatus, UserId};
    use chrono::Duration as ChronoDuration;

    fn engine(clock: Arc<ManualClock>) -> Arc<TransferEngine> {
        let ledger = Arc::new(LedgerRecorder::new(clock.clone()));
        let accounts = Arc::new(AccountStore::new(ledger));
        let gate = ApprovalGate::new(Arc::new(StaticTeamDirectory::new()), false);
        Arc::new(TransferEngine::new(
            accounts,
            gate,
            clock,
            &EngineConfig::default(),
        ))
    }

    fn pending_transfers(engine: &TransferEngine, count: usize) {
        let from = OwnerRef::user(1);
        engine.accounts().deposit(from, 1_000).unwrap();
        for i in 0..count {
            engine
                .create(
                    TransferRequest::new(from, OwnerRef::user(100 + i as u64), 10, UserId(1))
                        .with_expire_hours(1),
                )
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_sweep_once_pages_through_everything() {
        let clock = Arc::new(ManualClock::default());
        let engine = engine(clock.clone());
        pending_transfers(&engine, 7);
        clock.advance(ChronoDuration::hours(2));

        let sweeper = ExpirySweeper::new(engine.clone(), Duration::from_secs(1), 2);
        let report = sweeper.sweep_once().await;

        assert_eq!(report.expired, 7);
        assert_eq!(report.failed, 0);
        assert_eq!(engine.pending_count(), 0);
        assert_eq!(
            engine.accounts().get_account(OwnerRef::user(1)).unwrap().locked_balance,
            0
        );
    }

    #[tokio::test]
    async fn test_sweep_once_continues_after_failed_page() {
        let clock = Arc::new(ManualClock::default());
        let engine = engine(clock.clone());
        pending_transfers(&engine, 2);
        let other = OwnerRef::user(2);
        engine.accounts().deposit(other, 50).unwrap();
        engine
            .create(TransferRequest::new(other, OwnerRef::user(3), 5, UserId(2)).with_expire_hours(1))
            .unwrap();
        // the first two holds are gone, so expiring them underflows
        engine.accounts().release(OwnerRef::user(1), 20, None).unwrap();
        clock.advance(ChronoDuration::hours(2));

        let report = ExpirySweeper::new(engine.clone(), Duration::from_secs(1), 2)
            .sweep_once()
            .await;

        assert_eq!(report.scanned, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.expired, 1);
        assert_eq!(engine.pending_count(), 2);
        assert_eq!(engine.accounts().get_account(other).unwrap().locked_balance, 0);
    }

    #[tokio::test]
    async fn test_sweep_once_ignores_transfers_not_yet_due() {
        let clock = Arc::new(ManualClock::default());
        let engine = engine(clock.clone());
        pending_transfers(&engine, 3);
        clock.advance(ChronoDuration::minutes(30));

        let report = ExpirySweeper::from_engine(engine.clone()).sweep_once().await;

        assert_eq!(report, SweepReport::default());
        assert_eq!(engine.pending_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_expires_on_tick_and_stops_on_cancel() {
        let clock = Arc::new(ManualClock::default());
        let engine = engine(clock.clone());
        pending_transfers(&engine, 1);

        let shutdown = CancellationToken::new();
        let handle = ExpirySweeper::new(engine.clone(), Duration::from_secs(60), 10)
            .spawn(shutdown.clone());

        // first tick fires immediately, nothing is due yet
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.pending_count(), 1);

        clock.advance(ChronoDuration::hours(2));
        tokio::time::sleep(Duration::from_secs(60)).await;

        let transfers = engine.transfers_for(OwnerRef::user(1)).unwrap();
        assert_eq!(transfers[0].status, TransferStatus::Expired);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn test_zero_settings_are_raised() {
        let engine = engine(Arc::new(ManualClock::default()));
        let sweeper = ExpirySweeper::new(engine, Duration::ZERO, 0);

        assert_eq!(sweeper.interval, Duration::from_secs(1));
        assert_eq!(sweeper.page_size, 1);
    }
}
