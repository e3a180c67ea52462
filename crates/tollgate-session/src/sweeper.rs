//! Periodic cleanup of expired registry slots and stale session records.

use crate::context::SessionContext;
use crate::error::SessionError;
use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub registry_slots: usize,
    pub session_records: u64,
}

/// Purge expired registry slots and records whose refresh credential has lapsed.
pub async fn sweep_once(ctx: &SessionContext) -> Result<SweepReport, SessionError> {
    let refresh_ttl = chrono::Duration::from_std(ctx.lifetimes.refresh).unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(refresh_ttl)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

    let (registry_slots, session_records) =
        tokio::try_join!(ctx.registry.purge_expired(), ctx.store.purge_issued_before(cutoff))?;

    Ok(SweepReport {
        registry_slots,
        session_records,
    })
}

/// Run [`sweep_once`] every `interval` until the task is aborted.
pub fn spawn_sweeper(ctx: SessionContext, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match sweep_once(&ctx).await {
                Ok(report) if report != SweepReport::default() => {
                    tracing::info!(
                        registry_slots = report.registry_slots,
                        session_records = report.session_records,
                        "Session sweep completed"
                    );
                }
                Ok(_) => tracing::debug!("Session sweep found nothing to purge"),
                Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
            }
        }
    })
}
