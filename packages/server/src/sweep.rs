use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use common::IntegrityStatus;
use common::integrity::{
    BatchReport, IntegrityError, RecordFilter, RecordOrder, VerificationService,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SweepConfig;

/// Records eligible for re-verification: fingerprinted or previously
/// checked, and not verified since `cutoff`. Longest-unverified first.
pub fn stale_filter(cutoff: DateTime<Utc>, limit: u64) -> RecordFilter {
    RecordFilter {
        statuses: IntegrityStatus::SWEEPABLE.to_vec(),
        not_verified_since: Some(cutoff),
        order: RecordOrder::LeastRecentlyVerified,
        limit: Some(limit),
        ..Default::default()
    }
}

/// Verify up to `batch_limit` stale records. Returns `None` when nothing is stale.
pub async fn sweep_once(
    service: &VerificationService,
    config: &SweepConfig,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<Option<BatchReport>, IntegrityError> {
    let max_age = i64::try_from(config.stale_after_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX);
    let cutoff = now
        .checked_sub_signed(max_age)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let ids: Vec<_> = service
        .store()
        .list(&stale_filter(cutoff, config.batch_limit))
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();
    if ids.is_empty() {
        return Ok(None);
    }

    let options = service.batch_options(None, None, now);
    service.verify_batch(&ids, &options, cancel).await.map(Some)
}

/// Run sweeps every `interval_secs` until `cancel` fires.
pub async fn run(service: VerificationService, config: SweepConfig, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        interval_secs = config.interval_secs,
        stale_after_secs = config.stale_after_secs,
        "Verification sweep started"
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match sweep_once(&service, &config, Utc::now(), &cancel).await {
            Ok(Some(report)) if report.corrupted + report.missing > 0 => warn!(
                total = report.total,
                corrupted = report.corrupted,
                missing = report.missing,
                "Sweep found damaged records"
            ),
            Ok(Some(report)) => info!(total = report.total, "Sweep complete"),
            Ok(None) => debug!("No stale records"),
            Err(e) => error!(error = %e, "Sweep failed"),
        }
    }

    info!("Verification sweep stopped");
}
