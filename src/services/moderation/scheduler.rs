use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::services::moderation::registry::{MuteRegistry, Release};

/// Counters for one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Records past their end time in the snapshot
    pub expired: usize,
    pub released: usize,
    /// Role step did not go through: the muted role was not confirmed removed
    /// on release, or not restored for a mute that replaced the expired one
    pub degraded: usize,
    /// Already unmuted or replaced by the time the sweep reached them
    pub superseded: usize,
    /// Store write failed; retried on the next sweep
    pub failed: usize,
}

/// Periodically releases mutes whose end time has passed
pub struct ExpiryScheduler {
    registry: Arc<MuteRegistry>,
    interval: Duration,
    release_timeout: Duration,
}

impl ExpiryScheduler {
    pub fn new(registry: Arc<MuteRegistry>, interval: Duration, release_timeout: Duration) -> Self {
        Self {
            registry,
            interval,
            release_timeout,
        }
    }

    /// Run the sweep on a fixed interval until the task is aborted. Each sweep
    /// runs as its own task so a panic in one pass is logged and the next tick
    /// still runs.
    pub fn spawn(self) -> JoinHandle<()> {
        let scheduler = Arc::new(self);

        tokio::spawn(async move {
            let mut ticker = interval(scheduler.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let sweeper = scheduler.clone();
                match tokio::spawn(async move { sweeper.sweep().await }).await {
                    Ok(report) if report.expired > 0 => {
                        info!(
                            "Mute sweep: {} released ({} degraded), {} superseded, {} failed",
                            report.released, report.degraded, report.superseded, report.failed
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Mute sweep aborted: {:?}", e);
                    }
                }
            }
        })
    }

    /// One pass over a snapshot of the registry
    pub async fn sweep(&self) -> SweepReport {
        let now = self.registry.now();
        let mut report = SweepReport::default();

        for record in self.registry.snapshot() {
            // Indefinite mutes never expire
            if !record.is_expired(now) {
                continue;
            }
            report.expired += 1;

            match self
                .registry
                .release_expired(&record, self.release_timeout)
                .await
            {
                Release::Released(role) => {
                    report.released += 1;
                    if role.is_degraded() {
                        report.degraded += 1;
                        warn!(
                            "Released mute for user {} in guild {} but role cleanup degraded: {:?}",
                            record.subject_id, record.guild_id, role
                        );
                    } else {
                        debug!(
                            "Released expired mute for user {} in guild {}",
                            record.subject_id, record.guild_id
                        );
                    }
                }
                Release::Replaced(role) => {
                    report.superseded += 1;
                    if role.is_degraded() {
                        report.degraded += 1;
                    }
                }
                Release::Superseded => {
                    report.superseded += 1;
                    debug!(
                        "Mute for user {} in guild {} changed during sweep, skipping",
                        record.subject_id, record.guild_id
                    );
                }
                Release::StoreFailed(e) => {
                    report.failed += 1;
                    error!(
                        "Failed to delete expired mute for user {} in guild {}: {:?}",
                        record.subject_id, record.guild_id, e
                    );
                }
            }
        }

        report
    }
}
