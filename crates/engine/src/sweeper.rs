// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic reconciliation
//!
//! Events can be lost (a crashed process, a failed resume), so the sweeper
//! re-derives everything from persisted state on a fixed interval.

use crate::config::CoordinationConfig;
use crate::report::SweepReport;
use crate::service::CoordinationService;
use muster_adapters::{HierarchyAdapter, NotifyAdapter, StatusAdapter};
use muster_core::{Clock, IdGen};
use muster_storage::{BarrierStore, ConstraintStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Runs [`CoordinationService::sweep`] until told to stop
pub struct Sweeper<S, St, N, H, C, I> {
    service: Arc<CoordinationService<S, St, N, H, C>>,
    id_gen: I,
    interval: Duration,
    app_id: Option<String>,
}

impl<S, St, N, H, C, I> Sweeper<S, St, N, H, C, I>
where
    S: ConstraintStore + BarrierStore,
    St: StatusAdapter,
    N: NotifyAdapter,
    H: HierarchyAdapter,
    C: Clock,
    I: IdGen,
{
    pub fn new(service: Arc<CoordinationService<S, St, N, H, C>>, id_gen: I) -> Self {
        let CoordinationConfig {
            sweep_interval,
            sweep_app_id,
            ..
        } = service.config().clone();
        Self {
            service,
            id_gen,
            interval: sweep_interval.max(MIN_INTERVAL),
            app_id: sweep_app_id,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One sweep pass, logged under a fresh sweep id
    pub async fn tick(&self) -> SweepReport {
        let span = tracing::info_span!("sweep", sweep_id = %self.id_gen.next());
        self.sweep().instrument(span).await
    }

    async fn sweep(&self) -> SweepReport {
        let report = self.service.sweep(self.app_id.as_deref()).await;
        if report.is_idle() {
            tracing::debug!("sweep idle");
        } else {
            tracing::info!(
                finished = report.consumers_finished,
                unblocked = report.consumers_unblocked,
                resolved = report.barriers_resolved,
                settled = report.barriers_settled,
                failures = report.failures.len(),
                "sweep complete"
            );
        }
        report
    }

    /// Sweep every interval until `shutdown` flips to `true` or its sender
    /// is dropped. Returns the number of passes made.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> usize {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passes = 0;

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "sweeper started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                    passes += 1;
                }

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        tracing::info!("shutdown sender dropped, stopping sweeper");
                        break;
                    }
                }
            }
        }

        tracing::info!(passes, "sweeper stopped");
        passes
    }
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
