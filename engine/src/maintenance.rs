use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use reforge_config::ReforgeConfig;
use reforge_core::{FlushStatus, OwnerHandle, ReforgeContext};

/// Owners currently online. Polled once per sweep.
pub trait Roster: Send + Sync {
    fn online(&self) -> Vec<Arc<dyn OwnerHandle>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceSchedule {
    pub autosave_every: Duration,
    pub sweep_every: Duration,
}

impl MaintenanceSchedule {
    /// Periods from config. Zero is raised to one second.
    #[must_use]
    pub fn from_config(config: &ReforgeConfig) -> Self {
        let secs = |s: u64| Duration::from_secs(s.max(1));
        Self {
            autosave_every: secs(config.storage.autosave_interval_secs),
            sweep_every: secs(config.sweep.interval_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub backup: Option<PathBuf>,
    pub flushed: bool,
    pub records: usize,
}

/// Handle to the running background tasks.
pub struct Maintenance {
    ctx: Arc<ReforgeContext>,
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Maintenance {
    /// Spawn both loops on the current runtime. Each first runs one full
    /// period after start.
    #[must_use]
    pub fn start(
        ctx: Arc<ReforgeContext>,
        roster: Arc<dyn Roster>,
        schedule: MaintenanceSchedule,
    ) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let autosave = tokio::spawn(autosave_loop(
            Arc::clone(&ctx),
            stop_rx.clone(),
            schedule.autosave_every,
        ));
        let sweep = tokio::spawn(sweep_loop(
            Arc::clone(&ctx),
            roster,
            stop_rx,
            schedule.sweep_every,
        ));
        tracing::info!(
            autosave_secs = schedule.autosave_every.as_secs(),
            sweep_secs = schedule.sweep_every.as_secs(),
            "Maintenance started"
        );
        Self {
            ctx,
            stop,
            tasks: vec![autosave, sweep],
        }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<ReforgeContext> {
        &self.ctx
    }

    /// Stop both loops, wait for any cycle in progress, then back up and
    /// flush one last time.
    pub async fn shutdown(mut self) -> ShutdownReport {
        self.stop.send_replace(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!("Maintenance task ended abnormally: {e}");
            }
        }

        let ctx = Arc::clone(&self.ctx);
        let report = match tokio::task::spawn_blocking(move || ctx.close()).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Close task failed, closing inline: {e}");
                self.ctx.close()
            }
        };
        tracing::info!(records = report.records, flushed = report.flushed, "Maintenance stopped");
        ShutdownReport {
            backup: report.backup,
            flushed: report.flushed,
            records: report.records,
        }
    }
}

impl Drop for Maintenance {
    fn drop(&mut self) {
        // Best-effort stop if the caller never shut down; do not block in Drop.
        self.stop.send_replace(true);
    }
}

/// Wait for the next tick. Returns false once stop is signalled.
async fn next_cycle(ticks: &mut tokio::time::Interval, stop: &mut watch::Receiver<bool>) -> bool {
    if *stop.borrow() {
        return false;
    }
    tokio::select! {
        biased;
        _ = stop.changed() => false,
        _ = ticks.tick() => !*stop.borrow(),
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticks
}

async fn autosave_loop(ctx: Arc<ReforgeContext>, mut stop: watch::Receiver<bool>, period: Duration) {
    let mut ticks = ticker(period);
    while next_cycle(&mut ticks, &mut stop).await {
        let ctx = Arc::clone(&ctx);
        match tokio::task::spawn_blocking(move || ctx.flush_if_dirty()).await {
            Ok(FlushStatus::Clean) => tracing::trace!("Autosave skipped, store clean"),
            Ok(FlushStatus::Saved) => tracing::debug!("Autosave complete"),
            // Already logged by the snapshot store; the store stays dirty.
            Ok(FlushStatus::Failed) => {}
            Err(e) => tracing::warn!("Autosave task failed: {e}"),
        }
    }
}

async fn sweep_loop(
    ctx: Arc<ReforgeContext>,
    roster: Arc<dyn Roster>,
    mut stop: watch::Receiver<bool>,
    period: Duration,
) {
    let mut ticks = ticker(period);
    while next_cycle(&mut ticks, &mut stop).await {
        let owners = roster.online();
        if owners.is_empty() {
            continue;
        }
        let ctx = Arc::clone(&ctx);
        if let Err(e) = tokio::task::spawn_blocking(move || ctx.sweep(&owners)).await {
            tracing::warn!("Sweep task failed: {e}");
        }
    }
}
