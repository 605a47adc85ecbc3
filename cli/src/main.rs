//! Reforge CLI.
//!
//! ```text
//! reforge [status]   tracked records per owner and tier
//! reforge backup     copy the snapshot aside
//! reforge run        host autosave and sweep until Ctrl-C
//! ```
//!
//! The CLI has no game host attached: `run` keeps the snapshot maintained
//! with an empty roster and logs presentation calls instead of sending them.

use anyhow::{Context, Result, bail};
use std::{
    collections::BTreeMap,
    env,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use reforge_config::ReforgeConfig;
use reforge_core::{CollaboratorError, OwnerHandle, Presenter, ReforgeContext, TierCatalog};
use reforge_engine::{Maintenance, MaintenanceSchedule, Roster};
use reforge_types::{FeedbackCue, OwnerId, PositionHint, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Backup,
    Run,
}

impl Command {
    fn parse(arg: Option<&str>) -> Result<Self> {
        match arg {
            None | Some("status") => Ok(Self::Status),
            Some("backup") => Ok(Self::Backup),
            Some("run") => Ok(Self::Run),
            Some(other) => bail!("unknown command '{other}' (expected status, backup, or run)"),
        }
    }
}

fn init_tracing(data_dir: &Path) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_path = data_dir.join("logs").join("reforge.log");
    let opened = log_path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| OpenOptions::new().create(true).append(true).open(&log_path));

    match opened {
        Ok(file) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(env_filter)
                .init();
            tracing::info!(path = %log_path.display(), "Logging initialized");
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(env_filter)
                .init();
            tracing::warn!(path = %log_path.display(), "Failed to open log file, logging to stderr: {e}");
        }
    }
}

/// Logs presentation calls; there is no client to send them to.
struct LogPresenter;

impl Presenter for LogPresenter {
    fn relabel(
        &self,
        owner: &OwnerId,
        position: &PositionHint,
        label: &str,
    ) -> Result<(), CollaboratorError> {
        tracing::debug!(%owner, %position, label, "Relabel");
        Ok(())
    }

    fn cue(&self, owner: &OwnerId, cue: FeedbackCue, sound: Option<&str>) {
        tracing::debug!(%owner, cue = cue.as_str(), sound, "Cue");
    }
}

struct EmptyRoster;

impl Roster for EmptyRoster {
    fn online(&self) -> Vec<Arc<dyn OwnerHandle>> {
        Vec::new()
    }
}

fn load_config() -> Result<ReforgeConfig> {
    let config = ReforgeConfig::load().context("loading config")?;
    Ok(config.unwrap_or_default())
}

/// `+2 [++ ] Deadly +15% x3`
fn tier_summary(catalog: &TierCatalog, tier: Tier, count: usize) -> String {
    format!(
        "{tier} {} {} +{}% x{count}",
        TierCatalog::progress_bar(tier),
        catalog.display(tier),
        catalog.damage_bonus_percent(tier),
    )
}

fn print_status(ctx: &ReforgeContext) {
    println!("snapshot: {}", ctx.snapshot_path().display());
    println!("tracked:  {}", ctx.count());

    for owner in ctx.owners() {
        let mut per_tier: BTreeMap<Tier, usize> = BTreeMap::new();
        for record in ctx.records_for(&owner) {
            *per_tier.entry(record.tier).or_default() += 1;
        }
        let summary: Vec<String> = per_tier
            .iter()
            .rev()
            .map(|(tier, n)| tier_summary(ctx.catalog(), *tier, *n))
            .collect();
        println!("  {owner}: {}", summary.join(", "));
    }
}

async fn run(ctx: Arc<ReforgeContext>, config: &ReforgeConfig) -> Result<()> {
    let schedule = MaintenanceSchedule::from_config(config);
    let maintenance = Maintenance::start(ctx, Arc::new(EmptyRoster), schedule);
    println!("maintaining {} (Ctrl-C to stop)", maintenance.context().snapshot_path().display());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;

    let report = maintenance.shutdown().await;
    match &report.backup {
        Some(path) => println!("backup:   {}", path.display()),
        None => println!("backup:   none (no snapshot yet)"),
    }
    println!("flushed:  {}", report.flushed);
    println!("tracked:  {}", report.records);
    if !report.flushed {
        bail!("final flush failed; see log for details");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let command = Command::parse(env::args().nth(1).as_deref())?;
    let config = load_config()?;
    let data_dir: PathBuf = config.storage.resolved_data_dir();
    init_tracing(&data_dir);

    let ctx = ReforgeContext::open(&config, Arc::new(LogPresenter))
        .context("invalid reforge configuration")?;

    match command {
        Command::Status => print_status(&ctx),
        Command::Backup => match ctx.backup() {
            Some(path) => println!("backup written to {}", path.display()),
            None => println!("no snapshot at {}; nothing to back up", ctx.snapshot_path().display()),
        },
        Command::Run => run(Arc::new(ctx), &config).await?,
    }
    Ok(())
}
