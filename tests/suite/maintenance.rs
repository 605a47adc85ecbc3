//! Background maintenance on a paused tokio clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reforge_core::OwnerHandle;
use reforge_engine::{Maintenance, MaintenanceSchedule, Roster};
use reforge_types::{InstanceIdentity, PositionHint, Tier};
use tempfile::tempdir;

use crate::common::{Holder, held, open, owner, sword};

struct Online {
    holders: Vec<Arc<Holder>>,
    polls: AtomicUsize,
}

impl Roster for Online {
    fn online(&self) -> Vec<Arc<dyn OwnerHandle>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.holders
            .iter()
            .map(|h| Arc::clone(h) as Arc<dyn OwnerHandle>)
            .collect()
    }
}

async fn settle(mut done: impl FnMut() -> bool) {
    for _ in 0..500 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("background work did not settle");
}

#[tokio::test(start_paused = true)]
async fn sweeps_and_autosaves_on_their_own_schedules() {
    let dir = tempdir().expect("tempdir");
    let (ctx, presenter) = open(dir.path());
    let alice = owner("alice");
    let id = ctx
        .resolve(Some(&alice), Some(&sword()), &PositionHint::hotbar(0))
        .expect("resolve")
        .identity;
    ctx.set_tier(&alice, &id, Tier::MAX, &sword());

    let roster = Arc::new(Online {
        holders: vec![Holder::new("alice", vec![held(sword(), 0, "Iron Sword")])],
        polls: AtomicUsize::new(0),
    });
    let maintenance = Maintenance::start(
        Arc::clone(&ctx),
        roster.clone(),
        MaintenanceSchedule {
            autosave_every: Duration::from_secs(300),
            sweep_every: Duration::from_secs(30),
        },
    );

    tokio::time::sleep(Duration::from_secs(31)).await;
    settle(|| presenter.relabels() == 1).await;
    assert_eq!(
        presenter.label("alice", &PositionHint::hotbar(0)).as_deref(),
        Some("[+3] Legendary Iron Sword")
    );
    assert!(!ctx.snapshot_path().exists(), "autosave waits a full period");

    tokio::time::sleep(Duration::from_secs(270)).await;
    settle(|| ctx.snapshot_path().exists()).await;
    assert_eq!(ctx.dirty(), 0);
    assert!(roster.polls.load(Ordering::SeqCst) >= 10);

    let report = maintenance.shutdown().await;
    assert!(report.flushed);
    assert!(report.backup.is_some());
    assert_eq!(report.records, 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_persists_unflushed_writes() {
    let dir = tempdir().expect("tempdir");
    let (ctx, _) = open(dir.path());
    let alice = owner("alice");
    let roster = Arc::new(Online {
        holders: Vec::new(),
        polls: AtomicUsize::new(0),
    });
    let maintenance = Maintenance::start(
        Arc::clone(&ctx),
        roster,
        MaintenanceSchedule::from_config(&crate::common::config_in(dir.path())),
    );

    for _ in 0..3 {
        ctx.set_tier(&alice, &InstanceIdentity::mint(), Tier::new(2).expect("tier"), &sword());
    }
    let report = maintenance.shutdown().await;
    assert!(report.flushed);
    assert_eq!(report.backup, None);
    drop(ctx);

    let (reopened, _) = open(dir.path());
    assert_eq!(reopened.count(), 3);
    assert_eq!(reopened.records_for(&alice).len(), 3);
}
