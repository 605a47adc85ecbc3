//! Parallel actions from independent owners sharing one context.

use std::sync::Arc;
use std::thread;

use reforge_core::{SnapshotStore, ThreadDice};
use reforge_types::{ActionDeclined, InstanceIdentity, Tier};
use tempfile::tempdir;

use crate::common::{QueuedDice, Satchel, config_in, open, open_with, owner, request, sword};

#[test]
fn parallel_owners_lose_no_updates() {
    let dir = tempdir().expect("tempdir");
    let (ctx, _) = open(dir.path());

    let workers: Vec<_> = (0..8)
        .map(|n| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                let who = format!("owner-{n}");
                let mut satchel = Satchel::with_bars(100);
                // Always upgrade: one step per action until max.
                for slot in 0..5 {
                    let req = request(&who, sword(), slot, "Iron Sword");
                    for draw in [0.70, 0.85] {
                        ctx.reforge(&req, &mut satchel, &mut QueuedDice::new([draw]))
                            .expect("reforge");
                    }
                }
                satchel.bars
            })
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().expect("worker"), 90);
    }

    assert_eq!(ctx.count(), 40);
    for n in 0..8 {
        let records = ctx.records_for(&owner(&format!("owner-{n}")));
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.tier == Tier::new(2).expect("tier")));
    }

    assert!(ctx.close().flushed);
    let loaded = SnapshotStore::new(dir.path(), "weapon_upgrades.json").load();
    assert_eq!(loaded.entries.len(), 40);
}

#[test]
fn concurrent_threshold_crossings_still_persist_everything() {
    let dir = tempdir().expect("tempdir");
    let mut config = config_in(dir.path());
    config.storage.autosave_threshold = 7;
    let (ctx, _) = open_with(&config);

    let workers: Vec<_> = (0..6)
        .map(|n| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                let who = owner(&format!("owner-{n}"));
                for _ in 0..25 {
                    ctx.set_tier(&who, &InstanceIdentity::mint(), Tier::MAX, &sword());
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker");
    }

    assert_eq!(ctx.count(), 150);
    assert!(ctx.dirty() < 150);
    assert!(ctx.flush());
    let loaded = SnapshotStore::new(dir.path(), "weapon_upgrades.json").load();
    assert_eq!(loaded.entries.len(), 150);
}

#[test]
fn random_actions_across_threads_keep_tiers_valid() {
    let dir = tempdir().expect("tempdir");
    let (ctx, _) = open(dir.path());

    let workers: Vec<_> = (0..4)
        .map(|n| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                let who = format!("owner-{n}");
                let mut satchel = Satchel::with_bars(1_000);
                for round in 0..200u16 {
                    let req = request(&who, sword(), round % 4, "Iron Sword");
                    match ctx.reforge(&req, &mut satchel, &mut ThreadDice) {
                        Ok(_) | Err(ActionDeclined::AlreadyMaxTier) => {}
                        Err(other) => panic!("unexpected decline: {other}"),
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker");
    }

    for n in 0..4 {
        for record in ctx.records_for(&owner(&format!("owner-{n}"))) {
            assert!(record.tier > Tier::BASE && record.tier <= Tier::MAX);
        }
    }
    assert!(ctx.count() <= 16);
}
