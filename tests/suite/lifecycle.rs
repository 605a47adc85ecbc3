//! Open, persist, restart, and recover.

use std::fs;

use reforge_core::{FlushStatus, SnapshotStore, persistence};
use reforge_types::{InstanceIdentity, ItemMove, PositionHint, Tier};
use tempfile::tempdir;

use crate::common::{QueuedDice, Satchel, config_in, open, open_with, owner, request, sword};

#[test]
fn upgrades_survive_restart_at_the_same_slot() {
    let dir = tempdir().expect("tempdir");
    let req = request("alice", sword(), 3, "Iron Sword");

    let first = {
        let (ctx, _) = open(dir.path());
        let report = ctx
            .reforge(&req, &mut Satchel::with_bars(1), &mut QueuedDice::new([0.70]))
            .expect("reforge");
        assert!(ctx.close().flushed);
        report
    };

    let (ctx, _) = open(dir.path());
    let alice = owner("alice");
    assert_eq!(ctx.tier_of(&alice, &first.instance), Tier::new(1).expect("tier"));
    assert_eq!(
        ctx.tier_at(&alice, &sword(), &PositionHint::hotbar(3)),
        Tier::new(1).expect("tier")
    );

    let second = ctx
        .reforge(&req, &mut Satchel::with_bars(1), &mut QueuedDice::new([0.85]))
        .expect("reforge");
    assert_eq!(second.instance, first.instance);
    assert_eq!(second.tier(), Some(Tier::new(2).expect("tier")));
}

#[test]
fn swapped_items_keep_their_tiers_across_restart() {
    let dir = tempdir().expect("tempdir");
    let alice = owner("alice");
    let axe = crate::common::kind("Weapon_Axe_Iron");

    {
        let (ctx, _) = open(dir.path());
        let sword_id = ctx
            .resolve(Some(&alice), Some(&sword()), &PositionHint::hotbar(0))
            .expect("resolve")
            .identity;
        let axe_id = ctx
            .resolve(Some(&alice), Some(&axe), &PositionHint::hotbar(1))
            .expect("resolve")
            .identity;
        ctx.set_tier(&alice, &sword_id, Tier::MAX, &sword());
        ctx.set_tier(&alice, &axe_id, Tier::new(1).expect("tier"), &axe);

        let moved = ctx.relocate(&[
            ItemMove::within(alice.clone(), sword(), PositionHint::hotbar(0), PositionHint::hotbar(1)),
            ItemMove::within(alice.clone(), axe.clone(), PositionHint::hotbar(1), PositionHint::hotbar(0)),
        ]);
        assert_eq!(moved, 2);
        ctx.close();
    }

    let (ctx, _) = open(dir.path());
    assert_eq!(ctx.tier_at(&alice, &sword(), &PositionHint::hotbar(1)), Tier::MAX);
    assert_eq!(
        ctx.tier_at(&alice, &axe, &PositionHint::hotbar(0)),
        Tier::new(1).expect("tier")
    );
    assert_eq!(ctx.tier_at(&alice, &sword(), &PositionHint::hotbar(0)), Tier::BASE);
}

#[test]
fn timed_autosave_persists_a_swap_without_close() {
    let dir = tempdir().expect("tempdir");
    let alice = owner("alice");
    let (slot0, slot1) = (PositionHint::hotbar(0), PositionHint::hotbar(1));

    {
        let (ctx, _) = open(dir.path());
        for (slot, tier) in [(&slot0, Tier::MAX), (&slot1, Tier::new(1).expect("tier"))] {
            let id = ctx
                .resolve(Some(&alice), Some(&sword()), slot)
                .expect("resolve")
                .identity;
            ctx.set_tier(&alice, &id, tier, &sword());
        }
        assert!(ctx.flush());

        let moved = ctx.relocate(&[
            ItemMove::within(alice.clone(), sword(), slot0.clone(), slot1.clone()),
            ItemMove::within(alice.clone(), sword(), slot1.clone(), slot0.clone()),
        ]);
        assert_eq!(moved, 2);
        assert_eq!(ctx.dirty(), 2);
        assert_eq!(ctx.flush_if_dirty(), FlushStatus::Saved);
        // Dropped without close, as after a crash.
    }

    let (ctx, _) = open(dir.path());
    assert_eq!(ctx.tier_at(&alice, &sword(), &slot0), Tier::new(1).expect("tier"));
    assert_eq!(ctx.tier_at(&alice, &sword(), &slot1), Tier::MAX);
}

#[test]
fn corrupt_snapshot_boots_empty_and_is_replaced() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("weapon_upgrades.json");
    fs::write(&path, "{\"schemaVersion\": 1, \"records\": [").expect("write");

    let (ctx, _) = open(dir.path());
    assert_eq!(ctx.count(), 0);

    ctx.set_tier(&owner("bob"), &InstanceIdentity::mint(), Tier::MAX, &sword());
    assert!(ctx.flush());
    let loaded = SnapshotStore::new(dir.path(), "weapon_upgrades.json").load();
    assert_eq!(loaded.entries.len(), 1);
}

#[test]
fn autosave_after_ten_writes_without_explicit_flush() {
    let dir = tempdir().expect("tempdir");
    let (ctx, _) = open(dir.path());
    let alice = owner("alice");
    let ids: Vec<InstanceIdentity> = (0..10).map(|_| InstanceIdentity::mint()).collect();

    for (i, id) in ids.iter().enumerate() {
        if i == 9 {
            assert!(!ctx.snapshot_path().exists(), "no write before the threshold");
        }
        ctx.set_tier(&alice, id, Tier::new(1).expect("tier"), &sword());
    }

    let json = fs::read_to_string(ctx.snapshot_path()).expect("autosaved snapshot");
    let loaded = persistence::decode(&json).expect("decode");
    let mut saved: Vec<InstanceIdentity> = loaded.entries.iter().map(|e| e.record.instance).collect();
    let mut expected = ids.clone();
    saved.sort();
    expected.sort();
    assert_eq!(saved, expected);
}

#[test]
fn snapshot_document_matches_the_published_layout() {
    let dir = tempdir().expect("tempdir");
    let (ctx, _) = open(dir.path());
    let alice = owner("alice");
    let id = ctx
        .resolve(Some(&alice), Some(&sword()), &PositionHint::hotbar(7))
        .expect("resolve")
        .identity;
    ctx.set_tier(&alice, &id, Tier::new(2).expect("tier"), &sword());
    assert!(ctx.flush());

    let json = fs::read_to_string(ctx.snapshot_path()).expect("read");
    let value: serde_json::Value = serde_json::from_str(&json).expect("json");
    assert_eq!(value["schemaVersion"], 1);
    assert!(value["savedAt"].as_i64().is_some_and(|t| t > 0));

    let record = &value["records"][id.to_string()];
    assert_eq!(record["level"], 2);
    assert_eq!(record["itemId"], "Weapon_Sword_Iron");
    assert_eq!(record["instanceId"], id.to_string());
    assert_eq!(record["ownerTag"], "alice");
    assert!(record["lastModified"].as_i64().is_some());
    assert_eq!(record["slotDigest"].as_str().map(str::len), Some(32));
}

#[test]
fn unwritable_directory_keeps_memory_authoritative() {
    let dir = tempdir().expect("tempdir");
    let blocker = dir.path().join("occupied");
    fs::write(&blocker, b"not a directory").expect("write");
    let mut config = config_in(&blocker);
    config.storage.autosave_threshold = 1;
    let (ctx, _) = open_with(&config);
    let alice = owner("alice");

    for _ in 0..3 {
        ctx.set_tier(&alice, &InstanceIdentity::mint(), Tier::MAX, &sword());
    }
    assert_eq!(ctx.count(), 3);
    assert_eq!(ctx.dirty(), 3);

    let report = ctx.close();
    assert!(!report.flushed);
    assert_eq!(report.backup, None);
    assert_eq!(report.records, 3);
}

#[test]
fn backups_accumulate_with_timestamped_names() {
    let dir = tempdir().expect("tempdir");
    let (ctx, _) = open(dir.path());
    assert_eq!(ctx.backup(), None);

    ctx.set_tier(&owner("alice"), &InstanceIdentity::mint(), Tier::MAX, &sword());
    assert!(ctx.flush());
    let a = ctx.backup().expect("first backup");
    let b = ctx.backup().expect("second backup");
    assert_ne!(a, b);

    let backups = fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("weapon_upgrades_backup_")
        })
        .count();
    assert_eq!(backups, 2);
}

#[test]
fn leftover_bak_file_is_recovered_on_open() {
    let dir = tempdir().expect("tempdir");
    {
        let (ctx, _) = open(dir.path());
        ctx.set_tier(&owner("alice"), &InstanceIdentity::mint(), Tier::MAX, &sword());
        assert!(ctx.flush());
    }
    let path = dir.path().join("weapon_upgrades.json");
    fs::rename(&path, path.with_extension("bak")).expect("park snapshot");

    let (ctx, _) = open(dir.path());
    assert_eq!(ctx.count(), 1);
    assert!(path.exists());
}
