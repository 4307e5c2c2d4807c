//! Claiming, refusing and releasing undead and skeletal horses.

mod common;

use chrono::{Duration, Utc};
use common::{stable_in, TestWorld};
use stablemaster::storage::RecordStore;
use stablemaster::training::{Access, Cue, RemovalCause, TrainingEvent};
use tempfile::TempDir;
use uuid::Uuid;

#[test]
fn first_interaction_claims_an_unowned_undead_horse() {
    let dir = TempDir::new().expect("tempdir");
    let mut stable = stable_in(dir.path());
    let mut world = TestWorld::new();
    let id = world.spawn("undead_horse");
    let alice = Uuid::new_v4();

    assert_eq!(stable.on_interaction_attempt(world.mount_mut(id), alice, Utc::now()), Access::Allow);

    let mount = world.mount_mut(id);
    assert_eq!(mount.owner, Some(alice));
    assert!(mount.tamed);
    assert_eq!(stable.get_record(id).expect("record").owner(), Some(alice));
}

#[test]
fn other_players_are_refused() {
    let dir = TempDir::new().expect("tempdir");
    let mut stable = stable_in(dir.path());
    let mut world = TestWorld::new();
    let id = world.spawn("skeleton_horse");
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    stable.on_interaction_attempt(world.mount_mut(id), alice, Utc::now());
    stable.drain_events();

    assert_eq!(stable.on_interaction_attempt(world.mount_mut(id), bob, Utc::now()), Access::Deny);
    assert_eq!(world.mount_mut(id).owner, Some(alice));
    let events = stable.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        TrainingEvent::Notice { actor, text, cue: Some(Cue::Refuse), .. }
            if *actor == bob && text == "Undead and skeletal horses can only be accessed by their owner."
    ));
    assert_eq!(stable.on_interaction_attempt(world.mount_mut(id), alice, Utc::now()), Access::Allow);
}

#[test]
fn ordinary_horses_are_open_to_everyone() {
    let dir = TempDir::new().expect("tempdir");
    let mut stable = stable_in(dir.path());
    let mut world = TestWorld::new();
    let id = world.spawn("bay_horse");
    let owner = Uuid::new_v4();
    world.mount_mut(id).owner = Some(owner);

    assert_eq!(stable.on_interaction_attempt(world.mount_mut(id), Uuid::new_v4(), Utc::now()), Access::Allow);
    assert_eq!(world.mount_mut(id).owner, Some(owner));
}

#[test]
fn abandoned_horse_is_released_and_reclaimed() {
    let dir = TempDir::new().expect("tempdir");
    let mut stable = stable_in(dir.path());
    let mut world = TestWorld::new();
    let id = world.spawn("undead_horse");
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let now = Utc::now();

    stable.on_interaction_attempt(world.mount_mut(id), alice, now - Duration::days(15));
    stable.save().expect("save");

    assert_eq!(stable.on_interaction_attempt(world.mount_mut(id), bob, now), Access::Allow);

    assert_eq!(world.mount_mut(id).owner, Some(bob));
    let record = stable.get_record(id).expect("fresh record");
    assert!(record.is_new());
    assert_eq!(record.owner(), Some(bob));
    assert_eq!(record.last_accessed(), now);
    assert_eq!(stable.registry().len(), 1);

    stable.save().expect("save");
    let stored = stable.registry().store().load_horses().expect("load");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].owner(), Some(bob));
}

#[test]
fn named_horse_is_never_abandoned() {
    let dir = TempDir::new().expect("tempdir");
    let mut stable = stable_in(dir.path());
    let mut world = TestWorld::new();
    let id = world.spawn("undead_horse");
    world.mount_mut(id).custom_name = Some("Bones".to_string());
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let now = Utc::now();

    stable.on_interaction_attempt(world.mount_mut(id), alice, now - Duration::days(400));
    assert_eq!(stable.on_interaction_attempt(world.mount_mut(id), bob, now), Access::Deny);
    assert_eq!(world.mount_mut(id).owner, Some(alice));
}

#[test]
fn owned_undead_horse_is_protected_until_abandoned() {
    let dir = TempDir::new().expect("tempdir");
    let mut stable = stable_in(dir.path());
    let mut world = TestWorld::new();
    let id = world.spawn("undead_horse");
    let alice = Uuid::new_v4();
    let now = Utc::now();
    stable.on_interaction_attempt(world.mount_mut(id), alice, now - Duration::days(10));

    assert_eq!(stable.on_damage_attempt(world.mount_mut(id), false, now), Access::Deny);
    assert_eq!(stable.on_damage_attempt(world.mount_mut(id), true, now), Access::Allow);

    let later = now + Duration::days(10);
    assert_eq!(stable.on_damage_attempt(world.mount_mut(id), false, later), Access::Allow);
    assert_eq!(world.mount_mut(id).owner, None);
    assert!(stable.registry().find(id).is_none());
}

#[test]
fn death_drops_the_record_from_storage() {
    let dir = TempDir::new().expect("tempdir");
    let mut stable = stable_in(dir.path());
    let mut world = TestWorld::new();
    let id = world.spawn("bay_horse");
    stable.on_spawn(world.mount_mut(id), Utc::now());
    stable.save().expect("save");

    let removed = stable.on_entity_removed(id, RemovalCause::Death).expect("was tracked");
    assert_eq!(removed.id(), id);
    assert!(stable.on_entity_removed(id, RemovalCause::Death).is_none());
    stable.save().expect("save");
    assert!(stable.registry().store().load_horses().expect("load").is_empty());
}

#[test]
fn only_the_owner_may_feed_or_water_an_undead_horse() {
    let dir = TempDir::new().expect("tempdir");
    let mut stable = stable_in(dir.path());
    let mut world = TestWorld::new();
    let id = world.spawn("undead_horse");
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    stable.on_interaction_attempt(world.mount_mut(id), alice, Utc::now());
    world.mount_mut(id).health = 10.0;
    stable.drain_events();

    assert_eq!(
        stable.on_food_consumption_attempt(world.mount_mut(id), bob, "golden_apple", 1, Utc::now()),
        0
    );
    assert!(!stable.on_water_consumption_attempt(world.mount_mut(id), bob, Utc::now()));

    let record = stable.get_record(id).expect("record");
    assert_eq!(record.nuggets_eaten(), 0);
    assert_eq!(record.health_level(), 1);
    assert_eq!(record.hydration(), 0.5);
    assert_eq!(world.mount_mut(id).health, 10.0);
    let events = stable.drain_events();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| matches!(e, TrainingEvent::Notice { actor, cue: Some(Cue::Refuse), .. } if *actor == bob)));

    assert_eq!(
        stable.on_food_consumption_attempt(world.mount_mut(id), alice, "golden_apple", 2, Utc::now()),
        72
    );
    assert_eq!(stable.get_record(id).expect("record").nuggets_eaten(), 72);
}
