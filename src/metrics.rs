//! Process-wide training counters.
//! Counters live in the embedding process; reading and exporting them is left
//! to the host through [`snapshot`].
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::training::types::Ability;

static IMPLAUSIBLE_MOVES: AtomicU64 = AtomicU64::new(0);
static REJECTED_EFFORT: AtomicU64 = AtomicU64::new(0);
static DEHYDRATION_WARNINGS: AtomicU64 = AtomicU64::new(0);
static SAVE_CYCLES: AtomicU64 = AtomicU64::new(0);
static SAVE_FAILURES: AtomicU64 = AtomicU64::new(0);
static RECORDS_WRITTEN: AtomicU64 = AtomicU64::new(0);
static RECORDS_PURGED: AtomicU64 = AtomicU64::new(0);

static LEVEL_UPS: OnceLock<Mutex<HashMap<Ability, u64>>> = OnceLock::new();

pub fn inc_implausible_moves() {
    IMPLAUSIBLE_MOVES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_rejected_effort() {
    REJECTED_EFFORT.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_dehydration_warnings() {
    DEHYDRATION_WARNINGS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_save_cycles() {
    SAVE_CYCLES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_save_failures() {
    SAVE_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn add_records_written(count: usize) {
    RECORDS_WRITTEN.fetch_add(count as u64, Ordering::Relaxed);
}

pub fn add_records_purged(count: usize) {
    RECORDS_PURGED.fetch_add(count as u64, Ordering::Relaxed);
}

fn level_up_lock() -> &'static Mutex<HashMap<Ability, u64>> {
    LEVEL_UPS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn record_level_up(ability: Ability) -> u64 {
    let mut guard = level_up_lock().lock().expect("level-up mutex poisoned");
    let counter = guard.entry(ability).or_default();
    *counter = counter.saturating_add(1);
    *counter
}

pub fn level_ups_snapshot() -> HashMap<Ability, u64> {
    level_up_lock().lock().expect("level-up mutex poisoned").clone()
}

#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub implausible_moves: u64,
    pub rejected_effort: u64,
    pub dehydration_warnings: u64,
    pub save_cycles: u64,
    pub save_failures: u64,
    pub records_written: u64,
    pub records_purged: u64,
    pub level_ups: HashMap<Ability, u64>,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        implausible_moves: IMPLAUSIBLE_MOVES.load(Ordering::Relaxed),
        rejected_effort: REJECTED_EFFORT.load(Ordering::Relaxed),
        dehydration_warnings: DEHYDRATION_WARNINGS.load(Ordering::Relaxed),
        save_cycles: SAVE_CYCLES.load(Ordering::Relaxed),
        save_failures: SAVE_FAILURES.load(Ordering::Relaxed),
        records_written: RECORDS_WRITTEN.load(Ordering::Relaxed),
        records_purged: RECORDS_PURGED.load(Ordering::Relaxed),
        level_ups: level_ups_snapshot(),
    }
}
