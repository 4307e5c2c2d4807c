//! Per-rider preferences.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Preferences a rider can set for every horse they ride.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderPrefs {
    /// Ride no faster than this Speed level, even on a better trained horse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speed_level: Option<u32>,
}

impl RiderPrefs {
    pub fn is_default(&self) -> bool {
        self.max_speed_level.is_none()
    }
}

/// In-memory rider preferences with change tracking.
#[derive(Debug, Default)]
pub struct RiderBook {
    prefs: HashMap<Uuid, RiderPrefs>,
    dirty: HashSet<Uuid>,
}

impl RiderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, entries: Vec<(Uuid, RiderPrefs)>) {
        self.prefs.extend(entries);
        self.dirty.clear();
    }

    pub fn max_speed_level(&self, rider: Uuid) -> Option<u32> {
        self.prefs.get(&rider).and_then(|p| p.max_speed_level)
    }

    /// Set or clear a rider's Speed cap. A cap of 0 is treated as no cap.
    pub fn set_max_speed_level(&mut self, rider: Uuid, level: Option<u32>) {
        let level = level.filter(|l| *l > 0);
        let entry = self.prefs.entry(rider).or_default();
        if entry.max_speed_level == level {
            return;
        }
        entry.max_speed_level = level;
        self.dirty.insert(rider);
    }

    /// Changed entries since the last call, including ones reset to defaults.
    pub fn take_dirty(&mut self) -> Vec<(Uuid, RiderPrefs)> {
        let ids: Vec<Uuid> = self.dirty.drain().collect();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let prefs = self.prefs.get(&id).cloned().unwrap_or_default();
            if prefs.is_default() {
                self.prefs.remove(&id);
            }
            out.push((id, prefs));
        }
        out
    }

    /// Put entries back after a failed write so the next cycle retries them.
    pub fn restore_dirty(&mut self, entries: Vec<(Uuid, RiderPrefs)>) {
        for (id, prefs) in entries {
            self.dirty.insert(id);
            if !prefs.is_default() {
                self.prefs.entry(id).or_insert(prefs);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.prefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_changes_are_tracked_once() {
        let mut book = RiderBook::new();
        let rider = Uuid::new_v4();
        book.set_max_speed_level(rider, Some(5));
        book.set_max_speed_level(rider, Some(5));
        assert_eq!(book.max_speed_level(rider), Some(5));
        let dirty = book.take_dirty();
        assert_eq!(dirty.len(), 1);
        assert!(book.take_dirty().is_empty());
    }

    #[test]
    fn clearing_cap_drops_entry() {
        let mut book = RiderBook::new();
        let rider = Uuid::new_v4();
        book.set_max_speed_level(rider, Some(3));
        book.take_dirty();
        book.set_max_speed_level(rider, Some(0));
        let dirty = book.take_dirty();
        assert_eq!(dirty, vec![(rider, RiderPrefs::default())]);
        assert!(book.is_empty());
    }
}
