//! # Horse Registry
//!
//! The authoritative in-memory set of [`TrainedHorse`] records, at most one per
//! live mount. All lookups, creations and removals go through here, and so does
//! persistence: [`HorseRegistry::save_all`] writes every dirty record together
//! with queued deletions as one batch.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::logutil::escape_log;
use crate::metrics;
use crate::storage::backup::{BackupManager, BackupMetadata, BackupType};
use crate::storage::RecordStore;
use crate::training::errors::TrainingError;
use crate::training::host::{MountHandle, Simulation};
use crate::training::types::TrainedHorse;

pub struct HorseRegistry {
    horses: HashMap<Uuid, TrainedHorse>,
    removed: HashSet<Uuid>,
    store: Box<dyn RecordStore>,
    backups: Option<BackupManager>,
}

impl HorseRegistry {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self {
            horses: HashMap::new(),
            removed: HashSet::new(),
            store,
            backups: None,
        }
    }

    /// Attach a backup manager used before startup purges and save retries.
    pub fn with_backups(mut self, backups: BackupManager) -> Self {
        self.backups = Some(backups);
        self
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn backups(&self) -> Option<&BackupManager> {
        self.backups.as_ref()
    }

    /// Existing record for the mount, or a fresh default record copied from it.
    pub fn find_or_create(&mut self, mount: &dyn MountHandle, now: DateTime<Utc>) -> &mut TrainedHorse {
        let id = mount.id();
        self.removed.remove(&id);
        self.horses.entry(id).or_insert_with(|| {
            debug!("Tracking new horse {} ({})", id, escape_log(&mount.appearance()));
            let mut horse = TrainedHorse::new(id, mount.owner(), mount.appearance(), now);
            horse.set_display_name(mount.custom_name().as_deref());
            horse.set_location(Some(mount.location()));
            horse
        })
    }

    pub fn find(&self, id: Uuid) -> Option<&TrainedHorse> {
        self.horses.get(&id)
    }

    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut TrainedHorse> {
        self.horses.get_mut(&id)
    }

    /// Lookup for callers that require the record to exist.
    pub fn get(&self, id: Uuid) -> Result<&TrainedHorse, TrainingError> {
        self.horses
            .get(&id)
            .ok_or_else(|| TrainingError::NotFound(format!("horse: {}", id)))
    }

    pub fn get_mut(&mut self, id: Uuid) -> Result<&mut TrainedHorse, TrainingError> {
        self.horses
            .get_mut(&id)
            .ok_or_else(|| TrainingError::NotFound(format!("horse: {}", id)))
    }

    /// Insert a prepared record, replacing any record with the same id.
    pub fn insert(&mut self, horse: TrainedHorse) {
        self.removed.remove(&horse.id());
        self.horses.insert(horse.id(), horse);
    }

    /// Evict a record and queue its deletion from storage.
    pub fn remove(&mut self, id: Uuid) -> Option<TrainedHorse> {
        let removed = self.horses.remove(&id);
        if removed.is_some() {
            self.removed.insert(id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.horses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.horses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrainedHorse> {
        self.horses.values()
    }

    /// Records waiting to be written.
    pub fn pending_writes(&self) -> usize {
        self.horses.values().filter(|h| h.is_dirty() || h.is_new()).count() + self.removed.len()
    }

    /// Exchange the trained stats of two records.
    pub fn swap_training_stats(&mut self, a: Uuid, b: Uuid) -> Result<(), TrainingError> {
        if a == b {
            return Err(TrainingError::Validation("cannot swap a horse with itself".to_string()));
        }
        let mut first = self
            .horses
            .remove(&a)
            .ok_or_else(|| TrainingError::NotFound(format!("horse: {}", a)))?;
        let result = match self.horses.get_mut(&b) {
            Some(second) => {
                first.swap_training_stats(second);
                Ok(())
            }
            None => Err(TrainingError::NotFound(format!("horse: {}", b))),
        };
        self.horses.insert(a, first);
        result
    }

    /// Replace the in-memory set with what is stored. Loaded records are clean.
    pub fn load_all(&mut self) -> Result<usize, TrainingError> {
        let loaded = self.store.load_horses()?;
        self.horses = loaded.into_iter().map(|h| (h.id(), h)).collect();
        self.removed.clear();
        info!("Loaded {} horse records from {}", self.horses.len(), self.store.path().display());
        Ok(self.horses.len())
    }

    /// Write dirty and new records and apply queued deletions.
    ///
    /// A failed write is logged, followed by a recovery backup and one retry.
    /// If the retry fails too the records stay dirty for the next cycle.
    pub fn save_all(&mut self) -> Result<usize, TrainingError> {
        let pending: Vec<TrainedHorse> = self
            .horses
            .values()
            .filter(|h| h.is_dirty() || h.is_new())
            .cloned()
            .collect();
        let removed: Vec<Uuid> = self.removed.iter().copied().collect();
        if pending.is_empty() && removed.is_empty() {
            return Ok(0);
        }
        metrics::inc_save_cycles();

        if let Err(first) = self.store.write_batch(&pending, &removed) {
            metrics::inc_save_failures();
            error!(
                "Saving {} horse records ({} deletions) failed: {}; backing up and retrying",
                pending.len(),
                removed.len(),
                first
            );
            self.recovery_backup();
            if let Err(second) = self.store.write_batch(&pending, &removed) {
                metrics::inc_save_failures();
                error!("Retry failed, {} horse records remain unsaved: {}", pending.len(), second);
                return Err(TrainingError::Persistence(format!("{}; retry: {}", first, second)));
            }
            info!("Horse records saved on retry");
        }

        for horse in &pending {
            if let Some(live) = self.horses.get_mut(&horse.id()) {
                live.mark_clean();
            }
        }
        for id in &removed {
            self.removed.remove(id);
        }
        metrics::add_records_written(pending.len());
        debug!("Saved {} horse records, deleted {}", pending.len(), removed.len());
        Ok(pending.len())
    }

    fn recovery_backup(&mut self) {
        let Some(backups) = self.backups.as_mut() else {
            warn!("No backup manager configured; retrying save without a backup");
            return;
        };
        match backups.create_backup(Some("save failure".to_string()), BackupType::SaveRecovery) {
            Ok(meta) => {
                info!("Recovery backup {} written", meta.id);
                if let Err(e) = backups.apply_retention_policy() {
                    warn!("Backup retention failed: {}", e);
                }
            }
            Err(e) => error!("Recovery backup failed: {}", e),
        }
    }

    /// Snapshot the store with the attached backup manager.
    pub fn backup(&mut self, name: Option<String>, backup_type: BackupType) -> Result<Option<BackupMetadata>, TrainingError> {
        let Some(backups) = self.backups.as_mut() else {
            return Ok(None);
        };
        let meta = backups.create_backup(name, backup_type)?;
        let deleted = backups.apply_retention_policy()?;
        if !deleted.is_empty() {
            debug!("Retention removed {} old backups", deleted.len());
        }
        Ok(Some(meta))
    }

    /// Remove records whose mount no longer exists in the simulation.
    pub fn purge_orphaned(&mut self, sim: &dyn Simulation) -> Vec<Uuid> {
        let orphans: Vec<Uuid> = self
            .horses
            .keys()
            .copied()
            .filter(|id| !sim.entity_exists(*id))
            .collect();
        for id in &orphans {
            if let Some(horse) = self.remove(*id) {
                info!(
                    "Purging horse {} ({}) with no live entity",
                    id,
                    escape_log(&horse.message_name())
                );
            }
        }
        metrics::add_records_purged(orphans.len());
        orphans
    }
}
