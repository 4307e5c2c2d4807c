//! # Storage Module
//!
//! Durable storage for horse records and rider preferences.
//!
//! Records live in an embedded sled database, one JSON document per horse keyed
//! by the horse's UUID string. JSON keeps the document self-describing so that
//! absent keys (`ownerUuid` for unowned horses, `hydration` and `lastAccessed` on
//! records written by older versions) load with defaults.
//!
//! - [`HorseStore`] - the sled-backed [`RecordStore`]
//! - [`backup`] - tar.gz snapshots of the database directory

pub mod backup;

use std::path::{Path, PathBuf};

use log::warn;
use sled::Batch;
use uuid::Uuid;

use crate::training::errors::TrainingError;
use crate::training::riders::RiderPrefs;
use crate::training::types::TrainedHorse;

const TREE_HORSES: &str = "horses";
const TREE_RIDERS: &str = "riders";

/// Persistence boundary used by the registry.
pub trait RecordStore {
    /// Write `horses` and delete `removed` as one atomic unit.
    fn write_batch(&self, horses: &[TrainedHorse], removed: &[Uuid]) -> Result<(), TrainingError>;

    /// Load every stored horse. Undecodable documents are skipped and logged.
    fn load_horses(&self) -> Result<Vec<TrainedHorse>, TrainingError>;

    fn write_riders(&self, riders: &[(Uuid, RiderPrefs)]) -> Result<(), TrainingError>;

    fn load_riders(&self) -> Result<Vec<(Uuid, RiderPrefs)>, TrainingError>;

    /// Directory holding the database files, used for backups.
    fn path(&self) -> &Path;
}

/// Sled-backed persistence for horse records.
pub struct HorseStore {
    path: PathBuf,
    _db: sled::Db,
    horses: sled::Tree,
    riders: sled::Tree,
}

impl HorseStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TrainingError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let horses = db.open_tree(TREE_HORSES)?;
        let riders = db.open_tree(TREE_RIDERS)?;
        Ok(Self {
            path: path_ref.to_path_buf(),
            _db: db,
            horses,
            riders,
        })
    }

    fn parse_key(key: &[u8]) -> Option<Uuid> {
        std::str::from_utf8(key).ok().and_then(|text| Uuid::parse_str(text).ok())
    }

    /// Fetch one horse by id.
    pub fn get_horse(&self, id: Uuid) -> Result<TrainedHorse, TrainingError> {
        let Some(bytes) = self.horses.get(id.to_string().as_bytes())? else {
            return Err(TrainingError::NotFound(format!("horse: {}", id)));
        };
        Ok(TrainedHorse::from_stored(id, &bytes)?)
    }

    /// List all stored horse ids.
    pub fn list_horse_ids(&self) -> Result<Vec<Uuid>, TrainingError> {
        let mut ids = Vec::new();
        for entry in self.horses.iter() {
            let (key, _) = entry?;
            if let Some(id) = Self::parse_key(&key) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Raw stored document, as the `inspect` command shows it.
    pub fn raw_document(&self, id: Uuid) -> Result<Option<serde_json::Value>, TrainingError> {
        match self.horses.get(id.to_string().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store a raw document under `id`, bypassing the record type.
    #[cfg(test)]
    pub(crate) fn put_raw_document(&self, id: Uuid, document: &serde_json::Value) -> Result<(), TrainingError> {
        let bytes = serde_json::to_vec(document)?;
        self.horses.insert(id.to_string().as_bytes(), bytes)?;
        self.horses.flush()?;
        Ok(())
    }
}

impl RecordStore for HorseStore {
    fn write_batch(&self, horses: &[TrainedHorse], removed: &[Uuid]) -> Result<(), TrainingError> {
        let mut batch = Batch::default();
        for horse in horses {
            batch.insert(horse.id().to_string().as_bytes(), horse.to_stored()?);
        }
        for id in removed {
            batch.remove(id.to_string().as_bytes());
        }
        self.horses.apply_batch(batch)?;
        self.horses.flush()?;
        Ok(())
    }

    fn load_horses(&self) -> Result<Vec<TrainedHorse>, TrainingError> {
        let mut loaded = Vec::new();
        for entry in self.horses.iter() {
            let (key, value) = entry?;
            let Some(id) = Self::parse_key(&key) else {
                warn!("Skipping horse record with malformed key {:?}", String::from_utf8_lossy(&key));
                continue;
            };
            match TrainedHorse::from_stored(id, &value) {
                Ok(horse) => loaded.push(horse),
                Err(e) => warn!("Skipping undecodable horse record {}: {}", id, e),
            }
        }
        Ok(loaded)
    }

    fn write_riders(&self, riders: &[(Uuid, RiderPrefs)]) -> Result<(), TrainingError> {
        let mut batch = Batch::default();
        for (id, prefs) in riders {
            if prefs.is_default() {
                batch.remove(id.to_string().as_bytes());
            } else {
                batch.insert(id.to_string().as_bytes(), serde_json::to_vec(prefs)?);
            }
        }
        self.riders.apply_batch(batch)?;
        self.riders.flush()?;
        Ok(())
    }

    fn load_riders(&self) -> Result<Vec<(Uuid, RiderPrefs)>, TrainingError> {
        let mut loaded = Vec::new();
        for entry in self.riders.iter() {
            let (key, value) = entry?;
            let Some(id) = Self::parse_key(&key) else {
                continue;
            };
            match serde_json::from_slice::<RiderPrefs>(&value) {
                Ok(prefs) => loaded.push((id, prefs)),
                Err(e) => warn!("Skipping undecodable rider preferences {}: {}", id, e),
            }
        }
        Ok(loaded)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::types::{Ability, Location};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    #[test]
    fn store_round_trip_horse() {
        let dir = TempDir::new().expect("tempdir");
        let store = HorseStore::open(dir.path()).expect("store");
        let mut horse = TrainedHorse::new(Uuid::new_v4(), Some(Uuid::new_v4()), "creamy_horse", Utc::now());
        horse.set_display_name(Some("Biscuit"));
        horse.set_location(Some(Location::new("world", 10.5, 64.0, -3.25)));
        horse.set_distance_travelled(1234.5678);
        horse.set_level(Ability::Speed, 3);
        store.write_batch(&[horse.clone()], &[]).expect("write");

        let fetched = store.get_horse(horse.id()).expect("get");
        horse.mark_clean();
        assert_eq!(fetched, horse);
        assert!(!fetched.is_dirty());
    }

    #[test]
    fn unowned_horse_has_no_owner_key() {
        let dir = TempDir::new().expect("tempdir");
        let store = HorseStore::open(dir.path()).expect("store");
        let horse = TrainedHorse::new(Uuid::new_v4(), None, "undead_horse", Utc::now());
        store.write_batch(&[horse.clone()], &[]).expect("write");
        let doc = store.raw_document(horse.id()).expect("read").expect("present");
        let object = doc.as_object().expect("object");
        assert!(!object.contains_key("ownerUuid"));
        assert!(object.contains_key("speedLevel"));
        assert!(object.contains_key("lastAccessed"));
    }

    #[test]
    fn legacy_document_gets_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let store = HorseStore::open(dir.path()).expect("store");
        let id = Uuid::new_v4();
        let legacy = serde_json::json!({
            "displayName": "",
            "appearance": "bay_horse",
            "distanceTravelled": 10.0,
            "distanceJumped": 2.5,
            "nuggetsEaten": 8,
            "speedLevel": 2,
            "jumpLevel": 1,
            "healthLevel": 1
        });
        store.put_raw_document(id, &legacy).expect("put");
        let before = Utc::now() - Duration::seconds(1);
        let horse = store.get_horse(id).expect("get");
        assert_eq!(horse.hydration(), 1.0);
        assert!(horse.last_accessed() >= before);
        assert_eq!(horse.owner(), None);
        assert_eq!(horse.speed_level(), 2);
    }

    #[test]
    fn batch_removes_and_skips_corrupt_documents() {
        let dir = TempDir::new().expect("tempdir");
        let store = HorseStore::open(dir.path()).expect("store");
        let keep = TrainedHorse::new(Uuid::new_v4(), None, "bay_horse", Utc::now());
        let gone = TrainedHorse::new(Uuid::new_v4(), None, "bay_horse", Utc::now());
        store.write_batch(&[keep.clone(), gone.clone()], &[]).expect("write");
        store.write_batch(&[], &[gone.id()]).expect("remove");
        store
            .put_raw_document(Uuid::new_v4(), &serde_json::json!({ "speedLevel": "fast" }))
            .expect("put corrupt");

        let loaded = store.load_horses().expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id(), keep.id());
        assert_eq!(store.list_horse_ids().expect("ids").len(), 2);
        assert!(matches!(store.get_horse(gone.id()), Err(TrainingError::NotFound(_))));
    }
}
