//! Test utilities & fixtures.
//! A small in-memory world standing in for the host simulation, plus helpers
//! that build a `Stable` over a throwaway sled store.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use stablemaster::config::TrainingConfig;
use stablemaster::storage::backup::{BackupManager, RetentionPolicy};
use stablemaster::storage::HorseStore;
use stablemaster::training::{
    AbilityCurves, GoldFood, HorseRegistry, LifecyclePolicy, Location, MountHandle, MountState, Simulation, Stable,
    TrainingEngine,
};
use uuid::Uuid;

/// Live mounts and the food players have fed, keyed the way the host would.
#[derive(Default)]
pub struct TestWorld {
    pub mounts: HashMap<Uuid, MountState>,
    pub eaten: HashSet<(Uuid, GoldFood)>,
}

#[allow(dead_code)]
impl TestWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mount at the origin of `world` and return its id.
    pub fn spawn(&mut self, appearance: &str) -> Uuid {
        let mount = MountState::new(appearance, Location::new("world", 0.0, 64.0, 0.0));
        let id = mount.id;
        self.mounts.insert(id, mount);
        id
    }

    pub fn mount_mut(&mut self, id: Uuid) -> &mut MountState {
        self.mounts.get_mut(&id).expect("mount exists")
    }
}

impl Simulation for TestWorld {
    fn entity_exists(&self, id: Uuid) -> bool {
        self.mounts.contains_key(&id)
    }

    fn mount(&mut self, id: Uuid) -> Option<&mut dyn MountHandle> {
        self.mounts.get_mut(&id).map(|m| m as &mut dyn MountHandle)
    }

    fn food_was_eaten(&self, actor: Uuid, food: GoldFood) -> bool {
        self.eaten.contains(&(actor, food))
    }
}

/// Stable with default curves and rules over a store under `root/horses`.
#[allow(dead_code)]
pub fn stable_in(root: &Path) -> Stable {
    stable_with(root, TrainingConfig::default())
}

#[allow(dead_code)]
pub fn stable_with(root: &Path, training: TrainingConfig) -> Stable {
    let db_path = root.join("horses");
    let store = HorseStore::open(&db_path).expect("store");
    let backups = BackupManager::new(db_path, root.join("backups"), RetentionPolicy::default()).expect("backups");
    let registry = HorseRegistry::new(Box::new(store)).with_backups(backups);
    let policy = LifecyclePolicy::from_config(&training);
    let engine = TrainingEngine::new(AbilityCurves::default(), training);
    Stable::new(registry, engine, policy)
}
