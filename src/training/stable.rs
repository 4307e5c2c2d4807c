//! # Stable
//!
//! Host-facing facade over the registry, the training engine and the
//! lifecycle policy. The host calls one hook per observed event, passing the
//! live mount as a borrowed [`MountHandle`]; the stable updates the record,
//! queues presentation events and defers work that can only be judged on a
//! later tick.
//!
//! ```text
//! host event ──► hook ──► registry.find_or_create ──► engine / policy
//!                  │                                      │
//!                  └──► follow-up queue          events ◄─┘
//! host tick  ──► tick ──► due follow-ups ──► periodic save_all
//! ```
//!
//! Everything runs on the simulation thread. Saves happen inside [`Stable::tick`]
//! and [`Stable::shutdown`], never while a hook is mutating a record.

use std::fmt;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::logutil::escape_log;
use crate::storage::backup::{BackupManager, BackupType};
use crate::storage::HorseStore;
use crate::training::commands::format_death_summary;
use crate::training::engine::{TrainingEngine, WaterOutcome};
use crate::training::errors::TrainingError;
use crate::training::events::{Cue, TrainingEvent};
use crate::training::food::GoldFood;
use crate::training::host::{MountHandle, Simulation};
use crate::training::lifecycle::{AccessDecision, LifecyclePolicy};
use crate::training::registry::HorseRegistry;
use crate::training::riders::RiderBook;
use crate::training::types::{is_restricted_appearance, Ability, Attribute, TrainedHorse};

/// Log target for per-horse debug output.
pub const DEBUG_TARGET: &str = "stablemaster::horse";

const OWNER_ONLY_NOTICE: &str = "Undead and skeletal horses can only be accessed by their owner.";

/// Outcome of an interaction or damage hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

/// Why a mount left the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    Death,
    Released,
    Despawned,
}

/// What a movement observation did to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementOutcome {
    /// No training (no displacement, dehydrated, or inside a vehicle).
    Ignored,
    /// Dropped by the plausibility guard.
    Rejected,
    Recorded { ability: Ability, leveled_up: bool },
}

#[derive(Debug, Default)]
pub struct StartupReport {
    pub loaded: usize,
    pub purged: Vec<Uuid>,
    pub backup_id: Option<String>,
}

/// Deferred check that an ordinary horse really ate what it was offered.
#[derive(Debug, Clone)]
struct FoodConfirmation {
    due_tick: u64,
    horse: Uuid,
    actor: Uuid,
    food: GoldFood,
}

pub struct Stable {
    registry: HorseRegistry,
    engine: TrainingEngine,
    policy: LifecyclePolicy,
    riders: RiderBook,
    follow_ups: Vec<FoodConfirmation>,
    events: Vec<TrainingEvent>,
    current_tick: u64,
    last_save_tick: u64,
    startup_backup: bool,
}

fn trace(enabled: bool, horse: &TrainedHorse, message: fmt::Arguments<'_>) {
    if enabled && horse.is_debug() {
        info!(target: DEBUG_TARGET, "[{}] {}", horse.id(), message);
    }
}

impl Stable {
    pub fn new(registry: HorseRegistry, engine: TrainingEngine, policy: LifecyclePolicy) -> Self {
        Self {
            registry,
            engine,
            policy,
            riders: RiderBook::new(),
            follow_ups: Vec::new(),
            events: Vec::new(),
            current_tick: 0,
            last_save_tick: 0,
            startup_backup: false,
        }
    }

    /// Open the store and build curves, engine and policy from configuration.
    pub fn from_config(config: &Config) -> Result<Self, TrainingError> {
        let curves = config.build_curves()?;
        let db_path = config.storage.db_path();
        let store = HorseStore::open(&db_path)?;
        let backups = BackupManager::new(db_path, config.storage.backup_path(), config.backup.retention.clone())?;
        let registry = HorseRegistry::new(Box::new(store)).with_backups(backups);
        let engine = TrainingEngine::new(curves, config.training.clone());
        let policy = LifecyclePolicy::from_config(&config.training);
        Ok(Self::new(registry, engine, policy).with_startup_backup(config.backup.on_startup))
    }

    pub fn with_startup_backup(mut self, enabled: bool) -> Self {
        self.startup_backup = enabled;
        self
    }

    pub fn registry(&self) -> &HorseRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HorseRegistry {
        &mut self.registry
    }

    pub fn engine(&self) -> &TrainingEngine {
        &self.engine
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    pub fn riders(&self) -> &RiderBook {
        &self.riders
    }

    fn debug_events(&self) -> bool {
        self.engine.config().debug_events
    }

    /// Load stored records, back up, then purge records without a live mount.
    ///
    /// A failed backup skips the purge so nothing is deleted unrecoverably.
    pub fn start(&mut self, sim: &dyn Simulation) -> Result<StartupReport, TrainingError> {
        let mut report = StartupReport {
            loaded: self.registry.load_all()?,
            ..StartupReport::default()
        };
        self.riders.load(self.registry.store().load_riders()?);
        if !self.riders.is_empty() {
            debug!("Loaded {} rider preferences", self.riders.len());
        }

        if self.startup_backup {
            match self.registry.backup(Some("startup".to_string()), BackupType::Startup) {
                Ok(meta) => report.backup_id = meta.map(|m| m.id),
                Err(e) => {
                    warn!("Startup backup failed, skipping orphan purge: {}", e);
                    return Ok(report);
                }
            }
        }

        report.purged = self.registry.purge_orphaned(sim);
        if !report.purged.is_empty() {
            info!("Purged {} horse records without a live entity", report.purged.len());
            self.registry.save_all()?;
        }
        Ok(report)
    }

    /// Save everything; called on controlled shutdown.
    pub fn shutdown(&mut self) -> Result<usize, TrainingError> {
        let saved = self.save()?;
        info!("Stable shut down, {} horse records saved", saved);
        Ok(saved)
    }

    /// Write dirty horse records and changed rider preferences.
    pub fn save(&mut self) -> Result<usize, TrainingError> {
        let written = self.registry.save_all()?;
        let riders = self.riders.take_dirty();
        if !riders.is_empty() {
            if let Err(e) = self.registry.store().write_riders(&riders) {
                error!("Saving {} rider preferences failed: {}", riders.len(), e);
                self.riders.restore_dirty(riders);
                return Err(e);
            }
        }
        Ok(written)
    }

    /// Advance to `tick`: run due follow-ups, then save if the interval elapsed.
    /// Returns the number of follow-ups run.
    pub fn tick(&mut self, tick: u64, sim: &mut dyn Simulation) -> usize {
        self.current_tick = tick;

        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.follow_ups)
            .into_iter()
            .partition(|f| f.due_tick <= tick);
        self.follow_ups = pending;
        let ran = due.len();
        for confirmation in due {
            self.confirm_food(confirmation, sim);
        }

        let interval = self.engine.config().save_interval_ticks;
        if interval > 0 && tick.saturating_sub(self.last_save_tick) >= interval {
            self.last_save_tick = tick;
            if let Err(e) = self.save() {
                error!("Periodic save failed, will retry next cycle: {}", e);
            }
        }
        ran
    }

    pub fn pending_follow_ups(&self) -> usize {
        self.follow_ups.len()
    }

    fn confirm_food(&mut self, confirmation: FoodConfirmation, sim: &mut dyn Simulation) {
        let FoodConfirmation { horse, actor, food, .. } = confirmation;
        if !sim.food_was_eaten(actor, food) {
            debug!("Horse {} did not eat the offered {:?}", horse, food);
            return;
        }
        let Some(mount) = sim.mount(horse) else {
            debug!("Horse {} is gone before its food was counted", horse);
            return;
        };
        let Some(record) = self.registry.find_mut(horse) else {
            return;
        };
        let leveled = self.engine.consume_food(record, mount, food);
        trace(
            self.engine.config().debug_events,
            record,
            format_args!("ate {:?}, {} nuggets total", food, record.nuggets_eaten()),
        );
        if leveled {
            self.events.push(TrainingEvent::level_up(
                horse,
                Some(actor),
                Ability::Health,
                record.health_level(),
                record.message_name(),
            ));
        }
    }

    /// Events produced since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<TrainingEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn get_record(&self, id: Uuid) -> Result<TrainedHorse, TrainingError> {
        self.registry.get(id).cloned()
    }

    pub fn set_debug(&mut self, id: Uuid, debug: bool) -> Result<(), TrainingError> {
        self.registry.get_mut(id)?.set_debug(debug);
        Ok(())
    }

    pub fn swap_training_stats(&mut self, a: Uuid, b: Uuid) -> Result<(), TrainingError> {
        self.registry.swap_training_stats(a, b)?;
        info!("Swapped training stats of horses {} and {}", a, b);
        Ok(())
    }

    /// Set or clear the highest Speed level `rider` wants to ride at.
    pub fn set_rider_max_speed(&mut self, rider: Uuid, level: Option<u32>) {
        self.riders.set_max_speed_level(rider, level);
    }

    /// A mount appeared in the simulation.
    pub fn on_spawn(&mut self, mount: &mut dyn MountHandle, now: DateTime<Utc>) {
        let horse = self.registry.find_or_create(&*mount, now);
        self.engine.apply_all_attributes(horse, mount);
    }

    /// A ridden mount moved `displacement` metres during `tick`.
    ///
    /// Ground movement trains Speed, airborne movement trains Jump. The ride
    /// tick accounting (hydration, location) runs afterwards in both cases.
    #[allow(clippy::too_many_arguments)]
    pub fn on_observed_movement(
        &mut self,
        mount: &mut dyn MountHandle,
        rider: Uuid,
        displacement: f64,
        on_ground: bool,
        in_vehicle: bool,
        tick: u64,
        now: DateTime<Utc>,
    ) -> MovementOutcome {
        if in_vehicle {
            return MovementOutcome::Ignored;
        }
        self.current_tick = tick;
        let debug_events = self.debug_events();
        let rider_cap = self.riders.max_speed_level(rider);
        let id = mount.id();
        let horse = self.registry.find_or_create(&*mount, now);
        horse.set_owner(mount.owner());

        let ability = if on_ground { Ability::Speed } else { Ability::Jump };
        let mut outcome = MovementOutcome::Ignored;
        if displacement > 0.0 && !horse.is_dehydrated() {
            if self.engine.check_plausible(horse, displacement).is_err() {
                horse.set_location(Some(mount.location()));
                horse.set_last_accessed(now);
                return MovementOutcome::Rejected;
            }
            match self.engine.record_effort(horse, ability, displacement) {
                Ok(true) => {
                    let leveled_up = self.engine.check_level_up(horse, ability, mount);
                    if leveled_up {
                        trace(
                            debug_events,
                            horse,
                            format_args!("{} level {}", ability, horse.level(ability)),
                        );
                        self.events.push(TrainingEvent::level_up(
                            id,
                            Some(rider),
                            ability,
                            horse.level(ability),
                            horse.message_name(),
                        ));
                    }
                    outcome = MovementOutcome::Recorded { ability, leveled_up };
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Horse {}: {}", id, e);
                    return MovementOutcome::Rejected;
                }
            }
        }

        if self.engine.on_ride_tick(horse, mount, tick, now, rider_cap) {
            trace(debug_events, horse, format_args!("dehydrated at tick {}", tick));
            self.events.push(TrainingEvent::notice(
                rider,
                id,
                format!("{} is too thirsty to keep going. Find water!", horse.message_name()),
                None,
            ));
        }
        outcome
    }

    /// `actor` offers one item of `category`. Returns its nugget value (0 for
    /// anything that is not gold food).
    ///
    /// Undead and skeletal horses cannot eat on their own, so the item counts
    /// at once and the host should take it from the actor. Other horses eat
    /// through the normal game rules; whether they did is checked on the next
    /// tick.
    pub fn on_food_consumption_attempt(
        &mut self,
        mount: &mut dyn MountHandle,
        actor: Uuid,
        category: &str,
        tick: u64,
        now: DateTime<Utc>,
    ) -> u32 {
        let Some(food) = GoldFood::from_category(category) else {
            return 0;
        };
        if self.refuse_non_owner(&*mount, actor, now) {
            return 0;
        }
        let debug_events = self.debug_events();
        let id = mount.id();
        let horse = self.registry.find_or_create(&*mount, now);

        if !horse.is_restricted_kind() {
            self.follow_ups.push(FoodConfirmation {
                due_tick: tick + 1,
                horse: id,
                actor,
                food,
            });
            return food.nugget_value();
        }

        let leveled = self.engine.consume_food(horse, mount, food);
        self.engine.heal(mount, food);
        trace(
            debug_events,
            horse,
            format_args!("hand-fed {:?}, {} nuggets total", food, horse.nuggets_eaten()),
        );
        self.events.push(TrainingEvent::notice(
            actor,
            id,
            format!("{} eats the gold.", horse.message_name()),
            Some(Cue::Eat),
        ));
        if leveled {
            self.events.push(TrainingEvent::level_up(
                id,
                Some(actor),
                Ability::Health,
                horse.health_level(),
                horse.message_name(),
            ));
        }
        food.nugget_value()
    }

    /// `actor` offers a bucket of water. Returns true if the bucket was used.
    pub fn on_water_consumption_attempt(&mut self, mount: &mut dyn MountHandle, actor: Uuid, now: DateTime<Utc>) -> bool {
        if self.refuse_non_owner(&*mount, actor, now) {
            return false;
        }
        let id = mount.id();
        let horse = self.registry.find_or_create(&*mount, now);
        let (text, used) = match self.engine.consume_water(horse) {
            WaterOutcome::Drank { satisfied: true } => (format!("{} is no longer thirsty.", horse.message_name()), true),
            WaterOutcome::Drank { satisfied: false } => (format!("{} is still thirsty.", horse.message_name()), true),
            WaterOutcome::NotThirsty => (format!("{} is not thirsty.", horse.message_name()), false),
        };
        if used && !horse.is_dehydrated() {
            let speed = self.engine.ridden_speed(horse, None);
            mount.set_attribute(Attribute::MovementSpeed, speed);
        }
        trace(
            self.engine.config().debug_events,
            horse,
            format_args!("hydration {:.3}", horse.hydration()),
        );
        let cue = used.then_some(Cue::Drink);
        self.events.push(TrainingEvent::notice(actor, id, text, cue));
        used
    }

    /// `actor` tries to ride, open or otherwise use the mount.
    ///
    /// Restricted kinds are claimed by their first user and refuse everyone
    /// but the owner. An abandoned one loses its record and is claimed afresh
    /// by `actor`.
    pub fn on_interaction_attempt(&mut self, mount: &mut dyn MountHandle, actor: Uuid, now: DateTime<Utc>) -> Access {
        let id = mount.id();
        let owner = mount.owner();
        let decision = {
            let horse = self.registry.find_or_create(&*mount, now);
            self.policy.check_access(horse, owner, actor, now)
        };

        match decision {
            AccessDecision::Deny => {
                let name = self.registry.find(id).map(|h| h.message_name()).unwrap_or_default();
                debug!("Denied {} access to horse {} ({})", actor, id, escape_log(&name));
                self.events
                    .push(TrainingEvent::notice(actor, id, OWNER_ONLY_NOTICE, Some(Cue::Refuse)));
                return Access::Deny;
            }
            AccessDecision::ReleaseAbandoned => {
                mount.set_owner(None);
                self.registry.remove(id);
                info!(
                    "Horse {} abandoned by {}; released to {}",
                    id,
                    owner.map(|o| o.to_string()).unwrap_or_default(),
                    actor
                );
                self.claim(mount, actor);
            }
            AccessDecision::Claim => self.claim(mount, actor),
            AccessDecision::Owner | AccessDecision::Open => {}
        }

        let horse = self.registry.find_or_create(&*mount, now);
        self.policy.transfer_ownership(horse, mount.owner());
        if horse.owner() == Some(actor) {
            horse.set_last_accessed(now);
        }
        // The horse may have wandered since it was last ridden.
        horse.set_location(Some(mount.location()));
        let custom_name = mount.custom_name();
        if custom_name.as_deref().unwrap_or_default() != horse.display_name() {
            horse.set_display_name(custom_name.as_deref());
        }
        let appearance = mount.appearance();
        if appearance != horse.appearance() {
            horse.set_appearance(appearance);
        }
        if horse.has_outdated_attributes() {
            self.engine.apply_all_attributes(horse, mount);
        }
        Access::Allow
    }

    /// Feeding and watering an owned undead or skeletal horse is reserved for
    /// its owner, like riding it. Returns true (and notifies `actor`) when
    /// `actor` is refused. Nothing is recorded for a refused actor.
    fn refuse_non_owner(&mut self, mount: &dyn MountHandle, actor: Uuid, now: DateTime<Utc>) -> bool {
        if !is_restricted_appearance(&mount.appearance()) {
            return false;
        }
        let owner = mount.owner();
        let refused = match (owner, self.registry.find(mount.id())) {
            (None, _) => false,
            (Some(owner), _) if owner == actor => false,
            (Some(_), Some(horse)) => self.policy.check_access(horse, owner, actor, now) == AccessDecision::Deny,
            (Some(_), None) => true,
        };
        if refused {
            debug!("Refused {} tending horse {}", actor, mount.id());
            self.events
                .push(TrainingEvent::notice(actor, mount.id(), OWNER_ONLY_NOTICE, Some(Cue::Refuse)));
        }
        refused
    }

    fn claim(&mut self, mount: &mut dyn MountHandle, actor: Uuid) {
        mount.set_tamed(true);
        mount.set_owner(Some(actor));
        info!("Horse {} claimed by {}", mount.id(), actor);
        self.events.push(TrainingEvent::notice(
            actor,
            mount.id(),
            "You now own this horse. Only you can ride it.",
            None,
        ));
    }

    /// Something tries to damage the mount. Owned undead and skeletal horses
    /// are protected while nobody rides them, unless they were abandoned.
    pub fn on_damage_attempt(&mut self, mount: &mut dyn MountHandle, has_rider: bool, now: DateTime<Utc>) -> Access {
        if !is_restricted_appearance(&mount.appearance()) {
            return Access::Allow;
        }
        let id = mount.id();
        let owner = mount.owner();
        let horse = self.registry.find_or_create(&*mount, now);
        if self.policy.is_protected(horse, owner, has_rider, now) {
            return Access::Deny;
        }
        if owner.is_some() && !has_rider && self.policy.is_abandoned(horse, now) {
            mount.set_owner(None);
            self.registry.remove(id);
            info!("Horse {} abandoned; protection lifted", id);
        }
        Access::Allow
    }

    /// `rider` mounted the horse. `near_water` if the host found drinkable
    /// water next to it.
    pub fn on_mount(&mut self, mount: &mut dyn MountHandle, rider: Uuid, near_water: bool, now: DateTime<Utc>) {
        let id = mount.id();
        let rider_cap = self.riders.max_speed_level(rider);
        let tick = self.current_tick;
        let horse = self.registry.find_or_create(&*mount, now);
        horse.set_owner(mount.owner());
        horse.set_location(Some(mount.location()));
        if horse.has_outdated_attributes() {
            self.engine.apply_all_attributes(horse, mount);
        }

        if near_water {
            let was_thirsty = !horse.is_fully_hydrated();
            self.engine.rehydrate(horse, mount, rider_cap);
            if was_thirsty {
                self.events.push(TrainingEvent::notice(
                    rider,
                    id,
                    format!("{} drinks until it is no longer thirsty!", horse.message_name()),
                    Some(Cue::Drink),
                ));
            }
        } else if self.engine.apply_hydration_effect(horse, mount, tick, rider_cap) {
            self.events.push(TrainingEvent::notice(
                rider,
                id,
                format!("{} is too thirsty to keep going. Find water!", horse.message_name()),
                None,
            ));
        }
    }

    /// `rider` got off. The rider's speed cap no longer applies.
    pub fn on_dismount(&mut self, mount: &mut dyn MountHandle, rider: Uuid, now: DateTime<Utc>) {
        let horse = self.registry.find_or_create(&*mount, now);
        horse.set_location(Some(mount.location()));
        if !horse.is_dehydrated() {
            mount.set_attribute(Attribute::MovementSpeed, self.engine.ridden_speed(horse, None));
        }
        debug!("{} dismounted horse {}", rider, horse.id());
    }

    /// The mount left the simulation. Its record is dropped and deleted on the
    /// next save.
    pub fn on_entity_removed(&mut self, id: Uuid, cause: RemovalCause) -> Option<TrainedHorse> {
        let horse = self.registry.remove(id)?;
        match cause {
            RemovalCause::Death => info!("{}", escape_log(&format_death_summary(&horse))),
            RemovalCause::Released | RemovalCause::Despawned => {
                debug!("Horse {} removed ({:?})", id, cause)
            }
        }
        Some(horse)
    }
}
