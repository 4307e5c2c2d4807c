//! # Training Engine
//!
//! Applies observations of one mount to its [`TrainedHorse`] record:
//!
//! - effort accrual (distance ridden, distance jumped, gold eaten)
//! - level-up detection and live attribute updates
//! - hydration drain while ridden and the dehydration speed throttle
//! - the plausibility guard against teleports and other movement artefacts
//!
//! Every operation touches exactly one record and one borrowed mount. Errors
//! are returned to the caller, which logs them and moves on to the next horse.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::config::TrainingConfig;
use crate::metrics;
use crate::training::ability::{AbilityCurve, AbilityCurves};
use crate::training::errors::TrainingError;
use crate::training::food::GoldFood;
use crate::training::host::MountHandle;
use crate::training::types::{Ability, Attribute, TrainedHorse};

/// Result of a water bucket offered to a horse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterOutcome {
    /// The horse drank; `satisfied` if it is now fully hydrated.
    Drank { satisfied: bool },
    /// Already fully hydrated; the bucket is kept.
    NotThirsty,
}

#[derive(Debug, Clone)]
pub struct TrainingEngine {
    curves: AbilityCurves,
    config: TrainingConfig,
}

impl TrainingEngine {
    pub fn new(curves: AbilityCurves, config: TrainingConfig) -> Self {
        Self { curves, config }
    }

    pub fn curves(&self) -> &AbilityCurves {
        &self.curves
    }

    pub fn curve(&self, ability: Ability) -> &AbilityCurve {
        self.curves.get(ability)
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Add `delta` to the effort backing `ability`.
    ///
    /// Returns `Ok(true)` if effort changed. Zero deltas and movement training
    /// on a dehydrated horse are silent no-ops. Negative, non-finite and
    /// fractional-nugget deltas are rejected without touching the record.
    pub fn record_effort(&self, horse: &mut TrainedHorse, ability: Ability, delta: f64) -> Result<bool, TrainingError> {
        if !delta.is_finite() || delta < 0.0 {
            metrics::inc_rejected_effort();
            return Err(TrainingError::Validation(format!(
                "{} effort delta must be a non-negative number (got {})",
                ability, delta
            )));
        }
        if ability == Ability::Health && delta.fract() != 0.0 {
            metrics::inc_rejected_effort();
            return Err(TrainingError::Validation(format!(
                "Health effort is counted in whole nuggets (got {})",
                delta
            )));
        }
        if delta == 0.0 {
            return Ok(false);
        }
        if ability.is_hydration_gated() && horse.is_dehydrated() {
            return Ok(false);
        }
        horse.set_effort(ability, horse.effort(ability) + delta);
        Ok(true)
    }

    /// Recompute the level of `ability` from its effort and apply any increase
    /// to the live mount. Returns true only when the level went up.
    pub fn check_level_up(&self, horse: &mut TrainedHorse, ability: Ability, mount: &mut dyn MountHandle) -> bool {
        let new_level = self.curve(ability).level_for_effort(horse.effort(ability));
        if new_level <= horse.level(ability) {
            return false;
        }
        horse.set_level(ability, new_level);
        self.apply_ability(horse, ability, mount);
        metrics::record_level_up(ability);
        debug!("Horse {} reached {} level {}", horse.id(), ability, new_level);
        true
    }

    /// Write the value for the record's current level of `ability` to the mount.
    pub fn apply_ability(&self, horse: &TrainedHorse, ability: Ability, mount: &mut dyn MountHandle) {
        let value = self.curve(ability).value_for_level(horse.level(ability));
        mount.set_attribute(ability.attribute(), value);
        if ability == Ability::Health && mount.health() > value {
            mount.set_health(value);
        }
    }

    /// Bring every live attribute in line with the record and clear the
    /// outdated flag.
    pub fn apply_all_attributes(&self, horse: &mut TrainedHorse, mount: &mut dyn MountHandle) {
        for ability in Ability::ALL {
            self.apply_ability(horse, ability, mount);
        }
        if horse.is_dehydrated() {
            mount.set_attribute(Attribute::MovementSpeed, self.throttled_speed());
        }
        horse.set_outdated_attributes(false);
    }

    /// Movement speed of a dehydrated horse.
    pub fn throttled_speed(&self) -> f64 {
        self.curve(Ability::Speed).min_value() / 4.0
    }

    /// Movement speed for the horse's Speed level, limited by the rider's cap.
    pub fn ridden_speed(&self, horse: &TrainedHorse, rider_cap: Option<u32>) -> f64 {
        let level = match rider_cap {
            Some(cap) => horse.speed_level().min(cap.max(1)),
            None => horse.speed_level(),
        };
        self.curve(Ability::Speed).value_for_level(level)
    }

    /// Throttle a dehydrated horse or restore its trained speed.
    ///
    /// Returns true when a dehydration warning is due for `tick`; at most one
    /// warning is due per `dehydration_warning_ticks`.
    pub fn apply_hydration_effect(
        &self,
        horse: &mut TrainedHorse,
        mount: &mut dyn MountHandle,
        tick: u64,
        rider_cap: Option<u32>,
    ) -> bool {
        if !horse.is_dehydrated() {
            mount.set_attribute(Attribute::MovementSpeed, self.ridden_speed(horse, rider_cap));
            return false;
        }

        mount.set_attribute(Attribute::MovementSpeed, self.throttled_speed());
        let due = match horse.last_dehydration_warning_tick() {
            None => true,
            Some(last) => tick.saturating_sub(last) > self.config.dehydration_warning_ticks,
        };
        if due {
            horse.set_last_dehydration_warning_tick(tick);
            metrics::inc_dehydration_warnings();
        }
        due
    }

    /// Per-tick accounting while a rider controls the horse: drain hydration by
    /// the horizontal distance covered since the last known location, apply the
    /// hydration effect, then record the current location and time.
    ///
    /// Returns true when a dehydration warning is due.
    pub fn on_ride_tick(
        &self,
        horse: &mut TrainedHorse,
        mount: &mut dyn MountHandle,
        tick: u64,
        now: DateTime<Utc>,
        rider_cap: Option<u32>,
    ) -> bool {
        let here = mount.location();
        let travelled = horse.location().map_or(0.0, |previous| previous.horizontal_distance(&here));
        if travelled > 0.0 {
            horse.set_hydration(horse.hydration() - travelled / self.config.dehydration_distance);
        }
        let warn = self.apply_hydration_effect(horse, mount, tick, rider_cap);
        horse.set_location(Some(here));
        horse.set_last_accessed(now);
        warn
    }

    /// Reject a one-tick displacement that is implausibly large for the horse's
    /// next Speed level. Nothing is mutated either way.
    pub fn check_plausible(&self, horse: &TrainedHorse, displacement: f64) -> Result<(), TrainingError> {
        let reference = self.curve(Ability::Speed).value_for_level(horse.speed_level() + 1);
        let ratio = displacement / reference;
        if displacement.is_finite() && ratio <= self.config.speed_limit {
            return Ok(());
        }
        metrics::inc_implausible_moves();
        warn!(
            "Horse {} moved {:.2} m in one tick, {:.1}x its next-level speed {:.4} (limit {}x); ignored",
            horse.id(),
            displacement,
            ratio,
            reference,
            self.config.speed_limit
        );
        Err(TrainingError::Validation(format!(
            "implausible displacement {:.2} m (ratio {:.1})",
            displacement, ratio
        )))
    }

    /// Count one item of gold food as Health training. Returns true on level up.
    pub fn consume_food(&self, horse: &mut TrainedHorse, mount: &mut dyn MountHandle, food: GoldFood) -> bool {
        let nuggets = f64::from(food.nugget_value());
        match self.record_effort(horse, Ability::Health, nuggets) {
            Ok(_) => self.check_level_up(horse, Ability::Health, mount),
            Err(e) => {
                warn!("Horse {} could not count {:?}: {}", horse.id(), food, e);
                false
            }
        }
    }

    /// Heal the mount for one hand-fed item, capped at max health.
    pub fn heal(&self, mount: &mut dyn MountHandle, food: GoldFood) {
        let max = mount.attribute(Attribute::MaxHealth);
        let healed = (mount.health() + food.heal_amount()).min(max);
        mount.set_health(healed);
    }

    /// Offer one bucket of water.
    pub fn consume_water(&self, horse: &mut TrainedHorse) -> WaterOutcome {
        if horse.is_fully_hydrated() {
            return WaterOutcome::NotThirsty;
        }
        horse.set_hydration(horse.hydration() + self.config.bucket_hydration);
        WaterOutcome::Drank {
            satisfied: horse.is_fully_hydrated(),
        }
    }

    /// Drink from open water: full hydration and the trained speed restored.
    pub fn rehydrate(&self, horse: &mut TrainedHorse, mount: &mut dyn MountHandle, rider_cap: Option<u32>) {
        horse.set_hydration(1.0);
        mount.set_attribute(Attribute::MovementSpeed, self.ridden_speed(horse, rider_cap));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::ability::CurveConfig;
    use crate::training::host::MountState;
    use crate::training::types::Location;
    use uuid::Uuid;

    fn engine() -> TrainingEngine {
        TrainingEngine::new(AbilityCurves::default(), TrainingConfig::default())
    }

    fn fixture() -> (TrainedHorse, MountState) {
        let mount = MountState::new("bay_horse", Location::new("world", 0.0, 64.0, 0.0));
        let horse = TrainedHorse::new(mount.id, None, "bay_horse", Utc::now());
        (horse, mount)
    }

    #[test]
    fn negative_effort_leaves_record_untouched() {
        let engine = engine();
        let (mut horse, _) = fixture();
        horse.mark_clean();
        let before = horse.clone();
        let err = engine.record_effort(&mut horse, Ability::Speed, -5.0).expect_err("negative");
        assert!(err.is_validation());
        assert_eq!(horse, before);
        assert!(!horse.is_dirty());
        assert!(engine.record_effort(&mut horse, Ability::Jump, f64::NAN).is_err());
        assert!(!horse.is_dirty());
    }

    #[test]
    fn zero_effort_is_a_no_op() {
        let engine = engine();
        let (mut horse, _) = fixture();
        horse.mark_clean();
        assert!(!engine.record_effort(&mut horse, Ability::Speed, 0.0).expect("zero"));
        assert!(!horse.is_dirty());
    }

    #[test]
    fn dehydration_gates_movement_but_not_food() {
        let engine = engine();
        let (mut horse, _) = fixture();
        horse.set_hydration(0.0);
        assert!(!engine.record_effort(&mut horse, Ability::Speed, 10.0).expect("gated"));
        assert!(!engine.record_effort(&mut horse, Ability::Jump, 1.0).expect("gated"));
        assert_eq!(horse.distance_travelled(), 0.0);
        assert!(engine.record_effort(&mut horse, Ability::Health, 8.0).expect("food"));
        assert_eq!(horse.nuggets_eaten(), 8);
    }

    #[test]
    fn fractional_nuggets_are_rejected() {
        let engine = engine();
        let (mut horse, _) = fixture();
        assert!(engine.record_effort(&mut horse, Ability::Health, 0.5).is_err());
        assert_eq!(horse.nuggets_eaten(), 0);
    }

    #[test]
    fn level_up_applies_attribute_once() {
        let engine = engine();
        let (mut horse, mut mount) = fixture();
        let threshold = engine.curve(Ability::Speed).effort_for_level(2);
        engine.record_effort(&mut horse, Ability::Speed, threshold).expect("effort");
        assert!(engine.check_level_up(&mut horse, Ability::Speed, &mut mount));
        assert_eq!(horse.speed_level(), 2);
        assert_eq!(mount.movement_speed, engine.curve(Ability::Speed).value_for_level(2));
        assert!(!engine.check_level_up(&mut horse, Ability::Speed, &mut mount));
    }

    #[test]
    fn golden_apple_reaches_health_level_two() {
        let curves = AbilityCurves::new(
            &CurveConfig::default_speed(),
            &CurveConfig::default_jump(),
            &CurveConfig {
                levels: vec![
                    crate::training::ability::LevelStep { level: 1, effort: 0.0, value: 15.0 },
                    crate::training::ability::LevelStep { level: 2, effort: 72.0, value: 17.0 },
                ],
            },
        )
        .expect("curves");
        let engine = TrainingEngine::new(curves, TrainingConfig::default());
        let (mut horse, mut mount) = fixture();
        mount.health = 10.0;
        assert!(engine.consume_food(&mut horse, &mut mount, GoldFood::GoldenApple));
        assert_eq!(horse.health_level(), 2);
        assert_eq!(mount.max_health, 17.0);
        engine.heal(&mut mount, GoldFood::GoldenApple);
        assert_eq!(mount.health, 17.0);
    }

    #[test]
    fn teleport_is_rejected() {
        let engine = engine();
        let (horse, _) = fixture();
        let err = engine.check_plausible(&horse, 1000.0).expect_err("teleport");
        assert!(err.is_validation());
        assert!(engine.check_plausible(&horse, 0.3).is_ok());
        assert!(engine.check_plausible(&horse, f64::INFINITY).is_err());
    }

    #[test]
    fn ride_tick_drains_hydration_and_is_idempotent() {
        let engine = engine();
        let (mut horse, mut mount) = fixture();
        horse.set_hydration(1.0);
        engine.on_ride_tick(&mut horse, &mut mount, 1, Utc::now(), None);
        assert_eq!(horse.hydration(), 1.0);

        mount.advance(500.0);
        engine.on_ride_tick(&mut horse, &mut mount, 2, Utc::now(), None);
        let after_first = horse.hydration();
        assert!((after_first - 0.9).abs() < 1e-9);

        engine.on_ride_tick(&mut horse, &mut mount, 3, Utc::now(), None);
        assert_eq!(horse.hydration(), after_first);
        assert_eq!(horse.location(), Some(&mount.location));
    }

    #[test]
    fn dehydration_throttles_and_rate_limits_warnings() {
        let engine = engine();
        let (mut horse, mut mount) = fixture();
        horse.set_hydration(0.0);
        assert!(engine.apply_hydration_effect(&mut horse, &mut mount, 1000, None));
        assert_eq!(mount.movement_speed, engine.throttled_speed());
        assert!(!engine.apply_hydration_effect(&mut horse, &mut mount, 1050, None));
        assert!(!engine.apply_hydration_effect(&mut horse, &mut mount, 1100, None));
        assert!(engine.apply_hydration_effect(&mut horse, &mut mount, 1101, None));

        horse.set_hydration(0.5);
        assert!(!engine.apply_hydration_effect(&mut horse, &mut mount, 1102, None));
        assert_eq!(mount.movement_speed, engine.curve(Ability::Speed).value_for_level(1));
    }

    #[test]
    fn rider_cap_limits_restored_speed() {
        let engine = engine();
        let (mut horse, mut mount) = fixture();
        horse.set_level(Ability::Speed, 5);
        engine.apply_hydration_effect(&mut horse, &mut mount, 1, Some(2));
        assert_eq!(mount.movement_speed, engine.curve(Ability::Speed).value_for_level(2));
    }

    #[test]
    fn water_tops_up_until_full() {
        let engine = engine();
        let (mut horse, _) = fixture();
        assert_eq!(engine.consume_water(&mut horse), WaterOutcome::Drank { satisfied: false });
        assert_eq!(engine.consume_water(&mut horse), WaterOutcome::Drank { satisfied: true });
        assert_eq!(horse.hydration(), 1.0);
        assert_eq!(engine.consume_water(&mut horse), WaterOutcome::NotThirsty);
    }

    #[test]
    fn swapped_stats_are_applied_on_refresh() {
        let engine = engine();
        let (mut horse, mut mount) = fixture();
        let mut other = TrainedHorse::new(Uuid::new_v4(), None, "bay_horse", Utc::now());
        other.set_level(Ability::Jump, 4);
        horse.swap_training_stats(&mut other);
        assert!(horse.has_outdated_attributes());
        engine.apply_all_attributes(&mut horse, &mut mount);
        assert!(!horse.has_outdated_attributes());
        assert_eq!(mount.jump_strength, engine.curve(Ability::Jump).value_for_level(4));
    }
}
