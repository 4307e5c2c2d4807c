//! Administrative operations and their text reports.
//!
//! These work on a [`HorseRegistry`] directly so the CLI can use them against
//! a stored database without a running simulation.

use uuid::Uuid;

use crate::training::engine::TrainingEngine;
use crate::training::errors::TrainingError;
use crate::training::registry::HorseRegistry;
use crate::training::types::{Ability, TrainedHorse};

/// Format a one-line summary of a horse's levels.
pub fn format_levels(horse: &TrainedHorse) -> String {
    format!(
        "{}: Speed {}, Jump {}, Health {}, hydration {:.0}%",
        horse.message_name(),
        horse.speed_level(),
        horse.jump_level(),
        horse.health_level(),
        horse.hydration() * 100.0
    )
}

/// Report how much effort each ability still needs for its next level.
pub fn format_upgrades(horse: &TrainedHorse, engine: &TrainingEngine) -> String {
    let mut lines = vec![format!("{} training progress:", horse.message_name())];
    for ability in Ability::ALL {
        let curve = engine.curve(ability);
        let level = horse.level(ability);
        let effort = horse.effort(ability);
        let line = match curve.next_threshold(level) {
            Some(next) => format!(
                "  {} level {}: {:.1} {} more for level {}",
                ability,
                level,
                (next.effort - effort).max(0.0),
                ability.effort_unit(),
                next.level
            ),
            None => format!("  {} level {}: maximum level", ability, level),
        };
        lines.push(line);
    }
    lines.join("\n")
}

/// Horses with the most effort in `ability`, best first.
pub fn top_horses(registry: &HorseRegistry, ability: Ability, limit: usize) -> Vec<&TrainedHorse> {
    let mut horses: Vec<&TrainedHorse> = registry.iter().collect();
    horses.sort_by(|a, b| {
        b.level(ability)
            .cmp(&a.level(ability))
            .then_with(|| b.effort(ability).total_cmp(&a.effort(ability)))
            .then_with(|| a.id().cmp(&b.id()))
    });
    horses.truncate(limit);
    horses
}

pub fn format_top(horses: &[&TrainedHorse], ability: Ability) -> String {
    if horses.is_empty() {
        return "No horses recorded yet.".to_string();
    }
    let mut lines = vec![format!("Top horses by {}:", ability)];
    for (rank, horse) in horses.iter().enumerate() {
        lines.push(format!(
            "{:>3}. {} - level {} ({:.1} {})",
            rank + 1,
            horse.message_name(),
            horse.level(ability),
            horse.effort(ability),
            ability.effort_unit()
        ));
    }
    lines.join("\n")
}

/// Horses owned by `owner`, sorted by id for stable output.
pub fn owned_horses(registry: &HorseRegistry, owner: Uuid) -> Vec<&TrainedHorse> {
    let mut horses: Vec<&TrainedHorse> = registry.iter().filter(|h| h.owner() == Some(owner)).collect();
    horses.sort_by_key(|h| h.id());
    horses
}

pub fn format_owned(horses: &[&TrainedHorse]) -> String {
    if horses.is_empty() {
        return "No horses owned.".to_string();
    }
    horses
        .iter()
        .map(|horse| {
            let place = horse.location().map_or_else(
                || "unknown".to_string(),
                |loc| format!("{} ({:.0}, {:.0}, {:.0})", loc.world, loc.x, loc.y, loc.z),
            );
            format!("{} [{}] at {}", format_levels(horse), horse.id(), place)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Force a level and set the effort to that level's threshold so the two
/// stay consistent. Live attributes are refreshed on the next interaction.
pub fn set_level(
    registry: &mut HorseRegistry,
    engine: &TrainingEngine,
    id: Uuid,
    ability: Ability,
    level: u32,
) -> Result<u32, TrainingError> {
    let curve = engine.curve(ability);
    if level == 0 || level > curve.max_level() {
        return Err(TrainingError::Validation(format!(
            "{} level must be between 1 and {} (got {})",
            ability,
            curve.max_level(),
            level
        )));
    }
    let horse = registry.get_mut(id)?;
    horse.set_effort(ability, curve.effort_for_level(level));
    horse.set_level(ability, level);
    horse.set_outdated_attributes(true);
    Ok(level)
}

/// Final stats of a horse, logged when it dies.
pub fn format_death_summary(horse: &TrainedHorse) -> String {
    format!(
        "{} died: Speed {} ({:.1} m), Jump {} ({:.1} m), Health {} ({} nuggets)",
        horse.message_name(),
        horse.speed_level(),
        horse.distance_travelled(),
        horse.jump_level(),
        horse.distance_jumped(),
        horse.health_level(),
        horse.nuggets_eaten()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::storage::HorseStore;
    use crate::training::ability::AbilityCurves;
    use chrono::Utc;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> (HorseRegistry, TrainingEngine) {
        let store = HorseStore::open(dir.path()).expect("store");
        (
            HorseRegistry::new(Box::new(store)),
            TrainingEngine::new(AbilityCurves::default(), TrainingConfig::default()),
        )
    }

    fn add(registry: &mut HorseRegistry, owner: Option<Uuid>, name: &str, travelled: f64) -> Uuid {
        let mut horse = TrainedHorse::new(Uuid::new_v4(), owner, "bay_horse", Utc::now());
        horse.set_display_name(Some(name));
        horse.set_distance_travelled(travelled);
        let id = horse.id();
        registry.insert(horse);
        id
    }

    #[test]
    fn set_level_moves_effort_to_threshold() {
        let dir = TempDir::new().expect("tempdir");
        let (mut registry, engine) = setup(&dir);
        let id = add(&mut registry, None, "Pepper", 0.0);
        set_level(&mut registry, &engine, id, Ability::Speed, 4).expect("set");
        let horse = registry.get(id).expect("horse");
        assert_eq!(horse.speed_level(), 4);
        assert_eq!(horse.distance_travelled(), engine.curve(Ability::Speed).effort_for_level(4));
        assert_eq!(engine.curve(Ability::Speed).level_for_effort(horse.distance_travelled()), 4);
        assert!(horse.has_outdated_attributes());

        assert!(set_level(&mut registry, &engine, id, Ability::Speed, 0).is_err());
        assert!(set_level(&mut registry, &engine, id, Ability::Speed, 31).is_err());
        assert!(matches!(
            set_level(&mut registry, &engine, Uuid::new_v4(), Ability::Jump, 2),
            Err(TrainingError::NotFound(_))
        ));
    }

    #[test]
    fn top_orders_by_level_then_effort() {
        let dir = TempDir::new().expect("tempdir");
        let (mut registry, _) = setup(&dir);
        add(&mut registry, None, "Slow", 10.0);
        let fast = add(&mut registry, None, "Fast", 900.0);
        add(&mut registry, None, "Middle", 300.0);
        let top = top_horses(&registry, Ability::Speed, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id(), fast);
        assert!(format_top(&top, Ability::Speed).contains("1. Fast"));
    }

    #[test]
    fn owned_lists_only_that_owner() {
        let dir = TempDir::new().expect("tempdir");
        let (mut registry, _) = setup(&dir);
        let owner = Uuid::new_v4();
        add(&mut registry, Some(owner), "Mine", 0.0);
        add(&mut registry, Some(Uuid::new_v4()), "Theirs", 0.0);
        let owned = owned_horses(&registry, owner);
        assert_eq!(owned.len(), 1);
        assert!(format_owned(&owned).starts_with("Mine: Speed 1"));
        assert_eq!(format_owned(&[]), "No horses owned.");
    }

    #[test]
    fn upgrade_report_shows_remaining_effort() {
        let horse = TrainedHorse::new(Uuid::new_v4(), None, "bay_horse", Utc::now());
        let engine = TrainingEngine::new(AbilityCurves::default(), TrainingConfig::default());
        let report = format_upgrades(&horse, &engine);
        assert!(report.contains("Health level 1: 72.0 nuggets more for level 2"));
        assert!(report.contains("Speed level 1: 500.0 m more for level 2"));
    }
}
