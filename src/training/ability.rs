//! Ability curves: effort to level, level to attribute value.
//!
//! Each ability is configured as a table of steps. A step says "from this much
//! accumulated effort the horse is at this level, and at this level the live
//! attribute is this value". Lookups are step functions over that table.

use serde::{Deserialize, Serialize};

use crate::training::errors::TrainingError;
use crate::training::types::Ability;

/// One row of an ability's level table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelStep {
    pub level: u32,
    /// Effort at which `level` is reached (metres or nuggets).
    pub effort: f64,
    /// Attribute value applied at `level`.
    pub value: f64,
}

/// Configured level table for one ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveConfig {
    pub levels: Vec<LevelStep>,
}

impl CurveConfig {
    /// Build a table of `max_level` steps whose effort grows with the triangular
    /// numbers (`unit * n(n+1)/2` for level `n + 1`) and whose value rises linearly
    /// from `min_value` to `max_value`.
    pub fn triangular(max_level: u32, unit: f64, min_value: f64, max_value: f64) -> Self {
        let max_level = max_level.max(1);
        let span = (max_level - 1).max(1) as f64;
        let levels = (1..=max_level)
            .map(|level| {
                let n = f64::from(level - 1);
                LevelStep {
                    level,
                    effort: unit * n * (n + 1.0) / 2.0,
                    value: min_value + (max_value - min_value) * n / span,
                }
            })
            .collect();
        Self { levels }
    }

    /// Movement speed attribute, trained by distance ridden on the ground.
    pub fn default_speed() -> Self {
        Self::triangular(30, 500.0, 0.1125, 0.3375)
    }

    /// Jump strength attribute, trained by horizontal distance jumped.
    pub fn default_jump() -> Self {
        Self::triangular(30, 50.0, 0.4, 1.0)
    }

    /// Max health attribute, trained by gold eaten. Level 2 needs one golden apple.
    pub fn default_health() -> Self {
        Self::triangular(30, 72.0, 15.0, 30.0)
    }
}

/// Validated, immutable level table for one ability.
#[derive(Debug, Clone)]
pub struct AbilityCurve {
    ability: Ability,
    steps: Vec<LevelStep>,
}

impl AbilityCurve {
    pub fn new(ability: Ability, config: &CurveConfig) -> Result<Self, TrainingError> {
        let invalid = |reason: String| TrainingError::Configuration { ability, reason };

        if config.levels.is_empty() {
            return Err(invalid("level table is empty".to_string()));
        }
        for (idx, step) in config.levels.iter().enumerate() {
            if step.level == 0 {
                return Err(invalid(format!("entry {} has level 0", idx + 1)));
            }
            if !step.effort.is_finite() || step.effort < 0.0 {
                return Err(invalid(format!("level {} has effort {}", step.level, step.effort)));
            }
            if !step.value.is_finite() {
                return Err(invalid(format!("level {} has value {}", step.level, step.value)));
            }
        }
        for pair in config.levels.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if next.level <= prev.level {
                return Err(invalid(format!(
                    "levels not increasing: {} follows {}",
                    next.level, prev.level
                )));
            }
            if next.effort <= prev.effort {
                return Err(invalid(format!(
                    "effort for level {} ({}) not above level {} ({})",
                    next.level, next.effort, prev.level, prev.effort
                )));
            }
            if next.value < prev.value {
                return Err(invalid(format!(
                    "value for level {} ({}) below level {} ({})",
                    next.level, next.value, prev.level, prev.value
                )));
            }
        }

        Ok(Self {
            ability,
            steps: config.levels.clone(),
        })
    }

    pub fn ability(&self) -> Ability {
        self.ability
    }

    /// Greatest configured level whose threshold is at or below `effort`; never below 1.
    pub fn level_for_effort(&self, effort: f64) -> u32 {
        // NaN compares false everywhere and falls through to the floor.
        let reached = self.steps.partition_point(|step| step.effort <= effort);
        match reached {
            0 => 1,
            n => self.steps[n - 1].level.max(1),
        }
    }

    /// Attribute value at `level`. Levels past the table clamp to the last entry.
    pub fn value_for_level(&self, level: u32) -> f64 {
        let idx = self.steps.partition_point(|step| step.level <= level);
        match idx {
            0 => self.steps[0].value,
            n => self.steps[n - 1].value,
        }
    }

    /// Effort threshold of `level`, or of the nearest configured level below it.
    pub fn effort_for_level(&self, level: u32) -> f64 {
        let idx = self.steps.partition_point(|step| step.level <= level);
        match idx {
            0 => 0.0,
            n => self.steps[n - 1].effort,
        }
    }

    /// Effort needed for the next configured level, if any.
    pub fn next_threshold(&self, level: u32) -> Option<LevelStep> {
        self.steps.iter().copied().find(|step| step.level > level)
    }

    pub fn min_value(&self) -> f64 {
        self.steps[0].value
    }

    pub fn max_value(&self) -> f64 {
        self.steps[self.steps.len() - 1].value
    }

    pub fn max_level(&self) -> u32 {
        self.steps[self.steps.len() - 1].level
    }
}

/// The three validated curves, built once at startup.
#[derive(Debug, Clone)]
pub struct AbilityCurves {
    speed: AbilityCurve,
    jump: AbilityCurve,
    health: AbilityCurve,
}

impl AbilityCurves {
    pub fn new(speed: &CurveConfig, jump: &CurveConfig, health: &CurveConfig) -> Result<Self, TrainingError> {
        Ok(Self {
            speed: AbilityCurve::new(Ability::Speed, speed)?,
            jump: AbilityCurve::new(Ability::Jump, jump)?,
            health: AbilityCurve::new(Ability::Health, health)?,
        })
    }

    pub fn get(&self, ability: Ability) -> &AbilityCurve {
        match ability {
            Ability::Speed => &self.speed,
            Ability::Jump => &self.jump,
            Ability::Health => &self.health,
        }
    }
}

impl Default for AbilityCurves {
    fn default() -> Self {
        Self {
            speed: AbilityCurve {
                ability: Ability::Speed,
                steps: CurveConfig::default_speed().levels,
            },
            jump: AbilityCurve {
                ability: Ability::Jump,
                steps: CurveConfig::default_jump().levels,
            },
            health: AbilityCurve {
                ability: Ability::Health,
                steps: CurveConfig::default_health().levels,
            },
        }
    }
}
