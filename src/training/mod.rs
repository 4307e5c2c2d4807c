//! # Horse Training
//!
//! Per-horse training progression: every tracked horse accrues effort toward
//! Speed, Jump and Health, and each level raises the matching live attribute.
//!
//! - [`ability`] - effort to level and level to attribute value
//! - [`types`] - the persisted [`TrainedHorse`] record
//! - [`engine`] - effort, level-ups, hydration and the plausibility guard
//! - [`lifecycle`] - ownership and abandonment of undead and skeletal horses
//! - [`registry`] - the in-memory record set and its persistence cycle
//! - [`stable`] - hooks the host simulation calls
//! - [`commands`] - administrative operations and reports

pub mod ability;
pub mod commands;
pub mod engine;
pub mod errors;
pub mod events;
pub mod food;
pub mod host;
pub mod lifecycle;
pub mod registry;
pub mod riders;
pub mod stable;
pub mod types;

pub use ability::{AbilityCurve, AbilityCurves, CurveConfig, LevelStep};
pub use engine::{TrainingEngine, WaterOutcome};
pub use errors::TrainingError;
pub use events::{Cue, TrainingEvent};
pub use food::GoldFood;
pub use host::{MountHandle, MountState, Simulation};
pub use lifecycle::{AccessDecision, LifecyclePolicy};
pub use registry::HorseRegistry;
pub use riders::{RiderBook, RiderPrefs};
pub use stable::{Access, MovementOutcome, RemovalCause, Stable, StartupReport};
pub use types::{Ability, Attribute, Location, TrainedHorse};
