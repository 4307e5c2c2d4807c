//! Interfaces to the host simulation.
//!
//! Live mounts belong to the host. The engine only borrows them for the
//! duration of one call through [`MountHandle`], which exposes the handful of
//! reads and writes training needs. [`Simulation`] answers questions that need
//! the wider world (does an entity still exist, was an offered item eaten).

use uuid::Uuid;

use crate::training::food::GoldFood;
use crate::training::types::{Attribute, Location};

/// Capability-limited accessor for one live mount.
pub trait MountHandle {
    fn id(&self) -> Uuid;
    fn location(&self) -> Location;
    fn owner(&self) -> Option<Uuid>;
    fn set_owner(&mut self, owner: Option<Uuid>);
    fn set_tamed(&mut self, tamed: bool);
    /// Variant/colour tag, e.g. `undead_horse` or `chestnut_white_horse`.
    fn appearance(&self) -> String;
    fn custom_name(&self) -> Option<String>;
    fn attribute(&self, attribute: Attribute) -> f64;
    fn set_attribute(&mut self, attribute: Attribute, value: f64);
    fn health(&self) -> f64;
    fn set_health(&mut self, health: f64);
}

/// World-level queries used by deferred work and the startup purge.
pub trait Simulation {
    fn entity_exists(&self, id: Uuid) -> bool;
    fn mount(&mut self, id: Uuid) -> Option<&mut dyn MountHandle>;
    /// True if the item `actor` offered a horse on an earlier tick is gone from their hand.
    fn food_was_eaten(&self, actor: Uuid, food: GoldFood) -> bool;
}

/// Plain in-memory mount, for headless tools and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct MountState {
    pub id: Uuid,
    pub location: Location,
    pub owner: Option<Uuid>,
    pub tamed: bool,
    pub appearance: String,
    pub custom_name: Option<String>,
    pub movement_speed: f64,
    pub jump_strength: f64,
    pub max_health: f64,
    pub health: f64,
}

impl MountState {
    pub fn new(appearance: impl Into<String>, location: Location) -> Self {
        Self {
            id: Uuid::new_v4(),
            location,
            owner: None,
            tamed: false,
            appearance: appearance.into(),
            custom_name: None,
            movement_speed: 0.1125,
            jump_strength: 0.4,
            max_health: 15.0,
            health: 15.0,
        }
    }

    pub fn with_owner(mut self, owner: Uuid) -> Self {
        self.owner = Some(owner);
        self.tamed = true;
        self
    }

    /// Move along the X axis.
    pub fn advance(&mut self, metres: f64) {
        self.location.x += metres;
    }
}

impl MountHandle for MountState {
    fn id(&self) -> Uuid {
        self.id
    }

    fn location(&self) -> Location {
        self.location.clone()
    }

    fn owner(&self) -> Option<Uuid> {
        self.owner
    }

    fn set_owner(&mut self, owner: Option<Uuid>) {
        self.owner = owner;
    }

    fn set_tamed(&mut self, tamed: bool) {
        self.tamed = tamed;
    }

    fn appearance(&self) -> String {
        self.appearance.clone()
    }

    fn custom_name(&self) -> Option<String> {
        self.custom_name.clone()
    }

    fn attribute(&self, attribute: Attribute) -> f64 {
        match attribute {
            Attribute::MovementSpeed => self.movement_speed,
            Attribute::JumpStrength => self.jump_strength,
            Attribute::MaxHealth => self.max_health,
        }
    }

    fn set_attribute(&mut self, attribute: Attribute, value: f64) {
        match attribute {
            Attribute::MovementSpeed => self.movement_speed = value,
            Attribute::JumpStrength => self.jump_strength = value,
            Attribute::MaxHealth => self.max_health = value,
        }
    }

    fn health(&self) -> f64 {
        self.health
    }

    fn set_health(&mut self, health: f64) {
        self.health = health;
    }
}
