use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hydration below this is treated as fully dehydrated.
pub const DEHYDRATED_THRESHOLD: f64 = 0.001;

/// Hydration at or above this is treated as fully hydrated.
pub const FULLY_HYDRATED_THRESHOLD: f64 = 0.99;

/// Hydration of a freshly observed horse.
pub const INITIAL_HYDRATION: f64 = 0.5;

/// Appearance prefixes that mark the skeletal/undead horse kinds.
const RESTRICTED_APPEARANCE_PREFIXES: [&str; 3] = ["skeleton", "skeletal", "undead"];

/// Trainable abilities, each leveled independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Speed,
    Jump,
    Health,
}

impl Ability {
    pub const ALL: [Ability; 3] = [Ability::Speed, Ability::Jump, Ability::Health];

    /// Live attribute that this ability's level drives.
    pub fn attribute(self) -> Attribute {
        match self {
            Ability::Speed => Attribute::MovementSpeed,
            Ability::Jump => Attribute::JumpStrength,
            Ability::Health => Attribute::MaxHealth,
        }
    }

    /// Movement-trained abilities stop training when the horse is dehydrated.
    pub fn is_hydration_gated(self) -> bool {
        matches!(self, Ability::Speed | Ability::Jump)
    }

    /// Parse from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "speed" => Some(Ability::Speed),
            "jump" => Some(Ability::Jump),
            "health" => Some(Ability::Health),
            _ => None,
        }
    }

    pub fn effort_unit(self) -> &'static str {
        match self {
            Ability::Speed | Ability::Jump => "m",
            Ability::Health => "nuggets",
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Ability::Speed => "Speed",
            Ability::Jump => "Jump",
            Ability::Health => "Health",
        };
        f.write_str(name)
    }
}

/// Performance attributes of a live mount that training writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    MovementSpeed,
    JumpStrength,
    MaxHealth,
}

/// Last known position of a horse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub pitch: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Distance in the XZ plane. Positions in different worlds are not comparable
    /// and yield zero.
    pub fn horizontal_distance(&self, other: &Location) -> f64 {
        if self.world != other.world {
            return 0.0;
        }
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

fn default_hydration() -> f64 {
    1.0
}

fn default_level() -> u32 {
    1
}

/// Persistent training state of one horse.
///
/// Mutation goes through setters so that every change marks the record dirty;
/// the registry writes dirty records on the next save cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrainedHorse {
    /// Carried by the store key rather than the document body.
    #[serde(skip)]
    id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_uuid: Option<Uuid>,
    /// Internal name, distinct from the displayed custom name. Reserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    appearance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<Location>,
    /// Saddle/armour bit flags. Reserved.
    #[serde(default)]
    equipment: u32,
    #[serde(default)]
    distance_travelled: f64,
    #[serde(default)]
    distance_jumped: f64,
    #[serde(default)]
    nuggets_eaten: u32,
    #[serde(default = "default_level")]
    speed_level: u32,
    #[serde(default = "default_level")]
    jump_level: u32,
    #[serde(default = "default_level")]
    health_level: u32,
    #[serde(default = "default_hydration")]
    hydration: f64,
    #[serde(default = "Utc::now")]
    last_accessed: DateTime<Utc>,

    #[serde(skip)]
    is_new: bool,
    #[serde(skip)]
    dirty: bool,
    #[serde(skip)]
    debug: bool,
    #[serde(skip)]
    last_dehydration_warning_tick: Option<u64>,
    #[serde(skip)]
    outdated_attributes: bool,
}

impl TrainedHorse {
    /// Create the default record for a horse observed for the first time.
    pub fn new(id: Uuid, owner: Option<Uuid>, appearance: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_uuid: owner,
            name: None,
            display_name: String::new(),
            appearance: appearance.into(),
            location: None,
            equipment: 0,
            distance_travelled: 0.0,
            distance_jumped: 0.0,
            nuggets_eaten: 0,
            speed_level: 1,
            jump_level: 1,
            health_level: 1,
            hydration: INITIAL_HYDRATION,
            last_accessed: now,
            is_new: true,
            dirty: true,
            debug: false,
            last_dehydration_warning_tick: None,
            outdated_attributes: false,
        }
    }

    /// Rebuild a record from its stored document. The result is clean.
    pub(crate) fn from_stored(id: Uuid, json: &[u8]) -> Result<Self, serde_json::Error> {
        let mut record: TrainedHorse = serde_json::from_slice(json)?;
        record.id = id;
        record.hydration = record.hydration.clamp(0.0, 1.0);
        record.speed_level = record.speed_level.max(1);
        record.jump_level = record.jump_level.max(1);
        record.health_level = record.health_level.max(1);
        record.mark_clean();
        Ok(record)
    }

    pub(crate) fn to_stored(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    /// Signify that this record matches durable storage.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
        self.is_new = false;
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn owner(&self) -> Option<Uuid> {
        self.owner_uuid
    }

    /// Set the owner; unchanged values do not dirty the record.
    pub fn set_owner(&mut self, owner: Option<Uuid>) {
        if self.owner_uuid == owner {
            return;
        }
        self.owner_uuid = owner;
        self.set_dirty();
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
        self.set_dirty();
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn has_display_name(&self) -> bool {
        !self.display_name.is_empty()
    }

    pub fn set_display_name(&mut self, display_name: Option<&str>) {
        self.display_name = display_name.unwrap_or_default().to_string();
        self.set_dirty();
    }

    /// Name used in player-facing messages.
    pub fn message_name(&self) -> String {
        if self.has_display_name() {
            self.display_name.clone()
        } else {
            "This horse".to_string()
        }
    }

    pub fn appearance(&self) -> &str {
        &self.appearance
    }

    pub fn set_appearance(&mut self, appearance: impl Into<String>) {
        self.appearance = appearance.into();
        self.set_dirty();
    }

    /// True for skeletal and undead horses, which have owner-only access rules.
    pub fn is_restricted_kind(&self) -> bool {
        is_restricted_appearance(&self.appearance)
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: Option<Location>) {
        self.location = location;
        self.set_dirty();
    }

    pub fn equipment(&self) -> u32 {
        self.equipment
    }

    pub fn set_equipment(&mut self, equipment: u32) {
        self.equipment = equipment;
        self.set_dirty();
    }

    pub fn distance_travelled(&self) -> f64 {
        self.distance_travelled
    }

    pub fn set_distance_travelled(&mut self, metres: f64) {
        self.distance_travelled = metres;
        self.set_dirty();
    }

    pub fn distance_jumped(&self) -> f64 {
        self.distance_jumped
    }

    pub fn set_distance_jumped(&mut self, metres: f64) {
        self.distance_jumped = metres;
        self.set_dirty();
    }

    pub fn nuggets_eaten(&self) -> u32 {
        self.nuggets_eaten
    }

    pub fn set_nuggets_eaten(&mut self, nuggets: u32) {
        self.nuggets_eaten = nuggets;
        self.set_dirty();
    }

    pub fn speed_level(&self) -> u32 {
        self.speed_level
    }

    pub fn jump_level(&self) -> u32 {
        self.jump_level
    }

    pub fn health_level(&self) -> u32 {
        self.health_level
    }

    pub fn level(&self, ability: Ability) -> u32 {
        match ability {
            Ability::Speed => self.speed_level,
            Ability::Jump => self.jump_level,
            Ability::Health => self.health_level,
        }
    }

    /// Set a level; values below 1 are raised to 1.
    pub fn set_level(&mut self, ability: Ability, level: u32) {
        let level = level.max(1);
        match ability {
            Ability::Speed => self.speed_level = level,
            Ability::Jump => self.jump_level = level,
            Ability::Health => self.health_level = level,
        }
        self.set_dirty();
    }

    /// Accumulated effort backing an ability's level.
    pub fn effort(&self, ability: Ability) -> f64 {
        match ability {
            Ability::Speed => self.distance_travelled,
            Ability::Jump => self.distance_jumped,
            Ability::Health => f64::from(self.nuggets_eaten),
        }
    }

    /// Overwrite the stored effort. Health effort is whole nuggets.
    pub fn set_effort(&mut self, ability: Ability, effort: f64) {
        let effort = effort.max(0.0);
        match ability {
            Ability::Speed => self.set_distance_travelled(effort),
            Ability::Jump => self.set_distance_jumped(effort),
            Ability::Health => self.set_nuggets_eaten(effort.round().min(f64::from(u32::MAX)) as u32),
        }
    }

    pub fn hydration(&self) -> f64 {
        self.hydration
    }

    /// Set hydration, clamped to [0, 1]. NaN leaves the current value in place.
    pub fn set_hydration(&mut self, hydration: f64) {
        if !hydration.is_nan() {
            self.hydration = hydration.clamp(0.0, 1.0);
        }
        self.set_dirty();
    }

    pub fn is_dehydrated(&self) -> bool {
        self.hydration < DEHYDRATED_THRESHOLD
    }

    pub fn is_fully_hydrated(&self) -> bool {
        self.hydration >= FULLY_HYDRATED_THRESHOLD
    }

    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    pub fn set_last_accessed(&mut self, when: DateTime<Utc>) {
        self.last_accessed = when;
        self.set_dirty();
    }

    pub fn last_dehydration_warning_tick(&self) -> Option<u64> {
        self.last_dehydration_warning_tick
    }

    pub fn set_last_dehydration_warning_tick(&mut self, tick: u64) {
        self.last_dehydration_warning_tick = Some(tick);
    }

    /// True when trained stats changed without the live attributes being updated.
    pub fn has_outdated_attributes(&self) -> bool {
        self.outdated_attributes
    }

    pub fn set_outdated_attributes(&mut self, outdated: bool) {
        self.outdated_attributes = outdated;
    }

    /// Exchange levels, distances and nuggets with another record.
    ///
    /// Both horses' live attributes are stale afterwards and get refreshed on
    /// their next interaction.
    pub fn swap_training_stats(&mut self, other: &mut TrainedHorse) {
        std::mem::swap(&mut self.speed_level, &mut other.speed_level);
        std::mem::swap(&mut self.jump_level, &mut other.jump_level);
        std::mem::swap(&mut self.health_level, &mut other.health_level);
        std::mem::swap(&mut self.distance_travelled, &mut other.distance_travelled);
        std::mem::swap(&mut self.distance_jumped, &mut other.distance_jumped);
        std::mem::swap(&mut self.nuggets_eaten, &mut other.nuggets_eaten);
        for record in [&mut *self, &mut *other] {
            record.set_dirty();
            record.set_outdated_attributes(true);
        }
    }
}

pub fn is_restricted_appearance(appearance: &str) -> bool {
    let lower = appearance.to_ascii_lowercase();
    RESTRICTED_APPEARANCE_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}
