//! Events produced for the presentation layer.
//!
//! The engine never talks to players directly. Hooks queue events; the host
//! drains them with [`crate::training::Stable::drain_events`] and renders chat
//! lines, titles and sounds as it sees fit.

use uuid::Uuid;

use crate::training::types::Ability;

/// Sound cue attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    LevelUp,
    Drink,
    Eat,
    Refuse,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEvent {
    /// A horse reached a new level. `rider` is the actor to congratulate, if any.
    LevelUp {
        entity: Uuid,
        rider: Option<Uuid>,
        ability: Ability,
        new_level: u32,
        horse_name: String,
    },
    /// Text for one actor, optionally with a sound at the horse.
    Notice {
        actor: Uuid,
        entity: Uuid,
        text: String,
        cue: Option<Cue>,
    },
}

impl TrainingEvent {
    pub fn level_up(entity: Uuid, rider: Option<Uuid>, ability: Ability, new_level: u32, horse_name: String) -> Self {
        TrainingEvent::LevelUp {
            entity,
            rider,
            ability,
            new_level,
            horse_name,
        }
    }

    pub fn notice(actor: Uuid, entity: Uuid, text: impl Into<String>, cue: Option<Cue>) -> Self {
        TrainingEvent::Notice {
            actor,
            entity,
            text: text.into(),
            cue,
        }
    }

    pub fn entity(&self) -> Uuid {
        match self {
            TrainingEvent::LevelUp { entity, .. } | TrainingEvent::Notice { entity, .. } => *entity,
        }
    }

    /// Player-facing line for the event.
    pub fn message(&self) -> String {
        match self {
            TrainingEvent::LevelUp {
                ability,
                new_level,
                horse_name,
                ..
            } => format!("{} is now Level {} in {}.", horse_name, new_level, ability),
            TrainingEvent::Notice { text, .. } => text.clone(),
        }
    }

    pub fn cue(&self) -> Option<Cue> {
        match self {
            TrainingEvent::LevelUp { .. } => Some(Cue::LevelUp),
            TrainingEvent::Notice { cue, .. } => *cue,
        }
    }
}
