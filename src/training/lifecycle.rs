//! Ownership and abandonment rules for the restricted (skeletal/undead) kinds.
//!
//! ```text
//! Unowned --first interaction--> Owned --idle + untrained--> Abandoned
//!                                                               |
//!                     +-------- owner cleared, record purged ---+
//!                     v
//!                  Removed / Owned(new owner) in the same interaction
//! ```

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::TrainingConfig;
use crate::training::types::{Ability, TrainedHorse};

/// Levels below this count as untrained for abandonment.
const ABANDON_MAX_LEVEL: u32 = 2;

/// Nuggets below this (one golden apple) count as unfed for abandonment.
const ABANDON_MAX_NUGGETS: u32 = 72;

/// What an interaction with a mount is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Not a restricted kind; anyone may interact.
    Open,
    /// Restricted kind with no owner; the actor claims it.
    Claim,
    /// Restricted kind owned by the actor.
    Owner,
    /// Restricted kind owned by someone else who has abandoned it.
    ReleaseAbandoned,
    /// Restricted kind owned by someone else.
    Deny,
}

#[derive(Debug, Clone)]
pub struct LifecyclePolicy {
    abandoned_after: Duration,
}

impl LifecyclePolicy {
    pub fn new(abandoned_days: i64) -> Self {
        Self {
            abandoned_after: Duration::days(abandoned_days.max(0)),
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(config.abandoned_days)
    }

    pub fn abandoned_after(&self) -> Duration {
        self.abandoned_after
    }

    /// True for restricted kinds that nobody named, trained or fed and that
    /// have not been touched for longer than the abandonment period.
    pub fn is_abandoned(&self, horse: &TrainedHorse, now: DateTime<Utc>) -> bool {
        horse.is_restricted_kind()
            && horse.level(Ability::Speed) < ABANDON_MAX_LEVEL
            && horse.level(Ability::Jump) < ABANDON_MAX_LEVEL
            && horse.nuggets_eaten() < ABANDON_MAX_NUGGETS
            && !horse.has_display_name()
            && now.signed_duration_since(horse.last_accessed()) > self.abandoned_after
    }

    /// Unconditionally set the owner, for claims and releases alike.
    pub fn transfer_ownership(&self, horse: &mut TrainedHorse, new_owner: Option<Uuid>) {
        horse.set_owner(new_owner);
    }

    /// Decide an interaction by `actor` with a mount whose live owner is `owner`.
    pub fn check_access(
        &self,
        horse: &TrainedHorse,
        owner: Option<Uuid>,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> AccessDecision {
        if !horse.is_restricted_kind() {
            return AccessDecision::Open;
        }
        match owner {
            None => AccessDecision::Claim,
            Some(owner) if owner == actor => AccessDecision::Owner,
            Some(_) if self.is_abandoned(horse, now) => AccessDecision::ReleaseAbandoned,
            Some(_) => AccessDecision::Deny,
        }
    }

    /// Whether an unridden mount owned by `owner` is protected from damage.
    /// Abandoned horses lose their protection.
    pub fn is_protected(&self, horse: &TrainedHorse, owner: Option<Uuid>, has_rider: bool, now: DateTime<Utc>) -> bool {
        horse.is_restricted_kind() && owner.is_some() && !has_rider && !self.is_abandoned(horse, now)
    }
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self::from_config(&TrainingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stale_undead(days: i64) -> (TrainedHorse, DateTime<Utc>) {
        let now = Utc::now();
        let horse = TrainedHorse::new(Uuid::new_v4(), Some(Uuid::new_v4()), "undead_horse", now - Duration::days(days));
        (horse, now)
    }

    #[test]
    fn untouched_undead_is_abandoned_after_fifteen_days() {
        let policy = LifecyclePolicy::default();
        let (horse, now) = stale_undead(15);
        assert!(policy.is_abandoned(&horse, now));
        let (recent, now) = stale_undead(13);
        assert!(!policy.is_abandoned(&recent, now));
    }

    #[test]
    fn named_horse_is_never_abandoned() {
        let policy = LifecyclePolicy::default();
        let (mut horse, now) = stale_undead(400);
        horse.set_display_name(Some("Bones"));
        assert!(!policy.is_abandoned(&horse, now));
    }

    #[test]
    fn progress_prevents_abandonment() {
        let policy = LifecyclePolicy::default();
        let (mut trained, now) = stale_undead(30);
        trained.set_level(Ability::Jump, 2);
        assert!(!policy.is_abandoned(&trained, now));

        let (mut fed, now) = stale_undead(30);
        fed.set_nuggets_eaten(72);
        assert!(!policy.is_abandoned(&fed, now));
    }

    #[test]
    fn ordinary_horses_are_never_abandoned() {
        let policy = LifecyclePolicy::default();
        let now = Utc::now();
        let horse = TrainedHorse::new(Uuid::new_v4(), Some(Uuid::new_v4()), "bay_horse", now - Duration::days(100));
        assert!(!policy.is_abandoned(&horse, now));
        assert_eq!(policy.check_access(&horse, horse.owner(), Uuid::new_v4(), now), AccessDecision::Open);
    }

    #[test]
    fn access_decisions_for_restricted_kinds() {
        let policy = LifecyclePolicy::default();
        let actor = Uuid::new_v4();
        let (stale, now) = stale_undead(20);
        assert_eq!(policy.check_access(&stale, None, actor, now), AccessDecision::Claim);
        assert_eq!(policy.check_access(&stale, Some(actor), actor, now), AccessDecision::Owner);
        assert_eq!(policy.check_access(&stale, stale.owner(), actor, now), AccessDecision::ReleaseAbandoned);

        let (fresh, now) = stale_undead(1);
        assert_eq!(policy.check_access(&fresh, fresh.owner(), actor, now), AccessDecision::Deny);
    }

    #[test]
    fn damage_protection() {
        let policy = LifecyclePolicy::default();
        let (fresh, now) = stale_undead(1);
        assert!(policy.is_protected(&fresh, fresh.owner(), false, now));
        assert!(!policy.is_protected(&fresh, fresh.owner(), true, now));
        assert!(!policy.is_protected(&fresh, None, false, now));
        let (stale, now) = stale_undead(20);
        assert!(!policy.is_protected(&stale, stale.owner(), false, now));
    }
}
