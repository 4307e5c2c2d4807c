//! # Stablemaster - Horse Training for Multiplayer Worlds
//!
//! Stablemaster tracks per-horse training progression in a live multiplayer
//! simulation. Every tamed horse accrues effort toward three independent
//! abilities, and each level raises a concrete attribute of the live mount.
//!
//! ## Features
//!
//! - **Speed**: trained by distance ridden on the ground.
//! - **Jump**: trained by horizontal distance covered in the air.
//! - **Health**: trained by feeding gold (carrots, apples, enchanted apples).
//! - **Hydration**: riding drains it; a dehydrated horse stops training and slows to a crawl.
//! - **Ownership**: undead and skeletal horses belong to whoever claims them first and are
//!   released again when abandoned.
//! - **Persistence**: sled-backed JSON records with backup-then-retry on write failure.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use stablemaster::config::Config;
//! use stablemaster::training::{Location, MountState, Stable};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("stablemaster.toml").await?;
//!     let mut stable = Stable::from_config(&config)?;
//!
//!     let rider = Uuid::new_v4();
//!     let mut mount = MountState::new("bay_horse", Location::new("world", 0.0, 64.0, 0.0));
//!     stable.on_spawn(&mut mount, Utc::now());
//!     mount.advance(0.3);
//!     stable.on_observed_movement(&mut mount, rider, 0.3, true, false, 1, Utc::now());
//!
//!     for event in stable.drain_events() {
//!         println!("{}", event.message());
//!     }
//!     stable.shutdown()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`training`] - curves, records, engine, lifecycle policy, registry and the host facade
//! - [`storage`] - sled record store and tar.gz backups
//! - [`config`] - TOML configuration
//! - [`metrics`] - process-wide counters
//! - [`logutil`] - single-line log escaping for user-supplied text
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Host server    │ ← live mounts, ticks, player events
//! └─────────────────┘
//!          │ hooks
//! ┌─────────────────┐
//! │     Stable      │ ← engine, lifecycle policy, follow-ups, events
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Registry/Store  │ ← records, save cycle, backups
//! └─────────────────┘
//! ```

pub mod config;
pub mod logutil;
pub mod metrics;
pub mod storage;
pub mod training;
