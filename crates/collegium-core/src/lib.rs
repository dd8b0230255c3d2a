//! Scheduler, matchmaking, and orchestration for the Collegium simulation.
//!
//! This crate owns the step cycle that drives the community: activity
//! draws, matchmaker pairing, concurrent activity execution, delta
//! application, promotion passes, and checkpointing.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `collegium-config.yaml` into
//!   strongly-typed structs.
//! - [`events`] -- Typed community events and the synchronous event bus.
//! - [`matchmaking`] -- Mentor, collaborator, and reviewer pairing.
//! - [`runner`] -- [`ActivityRunner`] trait and [`StubActivityRunner`].
//! - [`scheduler`] -- The step cycle and the [`CommunityScheduler`].
//! - [`stores`] -- [`StateStore`]/[`GraphStore`] contracts plus in-memory
//!   implementations for tests and offline runs.
//!
//! [`ActivityRunner`]: runner::ActivityRunner
//! [`StubActivityRunner`]: runner::StubActivityRunner
//! [`CommunityScheduler`]: scheduler::CommunityScheduler
//! [`StateStore`]: stores::StateStore
//! [`GraphStore`]: stores::GraphStore

pub mod config;
pub mod events;
pub mod matchmaking;
pub mod runner;
pub mod scheduler;
pub mod stores;
