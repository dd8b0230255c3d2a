//! Agent models for the Collegium simulation.
//!
//! This crate owns the agent-local update rules: how knowledge scores move,
//! how reputation responds to activity outcomes, how experience accumulates,
//! and when an agent is promoted to the next developmental stage.
//!
//! # Modules
//!
//! - [`config`] -- Tunable tables (reputation weights and deltas, experience
//!   points, validation threshold).
//! - [`knowledge`] -- Update rules for the per-agent knowledge book.
//! - [`reputation`] -- Bounded reputation updates and the weighted overall
//!   score.
//! - [`agent`] -- Experience recording, capability predicates, relationship
//!   management, and delta application.
//! - [`evolution`] -- The stage-promotion state machine.

pub mod agent;
pub mod config;
pub mod evolution;
pub mod knowledge;
pub mod reputation;

pub use agent::{Capabilities, RelationError};
pub use config::{AgentConfig, ConfigError, ExperiencePoints, ReputationDeltas, ReputationWeights};
pub use evolution::{
    EvolutionError, MissingCriterion, PromotionCriteria, PromotionReadiness, PromotionResult,
    PromotionTable,
};
