//! Shared type definitions for the Collegium simulation.
//!
//! This crate is the single source of truth for all types used across the
//! Collegium workspace: a simulated community of scholar agents that
//! progress from Apprentice to Expert by learning, teaching, researching,
//! and reviewing each other's work.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Enumeration types (stages, activities, outcomes, dimensions)
//! - [`knowledge`] -- Per-topic knowledge state and the per-agent knowledge book
//! - [`reputation`] -- Multi-dimensional reputation scores
//! - [`agent`] -- The agent entity with experience log and relationships
//! - [`activity`] -- Activity report and state-delta types exchanged between
//!   the scheduler and activity collaborators

pub mod activity;
pub mod agent;
pub mod enums;
pub mod ids;
pub mod knowledge;
pub mod reputation;

// Re-export all public types at crate root for convenience.
pub use activity::{
    ActivityContext, ActivityReport, AgentDeltas, CounterDeltas, ExperimentRecord, KnowledgeDelta,
    MentorshipUpdate, PaperMetadata, ReputationEvent,
};
pub use agent::{Agent, ExperienceEntry, Mentorship, PromotionRecord, experience_kinds};
pub use enums::{Activity, Dimension, Outcome, SourceKind, Stage};
pub use ids::{AgentId, ExperimentId, MentorshipId, PaperId, ReviewId};
pub use knowledge::{ConceptRelation, KnowledgeBook, KnowledgeSource, KnowledgeTopic, RelationKind};
pub use reputation::Reputation;
