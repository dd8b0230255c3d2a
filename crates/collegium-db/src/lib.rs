//! `PostgreSQL` persistence layer for the Collegium simulation.
//!
//! `PostgreSQL` is the durable store behind the scheduler's checkpoint
//! pass: agent state, the paper archive, experiment records, and the
//! knowledge-graph projection the matchmaker queries all live here.
//!
//! # Architecture
//!
//! ```text
//! Scheduler checkpoint
//!     |
//!     +-- save_agent / save_paper / save_experiment --> PgStateStore
//!     |
//!     +-- store_agent_knowledge -------------------> PgGraphStore
//!             (agent_topics + topic_relations tables,
//!              queried back by the matchmaker)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`agent_store`] -- Agent, paper, and experiment persistence
//! - [`graph_store`] -- Knowledge-graph projection and candidate queries
//! - [`error`] -- Shared error types

pub mod agent_store;
pub mod error;
pub mod graph_store;
pub mod postgres;

// Re-export primary types for convenience.
pub use agent_store::{PaperRow, PgStateStore};
pub use error::DbError;
pub use graph_store::PgGraphStore;
pub use postgres::{PostgresConfig, PostgresPool};
