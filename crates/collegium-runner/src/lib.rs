//! LLM-backed activity execution for the Collegium simulation.
//!
//! This crate implements [`collegium_core::runner::ActivityRunner`] on top
//! of HTTP LLM backends: it assembles prompts from minijinja templates,
//! calls the configured backend, parses structured responses leniently,
//! and turns them into activity reports full of deltas for the scheduler
//! to apply.
//!
//! # Architecture
//!
//! ```text
//! Scheduler --> Prompt Engine --> LLM Backend --> Parser --> ActivityReport
//!                    |                                          |
//!              Literature / Sandbox providers             State store
//! ```
//!
//! Every provider fault is converted into an
//! [`ActivityError`](collegium_core::runner::ActivityError), which the
//! scheduler contains per agent: a failed activity never poisons the step.

pub mod config;
pub mod cost;
pub mod error;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod providers;
pub mod runner;

pub use error::RunnerError;
pub use runner::LlmActivityRunner;
