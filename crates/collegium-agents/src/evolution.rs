//! The stage-promotion state machine.
//!
//! Promotion is strictly sequential (no stage skipping) and all-or-nothing:
//! an agent advances only when every criterion for the next stage is met,
//! and a failed promotion attempt changes nothing. Thresholds live in a
//! [`PromotionTable`] so scenario files can tune them without code changes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use collegium_types::{Agent, Outcome, PromotionRecord, Stage, experience_kinds};

use crate::agent::{self, Capabilities};
use crate::config::AgentConfig;
use crate::reputation;

/// Errors from the promotion state machine.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    /// The agent does not yet meet the criteria for the next stage.
    #[error("agent {agent_id} is not eligible for promotion to {target}")]
    NotEligible {
        /// The agent that failed the check.
        agent_id: collegium_types::AgentId,
        /// The stage the agent was checked against.
        target: Stage,
        /// Every criterion still unmet.
        missing: Vec<MissingCriterion>,
    },

    /// The agent is already at the terminal stage.
    #[error("agent {0} is already at the terminal stage")]
    TerminalStage(collegium_types::AgentId),
}

/// One unmet promotion criterion, with the required and observed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCriterion {
    /// Name of the criterion, e.g. `papers_read`.
    pub criterion: String,
    /// The threshold for the next stage.
    pub required: f64,
    /// The agent's current value.
    pub actual: f64,
}

/// Thresholds an agent must meet to enter one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PromotionCriteria {
    /// Minimum lifetime papers read.
    pub papers_read: u32,
    /// Minimum lifetime papers written.
    pub papers_written: u32,
    /// Minimum students taught to completion.
    pub students_taught: u32,
    /// Minimum experiments run.
    pub experiments_run: u32,
    /// Minimum reviews given.
    pub reviews_given: u32,
    /// Minimum weighted overall reputation.
    pub min_reputation: f64,
}

/// Criteria for every non-initial stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionTable {
    /// Criteria to become a Practitioner.
    pub practitioner: PromotionCriteria,
    /// Criteria to become a Teacher.
    pub teacher: PromotionCriteria,
    /// Criteria to become a Researcher.
    pub researcher: PromotionCriteria,
    /// Criteria to become an Expert.
    pub expert: PromotionCriteria,
}

impl Default for PromotionTable {
    fn default() -> Self {
        Self {
            practitioner: PromotionCriteria {
                papers_read: 5,
                papers_written: 0,
                students_taught: 0,
                experiments_run: 0,
                reviews_given: 0,
                min_reputation: 0.0,
            },
            teacher: PromotionCriteria {
                papers_read: 15,
                papers_written: 0,
                students_taught: 3,
                experiments_run: 2,
                reviews_given: 0,
                min_reputation: 55.0,
            },
            researcher: PromotionCriteria {
                papers_read: 30,
                papers_written: 2,
                students_taught: 5,
                experiments_run: 5,
                reviews_given: 3,
                min_reputation: 65.0,
            },
            expert: PromotionCriteria {
                papers_read: 50,
                papers_written: 10,
                students_taught: 10,
                experiments_run: 15,
                reviews_given: 10,
                min_reputation: 80.0,
            },
        }
    }
}

impl PromotionTable {
    /// Criteria for entering `stage`, or `None` for the initial stage.
    pub const fn criteria_for(&self, stage: Stage) -> Option<&PromotionCriteria> {
        match stage {
            Stage::Apprentice => None,
            Stage::Practitioner => Some(&self.practitioner),
            Stage::Teacher => Some(&self.teacher),
            Stage::Researcher => Some(&self.researcher),
            Stage::Expert => Some(&self.expert),
        }
    }
}

/// The outcome of a readiness check against the next stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionReadiness {
    /// The agent's current stage.
    pub current_stage: Stage,
    /// The stage being checked, `None` at the terminal stage.
    pub next_stage: Option<Stage>,
    /// Whether every criterion is met.
    pub eligible: bool,
    /// The criteria still unmet, empty when eligible or terminal.
    pub missing: Vec<MissingCriterion>,
}

/// A completed promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionResult {
    /// Stage before the promotion.
    pub from_stage: Stage,
    /// Stage after the promotion.
    pub to_stage: Stage,
    /// Capabilities available at the new stage.
    pub unlocked: Capabilities,
}

fn counter_check(
    missing: &mut Vec<MissingCriterion>,
    criterion: &str,
    required: u32,
    actual: u32,
) {
    if actual < required {
        missing.push(MissingCriterion {
            criterion: criterion.to_owned(),
            required: f64::from(required),
            actual: f64::from(actual),
        });
    }
}

/// Check whether `agent` meets every criterion for its next stage.
///
/// Never mutates the agent. An Expert is reported as ineligible with an
/// empty `missing` list rather than as an error; only [`promote`] treats
/// the terminal stage as a failure.
pub fn check_readiness(
    agent: &Agent,
    table: &PromotionTable,
    config: &AgentConfig,
) -> PromotionReadiness {
    let Some(next) = agent.stage.next() else {
        return PromotionReadiness {
            current_stage: agent.stage,
            next_stage: None,
            eligible: false,
            missing: Vec::new(),
        };
    };

    let mut missing = Vec::new();
    if let Some(criteria) = table.criteria_for(next) {
        counter_check(&mut missing, "papers_read", criteria.papers_read, agent.papers_read);
        counter_check(
            &mut missing,
            "papers_written",
            criteria.papers_written,
            agent.papers_written,
        );
        counter_check(
            &mut missing,
            "students_taught",
            criteria.students_taught,
            agent.students_taught,
        );
        counter_check(
            &mut missing,
            "experiments_run",
            criteria.experiments_run,
            agent.experiments_run,
        );
        counter_check(
            &mut missing,
            "reviews_given",
            criteria.reviews_given,
            agent.reviews_given,
        );

        let overall = reputation::overall(&agent.reputation, &config.reputation_weights);
        if overall < criteria.min_reputation {
            missing.push(MissingCriterion {
                criterion: String::from("min_reputation"),
                required: criteria.min_reputation,
                actual: overall,
            });
        }
    }

    PromotionReadiness {
        current_stage: agent.stage,
        next_stage: Some(next),
        eligible: missing.is_empty(),
        missing,
    }
}

/// Promote `agent` to its next stage if it is eligible.
///
/// On success the agent's stage changes, a [`PromotionRecord`] and a
/// promotion experience entry are appended, and the promotion counter is
/// bumped. On any error the agent is untouched.
pub fn promote(
    agent: &mut Agent,
    table: &PromotionTable,
    config: &AgentConfig,
) -> Result<PromotionResult, EvolutionError> {
    let readiness = check_readiness(agent, table, config);
    let Some(next) = readiness.next_stage else {
        return Err(EvolutionError::TerminalStage(agent.agent_id));
    };
    if !readiness.eligible {
        return Err(EvolutionError::NotEligible {
            agent_id: agent.agent_id,
            target: next,
            missing: readiness.missing,
        });
    }

    let from = agent.stage;
    agent.stage = next;
    agent.promotion_count = agent.promotion_count.saturating_add(1);
    agent.promotions.push(PromotionRecord {
        from_stage: from,
        to_stage: next,
        timestamp: Utc::now(),
    });

    let entry = agent::experience_entry(
        experience_kinds::PROMOTION,
        format!("Promoted from {from} to {next}"),
        Outcome::Success,
        None,
        Vec::new(),
    );
    agent::record_experience(agent, config, entry);

    info!(agent_id = %agent.agent_id, %from, to = %next, "Agent promoted");
    Ok(PromotionResult {
        from_stage: from,
        to_stage: next,
        unlocked: Capabilities::for_stage(next),
    })
}
