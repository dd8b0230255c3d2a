//! Tunable agent-model tables.
//!
//! Magnitudes here are a configuration surface, not contracts: the scheduler
//! injects an [`AgentConfig`] at construction and tests exercise boundary
//! behavior by supplying their own tables. A malformed table (weights not
//! summing to 1.0) is rejected at validation time, before any simulation
//! step runs.

use serde::{Deserialize, Serialize};

use collegium_types::{Dimension, Outcome};

/// Tolerance when checking that reputation weights sum to 1.0.
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Errors produced when validating agent-model configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reputation weights do not sum to 1.0.
    #[error("reputation weights must sum to 1.0, got {sum}")]
    WeightsSum {
        /// The actual sum of the configured weights.
        sum: f64,
    },

    /// A weight is negative.
    #[error("reputation weight for {dimension:?} is negative: {value}")]
    NegativeWeight {
        /// The offending dimension.
        dimension: Dimension,
        /// The configured value.
        value: f64,
    },
}

/// Weights used to combine the four reputation dimensions into the
/// overall score. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReputationWeights {
    /// Weight of the teaching dimension.
    pub teaching: f64,
    /// Weight of the research dimension.
    pub research: f64,
    /// Weight of the review dimension.
    pub review: f64,
    /// Weight of the collaboration dimension.
    pub collaboration: f64,
}

impl Default for ReputationWeights {
    fn default() -> Self {
        Self {
            teaching: 0.25,
            research: 0.35,
            review: 0.20,
            collaboration: 0.20,
        }
    }
}

impl ReputationWeights {
    /// Weight for a single dimension.
    pub const fn weight(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Teaching => self.teaching,
            Dimension::Research => self.research,
            Dimension::Review => self.review,
            Dimension::Collaboration => self.collaboration,
        }
    }

    /// Check that all weights are non-negative and sum to 1.0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for dimension in Dimension::ALL {
            let value = self.weight(dimension);
            if value < 0.0 {
                return Err(ConfigError::NegativeWeight { dimension, value });
            }
        }
        let sum = self.teaching + self.research + self.review + self.collaboration;
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ConfigError::WeightsSum { sum });
        }
        Ok(())
    }
}

/// Bounded per-event reputation delta magnitudes.
///
/// Every field is a small increment or decrement; no event ever applies an
/// unbounded add, and dimension scores are clamped to `[0, 100]` on
/// application regardless.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReputationDeltas {
    /// Base research bonus for a publication.
    pub publication_base: f64,
    /// Research bonus per unit of venue impact factor.
    pub publication_impact_bonus: f64,
    /// Teaching bonus for a successful session.
    pub teaching_success: f64,
    /// Teaching bonus for a partial session.
    pub teaching_partial: f64,
    /// Teaching penalty for a failed session (applied as a subtraction).
    pub teaching_failure: f64,
    /// Quality rating treated as neutral for reviews (0-5 scale).
    pub review_neutral_quality: f64,
    /// Review delta per quality point above or below neutral.
    pub review_quality_scale: f64,
    /// Collaboration bonus for a successful round.
    pub collaboration_success: f64,
    /// Collaboration bonus for a partial round.
    pub collaboration_partial: f64,
    /// Collaboration penalty for a failed round (applied as a subtraction).
    pub collaboration_failure: f64,
}

impl Default for ReputationDeltas {
    fn default() -> Self {
        Self {
            publication_base: 2.0,
            publication_impact_bonus: 3.0,
            teaching_success: 3.0,
            teaching_partial: 1.0,
            teaching_failure: 1.0,
            review_neutral_quality: 2.5,
            review_quality_scale: 2.0,
            collaboration_success: 3.0,
            collaboration_partial: 1.0,
            collaboration_failure: 1.0,
        }
    }
}

impl ReputationDeltas {
    /// Delta for a teaching session with the given outcome.
    pub const fn teaching(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Success => self.teaching_success,
            Outcome::Partial => self.teaching_partial,
            Outcome::Failure => -self.teaching_failure,
        }
    }

    /// Delta for a collaboration round with the given outcome.
    pub const fn collaboration(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Success => self.collaboration_success,
            Outcome::Partial => self.collaboration_partial,
            Outcome::Failure => -self.collaboration_failure,
        }
    }

    /// Delta for a review of the given quality (0-5 scale).
    ///
    /// Quality above the neutral point earns a bonus, below it a penalty.
    pub fn review(&self, quality: f64) -> f64 {
        (quality.clamp(0.0, 5.0) - self.review_neutral_quality) * self.review_quality_scale
    }

    /// Delta for a publication with the given impact factor.
    pub fn publication(&self, impact: f64) -> f64 {
        self.publication_impact_bonus
            .mul_add(impact.max(0.0), self.publication_base)
    }
}

/// Experience points awarded per activity outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperiencePoints {
    /// Points for a successful activity.
    pub success: u64,
    /// Points for a partial activity.
    pub partial: u64,
    /// Points for a failed activity (showing up still counts a little).
    pub failure: u64,
}

impl Default for ExperiencePoints {
    fn default() -> Self {
        Self {
            success: 10,
            partial: 5,
            failure: 2,
        }
    }
}

impl ExperiencePoints {
    /// Points for the given outcome.
    pub const fn for_outcome(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Success => self.success,
            Outcome::Partial => self.partial,
            Outcome::Failure => self.failure,
        }
    }
}

/// All agent-model configuration in one injectable bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// How dimensions combine into the overall reputation.
    #[serde(default)]
    pub reputation_weights: ReputationWeights,
    /// Per-event reputation delta magnitudes.
    #[serde(default)]
    pub reputation_deltas: ReputationDeltas,
    /// Experience points per outcome.
    #[serde(default)]
    pub experience_points: ExperiencePoints,
    /// Successful validations required before a topic counts as validated.
    #[serde(default = "default_validation_threshold")]
    pub validation_threshold: u32,
    /// Confidence boost applied on a successful validation.
    #[serde(default = "default_validation_boost")]
    pub validation_confidence_boost: f64,
    /// Confidence penalty applied on a failed validation.
    #[serde(default = "default_validation_penalty")]
    pub validation_confidence_penalty: f64,
    /// Minimum teaching reputation to be eligible to teach.
    #[serde(default = "default_min_teaching_reputation")]
    pub min_teaching_reputation: f64,
    /// Minimum research reputation to be eligible to research.
    #[serde(default = "default_min_research_reputation")]
    pub min_research_reputation: f64,
}

const fn default_validation_threshold() -> u32 {
    1
}

const fn default_validation_boost() -> f64 {
    0.1
}

const fn default_validation_penalty() -> f64 {
    0.15
}

const fn default_min_teaching_reputation() -> f64 {
    40.0
}

const fn default_min_research_reputation() -> f64 {
    40.0
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            reputation_weights: ReputationWeights::default(),
            reputation_deltas: ReputationDeltas::default(),
            experience_points: ExperiencePoints::default(),
            validation_threshold: default_validation_threshold(),
            validation_confidence_boost: default_validation_boost(),
            validation_confidence_penalty: default_validation_penalty(),
            min_teaching_reputation: default_min_teaching_reputation(),
            min_research_reputation: default_min_research_reputation(),
        }
    }
}

impl AgentConfig {
    /// Validate the whole bundle. Called once at scheduler construction;
    /// a failure here is fatal before the simulation starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reputation_weights.validate()
    }
}
