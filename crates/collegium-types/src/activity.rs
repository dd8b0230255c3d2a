//! Activity report and state-delta types.
//!
//! The scheduler hands an activity collaborator an owned agent snapshot
//! plus an [`ActivityContext`]; the collaborator returns an
//! [`ActivityReport`] describing what happened and which state deltas to
//! apply. Deltas are applied by the scheduler only after the activity
//! completes successfully -- a failed activity applies nothing, which is
//! what makes per-agent step atomicity trivial.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, ExperienceEntry};
use crate::enums::{Activity, Outcome};
use crate::ids::{AgentId, ExperimentId, MentorshipId, PaperId};
use crate::knowledge::KnowledgeSource;

/// Paper metadata returned by the literature provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    /// Identifier of the paper.
    pub paper_id: PaperId,
    /// Paper title.
    pub title: String,
    /// Abstract text.
    pub abstract_text: String,
    /// Citation count at lookup time.
    pub citation_count: u32,
    /// Topic tags.
    pub topics: Vec<String>,
}

/// Record of one sandbox experiment run during a research activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    /// Identifier of the experiment.
    pub experiment_id: ExperimentId,
    /// The researcher who ran it.
    pub agent_id: AgentId,
    /// Topic under investigation.
    pub topic: String,
    /// The hypothesis being tested.
    pub hypothesis: String,
    /// Whether the experiment supported the hypothesis.
    pub succeeded: bool,
    /// What the run produced.
    pub observations: String,
    /// When the experiment ran.
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// A delta against one topic in an agent's knowledge book.
///
/// Deltas of any sign are accepted; scores are clamped to `[0.0, 1.0]`
/// on application. A delta for an unknown topic creates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDelta {
    /// Topic name to upsert.
    pub topic: String,
    /// Change to the depth score.
    pub depth_delta: f64,
    /// Change to the breadth score.
    pub breadth_delta: f64,
    /// Change to the confidence score.
    pub confidence_delta: f64,
    /// Provenance of the change, if known.
    pub source: Option<KnowledgeSource>,
    /// Validation event: `Some(true)` on successful validation,
    /// `Some(false)` on failed validation, `None` for no validation.
    pub validation: Option<bool>,
}

impl KnowledgeDelta {
    /// A delta that only touches scores, with no source or validation.
    pub fn scores(topic: impl Into<String>, depth: f64, breadth: f64, confidence: f64) -> Self {
        Self {
            topic: topic.into(),
            depth_delta: depth,
            breadth_delta: breadth,
            confidence_delta: confidence,
            source: None,
            validation: None,
        }
    }
}

/// A semantic reputation event produced by an activity.
///
/// Events carry outcomes and qualities, not raw score deltas: the actual
/// magnitudes come from the configured delta table when the event is
/// applied, so tuning never requires touching activity code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReputationEvent {
    /// A paper was published; `impact` scales the research bonus.
    Publication {
        /// Impact factor of the venue, nominally around 1.0.
        impact: f64,
    },
    /// A teaching session completed with the given outcome.
    TeachingSession {
        /// How the session went.
        outcome: Outcome,
    },
    /// A peer review was given; `quality` is a 0-5 helpfulness rating.
    ReviewGiven {
        /// Helpfulness rating of the review.
        quality: f64,
    },
    /// A collaboration round completed with the given outcome.
    Collaboration {
        /// How the collaboration went.
        outcome: Outcome,
    },
}

/// Increments to an agent's lifetime activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDeltas {
    /// Papers read this activity.
    pub papers_read: u32,
    /// Papers written this activity.
    pub papers_written: u32,
    /// Students taught to completion this activity.
    pub students_taught: u32,
    /// Experiments run this activity.
    pub experiments_run: u32,
    /// Reviews given this activity.
    pub reviews_given: u32,
}

/// Progress update for an existing mentorship after a teaching session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MentorshipUpdate {
    /// The relation to update.
    pub relation_id: MentorshipId,
    /// Change to the student's progress, clamped into `[0.0, 1.0]`.
    pub progress_delta: f64,
}

/// The full set of state deltas an activity wants applied to one agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentDeltas {
    /// Knowledge upserts.
    pub knowledge: Vec<KnowledgeDelta>,
    /// Reputation events.
    pub reputation: Vec<ReputationEvent>,
    /// Counter increments.
    pub counters: CounterDeltas,
    /// Experience log entry to append, if any.
    pub experience: Option<ExperienceEntry>,
    /// Mentorship session bookkeeping, if the activity was a session.
    pub mentorship: Option<MentorshipUpdate>,
}

impl AgentDeltas {
    /// Whether applying these deltas would change nothing.
    pub fn is_empty(&self) -> bool {
        self.knowledge.is_empty()
            && self.reputation.is_empty()
            && self.counters == CounterDeltas::default()
            && self.experience.is_none()
            && self.mentorship.is_none()
    }
}

/// Everything an activity collaborator needs beyond the agent snapshot.
#[derive(Debug, Clone, Default)]
pub struct ActivityContext {
    /// The step index the activity runs in.
    pub step: u64,
    /// The topic the activity focuses on.
    pub topic: String,
    /// Owned snapshots of paired agents (student for teaching, partners
    /// for collaboration, authors to exclude for review).
    pub partners: Vec<Agent>,
    /// Paper under review, when the activity is a review.
    pub paper: Option<PaperMetadata>,
}

/// Structured result of one executed activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityReport {
    /// Which activity ran.
    pub activity: Activity,
    /// How it turned out.
    pub outcome: Outcome,
    /// One-line summary for logs and the experience log.
    pub summary: String,
    /// Deltas for the acting agent.
    pub deltas: AgentDeltas,
    /// Deltas for paired agents (e.g. the student in a teaching session).
    pub partner_deltas: Vec<(AgentId, AgentDeltas)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deltas_are_empty() {
        assert!(AgentDeltas::default().is_empty());
    }

    #[test]
    fn counter_increment_makes_deltas_non_empty() {
        let deltas = AgentDeltas {
            counters: CounterDeltas {
                papers_read: 1,
                ..CounterDeltas::default()
            },
            ..AgentDeltas::default()
        };
        assert!(!deltas.is_empty());
    }

    #[test]
    fn reputation_event_serializes_with_kind_tag() {
        let event = ReputationEvent::Publication { impact: 1.5 };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"kind\":\"publication\""));
    }
}
