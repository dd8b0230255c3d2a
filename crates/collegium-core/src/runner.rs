//! Activity runner trait and stub implementation.
//!
//! During the execution phase of a step, the scheduler hands each acting
//! agent's owned snapshot to an [`ActivityRunner`] and awaits an
//! [`ActivityReport`] in response. The trait abstracts the mechanism by
//! which activities are carried out -- an LLM backend, a scripted
//! simulation, or a test stub.
//!
//! The [`StubActivityRunner`] produces small deterministic deltas for each
//! activity kind, which lets the full step cycle (drawing, pairing,
//! executing, applying, promoting, checkpointing) be exercised end-to-end
//! without a network backend.

use collegium_types::{
    Activity, Agent, AgentDeltas, ActivityContext, ActivityReport, CounterDeltas, KnowledgeDelta,
    MentorshipUpdate, Outcome, ReputationEvent,
};

/// Errors an activity execution can surface.
///
/// Failures are contained per agent: the scheduler records the failure,
/// emits an event, applies no deltas, and the step continues.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    /// The backend did not respond within the deadline.
    #[error("{activity} timed out after {deadline_ms}ms")]
    Timeout {
        /// The activity that timed out.
        activity: Activity,
        /// The deadline in milliseconds.
        deadline_ms: u64,
    },

    /// The backend responded with something unusable.
    #[error("unusable {activity} response: {message}")]
    BadResponse {
        /// The activity whose response could not be used.
        activity: Activity,
        /// What was wrong with it.
        message: String,
    },

    /// Transport or provider failure.
    #[error("activity backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

/// A mechanism that carries out one activity for one agent.
///
/// The scheduler passes an owned snapshot of the acting agent plus an
/// [`ActivityContext`] carrying the step, the topic, and any paired agent
/// snapshots. Implementations never mutate shared state: all effects come
/// back as deltas inside the [`ActivityReport`], which the scheduler
/// applies after the execution phase.
pub trait ActivityRunner: Send + Sync {
    /// Execute one activity for the given agent snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ActivityError`] when the activity cannot produce a
    /// usable report. The caller treats this as a contained per-agent
    /// failure, not a step abort.
    fn execute(
        &self,
        agent: Agent,
        activity: Activity,
        context: ActivityContext,
    ) -> impl Future<Output = Result<ActivityReport, ActivityError>> + Send;
}

/// A deterministic runner producing small fixed deltas per activity kind.
#[derive(Debug, Clone, Default)]
pub struct StubActivityRunner;

impl StubActivityRunner {
    /// Create a new stub runner.
    pub const fn new() -> Self {
        Self
    }
}

impl ActivityRunner for StubActivityRunner {
    async fn execute(
        &self,
        agent: Agent,
        activity: Activity,
        context: ActivityContext,
    ) -> Result<ActivityReport, ActivityError> {
        let topic = if context.topic.is_empty() {
            agent.specialization.clone()
        } else {
            context.topic.clone()
        };

        let mut deltas = AgentDeltas::default();
        let mut partner_deltas = Vec::new();

        match activity {
            Activity::Learning => {
                deltas
                    .knowledge
                    .push(KnowledgeDelta::scores(&topic, 0.05, 0.02, 0.03));
                deltas.counters = CounterDeltas {
                    papers_read: 1,
                    ..CounterDeltas::default()
                };
            }
            Activity::Teaching => {
                deltas
                    .reputation
                    .push(ReputationEvent::TeachingSession {
                        outcome: Outcome::Success,
                    });
                deltas.counters = CounterDeltas {
                    students_taught: 1,
                    ..CounterDeltas::default()
                };
                if let Some(session) = active_session(&agent, &context) {
                    deltas.mentorship = Some(session);
                }
                for student in &context.partners {
                    let mut gained = AgentDeltas::default();
                    gained
                        .knowledge
                        .push(KnowledgeDelta::scores(&topic, 0.08, 0.02, 0.05));
                    partner_deltas.push((student.agent_id, gained));
                }
            }
            Activity::Research => {
                deltas
                    .knowledge
                    .push(KnowledgeDelta::scores(&topic, 0.06, 0.01, 0.04));
                deltas
                    .reputation
                    .push(ReputationEvent::Publication { impact: 1.0 });
                deltas.counters = CounterDeltas {
                    papers_written: 1,
                    experiments_run: 1,
                    ..CounterDeltas::default()
                };
            }
            Activity::Review => {
                deltas
                    .reputation
                    .push(ReputationEvent::ReviewGiven { quality: 4.0 });
                deltas.counters = CounterDeltas {
                    reviews_given: 1,
                    ..CounterDeltas::default()
                };
            }
            Activity::Collaboration => {
                deltas
                    .knowledge
                    .push(KnowledgeDelta::scores(&topic, 0.03, 0.05, 0.02));
                deltas
                    .reputation
                    .push(ReputationEvent::Collaboration {
                        outcome: Outcome::Success,
                    });
                for partner in &context.partners {
                    let mut shared = AgentDeltas::default();
                    shared
                        .knowledge
                        .push(KnowledgeDelta::scores(&topic, 0.03, 0.05, 0.02));
                    shared.reputation.push(ReputationEvent::Collaboration {
                        outcome: Outcome::Success,
                    });
                    partner_deltas.push((partner.agent_id, shared));
                }
            }
        }

        Ok(ActivityReport {
            activity,
            outcome: Outcome::Success,
            summary: format!("{activity} on {topic}"),
            deltas,
            partner_deltas,
        })
    }
}

/// Session bookkeeping for the first active mentorship the agent holds
/// with the first partnered student, if any.
fn active_session(mentor: &Agent, context: &ActivityContext) -> Option<MentorshipUpdate> {
    let student = context.partners.first()?;
    mentor
        .students
        .iter()
        .find(|m| m.is_active && m.student_id == student.agent_id)
        .map(|m| MentorshipUpdate {
            relation_id: m.relation_id,
            progress_delta: 0.1,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use collegium_types::Stage;

    use super::*;

    #[tokio::test]
    async fn learning_reports_a_paper_read() {
        let agent = Agent::new("Hopper", Stage::Apprentice, "compilers");
        let report = StubActivityRunner::new()
            .execute(agent, Activity::Learning, ActivityContext::default())
            .await
            .unwrap();

        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(report.deltas.counters.papers_read, 1);
        assert_eq!(report.deltas.knowledge.len(), 1);
        assert!(report.partner_deltas.is_empty());
    }

    #[tokio::test]
    async fn teaching_returns_deltas_for_the_student() {
        let mentor = Agent::new("Knuth", Stage::Teacher, "algorithms");
        let student = Agent::new("Hopper", Stage::Apprentice, "algorithms");
        let student_id = student.agent_id;
        let context = ActivityContext {
            topic: "algorithms".into(),
            partners: vec![student],
            ..ActivityContext::default()
        };

        let report = StubActivityRunner::new()
            .execute(mentor, Activity::Teaching, context)
            .await
            .unwrap();

        assert_eq!(report.partner_deltas.len(), 1);
        let (id, gained) = report.partner_deltas.first().unwrap();
        assert_eq!(*id, student_id);
        assert!(!gained.is_empty());
    }

    #[tokio::test]
    async fn empty_topic_falls_back_to_specialization() {
        let agent = Agent::new("Curie", Stage::Researcher, "radiochemistry");
        let report = StubActivityRunner::new()
            .execute(agent, Activity::Research, ActivityContext::default())
            .await
            .unwrap();

        assert!(report.summary.contains("radiochemistry"));
    }
}
