//! Agent behavior: experience recording, capability predicates,
//! relationship management, and delta application.
//!
//! The scheduler never mutates an [`Agent`] directly during a step; activity
//! collaborators return an [`AgentDeltas`] bundle and [`apply_deltas`] is
//! the single place those become state. That keeps per-agent application
//! all-or-nothing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use collegium_types::{
    Agent, AgentDeltas, ExperienceEntry, Mentorship, Outcome, Stage,
};

use crate::config::AgentConfig;
use crate::{knowledge, reputation};

/// What an agent is allowed to do at its current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// May run teaching sessions.
    pub can_teach: bool,
    /// May conduct original research.
    pub can_research: bool,
    /// May peer-review papers.
    pub can_review: bool,
    /// Needs an active mentor to learn effectively.
    pub requires_mentor: bool,
    /// Upper bound on concurrent activities.
    pub max_concurrent_activities: u32,
}

impl Capabilities {
    /// Capability set for a stage.
    pub const fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Apprentice => Self {
                can_teach: false,
                can_research: false,
                can_review: false,
                requires_mentor: true,
                max_concurrent_activities: 2,
            },
            Stage::Practitioner => Self {
                can_teach: false,
                can_research: false,
                can_review: false,
                requires_mentor: true,
                max_concurrent_activities: 4,
            },
            Stage::Teacher => Self {
                can_teach: true,
                can_research: true,
                can_review: false,
                requires_mentor: false,
                max_concurrent_activities: 6,
            },
            Stage::Researcher => Self {
                can_teach: true,
                can_research: true,
                can_review: true,
                requires_mentor: false,
                max_concurrent_activities: 8,
            },
            Stage::Expert => Self {
                can_teach: true,
                can_research: true,
                can_review: true,
                requires_mentor: false,
                max_concurrent_activities: 10,
            },
        }
    }
}

/// Errors from relationship management.
#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    /// An agent cannot mentor itself.
    #[error("agent {0} cannot mentor itself")]
    SelfMentorship(collegium_types::AgentId),

    /// An active mentorship already covers this (mentor, student, topic).
    #[error("active mentorship already exists for topic '{topic}'")]
    DuplicateActive {
        /// The topic already covered.
        topic: String,
    },
}

/// Append an experience entry and award outcome-scaled experience points.
///
/// The log is append-only; entries are never mutated after creation.
pub fn record_experience(agent: &mut Agent, config: &AgentConfig, entry: ExperienceEntry) {
    let points = config.experience_points.for_outcome(entry.outcome);
    agent.total_experience_points = agent.total_experience_points.saturating_add(points);
    agent.last_active = entry.timestamp;
    agent.experience_log.push(entry);
}

/// Convenience constructor for an experience entry at the current time.
pub fn experience_entry(
    kind: &str,
    description: impl Into<String>,
    outcome: Outcome,
    confidence_change: Option<f64>,
    knowledge_gained: Vec<String>,
) -> ExperienceEntry {
    ExperienceEntry {
        timestamp: Utc::now(),
        kind: kind.to_owned(),
        description: description.into(),
        outcome,
        confidence_change,
        knowledge_gained,
    }
}

/// Whether the agent may be assigned a teaching activity.
///
/// Stage grants the capability; reputation gates it. A Teacher whose
/// teaching score has collapsed below the configured floor is not offered
/// students until it recovers.
pub fn is_eligible_to_teach(agent: &Agent, config: &AgentConfig) -> bool {
    Capabilities::for_stage(agent.stage).can_teach
        && agent.reputation.teaching >= config.min_teaching_reputation
}

/// Whether the agent may be assigned a research activity.
pub fn is_eligible_to_research(agent: &Agent, config: &AgentConfig) -> bool {
    Capabilities::for_stage(agent.stage).can_research
        && agent.reputation.research >= config.min_research_reputation
}

/// Whether the agent may be assigned a review activity.
pub const fn can_review(agent: &Agent) -> bool {
    Capabilities::for_stage(agent.stage).can_review
}

/// Whether the agent has room for another student.
pub fn can_accept_student(agent: &Agent, config: &AgentConfig, max_students: usize) -> bool {
    is_eligible_to_teach(agent, config) && agent.mentee_load() < max_students
}

/// Register a mentorship on both sides.
///
/// Enforces the relationship invariants: no self-mentorship, and at most
/// one active mentorship per (mentor, student, topic) triple. On success
/// the same relation (same id) is pushed to the mentor's `students` list
/// and the student's `mentors` list.
pub fn pair_mentorship(
    mentor: &mut Agent,
    student: &mut Agent,
    topics: Vec<String>,
) -> Result<Mentorship, RelationError> {
    if mentor.agent_id == student.agent_id {
        return Err(RelationError::SelfMentorship(mentor.agent_id));
    }

    for topic in &topics {
        let duplicate = mentor
            .active_students()
            .any(|m| m.student_id == student.agent_id && m.covers(topic));
        if duplicate {
            return Err(RelationError::DuplicateActive {
                topic: topic.clone(),
            });
        }
    }

    let relation = Mentorship::begin(mentor.agent_id, student.agent_id, topics);
    mentor.students.push(relation.clone());
    student.mentors.push(relation.clone());
    debug!(
        mentor_id = %mentor.agent_id,
        student_id = %student.agent_id,
        relation_id = %relation.relation_id,
        "Mentorship paired"
    );
    Ok(relation)
}

/// Apply one activity's deltas to an agent.
///
/// This is the only mutation path activities have. Knowledge upserts,
/// validation events, reputation events, counters, the mentorship session
/// update, and the experience entry are applied together; the caller
/// invokes this only for activities that completed, so a failed activity
/// leaves the agent byte-identical to its pre-step state.
pub fn apply_deltas(agent: &mut Agent, config: &AgentConfig, deltas: &AgentDeltas) {
    for delta in &deltas.knowledge {
        knowledge::upsert_topic(
            &mut agent.knowledge,
            &delta.topic,
            delta.depth_delta,
            delta.breadth_delta,
            delta.confidence_delta,
            delta.source.clone(),
        );
        if let Some(success) = delta.validation {
            knowledge::mark_validated(
                &mut agent.knowledge,
                &delta.topic,
                success,
                config.validation_threshold,
                config.validation_confidence_boost,
                config.validation_confidence_penalty,
            );
        }
    }

    for &event in &deltas.reputation {
        reputation::apply(&mut agent.reputation, &config.reputation_deltas, event);
    }

    let counters = &deltas.counters;
    agent.papers_read = agent.papers_read.saturating_add(counters.papers_read);
    agent.papers_written = agent.papers_written.saturating_add(counters.papers_written);
    agent.students_taught = agent
        .students_taught
        .saturating_add(counters.students_taught);
    agent.experiments_run = agent
        .experiments_run
        .saturating_add(counters.experiments_run);
    agent.reviews_given = agent.reviews_given.saturating_add(counters.reviews_given);

    if let Some(update) = deltas.mentorship {
        for relation in agent
            .students
            .iter_mut()
            .chain(agent.mentors.iter_mut())
            .filter(|m| m.relation_id == update.relation_id && m.is_active)
        {
            relation.sessions_count = relation.sessions_count.saturating_add(1);
            relation.student_progress =
                (relation.student_progress + update.progress_delta).clamp(0.0, 1.0);
        }
    }

    if let Some(entry) = deltas.experience.clone() {
        record_experience(agent, config, entry);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use collegium_types::{
        CounterDeltas, KnowledgeDelta, MentorshipUpdate, ReputationEvent, experience_kinds,
    };

    use super::*;

    fn apprentice() -> Agent {
        Agent::new("Kepler", Stage::Apprentice, "astronomy")
    }

    fn teacher() -> Agent {
        Agent::new("Somerville", Stage::Teacher, "astronomy")
    }

    #[test]
    fn capability_ladder_is_monotonic() {
        assert!(!Capabilities::for_stage(Stage::Apprentice).can_teach);
        assert!(!Capabilities::for_stage(Stage::Practitioner).can_research);
        assert!(Capabilities::for_stage(Stage::Teacher).can_teach);
        assert!(!Capabilities::for_stage(Stage::Teacher).can_review);
        assert!(Capabilities::for_stage(Stage::Researcher).can_review);
        assert!(Capabilities::for_stage(Stage::Expert).can_review);
    }

    #[test]
    fn experience_awards_outcome_scaled_points() {
        let config = AgentConfig::default();
        let mut agent = apprentice();
        record_experience(
            &mut agent,
            &config,
            experience_entry(experience_kinds::LEARNING, "read a paper", Outcome::Success, None, Vec::new()),
        );
        record_experience(
            &mut agent,
            &config,
            experience_entry(experience_kinds::LEARNING, "struggled", Outcome::Failure, None, Vec::new()),
        );
        assert_eq!(agent.total_experience_points, 12);
        assert_eq!(agent.experience_log.len(), 2);
    }

    #[test]
    fn low_teaching_reputation_blocks_teaching() {
        let config = AgentConfig::default();
        let mut agent = teacher();
        assert!(is_eligible_to_teach(&agent, &config));
        agent.reputation.teaching = 10.0;
        assert!(!is_eligible_to_teach(&agent, &config));
    }

    #[test]
    fn apprentice_cannot_teach_regardless_of_reputation() {
        let config = AgentConfig::default();
        let mut agent = apprentice();
        agent.reputation.teaching = 100.0;
        assert!(!is_eligible_to_teach(&agent, &config));
    }

    #[test]
    fn self_mentorship_is_rejected() {
        let mut mentor = teacher();
        let mut clone = mentor.clone();
        let err = pair_mentorship(&mut mentor, &mut clone, vec![String::from("optics")]);
        assert!(matches!(err, Err(RelationError::SelfMentorship(_))));
    }

    #[test]
    fn duplicate_active_mentorship_is_rejected() {
        let mut mentor = teacher();
        let mut student = apprentice();
        pair_mentorship(&mut mentor, &mut student, vec![String::from("optics")]).unwrap();
        let err = pair_mentorship(&mut mentor, &mut student, vec![String::from("optics")]);
        assert!(matches!(err, Err(RelationError::DuplicateActive { .. })));
    }

    #[test]
    fn closed_mentorship_can_be_reopened() {
        let mut mentor = teacher();
        let mut student = apprentice();
        pair_mentorship(&mut mentor, &mut student, vec![String::from("optics")]).unwrap();
        for relation in &mut mentor.students {
            relation.end(4.0);
        }
        pair_mentorship(&mut mentor, &mut student, vec![String::from("optics")]).unwrap();
        assert_eq!(mentor.students.len(), 2);
    }

    #[test]
    fn apply_deltas_touches_every_subsystem() {
        let config = AgentConfig::default();
        let mut agent = apprentice();
        let deltas = AgentDeltas {
            knowledge: vec![KnowledgeDelta::scores("optics", 0.2, 0.1, 0.3)],
            reputation: vec![ReputationEvent::TeachingSession {
                outcome: Outcome::Success,
            }],
            counters: CounterDeltas {
                papers_read: 1,
                ..CounterDeltas::default()
            },
            experience: Some(experience_entry(
                experience_kinds::LEARNING,
                "read about optics",
                Outcome::Success,
                Some(0.3),
                vec![String::from("optics")],
            )),
            mentorship: None,
        };

        apply_deltas(&mut agent, &config, &deltas);

        assert_eq!(agent.papers_read, 1);
        assert!(agent.reputation.teaching > 50.0);
        assert!(agent.knowledge.topics.contains_key("optics"));
        assert_eq!(agent.experience_log.len(), 1);
        assert_eq!(agent.total_experience_points, 10);
    }

    #[test]
    fn mentorship_update_bumps_sessions_and_progress() {
        let mut mentor = teacher();
        let mut student = apprentice();
        let relation =
            pair_mentorship(&mut mentor, &mut student, vec![String::from("optics")]).unwrap();

        let config = AgentConfig::default();
        let deltas = AgentDeltas {
            mentorship: Some(MentorshipUpdate {
                relation_id: relation.relation_id,
                progress_delta: 0.4,
            }),
            ..AgentDeltas::default()
        };
        apply_deltas(&mut mentor, &config, &deltas);

        let updated = mentor.students.first().unwrap();
        assert_eq!(updated.sessions_count, 1);
        assert!((updated.student_progress - 0.4).abs() < 1e-9);
    }

    #[test]
    fn validation_delta_marks_topic_validated() {
        let config = AgentConfig::default();
        let mut agent = apprentice();
        let deltas = AgentDeltas {
            knowledge: vec![KnowledgeDelta {
                topic: String::from("optics"),
                depth_delta: 0.3,
                breadth_delta: 0.1,
                confidence_delta: 0.2,
                source: None,
                validation: Some(true),
            }],
            ..AgentDeltas::default()
        };
        apply_deltas(&mut agent, &config, &deltas);
        assert!(agent.knowledge.topics.get("optics").unwrap().validated);
    }
}
