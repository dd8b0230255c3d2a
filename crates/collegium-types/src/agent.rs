//! The agent entity: identity, stage, knowledge, reputation, relationships.
//!
//! An [`Agent`] is created once at seed time (or spawned later) and mutated
//! continuously by activities and the evolution engine. Agents are never
//! deleted during a run, at most marked inactive. The behavioral rules
//! (experience recording, capability predicates, delta application) live in
//! `collegium-agents::agent`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Outcome, Stage};
use crate::ids::{AgentId, MentorshipId};
use crate::knowledge::KnowledgeBook;
use crate::reputation::Reputation;

/// Well-known experience entry kind constants.
///
/// Entries produced by activities use the activity's snake_case name;
/// the evolution engine writes `promotion` entries.
pub mod experience_kinds {
    /// A learning activity (paper read).
    pub const LEARNING: &str = "learning";
    /// A teaching session.
    pub const TEACHING: &str = "teaching";
    /// A research activity (experiment, publication).
    pub const RESEARCH: &str = "research";
    /// A peer review.
    pub const REVIEW: &str = "review";
    /// A collaboration.
    pub const COLLABORATION: &str = "collaboration";
    /// A stage promotion executed by the evolution engine.
    pub const PROMOTION: &str = "promotion";
}

/// One append-only entry in an agent's experience log.
///
/// Entries are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    /// When the experience happened.
    pub timestamp: DateTime<Utc>,
    /// Entry kind; see [`experience_kinds`].
    pub kind: String,
    /// Human-readable description of what happened.
    pub description: String,
    /// How the activity turned out.
    pub outcome: Outcome,
    /// Net confidence change across touched topics, if any.
    pub confidence_change: Option<f64>,
    /// Topic names touched by this experience.
    pub knowledge_gained: Vec<String>,
}

/// A mentor-student relationship.
///
/// Invariants: `mentor_id != student_id`, and at most one *active*
/// mentorship exists per (mentor, student, topic) triple. Both invariants
/// are enforced where relationships are created
/// (`collegium-agents::agent::pair_mentorship`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mentorship {
    /// Unique identifier for this relation.
    pub relation_id: MentorshipId,
    /// The mentoring agent.
    pub mentor_id: AgentId,
    /// The mentored agent.
    pub student_id: AgentId,
    /// Topics covered by the mentorship.
    pub topics: Vec<String>,
    /// When the mentorship started.
    pub started_at: DateTime<Utc>,
    /// When the mentorship ended, if it has.
    pub ended_at: Option<DateTime<Utc>>,
    /// Teaching sessions held so far.
    pub sessions_count: u32,
    /// Student progress through the material, in `[0.0, 1.0]`.
    pub student_progress: f64,
    /// Student's rating of the mentor on a 0-5 scale, set at close.
    pub mentor_rating: Option<f64>,
    /// Whether the mentorship is ongoing.
    pub is_active: bool,
}

impl Mentorship {
    /// Start a new active mentorship.
    pub fn begin(mentor_id: AgentId, student_id: AgentId, topics: Vec<String>) -> Self {
        Self {
            relation_id: MentorshipId::new(),
            mentor_id,
            student_id,
            topics,
            started_at: Utc::now(),
            ended_at: None,
            sessions_count: 0,
            student_progress: 0.0,
            mentor_rating: None,
            is_active: true,
        }
    }

    /// Close the mentorship with a final rating of the mentor.
    pub fn end(&mut self, rating: f64) {
        self.is_active = false;
        self.ended_at = Some(Utc::now());
        self.mentor_rating = Some(rating.clamp(0.0, 5.0));
    }

    /// Whether this relation covers the given topic while active.
    pub fn covers(&self, topic: &str) -> bool {
        self.is_active && self.topics.iter().any(|t| t == topic)
    }
}

/// Record of one executed promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionRecord {
    /// Stage before the promotion.
    pub from_stage: Stage,
    /// Stage after the promotion.
    pub to_stage: Stage,
    /// When the promotion was executed.
    pub timestamp: DateTime<Utc>,
}

/// An individual scholar in the community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique, immutable identifier.
    pub agent_id: AgentId,
    /// Display name.
    pub name: String,
    /// Current developmental stage.
    pub stage: Stage,
    /// Primary field of study (e.g. `"machine_learning"`).
    pub specialization: String,
    /// Whether the agent takes part in simulation steps.
    pub is_active: bool,
    /// What the agent knows.
    pub knowledge: KnowledgeBook,
    /// Reputation across all four dimensions.
    pub reputation: Reputation,
    /// When the agent was created.
    pub created_at: DateTime<Utc>,
    /// When the agent last performed an activity.
    pub last_active: DateTime<Utc>,
    /// Lifetime experience points.
    pub total_experience_points: u64,
    /// How many promotions the agent has received.
    pub promotion_count: u32,
    /// Papers read.
    pub papers_read: u32,
    /// Papers authored or co-authored.
    pub papers_written: u32,
    /// Students successfully taught.
    pub students_taught: u32,
    /// Experiments run.
    pub experiments_run: u32,
    /// Peer reviews given.
    pub reviews_given: u32,
    /// Append-only experience log.
    pub experience_log: Vec<ExperienceEntry>,
    /// History of executed promotions.
    pub promotions: Vec<PromotionRecord>,
    /// Mentorships where this agent is the student.
    pub mentors: Vec<Mentorship>,
    /// Mentorships where this agent is the mentor.
    pub students: Vec<Mentorship>,
}

impl Agent {
    /// Create a new active agent with empty knowledge and neutral reputation.
    pub fn new(name: impl Into<String>, stage: Stage, specialization: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            agent_id: AgentId::new(),
            name: name.into(),
            stage,
            specialization: specialization.into(),
            is_active: true,
            knowledge: KnowledgeBook::new(),
            reputation: Reputation::new(),
            created_at: now,
            last_active: now,
            total_experience_points: 0,
            promotion_count: 0,
            papers_read: 0,
            papers_written: 0,
            students_taught: 0,
            experiments_run: 0,
            reviews_given: 0,
            experience_log: Vec::new(),
            promotions: Vec::new(),
            mentors: Vec::new(),
            students: Vec::new(),
        }
    }

    /// Active mentorships where this agent is the student.
    pub fn active_mentors(&self) -> impl Iterator<Item = &Mentorship> {
        self.mentors.iter().filter(|m| m.is_active)
    }

    /// Active mentorships where this agent is the mentor.
    pub fn active_students(&self) -> impl Iterator<Item = &Mentorship> {
        self.students.iter().filter(|m| m.is_active)
    }

    /// Number of students currently being mentored.
    pub fn mentee_load(&self) -> usize {
        self.active_students().count()
    }
}
