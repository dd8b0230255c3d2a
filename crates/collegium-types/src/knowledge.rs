//! Per-topic knowledge state and the per-agent knowledge book.
//!
//! Every agent carries a [`KnowledgeBook`]: a mapping from topic name to
//! [`KnowledgeTopic`] plus typed relations between topics. The book is pure
//! data; the update rules (deltas, validation, competency) live in
//! `collegium-agents::knowledge` and always preserve the clamping
//! invariant: depth, breadth, and confidence stay within `[0.0, 1.0]`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::SourceKind;
use crate::ids::PaperId;

/// Weight of depth in the mastery scalar.
pub const MASTERY_DEPTH_WEIGHT: f64 = 0.4;

/// Weight of breadth in the mastery scalar.
pub const MASTERY_BREADTH_WEIGHT: f64 = 0.3;

/// Weight of confidence in the mastery scalar.
pub const MASTERY_CONFIDENCE_WEIGHT: f64 = 0.3;

/// Provenance record for a piece of knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    /// What kind of source produced this knowledge.
    pub kind: SourceKind,
    /// Identifier of the source (paper id, mentor agent id, experiment id).
    pub source_id: String,
    /// When the knowledge was acquired from this source.
    pub timestamp: DateTime<Utc>,
    /// How reliable the source is considered, in `[0.0, 1.0]`.
    pub reliability: f64,
}

impl KnowledgeSource {
    /// Create a source record at the current time with full reliability.
    pub fn now(kind: SourceKind, source_id: impl Into<String>) -> Self {
        Self {
            kind,
            source_id: source_id.into(),
            timestamp: Utc::now(),
            reliability: 1.0,
        }
    }
}

/// The kind of relationship between two topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// The source topic must be understood before the target.
    Prerequisite,
    /// The topics are thematically related.
    Related,
    /// The target is a subtopic of the source.
    Subtopic,
}

/// A typed edge between two topics in an agent's knowledge book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRelation {
    /// Source topic name.
    pub from_topic: String,
    /// Target topic name.
    pub to_topic: String,
    /// The kind of relationship.
    pub kind: RelationKind,
    /// Strength of the relationship, in `[0.0, 1.0]`.
    pub strength: f64,
}

/// What an agent knows about a single topic.
///
/// All three scores are clamped to `[0.0, 1.0]` after every update. A topic
/// is never deleted once created; stale topics only lose confidence through
/// the scheduler's optional idle-decay pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeTopic {
    /// Topic name, unique within one agent's book.
    pub name: String,
    /// How deep the understanding goes, in `[0.0, 1.0]`.
    pub depth_score: f64,
    /// How broad the understanding is across subtopics, in `[0.0, 1.0]`.
    pub breadth_score: f64,
    /// The agent's self-assessed confidence, in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Whether the knowledge has been validated by teaching or experiment.
    pub validated: bool,
    /// Number of successful validations.
    pub validation_count: u32,
    /// When the topic was last read or consulted.
    pub last_accessed: DateTime<Utc>,
    /// When the scores were last changed.
    pub last_updated: DateTime<Utc>,
    /// Provenance of the knowledge.
    pub sources: Vec<KnowledgeSource>,
    /// Topic names that should be understood first.
    pub prerequisites: Vec<String>,
    /// Papers that contributed to this topic.
    pub related_papers: Vec<PaperId>,
}

impl KnowledgeTopic {
    /// Create an empty, unvalidated topic.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            depth_score: 0.0,
            breadth_score: 0.0,
            confidence: 0.0,
            validated: false,
            validation_count: 0,
            last_accessed: now,
            last_updated: now,
            sources: Vec::new(),
            prerequisites: Vec::new(),
            related_papers: Vec::new(),
        }
    }

    /// Mastery scalar combining depth, breadth, and confidence.
    ///
    /// Used by the evolution engine and matchmaker as the single
    /// competency number for this topic.
    pub fn mastery(&self) -> f64 {
        self.depth_score
            .mul_add(MASTERY_DEPTH_WEIGHT, self.breadth_score * MASTERY_BREADTH_WEIGHT)
            + self.confidence * MASTERY_CONFIDENCE_WEIGHT
    }
}

/// Per-agent knowledge book: topics keyed by name plus typed relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBook {
    /// Topics keyed by name. Keys are unique per agent by construction.
    pub topics: BTreeMap<String, KnowledgeTopic>,
    /// Typed edges between topics.
    pub relations: Vec<ConceptRelation>,
    /// Total number of mutations applied to this book.
    pub total_updates: u64,
}

impl KnowledgeBook {
    /// Create an empty book.
    pub const fn new() -> Self {
        Self {
            topics: BTreeMap::new(),
            relations: Vec::new(),
            total_updates: 0,
        }
    }

    /// Number of topics the agent has touched.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Names of all topics related to `topic` through edges in either
    /// direction, optionally filtered by relation kind.
    pub fn related_topics(&self, topic: &str, kind: Option<RelationKind>) -> Vec<String> {
        let mut related = Vec::new();
        for rel in &self.relations {
            if kind.is_some_and(|k| k != rel.kind) {
                continue;
            }
            if rel.from_topic == topic {
                related.push(rel.to_topic.clone());
            } else if rel.to_topic == topic {
                related.push(rel.from_topic.clone());
            }
        }
        related.sort();
        related.dedup();
        related
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_topic_starts_at_zero() {
        let topic = KnowledgeTopic::new("graph-theory");
        assert!(topic.depth_score.abs() < f64::EPSILON);
        assert!(!topic.validated);
        assert_eq!(topic.validation_count, 0);
    }

    #[test]
    fn mastery_weights_sum_to_one() {
        let total = MASTERY_DEPTH_WEIGHT + MASTERY_BREADTH_WEIGHT + MASTERY_CONFIDENCE_WEIGHT;
        assert!((total - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mastery_of_full_scores_is_one() {
        let mut topic = KnowledgeTopic::new("optimization");
        topic.depth_score = 1.0;
        topic.breadth_score = 1.0;
        topic.confidence = 1.0;
        assert!((topic.mastery() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn related_topics_follow_edges_both_ways() {
        let mut book = KnowledgeBook::new();
        book.relations.push(ConceptRelation {
            from_topic: String::from("calculus"),
            to_topic: String::from("optimization"),
            kind: RelationKind::Prerequisite,
            strength: 1.0,
        });
        assert_eq!(book.related_topics("calculus", None), vec!["optimization"]);
        assert_eq!(book.related_topics("optimization", None), vec!["calculus"]);
        assert!(
            book.related_topics("calculus", Some(RelationKind::Related))
                .is_empty()
        );
    }
}
