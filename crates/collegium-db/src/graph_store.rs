//! Knowledge-graph projection backing matchmaker candidate queries.
//!
//! Each agent's knowledge book is projected into two relational tables:
//! `agent_topics` (who knows what, and how deeply) and
//! `topic_relations` (typed edges between topics, merged across
//! agents). The projection is refreshed wholesale at checkpoint time,
//! so reads only ever see a complete book.

use sqlx::PgPool;
use uuid::Uuid;

use collegium_core::stores::GraphStore;
use collegium_types::{AgentId, KnowledgeBook, RelationKind};

use crate::error::DbError;

/// Minimum depth score for a topic to count as mentorable.
const MENTOR_DEPTH_THRESHOLD: f64 = 0.4;

/// Stable name used in the `topic_relations.kind` column.
const fn relation_kind_str(kind: RelationKind) -> &'static str {
    match kind {
        RelationKind::Prerequisite => "prerequisite",
        RelationKind::Related => "related",
        RelationKind::Subtopic => "subtopic",
    }
}

/// [`GraphStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgGraphStore {
    pool: PgPool,
}

impl PgGraphStore {
    /// Create a graph store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl GraphStore for PgGraphStore {
    type Error = DbError;

    async fn store_agent_knowledge(
        &self,
        agent_id: AgentId,
        knowledge: &KnowledgeBook,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(r"DELETE FROM agent_topics WHERE agent_id = $1")
            .bind(agent_id.into_inner())
            .execute(&mut *tx)
            .await?;

        for topic in knowledge.topics.values() {
            sqlx::query(
                r"INSERT INTO agent_topics (agent_id, topic, depth_score, confidence)
                  VALUES ($1, $2, $3, $4)",
            )
            .bind(agent_id.into_inner())
            .bind(&topic.name)
            .bind(topic.depth_score)
            .bind(topic.confidence)
            .execute(&mut *tx)
            .await?;
        }

        for relation in &knowledge.relations {
            sqlx::query(
                r"INSERT INTO topic_relations (from_topic, to_topic, kind, strength)
                  VALUES ($1, $2, $3, $4)
                  ON CONFLICT (from_topic, to_topic, kind) DO UPDATE SET
                    strength = GREATEST(topic_relations.strength, EXCLUDED.strength)",
            )
            .bind(&relation.from_topic)
            .bind(&relation.to_topic)
            .bind(relation_kind_str(relation.kind))
            .bind(relation.strength)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            %agent_id,
            topics = knowledge.topics.len(),
            relations = knowledge.relations.len(),
            "Refreshed knowledge projection"
        );
        Ok(())
    }

    async fn find_potential_mentors(
        &self,
        student_id: AgentId,
        topic: &str,
    ) -> Result<Vec<AgentId>, DbError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r"SELECT agent_id FROM agent_topics
              WHERE topic = $1
                AND agent_id <> $2
                AND depth_score >= $3
              ORDER BY depth_score DESC, agent_id",
        )
        .bind(topic)
        .bind(student_id.into_inner())
        .bind(MENTOR_DEPTH_THRESHOLD)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| AgentId::from(id)).collect())
    }

    async fn find_related_concepts(
        &self,
        topic: &str,
        max_depth: u32,
    ) -> Result<Vec<String>, DbError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r"WITH RECURSIVE reachable(topic, depth) AS (
                  SELECT $1::text, 0
                UNION
                  SELECT CASE WHEN r.from_topic = reachable.topic
                              THEN r.to_topic ELSE r.from_topic END,
                         reachable.depth + 1
                  FROM topic_relations r
                  JOIN reachable
                    ON r.from_topic = reachable.topic
                    OR r.to_topic = reachable.topic
                  WHERE reachable.depth < $2
              )
              SELECT DISTINCT topic FROM reachable
              WHERE topic <> $1
              ORDER BY topic",
        )
        .bind(topic)
        .bind(i64::from(max_depth))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(t,)| t).collect())
    }
}
