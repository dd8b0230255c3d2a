//! Agent, paper, and experiment persistence.
//!
//! Agents are stored as one row each: the filterable fields (stage,
//! specialization, activity flag) live in scalar columns so the common
//! listing queries stay indexable, while the full agent state travels
//! as a JSONB blob. Loading deserializes the blob, so the row never
//! drifts from the in-memory shape.

use sqlx::PgPool;
use uuid::Uuid;

use collegium_core::stores::{AgentFilter, StateStore};
use collegium_types::{Agent, AgentId, ExperimentRecord, PaperMetadata};

use crate::error::DbError;

/// [`StateStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    /// Create a state store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl StateStore for PgStateStore {
    type Error = DbError;

    async fn save_agent(&self, agent: &Agent) -> Result<(), DbError> {
        let state = serde_json::to_value(agent)?;

        sqlx::query(
            r"INSERT INTO agents (agent_id, name, stage, specialization, is_active, state, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, NOW())
              ON CONFLICT (agent_id) DO UPDATE SET
                name = EXCLUDED.name,
                stage = EXCLUDED.stage,
                specialization = EXCLUDED.specialization,
                is_active = EXCLUDED.is_active,
                state = EXCLUDED.state,
                updated_at = NOW()",
        )
        .bind(agent.agent_id.into_inner())
        .bind(&agent.name)
        .bind(agent.stage.as_str())
        .bind(&agent.specialization)
        .bind(agent.is_active)
        .bind(&state)
        .execute(&self.pool)
        .await?;

        tracing::debug!(agent_id = %agent.agent_id, "Saved agent");
        Ok(())
    }

    async fn load_agent(&self, agent_id: AgentId) -> Result<Option<Agent>, DbError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as(r"SELECT state FROM agents WHERE agent_id = $1")
                .bind(agent_id.into_inner())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(state,)| serde_json::from_value(state))
            .transpose()
            .map_err(DbError::from)
    }

    async fn list_agents(&self, filter: &AgentFilter) -> Result<Vec<Agent>, DbError> {
        let stage = filter.stage.map(collegium_types::Stage::as_str);

        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT state FROM agents
              WHERE ($1::text IS NULL OR stage = $1)
                AND ($2::text IS NULL OR LOWER(specialization) = LOWER($2))
                AND (NOT $3 OR is_active)
              ORDER BY agent_id",
        )
        .bind(stage)
        .bind(filter.specialization.as_deref())
        .bind(filter.active_only)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(state,)| serde_json::from_value(state).map_err(DbError::from))
            .collect()
    }

    async fn save_paper(
        &self,
        paper: &PaperMetadata,
        authors: &[AgentId],
    ) -> Result<(), DbError> {
        let topics = serde_json::to_value(&paper.topics)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"INSERT INTO papers (paper_id, title, abstract_text, citation_count, topics)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (paper_id) DO UPDATE SET
                citation_count = EXCLUDED.citation_count,
                topics = EXCLUDED.topics",
        )
        .bind(paper.paper_id.into_inner())
        .bind(&paper.title)
        .bind(&paper.abstract_text)
        .bind(i64::from(paper.citation_count))
        .bind(&topics)
        .execute(&mut *tx)
        .await?;

        for author in authors {
            sqlx::query(
                r"INSERT INTO paper_authors (paper_id, agent_id)
                  VALUES ($1, $2)
                  ON CONFLICT DO NOTHING",
            )
            .bind(paper.paper_id.into_inner())
            .bind(author.into_inner())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(paper_id = %paper.paper_id, title = %paper.title, "Saved paper");
        Ok(())
    }

    async fn save_experiment(&self, experiment: &ExperimentRecord) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO experiments
              (experiment_id, agent_id, topic, hypothesis, succeeded, observations, recorded_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              ON CONFLICT (experiment_id) DO NOTHING",
        )
        .bind(experiment.experiment_id.into_inner())
        .bind(experiment.agent_id.into_inner())
        .bind(&experiment.topic)
        .bind(&experiment.hypothesis)
        .bind(experiment.succeeded)
        .bind(&experiment.observations)
        .bind(experiment.recorded_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(experiment_id = %experiment.experiment_id, "Saved experiment");
        Ok(())
    }
}

/// A row from the `papers` table, used by analytics queries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaperRow {
    /// Paper UUID.
    pub paper_id: Uuid,
    /// Paper title.
    pub title: String,
    /// Abstract text.
    pub abstract_text: String,
    /// Citation count at publication time.
    pub citation_count: i64,
    /// Topic tags as a JSON array.
    pub topics: serde_json::Value,
    /// When the row was inserted.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PgStateStore {
    /// List the most recently published papers, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn recent_papers(&self, limit: i64) -> Result<Vec<PaperRow>, DbError> {
        let rows = sqlx::query_as::<_, PaperRow>(
            r"SELECT paper_id, title, abstract_text, citation_count, topics, created_at
              FROM papers
              ORDER BY created_at DESC
              LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
