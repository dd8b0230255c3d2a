//! Store contracts consumed by the scheduler, with in-memory fakes.
//!
//! The scheduler never reaches into a global connection pool: it receives a
//! [`StateStore`] and a [`GraphStore`] at construction and calls this narrow
//! contract. The sqlx-backed implementations live in `collegium-db`; the
//! in-memory implementations here back tests and offline runs.

use std::collections::BTreeMap;

use tokio::sync::Mutex;

use collegium_types::{
    Agent, AgentId, ExperimentId, ExperimentRecord, KnowledgeBook, PaperId, PaperMetadata, Stage,
};

/// Filter for [`StateStore::list_agents`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentFilter {
    /// Only agents at this stage.
    pub stage: Option<Stage>,
    /// Only agents with this specialization (case-insensitive).
    pub specialization: Option<String>,
    /// Only active agents.
    pub active_only: bool,
}

impl AgentFilter {
    /// Whether an agent passes this filter.
    pub fn matches(&self, agent: &Agent) -> bool {
        if self.active_only && !agent.is_active {
            return false;
        }
        if let Some(stage) = self.stage
            && agent.stage != stage
        {
            return false;
        }
        if let Some(spec) = &self.specialization
            && !agent.specialization.eq_ignore_ascii_case(spec)
        {
            return false;
        }
        true
    }
}

/// Persistent agent state storage.
///
/// Implementations must be safe for concurrent per-agent writes; last
/// write wins per agent, and no cross-agent transaction is required.
pub trait StateStore {
    /// The implementation's error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist one agent's full state.
    fn save_agent(
        &self,
        agent: &Agent,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Load one agent by id, `None` when unknown.
    fn load_agent(
        &self,
        agent_id: AgentId,
    ) -> impl Future<Output = Result<Option<Agent>, Self::Error>> + Send;

    /// List agents passing the filter.
    fn list_agents(
        &self,
        filter: &AgentFilter,
    ) -> impl Future<Output = Result<Vec<Agent>, Self::Error>> + Send;

    /// Persist a published paper and its author list.
    fn save_paper(
        &self,
        paper: &PaperMetadata,
        authors: &[AgentId],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Persist one experiment run.
    fn save_experiment(
        &self,
        experiment: &ExperimentRecord,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Knowledge-graph projections backing matchmaker candidate queries.
pub trait GraphStore {
    /// The implementation's error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Refresh the graph projection of one agent's knowledge book.
    fn store_agent_knowledge(
        &self,
        agent_id: AgentId,
        knowledge: &KnowledgeBook,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Ids of agents whose graph projection marks them as potential
    /// mentors for the topic.
    fn find_potential_mentors(
        &self,
        student_id: AgentId,
        topic: &str,
    ) -> impl Future<Output = Result<Vec<AgentId>, Self::Error>> + Send;

    /// Topics related to the given one, up to `max_depth` hops away.
    fn find_related_concepts(
        &self,
        topic: &str,
        max_depth: u32,
    ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send;
}

/// Error type for the in-memory stores.
///
/// The in-memory stores cannot fail on their own; tests flip
/// [`MemoryStateStore::fail_writes`] to exercise the scheduler's
/// checkpoint-retry path.
#[derive(Debug, thiserror::Error)]
#[error("in-memory store failure injected")]
pub struct MemoryStoreError;

/// In-memory [`StateStore`] for tests and offline runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    agents: Mutex<BTreeMap<AgentId, Agent>>,
    papers: Mutex<BTreeMap<PaperId, (PaperMetadata, Vec<AgentId>)>>,
    experiments: Mutex<BTreeMap<ExperimentId, ExperimentRecord>>,
    /// When true, every write fails with [`MemoryStoreError`].
    pub fail_writes: std::sync::atomic::AtomicBool,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored agents.
    pub async fn len(&self) -> usize {
        self.agents.lock().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.agents.lock().await.is_empty()
    }
}

impl StateStore for MemoryStateStore {
    type Error = MemoryStoreError;

    async fn save_agent(&self, agent: &Agent) -> Result<(), Self::Error> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MemoryStoreError);
        }
        self.agents
            .lock()
            .await
            .insert(agent.agent_id, agent.clone());
        Ok(())
    }

    async fn load_agent(&self, agent_id: AgentId) -> Result<Option<Agent>, Self::Error> {
        Ok(self.agents.lock().await.get(&agent_id).cloned())
    }

    async fn list_agents(&self, filter: &AgentFilter) -> Result<Vec<Agent>, Self::Error> {
        Ok(self
            .agents
            .lock()
            .await
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn save_paper(
        &self,
        paper: &PaperMetadata,
        authors: &[AgentId],
    ) -> Result<(), Self::Error> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MemoryStoreError);
        }
        self.papers
            .lock()
            .await
            .insert(paper.paper_id, (paper.clone(), authors.to_vec()));
        Ok(())
    }

    async fn save_experiment(&self, experiment: &ExperimentRecord) -> Result<(), Self::Error> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MemoryStoreError);
        }
        self.experiments
            .lock()
            .await
            .insert(experiment.experiment_id, experiment.clone());
        Ok(())
    }
}

/// In-memory [`GraphStore`] keeping per-agent topic projections.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    projections: Mutex<BTreeMap<AgentId, Vec<String>>>,
}

impl MemoryGraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for MemoryGraphStore {
    type Error = MemoryStoreError;

    async fn store_agent_knowledge(
        &self,
        agent_id: AgentId,
        knowledge: &KnowledgeBook,
    ) -> Result<(), Self::Error> {
        let topics: Vec<String> = knowledge.topics.keys().cloned().collect();
        self.projections.lock().await.insert(agent_id, topics);
        Ok(())
    }

    async fn find_potential_mentors(
        &self,
        student_id: AgentId,
        topic: &str,
    ) -> Result<Vec<AgentId>, Self::Error> {
        Ok(self
            .projections
            .lock()
            .await
            .iter()
            .filter(|(id, topics)| **id != student_id && topics.iter().any(|t| t == topic))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn find_related_concepts(
        &self,
        topic: &str,
        _max_depth: u32,
    ) -> Result<Vec<String>, Self::Error> {
        // The in-memory projection keeps no relation edges; related topics
        // are the ones co-occurring with `topic` in any agent's projection.
        let projections = self.projections.lock().await;
        let mut related: Vec<String> = projections
            .values()
            .filter(|topics| topics.iter().any(|t| t == topic))
            .flat_map(|topics| topics.iter().filter(|t| *t != topic).cloned())
            .collect();
        related.sort();
        related.dedup();
        Ok(related)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use collegium_agents::knowledge::upsert_topic;

    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = MemoryStateStore::new();
        let agent = Agent::new("Hopper", Stage::Practitioner, "compilers");
        store.save_agent(&agent).await.unwrap();

        let loaded = store.load_agent(agent.agent_id).await.unwrap().unwrap();
        assert_eq!(loaded, agent);
    }

    #[tokio::test]
    async fn list_respects_filters() {
        let store = MemoryStateStore::new();
        let mut inactive = Agent::new("Old", Stage::Expert, "logic");
        inactive.is_active = false;
        store.save_agent(&inactive).await.unwrap();
        store
            .save_agent(&Agent::new("Young", Stage::Apprentice, "logic"))
            .await
            .unwrap();

        let filter = AgentFilter {
            active_only: true,
            ..AgentFilter::default()
        };
        let active = store.list_agents(&filter).await.unwrap();
        assert_eq!(active.len(), 1);

        let filter = AgentFilter {
            stage: Some(Stage::Expert),
            ..AgentFilter::default()
        };
        let experts = store.list_agents(&filter).await.unwrap();
        assert_eq!(experts.len(), 1);
    }

    #[tokio::test]
    async fn injected_write_failure_surfaces() {
        let store = MemoryStateStore::new();
        store
            .fail_writes
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let agent = Agent::new("Hopper", Stage::Practitioner, "compilers");
        assert!(store.save_agent(&agent).await.is_err());
    }

    #[tokio::test]
    async fn papers_and_experiments_are_stored() {
        let store = MemoryStateStore::new();
        let author = AgentId::new();
        let paper = PaperMetadata {
            paper_id: PaperId::new(),
            title: String::from("On the Ordering of Streams"),
            abstract_text: String::from("We study stream orderings."),
            citation_count: 0,
            topics: vec![String::from("streams")],
        };
        store.save_paper(&paper, &[author]).await.unwrap();

        let experiment = ExperimentRecord {
            experiment_id: ExperimentId::new(),
            agent_id: author,
            topic: String::from("streams"),
            hypothesis: String::from("buffering preserves order"),
            succeeded: true,
            observations: String::from("order held across 1000 runs"),
            recorded_at: chrono::Utc::now(),
        };
        store.save_experiment(&experiment).await.unwrap();

        assert_eq!(store.papers.lock().await.len(), 1);
        assert_eq!(store.experiments.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn graph_projection_finds_topic_holders() {
        let store = MemoryGraphStore::new();
        let student = AgentId::new();
        let mentor = AgentId::new();

        let mut book = KnowledgeBook::new();
        upsert_topic(&mut book, "optics", 0.5, 0.3, 0.4, None);
        store.store_agent_knowledge(mentor, &book).await.unwrap();
        store
            .store_agent_knowledge(student, &KnowledgeBook::new())
            .await
            .unwrap();

        let found = store.find_potential_mentors(student, "optics").await.unwrap();
        assert_eq!(found, vec![mentor]);
    }
}
