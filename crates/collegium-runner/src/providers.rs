//! Literature and sandbox provider contracts.
//!
//! The runner resolves papers through a [`LiteratureProvider`] and runs
//! experiment code through a [`SandboxProvider`]. Production deployments
//! point these at an external paper index and an isolated execution
//! service; the in-memory implementations here back tests and offline
//! runs.

use collegium_types::{PaperId, PaperMetadata};

use crate::error::RunnerError;

/// Result of executing experiment code in a sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxResult {
    /// Captured standard output.
    pub stdout: String,
    /// The final expression value, when the run produced one.
    pub result: Option<String>,
    /// Error text, when the run failed.
    pub error: Option<String>,
}

impl SandboxResult {
    /// Whether the run completed without error.
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A source of papers for learning and review activities.
pub trait LiteratureProvider: Send + Sync {
    /// Search for papers matching the query, returning up to `limit`.
    ///
    /// An empty result is not an error; it means nothing matched.
    fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<PaperMetadata>, RunnerError>> + Send;
}

/// An execution environment for experiment code.
pub trait SandboxProvider: Send + Sync {
    /// Run the code and report what happened.
    fn execute(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<SandboxResult, RunnerError>> + Send;
}

/// In-memory literature index over a fixed paper list.
#[derive(Debug, Clone, Default)]
pub struct StaticLibrary {
    papers: Vec<PaperMetadata>,
}

impl StaticLibrary {
    /// Create a library over the given papers.
    pub const fn new(papers: Vec<PaperMetadata>) -> Self {
        Self { papers }
    }

    /// A small library seeded with one paper per topic name.
    pub fn seeded(topics: &[&str]) -> Self {
        let papers = topics
            .iter()
            .map(|topic| PaperMetadata {
                paper_id: PaperId::new(),
                title: format!("A Survey of {topic}"),
                abstract_text: format!("An overview of open problems in {topic}."),
                citation_count: 10,
                topics: vec![(*topic).to_owned()],
            })
            .collect();
        Self { papers }
    }
}

impl LiteratureProvider for StaticLibrary {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PaperMetadata>, RunnerError> {
        let query = query.to_lowercase();
        Ok(self
            .papers
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&query)
                    || p.topics.iter().any(|t| t.to_lowercase().contains(&query))
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Sandbox that never runs code: every execution reports a simulated
/// success. Keeps research activities flowing in offline runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSandbox;

impl SandboxProvider for SimulatedSandbox {
    async fn execute(&self, code: &str) -> Result<SandboxResult, RunnerError> {
        Ok(SandboxResult {
            stdout: String::new(),
            result: Some(format!("simulated run of {} bytes of code", code.len())),
            error: None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_library_matches_on_topic() {
        let library = StaticLibrary::seeded(&["optics", "acoustics"]);
        let hits = library.search("optics", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits.first().unwrap().title.contains("optics"));

        let misses = library.search("botany", 5).await.unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn simulated_sandbox_always_succeeds() {
        let sandbox = SimulatedSandbox;
        let result = sandbox.execute("print(2 + 2)").await.unwrap();
        assert!(result.succeeded());
        assert!(result.result.is_some());
    }
}
