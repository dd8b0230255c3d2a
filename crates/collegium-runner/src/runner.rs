//! The LLM-backed [`ActivityRunner`] implementation.
//!
//! One handler per activity kind: each renders the activity prompt,
//! calls the LLM backend, parses the response leniently, and converts
//! the parsed shape into an [`ActivityReport`] full of deltas. Research
//! additionally runs experiment code through the sandbox and persists
//! papers and experiments through the state store.
//!
//! Every fault -- template, HTTP, parse, provider, store -- surfaces as
//! an [`ActivityError`], which the scheduler contains per agent.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use collegium_agents::agent::experience_entry;
use collegium_core::runner::{ActivityError, ActivityRunner};
use collegium_core::stores::StateStore;
use collegium_types::{
    Activity, ActivityContext, ActivityReport, Agent, AgentDeltas, CounterDeltas, ExperimentId,
    ExperimentRecord, KnowledgeDelta, KnowledgeSource, MentorshipUpdate, Outcome, PaperId,
    PaperMetadata, ReputationEvent, SourceKind, experience_kinds,
};

use crate::config::RunnerConfig;
use crate::cost::CostTracker;
use crate::error::RunnerError;
use crate::llm::{LlmBackend, LlmResponse, create_backend};
use crate::parse::{
    CollaborationResponse, ComprehensionLevel, ComprehensionResponse, LessonResponse,
    ResearchResponse, ReviewResponse, parse_response,
};
use crate::prompt::PromptEngine;
use crate::providers::{LiteratureProvider, SandboxProvider, SandboxResult};

/// Executes activities through an LLM backend with literature and
/// sandbox providers.
pub struct LlmActivityRunner<S, L, X> {
    backend: LlmBackend,
    prompts: PromptEngine,
    literature: L,
    sandbox: X,
    store: S,
    costs: CostTracker,
    activity_timeout: Duration,
}

impl<S, L, X> LlmActivityRunner<S, L, X>
where
    S: StateStore + Send + Sync,
    L: LiteratureProvider + Send + Sync,
    X: SandboxProvider + Send + Sync,
{
    /// Build a runner from configuration and providers.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] when the prompt templates fail
    /// to load.
    pub fn new(
        config: &RunnerConfig,
        literature: L,
        sandbox: X,
        store: S,
    ) -> Result<Self, RunnerError> {
        Ok(Self {
            backend: create_backend(&config.backend),
            prompts: PromptEngine::new(&config.templates_dir)?,
            literature,
            sandbox,
            store,
            costs: CostTracker::new(config.input_rate, config.output_rate),
            activity_timeout: config.activity_timeout,
        })
    }

    /// Cost accounting snapshot for the run so far.
    pub fn cost_summary(&self) -> crate::cost::CostSummary {
        self.costs.summary()
    }

    /// Render, call, and account one LLM exchange.
    async fn call_llm(
        &self,
        activity: Activity,
        context: &serde_json::Value,
    ) -> Result<LlmResponse, RunnerError> {
        let prompt = self.prompts.render(activity, context)?;
        let response = self.backend.complete(&prompt).await?;
        self.costs.record_call(response.usage);
        debug!(
            %activity,
            backend = self.backend.name(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "LLM call completed"
        );
        Ok(response)
    }

    async fn run_learning(
        &self,
        agent: &Agent,
        context: &ActivityContext,
    ) -> Result<ActivityReport, RunnerError> {
        let mut paper = context.paper.clone();
        if paper.is_none() {
            paper = self
                .literature
                .search(&context.topic, 1)
                .await?
                .into_iter()
                .next();
        }

        let prompt_context = serde_json::json!({
            "agent": agent_context(agent),
            "topic": context.topic,
            "paper": paper.as_ref().map(paper_context),
        });
        let response = self.call_llm(Activity::Learning, &prompt_context).await?;
        let parsed: ComprehensionResponse = parse_response(&response.content)?;

        Ok(learning_report(&context.topic, paper.as_ref(), &parsed))
    }

    async fn run_teaching(
        &self,
        agent: &Agent,
        context: &ActivityContext,
    ) -> Result<ActivityReport, RunnerError> {
        let student = context
            .partners
            .first()
            .ok_or_else(|| RunnerError::Provider("teaching requires a paired student".to_owned()))?;

        let prompt_context = serde_json::json!({
            "agent": agent_context(agent),
            "student": agent_context(student),
            "topic": context.topic,
        });
        let response = self.call_llm(Activity::Teaching, &prompt_context).await?;
        let parsed: LessonResponse = parse_response(&response.content)?;

        Ok(teaching_report(agent, student, &context.topic, &parsed))
    }

    async fn run_research(
        &self,
        agent: &Agent,
        context: &ActivityContext,
    ) -> Result<ActivityReport, RunnerError> {
        let prompt_context = serde_json::json!({
            "agent": agent_context(agent),
            "topic": context.topic,
        });
        let response = self.call_llm(Activity::Research, &prompt_context).await?;
        let parsed: ResearchResponse = parse_response(&response.content)?;

        let sandbox_result = if let Some(code) = &parsed.code {
            self.sandbox.execute(code).await?
        } else {
            SandboxResult {
                stdout: String::new(),
                result: Some("design-only experiment".to_owned()),
                error: None,
            }
        };

        let experiment = ExperimentRecord {
            experiment_id: ExperimentId::new(),
            agent_id: agent.agent_id,
            topic: context.topic.clone(),
            hypothesis: parsed.hypothesis.clone(),
            succeeded: sandbox_result.succeeded(),
            observations: sandbox_result
                .result
                .clone()
                .or_else(|| sandbox_result.error.clone())
                .unwrap_or_else(|| sandbox_result.stdout.clone()),
            recorded_at: Utc::now(),
        };
        if let Err(err) = self.store.save_experiment(&experiment).await {
            warn!(agent_id = %agent.agent_id, %err, "Experiment save failed");
        }

        let paper = build_paper(&context.topic, &parsed);
        if let Some(paper) = &paper
            && let Err(err) = self.store.save_paper(paper, &[agent.agent_id]).await
        {
            warn!(agent_id = %agent.agent_id, %err, "Paper save failed");
        }

        Ok(research_report(
            &context.topic,
            &parsed,
            &sandbox_result,
            paper.is_some(),
        ))
    }

    async fn run_review(
        &self,
        agent: &Agent,
        context: &ActivityContext,
    ) -> Result<ActivityReport, RunnerError> {
        let mut found = context.paper.clone();
        if found.is_none() {
            found = self
                .literature
                .search(&context.topic, 1)
                .await?
                .into_iter()
                .next();
        }
        let paper =
            found.ok_or_else(|| RunnerError::Provider("no paper available to review".to_owned()))?;

        let prompt_context = serde_json::json!({
            "agent": agent_context(agent),
            "topic": context.topic,
            "paper": paper_context(&paper),
        });
        let response = self.call_llm(Activity::Review, &prompt_context).await?;
        let parsed: ReviewResponse = parse_response(&response.content)?;

        Ok(review_report(&paper, &parsed))
    }

    async fn run_collaboration(
        &self,
        agent: &Agent,
        context: &ActivityContext,
    ) -> Result<ActivityReport, RunnerError> {
        let prompt_context = serde_json::json!({
            "agent": agent_context(agent),
            "topic": context.topic,
            "partners": context.partners.iter().map(agent_context).collect::<Vec<_>>(),
        });
        let response = self
            .call_llm(Activity::Collaboration, &prompt_context)
            .await?;
        let parsed: CollaborationResponse = parse_response(&response.content)?;

        Ok(collaboration_report(&context.topic, &context.partners, &parsed))
    }
}

impl<S, L, X> ActivityRunner for LlmActivityRunner<S, L, X>
where
    S: StateStore + Send + Sync,
    L: LiteratureProvider + Send + Sync,
    X: SandboxProvider + Send + Sync,
{
    async fn execute(
        &self,
        agent: Agent,
        activity: Activity,
        context: ActivityContext,
    ) -> Result<ActivityReport, ActivityError> {
        let work = async {
            match activity {
                Activity::Learning => self.run_learning(&agent, &context).await,
                Activity::Teaching => self.run_teaching(&agent, &context).await,
                Activity::Research => self.run_research(&agent, &context).await,
                Activity::Review => self.run_review(&agent, &context).await,
                Activity::Collaboration => self.run_collaboration(&agent, &context).await,
            }
        };

        match tokio::time::timeout(self.activity_timeout, work).await {
            Ok(result) => result.map_err(|err| err.into_activity_error(activity)),
            Err(_) => Err(ActivityError::Timeout {
                activity,
                deadline_ms: u64::try_from(self.activity_timeout.as_millis())
                    .unwrap_or(u64::MAX),
            }),
        }
    }
}

/// Identity fields exposed to prompt templates.
fn agent_context(agent: &Agent) -> serde_json::Value {
    serde_json::json!({
        "name": agent.name,
        "stage": agent.stage.as_str(),
        "specialization": agent.specialization,
    })
}

/// Paper fields exposed to prompt templates.
fn paper_context(paper: &PaperMetadata) -> serde_json::Value {
    serde_json::json!({
        "title": paper.title,
        "abstract": paper.abstract_text,
        "topics": paper.topics,
    })
}

/// Map a comprehension band to an activity outcome.
const fn outcome_from_level(level: ComprehensionLevel) -> Outcome {
    match level {
        ComprehensionLevel::Confused => Outcome::Failure,
        ComprehensionLevel::Partial => Outcome::Partial,
        ComprehensionLevel::Good | ComprehensionLevel::Excellent => Outcome::Success,
    }
}

/// Build the learning report from a parsed comprehension response.
///
/// Depth grows modestly with comprehension; confidence grows with the
/// normalized score, clamped on application.
fn learning_report(
    topic: &str,
    paper: Option<&PaperMetadata>,
    parsed: &ComprehensionResponse,
) -> ActivityReport {
    let confidence = parsed.confidence.clamp(0.0, 100.0);
    let normalized = confidence / 100.0;
    let level = ComprehensionLevel::from_confidence(confidence);
    let outcome = outcome_from_level(level);

    let source = paper.map(|p| KnowledgeSource::now(SourceKind::Paper, p.paper_id.to_string()));
    let (summary, description) = match paper {
        Some(p) => (
            format!("read \"{}\" with {confidence:.0}% confidence", p.title),
            format!("Read \"{}\"", p.title),
        ),
        None => (
            format!("self-study on {topic} with {confidence:.0}% confidence"),
            format!("Self-study on {topic}"),
        ),
    };

    let mut deltas = AgentDeltas {
        counters: CounterDeltas {
            papers_read: 1,
            ..CounterDeltas::default()
        },
        experience: Some(experience_entry(
            experience_kinds::LEARNING,
            description,
            outcome,
            Some(normalized),
            parsed.key_concepts.clone(),
        )),
        ..AgentDeltas::default()
    };
    deltas.knowledge.push(KnowledgeDelta {
        topic: topic.to_owned(),
        depth_delta: 0.1 * normalized,
        breadth_delta: 0.0,
        confidence_delta: normalized,
        source,
        validation: None,
    });

    ActivityReport {
        activity: Activity::Learning,
        outcome,
        summary,
        deltas,
        partner_deltas: Vec::new(),
    }
}

/// Map a 0-5 lesson quality to an activity outcome.
const fn outcome_from_quality(quality: f64) -> Outcome {
    if quality >= 4.0 {
        Outcome::Success
    } else if quality >= 2.0 {
        Outcome::Partial
    } else {
        Outcome::Failure
    }
}

/// Build the teaching report: reputation and session bookkeeping for the
/// mentor, knowledge with a validation event for the student.
fn teaching_report(
    mentor: &Agent,
    student: &Agent,
    topic: &str,
    parsed: &LessonResponse,
) -> ActivityReport {
    let quality = parsed.quality.clamp(0.0, 5.0);
    let progress = parsed.student_progress.clamp(0.0, 1.0);
    let outcome = outcome_from_quality(quality);

    let mut deltas = AgentDeltas {
        counters: CounterDeltas {
            students_taught: 1,
            ..CounterDeltas::default()
        },
        experience: Some(experience_entry(
            experience_kinds::TEACHING,
            format!("Taught {} on {topic}", student.name),
            outcome,
            None,
            Vec::new(),
        )),
        ..AgentDeltas::default()
    };
    deltas
        .reputation
        .push(ReputationEvent::TeachingSession { outcome });
    deltas.mentorship = mentor
        .students
        .iter()
        .find(|m| m.is_active && m.student_id == student.agent_id)
        .map(|m| MentorshipUpdate {
            relation_id: m.relation_id,
            progress_delta: progress,
        });

    let mut student_deltas = AgentDeltas {
        experience: Some(experience_entry(
            experience_kinds::LEARNING,
            format!("Was taught {topic} by {}", mentor.name),
            outcome,
            Some(progress),
            vec![topic.to_owned()],
        )),
        ..AgentDeltas::default()
    };
    student_deltas.knowledge.push(KnowledgeDelta {
        topic: topic.to_owned(),
        depth_delta: 0.1 * progress,
        breadth_delta: 0.02,
        confidence_delta: 0.05 + 0.05 * progress,
        source: Some(KnowledgeSource::now(
            SourceKind::Mentor,
            mentor.agent_id.to_string(),
        )),
        validation: Some(quality >= 3.0),
    });

    ActivityReport {
        activity: Activity::Teaching,
        outcome,
        summary: format!(
            "taught {} on {topic} (quality {quality:.1}/5)",
            student.name
        ),
        deltas,
        partner_deltas: vec![(student.agent_id, student_deltas)],
    }
}

/// Build paper metadata when the research response proposed one.
fn build_paper(topic: &str, parsed: &ResearchResponse) -> Option<PaperMetadata> {
    let title = parsed.title.clone()?;
    Some(PaperMetadata {
        paper_id: PaperId::new(),
        title,
        abstract_text: parsed.abstract_text.clone().unwrap_or_default(),
        citation_count: 0,
        topics: vec![topic.to_owned()],
    })
}

/// Build the research report: depth-heavy knowledge growth plus a
/// publication event when a paper came out of it.
fn research_report(
    topic: &str,
    parsed: &ResearchResponse,
    sandbox_result: &SandboxResult,
    published: bool,
) -> ActivityReport {
    let outcome = if sandbox_result.succeeded() {
        Outcome::Success
    } else {
        Outcome::Partial
    };

    let mut deltas = AgentDeltas {
        counters: CounterDeltas {
            experiments_run: 1,
            papers_written: u32::from(published),
            ..CounterDeltas::default()
        },
        experience: Some(experience_entry(
            experience_kinds::RESEARCH,
            format!("Tested: {}", parsed.hypothesis),
            outcome,
            None,
            vec![topic.to_owned()],
        )),
        ..AgentDeltas::default()
    };
    deltas.knowledge.push(KnowledgeDelta {
        topic: topic.to_owned(),
        depth_delta: 0.15,
        breadth_delta: 0.02,
        confidence_delta: 0.05,
        source: Some(KnowledgeSource::now(SourceKind::Experiment, topic)),
        validation: Some(sandbox_result.succeeded()),
    });
    if published {
        deltas
            .reputation
            .push(ReputationEvent::Publication { impact: 1.0 });
    }

    ActivityReport {
        activity: Activity::Research,
        outcome,
        summary: format!("experiment on {topic}: {}", parsed.hypothesis),
        deltas,
        partner_deltas: Vec::new(),
    }
}

/// Build the review report.
fn review_report(paper: &PaperMetadata, parsed: &ReviewResponse) -> ActivityReport {
    let quality = parsed.quality.clamp(0.0, 5.0);

    let mut deltas = AgentDeltas {
        counters: CounterDeltas {
            reviews_given: 1,
            ..CounterDeltas::default()
        },
        experience: Some(experience_entry(
            experience_kinds::REVIEW,
            format!("Reviewed \"{}\"", paper.title),
            Outcome::Success,
            None,
            Vec::new(),
        )),
        ..AgentDeltas::default()
    };
    deltas
        .reputation
        .push(ReputationEvent::ReviewGiven { quality });

    ActivityReport {
        activity: Activity::Review,
        outcome: Outcome::Success,
        summary: format!("reviewed \"{}\" ({quality:.1}/5)", paper.title),
        deltas,
        partner_deltas: Vec::new(),
    }
}

/// Lenient mapping of the LLM's outcome word.
fn outcome_from_label(label: &str) -> Outcome {
    match label.to_lowercase().as_str() {
        "success" => Outcome::Success,
        "partial" => Outcome::Partial,
        _ => Outcome::Failure,
    }
}

/// Build the collaboration report: breadth-heavy knowledge and a
/// collaboration reputation event for every member.
fn collaboration_report(
    topic: &str,
    partners: &[Agent],
    parsed: &CollaborationResponse,
) -> ActivityReport {
    let outcome = outcome_from_label(&parsed.outcome);

    let member_deltas = |description: String| {
        let mut deltas = AgentDeltas {
            experience: Some(experience_entry(
                experience_kinds::COLLABORATION,
                description,
                outcome,
                None,
                parsed.insights.clone(),
            )),
            ..AgentDeltas::default()
        };
        deltas
            .reputation
            .push(ReputationEvent::Collaboration { outcome });
        deltas
            .knowledge
            .push(KnowledgeDelta::scores(topic, 0.02, 0.05, 0.02));
        deltas
    };

    let partner_deltas = partners
        .iter()
        .map(|p| {
            (
                p.agent_id,
                member_deltas(format!("Collaborated on {topic}")),
            )
        })
        .collect();

    ActivityReport {
        activity: Activity::Collaboration,
        outcome,
        summary: format!("collaborated on {topic} with {} partners", partners.len()),
        deltas: member_deltas(format!("Led a collaboration on {topic}")),
        partner_deltas,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use collegium_types::Stage;

    use super::*;

    fn paper(title: &str) -> PaperMetadata {
        PaperMetadata {
            paper_id: PaperId::new(),
            title: title.to_owned(),
            abstract_text: String::from("abstract"),
            citation_count: 3,
            topics: vec![String::from("optics")],
        }
    }

    #[test]
    fn confused_reading_is_a_failure_with_small_depth_gain() {
        let parsed = ComprehensionResponse {
            summary: String::from("lost"),
            key_concepts: Vec::new(),
            confidence: 20.0,
        };
        let report = learning_report("optics", Some(&paper("On Light")), &parsed);

        assert_eq!(report.outcome, Outcome::Failure);
        assert_eq!(report.deltas.counters.papers_read, 1);
        let delta = report.deltas.knowledge.first().unwrap();
        assert!((delta.depth_delta - 0.02).abs() < f64::EPSILON);
        assert!(delta.source.is_some());
    }

    #[test]
    fn confident_reading_is_a_success() {
        let parsed = ComprehensionResponse {
            summary: String::from("clear"),
            key_concepts: vec![String::from("refraction")],
            confidence: 90.0,
        };
        let report = learning_report("optics", None, &parsed);

        assert_eq!(report.outcome, Outcome::Success);
        assert!(report.summary.contains("self-study"));
        let entry = report.deltas.experience.as_ref().unwrap();
        assert_eq!(entry.knowledge_gained, vec!["refraction"]);
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let parsed = ComprehensionResponse {
            summary: String::new(),
            key_concepts: Vec::new(),
            confidence: 400.0,
        };
        let report = learning_report("optics", None, &parsed);
        let delta = report.deltas.knowledge.first().unwrap();
        assert!((delta.confidence_delta - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn teaching_validates_the_student_on_a_good_lesson() {
        let mentor = Agent::new("Knuth", Stage::Teacher, "algorithms");
        let student = Agent::new("Hopper", Stage::Apprentice, "algorithms");
        let parsed = LessonResponse {
            summary: String::from("good session"),
            quality: 4.5,
            student_progress: 0.6,
        };
        let report = teaching_report(&mentor, &student, "algorithms", &parsed);

        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(report.deltas.counters.students_taught, 1);
        // No active mentorship on the snapshot yet, so no session update.
        assert!(report.deltas.mentorship.is_none());

        let (id, student_deltas) = report.partner_deltas.first().unwrap();
        assert_eq!(*id, student.agent_id);
        let delta = student_deltas.knowledge.first().unwrap();
        assert_eq!(delta.validation, Some(true));
        assert!((delta.depth_delta - 0.06).abs() < f64::EPSILON);
    }

    #[test]
    fn poor_lesson_fails_validation() {
        let mentor = Agent::new("Knuth", Stage::Teacher, "algorithms");
        let student = Agent::new("Hopper", Stage::Apprentice, "algorithms");
        let parsed = LessonResponse {
            summary: String::new(),
            quality: 1.0,
            student_progress: 0.1,
        };
        let report = teaching_report(&mentor, &student, "algorithms", &parsed);

        assert_eq!(report.outcome, Outcome::Failure);
        let (_, student_deltas) = report.partner_deltas.first().unwrap();
        assert_eq!(
            student_deltas.knowledge.first().unwrap().validation,
            Some(false)
        );
    }

    #[test]
    fn research_with_a_paper_publishes() {
        let parsed = ResearchResponse {
            hypothesis: String::from("caching halves latency"),
            code: None,
            title: Some(String::from("Caching Revisited")),
            abstract_text: Some(String::from("We revisit caching.")),
        };
        let sandbox_result = SandboxResult {
            stdout: String::new(),
            result: Some(String::from("ok")),
            error: None,
        };
        let built = build_paper("systems", &parsed);
        assert!(built.is_some());

        let report = research_report("systems", &parsed, &sandbox_result, true);
        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(report.deltas.counters.papers_written, 1);
        assert_eq!(report.deltas.counters.experiments_run, 1);
        assert!(matches!(
            report.deltas.reputation.first(),
            Some(ReputationEvent::Publication { .. })
        ));
    }

    #[test]
    fn failed_experiment_is_partial_without_publication() {
        let parsed = ResearchResponse {
            hypothesis: String::from("sorting is O(1)"),
            code: Some(String::from("sort(expect_constant=True)")),
            title: None,
            abstract_text: None,
        };
        let sandbox_result = SandboxResult {
            stdout: String::new(),
            result: None,
            error: Some(String::from("AssertionError")),
        };
        assert!(build_paper("systems", &parsed).is_none());

        let report = research_report("systems", &parsed, &sandbox_result, false);
        assert_eq!(report.outcome, Outcome::Partial);
        assert_eq!(report.deltas.counters.papers_written, 0);
        assert!(report.deltas.reputation.is_empty());
        assert_eq!(
            report.deltas.knowledge.first().unwrap().validation,
            Some(false)
        );
    }

    #[test]
    fn review_report_carries_the_clamped_quality() {
        let parsed = ReviewResponse {
            quality: 9.0,
            verdict: String::from("accept"),
        };
        let report = review_report(&paper("On Light"), &parsed);

        assert_eq!(report.deltas.counters.reviews_given, 1);
        assert!(matches!(
            report.deltas.reputation.first(),
            Some(ReputationEvent::ReviewGiven { quality }) if (quality - 5.0).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn collaboration_rewards_every_member() {
        let partners = vec![
            Agent::new("Curie", Stage::Researcher, "radiochemistry"),
            Agent::new("Meitner", Stage::Expert, "physics"),
        ];
        let parsed = CollaborationResponse {
            outcome: String::from("success"),
            insights: vec![String::from("shared notation")],
        };
        let report = collaboration_report("physics", &partners, &parsed);

        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(report.partner_deltas.len(), 2);
        for (_, deltas) in &report.partner_deltas {
            assert!(matches!(
                deltas.reputation.first(),
                Some(ReputationEvent::Collaboration {
                    outcome: Outcome::Success
                })
            ));
        }
    }

    #[test]
    fn unknown_outcome_labels_read_as_failure() {
        assert_eq!(outcome_from_label("SUCCESS"), Outcome::Success);
        assert_eq!(outcome_from_label("partial"), Outcome::Partial);
        assert_eq!(outcome_from_label("explosion"), Outcome::Failure);
    }
}
