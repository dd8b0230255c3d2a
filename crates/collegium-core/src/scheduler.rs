//! The community scheduler: the step cycle driving the simulation.
//!
//! Each step runs the same phase sequence: snapshot the active population,
//! draw one activity (or idle) per agent from its stage's probability
//! table, pair activities that need partners through the matchmaker,
//! execute all activities concurrently through the [`ActivityRunner`],
//! apply the returned deltas agent-by-agent, then run the periodic
//! promotion and checkpoint passes.
//!
//! Activities execute against owned snapshots and communicate results only
//! through deltas, so a failed or cancelled activity leaves its agent's
//! pre-step state intact. Store failures during checkpointing are logged
//! and retried at the next checkpoint; nothing short of construction-time
//! config validation aborts a run.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use futures::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use collegium_agents::{agent, evolution};
use collegium_types::{Activity, ActivityContext, Agent, AgentId, Stage};

use crate::config::{ActivityProbabilities, SimulationConfig};
use crate::events::{CommunityEvent, EventBus, Subscriber};
use crate::matchmaking;
use crate::runner::ActivityRunner;
use crate::stores::{GraphStore, StateStore};

/// Per-activity tallies for one step or one whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityCounts {
    /// Learning activities completed.
    pub learning: u64,
    /// Teaching activities completed.
    pub teaching: u64,
    /// Research activities completed.
    pub research: u64,
    /// Review activities completed.
    pub review: u64,
    /// Collaboration activities completed.
    pub collaboration: u64,
    /// Agents that drew no activity.
    pub idle: u64,
}

impl ActivityCounts {
    fn bump(&mut self, activity: Activity) {
        let slot = match activity {
            Activity::Learning => &mut self.learning,
            Activity::Teaching => &mut self.teaching,
            Activity::Research => &mut self.research,
            Activity::Review => &mut self.review,
            Activity::Collaboration => &mut self.collaboration,
        };
        *slot = slot.saturating_add(1);
    }

    fn merge(&mut self, other: Self) {
        self.learning = self.learning.saturating_add(other.learning);
        self.teaching = self.teaching.saturating_add(other.teaching);
        self.research = self.research.saturating_add(other.research);
        self.review = self.review.saturating_add(other.review);
        self.collaboration = self.collaboration.saturating_add(other.collaboration);
        self.idle = self.idle.saturating_add(other.idle);
    }

    /// Total completed activities, idle excluded.
    pub fn total(&self) -> u64 {
        self.learning
            .saturating_add(self.teaching)
            .saturating_add(self.research)
            .saturating_add(self.review)
            .saturating_add(self.collaboration)
    }
}

/// One contained per-agent activity failure.
#[derive(Debug, Clone)]
pub struct ActivityFailure {
    /// The agent whose activity failed.
    pub agent_id: AgentId,
    /// The activity that was attempted.
    pub activity: Activity,
    /// Failure description.
    pub reason: String,
}

/// One promotion applied during a promotion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionEntry {
    /// The promoted agent.
    pub agent_id: AgentId,
    /// Stage before the promotion.
    pub from_stage: Stage,
    /// Stage after the promotion.
    pub to_stage: Stage,
}

/// Summary of a single step's execution.
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    /// The step number that was executed (1-based).
    pub step: u64,
    /// Per-activity tallies.
    pub counts: ActivityCounts,
    /// Promotions applied this step.
    pub promotions: Vec<PromotionEntry>,
    /// Contained activity failures.
    pub failures: Vec<ActivityFailure>,
    /// Agents persisted by this step's checkpoint pass, if one ran.
    pub checkpointed: Option<usize>,
}

/// Aggregate summary of a whole run.
#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    /// Steps executed.
    pub steps: u64,
    /// Per-activity tallies across all steps.
    pub counts: ActivityCounts,
    /// Total promotions applied.
    pub promotions: u64,
    /// Total contained activity failures.
    pub failures: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// One activity ready for execution: an owned agent snapshot plus its
/// pairing context.
struct ActivityJob {
    agent: Agent,
    activity: Activity,
    context: ActivityContext,
}

/// Drives the community through steps.
///
/// Holds the population map, the injected stores and runner, the event
/// bus, and the seeded RNG. All randomness in a run flows through that
/// single RNG, so two schedulers built from the same config and the same
/// registration sequence produce identical runs.
pub struct CommunityScheduler<S, G, R> {
    config: SimulationConfig,
    population: BTreeMap<AgentId, Agent>,
    state_store: S,
    graph_store: G,
    runner: R,
    bus: EventBus,
    rng: StdRng,
    step: u64,
    /// Agents mutated since the last successful checkpoint.
    dirty: Vec<AgentId>,
}

impl<S, G, R> CommunityScheduler<S, G, R>
where
    S: StateStore,
    G: GraphStore,
    R: ActivityRunner,
{
    /// Create a scheduler over an empty population.
    ///
    /// # Errors
    ///
    /// Returns [`crate::config::ConfigError`] when the config fails
    /// validation; a scheduler is never constructed over a bad config.
    pub fn new(
        config: SimulationConfig,
        state_store: S,
        graph_store: G,
        runner: R,
    ) -> Result<Self, crate::config::ConfigError> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.community.seed);
        Ok(Self {
            config,
            population: BTreeMap::new(),
            state_store,
            graph_store,
            runner,
            bus: EventBus::new(),
            rng,
            step: 0,
            dirty: Vec::new(),
        })
    }

    /// Add an agent to the community.
    pub fn register_agent(&mut self, agent: Agent) {
        self.bus.emit(&CommunityEvent::AgentRegistered {
            agent_id: agent.agent_id,
            stage: agent.stage,
        });
        self.mark_dirty(agent.agent_id);
        self.population.insert(agent.agent_id, agent);
    }

    /// Subscribe a callback to community events.
    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.bus.subscribe(subscriber);
    }

    /// The current population, keyed by id.
    pub const fn population(&self) -> &BTreeMap<AgentId, Agent> {
        &self.population
    }

    /// Number of steps executed so far.
    pub const fn step(&self) -> u64 {
        self.step
    }

    fn mark_dirty(&mut self, agent_id: AgentId) {
        if !self.dirty.contains(&agent_id) {
            self.dirty.push(agent_id);
        }
    }

    /// Execute one complete step.
    ///
    /// Failures inside a step are contained per agent; the step itself
    /// always completes and returns a [`StepReport`].
    pub async fn run_step(&mut self) -> StepReport {
        self.step = self.step.saturating_add(1);
        let step = self.step;
        let mut report = StepReport {
            step,
            ..StepReport::default()
        };

        // --- Phase 1: snapshot the active population ---
        let snapshot: Vec<Agent> = self
            .population
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect();
        info!(step, agents = snapshot.len(), "Step started");

        // --- Phase 2: draw one activity (or idle) per agent ---
        // --- Phase 3: pair through the matchmaker where needed ---
        let mut jobs: Vec<ActivityJob> = Vec::new();
        for agent in &snapshot {
            let Some(activity) = self.draw_activity(agent) else {
                report.counts.idle = report.counts.idle.saturating_add(1);
                continue;
            };
            match self.pair(agent, activity, &snapshot, step) {
                Some(context) => jobs.push(ActivityJob {
                    agent: agent.clone(),
                    activity,
                    context,
                }),
                None => {
                    // No usable pairing this step; the agent sits out.
                    debug!(step, agent_id = %agent.agent_id, %activity, "No pairing found");
                    report.counts.idle = report.counts.idle.saturating_add(1);
                }
            }
        }

        // --- Phase 4: execute activities concurrently ---
        let runner = &self.runner;
        let mut results: Vec<_> = futures::stream::iter(jobs.into_iter().map(|job| async move {
            let agent_id = job.agent.agent_id;
            let result = runner.execute(job.agent, job.activity, job.context).await;
            (agent_id, job.activity, result)
        }))
        .buffer_unordered(self.config.community.max_concurrency)
        .collect()
        .await;

        // Completion order depends on backend latency; application order
        // must not.
        results.sort_by_key(|(agent_id, _, _)| *agent_id);

        // --- Phase 5: apply deltas agent-by-agent ---
        for (agent_id, activity, result) in results {
            match result {
                Ok(activity_report) => {
                    if activity == Activity::Teaching {
                        self.ensure_mentorships(agent_id, &activity_report);
                    }
                    self.apply_report(agent_id, &activity_report);
                    report.counts.bump(activity);
                    self.bus.emit(&CommunityEvent::ActivityCompleted {
                        agent_id,
                        activity,
                        outcome: activity_report.outcome,
                        step,
                    });
                }
                Err(err) => {
                    let reason = err.to_string();
                    warn!(step, %agent_id, %activity, %reason, "Activity failed");
                    self.bus.emit(&CommunityEvent::ActivityFailed {
                        agent_id,
                        activity,
                        reason: reason.clone(),
                        step,
                    });
                    report.failures.push(ActivityFailure {
                        agent_id,
                        activity,
                        reason,
                    });
                }
            }
        }

        // --- Phase 6: promotion pass ---
        if step.is_multiple_of(self.config.community.promotion_check_interval) {
            report.promotions = self.promotion_pass(step);
        }

        // --- Phase 7: checkpoint pass ---
        if step.is_multiple_of(self.config.community.checkpoint_interval) {
            report.checkpointed = Some(self.checkpoint(step).await);
        }

        info!(
            step,
            completed = report.counts.total(),
            idle = report.counts.idle,
            failures = report.failures.len(),
            promotions = report.promotions.len(),
            "Step finished"
        );
        report
    }

    /// Run steps until the configured step-count or wall-clock limit.
    ///
    /// Always completes, even under partial failures, and always flushes
    /// dirty agents before returning.
    pub async fn run(&mut self) -> SimulationReport {
        let started = Instant::now();
        let deadline = match self.config.community.max_wall_clock_seconds {
            0 => None,
            secs => started.checked_add(Duration::from_secs(secs)),
        };
        let max_steps = self.config.community.max_steps;

        let mut report = SimulationReport::default();
        while max_steps == 0 || report.steps < max_steps {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                info!(steps = report.steps, "Wall-clock limit reached");
                break;
            }
            let step_report = self.run_step().await;
            report.steps = report.steps.saturating_add(1);
            report.counts.merge(step_report.counts);
            let promotions = u64::try_from(step_report.promotions.len()).unwrap_or(u64::MAX);
            let failures = u64::try_from(step_report.failures.len()).unwrap_or(u64::MAX);
            report.promotions = report.promotions.saturating_add(promotions);
            report.failures = report.failures.saturating_add(failures);
        }

        // Final flush so a run never ends with unsaved state.
        let flushed = self.checkpoint(self.step).await;
        debug!(flushed, "Final checkpoint flushed");

        report.elapsed = started.elapsed();
        info!(
            steps = report.steps,
            activities = report.counts.total(),
            promotions = report.promotions,
            failures = report.failures,
            "Run finished"
        );
        report
    }

    /// One categorical draw from the agent's stage probability table.
    ///
    /// Probability mass not covered by any activity is the idle chance.
    /// Activities the agent is not currently eligible for turn into idle
    /// rather than being redistributed, keeping the draw distribution
    /// independent of eligibility.
    fn draw_activity(&mut self, agent: &Agent) -> Option<Activity> {
        let probabilities = *self.config.activities.for_stage(agent.stage);
        let roll: f64 = self.rng.random();
        let activity = categorical(&probabilities, roll)?;

        let eligible = match activity {
            Activity::Learning | Activity::Collaboration => true,
            Activity::Teaching => agent::is_eligible_to_teach(agent, &self.config.agent),
            Activity::Research => agent::is_eligible_to_research(agent, &self.config.agent),
            Activity::Review => agent::can_review(agent),
        };
        eligible.then_some(activity)
    }

    /// Build the execution context for one drawn activity, consulting the
    /// matchmaker when the activity needs partners. `None` means the
    /// activity cannot run this step (no student, no partners).
    fn pair(
        &self,
        agent: &Agent,
        activity: Activity,
        snapshot: &[Agent],
        step: u64,
    ) -> Option<ActivityContext> {
        let topic = agent.specialization.clone();
        match activity {
            Activity::Learning | Activity::Research | Activity::Review => Some(ActivityContext {
                step,
                topic,
                ..ActivityContext::default()
            }),
            Activity::Teaching => {
                let student = self.find_student(agent, &topic, snapshot)?;
                Some(ActivityContext {
                    step,
                    topic,
                    partners: vec![student],
                    ..ActivityContext::default()
                })
            }
            Activity::Collaboration => {
                let partner_ids = matchmaking::find_collaboration_partners(
                    agent,
                    &topic,
                    snapshot,
                    self.config.community.max_partners,
                    &self.config.matchmaking,
                );
                if partner_ids.is_empty() {
                    return None;
                }
                let partners = snapshot
                    .iter()
                    .filter(|a| partner_ids.contains(&a.agent_id))
                    .cloned()
                    .collect();
                Some(ActivityContext {
                    step,
                    topic,
                    partners,
                    ..ActivityContext::default()
                })
            }
        }
    }

    /// Pick the student this mentor should teach: the mentorship-seeking
    /// agent the mentor scores highest for on the topic.
    fn find_student(&self, mentor: &Agent, topic: &str, snapshot: &[Agent]) -> Option<Agent> {
        let mut best: Option<(f64, &Agent)> = None;
        for candidate in snapshot {
            if !collegium_agents::Capabilities::for_stage(candidate.stage).requires_mentor {
                continue;
            }
            let Some(m) =
                matchmaking::mentor_score(mentor, candidate, topic, &self.config.matchmaking)
            else {
                continue;
            };
            if m.score < self.config.matchmaking.min_score {
                continue;
            }
            let better = best.as_ref().is_none_or(|(best_score, best_agent)| {
                match m.score.total_cmp(best_score) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => candidate.agent_id < best_agent.agent_id,
                }
            });
            if better {
                best = Some((m.score, candidate));
            }
        }
        best.map(|(_, student)| student.clone())
    }

    /// Establish mentorships for a teaching report's students where none
    /// is active yet. Runs before delta application so that session
    /// updates land on existing relations.
    fn ensure_mentorships(&mut self, mentor_id: AgentId, report: &collegium_types::ActivityReport) {
        for (student_id, _) in &report.partner_deltas {
            let Some(mut mentor) = self.population.remove(&mentor_id) else {
                return;
            };
            let Some(mut student) = self.population.remove(student_id) else {
                self.population.insert(mentor_id, mentor);
                return;
            };

            let topics = vec![mentor.specialization.clone()];
            match agent::pair_mentorship(&mut mentor, &mut student, topics) {
                Ok(_) => {
                    info!(%mentor_id, %student_id, "Mentorship established");
                }
                Err(collegium_agents::RelationError::DuplicateActive { .. }) => {}
                Err(err) => {
                    warn!(%mentor_id, %student_id, %err, "Mentorship pairing rejected");
                }
            }

            self.population.insert(*student_id, student);
            self.population.insert(mentor_id, mentor);
        }
    }

    /// Apply one activity report's deltas to the acting agent and its
    /// partners.
    fn apply_report(&mut self, agent_id: AgentId, report: &collegium_types::ActivityReport) {
        if let Some(agent) = self.population.get_mut(&agent_id) {
            agent::apply_deltas(agent, &self.config.agent, &report.deltas);
            self.mark_dirty(agent_id);
        }
        for (partner_id, deltas) in &report.partner_deltas {
            if let Some(partner) = self.population.get_mut(partner_id) {
                agent::apply_deltas(partner, &self.config.agent, deltas);
                self.mark_dirty(*partner_id);
            }
        }
    }

    /// Promote every eligible agent one stage.
    fn promotion_pass(&mut self, step: u64) -> Vec<PromotionEntry> {
        let mut promoted = Vec::new();
        for agent in self.population.values_mut() {
            if !evolution::check_readiness(agent, &self.config.promotion, &self.config.agent)
                .eligible
            {
                continue;
            }
            if let Ok(result) = evolution::promote(agent, &self.config.promotion, &self.config.agent)
            {
                promoted.push(PromotionEntry {
                    agent_id: agent.agent_id,
                    from_stage: result.from_stage,
                    to_stage: result.to_stage,
                });
            }
        }
        for entry in &promoted {
            self.mark_dirty(entry.agent_id);
            self.bus.emit(&CommunityEvent::AgentPromoted {
                agent_id: entry.agent_id,
                from_stage: entry.from_stage,
                to_stage: entry.to_stage,
                step,
            });
        }
        promoted
    }

    /// Persist all dirty agents and refresh their graph projections.
    ///
    /// A failed save keeps the agent dirty for the next checkpoint.
    async fn checkpoint(&mut self, step: u64) -> usize {
        let mut saved = 0_usize;
        let mut still_dirty = Vec::new();

        for agent_id in std::mem::take(&mut self.dirty) {
            let Some(agent) = self.population.get(&agent_id) else {
                continue;
            };
            if let Err(err) = self.state_store.save_agent(agent).await {
                warn!(step, %agent_id, %err, "Agent save failed; will retry");
                still_dirty.push(agent_id);
                continue;
            }
            if let Err(err) = self
                .graph_store
                .store_agent_knowledge(agent_id, &agent.knowledge)
                .await
            {
                warn!(step, %agent_id, %err, "Graph projection refresh failed");
            }
            saved = saved.saturating_add(1);
        }

        self.dirty = still_dirty;
        self.bus.emit(&CommunityEvent::CheckpointSaved {
            step,
            agents_saved: saved,
        });
        saved
    }
}

/// Walk the cumulative distribution; `None` is the idle remainder.
fn categorical(probabilities: &ActivityProbabilities, roll: f64) -> Option<Activity> {
    let order = [
        (Activity::Learning, probabilities.learning),
        (Activity::Teaching, probabilities.teaching),
        (Activity::Research, probabilities.research),
        (Activity::Review, probabilities.review),
        (Activity::Collaboration, probabilities.collaboration),
    ];
    let mut cumulative = 0.0;
    for (activity, p) in order {
        cumulative += p;
        if roll < cumulative {
            return Some(activity);
        }
    }
    None
}
