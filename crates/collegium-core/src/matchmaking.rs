//! Mentor, collaborator, and reviewer matchmaking.
//!
//! All matching operations are pure functions of (requester, candidate
//! snapshot, [`MatchmakingConfig`]): no hidden global state and no hidden
//! randomness, so repeated calls over the same pool return the same result.
//! Absence of a match is a normal outcome, never an error.

use serde::{Deserialize, Serialize};
use tracing::debug;

use collegium_agents::{Capabilities, knowledge};
use collegium_types::{Agent, AgentId, Stage};

/// Matchmaking score weights and thresholds.
///
/// Gap bounds are on the competency scale (`[0, 1]`); reputation terms are
/// on the 0-100 reputation scale and normalized inside the scoring
/// functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingConfig {
    /// Lower edge of the ideal mentor-student expertise gap.
    pub ideal_gap_min: f64,
    /// Upper edge of the ideal mentor-student expertise gap.
    pub ideal_gap_max: f64,
    /// Peak score contribution of the expertise-gap curve.
    pub gap_weight: f64,
    /// Minimum total score a mentor candidate must reach.
    pub min_score: f64,
    /// Additive bonus per topic both agents have touched.
    pub shared_topic_bonus: f64,
    /// Cap on the total shared-topic bonus.
    pub shared_topic_cap: f64,
    /// Cap on the teaching-reputation bonus (reputation normalized to 0-1
    /// then scaled into this cap).
    pub reputation_bonus_cap: f64,
    /// Additive bonus per student previously taught.
    pub experience_bonus_per_student: f64,
    /// Cap on the teaching-experience bonus.
    pub experience_bonus_cap: f64,
    /// Minimum teaching reputation to be considered as a mentor.
    pub min_mentor_teaching_reputation: f64,
    /// How fast collaboration affinity falls off with competency distance.
    pub collaboration_depth_falloff: f64,
    /// Additive bonus for a collaboration candidate whose stage differs
    /// from everyone already selected.
    pub stage_diversity_bonus: f64,
    /// Weight of mean topic competency in reviewer ranking.
    pub reviewer_competency_weight: f64,
    /// Weight of normalized review reputation in reviewer ranking.
    pub reviewer_reputation_weight: f64,
    /// Additive bonus per review previously given.
    pub reviewer_experience_bonus: f64,
    /// Cap on the reviewer-experience bonus.
    pub reviewer_experience_cap: f64,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            ideal_gap_min: 0.1,
            ideal_gap_max: 0.3,
            gap_weight: 0.4,
            min_score: 0.2,
            shared_topic_bonus: 0.05,
            shared_topic_cap: 0.3,
            reputation_bonus_cap: 0.2,
            experience_bonus_per_student: 0.02,
            experience_bonus_cap: 0.1,
            min_mentor_teaching_reputation: 40.0,
            collaboration_depth_falloff: 2.0,
            stage_diversity_bonus: 0.15,
            reviewer_competency_weight: 0.4,
            reviewer_reputation_weight: 0.3,
            reviewer_experience_bonus: 0.03,
            reviewer_experience_cap: 0.3,
        }
    }
}

/// A scored mentor-student pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentorMatch {
    /// The selected mentor.
    pub mentor_id: AgentId,
    /// The requesting student.
    pub student_id: AgentId,
    /// The total compatibility score.
    pub score: f64,
    /// Mentor competency minus student competency on the topic.
    pub expertise_gap: f64,
    /// Topics both agents have touched.
    pub shared_topics: Vec<String>,
}

/// Score contribution of the expertise gap.
///
/// Triangular curve: zero at gap 0, rising linearly to the full
/// `gap_weight` across `[ideal_gap_min, ideal_gap_max]`, then falling
/// linearly back to zero at gap 1.0. A non-positive gap means the
/// candidate has nothing to teach and scores zero.
pub fn gap_score(gap: f64, config: &MatchmakingConfig) -> f64 {
    if gap <= 0.0 {
        return 0.0;
    }
    if gap < config.ideal_gap_min {
        return config.gap_weight * gap / config.ideal_gap_min;
    }
    if gap <= config.ideal_gap_max {
        return config.gap_weight;
    }
    let tail = 1.0 - config.ideal_gap_max;
    if tail <= 0.0 {
        return 0.0;
    }
    (config.gap_weight * (1.0 - gap) / tail).max(0.0)
}

/// Topics present in both agents' knowledge books.
fn shared_topics(a: &Agent, b: &Agent) -> Vec<String> {
    a.knowledge
        .topics
        .keys()
        .filter(|name| b.knowledge.topics.contains_key(*name))
        .cloned()
        .collect()
}

fn count_bonus(count: u32, per: f64, cap: f64) -> f64 {
    (f64::from(count) * per).min(cap)
}

/// Score one mentor candidate against a student for a topic.
///
/// Returns `None` when the candidate is filtered out: same agent, not a
/// teaching-capable stage, teaching reputation below the floor, or a
/// non-positive expertise gap.
pub fn mentor_score(
    mentor: &Agent,
    student: &Agent,
    topic: &str,
    config: &MatchmakingConfig,
) -> Option<MentorMatch> {
    if mentor.agent_id == student.agent_id {
        return None;
    }
    if !Capabilities::for_stage(mentor.stage).can_teach {
        return None;
    }
    if mentor.reputation.teaching < config.min_mentor_teaching_reputation {
        return None;
    }

    let gap = knowledge::competency(&mentor.knowledge, topic)
        - knowledge::competency(&student.knowledge, topic);
    if gap <= 0.0 {
        return None;
    }

    let shared = shared_topics(mentor, student);
    let shared_len = u32::try_from(shared.len()).unwrap_or(u32::MAX);

    let mut score = gap_score(gap, config);
    score += count_bonus(shared_len, config.shared_topic_bonus, config.shared_topic_cap);
    score += (mentor.reputation.teaching / 100.0 * config.reputation_bonus_cap)
        .min(config.reputation_bonus_cap);
    score += count_bonus(
        mentor.students_taught,
        config.experience_bonus_per_student,
        config.experience_bonus_cap,
    );

    Some(MentorMatch {
        mentor_id: mentor.agent_id,
        student_id: student.agent_id,
        score,
        expertise_gap: gap,
        shared_topics: shared,
    })
}

/// Find the best mentor for a student on a topic.
///
/// Returns the highest-scoring candidate above `min_score`, or `None`
/// when the pool is empty or no candidate clears the threshold. Ties break
/// by higher teaching reputation, then lower active-mentee load, then id.
pub fn find_mentor(
    student: &Agent,
    topic: &str,
    candidates: &[Agent],
    config: &MatchmakingConfig,
) -> Option<MentorMatch> {
    let mut best: Option<(MentorMatch, f64, usize)> = None;

    for candidate in candidates {
        let Some(m) = mentor_score(candidate, student, topic, config) else {
            continue;
        };
        if m.score < config.min_score {
            continue;
        }
        let key = (m, candidate.reputation.teaching, candidate.mentee_load());
        let better = match &best {
            None => true,
            Some(current) => {
                match key.0.score.total_cmp(&current.0.score) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => match key.1.total_cmp(&current.1) {
                        std::cmp::Ordering::Greater => true,
                        std::cmp::Ordering::Less => false,
                        std::cmp::Ordering::Equal => (key.2, key.0.mentor_id)
                            < (current.2, current.0.mentor_id),
                    },
                }
            }
        };
        if better {
            best = Some(key);
        }
    }

    let found = best.map(|(m, _, _)| m);
    if let Some(m) = &found {
        debug!(
            student_id = %m.student_id,
            mentor_id = %m.mentor_id,
            topic,
            score = m.score,
            "Mentor match found"
        );
    } else {
        debug!(student_id = %student.agent_id, topic, "No suitable mentor");
    }
    found
}

/// Rank collaboration partners for an agent on a topic.
///
/// Affinity prefers peers at a similar competency level (collaboration
/// works best between near-equals), with a diversity bonus for candidates
/// whose stage is not yet represented in the selection. Selection is
/// greedy, so the bonus produces stage-mixed groups. Returns up to
/// `max_partners` ids, fewer on a small pool, empty on an empty pool.
pub fn find_collaboration_partners(
    agent: &Agent,
    topic: &str,
    candidates: &[Agent],
    max_partners: usize,
    config: &MatchmakingConfig,
) -> Vec<AgentId> {
    let agent_competency = knowledge::competency(&agent.knowledge, topic);

    let mut pool: Vec<(&Agent, f64)> = candidates
        .iter()
        .filter(|c| c.agent_id != agent.agent_id && c.is_active)
        .map(|c| {
            let distance = (knowledge::competency(&c.knowledge, topic) - agent_competency).abs();
            let base = (1.0 - distance * config.collaboration_depth_falloff).max(0.0)
                + c.reputation.collaboration / 1000.0;
            (c, base)
        })
        .collect();

    let mut selected: Vec<AgentId> = Vec::new();
    let mut selected_stages: Vec<Stage> = Vec::new();

    while selected.len() < max_partners && !pool.is_empty() {
        let mut best: Option<(usize, f64, AgentId)> = None;
        for (idx, (candidate, base)) in pool.iter().enumerate() {
            let mut score = *base;
            if !selected_stages.contains(&candidate.stage) && !selected_stages.is_empty() {
                score += config.stage_diversity_bonus;
            }
            let better = best.as_ref().is_none_or(|(_, best_score, best_id)| {
                match score.total_cmp(best_score) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => candidate.agent_id < *best_id,
                }
            });
            if better {
                best = Some((idx, score, candidate.agent_id));
            }
        }
        let Some((best_idx, _, _)) = best else {
            break;
        };
        let (candidate, _) = pool.swap_remove(best_idx);
        selected.push(candidate.agent_id);
        selected_stages.push(candidate.stage);
    }

    selected
}

/// Rank reviewers for a paper.
///
/// Candidates must be review-capable (stage gates this) and not excluded
/// (authors review nothing of their own). Ranking combines mean topic
/// competency, normalized review reputation, and review experience.
/// Returns up to `num_reviewers` ids, fewer when the pool is small.
pub fn find_reviewers(
    paper_topics: &[String],
    candidates: &[Agent],
    exclude: &[AgentId],
    num_reviewers: usize,
    config: &MatchmakingConfig,
) -> Vec<AgentId> {
    let mut scored: Vec<(f64, AgentId)> = candidates
        .iter()
        .filter(|c| {
            c.is_active
                && Capabilities::for_stage(c.stage).can_review
                && !exclude.contains(&c.agent_id)
        })
        .map(|c| {
            let mean_competency = if paper_topics.is_empty() {
                0.0
            } else {
                #[allow(clippy::cast_precision_loss)]
                let denom = paper_topics.len() as f64;
                paper_topics
                    .iter()
                    .map(|t| knowledge::competency(&c.knowledge, t))
                    .sum::<f64>()
                    / denom
            };
            let score = mean_competency * config.reviewer_competency_weight
                + c.reputation.review / 100.0 * config.reviewer_reputation_weight
                + count_bonus(
                    c.reviews_given,
                    config.reviewer_experience_bonus,
                    config.reviewer_experience_cap,
                );
            (score, c.agent_id)
        })
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored
        .into_iter()
        .take(num_reviewers)
        .map(|(_, id)| id)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use collegium_agents::knowledge::upsert_topic;

    use super::*;

    fn with_topic(mut agent: Agent, topic: &str, level: f64) -> Agent {
        upsert_topic(&mut agent.knowledge, topic, level, level, level, None);
        agent
    }

    fn teacher_with_topic(name: &str, topic: &str, level: f64) -> Agent {
        with_topic(Agent::new(name, Stage::Teacher, "physics"), topic, level)
    }

    #[test]
    fn gap_curve_peaks_inside_ideal_band() {
        let config = MatchmakingConfig::default();
        assert!((gap_score(0.2, &config) - config.gap_weight).abs() < f64::EPSILON);
        assert!(gap_score(0.05, &config) < config.gap_weight);
        assert!(gap_score(0.6, &config) < config.gap_weight);
        assert!((gap_score(0.0, &config)).abs() < f64::EPSILON);
        assert!(gap_score(-0.3, &config).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_candidate_pool_returns_none() {
        let config = MatchmakingConfig::default();
        let student = Agent::new("Kepler", Stage::Apprentice, "astronomy");
        assert!(find_mentor(&student, "quantum-computing", &[], &config).is_none());
    }

    #[test]
    fn below_threshold_candidates_are_rejected() {
        let config = MatchmakingConfig {
            min_score: 0.9,
            ..MatchmakingConfig::default()
        };
        let student = Agent::new("Kepler", Stage::Apprentice, "astronomy");
        let mentor = teacher_with_topic("Somerville", "optics", 0.2);
        assert!(find_mentor(&student, "optics", &[mentor], &config).is_none());
    }

    #[test]
    fn apprentice_candidates_cannot_mentor() {
        let config = MatchmakingConfig::default();
        let student = Agent::new("Kepler", Stage::Apprentice, "astronomy");
        let peer = with_topic(
            Agent::new("Brahe", Stage::Apprentice, "astronomy"),
            "optics",
            0.9,
        );
        assert!(find_mentor(&student, "optics", &[peer], &config).is_none());
    }

    #[test]
    fn low_teaching_reputation_filters_mentor() {
        let config = MatchmakingConfig::default();
        let student = Agent::new("Kepler", Stage::Apprentice, "astronomy");
        let mut mentor = teacher_with_topic("Somerville", "optics", 0.3);
        mentor.reputation.teaching = 10.0;
        assert!(find_mentor(&student, "optics", &[mentor], &config).is_none());
    }

    #[test]
    fn best_gap_candidate_wins() {
        let config = MatchmakingConfig::default();
        let student = with_topic(
            Agent::new("Kepler", Stage::Apprentice, "astronomy"),
            "optics",
            0.1,
        );
        // Gap 0.2 sits in the ideal band; gap 0.8 is far outside it.
        let ideal = teacher_with_topic("Somerville", "optics", 0.3);
        let distant = teacher_with_topic("Laplace", "optics", 0.9);
        let ideal_id = ideal.agent_id;

        let m = find_mentor(&student, "optics", &[distant, ideal], &config).unwrap();
        assert_eq!(m.mentor_id, ideal_id);
        assert!((m.expertise_gap - 0.2).abs() < 1e-9);
    }

    #[test]
    fn mentor_selection_is_deterministic() {
        let config = MatchmakingConfig::default();
        let student = Agent::new("Kepler", Stage::Apprentice, "astronomy");
        let candidates = vec![
            teacher_with_topic("A", "optics", 0.25),
            teacher_with_topic("B", "optics", 0.25),
            teacher_with_topic("C", "optics", 0.25),
        ];
        let first = find_mentor(&student, "optics", &candidates, &config).unwrap();
        for _ in 0..10 {
            let again = find_mentor(&student, "optics", &candidates, &config).unwrap();
            assert_eq!(again.mentor_id, first.mentor_id);
        }
    }

    #[test]
    fn mentee_load_breaks_score_ties() {
        let config = MatchmakingConfig::default();
        let student = Agent::new("Kepler", Stage::Apprentice, "astronomy");
        let mut busy = teacher_with_topic("Busy", "optics", 0.25);
        let free = teacher_with_topic("Free", "optics", 0.25);
        busy.students.push(collegium_types::Mentorship::begin(
            busy.agent_id,
            AgentId::new(),
            vec![String::from("optics")],
        ));
        let free_id = free.agent_id;

        let m = find_mentor(&student, "optics", &[busy, free], &config).unwrap();
        assert_eq!(m.mentor_id, free_id);
    }

    #[test]
    fn collaboration_prefers_stage_mixed_groups() {
        let config = MatchmakingConfig::default();
        let lead = with_topic(
            Agent::new("Lead", Stage::Researcher, "ml"),
            "transfer-learning",
            0.5,
        );
        let peer_a = with_topic(
            Agent::new("PeerA", Stage::Researcher, "ml"),
            "transfer-learning",
            0.5,
        );
        let peer_b = with_topic(
            Agent::new("PeerB", Stage::Researcher, "ml"),
            "transfer-learning",
            0.5,
        );
        let expert = with_topic(
            Agent::new("Expert", Stage::Expert, "ml"),
            "transfer-learning",
            0.45,
        );
        let expert_id = expert.agent_id;

        let partners = find_collaboration_partners(
            &lead,
            "transfer-learning",
            &[peer_a, peer_b, expert],
            2,
            &config,
        );
        assert_eq!(partners.len(), 2);
        assert!(partners.contains(&expert_id));
    }

    #[test]
    fn collaboration_small_pool_returns_fewer() {
        let config = MatchmakingConfig::default();
        let lead = Agent::new("Lead", Stage::Researcher, "ml");
        let only = Agent::new("Only", Stage::Researcher, "ml");
        let partners = find_collaboration_partners(&lead, "ml", &[only], 3, &config);
        assert_eq!(partners.len(), 1);
    }

    #[test]
    fn reviewers_exclude_authors() {
        let config = MatchmakingConfig::default();
        let topics = vec![String::from("optimization")];
        let author = with_topic(
            Agent::new("Author", Stage::Researcher, "ml"),
            "optimization",
            0.9,
        );
        let reviewer = with_topic(
            Agent::new("Reviewer", Stage::Researcher, "ml"),
            "optimization",
            0.5,
        );
        let author_id = author.agent_id;
        let reviewer_id = reviewer.agent_id;

        let found = find_reviewers(&topics, &[author, reviewer], &[author_id], 3, &config);
        assert_eq!(found, vec![reviewer_id]);
    }

    #[test]
    fn teachers_cannot_review() {
        let config = MatchmakingConfig::default();
        let topics = vec![String::from("optimization")];
        let teacher = teacher_with_topic("Teacher", "optimization", 0.9);
        let found = find_reviewers(&topics, &[teacher], &[], 3, &config);
        assert!(found.is_empty());
    }

    #[test]
    fn reviewers_ranked_by_competency() {
        let config = MatchmakingConfig::default();
        let topics = vec![String::from("optimization")];
        let strong = with_topic(
            Agent::new("Strong", Stage::Expert, "ml"),
            "optimization",
            0.9,
        );
        let weak = with_topic(
            Agent::new("Weak", Stage::Researcher, "ml"),
            "optimization",
            0.1,
        );
        let strong_id = strong.agent_id;

        let found = find_reviewers(&topics, &[weak, strong], &[], 1, &config);
        assert_eq!(found, vec![strong_id]);
    }
}
