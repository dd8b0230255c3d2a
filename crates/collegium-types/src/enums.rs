//! Enumeration types for the Collegium simulation.
//!
//! Covers the developmental stage ordering, the closed set of activities an
//! agent can perform in a step, activity outcomes, reputation dimensions,
//! and knowledge source kinds.

use serde::{Deserialize, Serialize};

/// Developmental stage of an agent in the community.
///
/// Stages form a total order. Promotion advances exactly one stage at a
/// time and never moves backward; [`Stage::Expert`] is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Learning fundamentals under a mentor.
    Apprentice,
    /// Applying knowledge independently.
    Practitioner,
    /// Educating others alongside early research.
    Teacher,
    /// Conducting original research and reviewing.
    Researcher,
    /// Community leadership. Terminal stage.
    Expert,
}

impl Stage {
    /// All stages in promotion order.
    pub const ALL: [Self; 5] = [
        Self::Apprentice,
        Self::Practitioner,
        Self::Teacher,
        Self::Researcher,
        Self::Expert,
    ];

    /// The next stage in the progression, or `None` for [`Stage::Expert`].
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Apprentice => Some(Self::Practitioner),
            Self::Practitioner => Some(Self::Teacher),
            Self::Teacher => Some(Self::Researcher),
            Self::Researcher => Some(Self::Expert),
            Self::Expert => None,
        }
    }

    /// Stable snake_case name used in logs and database rows.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Apprentice => "apprentice",
            Self::Practitioner => "practitioner",
            Self::Teacher => "teacher",
            Self::Researcher => "researcher",
            Self::Expert => "expert",
        }
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of per-agent work per simulation step.
///
/// The scheduler samples one activity per agent per step from a
/// stage-conditioned distribution. Adding a new activity means adding a
/// variant here plus a handler in the activity runner.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Read a paper and assess comprehension.
    Learning,
    /// Run a mentorship session with a student.
    Teaching,
    /// Form a hypothesis and run an experiment, possibly publishing.
    Research,
    /// Peer-review another agent's paper.
    Review,
    /// Joint research with matched partners.
    Collaboration,
}

impl Activity {
    /// Stable snake_case name used in logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Learning => "learning",
            Self::Teaching => "teaching",
            Self::Research => "research",
            Self::Review => "review",
            Self::Collaboration => "collaboration",
        }
    }
}

impl core::fmt::Display for Activity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a completed activity.
///
/// Reputation deltas are scaled by outcome: success earns the full
/// configured increment, partial a reduced one, failure a small decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The activity achieved its goal.
    Success,
    /// The activity partially achieved its goal.
    Partial,
    /// The activity completed but did not achieve its goal.
    Failure,
}

impl Outcome {
    /// Stable snake_case name used in logs and experience entries.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failure => "failure",
        }
    }
}

impl core::fmt::Display for Outcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reputation dimension.
///
/// Each dimension is scored independently on a 0-100 scale; the overall
/// score is a configurable weighted mean over all four.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Quality of mentorship and instruction.
    Teaching,
    /// Quality and impact of research outputs.
    Research,
    /// Quality of peer reviews provided.
    Review,
    /// Effectiveness as a collaborator.
    Collaboration,
}

impl Dimension {
    /// All dimensions, in weight-table order.
    pub const ALL: [Self; 4] = [
        Self::Teaching,
        Self::Research,
        Self::Review,
        Self::Collaboration,
    ];
}

/// Where a piece of knowledge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Learned from reading a paper.
    Paper,
    /// Taught by a mentor.
    Mentor,
    /// Validated through an experiment.
    Experiment,
    /// Self-directed study.
    SelfStudy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_total() {
        assert!(Stage::Apprentice < Stage::Practitioner);
        assert!(Stage::Practitioner < Stage::Teacher);
        assert!(Stage::Teacher < Stage::Researcher);
        assert!(Stage::Researcher < Stage::Expert);
    }

    #[test]
    fn stage_next_walks_the_full_ladder() {
        let mut stage = Stage::Apprentice;
        let mut hops = 0_u32;
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            hops = hops.saturating_add(1);
        }
        assert_eq!(stage, Stage::Expert);
        assert_eq!(hops, 4);
    }

    #[test]
    fn expert_is_terminal() {
        assert!(Stage::Expert.next().is_none());
    }

    #[test]
    fn stage_serializes_snake_case() {
        let json = serde_json::to_string(&Stage::Practitioner).unwrap_or_default();
        assert_eq!(json, "\"practitioner\"");
    }

    #[test]
    fn activity_display_matches_as_str() {
        for activity in [
            Activity::Learning,
            Activity::Teaching,
            Activity::Research,
            Activity::Review,
            Activity::Collaboration,
        ] {
            assert_eq!(activity.to_string(), activity.as_str());
        }
    }
}
