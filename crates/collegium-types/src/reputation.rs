//! Multi-dimensional reputation scores.
//!
//! Reputation is tracked per [`Dimension`] on a 0-100 scale, starting at a
//! neutral 50.0. The overall score is never stored: it is recomputed from
//! the dimensions with a configurable weight table (see
//! `collegium-agents::reputation`), so it can never go stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::Dimension;

/// Neutral starting score for every dimension.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Lower bound of every dimension score.
pub const MIN_SCORE: f64 = 0.0;

/// Upper bound of every dimension score.
pub const MAX_SCORE: f64 = 100.0;

/// An agent's reputation across the four activity dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reputation {
    /// Quality of mentorship and instruction, 0-100.
    pub teaching: f64,
    /// Quality and impact of research outputs, 0-100.
    pub research: f64,
    /// Quality of peer reviews provided, 0-100.
    pub review: f64,
    /// Effectiveness as a collaborator, 0-100.
    pub collaboration: f64,
    /// Teaching sessions delivered.
    pub teaching_sessions: u32,
    /// Papers published.
    pub papers_published: u32,
    /// Reviews completed.
    pub reviews_completed: u32,
    /// Collaborations participated in.
    pub collaborations: u32,
    /// When any dimension last changed.
    pub last_updated: DateTime<Utc>,
}

impl Default for Reputation {
    fn default() -> Self {
        Self {
            teaching: NEUTRAL_SCORE,
            research: NEUTRAL_SCORE,
            review: NEUTRAL_SCORE,
            collaboration: NEUTRAL_SCORE,
            teaching_sessions: 0,
            papers_published: 0,
            reviews_completed: 0,
            collaborations: 0,
            last_updated: Utc::now(),
        }
    }
}

impl Reputation {
    /// Create a neutral reputation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the score of one dimension.
    pub const fn score(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Teaching => self.teaching,
            Dimension::Research => self.research,
            Dimension::Review => self.review,
            Dimension::Collaboration => self.collaboration,
        }
    }

    /// Mutable access to the score of one dimension.
    pub const fn score_mut(&mut self, dimension: Dimension) -> &mut f64 {
        match dimension {
            Dimension::Teaching => &mut self.teaching,
            Dimension::Research => &mut self.research,
            Dimension::Review => &mut self.review,
            Dimension::Collaboration => &mut self.collaboration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reputation_is_neutral() {
        let rep = Reputation::new();
        for dimension in Dimension::ALL {
            assert!((rep.score(dimension) - NEUTRAL_SCORE).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn score_mut_targets_the_right_dimension() {
        let mut rep = Reputation::new();
        *rep.score_mut(Dimension::Review) = 72.5;
        assert!((rep.review - 72.5).abs() < f64::EPSILON);
        assert!((rep.teaching - NEUTRAL_SCORE).abs() < f64::EPSILON);
    }
}
