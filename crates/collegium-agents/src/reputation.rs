//! Bounded reputation updates and the weighted overall score.
//!
//! Every update is a small, outcome-scaled increment or decrement; the
//! dimension scores are clamped into `[0, 100]` on every application. The
//! overall score is always recomputed from the current dimensions with the
//! configured weights -- it is never cached, so it can never be stale.

use chrono::Utc;

use collegium_types::{Dimension, Outcome, Reputation, ReputationEvent};
use collegium_types::reputation::{MAX_SCORE, MIN_SCORE};

use crate::config::{ReputationDeltas, ReputationWeights};

/// Add `delta` to one dimension, clamping into `[0, 100]`.
pub fn apply_event(reputation: &mut Reputation, dimension: Dimension, delta: f64) {
    let score = reputation.score_mut(dimension);
    *score = (*score + delta).clamp(MIN_SCORE, MAX_SCORE);
    reputation.last_updated = Utc::now();
}

/// Weighted mean over the four dimensions.
///
/// The weights are validated at configuration load; this function trusts
/// them and simply computes the mean.
pub fn overall(reputation: &Reputation, weights: &ReputationWeights) -> f64 {
    Dimension::ALL
        .iter()
        .map(|&dimension| reputation.score(dimension) * weights.weight(dimension))
        .sum()
}

/// Record a publication: bumps the publication counter and raises the
/// research dimension by the configured impact-scaled bonus.
pub fn record_publication(reputation: &mut Reputation, deltas: &ReputationDeltas, impact: f64) {
    reputation.papers_published = reputation.papers_published.saturating_add(1);
    apply_event(reputation, Dimension::Research, deltas.publication(impact));
}

/// Record a teaching session with the given outcome.
pub fn record_teaching_session(
    reputation: &mut Reputation,
    deltas: &ReputationDeltas,
    outcome: Outcome,
) {
    reputation.teaching_sessions = reputation.teaching_sessions.saturating_add(1);
    apply_event(reputation, Dimension::Teaching, deltas.teaching(outcome));
}

/// Record a peer review of the given quality (0-5 scale).
pub fn record_review(reputation: &mut Reputation, deltas: &ReputationDeltas, quality: f64) {
    reputation.reviews_completed = reputation.reviews_completed.saturating_add(1);
    apply_event(reputation, Dimension::Review, deltas.review(quality));
}

/// Record a collaboration round with the given outcome.
pub fn record_collaboration(
    reputation: &mut Reputation,
    deltas: &ReputationDeltas,
    outcome: Outcome,
) {
    reputation.collaborations = reputation.collaborations.saturating_add(1);
    apply_event(
        reputation,
        Dimension::Collaboration,
        deltas.collaboration(outcome),
    );
}

/// Apply one semantic reputation event using the configured delta table.
pub fn apply(reputation: &mut Reputation, deltas: &ReputationDeltas, event: ReputationEvent) {
    match event {
        ReputationEvent::Publication { impact } => record_publication(reputation, deltas, impact),
        ReputationEvent::TeachingSession { outcome } => {
            record_teaching_session(reputation, deltas, outcome);
        }
        ReputationEvent::ReviewGiven { quality } => record_review(reputation, deltas, quality),
        ReputationEvent::Collaboration { outcome } => {
            record_collaboration(reputation, deltas, outcome);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn apply_event_clamps_at_both_bounds() {
        let mut rep = Reputation::new();
        apply_event(&mut rep, Dimension::Research, 500.0);
        assert!((rep.research - MAX_SCORE).abs() < f64::EPSILON);

        apply_event(&mut rep, Dimension::Research, -500.0);
        assert!((rep.research - MIN_SCORE).abs() < f64::EPSILON);
    }

    #[test]
    fn overall_is_the_weighted_mean() {
        let mut rep = Reputation::new();
        rep.teaching = 80.0;
        rep.research = 60.0;
        rep.review = 40.0;
        rep.collaboration = 20.0;

        let weights = ReputationWeights::default();
        let expected = 80.0_f64.mul_add(0.25, 60.0 * 0.35) + 40.0_f64.mul_add(0.20, 20.0 * 0.20);
        assert!((overall(&rep, &weights) - expected).abs() < 1e-9);
    }

    #[test]
    fn overall_tracks_dimension_changes() {
        let mut rep = Reputation::new();
        let weights = ReputationWeights::default();
        let before = overall(&rep, &weights);

        apply_event(&mut rep, Dimension::Teaching, 10.0);
        let after = overall(&rep, &weights);
        assert!((after - before - 10.0 * weights.teaching).abs() < 1e-9);
    }

    #[test]
    fn publication_saturates_at_hundred() {
        let mut rep = Reputation::new();
        rep.research = 100.0;
        let deltas = ReputationDeltas::default();
        for _ in 0..50 {
            record_publication(&mut rep, &deltas, 2.0);
            assert!(rep.research <= MAX_SCORE);
        }
        assert!((rep.research - MAX_SCORE).abs() < f64::EPSILON);
        assert_eq!(rep.papers_published, 50);
    }

    #[test]
    fn failed_teaching_lowers_the_teaching_dimension() {
        let mut rep = Reputation::new();
        let deltas = ReputationDeltas::default();
        record_teaching_session(&mut rep, &deltas, Outcome::Failure);
        assert!(rep.teaching < 50.0);
        assert_eq!(rep.teaching_sessions, 1);
    }

    #[test]
    fn review_quality_below_neutral_is_a_penalty() {
        let mut rep = Reputation::new();
        let deltas = ReputationDeltas::default();
        record_review(&mut rep, &deltas, 1.0);
        assert!(rep.review < 50.0);
        assert_eq!(rep.reviews_completed, 1);
    }

    #[test]
    fn semantic_events_route_to_the_right_dimension() {
        let deltas = ReputationDeltas::default();
        let mut rep = Reputation::new();

        apply(&mut rep, &deltas, ReputationEvent::Collaboration {
            outcome: Outcome::Success,
        });
        assert!(rep.collaboration > 50.0);
        assert!((rep.teaching - 50.0).abs() < f64::EPSILON);
        assert_eq!(rep.collaborations, 1);
    }

    #[test]
    fn bound_invariant_under_long_event_sequences() {
        let deltas = ReputationDeltas::default();
        let mut rep = Reputation::new();
        for i in 0_u32..200 {
            let event = match i.rem_euclid(4) {
                0 => ReputationEvent::Publication { impact: 3.0 },
                1 => ReputationEvent::TeachingSession {
                    outcome: Outcome::Failure,
                },
                2 => ReputationEvent::ReviewGiven { quality: 0.0 },
                _ => ReputationEvent::Collaboration {
                    outcome: Outcome::Success,
                },
            };
            apply(&mut rep, &deltas, event);
            for dimension in Dimension::ALL {
                let score = rep.score(dimension);
                assert!((MIN_SCORE..=MAX_SCORE).contains(&score));
            }
        }
    }
}
