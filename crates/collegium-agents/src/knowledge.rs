//! Update rules for the per-agent knowledge book.
//!
//! All mutations preserve the clamping invariant: depth, breadth, and
//! confidence stay within `[0.0, 1.0]` after every call, regardless of the
//! sign or magnitude of the delta. Upserts have no error path -- a delta
//! for an unknown topic creates it first.

use chrono::Utc;

use collegium_types::{KnowledgeBook, KnowledgeSource, KnowledgeTopic};

/// Clamp a score into the unit interval.
fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Apply deltas to a topic, creating it if absent.
///
/// Updates `last_updated` and `last_accessed`, appends the source if one is
/// given, and bumps the book's mutation counter.
pub fn upsert_topic(
    book: &mut KnowledgeBook,
    name: &str,
    depth_delta: f64,
    breadth_delta: f64,
    confidence_delta: f64,
    source: Option<KnowledgeSource>,
) {
    let topic = book
        .topics
        .entry(name.to_owned())
        .or_insert_with(|| KnowledgeTopic::new(name));

    topic.depth_score = clamp_unit(topic.depth_score + depth_delta);
    topic.breadth_score = clamp_unit(topic.breadth_score + breadth_delta);
    topic.confidence = clamp_unit(topic.confidence + confidence_delta);

    let now = Utc::now();
    topic.last_updated = now;
    topic.last_accessed = now;

    if let Some(source) = source {
        topic.sources.push(source);
    }

    book.total_updates = book.total_updates.saturating_add(1);
}

/// Record a validation attempt against a topic.
///
/// A successful validation increments the validation count, marks the topic
/// validated once the count reaches `threshold`, and boosts confidence by
/// `confidence_boost`. A failed validation lowers confidence by
/// `confidence_penalty` without touching the count. Unknown topics are
/// ignored -- there is nothing to validate.
pub fn mark_validated(
    book: &mut KnowledgeBook,
    name: &str,
    success: bool,
    threshold: u32,
    confidence_boost: f64,
    confidence_penalty: f64,
) {
    let Some(topic) = book.topics.get_mut(name) else {
        return;
    };

    if success {
        topic.validation_count = topic.validation_count.saturating_add(1);
        if topic.validation_count >= threshold {
            topic.validated = true;
        }
        topic.confidence = clamp_unit(topic.confidence + confidence_boost);
    } else {
        topic.confidence = clamp_unit(topic.confidence - confidence_penalty);
    }
    topic.last_updated = Utc::now();
    book.total_updates = book.total_updates.saturating_add(1);
}

/// Competency scalar for one topic.
///
/// Returns the topic's mastery (weighted depth/breadth/confidence), or 0.0
/// for a topic the agent has never touched. Absence of knowledge is a
/// normal answer, not an error.
pub fn competency(book: &KnowledgeBook, name: &str) -> f64 {
    book.topics.get(name).map_or(0.0, KnowledgeTopic::mastery)
}

/// Whether every required topic meets the competency threshold.
pub fn prerequisites_met<'a, I>(book: &KnowledgeBook, required: I, threshold: f64) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    required
        .into_iter()
        .all(|name| competency(book, name) >= threshold)
}

/// Mean depth score across all topics, 0.0 for an empty book.
pub fn average_depth(book: &KnowledgeBook) -> f64 {
    average_of(book, |t| t.depth_score)
}

/// Mean confidence across all topics, 0.0 for an empty book.
pub fn average_confidence(book: &KnowledgeBook) -> f64 {
    average_of(book, |t| t.confidence)
}

fn average_of(book: &KnowledgeBook, component: impl Fn(&KnowledgeTopic) -> f64) -> f64 {
    if book.topics.is_empty() {
        return 0.0;
    }
    let sum: f64 = book.topics.values().map(component).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = book.topics.len() as f64;
    sum / count
}

/// Topic names that have gone stale: unvalidated, low-confidence, or not
/// accessed within `max_idle_days`.
pub fn stale_topics(book: &KnowledgeBook, max_idle_days: i64, min_confidence: f64) -> Vec<String> {
    let now = Utc::now();
    book.topics
        .values()
        .filter(|topic| {
            let idle_days = now.signed_duration_since(topic.last_accessed).num_days();
            idle_days > max_idle_days || !topic.validated || topic.confidence < min_confidence
        })
        .map(|topic| topic.name.clone())
        .collect()
}

/// Idle-decay pass: reduce confidence on topics not accessed within
/// `max_idle_days`. Decay respects the clamp invariant and never deletes
/// a topic.
pub fn apply_idle_decay(book: &mut KnowledgeBook, max_idle_days: i64, decay: f64) {
    let now = Utc::now();
    let mut touched = false;
    for topic in book.topics.values_mut() {
        let idle_days = now.signed_duration_since(topic.last_accessed).num_days();
        if idle_days > max_idle_days {
            topic.confidence = clamp_unit(topic.confidence - decay);
            topic.last_updated = now;
            touched = true;
        }
    }
    if touched {
        book.total_updates = book.total_updates.saturating_add(1);
    }
}
