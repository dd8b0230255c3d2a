//! Typed community events and the synchronous event bus.
//!
//! Consumers (logging, statistics) subscribe explicitly at scheduler
//! construction; the scheduler emits events inline as they happen. Delivery
//! is synchronous and in subscription order, so there is no implicit
//! ordering to reason about and no queue to drain.

use serde::{Deserialize, Serialize};
use tracing::debug;

use collegium_types::{Activity, AgentId, Outcome, Stage};

/// An event emitted by the scheduler during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CommunityEvent {
    /// An agent joined the community.
    AgentRegistered {
        /// The new agent.
        agent_id: AgentId,
        /// Its starting stage.
        stage: Stage,
    },
    /// An agent advanced one stage.
    AgentPromoted {
        /// The promoted agent.
        agent_id: AgentId,
        /// Stage before the promotion.
        from_stage: Stage,
        /// Stage after the promotion.
        to_stage: Stage,
        /// The step the promotion happened in.
        step: u64,
    },
    /// An activity completed and its deltas were applied.
    ActivityCompleted {
        /// The acting agent.
        agent_id: AgentId,
        /// Which activity ran.
        activity: Activity,
        /// How it turned out.
        outcome: Outcome,
        /// The step the activity ran in.
        step: u64,
    },
    /// An activity failed; no deltas were applied for the agent.
    ActivityFailed {
        /// The acting agent.
        agent_id: AgentId,
        /// Which activity was attempted.
        activity: Activity,
        /// Failure description.
        reason: String,
        /// The step the failure happened in.
        step: u64,
    },
    /// A checkpoint pass finished.
    CheckpointSaved {
        /// The step the checkpoint ran in.
        step: u64,
        /// Number of agents persisted.
        agents_saved: usize,
    },
}

/// A subscriber callback. Invoked synchronously for every emitted event.
pub type Subscriber = Box<dyn Fn(&CommunityEvent) + Send + Sync>;

/// Synchronous publish-subscribe bus for [`CommunityEvent`]s.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus.
    pub const fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Register a subscriber. Subscribers are invoked in registration order.
    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    /// Deliver an event to every subscriber.
    pub fn emit(&self, event: &CommunityEvent) {
        debug!(?event, "Event emitted");
        for subscriber in &self.subscribers {
            subscriber(event);
        }
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn events_reach_every_subscriber() {
        let mut bus = EventBus::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&first);
        bus.subscribe(Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        let c = Arc::clone(&second);
        bus.subscribe(Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        bus.emit(&CommunityEvent::AgentRegistered {
            agent_id: AgentId::new(),
            stage: Stage::Apprentice,
        });
        bus.emit(&CommunityEvent::CheckpointSaved {
            step: 20,
            agents_saved: 5,
        });

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn promotion_event_serializes_with_kind_tag() {
        let event = CommunityEvent::AgentPromoted {
            agent_id: AgentId::new(),
            from_stage: Stage::Apprentice,
            to_stage: Stage::Practitioner,
            step: 10,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"agent_promoted\""));
    }
}
