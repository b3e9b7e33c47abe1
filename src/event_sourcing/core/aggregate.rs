use super::event::EventEnvelope;

// ============================================================================
// Aggregate Root Pattern - Event Sourcing Core
// ============================================================================
//
// Key Principles:
// 1. State is derived from events (not stored directly)
// 2. Commands are decided against current state and emit events
// 3. Events represent facts that have already happened
// 4. Replaying the same history always yields the same state
// 5. Unknown event kinds are folded as no-ops (forward compatibility)
//
// This is the GENERIC aggregate trait that works for ANY domain aggregate.
//
// ============================================================================

/// Generic Aggregate trait - all event-sourced aggregates implement this
///
/// Aggregates start empty (`Default`), fold zero or more historical events on
/// load, and handle one command per hydration. `handle` takes `&mut self`
/// because every operation folds its own output events before returning them,
/// so the caller observes consistent post-state.
///
/// `apply` is infallible: a fold over a legal history must be total. Event
/// kinds the aggregate does not recognise are ignored, never rejected.
pub trait Aggregate: Default + Send + Sync {
    type Event;
    type Command;
    type Error;

    /// Fold a single event into the aggregate state.
    fn apply(&mut self, event: &Self::Event);

    /// Decide what events a command produces given current state, folding
    /// them into state before returning. An empty vec means the command had
    /// no effect (preconditions not met) - that is a no-op, not an error.
    fn handle(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Rebuild state by replaying a full event history in append order.
    fn load_from_history(events: &[EventEnvelope<Self::Event>]) -> Self {
        let mut aggregate = Self::default();
        for envelope in events {
            aggregate.apply(&envelope.event_data);
        }
        aggregate
    }
}
