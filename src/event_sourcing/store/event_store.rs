use std::collections::HashMap;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::event_sourcing::core::{
    deserialize_event, serialize_event, Aggregate, DomainEvent, EventEnvelope,
};

// ============================================================================
// Generic Event Store - Append-Only Log of Events
// ============================================================================
//
// This is a GENERIC event store that works with ANY event type.
//
// Responsibilities:
// 1. Append events per aggregate stream (append-only, ordered)
// 2. Load full event history for replay
// 3. Ensure optimistic concurrency control per stream
// 4. Publish appended envelopes to in-process subscribers (projections)
//
// Storage is in-memory. Payloads are kept as serialized JSON rows so that
// replay runs through the same decode path a persistent store would,
// including tolerance of event kinds the current code does not know.
//
// ============================================================================

const PUBLISH_BUFFER: usize = 256;

/// One stored row of a stream.
#[derive(Clone, Debug)]
struct StoredEvent {
    event_id: Uuid,
    sequence_number: i64,
    event_type: String,
    event_json: String,
    causation_id: Option<Uuid>,
    correlation_id: Uuid,
    timestamp: DateTime<Utc>,
}

pub struct EventStore<E: DomainEvent> {
    streams: RwLock<HashMap<Uuid, Vec<StoredEvent>>>,
    publisher: broadcast::Sender<EventEnvelope<E>>,
}

impl<E: DomainEvent> EventStore<E> {
    pub fn new() -> Self {
        let (publisher, _) = broadcast::channel(PUBLISH_BUFFER);
        Self {
            streams: RwLock::new(HashMap::new()),
            publisher,
        }
    }

    /// Subscribe to envelopes as they are appended, in append order.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope<E>> {
        self.publisher.subscribe()
    }

    /// Append events to an aggregate stream.
    /// Returns the new version number after appending.
    pub async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<E>>,
    ) -> Result<i64> {
        if events.is_empty() {
            bail!("Cannot append empty event list");
        }

        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_id).or_default();

        // Check optimistic concurrency
        let current_version = stream.len() as i64;
        if current_version != expected_version {
            bail!(
                "Concurrency conflict on stream {}: expected version {}, but current is {}",
                aggregate_id,
                expected_version,
                current_version
            );
        }

        let mut new_version = expected_version;
        for envelope in &events {
            new_version += 1;
            stream.push(StoredEvent {
                event_id: envelope.event_id,
                sequence_number: new_version,
                event_type: envelope.event_type.clone(),
                event_json: serialize_event(&envelope.event_data)?,
                causation_id: envelope.causation_id,
                correlation_id: envelope.correlation_id,
                timestamp: envelope.timestamp,
            });
        }
        drop(streams);

        tracing::debug!(
            aggregate_id = %aggregate_id,
            appended = events.len(),
            new_version,
            "appended events to stream"
        );

        // Fan out to subscribers. A send error just means nobody is listening.
        for envelope in events {
            let _ = self.publisher.send(envelope);
        }

        Ok(new_version)
    }

    /// Load the full event history of a stream, in original append order.
    pub async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<EventEnvelope<E>>> {
        let streams = self.streams.read().await;
        let rows = streams.get(&aggregate_id).map(Vec::as_slice).unwrap_or(&[]);

        let mut envelopes = Vec::with_capacity(rows.len());
        for row in rows {
            envelopes.push(EventEnvelope {
                event_id: row.event_id,
                aggregate_id,
                sequence_number: row.sequence_number,
                event_type: row.event_type.clone(),
                event_data: deserialize_event(&row.event_json)?,
                causation_id: row.causation_id,
                correlation_id: row.correlation_id,
                timestamp: row.timestamp,
            });
        }
        Ok(envelopes)
    }

    /// Current version of a stream (0 when the stream does not exist yet).
    pub async fn current_version(&self, aggregate_id: Uuid) -> i64 {
        let streams = self.streams.read().await;
        streams.get(&aggregate_id).map_or(0, |s| s.len() as i64)
    }

    pub async fn aggregate_exists(&self, aggregate_id: Uuid) -> bool {
        self.current_version(aggregate_id).await > 0
    }

    /// Rehydrate an aggregate by full replay.
    /// Returns the aggregate together with the stream version for the
    /// subsequent optimistic append.
    pub async fn load_aggregate<A>(&self, aggregate_id: Uuid) -> Result<(A, i64)>
    where
        A: Aggregate<Event = E>,
    {
        let events = self.load_events(aggregate_id).await?;
        let version = events.len() as i64;
        Ok((A::load_from_history(&events), version))
    }
}

impl<E: DomainEvent> Default for EventStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
