use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::court_order::{
    CourtOrderEvent, CourtOrderRemoved, CourtOrderRequested, CourtOrderValidityUpdated,
    JudicialChildResultsUpdated,
};
use crate::event_sourcing::EventEnvelope;
use crate::metrics::Metrics;

use super::read_model::{CourtOrderReadStore, CourtOrderRecord};

// ============================================================================
// Court Order Projector
// ============================================================================
//
// One handler per event kind. The aggregate may legitimately emit duplicate
// Removed events (removal is unconditional); the not-removed lookup makes
// the second application a no-op here.
//
// ============================================================================

pub struct CourtOrderProjector {
    read_store: Arc<CourtOrderReadStore>,
    metrics: Arc<Metrics>,
}

impl CourtOrderProjector {
    pub fn new(read_store: Arc<CourtOrderReadStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            read_store,
            metrics,
        }
    }

    /// Fold one envelope into the read model.
    pub async fn handle(&self, envelope: &EventEnvelope<CourtOrderEvent>) {
        match &envelope.event_data {
            CourtOrderEvent::Requested(e) => self.on_requested(e).await,
            CourtOrderEvent::Removed(e) => self.on_removed(e).await,
            CourtOrderEvent::ValidityUpdated(e) => self.on_validity_updated(e).await,
            CourtOrderEvent::JudicialChildResultsUpdated(e) => {
                self.on_judicial_child_results_updated(e).await
            }
            CourtOrderEvent::Unknown => {
                tracing::trace!(event_type = %envelope.event_type, "ignoring unknown event kind");
                return;
            }
        }
        self.metrics.record_projection_update(&envelope.event_type);
    }

    /// Consume a store subscription until it closes.
    pub async fn run(&self, mut rx: broadcast::Receiver<EventEnvelope<CourtOrderEvent>>) {
        loop {
            match rx.recv().await {
                Ok(envelope) => self.handle(&envelope).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "projection lagged behind the event stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn on_requested(&self, event: &CourtOrderRequested) {
        let order = &event.court_order;
        let record = match self
            .read_store
            .find_by_court_order_id_not_removed(event.court_order_id)
            .await
        {
            Some(mut existing) => {
                existing.payload = order.clone();
                existing.removed = false;
                existing
            }
            None => CourtOrderRecord {
                id: Uuid::new_v4(),
                court_order_id: order.id,
                defendant_id: order.master_defendant_id,
                hearing_id: order.ordering_hearing_id,
                sitting_date: order.order_date,
                expiry_date: order.expiry_date.unwrap_or(order.end_date),
                removed: false,
                payload: order.clone(),
            },
        };
        self.read_store.save(record).await;
    }

    async fn on_removed(&self, event: &CourtOrderRemoved) {
        if let Some(mut record) = self
            .read_store
            .find_by_court_order_id_not_removed(event.court_order_id)
            .await
        {
            record.removed = true;
            self.read_store.save(record).await;
        }
    }

    async fn on_validity_updated(&self, event: &CourtOrderValidityUpdated) {
        if let Some(mut record) = self
            .read_store
            .find_by_court_order_id_not_removed(event.court_order_id)
            .await
        {
            // A reset carries no expiry; it falls back to the restored end date
            let expiry_date = event.expiry_date.unwrap_or(event.new_end_date);
            record.payload.end_date = event.new_end_date;
            record.payload.expiry_date = Some(expiry_date);
            record.expiry_date = expiry_date;
            self.read_store.save(record).await;
        }
    }

    async fn on_judicial_child_results_updated(&self, event: &JudicialChildResultsUpdated) {
        if let Some(mut record) = self
            .read_store
            .find_by_court_order_id_not_removed(event.court_order_id)
            .await
        {
            record.payload = record.payload.with_child_results(
                event.judicial_child_results.clone(),
                Some(event.is_unpaid_work),
                Some(event.expiry_date),
            );
            record.expiry_date = event.expiry_date;
            self.read_store.save(record).await;
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
