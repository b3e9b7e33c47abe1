use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::CourtOrdersConfig;
use crate::event_sourcing::{Aggregate, DomainEvent, EventEnvelope, EventStore};
use crate::metrics::Metrics;
use crate::services::{ProgressionService, ReferenceDataService};

use super::aggregate::CourtOrderAggregate;
use super::commands::CourtOrderCommand;
use super::events::CourtOrderEvent;
use super::value_objects::CourtOrder;

// ============================================================================
// Court Order Command Handler
// ============================================================================
//
// Orchestrates: request -> resolve facts -> aggregate -> events -> store.
//
// The aggregate performs no I/O, so this layer resolves everything it needs
// first: the unpaid-work community-order flag from reference data, the
// configured type-id allow-list, and (for the patch commands) the child
// results and authoritative end date from the progression service.
//
// A command that produces no events is a no-op, not an error: nothing is
// appended and the stream version is left unchanged.
//
// ============================================================================

/// Validity amendment request. `reset_to_original_end_date` routes between
/// the update and reset operations; `new_end_date` is only consulted for
/// updates.
#[derive(Debug, Clone)]
pub struct UpdateCourtOrderValidity {
    pub court_order_id: Uuid,
    pub application_id: Uuid,
    pub new_end_date: Option<NaiveDate>,
    pub reset_to_original_end_date: Option<bool>,
}

pub struct CourtOrderCommandHandler {
    event_store: Arc<EventStore<CourtOrderEvent>>,
    reference_data: Arc<dyn ReferenceDataService>,
    progression: Arc<dyn ProgressionService>,
    config: CourtOrdersConfig,
    metrics: Arc<Metrics>,
}

impl CourtOrderCommandHandler {
    pub fn new(
        event_store: Arc<EventStore<CourtOrderEvent>>,
        reference_data: Arc<dyn ReferenceDataService>,
        progression: Arc<dyn ProgressionService>,
        config: CourtOrdersConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            event_store,
            reference_data,
            progression,
            config,
            metrics,
        }
    }

    /// Request a court order (or its supersession).
    pub async fn create_court_order(&self, court_order: CourtOrder) -> Result<i64> {
        let is_unpaid_work_community_order_result = self
            .is_unpaid_work_community_order(court_order.judicial_result_type_id)
            .await?;
        let aggregate_id = court_order.id;
        let command = CourtOrderCommand::Create {
            id: aggregate_id,
            is_unpaid_work_community_order_result,
            unpaid_work_judicial_type_ids: self.config.unpaid_work_judicial_type_ids.clone(),
            court_order,
        };
        self.execute(aggregate_id, command).await
    }

    /// Withdraw a court order.
    pub async fn remove_court_order(&self, court_order_id: Uuid) -> Result<i64> {
        self.execute(court_order_id, CourtOrderCommand::Remove { court_order_id })
            .await
    }

    /// Amend or reset a court order's validity period.
    pub async fn update_court_order_validity(
        &self,
        request: UpdateCourtOrderValidity,
    ) -> Result<i64> {
        let command = if request.reset_to_original_end_date.unwrap_or(false) {
            CourtOrderCommand::ResetValidity {
                court_order_id: request.court_order_id,
                application_id: request.application_id,
            }
        } else {
            CourtOrderCommand::UpdateValidity {
                court_order_id: request.court_order_id,
                application_id: request.application_id,
                new_end_date: request
                    .new_end_date
                    .context("A new end date is required when not resetting")?,
            }
        };
        self.execute(request.court_order_id, command).await
    }

    /// Recalculate child judicial results for historical orders, deriving
    /// the unpaid-work flag and expiry date from the orders' own state.
    pub async fn patch_update_judicial_child_results(
        &self,
        court_order_ids: Vec<Uuid>,
    ) -> Result<()> {
        for court_order_id in court_order_ids {
            let (aggregate, version) = self.load(court_order_id).await?;
            let current = Self::current_order(&aggregate, court_order_id)?;

            let response = self
                .progression
                .get_judicial_child_results(
                    current.ordering_hearing_id,
                    current.master_defendant_id,
                    current.judicial_result_type_id,
                )
                .await?;
            if response.judicial_child_results.is_empty() {
                tracing::debug!(%court_order_id, "no child results to patch");
                continue;
            }

            let command = CourtOrderCommand::UpdateJudicialChildResults {
                court_order_id,
                judicial_child_results: response.judicial_child_results,
                is_unpaid_work_community_order_result: self
                    .is_unpaid_work_community_order(current.judicial_result_type_id)
                    .await?,
                unpaid_work_judicial_type_ids: self.config.unpaid_work_judicial_type_ids.clone(),
            };
            self.execute_loaded(court_order_id, aggregate, version, command)
                .await?;
        }
        Ok(())
    }

    /// Same as [`Self::patch_update_judicial_child_results`], but the expiry
    /// is derived from the authoritative end date held by the progression
    /// service rather than this stream's own history.
    pub async fn patch_update_judicial_child_results_v2(
        &self,
        court_order_ids: Vec<Uuid>,
    ) -> Result<()> {
        for court_order_id in court_order_ids {
            let (aggregate, version) = self.load(court_order_id).await?;
            let current = Self::current_order(&aggregate, court_order_id)?;

            let response = self
                .progression
                .get_judicial_child_results_v2(
                    current.ordering_hearing_id,
                    current.master_defendant_id,
                    current.judicial_result_type_id,
                )
                .await?;
            if response.judicial_child_results.is_empty() {
                tracing::debug!(%court_order_id, "no child results to patch");
                continue;
            }

            let command = CourtOrderCommand::UpdateJudicialChildResultsV2 {
                court_order_id,
                judicial_child_results: response.judicial_child_results,
                is_unpaid_work_community_order_result: self
                    .is_unpaid_work_community_order(current.judicial_result_type_id)
                    .await?,
                unpaid_work_judicial_type_ids: self.config.unpaid_work_judicial_type_ids.clone(),
                latest_end_date: response.latest_end_date,
            };
            self.execute_loaded(court_order_id, aggregate, version, command)
                .await?;
        }
        Ok(())
    }

    async fn execute(&self, aggregate_id: Uuid, command: CourtOrderCommand) -> Result<i64> {
        let (aggregate, expected_version) = self.load(aggregate_id).await?;
        self.execute_loaded(aggregate_id, aggregate, expected_version, command)
            .await
    }

    async fn execute_loaded(
        &self,
        aggregate_id: Uuid,
        mut aggregate: CourtOrderAggregate,
        expected_version: i64,
        command: CourtOrderCommand,
    ) -> Result<i64> {
        let command_name = command_name(&command);
        let started = Instant::now();
        self.metrics.record_command_received(command_name);

        let events = aggregate
            .handle(&command)
            .with_context(|| format!("Command {command_name} failed for {aggregate_id}"))?;

        if events.is_empty() {
            tracing::debug!(%aggregate_id, command = command_name, "command had no effect");
            self.metrics.record_command_noop(command_name);
            self.metrics
                .observe_command_duration(command_name, started.elapsed().as_secs_f64());
            return Ok(expected_version);
        }

        let correlation_id = Uuid::new_v4();
        let mut envelopes = Vec::with_capacity(events.len());
        for (offset, event) in events.into_iter().enumerate() {
            self.metrics.record_event_appended(event.event_type());
            envelopes.push(EventEnvelope::new(
                aggregate_id,
                expected_version + 1 + offset as i64,
                event,
                correlation_id,
            ));
        }

        let new_version = self
            .event_store
            .append_events(aggregate_id, expected_version, envelopes)
            .await?;

        tracing::info!(
            %aggregate_id,
            command = command_name,
            new_version,
            "command processed"
        );
        self.metrics
            .observe_command_duration(command_name, started.elapsed().as_secs_f64());
        Ok(new_version)
    }

    async fn load(&self, aggregate_id: Uuid) -> Result<(CourtOrderAggregate, i64)> {
        self.event_store.load_aggregate(aggregate_id).await
    }

    fn current_order(
        aggregate: &CourtOrderAggregate,
        court_order_id: Uuid,
    ) -> Result<CourtOrder> {
        match aggregate.current() {
            Some(order) => Ok(order.clone()),
            None => bail!("No court order has been created for {court_order_id}"),
        }
    }

    async fn is_unpaid_work_community_order(&self, judicial_result_type_id: Uuid) -> Result<bool> {
        let definition = self
            .reference_data
            .get_result_definition(judicial_result_type_id)
            .await?;
        Ok(definition
            .unpaid_work_extension_community_ord_yro
            .unwrap_or(false))
    }
}

fn command_name(command: &CourtOrderCommand) -> &'static str {
    match command {
        CourtOrderCommand::Create { .. } => "create-court-order",
        CourtOrderCommand::Remove { .. } => "remove-court-order",
        CourtOrderCommand::UpdateValidity { .. } => "update-court-order-validity",
        CourtOrderCommand::ResetValidity { .. } => "reset-court-order-validity",
        CourtOrderCommand::UpdateJudicialChildResults { .. } => {
            "patch-update-judicial-child-results"
        }
        CourtOrderCommand::UpdateJudicialChildResultsV2 { .. } => {
            "patch-update-judicial-child-results-v2"
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
