use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

mod config;
mod domain;
mod event_sourcing;
mod metrics;
mod projection;
mod services;

use config::CourtOrdersConfig;
use domain::court_order::{
    CourtOrder, CourtOrderCommandHandler, CourtOrderEvent, CourtOrderOffence,
    JudicialChildResult, UpdateCourtOrderValidity,
};
use event_sourcing::EventStore;
use projection::{CourtOrderProjector, CourtOrderQueryView, CourtOrderReadStore};
use services::{
    InMemoryProgressionService, InMemoryReferenceDataService, JudicialChildResultsResponse,
    JudicialChildResultsV2Response, ResultDefinition,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,court_orders=debug")),
        )
        .init();

    tracing::info!("Starting court orders service");

    let config = CourtOrdersConfig::from_env()?;
    let unpaid_work_type_id = *config
        .unpaid_work_judicial_type_ids
        .first()
        .context("Unpaid-work judicial type id allow-list is empty")?;

    let metrics = Arc::new(metrics::Metrics::new()?);
    let event_store = Arc::new(EventStore::<CourtOrderEvent>::new());
    let reference_data = Arc::new(InMemoryReferenceDataService::new());
    let progression = Arc::new(InMemoryProgressionService::new());
    let read_store = Arc::new(CourtOrderReadStore::new());

    // Read side: fold appended events into the query view as they arrive
    let projector = Arc::new(CourtOrderProjector::new(read_store.clone(), metrics.clone()));
    let subscription = event_store.subscribe();
    let projector_task = {
        let projector = projector.clone();
        tokio::spawn(async move { projector.run(subscription).await })
    };

    let handler = CourtOrderCommandHandler::new(
        event_store.clone(),
        reference_data.clone(),
        progression.clone(),
        config,
        metrics.clone(),
    );
    let queries = CourtOrderQueryView::new(read_store.clone());

    // === Seed collaborator services ===
    let judicial_result_type_id = Uuid::new_v4();
    reference_data
        .insert(ResultDefinition {
            id: judicial_result_type_id,
            label: Some("Community Order".to_string()),
            unpaid_work_extension_community_ord_yro: Some(true),
        })
        .await;

    // === Walk one order through its lifecycle ===
    let court_order_id = Uuid::new_v4();
    let master_defendant_id = Uuid::new_v4();
    let ordering_hearing_id = Uuid::new_v4();
    let prosecution_case_id = Uuid::new_v4();
    let end_date = NaiveDate::from_ymd_opt(2024, 1, 10).context("valid date")?;

    let court_order = CourtOrder {
        id: court_order_id,
        master_defendant_id,
        ordering_hearing_id,
        judicial_result_type_id,
        label: Some("Community Order".to_string()),
        ordering_court: Some("Lavender Hill Magistrates' Court".to_string()),
        order_date: end_date,
        start_date: end_date,
        end_date,
        expiry_date: None,
        is_unpaid_work: None,
        is_sjp_order: Some(false),
        can_be_subject_of_breach_proceedings: Some(true),
        can_be_subject_of_variation_proceedings: Some(true),
        defendant_ids: vec![master_defendant_id],
        court_order_offences: vec![CourtOrderOffence {
            prosecution_case_id,
            offence_id: Uuid::new_v4(),
        }],
        judicial_child_results: vec![JudicialChildResult {
            judicial_result_type_id: unpaid_work_type_id,
            label: Some("Unpaid work requirement".to_string()),
        }],
    };

    tracing::info!(%court_order_id, "1. create court order (unpaid work community order)");
    handler.create_court_order(court_order.clone()).await?;

    tracing::info!("2. amend the validity period via an application");
    let application_id = Uuid::new_v4();
    let amended_end = NaiveDate::from_ymd_opt(2024, 2, 10).context("valid date")?;
    handler
        .update_court_order_validity(UpdateCourtOrderValidity {
            court_order_id,
            application_id,
            new_end_date: Some(amended_end),
            reset_to_original_end_date: None,
        })
        .await?;

    tracing::info!("3. re-submit the same amendment (absorbed as a no-op)");
    handler
        .update_court_order_validity(UpdateCourtOrderValidity {
            court_order_id,
            application_id,
            new_end_date: Some(amended_end),
            reset_to_original_end_date: None,
        })
        .await?;

    tracing::info!("4. reset the validity period to the original end date");
    handler
        .update_court_order_validity(UpdateCourtOrderValidity {
            court_order_id,
            application_id,
            new_end_date: None,
            reset_to_original_end_date: Some(true),
        })
        .await?;

    tracing::info!("5. re-result the hearing (supersession: removed then requested)");
    handler.create_court_order(court_order).await?;

    tracing::info!("6. patch child results from the progression lookup");
    let progression_key = (
        ordering_hearing_id,
        master_defendant_id,
        judicial_result_type_id,
    );
    let child_results = vec![JudicialChildResult {
        judicial_result_type_id: unpaid_work_type_id,
        label: Some("Unpaid work requirement".to_string()),
    }];
    progression
        .insert(
            progression_key,
            JudicialChildResultsResponse {
                judicial_child_results: child_results.clone(),
            },
        )
        .await;
    handler
        .patch_update_judicial_child_results(vec![court_order_id])
        .await?;

    tracing::info!("7. patch again against the authoritative end date (v2)");
    progression
        .insert_v2(
            progression_key,
            JudicialChildResultsV2Response {
                judicial_child_results: child_results,
                latest_end_date: end_date,
            },
        )
        .await;
    handler
        .patch_update_judicial_child_results_v2(vec![court_order_id])
        .await?;

    // Let the projector drain the append feed before querying
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let hearing_date = NaiveDate::from_ymd_opt(2024, 6, 1).context("valid date")?;
    let in_force = queries
        .get_court_orders_by_defendant(master_defendant_id, Some(hearing_date))
        .await;
    for view in &in_force {
        tracing::info!(
            court_order_id = %view.court_order.id,
            expiry_date = ?view.court_order.expiry_date,
            show_unpaid_work_warning = view.show_unpaid_work_warning,
            "order in force at hearing date"
        );
    }

    let at_hearing = queries
        .get_court_orders_by_hearing_and_defendant(master_defendant_id, ordering_hearing_id, end_date)
        .await;
    tracing::info!(count = at_hearing.len(), "orders made at the originating hearing");

    let on_case = queries
        .get_court_orders_by_case(prosecution_case_id, master_defendant_id)
        .await;
    tracing::info!(count = on_case.len(), "orders linked to the prosecution case");

    let by_offence_date = queries
        .get_court_orders_by_defendant_and_offence_date(
            &[(master_defendant_id, end_date)],
            hearing_date,
        )
        .await;
    tracing::info!(
        count = by_offence_date.len(),
        "orders in force at the offence date"
    );

    tracing::info!("8. withdraw the order");
    handler.remove_court_order(court_order_id).await?;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let after_removal = queries
        .get_court_orders_by_defendant(master_defendant_id, Some(hearing_date))
        .await;
    tracing::info!(
        count = after_removal.len(),
        "orders in force after withdrawal"
    );

    tracing::info!("metrics:\n{}", metrics.render()?);

    projector_task.abort();
    Ok(())
}
