use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::court_order::CourtOrder;

use super::read_model::CourtOrderReadStore;

// ============================================================================
// Court Order Query View
// ============================================================================
//
// Serves the court-order queries from the materialized read model. Rows are
// returned with `show_unpaid_work_warning` computed against the hearing date
// the caller is asking about.
//
// ============================================================================

/// One order as served to query callers.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CourtOrderView {
    pub court_order: CourtOrder,
    pub show_unpaid_work_warning: bool,
}

pub struct CourtOrderQueryView {
    read_store: Arc<CourtOrderReadStore>,
}

impl CourtOrderQueryView {
    pub fn new(read_store: Arc<CourtOrderReadStore>) -> Self {
        Self { read_store }
    }

    /// Orders for a defendant still in force after the hearing date
    /// (defaults to today).
    pub async fn get_court_orders_by_defendant(
        &self,
        defendant_id: Uuid,
        hearing_date: Option<NaiveDate>,
    ) -> Vec<CourtOrderView> {
        let cutoff = hearing_date.unwrap_or_else(|| Utc::now().date_naive());
        self.read_store
            .find_by_defendant_and_expiry(defendant_id, cutoff)
            .await
            .into_iter()
            .map(|record| to_view(record.payload, cutoff))
            .collect()
    }

    /// Orders matching any of the (defendant id, offence date) pairs, with
    /// the warning computed against the hearing date.
    pub async fn get_court_orders_by_defendant_and_offence_date(
        &self,
        criteria: &[(Uuid, NaiveDate)],
        hearing_date: NaiveDate,
    ) -> Vec<CourtOrderView> {
        let mut views = Vec::new();
        for (defendant_id, offence_date) in criteria {
            let records = self
                .read_store
                .find_by_defendant_and_expiry(*defendant_id, *offence_date)
                .await;
            views.extend(
                records
                    .into_iter()
                    .map(|record| to_view(record.payload, hearing_date)),
            );
        }
        views
    }

    /// Orders linked to a prosecution case for a defendant.
    pub async fn get_court_orders_by_case(
        &self,
        prosecution_case_id: Uuid,
        defendant_id: Uuid,
    ) -> Vec<CourtOrder> {
        self.read_store
            .find_by_case_and_defendant(prosecution_case_id, defendant_id)
            .await
            .into_iter()
            .map(|record| record.payload)
            .collect()
    }

    /// Orders made at a hearing for a defendant on a sitting date.
    pub async fn get_court_orders_by_hearing_and_defendant(
        &self,
        defendant_id: Uuid,
        hearing_id: Uuid,
        sitting_date: NaiveDate,
    ) -> Vec<CourtOrder> {
        self.read_store
            .find_by_hearing_defendant_and_sitting_date(defendant_id, hearing_id, sitting_date)
            .await
            .into_iter()
            .map(|record| record.payload)
            .collect()
    }
}

fn to_view(court_order: CourtOrder, hearing_date: NaiveDate) -> CourtOrderView {
    let show_unpaid_work_warning =
        court_order.is_unpaid_work == Some(true) && hearing_date > court_order.end_date;
    CourtOrderView {
        court_order,
        show_unpaid_work_warning,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
