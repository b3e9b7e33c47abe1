use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::court_order::CourtOrder;

// ============================================================================
// Court Order Read Model
// ============================================================================

/// One materialized row of the court-order view.
///
/// The indexed columns (defendant, hearing, sitting date, expiry) are captured
/// at creation; the full snapshot rides along as the payload and is patched by
/// subsequent events.
#[derive(Debug, Clone, PartialEq)]
pub struct CourtOrderRecord {
    pub id: Uuid,
    pub court_order_id: Uuid,
    pub defendant_id: Uuid,
    pub hearing_id: Uuid,
    pub sitting_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub removed: bool,
    pub payload: CourtOrder,
}

/// In-memory store of court order records.
#[derive(Default)]
pub struct CourtOrderReadStore {
    records: RwLock<Vec<CourtOrderRecord>>,
}

impl CourtOrderReadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by row id.
    pub async fn save(&self, record: CourtOrderRecord) {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// The active (not removed) record for a court order, if any.
    pub async fn find_by_court_order_id_not_removed(
        &self,
        court_order_id: Uuid,
    ) -> Option<CourtOrderRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .find(|r| r.court_order_id == court_order_id && !r.removed)
            .cloned()
    }

    /// Active records for a defendant whose expiry falls strictly after the
    /// given date.
    pub async fn find_by_defendant_and_expiry(
        &self,
        defendant_id: Uuid,
        expiry_after: NaiveDate,
    ) -> Vec<CourtOrderRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|r| r.defendant_id == defendant_id && !r.removed && r.expiry_date > expiry_after)
            .cloned()
            .collect()
    }

    pub async fn find_by_hearing_defendant_and_sitting_date(
        &self,
        defendant_id: Uuid,
        hearing_id: Uuid,
        sitting_date: NaiveDate,
    ) -> Vec<CourtOrderRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|r| {
                r.defendant_id == defendant_id
                    && r.hearing_id == hearing_id
                    && r.sitting_date == sitting_date
                    && !r.removed
            })
            .cloned()
            .collect()
    }

    /// Active records for a defendant linked to a prosecution case through
    /// one of the order's offences.
    pub async fn find_by_case_and_defendant(
        &self,
        prosecution_case_id: Uuid,
        defendant_id: Uuid,
    ) -> Vec<CourtOrderRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|r| {
                r.defendant_id == defendant_id
                    && !r.removed
                    && r.payload
                        .court_order_offences
                        .iter()
                        .any(|offence| offence.prosecution_case_id == prosecution_case_id)
            })
            .cloned()
            .collect()
    }

    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}
