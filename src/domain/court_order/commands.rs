use chrono::NaiveDate;
use uuid::Uuid;

use super::value_objects::{CourtOrder, JudicialChildResult};

// ============================================================================
// Court Order Commands - Represent caller intent plus resolved facts
// ============================================================================
//
// The aggregate performs no I/O: commands carry the externally-resolved
// facts (the community-order flag from reference data, the configured
// unpaid-work type-id allow-list, and for the V2 patch the authoritative
// end date from the progression service) alongside the intent itself.
//
// ============================================================================

#[derive(Debug, Clone)]
pub enum CourtOrderCommand {
    Create {
        id: Uuid,
        court_order: CourtOrder,
        is_unpaid_work_community_order_result: bool,
        unpaid_work_judicial_type_ids: Vec<Uuid>,
    },
    Remove {
        court_order_id: Uuid,
    },
    UpdateValidity {
        court_order_id: Uuid,
        application_id: Uuid,
        new_end_date: NaiveDate,
    },
    ResetValidity {
        court_order_id: Uuid,
        application_id: Uuid,
    },
    UpdateJudicialChildResults {
        court_order_id: Uuid,
        judicial_child_results: Vec<JudicialChildResult>,
        is_unpaid_work_community_order_result: bool,
        unpaid_work_judicial_type_ids: Vec<Uuid>,
    },
    UpdateJudicialChildResultsV2 {
        court_order_id: Uuid,
        judicial_child_results: Vec<JudicialChildResult>,
        is_unpaid_work_community_order_result: bool,
        unpaid_work_judicial_type_ids: Vec<Uuid>,
        latest_end_date: NaiveDate,
    },
}
