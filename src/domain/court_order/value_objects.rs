use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Court Order Value Objects
// ============================================================================

/// A result record hanging off the order's originating hearing result.
/// Child results determine whether the unpaid-work extension applies.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JudicialChildResult {
    pub judicial_result_type_id: Uuid,
    pub label: Option<String>,
}

/// Links the order to an offence on a prosecution case.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CourtOrderOffence {
    pub prosecution_case_id: Uuid,
    pub offence_id: Uuid,
}

/// The authoritative business view of one court order.
///
/// Treated as an immutable value: a creation event replaces it wholesale,
/// and a child-results update constructs a fresh copy with the affected
/// fields overwritten (see [`CourtOrder::with_child_results`]).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CourtOrder {
    pub id: Uuid,
    pub master_defendant_id: Uuid,
    pub ordering_hearing_id: Uuid,
    pub judicial_result_type_id: Uuid,
    pub label: Option<String>,
    pub ordering_court: Option<String>,
    pub order_date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    /// Tri-state: unknown until a resulting has computed it.
    pub is_unpaid_work: Option<bool>,
    pub is_sjp_order: Option<bool>,
    pub can_be_subject_of_breach_proceedings: Option<bool>,
    pub can_be_subject_of_variation_proceedings: Option<bool>,
    pub defendant_ids: Vec<Uuid>,
    pub court_order_offences: Vec<CourtOrderOffence>,
    pub judicial_child_results: Vec<JudicialChildResult>,
}

impl CourtOrder {
    /// Copy of this order with child results, unpaid-work flag and expiry
    /// date overwritten; all other fields unchanged.
    pub fn with_child_results(
        &self,
        judicial_child_results: Vec<JudicialChildResult>,
        is_unpaid_work: Option<bool>,
        expiry_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            judicial_child_results,
            is_unpaid_work,
            expiry_date,
            ..self.clone()
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
