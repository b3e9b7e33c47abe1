use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{CourtOrder, JudicialChildResult};
use crate::event_sourcing::core::DomainEvent;

// ============================================================================
// Court Order Events - Domain Events for the Court Order Aggregate
// ============================================================================

/// Court Order Event - union type for all court order events.
///
/// The `Unknown` arm absorbs event kinds appended by newer writers: replay
/// folds them as no-ops instead of rejecting the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CourtOrderEvent {
    #[serde(rename = "CourtOrderRequested")]
    Requested(CourtOrderRequested),
    #[serde(rename = "CourtOrderRemoved")]
    Removed(CourtOrderRemoved),
    #[serde(rename = "CourtOrderValidityUpdated")]
    ValidityUpdated(CourtOrderValidityUpdated),
    #[serde(rename = "JudicialChildResultsUpdated")]
    JudicialChildResultsUpdated(JudicialChildResultsUpdated),
    #[serde(other)]
    Unknown,
}

impl DomainEvent for CourtOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Requested(_) => "CourtOrderRequested",
            Self::Removed(_) => "CourtOrderRemoved",
            Self::ValidityUpdated(_) => "CourtOrderValidityUpdated",
            Self::JudicialChildResultsUpdated(_) => "JudicialChildResultsUpdated",
            Self::Unknown => "Unknown",
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// A court order (or its supersession) now exists with this snapshot.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CourtOrderRequested {
    pub court_order_id: Uuid,
    pub court_order: CourtOrder,
}

/// The order is withdrawn.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CourtOrderRemoved {
    pub court_order_id: Uuid,
}

/// The order's end date has been amended via an application, or reset.
///
/// `expiry_date` is absent on a reset; the projection recomputes it from the
/// restored end date.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CourtOrderValidityUpdated {
    pub court_order_id: Uuid,
    pub application_id: Uuid,
    pub new_end_date: NaiveDate,
    pub original_end_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
}

/// Child judicial results (and the derived unpaid-work flag and expiry)
/// recalculated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JudicialChildResultsUpdated {
    pub court_order_id: Uuid,
    pub judicial_child_results: Vec<JudicialChildResult>,
    pub is_unpaid_work: bool,
    pub expiry_date: NaiveDate,
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_event_round_trip() {
        let event = CourtOrderEvent::Removed(CourtOrderRemoved {
            court_order_id: Uuid::new_v4(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"CourtOrderRemoved\""));
        let deserialized: CourtOrderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_validity_updated_round_trip() {
        let event = CourtOrderEvent::ValidityUpdated(CourtOrderValidityUpdated {
            court_order_id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            new_end_date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            original_end_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            expiry_date: None,
        });
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: CourtOrderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_unknown_event_kind_deserializes_to_unknown() {
        // An event kind appended by a future writer
        let json = r#"{"type":"CourtOrderArchived","data":{"court_order_id":"8d8b30fb-1f61-4f33-8b27-6a8ebc8d9e0f"}}"#;
        let deserialized: CourtOrderEvent = serde_json::from_str(json).unwrap();
        assert_eq!(deserialized, CourtOrderEvent::Unknown);
    }

    #[test]
    fn test_event_type_tags() {
        let removed = CourtOrderEvent::Removed(CourtOrderRemoved {
            court_order_id: Uuid::new_v4(),
        });
        assert_eq!(removed.event_type(), "CourtOrderRemoved");
        assert_eq!(CourtOrderEvent::Unknown.event_type(), "Unknown");
    }
}
