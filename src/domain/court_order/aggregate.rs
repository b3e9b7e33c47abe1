use std::collections::HashMap;

use chrono::{Months, NaiveDate};
use uuid::Uuid;

use crate::event_sourcing::core::Aggregate;

use super::commands::CourtOrderCommand;
use super::errors::CourtOrderError;
use super::events::*;
use super::value_objects::{CourtOrder, JudicialChildResult};

// ============================================================================
// Court Order Aggregate - Domain Logic
// ============================================================================
//
// The consistency boundary for one court order's event stream. State is
// rebuilt by folding the stream on every command execution; there is no
// cross-command memory. Every operation folds its own output events before
// returning them, so the caller observes consistent post-state and the
// returned sequence can be appended as-is (Removed before Requested when a
// supersession closes an active order).
//
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourtOrderAggregate {
    /// Latest snapshot; absent until the first creation event folds.
    current: Option<CourtOrder>,
    removed: bool,

    /// End date captured at the most recent creation, supersessions included.
    original_end_date: Option<NaiveDate>,
    /// End date of the most recent validity update, if any.
    pending_new_end_date: Option<NaiveDate>,
    /// True once the last validity update folded the end date back to the
    /// original value.
    is_reset: bool,
    /// First original end date recorded per application. Write-once per key:
    /// later validity updates for the same application never overwrite it.
    original_end_date_by_application: HashMap<Uuid, NaiveDate>,
}

impl CourtOrderAggregate {
    /// The latest court order snapshot, if a creation event has been folded.
    pub fn current(&self) -> Option<&CourtOrder> {
        self.current.as_ref()
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Requests a court order. An active order is always closed first, so a
    /// re-result emits [Removed, Requested] in that order.
    pub fn create_court_order(
        &mut self,
        id: Uuid,
        requested: CourtOrder,
        is_unpaid_work_community_order_result: bool,
        unpaid_work_judicial_type_ids: &[Uuid],
    ) -> Vec<CourtOrderEvent> {
        let mut events = Vec::new();
        if self.current.is_some() && !self.removed {
            events.push(CourtOrderEvent::Removed(CourtOrderRemoved {
                court_order_id: id,
            }));
        }

        let is_unpaid_work = is_unpaid_work_community_order_result
            && has_unpaid_work_judicial_result_type(
                &requested.judicial_child_results,
                unpaid_work_judicial_type_ids,
            );

        // An end date amended via an application since the last resulting
        // must not be discarded by a re-result.
        let end_date = match self.pending_new_end_date {
            Some(pending) if pending != requested.end_date => pending,
            _ => requested.end_date,
        };

        let court_order = CourtOrder {
            end_date,
            expiry_date: Some(calculate_expiry_date(end_date, Some(is_unpaid_work))),
            is_unpaid_work: Some(is_unpaid_work),
            ..requested
        };
        events.push(CourtOrderEvent::Requested(CourtOrderRequested {
            court_order_id: id,
            court_order,
        }));

        self.apply_all(&events);
        events
    }

    /// Withdraws the order. Removing an already-removed order emits a
    /// harmless duplicate event, left to the projection to de-duplicate.
    pub fn remove_court_order(&mut self, id: Uuid) -> Vec<CourtOrderEvent> {
        let events = vec![CourtOrderEvent::Removed(CourtOrderRemoved {
            court_order_id: id,
        })];
        self.apply_all(&events);
        events
    }

    /// Amends the order's end date via an application.
    ///
    /// Re-submitting the amendment already pending yields no events; that
    /// guard keeps at-least-once command delivery from duplicating
    /// downstream effects. Requires a prior creation event.
    pub fn update_court_order(
        &mut self,
        court_order_id: Uuid,
        application_id: Uuid,
        new_end_date: NaiveDate,
    ) -> Result<Vec<CourtOrderEvent>, CourtOrderError> {
        if self.removed || self.pending_new_end_date == Some(new_end_date) {
            return Ok(Vec::new());
        }

        let current = self.current.as_ref().ok_or(CourtOrderError::NotCreated)?;
        let original_end_date = self.original_end_date.unwrap_or(current.end_date);
        let events = vec![CourtOrderEvent::ValidityUpdated(CourtOrderValidityUpdated {
            court_order_id,
            application_id,
            new_end_date,
            original_end_date,
            expiry_date: Some(calculate_expiry_date(
                original_end_date,
                current.is_unpaid_work,
            )),
        })];
        self.apply_all(&events);
        Ok(events)
    }

    /// Reverts a validity amendment to the end date recorded before the
    /// first amendment for this application. Emits nothing when the order is
    /// removed, no amendment was recorded for the application, or a reset
    /// has already taken effect.
    pub fn reset_court_order(
        &mut self,
        court_order_id: Uuid,
        application_id: Uuid,
    ) -> Vec<CourtOrderEvent> {
        let restored = match self.original_end_date_by_application.get(&application_id) {
            Some(date) if !self.removed && !self.is_reset => *date,
            _ => return Vec::new(),
        };

        let events = vec![CourtOrderEvent::ValidityUpdated(CourtOrderValidityUpdated {
            court_order_id,
            application_id,
            new_end_date: restored,
            original_end_date: self.original_end_date.unwrap_or(restored),
            // The projection recomputes expiry from the restored end date.
            expiry_date: None,
        })];
        self.apply_all(&events);
        events
    }

    /// Recalculates child judicial results and the derived unpaid-work flag
    /// and expiry date. The end date used for expiry is the pending amended
    /// value when one exists, else the current order's end date (which
    /// requires a prior creation event).
    pub fn update_judicial_child_result(
        &mut self,
        court_order_id: Uuid,
        judicial_child_results: Vec<JudicialChildResult>,
        is_unpaid_work_community_order_result: bool,
        unpaid_work_judicial_type_ids: &[Uuid],
    ) -> Result<Vec<CourtOrderEvent>, CourtOrderError> {
        let end_date = match self.pending_new_end_date {
            Some(pending) => pending,
            None => {
                self.current
                    .as_ref()
                    .ok_or(CourtOrderError::NotCreated)?
                    .end_date
            }
        };

        let is_unpaid_work = is_unpaid_work_community_order_result
            && has_unpaid_work_judicial_result_type(
                &judicial_child_results,
                unpaid_work_judicial_type_ids,
            );
        let events = vec![CourtOrderEvent::JudicialChildResultsUpdated(
            JudicialChildResultsUpdated {
                court_order_id,
                judicial_child_results,
                is_unpaid_work,
                expiry_date: calculate_expiry_date(end_date, Some(is_unpaid_work)),
            },
        )];
        self.apply_all(&events);
        Ok(events)
    }

    /// Same as [`Self::update_judicial_child_result`], but the end date is
    /// supplied by the caller, for when the authoritative value may have
    /// changed outside this order's own event history.
    pub fn update_judicial_child_result_v2(
        &mut self,
        court_order_id: Uuid,
        judicial_child_results: Vec<JudicialChildResult>,
        is_unpaid_work_community_order_result: bool,
        unpaid_work_judicial_type_ids: &[Uuid],
        latest_end_date: NaiveDate,
    ) -> Vec<CourtOrderEvent> {
        let is_unpaid_work = is_unpaid_work_community_order_result
            && has_unpaid_work_judicial_result_type(
                &judicial_child_results,
                unpaid_work_judicial_type_ids,
            );
        let events = vec![CourtOrderEvent::JudicialChildResultsUpdated(
            JudicialChildResultsUpdated {
                court_order_id,
                judicial_child_results,
                is_unpaid_work,
                expiry_date: calculate_expiry_date(latest_end_date, Some(is_unpaid_work)),
            },
        )];
        self.apply_all(&events);
        events
    }

    fn apply_all(&mut self, events: &[CourtOrderEvent]) {
        for event in events {
            self.apply(event);
        }
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for CourtOrderAggregate {
    type Event = CourtOrderEvent;
    type Command = CourtOrderCommand;
    type Error = CourtOrderError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CourtOrderEvent::Requested(e) => {
                self.original_end_date = Some(e.court_order.end_date);
                self.current = Some(e.court_order.clone());
                self.removed = false;
            }
            CourtOrderEvent::Removed(_) => {
                self.removed = true;
            }
            CourtOrderEvent::ValidityUpdated(e) => {
                self.original_end_date_by_application
                    .entry(e.application_id)
                    .or_insert(e.original_end_date);
                self.pending_new_end_date = Some(e.new_end_date);
                self.is_reset = self.original_end_date == Some(e.new_end_date);
            }
            CourtOrderEvent::JudicialChildResultsUpdated(e) => {
                if let Some(current) = self.current.take() {
                    self.current = Some(current.with_child_results(
                        e.judicial_child_results.clone(),
                        Some(e.is_unpaid_work),
                        Some(e.expiry_date),
                    ));
                }
            }
            // Kinds appended by newer writers fold as no-ops
            CourtOrderEvent::Unknown => {}
        }
    }

    fn handle(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CourtOrderCommand::Create {
                id,
                court_order,
                is_unpaid_work_community_order_result,
                unpaid_work_judicial_type_ids,
            } => Ok(self.create_court_order(
                *id,
                court_order.clone(),
                *is_unpaid_work_community_order_result,
                unpaid_work_judicial_type_ids,
            )),
            CourtOrderCommand::Remove { court_order_id } => {
                Ok(self.remove_court_order(*court_order_id))
            }
            CourtOrderCommand::UpdateValidity {
                court_order_id,
                application_id,
                new_end_date,
            } => self.update_court_order(*court_order_id, *application_id, *new_end_date),
            CourtOrderCommand::ResetValidity {
                court_order_id,
                application_id,
            } => Ok(self.reset_court_order(*court_order_id, *application_id)),
            CourtOrderCommand::UpdateJudicialChildResults {
                court_order_id,
                judicial_child_results,
                is_unpaid_work_community_order_result,
                unpaid_work_judicial_type_ids,
            } => self.update_judicial_child_result(
                *court_order_id,
                judicial_child_results.clone(),
                *is_unpaid_work_community_order_result,
                unpaid_work_judicial_type_ids,
            ),
            CourtOrderCommand::UpdateJudicialChildResultsV2 {
                court_order_id,
                judicial_child_results,
                is_unpaid_work_community_order_result,
                unpaid_work_judicial_type_ids,
                latest_end_date,
            } => Ok(self.update_judicial_child_result_v2(
                *court_order_id,
                judicial_child_results.clone(),
                *is_unpaid_work_community_order_result,
                unpaid_work_judicial_type_ids,
                *latest_end_date,
            )),
        }
    }
}

// ============================================================================
// Expiry / Unpaid-Work Rules
// ============================================================================

/// Unpaid-work orders expire one year after their end date; everything else
/// expires on the end date itself. An absent flag means not unpaid work.
pub fn calculate_expiry_date(end_date: NaiveDate, is_unpaid_work: Option<bool>) -> NaiveDate {
    if is_unpaid_work == Some(true) {
        end_date + Months::new(12)
    } else {
        end_date
    }
}

/// True iff at least one child result's judicial-result-type id is in the
/// configured unpaid-work allow-list.
fn has_unpaid_work_judicial_result_type(
    judicial_child_results: &[JudicialChildResult],
    unpaid_work_judicial_type_ids: &[Uuid],
) -> bool {
    judicial_child_results
        .iter()
        .any(|child| unpaid_work_judicial_type_ids.contains(&child.judicial_result_type_id))
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::core::EventEnvelope;

    const UNPAID_WORK_TYPE_ID: &str = "9bec5977-1796-4645-9b9e-687d4f23d37d";

    fn unpaid_work_type_id() -> Uuid {
        UNPAID_WORK_TYPE_ID.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order_with_end_date(id: Uuid, end_date: NaiveDate) -> CourtOrder {
        CourtOrder {
            id,
            master_defendant_id: Uuid::new_v4(),
            ordering_hearing_id: Uuid::new_v4(),
            judicial_result_type_id: Uuid::new_v4(),
            label: Some("Community Order".to_string()),
            ordering_court: None,
            order_date: date(2024, 1, 10),
            start_date: date(2024, 1, 10),
            end_date,
            expiry_date: None,
            is_unpaid_work: None,
            is_sjp_order: None,
            can_be_subject_of_breach_proceedings: Some(true),
            can_be_subject_of_variation_proceedings: Some(true),
            defendant_ids: vec![Uuid::new_v4()],
            court_order_offences: vec![],
            judicial_child_results: vec![],
        }
    }

    fn unpaid_work_child() -> JudicialChildResult {
        JudicialChildResult {
            judicial_result_type_id: unpaid_work_type_id(),
            label: Some("Unpaid work requirement".to_string()),
        }
    }

    fn requested_snapshot(events: &[CourtOrderEvent]) -> &CourtOrder {
        match events.last() {
            Some(CourtOrderEvent::Requested(e)) => &e.court_order,
            other => panic!("expected a Requested event, got {:?}", other),
        }
    }

    #[test]
    fn test_create_on_empty_state_emits_single_requested() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let end_date = date(2024, 1, 10);

        let events = aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, end_date),
            false,
            &[unpaid_work_type_id()],
        );

        assert_eq!(events.len(), 1);
        let snapshot = requested_snapshot(&events);
        assert_eq!(snapshot.end_date, end_date);
        // No unpaid-work child results: expiry equals the end date
        assert_eq!(snapshot.expiry_date, Some(end_date));
        assert_eq!(snapshot.is_unpaid_work, Some(false));
        assert!(!aggregate.is_removed());
        assert!(aggregate.current().is_some());
    }

    #[test]
    fn test_create_with_unpaid_work_child_result_extends_expiry() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let end_date = date(2024, 1, 10);
        let mut order = order_with_end_date(court_order_id, end_date);
        order.judicial_child_results = vec![unpaid_work_child()];

        let events =
            aggregate.create_court_order(court_order_id, order, true, &[unpaid_work_type_id()]);

        assert_eq!(events.len(), 1);
        let snapshot = requested_snapshot(&events);
        assert_eq!(snapshot.end_date, end_date);
        assert_eq!(snapshot.expiry_date, Some(date(2025, 1, 10)));
        assert_eq!(snapshot.is_unpaid_work, Some(true));
    }

    #[test]
    fn test_create_with_unpaid_work_child_but_result_type_not_community_order() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let end_date = date(2024, 1, 10);
        let mut order = order_with_end_date(court_order_id, end_date);
        order.judicial_child_results = vec![unpaid_work_child()];

        let events =
            aggregate.create_court_order(court_order_id, order, false, &[unpaid_work_type_id()]);

        let snapshot = requested_snapshot(&events);
        assert_eq!(snapshot.expiry_date, Some(end_date));
        assert_eq!(snapshot.is_unpaid_work, Some(false));
    }

    #[test]
    fn test_create_with_child_result_outside_allow_list() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let end_date = date(2024, 1, 10);
        let mut order = order_with_end_date(court_order_id, end_date);
        order.judicial_child_results = vec![JudicialChildResult {
            judicial_result_type_id: Uuid::new_v4(),
            label: None,
        }];

        let events =
            aggregate.create_court_order(court_order_id, order, true, &[unpaid_work_type_id()]);

        let snapshot = requested_snapshot(&events);
        assert_eq!(snapshot.expiry_date, Some(end_date));
        assert_eq!(snapshot.is_unpaid_work, Some(false));
    }

    #[test]
    fn test_recreate_active_order_emits_removed_then_requested() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let order = order_with_end_date(court_order_id, date(2024, 1, 10));

        aggregate.create_court_order(
            court_order_id,
            order.clone(),
            false,
            &[unpaid_work_type_id()],
        );
        let events =
            aggregate.create_court_order(court_order_id, order, false, &[unpaid_work_type_id()]);

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], CourtOrderEvent::Removed(_)));
        assert!(matches!(events[1], CourtOrderEvent::Requested(_)));
    }

    #[test]
    fn test_recreate_after_removal_emits_only_requested() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let order = order_with_end_date(court_order_id, date(2024, 1, 10));

        aggregate.create_court_order(
            court_order_id,
            order.clone(),
            false,
            &[unpaid_work_type_id()],
        );
        aggregate.remove_court_order(court_order_id);
        let events =
            aggregate.create_court_order(court_order_id, order, false, &[unpaid_work_type_id()]);

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], CourtOrderEvent::Requested(_)));
    }

    #[test]
    fn test_recreate_preserves_pending_amended_end_date() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();
        let original_end = date(2024, 1, 10);
        let amended_end = date(2024, 2, 10);
        let order = order_with_end_date(court_order_id, original_end);

        aggregate.create_court_order(
            court_order_id,
            order.clone(),
            false,
            &[unpaid_work_type_id()],
        );
        aggregate
            .update_court_order(court_order_id, application_id, amended_end)
            .unwrap();

        // Re-resulting must not silently discard the amendment
        let events =
            aggregate.create_court_order(court_order_id, order, false, &[unpaid_work_type_id()]);

        assert_eq!(events.len(), 2);
        let snapshot = requested_snapshot(&events);
        assert_eq!(snapshot.end_date, amended_end);
        assert_eq!(snapshot.expiry_date, Some(amended_end));
    }

    #[test]
    fn test_recreate_uses_requested_end_date_when_pending_equals_it() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let end_date = date(2024, 1, 10);
        let order = order_with_end_date(court_order_id, end_date);

        aggregate.apply(&CourtOrderEvent::ValidityUpdated(CourtOrderValidityUpdated {
            court_order_id,
            application_id: Uuid::new_v4(),
            new_end_date: end_date,
            original_end_date: end_date,
            expiry_date: None,
        }));

        let events =
            aggregate.create_court_order(court_order_id, order, false, &[unpaid_work_type_id()]);
        let snapshot = requested_snapshot(&events);
        assert_eq!(snapshot.end_date, end_date);
    }

    #[test]
    fn test_remove_always_emits_removed() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();

        let first = aggregate.remove_court_order(court_order_id);
        assert_eq!(first.len(), 1);
        assert!(matches!(first[0], CourtOrderEvent::Removed(_)));
        assert!(aggregate.is_removed());

        // Removing an already-removed order still emits the no-op event
        let second = aggregate.remove_court_order(court_order_id);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_update_court_order_emits_validity_updated() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();
        let original_end = date(2024, 1, 10);
        let new_end = date(2024, 2, 10);

        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, original_end),
            false,
            &[unpaid_work_type_id()],
        );
        let events = aggregate
            .update_court_order(court_order_id, application_id, new_end)
            .unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            CourtOrderEvent::ValidityUpdated(e) => {
                assert_eq!(e.new_end_date, new_end);
                assert_eq!(e.original_end_date, original_end);
                // Not unpaid work, so the attached expiry is the original end date
                assert_eq!(e.expiry_date, Some(original_end));
            }
            other => panic!("expected ValidityUpdated, got {:?}", other),
        }
    }

    #[test]
    fn test_update_court_order_duplicate_is_noop() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();
        let new_end = date(2024, 2, 10);

        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, date(2024, 1, 10)),
            false,
            &[unpaid_work_type_id()],
        );

        let first = aggregate
            .update_court_order(court_order_id, application_id, new_end)
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = aggregate
            .update_court_order(court_order_id, application_id, new_end)
            .unwrap();
        assert_eq!(second.len(), 0);
    }

    #[test]
    fn test_update_court_order_on_removed_order_is_noop() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();

        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, date(2024, 1, 10)),
            false,
            &[unpaid_work_type_id()],
        );
        aggregate.remove_court_order(court_order_id);

        let events = aggregate
            .update_court_order(court_order_id, Uuid::new_v4(), date(2024, 2, 10))
            .unwrap();
        assert_eq!(events.len(), 0);
    }

    #[test]
    fn test_update_court_order_before_creation_is_an_error() {
        let mut aggregate = CourtOrderAggregate::default();
        let result = aggregate.update_court_order(Uuid::new_v4(), Uuid::new_v4(), date(2024, 2, 10));
        assert!(matches!(result, Err(CourtOrderError::NotCreated)));
    }

    #[test]
    fn test_update_court_order_unpaid_work_expiry_from_original_end_date() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let original_end = date(2024, 1, 10);
        let mut order = order_with_end_date(court_order_id, original_end);
        order.judicial_child_results = vec![unpaid_work_child()];

        aggregate.create_court_order(court_order_id, order, true, &[unpaid_work_type_id()]);
        let events = aggregate
            .update_court_order(court_order_id, Uuid::new_v4(), date(2024, 2, 10))
            .unwrap();

        match &events[0] {
            CourtOrderEvent::ValidityUpdated(e) => {
                // Expiry stays keyed to the original end date, extended a year
                assert_eq!(e.expiry_date, Some(date(2025, 1, 10)));
            }
            other => panic!("expected ValidityUpdated, got {:?}", other),
        }
    }

    #[test]
    fn test_reset_restores_first_recorded_original_end_date() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();
        let original_end = date(2024, 1, 10);

        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, original_end),
            false,
            &[unpaid_work_type_id()],
        );
        aggregate
            .update_court_order(court_order_id, application_id, date(2024, 2, 10))
            .unwrap();

        let events = aggregate.reset_court_order(court_order_id, application_id);
        assert_eq!(events.len(), 1);
        match &events[0] {
            CourtOrderEvent::ValidityUpdated(e) => {
                assert_eq!(e.new_end_date, original_end);
                assert_eq!(e.application_id, application_id);
                assert_eq!(e.expiry_date, None);
            }
            other => panic!("expected ValidityUpdated, got {:?}", other),
        }
    }

    #[test]
    fn test_reset_twice_second_is_noop() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();

        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, date(2024, 1, 10)),
            false,
            &[unpaid_work_type_id()],
        );
        aggregate
            .update_court_order(court_order_id, application_id, date(2024, 2, 10))
            .unwrap();

        assert_eq!(aggregate.reset_court_order(court_order_id, application_id).len(), 1);
        // Folding the first reset flips is_reset; the second emits nothing
        assert_eq!(aggregate.reset_court_order(court_order_id, application_id).len(), 0);
    }

    #[test]
    fn test_reset_without_recorded_application_is_noop() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();

        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, date(2024, 1, 10)),
            false,
            &[unpaid_work_type_id()],
        );

        let events = aggregate.reset_court_order(court_order_id, Uuid::new_v4());
        assert_eq!(events.len(), 0);
    }

    #[test]
    fn test_reset_on_removed_order_is_noop() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();

        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, date(2024, 1, 10)),
            false,
            &[unpaid_work_type_id()],
        );
        aggregate
            .update_court_order(court_order_id, application_id, date(2024, 2, 10))
            .unwrap();
        aggregate.remove_court_order(court_order_id);

        assert_eq!(aggregate.reset_court_order(court_order_id, application_id).len(), 0);
    }

    #[test]
    fn test_original_end_date_per_application_is_write_once() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();
        let original_end = date(2024, 1, 10);

        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, original_end),
            false,
            &[unpaid_work_type_id()],
        );
        aggregate
            .update_court_order(court_order_id, application_id, date(2024, 2, 10))
            .unwrap();
        aggregate
            .update_court_order(court_order_id, application_id, date(2024, 3, 10))
            .unwrap();

        // The reset restores the date recorded by the FIRST amendment
        let events = aggregate.reset_court_order(court_order_id, application_id);
        match &events[0] {
            CourtOrderEvent::ValidityUpdated(e) => assert_eq!(e.new_end_date, original_end),
            other => panic!("expected ValidityUpdated, got {:?}", other),
        }
    }

    #[test]
    fn test_update_judicial_child_result_uses_pending_end_date() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let amended_end = date(2024, 6, 1);

        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, date(2024, 1, 10)),
            false,
            &[unpaid_work_type_id()],
        );
        aggregate
            .update_court_order(court_order_id, Uuid::new_v4(), amended_end)
            .unwrap();

        let events = aggregate
            .update_judicial_child_result(
                court_order_id,
                vec![unpaid_work_child()],
                true,
                &[unpaid_work_type_id()],
            )
            .unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            CourtOrderEvent::JudicialChildResultsUpdated(e) => {
                assert!(e.is_unpaid_work);
                assert_eq!(e.expiry_date, date(2025, 6, 1));
            }
            other => panic!("expected JudicialChildResultsUpdated, got {:?}", other),
        }
    }

    #[test]
    fn test_update_judicial_child_result_uses_current_end_date_without_pending() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let end_date = date(2024, 1, 10);

        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, end_date),
            false,
            &[unpaid_work_type_id()],
        );

        let events = aggregate
            .update_judicial_child_result(
                court_order_id,
                vec![unpaid_work_child()],
                false,
                &[unpaid_work_type_id()],
            )
            .unwrap();

        match &events[0] {
            CourtOrderEvent::JudicialChildResultsUpdated(e) => {
                assert!(!e.is_unpaid_work);
                assert_eq!(e.expiry_date, end_date);
            }
            other => panic!("expected JudicialChildResultsUpdated, got {:?}", other),
        }
        // The snapshot is patched in place
        let current = aggregate.current().unwrap();
        assert_eq!(current.is_unpaid_work, Some(false));
        assert_eq!(current.expiry_date, Some(end_date));
        assert_eq!(current.judicial_child_results.len(), 1);
    }

    #[test]
    fn test_update_judicial_child_result_v2_uses_latest_end_date() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let latest_end = date(2024, 9, 1);

        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, date(2024, 1, 10)),
            false,
            &[unpaid_work_type_id()],
        );

        let events = aggregate.update_judicial_child_result_v2(
            court_order_id,
            vec![unpaid_work_child()],
            true,
            &[unpaid_work_type_id()],
            latest_end,
        );

        match &events[0] {
            CourtOrderEvent::JudicialChildResultsUpdated(e) => {
                // The aggregate's own stored end date is ignored
                assert_eq!(e.expiry_date, date(2025, 9, 1));
                assert!(e.is_unpaid_work);
            }
            other => panic!("expected JudicialChildResultsUpdated, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_fold_leaves_state_unchanged() {
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, date(2024, 1, 10)),
            false,
            &[unpaid_work_type_id()],
        );

        let before = aggregate.clone();
        aggregate.apply(&CourtOrderEvent::Unknown);
        assert_eq!(aggregate, before);
    }

    #[test]
    fn test_replay_rebuilds_identical_state() {
        let mut live = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();

        let mut history = Vec::new();
        history.extend(live.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, date(2024, 1, 10)),
            false,
            &[unpaid_work_type_id()],
        ));
        history.extend(
            live.update_court_order(court_order_id, application_id, date(2024, 2, 10))
                .unwrap(),
        );
        history.extend(live.reset_court_order(court_order_id, application_id));

        let envelopes: Vec<EventEnvelope<CourtOrderEvent>> = history
            .into_iter()
            .enumerate()
            .map(|(i, event)| {
                EventEnvelope::new(court_order_id, (i + 1) as i64, event, Uuid::new_v4())
            })
            .collect();

        let replayed = CourtOrderAggregate::load_from_history(&envelopes);
        assert_eq!(replayed, live);
    }

    #[test]
    fn test_amend_then_reset_scenario() {
        // Order created 2024-01-10, amended to 2024-02-10, then reset
        let mut aggregate = CourtOrderAggregate::default();
        let court_order_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();

        let created = aggregate.create_court_order(
            court_order_id,
            order_with_end_date(court_order_id, date(2024, 1, 10)),
            false,
            &[unpaid_work_type_id()],
        );
        assert_eq!(created.len(), 1);
        assert_eq!(
            requested_snapshot(&created).expiry_date,
            Some(date(2024, 1, 10))
        );

        let updated = aggregate
            .update_court_order(court_order_id, application_id, date(2024, 2, 10))
            .unwrap();
        assert_eq!(updated.len(), 1);
        match &updated[0] {
            CourtOrderEvent::ValidityUpdated(e) => {
                assert_eq!(e.original_end_date, date(2024, 1, 10));
                assert_eq!(e.new_end_date, date(2024, 2, 10));
            }
            other => panic!("expected ValidityUpdated, got {:?}", other),
        }

        let reset = aggregate.reset_court_order(court_order_id, application_id);
        assert_eq!(reset.len(), 1);
        match &reset[0] {
            CourtOrderEvent::ValidityUpdated(e) => {
                assert_eq!(e.new_end_date, date(2024, 1, 10));
            }
            other => panic!("expected ValidityUpdated, got {:?}", other),
        }

        assert_eq!(aggregate.reset_court_order(court_order_id, application_id).len(), 0);
    }

    #[test]
    fn test_calculate_expiry_date_rules() {
        let end = date(2024, 1, 10);
        assert_eq!(calculate_expiry_date(end, Some(true)), date(2025, 1, 10));
        assert_eq!(calculate_expiry_date(end, Some(false)), end);
        assert_eq!(calculate_expiry_date(end, None), end);
    }

    #[test]
    fn test_calculate_expiry_date_clamps_leap_day() {
        let leap = date(2024, 2, 29);
        assert_eq!(calculate_expiry_date(leap, Some(true)), date(2025, 2, 28));
    }
}
