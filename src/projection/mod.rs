// ============================================================================
// Read-Side Projection
// ============================================================================
//
// Materializes court order events into a queryable in-memory view:
// - read_model: the record shape and its finders
// - projector: folds appended events into records
// - queries: the court-order queries served from the view
//
// The view is eventually consistent with the event streams; the projector
// consumes the store's append broadcast in append order.
//
// ============================================================================

pub mod projector;
pub mod queries;
pub mod read_model;

pub use projector::CourtOrderProjector;
pub use queries::{CourtOrderQueryView, CourtOrderView};
pub use read_model::{CourtOrderReadStore, CourtOrderRecord};
