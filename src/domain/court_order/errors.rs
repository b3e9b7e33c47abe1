// ============================================================================
// Court Order Business Rule Errors
// ============================================================================
//
// Violated preconditions are a no-op (empty event sequence), not an error.
// The only hard failure is an amendment arriving before any creation event
// has been folded for the stream.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CourtOrderError {
    #[error("No court order has been created for this stream")]
    NotCreated,
}
