// ============================================================================
// Collaborator Services
// ============================================================================
//
// The two external lookups the command handler resolves facts from before
// calling the aggregate. The aggregate itself performs no I/O; these traits
// are its only window onto the rest of the estate.
//
// ============================================================================

pub mod progression;
pub mod reference_data;

pub use progression::{
    InMemoryProgressionService, JudicialChildResultsResponse, JudicialChildResultsV2Response,
    ProgressionService,
};
pub use reference_data::{InMemoryReferenceDataService, ReferenceDataService, ResultDefinition};
