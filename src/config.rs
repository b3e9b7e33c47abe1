use anyhow::{Context, Result};
use uuid::Uuid;

// ============================================================================
// Configuration
// ============================================================================

pub const UNPAID_WORK_JUDICIAL_TYPE_IDS_ENV: &str = "UNPAID_WORK_JUDICIAL_TYPE_IDS";

/// Judicial result type ids classed as unpaid work unless overridden.
const DEFAULT_UNPAID_WORK_JUDICIAL_TYPE_IDS: &str =
    "9bec5977-1796-4645-9b9e-687d4f23d37d,5ab456c8-d272-4082-87ed-cd1f44a0603a";

#[derive(Debug, Clone)]
pub struct CourtOrdersConfig {
    /// Allow-list of judicial result type ids that count as unpaid work
    /// when found among an order's child results.
    pub unpaid_work_judicial_type_ids: Vec<Uuid>,
}

impl CourtOrdersConfig {
    /// Reads `UNPAID_WORK_JUDICIAL_TYPE_IDS` (comma-separated UUIDs),
    /// falling back to the built-in defaults.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var(UNPAID_WORK_JUDICIAL_TYPE_IDS_ENV)
            .unwrap_or_else(|_| DEFAULT_UNPAID_WORK_JUDICIAL_TYPE_IDS.to_string());
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let unpaid_work_judicial_type_ids = raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<Uuid>()
                    .with_context(|| format!("Invalid judicial result type id: {part}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            unpaid_work_judicial_type_ids,
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
