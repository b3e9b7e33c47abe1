use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

// ============================================================================
// Reference Data Service - result definition lookup
// ============================================================================

/// The slice of a judicial result definition this service cares about:
/// whether the result type is configured for the unpaid-work extension.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ResultDefinition {
    pub id: Uuid,
    pub label: Option<String>,
    pub unpaid_work_extension_community_ord_yro: Option<bool>,
}

#[async_trait]
pub trait ReferenceDataService: Send + Sync {
    async fn get_result_definition(&self, result_definition_id: Uuid) -> Result<ResultDefinition>;
}

/// In-memory reference data, seeded up front. Unknown ids resolve to an
/// empty definition, which carries no unpaid-work extension.
#[derive(Default)]
pub struct InMemoryReferenceDataService {
    definitions: RwLock<HashMap<Uuid, ResultDefinition>>,
}

impl InMemoryReferenceDataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, definition: ResultDefinition) {
        self.definitions
            .write()
            .await
            .insert(definition.id, definition);
    }
}

#[async_trait]
impl ReferenceDataService for InMemoryReferenceDataService {
    async fn get_result_definition(&self, result_definition_id: Uuid) -> Result<ResultDefinition> {
        let definitions = self.definitions.read().await;
        Ok(definitions
            .get(&result_definition_id)
            .cloned()
            .unwrap_or(ResultDefinition {
                id: result_definition_id,
                ..ResultDefinition::default()
            }))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
