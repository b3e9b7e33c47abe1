use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::court_order::JudicialChildResult;

// ============================================================================
// Progression Service - child judicial results lookup
// ============================================================================
//
// Supplies the child judicial results hanging off an order's originating
// hearing result. The V2 lookup additionally returns the authoritative
// current end date, which may have moved outside the order's own history.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct JudicialChildResultsResponse {
    pub judicial_child_results: Vec<JudicialChildResult>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct JudicialChildResultsV2Response {
    pub judicial_child_results: Vec<JudicialChildResult>,
    pub latest_end_date: NaiveDate,
}

/// Lookup key: (hearing id, master defendant id, judicial result type id).
pub type ProgressionKey = (Uuid, Uuid, Uuid);

#[async_trait]
pub trait ProgressionService: Send + Sync {
    async fn get_judicial_child_results(
        &self,
        hearing_id: Uuid,
        master_defendant_id: Uuid,
        judicial_result_type_id: Uuid,
    ) -> Result<JudicialChildResultsResponse>;

    async fn get_judicial_child_results_v2(
        &self,
        hearing_id: Uuid,
        master_defendant_id: Uuid,
        judicial_result_type_id: Uuid,
    ) -> Result<JudicialChildResultsV2Response>;
}

/// In-memory progression data, seeded up front. A missing V1 entry is an
/// empty result list; a missing V2 entry is an error because the V2 contract
/// always carries an end date.
#[derive(Default)]
pub struct InMemoryProgressionService {
    child_results: RwLock<HashMap<ProgressionKey, JudicialChildResultsResponse>>,
    child_results_v2: RwLock<HashMap<ProgressionKey, JudicialChildResultsV2Response>>,
}

impl InMemoryProgressionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, key: ProgressionKey, response: JudicialChildResultsResponse) {
        self.child_results.write().await.insert(key, response);
    }

    pub async fn insert_v2(&self, key: ProgressionKey, response: JudicialChildResultsV2Response) {
        self.child_results_v2.write().await.insert(key, response);
    }
}

#[async_trait]
impl ProgressionService for InMemoryProgressionService {
    async fn get_judicial_child_results(
        &self,
        hearing_id: Uuid,
        master_defendant_id: Uuid,
        judicial_result_type_id: Uuid,
    ) -> Result<JudicialChildResultsResponse> {
        let results = self.child_results.read().await;
        Ok(results
            .get(&(hearing_id, master_defendant_id, judicial_result_type_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_judicial_child_results_v2(
        &self,
        hearing_id: Uuid,
        master_defendant_id: Uuid,
        judicial_result_type_id: Uuid,
    ) -> Result<JudicialChildResultsV2Response> {
        let results = self.child_results_v2.read().await;
        match results.get(&(hearing_id, master_defendant_id, judicial_result_type_id)) {
            Some(response) => Ok(response.clone()),
            None => bail!(
                "No judicial child results recorded for hearing {}",
                hearing_id
            ),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_v1_entry_is_empty_list() {
        let service = InMemoryProgressionService::new();
        let response = service
            .get_judicial_child_results(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        assert!(response.judicial_child_results.is_empty());
    }

    #[tokio::test]
    async fn test_missing_v2_entry_is_an_error() {
        let service = InMemoryProgressionService::new();
        let result = service
            .get_judicial_child_results_v2(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_seeded_v2_entry_round_trip() {
        let service = InMemoryProgressionService::new();
        let key = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let response = JudicialChildResultsV2Response {
            judicial_child_results: vec![JudicialChildResult {
                judicial_result_type_id: Uuid::new_v4(),
                label: None,
            }],
            latest_end_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };
        service.insert_v2(key, response.clone()).await;

        let loaded = service
            .get_judicial_child_results_v2(key.0, key.1, key.2)
            .await
            .unwrap();
        assert_eq!(loaded.latest_end_date, response.latest_end_date);
        assert_eq!(loaded.judicial_child_results.len(), 1);
    }
}
