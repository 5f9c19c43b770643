//! OpenSearch index backend over the REST API.
//!
//! Documents are the account JSON projection, stored under the account id.

use crate::config::OpenSearchConfig;
use async_trait::async_trait;
use finance_engine::{AccountId, SearchIndex, StoreError};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Maximum hits returned by one search.
const SEARCH_LIMIT: usize = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Map a reqwest error onto the store error the engine understands.
pub fn index_error(err: reqwest::Error) -> StoreError {
    if err.is_connect() || err.is_timeout() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

/// Search index client for an OpenSearch cluster.
#[derive(Clone)]
pub struct OpenSearchIndex {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl OpenSearchIndex {
    pub fn new(config: &OpenSearchConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(index_error)?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }
}

/// URL of a single document.
pub fn document_url(base_url: &str, index: &str, id: AccountId) -> String {
    format!("{}/{}/_doc/{}", base_url.trim_end_matches('/'), index, id)
}

/// Request body for a free-text query over account names.
pub fn search_body(query: &str) -> Value {
    json!({
        "size": SEARCH_LIMIT,
        "_source": false,
        "query": {
            "multi_match": {
                "query": query,
                "fields": ["name"],
                "fuzziness": "AUTO"
            }
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: Hits,
}

#[derive(Debug, Deserialize)]
pub struct Hits {
    pub hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
}

impl SearchResponse {
    /// Account ids of the hits in ranking order. Foreign ids are dropped.
    pub fn account_ids(&self) -> Vec<AccountId> {
        self.hits
            .hits
            .iter()
            .filter_map(|hit| hit.id.parse().ok())
            .collect()
    }
}

#[async_trait]
impl SearchIndex for OpenSearchIndex {
    async fn upsert(&self, index: &str, id: AccountId, document: &str) -> Result<(), StoreError> {
        self.authorized(self.client.put(document_url(&self.base_url, index, id)))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(document.to_string())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(index_error)?;
        Ok(())
    }

    async fn delete(&self, index: &str, id: AccountId) -> Result<(), StoreError> {
        let response = self
            .authorized(self.client.delete(document_url(&self.base_url, index, id)))
            .send()
            .await
            .map_err(index_error)?;

        // Already gone is as good as deleted
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        response.error_for_status().map_err(index_error)?;
        Ok(())
    }

    async fn search(&self, index: &str, query: &str) -> Result<Vec<AccountId>, StoreError> {
        let url = format!("{}/{}/_search", self.base_url.trim_end_matches('/'), index);
        let response: SearchResponse = self
            .authorized(self.client.post(url))
            .json(&search_body(query))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(index_error)?
            .json()
            .await
            .map_err(index_error)?;

        Ok(response.account_ids())
    }
}
