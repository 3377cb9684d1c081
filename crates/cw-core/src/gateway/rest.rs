//! HTTP client for the hosted entity store.
//!
//! Collections live under `{base_url}/apps/{app_id}/entities/{Kind}`:
//! - `GET` lists records; `sort`, `limit` and `skip` shape the result and a
//!   JSON-encoded `q` parameter carries equality filters.
//! - `POST` creates a record.
//! - `PUT .../{id}` applies a partial update.

use super::{Entity, EntityStore, GatewayError, ListQuery, RecordFilter};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::marker::PhantomData;
use std::time::Duration;
use tracing::debug;

/// Header carrying the application API key.
pub const API_KEY_HEADER: &str = "api_key";

/// Connection settings for the hosted entity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestGatewayConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,
    /// Application identifier assigned by the backend.
    pub app_id: String,
    /// API key sent with every request.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl RestGatewayConfig {
    pub fn new(base_url: &str, app_id: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }

    /// Checks the settings before any request is made.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(GatewayError::Configuration(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.app_id.trim().is_empty() {
            return Err(GatewayError::Configuration("app_id is empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(GatewayError::Configuration(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// URL of the collection holding `T`.
    pub fn collection_url<T: Entity>(&self) -> String {
        format!(
            "{}/apps/{}/entities/{}",
            self.base_url.trim_end_matches('/'),
            self.app_id,
            T::KIND
        )
    }
}

/// Builds the shared HTTP client for a gateway.
pub(crate) fn build_client(config: &RestGatewayConfig) -> Result<reqwest::Client, GatewayError> {
    config.validate()?;
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| GatewayError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Encodes list parameters as query pairs.
pub fn list_params(query: &ListQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(sort) = &query.sort {
        params.push(("sort", sort.to_param()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    if let Some(skip) = query.skip {
        params.push(("skip", skip.to_string()));
    }
    params
}

/// Encodes an equality filter as the `q` query pair.
pub fn filter_params(filter: &RecordFilter) -> Result<Vec<(&'static str, String)>, GatewayError> {
    Ok(vec![("q", serde_json::to_string(filter.fields())?)])
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Entity store backed by the hosted backend's REST API.
pub struct RestEntityStore<T: Entity> {
    client: reqwest::Client,
    collection_url: String,
    api_key: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> RestEntityStore<T> {
    /// Creates a store with its own HTTP client.
    pub fn new(config: &RestGatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self::with_client(build_client(config)?, config))
    }

    /// Creates a store sharing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, config: &RestGatewayConfig) -> Self {
        Self {
            client,
            collection_url: config.collection_url::<T>(),
            api_key: config.api_key.clone(),
            _marker: PhantomData,
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn handle_response<R: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        id: Option<&str>,
    ) -> Result<R, GatewayError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(GatewayError::NotFound {
                    entity: T::KIND.to_string(),
                    id: id.to_string(),
                });
            }
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

        if status == reqwest::StatusCode::CONFLICT
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            return Err(GatewayError::Rejected(message));
        }

        Err(GatewayError::Request {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for RestEntityStore<T> {
    async fn list(&self, query: &ListQuery) -> Result<Vec<T>, GatewayError> {
        debug!(entity = %T::KIND, ?query, "Listing records");
        let response = self
            .request(reqwest::Method::GET, &self.collection_url)
            .query(&list_params(query))
            .send()
            .await?;

        self.handle_response(response, None).await
    }

    async fn filter(&self, filter: &RecordFilter) -> Result<Vec<T>, GatewayError> {
        debug!(entity = %T::KIND, ?filter, "Filtering records");
        let response = self
            .request(reqwest::Method::GET, &self.collection_url)
            .query(&filter_params(filter)?)
            .send()
            .await?;

        self.handle_response(response, None).await
    }

    async fn create(&self, record: &T) -> Result<T, GatewayError> {
        let response = self
            .request(reqwest::Method::POST, &self.collection_url)
            .json(record)
            .send()
            .await?;

        self.handle_response(response, None).await
    }

    async fn update(&self, id: &str, patch: &T::Patch) -> Result<T, GatewayError> {
        debug!(entity = %T::KIND, id, "Updating record");
        let url = format!("{}/{}", self.collection_url, id);
        let response = self
            .request(reqwest::Method::PUT, &url)
            .json(patch)
            .send()
            .await?;

        self.handle_response(response, Some(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SortKey;
    use crate::models::{Execution, Routine};

    fn config() -> RestGatewayConfig {
        RestGatewayConfig::new("https://api.example.com/", "app-123")
    }

    #[test]
    fn test_collection_url() {
        assert_eq!(
            config().collection_url::<Routine>(),
            "https://api.example.com/apps/app-123/entities/Routine"
        );
    }

    #[test]
    fn test_list_params_encode_sort_limit_skip() {
        let query = ListQuery::all()
            .sorted_by(SortKey::desc("execution_date"))
            .limit(1000)
            .skip(2000);

        assert_eq!(
            list_params(&query),
            vec![
                ("sort", "-execution_date".to_string()),
                ("limit", "1000".to_string()),
                ("skip", "2000".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_params_empty_for_full_listing() {
        assert!(list_params(&ListQuery::all()).is_empty());
    }

    #[test]
    fn test_filter_params_encode_json() {
        let filter = RecordFilter::new().eq("id", "r1").eq("title", "Audit");
        let params = filter_params(&filter).unwrap();

        assert_eq!(params, vec![("q", r#"{"id":"r1","title":"Audit"}"#.to_string())]);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut bad_url = config();
        bad_url.base_url = "ftp://api.example.com".to_string();
        assert!(matches!(
            bad_url.validate(),
            Err(GatewayError::Configuration(_))
        ));

        let mut no_app = config();
        no_app.app_id = " ".to_string();
        assert!(no_app.validate().is_err());

        let mut no_timeout = config();
        no_timeout.timeout_secs = 0;
        assert!(no_timeout.validate().is_err());

        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_store_construction_uses_collection_url() {
        let store = RestEntityStore::<Execution>::new(&config()).unwrap();
        assert_eq!(
            store.collection_url,
            "https://api.example.com/apps/app-123/entities/Execution"
        );
    }
}
