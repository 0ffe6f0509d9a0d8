//! Catalog HTTP client
//!
//! Talks to the Google Books volumes API and hands back normalized
//! `BookRecord`s.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use shelf_core::catalog::normalize_volume;
use shelf_core::{BookRecord, Config, SearchOptions, SearchResults};

/// Request timeout in seconds
const FETCH_TIMEOUT: u64 = 10;

/// Errors talking to the catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Search query is empty")]
    EmptyQuery,

    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Catalog returned invalid JSON: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("Book not found in catalog: {0}")]
    NotFound(String),
}

/// Catalog client
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT))
            .user_agent(concat!("shelf/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, CatalogError> {
        Self::new(config.catalog_url.clone(), config.catalog_api_key.clone())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Query parameters for a search, API key last
    fn search_params(&self, query: &str, options: &SearchOptions) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", query.to_string())];
        params.extend(options.query_params());
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        params
    }

    async fn get_json(&self, url: &str, params: &[(&'static str, String)]) -> Result<Value, CatalogError> {
        debug!(url = %url, "Catalog request");

        let response = self.http.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(CatalogError::InvalidResponse)
    }

    /// Search volumes
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResults, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::EmptyQuery);
        }

        let params = self.search_params(query, options);
        let body = self.get_json(&self.url("/volumes"), &params).await?;
        let results = SearchResults::from_response(&body);

        debug!(
            query = %query,
            returned = results.books.len(),
            total = results.total_items,
            "Catalog search"
        );
        Ok(results)
    }

    /// Fetch one volume by id
    pub async fn volume(&self, id: &str) -> Result<BookRecord, CatalogError> {
        let params: Vec<(&'static str, String)> = self
            .api_key
            .iter()
            .map(|key| ("key", key.clone()))
            .collect();

        let body = self
            .get_json(&self.url(&format!("/volumes/{}", id)), &params)
            .await
            .map_err(|e| match e {
                CatalogError::Status { status: 404, .. } => CatalogError::NotFound(id.to_string()),
                other => other,
            })?;

        normalize_volume(&body).ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_trims_trailing_slash() {
        let client = CatalogClient::new("http://localhost:9000/books/v1/", None).unwrap();
        assert_eq!(client.url("/volumes"), "http://localhost:9000/books/v1/volumes");
    }

    #[test]
    fn test_search_params_with_key() {
        let client = CatalogClient::new("http://localhost", Some("secret".to_string())).unwrap();
        let params = client.search_params("dune", &SearchOptions::default());

        assert_eq!(params[0], ("q", "dune".to_string()));
        assert_eq!(params.last(), Some(&("key", "secret".to_string())));
    }

    #[test]
    fn test_empty_api_key_is_dropped() {
        let client = CatalogClient::new("http://localhost", Some(String::new())).unwrap();
        let params = client.search_params("dune", &SearchOptions::default());
        assert!(params.iter().all(|(name, _)| *name != "key"));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let client = CatalogClient::new("http://localhost", None).unwrap();
        let err = client.search("   ", &SearchOptions::default()).await.unwrap_err();
        assert!(matches!(err, CatalogError::EmptyQuery));
    }
}
