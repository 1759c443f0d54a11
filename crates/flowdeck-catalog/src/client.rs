use std::time::Duration;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use flowdeck_core::config::CatalogConfig;
use flowdeck_core::error::{FlowdeckError, Result};
use flowdeck_core::traits::CatalogSource;
use flowdeck_core::types::{Agent, Category};

/// Body of the agents listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsResponse {
    #[serde(default)]
    pub agents: Vec<Agent>,
}

/// Body of the categories listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoriesResponse {
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// Catalog service client.
pub struct HttpCatalog {
    client: reqwest::Client,
    agents_url: String,
    categories_url: String,
    api_key: Option<String>,
}

impl HttpCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("flowdeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FlowdeckError::Catalog {
                endpoint: config.base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            agents_url: config.agents_url(),
            categories_url: config.categories_url(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn agents_url(&self) -> &str {
        &self.agents_url
    }

    pub fn categories_url(&self) -> &str {
        &self.categories_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let catalog_err = |message: String| FlowdeckError::Catalog {
            endpoint: url.to_string(),
            message,
        };

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| catalog_err(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(catalog_err(format!("HTTP {}", response.status())));
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|e| catalog_err(format!("failed to parse body: {}", e)))?;

        debug!(url, "Catalog listing fetched");
        Ok(body)
    }
}

impl CatalogSource for HttpCatalog {
    fn agents(&self) -> BoxFuture<'_, Result<Vec<Agent>>> {
        Box::pin(async move {
            let body: AgentsResponse = self.get_json(&self.agents_url).await?;
            Ok(body.agents)
        })
    }

    fn categories(&self) -> BoxFuture<'_, Result<Vec<Category>>> {
        Box::pin(async move {
            let body: CategoriesResponse = self.get_json(&self.categories_url).await?;
            Ok(body.categories)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_from_config() {
        let config = CatalogConfig {
            base_url: "http://catalog.local/api".into(),
            ..Default::default()
        };
        let catalog = HttpCatalog::new(&config).unwrap();
        assert_eq!(catalog.agents_url(), "http://catalog.local/api/agents");
        assert_eq!(catalog.categories_url(), "http://catalog.local/api/categories");
    }

    #[test]
    fn test_parse_agents_body() {
        let body = r#"{"agents":[{"agent_id":"a1","agent_name":"Analyzer","category_id":"c1","category_name":"Analysis","capabilities":["sql","charts"]}]}"#;
        let parsed: AgentsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.agents.len(), 1);
        assert_eq!(parsed.agents[0].capabilities, vec!["sql", "charts"]);
    }

    #[test]
    fn test_missing_listing_key_is_empty() {
        let parsed: CategoriesResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.categories.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let config = CatalogConfig {
            base_url: "http://127.0.0.1:1".into(),
            timeout_secs: 2,
            ..Default::default()
        };
        let catalog = HttpCatalog::new(&config).unwrap();
        let err = catalog.agents().await.unwrap_err();
        assert!(matches!(err, FlowdeckError::Catalog { .. }));
    }
}
