//! HTTP client for the district data service.
//!
//! List endpoints are `GET {base}/{entity}` with equality filters as query
//! parameters. Free-text queries go to `POST {base}/query` as `{"query": ...}`.
//! List responses may be a bare array or an object wrapping one under
//! `items` or `data`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::DataServiceConfig;
use crate::domain::ports::DataService;
use crate::infrastructure::logging::scrub_secrets;

#[derive(Debug, Clone)]
pub struct HttpDataService {
    http: Client,
    base_url: String,
}

impl HttpDataService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> DomainResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("provost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::DataServiceError(format!("failed to build client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `None` when no base URL is configured.
    pub fn from_config(config: &DataServiceConfig) -> DomainResult<Option<Self>> {
        match config.base_url.as_deref().map(str::trim) {
            Some(base) if !base.is_empty() => {
                Self::new(base, Duration::from_secs(config.timeout_secs)).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_json(&self, what: &str, resp: reqwest::Response) -> DomainResult<Value> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::DataServiceError(format!(
                "{what} returned {status}: {}",
                scrub_secrets(&body)
            )));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| DomainError::DataServiceError(format!("{what} parse failed: {e}")))
    }
}

fn unwrap_items(value: Value) -> DomainResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("items").or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(DomainError::DataServiceError(
                "list response carried no item array".to_string(),
            )),
        },
        _ => Err(DomainError::DataServiceError(
            "list response was not an array".to_string(),
        )),
    }
}

#[async_trait]
impl DataService for HttpDataService {
    async fn list(&self, entity: &str, filters: &[(String, String)]) -> DomainResult<Vec<Value>> {
        let url = format!("{}/{}", self.base_url, entity.trim_matches('/'));
        let resp = self
            .http
            .get(&url)
            .query(filters)
            .send()
            .await
            .map_err(|e| DomainError::DataServiceError(format!("list {entity} failed: {e}")))?;
        let body = self.read_json(&format!("list {entity}"), resp).await?;
        unwrap_items(body)
    }

    async fn query(&self, text: &str) -> DomainResult<Value> {
        let url = format!("{}/query", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "query": text }))
            .send()
            .await
            .map_err(|e| DomainError::DataServiceError(format!("query failed: {e}")))?;
        self.read_json("query", resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn service(server: &mockito::Server) -> HttpDataService {
        HttpDataService::new(server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_list_sends_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/students")
            .match_query(Matcher::UrlEncoded("status".into(), "withdrawn".into()))
            .with_status(200)
            .with_body(r#"[{"id": 1, "name": "Ada"}]"#)
            .create_async()
            .await;

        let items = service(&server)
            .list("students", &[("status".to_string(), "withdrawn".to_string())])
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "Ada");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_accepts_wrapped_items() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/staff")
            .with_status(200)
            .with_body(r#"{"items": [{"id": 7}, {"id": 8}], "total": 2}"#)
            .create_async()
            .await;

        let items = service(&server).list("staff", &[]).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_data_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let err = service(&server).query("count students").await.unwrap_err();
        assert!(matches!(&err, DomainError::DataServiceError(msg) if msg.contains("503")));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_query_posts_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/query")
            .match_body(Matcher::Json(serde_json::json!({"query": "count students by grade"})))
            .with_status(200)
            .with_body(r#"{"answer": "412 students", "rows": []}"#)
            .create_async()
            .await;

        let value = service(&server).query("count students by grade").await.unwrap();
        assert_eq!(value["answer"], "412 students");
        mock.assert_async().await;
    }

    #[test]
    fn test_from_config_requires_base_url() {
        assert!(HttpDataService::from_config(&DataServiceConfig::default())
            .unwrap()
            .is_none());
        let config = DataServiceConfig {
            base_url: Some("http://data.local/api/".to_string()),
            ..DataServiceConfig::default()
        };
        let service = HttpDataService::from_config(&config).unwrap().unwrap();
        assert_eq!(service.base_url(), "http://data.local/api");
    }
}
