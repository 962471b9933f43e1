//! REST client for the resource engine.
//!
//! Resources live under `{base}/{kind path}/`. Creates are `POST`s to the
//! collection, updates are `PUT`s to the item, and list filters use query
//! parameters such as `id__in`.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::error::{RemoteError, Result, SolutionError};
use crate::model::{Resource, ResourceKind, RoutineObject};

use super::engine::RemoteEngine;

/// HTTP client for the engine API.
#[derive(Debug, Clone)]
pub struct HttpEngineClient {
    /// HTTP client.
    client: Client,
    /// Base URL without trailing slash.
    base_url: String,
    /// API key.
    api_key: String,
}

impl HttpEngineClient {
    /// Creates a client with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RemoteError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn collection_url(&self, kind: ResourceKind) -> String {
        format!("{}/{}/", self.base_url, kind.api_path())
    }

    fn item_url(&self, kind: ResourceKind, id: &str) -> String {
        format!("{}/{}/{id}/", self.base_url, kind.api_path())
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        trace!("{method} {url}");
        self.client
            .request(method, url)
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    /// Sends a request and maps transport and status failures.
    ///
    /// A 404 is returned to the caller as `None`.
    async fn send(&self, request: RequestBuilder) -> Result<Option<Response>> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SolutionError::Remote(RemoteError::AuthenticationFailed {
                message: String::from("Invalid API key"),
            }));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SolutionError::Remote(RemoteError::api_error(status.as_u16(), body)));
        }

        Ok(Some(response))
    }

    async fn json(response: Response) -> Result<Value> {
        response.json().await.map_err(|e| {
            SolutionError::Remote(RemoteError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            })
        })
    }

    /// Fetches a collection, filtered by query parameters.
    async fn list(&self, kind: ResourceKind, query: &[(&str, &str)]) -> Result<Vec<Value>> {
        let url = self.collection_url(kind);
        let request = self.request(Method::GET, &url).query(query);

        let Some(response) = self.send(request).await? else {
            return Ok(Vec::new());
        };

        list_items(Self::json(response).await?)
    }
}

/// Extracts the items of a list response, paginated or not.
fn list_items(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(invalid("list response has no results array")),
        },
        _ => Err(invalid("list response is neither an array nor an object")),
    }
}

fn decode(kind: ResourceKind, value: Value) -> Result<Resource> {
    Resource::from_value(kind, value).map_err(|e| invalid(format!("Malformed {kind}: {e}")))
}

fn invalid(message: impl Into<String>) -> SolutionError {
    SolutionError::Remote(RemoteError::InvalidResponse {
        message: message.into(),
    })
}

#[async_trait]
impl RemoteEngine for HttpEngineClient {
    async fn retrieve(&self, kind: ResourceKind, id: &str) -> Result<Option<Resource>> {
        let url = self.item_url(kind, id);

        match self.send(self.request(Method::GET, &url)).await? {
            Some(response) => decode(kind, Self::json(response).await?).map(Some),
            None => {
                debug!("{kind} {id} not found remotely");
                Ok(None)
            }
        }
    }

    async fn list_by_id(&self, kind: ResourceKind, id: &str) -> Result<Vec<Resource>> {
        self.list(kind, &[("id__in", id)])
            .await?
            .into_iter()
            .map(|value| decode(kind, value))
            .collect()
    }

    async fn list_routines(&self, component_id: &str) -> Result<Vec<RoutineObject>> {
        self.list(ResourceKind::Routine, &[("component", component_id)])
            .await?
            .into_iter()
            .map(|value| {
                serde_json::from_value(value).map_err(|e| invalid(format!("Malformed routine: {e}")))
            })
            .collect()
    }

    async fn save(&self, resource: &Resource) -> Result<Resource> {
        let kind = resource.kind();
        let body = resource
            .to_value()
            .map_err(|e| SolutionError::internal(format!("Failed to encode {kind}: {e}")))?;

        let (method, url) = match resource.id() {
            Some(id) => (Method::PUT, self.item_url(kind, id)),
            None => (Method::POST, self.collection_url(kind)),
        };

        let request = self
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);

        let response = self.send(request).await?.ok_or_else(|| {
            SolutionError::Remote(RemoteError::NotFound {
                kind: kind.to_string(),
                id: resource.id().unwrap_or_default().to_string(),
            })
        })?;

        let saved = decode(kind, Self::json(response).await?)?;
        info!("{method} {kind} '{}' -> {}", saved.name(), saved.id().unwrap_or("?"));
        Ok(saved)
    }

    async fn delete(&self, resource: &Resource) -> Result<()> {
        let kind = resource.kind();
        let id = resource.id().ok_or_else(|| {
            SolutionError::internal(format!("Cannot delete {kind} '{}' without an id", resource.name()))
        })?;

        let url = self.item_url(kind, id);
        if self.send(self.request(Method::DELETE, &url)).await?.is_none() {
            debug!("{kind} {id} was already gone");
        }

        info!("Deleted {kind} '{}' ({id})", resource.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Attribute};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header as header_matcher, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> HttpEngineClient {
        HttpEngineClient::new(&server.uri(), "test-key").expect("client")
    }

    #[tokio::test]
    async fn test_retrieve_decodes_resource() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/A1/"))
            .and(header_matcher("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "A1",
                "name": "Tank1",
                "attributes": [{"id": "T1", "name": "temperature", "type": "number"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let resource = client
            .retrieve(ResourceKind::Asset, "A1")
            .await
            .expect("retrieve")
            .expect("found");

        assert_eq!(
            resource,
            Resource::Asset(
                Asset::new("Tank1")
                    .with_id("A1")
                    .with_attribute(Attribute::new("temperature", "number").with_id("T1"))
            )
        );
    }

    #[tokio::test]
    async fn test_retrieve_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/F1/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let resource = client.retrieve(ResourceKind::File, "F1").await.expect("retrieve");
        assert!(resource.is_none());
    }

    #[tokio::test]
    async fn test_list_by_id_accepts_paginated_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets/"))
            .and(query_param("id__in", "S1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "results": [{"id": "S1", "name": "token"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let found = client.list_by_id(ResourceKind::Secret, "S1").await.expect("list");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), Some("S1"));
    }

    #[tokio::test]
    async fn test_save_without_id_posts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/assets/"))
            .and(body_partial_json(json!({"name": "Tank1"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "A1", "name": "Tank1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let saved = client
            .save(&Resource::Asset(Asset::new("Tank1")))
            .await
            .expect("save");
        assert_eq!(saved.id(), Some("A1"));
    }

    #[tokio::test]
    async fn test_save_with_id_puts() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/assets/A1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "A1", "name": "Tank1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client
            .save(&Resource::Asset(Asset::new("Tank1").with_id("A1")))
            .await
            .expect("save");
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/A1/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.retrieve(ResourceKind::Asset, "A1").await.unwrap_err();
        assert!(matches!(
            err,
            SolutionError::Remote(RemoteError::AuthenticationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_routines_filters_by_component() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/routines/"))
            .and(query_param("component", "C1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "R1", "name": "control", "component": "C1"}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let routines = client.list_routines("C1").await.expect("list");
        assert_eq!(routines[0].component.as_deref(), Some("C1"));
    }

    #[test]
    fn test_list_items_rejects_scalars() {
        assert!(list_items(json!("nope")).is_err());
        assert_eq!(list_items(json!([1, 2])).expect("items").len(), 2);
    }
}
