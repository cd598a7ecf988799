//! Component versions.

use reqwest::Method;
use std::collections::HashMap;
use ucd_core::encode::encode_path;
use ucd_core::id::VersionId;
use ucd_core::{QueryParams, RestClient};

use crate::models::{decode_id, decode_name_values, Version};
use crate::support::{self, assignment, require_all};
use crate::Result;

/// Client for version endpoints.
#[derive(Clone)]
pub struct VersionClient {
    inner: RestClient,
}

impl VersionClient {
    /// Wrap a configured [`RestClient`].
    #[must_use]
    pub fn new(inner: RestClient) -> Self {
        Self { inner }
    }

    /// Create an empty version of a component.
    pub async fn create_version(
        &self,
        component: &str,
        name: &str,
        description: &str,
    ) -> Result<VersionId> {
        let query = QueryParams::new()
            .with("name", name)
            .with("component", component)
            .with("description", description);
        let exchange =
            support::call(&self.inner, Method::POST, "/cli/version/createVersion/", &query).await?;
        decode_id(&exchange)
    }

    /// Delete a version.
    pub async fn delete_version(&self, id: VersionId) -> Result<()> {
        let path = format!("/rest/deploy/version/{id}");
        support::call(&self.inner, Method::DELETE, &path, &QueryParams::new()).await?;
        Ok(())
    }

    /// Fetch a version by id.
    pub async fn get_version(&self, id: &str) -> Result<Version> {
        let path = format!("/rest/deploy/version/{}", encode_path(id));
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// Properties of a version. `component` is needed when `version` is a name.
    pub async fn get_version_properties(
        &self,
        version: &str,
        component: Option<&str>,
    ) -> Result<HashMap<String, String>> {
        let mut query = QueryParams::new().with("version", version);
        query.push_non_empty("component", component);
        let exchange = support::call(
            &self.inner,
            Method::GET,
            "/cli/version/versionProperties",
            &query,
        )
        .await?;
        decode_name_values(&exchange)
    }

    /// Set a version property.
    ///
    /// Returns `name=value`, or `name=****` for secure properties.
    pub async fn set_version_property(
        &self,
        version: &str,
        component: Option<&str>,
        name: &str,
        value: &str,
        secure: bool,
    ) -> Result<String> {
        require_all(&[version, name])?;
        let mut query = QueryParams::new()
            .with("version", version)
            .with("name", name)
            .with("value", value)
            .with("isSecure", secure);
        query.push_non_empty("component", component);
        support::call(
            &self.inner,
            Method::PUT,
            "/cli/version/versionProperties",
            &query,
        )
        .await?;
        Ok(assignment(name, value, secure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VERSION_ID: &str = "7c8d9e0f-1a2b-4c3d-9e4f-5a6b7c8d9e0f";

    fn test_client(server: &MockServer) -> VersionClient {
        VersionClient::new(RestClient::new(server.uri()).unwrap())
    }

    #[tokio::test]
    async fn create_version_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cli/version/createVersion/"))
            .and(query_param("name", "1.4.0"))
            .and(query_param("component", "api"))
            .and(query_param("description", "nightly build"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": VERSION_ID})))
            .expect(1)
            .mount(&server)
            .await;

        let id = test_client(&server)
            .create_version("api", "1.4.0", "nightly build")
            .await
            .unwrap();
        assert_eq!(id.to_string(), VERSION_ID);
    }

    #[tokio::test]
    async fn get_version_decodes_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/rest/deploy/version/{VERSION_ID}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": VERSION_ID,
                "name": "1.4.0",
                "created": 1_700_000_000_000_i64,
                "archived": false,
                "type": "FULL"
            })))
            .mount(&server)
            .await;

        let version = test_client(&server).get_version(VERSION_ID).await.unwrap();
        assert_eq!(version.name, "1.4.0");
        assert_eq!(version.archived, Some(false));
        assert_eq!(version.extra["type"], "FULL");
        assert_eq!(version.created.unwrap().timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn version_properties_as_map() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cli/version/versionProperties"))
            .and(query_param("version", "1.4.0"))
            .and(query_param("component", "api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "commit", "value": "abc123"},
                {"name": "branch", "value": "main"}
            ])))
            .mount(&server)
            .await;

        let properties = test_client(&server)
            .get_version_properties("1.4.0", Some("api"))
            .await
            .unwrap();
        assert_eq!(properties.len(), 2);
        assert_eq!(properties["commit"], "abc123");
    }

    #[tokio::test]
    async fn set_version_property_omits_empty_component() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cli/version/versionProperties"))
            .and(query_param("version", VERSION_ID))
            .and(query_param("isSecure", "false"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let echo = test_client(&server)
            .set_version_property(VERSION_ID, Some(""), "commit", "abc123", false)
            .await
            .unwrap();
        assert_eq!(echo, "commit=abc123");
        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].url.query().unwrap_or_default().contains("component"));
    }
}
