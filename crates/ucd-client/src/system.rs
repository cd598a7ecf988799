//! Server-wide configuration and team membership.

use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use ucd_core::{QueryParams, RestClient};

use crate::support::{self, assignment, require_all};
use crate::Result;

const SYSTEM_CONFIGURATION: &str = "/cli/systemConfiguration";

/// Client for system endpoints.
#[derive(Clone)]
pub struct SystemClient {
    inner: RestClient,
}

impl SystemClient {
    /// Wrap a configured [`RestClient`].
    #[must_use]
    pub fn new(inner: RestClient) -> Self {
        Self { inner }
    }

    /// Add a user to a team under the given role.
    pub async fn add_user_to_team(&self, user: &str, team: &str, kind: &str) -> Result<()> {
        let query = QueryParams::new()
            .with("user", user)
            .with("team", team)
            .with("type", kind);
        support::call(&self.inner, Method::PUT, "/cli/teamsecurity/users", &query).await?;
        Ok(())
    }

    /// Add a group to a team under the given role.
    pub async fn add_group_to_team(&self, group: &str, team: &str, kind: &str) -> Result<()> {
        let query = QueryParams::new()
            .with("group", group)
            .with("team", team)
            .with("type", kind);
        support::call(&self.inner, Method::PUT, "/cli/teamsecurity/groups", &query).await?;
        Ok(())
    }

    /// Current system configuration.
    pub async fn get_system_configuration(&self) -> Result<Value> {
        support::get_json(&self.inner, SYSTEM_CONFIGURATION, &QueryParams::new()).await
    }

    /// Update system configuration settings.
    pub async fn set_system_configuration(
        &self,
        properties: &HashMap<String, String>,
    ) -> Result<()> {
        support::call_with_json(
            &self.inner,
            Method::PUT,
            SYSTEM_CONFIGURATION,
            &QueryParams::new(),
            properties,
        )
        .await?;
        Ok(())
    }

    /// Set a system property.
    ///
    /// Returns `name=value`, or `name=****` for secure properties.
    pub async fn set_system_property(
        &self,
        name: &str,
        value: &str,
        secure: bool,
    ) -> Result<String> {
        require_all(&[name])?;
        let query = QueryParams::new()
            .with("name", name)
            .with("value", value)
            .with("isSecure", secure);
        support::call(
            &self.inner,
            Method::PUT,
            "/cli/systemConfiguration/propValue",
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
    use ucd_core::Error;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> SystemClient {
        SystemClient::new(RestClient::new(server.uri()).unwrap())
    }

    #[tokio::test]
    async fn add_user_to_team() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cli/teamsecurity/users"))
            .and(query_param("user", "jdoe"))
            .and(query_param("team", "Platform Team"))
            .and(query_param("type", "Administrator"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server)
            .add_user_to_team("jdoe", "Platform Team", "Administrator")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn system_configuration_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cli/systemConfiguration"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"enableUIDebugging": false})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/cli/systemConfiguration"))
            .and(body_json(json!({"enableUIDebugging": "true"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let config = client.get_system_configuration().await.unwrap();
        assert_eq!(config["enableUIDebugging"], false);

        let update = HashMap::from([("enableUIDebugging".to_string(), "true".to_string())]);
        client.set_system_configuration(&update).await.unwrap();
    }

    #[tokio::test]
    async fn set_system_property_masks_secure_value() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cli/systemConfiguration/propValue"))
            .and(query_param("name", "smtp.password"))
            .and(query_param("isSecure", "true"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let echo = test_client(&server)
            .set_system_property("smtp.password", "hunter2", true)
            .await
            .unwrap();
        assert_eq!(echo, "smtp.password=****");
    }

    #[tokio::test]
    async fn set_system_property_requires_name() {
        let server = MockServer::start().await;
        let err = test_client(&server)
            .set_system_property("", "x", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
