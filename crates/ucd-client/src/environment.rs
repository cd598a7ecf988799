//! Environments, their properties and inventory.

use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;
use ucd_core::encode::encode_path;
use ucd_core::id::EnvironmentId;
use ucd_core::{ConflictRetry, QueryParams, RestClient};

use crate::models::{
    decode_id, decode_name_values, Environment, InventoryEntry, InventoryRecord, InventoryUpdate,
    NewEnvironment, ProvisionEnvironmentRequest,
};
use crate::support::{self, assignment, require, require_all};
use crate::Result;

/// Client for environment endpoints.
#[derive(Clone)]
pub struct EnvironmentClient {
    inner: RestClient,
    retry: ConflictRetry,
}

impl EnvironmentClient {
    /// Wrap a configured [`RestClient`].
    #[must_use]
    pub fn new(inner: RestClient) -> Self {
        Self {
            inner,
            retry: ConflictRetry::new(),
        }
    }

    /// Override the retry policy used for property writes.
    #[must_use]
    pub const fn with_conflict_retry(mut self, retry: ConflictRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Attach a base resource to an environment.
    pub async fn add_base_resource(
        &self,
        application: Option<&str>,
        environment: &str,
        resource: &str,
    ) -> Result<()> {
        self.base_resource("/cli/environment/addBaseResource", application, environment, resource)
            .await
    }

    /// Detach a base resource from an environment.
    pub async fn remove_base_resource(
        &self,
        application: Option<&str>,
        environment: &str,
        resource: &str,
    ) -> Result<()> {
        self.base_resource(
            "/cli/environment/removeBaseResource",
            application,
            environment,
            resource,
        )
        .await
    }

    async fn base_resource(
        &self,
        endpoint: &str,
        application: Option<&str>,
        environment: &str,
        resource: &str,
    ) -> Result<()> {
        let mut query = QueryParams::new()
            .with("environment", environment)
            .with("resource", resource);
        query.push_non_empty("application", application);
        support::call(&self.inner, Method::PUT, endpoint, &query).await?;
        Ok(())
    }

    /// Grant a team access to an environment.
    pub async fn add_to_team(
        &self,
        application: Option<&str>,
        environment: &str,
        team: &str,
        kind: &str,
    ) -> Result<()> {
        let mut query = QueryParams::new()
            .with("team", team)
            .with("type", kind)
            .with("environment", environment);
        query.push_non_empty("application", application);
        support::call(&self.inner, Method::PUT, "/cli/environment/teams", &query).await?;
        Ok(())
    }

    /// Create an environment, provisioning it from a blueprint when one is given.
    pub async fn create_environment(&self, environment: &NewEnvironment) -> Result<EnvironmentId> {
        let blueprint = environment.blueprint.as_deref().filter(|b| !b.is_empty());

        let id = match blueprint {
            None => {
                let query = QueryParams::new()
                    .with("application", &environment.application)
                    .with("name", &environment.name)
                    .with("description", &environment.description)
                    .with("color", &environment.color)
                    .with("requireApprovals", environment.require_approvals);
                let exchange = support::call(
                    &self.inner,
                    Method::PUT,
                    "/cli/environment/createEnvironment",
                    &query,
                )
                .await?;
                EnvironmentId::parse_str(exchange.text().trim())?
            }
            Some(blueprint) => {
                let payload = ProvisionEnvironmentRequest {
                    name: environment.name.clone(),
                    description: environment.description.clone(),
                    application: environment.application.clone(),
                    blueprint: blueprint.to_string(),
                    base_resource: environment.base_resource.clone(),
                    color: environment.color.clone(),
                    require_approvals: environment.require_approvals,
                    env_profile_name: environment
                        .env_profile_name
                        .clone()
                        .filter(|p| !p.is_empty()),
                    node_properties: environment.node_properties.clone(),
                };
                let exchange = support::call_with_json(
                    &self.inner,
                    Method::PUT,
                    "/cli/environment/provisionEnvironment",
                    &QueryParams::new(),
                    &payload,
                )
                .await?;
                decode_id(&exchange)?
            }
        };
        debug!(%id, name = %environment.name, "created environment");
        Ok(id)
    }

    /// Record a desired inventory entry for an environment.
    pub async fn create_desired_inventory_entry(
        &self,
        deployment_request: &str,
        entry: &InventoryEntry,
    ) -> Result<()> {
        support::call_with_json(
            &self.inner,
            Method::PUT,
            "/rest/inventory/desiredInventory/entries",
            &QueryParams::new(),
            &InventoryUpdate {
                deployment_request,
                entries: [entry],
            },
        )
        .await?;
        Ok(())
    }

    /// Delete an environment.
    pub async fn delete_environment(&self, application: Option<&str>, name: &str) -> Result<()> {
        let mut query = QueryParams::new().with("environment", name);
        query.push_non_empty("application", application);
        support::call(
            &self.inner,
            Method::DELETE,
            "/cli/environment/deleteEnvironment",
            &query,
        )
        .await?;
        Ok(())
    }

    /// Component properties as set in an environment.
    pub async fn get_component_environment_properties(
        &self,
        component: &str,
        environment: &str,
        application: &str,
    ) -> Result<HashMap<String, String>> {
        require_all(&[environment, application])?;
        let query = QueryParams::new()
            .with("environment", environment)
            .with("component", component)
            .with("application", application);
        let exchange = support::call(
            &self.inner,
            Method::GET,
            "/cli/environment/componentProperties",
            &query,
        )
        .await?;
        decode_name_values(&exchange)
    }

    /// Properties of an environment.
    pub async fn get_environment_properties(
        &self,
        environment: &str,
        application: &str,
    ) -> Result<HashMap<String, String>> {
        require_all(&[environment, application])?;
        let query = QueryParams::new()
            .with("environment", environment)
            .with("application", application);
        let exchange =
            support::call(&self.inner, Method::GET, "/cli/environment/getProperties", &query)
                .await?;
        decode_name_values(&exchange)
    }

    /// Fetch an environment by name or id.
    pub async fn get_environment(
        &self,
        environment: &str,
        application: Option<&str>,
    ) -> Result<Environment> {
        support::get_json(&self.inner, "/cli/environment/info", &info_query(environment, application))
            .await
    }

    /// Resolve an environment name to its id.
    pub async fn get_environment_id(
        &self,
        environment: &str,
        application: Option<&str>,
    ) -> Result<EnvironmentId> {
        let exchange = support::call(
            &self.inner,
            Method::GET,
            "/cli/environment/info",
            &info_query(environment, application),
        )
        .await?;
        decode_id(&exchange)
    }

    /// Set a component property for one environment, retrying on conflicts.
    ///
    /// Returns `name=value`, or `name=****` for secure properties.
    pub async fn set_component_environment_property(
        &self,
        component: &str,
        environment: &str,
        application: Option<&str>,
        name: &str,
        value: &str,
        secure: bool,
    ) -> Result<String> {
        require_all(&[component, name, environment])?;
        let mut query = QueryParams::new()
            .with("component", component)
            .with("environment", environment)
            .with("name", name)
            .with("value", value)
            .with("isSecure", secure);
        query.push_non_empty("application", application);
        let request = support::request(
            &self.inner,
            Method::PUT,
            "/cli/environment/componentProperties",
            &query,
        )?;
        self.inner
            .retry_execute(
                &request,
                Some("set component environment property"),
                &self.retry,
            )
            .await?;
        Ok(assignment(name, value, secure))
    }

    /// Set an environment property, retrying on conflicts.
    ///
    /// Returns `name=value`, or `name=****` for secure properties.
    pub async fn set_environment_property(
        &self,
        environment: &str,
        application: Option<&str>,
        name: &str,
        value: &str,
        secure: bool,
    ) -> Result<String> {
        require_all(&[environment, name])?;
        let mut query = QueryParams::new()
            .with("environment", environment)
            .with("name", name)
            .with("value", value)
            .with("isSecure", secure);
        query.push_non_empty("application", application);
        let request =
            support::request(&self.inner, Method::PUT, "/cli/environment/propValue", &query)?;
        self.inner
            .retry_execute(&request, Some("set environment property"), &self.retry)
            .await?;
        Ok(assignment(name, value, secure))
    }

    /// Whether the desired inventory holds `version` of `component` with `status`.
    ///
    /// `environment` may be a name or an id.
    pub async fn verify_inventory_status(
        &self,
        environment: &str,
        application: Option<&str>,
        component: &str,
        version: &str,
        status: &str,
    ) -> Result<bool> {
        let id = match EnvironmentId::parse_str(environment) {
            Ok(id) => id,
            Err(_) => self.get_environment_id(environment, application).await?,
        };
        let path = format!("/rest/inventory/desiredInventory/{id}");
        let records: Vec<InventoryRecord> =
            support::get_json(&self.inner, &path, &QueryParams::new()).await?;
        Ok(records
            .iter()
            .any(|record| record.matches(component, version, status)))
    }

    /// Latest inventory of a component in an environment.
    pub async fn get_latest_inventory_by_component(
        &self,
        environment: &str,
        application: Option<&str>,
        component: &str,
    ) -> Result<Value> {
        let id = self.get_environment_id(environment, application).await?;
        let path = format!(
            "/rest/inventory/versionByEnvironmentAndComponent/{id}/{}",
            encode_path(component)
        );
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// List, and optionally delete, versions of a component the environment no longer needs.
    pub async fn delete_redundant_versions(
        &self,
        environment: &str,
        application: &str,
        component: &str,
        delete: bool,
    ) -> Result<Vec<Value>> {
        self.prune_versions(environment, application, component, "redundantVersions", "deleteRedundant", delete)
            .await
    }

    /// List, and optionally delete, every version of a component in the environment.
    pub async fn delete_all_versions(
        &self,
        environment: &str,
        application: &str,
        component: &str,
        delete: bool,
    ) -> Result<Vec<Value>> {
        self.prune_versions(environment, application, component, "versions", "deleteVersions", delete)
            .await
    }

    async fn prune_versions(
        &self,
        environment: &str,
        application: &str,
        component: &str,
        collection: &str,
        flag: &'static str,
        delete: bool,
    ) -> Result<Vec<Value>> {
        require_all(&[environment, application, component])?;
        let id = self.get_environment_id(environment, Some(application)).await?;
        let path = format!(
            "/cli/environment/{id}/{collection}/{}",
            encode_path(component)
        );
        let query = QueryParams::new().with(flag, delete);
        support::call(&self.inner, Method::DELETE, &path, &query)
            .await?
            .json()
    }

    /// Artifacts of a version that overlap with what is already deployed.
    pub async fn get_overlapping_artifacts(
        &self,
        environment_id: &str,
        component_id: &str,
        resource_id: &str,
        version_id: &str,
    ) -> Result<Vec<Value>> {
        require("envId", environment_id)?;
        require("cmpId", component_id)?;
        require("resourceId", resource_id)?;
        require("versionId", version_id)?;
        let path = format!(
            "/cli/environment/{}/{}/{}/overlappingArtifacts/{}",
            encode_path(environment_id),
            encode_path(component_id),
            encode_path(resource_id),
            encode_path(version_id)
        );
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }
}

fn info_query(environment: &str, application: Option<&str>) -> QueryParams {
    let mut query = QueryParams::new().with("environment", environment);
    query.push_non_empty("application", application);
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ucd_core::Error;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENV_ID: &str = "3e9a1c55-7b2d-4f80-a1c3-5d6e7f8a9b0c";

    fn test_client(server: &MockServer) -> EnvironmentClient {
        EnvironmentClient::new(RestClient::new(server.uri()).unwrap()).with_conflict_retry(
            ConflictRetry::new()
                .with_wait_range(Duration::from_millis(1), Duration::from_millis(1))
                .with_max_attempts(1),
        )
    }

    async fn mount_info(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/cli/environment/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": ENV_ID,
                "name": "prod",
                "color": "#00B2EF"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn create_plain_environment_parses_raw_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cli/environment/createEnvironment"))
            .and(query_param("application", "web"))
            .and(query_param("name", "prod"))
            .and(query_param("color", "#00B2EF"))
            .and(query_param("requireApprovals", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("{ENV_ID}\n")))
            .expect(1)
            .mount(&server)
            .await;

        let environment = NewEnvironment {
            application: "web".into(),
            name: "prod".into(),
            color: "#00B2EF".into(),
            blueprint: Some(String::new()),
            ..NewEnvironment::default()
        };
        let id = test_client(&server)
            .create_environment(&environment)
            .await
            .unwrap();
        assert_eq!(id.to_string(), ENV_ID);
    }

    #[tokio::test]
    async fn create_environment_from_blueprint_provisions() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cli/environment/provisionEnvironment"))
            .and(body_json(json!({
                "name": "prod",
                "description": "",
                "application": "web",
                "blueprint": "three-tier",
                "baseResource": "/cloud",
                "color": "",
                "requireApprovals": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": ENV_ID})))
            .expect(1)
            .mount(&server)
            .await;

        let environment = NewEnvironment {
            application: "web".into(),
            name: "prod".into(),
            require_approvals: true,
            blueprint: Some("three-tier".into()),
            base_resource: "/cloud".into(),
            ..NewEnvironment::default()
        };
        let id = test_client(&server)
            .create_environment(&environment)
            .await
            .unwrap();
        assert_eq!(id.to_string(), ENV_ID);
    }

    #[tokio::test]
    async fn set_environment_property_gives_up_after_retry_limit() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cli/environment/propValue"))
            .and(query_param("environment", "prod"))
            .and(query_param("application", "web"))
            .respond_with(ResponseTemplate::new(409).set_body_string("stale"))
            .expect(2)
            .mount(&server)
            .await;

        let err = test_client(&server)
            .set_environment_property("prod", Some("web"), "port", "80", false)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "409 Conflict\nstale"
        );
    }

    #[tokio::test]
    async fn set_component_environment_property_skips_empty_application() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cli/environment/componentProperties"))
            .and(query_param("component", "api"))
            .and(query_param("environment", "prod"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let echo = test_client(&server)
            .set_component_environment_property("api", "prod", Some(""), "pw", "x", true)
            .await
            .unwrap();
        assert_eq!(echo, "pw=****");
        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].url.query().unwrap_or_default().contains("application"));
    }

    #[tokio::test]
    async fn environment_properties_require_application() {
        let server = MockServer::start().await;
        let err = test_client(&server)
            .get_environment_properties("prod", "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn verify_inventory_status_resolves_names() {
        let server = MockServer::start().await;
        mount_info(&server).await;
        Mock::given(method("GET"))
            .and(path(format!("/rest/inventory/desiredInventory/{ENV_ID}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"component": {"name": "db"}, "version": {"name": "2.0"}, "status": {"name": "Active"}},
                {"component": {"name": "api"}, "version": {"name": "1.2"}, "status": {"name": "Active"}}
            ])))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert!(client
            .verify_inventory_status("prod", Some("web"), "api", "1.2", "Active")
            .await
            .unwrap());
        assert!(!client
            .verify_inventory_status(ENV_ID, None, "api", "1.3", "Active")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn delete_redundant_versions_uses_environment_id() {
        let server = MockServer::start().await;
        mount_info(&server).await;
        Mock::given(method("DELETE"))
            .and(path(format!("/cli/environment/{ENV_ID}/redundantVersions/api").as_str()))
            .and(query_param("deleteRedundant", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "1.0"}])))
            .expect(1)
            .mount(&server)
            .await;

        let deleted = test_client(&server)
            .delete_redundant_versions("prod", "web", "api", true)
            .await
            .unwrap();
        assert_eq!(deleted.len(), 1);
    }

    #[tokio::test]
    async fn overlapping_artifacts_name_missing_argument() {
        let server = MockServer::start().await;
        let err = test_client(&server)
            .get_overlapping_artifacts("e", "c", "", "v")
            .await
            .unwrap_err();
        assert_eq!(err, Error::Validation("resourceId was not supplied".into()));
    }

    #[tokio::test]
    async fn desired_inventory_entry_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/rest/inventory/desiredInventory/entries"))
            .and(body_json(json!({
                "deploymentRequest": "req-1",
                "entries": [{
                    "environmentId": ENV_ID,
                    "componentId": "c",
                    "versionId": "v",
                    "status": "Active"
                }]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let entry = InventoryEntry {
            environment_id: Some(ENV_ID.into()),
            component_id: "c".into(),
            version_id: "v".into(),
            status: "Active".into(),
            ..InventoryEntry::default()
        };
        test_client(&server)
            .create_desired_inventory_entry("req-1", &entry)
            .await
            .unwrap();
    }
}
