//! Components, their versions and component process requests.

use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;
use ucd_core::encode::encode_path;
use ucd_core::id::ComponentId;
use ucd_core::{QueryParams, RestClient};

use crate::models::{
    decode_id, decode_name_values, new_property, Application, Component, CreateComponentRequest,
    ImportVersionsRequest, NameRecord, Version,
};
use crate::support::{self, assignment, require, require_all};
use crate::Result;

/// Filter that restricts a version listing to archived versions.
const ARCHIVED_FILTER: [(&str, &str); 4] = [
    ("filterFields", "archived"),
    ("filterValue_archived", "true"),
    ("filterType_archived", "eq"),
    ("filterClass_archived", "Boolean"),
];

/// Client for component endpoints.
#[derive(Clone)]
pub struct ComponentClient {
    inner: RestClient,
}

impl ComponentClient {
    /// Wrap a configured [`RestClient`].
    #[must_use]
    pub fn new(inner: RestClient) -> Self {
        Self { inner }
    }

    /// Attach a link to a component version.
    pub async fn add_version_link(
        &self,
        component: &str,
        version: &str,
        title: &str,
        link: &str,
    ) -> Result<()> {
        let query = QueryParams::new()
            .with("component", component)
            .with("version", version)
            .with("linkName", title)
            .with("link", link);
        support::call(&self.inner, Method::PUT, "/cli/version/addLink", &query).await?;
        Ok(())
    }

    /// Apply a status to a component version.
    pub async fn add_version_status(
        &self,
        component: &str,
        version: &str,
        status: &str,
    ) -> Result<()> {
        let query = version_status_query(component, version, status);
        support::call(&self.inner, Method::PUT, "/cli/version/addStatus", &query).await?;
        Ok(())
    }

    /// Remove a status from a component version.
    pub async fn remove_version_status(
        &self,
        component: &str,
        version: &str,
        status: &str,
    ) -> Result<()> {
        let query = version_status_query(component, version, status);
        support::call(&self.inner, Method::DELETE, "/cli/version/status", &query).await?;
        Ok(())
    }

    /// Grant a team access to a component.
    pub async fn add_to_team(&self, component: &str, team: &str, kind: &str) -> Result<()> {
        let query = QueryParams::new()
            .with("team", team)
            .with("type", kind)
            .with("component", component);
        support::call(&self.inner, Method::PUT, "/cli/component/teams", &query).await?;
        Ok(())
    }

    /// Tag a component.
    pub async fn add_tag(&self, component: &str, tag: &str) -> Result<String> {
        self.tag(Method::PUT, component, tag).await
    }

    /// Remove a tag from a component.
    pub async fn remove_tag(&self, component: &str, tag: &str) -> Result<String> {
        self.tag(Method::DELETE, component, tag).await
    }

    async fn tag(&self, method: Method, component: &str, tag: &str) -> Result<String> {
        let query = QueryParams::new()
            .with("component", component)
            .with("tag", tag);
        let exchange = support::call(&self.inner, method, "/cli/component/tag", &query).await?;
        Ok(exchange.into_body().unwrap_or_default())
    }

    /// Create a component.
    pub async fn create_component(&self, request: &CreateComponentRequest) -> Result<ComponentId> {
        let mut payload = request.clone();
        payload.default_version_type = payload.default_version_type.to_uppercase();
        payload.description = payload.description.filter(|d| !d.is_empty());
        payload.template_name = payload.template_name.filter(|t| !t.is_empty());
        payload.template_version = payload.template_version.filter(|v| *v > 0);

        let exchange = support::call_with_json(
            &self.inner,
            Method::PUT,
            "/cli/component/create",
            &QueryParams::new(),
            &payload,
        )
        .await?;
        let id = decode_id(&exchange)?;
        debug!(%id, name = %request.name, "created component");
        Ok(id)
    }

    /// Delete a component, returning its id.
    pub async fn delete_component(&self, component: &str) -> Result<ComponentId> {
        let id = self.get_component_id(component).await?;
        let path = format!("/rest/deploy/component/{id}");
        support::call(&self.inner, Method::DELETE, &path, &QueryParams::new()).await?;
        debug!(%id, "deleted component");
        Ok(id)
    }

    /// Ask the server to import new versions from the source configuration.
    pub async fn import_versions(
        &self,
        component: &str,
        properties: &HashMap<String, String>,
    ) -> Result<()> {
        support::call_with_json(
            &self.inner,
            Method::PUT,
            "/cli/component/integrate",
            &QueryParams::new(),
            &ImportVersionsRequest {
                component,
                properties,
            },
        )
        .await?;
        Ok(())
    }

    /// Applications that include a component.
    pub async fn get_component_applications(&self, component: &str) -> Result<Vec<Application>> {
        let id = self.get_component_id(component).await?;
        let path = format!("/rest/deploy/component/{id}/applications");
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// Create an empty version of a component.
    pub async fn create_component_version(&self, version: &str, component: &str) -> Result<()> {
        let query = QueryParams::new()
            .with("name", version)
            .with("component", component);
        support::call(&self.inner, Method::POST, "/cli/version/createVersion", &query).await?;
        Ok(())
    }

    /// Fetch a component by name or id.
    pub async fn get_component(&self, component: &str) -> Result<Component> {
        let query = QueryParams::new().with("component", component);
        support::get_json(&self.inner, "/cli/component/info", &query).await
    }

    /// Resolve a component name to its id.
    pub async fn get_component_id(&self, component: &str) -> Result<ComponentId> {
        let query = QueryParams::new().with("component", component);
        let exchange =
            support::call(&self.inner, Method::GET, "/cli/component/info", &query).await?;
        decode_id(&exchange)
    }

    /// Property sheet definition shared by the versions of a component.
    ///
    /// # Errors
    ///
    /// Returns [`ucd_core::Error::Parse`] if the component has none.
    pub async fn get_version_prop_sheet_def(&self, component: &str) -> Result<Value> {
        self.get_component(component)
            .await?
            .version_prop_sheet_def
            .ok_or_else(|| {
                ucd_core::Error::Parse(format!("component {component} has no versionPropSheetDef"))
            })
    }

    /// Properties of a component.
    pub async fn get_component_properties(
        &self,
        component: &str,
    ) -> Result<HashMap<String, String>> {
        let query = QueryParams::new().with("component", component);
        let exchange =
            support::call(&self.inner, Method::GET, "/cli/component/getProperties", &query).await?;
        decode_name_values(&exchange)
    }

    /// Fetch a component process request.
    pub async fn get_process_request(&self, request_id: &str) -> Result<Value> {
        let path = format!(
            "/rest/deploy/componentProcessRequest/{}",
            encode_path(request_id)
        );
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// Properties of a component process request.
    pub async fn get_process_request_properties(&self, request_id: &str) -> Result<Vec<Value>> {
        #[derive(serde::Deserialize)]
        struct Properties {
            properties: Vec<Value>,
        }

        let path = format!(
            "/rest/deploy/componentProcessRequest/{}/properties",
            encode_path(request_id)
        );
        let wrapped: Properties = support::get_json(&self.inner, &path, &QueryParams::new()).await?;
        Ok(wrapped.properties)
    }

    /// Set a property on a component process request.
    pub async fn set_process_request_property(
        &self,
        request_id: &str,
        name: &str,
        value: &str,
        secure: bool,
    ) -> Result<()> {
        require("processId", request_id)?;
        require("name", name)?;
        let path = format!(
            "/rest/deploy/componentProcessRequest/{}/saveProperties",
            encode_path(request_id)
        );
        support::call_with_json(
            &self.inner,
            Method::PUT,
            &path,
            &QueryParams::new(),
            &[new_property(name, value, secure)],
        )
        .await?;
        Ok(())
    }

    /// Set a component property.
    ///
    /// Returns `name=value`, or `name=****` for secure properties.
    pub async fn set_component_property(
        &self,
        component: &str,
        name: &str,
        value: &str,
        secure: bool,
    ) -> Result<String> {
        require_all(&[component, name])?;
        let query = QueryParams::new()
            .with("component", component)
            .with("name", name)
            .with("value", value)
            .with("isSecure", secure);
        support::call(&self.inner, Method::PUT, "/cli/component/propValue", &query).await?;
        Ok(assignment(name, value, secure))
    }

    /// Update one property of a component's source configuration.
    pub async fn update_source_config_property(
        &self,
        component: &str,
        name: &str,
        value: &str,
        description: &str,
        secure: bool,
    ) -> Result<()> {
        let mut payload = new_property(name, value, secure);
        payload.description = Some(description.to_string());
        let path = format!(
            "/rest/deploy/component/{}/updateSourceConfigProperties/{}",
            encode_path(component),
            encode_path(name)
        );
        support::call_with_json(&self.inner, Method::PUT, &path, &QueryParams::new(), &payload)
            .await?;
        Ok(())
    }

    /// Versions of a component, optionally including inactive ones.
    pub async fn get_component_versions(
        &self,
        component: &str,
        include_inactive: bool,
    ) -> Result<Vec<Version>> {
        let path = format!(
            "/rest/deploy/component/{}/versions/{include_inactive}",
            encode_path(component)
        );
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// Names of the versions of a component.
    pub async fn get_component_version_names(
        &self,
        component: &str,
        include_inactive: bool,
    ) -> Result<Vec<String>> {
        let path = format!(
            "/rest/deploy/component/{}/versions/{include_inactive}",
            encode_path(component)
        );
        let names: Vec<NameRecord> =
            support::get_json(&self.inner, &path, &QueryParams::new()).await?;
        Ok(names.into_iter().map(|n| n.name).collect())
    }

    /// Names of the archived versions of a component.
    pub async fn get_archived_component_versions(&self, component: &str) -> Result<Vec<String>> {
        let path = format!(
            "/rest/deploy/component/{}/versions/true",
            encode_path(component)
        );
        let mut query = QueryParams::new();
        for (key, value) in ARCHIVED_FILTER {
            query.push(key, value);
        }
        let names: Vec<NameRecord> = support::get_json(&self.inner, &path, &query).await?;
        Ok(names.into_iter().map(|n| n.name).collect())
    }

    /// Name of the latest version of a component; `None` when it has none.
    pub async fn get_latest_version(&self, component: &str) -> Result<Option<String>> {
        let path = format!(
            "/rest/deploy/component/{}/latestVersion",
            encode_path(component)
        );
        let exchange = support::call(&self.inner, Method::GET, &path, &QueryParams::new()).await?;
        if exchange.text().trim().is_empty() {
            return Ok(None);
        }
        let latest: NameRecord = exchange.json()?;
        Ok(Some(latest.name))
    }
}

fn version_status_query(component: &str, version: &str, status: &str) -> QueryParams {
    QueryParams::new()
        .with("component", component)
        .with("version", version)
        .with("status", status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ucd_core::Error;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COMP_ID: &str = "7d1f2a44-0e38-4b7e-9d0c-41d5e2a7c9f3";
    const ROLE_ID: &str = "5a3c8f0e-1d2b-4c6a-9e7f-8b0a1c2d3e4f";

    fn test_client(server: &MockServer) -> ComponentClient {
        ComponentClient::new(RestClient::new(server.uri()).unwrap())
    }

    #[tokio::test]
    async fn get_component_decodes_role_and_prop_sheet() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cli/component/info"))
            .and(query_param("component", "api/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": COMP_ID,
                "name": "api/v2",
                "resourceRole": {"id": ROLE_ID, "name": "api/v2"},
                "versionPropSheetDef": {"id": "psd", "path": "components/x"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let component = client.get_component("api/v2").await.unwrap();
        assert_eq!(component.resource_role.unwrap().id.to_string(), ROLE_ID);
        let sheet = client.get_version_prop_sheet_def("api/v2").await.unwrap();
        assert_eq!(sheet["path"], "components/x");
    }

    #[tokio::test]
    async fn create_component_normalizes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cli/component/create"))
            .and(body_json(json!({
                "name": "api",
                "sourceConfigPlugin": "Git",
                "defaultVersionType": "FULL",
                "importAutomatically": false,
                "useVfs": true,
                "properties": {"Git/repoUrl": "https://git.example.com/api.git"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": COMP_ID})))
            .expect(1)
            .mount(&server)
            .await;

        let request = CreateComponentRequest {
            name: "api".into(),
            source_config_plugin: "Git".into(),
            default_version_type: "full".into(),
            template_version: Some(0),
            use_vfs: true,
            properties: HashMap::from([(
                "Git/repoUrl".to_string(),
                "https://git.example.com/api.git".to_string(),
            )]),
            ..CreateComponentRequest::default()
        };
        let id = test_client(&server).create_component(&request).await.unwrap();
        assert_eq!(id.to_string(), COMP_ID);
    }

    #[tokio::test]
    async fn get_component_properties_builds_map() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cli/component/getProperties"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "port", "value": "8080"},
                {"name": "host", "value": "api.local"}
            ])))
            .mount(&server)
            .await;

        let props = test_client(&server)
            .get_component_properties("api")
            .await
            .unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props["port"], "8080");
    }

    #[tokio::test]
    async fn archived_versions_use_filter_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/deploy/component/api/versions/true"))
            .and(query_param("filterFields", "archived"))
            .and(query_param("filterValue_archived", "true"))
            .and(query_param("filterType_archived", "eq"))
            .and(query_param("filterClass_archived", "Boolean"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "0.9"}, {"name": "0.8"}
            ])))
            .mount(&server)
            .await;

        let names = test_client(&server)
            .get_archived_component_versions("api")
            .await
            .unwrap();
        assert_eq!(names, vec!["0.9", "0.8"]);
    }

    #[tokio::test]
    async fn latest_version_handles_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/deploy/component/empty/latestVersion"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/deploy/component/api/latestVersion"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "1.4"})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert_eq!(client.get_latest_version("empty").await.unwrap(), None);
        assert_eq!(
            client.get_latest_version("api").await.unwrap().as_deref(),
            Some("1.4")
        );
    }

    #[tokio::test]
    async fn set_component_property_echoes_assignment() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cli/component/propValue"))
            .and(query_param("component", "api"))
            .and(query_param("name", "port"))
            .and(query_param("value", "8080"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let echo = test_client(&server)
            .set_component_property("api", "port", "8080", false)
            .await
            .unwrap();
        assert_eq!(echo, "port=8080");
    }

    #[tokio::test]
    async fn set_component_property_does_not_retry_conflicts() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cli/component/propValue"))
            .respond_with(ResponseTemplate::new(409))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server)
            .set_component_property("api", "port", "8080", false)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
    }

    #[tokio::test]
    async fn update_source_config_property_encodes_segments() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(
                "/rest/deploy/component/api/updateSourceConfigProperties/Git%2FrepoUrl",
            ))
            .and(body_json(json!({
                "name": "Git/repoUrl",
                "value": "https://git.example.com/api.git",
                "secure": false,
                "description": "clone url"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server)
            .update_source_config_property(
                "api",
                "Git/repoUrl",
                "https://git.example.com/api.git",
                "clone url",
                false,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_component_missing_is_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cli/component/info"))
            .respond_with(ResponseTemplate::new(404).set_body_string("No component"))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .delete_component("ghost")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::request(404, "Not Found", Some("No component".into()))
        );
    }
}
