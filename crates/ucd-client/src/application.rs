//! Applications, application processes and snapshots.

use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;
use ucd_core::encode::encode_path;
use ucd_core::id::{ApplicationId, ApplicationProcessId, ComponentId, ProcessRequestId, SnapshotId};
use ucd_core::{ConflictRetry, Error, QueryParams, RestClient};

use crate::models::{
    decode_id, decode_wrapped_array, new_property, Application, ApplicationProcessRequest,
    Component, ComponentVersion, CreateApplicationRequest, CreateSnapshotRequest, Environment,
    ProcessRequestStatus, RemoveComponentsRequest, RequestIdRecord, Snapshot,
};
use crate::support::{self, assignment, require, require_all};
use crate::Result;

/// Client for application endpoints.
#[derive(Clone)]
pub struct ApplicationClient {
    inner: RestClient,
    retry: ConflictRetry,
}

impl ApplicationClient {
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

    /// Add a component to an application.
    pub async fn add_component(&self, application: &str, component: &str) -> Result<String> {
        let query = QueryParams::new()
            .with("application", application)
            .with("component", component);
        let exchange = support::call(
            &self.inner,
            Method::PUT,
            "/cli/application/addComponentToApp",
            &query,
        )
        .await?;
        Ok(exchange.into_body().unwrap_or_default())
    }

    /// Tag an application.
    pub async fn add_tag(&self, application: &str, tag: &str) -> Result<String> {
        self.tag(Method::PUT, application, tag).await
    }

    /// Remove a tag from an application.
    pub async fn remove_tag(&self, application: &str, tag: &str) -> Result<String> {
        self.tag(Method::DELETE, application, tag).await
    }

    async fn tag(&self, method: Method, application: &str, tag: &str) -> Result<String> {
        let query = QueryParams::new()
            .with("application", application)
            .with("tag", tag);
        let exchange = support::call(&self.inner, method, "/cli/application/tag", &query).await?;
        Ok(exchange.into_body().unwrap_or_default())
    }

    /// Grant a team access to an application.
    pub async fn add_to_team(&self, application: &str, team: &str, kind: &str) -> Result<()> {
        let query = QueryParams::new()
            .with("team", team)
            .with("type", kind)
            .with("application", application);
        support::call(&self.inner, Method::PUT, "/cli/application/teams", &query).await?;
        Ok(())
    }

    /// Create an application.
    ///
    /// An empty description and a notification scheme of `none` are not sent.
    pub async fn create_application(
        &self,
        request: &CreateApplicationRequest,
    ) -> Result<ApplicationId> {
        let mut payload = request.clone();
        payload.description = payload.description.filter(|d| !d.is_empty());
        payload.notification_scheme = payload
            .notification_scheme
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"));

        let exchange = support::call_with_json(
            &self.inner,
            Method::PUT,
            "/cli/application/create",
            &QueryParams::new(),
            &payload,
        )
        .await?;
        let id = decode_id(&exchange)?;
        debug!(%id, name = %request.name, "created application");
        Ok(id)
    }

    /// Create an application process from its JSON definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] before any request if `definition` is not JSON.
    pub async fn create_application_process(
        &self,
        definition: &str,
    ) -> Result<ApplicationProcessId> {
        let payload: Value = serde_json::from_str(definition)?;
        let exchange = support::call_with_json(
            &self.inner,
            Method::PUT,
            "/cli/applicationProcess/create",
            &QueryParams::new(),
            &payload,
        )
        .await?;
        decode_id(&exchange)
    }

    /// Fetch an application by name or id.
    pub async fn get_application(&self, application: &str) -> Result<Application> {
        let query = QueryParams::new().with("application", application);
        support::get_json(&self.inner, "/cli/application/info", &query).await
    }

    /// List the components of an application.
    pub async fn get_application_components(&self, application: &str) -> Result<Vec<Component>> {
        let query = QueryParams::new().with("application", application);
        support::get_json(&self.inner, "/cli/application/componentsInApplication", &query).await
    }

    /// List the environments of an application.
    pub async fn get_application_environments(
        &self,
        application: &str,
        active: bool,
        inactive: bool,
    ) -> Result<Vec<Environment>> {
        let query = QueryParams::new()
            .with("application", application)
            .with("active", active)
            .with("inactive", inactive);
        support::get_json(&self.inner, "/cli/application/environmentsInApplication", &query).await
    }

    /// Fetch an application process definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the server answers "no content".
    pub async fn get_application_process(&self, application: &str, process: &str) -> Result<Value> {
        let query = QueryParams::new()
            .with("application", application)
            .with("applicationProcess", process);
        let exchange =
            support::call(&self.inner, Method::GET, "/cli/applicationProcess/info", &query).await?;
        if exchange.is_no_content() {
            return Err(Error::NotFound(format!(
                "application process {process} in {application}"
            )));
        }
        exchange.json()
    }

    /// Request a run of an application process.
    pub async fn request_application_process(
        &self,
        request: &ApplicationProcessRequest,
    ) -> Result<ProcessRequestId> {
        let mut payload = request.clone();
        payload.description = payload.description.filter(|d| !d.is_empty());
        payload.snapshot = payload.snapshot.filter(|s| !s.is_empty());

        let exchange = support::call_with_json(
            &self.inner,
            Method::PUT,
            "/cli/applicationProcessRequest/request",
            &QueryParams::new(),
            &payload,
        )
        .await?;
        let record: RequestIdRecord = exchange.json()?;
        debug!(request = %record.request_id, "requested application process");
        Ok(record.request_id)
    }

    /// Result of an application process request, e.g. `SUCCEEDED`.
    pub async fn get_application_process_status(&self, request_id: &str) -> Result<String> {
        let query = QueryParams::new().with("request", request_id);
        let status: ProcessRequestStatus = support::get_json(
            &self.inner,
            "/cli/applicationProcessRequest/requestStatus",
            &query,
        )
        .await?;
        Ok(status.result)
    }

    /// Versions deployed by an application process request.
    pub async fn get_application_process_request_versions(
        &self,
        request_id: &str,
    ) -> Result<Vec<Value>> {
        let path = format!(
            "/rest/deploy/applicationProcessRequest/{}/versions",
            encode_path(request_id)
        );
        let exchange = support::call(&self.inner, Method::GET, &path, &QueryParams::new()).await?;
        decode_wrapped_array(&exchange, "versions")
    }

    /// Properties of an application process request.
    pub async fn get_application_process_request_properties(
        &self,
        request_id: &str,
    ) -> Result<Vec<Value>> {
        let path = format!(
            "/rest/deploy/applicationProcessRequest/{}/properties",
            encode_path(request_id)
        );
        let exchange = support::call(&self.inner, Method::GET, &path, &QueryParams::new()).await?;
        decode_wrapped_array(&exchange, "properties")
    }

    /// Set a property on an application process request.
    pub async fn set_application_process_request_property(
        &self,
        request_id: &str,
        name: &str,
        value: &str,
        secure: bool,
    ) -> Result<()> {
        require("processId", request_id)?;
        require("name", name)?;
        let path = format!(
            "/rest/deploy/applicationProcessRequest/{}/saveProperties",
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

    /// Set an application property, retrying on conflicts.
    ///
    /// Returns `name=value`, or `name=****` for secure properties.
    pub async fn set_application_property(
        &self,
        application: &str,
        name: &str,
        value: &str,
        secure: bool,
    ) -> Result<String> {
        require_all(&[application, name])?;
        let query = QueryParams::new()
            .with("application", application)
            .with("name", name)
            .with("value", value)
            .with("isSecure", secure);
        let request = support::request(
            &self.inner,
            Method::PUT,
            "/cli/application/propValue",
            &query,
        )?;
        self.inner
            .retry_execute(&request, Some("set application property"), &self.retry)
            .await?;
        Ok(assignment(name, value, secure))
    }

    /// Find a snapshot of an application by name or id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no snapshot matches.
    pub async fn get_snapshot(&self, application: &str, snapshot: &str) -> Result<Snapshot> {
        let path = format!(
            "/rest/deploy/application/{}/snapshots/false",
            encode_path(application)
        );
        let snapshots: Vec<Snapshot> =
            support::get_json(&self.inner, &path, &QueryParams::new()).await?;
        snapshots
            .into_iter()
            .find(|s| s.name == snapshot || s.id.to_string() == snapshot)
            .ok_or_else(|| Error::NotFound(format!("Could not find snapshot '{snapshot}'")))
    }

    /// Versions pinned by a snapshot.
    pub async fn get_snapshot_versions(&self, snapshot: &str) -> Result<Vec<Value>> {
        let path = format!("/rest/deploy/snapshot/{}/versions", encode_path(snapshot));
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// Create a snapshot pinning the given versions.
    pub async fn create_snapshot(
        &self,
        name: &str,
        description: Option<&str>,
        application: &str,
        versions: &[ComponentVersion],
    ) -> Result<SnapshotId> {
        let payload = CreateSnapshotRequest {
            name: name.to_string(),
            application: application.to_string(),
            description: description.filter(|d| !d.is_empty()).map(str::to_string),
            versions: versions
                .iter()
                .map(|cv| HashMap::from([(cv.component.clone(), cv.version.clone())]))
                .collect(),
        };
        let exchange = support::call_with_json(
            &self.inner,
            Method::PUT,
            "/cli/snapshot/createSnapshot",
            &QueryParams::new(),
            &payload,
        )
        .await?;
        decode_id(&exchange)
    }

    /// Create a snapshot of what is deployed to an environment.
    pub async fn create_snapshot_of_environment(
        &self,
        environment: &str,
        application: Option<&str>,
        name: &str,
        description: Option<&str>,
    ) -> Result<SnapshotId> {
        let mut query = QueryParams::new()
            .with("environment", environment)
            .with("name", name);
        query.push_non_empty("application", application);
        query.push_non_empty("description", description);
        let exchange = support::call(
            &self.inner,
            Method::PUT,
            "/cli/snapshot/createSnapshotOfEnvironment",
            &query,
        )
        .await?;
        decode_id(&exchange)
    }

    /// Remove components, given by name, from an application.
    pub async fn remove_components(&self, application: &str, components: &[&str]) -> Result<Value> {
        let application_id = self.get_application_id(application).await?;
        let mut ids = Vec::with_capacity(components.len());
        for component in components {
            ids.push(self.get_component_id(component).await?);
        }

        let path = format!("/rest/deploy/application/{application_id}/removeComponents");
        support::call_with_json(
            &self.inner,
            Method::PUT,
            &path,
            &QueryParams::new(),
            &RemoveComponentsRequest { components: ids },
        )
        .await?
        .json()
    }

    /// Delete an application, returning its id.
    pub async fn delete_application(&self, application: &str) -> Result<ApplicationId> {
        let id = self.get_application_id(application).await?;
        let path = format!("/rest/deploy/application/{id}");
        support::call(&self.inner, Method::DELETE, &path, &QueryParams::new()).await?;
        debug!(%id, "deleted application");
        Ok(id)
    }

    async fn get_application_id(&self, application: &str) -> Result<ApplicationId> {
        let query = QueryParams::new().with("application", application);
        let exchange =
            support::call(&self.inner, Method::GET, "/cli/application/info", &query).await?;
        decode_id(&exchange)
    }

    async fn get_component_id(&self, component: &str) -> Result<ComponentId> {
        let query = QueryParams::new().with("component", component);
        let exchange =
            support::call(&self.inner, Method::GET, "/cli/component/info", &query).await?;
        decode_id(&exchange)
    }
}
