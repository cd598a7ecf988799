//! Generic process requests and their workflow traces.

use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use ucd_core::encode::encode_path;
use ucd_core::id::ProcessRequestId;
use ucd_core::{Error, PollConfig, QueryParams, RestClient};

use crate::models::{
    decode_id, new_property, GenericProcessRequest, ProcessRequestRecord, WorkflowTrace,
};
use crate::support::{self, require};
use crate::Result;

/// Client for generic process endpoints.
#[derive(Clone)]
pub struct ProcessClient {
    inner: RestClient,
}

impl ProcessClient {
    /// Wrap a configured [`RestClient`].
    #[must_use]
    pub fn new(inner: RestClient) -> Self {
        Self { inner }
    }

    /// Wait up to `timeout_minutes` for a generic process and return its result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PollTimeout`] if the workflow is still running when
    /// the time is up.
    pub async fn get_generic_process_result(
        &self,
        request_id: &str,
        timeout_minutes: u64,
    ) -> Result<String> {
        self.wait_for_generic_process(request_id, PollConfig::with_timeout_minutes(timeout_minutes))
            .await
    }

    /// Poll the workflow behind a generic process request until it finishes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PollTimeout`] when `config.timeout` elapses and
    /// [`Error::Parse`] if a finished workflow carries no result.
    pub async fn wait_for_generic_process(
        &self,
        request_id: &str,
        config: PollConfig,
    ) -> Result<String> {
        let trace_id = self.get_workflow_trace_id(request_id).await?;
        let path = format!("/rest/workflow/workflowTrace/{}", encode_path(&trace_id));
        let request = support::request(&self.inner, Method::GET, &path, &QueryParams::new())?;

        self.inner
            .wait_for_completion(&request, config, "generic process to finish", |exchange| {
                let trace: WorkflowTrace = exchange.json()?;
                if !trace.is_finished() {
                    debug!(state = %trace.root_activity.state, "workflow still running");
                    return Ok(None);
                }
                trace
                    .result
                    .map(Some)
                    .ok_or_else(|| Error::Parse("finished workflow has no result".into()))
            })
            .await
    }

    /// Properties attached to a process request.
    pub async fn get_process_request_properties(&self, request_id: &str) -> Result<Vec<Value>> {
        let path = format!("/rest/process/request/{}/properties", encode_path(request_id));
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// Workflow trace id behind a process request.
    pub async fn get_workflow_trace_id(&self, request_id: &str) -> Result<String> {
        let path = format!("/rest/process/request/{}", encode_path(request_id));
        let record: ProcessRequestRecord =
            support::get_json(&self.inner, &path, &QueryParams::new()).await?;
        Ok(record.workflow_trace_id)
    }

    /// Start a generic process.
    pub async fn request_generic_process(
        &self,
        request: &GenericProcessRequest,
    ) -> Result<ProcessRequestId> {
        let exchange = support::call_with_json(
            &self.inner,
            Method::POST,
            "/rest/process/request",
            &QueryParams::new(),
            request,
        )
        .await?;
        let id = decode_id(&exchange)?;
        debug!(%id, process = %request.process_id, "requested generic process");
        Ok(id)
    }

    /// Set one property on a process request.
    pub async fn set_process_request_property(
        &self,
        request_id: &str,
        name: &str,
        value: &str,
        secure: bool,
    ) -> Result<()> {
        require("processId", request_id)?;
        require("name", name)?;
        let path = format!("/rest/process/request/{}/saveProperties", encode_path(request_id));
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REQUEST_ID: &str = "5b6c7d8e-9f0a-4b1c-8d2e-3f4a5b6c7d8e";

    fn test_client(server: &MockServer) -> ProcessClient {
        ProcessClient::new(RestClient::new(server.uri()).unwrap())
    }

    fn fast(timeout: Duration) -> PollConfig {
        PollConfig::new(timeout).with_interval(Duration::from_millis(5))
    }

    async fn mount_request(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(format!("/rest/process/request/{REQUEST_ID}").as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"workflowTraceId": "trace-1"})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn generic_process_result_after_running_state() {
        let server = MockServer::start().await;
        mount_request(&server).await;
        Mock::given(method("GET"))
            .and(path("/rest/workflow/workflowTrace/trace-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"rootActivity": {"state": "EXECUTING"}})),
            )
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/workflow/workflowTrace/trace-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rootActivity": {"state": "closed"},
                "result": "SUCCEEDED"
            })))
            .mount(&server)
            .await;

        let result = test_client(&server)
            .wait_for_generic_process(REQUEST_ID, fast(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(result, "SUCCEEDED");
    }

    #[tokio::test]
    async fn generic_process_times_out() {
        let server = MockServer::start().await;
        mount_request(&server).await;
        Mock::given(method("GET"))
            .and(path("/rest/workflow/workflowTrace/trace-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"rootActivity": {"state": "EXECUTING"}})),
            )
            .mount(&server)
            .await;

        let err = test_client(&server)
            .wait_for_generic_process(REQUEST_ID, fast(Duration::from_millis(30)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Timeout waiting for generic process to finish");
    }

    #[tokio::test]
    async fn finished_workflow_without_result_is_parse_error() {
        let server = MockServer::start().await;
        mount_request(&server).await;
        Mock::given(method("GET"))
            .and(path("/rest/workflow/workflowTrace/trace-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"rootActivity": {"state": "COMPLETED"}})),
            )
            .mount(&server)
            .await;

        let err = test_client(&server)
            .wait_for_generic_process(REQUEST_ID, fast(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn request_generic_process_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/process/request"))
            .and(body_json(json!({
                "processId": "restart",
                "resource": "/web/api",
                "properties": {"graceful": "true"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": REQUEST_ID})))
            .expect(1)
            .mount(&server)
            .await;

        let request = GenericProcessRequest {
            process_id: "restart".into(),
            process_version: None,
            resource: "/web/api".into(),
            properties: HashMap::from([("graceful".to_string(), "true".to_string())]),
        };
        let id = test_client(&server)
            .request_generic_process(&request)
            .await
            .unwrap();
        assert_eq!(id.to_string(), REQUEST_ID);
    }

    #[tokio::test]
    async fn set_process_request_property_sends_property_array() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("/rest/process/request/{REQUEST_ID}/saveProperties").as_str()))
            .and(body_json(json!([{"name": "token", "value": "t", "secure": true}])))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server)
            .set_process_request_property(REQUEST_ID, "token", "t", true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn set_process_request_property_requires_id() {
        let server = MockServer::start().await;
        let err = test_client(&server)
            .set_process_request_property("", "token", "t", false)
            .await
            .unwrap_err();
        assert_eq!(err, Error::missing_argument("processId"));
    }
}
