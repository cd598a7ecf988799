//! Typed request payloads, response records and decode functions.
//!
//! Records keep the fields the clients rely on as typed members and collect
//! everything else the server sends in `extra`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;
use ucd_core::id::{
    ApplicationId, ComponentId, EnvironmentId, ProcessRequestId, ResourceId, ResourceRoleId,
    SnapshotId, VersionId,
};
use ucd_core::{Error, Exchange};

use crate::Result;

/// Reference to another object by id and name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamedRef {
    /// Object id, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Object name; empty when the server omits it.
    #[serde(default)]
    pub name: String,
}

/// Application as returned by `/cli/application/info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Application id.
    pub id: ApplicationId,
    /// Application name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation time.
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
    /// Whether the application is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Whether snapshots must cover every component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforce_complete_snapshots: Option<bool>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Component as returned by `/cli/component/info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Component id.
    pub id: ComponentId,
    /// Component name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation time.
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
    /// Whether the component is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Resource role the component defines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_role: Option<ResourceRole>,
    /// Property sheet definition for versions of this component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_prop_sheet_def: Option<Value>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Environment as returned by `/cli/environment/info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Environment id.
    pub id: EnvironmentId,
    /// Environment name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Whether deployments need approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_approvals: Option<bool>,
    /// Whether the environment is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Resource tree node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Resource id.
    pub id: ResourceId,
    /// Resource name.
    pub name: String,
    /// Full path in the resource tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the resource is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Whether an agent is attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_agent: Option<bool>,
    /// Role assigned to the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ResourceRole>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Resource role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRole {
    /// Role id.
    pub id: ResourceRoleId,
    /// Role name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Component version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    /// Version id.
    pub id: VersionId,
    /// Version name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation time.
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
    /// Whether the version is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Whether the version is archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Application snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Snapshot id.
    pub id: SnapshotId,
    /// Snapshot name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation time.
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Agent as returned by `/cli/agentCLI/info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Agent id.
    pub id: String,
    /// Agent name.
    pub name: String,
    /// Connection status, e.g. `ONLINE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Whether the agent is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One row of the desired inventory of an environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InventoryRecord {
    /// Deployed component.
    #[serde(default)]
    pub component: Option<NamedRef>,
    /// Deployed version.
    #[serde(default)]
    pub version: Option<NamedRef>,
    /// Inventory status, e.g. `Active`.
    #[serde(default)]
    pub status: Option<NamedRef>,
}

impl InventoryRecord {
    /// Whether this row records `version` of `component` with `status`.
    #[must_use]
    pub fn matches(&self, component: &str, version: &str, status: &str) -> bool {
        let named = |field: &Option<NamedRef>, expected: &str| {
            field.as_ref().is_some_and(|r| r.name == expected)
        };
        named(&self.component, component)
            && named(&self.version, version)
            && named(&self.status, status)
    }
}

/// Name/value pair as returned by the property listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameValue {
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: String,
}

/// Entry of a role property sheet; `propValue` is absent until a default is overridden.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PropSheetEntry {
    /// Overridden value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_value: Option<NameValue>,
    /// Property definition carrying the default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_def: Option<NameValue>,
}

/// Status of an application process request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessRequestStatus {
    /// Execution status, e.g. `CLOSED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Outcome, e.g. `SUCCEEDED`.
    pub result: String,
}

/// Workflow trace of a generic process request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTrace {
    /// Root activity of the workflow.
    pub root_activity: Activity,
    /// Outcome, present once the workflow has finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Workflow activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    /// Activity state, e.g. `EXECUTING`.
    pub state: String,
}

/// Workflow states that mean the process is over.
pub const TERMINAL_WORKFLOW_STATES: [&str; 2] = ["CLOSED", "COMPLETED"];

impl WorkflowTrace {
    /// Whether the root activity has reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        TERMINAL_WORKFLOW_STATES
            .iter()
            .any(|state| self.root_activity.state.eq_ignore_ascii_case(state))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessRequestRecord {
    pub workflow_trace_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestIdRecord {
    pub request_id: ProcessRequestId,
}

/// Property written through a `saveProperties` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewProperty {
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: String,
    /// Whether the value is masked.
    pub secure: bool,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Build the payload for one property write.
#[must_use]
pub fn new_property(name: &str, value: &str, secure: bool) -> NewProperty {
    NewProperty {
        name: name.to_string(),
        value: value.to_string(),
        secure,
        description: None,
    }
}

/// Payload for `/cli/application/create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    /// Application name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Notification scheme; `none` is treated as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_scheme: Option<String>,
    /// Whether snapshots must cover every component.
    pub enforce_complete_snapshots: bool,
}

/// Version to deploy for one component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentVersion {
    /// Component name.
    pub component: String,
    /// Version name.
    pub version: String,
}

/// Payload for `/cli/applicationProcessRequest/request`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationProcessRequest {
    /// Application name.
    pub application: String,
    /// Application process name.
    pub application_process: String,
    /// Target environment.
    pub environment: String,
    /// Only deploy versions that are not already in the inventory.
    pub only_changed: bool,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Snapshot to deploy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    /// Versions to deploy.
    pub versions: Vec<ComponentVersion>,
}

/// Payload for `/cli/snapshot/createSnapshot`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateSnapshotRequest {
    /// Snapshot name.
    pub name: String,
    /// Application name.
    pub application: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// One `{component: version}` object per pinned version.
    pub versions: Vec<HashMap<String, String>>,
}

/// Payload for `/cli/component/create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateComponentRequest {
    /// Component name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Source configuration plugin name.
    pub source_config_plugin: String,
    /// `FULL` or `INCREMENTAL`; upper-cased before sending.
    pub default_version_type: String,
    /// Component template name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    /// Component template version; only positive values are sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_version: Option<u32>,
    /// Import new versions automatically.
    pub import_automatically: bool,
    /// Store artifacts in the versioned file system.
    pub use_vfs: bool,
    /// Source configuration properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportVersionsRequest<'a> {
    pub component: &'a str,
    pub properties: &'a HashMap<String, String>,
}

/// Payload for `/cli/environment/provisionEnvironment`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionEnvironmentRequest {
    /// Environment name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Application name.
    pub application: String,
    /// Blueprint to provision from.
    pub blueprint: String,
    /// Base resource path.
    pub base_resource: String,
    /// Display color.
    pub color: String,
    /// Whether deployments need approval.
    pub require_approvals: bool,
    /// Environment profile name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_profile_name: Option<String>,
    /// Blueprint node properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_properties: Option<Value>,
}

/// Settings for a new environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEnvironment {
    /// Application name.
    pub application: String,
    /// Environment name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Display color.
    pub color: String,
    /// Whether deployments need approval.
    pub require_approvals: bool,
    /// Blueprint; when set the environment is provisioned from it.
    pub blueprint: Option<String>,
    /// Base resource path for a provisioned environment.
    pub base_resource: String,
    /// Environment profile name for a provisioned environment.
    pub env_profile_name: Option<String>,
    /// Blueprint node properties for a provisioned environment.
    pub node_properties: Option<Value>,
}

/// Inventory change recorded against an environment or resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    /// Environment id, for desired inventory entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    /// Resource id, for resource inventory entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Component id.
    pub component_id: String,
    /// Version id.
    pub version_id: String,
    /// Inventory status name.
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InventoryUpdate<'a> {
    pub deployment_request: &'a str,
    pub entries: [&'a InventoryEntry; 1],
}

/// Settings for a new top-level or child resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceRequest {
    /// Resource name.
    pub name: String,
    /// Parent resource path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Role name, role id or the name of a component defining the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Agent to attach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Agent pool to attach when no agent is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_pool: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateResourceRoleRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSubResourceRequest<'a> {
    pub name: &'a str,
    pub parent_id: ResourceId,
    pub description: &'a str,
}

/// Payload for `/rest/process/request`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenericProcessRequest {
    /// Generic process id or name.
    pub process_id: String,
    /// Process version; latest when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_version: Option<String>,
    /// Resource path the process runs against.
    pub resource: String,
    /// Process properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Property definition payload for a property sheet definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PropDefRequest {
    /// Property name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Label shown in forms.
    pub label: String,
    /// `"true"` when the property is required.
    pub required: String,
    /// Property type, e.g. `TEXT`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Default value.
    pub value: String,
    /// Owning property sheet definition.
    pub definition_group_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RemoveComponentsRequest {
    pub components: Vec<ComponentId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdRecord {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NameRecord {
    pub name: String,
}

/// Decode a `{"id": "<uuid>"}` response into a typed identifier.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the body is not such an object and
/// [`Error::InvalidId`] if the id is not a UUID.
pub fn decode_id<I>(exchange: &Exchange) -> Result<I>
where
    I: FromStr<Err = Error>,
{
    let record: IdRecord = exchange.json()?;
    record.id.parse()
}

/// Decode a `[{"name": .., "value": ..}]` response into a map.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the body has a different shape.
pub fn decode_name_values(exchange: &Exchange) -> Result<HashMap<String, String>> {
    let pairs: Vec<NameValue> = exchange.json()?;
    Ok(pairs.into_iter().map(|p| (p.name, p.value)).collect())
}

/// Flatten a role property sheet into name/value pairs.
///
/// Overridden values win; otherwise the definition's default is used.
///
/// # Errors
///
/// Returns [`Error::Parse`] if an entry carries neither.
pub fn decode_prop_sheet(entries: &[PropSheetEntry]) -> Result<HashMap<String, String>> {
    entries
        .iter()
        .map(|entry| {
            entry
                .prop_value
                .as_ref()
                .or(entry.prop_def.as_ref())
                .map(|pair| (pair.name.clone(), pair.value.clone()))
                .ok_or_else(|| Error::Parse("property has neither propValue nor propDef".into()))
        })
        .collect()
}

/// Collect the scalar fields of a JSON object as strings.
///
/// Nested objects and arrays are skipped; `null` becomes `"null"`.
#[must_use]
pub fn json_as_properties(object: &Map<String, Value>) -> HashMap<String, String> {
    object
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Object(_) | Value::Array(_) => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), text))
        })
        .collect()
}

/// Decode a response that is either `{"<key>": [..]}` or a bare array.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the body is neither.
pub fn decode_wrapped_array(exchange: &Exchange, key: &str) -> Result<Vec<Value>> {
    match exchange.json::<Value>()? {
        Value::Object(mut object) => match object.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(Error::Parse(format!("expected an array under \"{key}\""))),
        },
        Value::Array(items) => Ok(items),
        other => Err(Error::Parse(format!("expected an object or array, got {other}"))),
    }
}
