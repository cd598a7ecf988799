//! The resource tree: resources, roles, inventory and templates.

use reqwest::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;
use ucd_core::encode::encode_path;
use ucd_core::id::{ResourceId, ResourceRoleId};
use ucd_core::{Error, PollConfig, QueryParams, RestClient};

use crate::component::ComponentClient;
use crate::models::{
    decode_id, decode_prop_sheet, CreateResourceRequest, CreateResourceRoleRequest,
    CreateSubResourceRequest, InventoryEntry, InventoryUpdate, NameRecord, PropSheetEntry,
    Resource, ResourceRole,
};
use crate::support::{self, assignment, require_all};
use crate::Result;

/// Prefix the template endpoint expects on property names.
const TEMPLATE_PROPERTY_PREFIX: &str = "p_";

/// Client for resource endpoints.
#[derive(Clone)]
pub struct ResourceClient {
    inner: RestClient,
    components: ComponentClient,
}

impl ResourceClient {
    /// Wrap a configured [`RestClient`].
    #[must_use]
    pub fn new(inner: RestClient) -> Self {
        let components = ComponentClient::new(inner.clone());
        Self { inner, components }
    }

    /// Grant a team access to a resource.
    pub async fn add_to_team(&self, resource: &str, team: &str, kind: &str) -> Result<()> {
        let query = QueryParams::new()
            .with("team", team)
            .with("type", kind)
            .with("resource", resource);
        support::call(&self.inner, Method::PUT, "/cli/resource/teams", &query).await?;
        Ok(())
    }

    /// Tag a resource, returning the server's reply.
    pub async fn add_tag(&self, resource: &str, tag: &str) -> Result<String> {
        self.tag(Method::PUT, resource, tag).await
    }

    /// Remove a tag from a resource, returning the server's reply.
    pub async fn remove_tag(&self, resource: &str, tag: &str) -> Result<String> {
        self.tag(Method::DELETE, resource, tag).await
    }

    async fn tag(&self, method: Method, resource: &str, tag: &str) -> Result<String> {
        let query = QueryParams::new()
            .with("resource", resource)
            .with("tag", tag);
        let exchange = support::call(&self.inner, method, "/cli/resource/tag", &query).await?;
        Ok(exchange.into_body().unwrap_or_default())
    }

    /// Add a role to a resource with the given role properties.
    pub async fn set_role_on_resource(
        &self,
        resource: &str,
        role: &str,
        properties: &HashMap<String, String>,
    ) -> Result<()> {
        let path = format!(
            "/rest/resource/resource/{}/role/{}",
            encode_path(resource),
            encode_path(role)
        );
        support::call_with_json(
            &self.inner,
            Method::POST,
            &path,
            &QueryParams::new(),
            properties,
        )
        .await?;
        Ok(())
    }

    /// Record a resource inventory entry.
    pub async fn create_inventory_entry(
        &self,
        deployment_request: &str,
        entry: &InventoryEntry,
    ) -> Result<()> {
        support::call_with_json(
            &self.inner,
            Method::PUT,
            "/rest/inventory/entries",
            &QueryParams::new(),
            &InventoryUpdate {
                deployment_request,
                entries: [entry],
            },
        )
        .await?;
        Ok(())
    }

    /// Create a resource, returning the server's reply.
    ///
    /// When `role` names a component, the component's resource role is used
    /// so an older role with the same name is not picked up.
    pub async fn create_resource(&self, request: &CreateResourceRequest) -> Result<String> {
        let mut payload = CreateResourceRequest {
            name: request.name.clone(),
            parent: non_empty(request.parent.as_deref()),
            role: None,
            agent: non_empty(request.agent.as_deref()),
            agent_pool: None,
        };
        if payload.agent.is_none() {
            payload.agent_pool = non_empty(request.agent_pool.as_deref());
        }
        if let Some(role) = non_empty(request.role.as_deref()) {
            payload.role = Some(self.resolve_role(role).await?);
        }

        let exchange = support::call_with_json(
            &self.inner,
            Method::PUT,
            "/cli/resource/create",
            &QueryParams::new(),
            &payload,
        )
        .await?;
        debug!(name = %payload.name, "created resource");
        Ok(exchange.into_body().unwrap_or_default())
    }

    async fn resolve_role(&self, role: String) -> Result<String> {
        match self.components.get_component(&role).await {
            Ok(component) => Ok(component
                .resource_role
                .map_or(role, |resource_role| resource_role.id.to_string())),
            Err(Error::Request { status, .. }) => {
                debug!(%role, status, "no component defines this role");
                Ok(role)
            }
            Err(err) => Err(err),
        }
    }

    /// Create a resource role.
    pub async fn create_resource_role(
        &self,
        name: &str,
        description: &str,
    ) -> Result<ResourceRoleId> {
        let exchange = support::call_with_json(
            &self.inner,
            Method::POST,
            "/rest/resource/resourceRole",
            &QueryParams::new(),
            &CreateResourceRoleRequest { name, description },
        )
        .await?;
        decode_id(&exchange)
    }

    /// Create a resource under an existing parent.
    pub async fn create_sub_resource(
        &self,
        parent_id: ResourceId,
        name: &str,
        description: &str,
    ) -> Result<ResourceId> {
        let exchange = support::call_with_json(
            &self.inner,
            Method::PUT,
            "/rest/resource/resource",
            &QueryParams::new(),
            &CreateSubResourceRequest {
                name,
                parent_id,
                description,
            },
        )
        .await?;
        decode_id(&exchange)
    }

    /// Delete a resource.
    pub async fn delete_resource(&self, resource: &str) -> Result<()> {
        let query = QueryParams::new().with("resource", resource);
        support::call(
            &self.inner,
            Method::DELETE,
            "/cli/resource/deleteResource",
            &query,
        )
        .await?;
        Ok(())
    }

    /// Drop the inventory of a component version on a resource.
    pub async fn delete_inventory_for_component(
        &self,
        resource: &str,
        component: &str,
        version: &str,
        status: &str,
    ) -> Result<()> {
        let query = QueryParams::new()
            .with("resource", resource)
            .with("component", component)
            .with("version", version)
            .with("status", status);
        support::call(
            &self.inner,
            Method::DELETE,
            "/rest/inventory/resourceInventoryForComponent/",
            &query,
        )
        .await?;
        Ok(())
    }

    /// Latest version of a component deployed to a resource.
    pub async fn get_latest_version_by_resource_and_component(
        &self,
        resource_id: &str,
        component_id: &str,
    ) -> Result<Value> {
        let path = format!(
            "/rest/inventory/versionByResourceAndComponent/{}/{}",
            encode_path(resource_id),
            encode_path(component_id)
        );
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// Fetch a resource by path or id.
    pub async fn get_resource(&self, resource: &str) -> Result<Resource> {
        let path = format!("/rest/resource/resource/{}", encode_path(resource));
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// Direct children of a resource.
    pub async fn get_resource_children(&self, parent: &str) -> Result<Vec<Resource>> {
        let query = QueryParams::new().with("parent", parent);
        support::get_json(&self.inner, "/cli/resource/", &query).await
    }

    /// Raw value of a resource property.
    pub async fn get_resource_property(&self, resource: &str, name: &str) -> Result<String> {
        require_all(&[resource, name])?;
        let query = QueryParams::new()
            .with("resource", resource)
            .with("name", name);
        support::get_text(&self.inner, "/cli/resource/getProperty", &query).await
    }

    /// Fetch a resource role by name.
    pub async fn get_resource_role(&self, role: &str) -> Result<ResourceRole> {
        let path = format!("/rest/resource/resourceRole/{}", encode_path(role));
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// Property sheet a role carries on a resource.
    pub async fn get_resource_role_properties(
        &self,
        role: &str,
        resource: &str,
    ) -> Result<Vec<PropSheetEntry>> {
        require_all(&[role, resource])?;
        let path = format!(
            "/rest/resource/resource/{}/propertiesForRole/{}",
            encode_path(resource),
            encode_path(role)
        );
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// One role property on a resource, falling back to its default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the role defines no such property.
    pub async fn get_resource_role_property(
        &self,
        role: &str,
        resource: &str,
        name: &str,
    ) -> Result<String> {
        let entries = self.get_resource_role_properties(role, resource).await?;
        decode_prop_sheet(&entries)?
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("role property '{name}' on {resource}")))
    }

    /// Roles attached to a resource.
    pub async fn get_resource_roles(&self, resource: &str) -> Result<Vec<ResourceRole>> {
        let path = format!("/rest/resource/resource/{}/roles", encode_path(resource));
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// Names of the roles attached to a resource.
    pub async fn get_resource_role_names(&self, resource: &str) -> Result<Vec<String>> {
        let query = QueryParams::new().with("resource", resource);
        let roles: Vec<NameRecord> =
            support::get_json(&self.inner, "/cli/resource/getRolesForResource", &query).await?;
        Ok(roles.into_iter().map(|role| role.name).collect())
    }

    /// The whole resource tree.
    pub async fn get_resource_tree(&self) -> Result<Value> {
        support::get_json(&self.inner, "/rest/resource/resource/tree", &QueryParams::new()).await
    }

    /// Mark a resource inactive.
    pub async fn inactivate_resource(&self, resource: &str) -> Result<()> {
        let path = format!("/rest/resource/resource/{}/inactivate", encode_path(resource));
        support::call(&self.inner, Method::PUT, &path, &QueryParams::new()).await?;
        Ok(())
    }

    /// Detach a role from a resource.
    pub async fn remove_role_from_resource(&self, resource: &str, role: &str) -> Result<()> {
        let query = QueryParams::new()
            .with("resource", resource)
            .with("role", role);
        support::call(
            &self.inner,
            Method::DELETE,
            "/cli/resource/removeRoleFromResource",
            &query,
        )
        .await?;
        Ok(())
    }

    /// Set a resource property.
    ///
    /// Returns `name=value`, or `name=****` for secure properties.
    pub async fn set_resource_property(
        &self,
        resource: &str,
        name: &str,
        value: &str,
        secure: bool,
    ) -> Result<String> {
        require_all(&[resource, name])?;
        let query = QueryParams::new()
            .with("resource", resource)
            .with("name", name)
            .with("value", value)
            .with("isSecure", secure);
        support::call(&self.inner, Method::PUT, "/cli/resource/setProperty", &query).await?;
        Ok(assignment(name, value, secure))
    }

    /// Overwrite one role property on a resource, keeping the others.
    pub async fn set_resource_role_property(
        &self,
        role: &str,
        resource: &str,
        name: &str,
        value: &str,
    ) -> Result<String> {
        require_all(&[role, resource, name])?;
        let entries = self.get_resource_role_properties(role, resource).await?;
        let mut properties = decode_prop_sheet(&entries)?;
        properties.insert(name.to_string(), value.to_string());

        let path = format!(
            "/rest/resource/resource/{}/savePropertiesForRole/{}",
            encode_path(resource),
            encode_path(role)
        );
        support::call_with_json(
            &self.inner,
            Method::PUT,
            &path,
            &QueryParams::new(),
            &properties,
        )
        .await?;
        Ok(assignment(name, value, false))
    }

    /// Block until the server knows about `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PollTimeout`] when `config.timeout` elapses first.
    pub async fn wait_for_resource_creation(
        &self,
        resource: &str,
        config: PollConfig,
    ) -> Result<()> {
        let query = QueryParams::new().with("resource", resource);
        let request = support::request(&self.inner, Method::GET, "/cli/resource/info", &query)?;
        self.inner
            .wait_for_existence(&request, config, "Resource Creation")
            .await
    }

    /// Differences between two resource trees.
    pub async fn compare_resource_trees(&self, left: &str, right: &str) -> Result<Vec<Value>> {
        let path = format!(
            "/rest/resource/resource/compare/{}/{}",
            encode_path(left),
            encode_path(right)
        );
        support::get_json(&self.inner, &path, &QueryParams::new()).await
    }

    /// Apply changes produced by [`Self::compare_resource_trees`].
    pub async fn sync_resource_trees(&self, changes: &[Value]) -> Result<()> {
        support::call_with_json(
            &self.inner,
            Method::POST,
            "/rest/resource/resource/applyCompareChanges",
            &QueryParams::new(),
            changes,
        )
        .await?;
        Ok(())
    }

    /// Apply a resource template below `target`.
    pub async fn apply_template(
        &self,
        target: &str,
        template_id: &str,
        properties: &HashMap<String, String>,
    ) -> Result<()> {
        let mut payload = Map::new();
        payload.insert("resourceTemplateId".into(), template_id.into());
        payload.insert("targetResourceId".into(), target.into());
        for (key, value) in properties {
            payload.insert(
                format!("{TEMPLATE_PROPERTY_PREFIX}{key}"),
                Value::String(value.clone()),
            );
        }
        support::call_with_json(
            &self.inner,
            Method::PUT,
            "/rest/resource/resource/applyTemplate",
            &QueryParams::new(),
            &payload,
        )
        .await?;
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
