//! Resource clients and data models for UrbanCode Deploy.
//!
//! Each client wraps a shared [`ucd_core::RestClient`] and covers one family
//! of REST endpoints. [`UcdClient`] builds them all from one configuration.

#![deny(missing_docs)]

pub mod agent;
pub mod application;
pub mod component;
pub mod environment;
pub mod models;
pub mod process;
pub mod property;
pub mod resource;
pub mod system;
pub mod version;

mod support;

pub use agent::{AgentClient, AgentInstall};
pub use application::ApplicationClient;
pub use component::ComponentClient;
pub use environment::EnvironmentClient;
pub use models::{
    Agent, Application, ApplicationProcessRequest, Component, ComponentVersion,
    CreateApplicationRequest, CreateComponentRequest, CreateResourceRequest,
    CreateSnapshotRequest, Environment, GenericProcessRequest, InventoryEntry, InventoryRecord,
    NameValue, NamedRef, NewEnvironment, NewProperty, PropDefRequest, PropSheetEntry,
    ProcessRequestStatus, ProvisionEnvironmentRequest, Resource, ResourceRole, Snapshot, Version,
    WorkflowTrace,
};
pub use process::ProcessClient;
pub use property::PropertyClient;
pub use resource::ResourceClient;
pub use system::SystemClient;
pub use version::VersionClient;

use ucd_core::{ConflictRetry, RestClient, ServerConfig};

/// Convenient result alias that reuses the shared UrbanCode Deploy error type.
pub type Result<T> = ucd_core::Result<T>;

/// Every resource client, sharing one connection pool.
#[derive(Clone)]
pub struct UcdClient {
    rest: RestClient,
    applications: ApplicationClient,
    components: ComponentClient,
    environments: EnvironmentClient,
    resources: ResourceClient,
    processes: ProcessClient,
    versions: VersionClient,
    properties: PropertyClient,
    system: SystemClient,
    agents: AgentClient,
}

impl UcdClient {
    /// Build every client on top of `rest`.
    #[must_use]
    pub fn new(rest: RestClient) -> Self {
        Self {
            applications: ApplicationClient::new(rest.clone()),
            components: ComponentClient::new(rest.clone()),
            environments: EnvironmentClient::new(rest.clone()),
            resources: ResourceClient::new(rest.clone()),
            processes: ProcessClient::new(rest.clone()),
            versions: VersionClient::new(rest.clone()),
            properties: PropertyClient::new(rest.clone()),
            system: SystemClient::new(rest.clone()),
            agents: AgentClient::new(rest.clone()),
            rest,
        }
    }

    /// Connect using a server configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        Ok(Self::new(RestClient::from_config(config)?))
    }

    /// Use `retry` for every property write that retries on conflicts.
    #[must_use]
    pub fn with_conflict_retry(mut self, retry: ConflictRetry) -> Self {
        self.applications = self.applications.with_conflict_retry(retry);
        self.environments = self.environments.with_conflict_retry(retry);
        self
    }

    /// The underlying invocation layer.
    #[must_use]
    pub const fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Application endpoints.
    #[must_use]
    pub const fn applications(&self) -> &ApplicationClient {
        &self.applications
    }

    /// Component endpoints.
    #[must_use]
    pub const fn components(&self) -> &ComponentClient {
        &self.components
    }

    /// Environment endpoints.
    #[must_use]
    pub const fn environments(&self) -> &EnvironmentClient {
        &self.environments
    }

    /// Resource endpoints.
    #[must_use]
    pub const fn resources(&self) -> &ResourceClient {
        &self.resources
    }

    /// Generic process endpoints.
    #[must_use]
    pub const fn processes(&self) -> &ProcessClient {
        &self.processes
    }

    /// Version endpoints.
    #[must_use]
    pub const fn versions(&self) -> &VersionClient {
        &self.versions
    }

    /// Property sheet endpoints.
    #[must_use]
    pub const fn properties(&self) -> &PropertyClient {
        &self.properties
    }

    /// System endpoints.
    #[must_use]
    pub const fn system(&self) -> &SystemClient {
        &self.system
    }

    /// Agent endpoints.
    #[must_use]
    pub const fn agents(&self) -> &AgentClient {
        &self.agents
    }
}
