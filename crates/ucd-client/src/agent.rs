//! Agents: lookup, properties and SSH installation.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use ucd_core::{QueryParams, RestClient};

use crate::models::Agent;
use crate::support::{self, assignment, require_all};
use crate::Result;

/// Settings for installing a new agent over SSH.
#[derive(Debug, Clone)]
pub struct AgentInstall {
    /// Agent name.
    pub name: String,
    /// Target host.
    pub host: String,
    /// SSH port on the target host.
    pub port: String,
    /// SSH user.
    pub ssh_username: String,
    /// SSH password.
    pub ssh_password: SecretString,
    /// Installation directory on the target host.
    pub install_dir: String,
    /// Java home on the target host.
    pub java_home_path: String,
    /// Scratch directory used during installation.
    pub temp_dir_path: String,
    /// Server host the agent connects back to.
    pub server_host: String,
    /// Server port the agent connects back to.
    pub server_port: String,
    /// Agent relay or proxy host, empty for none.
    pub proxy_host: String,
    /// Agent relay or proxy port, empty for none.
    pub proxy_port: String,
    /// `"true"` to enable mutual authentication.
    pub mutual_auth: String,
}

impl AgentInstall {
    fn query(&self) -> QueryParams {
        QueryParams::new()
            .with("name", &self.name)
            .with("host", &self.host)
            .with("port", &self.port)
            .with("sshUsername", &self.ssh_username)
            .with("sshPassword", self.ssh_password.expose_secret())
            .with("installDir", &self.install_dir)
            .with("javaHomePath", &self.java_home_path)
            .with("tempDirPath", &self.temp_dir_path)
            .with("serverHost", &self.server_host)
            .with("serverPort", &self.server_port)
            .with("proxyHost", &self.proxy_host)
            .with("proxyPort", &self.proxy_port)
            .with("mutualAuth", &self.mutual_auth)
    }
}

/// Client for agent endpoints.
#[derive(Clone)]
pub struct AgentClient {
    inner: RestClient,
}

impl AgentClient {
    /// Wrap a configured [`RestClient`].
    #[must_use]
    pub fn new(inner: RestClient) -> Self {
        Self { inner }
    }

    /// Delete an agent.
    pub async fn delete_agent(&self, agent: &str) -> Result<()> {
        let query = QueryParams::new().with("agent", agent);
        support::call(&self.inner, Method::DELETE, "/cli/agentCLI", &query).await?;
        Ok(())
    }

    /// Fetch an agent by name or id.
    pub async fn get_agent(&self, agent: &str) -> Result<Agent> {
        let query = QueryParams::new().with("agent", agent);
        support::get_json(&self.inner, "/cli/agentCLI/info", &query).await
    }

    /// Raw value of an agent property.
    pub async fn get_agent_property(&self, agent: &str, name: &str) -> Result<String> {
        require_all(&[agent, name])?;
        let query = QueryParams::new().with("agent", agent).with("name", name);
        support::get_text(&self.inner, "/cli/agentCLI/getProperty", &query).await
    }

    /// Set an agent property.
    ///
    /// Returns `name=value`, or `name=****` for secure properties.
    pub async fn set_agent_property(
        &self,
        agent: &str,
        name: &str,
        value: &str,
        secure: bool,
    ) -> Result<String> {
        require_all(&[agent, name])?;
        let query = QueryParams::new()
            .with("agent", agent)
            .with("name", name)
            .with("value", value)
            .with("isSecure", secure);
        support::call(&self.inner, Method::PUT, "/cli/agentCLI/setProperty", &query).await?;
        Ok(assignment(name, value, secure))
    }

    /// Ask the server to install a new agent over SSH.
    pub async fn install_agent(&self, install: &AgentInstall) -> Result<()> {
        support::call(
            &self.inner,
            Method::PUT,
            "/cli/sshInstallAgent/installNewAgent",
            &install.query(),
        )
        .await?;
        debug!(name = %install.name, host = %install.host, "agent installation requested");
        Ok(())
    }
}
