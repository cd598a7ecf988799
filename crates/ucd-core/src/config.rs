//! Connection settings for an UrbanCode Deploy server.
//!
//! [`ServerConfig`] is an explicit value object: the environment is read once,
//! by [`ServerConfig::from_env`], and the result is handed to
//! [`RestClientBuilder::from_config`](crate::client::RestClientBuilder::from_config).
//! Nothing here is global.

use secrecy::SecretString;
use std::time::Duration;
use tracing::debug;
use url::Url;
use validator::Validate;

use crate::error::{Error, Result};

/// Environment variable that enables certificate verification when set to `true`.
pub const ENV_TLS_VERIFY_CERTS: &str = "UC_TLS_VERIFY_CERTS";
/// Proxy host environment variable.
pub const ENV_PROXY_HOST: &str = "PROXY_HOST";
/// Proxy port environment variable.
pub const ENV_PROXY_PORT: &str = "PROXY_PORT";
/// Proxy username environment variable.
pub const ENV_PROXY_USERNAME: &str = "PROXY_USERNAME";
/// Proxy password environment variable.
pub const ENV_PROXY_PASSWORD: &str = "PROXY_PASSWORD";

const fn default_request_timeout_secs() -> u64 {
    60
}

/// Credentials presented to the server with every request.
#[derive(Debug)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Password or API token.
    pub password: SecretString,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// HTTP proxy settings.
#[derive(Debug, Validate)]
pub struct ProxyConfig {
    /// Proxy host name.
    #[validate(length(min = 1))]
    pub host: String,

    /// Proxy port.
    pub port: u16,

    /// Optional proxy credentials.
    pub credentials: Option<Credentials>,
}

impl ProxyConfig {
    /// Create an unauthenticated proxy configuration.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
        }
    }

    /// Authenticate against the proxy.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Proxy URL in `http://host:port` form.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Configuration for a client connecting to one UrbanCode Deploy server.
#[derive(Debug, Validate)]
pub struct ServerConfig {
    /// Server base URL, e.g. `https://ucd.example.com:8443`
    #[validate(url)]
    pub url: String,

    /// Login presented with HTTP Basic authentication
    #[validate(length(min = 1))]
    pub username: String,

    /// Password presented with HTTP Basic authentication
    pub password: SecretString,

    /// Skip certificate and host name verification
    pub trust_all_certs: bool,

    /// Optional HTTP proxy
    pub proxy: Option<ProxyConfig>,

    /// Per-request timeout in seconds
    #[validate(range(min = 1, max = 3600))]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Create a configuration that verifies certificates and uses no proxy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is invalid or the username is empty.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            url: url.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
            trust_all_certs: false,
            proxy: None,
            request_timeout_secs: default_request_timeout_secs(),
        };

        config
            .validate()
            .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Create a configuration using TLS and proxy settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is invalid or the username is empty.
    pub fn from_env(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::from_lookup(url, username, password, |name| std::env::var(name).ok())
    }

    /// Like [`ServerConfig::from_env`], reading variables through `lookup`.
    ///
    /// Certificates are verified only when `UC_TLS_VERIFY_CERTS` is `true`
    /// (case-insensitive). A proxy is configured when `PROXY_HOST` is set and
    /// `PROXY_PORT` is numeric; proxy credentials need both `PROXY_USERNAME`
    /// and `PROXY_PASSWORD`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is invalid or the username is empty.
    pub fn from_lookup<F>(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let verify_certs = non_empty(ENV_TLS_VERIFY_CERTS)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));

        let mut proxy = match (non_empty(ENV_PROXY_HOST), non_empty(ENV_PROXY_PORT)) {
            (Some(host), Some(port)) if port.bytes().all(|b| b.is_ascii_digit()) => {
                debug!(%host, %port, "configuring proxy settings");
                let port = port
                    .parse::<u16>()
                    .map_err(|e| Error::Config(format!("Invalid {ENV_PROXY_PORT}: {e}")))?;
                Some(ProxyConfig::new(host, port))
            }
            _ => None,
        };

        if let (Some(user), Some(pass)) =
            (non_empty(ENV_PROXY_USERNAME), non_empty(ENV_PROXY_PASSWORD))
        {
            if let Some(settings) = proxy.take() {
                debug!("configuring proxy credentials");
                proxy = Some(settings.with_credentials(user, pass));
            }
        }

        let mut config = Self::new(url, username, password)?;
        config.trust_all_certs = !verify_certs;
        config.proxy = proxy;
        Ok(config)
    }

    /// Skip or enforce certificate verification.
    #[must_use]
    pub const fn with_trust_all_certs(mut self, trust: bool) -> Self {
        self.trust_all_certs = trust;
        self
    }

    /// Route requests through a proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse the server URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_url(&self) -> Result<Url> {
        Url::parse(&self.url).map_err(|e| Error::Config(format!("Invalid server URL: {e}")))
    }
}
