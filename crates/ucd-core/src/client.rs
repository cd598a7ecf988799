//! HTTP client construction and request execution.
//!
//! [`RestClient`] is the capability every resource client is composed with: it
//! builds endpoint URLs, sends [`EndpointRequest`]s through a [`Transport`] and
//! classifies the outcome. The retry policy and the pollers extend it in
//! [`crate::retry`] and [`crate::poll`].

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::{Credentials, ProxyConfig, ServerConfig};
use crate::error::{Error, Result};
use crate::query::QueryParams;
use crate::request::EndpointRequest;
use crate::response::Exchange;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT: u64 = 60;

/// Seconds an idle pooled connection to the server is kept.
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Idle connections kept per server host.
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

const USER_AGENT: &str = concat!("ucd-core/", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration.
///
/// Configures timeouts, connection pooling and compression of the shared
/// `reqwest` client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whole-request timeout, connect through body
    pub timeout: Duration,

    /// How long idle connections stay pooled
    pub pool_idle_timeout: Duration,

    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,

    /// Accept gzip-encoded responses
    pub enable_compression: bool,
}

impl ClientConfig {
    /// Defaults: 60 s timeout, 90 s pool idle time, 10 idle connections.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            enable_compression: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override how long idle connections stay pooled.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Override the idle connection cap per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Toggle gzip response decoding.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends one request and returns the drained exchange.
///
/// Implementations perform exactly one physical round trip per call and must
/// not classify the status; that is the caller's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the round trip.
    async fn send(&self, request: &EndpointRequest) -> Result<Exchange>;
}

/// [`Transport`] backed by a pooled `reqwest` client with preemptive Basic auth.
pub struct HttpTransport {
    http: reqwest::Client,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    /// Wrap an existing `reqwest` client.
    #[must_use]
    pub fn new(http: reqwest::Client, credentials: Option<Credentials>) -> Self {
        Self { http, credentials }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &EndpointRequest) -> Result<Exchange> {
        let mut builder = self
            .http
            .request(request.method().clone(), request.url().clone());

        if let Some(credentials) = &self.credentials {
            builder = builder.basic_auth(
                &credentials.username,
                Some(credentials.password.expose_secret()),
            );
        }
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder
                .header(CONTENT_TYPE, body.content_type.as_str())
                .body(body.text.clone());
        }

        debug!(method = %request.method(), url = %request.url(), "sending request");
        let response = builder.send().await?;
        Exchange::from_response(response).await
    }
}

/// Builder for [`RestClient`].
pub struct RestClientBuilder {
    base_url: Url,
    http_config: ClientConfig,
    user_agent: String,
    credentials: Option<Credentials>,
    trust_all_certs: bool,
    proxy: Option<ProxyConfig>,
    transport: Option<Arc<dyn Transport>>,
}

impl RestClientBuilder {
    /// Create a builder for the specified server URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the URL cannot be parsed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self {
            base_url,
            http_config: ClientConfig::new(),
            user_agent: USER_AGENT.to_string(),
            credentials: None,
            trust_all_certs: false,
            proxy: None,
            transport: None,
        })
    }

    /// Create a builder from a complete server configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured URL cannot be parsed.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let base_url = config.parse_url()?;
        let http_config = ClientConfig::new().with_timeout(config.timeout());
        Ok(Self {
            base_url,
            http_config,
            user_agent: USER_AGENT.to_string(),
            credentials: Some(Credentials {
                username: config.username,
                password: config.password,
            }),
            trust_all_certs: config.trust_all_certs,
            proxy: config.proxy,
            transport: None,
        })
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Configure HTTP basic authentication credentials.
    #[must_use]
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Skip certificate and host name verification.
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

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use a custom transport instead of building an HTTP client.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client or proxy cannot be built.
    pub fn build(self) -> Result<RestClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let http = build_http_client(
                    &self.http_config,
                    &self.user_agent,
                    self.trust_all_certs,
                    self.proxy.as_ref(),
                )?;
                Arc::new(HttpTransport::new(http, self.credentials))
            }
        };

        Ok(RestClient {
            base_url: self.base_url,
            transport,
        })
    }
}

fn build_http_client(
    config: &ClientConfig,
    user_agent: &str,
    trust_all_certs: bool,
    proxy: Option<&ProxyConfig>,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .gzip(config.enable_compression)
        .user_agent(user_agent)
        .cookie_store(true)
        .danger_accept_invalid_certs(trust_all_certs)
        .danger_accept_invalid_hostnames(trust_all_certs);

    if let Some(proxy) = proxy {
        debug!(url = %proxy.url(), "configuring proxy settings");
        let mut settings = reqwest::Proxy::all(proxy.url())
            .map_err(|e| Error::Config(format!("Invalid proxy: {e}")))?;
        if let Some(credentials) = &proxy.credentials {
            settings = settings.basic_auth(
                &credentials.username,
                credentials.password.expose_secret(),
            );
        }
        builder = builder.proxy(settings);
    }

    builder
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))
}

/// Shared REST invocation capability.
///
/// Cheap to clone; clones share the transport and its connection pool.
#[derive(Clone)]
pub struct RestClient {
    base_url: Url,
    transport: Arc<dyn Transport>,
}

impl RestClient {
    /// Construct a client without credentials directly from the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        RestClientBuilder::new(base_url)?.build()
    }

    /// Construct a client from a server configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot produce an HTTP client.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        RestClientBuilder::from_config(config)?.build()
    }

    /// Return the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from an already-encoded path and a query.
    ///
    /// Path segments containing caller input must have been passed through
    /// [`encode_path`](crate::encode::encode_path); query values are encoded here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the result is not a valid URL.
    pub fn endpoint(&self, path: &str, query: &QueryParams) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = format!("{base}{path}{}", query.to_query_string());
        Url::parse(&url).map_err(|e| Error::InvalidEndpoint(format!("{url}: {e}")))
    }

    /// Send `request` once without classifying the status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the round trip fails.
    pub async fn send(&self, request: &EndpointRequest) -> Result<Exchange> {
        self.transport.send(request).await
    }

    /// Send `request` once; any status of 300 or greater is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] for a 3xx/4xx/5xx status and
    /// [`Error::Transport`] if the round trip fails.
    pub async fn execute(&self, request: &EndpointRequest) -> Result<Exchange> {
        let exchange = self.send(request).await?;
        check_status(exchange)
    }
}

/// Fail with [`Error::Request`] when the status is 300 or greater.
pub(crate) fn check_status(exchange: Exchange) -> Result<Exchange> {
    if exchange.status().as_u16() > 299 {
        Err(exchange.into_error())
    } else {
        Ok(exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use wiremock::matchers::{body_string, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RestClient {
        RestClientBuilder::new(server.uri())
            .unwrap()
            .with_basic_auth("admin", "admin")
            .build()
            .unwrap()
    }

    #[test]
    fn test_client_config_new() {
        let config = ClientConfig::new();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT));
        assert_eq!(config.pool_max_idle_per_host, DEFAULT_POOL_MAX_IDLE_PER_HOST);
        assert!(config.enable_compression);
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_pool_idle_timeout(Duration::from_secs(120))
            .with_pool_max_idle(20)
            .with_compression(false);

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(120));
        assert_eq!(config.pool_max_idle_per_host, 20);
        assert!(!config.enable_compression);
    }

    #[test]
    fn test_builder_rejects_bad_url() {
        assert!(matches!(
            RestClientBuilder::new("::nope"),
            Err(Error::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_endpoint_joins_base_path_and_query() {
        let client = RestClient::new("https://ucd.example.com:8443/").unwrap();
        let query = QueryParams::new().with("application", "a b");
        let url = client
            .endpoint("/cli/application/info", &query)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ucd.example.com:8443/cli/application/info?application=a%20b"
        );
    }

    #[test]
    fn test_endpoint_keeps_encoded_segments() {
        let client = RestClient::new("https://ucd.example.com/context").unwrap();
        let url = client
            .endpoint("/rest/resource/resource/%2Ftop%2Fchild", &QueryParams::new())
            .unwrap();
        assert_eq!(url.path(), "/context/rest/resource/resource/%2Ftop%2Fchild");
    }

    #[test]
    fn test_build_with_proxy_and_trust_all() {
        let client = RestClientBuilder::new("https://ucd.example.com")
            .unwrap()
            .with_trust_all_certs(true)
            .with_proxy(ProxyConfig::new("proxy.local", 3128).with_credentials("u", "p"))
            .build();
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn execute_sends_basic_auth_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cli/application/create"))
            .and(header("authorization", "Basic YWRtaW46YWRtaW4="))
            .and(header("content-type", "application/json"))
            .and(header_exists("user-agent"))
            .and(body_string(r#"{"name":"web"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"x"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let url = client
            .endpoint("/cli/application/create", &QueryParams::new())
            .unwrap();
        let request = EndpointRequest::put(url)
            .with_json(&serde_json::json!({"name": "web"}))
            .unwrap();
        let exchange = client.execute(&request).await.unwrap();
        assert_eq!(exchange.body(), Some(r#"{"id":"x"}"#));
    }

    #[tokio::test]
    async fn execute_maps_status_above_299_to_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cli/component/info"))
            .and(query_param("component", "missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("No component"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let url = client
            .endpoint(
                "/cli/component/info",
                &QueryParams::new().with("component", "missing"),
            )
            .unwrap();
        let err = client.execute(&EndpointRequest::get(url)).await.unwrap_err();
        assert_eq!(
            err,
            Error::request(404, "Not Found", Some("No component".to_string()))
        );
    }

    #[tokio::test]
    async fn execute_treats_redirect_status_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/moved"))
            .respond_with(ResponseTemplate::new(304))
            .mount(&server)
            .await;

        let client = client(&server);
        let url = client.endpoint("/moved", &QueryParams::new()).unwrap();
        let err = client.execute(&EndpointRequest::get(url)).await.unwrap_err();
        assert_eq!(err.status(), Some(304));
    }

    #[tokio::test]
    async fn execute_returns_no_content_marker() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/cli/agentCLI"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client(&server);
        let url = client.endpoint("/cli/agentCLI", &QueryParams::new()).unwrap();
        let exchange = client.execute(&EndpointRequest::delete(url)).await.unwrap();
        assert_eq!(exchange.status(), StatusCode::NO_CONTENT);
        assert!(exchange.body().is_none());
    }

    #[tokio::test]
    async fn extra_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/property"))
            .and(header("version", "4"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let url = client.endpoint("/property", &QueryParams::new()).unwrap();
        client
            .execute(&EndpointRequest::put(url).with_header("Version", "4"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error() {
        let client = RestClient::new("http://127.0.0.1:9").unwrap();
        let url = client.endpoint("/cli/systemConfiguration", &QueryParams::new()).unwrap();
        let err = client.execute(&EndpointRequest::get(url)).await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn custom_transport_is_used() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(Exchange::new(StatusCode::OK, Some("pong".to_string()))));

        let client = RestClientBuilder::new("https://ucd.example.com")
            .unwrap()
            .with_transport(Arc::new(transport))
            .build()
            .unwrap();
        let url = client.endpoint("/ping", &QueryParams::new()).unwrap();
        let exchange = client.execute(&EndpointRequest::get(url)).await.unwrap();
        assert_eq!(exchange.text(), "pong");
    }
}
