//! Endpoint descriptions handed to the executor.

use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::error::Result;

/// Content type used for JSON payloads.
pub const APPLICATION_JSON: &str = "application/json";

/// Request body together with its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    /// Value of the `Content-Type` header.
    pub content_type: String,
    /// Body text, sent as UTF-8.
    pub text: String,
}

/// One endpoint invocation: verb, fully built URL and optional body.
///
/// The request is immutable once built and is sent by reference, so the retry
/// policy and the pollers can resend it verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRequest {
    method: Method,
    url: Url,
    body: Option<RequestBody>,
    headers: Vec<(String, String)>,
}

impl EndpointRequest {
    /// Create a request without a body.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
            headers: Vec::new(),
        }
    }

    /// GET request.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// PUT request.
    #[must_use]
    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    /// POST request.
    #[must_use]
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// DELETE request.
    #[must_use]
    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Attach a body with an explicit content type.
    #[must_use]
    pub fn with_body(mut self, content_type: impl Into<String>, text: impl Into<String>) -> Self {
        self.body = Some(RequestBody {
            content_type: content_type.into(),
            text: text.into(),
        });
        self
    }

    /// Serialize `payload` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`](crate::Error::Parse) if the payload cannot be serialized.
    pub fn with_json<T>(self, payload: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let text = serde_json::to_string(payload)?;
        Ok(self.with_body(APPLICATION_JSON, text))
    }

    /// Add an extra request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// HTTP verb.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL, including the encoded query string.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Optional body.
    #[must_use]
    pub const fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Extra headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}
