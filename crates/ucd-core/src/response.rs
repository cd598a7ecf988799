//! Reading completed HTTP exchanges.
//!
//! Bodies are always drained, on the read path and on the discard path, so the
//! pooled connection goes back to the pool before the caller does anything
//! else with the outcome.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};

/// Outcome of one physical HTTP round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    status: StatusCode,
    reason: String,
    body: Option<String>,
}

impl Exchange {
    /// Assemble an exchange from its parts.
    #[must_use]
    pub fn new(status: StatusCode, body: Option<String>) -> Self {
        Self {
            status,
            reason: reason_phrase(status),
            body,
        }
    }

    /// Drain `response` into an exchange, mapping 204 to an absent body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the body cannot be read.
    pub async fn from_response(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let body = read_body(response).await?;
        Ok(Self::new(status, body))
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase reported for the status.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Body text; `None` means "no content".
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Body text, treating "no content" as empty.
    #[must_use]
    pub fn text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    /// Consume the exchange, returning the body.
    #[must_use]
    pub fn into_body(self) -> Option<String> {
        self.body
    }

    /// Whether the status is "no content".
    #[must_use]
    pub fn is_no_content(&self) -> bool {
        self.status == StatusCode::NO_CONTENT
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the body is absent or malformed.
    pub fn json<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = self
            .body
            .as_deref()
            .ok_or_else(|| Error::Parse("expected a JSON body, got no content".to_string()))?;
        serde_json::from_str(body).map_err(Error::from)
    }

    /// Convert into [`Error::Request`] carrying status, reason and body.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::request(self.status.as_u16(), self.reason, self.body)
    }
}

/// Read the body of `response` as text.
///
/// A 204 response yields `None` whatever bytes arrive on the wire; those bytes
/// are still drained.
///
/// # Errors
///
/// Returns [`Error::Transport`] if the body stream fails.
pub async fn read_body(response: reqwest::Response) -> Result<Option<String>> {
    if response.status() == StatusCode::NO_CONTENT {
        discard_body(response).await;
        return Ok(None);
    }
    let text = response
        .text()
        .await
        .map_err(|err| Error::Transport(format!("failed to read response body: {err}")))?;
    Ok(Some(text))
}

/// Drain and drop the body of `response` without parsing it.
pub async fn discard_body(response: reqwest::Response) {
    if let Err(err) = response.bytes().await {
        debug!(error = %err, "ignoring error while discarding response body");
    }
}

fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}
