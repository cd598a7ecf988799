//! Request plumbing shared by the resource clients.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use ucd_core::{EndpointRequest, Error, Exchange, QueryParams, RestClient};

use crate::Result;

const REQUIRED_ARGUMENT: &str = "a required argument was not supplied";

/// Fail unless every value is non-empty.
pub(crate) fn require_all(values: &[&str]) -> Result<()> {
    if values.iter().any(|value| value.is_empty()) {
        return Err(Error::Validation(REQUIRED_ARGUMENT.to_string()));
    }
    Ok(())
}

/// Fail with "`name` was not supplied" when `value` is empty.
pub(crate) fn require(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::missing_argument(name));
    }
    Ok(())
}

/// Echo of a property write, masking secure values.
pub(crate) fn assignment(name: &str, value: &str, secure: bool) -> String {
    if secure {
        format!("{name}=****")
    } else {
        format!("{name}={value}")
    }
}

pub(crate) fn request(
    rest: &RestClient,
    method: Method,
    path: &str,
    query: &QueryParams,
) -> Result<EndpointRequest> {
    Ok(EndpointRequest::new(method, rest.endpoint(path, query)?))
}

pub(crate) async fn call(
    rest: &RestClient,
    method: Method,
    path: &str,
    query: &QueryParams,
) -> Result<Exchange> {
    let request = request(rest, method, path, query)?;
    rest.execute(&request).await
}

pub(crate) async fn call_with_json<B>(
    rest: &RestClient,
    method: Method,
    path: &str,
    query: &QueryParams,
    body: &B,
) -> Result<Exchange>
where
    B: Serialize + ?Sized,
{
    let request = request(rest, method, path, query)?.with_json(body)?;
    rest.execute(&request).await
}

pub(crate) async fn get_json<T>(rest: &RestClient, path: &str, query: &QueryParams) -> Result<T>
where
    T: DeserializeOwned,
{
    call(rest, Method::GET, path, query).await?.json()
}

pub(crate) async fn get_text(rest: &RestClient, path: &str, query: &QueryParams) -> Result<String> {
    let exchange = call(rest, Method::GET, path, query).await?;
    Ok(exchange.into_body().unwrap_or_default())
}
