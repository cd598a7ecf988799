//! Property sheet definitions and batched property values.

use reqwest::Method;
use serde_json::{Map, Value};
use ucd_core::encode::encode_path;
use ucd_core::id::PropDefId;
use ucd_core::{QueryParams, RestClient};

use crate::models::{decode_id, PropDefRequest};
use crate::support;
use crate::Result;

/// Header carrying the property sheet version on batch updates.
const VERSION_HEADER: &str = "Version";

/// Client for property sheet endpoints.
#[derive(Clone)]
pub struct PropertyClient {
    inner: RestClient,
}

impl PropertyClient {
    /// Wrap a configured [`RestClient`].
    #[must_use]
    pub fn new(inner: RestClient) -> Self {
        Self { inner }
    }

    /// Add a property definition to the latest version of a sheet definition.
    pub async fn create_prop_def(
        &self,
        prop_sheet_def_path: &str,
        prop_def: &PropDefRequest,
    ) -> Result<PropDefId> {
        let exchange = support::call_with_json(
            &self.inner,
            Method::PUT,
            &prop_defs_path(prop_sheet_def_path),
            &QueryParams::new(),
            prop_def,
        )
        .await?;
        decode_id(&exchange)
    }

    /// Property definitions of the latest version of a sheet definition.
    pub async fn get_prop_sheet_def_prop_defs(
        &self,
        prop_sheet_def_path: &str,
    ) -> Result<Vec<Value>> {
        support::get_json(
            &self.inner,
            &prop_defs_path(prop_sheet_def_path),
            &QueryParams::new(),
        )
        .await
    }

    /// Replace property definitions, optionally deleting those not listed.
    pub async fn update_prop_defs(
        &self,
        prop_sheet_def_path: &str,
        prop_defs: &[Value],
        delete_extra: bool,
    ) -> Result<Vec<Value>> {
        let path = format!(
            "{}/update/{delete_extra}",
            prop_defs_path(prop_sheet_def_path)
        );
        support::call_with_json(
            &self.inner,
            Method::PUT,
            &path,
            &QueryParams::new(),
            prop_defs,
        )
        .await?
        .json()
    }

    /// Write a batch of property values against a specific sheet version.
    ///
    /// Returns `None` when the server answers with an empty body.
    pub async fn update_resource_prop_values(
        &self,
        prop_sheet_path: &str,
        prop_sheet_version: &str,
        values: &Map<String, Value>,
    ) -> Result<Option<Map<String, Value>>> {
        let path = format!(
            "/property/propSheet/{}.{}/allPropValuesFromBatch/",
            encode_path(prop_sheet_path),
            encode_path(prop_sheet_version)
        );
        let request = support::request(&self.inner, Method::PUT, &path, &QueryParams::new())?
            .with_header(VERSION_HEADER, prop_sheet_version)
            .with_json(values)?;
        let exchange = self.inner.execute(&request).await?;
        if exchange.text().is_empty() {
            return Ok(None);
        }
        exchange.json().map(Some)
    }
}

/// Sheet definitions are addressed at version `-1`, the latest.
fn prop_defs_path(prop_sheet_def_path: &str) -> String {
    format!(
        "/property/propSheetDef/{}.-1/propDefs",
        encode_path(prop_sheet_def_path)
    )
}
