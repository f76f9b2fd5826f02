//! Output types for React frontend consumption.
//!
//! These structs are serialized to JSON and returned across the wasm
//! boundary.

use serde::Serialize;

use crate::grid::GridRect;
use crate::group::Group;
use crate::region::Region;

/// A layout as the dashboard renders it
#[derive(Debug, Clone, Serialize)]
pub struct LayoutOutput<'a> {
    pub layout_id: &'a str,
    pub regions: &'a [Region],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<&'a Group>,
}

/// Where a newly added region ended up
#[derive(Debug, Clone, Serialize)]
pub struct PlacementOutput {
    pub id: String,
    #[serde(flatten)]
    pub rect: GridRect,
}

/// Returned instead of a payload when a call fails
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
    pub error: String,
}

/// Serialize `value`, or an [`ErrorOutput`] for `Err`.
pub fn to_json<T: Serialize, E: std::fmt::Display>(value: Result<T, E>) -> String {
    let encoded = match value {
        Ok(v) => serde_json::to_string(&v),
        Err(e) => serde_json::to_string(&ErrorOutput { error: e.to_string() }),
    };
    encoded.unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}
