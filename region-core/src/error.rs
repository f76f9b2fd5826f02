use thiserror::Error;

use crate::grid::BoundsError;

pub type Result<T, E = LayoutError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Bounds(#[from] BoundsError),

    #[error("region '{0}' not found")]
    RegionNotFound(String),

    #[error("group '{0}' not found")]
    GroupNotFound(String),

    #[error("a group needs at least one member")]
    EmptyGroup,

    #[error("storage unavailable: {0}")]
    Storage(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
