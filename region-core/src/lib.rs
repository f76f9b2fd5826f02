//! Region layout core for the VeroField dashboard.
//!
//! Places rectangular regions (dashboard widgets) on a fixed-column grid,
//! rejects out-of-grid and overlapping placements, commits drag and resize
//! gestures through a caller-supplied sink, and keeps named groups of
//! regions with derived bounding boxes.
//!
//! Modules, leaves first:
//! - grid: geometry, validation, overlap, occupancy index
//! - region: region records and sharing permissions
//! - store: fresh in-memory regions per layout
//! - interaction: drag/resize commit controller
//! - group: grouping and its persistence
//! - engine: ties the above together for one dashboard
//! - wasm: JavaScript bindings

pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod group;
pub mod interaction;
pub mod output;
pub mod region;
pub mod store;
pub mod wasm;

pub use config::{parse_config, EngineConfig};
pub use engine::Engine;
pub use error::{LayoutError, Result};
pub use grid::{clamp_to_grid, regions_overlap, validate_grid_bounds, BoundsError, GridConfig, GridRect, RectI};
pub use group::{Card, Group, GroupConfig, GroupManager, GroupStorage, GroupUpdate, MemoryStorage, WebStorage};
pub use interaction::{
    AclPermissions, GridItem, InteractionController, InteractionOutcome, LayoutMutationSink, Mutation, Notifier,
    RegionPermissions,
};
pub use region::{AclEntry, Permission, Principal, PrincipalType, Region};
pub use store::LayoutStore;
