//! In-memory region store keyed by layout id.
//!
//! The store holds the most recently known state of every loaded layout. The
//! interaction controller reads siblings from here at commit time so overlap
//! checks see fresh positions rather than whatever the view last rendered.
//! The store does not validate moves or resizes; the owner applies mutations
//! after they have been committed.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{LayoutError, Result};
use crate::grid::{clamp_to_grid, GridRect, OccupancyGrid, DEFAULT_COLUMNS};
use crate::region::Region;

#[derive(Debug, Clone)]
pub struct LayoutStore {
    columns: i32,
    layouts: HashMap<String, Vec<Region>>,
}

impl Default for LayoutStore {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMNS)
    }
}

impl LayoutStore {
    pub fn new(columns: i32) -> Self {
        Self { columns, layouts: HashMap::new() }
    }

    /// Regions of a layout, in insertion order. Unknown layouts are empty.
    pub fn get_regions_by_layout(&self, layout_id: &str) -> &[Region] {
        self.layouts.get(layout_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn layout_ids(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(String::as_str)
    }

    /// Every region of every layout.
    pub fn all_regions(&self) -> impl Iterator<Item = &Region> {
        self.layouts.values().flatten()
    }

    pub fn get_region(&self, layout_id: &str, region_id: &str) -> Option<&Region> {
        self.get_regions_by_layout(layout_id).iter().find(|r| r.id == region_id)
    }

    /// Replace all regions of a layout.
    ///
    /// Incoming geometry is clamped into the grid and every region is stamped
    /// with `layout_id`.
    pub fn load_layout(&mut self, layout_id: &str, regions: Vec<Region>) {
        let regions: Vec<Region> = regions
            .into_iter()
            .map(|mut r| {
                let clamped = clamp_to_grid(&r.rect(), self.columns);
                if clamped != r.rect() {
                    warn!(region = %r.id, layout = layout_id, ?clamped, "region outside grid, clamped on load");
                    r.set_rect(clamped);
                }
                r.layout_id = Some(layout_id.to_string());
                r
            })
            .collect();
        debug!(layout = layout_id, count = regions.len(), "layout loaded");
        self.layouts.insert(layout_id.to_string(), regions);
    }

    pub fn remove_layout(&mut self, layout_id: &str) -> Option<Vec<Region>> {
        self.layouts.remove(layout_id)
    }

    /// Add a region to a layout, replacing any region with the same id.
    ///
    /// The requested position is kept when it is free; otherwise the region
    /// goes to the first free slot with the same spans. Returns the final
    /// rectangle.
    pub fn insert_region(&mut self, layout_id: &str, mut region: Region) -> GridRect {
        let wanted = clamp_to_grid(&region.rect(), self.columns);
        let occupancy = OccupancyGrid::from_rects(
            self.columns,
            self.get_regions_by_layout(layout_id)
                .iter()
                .filter(|r| r.id != region.id)
                .map(|r| (r.id.as_str(), r.rect())),
        );
        let placed = match occupancy.first_collision(&wanted, None) {
            None => wanted,
            Some(taken_by) => {
                let slot = occupancy.find_free_slot(wanted.row_span, wanted.col_span);
                debug!(region = %region.id, %taken_by, ?wanted, ?slot, "requested position taken, using first free slot");
                slot
            }
        };
        region.set_rect(placed);
        region.layout_id = Some(layout_id.to_string());

        let regions = self.layouts.entry(layout_id.to_string()).or_default();
        regions.retain(|r| r.id != region.id);
        regions.push(region);
        placed
    }

    /// First free position in a layout for a region of the given spans.
    pub fn find_free_position(&self, layout_id: &str, row_span: i32, col_span: i32) -> GridRect {
        self.occupancy(layout_id).find_free_slot(row_span, col_span)
    }

    pub fn apply_move(&mut self, layout_id: &str, region_id: &str, grid_row: i32, grid_col: i32) -> Result<()> {
        let region = self.region_mut(layout_id, region_id)?;
        region.grid_row = grid_row;
        region.grid_col = grid_col;
        Ok(())
    }

    pub fn apply_resize(&mut self, layout_id: &str, region_id: &str, row_span: i32, col_span: i32) -> Result<()> {
        let region = self.region_mut(layout_id, region_id)?;
        region.row_span = row_span;
        region.col_span = col_span;
        Ok(())
    }

    pub fn set_locked(&mut self, layout_id: &str, region_id: &str, locked: bool) -> Result<()> {
        self.region_mut(layout_id, region_id)?.is_locked = locked;
        Ok(())
    }

    pub fn remove_region(&mut self, layout_id: &str, region_id: &str) -> Option<Region> {
        let regions = self.layouts.get_mut(layout_id)?;
        let idx = regions.iter().position(|r| r.id == region_id)?;
        Some(regions.remove(idx))
    }

    fn region_mut(&mut self, layout_id: &str, region_id: &str) -> Result<&mut Region> {
        self.layouts
            .get_mut(layout_id)
            .and_then(|regions| regions.iter_mut().find(|r| r.id == region_id))
            .ok_or_else(|| LayoutError::RegionNotFound(region_id.to_string()))
    }

    fn occupancy(&self, layout_id: &str) -> OccupancyGrid {
        OccupancyGrid::from_rects(
            self.columns,
            self.get_regions_by_layout(layout_id).iter().map(|r| (r.id.as_str(), r.rect())),
        )
    }
}
