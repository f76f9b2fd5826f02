// Grid geometry for dashboard regions.
//
// Regions live on a fixed-column grid addressed by zero-based row/column
// cells. Everything here is pure:
// - validate_grid_bounds: rejects rectangles that leave the grid
// - clamp_to_grid: forces a rectangle back inside the grid
// - regions_overlap: half-open rectangle intersection
//
// Submodules:
// - occupancy: placed-rectangle index for first-fit placement and collision lookup

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod occupancy;

pub use occupancy::OccupancyGrid;

/// Column count used when no configuration is supplied.
pub const DEFAULT_COLUMNS: i32 = 12;

/// A rectangle in grid units.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    pub grid_row: i32,
    pub grid_col: i32,
    pub row_span: i32,
    pub col_span: i32,
}

impl GridRect {
    pub fn new(grid_row: i32, grid_col: i32, row_span: i32, col_span: i32) -> Self {
        Self { grid_row, grid_col, row_span, col_span }
    }

    /// Exclusive end column, saturating at `i32::MAX`.
    pub fn col_end(&self) -> i32 { self.grid_col.saturating_add(self.col_span) }
    /// Exclusive end row, saturating at `i32::MAX`.
    pub fn row_end(&self) -> i32 { self.grid_row.saturating_add(self.row_span) }
}

/// A rectangle in pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectI {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "width")]
    pub w: i32,
    #[serde(rename = "height")]
    pub h: i32,
}

impl RectI {
    pub fn right(&self) -> i32 { self.x.saturating_add(self.w) }
    pub fn bottom(&self) -> i32 { self.y.saturating_add(self.h) }

    pub fn union(&self, other: &RectI) -> RectI {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        RectI { x: x0, y: y0, w: x1.saturating_sub(x0), h: y1.saturating_sub(y0) }
    }

    /// Grow by `margin` on all four sides.
    pub fn expand(&self, margin: i32) -> RectI {
        RectI {
            x: self.x.saturating_sub(margin),
            y: self.y.saturating_sub(margin),
            w: self.w.saturating_add(margin.saturating_mul(2)),
            h: self.h.saturating_add(margin.saturating_mul(2)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of columns in the placement grid.
    pub columns: i32,
    /// Width of one column in pixels.
    pub column_width: i32,
    /// Height of one row in pixels.
    pub row_height: i32,
    /// Gap between cells in pixels.
    pub margin: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            column_width: 100,
            row_height: 60,
            margin: 10,
        }
    }
}

impl GridConfig {
    /// Pixel rectangle occupied by a grid rectangle, margins included between cells.
    /// Saturates instead of wrapping for absurd geometry.
    pub fn to_pixels(&self, rect: &GridRect) -> RectI {
        RectI {
            x: offset(rect.grid_col, self.column_width, self.margin),
            y: offset(rect.grid_row, self.row_height, self.margin),
            w: extent(rect.col_span, self.column_width, self.margin),
            h: extent(rect.row_span, self.row_height, self.margin),
        }
    }
}

fn offset(index: i32, unit: i32, margin: i32) -> i32 {
    saturate(i64::from(index) * (i64::from(unit) + i64::from(margin)))
}

fn extent(span: i32, unit: i32, margin: i32) -> i32 {
    let gaps = (i64::from(span) - 1).max(0);
    saturate(i64::from(span) * i64::from(unit) + gaps * i64::from(margin))
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundsError {
    #[error("Column cannot be negative (got {0})")]
    NegativeColumn(i32),
    #[error("Row cannot be negative (got {0})")]
    NegativeRow(i32),
    #[error("Width must be at least 1 column (got {0})")]
    ColSpanTooSmall(i32),
    #[error("Height must be at least 1 row (got {0})")]
    RowSpanTooSmall(i32),
    #[error("Region extends past column {columns} (ends at {end})")]
    ExceedsColumns { end: i64, columns: i32 },
    #[error("Region extends past the last addressable row")]
    ExceedsRows,
    #[error("Region must be at least {min} columns wide")]
    BelowMinWidth { min: i32 },
    #[error("Region must be at least {min} rows tall")]
    BelowMinHeight { min: i32 },
}

/// Check a rectangle against the grid.
pub fn validate_grid_bounds(rect: &GridRect, columns: i32) -> Result<(), BoundsError> {
    if rect.grid_col < 0 {
        return Err(BoundsError::NegativeColumn(rect.grid_col));
    }
    if rect.grid_row < 0 {
        return Err(BoundsError::NegativeRow(rect.grid_row));
    }
    if rect.col_span < 1 {
        return Err(BoundsError::ColSpanTooSmall(rect.col_span));
    }
    if rect.row_span < 1 {
        return Err(BoundsError::RowSpanTooSmall(rect.row_span));
    }
    let col_end = i64::from(rect.grid_col) + i64::from(rect.col_span);
    if col_end > i64::from(columns) {
        return Err(BoundsError::ExceedsColumns { end: col_end, columns });
    }
    if rect.grid_row.checked_add(rect.row_span).is_none() {
        return Err(BoundsError::ExceedsRows);
    }
    Ok(())
}

/// Check spans against grid-unit minimums.
pub fn validate_min_size(rect: &GridRect, min_cols: i32, min_rows: i32) -> Result<(), BoundsError> {
    if rect.col_span < min_cols {
        return Err(BoundsError::BelowMinWidth { min: min_cols });
    }
    if rect.row_span < min_rows {
        return Err(BoundsError::BelowMinHeight { min: min_rows });
    }
    Ok(())
}

/// `{valid, error?}` view of a validation result, as the front end expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundsCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<(), BoundsError>> for BoundsCheck {
    fn from(r: Result<(), BoundsError>) -> Self {
        match r {
            Ok(()) => BoundsCheck { valid: true, error: None },
            Err(e) => BoundsCheck { valid: false, error: Some(e.to_string()) },
        }
    }
}

/// Force a rectangle inside the grid.
pub fn clamp_to_grid(rect: &GridRect, columns: i32) -> GridRect {
    let columns = columns.max(1);
    let grid_col = rect.grid_col.clamp(0, columns - 1);
    let grid_row = rect.grid_row.clamp(0, i32::MAX - 1);
    GridRect {
        grid_row,
        grid_col,
        row_span: rect.row_span.clamp(1, i32::MAX - grid_row),
        col_span: rect.col_span.clamp(1, columns - grid_col),
    }
}

/// True when the rectangles share at least one cell. Touching edges do not count.
pub fn regions_overlap(a: &GridRect, b: &GridRect) -> bool {
    let (a_col, a_row) = (i64::from(a.grid_col), i64::from(a.grid_row));
    let (b_col, b_row) = (i64::from(b.grid_col), i64::from(b.grid_row));
    a_col < b_col + i64::from(b.col_span)
        && b_col < a_col + i64::from(a.col_span)
        && a_row < b_row + i64::from(b.row_span)
        && b_row < a_row + i64::from(a.row_span)
}
