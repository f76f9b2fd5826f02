// Occupancy index for placed regions.
//
// Keeps one entry per placed rectangle and tests candidates against each of
// them, so cost follows the number of regions rather than their area. A
// region spanning millions of rows costs the same as a 1x1 one.

use super::{regions_overlap, GridRect};

#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    columns: i32,
    placed: Vec<(String, GridRect)>,
}

impl OccupancyGrid {
    pub fn new(columns: i32) -> Self {
        Self {
            columns: columns.max(1),
            placed: Vec::new(),
        }
    }

    /// Build an index from `(id, rect)` pairs.
    pub fn from_rects<'a, I>(columns: i32, rects: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, GridRect)>,
    {
        let mut grid = Self::new(columns);
        for (id, rect) in rects {
            grid.insert(id, &rect);
        }
        grid
    }

    pub fn insert(&mut self, id: &str, rect: &GridRect) {
        self.placed.push((id.to_string(), *rect));
    }

    /// Id of a region sharing a cell with `rect`, ignoring `exclude`.
    pub fn first_collision(&self, rect: &GridRect, exclude: Option<&str>) -> Option<&str> {
        self.placed
            .iter()
            .filter(|(id, _)| Some(id.as_str()) != exclude)
            .find(|(_, other)| regions_overlap(rect, other))
            .map(|(id, _)| id.as_str())
    }

    pub fn is_free(&self, rect: &GridRect) -> bool {
        self.first_collision(rect, None).is_none()
    }

    /// First position, top-down then left-to-right, where a `row_span` x
    /// `col_span` rectangle fits without touching an occupied cell.
    ///
    /// The first fit always sits at row 0 or directly under some placed
    /// rectangle, and at column 0 or directly right of one, so only those
    /// edges are tried.
    pub fn find_free_slot(&self, row_span: i32, col_span: i32) -> GridRect {
        let row_span = row_span.max(1);
        let col_span = col_span.clamp(1, self.columns);

        let mut rows: Vec<i32> = self.placed.iter().map(|(_, r)| r.row_end()).collect();
        rows.push(0);
        rows.sort_unstable();
        rows.dedup();

        let mut cols: Vec<i32> = self
            .placed
            .iter()
            .map(|(_, r)| r.col_end())
            .filter(|c| c.saturating_add(col_span) <= self.columns)
            .collect();
        cols.push(0);
        cols.sort_unstable();
        cols.dedup();

        for &row in rows.iter().filter(|r| r.checked_add(row_span).is_some()) {
            for &col in &cols {
                let candidate = GridRect::new(row, col, row_span, col_span);
                if self.is_free(&candidate) {
                    return candidate;
                }
            }
        }
        // Below the lowest region is always free unless that row cannot hold the span.
        GridRect::new(i32::MAX - row_span, 0, row_span, col_span)
    }
}
