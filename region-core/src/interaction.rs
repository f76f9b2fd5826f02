//! Drag and resize commit logic.
//!
//! The grid widget reports where an item ended up once the pointer is
//! released. This module turns that end state into either a committed
//! mutation, handed to a [`LayoutMutationSink`], or a rejection surfaced as a
//! toast through a [`Notifier`]. Nothing here returns an error: a rejected
//! gesture simply never reaches the sink, and the widget snaps the item back
//! because no state changed.
//!
//! Validation is authoritative on this path. A proposed rectangle outside the
//! grid is rejected as-is; it is never clamped into a different position and
//! committed.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::grid::{regions_overlap, validate_grid_bounds, validate_min_size, GridConfig, GridRect};
use crate::region::{AclEntry, Permission, Principal, Region};
use crate::store::LayoutStore;

/// How long error toasts stay visible.
pub const TOAST_TIMEOUT: Duration = Duration::from_millis(5000);

/// End state of a drag or resize, as reported by the grid widget.
///
/// `x`/`y` are column/row, `w`/`h` are column/row spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridItem {
    pub i: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Receives committed layout changes. Implemented by whoever persists them.
pub trait LayoutMutationSink {
    fn move_region(&mut self, region_id: &str, grid_row: i32, grid_col: i32);
    fn resize_region(&mut self, region_id: &str, row_span: i32, col_span: i32);
    fn delete_regions(&mut self, region_ids: &[String]);
}

/// User-facing error channel.
pub trait Notifier {
    fn error(&mut self, message: &str, timeout: Duration);
}

/// Sharing permission hook.
pub trait RegionPermissions {
    fn can(&self, region: &Region, permission: Permission) -> bool;
}

/// Grants everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl RegionPermissions for AllowAll {
    fn can(&self, _region: &Region, _permission: Permission) -> bool {
        true
    }
}

/// Sharing grants keyed by region id, checked for the current user's principals.
///
/// A region with no entries is not shared and stays fully editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AclPermissions {
    pub principals: Vec<Principal>,
    pub acl: HashMap<String, Vec<AclEntry>>,
}

impl RegionPermissions for AclPermissions {
    fn can(&self, region: &Region, permission: Permission) -> bool {
        match self.acl.get(&region.id) {
            Some(entries) if !entries.is_empty() => entries
                .iter()
                .filter(|e| e.grants(permission))
                .any(|e| self.principals.iter().any(|p| e.applies_to(p))),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Drag,
    Resize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    Move { region_id: String, grid_row: i32, grid_col: i32 },
    Resize { region_id: String, row_span: i32, col_span: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InteractionOutcome {
    /// `layout_id` is the layout whose siblings were checked; `None` when
    /// only the rendered list was available.
    Committed {
        #[serde(skip_serializing_if = "Option::is_none")]
        layout_id: Option<String>,
        mutation: Mutation,
    },
    /// Geometry matches what is stored; nothing written.
    Unchanged,
    Rejected { reason: String },
    Locked,
    RegionNotFound,
}

/// Everything one gesture needs from its surroundings.
pub struct InteractionContext<'a> {
    /// Regions as the view currently renders them.
    pub visible: &'a [Region],
    pub store: &'a LayoutStore,
    pub sink: &'a mut dyn LayoutMutationSink,
    pub notifier: &'a mut dyn Notifier,
}

pub struct InteractionController {
    grid: GridConfig,
    toast_timeout: Duration,
    permissions: Box<dyn RegionPermissions>,
}

impl InteractionController {
    pub fn new(grid: GridConfig) -> Self {
        Self {
            grid,
            toast_timeout: TOAST_TIMEOUT,
            permissions: Box::new(AllowAll),
        }
    }

    pub fn with_toast_timeout(mut self, timeout: Duration) -> Self {
        self.toast_timeout = timeout;
        self
    }

    pub fn with_permissions(mut self, permissions: impl RegionPermissions + 'static) -> Self {
        self.set_permissions(permissions);
        self
    }

    pub fn set_permissions(&mut self, permissions: impl RegionPermissions + 'static) {
        self.permissions = Box::new(permissions);
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    pub fn drag_stop(&self, ctx: InteractionContext<'_>, item: &GridItem) -> InteractionOutcome {
        self.stop(Gesture::Drag, ctx, item)
    }

    pub fn resize_stop(&self, ctx: InteractionContext<'_>, item: &GridItem) -> InteractionOutcome {
        self.stop(Gesture::Resize, ctx, item)
    }

    fn stop(&self, gesture: Gesture, ctx: InteractionContext<'_>, item: &GridItem) -> InteractionOutcome {
        let Some(region) = ctx.visible.iter().find(|r| r.id == item.i) else {
            warn!(region = %item.i, ?gesture, "gesture ended on a region that is not rendered");
            return InteractionOutcome::RegionNotFound;
        };

        if region.is_locked {
            debug!(region = %region.id, ?gesture, "locked region ignored");
            return InteractionOutcome::Locked;
        }
        if !self.permissions.can(region, Permission::Edit) {
            return self.reject(ctx.notifier, region, "You do not have permission to edit this region".to_string());
        }

        let (layout_id, siblings) = siblings_of(&ctx, region);
        // The store may know newer geometry than the view that started the gesture.
        let stored = siblings
            .iter()
            .find(|s| s.id == region.id)
            .map(Region::rect)
            .unwrap_or_else(|| region.rect());
        let proposed = match gesture {
            Gesture::Drag => GridRect { grid_row: item.y, grid_col: item.x, ..stored },
            Gesture::Resize => GridRect { row_span: item.h, col_span: item.w, ..stored },
        };

        if let Err(e) = validate_grid_bounds(&proposed, self.grid.columns) {
            return self.reject(ctx.notifier, region, format!("Invalid position: {e}"));
        }
        if gesture == Gesture::Resize {
            let (min_cols, min_rows) = region.min_grid_size(&self.grid);
            if let Err(e) = validate_min_size(&proposed, min_cols, min_rows) {
                return self.reject(ctx.notifier, region, format!("Invalid size: {e}"));
            }
        }

        let collision = siblings
            .iter()
            .filter(|s| s.id != region.id)
            .find(|s| regions_overlap(&proposed, &s.rect()));
        if let Some(other) = collision {
            return self.reject(
                ctx.notifier,
                region,
                format!(
                    "Cannot place region here: it would overlap the region at row {}, column {}",
                    other.grid_row, other.grid_col
                ),
            );
        }

        if stored == proposed {
            return InteractionOutcome::Unchanged;
        }

        let mutation = match gesture {
            Gesture::Drag => {
                ctx.sink.move_region(&region.id, proposed.grid_row, proposed.grid_col);
                Mutation::Move {
                    region_id: region.id.clone(),
                    grid_row: proposed.grid_row,
                    grid_col: proposed.grid_col,
                }
            }
            Gesture::Resize => {
                ctx.sink.resize_region(&region.id, proposed.row_span, proposed.col_span);
                Mutation::Resize {
                    region_id: region.id.clone(),
                    row_span: proposed.row_span,
                    col_span: proposed.col_span,
                }
            }
        };
        info!(region = %region.id, layout = ?layout_id, ?mutation, "layout change committed");
        InteractionOutcome::Committed {
            layout_id: layout_id.map(str::to_string),
            mutation,
        }
    }

    fn reject(&self, notifier: &mut dyn Notifier, region: &Region, reason: String) -> InteractionOutcome {
        debug!(region = %region.id, %reason, "gesture rejected");
        notifier.error(&reason, self.toast_timeout);
        InteractionOutcome::Rejected { reason }
    }
}

/// Freshest sibling list for `region`, with the layout it was read from.
///
/// Reads the store under the region's layout id, or the first visible
/// region's layout id when the region carries none. Falls back to the
/// visible list (and no layout) when no layout id is known or the store has
/// not loaded it.
fn siblings_of<'a>(ctx: &InteractionContext<'a>, region: &'a Region) -> (Option<&'a str>, &'a [Region]) {
    let layout_id = region
        .layout_id
        .as_deref()
        .or_else(|| ctx.visible.first().and_then(|r| r.layout_id.as_deref()));

    match layout_id.map(|id| (id, ctx.store.get_regions_by_layout(id))) {
        Some((id, regions)) if !regions.is_empty() => (Some(id), regions),
        _ => (None, ctx.visible),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        pub moves: Vec<(String, i32, i32)>,
        pub resizes: Vec<(String, i32, i32)>,
        pub deletes: Vec<Vec<String>>,
    }

    impl LayoutMutationSink for RecordingSink {
        fn move_region(&mut self, region_id: &str, grid_row: i32, grid_col: i32) {
            self.moves.push((region_id.to_string(), grid_row, grid_col));
        }
        fn resize_region(&mut self, region_id: &str, row_span: i32, col_span: i32) {
            self.resizes.push((region_id.to_string(), row_span, col_span));
        }
        fn delete_regions(&mut self, region_ids: &[String]) {
            self.deletes.push(region_ids.to_vec());
        }
    }

    #[derive(Debug, Default)]
    struct RecordingNotifier {
        toasts: Vec<(String, Duration)>,
    }

    impl Notifier for RecordingNotifier {
        fn error(&mut self, message: &str, timeout: Duration) {
            self.toasts.push((message.to_string(), timeout));
        }
    }

    struct Harness {
        controller: InteractionController,
        store: LayoutStore,
        sink: RecordingSink,
        notifier: RecordingNotifier,
    }

    impl Harness {
        fn new(regions: Vec<Region>) -> Self {
            let mut store = LayoutStore::new(12);
            store.load_layout("main", regions);
            Self {
                controller: InteractionController::new(GridConfig::default()),
                store,
                sink: RecordingSink::default(),
                notifier: RecordingNotifier::default(),
            }
        }

        fn visible(&self) -> Vec<Region> {
            self.store.get_regions_by_layout("main").to_vec()
        }

        fn run(&mut self, gesture: Gesture, visible: &[Region], item: GridItem) -> InteractionOutcome {
            let ctx = InteractionContext {
                visible,
                store: &self.store,
                sink: &mut self.sink,
                notifier: &mut self.notifier,
            };
            match gesture {
                Gesture::Drag => self.controller.drag_stop(ctx, &item),
                Gesture::Resize => self.controller.resize_stop(ctx, &item),
            }
        }

        fn drag(&mut self, id: &str, row: i32, col: i32) -> InteractionOutcome {
            let visible = self.visible();
            let r = visible.iter().find(|r| r.id == id).map(Region::rect).unwrap_or(GridRect::new(0, 0, 1, 1));
            self.run(Gesture::Drag, &visible, item(id, col, row, r.col_span, r.row_span))
        }

        fn resize(&mut self, id: &str, row_span: i32, col_span: i32) -> InteractionOutcome {
            let visible = self.visible();
            let r = visible.iter().find(|r| r.id == id).map(Region::rect).unwrap_or(GridRect::new(0, 0, 1, 1));
            self.run(Gesture::Resize, &visible, item(id, r.grid_col, r.grid_row, col_span, row_span))
        }
    }

    fn item(i: &str, x: i32, y: i32, w: i32, h: i32) -> GridItem {
        GridItem { i: i.to_string(), x, y, w, h }
    }

    fn region(id: &str, row: i32, col: i32, row_span: i32, col_span: i32) -> Region {
        Region::new(id, GridRect::new(row, col, row_span, col_span))
    }

    fn two_regions() -> Vec<Region> {
        vec![region("a", 0, 0, 2, 2), region("b", 0, 4, 2, 2)]
    }

    #[test]
    fn test_drag_into_sibling_is_rejected() {
        let mut h = Harness::new(two_regions());

        let outcome = h.drag("b", 0, 1);

        assert!(matches!(outcome, InteractionOutcome::Rejected { .. }));
        assert!(h.sink.moves.is_empty());
        assert_eq!(h.store.get_region("main", "b").unwrap().rect(), GridRect::new(0, 4, 2, 2));
        assert_eq!(h.notifier.toasts.len(), 1);
        let (message, timeout) = &h.notifier.toasts[0];
        assert!(message.contains("row 0, column 0"), "{message}");
        assert_eq!(*timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_drag_to_same_position_writes_nothing() {
        let mut h = Harness::new(two_regions());
        assert_eq!(h.drag("b", 0, 4), InteractionOutcome::Unchanged);
        assert!(h.sink.moves.is_empty());
        assert!(h.notifier.toasts.is_empty());
    }

    #[test]
    fn test_drag_to_free_position_commits() {
        let mut h = Harness::new(two_regions());

        let outcome = h.drag("b", 3, 2);

        assert_eq!(
            outcome,
            InteractionOutcome::Committed {
                layout_id: Some("main".into()),
                mutation: Mutation::Move { region_id: "b".into(), grid_row: 3, grid_col: 2 }
            }
        );
        assert_eq!(h.sink.moves, vec![("b".to_string(), 3, 2)]);
        assert!(h.sink.resizes.is_empty());
        assert!(h.notifier.toasts.is_empty());
    }

    #[test]
    fn test_drag_next_to_sibling_commits() {
        let mut h = Harness::new(two_regions());
        // b lands right against a's right edge
        assert!(matches!(h.drag("b", 0, 2), InteractionOutcome::Committed { .. }));
        assert_eq!(h.sink.moves, vec![("b".to_string(), 0, 2)]);
    }

    #[test]
    fn test_drag_out_of_grid_is_rejected_not_clamped() {
        let mut h = Harness::new(two_regions());

        let outcome = h.drag("b", 0, 11);

        match outcome {
            InteractionOutcome::Rejected { reason } => assert!(reason.contains("column 12"), "{reason}"),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(h.sink.moves.is_empty());
    }

    #[test]
    fn test_missing_region_is_ignored_quietly() {
        let mut h = Harness::new(two_regions());
        assert_eq!(h.drag("ghost", 5, 5), InteractionOutcome::RegionNotFound);
        assert!(h.sink.moves.is_empty());
        assert!(h.notifier.toasts.is_empty());
    }

    #[test]
    fn test_locked_region_never_moves() {
        let mut h = Harness::new(two_regions());
        h.store.set_locked("main", "b", true).unwrap();
        assert_eq!(h.drag("b", 5, 5), InteractionOutcome::Locked);
        assert!(h.sink.moves.is_empty());
    }

    #[test]
    fn test_overlap_uses_store_not_stale_view() {
        let mut h = Harness::new(two_regions());
        let stale = h.visible();
        // a moved away after the view rendered
        h.store.apply_move("main", "a", 6, 0).unwrap();

        let into_old_spot = h.run(Gesture::Drag, &stale, item("b", 0, 0, 2, 2));
        assert!(matches!(into_old_spot, InteractionOutcome::Committed { .. }));

        let into_new_spot = h.run(Gesture::Drag, &stale, item("b", 0, 7, 2, 2));
        assert!(matches!(into_new_spot, InteractionOutcome::Rejected { .. }));
        assert_eq!(h.sink.moves.len(), 1);
    }

    #[test]
    fn test_drag_uses_stored_spans_of_the_dragged_region() {
        let mut h = Harness::new(two_regions());
        let stale = h.visible();
        // b grew to 4 columns after the view rendered
        h.store.apply_resize("main", "b", 2, 4).unwrap();

        let off_grid = h.run(Gesture::Drag, &stale, item("b", 9, 4, 2, 2));
        match off_grid {
            InteractionOutcome::Rejected { reason } => assert!(reason.contains("ends at 13"), "{reason}"),
            other => panic!("expected rejection, got {other:?}"),
        }

        let fits = h.run(Gesture::Drag, &stale, item("b", 8, 4, 2, 2));
        assert!(matches!(fits, InteractionOutcome::Committed { .. }));
        assert_eq!(h.sink.moves, vec![("b".to_string(), 4, 8)]);
    }

    #[test]
    fn test_stored_spans_decide_overlap() {
        let mut h = Harness::new(vec![region("a", 3, 0, 2, 2), region("b", 6, 0, 1, 2)]);
        let stale = h.visible();
        h.store.apply_resize("main", "b", 3, 2).unwrap();

        // one row tall, as rendered, b would fit above a at row 1
        let outcome = h.run(Gesture::Drag, &stale, item("b", 0, 1, 2, 1));
        assert!(matches!(outcome, InteractionOutcome::Rejected { .. }));
        let outcome = h.run(Gesture::Drag, &stale, item("b", 0, 0, 2, 1));
        assert!(matches!(outcome, InteractionOutcome::Committed { .. }));
        assert_eq!(h.sink.moves, vec![("b".to_string(), 0, 0)]);
    }

    #[test]
    fn test_huge_drag_target_is_rejected() {
        let mut h = Harness::new(two_regions());
        let visible = h.visible();
        let outcome = h.run(Gesture::Drag, &visible, item("a", i32::MAX - 1, 0, 2, 2));
        assert!(matches!(outcome, InteractionOutcome::Rejected { .. }));
        let outcome = h.run(Gesture::Drag, &visible, item("a", 0, i32::MAX, 2, 2));
        assert!(matches!(outcome, InteractionOutcome::Rejected { .. }));
        assert!(h.sink.moves.is_empty());
    }

    #[test]
    fn test_commit_names_the_layout_checked() {
        let mut h = Harness::new(two_regions());
        let mut other = vec![region("a", 0, 0, 2, 2).in_layout("side")];
        let committed = h.run(Gesture::Drag, &other, item("a", 6, 0, 2, 2));
        // "side" is not loaded, so only the rendered list was checked
        assert!(matches!(committed, InteractionOutcome::Committed { layout_id: None, .. }));

        other[0].layout_id = Some("main".into());
        let committed = h.run(Gesture::Drag, &other, item("a", 6, 0, 2, 2));
        assert_eq!(
            committed,
            InteractionOutcome::Committed {
                layout_id: Some("main".into()),
                mutation: Mutation::Move { region_id: "a".into(), grid_row: 0, grid_col: 6 }
            }
        );
    }

    #[test]
    fn test_layout_id_falls_back_to_first_visible_region() {
        let mut h = Harness::new(two_regions());
        let mut visible = h.visible();
        visible[1].layout_id = None;
        // store knows about a third region the view has not rendered yet
        h.store.insert_region("main", region("c", 4, 0, 2, 2));

        let outcome = h.run(Gesture::Drag, &visible, item("b", 0, 4, 2, 2));
        assert!(matches!(outcome, InteractionOutcome::Rejected { .. }));
    }

    #[test]
    fn test_resize_commits_and_checks_overlap() {
        let mut h = Harness::new(two_regions());

        assert!(matches!(h.resize("a", 2, 5), InteractionOutcome::Rejected { .. }));
        assert!(h.sink.resizes.is_empty());

        let outcome = h.resize("a", 3, 4);
        assert_eq!(
            outcome,
            InteractionOutcome::Committed {
                layout_id: Some("main".into()),
                mutation: Mutation::Resize { region_id: "a".into(), row_span: 3, col_span: 4 }
            }
        );
        assert_eq!(h.sink.resizes, vec![("a".to_string(), 3, 4)]);
        assert!(h.sink.moves.is_empty());
    }

    #[test]
    fn test_resize_below_minimum_is_rejected() {
        let mut a = region("a", 0, 0, 2, 3);
        a.min_width = Some(250);
        let mut h = Harness::new(vec![a]);

        match h.resize("a", 2, 2) {
            InteractionOutcome::Rejected { reason } => assert!(reason.contains("at least 3 columns"), "{reason}"),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(h.sink.resizes.is_empty());
    }

    #[test]
    fn test_resize_to_same_size_writes_nothing() {
        let mut h = Harness::new(two_regions());
        assert_eq!(h.resize("a", 2, 2), InteractionOutcome::Unchanged);
        assert!(h.sink.resizes.is_empty());
    }

    #[test]
    fn test_permission_hook_blocks_edit() {
        struct ReadOnly;
        impl RegionPermissions for ReadOnly {
            fn can(&self, _region: &Region, permission: Permission) -> bool {
                permission == Permission::Read
            }
        }

        let mut h = Harness::new(two_regions());
        h.controller = InteractionController::new(GridConfig::default()).with_permissions(ReadOnly);

        assert!(matches!(h.drag("b", 5, 5), InteractionOutcome::Rejected { .. }));
        assert!(h.sink.moves.is_empty());
        assert_eq!(h.notifier.toasts.len(), 1);
    }

    #[test]
    fn test_acl_limits_edits_to_granted_principals() {
        let access: AclPermissions = serde_json::from_str(
            r#"{
                "principals": [{"principal_type": "user", "principal_id": "u-1"},
                               {"principal_type": "team", "principal_id": "ops"}],
                "acl": {
                    "a": [{"principal_type": "team", "principal_id": "ops", "permissions": ["read", "edit"]}],
                    "b": [{"principal_type": "user", "principal_id": "u-2", "permissions": ["edit"]},
                          {"principal_type": "user", "principal_id": "u-1", "permissions": ["read"]}]
                }
            }"#,
        )
        .unwrap();

        let mut h = Harness::new(vec![region("a", 0, 0, 2, 2), region("b", 0, 4, 2, 2), region("c", 4, 0, 1, 1)]);
        h.controller.set_permissions(access);

        assert!(matches!(h.drag("a", 6, 0), InteractionOutcome::Committed { .. }));
        assert!(matches!(h.drag("b", 6, 4), InteractionOutcome::Rejected { .. }));
        // c is not shared with anyone
        assert!(matches!(h.drag("c", 8, 0), InteractionOutcome::Committed { .. }));
        assert_eq!(h.sink.moves.len(), 2);
        assert_eq!(h.notifier.toasts.len(), 1);
    }

    #[test]
    fn test_outcome_json() {
        let outcome = InteractionOutcome::Committed {
            layout_id: Some("main".into()),
            mutation: Mutation::Move { region_id: "b".into(), grid_row: 1, grid_col: 2 },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "committed");
        assert_eq!(json["layout_id"], "main");
        assert_eq!(json["mutation"]["kind"], "move");
        assert_eq!(json["mutation"]["grid_col"], 2);
    }
}
