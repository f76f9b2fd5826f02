//! WASM bindings for the region-core library.
//!
//! All functions exposed to JavaScript via wasm-bindgen are defined here.
//! Structured data crosses the boundary as JSON strings; failures come back
//! as `{"error": "..."}`.

use std::sync::Once;
use std::time::Duration;

use js_sys::{Array, Function};
use serde::de::DeserializeOwned;
use tracing::warn;
use wasm_bindgen::prelude::*;

use crate::config::parse_config;
use crate::engine::Engine;
use crate::error::LayoutError;
use crate::grid::{self, BoundsCheck, GridRect};
use crate::group::{GroupUpdate, WebStorage};
use crate::interaction::{AclPermissions, GridItem, LayoutMutationSink, Notifier};
use crate::output::{to_json, LayoutOutput, PlacementOutput};
use crate::region::Region;

static INIT: Once = Once::new();

/// Install the panic hook and route `tracing` output to the browser console.
#[wasm_bindgen]
pub fn init() {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    });
}

/// Check a `{grid_row, grid_col, row_span, col_span}` rectangle.
/// Returns `{valid, error?}`.
#[wasm_bindgen]
pub fn validate_grid_bounds(rect_json: &str, columns: i32) -> String {
    let rect: Result<GridRect, _> = serde_json::from_str(rect_json);
    to_json(rect.map(|r| BoundsCheck::from(grid::validate_grid_bounds(&r, columns))))
}

/// True when the two rectangles share a cell. Unparseable input never overlaps.
#[wasm_bindgen]
pub fn regions_overlap(a_json: &str, b_json: &str) -> bool {
    match (serde_json::from_str::<GridRect>(a_json), serde_json::from_str::<GridRect>(b_json)) {
        (Ok(a), Ok(b)) => grid::regions_overlap(&a, &b),
        _ => {
            warn!("regions_overlap called with malformed rectangles");
            false
        }
    }
}

/// Forwards committed changes to JS callbacks.
#[derive(Default)]
struct JsSink {
    on_move: Option<Function>,
    on_resize: Option<Function>,
    on_delete_cards: Option<Function>,
}

impl LayoutMutationSink for JsSink {
    fn move_region(&mut self, region_id: &str, grid_row: i32, grid_col: i32) {
        if let Some(f) = &self.on_move {
            report(f.call3(&JsValue::NULL, &region_id.into(), &grid_row.into(), &grid_col.into()), "onMove");
        }
    }

    fn resize_region(&mut self, region_id: &str, row_span: i32, col_span: i32) {
        if let Some(f) = &self.on_resize {
            report(f.call3(&JsValue::NULL, &region_id.into(), &row_span.into(), &col_span.into()), "onResize");
        }
    }

    fn delete_regions(&mut self, region_ids: &[String]) {
        if let Some(f) = &self.on_delete_cards {
            let ids: Array = region_ids.iter().map(|id| JsValue::from_str(id)).collect();
            report(f.call1(&JsValue::NULL, &ids), "onDeleteCards");
        }
    }
}

#[derive(Default)]
struct JsToast {
    on_toast: Option<Function>,
}

impl Notifier for JsToast {
    fn error(&mut self, message: &str, timeout: Duration) {
        match &self.on_toast {
            Some(f) => report(
                f.call2(&JsValue::NULL, &message.into(), &JsValue::from_f64(timeout.as_millis() as f64)),
                "onToast",
            ),
            None => warn!(%message, "no toast callback registered"),
        }
    }
}

fn report(result: Result<JsValue, JsValue>, callback: &str) {
    if let Err(e) = result {
        warn!(callback, error = ?e.as_string(), "callback threw");
    }
}

#[wasm_bindgen]
pub struct LayoutEngine {
    engine: Engine<WebStorage>,
    sink: JsSink,
    toast: JsToast,
}

#[wasm_bindgen]
impl LayoutEngine {
    /// Build an engine from a JSON config; `""` gives the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<LayoutEngine, JsError> {
        let cfg = parse_config(config_json).map_err(|e| JsError::new(&e.to_string()))?;
        let storage = WebStorage::new(cfg.groups.storage_key.clone());
        Ok(LayoutEngine {
            engine: Engine::new(cfg, storage),
            sink: JsSink::default(),
            toast: JsToast::default(),
        })
    }

    #[wasm_bindgen(js_name = setCallbacks)]
    pub fn set_callbacks(
        &mut self,
        on_move: Option<Function>,
        on_resize: Option<Function>,
        on_delete_cards: Option<Function>,
        on_toast: Option<Function>,
    ) {
        self.sink = JsSink { on_move, on_resize, on_delete_cards };
        self.toast = JsToast { on_toast };
    }

    /// `{principals, acl}`: who the current user is and the sharing grants per region id.
    #[wasm_bindgen(js_name = setAccess)]
    pub fn set_access(&mut self, access_json: &str) -> String {
        to_json(parse::<AclPermissions>(access_json).map(|access| self.engine.set_permissions(access)))
    }

    /// Replace a layout's regions with a JSON array of regions.
    #[wasm_bindgen(js_name = loadLayout)]
    pub fn load_layout(&mut self, layout_id: &str, regions_json: &str) -> String {
        let regions: Result<Vec<Region>, _> = serde_json::from_str(regions_json);
        to_json(regions.map(|regions| self.engine.load_layout(layout_id, regions)))
    }

    /// Forget a layout; returns how many regions it held.
    #[wasm_bindgen(js_name = removeLayout)]
    pub fn remove_layout(&mut self, layout_id: &str) -> String {
        to_json(Ok::<_, String>(self.engine.remove_layout(layout_id).map_or(0, |r| r.len())))
    }

    #[wasm_bindgen(js_name = getRegionsByLayout)]
    pub fn get_regions_by_layout(&self, layout_id: &str) -> String {
        let regions = self.engine.store().get_regions_by_layout(layout_id);
        let groups = self
            .engine
            .groups()
            .groups()
            .filter(|g| match g.layout_id.as_deref() {
                Some(id) => id == layout_id,
                None => g.card_ids.iter().any(|id| regions.iter().any(|r| &r.id == id)),
            })
            .collect();
        to_json(Ok::<_, String>(LayoutOutput { layout_id, regions, groups }))
    }

    #[wasm_bindgen(js_name = findFreePosition)]
    pub fn find_free_position(&self, layout_id: &str, row_span: i32, col_span: i32) -> String {
        to_json(Ok::<_, String>(self.engine.find_free_position(layout_id, row_span, col_span)))
    }

    #[wasm_bindgen(js_name = addRegion)]
    pub fn add_region(&mut self, layout_id: &str, region_json: &str) -> String {
        let region: Result<Region, _> = serde_json::from_str(region_json);
        to_json(region.map(|region| {
            let id = region.id.clone();
            let rect = self.engine.add_region(layout_id, region);
            PlacementOutput { id, rect }
        }))
    }

    #[wasm_bindgen(js_name = removeRegions)]
    pub fn remove_regions(&mut self, layout_id: &str, ids_json: &str) -> String {
        let ids: Result<Vec<String>, _> = serde_json::from_str(ids_json);
        to_json(ids.map(|ids| self.engine.remove_regions(layout_id, &ids)))
    }

    #[wasm_bindgen(js_name = setLocked)]
    pub fn set_locked(&mut self, layout_id: &str, region_id: &str, locked: bool) -> String {
        to_json(self.engine.set_locked(layout_id, region_id, locked))
    }

    /// `visible_json` is the region list the grid is rendering, `item_json`
    /// the `{i, x, y, w, h}` the grid reported on drag stop.
    #[wasm_bindgen(js_name = onDragStop)]
    pub fn on_drag_stop(&mut self, visible_json: &str, item_json: &str) -> String {
        match parse_gesture(visible_json, item_json) {
            Ok((visible, item)) => {
                to_json(Ok::<_, String>(self.engine.drag_stop(&visible, &item, &mut self.sink, &mut self.toast)))
            }
            Err(e) => to_json(Err::<(), _>(e)),
        }
    }

    #[wasm_bindgen(js_name = onResizeStop)]
    pub fn on_resize_stop(&mut self, visible_json: &str, item_json: &str) -> String {
        match parse_gesture(visible_json, item_json) {
            Ok((visible, item)) => {
                to_json(Ok::<_, String>(self.engine.resize_stop(&visible, &item, &mut self.sink, &mut self.toast)))
            }
            Err(e) => to_json(Err::<(), _>(e)),
        }
    }

    #[wasm_bindgen(js_name = createGroup)]
    pub fn create_group(&mut self, layout_id: &str, name: &str, card_ids_json: &str, color: Option<String>) -> String {
        to_json(
            parse::<Vec<String>>(card_ids_json)
                .and_then(|ids| self.engine.create_group(layout_id, name, &ids, color.as_deref())),
        )
    }

    #[wasm_bindgen(js_name = updateGroup)]
    pub fn update_group(&mut self, group_id: &str, update_json: &str) -> String {
        to_json(parse::<GroupUpdate>(update_json).and_then(|update| self.engine.update_group(group_id, update)))
    }

    #[wasm_bindgen(js_name = deleteGroup)]
    pub fn delete_group(&mut self, group_id: &str) -> String {
        to_json(self.engine.delete_group(group_id, &mut self.sink))
    }

    #[wasm_bindgen(js_name = ungroupCards)]
    pub fn ungroup_cards(&mut self, group_id: &str) -> String {
        to_json(self.engine.ungroup_cards(group_id))
    }

    #[wasm_bindgen(js_name = addCardsToGroup)]
    pub fn add_cards_to_group(&mut self, group_id: &str, card_ids_json: &str) -> String {
        to_json(parse::<Vec<String>>(card_ids_json).and_then(|ids| self.engine.add_cards_to_group(group_id, &ids)))
    }

    #[wasm_bindgen(js_name = removeCardsFromGroup)]
    pub fn remove_cards_from_group(&mut self, group_id: &str, card_ids_json: &str) -> String {
        to_json(parse::<Vec<String>>(card_ids_json).and_then(|ids| self.engine.remove_cards_from_group(group_id, &ids)))
    }

    /// The group holding `card_id`, or `null`. Without a layout any layout matches.
    #[wasm_bindgen(js_name = getCardGroup)]
    pub fn get_card_group(&self, card_id: &str, layout_id: Option<String>) -> String {
        to_json(Ok::<_, String>(self.engine.get_card_group(layout_id.as_deref(), card_id)))
    }

    #[wasm_bindgen(js_name = updateGroupBounds)]
    pub fn update_group_bounds(&mut self, group_id: &str) -> String {
        to_json(self.engine.update_group_bounds(group_id))
    }

    #[wasm_bindgen(js_name = getGroups)]
    pub fn get_groups(&self) -> String {
        to_json(Ok::<_, String>(self.engine.groups().groups().collect::<Vec<_>>()))
    }
}

fn parse<T: DeserializeOwned>(json: &str) -> Result<T, LayoutError> {
    Ok(serde_json::from_str(json)?)
}

fn parse_gesture(visible_json: &str, item_json: &str) -> Result<(Vec<Region>, GridItem), serde_json::Error> {
    Ok((serde_json::from_str(visible_json)?, serde_json::from_str(item_json)?))
}
