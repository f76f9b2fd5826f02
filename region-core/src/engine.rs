//! Owner of one dashboard's layout state.
//!
//! Ties the store, the interaction controller and the group manager
//! together: committed gestures are written back into the layout the
//! controller checked them against, and group bounds are refreshed whenever
//! region geometry changes. Region ids are only unique within a layout, so
//! every region operation names its layout.

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::grid::GridRect;
use crate::group::{Card, Group, GroupManager, GroupStorage, GroupUpdate};
use crate::interaction::{
    GridItem, InteractionContext, InteractionController, InteractionOutcome, LayoutMutationSink, Mutation,
    Notifier, RegionPermissions,
};
use crate::region::Region;
use crate::store::LayoutStore;

pub struct Engine<S> {
    cfg: EngineConfig,
    store: LayoutStore,
    controller: InteractionController,
    groups: GroupManager<S>,
}

impl<S: GroupStorage> Engine<S> {
    pub fn new(cfg: EngineConfig, storage: S) -> Self {
        let controller = InteractionController::new(cfg.grid.clone()).with_toast_timeout(cfg.toast_timeout());
        Self {
            store: LayoutStore::new(cfg.grid.columns),
            groups: GroupManager::load(cfg.groups.clone(), storage),
            controller,
            cfg,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    pub fn groups(&self) -> &GroupManager<S> {
        &self.groups
    }

    pub fn set_permissions(&mut self, permissions: impl RegionPermissions + 'static) {
        self.controller.set_permissions(permissions);
    }

    pub fn load_layout(&mut self, layout_id: &str, regions: Vec<Region>) {
        self.store.load_layout(layout_id, regions);
        self.refresh_groups(layout_id);
    }

    /// Drop a layout and every group of it.
    pub fn remove_layout(&mut self, layout_id: &str) -> Option<Vec<Region>> {
        let removed = self.store.remove_layout(layout_id)?;
        self.groups.prune_missing(Some(layout_id), &[]);
        Some(removed)
    }

    pub fn add_region(&mut self, layout_id: &str, region: Region) -> GridRect {
        let placed = self.store.insert_region(layout_id, region);
        self.refresh_groups(layout_id);
        placed
    }

    pub fn find_free_position(&self, layout_id: &str, row_span: i32, col_span: i32) -> GridRect {
        self.store.find_free_position(layout_id, row_span, col_span)
    }

    /// Remove regions from a layout; they also leave their groups.
    pub fn remove_regions(&mut self, layout_id: &str, region_ids: &[String]) {
        for id in region_ids {
            if self.store.remove_region(layout_id, id).is_none() {
                debug!(layout = layout_id, region = %id, "remove requested for unknown region");
            }
        }
        let cards = self.cards(layout_id);
        self.groups.prune_missing(Some(layout_id), &cards);
        let cards = self.all_cards();
        self.groups.prune_missing(None, &cards);
    }

    pub fn set_locked(&mut self, layout_id: &str, region_id: &str, locked: bool) -> Result<()> {
        self.store.set_locked(layout_id, region_id, locked)
    }

    pub fn drag_stop(
        &mut self,
        visible: &[Region],
        item: &GridItem,
        sink: &mut dyn LayoutMutationSink,
        notifier: &mut dyn Notifier,
    ) -> InteractionOutcome {
        let ctx = InteractionContext { visible, store: &self.store, sink, notifier };
        let outcome = self.controller.drag_stop(ctx, item);
        self.apply(&outcome);
        outcome
    }

    pub fn resize_stop(
        &mut self,
        visible: &[Region],
        item: &GridItem,
        sink: &mut dyn LayoutMutationSink,
        notifier: &mut dyn Notifier,
    ) -> InteractionOutcome {
        let ctx = InteractionContext { visible, store: &self.store, sink, notifier };
        let outcome = self.controller.resize_stop(ctx, item);
        self.apply(&outcome);
        outcome
    }

    /// Pixel positions of the regions of one layout.
    pub fn cards(&self, layout_id: &str) -> Vec<Card> {
        self.store
            .get_regions_by_layout(layout_id)
            .iter()
            .map(|r| Card::from_region(r, &self.cfg.grid))
            .collect()
    }

    pub fn create_group(
        &mut self,
        layout_id: &str,
        name: &str,
        card_ids: &[String],
        color: Option<&str>,
    ) -> Result<String> {
        let cards = self.cards(layout_id);
        self.groups.create_group(Some(layout_id), name, card_ids, &cards, color)
    }

    pub fn update_group(&mut self, group_id: &str, update: GroupUpdate) -> Result<()> {
        self.groups.update_group(group_id, update)
    }

    /// Delete a group together with its member regions.
    pub fn delete_group(&mut self, group_id: &str, sink: &mut dyn LayoutMutationSink) -> Result<Group> {
        let group = self.groups.delete_group(group_id, sink)?;
        let members: Vec<String> = group.card_ids.iter().cloned().collect();
        match group.layout_id.as_deref() {
            Some(layout_id) => self.remove_regions(layout_id, &members),
            None => {
                let layouts: Vec<String> = self.store.layout_ids().map(str::to_string).collect();
                for layout_id in &layouts {
                    self.remove_regions(layout_id, &members);
                }
            }
        }
        Ok(group)
    }

    pub fn ungroup_cards(&mut self, group_id: &str) -> Result<Group> {
        self.groups.ungroup_cards(group_id)
    }

    pub fn add_cards_to_group(&mut self, group_id: &str, card_ids: &[String]) -> Result<()> {
        let cards = self.group_cards(group_id)?;
        self.groups.add_cards_to_group(group_id, card_ids, &cards)
    }

    pub fn remove_cards_from_group(&mut self, group_id: &str, card_ids: &[String]) -> Result<()> {
        let cards = self.group_cards(group_id)?;
        self.groups.remove_cards_from_group(group_id, card_ids, &cards)
    }

    pub fn get_card_group(&self, layout_id: Option<&str>, card_id: &str) -> Option<&Group> {
        self.groups.get_card_group(layout_id, card_id)
    }

    pub fn update_group_bounds(&mut self, group_id: &str) -> Result<()> {
        let cards = self.group_cards(group_id)?;
        self.groups.update_group_bounds(group_id, &cards)
    }

    fn apply(&mut self, outcome: &InteractionOutcome) {
        let InteractionOutcome::Committed { layout_id, mutation } = outcome else {
            return;
        };
        let Some(layout_id) = layout_id.as_deref() else {
            debug!(?mutation, "committed against an unloaded layout, store untouched");
            return;
        };
        let applied = match mutation {
            Mutation::Move { region_id, grid_row, grid_col } => {
                self.store.apply_move(layout_id, region_id, *grid_row, *grid_col)
            }
            Mutation::Resize { region_id, row_span, col_span } => {
                self.store.apply_resize(layout_id, region_id, *row_span, *col_span)
            }
        };
        if let Err(e) = applied {
            warn!(layout = layout_id, error = %e, "could not apply committed mutation");
            return;
        }
        self.refresh_groups(layout_id);
    }

    /// Cards for a group: its own layout, or every layout for groups saved without one.
    fn group_cards(&self, group_id: &str) -> Result<Vec<Card>> {
        Ok(match self.groups.layout_of(group_id)? {
            Some(layout_id) => self.cards(layout_id),
            None => self.all_cards(),
        })
    }

    fn all_cards(&self) -> Vec<Card> {
        self.store
            .all_regions()
            .map(|r| Card::from_region(r, &self.cfg.grid))
            .collect()
    }

    fn refresh_groups(&mut self, layout_id: &str) {
        let cards = self.cards(layout_id);
        self.groups.refresh_bounds(Some(layout_id), &cards);
        let cards = self.all_cards();
        self.groups.refresh_bounds(None, &cards);
    }
}
