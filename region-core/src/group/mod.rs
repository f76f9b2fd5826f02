//! Region grouping.
//!
//! A group clusters card (region) ids under a name and a color and carries a
//! bounding box around its members, expanded by a margin. Bounds are derived
//! data: every membership change recomputes them, and callers refresh them
//! with [`GroupManager::update_group_bounds`] or
//! [`GroupManager::refresh_bounds`] when members move.
//!
//! Two margins are in use. Creation pads by `create_margin` (15 px), later
//! recomputation by `refresh_margin` (10 px). Both are configuration.
//!
//! Card ids are only unique within a layout, so a group remembers the layout
//! its cards live in. A card belongs to at most one group of its layout;
//! adding it to a group takes it out of whichever group held it before.
//! Groups saved before layouts were recorded have no layout and are matched
//! against every layout.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LayoutError, Result};
use crate::grid::{GridConfig, RectI};
use crate::interaction::LayoutMutationSink;
use crate::region::Region;

mod storage;

pub use storage::{GroupStorage, MemoryStorage, WebStorage};

/// Used when the configured palette is empty.
const FALLBACK_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_id: Option<String>,
    pub name: String,
    pub color: String,
    #[serde(alias = "regionIds")]
    pub card_ids: BTreeSet<String>,
    #[serde(flatten)]
    pub bounds: RectI,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
}

fn visible_by_default() -> bool {
    true
}

/// On-screen position of a card, in pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(flatten)]
    pub bounds: RectI,
}

impl Card {
    pub fn from_region(region: &Region, grid: &GridConfig) -> Self {
        Self {
            id: region.id.clone(),
            bounds: grid.to_pixels(&region.rect()),
        }
    }
}

/// Partial update; `None` fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Padding around members when a group is created.
    pub create_margin: i32,
    /// Padding around members when bounds are recomputed.
    pub refresh_margin: i32,
    pub palette: Vec<String>,
    /// localStorage key for the group document.
    pub storage_key: String,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            create_margin: 15,
            refresh_margin: 10,
            palette: [
                "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#14B8A6", "#F97316",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            storage_key: "card-groups".to_string(),
        }
    }
}

/// Smallest rectangle around the listed cards, grown by `margin`.
pub fn enclosing_bounds<'a, I>(card_ids: I, cards: &[Card], margin: i32) -> Option<RectI>
where
    I: IntoIterator<Item = &'a String>,
{
    let wanted: BTreeSet<&String> = card_ids.into_iter().collect();
    cards
        .iter()
        .filter(|c| wanted.contains(&c.id))
        .map(|c| c.bounds)
        .reduce(|acc, r| acc.union(&r))
        .map(|bb| bb.expand(margin))
}

pub struct GroupManager<S> {
    cfg: GroupConfig,
    groups: BTreeMap<String, Group>,
    storage: S,
    next_seq: u64,
}

impl<S: GroupStorage> GroupManager<S> {
    /// Restore groups from `storage`. An unreadable document starts empty.
    pub fn load(cfg: GroupConfig, storage: S) -> Self {
        let groups = match storage.load() {
            Ok(Some(doc)) => storage::decode(&doc).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable group document");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "group storage unavailable, starting empty");
                Vec::new()
            }
        };
        let groups: BTreeMap<String, Group> = groups.into_iter().map(|g| (g.id.clone(), g)).collect();
        debug!(count = groups.len(), "groups restored");
        Self {
            next_seq: groups.len() as u64 + 1,
            cfg,
            groups,
            storage,
        }
    }

    pub fn config(&self) -> &GroupConfig {
        &self.cfg
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn get(&self, group_id: &str) -> Option<&Group> {
        self.groups.get(group_id)
    }

    /// Group a set of cards of `layout_id`. Returns the new group id.
    pub fn create_group(
        &mut self,
        layout_id: Option<&str>,
        name: &str,
        card_ids: &[String],
        cards: &[Card],
        color: Option<&str>,
    ) -> Result<String> {
        if card_ids.is_empty() {
            return Err(LayoutError::EmptyGroup);
        }
        let members: BTreeSet<String> = card_ids.iter().cloned().collect();
        let bounds = enclosing_bounds(&members, cards, self.cfg.create_margin).unwrap_or_else(|| {
            warn!(group = name, "no positions known for group members");
            RectI::default()
        });

        let id = self.next_id();
        self.detach(layout_id, &members, &id, cards);

        let color = match color {
            Some(c) => c.to_string(),
            None => self.next_color(),
        };
        debug!(group = %id, %color, members = members.len(), "group created");
        self.groups.insert(
            id.clone(),
            Group {
                id: id.clone(),
                layout_id: layout_id.map(str::to_string),
                name: name.to_string(),
                color,
                card_ids: members,
                bounds,
                visible: true,
                locked: false,
            },
        );
        self.persist();
        Ok(id)
    }

    pub fn update_group(&mut self, group_id: &str, update: GroupUpdate) -> Result<()> {
        let group = self.group_mut(group_id)?;
        if let Some(name) = update.name {
            group.name = name;
        }
        if let Some(color) = update.color {
            group.color = color;
        }
        if let Some(visible) = update.visible {
            group.visible = visible;
        }
        if let Some(locked) = update.locked {
            group.locked = locked;
        }
        self.persist();
        Ok(())
    }

    /// Remove the group and ask `sink` to delete its member cards.
    pub fn delete_group(&mut self, group_id: &str, sink: &mut dyn LayoutMutationSink) -> Result<Group> {
        let group = self.take(group_id)?;
        let members: Vec<String> = group.card_ids.iter().cloned().collect();
        if !members.is_empty() {
            sink.delete_regions(&members);
        }
        self.persist();
        Ok(group)
    }

    /// Remove the group record, leaving its cards in place.
    pub fn ungroup_cards(&mut self, group_id: &str) -> Result<Group> {
        let group = self.take(group_id)?;
        self.persist();
        Ok(group)
    }

    pub fn add_cards_to_group(&mut self, group_id: &str, card_ids: &[String], cards: &[Card]) -> Result<()> {
        let layout_id = self.group_mut(group_id)?.layout_id.clone();
        let added: BTreeSet<String> = card_ids.iter().cloned().collect();
        self.detach(layout_id.as_deref(), &added, group_id, cards);

        let margin = self.cfg.refresh_margin;
        let group = self.group_mut(group_id)?;
        group.card_ids.extend(added);
        recompute(group, cards, margin);
        self.persist();
        Ok(())
    }

    /// Drop cards from a group. A group left without members is removed.
    pub fn remove_cards_from_group(&mut self, group_id: &str, card_ids: &[String], cards: &[Card]) -> Result<()> {
        let margin = self.cfg.refresh_margin;
        let group = self.group_mut(group_id)?;
        for id in card_ids {
            group.card_ids.remove(id);
        }
        if group.card_ids.is_empty() {
            debug!(group = group_id, "last member removed, dropping group");
            self.groups.remove(group_id);
        } else {
            recompute(group, cards, margin);
        }
        self.persist();
        Ok(())
    }

    /// Group holding `card_id`. With a layout, only that layout's groups
    /// (and groups with no layout) are considered.
    pub fn get_card_group(&self, layout_id: Option<&str>, card_id: &str) -> Option<&Group> {
        self.groups
            .values()
            .filter(|g| layout_id.is_none() || g.layout_id.is_none() || g.layout_id.as_deref() == layout_id)
            .find(|g| g.card_ids.contains(card_id))
    }

    /// Layout a group's cards live in. `Ok(None)` for groups saved without one.
    pub fn layout_of(&self, group_id: &str) -> Result<Option<&str>> {
        self.groups
            .get(group_id)
            .map(|g| g.layout_id.as_deref())
            .ok_or_else(|| LayoutError::GroupNotFound(group_id.to_string()))
    }

    /// Recompute one group's bounds from current card positions.
    pub fn update_group_bounds(&mut self, group_id: &str, cards: &[Card]) -> Result<()> {
        let margin = self.cfg.refresh_margin;
        recompute(self.group_mut(group_id)?, cards, margin);
        self.persist();
        Ok(())
    }

    /// Recompute the bounds of every group of `layout_id` from current card positions.
    pub fn refresh_bounds(&mut self, layout_id: Option<&str>, cards: &[Card]) {
        let margin = self.cfg.refresh_margin;
        for group in self.groups.values_mut().filter(|g| g.layout_id.as_deref() == layout_id) {
            recompute(group, cards, margin);
        }
        self.persist();
    }

    /// Forget cards of `layout_id` that no longer exist, dropping groups that end up empty.
    pub fn prune_missing(&mut self, layout_id: Option<&str>, cards: &[Card]) {
        let known: BTreeSet<&str> = cards.iter().map(|c| c.id.as_str()).collect();
        let before = self.groups.len();
        for group in self.groups.values_mut().filter(|g| g.layout_id.as_deref() == layout_id) {
            group.card_ids.retain(|id| known.contains(id.as_str()));
        }
        self.groups.retain(|_, g| !g.card_ids.is_empty());
        if self.groups.len() != before {
            debug!(dropped = before - self.groups.len(), "empty groups pruned");
        }
        self.refresh_bounds(layout_id, cards);
    }

    fn group_mut(&mut self, group_id: &str) -> Result<&mut Group> {
        self.groups
            .get_mut(group_id)
            .ok_or_else(|| LayoutError::GroupNotFound(group_id.to_string()))
    }

    fn take(&mut self, group_id: &str) -> Result<Group> {
        self.groups
            .remove(group_id)
            .ok_or_else(|| LayoutError::GroupNotFound(group_id.to_string()))
    }

    /// Take `card_ids` out of every group of `layout_id` except `keep`.
    fn detach(&mut self, layout_id: Option<&str>, card_ids: &BTreeSet<String>, keep: &str, cards: &[Card]) {
        let margin = self.cfg.refresh_margin;
        let mut emptied = Vec::new();
        let same_layout = |g: &&mut Group| g.id != keep && g.layout_id.as_deref() == layout_id;
        for group in self.groups.values_mut().filter(same_layout) {
            let before = group.card_ids.len();
            group.card_ids.retain(|id| !card_ids.contains(id));
            if group.card_ids.len() == before {
                continue;
            }
            if group.card_ids.is_empty() {
                emptied.push(group.id.clone());
            } else {
                recompute(group, cards, margin);
            }
        }
        for id in emptied {
            debug!(group = %id, "group emptied by regrouping");
            self.groups.remove(&id);
        }
    }

    fn next_id(&mut self) -> String {
        loop {
            let id = format!("group-{}", self.next_seq);
            self.next_seq += 1;
            if !self.groups.contains_key(&id) {
                return id;
            }
        }
    }

    /// First palette color no group uses yet; cycles once all are taken.
    fn next_color(&self) -> String {
        let palette = &self.cfg.palette;
        if palette.is_empty() {
            return FALLBACK_COLOR.to_string();
        }
        let used: BTreeSet<&str> = self.groups.values().map(|g| g.color.as_str()).collect();
        palette
            .iter()
            .find(|c| !used.contains(c.as_str()))
            .unwrap_or(&palette[self.groups.len() % palette.len()])
            .clone()
    }

    fn persist(&mut self) {
        let groups: Vec<Group> = self.groups.values().cloned().collect();
        let result = storage::encode(groups).and_then(|doc| self.storage.save(&doc));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist groups");
        }
    }
}

/// Keep the previous bounds when no member position is known.
fn recompute(group: &mut Group, cards: &[Card], margin: i32) {
    match enclosing_bounds(&group.card_ids, cards, margin) {
        Some(bounds) => group.bounds = bounds,
        None => debug!(group = %group.id, "no member positions, bounds kept"),
    }
}
