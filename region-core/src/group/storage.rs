//! Where group records are kept between sessions.
//!
//! The whole collection is one JSON document under a single key:
//!
//! ```json
//! {"groups": [{"id": "group-1", "name": "KPIs", "color": "#3B82F6",
//!              "cardIds": ["r1", "r2"], "x": -15, "y": -15,
//!              "width": 230, "height": 130, "visible": true, "locked": false}]}
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use super::Group;
use crate::error::{LayoutError, Result};

pub trait GroupStorage {
    /// Raw document, or `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<String>>;
    fn save(&mut self, document: &str) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct StoredGroups {
    #[serde(default)]
    pub groups: Vec<Group>,
}

pub(crate) fn encode(groups: Vec<Group>) -> Result<String> {
    Ok(serde_json::to_string(&StoredGroups { groups })?)
}

pub(crate) fn decode(document: &str) -> Result<Vec<Group>> {
    let stored: StoredGroups = serde_json::from_str(document)?;
    Ok(stored.groups)
}

/// Keeps the document in memory. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Rc<RefCell<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.borrow().clone()
    }
}

impl GroupStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&mut self, document: &str) -> Result<()> {
        *self.slot.borrow_mut() = Some(document.to_string());
        Ok(())
    }
}

/// Browser `localStorage` under a fixed key.
#[derive(Debug, Clone)]
pub struct WebStorage {
    key: String,
}

impl WebStorage {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn storage(&self) -> Result<web_sys::Storage> {
        let window = web_sys::window().ok_or_else(|| LayoutError::Storage("no window".into()))?;
        window
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| LayoutError::Storage("localStorage disabled".into()))
    }
}

impl GroupStorage for WebStorage {
    fn load(&self) -> Result<Option<String>> {
        self.storage()?.get_item(&self.key).map_err(js_error)
    }

    fn save(&mut self, document: &str) -> Result<()> {
        self.storage()?.set_item(&self.key, document).map_err(js_error)
    }
}

fn js_error(value: JsValue) -> LayoutError {
    LayoutError::Storage(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_clones_share_slot() {
        let storage = MemoryStorage::new();
        let mut writer = storage.clone();
        assert_eq!(storage.load().unwrap(), None);

        writer.save("{}").unwrap();
        assert_eq!(storage.contents().as_deref(), Some("{}"));
    }

    #[test]
    fn test_decode_accepts_region_ids_alias() {
        let doc = r##"{"groups":[{"id":"g","name":"n","color":"#fff","regionIds":["b","a","b"],
                      "x":0,"y":0,"width":10,"height":10}]}"##;
        let groups = decode(doc).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].card_ids.len(), 2);
        assert!(groups[0].visible);
        assert!(!groups[0].locked);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("not json"), Err(LayoutError::Json(_))));
    }
}
