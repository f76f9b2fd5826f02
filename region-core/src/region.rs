//! Region records as the dashboard stores them.
//!
//! A region is one placed widget. The geometry fields are in grid units;
//! `min_width`/`min_height` are pixel minimums coming from the widget
//! definition and are converted to grid units against a [`GridConfig`].

use serde::{Deserialize, Serialize};

use crate::grid::{GridConfig, GridRect};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_id: Option<String>,
    pub grid_row: i32,
    pub grid_col: i32,
    #[serde(default = "one")]
    pub row_span: i32,
    #[serde(default = "one")]
    pub col_span: i32,
    /// Minimum width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<i32>,
    /// Minimum height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_height: Option<i32>,
    #[serde(default)]
    pub is_locked: bool,
    /// Widget kind ("kpi", "chart", ...), opaque here.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component_type: String,
    /// Widget settings, carried through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,
}

fn one() -> i32 {
    1
}

impl Region {
    pub fn new(id: impl Into<String>, rect: GridRect) -> Self {
        Self {
            id: id.into(),
            layout_id: None,
            grid_row: rect.grid_row,
            grid_col: rect.grid_col,
            row_span: rect.row_span,
            col_span: rect.col_span,
            min_width: None,
            min_height: None,
            is_locked: false,
            component_type: String::new(),
            config: serde_json::Value::Null,
        }
    }

    pub fn in_layout(mut self, layout_id: impl Into<String>) -> Self {
        self.layout_id = Some(layout_id.into());
        self
    }

    pub fn rect(&self) -> GridRect {
        GridRect {
            grid_row: self.grid_row,
            grid_col: self.grid_col,
            row_span: self.row_span,
            col_span: self.col_span,
        }
    }

    pub fn set_rect(&mut self, rect: GridRect) {
        self.grid_row = rect.grid_row;
        self.grid_col = rect.grid_col;
        self.row_span = rect.row_span;
        self.col_span = rect.col_span;
    }

    /// Pixel minimums expressed as `(min_cols, min_rows)`, never below one cell.
    pub fn min_grid_size(&self, cfg: &GridConfig) -> (i32, i32) {
        (
            px_to_units(self.min_width, cfg.column_width),
            px_to_units(self.min_height, cfg.row_height),
        )
    }
}

fn px_to_units(px: Option<i32>, unit: i32) -> i32 {
    match px {
        Some(px) if px > 0 && unit > 0 => ((px + unit - 1) / unit).max(1),
        _ => 1,
    }
}

// ============================================================================
// Sharing permissions
// ============================================================================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    User,
    Role,
    Team,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Edit,
    Share,
}

/// One sharing grant on a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub principal_type: PrincipalType,
    pub principal_id: String,
    pub permissions: Vec<Permission>,
}

impl AclEntry {
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn applies_to(&self, principal: &Principal) -> bool {
        self.principal_type == principal.principal_type && self.principal_id == principal.principal_id
    }
}

/// A user, or a role or team the user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub principal_type: PrincipalType,
    pub principal_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_region() {
        let r: Region = serde_json::from_str(r#"{"id":"r1","grid_row":2,"grid_col":3}"#).unwrap();
        assert_eq!(r.rect(), GridRect::new(2, 3, 1, 1));
        assert!(!r.is_locked);
        assert_eq!(r.layout_id, None);
    }

    #[test]
    fn test_serialize_skips_empty_payload() {
        let r = Region::new("r1", GridRect::new(0, 0, 2, 2)).in_layout("main");
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains(r#""layout_id":"main""#));
        assert!(!json.contains("config"));
        assert!(!json.contains("min_width"));
    }

    #[test]
    fn test_min_grid_size() {
        let cfg = GridConfig::default();
        let mut r = Region::new("r1", GridRect::new(0, 0, 1, 1));
        assert_eq!(r.min_grid_size(&cfg), (1, 1));

        r.min_width = Some(250);
        r.min_height = Some(60);
        assert_eq!(r.min_grid_size(&cfg), (3, 1));

        r.min_height = Some(61);
        assert_eq!(r.min_grid_size(&cfg), (3, 2));
    }

    #[test]
    fn test_acl_entry() {
        let entry: AclEntry = serde_json::from_str(
            r#"{"principal_type":"team","principal_id":"t-9","permissions":["read","edit"]}"#,
        )
        .unwrap();
        assert_eq!(entry.principal_type, PrincipalType::Team);
        assert!(entry.grants(Permission::Edit));
        assert!(!entry.grants(Permission::Share));

        let team = Principal { principal_type: PrincipalType::Team, principal_id: "t-9".into() };
        let user = Principal { principal_type: PrincipalType::User, principal_id: "t-9".into() };
        assert!(entry.applies_to(&team));
        assert!(!entry.applies_to(&user));
    }
}
