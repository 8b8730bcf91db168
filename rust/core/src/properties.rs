// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed, named properties grouped into property sheets.
//!
//! Every entity carries a property bag keyed first by sheet name and then by
//! property name. The scene layer reads a handful of well-known properties
//! (see [`property`]); everything else is opaque to it.

use rustc_hash::FxHashMap;

/// Sheet that holds the built-in entity properties.
pub const DEFAULT_SHEET: &str = "Entity";

/// Names of the properties the scene layer understands.
pub mod property {
    /// Entity position, `[f64; 3]`. Reported through property events only.
    pub const POSITION: &str = "position";
    /// Entity rotation as axis-angle, `[f32; 4]`. Reported through property events only.
    pub const ROTATION: &str = "rotation";
    /// Entity scale, `[f32; 3]`. Reported through property events only.
    pub const SCALE: &str = "scale";
    /// Entity size, `[f32; 3]`. Reported through property events only.
    pub const SIZE: &str = "size";
    /// Wall height at a vertex (double).
    pub const HEIGHT: &str = "height";
    /// Wall thickness of a segment (double).
    pub const THICKNESS: &str = "thickness";
    /// Provisional placement preview flag (bool).
    pub const SHADOW_ENTITY: &str = "shadowEntity";
    /// Vertical alignment of an embedded opening: `"bottom"` or `"center"`.
    pub const ALIGNMENT: &str = "alignment";
    /// Texture URL applied to the entity's surface (string).
    pub const TEXTURE: &str = "texture";
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Numeric view of the value. Integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

/// Property bag: sheet name -> property name -> value.
#[derive(Debug, Clone, Default)]
pub struct PropertySheets {
    sheets: FxHashMap<String, FxHashMap<String, PropertyValue>>,
}

impl PropertySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a property value, or `None` if the sheet or the property is missing.
    pub fn get(&self, sheet: &str, name: &str) -> Option<&PropertyValue> {
        self.sheets.get(sheet).and_then(|s| s.get(name))
    }

    /// Stores a property, returning the previous value if there was one.
    pub fn set(&mut self, sheet: &str, name: &str, value: PropertyValue) -> Option<PropertyValue> {
        self.sheets
            .entry(sheet.to_string())
            .or_default()
            .insert(name.to_string(), value)
    }

    /// Removes a property. Empty sheets are dropped.
    pub fn remove(&mut self, sheet: &str, name: &str) -> Option<PropertyValue> {
        let sheet_map = self.sheets.get_mut(sheet)?;
        let removed = sheet_map.remove(name);
        if sheet_map.is_empty() {
            self.sheets.remove(sheet);
        }
        removed
    }

    pub fn contains(&self, sheet: &str, name: &str) -> bool {
        self.get(sheet, name).is_some()
    }

    /// Number of properties across all sheets.
    pub fn len(&self) -> usize {
        self.sheets.values().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_property() {
        let mut props = PropertySheets::new();
        assert!(props.set(DEFAULT_SHEET, property::HEIGHT, 2.4.into()).is_none());

        let previous = props.set(DEFAULT_SHEET, property::HEIGHT, 3.0.into());
        assert_eq!(previous, Some(PropertyValue::Double(2.4)));
        assert_eq!(
            props.get(DEFAULT_SHEET, property::HEIGHT).and_then(|v| v.as_f64()),
            Some(3.0)
        );
    }

    #[test]
    fn remove_drops_empty_sheet() {
        let mut props = PropertySheets::new();
        props.set("Custom", "label", "north wall".into());
        assert_eq!(props.len(), 1);

        let removed = props.remove("Custom", "label").unwrap();
        assert_eq!(removed.as_str(), Some("north wall"));
        assert!(props.is_empty());
        assert!(props.remove("Custom", "label").is_none());
    }

    #[test]
    fn integer_widens_to_double() {
        assert_eq!(PropertyValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(PropertyValue::Bool(true).as_f64(), None);
        assert_eq!(PropertyValue::Bool(true).as_bool(), Some(true));
    }

    #[test]
    fn sheets_are_independent() {
        let mut props = PropertySheets::new();
        props.set(DEFAULT_SHEET, "name", "a".into());
        props.set("Other", "name", "b".into());

        assert_eq!(props.get(DEFAULT_SHEET, "name").and_then(|v| v.as_str()), Some("a"));
        assert_eq!(props.get("Other", "name").and_then(|v| v.as_str()), Some("b"));
        assert!(!props.contains("Missing", "name"));
    }
}
