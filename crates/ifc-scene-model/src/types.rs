// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core identity, color and attribute types

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Type-safe entity identifier
///
/// Wraps the file-scoped STEP instance number (e.g., #123 becomes EntityId(123))
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize, Default)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        EntityId(id)
    }
}

/// Stable, file-scoped identity string used to correlate an entity across views
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct GlobalId(pub String);

impl GlobalId {
    pub fn new(id: impl Into<String>) -> Self {
        GlobalId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GlobalId {
    fn from(id: &str) -> Self {
        GlobalId(id.to_string())
    }
}

impl From<String> for GlobalId {
    fn from(id: String) -> Self {
        GlobalId(id)
    }
}

impl Borrow<str> for GlobalId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// RGBA color with components in 0.0-1.0
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    /// Neutral gray used when a shape carries no style
    pub const DEFAULT: Rgba = Rgba::new(0.8, 0.8, 0.8, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Build from 8-bit channels
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    pub fn rgb(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Whether geometry with this style needs alpha blending
    pub fn is_transparent(&self) -> bool {
        self.a < 1.0
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<[f32; 4]> for Rgba {
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// Decoded attribute value
///
/// Represents any value that can appear in an entity's attribute list.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum AttributeValue {
    /// Null value ($)
    #[default]
    Null,
    /// Entity reference (#123)
    EntityRef(EntityId),
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Enumeration value (.VALUE.)
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Try to get as entity reference
    pub fn as_entity_ref(&self) -> Option<EntityId> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => f.write_str("$"),
            AttributeValue::EntityRef(id) => write!(f, "{}", id),
            AttributeValue::Bool(true) => f.write_str(".T."),
            AttributeValue::Bool(false) => f.write_str(".F."),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Enum(s) => write!(f, ".{}.", s),
            AttributeValue::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Named attribute of an entity, in declaration order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

/// Model metadata
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Schema identifier (e.g., "IFC2X3", "IFC4")
    pub schema: String,
    /// Original file name, if known
    pub file_name: Option<String>,
    /// Number of products in the model
    pub product_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId(17).to_string(), "#17");
    }

    #[test]
    fn test_rgba_transparency() {
        assert!(!Rgba::opaque(1.0, 0.0, 0.0).is_transparent());
        assert!(Rgba::new(1.0, 1.0, 1.0, 0.4).is_transparent());
    }

    #[test]
    fn test_rgba_from_rgba8() {
        let c = Rgba::from_rgba8(255, 0, 51, 255);
        assert_eq!(c.rgb(), [1.0, 0.0, 0.2]);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn test_global_id_lookup_by_str() {
        let mut set = std::collections::HashSet::new();
        set.insert(GlobalId::from("2O2Fr$t4X7Zf8NOew3FLOH"));
        assert!(set.contains("2O2Fr$t4X7Zf8NOew3FLOH"));
    }

    #[test]
    fn test_attribute_value_display() {
        let list = AttributeValue::List(vec![
            AttributeValue::EntityRef(EntityId(3)),
            AttributeValue::Enum("NOTDEFINED".into()),
            AttributeValue::Bool(true),
        ]);
        assert_eq!(list.to_string(), "(#3,.NOTDEFINED.,.T.)");
        assert_eq!(AttributeValue::Null.to_string(), "$");
    }
}
