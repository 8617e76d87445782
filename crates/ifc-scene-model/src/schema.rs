// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema registry: declared attribute kinds for runtime-typed records
//!
//! A record's concrete type is only known at runtime, so editors ask the
//! registry for the declared kind of `(type, attribute index)` once per
//! edit instead of inspecting the current value.

use crate::{AttributeValue, Error, Result};
use rustc_hash::FxHashMap;
use std::fmt;
use std::str::FromStr;

/// Supported schema versions, in lookup preference order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaVersion {
    Ifc2x3,
    Ifc4,
}

impl SchemaVersion {
    pub const ALL: [SchemaVersion; 2] = [SchemaVersion::Ifc2x3, SchemaVersion::Ifc4];
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::Ifc2x3 => f.write_str("IFC2X3"),
            SchemaVersion::Ifc4 => f.write_str("IFC4"),
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "IFC2X3" => Ok(SchemaVersion::Ifc2x3),
            "IFC4" => Ok(SchemaVersion::Ifc4),
            other => Err(Error::document(format!("unsupported schema {}", other))),
        }
    }
}

/// Declared kind of an attribute
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Double,
    Int,
    Bool,
    /// Enumeration with its legal values
    Enum(Vec<String>),
    EntityRef,
    Aggregate,
}

impl AttributeKind {
    fn enumeration(values: &[&str]) -> Self {
        AttributeKind::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// Short label for display next to a value
    pub fn label(&self) -> &'static str {
        match self {
            AttributeKind::String => "STRING",
            AttributeKind::Double => "DOUBLE",
            AttributeKind::Int => "INT",
            AttributeKind::Bool => "BOOL",
            AttributeKind::Enum(_) => "ENUMERATION",
            AttributeKind::EntityRef => "ENTITY INSTANCE",
            AttributeKind::Aggregate => "AGGREGATE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: String,
    pub kind: AttributeKind,
}

impl AttributeDecl {
    pub fn new(name: &str, kind: AttributeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// Attribute declarations keyed by schema version and type name
///
/// Type names are case-insensitive. Attribute indices follow declaration
/// order, inherited attributes first.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    types: FxHashMap<(SchemaVersion, String), Vec<AttributeDecl>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the full attribute list of a type
    pub fn register(
        &mut self,
        version: SchemaVersion,
        type_name: &str,
        attributes: Vec<AttributeDecl>,
    ) {
        self.types
            .insert((version, type_name.to_ascii_uppercase()), attributes);
    }

    /// Attribute list of a type in one schema version
    pub fn attributes(&self, version: SchemaVersion, type_name: &str) -> Option<&[AttributeDecl]> {
        self.types
            .get(&(version, type_name.to_ascii_uppercase()))
            .map(Vec::as_slice)
    }

    pub fn lookup_in(
        &self,
        version: SchemaVersion,
        type_name: &str,
        index: usize,
    ) -> Option<&AttributeDecl> {
        self.attributes(version, type_name)?.get(index)
    }

    /// Look up an attribute by index, trying IFC2X3 then IFC4
    pub fn lookup(&self, type_name: &str, index: usize) -> Option<&AttributeDecl> {
        SchemaVersion::ALL
            .iter()
            .find_map(|&v| self.lookup_in(v, type_name, index))
    }

    /// Look up an attribute by name, trying IFC2X3 then IFC4
    pub fn lookup_by_name(&self, type_name: &str, name: &str) -> Option<(usize, &AttributeDecl)> {
        SchemaVersion::ALL.iter().find_map(|&v| {
            self.attributes(v, type_name)?
                .iter()
                .enumerate()
                .find(|(_, d)| d.name == name)
        })
    }

    /// Legal values of an enumerated attribute
    pub fn enum_values(&self, type_name: &str, name: &str) -> Option<&[String]> {
        match &self.lookup_by_name(type_name, name)?.1.kind {
            AttributeKind::Enum(values) => Some(values),
            _ => None,
        }
    }

    /// Validate an edit string against the declared kind
    ///
    /// `$` and the empty string clear the value.
    pub fn coerce(&self, type_name: &str, index: usize, raw: &str) -> Result<AttributeValue> {
        let decl = self
            .lookup(type_name, index)
            .ok_or_else(|| Error::UnknownAttribute {
                type_name: type_name.to_string(),
                index,
            })?;

        let raw = raw.trim();
        if raw.is_empty() || raw == "$" {
            return Ok(AttributeValue::Null);
        }

        let invalid = |reason: &str| Error::invalid_value(type_name, &decl.name, raw, reason);

        match &decl.kind {
            AttributeKind::String => Ok(AttributeValue::String(raw.to_string())),
            AttributeKind::Double => raw
                .parse::<f64>()
                .map(AttributeValue::Float)
                .map_err(|e| invalid(&e.to_string())),
            AttributeKind::Int => raw
                .parse::<i64>()
                .map(AttributeValue::Integer)
                .map_err(|e| invalid(&e.to_string())),
            AttributeKind::Bool => Ok(AttributeValue::Bool(parse_bool(raw))),
            AttributeKind::Enum(values) => {
                let candidate = raw.trim_matches('.').to_ascii_uppercase();
                if values.contains(&candidate) {
                    Ok(AttributeValue::Enum(candidate))
                } else {
                    Err(invalid(&format!("expected one of {}", values.join(", "))))
                }
            }
            AttributeKind::EntityRef => Err(invalid("entity references cannot be set from text")),
            AttributeKind::Aggregate => Err(invalid("aggregates cannot be set from text")),
        }
    }

    /// Rooted product attributes plus predefined types of common classes
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        let rooted = || {
            vec![
                AttributeDecl::new("GlobalId", AttributeKind::String),
                AttributeDecl::new("OwnerHistory", AttributeKind::EntityRef),
                AttributeDecl::new("Name", AttributeKind::String),
                AttributeDecl::new("Description", AttributeKind::String),
                AttributeDecl::new("ObjectType", AttributeKind::String),
                AttributeDecl::new("ObjectPlacement", AttributeKind::EntityRef),
                AttributeDecl::new("Representation", AttributeKind::EntityRef),
                AttributeDecl::new("Tag", AttributeKind::String),
            ]
        };
        let with = |extra: Vec<AttributeDecl>| {
            let mut attrs = rooted();
            attrs.extend(extra);
            attrs
        };
        let predefined =
            |values: &[&str]| AttributeDecl::new("PredefinedType", AttributeKind::enumeration(values));
        let overall = || {
            vec![
                AttributeDecl::new("OverallHeight", AttributeKind::Double),
                AttributeDecl::new("OverallWidth", AttributeKind::Double),
            ]
        };

        let slab_types = [
            "FLOOR",
            "ROOF",
            "LANDING",
            "BASESLAB",
            "USERDEFINED",
            "NOTDEFINED",
        ];

        // IFC2X3
        for class in ["IfcWall", "IfcWallStandardCase", "IfcBeam", "IfcColumn", "IfcBuildingElementProxy"] {
            registry.register(SchemaVersion::Ifc2x3, class, rooted());
        }
        registry.register(SchemaVersion::Ifc2x3, "IfcSlab", with(vec![predefined(&slab_types)]));
        registry.register(SchemaVersion::Ifc2x3, "IfcDoor", with(overall()));
        registry.register(SchemaVersion::Ifc2x3, "IfcWindow", with(overall()));

        // IFC4
        registry.register(
            SchemaVersion::Ifc4,
            "IfcWall",
            with(vec![predefined(&[
                "MOVABLE",
                "PARAPET",
                "PARTITIONING",
                "PLUMBINGWALL",
                "SHEAR",
                "SOLIDWALL",
                "STANDARD",
                "POLYGONAL",
                "ELEMENTEDWALL",
                "USERDEFINED",
                "NOTDEFINED",
            ])]),
        );
        registry.register(SchemaVersion::Ifc4, "IfcSlab", with(vec![predefined(&slab_types)]));
        registry.register(
            SchemaVersion::Ifc4,
            "IfcBeam",
            with(vec![predefined(&[
                "BEAM",
                "JOIST",
                "HOLLOWCORE",
                "LINTEL",
                "SPANDREL",
                "T_BEAM",
                "USERDEFINED",
                "NOTDEFINED",
            ])]),
        );
        registry.register(
            SchemaVersion::Ifc4,
            "IfcColumn",
            with(vec![predefined(&["COLUMN", "USERDEFINED", "NOTDEFINED"])]),
        );
        let mut door = overall();
        door.push(predefined(&["DOOR", "GATE", "TRAPDOOR", "USERDEFINED", "NOTDEFINED"]));
        door.push(AttributeDecl::new(
            "OperationType",
            AttributeKind::enumeration(&[
                "SINGLE_SWING_LEFT",
                "SINGLE_SWING_RIGHT",
                "DOUBLE_DOOR_SINGLE_SWING",
                "SLIDING_TO_LEFT",
                "SLIDING_TO_RIGHT",
                "FOLDING_TO_LEFT",
                "FOLDING_TO_RIGHT",
                "REVOLVING",
                "ROLLINGUP",
                "USERDEFINED",
                "NOTDEFINED",
            ]),
        ));
        door.push(AttributeDecl::new("UserDefinedOperationType", AttributeKind::String));
        registry.register(SchemaVersion::Ifc4, "IfcDoor", with(door));

        let mut window = overall();
        window.push(predefined(&["WINDOW", "SKYLIGHT", "LIGHTDOME", "USERDEFINED", "NOTDEFINED"]));
        window.push(AttributeDecl::new(
            "PartitioningType",
            AttributeKind::enumeration(&[
                "SINGLE_PANEL",
                "DOUBLE_PANEL_VERTICAL",
                "DOUBLE_PANEL_HORIZONTAL",
                "TRIPLE_PANEL_VERTICAL",
                "TRIPLE_PANEL_HORIZONTAL",
                "USERDEFINED",
                "NOTDEFINED",
            ]),
        ));
        window.push(AttributeDecl::new("UserDefinedPartitioningType", AttributeKind::String));
        registry.register(SchemaVersion::Ifc4, "IfcWindow", with(window));

        registry
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "yes" | "y" | "true" | "t" | ".t." | "1"
    )
}
