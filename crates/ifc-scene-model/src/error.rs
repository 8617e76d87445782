// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for model access and geometry generation

use crate::EntityId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by model backends
#[derive(Error, Debug)]
pub enum Error {
    /// Model document is structurally invalid
    #[error("Invalid model document: {0}")]
    InvalidDocument(String),

    /// Model document could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No registered parser accepts the file
    #[error("No parser accepts {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Entity not found
    #[error("Entity {0} not found")]
    EntityNotFound(EntityId),

    /// Geometry kernel failed for one product
    #[error("Geometry error for {entity} ({class}): {message}")]
    Geometry {
        entity: EntityId,
        class: String,
        message: String,
    },

    /// Tessellation produced or received inconsistent buffers
    #[error("Invalid solid: {0}")]
    InvalidSolid(String),

    /// Attribute is not declared for the type
    #[error("Unknown attribute {index} on {type_name}")]
    UnknownAttribute { type_name: String, index: usize },

    /// Edited value does not match the declared attribute kind
    #[error("Invalid value {value:?} for {type_name}.{attribute}: {reason}")]
    InvalidAttributeValue {
        type_name: String,
        attribute: String,
        value: String,
        reason: String,
    },

    /// Attribute is not declared for the type
    #[error("{type_name} has no attribute {name}")]
    UndeclaredAttribute { type_name: String, name: String },

    /// Backend does not support writing
    #[error("Entity {0} cannot be modified")]
    ReadOnly(EntityId),

    /// Path is not loaded in the workspace
    #[error("{} is not loaded", .0.display())]
    NotLoaded(PathBuf),
}

impl Error {
    /// Create a document error
    pub fn document(msg: impl Into<String>) -> Self {
        Error::InvalidDocument(msg.into())
    }

    /// Create a geometry error keyed by product identity and class
    pub fn geometry(entity: EntityId, class: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Geometry {
            entity,
            class: class.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid solid error
    pub fn invalid_solid(msg: impl Into<String>) -> Self {
        Error::InvalidSolid(msg.into())
    }

    /// Create an invalid attribute value error
    pub fn invalid_value(
        type_name: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidAttributeValue {
            type_name: type_name.into(),
            attribute: attribute.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_error_message() {
        let err = Error::geometry(EntityId(42), "IfcWall", "boolean failed");
        assert_eq!(
            err.to_string(),
            "Geometry error for #42 (IfcWall): boolean failed"
        );
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = Error::UnsupportedFormat(PathBuf::from("model.step"));
        assert_eq!(err.to_string(), "No parser accepts model.step");
    }
}
