// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for scene construction and interaction

use crate::NodeKey;
use ifc_scene_model::GlobalId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scene operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the scene pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Model backend failed
    #[error(transparent)]
    Model(#[from] ifc_scene_model::Error),

    /// Node key is stale or was never issued
    #[error("Scene node {0:?} not found")]
    NodeNotFound(NodeKey),

    /// Structural change requested while a file is still loading
    #[error("{} is still loading", .0.display())]
    LoadInProgress(PathBuf),

    /// File has no subtree in the scene
    #[error("{} is not loaded", .0.display())]
    FileNotLoaded(PathBuf),

    /// No loaded model contains the product
    #[error("Product {0} is not loaded")]
    UnknownProduct(GlobalId),

    /// Visibility can only be toggled on product nodes
    #[error("Node '{0}' is not toggleable")]
    NotToggleable(String),

    /// Geometry worker pool could not be created
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_is_transparent() {
        let err: Error = ifc_scene_model::Error::document("missing products").into();
        assert_eq!(err.to_string(), "Invalid model document: missing products");
    }

    #[test]
    fn test_load_in_progress_message() {
        let err = Error::LoadInProgress(PathBuf::from("house.json"));
        assert_eq!(err.to_string(), "house.json is still loading");
    }
}
