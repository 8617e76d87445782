// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene construction settings

use serde::{Deserialize, Serialize};

/// Settings for [`SceneGraphBuilder`](crate::SceneGraphBuilder)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Product classes filtered out before any geometry is generated
    pub excluded_classes: Vec<String>,
    /// Length of each reference axis
    pub axis_size: f32,
    /// Grid half-extent from the origin
    pub grid_extent: i32,
    /// Distance between grid lines
    pub grid_step: f32,
    /// Geometry worker count; `None` uses one per CPU core
    pub worker_threads: Option<usize>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            excluded_classes: vec!["IfcOpeningElement".to_string(), "IfcSpace".to_string()],
            axis_size: 5.0,
            grid_extent: 10,
            grid_step: 1.0,
            worker_threads: None,
        }
    }
}

impl SceneConfig {
    /// Whether products of this class are skipped (case-insensitive)
    pub fn is_excluded(&self, class: &str) -> bool {
        self.excluded_classes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(class))
    }
}
