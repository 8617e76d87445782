// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Scene Graph - from tessellated shapes to a selectable scene
//!
//! Turns the [`Shape`](ifc_scene_model::Shape)s produced by a model backend
//! into GPU-ready [`RenderBuffer`]s, organizes them in a [`SceneGraph`] of
//! toggle-able nodes, and keeps selection consistent across views through an
//! identity-keyed [`EventBus`].
//!
//! # Pipeline
//!
//! ```text
//! GeometryModel ──> SceneGraphBuilder ──> MeshBufferBuilder (per solid, on workers)
//!                          │
//!                          └──> SceneGraph <── SelectionController <── picks / EventBus
//!                                    │
//!                                    └──> SceneGraphMirror (hierarchy rows)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ifc_scene_graph::{Modifiers, SceneConfig, SceneView};
//!
//! let mut view = SceneView::new(SceneConfig::default())?;
//! let report = view.load_file("house.json")?;
//! println!("{} products, {} failed", report.inserted, report.failures.len());
//! view.pick(&"2O2Fr$t4X7Zf8NOew3FLOH".into(), Modifiers::default());
//! ```

pub mod buffer;
pub mod builder;
pub mod config;
pub mod error;
pub mod events;
pub mod material;
pub mod mirror;
pub mod node;
pub mod reference;
pub mod selection;
pub mod view;

pub use buffer::{BuiltSolid, MeshBufferBuilder, PrimitiveKind, RenderBuffer, FALLBACK_FACE_COLOR};
pub use builder::{LoadJob, LoadProgress, LoadReport, SceneGraphBuilder, ShapeFailure};
pub use config::SceneConfig;
pub use error::{Error, Result};
pub use events::{EventBus, SceneEvent, Subscription, ViewId};
pub use material::{Material, MaterialKind, MaterialPalette, Shading};
pub use mirror::{MirrorRow, MirrorTree, SceneGraphMirror};
pub use node::{
    tags, Component, ComponentId, NodeKey, PointLight, SceneGraph, SceneNode, TagValue, Transform,
};
pub use selection::{Modifiers, SelectionController};
pub use view::{ProductProperties, PropertyRow, SceneView};

// Re-export the model boundary so downstream crates need a single dependency
pub use ifc_scene_model as model;
