// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Scene Model - the boundary between the scene pipeline and model backends
//!
//! This crate defines what the scene pipeline consumes from a parsed building
//! model: products with stable identities, their tessellated [`Shape`]s, and
//! read-only attribute access. Backends implement the traits; the scene crates
//! only ever see trait objects.
//!
//! # Architecture
//!
//! - [`ModelParser`] - opens a file and returns a shared model handle
//! - [`GeometryModel`] - enumerates products and produces their shapes
//! - [`Tessellator`] - turns a boundary representation into a [`Solid`]
//! - [`Workspace`] - the single owner of all loaded models, keyed by path
//! - [`SchemaRegistry`] - declared attribute kinds for runtime-typed records
//! - [`Traversal`] - cycle-safe walk over containment/decomposition relations
//!
//! # Example
//!
//! ```ignore
//! use ifc_scene_model::{JsonModelParser, Workspace};
//!
//! let mut workspace = Workspace::new(vec![Box::new(JsonModelParser::new())]);
//! let model = workspace.open("house.json")?;
//! for shape in model.iterate() {
//!     match shape {
//!         Ok(shape) => println!("{} has {} solids", shape.product.global_id, shape.solids.len()),
//!         Err(e) => eprintln!("skipped: {}", e),
//!     }
//! }
//! ```

pub mod document;
pub mod error;
pub mod schema;
pub mod shape;
pub mod tessellate;
pub mod traits;
pub mod traversal;
pub mod types;
pub mod workspace;

pub use document::*;
pub use error::*;
pub use schema::*;
pub use shape::*;
pub use tessellate::*;
pub use traits::*;
pub use traversal::*;
pub use types::*;
pub use workspace::*;
