// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core traits at the model boundary
//!
//! These traits define what the scene pipeline needs from a parser and a
//! geometry kernel. Everything behind them is owned by the backend.

use crate::{
    Attribute, EntityId, Error, FacetedBrep, ModelMetadata, ProductInfo, Result, Shape, Solid,
};
use std::path::Path;
use std::sync::Arc;

/// Iterator over the shapes of a model, one item per eligible product
pub type ShapeIter<'a> = Box<dyn Iterator<Item = Result<Shape>> + Send + 'a>;

/// Opens model files - entry point for loading
///
/// # Example
///
/// ```ignore
/// use ifc_scene_model::{JsonModelParser, ModelParser};
///
/// let parser = JsonModelParser::new();
/// let model = parser.open(Path::new("house.json"))?;
/// println!("Schema: {}", model.metadata().schema);
/// ```
pub trait ModelParser: Send + Sync {
    /// Open a file and return a shared model handle
    fn open(&self, path: &Path) -> Result<Arc<dyn GeometryModel>>;

    /// Whether this parser handles the given path (usually by extension)
    fn accepts(&self, path: &Path) -> bool;
}

/// Read-only access to a parsed model and its geometry
///
/// The model is thread-safe (`Send + Sync`) so that shape generation can be
/// fanned out across a worker pool.
pub trait GeometryModel: Send + Sync {
    /// Get file metadata (schema version, file name, product count)
    fn metadata(&self) -> &ModelMetadata;

    /// All products in file order, without generating geometry
    fn products(&self) -> Vec<ProductInfo>;

    /// Generate the tessellated shape of one product
    ///
    /// This runs the geometry kernel and may fail for an individual product;
    /// callers are expected to skip the product and continue.
    fn shape(&self, id: EntityId) -> Result<Shape>;

    /// Iterate shapes for every product
    fn iterate(&self) -> ShapeIter<'_> {
        Box::new(self.products().into_iter().map(move |p| self.shape(p.id)))
    }

    /// Attributes of an entity in declaration order
    fn attributes(&self, id: EntityId) -> Vec<Attribute>;

    /// Entities directly contained in or decomposing `id`
    fn related(&self, id: EntityId) -> Vec<EntityId>;

    /// Overwrite one attribute of an entity
    ///
    /// Backends that cannot write keep the default, which refuses.
    fn set_attribute(&self, id: EntityId, _attribute: Attribute) -> Result<()> {
        Err(Error::ReadOnly(id))
    }
}

/// Converts a boundary representation into triangles and edges
///
/// Implementations must be pure: no side effects beyond their own allocation.
pub trait Tessellator: Send + Sync {
    fn tessellate(&self, brep: &FacetedBrep) -> Result<Solid>;
}
