// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON model documents and the in-memory model backend

use crate::{
    Attribute, AttributeValue, EntityId, Error, FacetTessellator, FacetedBrep, GeometryModel,
    GlobalId, ModelMetadata, ModelParser, ProductInfo, Result, Rgba, Shape, Tessellator,
};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

fn default_schema() -> String {
    "IFC4".to_string()
}

/// Serialized model: a schema tag and a flat product list
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub products: Vec<ProductDocument>,
}

/// One product in a model document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductDocument {
    pub id: EntityId,
    pub global_id: GlobalId,
    pub class: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Contained or decomposing entities
    #[serde(default)]
    pub children: Vec<EntityId>,
    /// Style per geometry item
    #[serde(default)]
    pub styles: Vec<Rgba>,
    #[serde(default)]
    pub items: Vec<FacetedBrep>,
}

impl ProductDocument {
    pub fn new(id: u32, global_id: impl Into<GlobalId>, class: impl Into<String>) -> Self {
        Self {
            id: EntityId(id),
            global_id: global_id.into(),
            class: class.into(),
            name: None,
            attributes: Vec::new(),
            children: Vec::new(),
            styles: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a geometry item with its style
    pub fn with_item(mut self, brep: FacetedBrep, style: Rgba) -> Self {
        self.items.push(brep);
        self.styles.push(style);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value,
        });
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = u32>) -> Self {
        self.children.extend(children.into_iter().map(EntityId));
        self
    }

    fn info(&self) -> ProductInfo {
        ProductInfo {
            id: self.id,
            global_id: self.global_id.clone(),
            class: self.class.clone(),
            name: self.name.clone(),
        }
    }
}

/// In-memory [`GeometryModel`]
///
/// Products keep document order. Geometry is tessellated on demand, so
/// [`GeometryModel::shape`] is cheap to call from worker threads. Attribute
/// edits live in memory on top of the document until the file is reopened.
pub struct MemoryModel {
    metadata: ModelMetadata,
    products: Vec<ProductDocument>,
    index: FxHashMap<EntityId, usize>,
    failures: FxHashMap<EntityId, String>,
    edits: RwLock<FxHashMap<EntityId, Vec<Attribute>>>,
    tessellator: FacetTessellator,
}

impl MemoryModel {
    /// Build a model from a document, rejecting duplicate identities
    pub fn from_document(document: ModelDocument, file_name: Option<String>) -> Result<Self> {
        let mut index = FxHashMap::default();
        let mut global_ids = FxHashSet::default();
        for (i, product) in document.products.iter().enumerate() {
            if index.insert(product.id, i).is_some() {
                return Err(Error::document(format!("duplicate entity {}", product.id)));
            }
            if !global_ids.insert(product.global_id.clone()) {
                return Err(Error::document(format!(
                    "duplicate GlobalId {}",
                    product.global_id
                )));
            }
            if product.styles.len() > product.items.len() {
                return Err(Error::document(format!(
                    "{} has {} styles for {} items",
                    product.id,
                    product.styles.len(),
                    product.items.len()
                )));
            }
        }

        Ok(Self {
            metadata: ModelMetadata {
                schema: document.schema,
                file_name,
                product_count: document.products.len(),
            },
            products: document.products,
            index,
            failures: FxHashMap::default(),
            edits: RwLock::new(FxHashMap::default()),
            tessellator: FacetTessellator::new(),
        })
    }

    /// Model with the given schema and products
    pub fn new(schema: impl Into<String>, products: Vec<ProductDocument>) -> Result<Self> {
        Self::from_document(
            ModelDocument {
                schema: schema.into(),
                products,
            },
            None,
        )
    }

    /// Make the geometry kernel fail for one product
    pub fn with_failure(mut self, id: u32, message: impl Into<String>) -> Self {
        self.failures.insert(EntityId(id), message.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.metadata.file_name = Some(file_name.into());
        self
    }

    fn product(&self, id: EntityId) -> Option<&ProductDocument> {
        self.index.get(&id).map(|&i| &self.products[i])
    }

    /// Descriptor with an edited name applied
    fn info(&self, product: &ProductDocument) -> ProductInfo {
        let mut info = product.info();
        if let Some(edits) = self.edits.read().get(&product.id) {
            if let Some(name) = edits.iter().rev().find(|a| a.name == "Name") {
                info.name = name.value.as_string().map(str::to_string);
            }
        }
        info
    }
}

impl GeometryModel for MemoryModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn products(&self) -> Vec<ProductInfo> {
        self.products.iter().map(|p| self.info(p)).collect()
    }

    fn shape(&self, id: EntityId) -> Result<Shape> {
        let product = self.product(id).ok_or(Error::EntityNotFound(id))?;
        if let Some(message) = self.failures.get(&id) {
            return Err(Error::geometry(id, &product.class, message));
        }

        let mut solids = Vec::with_capacity(product.items.len());
        for item in &product.items {
            let solid = self
                .tessellator
                .tessellate(item)
                .map_err(|e| Error::geometry(id, &product.class, e.to_string()))?;
            solids.push(solid);
        }

        let style_ids = (0..solids.len())
            .map(|i| {
                if i < product.styles.len() {
                    i as i32
                } else {
                    -1
                }
            })
            .collect();

        Ok(Shape {
            id,
            product: self.info(product),
            solids,
            styles: product.styles.clone(),
            style_ids,
        })
    }

    fn attributes(&self, id: EntityId) -> Vec<Attribute> {
        let Some(product) = self.product(id) else {
            return Vec::new();
        };

        let mut attributes = Vec::with_capacity(product.attributes.len() + 2);
        if !product.attributes.iter().any(|a| a.name == "GlobalId") {
            attributes.push(Attribute {
                name: "GlobalId".into(),
                value: AttributeValue::String(product.global_id.to_string()),
            });
        }
        if !product.attributes.iter().any(|a| a.name == "Name") {
            attributes.push(Attribute {
                name: "Name".into(),
                value: product
                    .name
                    .clone()
                    .map(AttributeValue::String)
                    .unwrap_or_default(),
            });
        }
        attributes.extend(product.attributes.iter().cloned());

        if let Some(edits) = self.edits.read().get(&id) {
            for edit in edits {
                match attributes.iter_mut().find(|a| a.name == edit.name) {
                    Some(attribute) => attribute.value = edit.value.clone(),
                    None => attributes.push(edit.clone()),
                }
            }
        }
        attributes
    }

    fn related(&self, id: EntityId) -> Vec<EntityId> {
        self.product(id)
            .map(|p| p.children.clone())
            .unwrap_or_default()
    }

    fn set_attribute(&self, id: EntityId, attribute: Attribute) -> Result<()> {
        let product = self.product(id).ok_or(Error::EntityNotFound(id))?;
        if attribute.name == "GlobalId" {
            return Err(Error::invalid_value(
                &product.class,
                &attribute.name,
                &attribute.value.to_string(),
                "the identity of a product is fixed",
            ));
        }

        log::debug!("{} {}.{} = {}", id, product.class, attribute.name, attribute.value);
        let mut edits = self.edits.write();
        let entry = edits.entry(id).or_default();
        entry.retain(|a| a.name != attribute.name);
        entry.push(attribute);
        Ok(())
    }
}

/// Parser for `*.json` model documents
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonModelParser;

impl JsonModelParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse document content
    pub fn parse(&self, content: &str, file_name: Option<String>) -> Result<MemoryModel> {
        let document: ModelDocument = serde_json::from_str(content)?;
        MemoryModel::from_document(document, file_name)
    }
}

impl ModelParser for JsonModelParser {
    fn open(&self, path: &Path) -> Result<Arc<dyn GeometryModel>> {
        let content = std::fs::read_to_string(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let model = self.parse(&content, file_name)?;
        log::debug!(
            "Opened {} ({}, {} products)",
            path.display(),
            model.metadata.schema,
            model.metadata.product_count
        );
        Ok(Arc::new(model))
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }
}
