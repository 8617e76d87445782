// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One 3D view over the shared workspace
//!
//! Bundles the scene builder, the selection controller and the event bus so
//! a renderer only has to forward user input and draw the graph.

use crate::{
    tags, Error, EventBus, LoadJob, LoadProgress, LoadReport, MirrorTree, Modifiers, NodeKey,
    Result, SceneConfig, SceneEvent, SceneGraph, SceneGraphBuilder, SceneGraphMirror,
    SelectionController,
};
use ifc_scene_model::{
    Attribute, AttributeValue, EntityId, GeometryModel, GlobalId, ProductInfo, SchemaRegistry,
    Traversal, Workspace,
};
use std::path::Path;
use std::sync::Arc;

/// Attribute with its declared kind, when the schema knows it
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyRow {
    pub attribute: Attribute,
    pub kind: Option<&'static str>,
}

/// Everything a properties panel shows for one product
#[derive(Clone, Debug, PartialEq)]
pub struct ProductProperties {
    pub product: ProductInfo,
    pub schema: String,
    pub rows: Vec<PropertyRow>,
    /// Contained and decomposing products with their depth below this one
    pub related: Vec<(GlobalId, usize)>,
}

pub struct SceneView {
    builder: SceneGraphBuilder,
    bus: EventBus,
    selection: SelectionController,
    schema: SchemaRegistry,
}

impl SceneView {
    /// View reading `*.json` model documents
    pub fn new(config: SceneConfig) -> Result<Self> {
        Self::from_builder(SceneGraphBuilder::with_json(config)?)
    }

    pub fn with_workspace(workspace: Workspace, config: SceneConfig) -> Result<Self> {
        Self::from_builder(SceneGraphBuilder::new(workspace, config)?)
    }

    fn from_builder(builder: SceneGraphBuilder) -> Result<Self> {
        let bus = EventBus::new();
        let selection = SelectionController::new(&bus);
        Ok(Self {
            builder,
            bus,
            selection,
            schema: SchemaRegistry::builtin(),
        })
    }

    pub fn graph(&self) -> &SceneGraph {
        self.builder.graph()
    }

    pub fn builder(&self) -> &SceneGraphBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut SceneGraphBuilder {
        &mut self.builder
    }

    /// Bus for attaching other views
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let report = self.builder.load_file(path)?;
        self.selection.forget(self.builder.graph_mut());
        Ok(report)
    }

    pub fn begin_load(&mut self, path: impl AsRef<Path>) -> Result<LoadJob> {
        self.builder.begin_load(path)
    }

    pub fn poll_load(&mut self, job: &mut LoadJob) -> Result<LoadProgress> {
        let progress = self.builder.poll_load(job)?;
        if let LoadProgress::Finished(_) = progress {
            self.selection.forget(self.builder.graph_mut());
        }
        Ok(progress)
    }

    pub fn abandon_load(&mut self, job: LoadJob) -> Result<()> {
        self.builder.abandon_load(job)?;
        self.selection.forget(self.builder.graph_mut());
        Ok(())
    }

    pub fn reload_all(&mut self) -> Result<Vec<LoadReport>> {
        let reports = self.builder.reload_all();
        // Nodes may have been rebuilt even when a later file failed
        self.selection.forget(self.builder.graph_mut());
        reports
    }

    pub fn close_files(&mut self) -> Result<()> {
        self.builder.close_files()?;
        self.selection.clear(self.builder.graph_mut());
        Ok(())
    }

    /// Route a pick on a product
    pub fn pick(&mut self, id: &GlobalId, modifiers: Modifiers) -> Vec<SceneEvent> {
        self.selection.pick(self.builder.graph_mut(), id, modifiers)
    }

    /// Route a pick on any node, resolved to its owning product
    pub fn pick_node(&mut self, node: NodeKey, modifiers: Modifiers) -> Vec<SceneEvent> {
        match self.builder.graph().product_of(node) {
            Some((_, id)) => self.pick(&id, modifiers),
            None => Vec::new(),
        }
    }

    /// Apply events from other views; returns how many changed the selection
    pub fn sync(&mut self) -> usize {
        self.selection.sync(self.builder.graph_mut())
    }

    pub fn toggle_meshes(&mut self) -> bool {
        self.builder.toggle_meshes()
    }

    pub fn toggle_wireframe(&mut self) -> bool {
        self.builder.toggle_wireframe()
    }

    pub fn toggle_visibility(&mut self, node: NodeKey) -> Result<bool> {
        SceneGraphMirror::toggle_visibility(self.builder.graph_mut(), node)
    }

    /// Hierarchy of the whole scene
    pub fn mirror(&self) -> MirrorTree {
        let graph = self.builder.graph();
        SceneGraphMirror::rebuild(graph, graph.root())
    }

    /// Attributes and relations of a loaded product
    pub fn properties(&self, id: &GlobalId) -> Option<ProductProperties> {
        let (model, product) = self.locate(id)?;
        let rows = model
            .attributes(product.id)
            .into_iter()
            .map(|attribute| PropertyRow {
                kind: self
                    .schema
                    .lookup_by_name(&product.class, &attribute.name)
                    .map(|(_, decl)| decl.kind.label()),
                attribute,
            })
            .collect();

        let products = model.products();
        let global_id_of = |entity: EntityId| {
            products
                .iter()
                .find(|p| p.id == entity)
                .map(|p| p.global_id.clone())
        };
        let related = Traversal::default()
            .walk(model.as_ref(), product.id)
            .into_iter()
            .filter(|visit| visit.depth > 0)
            .filter_map(|visit| global_id_of(visit.id).map(|gid| (gid, visit.depth)))
            .collect();

        Some(ProductProperties {
            schema: model.metadata().schema.clone(),
            product,
            rows,
            related,
        })
    }

    /// Legal values of an enumerated attribute of a loaded product
    pub fn attribute_choices(&self, id: &GlobalId, name: &str) -> Option<Vec<String>> {
        let (_, product) = self.locate(id)?;
        self.schema
            .enum_values(&product.class, name)
            .map(<[String]>::to_vec)
    }

    /// Write an edited attribute back to the model
    ///
    /// The text is checked against the declared kind first. Other views are
    /// told with a [`SceneEvent::Update`]; an edited name also renames the
    /// product node.
    pub fn edit_attribute(&mut self, id: &GlobalId, name: &str, raw: &str) -> Result<AttributeValue> {
        let (model, product) = self
            .locate(id)
            .ok_or_else(|| Error::UnknownProduct(id.clone()))?;
        let (index, _) = self
            .schema
            .lookup_by_name(&product.class, name)
            .ok_or_else(|| ifc_scene_model::Error::UndeclaredAttribute {
                type_name: product.class.clone(),
                name: name.to_string(),
            })?;
        let value = self.schema.coerce(&product.class, index, raw)?;

        model.set_attribute(
            product.id,
            Attribute {
                name: name.to_string(),
                value: value.clone(),
            },
        )?;

        if name == "Name" {
            if let Some(node) = self.builder.graph().find_product(id) {
                let text = value.as_string().unwrap_or_default().to_string();
                self.builder.graph_mut().set_tag(node, tags::NAME, text)?;
            }
        }

        self.bus
            .publish(self.selection.view_id(), SceneEvent::Update(id.clone()));
        Ok(value)
    }

    fn locate(&self, id: &GlobalId) -> Option<(Arc<dyn GeometryModel>, ProductInfo)> {
        let workspace = self.builder.workspace();
        workspace.paths().into_iter().find_map(|path| {
            let model = workspace.get(&path)?;
            let product = model.products().into_iter().find(|p| &p.global_id == id)?;
            Some((model, product))
        })
    }
}
