// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene construction from loaded models
//!
//! Shapes are generated and turned into render buffers on a rayon pool.
//! Finished products travel over a channel to the thread that owns the
//! [`SceneGraph`], which is the only one inserting nodes.

use crate::reference::{axis_lines, grid_lines};
use crate::{
    tags, BuiltSolid, Component, ComponentId, Error, MaterialKind, MaterialPalette,
    MeshBufferBuilder, NodeKey, PointLight, RenderBuffer, Result, SceneConfig, SceneGraph,
    Transform,
};
use ifc_scene_model::{
    EntityId, GeometryModel, GlobalId, JsonModelParser, ModelParser, ProductInfo, Workspace,
};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvError, TryRecvError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A product whose geometry could not be generated
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeFailure {
    pub product: EntityId,
    pub global_id: GlobalId,
    pub class: String,
    pub message: String,
}

/// Outcome of one file load
#[derive(Clone, Debug, Default)]
pub struct LoadReport {
    pub path: PathBuf,
    /// Products handed to the geometry workers
    pub products: usize,
    /// Product nodes added to the scene
    pub inserted: usize,
    /// Products filtered out by class
    pub excluded: usize,
    pub failures: Vec<ShapeFailure>,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub enum LoadProgress {
    Pending { inserted: usize },
    Finished(LoadReport),
}

/// Geometry of one product, built off the scene thread
struct BuiltProduct {
    info: ProductInfo,
    solids: Vec<BuiltSolid>,
}

enum WorkerMessage {
    Built(BuiltProduct),
    Failed(ShapeFailure),
}

/// In-flight load
///
/// Must be driven to completion with [`SceneGraphBuilder::poll_load`] or
/// given up with [`SceneGraphBuilder::abandon_load`].
pub struct LoadJob {
    path: PathBuf,
    file_node: NodeKey,
    created_file_node: bool,
    receiver: Mutex<Receiver<WorkerMessage>>,
    expected: usize,
    received: usize,
    report: LoadReport,
    started: Instant,
    finished: bool,
}

impl LoadJob {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Products still being processed
    pub fn remaining(&self) -> usize {
        self.expected - self.received
    }

    /// Fraction done in `0.0..=1.0`
    pub fn progress(&self) -> f32 {
        if self.expected == 0 {
            1.0
        } else {
            self.received as f32 / self.expected as f32
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Builds and maintains the scene for all loaded files
///
/// ```text
/// Root
/// ├── Scene
/// │   ├── Grids        axis and grid lines
/// │   ├── Materials    the shared palette
/// │   ├── Lights
/// │   └── Picker
/// └── Models
///     └── <file name>
///         └── <GlobalId>
///             ├── Mesh
///             └── Line
/// ```
pub struct SceneGraphBuilder {
    graph: SceneGraph,
    workspace: Workspace,
    config: SceneConfig,
    pool: Option<Arc<ThreadPool>>,
    scene: NodeKey,
    models: NodeKey,
    files: BTreeMap<PathBuf, NodeKey>,
    loading: Option<PathBuf>,
    meshes_visible: bool,
    wireframe_visible: bool,
}

impl SceneGraphBuilder {
    pub fn new(workspace: Workspace, config: SceneConfig) -> Result<Self> {
        let mut graph = SceneGraph::new("Root");
        let root = graph.root();
        let scene = graph.spawn(root, "Scene")?;
        let models = graph.spawn(root, "Models")?;
        graph.set_tag(models, tags::IS_PRODUCT, true)?;

        let mut builder = Self {
            graph,
            workspace,
            config,
            pool: None,
            scene,
            models,
            files: BTreeMap::new(),
            loading: None,
            meshes_visible: true,
            wireframe_visible: true,
        };
        builder.build_skeleton()?;
        Ok(builder)
    }

    /// Builder reading `*.json` model documents
    pub fn with_json(config: SceneConfig) -> Result<Self> {
        let parsers: Vec<Box<dyn ModelParser>> = vec![Box::new(JsonModelParser::new())];
        Self::new(Workspace::new(parsers), config)
    }

    fn build_skeleton(&mut self) -> Result<()> {
        let palette = MaterialPalette::global();
        let g = &mut self.graph;

        let grids = g.spawn(self.scene, "Grids")?;
        g.set_tag(grids, tags::IS_PRODUCT, true)?;
        let lines = axis_lines(self.config.axis_size)
            .into_iter()
            .chain(grid_lines(self.config.grid_extent, self.config.grid_step));
        for buffer in lines {
            let line = g.spawn(grids, "Line")?;
            g.add_component(line, Component::Transform(Transform::corrective()))?;
            g.add_component(line, Component::Geometry(Arc::new(buffer)))?;
            g.add_component(line, Component::Material(palette.get(MaterialKind::Normal)))?;
        }

        let materials = g.spawn(self.scene, "Materials")?;
        g.set_tag(materials, tags::IS_PRODUCT, true)?;
        for material in palette.all() {
            g.add_component(materials, Component::Material(material))?;
        }

        let lights = g.spawn(self.scene, "Lights")?;
        g.set_tag(lights, tags::IS_PRODUCT, true)?;
        let specs = [
            ("Light Entity 1", [1.0, 1.0, 1.0], [10.0, 40.0, 0.0]),
            ("Light Entity 2", [0.8, 0.8, 1.0], [10.0, -40.0, 0.0]),
        ];
        for (name, color, position) in specs {
            let light = g.spawn(lights, name)?;
            g.set_tag(light, tags::IS_PRODUCT, true)?;
            g.add_component(
                light,
                Component::PointLight(PointLight {
                    color,
                    intensity: 1.0,
                }),
            )?;
            g.add_component(
                light,
                Component::Transform(Transform::translation("Light Transform", position)),
            )?;
        }

        let picker = g.spawn(self.scene, "Picker")?;
        g.set_tag(picker, tags::IS_PRODUCT, true)?;
        g.add_component(picker, Component::Picker)?;
        Ok(())
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn scene_node(&self) -> NodeKey {
        self.scene
    }

    pub fn models_node(&self) -> NodeKey {
        self.models
    }

    pub fn file_node(&self, path: impl AsRef<Path>) -> Option<NodeKey> {
        self.files.get(path.as_ref()).copied()
    }

    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    fn ensure_idle(&self) -> Result<()> {
        match &self.loading {
            Some(path) => Err(Error::LoadInProgress(path.clone())),
            None => Ok(()),
        }
    }

    /// Load a file and block until every product is in the scene
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let mut job = self.begin_load(path)?;
        self.finish_load(&mut job)
    }

    /// Start loading a file; geometry is generated in the background
    ///
    /// A file that is already loaded has its subtree rebuilt from the cached
    /// model.
    pub fn begin_load(&mut self, path: impl AsRef<Path>) -> Result<LoadJob> {
        self.ensure_idle()?;
        let path = path.as_ref();
        let model = self.workspace.open(path)?;
        self.start_job(path, model)
    }

    /// Parse the file again and rebuild its subtree
    pub fn reload_file(&mut self, path: impl AsRef<Path>) -> Result<LoadReport> {
        self.ensure_idle()?;
        let path = path.as_ref();
        if !self.files.contains_key(path) {
            return Err(Error::FileNotLoaded(path.to_path_buf()));
        }
        let model = self.workspace.reopen(path)?;
        let mut job = self.start_job(path, model)?;
        self.finish_load(&mut job)
    }

    pub fn reload_all(&mut self) -> Result<Vec<LoadReport>> {
        self.ensure_idle()?;
        self.loaded_paths()
            .into_iter()
            .map(|path| self.reload_file(path))
            .collect()
    }

    /// Remove every file subtree and release the models
    pub fn close_files(&mut self) -> Result<()> {
        self.ensure_idle()?;
        for (path, node) in std::mem::take(&mut self.files) {
            log::debug!("Closing {}", path.display());
            self.graph.remove(node)?;
        }
        self.workspace.close_all();
        Ok(())
    }

    fn start_job(&mut self, path: &Path, model: Arc<dyn GeometryModel>) -> Result<LoadJob> {
        let pool = self.pool()?;
        let (file_node, created_file_node) = match self.files.get(path) {
            Some(&node) => {
                self.graph.detach_children(node)?;
                (node, false)
            }
            None => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let node = self.graph.spawn(self.models, name)?;
                self.graph.set_tag(node, tags::IS_PRODUCT, true)?;
                self.graph
                    .set_tag(node, tags::PATH, path.display().to_string())?;
                self.files.insert(path.to_path_buf(), node);
                (node, true)
            }
        };

        let (products, excluded): (Vec<ProductInfo>, Vec<ProductInfo>) = model
            .products()
            .into_iter()
            .partition(|p| !self.config.is_excluded(&p.class));

        let expected = products.len();
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let work = move || {
                products
                    .into_par_iter()
                    .for_each_with(tx, |tx, info| {
                        let _ = tx.send(build_product(model.as_ref(), info));
                    });
            };
            match pool {
                Some(pool) => pool.install(work),
                None => work(),
            }
        });

        log::info!(
            "Loading {} ({} products, {} excluded)",
            path.display(),
            expected,
            excluded.len()
        );
        self.loading = Some(path.to_path_buf());

        Ok(LoadJob {
            path: path.to_path_buf(),
            file_node,
            created_file_node,
            receiver: Mutex::new(rx),
            expected,
            received: 0,
            report: LoadReport {
                path: path.to_path_buf(),
                products: expected,
                excluded: excluded.len(),
                ..Default::default()
            },
            started: Instant::now(),
            finished: false,
        })
    }

    /// Dedicated pool when a worker count is configured
    fn pool(&mut self) -> Result<Option<Arc<ThreadPool>>> {
        let Some(threads) = self.config.worker_threads else {
            return Ok(None);
        };
        if self.pool.is_none() {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("ifc-scene-geometry-{}", i))
                .build()
                .map_err(|e| Error::WorkerPool(e.to_string()))?;
            self.pool = Some(Arc::new(pool));
        }
        Ok(self.pool.clone())
    }

    /// Insert whatever the workers have finished, without blocking
    pub fn poll_load(&mut self, job: &mut LoadJob) -> Result<LoadProgress> {
        self.drain(job, false)
    }

    fn finish_load(&mut self, job: &mut LoadJob) -> Result<LoadReport> {
        match self.drain(job, true)? {
            LoadProgress::Finished(report) => Ok(report),
            LoadProgress::Pending { .. } => Err(Error::LoadInProgress(job.path.clone())),
        }
    }

    fn drain(&mut self, job: &mut LoadJob, blocking: bool) -> Result<LoadProgress> {
        if job.finished {
            return Ok(LoadProgress::Finished(job.report.clone()));
        }

        let mut disconnected = false;
        while job.received < job.expected {
            let message = {
                let receiver = job.receiver.lock();
                if blocking {
                    receiver.recv().map_err(|RecvError| TryRecvError::Disconnected)
                } else {
                    receiver.try_recv()
                }
            };
            match message {
                Ok(message) => {
                    job.received += 1;
                    if let Err(e) = self.insert(job, message) {
                        job.finished = true;
                        self.loading = None;
                        return Err(e);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if job.received < job.expected && !disconnected {
            return Ok(LoadProgress::Pending {
                inserted: job.report.inserted,
            });
        }
        if disconnected {
            log::warn!(
                "Geometry workers for {} stopped after {} of {} products",
                job.path.display(),
                job.received,
                job.expected
            );
        }

        job.finished = true;
        job.report.elapsed = job.started.elapsed();
        self.loading = None;
        log::info!(
            "Loaded {}: {} products inserted, {} failed in {:.2?}",
            job.path.display(),
            job.report.inserted,
            job.report.failures.len(),
            job.report.elapsed
        );
        Ok(LoadProgress::Finished(job.report.clone()))
    }

    /// Wait for the workers and drop everything the job inserted
    pub fn abandon_load(&mut self, mut job: LoadJob) -> Result<()> {
        {
            let receiver = job.receiver.lock();
            while job.received < job.expected && receiver.recv().is_ok() {
                job.received += 1;
            }
        }
        self.loading = None;
        if job.created_file_node {
            self.files.remove(&job.path);
            if self.graph.contains(job.file_node) {
                self.graph.remove(job.file_node)?;
            }
            let _ = self.workspace.close(&job.path);
        } else if self.graph.contains(job.file_node) {
            self.graph.detach_children(job.file_node)?;
        }
        log::info!("Abandoned loading {}", job.path.display());
        Ok(())
    }

    fn insert(&mut self, job: &mut LoadJob, message: WorkerMessage) -> Result<()> {
        let product = match message {
            WorkerMessage::Built(product) => product,
            WorkerMessage::Failed(failure) => {
                log::warn!(
                    "Shape {} [{}] ERROR - {} : {}",
                    job.received,
                    failure.product,
                    failure.class,
                    failure.message
                );
                job.report.failures.push(failure);
                return Ok(());
            }
        };

        log::debug!(
            "Shape {} [{}] {} {}",
            job.received,
            product.info.id,
            product.info.class,
            product.info.global_id
        );

        let palette = MaterialPalette::global();
        let g = &mut self.graph;
        let info = product.info;
        let node = g.spawn(job.file_node, info.global_id.to_string())?;
        g.set_tag(node, tags::IS_PRODUCT, true)?;
        g.set_tag(node, tags::GLOBAL_ID, info.global_id.to_string())?;
        g.set_tag(node, tags::CLASS, info.class)?;
        if let Some(name) = info.name {
            g.set_tag(node, tags::NAME, name)?;
        }

        for solid in product.solids {
            if !solid.mesh.is_empty() {
                let mesh = g.spawn(node, "Mesh")?;
                let kind = if solid.transparent {
                    g.set_tag(mesh, tags::IS_TRANSPARENT, true)?;
                    MaterialKind::Transparent
                } else {
                    MaterialKind::Normal
                };
                attach(g, mesh, solid.mesh, Component::Material(palette.get(kind)))?;
                g.set_enabled(mesh, self.meshes_visible)?;
            }
            if !solid.edges.is_empty() {
                let line = g.spawn(node, "Line")?;
                g.set_tag(line, tags::IS_WIREFRAME, true)?;
                attach(
                    g,
                    line,
                    solid.edges,
                    Component::Material(palette.get(MaterialKind::Wireframe)),
                )?;
                g.set_enabled(line, self.wireframe_visible)?;
            }
        }

        job.report.inserted += 1;
        Ok(())
    }

    /// Show or hide every mesh under Models; returns the new state
    pub fn toggle_meshes(&mut self) -> bool {
        self.meshes_visible = !self.meshes_visible;
        self.set_representation_visible(false, self.meshes_visible);
        self.meshes_visible
    }

    /// Show or hide every wireframe under Models; returns the new state
    pub fn toggle_wireframe(&mut self) -> bool {
        self.wireframe_visible = !self.wireframe_visible;
        self.set_representation_visible(true, self.wireframe_visible);
        self.wireframe_visible
    }

    pub fn meshes_visible(&self) -> bool {
        self.meshes_visible
    }

    pub fn wireframe_visible(&self) -> bool {
        self.wireframe_visible
    }

    fn set_representation_visible(&mut self, wireframe: bool, visible: bool) {
        let targets: Vec<NodeKey> = self
            .graph
            .descendants(self.models)
            .into_iter()
            .filter(|&k| {
                self.graph
                    .get(k)
                    .is_some_and(|n| n.has(ComponentId::Geometry) && n.is_wireframe() == wireframe)
            })
            .collect();
        for key in targets {
            let _ = self.graph.set_enabled(key, visible);
        }
    }
}

fn attach(
    graph: &mut SceneGraph,
    node: NodeKey,
    buffer: RenderBuffer,
    material: Component,
) -> Result<()> {
    graph.add_component(node, Component::Geometry(Arc::new(buffer)))?;
    graph.add_component(node, Component::Transform(Transform::corrective()))?;
    graph.add_component(node, material)?;
    Ok(())
}

/// Generate and convert one product's geometry; runs on a worker
fn build_product(model: &dyn GeometryModel, info: ProductInfo) -> WorkerMessage {
    let failed = |info: ProductInfo, message: String| {
        WorkerMessage::Failed(ShapeFailure {
            product: info.id,
            global_id: info.global_id,
            class: info.class,
            message,
        })
    };

    let shape = match model.shape(info.id) {
        Ok(shape) => shape,
        Err(e) => return failed(info, e.to_string()),
    };

    let mut solids = Vec::with_capacity(shape.solids.len());
    for (i, solid) in shape.solids.iter().enumerate() {
        if let Err(e) = solid.validate() {
            return failed(info, e.to_string());
        }
        let built = if solid.has_face_materials() {
            MeshBufferBuilder::build_per_face(solid, &shape.styles)
        } else {
            MeshBufferBuilder::build(solid, shape.style_for(i))
        };
        solids.push(built);
    }

    WorkerMessage::Built(BuiltProduct {
        info: shape.product,
        solids,
    })
}
