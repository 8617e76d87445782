// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single owner of all loaded models

use crate::{Error, GeometryModel, ModelParser, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loaded models keyed by path
///
/// Views get read-only `Arc` handles and never keep their own path map.
pub struct Workspace {
    parsers: Vec<Box<dyn ModelParser>>,
    models: BTreeMap<PathBuf, Arc<dyn GeometryModel>>,
}

impl Workspace {
    pub fn new(parsers: Vec<Box<dyn ModelParser>>) -> Self {
        Self {
            parsers,
            models: BTreeMap::new(),
        }
    }

    /// Return the cached model, or parse it on first use
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<Arc<dyn GeometryModel>> {
        let path = path.as_ref();
        if let Some(model) = self.models.get(path) {
            return Ok(Arc::clone(model));
        }
        self.parse_and_store(path)
    }

    /// Parse again, replacing any cached model
    pub fn reopen(&mut self, path: impl AsRef<Path>) -> Result<Arc<dyn GeometryModel>> {
        self.parse_and_store(path.as_ref())
    }

    fn parse_and_store(&mut self, path: &Path) -> Result<Arc<dyn GeometryModel>> {
        let parser = self
            .parsers
            .iter()
            .find(|p| p.accepts(path))
            .ok_or_else(|| Error::UnsupportedFormat(path.to_path_buf()))?;
        let model = parser.open(path)?;
        self.models.insert(path.to_path_buf(), Arc::clone(&model));
        Ok(model)
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<dyn GeometryModel>> {
        self.models.get(path.as_ref()).cloned()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.models.contains_key(path.as_ref())
    }

    /// Loaded paths in sorted order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.models.keys().cloned().collect()
    }

    pub fn close(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.models
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::NotLoaded(path.to_path_buf()))
    }

    pub fn close_all(&mut self) {
        self.models.clear();
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryModel, ProductDocument};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a fixed model and counts opens
    struct CountingParser {
        opens: Arc<AtomicUsize>,
    }

    impl ModelParser for CountingParser {
        fn open(&self, path: &Path) -> Result<Arc<dyn GeometryModel>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let model = MemoryModel::new("IFC4", vec![ProductDocument::new(1, "G1", "IfcWall")])?
                .with_file_name(path.to_string_lossy());
            Ok(Arc::new(model))
        }

        fn accepts(&self, path: &Path) -> bool {
            path.extension().is_some_and(|e| e == "mem")
        }
    }

    fn workspace() -> (Workspace, Arc<AtomicUsize>) {
        let opens = Arc::new(AtomicUsize::new(0));
        let parser = CountingParser {
            opens: Arc::clone(&opens),
        };
        (Workspace::new(vec![Box::new(parser)]), opens)
    }

    #[test]
    fn test_open_is_cached() {
        let (mut ws, opens) = workspace();
        let a = ws.open("a.mem").unwrap();
        let b = ws.open("a.mem").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reopen_reparses() {
        let (mut ws, opens) = workspace();
        let a = ws.open("a.mem").unwrap();
        let b = ws.reopen("a.mem").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        assert_eq!(ws.len(), 1);
    }

    #[test]
    fn test_unsupported_format() {
        let (mut ws, _) = workspace();
        assert!(matches!(ws.open("a.ifc"), Err(Error::UnsupportedFormat(_))));
        assert!(ws.is_empty());
    }

    #[test]
    fn test_close() {
        let (mut ws, _) = workspace();
        ws.open("b.mem").unwrap();
        ws.open("a.mem").unwrap();
        assert_eq!(ws.paths(), vec![PathBuf::from("a.mem"), PathBuf::from("b.mem")]);
        ws.close("a.mem").unwrap();
        assert!(matches!(ws.close("a.mem"), Err(Error::NotLoaded(_))));
        ws.close_all();
        assert!(ws.is_empty());
    }
}
