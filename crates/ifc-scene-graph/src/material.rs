// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared materials
//!
//! Four materials live for the whole process. Nodes reference them through
//! `Arc`s and swap references; a material is never mutated after creation.

use ifc_scene_model::Rgba;
use std::fmt;
use std::sync::{Arc, OnceLock};

static PALETTE: OnceLock<MaterialPalette> = OnceLock::new();

/// Well-known material roles
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaterialKind {
    /// Shaded with per-vertex colors
    Normal,
    /// Selected products
    Highlight,
    /// Products with a translucent style
    Transparent,
    /// Edge lines
    Wireframe,
}

impl MaterialKind {
    pub const ALL: [MaterialKind; 4] = [
        MaterialKind::Normal,
        MaterialKind::Highlight,
        MaterialKind::Transparent,
        MaterialKind::Wireframe,
    ];
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MaterialKind::Normal => "Normal",
            MaterialKind::Highlight => "Highlight",
            MaterialKind::Transparent => "Transparent",
            MaterialKind::Wireframe => "Wireframe",
        };
        f.write_str(name)
    }
}

/// Lighting model a renderer should approximate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shading {
    /// Unlit-ish shading that takes color from the vertex buffer
    PerVertexColor,
    /// Cool-to-warm technical illustration shading
    Gooch,
    DiffuseSpecular,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub name: &'static str,
    pub shading: Shading,
    pub diffuse: Rgba,
    pub shininess: f32,
    pub alpha_blend: bool,
}

/// The four shared materials
#[derive(Debug)]
pub struct MaterialPalette {
    normal: Arc<Material>,
    highlight: Arc<Material>,
    transparent: Arc<Material>,
    wireframe: Arc<Material>,
}

impl MaterialPalette {
    fn new() -> Self {
        Self {
            normal: Arc::new(Material {
                kind: MaterialKind::Normal,
                name: "Shared Vertex Color Material",
                shading: Shading::PerVertexColor,
                diffuse: Rgba::opaque(1.0, 1.0, 1.0),
                shininess: 0.0,
                alpha_blend: false,
            }),
            highlight: Arc::new(Material {
                kind: MaterialKind::Highlight,
                name: "Shared Highlight Material",
                shading: Shading::Gooch,
                diffuse: Rgba::from_rgba8(50, 250, 50, 255),
                shininess: 0.5,
                alpha_blend: false,
            }),
            transparent: Arc::new(Material {
                kind: MaterialKind::Transparent,
                name: "Shared Transparent Material",
                shading: Shading::DiffuseSpecular,
                diffuse: Rgba::from_rgba8(230, 230, 250, 150),
                shininess: 0.0,
                alpha_blend: true,
            }),
            wireframe: Arc::new(Material {
                kind: MaterialKind::Wireframe,
                name: "Shared Lines Material",
                shading: Shading::DiffuseSpecular,
                diffuse: Rgba::from_rgba8(50, 50, 50, 255),
                shininess: 0.0,
                alpha_blend: false,
            }),
        }
    }

    /// Process-wide palette, created on first use
    pub fn global() -> &'static MaterialPalette {
        PALETTE.get_or_init(MaterialPalette::new)
    }

    /// Shared reference to one material
    pub fn get(&self, kind: MaterialKind) -> Arc<Material> {
        let material = match kind {
            MaterialKind::Normal => &self.normal,
            MaterialKind::Highlight => &self.highlight,
            MaterialKind::Transparent => &self.transparent,
            MaterialKind::Wireframe => &self.wireframe,
        };
        Arc::clone(material)
    }

    pub fn all(&self) -> [Arc<Material>; 4] {
        MaterialKind::ALL.map(|kind| self.get(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_palette_is_singleton() {
        let a = MaterialPalette::global().get(MaterialKind::Highlight);
        let b = MaterialPalette::global().get(MaterialKind::Highlight);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_highlight_constants() {
        let m = MaterialPalette::global().get(MaterialKind::Highlight);
        assert_eq!(m.shading, Shading::Gooch);
        assert_relative_eq!(m.diffuse.g, 250.0 / 255.0);
        assert_relative_eq!(m.shininess, 0.5);
    }

    #[test]
    fn test_transparent_blends() {
        let m = MaterialPalette::global().get(MaterialKind::Transparent);
        assert!(m.alpha_blend);
        assert!(m.diffuse.is_transparent());
    }

    #[test]
    fn test_all_in_kind_order() {
        let kinds: Vec<_> = MaterialPalette::global()
            .all()
            .iter()
            .map(|m| m.kind)
            .collect();
        assert_eq!(kinds, MaterialKind::ALL);
    }
}
