// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis and grid reference lines

use crate::{PrimitiveKind, RenderBuffer};

/// Gray used for grid lines
pub const GRID_COLOR: [f32; 3] = [0.5, 0.5, 0.5];

/// Line primitive with one color repeated per vertex
pub fn line_primitive(coordinates: Vec<f32>, color: [f32; 3]) -> RenderBuffer {
    let vertex_count = coordinates.len() / 3;
    RenderBuffer {
        colors: color.repeat(vertex_count),
        indices: (0..vertex_count as u32).collect(),
        positions: coordinates,
        normals: Vec::new(),
        primitive: PrimitiveKind::Lines,
    }
}

/// X, Y and Z axes from the origin, colored red, green and blue
pub fn axis_lines(size: f32) -> Vec<RenderBuffer> {
    vec![
        line_primitive(vec![0.0, 0.0, 0.0, size, 0.0, 0.0], [1.0, 0.0, 0.0]),
        line_primitive(vec![0.0, 0.0, 0.0, 0.0, size, 0.0], [0.0, 1.0, 0.0]),
        line_primitive(vec![0.0, 0.0, 0.0, 0.0, 0.0, size], [0.0, 0.0, 1.0]),
    ]
}

/// Square grid in the XY plane covering `-extent..=extent`
///
/// Lines parallel to Y come first, then lines parallel to X.
pub fn grid_lines(extent: i32, step: f32) -> Vec<RenderBuffer> {
    if extent < 0 || step <= 0.0 {
        return Vec::new();
    }
    let e = extent as f32;
    let offsets: Vec<f32> = (0..)
        .map(|i| -e + i as f32 * step)
        .take_while(|&o| o <= e + f32::EPSILON)
        .collect();

    let mut lines = Vec::with_capacity(offsets.len() * 2);
    for &h in &offsets {
        lines.push(line_primitive(vec![h, -e, 0.0, h, e, 0.0], GRID_COLOR));
    }
    for &v in &offsets {
        lines.push(line_primitive(vec![-e, v, 0.0, e, v, 0.0], GRID_COLOR));
    }
    lines
}
