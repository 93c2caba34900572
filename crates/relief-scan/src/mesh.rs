//! Triangulated surface construction.
//!
//! Each interior grid cell becomes two triangles. Vertices are translated so
//! the first sample sits at the origin, and the z axis is inverted relative
//! to the raw measurement — the rangefinder looks down, so height grows as
//! measured distance shrinks.

use crate::grid::{Sample, SampleGrid};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub normal: Vertex,
    pub v1: Vertex,
    pub v2: Vertex,
    pub v3: Vertex,
}

/// Normal applied to every emitted triangle.
const SURFACE_NORMAL: Vertex = Vertex {
    x: 0.0,
    y: 0.0,
    z: 1.0,
};

/// Triangulate a completed grid.
///
/// Needs at least 2×2 populated cells; anything smaller yields no triangles.
/// Emits `2 · (steps_x − 1) · (steps_y − 1)` triangles, cell by cell with
/// the outer loop on x. The winding of the two triangles per cell —
/// (v11, v01, v00) then (v11, v00, v10) — keeps every face oriented the
/// same way across the sheet and must not change.
pub fn build_mesh(grid: &SampleGrid) -> Vec<Triangle> {
    if grid.steps_x() < 2 || grid.steps_y() < 2 || !grid.is_complete() {
        return Vec::new();
    }

    let origin = *grid.get(0, 0);
    let vertex = |s: &Sample| Vertex {
        x: s.x - origin.x,
        y: s.y - origin.y,
        z: origin.z - s.z,
    };

    let mut triangles = Vec::with_capacity(2 * (grid.steps_x() - 1) * (grid.steps_y() - 1));
    for ix in 1..grid.steps_x() {
        for iy in 1..grid.steps_y() {
            let v00 = vertex(grid.get(ix - 1, iy - 1));
            let v01 = vertex(grid.get(ix - 1, iy));
            let v10 = vertex(grid.get(ix, iy - 1));
            let v11 = vertex(grid.get(ix, iy));

            triangles.push(Triangle {
                normal: SURFACE_NORMAL,
                v1: v11,
                v2: v01,
                v3: v00,
            });
            triangles.push(Triangle {
                normal: SURFACE_NORMAL,
                v1: v11,
                v2: v00,
                v3: v10,
            });
        }
    }
    triangles
}
