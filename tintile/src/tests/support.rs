//! Synthetic rasters and mesh fixtures shared by the test modules.

use crate::{delaunay, mesh::SurfaceMesh, Bounds, C};
use geo::Coord;
use nalgebra::Point3;

pub fn bounds(west: C, south: C, east: C, north: C) -> Bounds {
    Bounds::new(Coord { x: west, y: south }, Coord { x: east, y: north })
}

pub fn world() -> Bounds {
    bounds(-180.0, -90.0, 180.0, 90.0)
}

/// A raster with the same height everywhere.
pub fn flat(height: f32) -> impl Fn(C, C) -> f32 {
    move |_, _| height
}

/// Heights that vary with latitude only; tiles sharing a row see the
/// same height distribution.
#[allow(clippy::cast_possible_truncation)]
pub fn lat_waves() -> impl Fn(C, C) -> f32 {
    |_, lat| (500.0 + 200.0 * (lat * 0.7).sin()) as f32
}

/// A bumpy surface with structure along both axes.
#[allow(clippy::cast_possible_truncation)]
pub fn ripple() -> impl Fn(C, C) -> f32 {
    |lon, lat| (800.0 + 300.0 * (lon * 0.9).sin() * (lat * 1.3).cos()) as f32
}

/// Regular n x n grid of normalized points with a smooth height
/// field.
#[allow(clippy::cast_precision_loss)]
pub fn grid_points(n: usize) -> Vec<Point3<C>> {
    let side = (n - 1) as C;
    let mut points = Vec::with_capacity(n * n);
    for x in 0..n {
        for y in 0..n {
            let (u, v) = (x as C / side, y as C / side);
            points.push(Point3::new(u, v, 0.5 + 0.3 * (u * 5.0).sin() * (v * 4.0).cos()));
        }
    }
    points
}

/// Halfedge mesh over the Delaunay triangulation of [`grid_points`].
pub fn grid_mesh(n: usize) -> SurfaceMesh {
    SurfaceMesh::from_triangulation(&delaunay::triangulate(&grid_points(n)))
}

/// Flat variant of [`grid_mesh`], every height zero.
#[allow(clippy::cast_precision_loss)]
pub fn flat_grid_mesh(n: usize) -> SurfaceMesh {
    let side = (n - 1) as C;
    let mut points = Vec::with_capacity(n * n);
    for x in 0..n {
        for y in 0..n {
            points.push(Point3::new(x as C / side, y as C / side, 0.0));
        }
    }
    SurfaceMesh::from_triangulation(&delaunay::triangulate(&points))
}
