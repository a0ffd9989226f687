#![deny(missing_docs)]
#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]

pub use crate::{
    border::BorderPacket,
    builder::TileBuilder,
    error::TilerError,
    grid::TileCoord,
    pyramid::{PyramidBuilder, PyramidStats},
    raster::RasterSource,
};
pub use geo;
pub use nalgebra;

#[cfg(feature = "gdal")]
pub use crate::raster::GdalRaster;

mod border;
mod builder;
pub(crate) mod delaunay;
mod error;
pub mod geodetic;
pub(crate) mod geometry;
pub mod grid;
pub(crate) mod mesh;
mod pyramid;
pub(crate) mod quantize;
mod raster;
pub(crate) mod sampler;
pub(crate) mod simplify;
#[cfg(test)]
mod tests;

/// Base floating point type used for all coordinates and calculations.
///
/// Note: this _could_ be a generic parameter, but a quantized-mesh
/// tile ends up at 16 bits per axis anyway; f64 keeps the ECEF math
/// (where meters live eight digits left of the decimal point) exact
/// without complicating every signature.
pub type C = f64;

/// Geographic bounds of a tile or dataset, `min = (west, south)`,
/// `max = (east, north)`, in degrees.
pub type Bounds = geo::Rect<C>;

/// Number of height samples along one side of a tile.
///
/// 65 matches the Cesium terrain convention: 64 intervals plus the
/// shared border sample, so neighboring tiles sample identical
/// geographic positions along their common edge.
pub const TILE_SIZE: usize = 65;

/// Fraction of triangulation edges surviving simplification unless
/// overridden on the [`TileBuilder`].
pub const DEFAULT_STOP_RATIO: C = 0.05;
