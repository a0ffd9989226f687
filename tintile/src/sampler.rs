//! Raster-to-surface sampling with border-vertex inheritance.

use crate::{border::BorderPacket, Bounds, C};
use geo::Coord;
use nalgebra::Point3;

/// One tile's worth of raster heights plus the bounds they cover.
///
/// Heights are stored raster style: row 0 is the northern edge. The
/// tile-local frame has its origin at the south-west corner instead,
/// so sampling flips rows.
pub(crate) struct RasterPatch {
    pub heights: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub bounds: Bounds,
}

/// Sample set feeding triangulation and tile geometry.
pub(crate) struct TileSamples {
    /// Tile-local points: x, y in grid steps, z in meters.
    pub local: Vec<Point3<C>>,
    /// Geographic position of each local point (lon/lat degrees) with
    /// its height in meters. Same length and order as `local`.
    pub geographic: Vec<(Coord<C>, C)>,
    pub min_height: C,
    pub max_height: C,
}

impl TileSamples {
    fn push(&mut self, patch: &RasterPatch, x: C, y: C, height: C) {
        #[allow(clippy::cast_precision_loss)]
        let (last_col, last_row) = ((patch.width - 1) as C, (patch.height - 1) as C);
        let lon = patch.bounds.min().x + (patch.bounds.max().x - patch.bounds.min().x) * x / last_col;
        let lat = patch.bounds.min().y + (patch.bounds.max().y - patch.bounds.min().y) * y / last_row;
        self.local.push(Point3::new(x, y, height));
        self.geographic.push((Coord { x: lon, y: lat }, height));
        self.min_height = self.min_height.min(height);
        self.max_height = self.max_height.max(height);
    }
}

/// Collects the sample set for one tile: raster-derived samples plus
/// the inherited west/south border vertices.
///
/// When a border packet is present, the raster column or row that
/// would coincide with it geographically is skipped; the committed
/// neighbor vertices take its place so both tiles agree exactly.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn collect_samples(
    patch: &RasterPatch,
    west: &BorderPacket,
    south: &BorderPacket,
) -> TileSamples {
    let mut samples = TileSamples {
        local: Vec::with_capacity(patch.width * patch.height + west.len() + south.len()),
        geographic: Vec::with_capacity(patch.width * patch.height + west.len() + south.len()),
        min_height: C::INFINITY,
        max_height: C::NEG_INFINITY,
    };

    let start_col = usize::from(!west.is_empty());
    let end_row = patch.height - usize::from(!south.is_empty());

    for i in start_col..patch.width {
        for j in 0..end_row {
            // Raster rows count from the north, the tile frame from
            // the south.
            let y = patch.height - 1 - j;
            let height = C::from(patch.heights[j * patch.width + i]);
            samples.push(patch, i as C, y as C, height);
        }
    }

    for packet in [west, south] {
        for point in packet.iter() {
            samples.push(patch, point.x, point.y, point.z);
        }
    }

    samples
}
