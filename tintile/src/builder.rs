//! The per-tile construction pipeline: sample, triangulate, simplify,
//! quantize, classify borders.

use crate::{
    border::{classify_borders, BorderPacket},
    delaunay,
    geodetic::geodetic_to_ecef,
    geometry,
    grid::{self, TileCoord},
    mesh::SurfaceMesh,
    quantize,
    raster::RasterSource,
    sampler::{self, RasterPatch},
    simplify::{simplify, BorderLocks},
    TilerError, C, DEFAULT_STOP_RATIO, TILE_SIZE,
};
use log::warn;
use nalgebra::Point3;
use qmesh::{remap, Header, IndexData, Tile};
use std::mem;

/// Builds individual quantized-mesh tiles.
///
/// The builder is stateless across tiles; neighbor continuity flows
/// through the two [`BorderPacket`]s threaded into [`create_tile`].
///
/// [`create_tile`]: TileBuilder::create_tile
#[derive(Clone, Debug)]
pub struct TileBuilder {
    tile_size: usize,
    stop_ratio: C,
}

impl Default for TileBuilder {
    fn default() -> TileBuilder {
        TileBuilder {
            tile_size: TILE_SIZE,
            stop_ratio: DEFAULT_STOP_RATIO,
        }
    }
}

impl TileBuilder {
    /// A builder with the stock tile size and stop ratio.
    pub fn new() -> TileBuilder {
        TileBuilder::default()
    }

    /// Overrides the simplification stop ratio (fraction of
    /// triangulation edges that survives).
    pub fn with_stop_ratio(mut self, stop_ratio: C) -> TileBuilder {
        self.stop_ratio = stop_ratio;
        self
    }

    /// Overrides the number of samples along a tile side. Mostly
    /// useful for tests; clients expect the stock size.
    pub fn with_tile_size(mut self, tile_size: usize) -> TileBuilder {
        assert!(tile_size >= 2, "a tile needs at least two samples per side");
        self.tile_size = tile_size;
        self
    }

    /// Samples along a tile side.
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Builds the tile at `coord`.
    ///
    /// `west` and `south` carry border vertices committed by the
    /// western and southern neighbors; they arrive as constraints and
    /// leave holding this tile's eastern and northern borders for the
    /// tiles built next.
    pub fn create_tile<R: RasterSource>(
        &self,
        raster: &R,
        coord: TileCoord,
        west: &mut BorderPacket,
        south: &mut BorderPacket,
    ) -> Result<Tile, TilerError> {
        let bounds = grid::tile_bounds(coord);
        let heights = raster.read_window(&bounds, self.tile_size, self.tile_size)?;
        if heights.len() != self.tile_size * self.tile_size {
            return Err(TilerError::Raster(format!(
                "window for {coord} returned {} samples, expected {}",
                heights.len(),
                self.tile_size * self.tile_size
            )));
        }
        let patch = RasterPatch {
            heights,
            width: self.tile_size,
            height: self.tile_size,
            bounds,
        };

        let west_in = mem::take(west);
        let south_in = mem::take(south);
        let samples = sampler::collect_samples(&patch, &west_in, &south_in);
        let (min_height, max_height) = (samples.min_height, samples.max_height);

        // Header geometry comes from the full sample set, not the
        // simplified mesh: culling volumes must bound the terrain,
        // not our approximation of it.
        let ecef: Vec<Point3<C>> = samples
            .geographic
            .iter()
            .map(|(c, h)| geodetic_to_ecef(c.y, c.x, *h))
            .collect();
        let center = geometry::bbox_center(&ecef);
        let sphere = geometry::min_sphere(&ecef);
        let hop = geometry::horizon_occlusion_point(&ecef, center);

        #[allow(clippy::cast_precision_loss)]
        let side = (self.tile_size - 1) as C;
        let uvh: Vec<Point3<C>> = samples
            .local
            .iter()
            .map(|p| {
                Point3::new(
                    p.x / side,
                    p.y / side,
                    remap(p.z, min_height, max_height, 0.0, 1.0),
                )
            })
            .collect();

        let triangulation = delaunay::triangulate(&uvh);
        let mut mesh = SurfaceMesh::from_triangulation(&triangulation);
        let locks = BorderLocks {
            west: !west_in.is_empty(),
            south: !south_in.is_empty(),
            east: false,
            north: false,
        };
        simplify(&mut mesh, locks, self.stop_ratio);

        let mut compact = mesh.compact();
        quantize::clamp_unit(&mut compact.positions);
        let optimized = quantize::optimize(&compact.positions, &compact.triangles);

        let borders = classify_borders(
            &compact.border_ring,
            &compact.positions,
            &optimized.remap,
            self.tile_size,
            min_height,
            max_height,
        );
        if borders.corner_count != 4 {
            // Known soft failure: the tile is still emitted, the
            // border lists may be malformed.
            warn!(
                "tile {coord}: border walk found {} corners instead of 4",
                borders.corner_count
            );
        }

        *west = borders.east_packet;
        *south = borders.north_packet;

        #[allow(clippy::cast_possible_truncation)]
        let (min_f32, max_f32) = (min_height as f32, max_height as f32);
        Ok(Tile {
            header: Header {
                center: [center.x, center.y, center.z],
                min_height: min_f32,
                max_height: max_f32,
                bounding_sphere_center: [sphere.center.x, sphere.center.y, sphere.center.z],
                bounding_sphere_radius: sphere.radius,
                horizon_occlusion_point: [hop.x, hop.y, hop.z],
            },
            vertex_data: optimized.vertex_data,
            index_data: IndexData {
                indices: optimized.indices,
            },
            edge_indices: borders.edges,
        })
    }
}
