//! The pyramid driver: sequences tile construction within each zoom
//! so committed borders flow west-to-east and south-to-north.

use crate::{
    border::BorderPacket,
    builder::TileBuilder,
    grid::{self, TileCoord},
    raster::RasterSource,
    TilerError,
};
use log::{error, info};
use std::{fs, path::Path};

/// Per-zoom border cache.
///
/// `prev_west` holds the eastern border of the tile just built;
/// `prev_south[column]` holds the northern border of the tile built
/// in the previous row at that column. Together they make every
/// interior border a hard constraint for exactly one later tile.
struct ZoomState {
    prev_west: BorderPacket,
    prev_south: Vec<BorderPacket>,
}

impl ZoomState {
    fn new(columns: usize) -> ZoomState {
        ZoomState {
            prev_west: BorderPacket::new(),
            prev_south: vec![BorderPacket::new(); columns],
        }
    }
}

/// Tally of one pyramid run.
#[derive(Clone, Copy, Debug, Default)]
pub struct PyramidStats {
    /// Tiles written.
    pub built: usize,
    /// Tiles skipped after a per-tile failure.
    pub skipped: usize,
}

/// Drives tile construction over a zoom range, writing
/// `{out_dir}/{zoom}/{x}/{y}.terrain` files.
pub struct PyramidBuilder<R> {
    raster: R,
    builder: TileBuilder,
    inherit_borders: bool,
}

impl<R: RasterSource> PyramidBuilder<R> {
    /// A driver over `raster` with stock tile settings.
    pub fn new(raster: R) -> PyramidBuilder<R> {
        PyramidBuilder {
            raster,
            builder: TileBuilder::new(),
            inherit_borders: true,
        }
    }

    /// Replaces the per-tile builder (stop ratio, tile size).
    pub fn with_builder(mut self, builder: TileBuilder) -> PyramidBuilder<R> {
        self.builder = builder;
        self
    }

    /// Disables border inheritance; every tile is built independently
    /// and neighbors may disagree along shared edges.
    pub fn without_border_inheritance(mut self) -> PyramidBuilder<R> {
        self.inherit_borders = false;
        self
    }

    /// Builds every zoom from `end_zoom` (coarsest) up through
    /// `start_zoom` (finest), row-major within each zoom.
    ///
    /// Tiles whose construction fails are reported and skipped; their
    /// would-be neighbors fall back to unconstrained borders.
    pub fn build(
        &self,
        start_zoom: u8,
        end_zoom: u8,
        out_dir: &Path,
    ) -> Result<PyramidStats, TilerError> {
        let bounds = self.raster.bounds()?;
        let mut stats = PyramidStats::default();

        for zoom in end_zoom..=start_zoom {
            let (lower_left, upper_right) = grid::tile_range(&bounds, zoom);
            let columns = (upper_right.x - lower_left.x + 1) as usize;
            let mut state = ZoomState::new(columns);

            for ty in lower_left.y..=upper_right.y {
                for tx in lower_left.x..=upper_right.x {
                    let coord = TileCoord::new(zoom, tx, ty);
                    let column = (tx - lower_left.x) as usize;
                    self.build_one(coord, column, &mut state, out_dir, &mut stats);
                }
                // The next row's leftmost tile has no committed
                // western neighbor.
                state.prev_west.clear();
            }
        }

        info!(
            "pyramid complete: {} tiles written, {} skipped",
            stats.built, stats.skipped
        );
        Ok(stats)
    }

    fn build_one(
        &self,
        coord: TileCoord,
        column: usize,
        state: &mut ZoomState,
        out_dir: &Path,
        stats: &mut PyramidStats,
    ) {
        info!("building tile {coord}");
        if !self.inherit_borders {
            state.prev_west.clear();
            state.prev_south[column].clear();
        }

        let built = self.builder.create_tile(
            &self.raster,
            coord,
            &mut state.prev_west,
            &mut state.prev_south[column],
        );
        let tile = match built {
            Ok(tile) => tile,
            Err(err) => {
                error!("tile {coord} skipped: {err}");
                // A failed tile commits no borders.
                state.prev_west.clear();
                state.prev_south[column].clear();
                stats.skipped += 1;
                return;
            }
        };

        match self.write_tile(&tile, coord, out_dir) {
            Ok(()) => stats.built += 1,
            Err(err) => {
                error!("tile {coord} not written: {err}");
                stats.skipped += 1;
            }
        }
    }

    fn write_tile(
        &self,
        tile: &qmesh::Tile,
        coord: TileCoord,
        out_dir: &Path,
    ) -> Result<(), TilerError> {
        let dir = out_dir
            .join(coord.zoom.to_string())
            .join(coord.x.to_string());
        fs::create_dir_all(&dir)?;
        tile.write_file(dir.join(format!("{}.terrain", coord.y)))?;
        Ok(())
    }
}
