//! Elevation raster access.
//!
//! The pipeline only ever asks a raster for two things: its overall
//! geographic bounds and a resampled window of heights for one tile.
//! Keeping that behind a trait lets tests run on synthetic surfaces
//! and keeps GDAL an optional dependency.

use crate::{Bounds, C, TilerError};

/// A source of elevation windows in geographic WGS84.
pub trait RasterSource {
    /// Geographic bounds of the dataset, degrees.
    fn bounds(&self) -> Result<Bounds, TilerError>;

    /// Reads a `width` x `height` grid of heights covering `bounds`,
    /// resampled as needed. Row 0 is the northern edge (raster
    /// convention); heights are meters.
    fn read_window(
        &self,
        bounds: &Bounds,
        width: usize,
        height: usize,
    ) -> Result<Vec<f32>, TilerError>;
}

impl<F> RasterSource for (Bounds, F)
where
    F: Fn(C, C) -> f32,
{
    /// A `(bounds, fn(lon, lat) -> height)` pair is a raster. Mostly
    /// useful for tests and synthetic terrain.
    fn bounds(&self) -> Result<Bounds, TilerError> {
        Ok(self.0)
    }

    #[allow(clippy::cast_precision_loss)]
    fn read_window(
        &self,
        bounds: &Bounds,
        width: usize,
        height: usize,
    ) -> Result<Vec<f32>, TilerError> {
        let mut heights = Vec::with_capacity(width * height);
        for j in 0..height {
            let lat = bounds.max().y
                - (bounds.max().y - bounds.min().y) * j as C / (height - 1) as C;
            for i in 0..width {
                let lon = bounds.min().x
                    + (bounds.max().x - bounds.min().x) * i as C / (width - 1) as C;
                heights.push((self.1)(lon, lat));
            }
        }
        Ok(heights)
    }
}

#[cfg(feature = "gdal")]
pub use self::gdal_source::GdalRaster;

#[cfg(feature = "gdal")]
mod gdal_source {
    use super::RasterSource;
    use crate::{Bounds, C, TilerError};
    use gdal::{raster::ResampleAlg, Dataset};
    use geo::Coord;
    use std::path::{Path, PathBuf};

    /// Adapter over a GDAL-readable elevation dataset.
    ///
    /// The dataset must carry a geographic WGS84 spatial reference;
    /// anything else is rejected at open time. Band 1 is assumed to
    /// hold heights in meters.
    pub struct GdalRaster {
        dataset: Dataset,
        transform: [C; 6],
        path: PathBuf,
    }

    impl GdalRaster {
        /// Opens the dataset at `path` and validates its projection.
        pub fn open<P: AsRef<Path>>(path: P) -> Result<GdalRaster, TilerError> {
            let path = path.as_ref().to_path_buf();
            let dataset = Dataset::open(&path)?;

            let spatial_ref = dataset.spatial_ref()?;
            if !spatial_ref.is_geographic() {
                return Err(TilerError::Projection {
                    path,
                    detail: "projected spatial reference".to_string(),
                });
            }
            if let Ok(code) = spatial_ref.auth_code() {
                if code != 4326 {
                    return Err(TilerError::Projection {
                        path,
                        detail: format!("EPSG:{code}"),
                    });
                }
            }

            let transform = dataset.geo_transform()?;
            if transform[2] != 0.0 || transform[4] != 0.0 {
                return Err(TilerError::Projection {
                    path,
                    detail: "rotated geotransform".to_string(),
                });
            }

            Ok(GdalRaster {
                dataset,
                transform,
                path,
            })
        }

        /// Fractional pixel column/row of a geographic point.
        fn to_pixel(&self, lon: C, lat: C) -> (C, C) {
            (
                (lon - self.transform[0]) / self.transform[1],
                (lat - self.transform[3]) / self.transform[5],
            )
        }
    }

    impl RasterSource for GdalRaster {
        #[allow(clippy::cast_precision_loss)]
        fn bounds(&self) -> Result<Bounds, TilerError> {
            let (width, height) = self.dataset.raster_size();
            let west = self.transform[0];
            let north = self.transform[3];
            let east = west + self.transform[1] * width as C;
            let south = north + self.transform[5] * height as C;
            Ok(Bounds::new(
                Coord { x: west, y: south },
                Coord { x: east, y: north },
            ))
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        fn read_window(
            &self,
            bounds: &Bounds,
            width: usize,
            height: usize,
        ) -> Result<Vec<f32>, TilerError> {
            let (raster_width, raster_height) = self.dataset.raster_size();
            let (left, top) = self.to_pixel(bounds.min().x, bounds.max().y);
            let (right, bottom) = self.to_pixel(bounds.max().x, bounds.min().y);

            // Clamp to the dataset; tiles on the dataset perimeter
            // read a slightly smaller window stretched to the grid.
            let x0 = (left.floor().max(0.0)) as isize;
            let y0 = (top.floor().max(0.0)) as isize;
            let x1 = (right.ceil().min(raster_width as C)) as isize;
            let y1 = (bottom.ceil().min(raster_height as C)) as isize;

            if x1 <= x0 || y1 <= y0 {
                return Err(TilerError::Raster(format!(
                    "window for {bounds:?} lies outside {}",
                    self.path.display()
                )));
            }

            let mut heights = vec![0f32; width * height];
            self.dataset
                .rasterband(1)?
                .read_into_slice(
                    (x0, y0),
                    ((x1 - x0) as usize, (y1 - y0) as usize),
                    (width, height),
                    &mut heights,
                    Some(ResampleAlg::Lanczos),
                )
                .map_err(|err| TilerError::Raster(err.to_string()))?;
            Ok(heights)
        }
    }
}
