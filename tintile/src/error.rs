use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors surfaced by tile construction and the pyramid driver.
#[derive(Debug, Error)]
#[allow(clippy::module_name_repetitions)]
pub enum TilerError {
    /// A raster window read failed or produced unexpected dimensions.
    /// The affected tile is skipped; the pyramid continues.
    #[error("raster read: {0}")]
    Raster(String),

    /// The dataset's spatial reference is not geographic WGS84. Fatal
    /// before any tile is built.
    #[error("dataset {path:?} is not geographic WGS84: {detail}")]
    Projection {
        /// Offending dataset.
        path: PathBuf,
        /// What the spatial reference actually was.
        detail: String,
    },

    /// Tile serialization failed.
    #[error(transparent)]
    Encode(#[from] qmesh::QmeshError),

    /// Filesystem error while writing the pyramid.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Error reported by the GDAL adapter.
    #[cfg(feature = "gdal")]
    #[error(transparent)]
    Gdal(#[from] gdal::errors::GdalError),
}
