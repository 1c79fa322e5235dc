//
// error.rs
// Atlas-Overlap
//
// Typed failures raised by the overlap core: catalog resolution, voxel geometry and grid checks.
//

use std::path::PathBuf;

use thiserror::Error;

/// Every fatal condition the core can report. Nothing here is retried.
#[derive(Debug, Error)]
pub enum OverlapError {
    #[error("unsupported atlas type '{0}' (expected brainstem, tailrach or neudorfer)")]
    UnsupportedCatalogVariant(String),

    #[error("malformed catalog {path:?}: {reason}")]
    MalformedCatalogSource { path: PathBuf, reason: String },

    #[error("catalog {path:?} could not be read")]
    CatalogSourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lesion grid {lesion:?} and atlas grid {atlas:?} differ in shape")]
    ShapeMismatch {
        lesion: [usize; 3],
        atlas: [usize; 3],
    },

    #[error("invalid voxel geometry: {0}")]
    InvalidGeometry(String),
}

impl OverlapError {
    /// True for errors caused by caller input rather than the environment.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, OverlapError::CatalogSourceUnavailable { .. })
    }
}
