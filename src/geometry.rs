//
// geometry.rs
// Atlas-Overlap
//
// Physical voxel size of a grid and the derived per-voxel volume.
//

use serde::{Deserialize, Serialize};

use crate::error::OverlapError;

/// Voxel spacing along the three grid axes, usually in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelGeometry {
    spacing: [f64; 3],
}

impl VoxelGeometry {
    /// Builds a geometry from exactly three positive, finite spacing values.
    pub fn new(spacing: &[f64]) -> Result<Self, OverlapError> {
        let spacing: [f64; 3] = spacing.try_into().map_err(|_| {
            OverlapError::InvalidGeometry(format!(
                "expected 3 spacing components, got {}",
                spacing.len()
            ))
        })?;

        if let Some(bad) = spacing.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(OverlapError::InvalidGeometry(format!(
                "spacing components must be positive, got {} in {:?}",
                bad, spacing
            )));
        }

        Ok(Self { spacing })
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// Product of the three spacing components.
    pub fn voxel_volume(&self) -> f64 {
        self.spacing.iter().product()
    }
}
