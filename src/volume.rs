//
// volume.rs
// Atlas-Overlap
//
// Loads NIfTI lesion masks and atlas label maps into dense 3D grids and summarizes their non-zero content.
//

use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::{Array3, ArrayD, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::OverlapError;
use crate::geometry::VoxelGeometry;
use crate::models::VolumeSummary;

/// Lesion indicator grid plus the voxel geometry of its native header.
#[derive(Debug, Clone)]
pub struct LesionVolume {
    pub data: Array3<u8>,
    pub geometry: VoxelGeometry,
}

/// Integer label grid of an atlas resampled into the lesion's space.
#[derive(Debug, Clone)]
pub struct AtlasVolume {
    pub data: Array3<i64>,
}

/// Reads a lesion mask. Stored values are truncated into `u8`.
pub fn load_lesion(path: &Path) -> Result<LesionVolume> {
    let (header, data) = read_volume(path)?;
    let geometry = geometry_from_header(&header)
        .with_context(|| format!("Lesion mask {:?} has unusable voxel sizes", path))?;

    Ok(LesionVolume {
        data: data.mapv(|v| v as u8),
        geometry,
    })
}

/// Reads an atlas label map. Stored values are rounded to the nearest integer id.
pub fn load_atlas(path: &Path) -> Result<AtlasVolume> {
    let (_, data) = read_volume(path)?;
    Ok(AtlasVolume {
        data: data.mapv(|v| v.round() as i64),
    })
}

/// Voxel geometry from `pixdim[1..=3]`.
pub fn geometry_from_header(header: &NiftiHeader) -> Result<VoxelGeometry, OverlapError> {
    let spacing: Vec<f64> = header.pixdim[1..4].iter().map(|&v| f64::from(v)).collect();
    VoxelGeometry::new(&spacing)
}

/// Opens a `.nii` / `.nii.gz` file and returns its header and first 3D volume.
pub fn read_volume(path: &Path) -> Result<(NiftiHeader, Array3<f32>)> {
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to open NIfTI file {:?}", path))?;
    let header = obj.header().clone();

    let data: ArrayD<f32> = obj
        .into_volume()
        .into_ndarray::<f32>()
        .with_context(|| format!("Failed to decode voxel data of {:?}", path))?;

    Ok((header, first_volume(data, path)?))
}

fn first_volume(mut data: ArrayD<f32>, path: &Path) -> Result<Array3<f32>> {
    if data.ndim() < 3 {
        bail!("{:?} is {}D, expected a 3D volume", path, data.ndim());
    }

    // Time series and other trailing axes: keep the first 3D frame.
    while data.ndim() > 3 {
        let last = data.ndim() - 1;
        data = data.index_axis_move(Axis(last), 0);
    }

    Ok(data.into_dimensionality::<Ix3>()?)
}

/// Non-zero voxel count and volume of a file, using its own header spacing.
pub fn summarize(path: &Path) -> Result<VolumeSummary> {
    let (header, data) = read_volume(path)?;
    let geometry = geometry_from_header(&header)
        .with_context(|| format!("{:?} has unusable voxel sizes", path))?;

    let nonzero_voxels = data.iter().filter(|&&v| v != 0.0).count() as u64;
    let voxel_volume = geometry.voxel_volume();

    Ok(VolumeSummary {
        file: path.display().to_string(),
        shape: data.shape().to_vec(),
        spacing: geometry.spacing(),
        voxel_volume,
        nonzero_voxels,
        nonzero_volume: nonzero_voxels as f64 * voxel_volume,
    })
}
