use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::{LesionVolumeComparison, VolumeSummary};
use crate::volume;

const NIFTI_GZ: &str = ".nii.gz";
const WARPED_SUFFIX: &str = "_warped.nii.gz";

/// Non-zero voxel count of each file, e.g. a mask before and after warping.
pub fn count_nonzero(files: &[PathBuf]) -> Result<Vec<VolumeSummary>> {
    files.iter().map(|path| volume::summarize(path)).collect()
}

/// Pairs `<case>.nii.gz` with `<case>_warped.nii.gz` in `dir` and compares lesion volumes.
///
/// Files that fail to load are reported with an empty volume instead of aborting the run.
pub fn compare_directory(dir: &Path) -> Result<Vec<LesionVolumeComparison>> {
    let mut groups: BTreeMap<String, (Option<PathBuf>, Option<PathBuf>)> = BTreeMap::new();

    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        if let Some(case) = name.strip_suffix(WARPED_SUFFIX) {
            groups.entry(case.to_string()).or_default().1 = Some(path);
        } else if let Some(case) = name.strip_suffix(NIFTI_GZ) {
            groups.entry(case.to_string()).or_default().0 = Some(path);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(case, (non_warped, warped))| {
            compare_volumes(case, lesion_volume(non_warped), lesion_volume(warped))
        })
        .collect())
}

fn lesion_volume(path: Option<PathBuf>) -> Option<f64> {
    let path = path?;
    match volume::summarize(&path) {
        Ok(summary) => Some(summary.nonzero_volume),
        Err(e) => {
            warn!("Error processing {:?}: {:#}", path, e);
            None
        }
    }
}

/// Difference is warped minus non-warped; the percentage is relative to the non-warped volume.
pub fn compare_volumes(
    case: String,
    non_warped_volume: Option<f64>,
    warped_volume: Option<f64>,
) -> LesionVolumeComparison {
    let volume_difference = match (non_warped_volume, warped_volume) {
        (Some(before), Some(after)) => Some(after - before),
        _ => None,
    };
    let percentage_difference = match (volume_difference, non_warped_volume) {
        (Some(diff), Some(before)) if before != 0.0 => Some(diff / before * 100.0),
        _ => None,
    };

    LesionVolumeComparison {
        case,
        non_warped_volume,
        warped_volume,
        volume_difference,
        percentage_difference,
    }
}
