//
// job.rs
// Atlas-Overlap
//
// Explicit run configuration: one overlap job per (lesion, atlas, atlas type, output) and JSON job lists.
//

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{load_catalog, Catalog};
use crate::models::RegionStat;
use crate::overlap;
use crate::report;
use crate::volume::{self, AtlasVolume, LesionVolume};

/// Everything needed to produce one per-region table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapJob {
    pub lesion: PathBuf,
    pub atlas: PathBuf,
    /// `brainstem`, `tailrach` or `neudorfer`.
    pub kind: String,
    /// Label table for tabular kinds; defaults to the conventional file name.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<OverlapJob>,
}

pub fn load_job_file(path: &Path) -> Result<JobFile> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read job file {:?}", path))?;
    let mut jobs: JobFile =
        serde_json::from_str(&text).with_context(|| format!("Invalid job file {:?}", path))?;

    // Relative paths in a job file are relative to the file itself.
    if let Some(base) = path.parent() {
        for job in &mut jobs.jobs {
            job.lesion = anchor(base, &job.lesion);
            job.atlas = anchor(base, &job.atlas);
            job.output = anchor(base, &job.output);
            job.catalog = job.catalog.as_ref().map(|c| anchor(base, c));
        }
    }

    Ok(jobs)
}

fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Runs one job end to end and writes its table. Nothing is written on failure.
pub fn run_job(job: &OverlapJob) -> Result<Vec<RegionStat>> {
    // Unknown atlas types fail here, before any volume is read.
    let catalog = load_catalog(&job.kind, job.catalog.as_deref())?;
    info!(lesion = ?job.lesion, atlas = ?job.atlas, kind = %job.kind, regions = catalog.len(), "Computing atlas overlap");

    let lesion = volume::load_lesion(&job.lesion)?;
    let atlas = volume::load_atlas(&job.atlas)?;
    let stats = compute_for(&lesion, &atlas, &catalog)?;

    report::write_region_stats(&job.output, &stats)?;
    info!(output = ?job.output, "Overlap table written");
    Ok(stats)
}

/// Overlap of already-loaded volumes, using the lesion's own voxel geometry.
pub fn compute_for(
    lesion: &LesionVolume,
    atlas: &AtlasVolume,
    catalog: &Catalog,
) -> Result<Vec<RegionStat>> {
    debug!(shape = ?lesion.data.shape(), voxel_volume = lesion.geometry.voxel_volume(), "Tallying labels");
    let stats = overlap::compute(
        lesion.data.view(),
        atlas.data.view(),
        catalog,
        &lesion.geometry,
    )?;
    Ok(stats)
}

/// Runs every job in order, stopping at the first failure.
pub fn run_job_file(path: &Path) -> Result<Vec<(OverlapJob, Vec<RegionStat>)>> {
    let file = load_job_file(path)?;
    info!(jobs = file.jobs.len(), "Running job file {:?}", path);

    let mut results = Vec::with_capacity(file.jobs.len());
    for job in file.jobs {
        let stats = run_job(&job).with_context(|| format!("Job for {:?} failed", job.lesion))?;
        results.push((job, stats));
    }
    Ok(results)
}
