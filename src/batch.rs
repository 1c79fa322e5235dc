use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::catalog::{AtlasKind, CatalogSource};
use crate::models::BatchOutcome;
use crate::{job, report, volume};

/// Shared inputs of a batch: one atlas and catalog applied to many lesion masks.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub directory: PathBuf,
    /// Lesion masks are the files whose name ends with this suffix.
    pub pattern: String,
    pub atlas: PathBuf,
    pub kind: AtlasKind,
    pub catalog: Option<PathBuf>,
    pub output_dir: PathBuf,
}

pub fn process_directory(request: &BatchRequest) -> Result<Vec<BatchOutcome>> {
    info!(directory = ?request.directory, kind = %request.kind, "Processing lesion directory");

    // Catalog and atlas failures are fatal for the whole batch.
    let catalog = CatalogSource::for_kind(request.kind, request.catalog.as_deref()).load()?;
    let atlas = volume::load_atlas(&request.atlas)?;
    fs::create_dir_all(&request.output_dir)
        .with_context(|| format!("Failed to create {:?}", request.output_dir))?;

    let files = find_lesions(&request.directory, &request.pattern);
    info!("Found {} lesion mask(s).", files.len());

    let outcomes: Vec<BatchOutcome> = files
        .par_iter()
        .map(|path| {
            let output = output_path(request, path);
            let result = volume::load_lesion(path)
                .and_then(|lesion| job::compute_for(&lesion, &atlas, &catalog))
                .and_then(|stats| {
                    report::write_region_stats(&output, &stats)?;
                    Ok(stats)
                });

            match result {
                Ok(stats) => {
                    info!("Processed {:?}", path.file_name().unwrap_or_default());
                    BatchOutcome {
                        lesion: path.display().to_string(),
                        output: Some(output.display().to_string()),
                        regions_with_lesion: stats.iter().filter(|s| s.lesion_voxel_count > 0).count(),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("Failed on {:?}: {:#}", path, e);
                    BatchOutcome {
                        lesion: path.display().to_string(),
                        output: None,
                        regions_with_lesion: 0,
                        error: Some(format!("{:#}", e)),
                    }
                }
            }
        })
        .collect();

    Ok(outcomes)
}

/// Matching files under `dir`, recursively, in sorted order.
pub fn find_lesions(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().ends_with(pattern))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Output table for `lesion`; folders below the batch root become name prefixes.
fn output_path(request: &BatchRequest, lesion: &Path) -> PathBuf {
    let name = lesion.file_name().unwrap_or_default().to_string_lossy();
    let stem = name
        .strip_suffix(request.pattern.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(&name[..])
        .trim_end_matches(['_', '.', '-']);

    let mut parts: Vec<String> = lesion
        .parent()
        .and_then(|parent| parent.strip_prefix(&request.directory).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    parts.push(stem.to_string());

    request
        .output_dir
        .join(format!("{}_regions_in_{}.csv", parts.join("_"), request.kind))
}
