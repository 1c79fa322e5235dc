//
// report.rs
// Atlas-Overlap
//
// Writes overlap statistics and diagnostic rows as CSV tables and prints short console summaries.
//

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{
    LesionVolumeComparison, RegionStat, VolumeSummary, COMPARISON_COLUMNS, REGION_STAT_COLUMNS,
};

/// Writes the per-region table to `path`, header first.
pub fn write_region_stats(path: &Path, stats: &[RegionStat]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_region_stats_to(file, stats)
}

/// Header is written even when `stats` is empty.
pub fn write_region_stats_to<W: Write>(writer: W, stats: &[RegionStat]) -> Result<()> {
    write_rows_to(writer, &REGION_STAT_COLUMNS, stats)
}

pub fn write_volume_summaries(path: &Path, summaries: &[VolumeSummary]) -> Result<()> {
    let mut csv = csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;
    csv.write_record(["File", "NonZeroVoxelCount", "VoxelVolume", "NonZeroVolume"])?;
    for summary in summaries {
        csv.write_record([
            summary.file.clone(),
            summary.nonzero_voxels.to_string(),
            summary.voxel_volume.to_string(),
            summary.nonzero_volume.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_comparisons(path: &Path, rows: &[LesionVolumeComparison]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_rows_to(file, &COMPARISON_COLUMNS, rows)
}

/// Serializes `rows` under an explicit header, so empty tables keep their columns.
fn write_rows_to<W: Write, T: Serialize>(writer: W, header: &[&str], rows: &[T]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv.write_record(header)?;
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Prints the regions that received any lesion voxels, largest share first.
pub fn print_region_summary(stats: &[RegionStat]) {
    let mut hit: Vec<&RegionStat> = stats.iter().filter(|s| s.lesion_voxel_count > 0).collect();
    hit.sort_by(|a, b| b.lesion_percentage.total_cmp(&a.lesion_percentage));

    let lesion_voxels: u64 = stats.iter().map(|s| s.lesion_voxel_count).sum();
    println!(
        "{} region(s) | {} with lesion | {} lesion voxel(s) inside catalogued labels",
        stats.len(),
        hit.len(),
        lesion_voxels
    );
    for stat in hit {
        println!(
            "  {:<40} {:>8} vox  {:>10.2} mm³  {:>6.2} %",
            stat.region_name, stat.lesion_voxel_count, stat.lesion_volume, stat.lesion_percentage
        );
    }
}
