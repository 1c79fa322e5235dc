//
// models.rs
// Atlas-Overlap
//
// Defines serializable records for per-region overlap statistics, volume summaries and lesion volume comparisons.
//

use serde::{Deserialize, Serialize};

/// Column headers of the per-region table, in output order.
pub const REGION_STAT_COLUMNS: [&str; 6] = [
    "atlas_label",
    "n_label_voxels",
    "label_volume [mm³]",
    "n_lesion_voxels",
    "lesion_volume [mm³]",
    "lesion_volume [percent]",
];

/// Lesion burden inside one atlas region. Field names double as the report headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStat {
    #[serde(rename = "atlas_label")]
    pub region_name: String,
    #[serde(rename = "n_label_voxels")]
    pub region_voxel_count: u64,
    #[serde(rename = "label_volume [mm³]")]
    pub region_volume: f64,
    #[serde(rename = "n_lesion_voxels")]
    pub lesion_voxel_count: u64,
    #[serde(rename = "lesion_volume [mm³]")]
    pub lesion_volume: f64,
    #[serde(rename = "lesion_volume [percent]")]
    pub lesion_percentage: f64,
}

/// Size and non-zero content of a single volume on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeSummary {
    pub file: String,
    pub shape: Vec<usize>,
    pub spacing: [f64; 3],
    pub voxel_volume: f64,
    pub nonzero_voxels: u64,
    pub nonzero_volume: f64,
}

/// Column headers of the warped/native comparison table.
pub const COMPARISON_COLUMNS: [&str; 5] = [
    "case",
    "non_warped_volume",
    "warped_volume",
    "volume_difference",
    "percentage_difference",
];

/// Lesion volume of one case before and after warping into template space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LesionVolumeComparison {
    pub case: String,
    pub non_warped_volume: Option<f64>,
    pub warped_volume: Option<f64>,
    pub volume_difference: Option<f64>,
    pub percentage_difference: Option<f64>,
}

/// Result of one lesion mask inside a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub lesion: String,
    pub output: Option<String>,
    pub regions_with_lesion: usize,
    pub error: Option<String>,
}
