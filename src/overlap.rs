//
// overlap.rs
// Atlas-Overlap
//
// Label-wise lesion overlap: region footprint and lesion-within-region counts, volumes and percentages.
//

use std::collections::HashMap;

use ndarray::{ArrayView3, Zip};
use rayon::prelude::*;

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::OverlapError;
use crate::geometry::VoxelGeometry;
use crate::models::RegionStat;

/// Footprint and lesion voxel counts of a single label value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
    pub region_voxels: u64,
    pub lesion_voxels: u64,
}

/// Computes one [`RegionStat`] per catalog entry, in catalog order.
///
/// The grids are scanned once; label values absent from the catalog are
/// counted but never reported.
pub fn compute(
    lesion: ArrayView3<'_, u8>,
    labels: ArrayView3<'_, i64>,
    catalog: &Catalog,
    geometry: &VoxelGeometry,
) -> Result<Vec<RegionStat>, OverlapError> {
    ensure_same_shape(&lesion, &labels)?;

    let tally = tally_labels(lesion, labels);
    let voxel_volume = geometry.voxel_volume();

    Ok(catalog
        .iter()
        .map(|entry| {
            let counts = tally.get(&entry.region_id).copied().unwrap_or_default();
            region_stat(entry, counts, voxel_volume)
        })
        .collect())
}

/// Same result as [`compute`], built by masking the label grid once per region.
///
/// Regions are processed in parallel and collected back in catalog order.
pub fn compute_masked(
    lesion: ArrayView3<'_, u8>,
    labels: ArrayView3<'_, i64>,
    catalog: &Catalog,
    geometry: &VoxelGeometry,
) -> Result<Vec<RegionStat>, OverlapError> {
    ensure_same_shape(&lesion, &labels)?;

    let voxel_volume = geometry.voxel_volume();

    Ok(catalog
        .entries()
        .par_iter()
        .map(|entry| {
            let counts = count_region(lesion, labels, entry.region_id);
            region_stat(entry, counts, voxel_volume)
        })
        .collect())
}

/// Region and lesion voxel counts for every label value present in `labels`.
pub fn tally_labels(
    lesion: ArrayView3<'_, u8>,
    labels: ArrayView3<'_, i64>,
) -> HashMap<i64, LabelCounts> {
    let mut tally: HashMap<i64, LabelCounts> = HashMap::new();

    Zip::from(&lesion).and(&labels).for_each(|&lesion_value, &label| {
        let counts = tally.entry(label).or_default();
        counts.region_voxels += 1;
        if lesion_value != 0 {
            counts.lesion_voxels += 1;
        }
    });

    tally
}

fn count_region(lesion: ArrayView3<'_, u8>, labels: ArrayView3<'_, i64>, region_id: i64) -> LabelCounts {
    let mut counts = LabelCounts::default();

    Zip::from(&lesion).and(&labels).for_each(|&lesion_value, &label| {
        let in_region = u64::from(label == region_id);
        counts.region_voxels += in_region;
        counts.lesion_voxels += in_region * u64::from(lesion_value != 0);
    });

    counts
}

fn region_stat(entry: &CatalogEntry, counts: LabelCounts, voxel_volume: f64) -> RegionStat {
    let region_volume = counts.region_voxels as f64 * voxel_volume;
    let lesion_volume = counts.lesion_voxels as f64 * voxel_volume;

    // Labels missing from this grid (e.g. a single-hemisphere crop) report 0%.
    let lesion_percentage = if region_volume > 0.0 {
        100.0 * lesion_volume / region_volume
    } else {
        0.0
    };

    RegionStat {
        region_name: entry.name.clone(),
        region_voxel_count: counts.region_voxels,
        region_volume,
        lesion_voxel_count: counts.lesion_voxels,
        lesion_volume,
        lesion_percentage,
    }
}

fn ensure_same_shape(
    lesion: &ArrayView3<'_, u8>,
    labels: &ArrayView3<'_, i64>,
) -> Result<(), OverlapError> {
    let (lesion_dim, label_dim) = (lesion.dim(), labels.dim());
    if lesion_dim != label_dim {
        return Err(OverlapError::ShapeMismatch {
            lesion: [lesion_dim.0, lesion_dim.1, lesion_dim.2],
            atlas: [label_dim.0, label_dim.1, label_dim.2],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSource;
    use ndarray::{s, Array3};

    fn unit_geometry() -> VoxelGeometry {
        VoxelGeometry::new(&[1.0, 1.0, 1.0]).expect("geometry")
    }

    /// 4x4x4 grid split into labels 0 (x < 2) and 1 (x >= 2); lesion covers x == 3.
    fn split_fixture() -> (Array3<u8>, Array3<i64>) {
        let mut labels = Array3::<i64>::zeros((4, 4, 4));
        labels.slice_mut(s![2.., .., ..]).fill(1);
        let mut lesion = Array3::<u8>::zeros((4, 4, 4));
        lesion.slice_mut(s![3, .., ..]).fill(1);
        (lesion, labels)
    }

    #[test]
    fn one_record_per_entry_in_catalog_order() {
        let (lesion, labels) = split_fixture();
        let catalog = Catalog::from_pairs([(9, "absent"), (1, "right"), (0, "left")]);

        let stats = compute(lesion.view(), labels.view(), &catalog, &unit_geometry()).expect("stats");
        let names: Vec<&str> = stats.iter().map(|s| s.region_name.as_str()).collect();
        assert_eq!(names, ["absent", "right", "left"]);

        assert_eq!(stats[1].region_voxel_count, 32);
        assert_eq!(stats[1].lesion_voxel_count, 16);
        assert!((stats[1].lesion_percentage - 50.0).abs() < 1e-9);
        assert_eq!(stats[2].lesion_voxel_count, 0);
    }

    #[test]
    fn absent_regions_report_zero_percent() {
        let (lesion, labels) = split_fixture();
        let catalog = Catalog::from_pairs([(42, "missing")]);

        let stats = compute(lesion.view(), labels.view(), &catalog, &unit_geometry()).expect("stats");
        assert_eq!(stats[0].region_voxel_count, 0);
        assert_eq!(stats[0].lesion_voxel_count, 0);
        assert_eq!(stats[0].region_volume, 0.0);
        assert_eq!(stats[0].lesion_percentage, 0.0);
    }

    #[test]
    fn volumes_scale_with_voxel_size() {
        let (lesion, labels) = split_fixture();
        let catalog = Catalog::from_pairs([(1, "right")]);
        let geometry = VoxelGeometry::new(&[0.5, 0.5, 0.5]).expect("geometry");

        let stats = compute(lesion.view(), labels.view(), &catalog, &geometry).expect("stats");
        assert!((stats[0].region_volume - 4.0).abs() < 1e-12);
        assert!((stats[0].lesion_volume - 2.0).abs() < 1e-12);
        assert!((stats[0].lesion_percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn lesion_values_are_treated_as_nonzero_indicators() {
        let labels = Array3::<i64>::from_elem((2, 2, 2), 3);
        let mut lesion = Array3::<u8>::zeros((2, 2, 2));
        lesion[[0, 0, 0]] = 7;
        lesion[[1, 1, 1]] = 255;
        let catalog = Catalog::from_pairs([(3, "all")]);

        let stats = compute(lesion.view(), labels.view(), &catalog, &unit_geometry()).expect("stats");
        assert_eq!(stats[0].lesion_voxel_count, 2);
        assert!((stats[0].lesion_percentage - 25.0).abs() < 1e-9);
    }

    #[test]
    fn uniform_atlas_fills_only_its_brainstem_region() {
        let labels = Array3::<i64>::from_elem((3, 4, 5), 5);
        let lesion = Array3::<u8>::zeros((3, 4, 5));
        let catalog = CatalogSource::brainstem().load().expect("catalog");

        let stats = compute(lesion.view(), labels.view(), &catalog, &unit_geometry()).expect("stats");
        assert_eq!(stats.len(), 24);
        for (id, stat) in stats.iter().enumerate() {
            if id == 5 {
                assert_eq!(stat.region_name, "ICPMCL_Atlas");
                assert_eq!(stat.region_voxel_count, 60);
            } else {
                assert_eq!(stat.region_voxel_count, 0);
                assert_eq!(stat.lesion_percentage, 0.0);
            }
        }
    }

    #[test]
    fn lesion_sum_excludes_labels_outside_catalog() {
        let mut labels = Array3::<i64>::zeros((2, 2, 2));
        labels[[0, 0, 0]] = 1;
        labels[[0, 0, 1]] = 2;
        labels[[0, 1, 0]] = 99;
        let lesion = Array3::<u8>::ones((2, 2, 2));
        let catalog = Catalog::from_pairs([(0, "bg"), (1, "a"), (2, "b")]);

        let stats = compute(lesion.view(), labels.view(), &catalog, &unit_geometry()).expect("stats");
        let total: u64 = stats.iter().map(|s| s.lesion_voxel_count).sum();
        assert_eq!(total, 7);
    }

    #[test]
    fn shape_mismatch_fails_before_any_record() {
        let lesion = Array3::<u8>::zeros((2, 2, 2));
        let labels = Array3::<i64>::zeros((2, 2, 3));
        let catalog = Catalog::from_pairs([(0, "bg")]);

        for result in [
            compute(lesion.view(), labels.view(), &catalog, &unit_geometry()),
            compute_masked(lesion.view(), labels.view(), &catalog, &unit_geometry()),
        ] {
            match result {
                Err(OverlapError::ShapeMismatch { lesion, atlas }) => {
                    assert_eq!(lesion, [2, 2, 2]);
                    assert_eq!(atlas, [2, 2, 3]);
                }
                other => panic!("expected shape mismatch, got {other:?}"),
            }
        }
    }

    #[test]
    fn masked_and_tallied_paths_agree() {
        let labels = Array3::from_shape_fn((5, 6, 7), |(x, y, z)| ((x * 7 + y * 3 + z) % 6) as i64);
        let lesion = Array3::from_shape_fn((5, 6, 7), |(x, y, z)| u8::from((x + y + z) % 4 == 0));
        let catalog = Catalog::from_pairs((0..8).map(|id| (id, format!("region {id}"))));
        let geometry = VoxelGeometry::new(&[0.5, 1.0, 2.0]).expect("geometry");

        let tallied = compute(lesion.view(), labels.view(), &catalog, &geometry).expect("tallied");
        let masked = compute_masked(lesion.view(), labels.view(), &catalog, &geometry).expect("masked");
        assert_eq!(tallied, masked);

        for stat in &tallied {
            if stat.region_volume > 0.0 {
                assert!((0.0..=100.0).contains(&stat.lesion_percentage));
            } else {
                assert_eq!(stat.lesion_voxel_count, 0);
            }
        }
    }
}
