//
// catalog.rs
// Atlas-Overlap
//
// Resolves the region id -> display name catalog for each supported atlas type.
//

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::StringRecord;
use serde::{Deserialize, Serialize};

use crate::error::OverlapError;
use crate::names::{normalize_label_name, BRAINSTEM_LABELS};

/// One atlas region: the voxel value used in the label grid and its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub region_id: i64,
    pub name: String,
}

/// Ordered, id-unique list of atlas regions. Iteration order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Builds a catalog from `(id, name)` pairs.
    ///
    /// A repeated id keeps the position of its first occurrence and the name of its last one.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        let mut entries: Vec<CatalogEntry> = Vec::new();
        let mut positions: HashMap<i64, usize> = HashMap::new();

        for (region_id, name) in pairs {
            let name = name.into();
            match positions.get(&region_id) {
                Some(&idx) => entries[idx].name = name,
                None => {
                    positions.insert(region_id, entries.len());
                    entries.push(CatalogEntry { region_id, name });
                }
            }
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    pub fn region_ids(&self) -> Vec<i64> {
        self.entries.iter().map(|e| e.region_id).collect()
    }

    pub fn name_of(&self, region_id: i64) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.region_id == region_id)
            .map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Atlas-type selector accepted by the CLI, job files and the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtlasKind {
    Brainstem,
    Tailrach,
    Neudorfer,
}

impl AtlasKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AtlasKind::Brainstem => "brainstem",
            AtlasKind::Tailrach => "tailrach",
            AtlasKind::Neudorfer => "neudorfer",
        }
    }

    /// Conventional label table file name, for the kinds that read one.
    pub fn default_catalog_file(&self) -> Option<&'static str> {
        match self {
            AtlasKind::Brainstem => None,
            AtlasKind::Tailrach => Some("tailrach_atlas_labels.csv"),
            AtlasKind::Neudorfer => Some("neudorfer_atlas_labels.csv"),
        }
    }
}

impl fmt::Display for AtlasKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AtlasKind {
    type Err = OverlapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brainstem" => Ok(AtlasKind::Brainstem),
            "tailrach" => Ok(AtlasKind::Tailrach),
            "neudorfer" => Ok(AtlasKind::Neudorfer),
            other => Err(OverlapError::UnsupportedCatalogVariant(other.to_string())),
        }
    }
}

/// Where a catalog comes from. Each variant owns the parameters its loader needs.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSource {
    /// Built-in table; position in the list is the region id.
    Enumerated(Vec<String>),
    /// CSV with `Index` and `Description` columns.
    TwoColumn(PathBuf),
    /// CSV with `Label`, `Hemisphere`, `Abbreviation` and `Name` columns.
    Composite(PathBuf),
}

impl CatalogSource {
    pub fn brainstem() -> Self {
        CatalogSource::Enumerated(BRAINSTEM_LABELS.iter().map(|s| s.to_string()).collect())
    }

    /// Source for `kind`. Tabular kinds use `table` when given, otherwise their
    /// conventional file name relative to the working directory.
    pub fn for_kind(kind: AtlasKind, table: Option<&Path>) -> Self {
        let table_path = || {
            table
                .map(Path::to_path_buf)
                .or_else(|| kind.default_catalog_file().map(PathBuf::from))
                .unwrap_or_default()
        };

        match kind {
            AtlasKind::Brainstem => CatalogSource::brainstem(),
            AtlasKind::Tailrach => CatalogSource::TwoColumn(table_path()),
            AtlasKind::Neudorfer => CatalogSource::Composite(table_path()),
        }
    }

    pub fn load(&self) -> Result<Catalog, OverlapError> {
        match self {
            CatalogSource::Enumerated(names) => Ok(load_enumerated(names)),
            CatalogSource::TwoColumn(path) => load_two_column(path),
            CatalogSource::Composite(path) => load_composite(path),
        }
    }
}

/// Loads the catalog named by a selector string, as found in job files.
pub fn load_catalog(kind: &str, table: Option<&Path>) -> Result<Catalog, OverlapError> {
    let kind: AtlasKind = kind.parse()?;
    CatalogSource::for_kind(kind, table).load()
}

fn load_enumerated(names: &[String]) -> Catalog {
    // Only this table carries wildcard-encoded names.
    Catalog::from_pairs(
        names
            .iter()
            .enumerate()
            .map(|(idx, raw)| (idx as i64, normalize_label_name(raw))),
    )
}

fn load_two_column(path: &Path) -> Result<Catalog, OverlapError> {
    let table = LabelTable::read(path)?;
    let id_col = table.column("Index")?;
    let desc_col = table.column("Description")?;

    let mut pairs = Vec::with_capacity(table.rows.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let region_id = table.parse_id(row, id_col, row_idx)?;
        pairs.push((region_id, table.cell(row, desc_col).to_string()));
    }

    Ok(Catalog::from_pairs(pairs))
}

fn load_composite(path: &Path) -> Result<Catalog, OverlapError> {
    let table = LabelTable::read(path)?;
    let id_col = table.column("Label")?;
    let hemisphere_col = table.column("Hemisphere")?;
    let abbreviation_col = table.column("Abbreviation")?;
    let name_col = table.column("Name")?;

    let mut pairs = Vec::with_capacity(table.rows.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let region_id = table.parse_id(row, id_col, row_idx)?;
        let name = format!(
            "{}_{}_{}",
            table.cell(row, hemisphere_col),
            table.cell(row, abbreviation_col),
            table.cell(row, name_col)
        );
        pairs.push((region_id, name));
    }

    Ok(Catalog::from_pairs(pairs))
}

/// Raw CSV contents with the header kept for column lookup by name.
struct LabelTable<'a> {
    path: &'a Path,
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl<'a> LabelTable<'a> {
    fn read(path: &'a Path) -> Result<Self, OverlapError> {
        let file = File::open(path).map_err(|source| OverlapError::CatalogSourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let headers = reader
            .headers()
            .map_err(|e| malformed(path, e.to_string()))?
            .clone();

        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| malformed(path, e.to_string()))?;

        Ok(Self {
            path,
            headers,
            rows,
        })
    }

    fn column(&self, name: &str) -> Result<usize, OverlapError> {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| malformed(self.path, format!("missing required column '{}'", name)))
    }

    fn cell<'r>(&self, row: &'r StringRecord, col: usize) -> &'r str {
        row.get(col).unwrap_or_default()
    }

    fn parse_id(&self, row: &StringRecord, col: usize, row_idx: usize) -> Result<i64, OverlapError> {
        let raw = self.cell(row, col).trim();
        raw.parse::<i64>().map_err(|_| {
            // Header is line 1, so data rows start at line 2.
            malformed(
                self.path,
                format!("line {}: region id '{}' is not an integer", row_idx + 2, raw),
            )
        })
    }
}

fn malformed(path: &Path, reason: String) -> OverlapError {
    OverlapError::MalformedCatalogSource {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn brainstem_catalog_has_24_consecutive_entries() {
        let catalog = CatalogSource::brainstem().load().expect("catalog");
        assert_eq!(catalog.len(), 24);
        assert_eq!(catalog.region_ids(), (0..24).collect::<Vec<i64>>());
        assert_eq!(catalog.name_of(0), Some("Not_in_Atlas"));
        assert_eq!(catalog.name_of(23), Some("STTR_Atlas"));
    }

    #[test]
    fn enumerated_names_are_normalized() {
        let source = CatalogSource::Enumerated(vec![
            "*.*.*.*.".to_string(),
            " CSTL.*".to_string(),
            "*.FPTR".to_string(),
        ]);
        let catalog = source.load().expect("catalog");
        let names: Vec<&str> = catalog.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Background", "CSTL", "FPTR"]);
    }

    #[test]
    fn two_column_descriptions_are_kept_verbatim() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("labels.csv");
        fs::write(
            &path,
            "\"Index\",\"Description\"\n0,\"Unknown/Background\"\n7,\"*.Left Cerebrum.*\"\n",
        )
        .expect("write csv");

        let catalog = CatalogSource::TwoColumn(path).load().expect("catalog");
        assert_eq!(catalog.region_ids(), vec![0, 7]);
        assert_eq!(catalog.name_of(7), Some("*.Left Cerebrum.*"));
    }

    #[test]
    fn composite_names_join_hemisphere_abbreviation_and_name() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("neudorfer.csv");
        fs::write(
            &path,
            "Label,Hemisphere,Abbreviation,Name,Extra\n12,L,STN,Subthalamic nucleus,x\n3,R,GPi,Globus pallidus internus,y\n",
        )
        .expect("write csv");

        let catalog = CatalogSource::Composite(path).load().expect("catalog");
        assert_eq!(catalog.region_ids(), vec![12, 3]);
        assert_eq!(catalog.name_of(12), Some("L_STN_Subthalamic nucleus"));
        assert_eq!(catalog.name_of(3), Some("R_GPi_Globus pallidus internus"));
    }

    #[test]
    fn duplicate_ids_keep_first_position_and_last_name() {
        let catalog = Catalog::from_pairs([(1, "a"), (2, "b"), (1, "c")]);
        assert_eq!(catalog.region_ids(), vec![1, 2]);
        assert_eq!(catalog.name_of(1), Some("c"));
    }

    #[test]
    fn missing_column_is_malformed() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("labels.csv");
        fs::write(&path, "Index,Label\n0,Unknown\n").expect("write csv");

        let err = CatalogSource::TwoColumn(path).load().unwrap_err();
        match err {
            OverlapError::MalformedCatalogSource { reason, .. } => {
                assert!(reason.contains("Description"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn composite_table_without_abbreviation_is_malformed() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("neudorfer.csv");
        fs::write(&path, "Label,Hemisphere,Name\n1,L,Subthalamic nucleus\n").expect("write csv");

        let err = CatalogSource::Composite(path).load().unwrap_err();
        match err {
            OverlapError::MalformedCatalogSource { reason, .. } => {
                assert!(reason.contains("Abbreviation"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_integer_id_is_malformed() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("labels.csv");
        fs::write(&path, "Index,Description\nzero,Unknown\n").expect("write csv");

        let err = CatalogSource::TwoColumn(path).load().unwrap_err();
        assert!(matches!(err, OverlapError::MalformedCatalogSource { .. }));
    }

    #[test]
    fn negative_ids_are_accepted_as_opaque_keys() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("labels.csv");
        fs::write(&path, "Index,Description\n-4,Odd\n100000,Far\n").expect("write csv");

        let catalog = CatalogSource::TwoColumn(path).load().expect("catalog");
        assert_eq!(catalog.region_ids(), vec![-4, 100000]);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempdir().expect("tempdir");
        let err = CatalogSource::Composite(dir.path().join("absent.csv"))
            .load()
            .unwrap_err();
        assert!(matches!(err, OverlapError::CatalogSourceUnavailable { .. }));
    }

    #[test]
    fn selector_parsing_rejects_unknown_kinds() {
        assert_eq!("tailrach".parse::<AtlasKind>().ok(), Some(AtlasKind::Tailrach));
        assert_eq!("neudorfer".parse::<AtlasKind>().ok(), Some(AtlasKind::Neudorfer));
        let err = load_catalog("smatt", None).unwrap_err();
        assert!(matches!(err, OverlapError::UnsupportedCatalogVariant(ref s) if s == "smatt"));
    }

    #[test]
    fn tabular_kinds_default_to_conventional_file_names() {
        assert_eq!(
            CatalogSource::for_kind(AtlasKind::Tailrach, None),
            CatalogSource::TwoColumn(PathBuf::from("tailrach_atlas_labels.csv"))
        );
        assert_eq!(
            CatalogSource::for_kind(AtlasKind::Neudorfer, Some(Path::new("n.csv"))),
            CatalogSource::Composite(PathBuf::from("n.csv"))
        );
    }
}
