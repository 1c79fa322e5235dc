//
// storage.rs
// Atlas-Overlap
//
// Provides a safe file store for uploaded volumes and label tables with path sanitization and hashing.
//

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};

/// Upload types the store accepts; the extension is kept on the stored name.
const KNOWN_EXTENSIONS: [&str; 3] = ["nii.gz", "nii", "csv"];

#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        // Create the upload directory eagerly so subsequent saves do not fail at runtime.
        fs::create_dir_all(&root).context("Failed to create upload directory")?;
        Ok(Self { root })
    }

    pub fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<String> {
        let original_name = original_name.unwrap_or_default();
        let extension = known_extension(original_name)
            .with_context(|| format!("Unsupported upload type: {:?}", original_name))?;

        // ASCII case folding keeps byte lengths, so the extension can be cut by length.
        let without_ext = original_name[..original_name.len() - extension.len()].trim_end_matches('.');
        let stem = Path::new(without_ext)
            .file_name()
            .and_then(|n| n.to_str())
            .map(sanitize_filename)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "volume".to_string());

        // Sanitized stem plus a content hash avoids collisions and unsafe paths.
        let hash = hex::encode(Sha256::digest(bytes));
        let filename = format!("{}-{}.{}", stem, &hash[..12], extension);
        let path = self.root.join(&filename);
        fs::write(&path, bytes).context("Failed to persist uploaded file")?;
        Ok(filename)
    }

    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let candidate = self.root.join(name);
        let canonical_root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        let canonical = candidate
            .canonicalize()
            .context("Requested file not found")?;
        // Guard against path traversal by enforcing the canonical root prefix.
        if !canonical.starts_with(&canonical_root) {
            bail!("Attempt to access file outside storage root");
        }
        Ok(canonical)
    }
}

/// True for stored names that hold a NIfTI volume.
pub fn is_volume(name: &str) -> bool {
    matches!(known_extension(name), Some("nii") | Some("nii.gz"))
}

fn known_extension(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    KNOWN_EXTENSIONS
        .into_iter()
        .find(|ext| lower.ends_with(&format!(".{}", ext)))
}

fn sanitize_filename(input: &str) -> String {
    // Keep only ASCII word characters and a few safe separators to avoid filesystem surprises.
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sanitize_strips_dangerous_characters() {
        let cleaned = sanitize_filename("../weird name 123.nii");
        assert_eq!(cleaned, "weirdname123nii");
    }

    #[test]
    fn save_keeps_compound_extensions() {
        let root = tempdir().expect("tmpdir");
        let store = FileStore::new(root.path()).expect("store");

        let volume = store.save(Some("sub 01_lesion.nii.gz"), b"abc").expect("save");
        assert!(volume.starts_with("sub01_lesion-"));
        assert!(volume.ends_with(".nii.gz"));
        assert!(is_volume(&volume));

        let table = store.save(Some("labels.CSV"), b"Index,Description\n").expect("save");
        assert!(table.starts_with("labels-"));
        assert!(!is_volume(&table));

        assert!(store.save(Some("notes.txt"), b"x").is_err());
    }

    #[test]
    fn resolve_rejects_paths_outside_root() {
        let root = tempdir().expect("tmpdir");
        let store_root = root.path().join("safe-area");
        fs::create_dir_all(&store_root).expect("create nested root");
        let store = FileStore::new(&store_root).expect("store");

        let outside = root.path().join("escape.nii");
        fs::write(&outside, b"attack").expect("write outside file");

        assert!(store.resolve("../escape.nii").is_err());

        let legit = store.save(Some("../../lesion.nii"), b"abc").expect("save");
        let resolved = store.resolve(&legit).expect("resolve legit");
        let canonical_root = store_root.canonicalize().expect("canonical root");
        assert!(resolved.starts_with(&canonical_root));
    }
}
