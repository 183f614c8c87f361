// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Metadata file lookup inside a downloaded ABC atlas cache
//!
//! ```text
//! <download_base>/
//!   └── metadata/
//!       └── MERFISH-C57BL6J-638850-CCF/
//!           ├── 20230830/
//!           └── 20231215/
//!               └── views/
//!                   └── cell_metadata_with_parcellation_annotation.csv
//! ```
//!
//! The greatest version directory wins. Nothing is downloaded here.

use std::fs;
use std::path::{Path, PathBuf};

use cerebrum_census::SourceError;
use tracing::{debug, warn};

/// Directory levels searched below a version directory
const MAX_SEARCH_DEPTH: usize = 3;

/// Locator for one metadata table of one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataCache {
    download_base: PathBuf,
    dataset: String,
    metadata_key: String,
}

impl MetadataCache {
    pub fn new(
        download_base: impl Into<PathBuf>,
        dataset: impl Into<String>,
        metadata_key: impl Into<String>,
    ) -> Self {
        Self {
            download_base: download_base.into(),
            dataset: dataset.into(),
            metadata_key: metadata_key.into(),
        }
    }

    pub fn download_base(&self) -> &Path {
        &self.download_base
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn metadata_key(&self) -> &str {
        &self.metadata_key
    }

    /// `<download_base>/metadata/<dataset>`
    pub fn dataset_dir(&self) -> PathBuf {
        self.download_base.join("metadata").join(&self.dataset)
    }

    /// Greatest version directory name, `None` if the dataset is not cached
    pub fn latest_version(&self) -> Result<Option<String>, SourceError> {
        let dataset_dir = self.dataset_dir();
        if !dataset_dir.is_dir() {
            return Ok(None);
        }
        let mut versions = sorted_entries(&dataset_dir)?
            .into_iter()
            .filter(|path| path.is_dir())
            .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
            .collect::<Vec<_>>();
        versions.sort();
        Ok(versions.pop())
    }

    /// Path of `<metadata_key>.csv` in the latest version
    ///
    /// `Ok(None)` when the dataset, a version, or the file is missing.
    pub fn metadata_path(&self) -> Result<Option<PathBuf>, SourceError> {
        let Some(version) = self.latest_version()? else {
            warn!(
                target: "cerebrum-io",
                "Dataset {} not found under {}",
                self.dataset,
                self.download_base.display()
            );
            return Ok(None);
        };

        let version_dir = self.dataset_dir().join(&version);
        let file_name = format!("{}.csv", self.metadata_key);
        let found = find_file(&version_dir, &file_name, MAX_SEARCH_DEPTH)?;
        match &found {
            Some(path) => debug!(target: "cerebrum-io", "Resolved metadata {}", path.display()),
            None => warn!(
                target: "cerebrum-io",
                "Metadata {} not found in {}",
                file_name,
                version_dir.display()
            ),
        }
        Ok(found)
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let io_err = |source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        entries.push(entry.map_err(io_err)?.path());
    }
    entries.sort();
    Ok(entries)
}

/// Breadth-first: a file nearer to `dir` wins, ties go to the smaller path
fn find_file(dir: &Path, file_name: &str, max_depth: usize) -> Result<Option<PathBuf>, SourceError> {
    let mut level = vec![dir.to_path_buf()];
    for _ in 0..=max_depth {
        let mut next = Vec::new();
        for current in &level {
            let candidate = current.join(file_name);
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
            next.extend(sorted_entries(current)?.into_iter().filter(|p| p.is_dir()));
        }
        if next.is_empty() {
            break;
        }
        level = next;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DATASET: &str = "MERFISH-C57BL6J-638850-CCF";
    const KEY: &str = "cell_metadata_with_parcellation_annotation";

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class,subclass\n").unwrap();
    }

    #[test]
    fn test_latest_version_wins() {
        let dir = tempdir().unwrap();
        let dataset = dir.path().join("metadata").join(DATASET);
        touch(&dataset.join("20230830/views").join(format!("{KEY}.csv")));
        touch(&dataset.join("20231215/views").join(format!("{KEY}.csv")));

        let cache = MetadataCache::new(dir.path(), DATASET, KEY);
        assert_eq!(cache.latest_version().unwrap().as_deref(), Some("20231215"));
        assert_eq!(
            cache.metadata_path().unwrap(),
            Some(dataset.join("20231215/views").join(format!("{KEY}.csv")))
        );
    }

    #[test]
    fn test_missing_dataset_is_no_data() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(dir.path(), DATASET, KEY);
        assert_eq!(cache.latest_version().unwrap(), None);
        assert_eq!(cache.metadata_path().unwrap(), None);
    }

    #[test]
    fn test_missing_file_is_no_data() {
        let dir = tempdir().unwrap();
        let dataset = dir.path().join("metadata").join(DATASET);
        touch(&dataset.join("20231215/views/other_table.csv"));

        let cache = MetadataCache::new(dir.path(), DATASET, KEY);
        assert_eq!(cache.metadata_path().unwrap(), None);
    }

    #[test]
    fn test_file_directly_in_version_dir() {
        let dir = tempdir().unwrap();
        let path = dir
            .path()
            .join("metadata")
            .join(DATASET)
            .join("20231215")
            .join(format!("{KEY}.csv"));
        touch(&path);

        let cache = MetadataCache::new(dir.path(), DATASET, KEY);
        assert_eq!(cache.metadata_path().unwrap(), Some(path));
    }
}
