// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Turns uploaded CSV files into a [`CountryCollection`].

use crate::cache::{CacheStats, ContentHasher, ContentKey, MemoCache};
use crate::dataset::{CountryCollection, Dataset, COUNTRY_COLUMN};
use crate::error::{LoadError, LoadResult};
use polars::prelude::*;
use rayon::prelude::*;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const CLEAN_SUFFIX: &str = "_clean.csv";
const CSV_SUFFIX: &str = ".csv";

/// A file as handed over by the upload widget: its name and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk, keeping only its final path component as name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> LoadResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| LoadError::Read {
            file: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }
}

/// `benin_clean.csv` → `Benin`, `sierra_leone.csv` → `Sierra_leone`.
///
/// Only the first character is upper-cased; the rest of the stem is kept
/// as written. Returns `None` when nothing is left after stripping.
pub fn derive_country_name(file_name: &str) -> Option<String> {
    let stem = file_name
        .strip_suffix(CLEAN_SUFFIX)
        .or_else(|| file_name.strip_suffix(CSV_SUFFIX))
        .unwrap_or(file_name);
    let mut chars = stem.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Content digest of an upload batch: every name and byte, in order.
pub fn fingerprint(files: &[UploadedFile]) -> ContentKey {
    let mut hasher = ContentHasher::new("irradiance.loader.v1");
    for file in files {
        hasher.update_str(&file.name).update_bytes(&file.bytes);
    }
    hasher.finish()
}

// Cleaned station files open with long runs of integer night-time zeros, so
// the schema is inferred from every row rather than a prefix.
fn read_frame(bytes: &[u8]) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| opts.with_try_parse_dates(true))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
}

/// Parses a single upload and tags every row with its country.
pub fn parse_upload(file: &UploadedFile) -> LoadResult<Dataset> {
    let country = derive_country_name(&file.name).ok_or_else(|| LoadError::InvalidFileName {
        name: file.name.clone(),
    })?;
    let mut frame = read_frame(&file.bytes).map_err(|source| LoadError::Parse {
        file: file.name.clone(),
        source,
    })?;
    let tag = Series::new(
        COUNTRY_COLUMN.into(),
        vec![country.as_str(); frame.height()],
    );
    frame.with_column(tag).map_err(|source| LoadError::Tagging {
        file: file.name.clone(),
        source,
    })?;
    debug!(
        file = %file.name,
        %country,
        rows = frame.height(),
        columns = frame.width(),
        "parsed upload"
    );
    Ok(Dataset::new(country, file.name.clone(), frame))
}

/// Loads upload batches, memoised on their content.
pub struct DatasetLoader {
    cache: MemoCache<ContentKey, Arc<CountryCollection>>,
}

impl DatasetLoader {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: MemoCache::new("loader", capacity),
        }
    }

    /// Builds the country collection for `files`.
    ///
    /// Identical names and bytes return the cached collection. When two files
    /// derive the same country name, the later file wins.
    pub fn load(&self, files: &[UploadedFile]) -> LoadResult<Arc<CountryCollection>> {
        let key = fingerprint(files);
        self.cache
            .get_or_try_insert_with(key, || Self::build(key, files).map(Arc::new))
    }

    fn build(key: ContentKey, files: &[UploadedFile]) -> LoadResult<CountryCollection> {
        let datasets = files
            .par_iter()
            .map(parse_upload)
            .collect::<LoadResult<Vec<_>>>()?;
        let mut collection = CountryCollection::new(key);
        for dataset in datasets {
            let source = dataset.source_name().to_string();
            if let Some(previous) = collection.insert(dataset) {
                warn!(
                    country = previous.country(),
                    replaced = previous.source_name(),
                    by = %source,
                    "duplicate country name, keeping the later upload"
                );
            }
        }
        info!(
            files = files.len(),
            countries = collection.len(),
            rows = collection.total_rows(),
            "loaded upload batch"
        );
        Ok(collection)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;

    #[test]
    fn derives_country_names() {
        assert_eq!(derive_country_name("benin_clean.csv").as_deref(), Some("Benin"));
        assert_eq!(derive_country_name("togo.csv").as_deref(), Some("Togo"));
        assert_eq!(
            derive_country_name("sierra_leone_clean.csv").as_deref(),
            Some("Sierra_leone")
        );
        assert_eq!(derive_country_name("mALI.csv").as_deref(), Some("MALI"));
        assert_eq!(derive_country_name("notes"), Some("Notes".to_string()));
        assert_eq!(derive_country_name(".csv"), None);
        assert_eq!(derive_country_name("_clean.csv"), None);
    }

    #[test]
    fn tags_rows_with_country() {
        let file = UploadedFile::new("benin_clean.csv", "GHI,DNI\n1.5,2\n3.5,4\n");
        let ds = parse_upload(&file).unwrap();
        assert_eq!(ds.country(), "Benin");
        assert_eq!(ds.row_count(), 2);
        let tags = ds.frame().column(COUNTRY_COLUMN).unwrap();
        let tags: Vec<Option<&str>> = tags
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(tags, vec![Some("Benin"), Some("Benin")]);
        assert!(ds.has_metric(Metric::Dni));
    }

    #[test]
    fn parses_timestamp_columns() {
        let file = UploadedFile::new(
            "togo.csv",
            "Timestamp,GHI\n2021-08-09 00:01:00,1.0\n2021-08-09 00:02:00,2.0\n",
        );
        let ds = parse_upload(&file).unwrap();
        assert_eq!(ds.temporal_columns(), vec!["Timestamp".to_string()]);
    }

    #[test]
    fn ragged_rows_are_parse_errors() {
        let file = UploadedFile::new("benin.csv", "GHI,DNI\n1,2\n3,4,5,6\n");
        let err = parse_upload(&file).unwrap_err();
        assert!(matches!(err, LoadError::Parse { ref file, .. } if file == "benin.csv"));
    }

    #[test]
    fn decimals_after_integer_prefix_load() {
        let mut body = String::from("GHI,DNI\n");
        for _ in 0..150 {
            body.push_str("0,0\n");
        }
        body.push_str("1.5,2.5\n");
        let ds = parse_upload(&UploadedFile::new("benin_clean.csv", body)).unwrap();
        assert_eq!(ds.row_count(), 151);
        let ghi = ds.metric_values(Metric::Ghi).unwrap();
        assert_eq!(ghi.get(150), Some(1.5));
        assert_eq!(ds.metric_values(Metric::Dni).unwrap().get(150), Some(2.5));
    }

    #[test]
    fn unreadable_path_names_the_file() {
        let err = UploadedFile::from_path("/nonexistent/benin_clean.csv").unwrap_err();
        assert!(matches!(err, LoadError::Read { ref file, .. } if file == "/nonexistent/benin_clean.csv"));
        assert!(err.to_string().contains("/nonexistent/benin_clean.csv"));
    }

    #[test]
    fn empty_stem_is_rejected() {
        let err = parse_upload(&UploadedFile::new(".csv", "GHI\n1\n")).unwrap_err();
        assert!(matches!(err, LoadError::InvalidFileName { .. }));
    }

    #[test]
    fn repeated_load_hits_cache() {
        let loader = DatasetLoader::new(4);
        let files = vec![
            UploadedFile::new("benin.csv", "GHI\n1\n2\n"),
            UploadedFile::new("togo.csv", "GHI\n3\n"),
        ];
        let first = loader.load(&files).unwrap();
        let second = loader.load(&files).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.cache_stats().hits, 1);

        let mut changed = files.clone();
        changed[1].bytes = b"GHI\n4\n".to_vec();
        let third = loader.load(&changed).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_ne!(first.fingerprint(), third.fingerprint());
    }
}
