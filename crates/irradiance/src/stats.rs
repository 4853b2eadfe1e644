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

use crate::cache::{CacheStats, ContentHasher, ContentKey, MemoCache};
use crate::dataset::{CountryCollection, Dataset};
use crate::metric::Metric;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStats {
    pub metric: Metric,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
}
impl MetricStats {
    /// Mean, median and sample standard deviation over the non-null values.
    /// Undefined values are NaN; `std` needs at least two samples.
    pub fn from_values(metric: Metric, values: &Float64Chunked) -> Self {
        let count = values.len() - values.null_count();
        let std = if count >= 2 {
            values.std(1).unwrap_or(f64::NAN)
        } else {
            f64::NAN
        };
        Self {
            metric,
            count,
            mean: values.mean().unwrap_or(f64::NAN),
            median: values.median().unwrap_or(f64::NAN),
            std,
        }
    }
}
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub country: String,
    pub metrics: Vec<MetricStats>,
}
impl SummaryRecord {
    fn for_dataset(dataset: &Dataset, metrics: &[Metric]) -> Self {
        let metrics = metrics
            .iter()
            .filter_map(|&metric| {
                dataset
                    .metric_values(metric)
                    .map(|values| MetricStats::from_values(metric, &values))
            })
            .collect();
        Self {
            country: dataset.country().to_string(),
            metrics,
        }
    }
    /// `None` when the country has no column for `metric`.
    pub fn stats(&self, metric: Metric) -> Option<&MetricStats> {
        self.metrics.iter().find(|s| s.metric == metric)
    }
    pub fn has_metric(&self, metric: Metric) -> bool {
        self.stats(metric).is_some()
    }
    pub fn mean(&self, metric: Metric) -> Option<f64> {
        self.stats(metric).map(|s| s.mean)
    }
}
/// Summary records for one request, in collection order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub metrics: Vec<Metric>,
    pub records: Vec<SummaryRecord>,
}
impl SummaryTable {
    pub fn get(&self, country: &str) -> Option<&SummaryRecord> {
        self.records.iter().find(|r| r.country == country)
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    pub fn column_names(&self) -> Vec<String> {
        let mut names = vec!["Country".to_string()];
        for metric in &self.metrics {
            names.push(format!("{metric}_mean"));
            names.push(format!("{metric}_median"));
            names.push(format!("{metric}_std"));
        }
        names
    }
    /// One row per country; cells of metrics the country lacks are empty.
    pub fn rows(&self, precision: usize) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|record| {
                let mut row = vec![record.country.clone()];
                for &metric in &self.metrics {
                    match record.stats(metric) {
                        Some(s) => {
                            for value in [s.mean, s.median, s.std] {
                                row.push(format_cell(value, precision));
                            }
                        }
                        None => row.extend((0..3).map(|_| String::new())),
                    }
                }
                row
            })
            .collect()
    }
    /// Flat records keyed like the displayed columns (`GHI_mean`, ...).
    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .records
            .iter()
            .map(|record| {
                let mut row = serde_json::Map::new();
                row.insert("Country".to_string(), record.country.clone().into());
                for s in &record.metrics {
                    row.insert(format!("{}_mean", s.metric), json_number(s.mean));
                    row.insert(format!("{}_median", s.metric), json_number(s.median));
                    row.insert(format!("{}_std", s.metric), json_number(s.std));
                }
                serde_json::Value::Object(row)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}
fn format_cell(value: f64, precision: usize) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value:.precision$}")
    }
}
fn json_number(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value).map_or(serde_json::Value::Null, serde_json::Value::Number)
}
impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.column_names();
        let rows = self.rows(2);
        let widths: Vec<usize> = (0..header.len())
            .map(|i| {
                rows.iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(header[i].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (cell, &w))| {
                    if i == 0 {
                        format!("{cell:<w$}")
                    } else {
                        format!("{cell:>w$}")
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
        };
        writeln!(f, "{}", line(&header))?;
        for row in &rows {
            writeln!(f, "{}", line(row))?;
        }
        Ok(())
    }
}
/// Computes per-country summaries, memoised on the collection fingerprint
/// and the requested metric list.
pub struct SummaryEngine {
    cache: MemoCache<ContentKey, Arc<SummaryTable>>,
}
impl SummaryEngine {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: MemoCache::new("summary", capacity),
        }
    }
    pub fn summarise(&self, collection: &CountryCollection, metrics: &[Metric]) -> Arc<SummaryTable> {
        let key = Self::key(collection, metrics);
        let computed: Result<_, std::convert::Infallible> = self
            .cache
            .get_or_try_insert_with(key, || Ok(Arc::new(compute_summary(collection, metrics))));
        match computed {
            Ok(table) => table,
            Err(never) => match never {},
        }
    }
    fn key(collection: &CountryCollection, metrics: &[Metric]) -> ContentKey {
        let mut hasher = ContentHasher::new("irradiance.summary.v1");
        hasher.update_key(&collection.fingerprint());
        for metric in metrics {
            hasher.update_str(metric.column_name());
        }
        hasher.finish()
    }
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
impl Default for SummaryEngine {
    fn default() -> Self {
        Self::new(64)
    }
}
/// Uncached summary computation.
pub fn compute_summary(collection: &CountryCollection, metrics: &[Metric]) -> SummaryTable {
    let datasets: Vec<&Dataset> = collection.iter().collect();
    let records = datasets
        .par_iter()
        .map(|dataset| SummaryRecord::for_dataset(dataset, metrics))
        .collect();
    SummaryTable {
        metrics: metrics.to_vec(),
        records,
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{DatasetLoader, UploadedFile};

    fn collection(files: &[(&str, &str)]) -> Arc<CountryCollection> {
        let files: Vec<UploadedFile> = files
            .iter()
            .map(|(name, body)| UploadedFile::new(*name, *body))
            .collect();
        DatasetLoader::new(2).load(&files).unwrap()
    }

    #[test]
    fn even_count_median_interpolates() {
        let values = Float64Chunked::from_slice("GHI".into(), &[4.0, 1.0, 3.0, 2.0]);
        let stats = MetricStats::from_values(Metric::Ghi, &values);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.mean, 2.5);
        assert!((stats.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn single_sample_has_nan_std() {
        let values = Float64Chunked::from_slice("GHI".into(), &[7.0]);
        let stats = MetricStats::from_values(Metric::Ghi, &values);
        assert_eq!(stats.mean, 7.0);
        assert!(stats.std.is_nan());
    }

    #[test]
    fn nulls_are_skipped() {
        let data = collection(&[("benin.csv", "GHI,DNI\n1,1\n,2\n3,3\n")]);
        let table = compute_summary(&data, &[Metric::Ghi]);
        let stats = table.records[0].stats(Metric::Ghi).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 2.0);
    }

    #[test]
    fn missing_metric_is_omitted() {
        let data = collection(&[("benin.csv", "GHI\n1\n2\n"), ("togo.csv", "DNI\n5\n6\n")]);
        let table = compute_summary(&data, &[Metric::Ghi, Metric::Dni]);
        assert_eq!(table.len(), 2);
        let togo = table.get("Togo").unwrap();
        assert!(!togo.has_metric(Metric::Ghi));
        assert_eq!(togo.mean(Metric::Dni), Some(5.5));
        let rows = table.rows(2);
        assert_eq!(rows[1][1], "");
        assert_eq!(rows[1][4], "5.50");
    }

    #[test]
    fn engine_memoises_per_metric_list() {
        let data = collection(&[("benin.csv", "GHI,DNI\n1,2\n3,4\n")]);
        let engine = SummaryEngine::new(8);
        let a = engine.summarise(&data, &[Metric::Ghi]);
        let b = engine.summarise(&data, &[Metric::Ghi]);
        let c = engine.summarise(&data, &[Metric::Ghi, Metric::Dni]);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        let stats = engine.cache_stats();
        assert_eq!((stats.hits, stats.misses), (1, 2));
    }

    #[test]
    fn table_renders_two_decimals() {
        let data = collection(&[("benin_clean.csv", "GHI\n10\n20\n30\n")]);
        let table = compute_summary(&data, &[Metric::Ghi]);
        let rendered = table.to_string();
        let mut lines = rendered.lines();
        assert_eq!(
            lines.next().unwrap().split_whitespace().collect::<Vec<_>>(),
            ["Country", "GHI_mean", "GHI_median", "GHI_std"]
        );
        assert_eq!(
            lines.next().unwrap().split_whitespace().collect::<Vec<_>>(),
            ["Benin", "20.00", "20.00", "10.00"]
        );
        let json = table.to_json();
        assert_eq!(json[0]["GHI_mean"], serde_json::json!(20.0));
    }
}
