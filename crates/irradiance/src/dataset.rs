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

use crate::cache::ContentKey;
use crate::metric::{Metric, MetricAvailability};
use indexmap::IndexMap;
use polars::prelude::*;

/// Name of the tag column added to every loaded table.
pub const COUNTRY_COLUMN: &str = "Country";

/// One uploaded country table. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Dataset {
    country: String,
    source_name: String,
    frame: DataFrame,
}

impl Dataset {
    pub(crate) fn new(country: String, source_name: String, frame: DataFrame) -> Self {
        Self {
            country,
            source_name,
            frame,
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn row_count(&self) -> usize {
        self.frame.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    pub fn has_metric(&self, metric: Metric) -> bool {
        self.has_column(metric.column_name())
    }

    /// The metric column as `f64`, or `None` when the column is absent.
    ///
    /// Text values that do not parse as numbers become nulls.
    pub fn metric_values(&self, metric: Metric) -> Option<Float64Chunked> {
        let column = self.frame.column(metric.column_name()).ok()?;
        let series = column
            .as_materialized_series()
            .cast(&DataType::Float64)
            .ok()?;
        series.f64().ok().cloned()
    }

    /// Columns the CSV reader recognised as dates or timestamps.
    pub fn temporal_columns(&self) -> Vec<String> {
        self.frame
            .get_columns()
            .iter()
            .filter(|c| matches!(c.dtype(), DataType::Date | DataType::Datetime(_, _)))
            .map(|c| c.name().to_string())
            .collect()
    }
}

/// Datasets keyed by country, in upload order.
#[derive(Debug, Clone)]
pub struct CountryCollection {
    datasets: IndexMap<String, Dataset>,
    fingerprint: ContentKey,
    replaced: Vec<String>,
}

impl CountryCollection {
    pub(crate) fn new(fingerprint: ContentKey) -> Self {
        Self {
            datasets: IndexMap::new(),
            fingerprint,
            replaced: Vec::new(),
        }
    }

    /// Inserts a dataset. A later dataset with an existing country name takes
    /// over the earlier one's slot, and the name is recorded in `replaced`.
    pub(crate) fn insert(&mut self, dataset: Dataset) -> Option<Dataset> {
        let previous = self
            .datasets
            .insert(dataset.country().to_string(), dataset);
        if let Some(prev) = &previous {
            self.replaced.push(prev.country().to_string());
        }
        previous
    }

    /// Content digest of the uploads this collection was built from.
    pub fn fingerprint(&self) -> ContentKey {
        self.fingerprint
    }

    pub fn get(&self, country: &str) -> Option<&Dataset> {
        self.datasets.get(country)
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.values()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.iter().map(Dataset::row_count).sum()
    }

    /// Countries whose first upload was overwritten by a later file that
    /// derived the same name.
    pub fn replaced(&self) -> &[String] {
        &self.replaced
    }

    pub fn metric_availability(&self, metric: Metric) -> MetricAvailability {
        let missing: Vec<String> = self
            .iter()
            .filter(|d| !d.has_metric(metric))
            .map(|d| d.country().to_string())
            .collect();
        MetricAvailability::from_missing(missing, self.len())
    }
}

impl<'a> IntoIterator for &'a CountryCollection {
    type Item = &'a Dataset;
    type IntoIter = indexmap::map::Values<'a, String, Dataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.datasets.values()
    }
}
