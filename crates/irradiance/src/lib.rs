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

pub mod cache;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod heatmap;
pub mod loader;
pub mod metric;
pub mod plots;
pub mod stats;

pub use cache::{CacheStats, ContentKey};
pub use chart::{ChartKind, ChartSpec, ChartStyle, Trace};
pub use config::{CacheConfig, DashboardConfig, DashboardOptions, SamplingConfig};
pub use dashboard::{CountryHeatmap, DashboardView};
pub use dataset::{CountryCollection, Dataset, COUNTRY_COLUMN};
pub use error::{ConfigError, DashboardError, ErrorReporter, LoadError, Result};
pub use heatmap::CorrelationMatrix;
pub use loader::{derive_country_name, DatasetLoader, UploadedFile};
pub use metric::{Metric, MetricAvailability};
pub use stats::{MetricStats, SummaryEngine, SummaryRecord, SummaryTable};

use std::sync::Arc;
use tracing::info;

/// The dashboard core: loader, summary engine and chart builders sharing
/// one configuration and one set of caches.
pub struct SolarDashboard {
    config: DashboardConfig,
    loader: DatasetLoader,
    engine: SummaryEngine,
}
impl SolarDashboard {
    pub fn new() -> Self {
        Self::from_parts(DashboardConfig::default())
    }
    pub fn with_config(config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config))
    }
    fn from_parts(config: DashboardConfig) -> Self {
        let loader = DatasetLoader::new(config.cache.loader_capacity);
        let engine = SummaryEngine::new(config.cache.summary_capacity);
        Self {
            config,
            loader,
            engine,
        }
    }
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }
    /// Loads an upload batch. An empty batch is rejected before any parsing.
    pub fn load(&self, files: &[UploadedFile]) -> Result<Arc<CountryCollection>> {
        if files.is_empty() {
            return Err(LoadError::NoFiles.into());
        }
        Ok(self.loader.load(files)?)
    }
    pub fn summary(&self, collection: &CountryCollection, metrics: &[Metric]) -> Arc<SummaryTable> {
        self.engine.summarise(collection, metrics)
    }
    pub fn boxplot(&self, collection: &CountryCollection, metric: Metric) -> ChartSpec {
        plots::boxplot(collection, metric, &self.config.sampling, &self.config.style)
    }
    pub fn average_bar(&self, collection: &CountryCollection, metric: Metric) -> ChartSpec {
        plots::average_bar(&self.engine, collection, metric, &self.config.style)
    }
    pub fn heatmap(&self, dataset: &Dataset) -> ChartSpec {
        heatmap::correlation_heatmap(dataset, &self.config.style)
    }
    /// Runs one render cycle for the given sidebar options.
    pub fn render(
        &self,
        collection: &CountryCollection,
        options: &DashboardOptions,
    ) -> Result<DashboardView> {
        let metric = options.metric;
        if !metric.is_selectable() {
            return Err(ConfigError::MetricNotSelectable {
                metric: metric.to_string(),
            }
            .into());
        }
        let availability = collection.metric_availability(metric);
        let heatmaps = if options.show_heatmaps {
            collection
                .iter()
                .map(|dataset| CountryHeatmap {
                    country: dataset.country().to_string(),
                    chart: self.heatmap(dataset),
                })
                .collect()
        } else {
            Vec::new()
        };
        let view = DashboardView {
            heading: DashboardView::heading_for(metric, collection.countries()),
            metric,
            notice: DashboardView::notice_for(metric, &availability),
            availability,
            boxplot: self.boxplot(collection, metric),
            average_bar: self.average_bar(collection, metric),
            summary: options
                .show_summary
                .then(|| self.summary(collection, &[metric])),
            heatmaps,
            replaced: collection.replaced().to_vec(),
        };
        info!(
            %metric,
            countries = collection.len(),
            heatmaps = view.heatmaps.len(),
            summary = view.summary.is_some(),
            "rendered dashboard"
        );
        Ok(view)
    }
    /// Hit/miss counters of the loader and summary caches.
    pub fn cache_stats(&self) -> (CacheStats, CacheStats) {
        (self.loader.cache_stats(), self.engine.cache_stats())
    }
    pub fn clear_caches(&self) {
        self.loader.clear_cache();
        self.engine.clear_cache();
    }
}
impl Default for SolarDashboard {
    fn default() -> Self {
        Self::new()
    }
}
