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

use crate::chart::ChartSpec;
use crate::metric::{Metric, MetricAvailability};
use crate::stats::SummaryTable;
use std::collections::HashSet;
use std::sync::Arc;

/// Everything one render cycle shows, in display order.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub heading: String,
    pub metric: Metric,
    pub availability: MetricAvailability,
    /// Shown instead of meaningful charts when no country has the metric.
    pub notice: Option<String>,
    pub boxplot: ChartSpec,
    pub average_bar: ChartSpec,
    pub summary: Option<Arc<SummaryTable>>,
    pub heatmaps: Vec<CountryHeatmap>,
    /// Countries whose upload was replaced by a later file with the same name.
    pub replaced: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CountryHeatmap {
    pub country: String,
    pub chart: ChartSpec,
}

impl DashboardView {
    pub(crate) fn heading_for<'a>(metric: Metric, countries: impl Iterator<Item = &'a str>) -> String {
        let names: Vec<&str> = countries.collect();
        format!("Comparing {metric} Across {}", names.join(", "))
    }

    pub(crate) fn notice_for(metric: Metric, availability: &MetricAvailability) -> Option<String> {
        match availability {
            MetricAvailability::Everywhere => None,
            MetricAvailability::Partial { missing } => Some(format!(
                "No {metric} column in: {}",
                missing.join(", ")
            )),
            MetricAvailability::Nowhere => Some(format!(
                "None of the uploaded files has a {metric} column; the comparison charts are empty."
            )),
        }
    }

    /// All charts of the view with a file-friendly slug each.
    ///
    /// Slugs are unique within the view: countries whose names only differ in
    /// case (`Mali`, `MALI`) get a numeric suffix after the first.
    pub fn charts(&self) -> Vec<(String, &ChartSpec)> {
        let metric = self.metric.column_name().to_lowercase();
        let mut charts = vec![
            (format!("{metric}_boxplot"), &self.boxplot),
            (format!("{metric}_average_bar"), &self.average_bar),
        ];
        let mut taken = HashSet::new();
        for heatmap in &self.heatmaps {
            let base = format!("correlation_{}", heatmap.country.to_lowercase());
            let mut slug = base.clone();
            let mut n = 2;
            while !taken.insert(slug.clone()) {
                slug = format!("{base}_{n}");
                n += 1;
            }
            charts.push((slug, &heatmap.chart));
        }
        charts
    }
}
