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

//! Cross-country comparison charts for one selected metric.

use crate::chart::{ChartKind, ChartSpec, ChartStyle, Trace};
use crate::config::SamplingConfig;
use crate::dataset::{CountryCollection, COUNTRY_COLUMN};
use crate::metric::Metric;
use crate::stats::SummaryEngine;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use tracing::debug;

/// One row of the concatenated, country-tagged table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxPoint {
    pub country_index: usize,
    pub value: Option<f64>,
}

/// Concatenates the metric column of every country, in collection order.
/// Countries without the column contribute one missing value per row.
pub fn combined_points(collection: &CountryCollection, metric: Metric) -> Vec<BoxPoint> {
    let mut points = Vec::with_capacity(collection.total_rows());
    for (country_index, dataset) in collection.iter().enumerate() {
        match dataset.metric_values(metric) {
            Some(values) => points.extend(values.into_iter().map(|value| BoxPoint {
                country_index,
                value,
            })),
            None => points.extend((0..dataset.row_count()).map(|_| BoxPoint {
                country_index,
                value: None,
            })),
        }
    }
    points
}

/// Keeps every point when there are at most `max_points`, otherwise draws
/// exactly `max_points` without replacement from a seeded generator.
/// The kept points stay in their original order.
pub fn sample_points(points: Vec<BoxPoint>, sampling: &SamplingConfig) -> Vec<BoxPoint> {
    if points.len() <= sampling.max_points {
        return points;
    }
    let mut rng = StdRng::seed_from_u64(sampling.seed);
    let mut picked = index::sample(&mut rng, points.len(), sampling.max_points).into_vec();
    picked.sort_unstable();
    debug!(
        total = points.len(),
        kept = picked.len(),
        seed = sampling.seed,
        "downsampled boxplot rows"
    );
    picked.into_iter().map(|i| points[i]).collect()
}

/// Box-and-whisker chart of `metric`, one box per country with all points shown.
pub fn boxplot(
    collection: &CountryCollection,
    metric: Metric,
    sampling: &SamplingConfig,
    style: &ChartStyle,
) -> ChartSpec {
    let points = sample_points(combined_points(collection, metric), sampling);
    let mut per_country: Vec<Vec<Option<f64>>> = vec![Vec::new(); collection.len()];
    for point in points {
        per_country[point.country_index].push(point.value);
    }
    let mut spec = ChartSpec::new(
        ChartKind::Box,
        format!("{metric} Comparison Across Countries"),
        style.template.clone(),
    )
    .with_axes(COUNTRY_COLUMN, metric.column_name())
    .with_color_by(COUNTRY_COLUMN)
    .with_height(style.box_height);
    for (index, (country, y)) in collection.countries().zip(per_country).enumerate() {
        spec.push_trace(Trace::Box {
            name: country.to_string(),
            color: style.color(index),
            y,
        });
    }
    spec
}

/// Ranked bar chart of each country's mean `metric`.
///
/// Bars follow collection order; a country without the metric gets an empty bar.
pub fn average_bar(
    engine: &SummaryEngine,
    collection: &CountryCollection,
    metric: Metric,
    style: &ChartStyle,
) -> ChartSpec {
    let summary = engine.summarise(collection, &[metric]);
    let mut spec = ChartSpec::new(
        ChartKind::Bar,
        format!("Average {metric} by Country"),
        style.template.clone(),
    )
    .with_axes(COUNTRY_COLUMN, format!("{metric}_mean"))
    .with_color_by(COUNTRY_COLUMN)
    .with_height(style.bar_height);
    for (index, record) in summary.records.iter().enumerate() {
        spec.push_trace(Trace::Bar {
            name: record.country.clone(),
            color: style.color(index),
            x: vec![record.country.clone()],
            y: vec![record.mean(metric).filter(|m| !m.is_nan())],
            text_format: "%{y:.2f}".to_string(),
        });
    }
    spec
}
