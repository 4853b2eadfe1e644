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

use crate::chart::{ChartKind, ChartSpec, ChartStyle, Trace};
use crate::dataset::Dataset;
use crate::metric::Metric;
use serde::Serialize;

/// Pairwise Pearson correlations between the metrics present in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub metrics: Vec<Metric>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Correlates the candidate metrics found in `dataset`, skipping absent ones.
    ///
    /// Each pair uses the rows where both values are present. The diagonal is
    /// 1; pairs with fewer than two complete rows or zero variance are NaN.
    pub fn for_dataset(dataset: &Dataset) -> Self {
        let columns: Vec<(Metric, Vec<Option<f64>>)> = Metric::CORRELATION_CANDIDATES
            .into_iter()
            .filter_map(|metric| {
                dataset
                    .metric_values(metric)
                    .map(|values| (metric, values.into_iter().collect()))
            })
            .collect();
        let n = columns.len();
        let mut values = vec![vec![f64::NAN; n]; n];
        for i in 0..n {
            values[i][i] = 1.0;
            for j in (i + 1)..n {
                let r = pearson(&columns[i].1, &columns[j].1);
                values[i][j] = r;
                values[j][i] = r;
            }
        }
        Self {
            metrics: columns.into_iter().map(|(metric, _)| metric).collect(),
            values,
        }
    }

    pub fn size(&self) -> usize {
        self.metrics.len()
    }

    pub fn get(&self, a: Metric, b: Metric) -> Option<f64> {
        let i = self.metrics.iter().position(|&m| m == a)?;
        let j = self.metrics.iter().position(|&m| m == b)?;
        Some(self.values[i][j])
    }

    pub fn labels(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.column_name().to_string()).collect()
    }
}

/// Pearson's r over the pairwise-complete observations of `x` and `y`.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if !a.is_nan() && !b.is_nan() => Some((*a, *b)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// Heatmap of the dataset's correlation matrix on a diverging [-1, 1] scale.
pub fn correlation_heatmap(dataset: &Dataset, style: &ChartStyle) -> ChartSpec {
    heatmap_for_matrix(dataset.country(), &CorrelationMatrix::for_dataset(dataset), style)
}

pub fn heatmap_for_matrix(country: &str, matrix: &CorrelationMatrix, style: &ChartStyle) -> ChartSpec {
    let labels = matrix.labels();
    let z: Vec<Vec<Option<f64>>> = matrix
        .values
        .iter()
        .map(|row| row.iter().map(|&v| (!v.is_nan()).then_some(v)).collect())
        .collect();
    let mut spec = ChartSpec::new(
        ChartKind::Heatmap,
        format!("Correlation Heatmap - {country}"),
        style.template.clone(),
    );
    spec.push_trace(Trace::Heatmap {
        x: labels.clone(),
        y: labels,
        z,
        colorscale: style.heatmap_colorscale.clone(),
        zmin: -1.0,
        zmax: 1.0,
        text_format: "%{z:.2f}".to_string(),
    });
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{parse_upload, UploadedFile};

    fn dataset(body: &str) -> Dataset {
        parse_upload(&UploadedFile::new("benin_clean.csv", body)).unwrap()
    }

    #[test]
    fn perfect_correlations() {
        let x = [Some(1.0), Some(2.0), Some(3.0)];
        assert!((pearson(&x, &[Some(2.0), Some(4.0), Some(6.0)]) - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &[Some(3.0), Some(2.0), Some(1.0)]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn incomplete_pairs_are_dropped() {
        let x = [Some(1.0), None, Some(3.0), Some(4.0)];
        let y = [Some(1.0), Some(100.0), Some(3.0), Some(4.0)];
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
        assert!(pearson(&[Some(1.0)], &[Some(2.0)]).is_nan());
        assert!(pearson(&[Some(1.0), Some(1.0)], &[Some(2.0), Some(3.0)]).is_nan());
    }

    #[test]
    fn absent_metrics_are_excluded() {
        let ds = dataset("GHI,DNI,DHI,TModA\n1,2,9,4\n2,1,7,5\n3,5,8,7\n4,3,1,6\n");
        let matrix = CorrelationMatrix::for_dataset(&ds);
        assert_eq!(
            matrix.metrics,
            vec![Metric::Ghi, Metric::Dni, Metric::Dhi, Metric::TModA]
        );
        assert_eq!(matrix.size(), 4);
        assert!(matrix.get(Metric::Ghi, Metric::TModB).is_none());
        for i in 0..4 {
            assert_eq!(matrix.values[i][i], 1.0);
            for j in 0..4 {
                assert_eq!(matrix.values[i][j].to_bits(), matrix.values[j][i].to_bits());
            }
        }
    }

    #[test]
    fn degenerate_matrices() {
        let single = CorrelationMatrix::for_dataset(&dataset("GHI,Tamb\n1,2\n3,4\n"));
        assert_eq!(single.values, vec![vec![1.0]]);
        let none = CorrelationMatrix::for_dataset(&dataset("Tamb\n1\n"));
        assert_eq!(none.size(), 0);
        let spec = heatmap_for_matrix("Benin", &none, &ChartStyle::default());
        assert_eq!(spec.point_count(), 0);
    }

    #[test]
    fn heatmap_spec() {
        let ds = dataset("GHI,DNI\n1,2\n2,4\n3,7\n");
        let spec = correlation_heatmap(&ds, &ChartStyle::default());
        assert_eq!(spec.title, "Correlation Heatmap - Benin");
        let fig = spec.to_plotly();
        assert_eq!(fig["data"][0]["colorscale"], "RdBu_r");
        assert_eq!(fig["data"][0]["zmin"], -1.0);
        assert_eq!(fig["data"][0]["zmax"], 1.0);
        assert_eq!(fig["data"][0]["x"], serde_json::json!(["GHI", "DNI"]));
    }
}
