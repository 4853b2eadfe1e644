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

use irradiance::heatmap::pearson;
use irradiance::stats::compute_summary;
use irradiance::{CorrelationMatrix, DatasetLoader, Metric, UploadedFile};
use proptest::prelude::*;

fn csv_column(name: &str, values: &[f64]) -> String {
    let mut body = format!("{name}\n");
    for v in values {
        body.push_str(&format!("{v}\n"));
    }
    body
}

fn reference_median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * (1.0 + a.abs().max(b.abs()))
}

proptest! {
    #[test]
    fn summary_matches_reference(values in prop::collection::vec(-1000.0f64..1500.0, 2..60)) {
        let loader = DatasetLoader::new(1);
        let data = loader
            .load(&[UploadedFile::new("benin_clean.csv", csv_column("GHI", &values))])
            .unwrap();
        let table = compute_summary(&data, &[Metric::Ghi]);
        let stats = table.records[0].stats(Metric::Ghi).unwrap();

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);

        prop_assert_eq!(stats.count, values.len());
        prop_assert!(close(stats.mean, mean), "mean {} vs {}", stats.mean, mean);
        prop_assert!(close(stats.median, reference_median(&values)));
        prop_assert!(close(stats.std, var.sqrt()), "std {} vs {}", stats.std, var.sqrt());
    }

    #[test]
    fn summary_is_idempotent(values in prop::collection::vec(0.0f64..1200.0, 1..40)) {
        let loader = DatasetLoader::new(1);
        let data = loader
            .load(&[UploadedFile::new("togo.csv", csv_column("DHI", &values))])
            .unwrap();
        let first = compute_summary(&data, &[Metric::Dhi, Metric::Ghi]);
        let second = compute_summary(&data, &[Metric::Dhi, Metric::Ghi]);
        let a = first.records[0].stats(Metric::Dhi).unwrap();
        let b = second.records[0].stats(Metric::Dhi).unwrap();
        prop_assert_eq!(a.mean.to_bits(), b.mean.to_bits());
        prop_assert_eq!(a.median.to_bits(), b.median.to_bits());
        prop_assert_eq!(a.std.to_bits(), b.std.to_bits());
        prop_assert!(!first.records[0].has_metric(Metric::Ghi));
    }

    #[test]
    fn correlation_is_bounded_and_symmetric(
        rows in prop::collection::vec((0.0f64..1000.0, 0.0f64..1000.0, 10.0f64..70.0), 3..40)
    ) {
        let mut body = String::from("GHI,DNI,TModB\n");
        for (ghi, dni, tmod) in &rows {
            body.push_str(&format!("{ghi},{dni},{tmod}\n"));
        }
        let data = DatasetLoader::new(1)
            .load(&[UploadedFile::new("benin.csv", body)])
            .unwrap();
        let matrix = CorrelationMatrix::for_dataset(data.get("Benin").unwrap());
        prop_assert_eq!(matrix.size(), 3);
        for i in 0..3 {
            prop_assert_eq!(matrix.values[i][i], 1.0);
            for j in 0..3 {
                let v = matrix.values[i][j];
                prop_assert_eq!(v.to_bits(), matrix.values[j][i].to_bits());
                prop_assert!(v.is_nan() || (-1.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn pearson_ignores_scale(
        xs in prop::collection::vec(-50.0f64..50.0, 3..30),
        scale in 0.5f64..20.0,
        shift in -100.0f64..100.0,
    ) {
        let x: Vec<Option<f64>> = xs.iter().copied().map(Some).collect();
        let y: Vec<Option<f64>> = xs.iter().map(|v| Some(v * scale + shift)).collect();
        let r = pearson(&x, &y);
        prop_assert!(r.is_nan() || close(r, 1.0), "r = {}", r);
    }
}
