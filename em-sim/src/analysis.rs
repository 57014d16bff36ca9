//! Statistics of an exported |E| sample

use crate::error::{Result, TowerError};
use crate::export::FieldRecord;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Percentile levels reported for every sample
pub const PERCENTILE_LEVELS: [f64; 9] = [1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0, 99.0];

/// Decade exponents of the histogram, [1e-10, 1e12)
pub const DECADE_RANGE: std::ops::Range<i32> = -10..12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecadeBin {
    pub exponent: i32,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extents {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Extents {
    fn of_rows<'a>(rows: impl Iterator<Item = ndarray::ArrayView1<'a, f64>>) -> Option<Self> {
        let mut extents: Option<Extents> = None;
        for row in rows {
            let p = [row[0], row[1], row[2]];
            let e = extents.get_or_insert(Extents { min: p, max: p });
            for d in 0..3 {
                e.min[d] = e.min[d].min(p[d]);
                e.max[d] = e.max[d].max(p[d]);
            }
        }
        extents
    }

    pub fn span(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// Points above the 95th percentile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighFieldRegion {
    pub threshold: f64,
    pub count: usize,
    pub fraction: f64,
    pub extents: Extents,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub decades: Vec<DecadeBin>,
    /// (level, value) pairs for [`PERCENTILE_LEVELS`]
    pub percentiles: Vec<(f64, f64)>,
    pub extents: Option<Extents>,
    pub high_field: Option<HighFieldRegion>,
}

/// Linearly interpolated percentile of an ascending sample
pub fn percentile(sorted: &[f64], level: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (level / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

/// Counts per decade; values outside the range are not counted
pub fn decade_histogram(values: &[f64]) -> Vec<DecadeBin> {
    let n = values.len().max(1) as f64;
    DECADE_RANGE
        .map(|exponent| {
            let lower = 10f64.powi(exponent);
            let upper = 10f64.powi(exponent + 1);
            let count = values.iter().filter(|&&v| v >= lower && v < upper).count();
            DecadeBin {
                exponent,
                count,
                percentage: 100.0 * count as f64 / n,
            }
        })
        .collect()
}

/// Statistics of `e_mag`, with spatial extents when coordinates are given
pub fn field_statistics(
    e_mag: &Array1<f64>,
    coordinates: Option<&Array2<f64>>,
) -> Result<FieldStatistics> {
    if e_mag.is_empty() {
        return Err(TowerError::EmptySample);
    }
    let mut sorted = e_mag.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
    let percentiles: Vec<(f64, f64)> = PERCENTILE_LEVELS
        .iter()
        .map(|&level| (level, percentile(&sorted, level)))
        .collect();

    let extents = coordinates.and_then(|c| Extents::of_rows(c.rows().into_iter()));
    let high_field = coordinates.and_then(|c| {
        let threshold = percentile(&sorted, 95.0);
        let rows = c
            .rows()
            .into_iter()
            .zip(e_mag.iter())
            .filter(|(_, e)| **e > threshold)
            .map(|(row, _)| row);
        let selected: Vec<_> = rows.collect();
        let extents = Extents::of_rows(selected.iter().cloned())?;
        Some(HighFieldRegion {
            threshold,
            count: selected.len(),
            fraction: selected.len() as f64 / count as f64,
            extents,
        })
    });

    Ok(FieldStatistics {
        count,
        min: sorted[0],
        max: sorted[count - 1],
        mean,
        median: percentile(&sorted, 50.0),
        std_dev: variance.sqrt(),
        decades: decade_histogram(&sorted),
        percentiles,
        extents,
        high_field,
    })
}

/// Statistics of a whole archive
pub fn analyze_record(record: &FieldRecord) -> Result<FieldStatistics> {
    field_statistics(&record.e_mag, Some(&record.coordinates))
}

impl FieldStatistics {
    pub fn percentile(&self, level: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|(l, _)| (*l - level).abs() < 1e-12)
            .map(|(_, v)| *v)
    }

    /// Human-readable summary
    pub fn report(&self, title: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{}", "=".repeat(title.chars().count().max(20)));
        let _ = writeln!(out, "Points:  {}", self.count);
        let _ = writeln!(out, "Min:     {:.2e} V/m", self.min);
        let _ = writeln!(out, "Max:     {:.2e} V/m", self.max);
        let _ = writeln!(out, "Mean:    {:.2e} V/m", self.mean);
        let _ = writeln!(out, "Median:  {:.2e} V/m", self.median);
        let _ = writeln!(out, "Std dev: {:.2e} V/m", self.std_dev);

        let _ = writeln!(out, "\nMagnitude distribution:");
        for bin in self.decades.iter().filter(|b| b.count > 0) {
            let _ = writeln!(
                out,
                "  1e{:>3} - 1e{:>3}: {:>8} points ({:5.2}%)",
                bin.exponent,
                bin.exponent + 1,
                bin.count,
                bin.percentage
            );
        }

        let _ = writeln!(out, "\nPercentiles:");
        for (level, value) in &self.percentiles {
            let _ = writeln!(out, "  {:>2}%: {:.2e} V/m", level, value);
        }

        if let Some(e) = &self.extents {
            let span = e.span();
            let _ = writeln!(out, "\nSpatial extent:");
            for (d, axis) in ["X", "Y", "Z"].iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  {axis}: [{:.1}, {:.1}] m (span {:.1} m)",
                    e.min[d], e.max[d], span[d]
                );
            }
        }
        if let Some(h) = &self.high_field {
            let _ = writeln!(
                out,
                "\nHigh-field region (> {:.2e} V/m): {} points ({:.1}%)",
                h.threshold,
                h.count,
                100.0 * h.fraction
            );
            for (d, axis) in ["X", "Y", "Z"].iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  {axis}: [{:.1}, {:.1}] m",
                    h.extents.min[d], h.extents.max[d]
                );
            }
        }
        out
    }
}

/// One row of a multi-case comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub name: String,
    pub count: usize,
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub max: f64,
}

impl CaseSummary {
    pub fn from_statistics(name: impl Into<String>, stats: &FieldStatistics) -> Self {
        Self {
            name: name.into(),
            count: stats.count,
            min: stats.min,
            mean: stats.mean,
            median: stats.median,
            p95: stats.percentile(95.0).unwrap_or(f64::NAN),
            max: stats.max,
        }
    }
}

pub fn comparison_table(cases: &[CaseSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:>10} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "Case", "Points", "Min", "Mean", "Median", "P95", "Max"
    );
    let _ = writeln!(out, "{}", "-".repeat(100));
    for c in cases {
        let _ = writeln!(
            out,
            "{:<24} {:>10} {:>12.2e} {:>12.2e} {:>12.2e} {:>12.2e} {:>12.2e}",
            c.name, c.count, c.min, c.mean, c.median, c.p95, c.max
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_percentiles_interpolate() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile(&sorted, 50.0), 3.0);
        assert_relative_eq!(percentile(&sorted, 25.0), 2.0);
        assert_relative_eq!(percentile(&sorted, 90.0), 4.6, epsilon = 1e-12);
        assert_relative_eq!(percentile(&sorted, 0.0), 1.0);
        assert_relative_eq!(percentile(&sorted, 100.0), 5.0);
        assert_eq!(percentile(&[7.0], 99.0), 7.0);
    }

    #[test]
    fn test_decade_histogram() {
        let values = [0.5, 5.0, 6.0, 50.0, 5e11, 2e12, 0.0];
        let bins = decade_histogram(&values);
        assert_eq!(bins.len(), 22);
        let count = |exp: i32| bins.iter().find(|b| b.exponent == exp).unwrap().count;
        assert_eq!(count(-1), 1);
        assert_eq!(count(0), 2);
        assert_eq!(count(1), 1);
        assert_eq!(count(11), 1);
        // 2e12 and 0 fall outside
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
        assert_relative_eq!(
            bins.iter().find(|b| b.exponent == 0).unwrap().percentage,
            200.0 / 7.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_field_statistics() {
        let e_mag = array![4.0, 1.0, 3.0, 2.0, 100.0];
        let coords = array![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [0.0, 0.0, 3.0],
            [5.0, 5.0, 5.0],
        ];
        let stats = field_statistics(&e_mag, Some(&coords)).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 100.0);
        assert_relative_eq!(stats.mean, 22.0);
        assert_relative_eq!(stats.median, 3.0);
        let var = [18.0f64, 21.0, 19.0, 20.0, 78.0]
            .iter()
            .map(|d| d * d)
            .sum::<f64>()
            / 5.0;
        assert_relative_eq!(stats.std_dev, var.sqrt(), epsilon = 1e-12);

        let extents = stats.extents.unwrap();
        assert_eq!(extents.max, [5.0, 5.0, 5.0]);
        assert_eq!(extents.span(), [5.0, 5.0, 5.0]);

        let high = stats.high_field.unwrap();
        // p95 = 4 + 0.8·96 = 80.8, only the 100 V/m point is above
        assert_relative_eq!(high.threshold, 80.8, epsilon = 1e-12);
        assert_eq!(high.count, 1);
        assert_eq!(high.extents.min, [5.0, 5.0, 5.0]);

        let report = stats.report("Test");
        assert!(report.contains("Percentiles"));
        assert!(report.contains("High-field region"));
    }

    #[test]
    fn test_empty_sample_rejected() {
        let empty = Array1::<f64>::zeros(0);
        assert!(matches!(
            field_statistics(&empty, None),
            Err(TowerError::EmptySample)
        ));
    }

    #[test]
    fn test_comparison_table() {
        let stats = field_statistics(&array![1.0, 2.0, 3.0], None).unwrap();
        assert!(stats.extents.is_none());
        let row = CaseSummary::from_statistics("medium", &stats);
        assert_relative_eq!(row.p95, 2.9, epsilon = 1e-12);
        let table = comparison_table(&[row]);
        assert!(table.lines().nth(2).unwrap().starts_with("medium"));
    }
}
