//! Interactive HTML plots of exported fields and of batch comparisons
//!
//! Each plot is written to its own standalone HTML file. Point clouds larger
//! than [`MAX_SCATTER_POINTS`] are thinned with a fixed stride so that the
//! same archive always gives the same picture.

use crate::analysis::{CaseSummary, field_statistics};
use crate::error::{ExportError, Result, TowerError};
use crate::export::FieldRecord;
use ndarray::Array1;
use plotly::common::{ColorScale, ColorScalePalette, Marker, Mode, Title};
use plotly::histogram::HistNorm;
use plotly::layout::{Axis, AxisType, BarMode};
use plotly::{Bar, Histogram, Layout, Plot, Scatter, Scatter3D};
use std::fs;
use std::path::{Path, PathBuf};

/// Largest number of points drawn in a scatter plot
pub const MAX_SCATTER_POINTS: usize = 10_000;

const HISTOGRAM_BINS: usize = 50;

/// Offset keeping log10 finite at |E| = 0
const LOG_FLOOR: f64 = 1e-12;

/// log10 of the strictly positive, finite values
pub fn log_magnitudes(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .filter(|v| v.is_finite() && **v > 0.0)
        .map(|v| v.log10())
        .collect()
}

/// Sorted finite values and their empirical cumulative probability i/n
pub fn cumulative_distribution(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    let prob = (1..=sorted.len()).map(|i| i as f64 / n).collect();
    (sorted, prob)
}

/// Every k-th index of `0..len`, with k chosen so at most `max_points` remain
pub fn stride_sample(len: usize, max_points: usize) -> Vec<usize> {
    let step = if len <= max_points {
        1
    } else {
        len.div_ceil(max_points.max(1))
    };
    (0..len).step_by(step).collect()
}

fn axis(title: &str) -> Axis {
    Axis::new().title(Title::with_text(title))
}

fn log_axis(title: &str) -> Axis {
    axis(title).type_(AxisType::Log)
}

fn colored_marker(colors: Vec<f64>) -> Marker {
    Marker::new()
        .size(3)
        .color_array(colors)
        .color_scale(ColorScale::Palette(ColorScalePalette::Viridis))
        .show_scale(true)
}

/// Distribution and spatial views of one exported field:
/// log|E| histogram, XY scatter, |E| against height, cumulative
/// distribution and a 3D point cloud
pub fn field_plots(record: &FieldRecord) -> Vec<(&'static str, Plot)> {
    let e_mag = record.e_mag.to_vec();
    let coord = |i: usize, axis: usize| record.coordinates[[i, axis]];
    let sample = stride_sample(e_mag.len(), MAX_SCATTER_POINTS);
    let x: Vec<f64> = sample.iter().map(|&i| coord(i, 0)).collect();
    let y: Vec<f64> = sample.iter().map(|&i| coord(i, 1)).collect();
    let z: Vec<f64> = sample.iter().map(|&i| coord(i, 2)).collect();
    let e_sample: Vec<f64> = sample.iter().map(|&i| e_mag[i]).collect();
    let log_sample: Vec<f64> = e_sample.iter().map(|e| (e + LOG_FLOOR).log10()).collect();
    let sampled = if sample.len() < e_mag.len() {
        format!(" ({} of {} points)", sample.len(), e_mag.len())
    } else {
        String::new()
    };

    let mut histogram = Plot::new();
    histogram.add_trace(
        Histogram::new(log_magnitudes(&e_mag))
            .name("log10 |E|")
            .n_bins_x(HISTOGRAM_BINS),
    );
    histogram.set_layout(
        Layout::new()
            .title(Title::with_text("Field magnitude distribution"))
            .x_axis(axis("log10 |E| [V/m]"))
            .y_axis(axis("Count")),
    );

    let mut xy = Plot::new();
    xy.add_trace(
        Scatter::new(x.clone(), y.clone())
            .mode(Mode::Markers)
            .name("log10 |E|")
            .marker(colored_marker(log_sample.clone())),
    );
    xy.set_layout(
        Layout::new()
            .title(Title::with_text(format!("Field in the XY plane{sampled}")))
            .x_axis(axis("X [m]"))
            .y_axis(axis("Y [m]")),
    );

    let mut height = Plot::new();
    height.add_trace(
        Scatter::new(z.clone(), e_sample)
            .mode(Mode::Markers)
            .name("|E|")
            .marker(Marker::new().size(2).opacity(0.6)),
    );
    height.set_layout(
        Layout::new()
            .title(Title::with_text(format!("Field magnitude against height{sampled}")))
            .x_axis(axis("Z (height) [m]"))
            .y_axis(log_axis("|E| [V/m]")),
    );

    let (sorted, prob) = cumulative_distribution(&e_mag);
    let mut cdf = Plot::new();
    cdf.add_trace(Scatter::new(sorted, prob).mode(Mode::Lines).name("CDF"));
    cdf.set_layout(
        Layout::new()
            .title(Title::with_text("Cumulative distribution of |E|"))
            .x_axis(log_axis("|E| [V/m]"))
            .y_axis(axis("Cumulative probability")),
    );

    let mut cloud = Plot::new();
    cloud.add_trace(
        Scatter3D::new(x, y, z)
            .mode(Mode::Markers)
            .name("log10 |E|")
            .marker(colored_marker(log_sample)),
    );
    cloud.set_layout(
        Layout::new()
            .title(Title::with_text(format!("3D field distribution{sampled}")))
            .width(1000)
            .height(800),
    );

    vec![
        ("field_histogram", histogram),
        ("field_xy", xy),
        ("field_height", height),
        ("field_cdf", cdf),
        ("field_3d", cloud),
    ]
}

/// |E| samples of one case in a comparison
#[derive(Debug, Clone)]
pub struct ComparedCase {
    pub name: String,
    pub e_mag: Array1<f64>,
}

impl ComparedCase {
    pub fn new(name: impl Into<String>, e_mag: Array1<f64>) -> Self {
        Self {
            name: name.into(),
            e_mag,
        }
    }
}

/// Overlaid densities, cumulative distributions, summary statistics and
/// point counts of several cases
pub fn comparison_plots(cases: &[ComparedCase]) -> Result<Vec<(&'static str, Plot)>> {
    if cases.is_empty() {
        return Err(TowerError::EmptySample);
    }
    let summaries = cases
        .iter()
        .map(|c| Ok(CaseSummary::from_statistics(&c.name, &field_statistics(&c.e_mag, None)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut histogram = Plot::new();
    let mut cdf = Plot::new();
    for case in cases {
        let values = case.e_mag.to_vec();
        histogram.add_trace(
            Histogram::new(log_magnitudes(&values))
                .name(case.name.as_str())
                .n_bins_x(HISTOGRAM_BINS)
                .hist_norm(HistNorm::ProbabilityDensity)
                .opacity(0.5),
        );
        let (sorted, prob) = cumulative_distribution(&values);
        cdf.add_trace(
            Scatter::new(sorted, prob)
                .mode(Mode::Lines)
                .name(case.name.as_str()),
        );
    }
    histogram.set_layout(
        Layout::new()
            .title(Title::with_text("Field magnitude distribution by case"))
            .bar_mode(BarMode::Overlay)
            .x_axis(axis("log10 |E| [V/m]"))
            .y_axis(axis("Probability density")),
    );
    cdf.set_layout(
        Layout::new()
            .title(Title::with_text("Cumulative distribution by case"))
            .x_axis(log_axis("|E| [V/m]"))
            .y_axis(axis("Cumulative probability")),
    );

    let labels = vec!["Min", "Mean", "Median", "P95", "Max"];
    let mut statistics = Plot::new();
    for s in &summaries {
        statistics.add_trace(
            Scatter::new(labels.clone(), vec![s.min, s.mean, s.median, s.p95, s.max])
                .mode(Mode::LinesMarkers)
                .name(s.name.as_str()),
        );
    }
    statistics.set_layout(
        Layout::new()
            .title(Title::with_text("Summary statistics by case"))
            .y_axis(log_axis("|E| [V/m]")),
    );

    let mut points = Plot::new();
    points.add_trace(
        Bar::new(
            summaries.iter().map(|s| s.name.clone()).collect(),
            summaries.iter().map(|s| s.count).collect(),
        )
        .name("Points"),
    );
    points.set_layout(
        Layout::new()
            .title(Title::with_text("Exported points by case"))
            .y_axis(axis("Points")),
    );

    Ok(vec![
        ("comparison_histogram", histogram),
        ("comparison_cdf", cdf),
        ("comparison_statistics", statistics),
        ("comparison_points", points),
    ])
}

/// Write `plot` as a standalone HTML page
pub fn write_plot(plot: &Plot, path: &Path) -> Result<()> {
    let inner = || -> std::result::Result<(), ExportError> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, plot.to_html())?;
        Ok(())
    };
    inner().map_err(|source| TowerError::Export {
        path: path.to_path_buf(),
        source,
    })
}

fn write_all(plots: Vec<(&'static str, Plot)>, dir: &Path) -> Result<Vec<PathBuf>> {
    plots
        .into_iter()
        .map(|(name, plot)| {
            let path = dir.join(format!("{name}.html"));
            write_plot(&plot, &path)?;
            log::info!("Wrote plot {}", path.display());
            Ok(path)
        })
        .collect()
}

/// Write the [`field_plots`] of `record` into `dir`
pub fn write_field_plots(record: &FieldRecord, dir: &Path) -> Result<Vec<PathBuf>> {
    write_all(field_plots(record), dir)
}

/// Write the [`comparison_plots`] of `cases` into `dir`
pub fn write_comparison_plots(cases: &[ComparedCase], dir: &Path) -> Result<Vec<PathBuf>> {
    write_all(comparison_plots(cases)?, dir)
}
