//! Parameter sweeps over independent runs
//!
//! Each case copies the base configuration, overrides the conductivity cap
//! and the Robin coefficient, and writes into its own sub-directory. Cases
//! run on a dedicated rayon pool so a sweep never saturates more than `jobs`
//! workers; the assembly inside each case still uses that same pool.

use crate::analysis::{CaseSummary, analyze_record, comparison_table};
use crate::config::RunConfig;
use crate::error::{Result, TowerError};
use crate::export::{read_archive, write_sidecar};
use crate::plots::ComparedCase;
use crate::simulation::{RunSummary, run_simulation};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Default number of cases solved concurrently
pub const DEFAULT_JOBS: usize = 3;

/// File name of the sweep summary inside the base output directory
pub const BATCH_SUMMARY_FILE: &str = "batch_summary.json";

/// One parameter set of a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCase {
    pub name: String,
    pub max_conductivity: f64,
    pub robin_coeff: f64,
}

impl BatchCase {
    pub fn new(name: impl Into<String>, max_conductivity: f64, robin_coeff: f64) -> Self {
        Self {
            name: name.into(),
            max_conductivity,
            robin_coeff,
        }
    }

    /// `base` with this case's overrides, writing to `{output_dir}/{name}`
    pub fn configure(&self, base: &RunConfig) -> RunConfig {
        RunConfig {
            output_dir: base.output_dir.join(&self.name),
            prefix: format!("case_{}", self.name),
            max_conductivity: self.max_conductivity,
            robin_coeff: self.robin_coeff,
            ..base.clone()
        }
    }
}

/// Conductivity levels, boundary strengths and one combined extreme
pub fn preset_cases() -> Vec<BatchCase> {
    vec![
        BatchCase::new("low_conductivity", 1000.0, 0.5),
        BatchCase::new("medium_conductivity", 15000.0, 0.5),
        BatchCase::new("high_conductivity", 35000.0, 0.5),
        BatchCase::new("weak_boundary", 35000.0, 0.1),
        BatchCase::new("strong_boundary", 35000.0, 1.0),
        BatchCase::new("extreme_case", 50000.0, 0.8),
    ]
}

/// Result of one case; failures are recorded, not propagated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub case: BatchCase,
    pub seconds: f64,
    pub run: Option<RunSummary>,
    pub statistics: Option<CaseSummary>,
    pub error: Option<String>,
}

impl CaseOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<CaseOutcome>,
    pub jobs: usize,
    pub total_seconds: f64,
}

impl BatchReport {
    pub fn successful(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| o.succeeded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        100.0 * self.successful().count() as f64 / self.outcomes.len() as f64
    }

    /// Comparison rows of the successful cases
    pub fn comparison(&self) -> Vec<CaseSummary> {
        self.outcomes
            .iter()
            .filter_map(|o| o.statistics.clone())
            .collect()
    }

    /// |E| of every successful case, read back from its archive
    pub fn compared_cases(&self) -> Result<Vec<ComparedCase>> {
        self.successful()
            .filter_map(|o| o.run.as_ref().map(|run| (&o.case.name, run)))
            .map(|(name, run)| {
                let record = read_archive(&run.files.archive)?;
                Ok(ComparedCase::new(name, record.e_mag))
            })
            .collect()
    }

    pub fn summary_path(output_dir: &Path) -> PathBuf {
        output_dir.join(BATCH_SUMMARY_FILE)
    }
}

fn validate_cases(cases: &[BatchCase], jobs: usize) -> Result<()> {
    if jobs == 0 {
        return Err(TowerError::InvalidConfig("jobs must be at least 1".to_string()));
    }
    if cases.is_empty() {
        return Err(TowerError::InvalidConfig("batch has no cases".to_string()));
    }
    let mut names = BTreeSet::new();
    for case in cases {
        if case.name.is_empty() || case.name.contains(['/', '\\']) || case.name.starts_with('.') {
            return Err(TowerError::InvalidConfig(format!(
                "case name {:?} is not a directory name",
                case.name
            )));
        }
        if !names.insert(case.name.as_str()) {
            return Err(TowerError::InvalidConfig(format!(
                "duplicate case name {:?}",
                case.name
            )));
        }
    }
    Ok(())
}

fn run_case(base: &RunConfig, case: &BatchCase) -> CaseOutcome {
    log::info!(
        "Case {}: max_conductivity {}, robin_coeff {}",
        case.name,
        case.max_conductivity,
        case.robin_coeff
    );
    let start = Instant::now();
    let config = case.configure(base);

    let result = run_simulation(&config).and_then(|run| {
        let record = read_archive(&run.files.archive)?;
        let stats = analyze_record(&record)?;
        Ok((run, CaseSummary::from_statistics(&case.name, &stats)))
    });
    let seconds = start.elapsed().as_secs_f64();

    match result {
        Ok((run, statistics)) => {
            log::info!("Case {} finished in {seconds:.1} s", case.name);
            CaseOutcome {
                case: case.clone(),
                seconds,
                run: Some(run),
                statistics: Some(statistics),
                error: None,
            }
        }
        Err(err) => {
            let chain = error_chain(&err);
            log::error!("Case {} failed: {chain}", case.name);
            CaseOutcome {
                case: case.clone(),
                seconds,
                run: None,
                statistics: None,
                error: Some(chain),
            }
        }
    }
}

fn error_chain(err: &TowerError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Run every case with at most `jobs` cases in flight and write the
/// sweep summary. Individual case failures do not fail the batch.
pub fn run_batch(base: &RunConfig, cases: &[BatchCase], jobs: usize) -> Result<BatchReport> {
    validate_cases(cases, jobs)?;
    base.validate()?;
    for case in cases {
        case.configure(base).validate()?;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| TowerError::InvalidConfig(format!("cannot start {jobs} workers: {e}")))?;

    log::info!("Running {} cases on {jobs} workers", cases.len());
    let start = Instant::now();
    let outcomes: Vec<CaseOutcome> =
        pool.install(|| cases.par_iter().map(|case| run_case(base, case)).collect());

    let report = BatchReport {
        outcomes,
        jobs,
        total_seconds: start.elapsed().as_secs_f64(),
    };
    write_sidecar(&report, &BatchReport::summary_path(&base.output_dir))?;
    Ok(report)
}

pub fn print_batch_summary(report: &BatchReport) {
    let ok = report.successful().count();
    println!("=== Batch Summary ===");
    println!("Succeeded: {ok}");
    println!("Failed:    {}", report.outcomes.len() - ok);
    println!("Success rate: {:.1}%", report.success_rate());
    println!("Total time: {:.1} s on {} workers", report.total_seconds, report.jobs);

    for outcome in report.failed() {
        println!(
            "  {}: {}",
            outcome.case.name,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }

    let rows = report.comparison();
    if !rows.is_empty() {
        println!();
        print!("{}", comparison_table(&rows));
        let points: usize = rows.iter().map(|r| r.count).sum();
        println!("\nTotal points: {points}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let cases = preset_cases();
        assert_eq!(cases.len(), 6);
        assert!(validate_cases(&cases, DEFAULT_JOBS).is_ok());
        let extreme = cases.iter().find(|c| c.name == "extreme_case").unwrap();
        assert_eq!(extreme.max_conductivity, 50000.0);
        assert_eq!(extreme.robin_coeff, 0.8);
        assert!(cases.iter().all(|c| c.max_conductivity > 0.0));
    }

    #[test]
    fn test_case_overrides() {
        let base = RunConfig {
            output_dir: PathBuf::from("sweep"),
            frequency: 60.0,
            ..Default::default()
        };
        let config = BatchCase::new("weak_boundary", 35000.0, 0.1).configure(&base);
        assert_eq!(config.output_dir, PathBuf::from("sweep/weak_boundary"));
        assert_eq!(config.prefix, "case_weak_boundary");
        assert_eq!(config.robin_coeff, 0.1);
        assert_eq!(config.frequency, 60.0);
        assert_eq!(config.mesh_file, base.mesh_file);
    }

    #[test]
    fn test_rejects_bad_batches() {
        let cases = preset_cases();
        assert!(validate_cases(&cases, 0).is_err());
        assert!(validate_cases(&[], 1).is_err());
        let dup = vec![BatchCase::new("a", 1.0, 0.5), BatchCase::new("a", 2.0, 0.5)];
        assert!(validate_cases(&dup, 1).is_err());
        assert!(validate_cases(&[BatchCase::new("../x", 1.0, 0.5)], 1).is_err());
    }

    #[test]
    fn test_invalid_case_stops_before_any_run() {
        let dir = tempfile::tempdir().unwrap();
        let base = RunConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let cases = [BatchCase::new("bad", -5.0, 0.5)];
        assert!(matches!(
            run_batch(&base, &cases, 1),
            Err(TowerError::InvalidConfig(_))
        ));
        assert!(!BatchReport::summary_path(dir.path()).exists());
    }

    #[test]
    fn test_failed_cases_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let base = RunConfig {
            mesh_file: dir.path().join("missing.msh"),
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        let cases = [BatchCase::new("a", 1000.0, 0.5), BatchCase::new("b", 2000.0, 0.5)];
        let report = run_batch(&base, &cases, 2).unwrap();
        assert_eq!(report.failed().count(), 2);
        assert_eq!(report.success_rate(), 0.0);
        assert!(report.outcomes[0].error.as_deref().unwrap().contains("missing.msh"));
        assert!(BatchReport::summary_path(&base.output_dir).exists());
        assert!(report.compared_cases().unwrap().is_empty());
    }
}
