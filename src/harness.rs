use crate::fetch::file_url;
use crate::pipeline::{ScrapeOptions, run_scrape};
use crate::store::load_rows;
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub page_path: PathBuf,
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub first_run_rows: usize,
    pub second_run_rows: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub db_rows: usize,
    pub identical_runs: bool,
}

/// Runs the full pipeline twice against a local page snapshot and checks
/// that the persisted output is stable across runs.
pub fn run_harness(options: &HarnessOptions) -> Result<HarnessReport> {
    if options.work_dir.exists() {
        std::fs::remove_dir_all(&options.work_dir)?;
    }

    let scrape_options = ScrapeOptions {
        url: file_url(&options.page_path),
        cache_dir: options.work_dir.join("cache"),
        db_path: options.work_dir.join("roster.sqlite"),
        api_endpoint: None,
    };

    let first = run_scrape(&scrape_options)?;
    let first_rows = load_rows(&scrape_options.db_path)?;

    let second = run_scrape(&scrape_options)?;
    let second_rows = load_rows(&scrape_options.db_path)?;

    Ok(HarnessReport {
        first_run_rows: first.rows_parsed,
        second_run_rows: second.rows_parsed,
        resolved: second.resolved,
        unresolved: second.unresolved,
        db_rows: second_rows.len(),
        identical_runs: first_rows == second_rows,
    })
}
