use crate::fetch::{FetchOptions, PageFetcher};
use crate::model::{MemberRecord, ScrapeReport};
use crate::parser::parse_members_page;
use crate::store::save_members;
use crate::wikidata::WikidataIndex;
use anyhow::{Context, Result};
use scraper::Html;
use std::path::PathBuf;
use tracing::{info, warn};

/// Member list of the 19th Bundestag, the page this scraper targets.
pub const MEMBERS_URL: &str =
    "https://de.wikipedia.org/wiki/Liste_der_Mitglieder_des_Deutschen_Bundestages_(19._Wahlperiode)";

/// MediaWiki API endpoint used to resolve linked article titles.
pub const WIKIPEDIA_API_URL: &str = "https://de.wikipedia.org/w/api.php";

/// Set in the environment to print every filtered record to stdout.
pub const DEBUG_ENV: &str = "ROSTER_DEBUG";

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub url: String,
    pub cache_dir: PathBuf,
    pub db_path: PathBuf,
    /// MediaWiki API endpoint for identifier annotation. `None` skips the
    /// API round trip; anchors then only resolve through explicit
    /// `data-wikidata` attributes (pre-annotated documents, fixtures).
    pub api_endpoint: Option<String>,
}

/// One full batch run: fetch, annotate, parse, emit, persist.
pub fn run_scrape(options: &ScrapeOptions) -> Result<ScrapeReport> {
    info!(url = %options.url, "scrape start");

    let fetcher = PageFetcher::new(&FetchOptions {
        cache_dir: options.cache_dir.clone(),
        ..FetchOptions::default()
    })?;
    let body = fetcher
        .fetch(&options.url)
        .with_context(|| format!("fetch failed for {}", options.url))?;

    let doc = Html::parse_document(&body);

    let links = match options.api_endpoint.as_deref() {
        Some(endpoint) => WikidataIndex::annotate(&doc, endpoint)
            .with_context(|| format!("identifier annotation failed for {}", options.url))?,
        None => WikidataIndex::empty(),
    };

    let mut members = parse_members_page(&doc, &links)
        .with_context(|| format!("roster parse failed for {}", options.url))?;

    // every emitted record must carry a name
    let parsed = members.len();
    members.retain(|member| !member.name.is_empty());
    if members.len() < parsed {
        warn!(
            skipped = parsed - members.len(),
            "roster rows without a member name skipped"
        );
    }

    emit_members(&members)?;

    let saved = save_members(&options.db_path, &members).context("failed to persist roster")?;

    let resolved = members.iter().filter(|m| m.faction.is_some()).count();
    let report = ScrapeReport {
        rows_parsed: members.len(),
        resolved,
        unresolved: members.len() - resolved,
        saved,
    };

    info!(
        rows = report.rows_parsed,
        resolved = report.resolved,
        unresolved = report.unresolved,
        "scrape complete"
    );

    Ok(report)
}

/// Diagnostic output only: one sorted-key JSON object per record, printed
/// when the debug flag is present in the environment.
fn emit_members(members: &[MemberRecord]) -> Result<()> {
    if std::env::var_os(DEBUG_ENV).is_none() {
        return Ok(());
    }

    for member in members {
        println!("{}", serde_json::to_string(&member.to_row())?);
    }

    Ok(())
}
