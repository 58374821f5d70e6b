use anyhow::{Context, Result, bail};
use percent_encoding::percent_decode_str;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const PAGEPROPS_BATCH: usize = 50;

/// Maps article titles linked from one document to their Wikidata
/// Q-identifiers. Built once per page before any table parsing, so the
/// parsers only ever perform read-only lookups.
#[derive(Debug, Clone, Default)]
pub struct WikidataIndex {
    by_title: BTreeMap<String, String>,
}

impl WikidataIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            by_title: pairs.into_iter().collect(),
        }
    }

    /// Builds the index for `doc` by querying the MediaWiki pageprops API
    /// for every article link on the page, in batches. Titles the API
    /// cannot resolve are simply absent from the index.
    pub fn annotate(doc: &Html, api_endpoint: &str) -> Result<Self> {
        let titles = collect_article_titles(doc);
        if titles.is_empty() {
            return Ok(Self::empty());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .context("failed to build pageprops client")?;

        let mut by_title = BTreeMap::new();
        for chunk in titles.chunks(PAGEPROPS_BATCH) {
            resolve_batch(&client, api_endpoint, chunk, &mut by_title)
                .with_context(|| format!("pageprops query failed against {api_endpoint}"))?;
        }

        info!(
            links = titles.len(),
            resolved = by_title.len(),
            "wikidata identifiers resolved"
        );

        Ok(Self { by_title })
    }

    /// Identifier for one anchor. An explicit `data-wikidata` attribute on
    /// the anchor wins; otherwise the link target's title is looked up.
    pub fn id_for_anchor(&self, anchor: ElementRef<'_>) -> Option<String> {
        if let Some(id) = anchor.value().attr("data-wikidata") {
            let id = id.trim();
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }

        let href = anchor.value().attr("href")?;
        let title = article_title(href)?;
        self.by_title.get(&title).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }
}

fn resolve_batch(
    client: &Client,
    api_endpoint: &str,
    titles: &[String],
    by_title: &mut BTreeMap<String, String>,
) -> Result<()> {
    let joined = titles.join("|");
    let response = client
        .get(api_endpoint)
        .query(&[
            ("action", "query"),
            ("prop", "pageprops"),
            ("ppprop", "wikibase_item"),
            ("redirects", "1"),
            ("format", "json"),
            ("formatversion", "2"),
            ("titles", joined.as_str()),
        ])
        .send()?;

    if !response.status().is_success() {
        bail!("pageprops query returned {}", response.status());
    }

    let payload: Value = response.json().context("failed to decode pageprops JSON")?;
    let query = payload.get("query").cloned().unwrap_or(Value::Null);

    // The API reports title rewrites (normalization, redirects) separately
    // from the pages themselves; follow them so each requested title maps to
    // the title the page entry carries.
    let mut renames: BTreeMap<String, String> = BTreeMap::new();
    for key in ["normalized", "redirects"] {
        if let Some(items) = query.get(key).and_then(Value::as_array) {
            for item in items {
                if let (Some(from), Some(to)) = (
                    item.get("from").and_then(Value::as_str),
                    item.get("to").and_then(Value::as_str),
                ) {
                    renames.insert(from.to_string(), to.to_string());
                }
            }
        }
    }

    let mut qids: BTreeMap<String, String> = BTreeMap::new();
    if let Some(pages) = query.get("pages").and_then(Value::as_array) {
        for page in pages {
            let Some(title) = page.get("title").and_then(Value::as_str) else {
                continue;
            };
            let Some(item) = page
                .get("pageprops")
                .and_then(|props| props.get("wikibase_item"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            qids.insert(title.to_string(), item.to_string());
        }
    }

    for title in titles {
        let final_title = follow_renames(title, &renames);
        if let Some(qid) = qids.get(&final_title) {
            by_title.insert(title.clone(), qid.clone());
        } else {
            debug!(title = %title, "no wikidata item for linked title");
        }
    }

    Ok(())
}

fn follow_renames(title: &str, renames: &BTreeMap<String, String>) -> String {
    let mut current = title.to_string();
    // normalization then at most one redirect; the bound guards against cycles
    for _ in 0..4 {
        match renames.get(&current) {
            Some(next) => current = next.clone(),
            None => break,
        }
    }
    current
}

fn collect_article_titles(doc: &Html) -> Vec<String> {
    let anchor_sel = Selector::parse("a[href]").expect("anchor selector must parse");

    let mut seen = HashSet::new();
    let mut titles = Vec::new();
    for anchor in doc.select(&anchor_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(title) = article_title(href) else {
            continue;
        };
        if seen.insert(title.clone()) {
            titles.push(title);
        }
    }
    titles
}

/// Canonical article title of a wiki link, or `None` for anything that is
/// not a plain article link (namespaces, fragments-only, external sites
/// without a /wiki/ path).
pub fn article_title(href: &str) -> Option<String> {
    let path = if href.starts_with("http://") || href.starts_with("https://") {
        let url = Url::parse(href).ok()?;
        url.path().to_string()
    } else {
        href.split('#').next().unwrap_or_default().to_string()
    };

    let raw = path.split('#').next().unwrap_or_default();
    let raw = raw.strip_prefix("/wiki/")?;
    if raw.is_empty() || raw.contains(':') || raw.contains('|') {
        return None;
    }

    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    Some(decoded.replace('_', " "))
}
