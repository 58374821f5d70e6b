use serde::Serialize;
use std::collections::BTreeMap;

/// Legislative term the scraped page covers.
pub const TERM: u32 = 19;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberRecord {
    pub name: String,
    pub sort_name: String,
    pub wikidata: Option<String>,
    pub birth_year: String,
    pub party: String,
    pub faction: Option<String>,
    pub faction_wikidata: Option<String>,
    pub area: String,
    pub constituency: String,
    pub constituency_wikidata: Option<String>,
    pub term: u32,
}

impl MemberRecord {
    /// Output form of the record: sorted keys, empty values dropped.
    /// `term` is always present.
    pub fn to_row(&self) -> BTreeMap<&'static str, String> {
        let mut row = BTreeMap::new();
        put(&mut row, "name", &self.name);
        put(&mut row, "sort_name", &self.sort_name);
        put(&mut row, "wikidata", self.wikidata.as_deref().unwrap_or(""));
        put(&mut row, "birth_year", &self.birth_year);
        put(&mut row, "party", &self.party);
        put(&mut row, "faction", self.faction.as_deref().unwrap_or(""));
        put(
            &mut row,
            "faction_wikidata",
            self.faction_wikidata.as_deref().unwrap_or(""),
        );
        put(&mut row, "area", &self.area);
        put(&mut row, "constituency", &self.constituency);
        put(
            &mut row,
            "constituency_wikidata",
            self.constituency_wikidata.as_deref().unwrap_or(""),
        );
        row.insert("term", self.term.to_string());
        row
    }
}

fn put(row: &mut BTreeMap<&'static str, String>, key: &'static str, value: &str) {
    let trimmed = value.trim();
    if !trimmed.is_empty() {
        row.insert(key, trimmed.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactionEntry {
    pub colour: String,
    pub name: String,
    pub wikidata: Option<String>,
}

/// Colour-keyed faction lookup built from the legend table. Keys are
/// canonicalized so `#fff`, `#FFF` and `#FFFFFF` all address the same entry;
/// duplicate colours overwrite (last wins).
#[derive(Debug, Clone, Default)]
pub struct FactionLegend {
    entries: BTreeMap<String, FactionEntry>,
}

impl FactionLegend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: FactionEntry) {
        self.entries.insert(normalize_colour(&entry.colour), entry);
    }

    pub fn get(&self, colour: &str) -> Option<&FactionEntry> {
        self.entries.get(&normalize_colour(colour))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical form of a hex colour token: no leading `#`, uppercase,
/// 3-digit shorthand expanded to 6 digits.
pub fn normalize_colour(raw: &str) -> String {
    let token = raw.trim().trim_start_matches('#').to_ascii_uppercase();
    if token.len() == 3 && token.chars().all(|c| c.is_ascii_hexdigit()) {
        let mut expanded = String::with_capacity(6);
        for c in token.chars() {
            expanded.push(c);
            expanded.push(c);
        }
        return expanded;
    }
    token
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeReport {
    pub rows_parsed: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub saved: usize,
}
