use crate::model::{FactionEntry, FactionLegend, MemberRecord, TERM};
use crate::wikidata::WikidataIndex;
use anyhow::{Result, bail};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

/// Header marker texts identifying the two tables on the page.
pub const LEGEND_HEADER_MARKER: &str = "Vorsitzende";
pub const ROSTER_HEADER_MARKER: &str = "Mitglied";

// Fixed column layout of the roster table. Layout drift on the source page
// is a one-place change here.
const COL_NAME: usize = 1;
const COL_BIRTH_YEAR: usize = 2;
const COL_FACTION: usize = 3;
const COL_AREA: usize = 4;
const COL_CONSTITUENCY: usize = 5;

const LEGEND_COL_NAME: usize = 0;
const LEGEND_COL_SWATCH: usize = 1;

/// One roster row after field extraction. The faction is still only a
/// colour at this point; resolution against the legend is a separate step.
#[derive(Debug, Clone)]
pub struct ParsedMemberRow {
    pub record: MemberRecord,
    pub faction_colour: Option<String>,
}

/// Parses the whole members page: locates the legend and roster tables,
/// builds the faction legend once, then extracts and resolves every member
/// row in document order.
pub fn parse_members_page(doc: &Html, links: &WikidataIndex) -> Result<Vec<MemberRecord>> {
    let Some(legend_table) = find_table_with_header(doc, LEGEND_HEADER_MARKER) else {
        bail!("no table with a header cell containing {LEGEND_HEADER_MARKER:?}");
    };
    let Some(roster_table) = find_table_with_header(doc, ROSTER_HEADER_MARKER) else {
        bail!("no table with a header cell containing {ROSTER_HEADER_MARKER:?}");
    };

    let legend = parse_faction_legend(legend_table, links);
    info!(factions = legend.len(), "faction legend built");

    let tr_sel = Selector::parse("tr").expect("tr selector must parse");
    let mut members = Vec::new();
    for row in roster_table.select(&tr_sel) {
        if row_cells(row).is_empty() {
            continue;
        }
        let parsed = parse_member_row(row, links);
        members.push(resolve_affiliation(parsed, &legend));
    }

    Ok(members)
}

/// First table whose header cells contain `marker`.
fn find_table_with_header<'a>(doc: &'a Html, marker: &str) -> Option<ElementRef<'a>> {
    let table_sel = Selector::parse("table").expect("table selector must parse");
    let th_sel = Selector::parse("th").expect("th selector must parse");

    doc.select(&table_sel)
        .find(|table| table.select(&th_sel).any(|th| cell_text(th).contains(marker)))
}

/// Builds the colour → faction mapping from the legend table. Rows without
/// a parseable swatch colour are skipped and never populate the map.
pub fn parse_faction_legend(table: ElementRef<'_>, links: &WikidataIndex) -> FactionLegend {
    let tr_sel = Selector::parse("tr").expect("tr selector must parse");

    let mut legend = FactionLegend::new();
    for row in table.select(&tr_sel) {
        let tds = row_cells(row);
        if tds.is_empty() {
            continue;
        }

        let Some(colour) = tds.get(LEGEND_COL_SWATCH).copied().and_then(style_colour) else {
            debug!("legend row without parseable swatch colour; skipped");
            continue;
        };

        legend.insert(FactionEntry {
            colour,
            name: indexed_cell_text(&tds, LEGEND_COL_NAME),
            wikidata: cell_link_id(&tds, LEGEND_COL_NAME, links),
        });
    }
    legend
}

/// Extracts one roster row by fixed column position. Short rows and cells
/// without anchors degrade to empty fields, never an error.
pub fn parse_member_row(row: ElementRef<'_>, links: &WikidataIndex) -> ParsedMemberRow {
    let tds = row_cells(row);

    let record = MemberRecord {
        name: indexed_cell_text(&tds, COL_NAME),
        sort_name: sort_key(&tds),
        wikidata: cell_link_id(&tds, COL_NAME, links),
        birth_year: indexed_cell_text(&tds, COL_BIRTH_YEAR),
        party: indexed_cell_text(&tds, COL_FACTION),
        faction: None,
        faction_wikidata: None,
        area: indexed_cell_text(&tds, COL_AREA),
        constituency: indexed_cell_text(&tds, COL_CONSTITUENCY),
        constituency_wikidata: cell_link_id(&tds, COL_CONSTITUENCY, links),
        term: TERM,
    };

    let faction_colour = tds.get(COL_FACTION).copied().and_then(style_colour);

    ParsedMemberRow {
        record,
        faction_colour,
    }
}

/// Joins a parsed row against the legend. A colour the legend does not know
/// leaves the faction fields empty; the colour itself is consumed here and
/// never appears in output.
pub fn resolve_affiliation(row: ParsedMemberRow, legend: &FactionLegend) -> MemberRecord {
    let mut record = row.record;

    if let Some(colour) = row.faction_colour {
        match legend.get(&colour) {
            Some(entry) => {
                record.faction = Some(entry.name.clone());
                record.faction_wikidata = entry.wikidata.clone();
            }
            None => {
                debug!(%colour, member = %record.name, "faction colour not in legend");
            }
        }
    }

    record
}

/// First hex colour token in a CSS style attribute: the digits between `#`
/// and `;`. `None` when the attribute is missing or has no such token.
pub fn style_colour(el: ElementRef<'_>) -> Option<String> {
    el.value().attr("style").and_then(extract_hex_colour)
}

pub fn extract_hex_colour(style: &str) -> Option<String> {
    let re = Regex::new(r"#([0-9A-Fa-f]+);").expect("colour regex must compile");
    re.captures(style)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let td_sel = Selector::parse("td").expect("td selector must parse");
    row.select(&td_sel).collect()
}

/// First `data-sort-value` attribute among the row's cells.
fn sort_key(tds: &[ElementRef<'_>]) -> String {
    tds.iter()
        .find_map(|td| td.value().attr("data-sort-value"))
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn indexed_cell_text(tds: &[ElementRef<'_>], index: usize) -> String {
    tds.get(index).map(|td| cell_text(*td)).unwrap_or_default()
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identifier carried by the first anchor within the indexed cell.
fn cell_link_id(
    tds: &[ElementRef<'_>],
    index: usize,
    links: &WikidataIndex,
) -> Option<String> {
    let a_sel = Selector::parse("a").expect("anchor selector must parse");
    let cell = tds.get(index)?;
    let anchor = cell.select(&a_sel).next()?;
    links.id_for_anchor(anchor)
}
