use bundesroster::model::{FactionEntry, FactionLegend, MemberRecord, TERM, normalize_colour};
use bundesroster::parser::{
    extract_hex_colour, parse_faction_legend, parse_member_row, resolve_affiliation,
};
use bundesroster::wikidata::{WikidataIndex, article_title};
use scraper::{ElementRef, Html, Selector};

#[test]
fn colour_extractor_returns_first_terminated_hex_token() {
    assert_eq!(
        extract_hex_colour("background-color:#FF0000;"),
        Some("FF0000".to_string())
    );
    assert_eq!(
        extract_hex_colour("border:1px solid; background-color:#aabb00; color:#000000;"),
        Some("aabb00".to_string())
    );
    assert_eq!(extract_hex_colour("#fff;"), Some("fff".to_string()));

    assert_eq!(extract_hex_colour("background-color:FF0000;"), None);
    assert_eq!(extract_hex_colour("background-color:#FF0000"), None);
    assert_eq!(extract_hex_colour("width:10px;"), None);
    assert_eq!(extract_hex_colour(""), None);
}

#[test]
fn colour_normalization_is_case_and_shorthand_insensitive() {
    assert_eq!(normalize_colour("#fff"), "FFFFFF");
    assert_eq!(normalize_colour("FE0"), "FFEE00");
    assert_eq!(normalize_colour("#e3000f"), "E3000F");
    assert_eq!(normalize_colour("E3000F"), "E3000F");

    let mut legend = FactionLegend::new();
    legend.insert(FactionEntry {
        colour: "FE0".to_string(),
        name: "FDP-Fraktion".to_string(),
        wikidata: None,
    });

    assert!(legend.get("FFEE00").is_some());
    assert!(legend.get("#ffee00").is_some());
    assert!(legend.get("123456").is_none());
}

#[test]
fn legend_rows_without_parseable_colour_are_skipped() {
    let doc = Html::parse_fragment(
        r#"<table>
            <tr><th>Fraktion (Vorsitzende)</th><th>Farbe</th></tr>
            <tr><td><a href="/wiki/SPD-Bundestagsfraktion" data-wikidata="Q2207512">SPD-Fraktion</a></td>
                <td style="background-color:#E3000F;"></td></tr>
            <tr><td>Fraktionslos</td><td></td></tr>
            <tr><td>Kaputt</td><td style="background-color:red;"></td></tr>
        </table>"#,
    );

    let legend = parse_faction_legend(first_table(&doc), &WikidataIndex::empty());

    assert_eq!(legend.len(), 1);
    let entry = legend.get("E3000F").expect("SPD entry must be present");
    assert_eq!(entry.name, "SPD-Fraktion");
    assert_eq!(entry.wikidata.as_deref(), Some("Q2207512"));
}

#[test]
fn duplicate_legend_colours_overwrite() {
    let mut legend = FactionLegend::new();
    legend.insert(FactionEntry {
        colour: "000000".to_string(),
        name: "Alt".to_string(),
        wikidata: None,
    });
    legend.insert(FactionEntry {
        colour: "#000000".to_string(),
        name: "Neu".to_string(),
        wikidata: Some("Q1".to_string()),
    });

    assert_eq!(legend.len(), 1);
    assert_eq!(legend.get("000000").map(|e| e.name.as_str()), Some("Neu"));
}

#[test]
fn member_row_without_anchors_degrades_to_empty_fields() {
    let doc = Html::parse_fragment(
        r#"<table><tr>
            <td>7</td>
            <td>Erika Beispiel</td>
            <td>1970</td>
            <td style="background-color:#112233;">XYZ</td>
            <td>Bayern</td>
            <td>Landesliste</td>
        </tr></table>"#,
    );

    let parsed = parse_member_row(first_data_row(&doc), &WikidataIndex::empty());

    assert_eq!(parsed.record.name, "Erika Beispiel");
    assert_eq!(parsed.record.sort_name, "");
    assert_eq!(parsed.record.wikidata, None);
    assert_eq!(parsed.record.party, "XYZ");
    assert_eq!(parsed.record.constituency, "Landesliste");
    assert_eq!(parsed.record.constituency_wikidata, None);
    assert_eq!(parsed.record.term, TERM);
    assert_eq!(parsed.faction_colour.as_deref(), Some("112233"));
}

#[test]
fn short_member_row_does_not_panic() {
    let doc = Html::parse_fragment(r#"<table><tr><td>1</td><td>Nur Name</td></tr></table>"#);

    let parsed = parse_member_row(first_data_row(&doc), &WikidataIndex::empty());

    assert_eq!(parsed.record.name, "Nur Name");
    assert_eq!(parsed.record.birth_year, "");
    assert_eq!(parsed.record.area, "");
    assert_eq!(parsed.faction_colour, None);
}

#[test]
fn sort_name_uses_first_sort_value_attribute() {
    let doc = Html::parse_fragment(
        r#"<table><tr>
            <td>1</td>
            <td data-sort-value="Beispiel, Erika">Erika Beispiel</td>
            <td>1970</td>
        </tr></table>"#,
    );

    let parsed = parse_member_row(first_data_row(&doc), &WikidataIndex::empty());
    assert_eq!(parsed.record.sort_name, "Beispiel, Erika");
}

#[test]
fn unresolved_colour_leaves_affiliation_empty() {
    let doc = Html::parse_fragment(
        r#"<table><tr>
            <td>1</td><td>Erika Beispiel</td><td>1970</td>
            <td style="background-color:#123456;">XYZ</td>
            <td>Bayern</td><td>Landesliste</td>
        </tr></table>"#,
    );

    let mut legend = FactionLegend::new();
    legend.insert(FactionEntry {
        colour: "E3000F".to_string(),
        name: "SPD-Fraktion".to_string(),
        wikidata: Some("Q2207512".to_string()),
    });

    let parsed = parse_member_row(first_data_row(&doc), &WikidataIndex::empty());
    let record = resolve_affiliation(parsed, &legend);

    assert_eq!(record.faction, None);
    assert_eq!(record.faction_wikidata, None);
}

#[test]
fn resolved_colour_attaches_faction_fields() {
    let doc = Html::parse_fragment(
        r#"<table><tr>
            <td>1</td><td>Erika Beispiel</td><td>1970</td>
            <td style="background-color:#E3000F;">SPD</td>
            <td>Bayern</td><td>Landesliste</td>
        </tr></table>"#,
    );

    let mut legend = FactionLegend::new();
    legend.insert(FactionEntry {
        colour: "E3000F".to_string(),
        name: "SPD-Fraktion".to_string(),
        wikidata: Some("Q2207512".to_string()),
    });

    let parsed = parse_member_row(first_data_row(&doc), &WikidataIndex::empty());
    let record = resolve_affiliation(parsed, &legend);

    assert_eq!(record.faction.as_deref(), Some("SPD-Fraktion"));
    assert_eq!(record.faction_wikidata.as_deref(), Some("Q2207512"));
}

#[test]
fn output_row_drops_empty_fields_but_keeps_name_and_term() {
    let record = MemberRecord {
        name: "Erika Beispiel".to_string(),
        term: TERM,
        ..MemberRecord::default()
    };

    let row = record.to_row();
    assert_eq!(
        row.keys().copied().collect::<Vec<_>>(),
        vec!["name", "term"]
    );
    assert_eq!(row.get("term").map(String::as_str), Some("19"));

    let full = MemberRecord {
        name: "Erika Beispiel".to_string(),
        sort_name: "Beispiel, Erika".to_string(),
        wikidata: Some("Q1".to_string()),
        birth_year: "1970".to_string(),
        party: "SPD".to_string(),
        faction: Some("SPD-Fraktion".to_string()),
        faction_wikidata: Some("Q2207512".to_string()),
        area: "Bayern".to_string(),
        constituency: "Landesliste".to_string(),
        constituency_wikidata: None,
        term: TERM,
    };

    let row = full.to_row();
    assert!(!row.contains_key("constituency_wikidata"));
    assert!(row.values().all(|v| !v.is_empty()));
}

#[test]
fn article_titles_exclude_namespaces_and_fragments() {
    assert_eq!(
        article_title("/wiki/Angela_Merkel"),
        Some("Angela Merkel".to_string())
    );
    assert_eq!(
        article_title("https://de.wikipedia.org/wiki/Olaf_Scholz"),
        Some("Olaf Scholz".to_string())
    );
    assert_eq!(
        article_title("/wiki/Petra_Pau#Leben"),
        Some("Petra Pau".to_string())
    );
    assert_eq!(
        article_title("/wiki/Bundestagswahlkreis_Vorpommern-R%C3%BCgen"),
        Some("Bundestagswahlkreis Vorpommern-Rügen".to_string())
    );

    assert_eq!(article_title("/wiki/Spezial:Linkliste"), None);
    assert_eq!(article_title("/wiki/Datei:Foo.jpg"), None);
    assert_eq!(article_title("#cite_note-3"), None);
    assert_eq!(article_title("/w/index.php?title=Foo"), None);
}

#[test]
fn anchor_attribute_wins_over_title_index() {
    let doc = Html::parse_fragment(
        r#"<p>
            <a id="attr" href="/wiki/Foo" data-wikidata="Q1">Foo</a>
            <a id="title" href="/wiki/Foo">Foo</a>
            <a id="none" href="/wiki/Spezial:Bar">Bar</a>
        </p>"#,
    );

    let index = WikidataIndex::from_pairs([("Foo".to_string(), "Q2".to_string())]);

    assert_eq!(anchor_id(&doc, "attr", &index).as_deref(), Some("Q1"));
    assert_eq!(anchor_id(&doc, "title", &index).as_deref(), Some("Q2"));
    assert_eq!(anchor_id(&doc, "none", &index), None);
}

fn first_table(doc: &Html) -> ElementRef<'_> {
    let sel = Selector::parse("table").expect("table selector must parse");
    doc.select(&sel).next().expect("fragment must contain a table")
}

fn first_data_row(doc: &Html) -> ElementRef<'_> {
    let sel = Selector::parse("tr").expect("tr selector must parse");
    let td_sel = Selector::parse("td").expect("td selector must parse");
    doc.select(&sel)
        .find(|row| row.select(&td_sel).next().is_some())
        .expect("fragment must contain a data row")
}

fn anchor_id(doc: &Html, id: &str, index: &WikidataIndex) -> Option<String> {
    let sel = Selector::parse(&format!("a#{id}")).expect("anchor selector must parse");
    let anchor = doc.select(&sel).next().expect("anchor must exist");
    index.id_for_anchor(anchor)
}
