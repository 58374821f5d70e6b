use crate::model::MemberRecord;
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::path::Path;
use tracing::{debug, info};

/// Destination table. Prior contents are fully replaced on every save.
pub const TABLE: &str = "data";

/// Persists the roster, replacing whatever a previous run left behind.
/// Uniqueness key is `(name, wikidata)`; records are inserted in list order.
pub fn save_members(db_path: &Path, members: &[MemberRecord]) -> Result<usize> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create db directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    // The table may not exist yet on a fresh database; that is fine.
    if let Err(err) = conn.execute(&format!("DROP TABLE {TABLE}"), []) {
        debug!(error = %err, "drop of previous table skipped");
    }

    conn.execute(
        &format!(
            "CREATE TABLE {TABLE} (
                name TEXT NOT NULL,
                sort_name TEXT,
                wikidata TEXT,
                birth_year TEXT,
                party TEXT,
                faction TEXT,
                faction_wikidata TEXT,
                area TEXT,
                constituency TEXT,
                constituency_wikidata TEXT,
                term INTEGER NOT NULL
            )"
        ),
        [],
    )
    .context("failed to create roster table")?;
    conn.execute(
        &format!("CREATE UNIQUE INDEX {TABLE}_name_wikidata ON {TABLE} (name, wikidata)"),
        [],
    )
    .context("failed to create uniqueness index")?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT OR REPLACE INTO {TABLE} (
                name, sort_name, wikidata, birth_year, party, faction,
                faction_wikidata, area, constituency, constituency_wikidata, term
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ))?;

        for member in members {
            let row = member.to_row();
            stmt.execute(params![
                row.get("name"),
                row.get("sort_name"),
                row.get("wikidata"),
                row.get("birth_year"),
                row.get("party"),
                row.get("faction"),
                row.get("faction_wikidata"),
                row.get("area"),
                row.get("constituency"),
                row.get("constituency_wikidata"),
                member.term,
            ])?;
        }
    }
    tx.commit().context("failed to commit roster insert")?;

    info!(
        rows = members.len(),
        db = %db_path.display(),
        "roster saved"
    );

    Ok(members.len())
}

/// All persisted rows, ordered by the uniqueness key. Used by the harness
/// to compare runs.
pub fn load_rows(db_path: &Path) -> Result<Vec<Vec<Option<String>>>> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    let mut stmt = conn.prepare(&format!(
        "SELECT name, sort_name, wikidata, birth_year, party, faction,
                faction_wikidata, area, constituency, constituency_wikidata,
                CAST(term AS TEXT)
         FROM {TABLE}
         ORDER BY name, wikidata"
    ))?;

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(11);
        for idx in 0..11 {
            values.push(row.get::<_, Option<String>>(idx)?);
        }
        rows.push(values);
    }

    Ok(rows)
}
