use crate::error::BitterError;
use csv::StringRecord;
use itertools::Itertools;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// Paths to the three source files consumed by a rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFiles {
    pub receptors: String,
    pub compounds: String,
    pub ligands: String,
}

/// Row counts reported by a completed rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildSummary {
    pub receptors_imported: usize,
    pub receptors_retained: usize,
    pub compounds_imported: usize,
    pub ligands_imported: usize,
}

// Source field names, fixed by the upstream export format.
const RECEPTOR_FIELDS: [&str; 3] = ["rID", "rName", "DisplayName"];
const COMPOUND_FIELDS: [&str; 3] = ["cID", "cName", "order"];
const LIGAND_FIELDS: [&str; 2] = ["cID", "rID"];

struct ReceptorRow {
    id: i64,
    name: String,
    display_name: String,
}

struct CompoundRow {
    id: i64,
    name: String,
    ord: String,
}

struct LigandRow {
    compound_id: i64,
    receptor_id: i64,
}

/// Replaces all three tables from the source files. Every file is read and
/// validated before the database is touched, then each table is dropped,
/// recreated and filled inside its own transaction. The receptors table is
/// additionally purged of rows where neither name nor display name starts
/// with "h" (non-human orthologs).
pub(crate) fn rebuild_all(
    conn: &mut Connection,
    sources: &SourceFiles,
) -> Result<RebuildSummary, BitterError> {
    let receptors = read_receptors(&sources.receptors)?;
    let compounds = read_compounds(&sources.compounds)?;
    validate_compounds(&compounds, &sources.compounds)?;
    let ligands = read_ligands(&sources.ligands)?;

    let receptors_imported = receptors.len();
    let receptors_retained = replace_receptors(conn, &receptors)?;
    replace_compounds(conn, &compounds)?;
    replace_ligands(conn, &ligands)?;

    Ok(RebuildSummary {
        receptors_imported,
        receptors_retained,
        compounds_imported: compounds.len(),
        ligands_imported: ligands.len(),
    })
}

fn source_reader(path: &str) -> Result<csv::Reader<std::fs::File>, BitterError> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| BitterError::import(format!("Could not open source file '{path}': {e}")))
}

fn field_positions(
    headers: &StringRecord,
    fields: &[&str],
    path: &str,
) -> Result<Vec<usize>, BitterError> {
    fields
        .iter()
        .map(|field| {
            headers.iter().position(|h| h == *field).ok_or_else(|| {
                BitterError::import(format!(
                    "Source file '{path}' is missing the '{field}' field"
                ))
            })
        })
        .collect()
}

fn field<'r>(
    record: &'r StringRecord,
    position: usize,
    name: &str,
    path: &str,
    row: usize,
) -> Result<&'r str, BitterError> {
    record.get(position).ok_or_else(|| {
        BitterError::import(format!(
            "Source file '{path}' record {row} has no '{name}' value"
        ))
    })
}

fn parse_id(raw: &str, name: &str, path: &str, row: usize) -> Result<i64, BitterError> {
    raw.trim().parse().map_err(|_| {
        BitterError::import(format!(
            "Source file '{path}' record {row}: '{raw}' is not a numeric {name}"
        ))
    })
}

fn read_receptors(path: &str) -> Result<Vec<ReceptorRow>, BitterError> {
    let mut rdr = source_reader(path)?;
    let headers = rdr
        .headers()
        .map_err(|e| BitterError::import(format!("Could not read source file '{path}': {e}")))?
        .clone();
    let pos = field_positions(&headers, &RECEPTOR_FIELDS, path)?;

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result
            .map_err(|e| BitterError::import(format!("Could not read source file '{path}': {e}")))?;
        let row = i + 1;
        rows.push(ReceptorRow {
            id: parse_id(field(&record, pos[0], "rID", path, row)?, "rID", path, row)?,
            name: field(&record, pos[1], "rName", path, row)?.to_string(),
            display_name: field(&record, pos[2], "DisplayName", path, row)?.to_string(),
        });
    }
    Ok(rows)
}

fn read_compounds(path: &str) -> Result<Vec<CompoundRow>, BitterError> {
    let mut rdr = source_reader(path)?;
    let headers = rdr
        .headers()
        .map_err(|e| BitterError::import(format!("Could not read source file '{path}': {e}")))?
        .clone();
    let pos = field_positions(&headers, &COMPOUND_FIELDS, path)?;

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result
            .map_err(|e| BitterError::import(format!("Could not read source file '{path}': {e}")))?;
        let row = i + 1;
        rows.push(CompoundRow {
            id: parse_id(field(&record, pos[0], "cID", path, row)?, "cID", path, row)?,
            name: field(&record, pos[1], "cName", path, row)?.to_string(),
            ord: field(&record, pos[2], "order", path, row)?.to_string(),
        });
    }
    Ok(rows)
}

fn read_ligands(path: &str) -> Result<Vec<LigandRow>, BitterError> {
    let mut rdr = source_reader(path)?;
    let headers = rdr
        .headers()
        .map_err(|e| BitterError::import(format!("Could not read source file '{path}': {e}")))?
        .clone();
    let pos = field_positions(&headers, &LIGAND_FIELDS, path)?;

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result
            .map_err(|e| BitterError::import(format!("Could not read source file '{path}': {e}")))?;
        let row = i + 1;
        rows.push(LigandRow {
            compound_id: parse_id(field(&record, pos[0], "cID", path, row)?, "cID", path, row)?,
            receptor_id: parse_id(field(&record, pos[1], "rID", path, row)?, "rID", path, row)?,
        });
    }
    Ok(rows)
}

// Compounds sharing both identifier and (case-insensitive) name would make
// the identifier useless for disambiguation, so the source data is rejected.
fn validate_compounds(rows: &[CompoundRow], path: &str) -> Result<(), BitterError> {
    let duplicates: Vec<(i64, String)> = rows
        .iter()
        .map(|r| (r.id, r.name.to_lowercase()))
        .duplicates()
        .collect();
    if duplicates.is_empty() {
        return Ok(());
    }
    let listing = duplicates
        .iter()
        .map(|(id, name)| format!("'{name}' (id {id})"))
        .join(", ");
    Err(BitterError::import(format!(
        "Source file '{path}' contains duplicate compound rows: {listing}"
    )))
}

fn replace_receptors(conn: &mut Connection, rows: &[ReceptorRow]) -> Result<usize, BitterError> {
    let tx = conn
        .transaction()
        .map_err(|e| BitterError::storage(format!("Could not start receptors rebuild: {e}")))?;
    tx.execute_batch(
        "DROP TABLE IF EXISTS receptors;
         CREATE TABLE receptors (id INTEGER, name TEXT, display_name TEXT);",
    )
    .map_err(|e| BitterError::storage(format!("Could not recreate receptors table: {e}")))?;
    {
        let mut stmt = tx
            .prepare("INSERT INTO receptors (id, name, display_name) VALUES (?1, ?2, ?3)")
            .map_err(|e| BitterError::storage(format!("Could not insert receptors: {e}")))?;
        for row in rows {
            stmt.execute(params![row.id, row.name, row.display_name])
                .map_err(|e| BitterError::storage(format!("Could not insert receptors: {e}")))?;
        }
    }
    // GLOB, not LIKE: the "h" prefix check is case-sensitive.
    tx.execute(
        "DELETE FROM receptors WHERE name NOT GLOB 'h*' AND display_name NOT GLOB 'h*'",
        [],
    )
    .map_err(|e| BitterError::storage(format!("Could not filter receptors: {e}")))?;
    let retained: i64 = tx
        .query_row("SELECT COUNT(*) FROM receptors", [], |r| r.get(0))
        .map_err(|e| BitterError::storage(format!("Could not count receptors: {e}")))?;
    tx.commit()
        .map_err(|e| BitterError::storage(format!("Could not commit receptors rebuild: {e}")))?;
    Ok(retained as usize)
}

fn replace_compounds(conn: &mut Connection, rows: &[CompoundRow]) -> Result<(), BitterError> {
    let tx = conn
        .transaction()
        .map_err(|e| BitterError::storage(format!("Could not start compounds rebuild: {e}")))?;
    tx.execute_batch(
        "DROP TABLE IF EXISTS compounds;
         CREATE TABLE compounds (id INTEGER, name TEXT, ord TEXT);",
    )
    .map_err(|e| BitterError::storage(format!("Could not recreate compounds table: {e}")))?;
    {
        let mut stmt = tx
            .prepare("INSERT INTO compounds (id, name, ord) VALUES (?1, ?2, ?3)")
            .map_err(|e| BitterError::storage(format!("Could not insert compounds: {e}")))?;
        for row in rows {
            stmt.execute(params![row.id, row.name, row.ord])
                .map_err(|e| BitterError::storage(format!("Could not insert compounds: {e}")))?;
        }
    }
    tx.commit()
        .map_err(|e| BitterError::storage(format!("Could not commit compounds rebuild: {e}")))
}

fn replace_ligands(conn: &mut Connection, rows: &[LigandRow]) -> Result<(), BitterError> {
    let tx = conn
        .transaction()
        .map_err(|e| BitterError::storage(format!("Could not start ligands rebuild: {e}")))?;
    tx.execute_batch(
        "DROP TABLE IF EXISTS ligands;
         CREATE TABLE ligands (compound_id INTEGER, receptor_id INTEGER);",
    )
    .map_err(|e| BitterError::storage(format!("Could not recreate ligands table: {e}")))?;
    {
        let mut stmt = tx
            .prepare("INSERT INTO ligands (compound_id, receptor_id) VALUES (?1, ?2)")
            .map_err(|e| BitterError::storage(format!("Could not insert ligands: {e}")))?;
        for row in rows {
            stmt.execute(params![row.compound_id, row.receptor_id])
                .map_err(|e| BitterError::storage(format!("Could not insert ligands: {e}")))?;
        }
    }
    tx.commit()
        .map_err(|e| BitterError::storage(format!("Could not commit ligands rebuild: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::path::Path;

    fn write_source(dir: &Path, name: &str, contents: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn sample_sources(dir: &Path) -> SourceFiles {
        SourceFiles {
            receptors: write_source(
                dir,
                "receptors.csv",
                "rID,rName,DisplayName\n\
                 1,hTAS2R1,hTAS2R1\n\
                 2,Tas2r2,mTas2r2\n\
                 3,TAS2R4,hTAS2R4\n\
                 4,HTAS2R9,HTas2r9\n",
            ),
            compounds: write_source(
                dir,
                "compounds.csv",
                "cID,cName,order\n10,Quinine,1\n11,Quinine,2\n12,Caffeine,3\n",
            ),
            ligands: write_source(dir, "ligands.csv", "cID,rID\n10,1\n11,3\n12,1\n12,1\n"),
        }
    }

    fn receptor_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM receptors ORDER BY id ASC")
            .unwrap();
        stmt.query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap()
    }

    #[test]
    fn test_rebuild_filters_non_human_receptors() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sample_sources(dir.path());
        let mut conn = Connection::open_in_memory().unwrap();

        let summary = rebuild_all(&mut conn, &sources).unwrap();
        assert_eq!(summary.receptors_imported, 4);
        assert_eq!(summary.receptors_retained, 2);
        // "Tas2r2"/"mTas2r2" has no h-prefix; "HTAS2R9"/"HTas2r9" fails the
        // case-sensitive check. "TAS2R4" survives through its display name.
        assert_eq!(receptor_names(&conn), vec!["hTAS2R1", "TAS2R4"]);
    }

    #[test]
    fn test_rebuild_reports_counts() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sample_sources(dir.path());
        let mut conn = Connection::open_in_memory().unwrap();

        let summary = rebuild_all(&mut conn, &sources).unwrap();
        assert_eq!(summary.compounds_imported, 3);
        assert_eq!(summary.ligands_imported, 4);
    }

    #[test]
    fn test_rebuild_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = sample_sources(dir.path());
        let mut conn = Connection::open_in_memory().unwrap();
        rebuild_all(&mut conn, &sources).unwrap();

        sources.compounds = write_source(
            dir.path(),
            "compounds2.csv",
            "cID,cName,order\n99,Brucine,1\n",
        );
        rebuild_all(&mut conn, &sources).unwrap();

        let names: Vec<String> = {
            let mut stmt = conn.prepare("SELECT name FROM compounds").unwrap();
            stmt.query_map([], |r| r.get(0))
                .unwrap()
                .collect::<rusqlite::Result<Vec<String>>>()
                .unwrap()
        };
        assert_eq!(names, vec!["Brucine"]);
    }

    #[test]
    fn test_missing_file_is_import_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = sample_sources(dir.path());
        sources.ligands = dir.path().join("absent.csv").to_str().unwrap().to_string();
        let mut conn = Connection::open_in_memory().unwrap();

        let err = rebuild_all(&mut conn, &sources).unwrap_err();
        assert_eq!(err.code, ErrorCode::Import);
    }

    #[test]
    fn test_missing_field_is_import_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = sample_sources(dir.path());
        sources.compounds = write_source(
            dir.path(),
            "no_order.csv",
            "cID,cName\n10,Quinine\n",
        );
        let mut conn = Connection::open_in_memory().unwrap();

        let err = rebuild_all(&mut conn, &sources).unwrap_err();
        assert_eq!(err.code, ErrorCode::Import);
        assert!(err.message.contains("'order'"));
    }

    #[test]
    fn test_non_numeric_id_is_import_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = sample_sources(dir.path());
        sources.receptors = write_source(
            dir.path(),
            "bad_id.csv",
            "rID,rName,DisplayName\nx1,hTAS2R1,hTAS2R1\n",
        );
        let mut conn = Connection::open_in_memory().unwrap();

        let err = rebuild_all(&mut conn, &sources).unwrap_err();
        assert_eq!(err.code, ErrorCode::Import);
        assert!(err.message.contains("rID"));
    }

    #[test]
    fn test_duplicate_compound_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = sample_sources(dir.path());
        sources.compounds = write_source(
            dir.path(),
            "dupes.csv",
            "cID,cName,order\n10,Quinine,1\n10,quinine,2\n",
        );
        let mut conn = Connection::open_in_memory().unwrap();

        let err = rebuild_all(&mut conn, &sources).unwrap_err();
        assert_eq!(err.code, ErrorCode::Import);
        assert!(err.message.contains("quinine"));
    }

    #[test]
    fn test_import_error_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sample_sources(dir.path());
        let db_path = dir.path().join("bitter.db");
        let mut conn = Connection::open(&db_path).unwrap();
        rebuild_all(&mut conn, &sources).unwrap();

        let mut broken = sources.clone();
        broken.compounds = write_source(dir.path(), "broken.csv", "cID,cName\n1,x\n");
        rebuild_all(&mut conn, &broken).unwrap_err();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM compounds", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 3);
    }
}
