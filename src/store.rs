use crate::{
    error::{BitterError, ErrorCode},
    schema::{self, RebuildSummary, SourceFiles},
};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// One matched compound: identifier ("Bitter ID") and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundHit {
    pub id: i64,
    pub name: String,
}

/// Handle on the persisted store. Holds no open connection: every operation
/// opens its own and releases it before returning, so nothing stays open
/// across the caller's user-interaction pauses.
pub struct Store {
    db_path: String,
    rebuild_gate: Mutex<()>,
}

impl Store {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            rebuild_gate: Mutex::new(()),
        }
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, BitterError> {
        Connection::open(&self.db_path).map_err(|e| {
            BitterError::storage(format!("Could not open database '{}': {e}", self.db_path))
        })
    }

    /// Replaces the whole schema from the source files. Exclusive with
    /// itself via the rebuild gate; each table flips atomically, so readers
    /// see it either before or after its replacement, never mid-insert.
    pub fn rebuild(&self, sources: &SourceFiles) -> Result<RebuildSummary, BitterError> {
        let _gate = self.rebuild_gate.lock().map_err(|_| BitterError {
            code: ErrorCode::Internal,
            message: "Rebuild gate is poisoned".to_string(),
        })?;
        let mut conn = self.connect()?;
        schema::rebuild_all(&mut conn, sources)
    }

    /// Compounds sensed by the receptor with the given canonical or display
    /// name (case-insensitive equality), ascending by id, then name.
    pub fn compounds_by_receptor(&self, receptor: &str) -> Result<Vec<CompoundHit>, BitterError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT c.id, c.name
                 FROM receptors r
                     JOIN ligands l ON r.id = l.receptor_id
                     JOIN compounds c ON l.compound_id = c.id
                 WHERE LOWER(r.name) = ?1 OR LOWER(r.display_name) = ?1
                 ORDER BY c.id ASC, c.name ASC",
            )
            .map_err(|e| {
                BitterError::storage(format!("Could not query compounds by receptor: {e}"))
            })?;
        let rows = stmt
            .query_map(params![receptor.to_lowercase()], |row| {
                Ok(CompoundHit {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(|e| {
                BitterError::storage(format!("Could not query compounds by receptor: {e}"))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| {
                BitterError::storage(format!("Could not read compounds by receptor: {e}"))
            })?;
        Ok(rows)
    }

    /// Compound records whose name equals the given one case-insensitively,
    /// ascending by id, then name. More than one row means the name needs
    /// disambiguation by identifier.
    pub fn compounds_by_name(&self, compound: &str) -> Result<Vec<CompoundHit>, BitterError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT id, name
                 FROM compounds
                 WHERE LOWER(name) = ?1
                 ORDER BY id ASC, name ASC",
            )
            .map_err(|e| {
                BitterError::storage(format!("Could not query compounds by name: {e}"))
            })?;
        let rows = stmt
            .query_map(params![compound.to_lowercase()], |row| {
                Ok(CompoundHit {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(|e| {
                BitterError::storage(format!("Could not query compounds by name: {e}"))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| BitterError::storage(format!("Could not read compounds by name: {e}")))?;
        Ok(rows)
    }

    /// Names of receptors sensing the given compound, requiring both the
    /// case-insensitive name match and the exact identifier, ascending by
    /// name.
    pub fn receptors_by_compound(
        &self,
        compound: &str,
        compound_id: i64,
    ) -> Result<Vec<String>, BitterError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT r.name
                 FROM compounds c
                     JOIN ligands l ON c.id = l.compound_id
                     JOIN receptors r ON l.receptor_id = r.id
                 WHERE LOWER(c.name) = ?1 AND c.id = ?2
                 ORDER BY r.name ASC",
            )
            .map_err(|e| {
                BitterError::storage(format!("Could not query receptors by compound: {e}"))
            })?;
        let rows = stmt
            .query_map(params![compound.to_lowercase(), compound_id], |row| {
                row.get(0)
            })
            .map_err(|e| {
                BitterError::storage(format!("Could not query receptors by compound: {e}"))
            })?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(|e| {
                BitterError::storage(format!("Could not read receptors by compound: {e}"))
            })?;
        Ok(rows)
    }
}
