use crate::{
    error::{BitterError, ErrorCode},
    schema::SourceFiles,
};
use serde::{Deserialize, Serialize};

/// Process configuration: where the three source files, the database file
/// and the CSV export folder live. Passed explicitly into the call sites
/// that need it; there is no ambient global configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub receptor_file: String,
    pub compound_file: String,
    pub ligand_file: String,
    pub database_file: String,
    pub export_folder: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            receptor_file: "data/receptors.csv".to_string(),
            compound_file: "data/compounds.csv".to_string(),
            ligand_file: "data/ligands.csv".to_string(),
            database_file: "bitter.db".to_string(),
            export_folder: "export".to_string(),
        }
    }
}

impl Settings {
    pub fn load_from_path(path: &str) -> Result<Self, BitterError> {
        let text = std::fs::read_to_string(path).map_err(|e| BitterError {
            code: ErrorCode::Io,
            message: format!("Could not read settings file '{path}': {e}"),
        })?;
        serde_json::from_str(&text).map_err(|e| BitterError {
            code: ErrorCode::InvalidInput,
            message: format!("Could not parse settings JSON '{path}': {e}"),
        })
    }

    pub fn save_to_path(&self, path: &str) -> Result<(), BitterError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| BitterError {
            code: ErrorCode::Internal,
            message: format!("Could not serialize settings: {e}"),
        })?;
        std::fs::write(path, text).map_err(|e| BitterError {
            code: ErrorCode::Io,
            message: format!("Could not write settings file '{path}': {e}"),
        })
    }

    pub fn source_files(&self) -> SourceFiles {
        SourceFiles {
            receptors: self.receptor_file.clone(),
            compounds: self.compound_file.clone(),
            ligands: self.ligand_file.clone(),
        }
    }
}
