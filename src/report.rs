use crate::{
    error::{BitterError, ErrorCode},
    store::CompoundHit,
};
use chrono::Local;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%d.%m.%y %H:%M:%S";
const EXPORT_FILE_FORMAT: &str = "%d.%m.%y %H %M %S";

/// A materialized query result: column labels, string rows and ordered
/// metadata pairs. The first metadata entry is always the query timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub metadata: Vec<(String, String)>,
}

impl ResultTable {
    pub fn new(headers: Vec<String>, metadata: Vec<(String, String)>) -> Self {
        let mut stamped = vec![(
            "Queried at".to_string(),
            Local::now().format(TIMESTAMP_FORMAT).to_string(),
        )];
        stamped.extend(metadata);
        Self {
            headers,
            rows: Vec::new(),
            metadata: stamped,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Compound hits found for a receptor name.
    pub fn compound_results(receptor: &str, hits: &[CompoundHit]) -> Self {
        let mut table = Self::new(
            vec!["Bitter ID".to_string(), "Compound name".to_string()],
            vec![("Receptor".to_string(), receptor.to_string())],
        );
        for hit in hits {
            table.rows.push(vec![hit.id.to_string(), hit.name.clone()]);
        }
        table
    }

    /// Receptor names found for a compound name plus chosen identifier.
    pub fn receptor_results(compound: &str, compound_id: i64, receptors: &[String]) -> Self {
        let mut table = Self::new(
            vec!["Receptor name".to_string()],
            vec![
                ("Bitter ID".to_string(), compound_id.to_string()),
                ("Compound".to_string(), compound.to_string()),
            ],
        );
        for name in receptors {
            table.rows.push(vec![name.clone()]);
        }
        table
    }

    /// Writes one `# key: value` comment record per metadata pair, then the
    /// header record, then the data records.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<(), BitterError> {
        // Comment records have one field, data records several.
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        for (key, value) in &self.metadata {
            wtr.write_record([format!("# {key}: {value}")])
                .map_err(|e| export_error(format!("Could not write CSV metadata: {e}")))?;
        }
        if !self.headers.is_empty() {
            wtr.write_record(&self.headers)
                .map_err(|e| export_error(format!("Could not write CSV header: {e}")))?;
        }
        for row in &self.rows {
            wtr.write_record(row)
                .map_err(|e| export_error(format!("Could not write CSV row: {e}")))?;
        }
        wtr.flush()
            .map_err(|e| export_error(format!("Could not flush CSV output: {e}")))?;
        Ok(())
    }

    /// Exports into `folder` (created if missing) under a timestamp-derived
    /// file name and returns the written path.
    pub fn export_csv(&self, folder: &str) -> Result<PathBuf, BitterError> {
        std::fs::create_dir_all(folder).map_err(|e| {
            export_error(format!("Could not create export folder '{folder}': {e}"))
        })?;
        let file_name = format!("{}.csv", Local::now().format(EXPORT_FILE_FORMAT));
        let path = Path::new(folder).join(file_name);
        let file = std::fs::File::create(&path).map_err(|e| {
            export_error(format!(
                "Could not create export file '{}': {e}",
                path.display()
            ))
        })?;
        self.write_csv(file)?;
        Ok(path)
    }
}

fn export_error(message: String) -> BitterError {
    BitterError {
        code: ErrorCode::Io,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: i64, name: &str) -> CompoundHit {
        CompoundHit {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_metadata_starts_with_timestamp() {
        let table = ResultTable::compound_results("hTAS2R1", &[hit(10, "Quinine")]);
        assert_eq!(table.metadata[0].0, "Queried at");
        assert_eq!(
            table.metadata[1],
            ("Receptor".to_string(), "hTAS2R1".to_string())
        );
    }

    #[test]
    fn test_write_csv_layout() {
        let table = ResultTable::receptor_results(
            "Quinine",
            10,
            &["hTAS2R1".to_string(), "hTAS2R2".to_string()],
        );
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("# Queried at: "));
        assert_eq!(lines[1], "# Bitter ID: 10");
        assert_eq!(lines[2], "# Compound: Quinine");
        assert_eq!(lines[3], "Receptor name");
        assert_eq!(&lines[4..], ["hTAS2R1", "hTAS2R2"]);
    }

    #[test]
    fn test_empty_table_writes_only_metadata() {
        let mut out = Vec::new();
        ResultTable::empty().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("# Queried at: "));
    }

    #[test]
    fn test_export_round_trip() {
        let table = ResultTable::compound_results(
            "hTAS2R4",
            &[hit(42, "1,8-Cineole"), hit(43, "Brucine")],
        );
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("export");
        let path = table.export_csv(folder.to_str().unwrap()).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .unwrap();
        let mut records: Vec<Vec<String>> = Vec::new();
        for result in rdr.records() {
            let record = result.unwrap();
            if record.get(0).is_some_and(|f| f.starts_with("# ")) {
                continue;
            }
            records.push(record.iter().map(|f| f.to_string()).collect());
        }

        assert_eq!(records[0], table.headers);
        assert_eq!(&records[1..], table.rows.as_slice());
    }
}
