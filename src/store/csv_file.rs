//! Single CSV file lot store.
//!
//! The revision is the SHA-256 of the file bytes, so any outside edit (a
//! second process, a spreadsheet tool) shows up as a conflict. Writes go to a
//! temporary sibling file and are renamed into place. Check-then-rename is
//! serialized inside this process only; two processes can still interleave
//! between the check and the rename.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::{LotStore, Revision, StoreError, Table, VersionedTable};

/// Revision reported while the file does not exist yet.
pub const ABSENT_REVISION: &str = "absent";

const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug)]
pub struct CsvLotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvLotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn revision_of(bytes: &[u8]) -> Revision {
        Revision::new(hex::encode(Sha256::digest(bytes)))
    }

    async fn read_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn current_revision(&self) -> Result<Revision, StoreError> {
        Ok(match self.read_bytes().await? {
            Some(bytes) => Self::revision_of(&bytes),
            None => Revision::new(ABSENT_REVISION),
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Table, StoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let header = reader
            .headers()
            .map_err(|e| StoreError::Corrupt(format!("csv header: {}", e)))?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches(UTF8_BOM).to_string()
                } else {
                    h.to_string()
                }
            })
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| StoreError::Corrupt(format!("csv record: {}", e)))?;
            let mut cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            if cells.len() < header.len() {
                cells.resize(header.len(), String::new());
            }
            rows.push(cells);
        }

        Ok(Table { header, rows })
    }

    pub fn render(table: &Table) -> Result<Vec<u8>, StoreError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        writer
            .write_record(&table.header)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        for row in &table.rows {
            writer
                .write_record(row)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

#[async_trait]
impl LotStore for CsvLotStore {
    async fn read_all(&self) -> Result<VersionedTable, StoreError> {
        let Some(bytes) = self.read_bytes().await? else {
            debug!(path = %self.path.display(), "Ledger file absent, starting empty");
            return Ok(VersionedTable {
                table: Table::default(),
                revision: Revision::new(ABSENT_REVISION),
            });
        };

        let revision = Self::revision_of(&bytes);
        let table = if bytes.is_empty() {
            Table::default()
        } else {
            Self::parse(&bytes)?
        };
        debug!(path = %self.path.display(), rows = table.rows.len(), %revision, "Read ledger file");
        Ok(VersionedTable { table, revision })
    }

    async fn write_all(&self, table: &Table, expected: &Revision) -> Result<Revision, StoreError> {
        let _guard = self.write_lock.lock().await;

        let actual = self.current_revision().await?;
        if &actual != expected {
            return Err(StoreError::Conflict {
                expected: expected.clone(),
                actual,
            });
        }

        let bytes = Self::render(table)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("csv.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        let revision = Self::revision_of(&bytes);
        debug!(path = %self.path.display(), rows = table.rows.len(), %revision, "Wrote ledger file");
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table() -> Table {
        Table {
            header: vec!["id".to_string(), "symbol".to_string(), "note".to_string()],
            rows: vec![
                vec!["1".to_string(), "2330 台積電".to_string(), "a, quoted \"note\"".to_string()],
                vec!["2".to_string(), "0050".to_string(), String::new()],
            ],
        }
    }

    #[tokio::test]
    async fn test_absent_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = CsvLotStore::new(temp_dir.path().join("trades.csv"));
        let loaded = store.read_all().await.unwrap();
        assert_eq!(loaded.table, Table::default());
        assert_eq!(loaded.revision.as_str(), ABSENT_REVISION);
    }

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = CsvLotStore::new(temp_dir.path().join("trades.csv"));

        let rev = store
            .write_all(&table(), &Revision::new(ABSENT_REVISION))
            .await
            .unwrap();
        let loaded = store.read_all().await.unwrap();
        assert_eq!(loaded.table, table());
        assert_eq!(loaded.revision, rev);

        // Rewriting identical content keeps the same revision.
        let rev2 = store.write_all(&loaded.table, &loaded.revision).await.unwrap();
        assert_eq!(rev2, rev);
    }

    #[tokio::test]
    async fn test_outside_edit_conflicts() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trades.csv");
        let store = CsvLotStore::new(&path);

        let rev = store
            .write_all(&table(), &Revision::new(ABSENT_REVISION))
            .await
            .unwrap();
        std::fs::write(&path, "id,symbol,note\n9,2317,edited\n").unwrap();

        let err = store.write_all(&table(), &rev).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        let loaded = store.read_all().await.unwrap();
        assert_eq!(loaded.table.rows[0][0], "9");
    }

    #[tokio::test]
    async fn test_parse_strips_bom_and_pads_short_rows() {
        let bytes = "\u{feff}id,symbol,note\n1,2330\n".as_bytes();
        let table = CsvLotStore::parse(bytes).unwrap();
        assert_eq!(table.header[0], "id");
        assert_eq!(table.rows[0], vec!["1", "2330", ""]);
    }
}
