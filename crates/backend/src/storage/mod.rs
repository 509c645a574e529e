use std::path::Path;
use std::sync::Arc;

use efl_shared::models::Facility;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::error::StoreError;

const FACILITIES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("facilities");

/// Facility records keyed by id, stored as JSON.
pub struct FacilityStore {
    db: Database,
}

impl FacilityStore {
    pub fn open(path: &Path) -> Result<Arc<Self>, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let db = Database::create(path)?;

        // Ensure table exists
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(FACILITIES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Arc::new(FacilityStore { db }))
    }

    /// Swap the whole table for `facilities` in one transaction.
    pub fn replace_all(&self, facilities: &[Facility]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(FACILITIES_TABLE)?;
        {
            let mut table = write_txn.open_table(FACILITIES_TABLE)?;
            for facility in facilities {
                let json = serde_json::to_vec(facility)?;
                table.insert(facility.id, json.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load a JSON array of facilities. Records without an id are numbered
    /// after the largest explicit id. Returns the number of rows stored,
    /// which is lower than the input when explicit ids repeat.
    pub fn import_json_file(&self, path: &Path) -> Result<u64, StoreError> {
        let bytes = std::fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut facilities: Vec<Facility> = serde_json::from_slice(&bytes)?;
        let mut next_id = facilities.iter().map(|f| f.id).max().unwrap_or(0).max(0);
        for facility in facilities.iter_mut().filter(|f| f.id == 0) {
            next_id += 1;
            facility.id = next_id;
        }
        self.replace_all(&facilities)?;

        let stored = self.count()?;
        if stored < facilities.len() as u64 {
            tracing::warn!(
                records = facilities.len(),
                stored,
                "seed contains repeated facility ids; later records won"
            );
        }
        Ok(stored)
    }

    /// Every facility in id order.
    pub fn all(&self) -> Result<Vec<Facility>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FACILITIES_TABLE)?;
        let mut facilities = Vec::with_capacity(table.len()? as usize);
        for entry in table.iter()? {
            let (_, value) = entry?;
            facilities.push(serde_json::from_slice(value.value())?);
        }
        Ok(facilities)
    }

    pub fn get(&self, id: i64) -> Result<Option<Facility>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FACILITIES_TABLE)?;

        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FACILITIES_TABLE)?;
        Ok(table.len()?)
    }
}
