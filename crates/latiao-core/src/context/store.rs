//! In-memory column store backing one program.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use latiao_common::types::{Column, ColumnData, FieldId, FieldToken};
use latiao_common::utils::error::{Error, Result};
use parking_lot::RwLock;

/// A stored column.
#[derive(Debug, Clone)]
struct Entry {
    token: FieldToken,
    data: Arc<ColumnData>,
    /// Export sequence number, set once the field is made visible.
    exported_at: Option<u64>,
}

/// Column storage for one program.
///
/// Origin columns are bound at creation and never change. Derived columns
/// are append-only: an id can be written once and is never removed until the
/// store is dropped.
#[derive(Debug)]
pub struct ColumnStore {
    row_count: usize,
    origin: IndexMap<FieldId, Entry>,
    derived: RwLock<IndexMap<FieldId, Entry>>,
    next_export: AtomicU64,
}

impl ColumnStore {
    /// Binds a snapshot of origin columns.
    ///
    /// All columns must have the same length and distinct ids; origin fields
    /// are always visible.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, Column::len);
        let mut origin = IndexMap::with_capacity(columns.len());

        for Column { mut token, data } in columns {
            if data.len() != row_count {
                return Err(Error::runtime(format!(
                    "Column \"{}\" has {} rows, expected {row_count}.",
                    token.fid,
                    data.len()
                )));
            }
            if !data.fits(token.mode) {
                return Err(Error::type_error(format!(
                    "Column \"{}\" does not hold {} data.",
                    token.fid, token.mode
                )));
            }
            let data = data.into_mode(token.mode);
            if origin.contains_key(&token.fid) {
                return Err(Error::name(format!("Field {} is already defined.", token.fid)));
            }
            token.out = true;
            origin.insert(
                token.fid.clone(),
                Entry {
                    token,
                    data: Arc::new(data),
                    exported_at: None,
                },
            );
        }

        Ok(Self {
            row_count,
            origin,
            derived: RwLock::new(IndexMap::new()),
            next_export: AtomicU64::new(0),
        })
    }

    /// Number of rows every column has.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of origin columns.
    #[must_use]
    pub fn origin_count(&self) -> usize {
        self.origin.len()
    }

    /// Number of derived columns written so far.
    #[must_use]
    pub fn derived_count(&self) -> usize {
        self.derived.read().len()
    }

    /// Looks a field up by exact id, origin first.
    #[must_use]
    pub fn field(&self, fid: &str) -> Option<FieldToken> {
        if let Some(entry) = self.origin.get(fid) {
            return Some(entry.token.clone());
        }
        self.derived.read().get(fid).map(|e| e.token.clone())
    }

    /// Returns the data of a column, origin first.
    pub fn data(&self, fid: &str) -> Option<Arc<ColumnData>> {
        if let Some(entry) = self.origin.get(fid) {
            return Some(Arc::clone(&entry.data));
        }
        self.derived.read().get(fid).map(|e| Arc::clone(&e.data))
    }

    /// Resolves an identifier from program text or a host request.
    ///
    /// Tried in order: origin id, derived id, derived id with its internal
    /// prefix re-applied, then the name of a visible field (origin first, then
    /// the most recently exported derived field).
    pub fn resolve(&self, ident: &str) -> Option<FieldToken> {
        if let Some(field) = self.field(ident) {
            return Some(field);
        }
        if let Some(field) = self.field(FieldId::internal(ident).as_str()) {
            return Some(field);
        }
        if let Some(entry) = self.origin.values().find(|e| e.token.name == ident) {
            return Some(entry.token.clone());
        }
        self.derived
            .read()
            .values()
            .filter(|e| e.token.out && e.token.name == ident)
            .max_by_key(|e| e.exported_at)
            .map(|e| e.token.clone())
    }

    /// Appends a derived column.
    ///
    /// Fails with a name error if the id already exists and with a runtime
    /// error if the length differs from the row count.
    pub fn write(&self, token: FieldToken, data: ColumnData) -> Result<()> {
        if self.origin.contains_key(&token.fid) {
            return Err(Error::name(format!("Field {} is already defined.", token.fid)));
        }
        if data.len() != self.row_count {
            return Err(Error::runtime(format!(
                "Column \"{}\" has {} rows, expected {}.",
                token.name,
                data.len(),
                self.row_count
            )));
        }
        let data = data.into_mode(token.mode);
        let mut derived = self.derived.write();
        if derived.contains_key(&token.fid) {
            return Err(Error::name(format!("Field {} is already defined.", token.fid)));
        }
        derived.insert(
            token.fid.clone(),
            Entry {
                token,
                data: Arc::new(data),
                exported_at: None,
            },
        );
        Ok(())
    }

    /// Makes a field visible, optionally renaming it, and returns the updated
    /// token.
    ///
    /// Origin fields are already visible; exporting one under a new name is
    /// ignored since origin columns are immutable.
    pub fn export(&self, fid: &FieldId, name: Option<&str>) -> Result<FieldToken> {
        if let Some(entry) = self.origin.get(fid) {
            return Ok(entry.token.clone());
        }
        let mut derived = self.derived.write();
        let entry = derived
            .get_mut(fid)
            .ok_or_else(|| Error::name(format!("Cannot find column \"{fid}\".")))?;
        entry.token.out = true;
        if let Some(name) = name {
            entry.token.name = name.to_string();
        }
        entry.exported_at = Some(self.next_export.fetch_add(1, Ordering::Relaxed));
        Ok(entry.token.clone())
    }

    /// All origin fields, in binding order.
    #[must_use]
    pub fn origin_fields(&self) -> Vec<FieldToken> {
        self.origin.values().map(|e| e.token.clone()).collect()
    }

    /// All derived fields, in write order.
    #[must_use]
    pub fn derived_fields(&self) -> Vec<FieldToken> {
        self.derived.read().values().map(|e| e.token.clone()).collect()
    }
}
