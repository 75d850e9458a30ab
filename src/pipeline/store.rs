//! Tabular store shared by the pipeline stages
//!
//! Tables are polars DataFrames held in memory and, for a store opened on a
//! directory, mirrored as one Parquet file per table plus `manifest.json`.
//! Stage statements run through a [`Transaction`]: every change lands in a
//! working copy and only reaches the store on [`Transaction::commit`].
//! Dropping a transaction without committing discards its changes.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use polars::sql::SQLContext;
use thiserror::Error;

use super::manifest::{Manifest, RunRecord};
use super::statements::{classify, StatementError, StatementKind};

pub const MANIFEST_FILE: &str = "manifest.json";
const TABLE_EXTENSION: &str = "parquet";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("table '{0}' is a source table and cannot be replaced or dropped by a stage")]
    SourceTableProtected(String),

    #[error("invalid table name '{0}': use letters, digits and underscores")]
    InvalidTableName(String),

    #[error("only read-only queries can be run outside a transaction")]
    NotAQuery,

    #[error(transparent)]
    Statement(#[from] StatementError),

    #[error("query failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid store manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Effect of one executed statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementEffect {
    Created { table: String, rows: usize },
    /// `CREATE TABLE IF NOT EXISTS` on a table that already exists
    Kept(String),
    Dropped(Vec<String>),
    Queried { rows: usize },
}

#[derive(Debug)]
pub struct TableStore {
    root: Option<PathBuf>,
    tables: BTreeMap<String, DataFrame>,
    manifest: Manifest,
}

impl TableStore {
    /// A store that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            root: None,
            tables: BTreeMap::new(),
            manifest: Manifest::default(),
        }
    }

    /// Open (or create) a store backed by a directory
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root).map_err(|source| StoreError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let text = std::fs::read_to_string(&manifest_path).map_err(|source| StoreError::Io {
                path: manifest_path.clone(),
                source,
            })?;
            serde_json::from_str(&text).map_err(|source| StoreError::Manifest {
                path: manifest_path.clone(),
                source,
            })?
        } else {
            Manifest::default()
        };

        let mut tables = BTreeMap::new();
        let entries = std::fs::read_dir(root).map_err(|source| StoreError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let path = entry
                .map_err(|source| StoreError::Io {
                    path: root.to_path_buf(),
                    source,
                })?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some(TABLE_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let file = File::open(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let df = ParquetReader::new(file).finish()?;
            tables.insert(name.to_string(), df);
        }

        Ok(Self {
            root: Some(root.to_path_buf()),
            tables,
            manifest,
        })
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.manifest.generation
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn last_run(&self) -> Option<&RunRecord> {
        self.manifest.last_run.as_ref()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn is_source(&self, name: &str) -> bool {
        self.manifest.source_tables.iter().any(|t| t == name)
    }

    pub fn table(&self, name: &str) -> Result<&DataFrame, StoreError> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    /// Run an ad hoc read-only query against the current tables
    pub fn query(&self, sql: &str) -> Result<DataFrame, StoreError> {
        if classify(sql)? != StatementKind::Query {
            return Err(StoreError::NotAQuery);
        }
        let mut ctx = self.sql_context();
        Ok(ctx.execute(sql)?.collect()?)
    }

    /// Install an ingested table. Source tables are written only by ingestion.
    ///
    /// Derived tables were built from the previous source data, so the last
    /// run record is cleared until the pipeline runs again.
    pub fn load_source(&mut self, name: &str, df: DataFrame) -> Result<(), StoreError> {
        validate_table_name(name)?;
        if !self.is_source(name) {
            self.manifest.source_tables.push(name.to_string());
            self.manifest.source_tables.sort();
        }
        self.manifest.last_run = None;
        let mut written = BTreeMap::new();
        written.insert(name.to_string(), df);
        self.apply(written, BTreeSet::new())?;
        Ok(())
    }

    /// Start a transaction over the current tables
    pub fn begin(&mut self) -> Transaction<'_> {
        let ctx = self.sql_context();
        Transaction {
            store: self,
            ctx,
            written: BTreeMap::new(),
            dropped: BTreeSet::new(),
        }
    }

    /// Record the outcome of a pipeline run in the manifest
    pub fn record_run(&mut self, run: RunRecord) -> Result<(), StoreError> {
        self.manifest.last_run = Some(run);
        self.save_manifest()
    }

    fn sql_context(&self) -> SQLContext {
        let mut ctx = SQLContext::new();
        for (name, df) in &self.tables {
            ctx.register(name, df.clone().lazy());
        }
        ctx
    }

    fn apply(
        &mut self,
        written: BTreeMap<String, DataFrame>,
        dropped: BTreeSet<String>,
    ) -> Result<Vec<String>, StoreError> {
        if let Some(root) = &self.root {
            write_tables(root, &written)?;
            for name in &dropped {
                let path = table_path(root, name);
                if path.exists() {
                    std::fs::remove_file(&path)
                        .map_err(|source| StoreError::Io { path, source })?;
                }
            }
        }

        for name in &dropped {
            self.tables.remove(name);
        }
        let names: Vec<String> = written.keys().cloned().collect();
        self.tables.extend(written);

        if !names.is_empty() || !dropped.is_empty() {
            self.manifest.generation += 1;
            self.save_manifest()?;
        }
        Ok(names)
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let Some(root) = &self.root else {
            return Ok(());
        };
        let path = root.join(MANIFEST_FILE);
        let text = serde_json::to_string_pretty(&self.manifest)
            .map_err(|source| StoreError::Manifest {
                path: path.clone(),
                source,
            })?;
        std::fs::write(&path, text).map_err(|source| StoreError::Io { path, source })
    }
}

/// Scoped unit of work over a [`TableStore`]
pub struct Transaction<'s> {
    store: &'s mut TableStore,
    ctx: SQLContext,
    written: BTreeMap<String, DataFrame>,
    dropped: BTreeSet<String>,
}

impl Transaction<'_> {
    /// Execute one statement against the working copy
    pub fn execute(&mut self, statement: &str) -> Result<StatementEffect, StoreError> {
        match classify(statement)? {
            StatementKind::CreateTableAs {
                table,
                if_not_exists,
                query,
            } => {
                self.ensure_writable(&table)?;
                if if_not_exists && self.exists(&table) {
                    return Ok(StatementEffect::Kept(table));
                }
                let df = self.ctx.execute(&query)?.collect()?;
                let rows = df.height();
                self.stage_write(table.clone(), df);
                Ok(StatementEffect::Created { table, rows })
            }
            StatementKind::DropTable { tables, if_exists } => {
                for table in &tables {
                    self.ensure_writable(table)?;
                    if !if_exists && !self.exists(table) {
                        return Err(StoreError::TableNotFound(table.clone()));
                    }
                }
                for table in &tables {
                    if !self.exists(table) {
                        continue;
                    }
                    self.ctx.unregister(table);
                    self.written.remove(table);
                    if self.store.contains(table) {
                        self.dropped.insert(table.clone());
                    }
                }
                Ok(StatementEffect::Dropped(tables))
            }
            StatementKind::Query => {
                let df = self.ctx.execute(statement)?.collect()?;
                Ok(StatementEffect::Queried { rows: df.height() })
            }
        }
    }

    /// Write a DataFrame produced outside SQL, e.g. comparison results
    pub fn put_table(&mut self, name: &str, df: DataFrame) -> Result<(), StoreError> {
        self.ensure_writable(name)?;
        self.stage_write(name.to_string(), df);
        Ok(())
    }

    /// Read a table as this transaction currently sees it
    pub fn table(&self, name: &str) -> Result<DataFrame, StoreError> {
        if let Some(df) = self.written.get(name) {
            return Ok(df.clone());
        }
        if self.dropped.contains(name) {
            return Err(StoreError::TableNotFound(name.to_string()));
        }
        self.store.table(name).cloned()
    }

    /// Apply every change to the store; returns the tables written
    pub fn commit(self) -> Result<Vec<String>, StoreError> {
        let Transaction {
            store,
            written,
            dropped,
            ..
        } = self;
        store.apply(written, dropped)
    }

    /// Discard every change
    pub fn rollback(self) {}

    fn exists(&self, name: &str) -> bool {
        self.written.contains_key(name)
            || (self.store.contains(name) && !self.dropped.contains(name))
    }

    fn ensure_writable(&self, name: &str) -> Result<(), StoreError> {
        validate_table_name(name)?;
        if self.store.is_source(name) {
            return Err(StoreError::SourceTableProtected(name.to_string()));
        }
        Ok(())
    }

    fn stage_write(&mut self, name: String, df: DataFrame) {
        self.ctx.register(&name, df.clone().lazy());
        self.dropped.remove(&name);
        self.written.insert(name, df);
    }
}

fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}

fn table_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{name}.{TABLE_EXTENSION}"))
}

/// Write every table to a temporary file first, then rename into place.
///
/// A failed write leaves every existing file untouched. Renames are atomic per
/// table only: if one fails, tables renamed before it are already replaced on
/// disk while the in-memory store and manifest keep the old state. The
/// remaining temporary files are removed.
fn write_tables(root: &Path, tables: &BTreeMap<String, DataFrame>) -> Result<(), StoreError> {
    let mut staged = Vec::with_capacity(tables.len());
    for (name, df) in tables {
        let final_path = table_path(root, name);
        let tmp_path = root.join(format!("{name}.{TABLE_EXTENSION}.tmp"));
        let result = File::create(&tmp_path)
            .map_err(|source| StoreError::Io {
                path: tmp_path.clone(),
                source,
            })
            .and_then(|file| {
                ParquetWriter::new(file)
                    .finish(&mut df.clone())
                    .map(|_| ())
                    .map_err(StoreError::from)
            });
        if let Err(err) = result {
            let _ = std::fs::remove_file(&tmp_path);
            for (tmp, _) in &staged {
                let _ = std::fs::remove_file(tmp);
            }
            return Err(err);
        }
        staged.push((tmp_path, final_path));
    }

    for (i, (tmp, dest)) in staged.iter().enumerate() {
        if let Err(source) = std::fs::rename(tmp, dest) {
            for (pending, _) in &staged[i..] {
                let _ = std::fs::remove_file(pending);
            }
            return Err(StoreError::Io {
                path: dest.clone(),
                source,
            });
        }
    }
    Ok(())
}
