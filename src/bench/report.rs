// src/bench/report.rs

//! Append-only CSV report store.
//!
//! One file per run batch; one row per `execute()`. Writers from any number
//! of tasks or processes serialise on an exclusive advisory lock held on a
//! sidecar `<report>.lock` file for the duration of a single append,
//! including any column migration. The lock file is left in place after the
//! append; deleting it while another writer holds it would let a third writer
//! lock a fresh inode, so `result_dir` keeps one `.csv.lock` per report.
//!
//! An append is never dropped for a lock or migration failure: both are
//! logged and the row is written anyway.

use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::errors::{BenchError, Result};

/// One flat report row: ordered `(column, value)` pairs. Absent values are
/// empty strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportRow {
    columns: Vec<(String, String)>,
}

impl ReportRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Display) -> Self {
        self.columns.push((column.into(), value.to_string()));
        self
    }

    pub fn with_opt<V: Display>(self, column: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(column, v),
            None => self.with(column, ""),
        }
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn values(&self) -> Vec<&str> {
        self.columns.iter().map(|(_, v)| v.as_str()).collect()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }
}

/// Holds the exclusive lock until dropped.
struct LockGuard(File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

/// A CSV report file.
#[derive(Debug, Clone)]
pub struct ReportStore {
    path: PathBuf,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<result_dir>/<run_stamp>_<workload_name>_result.csv`
    pub fn for_run(result_dir: &Path, run_stamp: &str, workload_name: &str) -> Self {
        Self::new(result_dir.join(format!("{run_stamp}_{workload_name}_result.csv")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first if the file is new or empty.
    ///
    /// If the file's header differs from the row's columns, existing rows are
    /// first rewritten into the row's layout (unknown columns dropped, new
    /// ones left empty) and the file is atomically replaced. If the existing
    /// rows cannot be read, the file is left untouched and the row is
    /// appended after them.
    pub fn append(&self, row: &ReportRow) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.persist_err(e))?;
        }

        let _guard = self.lock();

        if let Err(err) = self.migrate_if_needed(&row.headers()) {
            warn!(path = ?self.path, error = %err, "report: migration failed; appending in the new layout");
        }

        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.persist_err(e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer
                .write_record(row.headers())
                .map_err(|e| self.persist_err(e))?;
        }
        writer
            .write_record(row.values())
            .map_err(|e| self.persist_err(e))?;
        writer.flush().map_err(|e| self.persist_err(e))?;

        debug!(path = ?self.path, "report: row appended");
        Ok(())
    }

    /// Header and data rows currently in the file.
    pub fn read_all(&self) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.persist_err(e))?;
        let headers = reader
            .headers()
            .map_err(|e| self.persist_err(e))?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| self.persist_err(e))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok((headers, rows))
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Take the exclusive lock; on failure continue unlocked.
    fn lock(&self) -> Option<LockGuard> {
        let lock_path = self.lock_path();
        let file = match OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
        {
            Ok(f) => f,
            Err(err) => {
                warn!(path = ?lock_path, error = %err, "report: cannot open lock file; appending unlocked");
                return None;
            }
        };

        match FileExt::lock_exclusive(&file) {
            Ok(()) => Some(LockGuard(file)),
            Err(err) => {
                warn!(path = ?lock_path, error = %err, "report: locking unavailable; appending unlocked");
                None
            }
        }
    }

    fn migrate_if_needed(&self, headers: &[&str]) -> Result<()> {
        let non_empty = fs::metadata(&self.path).map(|m| m.len() > 0).unwrap_or(false);
        if !non_empty {
            return Ok(());
        }

        let (old_headers, old_rows) = self.read_all()?;
        if old_headers.iter().map(String::as_str).eq(headers.iter().copied()) {
            return Ok(());
        }

        info!(
            path = ?self.path,
            from = ?old_headers,
            to = ?headers,
            rows = old_rows.len(),
            "report: migrating existing rows to new column layout"
        );

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::Builder::new()
            .prefix("report_migrate_")
            .suffix(".csv")
            .tempfile_in(dir)
            .map_err(|e| self.persist_err(e))?;

        {
            let mut writer = csv::Writer::from_writer(tmp.as_file());
            writer
                .write_record(headers)
                .map_err(|e| self.persist_err(e))?;
            for old in &old_rows {
                let migrated = headers.iter().map(|h| {
                    old_headers
                        .iter()
                        .position(|o| o == h)
                        .and_then(|i| old.get(i))
                        .map(String::as_str)
                        .unwrap_or("")
                });
                writer
                    .write_record(migrated)
                    .map_err(|e| self.persist_err(e))?;
            }
            writer.flush().map_err(|e| self.persist_err(e))?;
        }

        tmp.persist(&self.path)
            .map_err(|e| self.persist_err(e.error))?;
        Ok(())
    }

    fn persist_err(&self, err: impl Display) -> BenchError {
        BenchError::Persist {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path().join("nested/r.csv"));
        let row = ReportRow::new().with("a", 1).with("b", "x,y");

        store.append(&row).unwrap();
        store.append(&row).unwrap();

        let (headers, rows) = store.read_all().unwrap();
        assert_eq!(headers, vec!["a", "b"]);
        assert_eq!(rows, vec![vec!["1", "x,y"], vec!["1", "x,y"]]);
    }

    #[test]
    fn run_file_name_follows_convention() {
        let store = ReportStore::for_run(Path::new("/r"), "1016_0930", "maze");
        assert_eq!(store.path(), Path::new("/r/1016_0930_maze_result.csv"));
        assert_eq!(store.lock_path(), PathBuf::from("/r/1016_0930_maze_result.csv.lock"));
    }
}
