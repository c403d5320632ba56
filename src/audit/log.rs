//! Audit log sinks
//!
//! The trail is append-only:
//! - records are never rewritten or removed
//! - every append is written in one call and fsynced before it returns
//! - a corrupt line halts reading; it is never skipped
//! - a record always starts on a fresh line, even after a torn tail

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::errors::{AuditError, AuditResult};
use super::query::AuditQuery;
use super::record::AuditRecord;
use crate::fingerprint::Fingerprint;

/// Default trail file name under the store root.
pub const DEFAULT_AUDIT_FILE: &str = "audit.jsonl";

/// Append-only audit trail.
pub trait AuditLog: Send + Sync {
    /// Appends a record. The record is durable once this returns.
    fn append(&self, record: &AuditRecord) -> AuditResult<()>;

    /// Every record, in append order.
    fn records(&self) -> AuditResult<Vec<AuditRecord>>;

    fn query(&self, query: &AuditQuery) -> AuditResult<Vec<AuditRecord>> {
        Ok(query.run(self.records()?))
    }

    /// Fingerprint of the most recent record for `node_id` that carries one.
    fn last_fingerprint(&self, node_id: &str) -> AuditResult<Option<Fingerprint>> {
        Ok(self
            .records()?
            .into_iter()
            .rev()
            .find(|r| r.node_id == node_id && !r.fingerprint.as_str().is_empty())
            .map(|r| r.fingerprint))
    }

    /// True if any record for `node_id` carries `fingerprint`.
    fn has_fingerprint(&self, node_id: &str, fingerprint: &Fingerprint) -> AuditResult<bool> {
        Ok(self
            .records()?
            .iter()
            .any(|r| r.node_id == node_id && &r.fingerprint == fingerprint))
    }
}

/// File-backed trail: one JSON record per line.
pub struct FileAuditLog {
    path: PathBuf,
    writer: Mutex<TrailWriter>,
}

struct TrailWriter {
    out: File,
    /// The file does not end in a newline (torn or failed append)
    line_open: bool,
}

impl TrailWriter {
    fn write_synced_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 2);
        if self.line_open {
            buf.push('\n');
        }
        buf.push_str(line);
        buf.push('\n');
        self.out.write_all(buf.as_bytes())?;
        self.out.sync_all()
    }
}

impl FileAuditLog {
    /// Opens or creates the trail file.
    pub fn open(path: impl AsRef<Path>) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AuditError::io(format!("open {}", path.display()), e))?;
        let line_open = ends_mid_line(&path)
            .map_err(|e| AuditError::io(format!("inspect {}", path.display()), e))?;
        if line_open {
            tracing::warn!(path = %path.display(), "audit trail ends with a torn line");
        }

        Ok(Self {
            path,
            writer: Mutex::new(TrailWriter {
                out: file,
                line_open,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> MutexGuard<'_, TrailWriter> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuditLog for FileAuditLog {
    fn append(&self, record: &AuditRecord) -> AuditResult<()> {
        let line = record.to_line()?;
        let mut writer = self.writer();
        match writer.write_synced_line(&line) {
            Ok(()) => writer.line_open = false,
            Err(e) => {
                // Part of the line may have reached the file
                writer.line_open = true;
                return Err(AuditError::io(format!("append {}", self.path.display()), e));
            }
        }
        drop(writer);

        tracing::debug!(
            node = %record.node_id,
            op = %record.op,
            version = record.version,
            "audit record appended"
        );
        Ok(())
    }

    fn records(&self) -> AuditResult<Vec<AuditRecord>> {
        // Hold the writer lock so a concurrent append is not read half-written
        let _guard = self.writer();
        let content = fs::read_to_string(&self.path)
            .map_err(|e| AuditError::io(format!("read {}", self.path.display()), e))?;

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| AuditRecord::from_line(line, i + 1))
            .collect()
    }
}

fn ends_mid_line(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// In-memory trail for tests.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuditRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, record: &AuditRecord) -> AuditResult<()> {
        let sealed = record.clone().sealed()?;
        self.lock().push(sealed);
        Ok(())
    }

    fn records(&self) -> AuditResult<Vec<AuditRecord>> {
        Ok(self.lock().clone())
    }
}
