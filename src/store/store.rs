//! File-per-document store
//!
//! Layout: `<root>/nodes/<id>.json`, one pretty-printed JSON document per file.
//!
//! Writes are atomic:
//! 1. Write to `<id>.json.tmp`
//! 2. fsync the temp file
//! 3. Rename over `<id>.json`
//! 4. fsync the directory (best effort)
//!
//! A reader therefore sees either the old or the new document, never a
//! half-written one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::errors::{StoreError, StoreResult};
use crate::document::Document;

/// Directory under the root holding document files
pub const NODES_DIR: &str = "nodes";

const EXTENSION: &str = "json";

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("id pattern is a valid regex")
    })
}

/// Checks that an identifier can be used as a file name.
pub fn validate_id(id: &str) -> StoreResult<()> {
    if id.len() > 200 || id.ends_with('.') || !id_pattern().is_match(id) {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Document store rooted at a directory.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    nodes_dir: PathBuf,
}

impl DocumentStore {
    /// Opens the store under `root`, creating `root/nodes` if missing.
    pub fn open(root: &Path) -> StoreResult<Self> {
        let nodes_dir = root.join(NODES_DIR);
        if !nodes_dir.exists() {
            fs::create_dir_all(&nodes_dir).map_err(|e| {
                StoreError::io(format!("create {}", nodes_dir.display()), e)
            })?;
        }
        Ok(Self { nodes_dir })
    }

    pub fn nodes_dir(&self) -> &Path {
        &self.nodes_dir
    }

    /// File path for a document identifier.
    pub fn path_for(&self, id: &str) -> StoreResult<PathBuf> {
        validate_id(id)?;
        Ok(self.nodes_dir.join(format!("{}.{}", id, EXTENSION)))
    }

    pub fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.path_for(id)?.is_file())
    }

    /// Loads a document, checking that its declared id matches its key.
    pub fn load(&self, id: &str) -> StoreResult<Document> {
        let path = self.path_for(id)?;
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => return Err(StoreError::io(format!("read {}", path.display()), e)),
        };

        let doc: Document = serde_json::from_str(&content)
            .map_err(|e| StoreError::corrupt(id, format!("invalid document JSON: {}", e)))?;

        if doc.id != id {
            return Err(StoreError::corrupt(
                id,
                format!("file declares identifier '{}'", doc.id),
            ));
        }
        Ok(doc)
    }

    /// Writes a document atomically, replacing any previous version.
    pub fn save(&self, doc: &Document) -> StoreResult<()> {
        let path = self.path_for(&doc.id)?;
        let temp_path = self.nodes_dir.join(format!("{}.{}.tmp", doc.id, EXTENSION));

        let mut body = serde_json::to_string_pretty(doc)
            .map_err(|e| StoreError::corrupt(&doc.id, format!("serialize: {}", e)))?;
        body.push('\n');

        if let Err(e) = write_synced(&temp_path, body.as_bytes()) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::io(format!("write {}", temp_path.display()), e));
        }

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::io(format!("commit {}", path.display()), e)
        })?;

        // fsync the directory so the rename itself is durable
        if let Ok(dir) = File::open(&self.nodes_dir) {
            let _ = dir.sync_all();
        }

        tracing::debug!(node = %doc.id, version = doc.version, "document persisted");
        Ok(())
    }

    /// Writes a new document; fails if one already exists under its id.
    pub fn insert(&self, doc: &Document) -> StoreResult<()> {
        if self.exists(&doc.id)? {
            return Err(StoreError::AlreadyExists(doc.id.clone()));
        }
        self.save(doc)
    }

    /// Removes a document file.
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(StoreError::io(format!("delete {}", path.display()), e)),
        }
    }

    /// All stored identifiers, sorted.
    pub fn list(&self) -> StoreResult<Vec<String>> {
        let entries = fs::read_dir(&self.nodes_dir)
            .map_err(|e| StoreError::io(format!("list {}", self.nodes_dir.display()), e))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| StoreError::io(format!("list {}", self.nodes_dir.display()), e))?;
            let path = entry.path();

            // Skip leftover temp files and anything that is not a document
            if path.extension().map_or(true, |ext| ext != EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_id(stem).is_ok() {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Loads every stored document, in identifier order.
    pub fn load_all(&self) -> StoreResult<Vec<Document>> {
        self.list()?.iter().map(|id| self.load(id)).collect()
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, DocumentStore) {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_save_and_load() {
        let (_dir, store) = store();
        let doc = Document::new("sword-001", "item", "Iron Sword");
        store.save(&doc).unwrap();
        assert_eq!(store.load("sword-001").unwrap(), doc);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.load("nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_insert_refuses_duplicate() {
        let (_dir, store) = store();
        let doc = Document::new("a", "item", "A");
        store.insert(&doc).unwrap();
        assert!(matches!(store.insert(&doc), Err(StoreError::AlreadyExists(_))));
    }

    #[test]
    fn test_invalid_ids_rejected() {
        let (_dir, store) = store();
        for id in ["", "../escape", "a/b", ".hidden", "with space", "trailing."] {
            assert!(
                matches!(store.path_for(id), Err(StoreError::InvalidId(_))),
                "id {:?} should be invalid",
                id
            );
        }
    }

    #[test]
    fn test_identifier_mismatch_is_corrupt() {
        let (_dir, store) = store();
        let doc = Document::new("b", "item", "B");
        let body = serde_json::to_string(&doc).unwrap();
        fs::write(store.path_for("a").unwrap(), body).unwrap();
        assert!(matches!(store.load("a"), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_list_sorted_and_ignores_temp_files() {
        let (_dir, store) = store();
        store.save(&Document::new("b", "item", "B")).unwrap();
        store.save(&Document::new("a", "item", "A")).unwrap();
        fs::write(store.nodes_dir().join("c.json.tmp"), "{").unwrap();
        fs::write(store.nodes_dir().join("notes.txt"), "x").unwrap();
        assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let (_dir, store) = store();
        store.save(&Document::new("a", "item", "A")).unwrap();
        assert!(!store.nodes_dir().join("a.json.tmp").exists());
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = store();
        store.save(&Document::new("a", "item", "A")).unwrap();
        store.delete("a").unwrap();
        assert!(!store.exists("a").unwrap());
        assert!(matches!(store.delete("a"), Err(StoreError::NotFound(_))));
    }
}
