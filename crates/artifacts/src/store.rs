//! Directory-scoped artifact storage implementation
//!
//! This module provides [`ArtifactStore`], the handoff buffer between the document generator
//! and the delivery path.
//!
//! # Lifecycle
//!
//! - **Create**: the generator writes a new artifact under a unique [`ArtifactName`]
//! - **Validate**: the generator checks the file exists, is non-empty and has the right magic
//! - **Serve**: the retrieval endpoint reads it by name for the messaging provider
//! - **Delete**: the delivery path removes it after a retention window
//! - **Reap**: anything older than the retention window is swept up periodically
//!
//! # Implementation Notes
//!
//! - The store holds no state besides its canonicalised directory
//! - Writes use `create_new`, so an existing artifact is never overwritten
//! - Concurrent writers only contend on distinct file names, so no locking is required

use crate::{ArtifactError, ArtifactName};
use chrono::{DateTime, Utc};
use clinic_types::NonEmptyText;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Metadata for a stored artifact
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// Validated file name within the artifact directory
    pub name: ArtifactName,

    /// Size of the artifact in bytes
    pub size_bytes: u64,

    /// Hexadecimal SHA-256 digest of the content
    pub sha256: String,

    /// Detected media type (MIME type), if available
    ///
    /// Best-effort detection from the content header, not authoritative.
    pub media_type: Option<NonEmptyText>,

    /// UTC timestamp when the artifact was stored
    pub stored_at: DateTime<Utc>,
}

/// Service for managing artifacts within a single directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root_directory: PathBuf,
}

impl ArtifactStore {
    /// Opens (creating if necessary) the artifact directory.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactError::InvalidDirectory` if the path exists but is not a directory,
    /// cannot be created, or cannot be canonicalised.
    pub fn new(root_directory: &Path) -> Result<Self, ArtifactError> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(ArtifactError::InvalidDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        fs::create_dir_all(root_directory).map_err(|e| {
            ArtifactError::InvalidDirectory(format!(
                "Cannot create directory {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            ArtifactError::InvalidDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    /// Returns the canonicalised artifact directory
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Absolute path an artifact with this name lives at.
    #[must_use]
    pub fn path_for(&self, name: &ArtifactName) -> PathBuf {
        self.root_directory.join(name.as_str())
    }

    /// Writes a new artifact.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactError::AlreadyExists` if an artifact with this name exists, or
    /// `ArtifactError::Io` if the file cannot be created or written.
    pub fn write(&self, name: &ArtifactName, bytes: &[u8]) -> Result<ArtifactMetadata, ArtifactError> {
        let path = self.path_for(name);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => ArtifactError::AlreadyExists(name.to_string()),
                _ => ArtifactError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create artifact {}: {}", path.display(), e),
                )),
            })?;

        fill_or_discard(&path, &mut file, bytes, |f| f.sync_all())?;

        tracing::debug!("stored artifact {} ({} bytes)", name, bytes.len());

        Ok(Self::metadata_for(name, bytes))
    }

    /// Reads an artifact's bytes.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactError::NotFound` if the artifact does not exist.
    pub fn read(&self, name: &ArtifactName) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path_for(name);

        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ArtifactError::NotFound(name.to_string()),
            _ => ArtifactError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read artifact {}: {}", path.display(), e),
            )),
        })
    }

    /// Checks that an artifact exists, is non-empty, and begins with `magic`.
    ///
    /// Only the header is read, so this is cheap even for large documents.
    pub fn validate(&self, name: &ArtifactName, magic: &[u8]) -> Result<u64, ArtifactError> {
        let path = self.path_for(name);

        let file = fs::File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ArtifactError::NotFound(name.to_string()),
            _ => ArtifactError::Io(e),
        })?;
        let size = file.metadata()?.len();
        if size == 0 {
            return Err(ArtifactError::Empty(name.to_string()));
        }

        let mut header = Vec::with_capacity(magic.len());
        file.take(magic.len() as u64).read_to_end(&mut header)?;
        if header != magic {
            return Err(ArtifactError::BadMagic {
                name: name.to_string(),
                found: header,
            });
        }

        Ok(size)
    }

    /// Deletes an artifact. Returns `false` if it was already gone.
    pub fn delete(&self, name: &ArtifactName) -> Result<bool, ArtifactError> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ArtifactError::Io(e)),
        }
    }

    /// Lists every stored artifact with a valid name, sorted.
    ///
    /// Entries that are not regular files or whose names fail validation are ignored.
    pub fn list(&self) -> Result<Vec<ArtifactName>, ArtifactError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root_directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if let Ok(name) = ArtifactName::parse(&file_name) {
                names.push(name);
            }
        }
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(names)
    }

    /// Deletes every artifact last modified more than `older_than` before `now`.
    ///
    /// Returns the names that were removed. Per-file failures are logged and skipped so one bad
    /// entry cannot stall the sweep.
    pub fn reap(
        &self,
        older_than: Duration,
        now: SystemTime,
    ) -> Result<Vec<ArtifactName>, ArtifactError> {
        let mut removed = Vec::new();

        for name in self.list()? {
            let path = self.path_for(&name);
            let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!("cannot stat artifact {}: {}", name, e);
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= older_than {
                continue;
            }

            match self.delete(&name) {
                Ok(true) => removed.push(name),
                Ok(false) => {}
                Err(e) => tracing::warn!("failed to reap artifact {}: {}", name, e),
            }
        }

        Ok(removed)
    }

    fn metadata_for(name: &ArtifactName, bytes: &[u8]) -> ArtifactMetadata {
        let mut hasher = Sha256::new();
        hasher.update(bytes);

        // Detect media type (best-effort)
        let media_type = infer::get(bytes).and_then(|kind| NonEmptyText::new(kind.mime_type()).ok());

        ArtifactMetadata {
            name: name.clone(),
            size_bytes: bytes.len() as u64,
            sha256: hex::encode(hasher.finalize()),
            media_type,
            stored_at: Utc::now(),
        }
    }
}

/// Writes `bytes` into a freshly created artifact file, removing the file if anything fails so
/// a partial artifact is never left behind to be served.
fn fill_or_discard<W: Write>(
    path: &Path,
    sink: &mut W,
    bytes: &[u8],
    finish: impl FnOnce(&mut W) -> std::io::Result<()>,
) -> Result<(), ArtifactError> {
    let written = sink.write_all(bytes).and_then(|()| finish(sink));

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(path) {
            tracing::warn!("failed to remove partial artifact {}: {}", path.display(), cleanup);
        }
        return Err(ArtifactError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write artifact {}: {}", path.display(), e),
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PDF_MAGIC;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn name(patient: &str, millis: i64) -> ArtifactName {
        ArtifactName::for_prescription(patient, Utc.timestamp_millis_opt(millis).unwrap())
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("temp");

        let store = ArtifactStore::new(&root).unwrap();

        assert!(root.is_dir());
        assert!(store.root_directory().ends_with("temp"));
    }

    #[test]
    fn test_new_rejects_file_path() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("file.txt");
        fs::write(&root, "not a directory").unwrap();

        let store = ArtifactStore::new(&root);

        assert!(matches!(store, Err(ArtifactError::InvalidDirectory(_))));
    }

    #[test]
    fn test_write_and_read() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path()).unwrap();
        let name = name("p1", 1);

        let metadata = store.write(&name, b"%PDF-1.3 body").unwrap();

        assert_eq!(metadata.name, name);
        assert_eq!(metadata.size_bytes, 13);
        assert_eq!(metadata.sha256.len(), 64);
        assert_eq!(
            metadata.media_type.as_ref().map(|t| t.as_str()),
            Some("application/pdf")
        );
        assert_eq!(store.read(&name).unwrap(), b"%PDF-1.3 body");
    }

    #[test]
    fn test_write_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path()).unwrap();
        let name = name("p1", 1);

        store.write(&name, b"first").unwrap();
        let second = store.write(&name, b"second");

        assert!(matches!(second, Err(ArtifactError::AlreadyExists(_))));
        assert_eq!(store.read(&name).unwrap(), b"first");
    }

    #[test]
    fn test_read_missing() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path()).unwrap();

        let result = store.read(&name("p1", 1));

        assert!(matches!(result, Err(ArtifactError::NotFound(_))));
    }

    #[test]
    fn test_validate() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path()).unwrap();

        let good = name("good", 1);
        store.write(&good, b"%PDF-1.3").unwrap();
        assert_eq!(store.validate(&good, PDF_MAGIC).unwrap(), 8);

        let empty = name("empty", 1);
        store.write(&empty, b"").unwrap();
        assert!(matches!(
            store.validate(&empty, PDF_MAGIC),
            Err(ArtifactError::Empty(_))
        ));

        let wrong = name("wrong", 1);
        store.write(&wrong, b"<html>").unwrap();
        assert!(matches!(
            store.validate(&wrong, PDF_MAGIC),
            Err(ArtifactError::BadMagic { found, .. }) if found == b"<htm"
        ));

        let short = name("short", 1);
        store.write(&short, b"%P").unwrap();
        assert!(matches!(
            store.validate(&short, PDF_MAGIC),
            Err(ArtifactError::BadMagic { .. })
        ));

        assert!(matches!(
            store.validate(&name("missing", 1), PDF_MAGIC),
            Err(ArtifactError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path()).unwrap();
        let name = name("p1", 1);
        store.write(&name, b"%PDF").unwrap();

        assert!(store.delete(&name).unwrap());
        assert!(!store.delete(&name).unwrap());
        assert!(!store.path_for(&name).exists());
    }

    #[test]
    fn test_list_skips_foreign_entries() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path()).unwrap();
        store.write(&name("b", 2), b"%PDF").unwrap();
        store.write(&name("a", 1), b"%PDF").unwrap();
        fs::write(temp.path().join(".hidden"), b"x").unwrap();
        fs::write(temp.path().join("has space.pdf"), b"x").unwrap();
        fs::create_dir(temp.path().join("subdir")).unwrap();

        let names: Vec<String> = store.list().unwrap().iter().map(|n| n.to_string()).collect();

        assert_eq!(
            names,
            vec!["prescription_a_1.pdf".to_string(), "prescription_b_2.pdf".to_string()]
        );
    }

    #[test]
    fn test_reap_removes_only_expired() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path()).unwrap();
        let first = name("p1", 1);
        let second = name("p2", 2);
        store.write(&first, b"%PDF").unwrap();
        store.write(&second, b"%PDF").unwrap();

        let retention = Duration::from_secs(300);

        let removed = store.reap(retention, SystemTime::now()).unwrap();
        assert!(removed.is_empty());
        assert_eq!(store.list().unwrap().len(), 2);

        let later = SystemTime::now() + Duration::from_secs(301);
        let removed = store.reap(retention, later).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_metadata_serialization() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path()).unwrap();
        let metadata = store.write(&name("p1", 1), b"%PDF-1.3").unwrap();

        let json = serde_json::to_string(&metadata).unwrap();

        assert!(json.contains("prescription_p1_1.pdf"));
        assert!(json.contains(&metadata.sha256));
    }

    /// Accepts a few bytes and then fails, like a disk filling up mid-write.
    struct FullDisk {
        accepted: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.accepted >= 4 {
                return Err(std::io::Error::new(ErrorKind::Other, "no space left on device"));
            }
            let n = buf.len().min(4 - self.accepted);
            self.accepted += n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_removes_partial_file() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path()).unwrap();
        let artifact = name("p1", 1);
        let path = store.path_for(&artifact);
        fs::write(&path, b"%PDF").unwrap();

        let mut sink = FullDisk { accepted: 0 };
        let result = fill_or_discard(&path, &mut sink, b"%PDF-1.3 truncated", |_| Ok(()));

        assert!(matches!(result, Err(ArtifactError::Io(_))));
        assert!(!path.exists());
        assert!(matches!(store.read(&artifact), Err(ArtifactError::NotFound(_))));
    }

    #[test]
    fn test_failed_sync_removes_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("prescription_p1_2.pdf");
        let mut file = fs::File::create(&path).unwrap();

        let result = fill_or_discard(&path, &mut file, b"%PDF-1.3", |_| {
            Err(std::io::Error::new(ErrorKind::Other, "I/O error"))
        });

        assert!(matches!(result, Err(ArtifactError::Io(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_successful_fill_keeps_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("prescription_p1_3.pdf");
        let mut file = fs::File::create(&path).unwrap();

        fill_or_discard(&path, &mut file, b"%PDF-1.3", |f| f.sync_all()).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.3");
    }
}
