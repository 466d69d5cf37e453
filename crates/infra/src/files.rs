//! Uploaded-file storage.
//!
//! Captures reference their invoice image by an opaque key; the extraction
//! worker resolves the key back to bytes through [`FileStore`]. Keys have the
//! shape `<uuid>-<original file name>`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use forgescan_core::TenantId;
use uuid::Uuid;

/// File storage abstraction, tenant-isolated like the record stores.
pub trait FileStore: Send + Sync {
    /// Store bytes under a fresh key and return the key.
    fn put(
        &self,
        tenant_id: TenantId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, FileStoreError>;

    /// Resolve a key back to the stored file. Unknown keys yield `None`.
    fn get(&self, tenant_id: TenantId, key: &str) -> Result<Option<StoredFile>, FileStoreError>;
}

impl<S> FileStore for Arc<S>
where
    S: FileStore + ?Sized,
{
    fn put(
        &self,
        tenant_id: TenantId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, FileStoreError> {
        (**self).put(tenant_id, file_name, bytes)
    }

    fn get(&self, tenant_id: TenantId, key: &str) -> Result<Option<StoredFile>, FileStoreError> {
        (**self).get(tenant_id, key)
    }
}

/// A stored file with its original name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// File store error.
#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("invalid file name: {0}")]
    InvalidFileName(String),
    #[error("file storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reject empty names and anything that could leave the storage root.
fn validate_name(name: &str) -> Result<(), FileStoreError> {
    if name.trim().is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
    {
        return Err(FileStoreError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

fn new_key(file_name: &str) -> String {
    format!("{}-{}", Uuid::now_v7(), file_name)
}

/// Original file name embedded in a key (`<uuid>-<name>`).
fn file_name_of(key: &str) -> &str {
    key.get(37..).unwrap_or(key)
}

/// In-memory file store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    inner: RwLock<HashMap<(TenantId, String), Vec<u8>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl FileStore for InMemoryFileStore {
    fn put(
        &self,
        tenant_id: TenantId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, FileStoreError> {
        validate_name(file_name)?;
        let key = new_key(file_name);
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, key.clone()), bytes);
        }
        Ok(key)
    }

    fn get(&self, tenant_id: TenantId, key: &str) -> Result<Option<StoredFile>, FileStoreError> {
        validate_name(key)?;
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };
        Ok(map
            .get(&(tenant_id, key.to_string()))
            .map(|bytes| StoredFile {
                file_name: file_name_of(key).to_string(),
                bytes: bytes.clone(),
            }))
    }
}

/// Directory-backed file store: `<root>/<tenant_id>/<key>`.
#[derive(Debug)]
pub struct LocalDirFileStore {
    root: PathBuf,
}

impl LocalDirFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn tenant_dir(&self, tenant_id: TenantId) -> PathBuf {
        self.root.join(tenant_id.to_string())
    }
}

impl FileStore for LocalDirFileStore {
    fn put(
        &self,
        tenant_id: TenantId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, FileStoreError> {
        validate_name(file_name)?;
        let key = new_key(file_name);

        let dir = self.tenant_dir(tenant_id);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(&key), bytes)?;
        Ok(key)
    }

    fn get(&self, tenant_id: TenantId, key: &str) -> Result<Option<StoredFile>, FileStoreError> {
        validate_name(key)?;
        match std::fs::read(self.tenant_dir(tenant_id).join(key)) {
            Ok(bytes) => Ok(Some(StoredFile {
                file_name: file_name_of(key).to_string(),
                bytes,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
