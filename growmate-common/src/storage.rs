//! Blob storage for published artifacts
//!
//! A bucket is a directory under the storage root and each key is one file in
//! it. Writes go to a sibling temp file which is synced and then renamed over
//! the target, so readers see either the previous blob or the new one, never
//! a partial write.

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;
use tracing::debug;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifies one stored version of a blob
///
/// Every successful `put` yields a new generation; a reader compares
/// generations to decide whether its cached copy is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobGeneration {
    pub size: u64,
    pub modified_nanos: u128,
    pub inode: u64,
}

/// Metadata returned after a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    pub key: String,
    pub size: u64,
    /// Hex SHA-256 of the written bytes
    pub sha256: String,
    pub generation: BlobGeneration,
}

/// Durable key/value blob storage
pub trait BlobStore: Send + Sync {
    /// Atomically replace the blob under `key`
    fn put(&self, key: &str, bytes: &[u8]) -> Result<BlobMeta>;

    /// Read the full blob; `Error::NotFound` if absent
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Current generation, or `None` if the blob does not exist
    fn stat(&self, key: &str) -> Result<Option<BlobGeneration>>;

    /// Human-readable location, for logs
    fn describe(&self, key: &str) -> String;
}

/// Filesystem-backed bucket
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    bucket_dir: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) `bucket` under `root`
    pub fn open(root: &Path, bucket: &str) -> Result<Self> {
        validate_name(bucket, "bucket")?;
        let bucket_dir = root.join(bucket);
        fs::create_dir_all(&bucket_dir)?;
        Ok(Self { bucket_dir })
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf> {
        validate_name(key, "key")?;
        Ok(self.bucket_dir.join(key))
    }
}

/// Bucket names and keys are single path components
pub fn validate_name(name: &str, what: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(Error::InvalidInput(format!("Invalid blob {}: '{}'", what, name)));
    }
    Ok(())
}

fn generation_of(metadata: &fs::Metadata) -> BlobGeneration {
    let modified_nanos = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    #[cfg(unix)]
    let inode = {
        use std::os::unix::fs::MetadataExt;
        metadata.ino()
    };
    #[cfg(not(unix))]
    let inode = 0;

    BlobGeneration {
        size: metadata.len(),
        modified_nanos,
        inode,
    }
}

/// Persist directory entries so a completed rename survives a crash
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<BlobMeta> {
        let target = self.blob_path(key)?;
        let temp = self.bucket_dir.join(format!(
            ".{}.{}.{}.tmp",
            key,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let write_result = (|| -> Result<()> {
            let mut file = fs::File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&temp, &target)?;
            sync_dir(&self.bucket_dir)?;
            Ok(())
        })();

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        debug!("Wrote {} bytes to {}", bytes.len(), target.display());

        let metadata = fs::metadata(&target)?;
        Ok(BlobMeta {
            key: key.to_string(),
            size: bytes.len() as u64,
            sha256: format!("{:x}", Sha256::digest(bytes)),
            generation: generation_of(&metadata),
        })
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Blob not found: {}", path.display())))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn stat(&self, key: &str) -> Result<Option<BlobGeneration>> {
        let path = self.blob_path(key)?;
        match fs::metadata(&path) {
            Ok(metadata) => Ok(Some(generation_of(&metadata))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self, key: &str) -> String {
        self.bucket_dir.join(key).display().to_string()
    }
}
