use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{Error, Result};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Reports,
    Avatars,
}

impl Bucket {
    fn dir_name(self) -> &'static str {
        match self {
            Bucket::Reports => "reports",
            Bucket::Avatars => "avatars",
        }
    }
}

/// Accumulates upload chunks and fails as soon as the running total passes
/// the limit, so an oversized body is never fully buffered.
pub struct SizeLimitedBuffer {
    buf: BytesMut,
    limit: usize,
}

impl SizeLimitedBuffer {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            limit,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        if self.buf.len() + chunk.len() > self.limit {
            return Err(Error::PayloadTooLarge(format!(
                "upload exceeds maximum allowed size ({} bytes)",
                self.limit
            )));
        }
        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// The result of a successful write.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub stored_name: String,
    pub size_bytes: i64,
    pub sha256: String,
}

/// Disk storage for uploaded files under `<data_dir>/uploads`.
pub struct UploadStorage {
    base_path: PathBuf,
    max_bytes: usize,
}

impl UploadStorage {
    pub fn new(data_dir: &Path, max_bytes: usize) -> Self {
        Self {
            base_path: data_dir.join("uploads"),
            max_bytes,
        }
    }

    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn blob_path(&self, bucket: Bucket, stored_name: &str) -> PathBuf {
        self.base_path.join(bucket.dir_name()).join(stored_name)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join("tmp").join(Uuid::new_v4().to_string())
    }

    /// Writes `data` to a temporary file, then renames it into the bucket.
    pub async fn put(&self, bucket: Bucket, data: &[u8]) -> Result<StoredBlob> {
        if data.len() > self.max_bytes {
            return Err(Error::PayloadTooLarge(format!(
                "upload exceeds maximum allowed size ({} bytes)",
                self.max_bytes
            )));
        }

        let sha256 = hex::encode(Sha256::digest(data));
        let stored_name = Uuid::new_v4().to_string();

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;

        let final_path = self.blob_path(bucket, &stored_name);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(StoredBlob {
            stored_name,
            size_bytes: data.len() as i64,
            sha256,
        })
    }

    pub async fn open(&self, bucket: Bucket, stored_name: &str) -> Result<File> {
        validate_stored_name(stored_name)?;
        File::open(self.blob_path(bucket, stored_name))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::NotFound,
                _ => Error::Io(e),
            })
    }

    pub async fn delete(&self, bucket: Bucket, stored_name: &str) -> Result<bool> {
        validate_stored_name(stored_name)?;
        match fs::remove_file(self.blob_path(bucket, stored_name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

fn validate_stored_name(stored_name: &str) -> Result<()> {
    Uuid::parse_str(stored_name)
        .map(|_| ())
        .map_err(|_| Error::BadRequest("invalid stored file name".to_string()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    use super::*;

    #[test]
    fn test_size_limited_buffer_rejects_past_limit() {
        let mut buf = SizeLimitedBuffer::new(10);
        buf.push(b"12345").unwrap();
        buf.push(b"67890").unwrap();
        assert_eq!(buf.len(), 10);
        assert!(matches!(buf.push(b"x"), Err(Error::PayloadTooLarge(_))));
        assert_eq!(buf.freeze().as_ref(), b"1234567890");
    }

    #[tokio::test]
    async fn test_put_and_open() {
        let dir = TempDir::new().unwrap();
        let storage = UploadStorage::new(dir.path(), 1024);

        let blob = storage.put(Bucket::Reports, b"hello").await.unwrap();
        assert_eq!(blob.size_bytes, 5);
        assert_eq!(
            blob.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );

        let mut file = storage.open(Bucket::Reports, &blob.stored_name).await.unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "hello");

        assert!(
            storage
                .open(Bucket::Avatars, &blob.stored_name)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_oversized_put_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let storage = UploadStorage::new(dir.path(), 4);

        let result = storage.put(Bucket::Avatars, b"too large").await;
        assert!(matches!(result, Err(Error::PayloadTooLarge(_))));
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_delete_and_path_traversal() {
        let dir = TempDir::new().unwrap();
        let storage = UploadStorage::new(dir.path(), 1024);

        let blob = storage.put(Bucket::Avatars, b"png").await.unwrap();
        assert!(storage.delete(Bucket::Avatars, &blob.stored_name).await.unwrap());
        assert!(!storage.delete(Bucket::Avatars, &blob.stored_name).await.unwrap());

        assert!(matches!(
            storage.open(Bucket::Reports, "../../etc/passwd").await,
            Err(Error::BadRequest(_))
        ));
    }
}
