//! Content-addressed store operations
//!
//! ## Layout
//!
//! `{root}/{sha256[0:2]}/{sha256[2:4]}/{sha256}` - the two-level fan-out
//! keeps any single directory bounded and the full hash in the filename makes
//! files self-describing for recovery. Temp files live in `{root}/.tmp` so
//! the final rename never crosses a filesystem boundary.
//!
//! ## Write protocol
//!
//! [`BlobStore::writer`] → [`BlobWriter::write_chunk`]* →
//! [`BlobWriter::finish`] → [`StagedBlob::commit`] or
//! [`StagedBlob::discard`]. SHA-256 and QuickXorHash are computed
//! incrementally while streaming; the caller can inspect both on the staged
//! blob before deciding to commit. Temp files are removed on every exit
//! path, including drop.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::quickxor::QuickXorHash;
use crate::BlobError;

/// Bytes of the stream head retained for MIME sniffing.
const HEAD_SNIFF_BYTES: usize = 512;

/// Fallback when neither the server nor the sniffer knows the type.
const OCTET_STREAM: &str = "application/octet-stream";

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Result of committing a staged blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResult {
    /// Lowercase hex SHA-256 of the content
    pub sha256: String,
    /// Content length in bytes
    pub size: u64,
    /// Server-reported or sniffed MIME type
    pub mime: String,
    /// False when an identical blob file already existed (idempotent put)
    pub newly_written: bool,
}

/// Outcome of [`BlobStore::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// File present, size and hash match
    Ok,
    /// File absent
    Missing,
    /// File present but size or hash differ
    Corrupt,
}

/// Filesystem layer mapping SHA-256 → bytes.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Opens (and creates if needed) a blob store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| BlobError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derived path of a blob file: `{root}/{sha[0:2]}/{sha[2:4]}/{sha}`.
    pub fn blob_path(&self, sha256: &str) -> PathBuf {
        self.root
            .join(&sha256[0..2])
            .join(&sha256[2..4])
            .join(sha256)
    }

    /// Starts a streaming write into a temp file next to the final layout.
    pub async fn writer(&self) -> Result<BlobWriter, BlobError> {
        let tmp_dir = self.root.join(".tmp");
        tokio::fs::create_dir_all(&tmp_dir)
            .await
            .map_err(|e| BlobError::io(&tmp_dir, e))?;

        let temp_path = tmp_dir.join(format!(
            "put-{}-{}",
            std::process::id(),
            TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| BlobError::io(&temp_path, e))?;

        Ok(BlobWriter {
            root: self.root.clone(),
            temp_path,
            file: Some(file),
            sha: Sha256::new(),
            quick_xor: QuickXorHash::new(),
            head: Vec::with_capacity(HEAD_SNIFF_BYTES),
            size: 0,
        })
    }

    /// Streams a full buffer through the write protocol and commits it.
    pub async fn put_bytes(
        &self,
        bytes: &[u8],
        server_mime: Option<&str>,
    ) -> Result<PutResult, BlobError> {
        let mut writer = self.writer().await?;
        writer.write_chunk(bytes).await?;
        writer.finish(server_mime).await?.commit().await
    }

    /// Opens a blob file for reading.
    ///
    /// # Errors
    /// `BlobError::NotFound` when no file exists for the hash.
    pub async fn open_blob(&self, sha256: &str) -> Result<tokio::fs::File, BlobError> {
        let path = self.blob_path(sha256);
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(sha256.to_string()))
            }
            Err(e) => Err(BlobError::io(&path, e)),
        }
    }

    /// Removes a blob file and opportunistically prunes empty parents.
    ///
    /// Must only be called after the catalog decremented the blob's refcount
    /// to zero. Removing an already-absent file is not an error.
    pub async fn delete(&self, sha256: &str) -> Result<(), BlobError> {
        let path = self.blob_path(sha256);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(sha256, "blob file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(sha256, "blob file already absent on delete");
                return Ok(());
            }
            Err(e) => return Err(BlobError::io(&path, e)),
        }

        // Prune the fan-out directories if this was the last file in them.
        if let Some(level2) = path.parent() {
            if tokio::fs::remove_dir(level2).await.is_ok() {
                if let Some(level1) = level2.parent() {
                    let _ = tokio::fs::remove_dir(level1).await;
                }
            }
        }
        Ok(())
    }

    /// Rehashes a blob file and compares against the expected identity.
    pub async fn verify(
        &self,
        sha256: &str,
        expected_size: u64,
    ) -> Result<VerifyOutcome, BlobError> {
        let mut file = match self.open_blob(sha256).await {
            Ok(file) => file,
            Err(BlobError::NotFound(_)) => return Ok(VerifyOutcome::Missing),
            Err(e) => return Err(e),
        };

        let mut hasher = Sha256::new();
        let mut size: u64 = 0;
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = file
                .read(&mut buf)
                .await
                .map_err(|e| BlobError::io(&self.blob_path(sha256), e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size += n as u64;
        }

        let actual = format!("{:x}", hasher.finalize());
        if size != expected_size || actual != sha256 {
            return Ok(VerifyOutcome::Corrupt);
        }
        Ok(VerifyOutcome::Ok)
    }
}

/// In-progress streaming write. See the module docs for the protocol.
pub struct BlobWriter {
    root: PathBuf,
    temp_path: PathBuf,
    file: Option<tokio::fs::File>,
    sha: Sha256,
    quick_xor: QuickXorHash,
    head: Vec<u8>,
    size: u64,
}

impl BlobWriter {
    /// Appends a chunk, updating both digests incrementally.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), BlobError> {
        let file = self
            .file
            .as_mut()
            .expect("write_chunk after finish/abort");
        file.write_all(chunk)
            .await
            .map_err(|e| BlobError::io(&self.temp_path, e))?;

        self.sha.update(chunk);
        self.quick_xor.update(chunk);
        if self.head.len() < HEAD_SNIFF_BYTES {
            let take = (HEAD_SNIFF_BYTES - self.head.len()).min(chunk.len());
            self.head.extend_from_slice(&chunk[..take]);
        }
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Flushes the temp file and seals the digests.
    ///
    /// The MIME type is the server-reported one when given, otherwise sniffed
    /// from the leading bytes.
    pub async fn finish(mut self, server_mime: Option<&str>) -> Result<StagedBlob, BlobError> {
        let mut file = self.file.take().expect("finish called twice");
        file.flush()
            .await
            .map_err(|e| BlobError::io(&self.temp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| BlobError::io(&self.temp_path, e))?;
        drop(file);

        let sha256 = format!("{:x}", std::mem::take(&mut self.sha).finalize());
        let quick_xor = std::mem::take(&mut self.quick_xor).finalize_base64();
        let mime = match server_mime {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => infer::get(&self.head)
                .map(|kind| kind.mime_type().to_string())
                .unwrap_or_else(|| OCTET_STREAM.to_string()),
        };

        let staged = StagedBlob {
            root: self.root.clone(),
            temp_path: self.temp_path.clone(),
            sha256,
            size: self.size,
            mime,
            quick_xor,
            settled: false,
        };
        // Ownership of the temp file passed to the staged blob.
        self.temp_path = PathBuf::new();
        Ok(staged)
    }

    /// Drops the in-progress write and removes the temp file.
    pub async fn abort(mut self) {
        self.file.take();
        if !self.temp_path.as_os_str().is_empty() {
            let _ = tokio::fs::remove_file(&self.temp_path).await;
            self.temp_path = PathBuf::new();
        }
    }
}

impl Drop for BlobWriter {
    fn drop(&mut self) {
        if !self.temp_path.as_os_str().is_empty() {
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

/// A fully-streamed blob awaiting commit or discard.
pub struct StagedBlob {
    root: PathBuf,
    temp_path: PathBuf,
    sha256: String,
    size: u64,
    mime: String,
    quick_xor: String,
    settled: bool,
}

impl StagedBlob {
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Base64 QuickXorHash of the streamed bytes, for server comparison.
    pub fn quick_xor_base64(&self) -> &str {
        &self.quick_xor
    }

    /// Atomically renames the temp file to its hash-derived path.
    ///
    /// When a file with the same hash and size already exists the temp file
    /// is discarded instead, making the put idempotent.
    pub async fn commit(mut self) -> Result<PutResult, BlobError> {
        let final_path = self
            .root
            .join(&self.sha256[0..2])
            .join(&self.sha256[2..4])
            .join(&self.sha256);

        let newly_written = match tokio::fs::metadata(&final_path).await {
            Ok(meta) if meta.len() == self.size => {
                debug!(sha256 = %self.sha256, "blob already present, discarding temp");
                tokio::fs::remove_file(&self.temp_path)
                    .await
                    .map_err(|e| BlobError::io(&self.temp_path, e))?;
                false
            }
            _ => {
                if let Some(parent) = final_path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| BlobError::io(parent, e))?;
                }
                tokio::fs::rename(&self.temp_path, &final_path)
                    .await
                    .map_err(|e| BlobError::io(&final_path, e))?;
                debug!(sha256 = %self.sha256, size = self.size, "blob committed");
                true
            }
        };

        self.settled = true;
        Ok(PutResult {
            sha256: self.sha256.clone(),
            size: self.size,
            mime: self.mime.clone(),
            newly_written,
        })
    }

    /// Removes the temp file without committing.
    pub async fn discard(mut self) -> Result<(), BlobError> {
        tokio::fs::remove_file(&self.temp_path)
            .await
            .map_err(|e| BlobError::io(&self.temp_path, e))?;
        self.settled = true;
        Ok(())
    }
}

impl Drop for StagedBlob {
    fn drop(&mut self) {
        if !self.settled {
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}
