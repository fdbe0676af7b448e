//! Blob fetching with digest verification
//!
//! A blobstore hands out local files by blob id. The returned path is
//! owned by the caller and must be released with `clean_up`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::digest::MultiDigest;
use crate::{Error, Result};

pub trait Blobstore: Send + Sync {
    /// Fetch the blob `blobstore_id`, verify it against `digest`, and
    /// return a local path the caller owns.
    fn get(&self, blobstore_id: &str, digest: &MultiDigest) -> Result<PathBuf>;

    /// Release a file previously returned by `get`.
    fn clean_up(&self, path: &Path) -> Result<()>;
}

/// A fetched blob that is released back to its blobstore on drop.
pub struct FetchedBlob<'a> {
    blobstore: &'a dyn Blobstore,
    path: PathBuf,
}

impl<'a> FetchedBlob<'a> {
    pub fn fetch(
        blobstore: &'a dyn Blobstore,
        blobstore_id: &str,
        digest: &MultiDigest,
    ) -> Result<Self> {
        let path = blobstore.get(blobstore_id, digest)?;
        Ok(Self { blobstore, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FetchedBlob<'_> {
    fn drop(&mut self) {
        if let Err(error) = self.blobstore.clean_up(&self.path) {
            warn!(path = %self.path.display(), %error, "failed to release fetched blob");
        }
    }
}

/// Blobstore backed by a local directory of blobs keyed by id.
pub struct LocalBlobstore {
    blobs_dir: PathBuf,
    tmp_dir: PathBuf,
}

impl LocalBlobstore {
    pub fn new(blobs_dir: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            blobs_dir: blobs_dir.into(),
            tmp_dir: tmp_dir.into(),
        }
    }
}

impl Blobstore for LocalBlobstore {
    fn get(&self, blobstore_id: &str, digest: &MultiDigest) -> Result<PathBuf> {
        validate_blob_id(blobstore_id)?;

        let source = self.blobs_dir.join(blobstore_id);
        if !source.is_file() {
            return Err(Error::BlobNotFound {
                id: blobstore_id.to_string(),
                root: self.blobs_dir.clone(),
            });
        }

        let dest = allocate_blob_file(&self.tmp_dir)?;
        fs::copy(&source, &dest)?;
        verify_or_remove(&dest, digest)?;

        debug!(id = blobstore_id, path = %dest.display(), "fetched blob");
        Ok(dest)
    }

    fn clean_up(&self, path: &Path) -> Result<()> {
        remove_if_present(path)
    }
}

/// Blobstore talking to a plain HTTP object endpoint
/// (`GET <base_url>/<id>`).
pub struct HttpBlobstore {
    base_url: String,
    tmp_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl HttpBlobstore {
    pub fn new(base_url: impl Into<String>, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            tmp_dir: tmp_dir.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Blobstore for HttpBlobstore {
    fn get(&self, blobstore_id: &str, digest: &MultiDigest) -> Result<PathBuf> {
        validate_blob_id(blobstore_id)?;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), blobstore_id);
        debug!(%url, "fetching blob");

        let response = match self.client.get(&url).send()?.error_for_status() {
            Ok(response) => response,
            Err(error) => return Err(Error::Http(error)),
        };
        let bytes = response.bytes()?;

        let dest = allocate_blob_file(&self.tmp_dir)?;
        let mut file = File::create(&dest)?;
        file.write_all(&bytes)?;
        verify_or_remove(&dest, digest)?;

        debug!(id = blobstore_id, path = %dest.display(), "fetched blob");
        Ok(dest)
    }

    fn clean_up(&self, path: &Path) -> Result<()> {
        remove_if_present(path)
    }
}

fn validate_blob_id(blobstore_id: &str) -> Result<()> {
    if blobstore_id.is_empty() || blobstore_id.contains(['/', '\\']) || blobstore_id == ".." {
        return Err(Error::InvalidBlobId(blobstore_id.to_string()));
    }
    Ok(())
}

fn allocate_blob_file(tmp_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(tmp_dir)?;
    let file = tempfile::Builder::new()
        .prefix("steward-blob-")
        .tempfile_in(tmp_dir)?;
    let (_, path) = file.keep().map_err(|e| Error::Io(e.error))?;
    Ok(path)
}

/// On mismatch the fetched file is removed before the error surfaces,
/// so a failed fetch leaves nothing behind.
fn verify_or_remove(path: &Path, digest: &MultiDigest) -> Result<()> {
    match digest.verify_file(path) {
        Ok(()) => Ok(()),
        Err(error) => {
            let _ = fs::remove_file(path);
            Err(error)
        }
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}
