//! Tarball extraction

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

use crate::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub trait Compressor: Send + Sync {
    /// Extract `tarball` into `dest`. The destination directory must
    /// already exist.
    fn decompress_file_to_dir(&self, tarball: &Path, dest: &Path) -> Result<()>;
}

/// Extracts gzip-compressed or plain tar archives, sniffing the gzip
/// magic rather than trusting file extensions.
#[derive(Debug, Default)]
pub struct TarballCompressor;

impl TarballCompressor {
    pub fn new() -> Self {
        Self
    }
}

impl Compressor for TarballCompressor {
    fn decompress_file_to_dir(&self, tarball: &Path, dest: &Path) -> Result<()> {
        if !dest.is_dir() {
            return Err(Error::MissingDestination(dest.to_path_buf()));
        }

        let mut file = File::open(tarball)?;
        let mut magic = [0u8; 2];
        let read = file.read(&mut magic)?;
        file.seek(SeekFrom::Start(0))?;

        if read == magic.len() && magic == GZIP_MAGIC {
            let decoder = GzDecoder::new(BufReader::new(file));
            Archive::new(decoder).unpack(dest)?;
        } else {
            Archive::new(BufReader::new(file)).unpack(dest)?;
        }

        debug!(tarball = %tarball.display(), dest = %dest.display(), "extracted archive");
        Ok(())
    }
}
