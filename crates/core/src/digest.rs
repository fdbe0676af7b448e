//! Content digests for blob verification
//!
//! Manifests reference blobs by digest. Legacy manifests carry a bare
//! SHA1 hex string; newer manifests tag the algorithm (`sha256:<hex>`)
//! and may list several acceptable digests separated by `;`.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest as _, Sha256, Sha512};

use crate::{Error, Result};

/// Digest algorithms understood by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }

    fn parse(name: &str) -> Result<Self> {
        match name {
            "sha1" => Ok(Algorithm::Sha1),
            "sha256" => Ok(Algorithm::Sha256),
            "sha512" => Ok(Algorithm::Sha512),
            other => Err(Error::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// One algorithm + hex pair.
///
/// Untagged values are SHA1; comparison is on algorithm and hex, so a
/// tagged `sha1:<hex>` equals the bare form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    algorithm: Algorithm,
    hex: String,
}

impl Digest {
    pub fn new(algorithm: Algorithm, hex: impl Into<String>) -> Self {
        Self {
            algorithm,
            hex: hex.into(),
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.split_once(':') {
            Some((tag, hex)) => Ok(Self::new(Algorithm::parse(tag)?, hex)),
            // Legacy wire format: bare hex implies SHA1
            None => Ok(Self::new(Algorithm::Sha1, value)),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Digest `reader` with this digest's algorithm and compare.
    pub fn matches<R: Read>(&self, reader: R) -> Result<bool> {
        let actual = digest_reader(self.algorithm, reader)?;
        Ok(actual.eq_ignore_ascii_case(&self.hex))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SHA1 keeps the legacy untagged rendering
        match self.algorithm {
            Algorithm::Sha1 => write!(f, "{}", self.hex),
            other => write!(f, "{}:{}", other.name(), self.hex),
        }
    }
}

impl TryFrom<String> for Digest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Digest::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> String {
        digest.to_string()
    }
}

/// One or more acceptable digests for a blob (`;`-separated on the
/// wire). Verification succeeds when at least one member matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MultiDigest {
    digests: Vec<Digest>,
}

impl MultiDigest {
    pub fn parse(value: &str) -> Result<Self> {
        let digests = value
            .split(';')
            .filter(|part| !part.is_empty())
            .map(Digest::parse)
            .collect::<Result<Vec<_>>>()?;

        if digests.is_empty() {
            return Err(Error::EmptyDigest);
        }

        Ok(Self { digests })
    }

    pub fn digests(&self) -> &[Digest] {
        &self.digests
    }

    /// Verify that at least one member digest matches the file at
    /// `path`. The file is re-read per algorithm tried.
    pub fn verify_file(&self, path: &Path) -> Result<()> {
        for digest in &self.digests {
            let file = File::open(path)?;
            if digest.matches(BufReader::new(file))? {
                return Ok(());
            }
        }

        Err(Error::DigestMismatch {
            expected: self.to_string(),
            path: path.to_path_buf(),
        })
    }
}

impl fmt::Display for MultiDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.digests.iter().map(Digest::to_string).collect();
        write!(f, "{}", rendered.join(";"))
    }
}

impl From<Digest> for MultiDigest {
    fn from(digest: Digest) -> Self {
        Self {
            digests: vec![digest],
        }
    }
}

impl TryFrom<String> for MultiDigest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        MultiDigest::parse(&value)
    }
}

impl From<MultiDigest> for String {
    fn from(digest: MultiDigest) -> String {
        digest.to_string()
    }
}

fn digest_reader<R: Read>(algorithm: Algorithm, reader: R) -> Result<String> {
    match algorithm {
        Algorithm::Sha1 => hash_reader::<Sha1, R>(reader),
        Algorithm::Sha256 => hash_reader::<Sha256, R>(reader),
        Algorithm::Sha512 => hash_reader::<Sha512, R>(reader),
    }
}

fn hash_reader<D: sha2::Digest, R: Read>(mut reader: R) -> Result<String> {
    let mut hasher = D::new();

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
