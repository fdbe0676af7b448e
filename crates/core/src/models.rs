//! Desired-state model handed down by the director
//!
//! Jobs and packages are identified by `(name, version)`; bundles are
//! looked up through the `BundleDefinition` contract so the bundle
//! collection stays the single source of truth.

use serde::{Deserialize, Serialize};

use crate::digest::MultiDigest;

/// Identifies a bundle by name and version within a collection.
pub trait BundleDefinition {
    fn bundle_name(&self) -> &str;
    fn bundle_version(&self) -> &str;
}

/// Where an archive lives in the blobstore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub blobstore_id: String,

    /// Field name kept from the wire format; the value may carry any
    /// supported algorithm, or several separated by `;`.
    pub sha1: MultiDigest,

    /// Subtree of the extracted archive to install. Empty for
    /// packages, whose archives install whole.
    #[serde(default)]
    pub path_in_archive: String,
}

/// A versioned, supervisable unit of software on the VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub version: String,
    pub source: Source,

    /// Dependent packages, applied in declared order.
    #[serde(default)]
    pub packages: Vec<Package>,
}

/// A versioned artifact shared by jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub source: Source,
}

impl BundleDefinition for Job {
    fn bundle_name(&self) -> &str {
        &self.name
    }

    fn bundle_version(&self) -> &str {
        &self.version
    }
}

impl BundleDefinition for Package {
    fn bundle_name(&self) -> &str {
        &self.name
    }

    fn bundle_version(&self) -> &str {
        &self.version
    }
}

/// The desired state document for one VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySpec {
    #[serde(default)]
    pub jobs: Vec<Job>,
}
