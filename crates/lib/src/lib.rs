//! steward-lib: the reconciliation core of the steward agent
//!
//! Two subsystems live here:
//!
//! - the applier: a bundle store plus package and job appliers that
//!   reconcile the local filesystem against a desired manifest, with
//!   garbage collection of whatever fell out of the desired set
//! - the network planner: a pure computation from the logical network
//!   manifest and the host's NIC inventory to concrete static and DHCP
//!   interface configurations
//!
//! Host capabilities (blob fetching, archive extraction, process
//! execution, supervision) are injected at construction so the engine
//! itself stays deterministic and testable.

pub mod applier;
pub mod bundles;
pub mod jobs;
pub mod net;
pub mod packages;
pub mod supervisor;

#[cfg(test)]
mod testutil;
