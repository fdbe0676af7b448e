//! Network manifest types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Logical networks keyed by name, ordered so planning is
/// deterministic.
pub type Networks = BTreeMap<String, Network>;

/// Role names a network may claim in its `default` set.
pub const DEFAULT_ROLE_GATEWAY: &str = "gateway";
pub const DEFAULT_ROLE_DNS: &str = "dns";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
  #[default]
  Manual,
  Dynamic,
}

/// One logical network from the platform manifest.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
  #[serde(rename = "type")]
  pub network_type: NetworkType,
  pub ip: String,
  pub netmask: String,
  pub gateway: String,
  pub mac: String,

  /// Secondary-address name (`eth0:1` style). Alias networks ride on
  /// an existing device instead of claiming a NIC of their own.
  pub alias: String,

  /// Roles this network is the system default for, e.g. `gateway`,
  /// `dns`.
  pub default: Vec<String>,
  pub dns: Vec<String>,
  pub routes: Vec<Route>,
}

impl Network {
  pub fn is_dynamic(&self) -> bool {
    self.network_type == NetworkType::Dynamic
  }

  /// Static networks declare an address to configure; everything else
  /// falls back to DHCP.
  pub fn is_static(&self) -> bool {
    !self.is_dynamic() && !self.ip.is_empty()
  }

  pub fn is_default_for(&self, role: &str) -> bool {
    self.default.iter().any(|r| r == role)
  }
}

/// A post-up route attached to an interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
  pub destination: String,
  pub gateway: String,
  pub netmask: String,
}
