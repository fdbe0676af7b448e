//! Planned interface configurations.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::addr::{prefix_length, AddrError};
use super::settings::Route;

/// Plan for one statically addressed interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticInterfaceConfiguration {
  pub name: String,
  pub address: String,
  pub netmask: String,
  pub network: String,
  pub broadcast: String,
  pub is_default_for_gateway: bool,
  pub mac: String,
  pub gateway: String,
  pub post_up_routes: Vec<Route>,
}

impl StaticInterfaceConfiguration {
  /// v6 plans carry no derived network or broadcast address.
  pub fn is_version6(&self) -> bool {
    self.network.is_empty() && self.broadcast.is_empty()
  }

  /// Prefix length of the netmask, as rendered in interface files.
  pub fn cidr(&self) -> Result<String, AddrError> {
    Ok(prefix_length(&self.netmask)?.to_string())
  }
}

/// All static plans for one host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StaticInterfaceConfigurations(pub Vec<StaticInterfaceConfiguration>);

impl StaticInterfaceConfigurations {
  pub fn has_version6(&self) -> bool {
    self.0.iter().any(StaticInterfaceConfiguration::is_version6)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, StaticInterfaceConfiguration> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// Plan for one DHCP-configured interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DhcpInterfaceConfiguration {
  pub name: String,
  pub address: String,
  pub mac: String,
  pub post_up_routes: Vec<Route>,
}

impl DhcpInterfaceConfiguration {
  /// An address hint that is not a v4 literal marks a v6 DHCP plan.
  pub fn is_version6(&self) -> bool {
    !self.address.is_empty() && self.address.parse::<Ipv4Addr>().is_err()
  }
}

/// All DHCP plans for one host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DhcpInterfaceConfigurations(pub Vec<DhcpInterfaceConfiguration>);

impl DhcpInterfaceConfigurations {
  pub fn has_version6(&self) -> bool {
    self.0.iter().any(DhcpInterfaceConfiguration::is_version6)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DhcpInterfaceConfiguration> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}
