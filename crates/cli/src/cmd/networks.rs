//! Implementation of the `steward networks` command.
//!
//! Loads the network manifest plus a NIC inventory (from a file or by
//! enumerating `/sys/class/net`), runs the planner, and prints the
//! resulting static and DHCP interface configurations.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use steward_lib::net::creator::InterfaceConfigurationCreator;
use steward_lib::net::interfaces::{DhcpInterfaceConfigurations, StaticInterfaceConfigurations};
use steward_lib::net::settings::Networks;

use crate::output::{self, OutputFormat};

#[derive(Serialize)]
struct Plan {
  static_interfaces: StaticInterfaceConfigurations,
  dhcp_interfaces: DhcpInterfaceConfigurations,
}

pub fn cmd_networks(settings_path: &Path, nics: Option<&Path>, format: OutputFormat) -> Result<()> {
  let raw = fs::read_to_string(settings_path)
    .with_context(|| format!("Reading network settings {}", settings_path.display()))?;
  let networks: Networks = serde_json::from_str(&raw)
    .with_context(|| format!("Parsing network settings {}", settings_path.display()))?;

  let nic_by_mac = match nics {
    Some(path) => read_nic_map(path)?,
    None => enumerate_sys_class_net()?,
  };

  debug!(
    networks = networks.len(),
    nics = nic_by_mac.len(),
    "planning interfaces"
  );

  let creator = InterfaceConfigurationCreator::new();
  let (static_interfaces, dhcp_interfaces) = creator
    .create_interface_configurations(&networks, &nic_by_mac)
    .context("Planning interface configurations")?;

  if format.is_json() {
    return output::print_json(&Plan {
      static_interfaces,
      dhcp_interfaces,
    });
  }

  for config in static_interfaces.iter() {
    let marker = if config.is_default_for_gateway {
      " (default gateway)"
    } else {
      ""
    };
    let cidr = config.cidr().context("Computing prefix length")?;
    output::print_info(&format!(
      "{} static {}/{} via {}{}",
      config.name, config.address, cidr, config.gateway, marker
    ));
  }
  for config in dhcp_interfaces.iter() {
    output::print_info(&format!("{} dhcp", config.name));
  }

  Ok(())
}

fn read_nic_map(path: &Path) -> Result<BTreeMap<String, String>> {
  let raw = fs::read_to_string(path)
    .with_context(|| format!("Reading NIC map {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("Parsing NIC map {}", path.display()))
}

/// MAC to device name pairs from `/sys/class/net`, skipping loopback
/// and devices without a hardware address.
fn enumerate_sys_class_net() -> Result<BTreeMap<String, String>> {
  let mut nics = BTreeMap::new();

  let entries = fs::read_dir("/sys/class/net").context("Reading /sys/class/net")?;
  for entry in entries {
    let entry = entry.context("Reading /sys/class/net")?;
    let name = entry.file_name().to_string_lossy().into_owned();
    if name == "lo" {
      continue;
    }

    let Ok(mac) = fs::read_to_string(entry.path().join("address")) else {
      continue;
    };
    let mac = mac.trim().to_string();
    if mac.is_empty() {
      continue;
    }

    nics.insert(mac, name);
  }

  Ok(nics)
}
