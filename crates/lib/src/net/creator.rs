//! Interface configuration planning.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use super::addr::{network_and_broadcast, AddrError};
use super::interfaces::{
  DhcpInterfaceConfiguration, DhcpInterfaceConfigurations, StaticInterfaceConfiguration,
  StaticInterfaceConfigurations,
};
use super::settings::{Network, Networks, DEFAULT_ROLE_GATEWAY};

#[derive(Debug, Error)]
pub enum PlanError {
  #[error("No device found for MAC {mac} of network {network}")]
  NoDeviceForMac { mac: String, network: String },

  #[error("Too many networks: {networks} networks for {nics} interfaces")]
  TooManyNetworks { networks: usize, nics: usize },

  #[error("Networks '{first}' and '{second}' are both marked as default for gateway")]
  MultipleDefaultGateways { first: String, second: String },

  #[error("Dynamic network '{0}' cannot be the gateway default")]
  DynamicDefaultGateway(String),

  #[error("Dynamic network '{0}' cannot carry an alias")]
  DynamicAlias(String),

  #[error(transparent)]
  Addr(#[from] AddrError),
}

/// Plans concrete interface configurations from the network manifest
/// and the host's NIC inventory.
///
/// Planning is deterministic: networks are visited in name order and
/// NICs in MAC order, and each NIC is consumed exactly once.
#[derive(Debug, Default)]
pub struct InterfaceConfigurationCreator;

impl InterfaceConfigurationCreator {
  pub fn new() -> Self {
    Self
  }

  pub fn create_interface_configurations(
    &self,
    networks: &Networks,
    nic_by_mac: &BTreeMap<String, String>,
  ) -> Result<(StaticInterfaceConfigurations, DhcpInterfaceConfigurations), PlanError> {
    validate_defaults(networks)?;

    // Alias networks ride on an existing device and claim no NIC.
    let (alias_networks, device_networks): (Vec<_>, Vec<_>) = networks
      .iter()
      .partition(|(_, network)| !network.alias.is_empty() && network.mac.is_empty());

    if device_networks.len() > nic_by_mac.len() {
      return Err(PlanError::TooManyNetworks {
        networks: device_networks.len(),
        nics: nic_by_mac.len(),
      });
    }

    let mut unbound: BTreeMap<&str, &str> = nic_by_mac
      .iter()
      .map(|(mac, name)| (mac.as_str(), name.as_str()))
      .collect();
    let mut bound: Vec<(&str, &Network, String, String)> = Vec::new();

    // First pass: networks that name a MAC bind by exact lookup.
    for &(name, network) in device_networks.iter().filter(|(_, n)| !n.mac.is_empty()) {
      match unbound.remove(network.mac.as_str()) {
        Some(device) => bound.push((name, network, device.to_string(), network.mac.clone())),
        None => {
          return Err(PlanError::NoDeviceForMac {
            mac: network.mac.clone(),
            network: name.to_string(),
          });
        }
      }
    }

    // Second pass: MAC-less networks take the remaining NICs in MAC
    // order, adopting the device's MAC.
    for &(name, network) in device_networks.iter().filter(|(_, n)| n.mac.is_empty()) {
      let Some((mac, device)) = unbound.pop_first() else {
        return Err(PlanError::TooManyNetworks {
          networks: device_networks.len(),
          nics: nic_by_mac.len(),
        });
      };
      bound.push((name, network, device.to_string(), mac.to_string()));
    }

    let mut static_configs = Vec::new();
    let mut dhcp_configs = Vec::new();

    for (name, network, device, mac) in bound {
      if network.is_static() {
        static_configs.push(static_config(network, device, mac)?);
      } else {
        debug!(network = name, %device, "planned DHCP interface");
        dhcp_configs.push(DhcpInterfaceConfiguration {
          name: device,
          address: network.ip.clone(),
          mac: String::new(),
          post_up_routes: network.routes.clone(),
        });
      }
    }

    for (_, network) in alias_networks {
      static_configs.push(static_config(network, network.alias.clone(), String::new())?);
    }

    // NICs no manifest network claimed come up as plain DHCP.
    for (_, device) in unbound {
      dhcp_configs.push(DhcpInterfaceConfiguration {
        name: device.to_string(),
        ..DhcpInterfaceConfiguration::default()
      });
    }

    Ok((
      StaticInterfaceConfigurations(static_configs),
      DhcpInterfaceConfigurations(dhcp_configs),
    ))
  }
}

fn static_config(
  network: &Network,
  device: String,
  mac: String,
) -> Result<StaticInterfaceConfiguration, PlanError> {
  let (network_address, broadcast) = network_and_broadcast(&network.ip, &network.netmask)?;

  Ok(StaticInterfaceConfiguration {
    name: device,
    address: network.ip.clone(),
    netmask: network.netmask.clone(),
    network: network_address,
    broadcast,
    is_default_for_gateway: network.is_default_for(DEFAULT_ROLE_GATEWAY),
    mac,
    gateway: network.gateway.clone(),
    post_up_routes: network.routes.clone(),
  })
}

fn validate_defaults(networks: &Networks) -> Result<(), PlanError> {
  let mut gateway_network: Option<&str> = None;

  for (name, network) in networks {
    if network.is_default_for(DEFAULT_ROLE_GATEWAY) {
      if network.is_dynamic() {
        return Err(PlanError::DynamicDefaultGateway(name.clone()));
      }
      if let Some(first) = gateway_network {
        return Err(PlanError::MultipleDefaultGateways {
          first: first.to_string(),
          second: name.clone(),
        });
      }
      gateway_network = Some(name);
    }

    if network.is_dynamic() && !network.alias.is_empty() {
      return Err(PlanError::DynamicAlias(name.clone()));
    }
  }

  Ok(())
}
