//! Address and netmask arithmetic.

use std::net::{Ipv4Addr, Ipv6Addr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AddrError {
  #[error("Invalid IP '{0}'")]
  InvalidIp(String),

  #[error("Invalid netmask '{0}'")]
  InvalidNetmask(String),
}

/// Network and broadcast addresses for a static interface.
///
/// IPv4 yields dotted quads computed the way `ifupdown` would; IPv6
/// has no broadcast and yields empty strings for both.
pub fn network_and_broadcast(ip: &str, netmask: &str) -> Result<(String, String), AddrError> {
  if let Ok(address) = ip.parse::<Ipv4Addr>() {
    let mask: Ipv4Addr = netmask
      .parse()
      .map_err(|_| AddrError::InvalidNetmask(netmask.to_string()))?;

    let address = u32::from(address);
    let mask = u32::from(mask);
    let network = Ipv4Addr::from(address & mask);
    let broadcast = Ipv4Addr::from((address & mask) | !mask);

    return Ok((network.to_string(), broadcast.to_string()));
  }

  if ip.parse::<Ipv6Addr>().is_ok() {
    return Ok((String::new(), String::new()));
  }

  Err(AddrError::InvalidIp(ip.to_string()))
}

/// Prefix length of a dotted-quad or colon-form netmask.
pub fn prefix_length(netmask: &str) -> Result<u32, AddrError> {
  if let Ok(mask) = netmask.parse::<Ipv4Addr>() {
    return Ok(u32::from(mask).count_ones());
  }
  if let Ok(mask) = netmask.parse::<Ipv6Addr>() {
    return Ok(u128::from(mask).count_ones());
  }
  Err(AddrError::InvalidNetmask(netmask.to_string()))
}
