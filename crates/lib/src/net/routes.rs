//! Kernel route enumeration.

use std::net::Ipv4Addr;
use std::sync::Arc;

use thiserror::Error;

use steward_platform::runner::CommandRunner;

use super::settings::Route;

#[derive(Debug, Error)]
pub enum RouteSearchError {
  #[error("running ip route: {0}")]
  Command(#[from] steward_platform::Error),
}

/// Enumerates the host's current routing table.
pub trait RoutesSearcher: Send + Sync {
  fn search_routes(&self) -> Result<Vec<Route>, RouteSearchError>;
}

/// Reads routes with `ip route` through the command runner.
pub struct IpRouteSearcher {
  runner: Arc<dyn CommandRunner>,
}

impl IpRouteSearcher {
  pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
    Self { runner }
  }
}

impl RoutesSearcher for IpRouteSearcher {
  fn search_routes(&self) -> Result<Vec<Route>, RouteSearchError> {
    let output = self.runner.run("ip", &["route"])?;
    Ok(parse_ip_route(&output.stdout))
  }
}

/// Parses `ip route` output lines such as
/// `default via 10.0.0.1 dev eth0` and
/// `10.244.0.0/24 via 10.0.0.5 dev eth0`. Lines that do not describe a
/// v4 destination are skipped.
fn parse_ip_route(output: &str) -> Vec<Route> {
  let mut routes = Vec::new();

  for line in output.lines() {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let Some(&first) = fields.first() else {
      continue;
    };

    let (destination, netmask) = if first == "default" {
      ("0.0.0.0".to_string(), "0.0.0.0".to_string())
    } else {
      match parse_destination(first) {
        Some(pair) => pair,
        None => continue,
      }
    };

    let gateway = fields
      .iter()
      .position(|&f| f == "via")
      .and_then(|i| fields.get(i + 1))
      .map(|g| g.to_string())
      .unwrap_or_default();

    routes.push(Route {
      destination,
      gateway,
      netmask,
    });
  }

  routes
}

fn parse_destination(field: &str) -> Option<(String, String)> {
  match field.split_once('/') {
    Some((address, prefix)) => {
      address.parse::<Ipv4Addr>().ok()?;
      let bits: u32 = prefix.parse().ok()?;
      if bits > 32 {
        return None;
      }
      let mask = if bits == 0 { 0 } else { u32::MAX << (32 - bits) };
      Some((address.to_string(), Ipv4Addr::from(mask).to_string()))
    }
    None => {
      field.parse::<Ipv4Addr>().ok()?;
      Some((field.to_string(), "255.255.255.255".to_string()))
    }
  }
}
