//! Local listening address resolution

use std::net::{IpAddr, Ipv4Addr};

use crate::error::{Error, Result};

/// Interface the listener binds to unless told otherwise
pub const DEFAULT_INTERFACE: &str = "en0";

/// First non-loopback IPv4 address of the named interface
pub fn resolve_interface_ipv4(interface: &str) -> Result<Ipv4Addr> {
    let interfaces = get_if_addrs::get_if_addrs().map_err(|e| {
        Error::AddressResolution(format!("could not get network interfaces: {}", e))
    })?;

    pick_ipv4(
        interfaces
            .iter()
            .map(|iface| (iface.name.as_str(), iface.ip(), iface.is_loopback())),
        interface,
    )
    .ok_or_else(|| {
        Error::AddressResolution(format!(
            "no IPv4 address found on network interface '{}'",
            interface
        ))
    })
}

/// Pick an address from `(name, ip, is_loopback)` entries
pub fn pick_ipv4<'a>(
    entries: impl IntoIterator<Item = (&'a str, IpAddr, bool)>,
    interface: &str,
) -> Option<Ipv4Addr> {
    entries.into_iter().find_map(|(name, ip, is_loopback)| {
        if name != interface || is_loopback {
            return None;
        }
        match ip {
            IpAddr::V4(v4) if !v4.is_loopback() => Some(v4),
            _ => None,
        }
    })
}
