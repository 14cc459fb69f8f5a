//! Hostname lookup for hosts on the local network.
//!
//! Two lookup paths are supported, both built on hand-crafted DNS-style datagrams:
//!
//! - Multicast DNS reverse lookup: a `PTR` query for `<d.c.b.a>.in-addr.arpa` sent to the mDNS
//!   group `224.0.0.251:5353`.
//! - NetBIOS Name Service node status: an `NBSTAT` query for the wildcard name `*` sent to
//!   `<host>:137`, answered with every name the host has registered.
//!
//! The [`query`] and [`response`] modules contain the pure message codec, [`resolver`] contains a
//! small synchronous send/receive loop on top of it.

use std::net::Ipv4Addr;

mod hex;
mod num;

pub mod name;
pub mod nbns;
pub mod packet;
pub mod query;
pub mod resolver;
pub mod response;

pub use packet::Error;

/// Size of unicast DNS message buffers.
///
/// Unicast DNS messages are limited to 512 Bytes.
pub const DNS_BUFFER_SIZE: usize = 512;

/// Size of NetBIOS node status response buffers.
///
/// Fits the fixed part of the response (57 Bytes, up to and including the name count), the
/// maximum of 255 name records of 18 Bytes each, and the 46 Bytes of node statistics.
pub const NBSTAT_BUFFER_SIZE: usize = 57 + 255 * 18 + 46;

/// Size of multicast DNS message buffers.
///
/// mDNS works entirely within a local network, so responders may send messages up to the size of
/// an Ethernet frame.
pub const MDNS_BUFFER_SIZE: usize = 1500;

/// The IPv4 mDNS multicast group.
pub const MDNS_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// Transaction ID used for reverse `PTR` queries (mDNS and unicast DNS).
///
/// Responders copy the ID into their response; it is the only thing correlating a response with
/// the query that triggered it.
pub const PTR_TRANSACTION_ID: u16 = 0xFEED;

/// Transaction ID used for NetBIOS `NBSTAT` queries.
pub const NBSTAT_TRANSACTION_ID: u16 = 0xF00D;

/// UDP ports of the protocols used for hostname lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum LookupPort {
    /// Unicast DNS.
    Dns = 53,
    /// Multicast DNS.
    Mdns = 5353,
    /// NetBIOS Name Service.
    Nbstat = 137,
}

impl LookupPort {
    #[inline]
    pub fn number(self) -> u16 {
        self as u16
    }
}
