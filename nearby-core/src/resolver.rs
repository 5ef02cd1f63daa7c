use crate::udp;
use crate::udp::{MulticastSocket, SocketFactory};
use nearby_netif::{Address, InterfaceDescription, InterfaceIndex};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, warn};

const MAX_DATAGRAM_SIZE: usize = 1500;

/// What a discovery protocol contributes to the shared runtime
///
/// The runtime is generic over this trait; mDNS and SSDP each
/// provide an implementation supplying their port, multicast groups,
/// per-address query finalization, and datagram decoding.
pub trait Protocol {
    /// The UDP port queries are sent to (and peers send from)
    fn port(&self) -> u16;

    /// The local port to bind sockets to; 0 for ephemeral
    fn bind_port(&self) -> u16 {
        0
    }

    /// Multicast TTL for transmissions
    fn multicast_ttl(&self) -> u32 {
        4
    }

    /// The multicast group matching a local address' family
    fn group_for(&self, address: &IpAddr) -> IpAddr;

    /// Turn a stored query into the datagram to send from `address`
    ///
    /// Queries containing per-address placeholders (SSDP's multicast
    /// group) are substituted here; most queries pass through.
    fn finalize_query(&self, _address: &IpAddr, query: &[u8]) -> Vec<u8> {
        query.to_vec()
    }

    /// Decode one incoming datagram and emit whatever events result
    fn process_datagram(&mut self, data: &[u8], from: SocketAddr);
}

/// Whether discovery queries should be multicast on this interface
#[must_use]
pub fn is_supported_interface(iface: &InterfaceDescription) -> bool {
    iface.kind.is_lan() && iface.is_multicast_capable()
}

/// Whether a local address is usable for link-local discovery
///
/// IPv4 addresses always are; IPv6 only in its link-local range.
#[must_use]
pub fn is_supported_address(address: &IpAddr) -> bool {
    match address {
        IpAddr::V4(_) => true,
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}

/// The shared multicast discovery runtime
///
/// Owns one socket per usable local address and an ordered,
/// deduplicated set of opaque queries. The owner drives it:
/// [`Resolver::on_scan`] reconciles the socket table against a fresh
/// interface snapshot and retransmits every query from every socket;
/// [`Resolver::on_ready`] drains one readable socket, suppressing
/// our own multicast echoes before handing datagrams to the
/// protocol.
pub struct Resolver<P: Protocol, F: SocketFactory> {
    protocol: P,
    factory: F,
    sockets: BTreeMap<IpAddr, F::Socket>,
    queries: Vec<Vec<u8>>,
}

impl<P: Protocol, F: SocketFactory> Resolver<P, F> {
    /// Create a resolver; no sockets exist until the first scan
    pub fn new(protocol: P, factory: F) -> Self {
        Self {
            protocol,
            factory,
            sockets: BTreeMap::new(),
            queries: Vec::new(),
        }
    }

    /// The protocol state (for its lookup bookkeeping)
    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Mutable protocol state
    pub fn protocol_mut(&mut self) -> &mut P {
        &mut self.protocol
    }

    /// The socket factory
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Add a query to the set
    ///
    /// Returns false (and stores nothing) if a byte-identical query
    /// is already present. Queries are retransmitted on every scan
    /// for the lifetime of the resolver; there is no removal.
    pub fn add_query(&mut self, query: Vec<u8>) -> bool {
        if self.queries.iter().any(|q| *q == query) {
            return false;
        }
        self.queries.push(query);
        true
    }

    /// The current query set, in submission order
    pub fn queries(&self) -> impl Iterator<Item = &[u8]> {
        self.queries.iter().map(Vec::as_slice)
    }

    /// The local addresses currently holding sockets
    pub fn addresses(&self) -> impl Iterator<Item = &IpAddr> {
        self.sockets.keys()
    }

    /// Reconcile sockets against an interface snapshot, then query
    ///
    /// Addresses still present keep their socket; new addresses get
    /// a fresh one (bind failures are logged and retried on the next
    /// scan); sockets whose address disappeared are dropped, which
    /// departs their multicast group. Afterwards every query is sent
    /// once per socket, in socket-address order, in submission
    /// order.
    pub fn on_scan<'a, I>(&mut self, interfaces: I)
    where
        I: IntoIterator<Item = &'a InterfaceDescription>,
    {
        let mut next = BTreeMap::new();

        for iface in interfaces {
            if !is_supported_interface(iface) {
                continue;
            }
            for Address { ip, .. } in &iface.addresses {
                if !is_supported_address(ip) || next.contains_key(ip) {
                    continue;
                }
                if let Some(socket) = self.sockets.remove(ip) {
                    next.insert(*ip, socket);
                    continue;
                }
                match self.bind(ip, iface.index) {
                    Ok(socket) => {
                        debug!("new discovery socket for {ip} on {}", iface.name);
                        next.insert(*ip, socket);
                    }
                    Err(e) => {
                        warn!("could not bind to {ip} on {}: {e}", iface.name);
                    }
                }
            }
        }

        self.sockets = next;
        self.submit_queries();
    }

    fn bind(
        &mut self,
        address: &IpAddr,
        interface: InterfaceIndex,
    ) -> Result<F::Socket, udp::Error> {
        self.factory.bind(&udp::Binding {
            address: *address,
            interface,
            port: self.protocol.bind_port(),
            group: self.protocol.group_for(address),
            ttl: self.protocol.multicast_ttl(),
        })
    }

    fn submit_queries(&self) {
        for (address, socket) in &self.sockets {
            let group = SocketAddr::new(
                self.protocol.group_for(address),
                self.protocol.port(),
            );
            for query in &self.queries {
                let datagram = self.protocol.finalize_query(address, query);
                if let Err(e) = socket.send_to(&datagram, &group) {
                    warn!("could not send query from {address}: {e}");
                }
            }
        }
    }

    /// Drain all pending datagrams on one socket
    ///
    /// Called when the socket for `address` becomes readable. Each
    /// datagram passes the self-echo filter before being decoded.
    pub fn on_ready(&mut self, address: &IpAddr) {
        let mut buffer = [0u8; MAX_DATAGRAM_SIZE];
        loop {
            let received = match self.sockets.get(address) {
                Some(socket) => socket.recv_from(&mut buffer),
                None => break,
            };
            let (size, from) = match received {
                Ok(r) => r,
                Err(udp::Error::WouldBlock) => break,
                Err(e) => {
                    warn!("receive failed on {address}: {e}");
                    break;
                }
            };
            let data = &buffer[0..size];
            if self.is_own_message(data, &from) {
                continue;
            }
            self.protocol.process_datagram(data, from);
        }
    }

    /// Queries we multicast come back to us because we joined the
    /// group; drop them before the protocol layer sees them.
    fn is_own_message(&self, data: &[u8], from: &SocketAddr) -> bool {
        if from.port() != self.protocol.port() {
            return false;
        }
        if !self.sockets.contains_key(&from.ip()) {
            return false;
        }
        self.queries.iter().any(|q| *q == data)
    }
}
