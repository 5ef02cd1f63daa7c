use ::std::net::{IpAddr, SocketAddr};
use nearby_netif::InterfaceIndex;

pub mod error;

/// mio-registered sockets for readiness-driven services
pub mod mio;

/// Plain std/socket2 socket setup
pub mod std;

pub use error::{Error, Syscall};

/// Everything a factory needs to know to open one multicast socket
///
/// One socket is opened per usable local address. The socket is
/// bound to the wildcard address of the matching family (so that
/// multicast delivery works), joins the protocol's group on the
/// specific interface, and has its outgoing multicast interface
/// pinned so transmissions leave through the address' interface.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The local address this socket represents
    pub address: IpAddr,

    /// The interface carrying that address
    pub interface: InterfaceIndex,

    /// Local port to bind, with address sharing; 0 for ephemeral
    pub port: u16,

    /// Multicast group to join
    pub group: IpAddr,

    /// Multicast TTL / hop limit for transmissions
    pub ttl: u32,
}

/// One bound, joined, nonblocking UDP socket
pub trait MulticastSocket {
    /// Send one datagram
    ///
    /// # Errors
    ///
    /// Passes on errors from the underlying send call.
    fn send_to(&self, buffer: &[u8], to: &SocketAddr) -> Result<(), Error>;

    /// Receive one datagram, if any is pending
    ///
    /// # Errors
    ///
    /// Returns [`Error::WouldBlock`] once the kernel queue is
    /// drained; passes on any other receive error.
    fn recv_from(
        &self,
        buffer: &mut [u8],
    ) -> Result<(usize, SocketAddr), Error>;
}

/// Opening sockets, so tests can substitute fakes
pub trait SocketFactory {
    /// The socket type this factory produces
    type Socket: MulticastSocket;

    /// Open, bind, and join a socket as described by `binding`
    ///
    /// # Errors
    ///
    /// Passes on errors from socket setup; the caller skips the
    /// address and retries on the next scan.
    fn bind(&mut self, binding: &Binding) -> Result<Self::Socket, Error>;
}
