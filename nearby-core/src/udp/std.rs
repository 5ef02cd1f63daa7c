use super::{Binding, Error, MulticastSocket, Syscall};
use std::net::{IpAddr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::unix::io::AsRawFd;
use std::os::unix::prelude::RawFd;

type NewSocketFn = fn(socket2::Domain) -> std::io::Result<socket2::Socket>;
type SockoptFn = fn(&socket2::Socket, bool) -> std::io::Result<()>;
type BindFn = fn(&socket2::Socket, &SocketAddr) -> std::io::Result<()>;

fn new_socket(domain: socket2::Domain) -> std::io::Result<socket2::Socket> {
    socket2::Socket::new(domain, socket2::Type::DGRAM, None)
}

fn wildcard(address: &IpAddr, port: u16) -> SocketAddr {
    match address {
        IpAddr::V4(_) => SocketAddr::V4(SocketAddrV4::new(
            std::net::Ipv4Addr::UNSPECIFIED,
            port,
        )),
        IpAddr::V6(_) => SocketAddr::V6(SocketAddrV6::new(
            std::net::Ipv6Addr::UNSPECIFIED,
            port,
            0,
            0,
        )),
    }
}

fn setup_socket_inner(
    binding: &Binding,
    new_socket: NewSocketFn,
    nonblocking: SockoptFn,
    reuse_address: SockoptFn,
    reuse_port: SockoptFn,
    bind: BindFn,
) -> Result<socket2::Socket, Error> {
    if binding.address.is_ipv4() != binding.group.is_ipv4() {
        return Err(Error::MismatchedFamily);
    }

    let domain = match binding.address {
        IpAddr::V4(_) => socket2::Domain::IPV4,
        IpAddr::V6(_) => socket2::Domain::IPV6,
    };

    let socket =
        new_socket(domain).map_err(|e| Error::Syscall(Syscall::Socket, e))?;
    nonblocking(&socket, true)
        .map_err(|e| Error::Syscall(Syscall::Sockopt, e))?;
    reuse_address(&socket, true)
        .map_err(|e| Error::Syscall(Syscall::Sockopt, e))?;
    reuse_port(&socket, true)
        .map_err(|e| Error::Syscall(Syscall::Sockopt, e))?;
    bind(&socket, &wildcard(&binding.address, binding.port))
        .map_err(|e| Error::Syscall(Syscall::Bind, e))?;
    Ok(socket)
}

/// Open and fully configure one multicast socket
///
/// Binds to the wildcard address of the binding's family with
/// address sharing, joins the group on the binding's interface, and
/// pins TTL and outgoing interface.
///
/// # Errors
///
/// Returns the failing [`Syscall`] with the underlying error.
pub fn setup_socket(binding: &Binding) -> Result<std::net::UdpSocket, Error> {
    let socket = setup_socket_inner(
        binding,
        new_socket,
        socket2::Socket::set_nonblocking,
        socket2::Socket::set_reuse_address,
        socket2::Socket::set_reuse_port,
        |s, a| s.bind(&socket2::SockAddr::from(*a)),
    )?;

    join_group(&socket, &binding.group, binding.interface.0)?;
    set_multicast_ttl(&socket, &binding.group, binding.ttl)?;
    set_multicast_interface(&socket, &binding.group, binding.interface.0)?;

    Ok(socket.into())
}

#[allow(clippy::cast_possible_truncation)] // socklen_t
#[allow(clippy::cast_possible_wrap)] // ifindex
fn ipv4_multicast_operation(
    fd: RawFd,
    op: libc::c_int,
    multicast_address: &std::net::Ipv4Addr,
    interface: u32,
) -> Result<(), std::io::Error> {
    // The socket2 API (and indeed the std::net one) only allows
    // joining by IP address, for IPv4 at least. But that's not
    // robust, and Linux at least has long supported joining by
    // interface index. We need to use a lower-level API to access
    // that.
    let mreqn = libc::ip_mreqn {
        imr_multiaddr: libc::in_addr {
            s_addr: u32::from_ne_bytes(multicast_address.octets()),
        },
        imr_address: libc::in_addr { s_addr: 0 },
        imr_ifindex: interface as libc::c_int,
    };
    unsafe {
        let ret = libc::setsockopt(
            fd,
            libc::IPPROTO_IP,
            op,
            std::ptr::addr_of!(mreqn).cast::<libc::c_void>(),
            std::mem::size_of_val(&mreqn) as libc::socklen_t,
        );
        if ret != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

fn join_group(
    socket: &socket2::Socket,
    group: &IpAddr,
    interface: u32,
) -> Result<(), Error> {
    match group {
        IpAddr::V4(group) => ipv4_multicast_operation(
            socket.as_raw_fd(),
            libc::IP_ADD_MEMBERSHIP,
            group,
            interface,
        )
        .map_err(|e| Error::Syscall(Syscall::JoinMulticast, e)),
        IpAddr::V6(group) => socket
            .join_multicast_v6(group, interface)
            .map_err(|e| Error::Syscall(Syscall::JoinMulticast, e)),
    }
}

fn set_multicast_ttl(
    socket: &socket2::Socket,
    group: &IpAddr,
    ttl: u32,
) -> Result<(), Error> {
    match group {
        IpAddr::V4(_) => socket.set_multicast_ttl_v4(ttl),
        IpAddr::V6(_) => socket.set_multicast_hops_v6(ttl),
    }
    .map_err(|e| Error::Syscall(Syscall::SetMulticastTtl, e))
}

fn set_multicast_interface(
    socket: &socket2::Socket,
    group: &IpAddr,
    interface: u32,
) -> Result<(), Error> {
    match group {
        IpAddr::V4(_) => ipv4_multicast_operation(
            socket.as_raw_fd(),
            libc::IP_MULTICAST_IF,
            &std::net::Ipv4Addr::UNSPECIFIED,
            interface,
        )
        .map_err(|e| Error::Syscall(Syscall::SetMulticastInterface, e)),
        IpAddr::V6(_) => socket
            .set_multicast_if_v6(interface)
            .map_err(|e| Error::Syscall(Syscall::SetMulticastInterface, e)),
    }
}

impl MulticastSocket for std::net::UdpSocket {
    fn send_to(&self, buffer: &[u8], to: &SocketAddr) -> Result<(), Error> {
        std::net::UdpSocket::send_to(self, buffer, to)
            .map(|_| ())
            .map_err(|e| Error::from_io(Syscall::SendTo, e))
    }

    fn recv_from(
        &self,
        buffer: &mut [u8],
    ) -> Result<(usize, SocketAddr), Error> {
        std::net::UdpSocket::recv_from(self, buffer)
            .map_err(|e| Error::from_io(Syscall::RecvFrom, e))
    }
}
