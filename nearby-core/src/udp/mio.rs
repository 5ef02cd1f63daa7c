use super::std::setup_socket;
use super::{Binding, Error, MulticastSocket, SocketFactory, Syscall};
use ::std::cell::RefCell;
use ::std::collections::HashMap;
use ::std::net::{IpAddr, SocketAddr};
use ::std::rc::Rc;

type AddressMap = Rc<RefCell<HashMap<mio::Token, IpAddr>>>;

/// A [`SocketFactory`] whose sockets are registered with a mio poll
///
/// Each socket created by the factory is registered for readability
/// under a fresh token, and deregistered again when the resolver
/// drops it. The factory keeps a token-to-address map so that a
/// service receiving a readiness event can find out which local
/// address (and therefore which resolver socket) it belongs to.
pub struct MioSocketFactory {
    registry: mio::Registry,
    next_token: usize,
    addresses: AddressMap,
}

impl MioSocketFactory {
    /// Create a factory registering sockets with `registry`
    ///
    /// Tokens are allocated sequentially starting at `first_token`;
    /// the caller must reserve that range for this factory.
    ///
    /// # Errors
    ///
    /// Passes on errors from cloning the registry handle.
    pub fn new(
        registry: &mio::Registry,
        first_token: usize,
    ) -> Result<Self, ::std::io::Error> {
        Ok(Self {
            registry: registry.try_clone()?,
            next_token: first_token,
            addresses: Rc::new(RefCell::new(HashMap::new())),
        })
    }

    /// Which local address a readiness token belongs to
    #[must_use]
    pub fn address_for(&self, token: mio::Token) -> Option<IpAddr> {
        self.addresses.borrow().get(&token).copied()
    }
}

impl SocketFactory for MioSocketFactory {
    type Socket = MioSocket;

    fn bind(&mut self, binding: &Binding) -> Result<MioSocket, Error> {
        let socket = setup_socket(binding)?;
        let mut socket = mio::net::UdpSocket::from_std(socket);

        let token = mio::Token(self.next_token);
        self.next_token += 1;

        self.registry
            .register(&mut socket, token, mio::Interest::READABLE)
            .map_err(|e| Error::Syscall(Syscall::Register, e))?;
        self.addresses.borrow_mut().insert(token, binding.address);

        let registry = self
            .registry
            .try_clone()
            .map_err(|e| Error::Syscall(Syscall::Register, e))?;

        Ok(MioSocket {
            socket,
            token,
            registry,
            addresses: self.addresses.clone(),
        })
    }
}

/// One resolver socket registered with a mio poll
pub struct MioSocket {
    socket: mio::net::UdpSocket,
    token: mio::Token,
    registry: mio::Registry,
    addresses: AddressMap,
}

impl MulticastSocket for MioSocket {
    fn send_to(&self, buffer: &[u8], to: &SocketAddr) -> Result<(), Error> {
        self.socket
            .send_to(buffer, *to)
            .map(|_| ())
            .map_err(|e| Error::from_io(Syscall::SendTo, e))
    }

    fn recv_from(
        &self,
        buffer: &mut [u8],
    ) -> Result<(usize, SocketAddr), Error> {
        self.socket
            .recv_from(buffer)
            .map_err(|e| Error::from_io(Syscall::RecvFrom, e))
    }
}

impl Drop for MioSocket {
    fn drop(&mut self) {
        let _ = self.registry.deregister(&mut self.socket);
        self.addresses.borrow_mut().remove(&self.token);
    }
}
