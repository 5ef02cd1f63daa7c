/// The list of system calls which can return errors
#[non_exhaustive]
#[derive(Debug)]
pub enum Syscall {
    /// socket() returned an error
    Socket,
    /// A setsockopt during socket setup returned an error
    Sockopt,
    /// bind() returned an error
    Bind,
    /// setsockopt(IP_ADD_MEMBERSHIP) returned an error
    JoinMulticast,
    /// Registering with the poll registry returned an error
    Register,
    /// setsockopt(IP_MULTICAST_TTL) returned an error
    SetMulticastTtl,
    /// setsockopt(IP_MULTICAST_IF) returned an error
    SetMulticastInterface,
    /// sendto() returned an error
    SendTo,
    /// recvfrom() returned an error
    RecvFrom,
}

/// The errors which can be returned from UDP trait methods
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// No datagram pending on a nonblocking receive
    WouldBlock,

    /// Address family of group and local address don't match
    MismatchedFamily,

    /// A system call returned an error
    Syscall(Syscall, std::io::Error),
}

impl Error {
    pub(crate) fn from_io(syscall: Syscall, e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::WouldBlock {
            Self::WouldBlock
        } else {
            Self::Syscall(syscall, e)
        }
    }
}

impl ::core::fmt::Display for Error {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        match self {
            Self::WouldBlock => f.write_str("operation would block"),
            Self::MismatchedFamily => {
                f.write_str("group and address families differ")
            }
            Self::Syscall(s, _) => write!(f, "error from syscall {s:?}"),
        }
    }
}

impl ::std::error::Error for Error {
    fn source(&self) -> Option<&(dyn ::std::error::Error + 'static)> {
        match self {
            Self::Syscall(_, e) => Some(e),
            _ => None,
        }
    }
}
