//! Enumerating network interfaces and their IP addresses
//!
//! The nearby-netif crate encapsulates the obtaining of the host's
//! network interfaces and IP addresses as a snapshot: each call to
//! [`get_interfaces`] produces the current list of interfaces, each
//! with its state flags, a rough classification of its [`Kind`], and
//! all of its addresses. The discovery resolvers in the sibling
//! crates re-take this snapshot periodically and reconcile their
//! sockets against it, so no change notification mechanism is needed
//! here.
//!
//! At present this crate *only works on Unix* (and is mostly tested
//! on Linux) but the structure is such that adding compatibility with
//! other platforms in future, shouldn't require changes to any client
//! code.
//!
//! Todo:
//!  - [ ] Classify wireless interfaces from nl80211 instead of the
//!        interface name

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

use bitflags::bitflags;
use std::net::IpAddr;

/** Kernel network interface index (1-based)
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterfaceIndex(pub u32);

bitflags! {
    /// Flags describing a network interface's features and state
    ///
    /// Corresponds to Linux's SIOCGIFFLAGS
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct Flags: u32 {
        #[doc = "Interface is enabled"]
        const UP = 0x1;

        #[doc = "Interface is broadcast-capable"]
        const BROADCAST = 0x2;

        #[doc = "Interface is loopback-only"]
        const LOOPBACK = 0x4;

        #[doc = "Interface is point-to-point (e.g. PPP)"]
        const POINTTOPOINT = 0x8; // not preserving Posix misspelling

        #[doc = "Interface is operational"]
        const RUNNING = 0x40;

        #[doc = "Interface is multicast-capable"]
        const MULTICAST = 0x1000;
    }
}

/** Rough classification of a network interface
 *
 * The kernel does not report this directly for all interface types,
 * so part of the classification is made from the interface name, the
 * way `ip(8)` and friends do.
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Kind {
    /// Wired Ethernet (`eth*`, `en*`, `em*`)
    Ethernet,

    /// IEEE 802.11 wireless (`wl*`, `ww*`)
    Wireless,

    /// The loopback interface
    Loopback,

    /// Point-to-point link (PPP, VPN tunnels)
    PointToPoint,

    /// Bridge, container, or other virtual interface
    Virtual,

    /// Anything else
    Unknown,
}

impl Kind {
    /// Whether link-local discovery makes sense on this interface
    ///
    /// Only real LAN segments (wired or wireless) are worth
    /// multicasting discovery queries on.
    #[must_use]
    pub fn is_lan(self) -> bool {
        matches!(self, Kind::Ethernet | Kind::Wireless)
    }
}

/** An IP address with its prefix length
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    /// The address itself
    pub ip: IpAddr,

    /// Network prefix length in bits (e.g. 24 for a /24)
    pub prefix_length: u8,
}

/** Everything known about one network interface
 */
#[derive(Debug, Clone)]
pub struct InterfaceDescription {
    /// Kernel interface index
    pub index: InterfaceIndex,

    /// Interface name, e.g. "eth0"
    pub name: String,

    /// Rough interface classification
    pub kind: Kind,

    /// State and capability flags
    pub flags: Flags,

    /// All addresses currently assigned, IPv4 and IPv6
    pub addresses: Vec<Address>,
}

impl InterfaceDescription {
    /// Whether the interface is up and able to carry multicast
    #[must_use]
    pub fn is_multicast_capable(&self) -> bool {
        self.flags.contains(Flags::RUNNING | Flags::MULTICAST)
    }
}

pub(crate) fn classify(name: &str, flags: Flags) -> Kind {
    if flags.contains(Flags::LOOPBACK) {
        return Kind::Loopback;
    }
    if flags.contains(Flags::POINTTOPOINT) {
        return Kind::PointToPoint;
    }
    if name.starts_with("wl") || name.starts_with("ww") {
        return Kind::Wireless;
    }
    for prefix in
        ["docker", "br-", "veth", "virbr", "vnet", "tun", "tap", "zt"]
    {
        if name.starts_with(prefix) {
            return Kind::Virtual;
        }
    }
    if name.starts_with("en") || name.starts_with("eth") || name.starts_with("em")
    {
        return Kind::Ethernet;
    }
    Kind::Unknown
}

/** Static listing using Unix's getifaddrs(3)
 */
#[cfg(unix)]
pub mod getifaddrs;

#[cfg(unix)]
#[doc(inline)]
pub use getifaddrs::get_interfaces;
