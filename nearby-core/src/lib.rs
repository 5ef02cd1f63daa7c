//! The protocol-agnostic core of the nearby discovery crates
//!
//! Link-local discovery protocols share a common runtime shape: a
//! periodic timer drives a scan of the host's network interfaces, a
//! UDP socket is kept per usable local address, a set of opaque
//! queries is multicast from every socket on every scan, and
//! incoming datagrams are filtered against our own transmissions
//! before being handed to protocol-specific parsing.
//!
//! This crate provides that runtime once, so that the mDNS and SSDP
//! crates only supply a [`Protocol`] implementation: the port and
//! multicast groups to use, any per-address query finalization, and
//! the datagram decoding itself.
//!
//! The runtime owns no event loop. The owner drives it, calling
//! [`Resolver::on_scan`] when the [`ScanTimer`] says a scan is due
//! and [`Resolver::on_ready`] when a socket becomes readable; the
//! `Service` wrappers in the protocol crates do exactly that with a
//! mio registry. This keeps everything single-threaded and makes the
//! whole runtime testable with fake sockets and a fake clock.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Wall-clock abstraction so tests can fix "now"
pub mod clock;

/// The socket-table/query-set runtime itself
pub mod resolver;

/// Periodic scan timing
pub mod scan_timer;

/// Traits abstracting over UDP socket implementations
pub mod udp;

pub use clock::{Clock, SystemClock};
pub use resolver::{Protocol, Resolver};
pub use scan_timer::ScanTimer;
