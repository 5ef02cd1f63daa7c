//! Multicast DNS (mDNS) and DNS-based Service Discovery (DNS-SD)
//!
//! The nearby-mdns crate discovers hosts and services on the local
//! network using multicast DNS, the protocol behind Bonjour/Avahi
//! style zero-configuration networking. Host lookups resolve names
//! like `zappor.local` to addresses; service lookups enumerate
//! instances of a service type like `_http._tcp`, each with its
//! host, port, and TXT metadata; and the service-URL table maps a
//! discovered instance to browsable URLs (`http://…`, `ipp://…`).
//!
//! The wire codec in [`message`] is zero-copy: incoming messages
//! stay one shared buffer, and names, questions, and resource
//! records are positional readers into it, including RFC 1035
//! compression-pointer traversal with cycle protection.
//!
//! Queries are retransmitted on a fixed cadence (2 seconds by
//! default) from one socket per local address, which also makes our
//! own multicast echoes recognizable and suppressible; the shared
//! runtime in nearby-core handles that part.
//!
//! Use [`Service`] with a mio poll for a ready-made event loop
//! integration, or drive [`Resolver`] directly from a custom loop.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// The mDNS wire codec
pub mod message;

/// The resolver: lookups, response interpretation, events
pub mod resolver;

/// A mio-driven wrapper around the resolver
pub mod service;

/// Mapping discovered services to browsable URLs
pub mod url_finder;

pub use message::{Message, Name, Question, Resource, Type};
pub use resolver::{
    Callback, Resolver, ServiceDescription, TxtEntry, DEFAULT_DOMAIN,
    MDNS_PORT,
};
pub use service::Service;
