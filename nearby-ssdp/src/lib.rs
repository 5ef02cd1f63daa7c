//! Implementing the client side of SSDP, the Simple Service
//! Discovery Protocol
//!
//! SSDP is the discovery layer of UPnP: devices announce themselves
//! (and answer searches) with HTTP-shaped UDP multicast messages on
//! port 1900. What is discovered is, for each service, a unique
//! identifier (Unique Service Name, USN), an identifier for the
//! _type_ of service (Notification Type, NT), and one or more
//! _locations_, URLs where a description document can be fetched —
//! plus an expiry computed from the message's HTTP caching headers.
//!
//! This crate searches and listens; answering searches (the server
//! side) is not implemented. The nearby-upnp crate builds on the
//! notifications reported here to fetch and decode UPnP device
//! descriptions.
//!
//! The HTTP framing lives in [`http`]: a deliberately tolerant
//! parser for request- and response-shaped datagrams with
//! case-insensitive header handling and the three classic HTTP date
//! formats.
//!
//! Use [`Service`] with a mio poll for a ready-made event loop
//! integration, or drive [`Resolver`] directly from a custom loop.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Parsing HTTP-framed datagrams, dates, and cache expiry
pub mod http;

/// The resolver: searches, notification classification, events
pub mod resolver;

/// A mio-driven wrapper around the resolver
pub mod service;

pub use resolver::{
    Callback, NotifyMessage, Resolver, ServiceDescription,
    ServiceLookupRequest, SEARCH_ALL, SSDP_PORT,
};
pub use service::Service;
