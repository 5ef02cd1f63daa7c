use crate::http;
use chrono::{DateTime, Utc};
use nearby_core::udp::SocketFactory;
use nearby_core::Clock;
use nearby_netif::InterfaceDescription;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// The SSDP UDP port
pub const SSDP_PORT: u16 = 1900;

/// The generic search target matching every service
pub const SEARCH_ALL: &str = "ssdp:all";

/// The default interval between scans
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(15);

const SSDP_GROUP_IPV4: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
const SSDP_GROUP_IPV6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xc);

const KEY_MULTICAST_GROUP: &str = "{multicast-group}";
const KEY_UDP_PORT: &str = "{udp-port}";
const KEY_MINIMUM_DELAY: &str = "{minimum-delay}";
const KEY_MAXIMUM_DELAY: &str = "{maximum-delay}";
const KEY_SERVICE_TYPE: &str = "{service-type}";

// The multicast group stays a placeholder until the query is
// finalized for a concrete socket, since it differs per family.
const QUERY_TEMPLATE: &str = "M-SEARCH * HTTP/1.1\r\n\
                              ST: {service-type}\r\n\
                              MAN: \"ssdp:discover\"\r\n\
                              HOST: {multicast-group}:{udp-port}\r\n\
                              MX: {maximum-delay}\r\n\
                              MM: {minimum-delay}\r\n\
                              Content-Length: 0\r\n\
                              \r\n";

const VERB_SEARCH: &str = "M-SEARCH";
const VERB_NOTIFY: &str = "NOTIFY";
const RESOURCE_ANY: &str = "*";
const PROTOCOL_HTTP11: &str = "HTTP/1.1";
const HEADER_CACHE_CONTROL: &str = "Cache-Control";
const HEADER_EXPIRES: &str = "Expires";
const HEADER_LOCATION: &str = "Location";
const HEADER_ALT_LOCATION: &str = "AL";
const HEADER_NOTIFY_SUBTYPE: &str = "NTS";
const HEADER_NOTIFY_TYPE: &str = "NT";
const HEADER_SEARCH_TARGET: &str = "ST";
const HEADER_UNIQUE_SERVICE_NAME: &str = "USN";
const SUBTYPE_ALIVE: &str = "ssdp:alive";
const SUBTYPE_BYEBYE: &str = "ssdp:byebye";

/// Parameters of one service search
#[derive(Debug, Clone)]
pub struct ServiceLookupRequest {
    /// The service type to search for (ST header)
    pub service_type: String,

    /// How long responders may wait at least (MM header)
    pub minimum_delay: Duration,

    /// How long responders may spread responses over (MX header)
    pub maximum_delay: Duration,
}

impl Default for ServiceLookupRequest {
    fn default() -> Self {
        Self {
            service_type: SEARCH_ALL.to_string(),
            minimum_delay: Duration::ZERO,
            maximum_delay: Duration::from_secs(5),
        }
    }
}

/// A discovered SSDP service
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    /// Unique Service Name: identifies this service instance
    pub name: String,

    /// Notification type, e.g. "urn:schemas-upnp-org:device:MediaRenderer:1"
    pub service_type: String,

    /// Where the service's description document lives
    pub locations: Vec<Url>,

    /// Alternative locations from the AL header
    pub alternative_locations: Vec<Url>,

    /// When the advertisement lapses; None for no stated limit
    pub expires: Option<DateTime<Utc>>,
}

/// A decoded, classified SSDP notification
#[derive(Debug, Clone)]
pub enum NotifyMessage {
    /// The service is available
    Alive {
        /// Unique Service Name
        service_name: String,
        /// Notification type
        service_type: String,
        /// Description document URLs
        locations: Vec<Url>,
        /// Alternative URLs from the AL header
        alt_locations: Vec<Url>,
        /// When the advertisement lapses
        expiry: Option<DateTime<Utc>>,
    },

    /// The service is going away
    ByeBye {
        /// Unique Service Name
        service_name: String,
    },
}

// The AL header packs URLs in angle brackets: <url1><url2>...
fn parse_alternative_locations(text: &str) -> Vec<Url> {
    let mut locations = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else { break };
        if let Ok(url) = Url::parse(&after[..end]) {
            locations.push(url);
        }
        rest = &after[end + 1..];
    }

    locations
}

impl NotifyMessage {
    /// Classify one datagram; None if it announces nothing
    ///
    /// Accepts `NOTIFY * HTTP/1.1` requests (alive or byebye, by
    /// their NTS header) and HTTP 200 search responses (always
    /// alive). Our own M-SEARCH requests, echoed or from peers, are
    /// ignored silently.
    #[must_use]
    pub fn parse(data: &[u8], now: DateTime<Utc>) -> Option<NotifyMessage> {
        let message = match http::Message::parse(data) {
            Some(message) => message,
            None => {
                warn!("ignoring malformed HTTP message");
                return None;
            }
        };

        if message.protocol() != PROTOCOL_HTTP11 {
            warn!("ignoring unknown protocol: {}", message.protocol());
            return None;
        }

        match message.kind() {
            http::Kind::Request => {
                if message.verb() == VERB_SEARCH {
                    return None;
                }
                if message.verb() != VERB_NOTIFY {
                    debug!("ignoring unsupported verb: {}", message.verb());
                    return None;
                }
                if message.resource() != RESOURCE_ANY {
                    debug!(
                        "ignoring unsupported resource: {}",
                        message.resource()
                    );
                    return None;
                }
            }
            http::Kind::Response => {
                if message.status_code() != Some(200) {
                    debug!(
                        "ignoring unsupported status code: {}",
                        message.status_phrase()
                    );
                    return None;
                }
            }
        }

        let mut service_name = String::new();
        let mut service_type = String::new();
        let mut notify_subtype = String::new();
        let mut cache_control = String::new();
        let mut expires = String::new();
        let mut locations = Vec::new();
        let mut alt_locations = Vec::new();

        for (name, value) in message.headers() {
            if *name == HEADER_UNIQUE_SERVICE_NAME {
                service_name = value.clone();
            } else if *name == HEADER_NOTIFY_TYPE
                || *name == HEADER_SEARCH_TARGET
            {
                service_type = value.clone();
            } else if *name == HEADER_NOTIFY_SUBTYPE {
                notify_subtype = value.clone();
            } else if *name == HEADER_CACHE_CONTROL {
                cache_control = value.clone();
            } else if *name == HEADER_EXPIRES {
                expires = value.clone();
            } else if *name == HEADER_LOCATION {
                match Url::parse(value) {
                    Ok(url) => locations.push(url),
                    Err(e) => warn!("ignoring invalid location {value:?}: {e}"),
                }
            } else if *name == HEADER_ALT_LOCATION {
                alt_locations.extend(parse_alternative_locations(value));
            }
        }

        if service_name.is_empty() {
            debug!("ignoring notification without a service name");
            return None;
        }

        match message.kind() {
            http::Kind::Request if notify_subtype == SUBTYPE_BYEBYE => {
                Some(NotifyMessage::ByeBye { service_name })
            }
            http::Kind::Request if notify_subtype != SUBTYPE_ALIVE => None,
            _ => Some(NotifyMessage::Alive {
                service_name,
                service_type,
                locations,
                alt_locations,
                expiry: http::expiry_datetime(&cache_control, &expires, now),
            }),
        }
    }
}

/// A callback made by the resolver when notifications arrive
pub trait Callback {
    /// A service announced itself or answered a search
    fn on_service_found(&self, service: &ServiceDescription);

    /// A service said goodbye
    fn on_service_lost(&self, _unique_service_name: &str) {}
}

/// The SSDP side of the shared multicast runtime
pub struct SsdpProtocol<CB: Callback, C: Clock> {
    callback: CB,
    clock: C,
}

impl<CB: Callback, C: Clock> nearby_core::Protocol for SsdpProtocol<CB, C> {
    fn port(&self) -> u16 {
        SSDP_PORT
    }

    fn group_for(&self, address: &IpAddr) -> IpAddr {
        match address {
            IpAddr::V4(_) => IpAddr::V4(SSDP_GROUP_IPV4),
            IpAddr::V6(_) => IpAddr::V6(SSDP_GROUP_IPV6),
        }
    }

    fn finalize_query(&self, address: &IpAddr, query: &[u8]) -> Vec<u8> {
        let group = match address {
            IpAddr::V4(_) => SSDP_GROUP_IPV4.to_string(),
            IpAddr::V6(_) => SSDP_GROUP_IPV6.to_string(),
        };
        String::from_utf8_lossy(query)
            .replace(KEY_MULTICAST_GROUP, &group)
            .into_bytes()
    }

    fn process_datagram(&mut self, data: &[u8], _from: SocketAddr) {
        match NotifyMessage::parse(data, self.clock.now()) {
            Some(NotifyMessage::Alive {
                service_name,
                service_type,
                locations,
                alt_locations,
                expiry,
            }) => {
                self.callback.on_service_found(&ServiceDescription {
                    name: service_name,
                    service_type,
                    locations,
                    alternative_locations: alt_locations,
                    expires: expiry,
                });
            }
            Some(NotifyMessage::ByeBye { service_name }) => {
                self.callback.on_service_lost(&service_name);
            }
            None => {}
        }
    }
}

/// An SSDP resolver: periodic searches, asynchronous notifications
pub struct Resolver<CB: Callback, C: Clock, F: SocketFactory> {
    core: nearby_core::Resolver<SsdpProtocol<CB, C>, F>,
}

impl<CB: Callback, C: Clock, F: SocketFactory> Resolver<CB, C, F> {
    /// Create a resolver
    pub fn new(callback: CB, clock: C, factory: F) -> Self {
        Self {
            core: nearby_core::Resolver::new(
                SsdpProtocol { callback, clock },
                factory,
            ),
        }
    }

    /// Search for a service type with default delays
    ///
    /// Returns false if the identical search was already submitted.
    pub fn lookup_service(&mut self, service_type: &str) -> bool {
        self.lookup(&ServiceLookupRequest {
            service_type: service_type.to_string(),
            ..ServiceLookupRequest::default()
        })
    }

    /// Search for a service type
    ///
    /// Returns false if the identical search was already submitted.
    pub fn lookup(&mut self, request: &ServiceLookupRequest) -> bool {
        let query = QUERY_TEMPLATE
            .replace(KEY_UDP_PORT, &SSDP_PORT.to_string())
            .replace(
                KEY_MINIMUM_DELAY,
                &request.minimum_delay.as_secs().to_string(),
            )
            .replace(
                KEY_MAXIMUM_DELAY,
                &request.maximum_delay.as_secs().to_string(),
            )
            .replace(KEY_SERVICE_TYPE, &request.service_type);
        self.core.add_query(query.into_bytes())
    }

    /// Reconcile sockets and retransmit all searches
    pub fn on_scan<'a, I>(&mut self, interfaces: I)
    where
        I: IntoIterator<Item = &'a InterfaceDescription>,
    {
        self.core.on_scan(interfaces);
    }

    /// Drain a readable socket
    pub fn on_ready(&mut self, address: &IpAddr) {
        self.core.on_ready(address);
    }

    /// The socket factory
    pub fn factory(&self) -> &F {
        self.core.factory()
    }

    #[cfg(test)]
    fn queries(&self) -> Vec<Vec<u8>> {
        self.core.queries().map(<[u8]>::to_vec).collect()
    }
}
