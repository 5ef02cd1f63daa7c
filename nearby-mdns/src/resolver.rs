use crate::message::{Message, Question, ServiceRecord, Type};
use bytes::Bytes;
use nearby_core::udp::SocketFactory;
use nearby_netif::InterfaceDescription;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tracing::warn;

/// The mDNS UDP port
pub const MDNS_PORT: u16 = 5353;

/// The default search domain
pub const DEFAULT_DOMAIN: &str = "local";

/// The default interval between scans
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(2);

const MDNS_GROUP_IPV4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
const MDNS_GROUP_IPV6: Ipv6Addr =
    Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// One key\[=value\] entry from a TXT record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxtEntry {
    /// The key (everything before the first '=')
    pub key: String,

    /// The value, if the entry had one
    pub value: Option<String>,
}

/// Parse a TXT record blob into its entries
///
/// The blob is a sequence of length-prefixed strings. A length byte
/// that would run past the blob ends parsing with a warning; entries
/// seen so far are kept. Empty strings are skipped.
#[must_use]
pub fn parse_txt(blob: &[u8]) -> Vec<TxtEntry> {
    let mut entries = Vec::new();
    let mut offset = 0;

    while offset < blob.len() {
        let length = blob[offset] as usize;
        offset += 1;
        if offset + length > blob.len() {
            warn!("TXT record truncated: entry of {length} bytes overruns");
            break;
        }
        let entry = &blob[offset..offset + length];
        offset += length;
        if entry.is_empty() {
            continue;
        }
        let text = String::from_utf8_lossy(entry);
        match text.split_once('=') {
            Some((key, value)) => entries.push(TxtEntry {
                key: key.to_string(),
                value: Some(value.to_string()),
            }),
            None => entries.push(TxtEntry {
                key: text.to_string(),
                value: None,
            }),
        }
    }

    entries
}

/// A discovered DNS-SD service instance
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    name: String,
    service_type: String,
    target: String,
    port: u16,
    priority: u16,
    weight: u16,
    info: Vec<TxtEntry>,
}

impl ServiceDescription {
    pub(crate) fn from_record(
        domain: &str,
        owner: &str,
        service: &ServiceRecord,
        txt: Option<&Bytes>,
    ) -> Self {
        let full_name = normalized_host_name(owner, domain);
        let (name, service_type) = match full_name.split_once('.') {
            Some((name, service_type)) => {
                (name.to_string(), service_type.to_string())
            }
            None => (full_name, String::new()),
        };

        Self {
            name,
            service_type,
            target: normalized_host_name(
                &service.target().to_dotted(),
                domain,
            ),
            port: service.port(),
            priority: service.priority(),
            weight: service.weight(),
            info: txt.map(|blob| parse_txt(blob)).unwrap_or_default(),
        }
    }

    /// The service instance name (the part before the type)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The service type, e.g. "_http._tcp"
    #[must_use]
    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    /// The host providing the service, domain stripped
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The service's port
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// SRV priority (lower is preferred)
    #[must_use]
    pub fn priority(&self) -> u16 {
        self.priority
    }

    /// SRV weight among equal priorities
    #[must_use]
    pub fn weight(&self) -> u16 {
        self.weight
    }

    /// All TXT entries, in record order
    #[must_use]
    pub fn info(&self) -> &[TxtEntry] {
        &self.info
    }

    /// The value of a TXT key, if present
    ///
    /// The first matching entry wins; entries without '=' yield an
    /// empty value.
    #[must_use]
    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.info
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_deref().unwrap_or(""))
    }
}

/// A callback made by the resolver when responses arrive
pub trait Callback {
    /// Addresses were found for a host name (domain stripped)
    fn on_host_found(&self, host_name: &str, addresses: &[IpAddr]);

    /// A service instance was found
    fn on_service_found(&self, service: &ServiceDescription);

    /// Any decodable message arrived (after the events it caused)
    fn on_message_received(&self, _message: &Message) {}
}

fn qualified_host_name(name: &str, domain: &str) -> String {
    let name = name.strip_suffix('.').unwrap_or(name);
    let suffix = format!(".{domain}");
    if name == domain || name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

fn normalized_host_name(name: &str, domain: &str) -> String {
    let name = name.strip_suffix('.').unwrap_or(name);
    let suffix = format!(".{domain}");
    match name.strip_suffix(&suffix) {
        Some(stripped) => stripped.to_string(),
        None => name.to_string(),
    }
}

fn is_reverse_lookup(name: &str) -> bool {
    let name = name.strip_suffix('.').unwrap_or(name);
    name.ends_with(".in-addr.arpa") || name.ends_with(".ip6.arpa")
}

/// The mDNS side of the shared multicast runtime
///
/// Decodes incoming messages and emits host and service events;
/// holds the configured search domain.
pub struct MdnsProtocol<CB: Callback> {
    domain: String,
    callback: CB,
}

impl<CB: Callback> MdnsProtocol<CB> {
    fn new(callback: CB) -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            callback,
        }
    }

    fn interpret(&self, message: &Message) {
        let mut addresses: Vec<(String, Vec<IpAddr>)> = Vec::new();
        let mut services: Vec<(String, ServiceRecord)> = Vec::new();
        let mut texts: HashMap<String, Bytes> = HashMap::new();

        for response in message.responses() {
            let owner = response.name().to_dotted();

            if let Some(address) = response.address() {
                match addresses.iter_mut().find(|(name, _)| *name == owner) {
                    Some((_, known)) => {
                        if !known.contains(&address) {
                            known.push(address);
                        }
                    }
                    None => addresses.push((owner, vec![address])),
                }
            } else if let Some(service) = response.service() {
                match services.iter_mut().find(|(name, _)| *name == owner) {
                    Some(slot) => slot.1 = service, // last wins
                    None => services.push((owner, service)),
                }
            } else if let Some(text) = response.text() {
                texts.entry(owner).or_insert(text); // first wins
            }
        }

        for (owner, service) in &services {
            self.callback.on_service_found(
                &ServiceDescription::from_record(
                    &self.domain,
                    owner,
                    service,
                    texts.get(owner),
                ),
            );
        }
        for (owner, found) in &addresses {
            self.callback.on_host_found(
                &normalized_host_name(owner, &self.domain),
                found,
            );
        }
    }
}

impl<CB: Callback> nearby_core::Protocol for MdnsProtocol<CB> {
    fn port(&self) -> u16 {
        MDNS_PORT
    }

    fn bind_port(&self) -> u16 {
        MDNS_PORT
    }

    fn group_for(&self, address: &IpAddr) -> IpAddr {
        match address {
            IpAddr::V4(_) => IpAddr::V4(MDNS_GROUP_IPV4),
            IpAddr::V6(_) => IpAddr::V6(MDNS_GROUP_IPV6),
        }
    }

    fn process_datagram(&mut self, data: &[u8], _from: SocketAddr) {
        let message = Message::from_bytes(Bytes::copy_from_slice(data));
        self.interpret(&message);
        self.callback.on_message_received(&message);
    }
}

/// An mDNS resolver: periodic queries, asynchronous responses
///
/// Lookups are cumulative: every name or service type ever looked up
/// stays in the query set and is retransmitted on every scan, with
/// responses reported through the [`Callback`]. Repeated lookups of
/// already-known questions are suppressed per question, not per
/// message.
pub struct Resolver<CB: Callback, F: SocketFactory> {
    core: nearby_core::Resolver<MdnsProtocol<CB>, F>,
    host_queries: Vec<String>,
    service_queries: Vec<String>,
}

impl<CB: Callback, F: SocketFactory> Resolver<CB, F> {
    /// Create a resolver with the default "local" domain
    pub fn new(callback: CB, factory: F) -> Self {
        Self {
            core: nearby_core::Resolver::new(
                MdnsProtocol::new(callback),
                factory,
            ),
            host_queries: Vec::new(),
            service_queries: Vec::new(),
        }
    }

    /// The configured search domain
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.core.protocol().domain
    }

    /// Change the search domain
    ///
    /// Affects how subsequent lookups are qualified and how names in
    /// responses are normalized; already-submitted queries are
    /// unchanged.
    pub fn set_domain(&mut self, domain: &str) {
        self.core.protocol_mut().domain = domain.to_string();
    }

    /// Qualified host names queried so far
    #[must_use]
    pub fn host_name_queries(&self) -> &[String] {
        &self.host_queries
    }

    /// Qualified service types queried so far
    #[must_use]
    pub fn service_queries(&self) -> &[String] {
        &self.service_queries
    }

    /// Look up the addresses of one or more host names
    ///
    /// Each new name contributes an A and an AAAA question to a
    /// single query message; names already being looked up are
    /// skipped. Returns whether any new question was submitted.
    pub fn lookup_host_names<'a, I>(&mut self, host_names: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let domain = self.domain().to_string();
        let mut message = Message::new();
        let mut new_names = Vec::new();

        for name in host_names {
            let qualified = qualified_host_name(name, &domain);
            if self.host_queries.contains(&qualified)
                || new_names.contains(&qualified)
            {
                continue;
            }
            let (a, aaaa) = match (
                Question::new(&qualified, Type::A),
                Question::new(&qualified, Type::Aaaa),
            ) {
                (Some(a), Some(aaaa)) => (a, aaaa),
                _ => {
                    warn!("not a valid host name: {qualified:?}");
                    continue;
                }
            };
            message.add_question(&a).add_question(&aaaa);
            new_names.push(qualified);
        }

        if new_names.is_empty() {
            return false;
        }
        self.core.add_query(message.data().to_vec());
        self.host_queries.append(&mut new_names);
        true
    }

    /// Look up the instances of one or more service types
    ///
    /// Each new type contributes a PTR question; types already being
    /// looked up are skipped. Returns whether any new question was
    /// submitted.
    pub fn lookup_services<'a, I>(&mut self, service_types: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let domain = self.domain().to_string();
        let mut message = Message::new();
        let mut new_types = Vec::new();

        for service_type in service_types {
            let qualified = qualified_host_name(service_type, &domain);
            if self.service_queries.contains(&qualified)
                || new_types.contains(&qualified)
            {
                continue;
            }
            let question = match Question::new(&qualified, Type::Ptr) {
                Some(question) => question,
                None => {
                    warn!("not a valid service type: {qualified:?}");
                    continue;
                }
            };
            message.add_question(&question);
            new_types.push(qualified);
        }

        if new_types.is_empty() {
            return false;
        }
        self.core.add_query(message.data().to_vec());
        self.service_queries.append(&mut new_types);
        true
    }

    /// Submit a raw query message
    ///
    /// The message's questions are recorded in the same bookkeeping
    /// the high-level lookups use: a message is submitted if it
    /// contains at least one question not already being asked.
    /// Reverse-lookup PTR questions are submitted but not recorded
    /// as service queries.
    pub fn lookup(&mut self, message: &Message) -> bool {
        let mut new_hosts = Vec::new();
        let mut new_services = Vec::new();
        let mut unrecorded = false;

        for question in message.questions() {
            let name = question.name().to_dotted();
            let name = name.strip_suffix('.').unwrap_or(&name).to_string();
            match question.qtype() {
                Some(Type::A | Type::Aaaa) => {
                    if !self.host_queries.contains(&name)
                        && !new_hosts.contains(&name)
                    {
                        new_hosts.push(name);
                    }
                }
                Some(Type::Ptr) if !is_reverse_lookup(&name) => {
                    if !self.service_queries.contains(&name)
                        && !new_services.contains(&name)
                    {
                        new_services.push(name);
                    }
                }
                _ => unrecorded = true,
            }
        }

        if new_hosts.is_empty() && new_services.is_empty() && !unrecorded {
            return false;
        }
        if !self.core.add_query(message.data().to_vec()) {
            return false;
        }
        self.host_queries.append(&mut new_hosts);
        self.service_queries.append(&mut new_services);
        true
    }

    /// Reconcile sockets and retransmit all queries
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
