use bytes::{Bytes, BytesMut};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const SERIAL_OFFSET: usize = 0;
const FLAGS_OFFSET: usize = 2;
const QUESTION_COUNT_OFFSET: usize = 4;
const ANSWER_COUNT_OFFSET: usize = 6;
const AUTHORITY_COUNT_OFFSET: usize = 8;
const ADDITIONAL_COUNT_OFFSET: usize = 10;
const HEADER_SIZE: usize = 12;

const FLAG_RESPONSE: u16 = 1 << 15;
const FLAG_AUTHORITATIVE: u16 = 1 << 10;
const FLAG_TRUNCATED: u16 = 1 << 9;

/// Longest label sequence a decoded name may span, in bytes
const MAX_NAME_SIZE: usize = 255;

/// How many compression pointers we follow before giving up
const MAX_POINTER_FOLLOWS: usize = 128;

/// The resource record types this resolver understands
///
/// Values are the RFC 1035/3596/4034 type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    /// IPv4 host address
    A = 1,
    /// Authoritative name server
    Ns = 2,
    /// Canonical name
    Cname = 5,
    /// Domain name pointer
    Ptr = 12,
    /// Mail exchange
    Mx = 15,
    /// Text strings
    Txt = 16,
    /// IPv6 host address
    Aaaa = 28,
    /// Service locator
    Srv = 33,
    /// EDNS options
    Opt = 41,
    /// Next secure record
    Nsec = 47,
    /// Any type (question only)
    Any = 255,
}

impl Type {
    /// The type for a wire-format type code, if known
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Type> {
        match value {
            1 => Some(Type::A),
            2 => Some(Type::Ns),
            5 => Some(Type::Cname),
            12 => Some(Type::Ptr),
            15 => Some(Type::Mx),
            16 => Some(Type::Txt),
            28 => Some(Type::Aaaa),
            33 => Some(Type::Srv),
            41 => Some(Type::Opt),
            47 => Some(Type::Nsec),
            255 => Some(Type::Any),
            _ => None,
        }
    }
}

/// DNS network class; multicast DNS only ever uses IN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkClass {
    /// The Internet
    In = 1,
}

/// Header operation code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Standard query
    Query,
    /// Inverse query (obsolete)
    InverseQuery,
    /// Server status request
    Status,
    /// Anything else
    Reserved(u8),
}

/// Header response code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    /// No error condition
    NoError,
    /// The server could not interpret the query
    FormatError,
    /// The server failed processing
    ServerFailure,
    /// The queried name does not exist
    NameError,
    /// The query kind is not supported
    NotImplemented,
    /// The server refused to answer
    Refused,
    /// Anything else
    Other(u8),
}

fn u8_at(data: &Bytes, offset: usize) -> u8 {
    data.get(offset).copied().unwrap_or(0)
}

fn u16_at(data: &Bytes, offset: usize) -> u16 {
    match data.get(offset..offset + 2) {
        Some(b) => u16::from_be_bytes([b[0], b[1]]),
        None => 0,
    }
}

fn u32_at(data: &Bytes, offset: usize) -> u32 {
    match data.get(offset..offset + 4) {
        Some(b) => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        None => 0,
    }
}

/// One mDNS message, incoming or under construction
///
/// The message is an immutable byte buffer; questions, resources,
/// and names are positional readers into that buffer, so decoding a
/// message allocates nothing beyond the buffer itself. Out-of-range
/// reads yield zero values or empty entries, never a panic.
#[derive(Clone, Default)]
pub struct Message {
    data: Bytes,
}

impl Message {
    /// An empty query message (all-zero header)
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Bytes::from_static(&[0u8; HEADER_SIZE]),
        }
    }

    /// Wrap a received datagram
    #[must_use]
    pub fn from_bytes(data: Bytes) -> Self {
        Self { data }
    }

    /// The underlying wire bytes
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Transaction id; always zero for multicast queries
    #[must_use]
    pub fn serial(&self) -> u16 {
        u16_at(&self.data, SERIAL_OFFSET)
    }

    fn flags(&self) -> u16 {
        u16_at(&self.data, FLAGS_OFFSET)
    }

    /// Whether this message is a query
    #[must_use]
    pub fn is_query(&self) -> bool {
        !self.is_response()
    }

    /// Whether this message is a response
    #[must_use]
    pub fn is_response(&self) -> bool {
        (self.flags() & FLAG_RESPONSE) != 0
    }

    /// Whether the responder claims authority
    #[must_use]
    pub fn is_authoritative(&self) -> bool {
        (self.flags() & FLAG_AUTHORITATIVE) != 0
    }

    /// Whether the message was truncated in transit
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        (self.flags() & FLAG_TRUNCATED) != 0
    }

    /// The header's operation code
    #[must_use]
    pub fn operation(&self) -> Operation {
        match (self.flags() >> 11) & 15 {
            0 => Operation::Query,
            1 => Operation::InverseQuery,
            2 => Operation::Status,
            other => Operation::Reserved(other as u8),
        }
    }

    /// The header's response code
    #[must_use]
    pub fn response_code(&self) -> ResponseCode {
        match self.flags() & 15 {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            other => ResponseCode::Other(other as u8),
        }
    }

    /// Number of questions the header declares
    #[must_use]
    pub fn question_count(&self) -> usize {
        u16_at(&self.data, QUESTION_COUNT_OFFSET) as usize
    }

    /// Number of answer records the header declares
    #[must_use]
    pub fn answer_count(&self) -> usize {
        u16_at(&self.data, ANSWER_COUNT_OFFSET) as usize
    }

    /// Number of authority records the header declares
    #[must_use]
    pub fn authority_count(&self) -> usize {
        u16_at(&self.data, AUTHORITY_COUNT_OFFSET) as usize
    }

    /// Number of additional records the header declares
    #[must_use]
    pub fn additional_count(&self) -> usize {
        u16_at(&self.data, ADDITIONAL_COUNT_OFFSET) as usize
    }

    /// Iterate the question section
    #[must_use]
    pub fn questions(&self) -> Questions {
        Questions {
            data: self.data.clone(),
            offset: HEADER_SIZE,
            remaining: self.question_count(),
            malformed: false,
        }
    }

    /// Iterate the answer section
    #[must_use]
    pub fn answers(&self) -> Resources {
        Resources {
            data: self.data.clone(),
            offset: self.questions().end_offset(),
            remaining: self.answer_count(),
            malformed: false,
        }
    }

    /// Iterate the authority section
    #[must_use]
    pub fn authorities(&self) -> Resources {
        let answers = self.answers();
        Resources {
            data: self.data.clone(),
            offset: answers.end_offset(),
            remaining: self.authority_count(),
            malformed: false,
        }
    }

    /// Iterate the additional section
    #[must_use]
    pub fn additionals(&self) -> Resources {
        let authorities = self.authorities();
        Resources {
            data: self.data.clone(),
            offset: authorities.end_offset(),
            remaining: self.additional_count(),
            malformed: false,
        }
    }

    /// Iterate answer, authority, and additional records in order
    pub fn responses(&self) -> impl Iterator<Item = Resource> {
        self.answers()
            .chain(self.authorities())
            .chain(self.additionals())
    }

    /// The i'th question, if present and decodable
    #[must_use]
    pub fn question(&self, i: usize) -> Option<Question> {
        self.questions().nth(i)
    }

    /// The i'th answer record, if present and decodable
    #[must_use]
    pub fn answer(&self, i: usize) -> Option<Resource> {
        self.answers().nth(i)
    }

    /// The i'th authority record, if present and decodable
    #[must_use]
    pub fn authority(&self, i: usize) -> Option<Resource> {
        self.authorities().nth(i)
    }

    /// The i'th additional record, if present and decodable
    #[must_use]
    pub fn additional(&self, i: usize) -> Option<Resource> {
        self.additionals().nth(i)
    }

    /// Append a question and bump the question count
    ///
    /// Building messages only supports questions, and they must all
    /// be added before any (hypothetical) resource records.
    pub fn add_question(&mut self, question: &Question) -> &mut Self {
        debug_assert!(self.answer_count() == 0);
        debug_assert!(self.authority_count() == 0);
        debug_assert!(self.additional_count() == 0);

        let bytes = question.bytes();
        let mut data =
            BytesMut::with_capacity(self.data.len() + bytes.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(&bytes);

        let count = (self.question_count() + 1) as u16;
        data[QUESTION_COUNT_OFFSET..QUESTION_COUNT_OFFSET + 2]
            .copy_from_slice(&count.to_be_bytes());

        self.data = data.freeze();
        self
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("serial", &self.serial())
            .field("response", &self.is_response())
            .field("questions", &self.question_count())
            .field("answers", &self.answer_count())
            .field("authorities", &self.authority_count())
            .field("additionals", &self.additional_count())
            .finish()
    }
}

/// One label of a name: a short run of bytes
#[derive(Clone, Debug)]
pub struct Label {
    data: Bytes,
    offset: usize,
}

impl Label {
    /// The label's bytes, without the length prefix
    #[must_use]
    pub fn bytes(&self) -> Bytes {
        let len = u8_at(&self.data, self.offset) as usize;
        let start = self.offset + 1;
        if start + len <= self.data.len() {
            self.data.slice(start..start + len)
        } else {
            Bytes::new()
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes()))
    }
}

/// A domain name at some position inside a message buffer
///
/// Names share the message buffer; compression pointers are resolved
/// lazily while iterating [`Name::labels`], with a bounded follow
/// count and a strictly-decreasing-offset rule so that malicious
/// pointer graphs cannot loop.
#[derive(Clone)]
pub struct Name {
    data: Bytes,
    offset: usize,
}

impl Name {
    /// A name reader at `offset` into `data`
    #[must_use]
    pub fn new(data: Bytes, offset: usize) -> Self {
        Self { data, offset }
    }

    /// Encode a dotted name ("core-spirit.local") in direct form
    ///
    /// A single trailing dot is permitted and ignored. Returns None
    /// for empty labels, labels over 63 bytes, or names over the
    /// 255-byte wire limit.
    #[must_use]
    pub fn from_dotted(name: &str) -> Option<Self> {
        let name = name.strip_suffix('.').unwrap_or(name);
        if name.is_empty() {
            return Some(Self {
                data: Bytes::from_static(&[0]),
                offset: 0,
            });
        }
        encode_labels(name.split('.').map(str::as_bytes))
    }

    /// The reverse-lookup name for an address
    ///
    /// Produces the `in-addr.arpa` form for IPv4 and the nibble-wise
    /// `ip6.arpa` form (lowercase hex) for IPv6.
    #[must_use]
    pub fn from_address(address: &IpAddr) -> Self {
        let mut labels: Vec<Vec<u8>> = Vec::new();
        match address {
            IpAddr::V4(v4) => {
                for octet in v4.octets().iter().rev() {
                    labels.push(octet.to_string().into_bytes());
                }
                labels.push(b"in-addr".to_vec());
            }
            IpAddr::V6(v6) => {
                for octet in v6.octets().iter().rev() {
                    labels.push(vec![char::from_digit(
                        u32::from(octet & 0xf),
                        16,
                    )
                    .unwrap_or('0') as u8]);
                    labels.push(vec![char::from_digit(
                        u32::from(octet >> 4),
                        16,
                    )
                    .unwrap_or('0') as u8]);
                }
                labels.push(b"ip6".to_vec());
            }
        }
        labels.push(b"arpa".to_vec());

        // Reverse-lookup names are always within the wire limits.
        encode_labels(labels.iter().map(Vec::as_slice)).unwrap_or(Self {
            data: Bytes::from_static(&[0]),
            offset: 0,
        })
    }

    /// How many bytes this name occupies at its own offset
    ///
    /// Counts the terminator or the two pointer bytes; never the
    /// bytes reached through a pointer.
    #[must_use]
    pub fn size(&self) -> usize {
        let mut offset = self.offset;
        loop {
            if offset >= self.data.len() {
                return self.data.len().saturating_sub(self.offset);
            }
            let prefix = u8_at(&self.data, offset);
            match prefix & 0xc0 {
                0x00 => {
                    if prefix == 0 {
                        return offset + 1 - self.offset;
                    }
                    offset += 1 + prefix as usize;
                }
                0xc0 => return offset + 2 - self.offset,
                _ => return offset + 1 - self.offset,
            }
        }
    }

    /// The offset just past this name
    #[must_use]
    pub fn next_offset(&self) -> usize {
        self.offset + self.size()
    }

    /// Iterate the labels, following compression pointers
    #[must_use]
    pub fn labels(&self) -> Labels {
        Labels {
            data: self.data.clone(),
            offset: self.offset,
            follows: 0,
            decoded: 0,
        }
    }

    /// Whether the name has no labels at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels().next().is_none()
    }

    /// The dotted text form, one trailing dot included
    #[must_use]
    pub fn to_dotted(&self) -> String {
        self.to_string()
    }

    /// The name's own bytes (valid for uncompressed names only)
    pub(crate) fn bytes(&self) -> Bytes {
        let end = self.next_offset().min(self.data.len());
        self.data.slice(self.offset.min(end)..end)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in self.labels() {
            write!(f, "{label}.")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

fn encode_labels<'a, I>(labels: I) -> Option<Name>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut data = BytesMut::new();
    for label in labels {
        if label.is_empty() || label.len() > 63 {
            return None;
        }
        data.extend_from_slice(&[label.len() as u8]);
        data.extend_from_slice(label);
    }
    data.extend_from_slice(&[0]);
    if data.len() > MAX_NAME_SIZE {
        return None;
    }
    Some(Name {
        data: data.freeze(),
        offset: 0,
    })
}

/// Iterator over a name's labels
pub struct Labels {
    data: Bytes,
    offset: usize,
    follows: usize,
    decoded: usize,
}

impl Iterator for Labels {
    type Item = Label;

    fn next(&mut self) -> Option<Label> {
        loop {
            if self.offset >= self.data.len() {
                return None;
            }
            let prefix = u8_at(&self.data, self.offset);
            match prefix & 0xc0 {
                0x00 => {
                    if prefix == 0 {
                        return None;
                    }
                    let len = prefix as usize;
                    if self.offset + 1 + len > self.data.len() {
                        return None; // label overruns the buffer
                    }
                    self.decoded += len + 1;
                    if self.decoded > MAX_NAME_SIZE {
                        return None;
                    }
                    let label = Label {
                        data: self.data.clone(),
                        offset: self.offset,
                    };
                    self.offset += 1 + len;
                    return Some(label);
                }
                0xc0 => {
                    let target =
                        (u16_at(&self.data, self.offset) & 0x3fff) as usize;
                    // Pointers must go strictly backwards; combined
                    // with the follow cap this makes cycles
                    // unreachable.
                    if target >= self.offset
                        || self.follows >= MAX_POINTER_FOLLOWS
                    {
                        return None;
                    }
                    self.follows += 1;
                    self.offset = target;
                }
                _ => return None, // 0x40/0x80 prefixes are unassigned
            }
        }
    }
}

/// One question, either read from a message or freshly built
#[derive(Clone, Debug)]
pub struct Question {
    data: Bytes,
    offset: usize,
}

impl Question {
    /// Build a question for a dotted name
    ///
    /// Returns None if the name does not encode (see
    /// [`Name::from_dotted`]).
    #[must_use]
    pub fn new(name: &str, qtype: Type) -> Option<Self> {
        Some(Self::from_name(&Name::from_dotted(name)?, qtype, false))
    }

    /// Build a question from an already-encoded (uncompressed) name
    #[must_use]
    pub fn from_name(name: &Name, qtype: Type, unicast_response: bool) -> Self {
        let name_bytes = name.bytes();
        let mut data = BytesMut::with_capacity(name_bytes.len() + 4);
        data.extend_from_slice(&name_bytes);
        data.extend_from_slice(&(qtype as u16).to_be_bytes());
        let class = NetworkClass::In as u16
            | if unicast_response { 0x8000 } else { 0 };
        data.extend_from_slice(&class.to_be_bytes());
        Self {
            data: data.freeze(),
            offset: 0,
        }
    }

    fn at(data: Bytes, offset: usize) -> Self {
        Self { data, offset }
    }

    /// The queried name
    #[must_use]
    pub fn name(&self) -> Name {
        Name::new(self.data.clone(), self.offset)
    }

    fn fields_offset(&self) -> usize {
        self.offset + self.name().size()
    }

    /// The wire type code
    #[must_use]
    pub fn raw_type(&self) -> u16 {
        u16_at(&self.data, self.fields_offset())
    }

    /// The question type, if known
    #[must_use]
    pub fn qtype(&self) -> Option<Type> {
        Type::from_u16(self.raw_type())
    }

    /// The network class (low 15 bits of the class field)
    #[must_use]
    pub fn raw_class(&self) -> u16 {
        u16_at(&self.data, self.fields_offset() + 2) & 0x7fff
    }

    /// The mDNS unicast-response bit
    #[must_use]
    pub fn unicast_response(&self) -> bool {
        u16_at(&self.data, self.fields_offset() + 2) & 0x8000 != 0
    }

    /// Bytes this question occupies
    #[must_use]
    pub fn size(&self) -> usize {
        self.name().size() + 4
    }

    fn end_offset(&self) -> usize {
        self.offset + self.size()
    }

    fn bytes(&self) -> Bytes {
        let end = self.end_offset().min(self.data.len());
        self.data.slice(self.offset.min(end)..end)
    }
}

/// Iterator over a message's question section
pub struct Questions {
    data: Bytes,
    offset: usize,
    remaining: usize,
    malformed: bool,
}

impl Questions {
    fn end_offset(mut self) -> usize {
        for _ in &mut self {}
        if self.malformed {
            self.data.len()
        } else {
            self.offset
        }
    }
}

impl Iterator for Questions {
    type Item = Question;

    fn next(&mut self) -> Option<Question> {
        if self.remaining == 0 {
            return None;
        }
        let question = Question::at(self.data.clone(), self.offset);
        let end = question.end_offset();
        if end > self.data.len() {
            self.remaining = 0;
            self.malformed = true;
            return None;
        }
        self.offset = end;
        self.remaining -= 1;
        Some(question)
    }
}

/// The payload of an SRV record
#[derive(Clone, Debug)]
pub struct ServiceRecord {
    data: Bytes,
    offset: usize,
}

impl ServiceRecord {
    /// Lower is preferred
    #[must_use]
    pub fn priority(&self) -> u16 {
        u16_at(&self.data, self.offset)
    }

    /// Relative weight among same-priority records
    #[must_use]
    pub fn weight(&self) -> u16 {
        u16_at(&self.data, self.offset + 2)
    }

    /// The service's TCP or UDP port
    #[must_use]
    pub fn port(&self) -> u16 {
        u16_at(&self.data, self.offset + 4)
    }

    /// The host providing the service
    #[must_use]
    pub fn target(&self) -> Name {
        Name::new(self.data.clone(), self.offset + 6)
    }
}

/// One resource record read from a message
#[derive(Clone, Debug)]
pub struct Resource {
    data: Bytes,
    offset: usize,
}

impl Resource {
    fn at(data: Bytes, offset: usize) -> Self {
        Self { data, offset }
    }

    /// The record's owner name
    #[must_use]
    pub fn name(&self) -> Name {
        Name::new(self.data.clone(), self.offset)
    }

    fn fields_offset(&self) -> usize {
        self.offset + self.name().size()
    }

    fn data_offset(&self) -> usize {
        self.fields_offset() + 10
    }

    /// The wire type code
    #[must_use]
    pub fn raw_type(&self) -> u16 {
        u16_at(&self.data, self.fields_offset())
    }

    /// The record type, if known
    #[must_use]
    pub fn rtype(&self) -> Option<Type> {
        Type::from_u16(self.raw_type())
    }

    /// The network class (low 15 bits of the class field)
    #[must_use]
    pub fn raw_class(&self) -> u16 {
        u16_at(&self.data, self.fields_offset() + 2) & 0x7fff
    }

    /// The mDNS cache-flush bit
    #[must_use]
    pub fn flush(&self) -> bool {
        u16_at(&self.data, self.fields_offset() + 2) & 0x8000 != 0
    }

    /// Time to live, in seconds
    #[must_use]
    pub fn ttl(&self) -> u32 {
        u32_at(&self.data, self.fields_offset() + 4)
    }

    /// Length of the record payload
    #[must_use]
    pub fn data_size(&self) -> usize {
        u16_at(&self.data, self.fields_offset() + 8) as usize
    }

    /// Bytes this record occupies
    #[must_use]
    pub fn size(&self) -> usize {
        self.name().size() + 10 + self.data_size()
    }

    fn end_offset(&self) -> usize {
        self.offset + self.size()
    }

    /// The host address, for A and AAAA records
    #[must_use]
    pub fn address(&self) -> Option<IpAddr> {
        let offset = self.data_offset();
        match (self.rtype(), self.data_size()) {
            (Some(Type::A), 4) => {
                let b = self.data.get(offset..offset + 4)?;
                Some(IpAddr::V4(Ipv4Addr::new(b[0], b[1], b[2], b[3])))
            }
            (Some(Type::Aaaa), 16) => {
                let b = self.data.get(offset..offset + 16)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(b);
                Some(IpAddr::V6(Ipv6Addr::from(octets)))
            }
            _ => None,
        }
    }

    /// The target name, for PTR records
    #[must_use]
    pub fn pointer(&self) -> Option<Name> {
        if self.rtype() == Some(Type::Ptr) && self.data_size() > 0 {
            Some(Name::new(self.data.clone(), self.data_offset()))
        } else {
            None
        }
    }

    /// The raw text payload, for TXT records
    #[must_use]
    pub fn text(&self) -> Option<Bytes> {
        if self.rtype() != Some(Type::Txt) {
            return None;
        }
        let offset = self.data_offset();
        let end = offset + self.data_size();
        if end > self.data.len() {
            return None;
        }
        Some(self.data.slice(offset..end))
    }

    /// The service record payload, for SRV records
    #[must_use]
    pub fn service(&self) -> Option<ServiceRecord> {
        if self.rtype() == Some(Type::Srv) && self.data_size() >= 8 {
            Some(ServiceRecord {
                data: self.data.clone(),
                offset: self.data_offset(),
            })
        } else {
            None
        }
    }
}

/// Iterator over one resource section
pub struct Resources {
    data: Bytes,
    offset: usize,
    remaining: usize,
    malformed: bool,
}

impl Resources {
    fn end_offset(mut self) -> usize {
        for _ in &mut self {}
        if self.malformed {
            self.data.len()
        } else {
            self.offset
        }
    }
}

impl Iterator for Resources {
    type Item = Resource;

    fn next(&mut self) -> Option<Resource> {
        if self.remaining == 0 {
            return None;
        }
        let resource = Resource::at(self.data.clone(), self.offset);
        let end = resource.end_offset();
        if end > self.data.len() {
            self.remaining = 0;
            self.malformed = true;
            return None;
        }
        self.offset = end;
        self.remaining -= 1;
        Some(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(hex: &str) -> Bytes {
        Bytes::from(
            hex::decode(hex.replace([' ', '\n'], "")).expect("valid hex"),
        )
    }

    /* ==== Building ==== */

    #[test]
    fn builds_empty_message() {
        let message = Message::new();
        assert_eq!(message.data().as_ref(), &[0u8; 12][..]);
        assert_eq!(message.question_count(), 0);
        assert!(message.is_query());
    }

    #[test]
    fn builds_two_ptr_questions() {
        let mut message = Message::new();
        message
            .add_question(
                &Question::new("_http._tcp.local", Type::Ptr).unwrap(),
            )
            .add_question(
                &Question::new("_xpresstrain._tcp.local", Type::Ptr).unwrap(),
            );

        let expected = frame(
            "0000 0000 0002 0000 0000 0000
             05 5f68747470
             04 5f746370
             05 6c6f63616c
             00
             000c 0001
             0c 5f787072657373747261696e
             04 5f746370
             05 6c6f63616c
             00
             000c 0001",
        );
        assert_eq!(message.data(), &expected);
    }

    #[test]
    fn builds_a_question() {
        let mut message = Message::new();
        message
            .add_question(&Question::new("juicifer.local", Type::A).unwrap());

        let expected = frame(
            "0000 0000 0001 0000 0000 0000
             08 6a75696369666572
             05 6c6f63616c
             00
             0001 0001",
        );
        assert_eq!(message.data(), &expected);
    }

    #[test]
    fn built_question_round_trips() {
        let mut message = Message::new();
        message.add_question(
            &Question::new("printer._ipp._tcp.local.", Type::Ptr).unwrap(),
        );

        let parsed = Message::from_bytes(message.data().clone());
        assert_eq!(parsed.question_count(), 1);
        let question = parsed.question(0).unwrap();
        assert_eq!(question.name().to_dotted(), "printer._ipp._tcp.local.");
        assert_eq!(question.qtype(), Some(Type::Ptr));
        assert_eq!(question.raw_class(), NetworkClass::In as u16);
        assert!(!question.unicast_response());
    }

    #[test]
    fn unicast_response_bit_set() {
        let name = Name::from_dotted("juicifer.local").unwrap();
        let question = Question::from_name(&name, Type::A, true);
        assert!(question.unicast_response());
        assert_eq!(question.raw_class(), 1);
    }

    #[test]
    fn rejects_empty_label() {
        assert!(Name::from_dotted("foo..local").is_none());
        assert!(Question::new("foo..local", Type::A).is_none());
    }

    #[test]
    fn rejects_oversized_label() {
        let long = "x".repeat(64);
        assert!(Name::from_dotted(&format!("{long}.local")).is_none());
    }

    #[test]
    fn rejects_oversized_name() {
        let label = "x".repeat(63);
        let name = format!("{label}.{label}.{label}.{label}.{label}");
        assert!(Name::from_dotted(&name).is_none());
    }

    #[test]
    fn accepts_trailing_dot() {
        let with = Name::from_dotted("juicifer.local.").unwrap();
        let without = Name::from_dotted("juicifer.local").unwrap();
        assert_eq!(with.bytes(), without.bytes());
    }

    /* ==== Reverse-lookup names ==== */

    #[test]
    fn encodes_ipv4_reverse_name() {
        let name = Name::from_address(&"192.168.178.60".parse().unwrap());
        assert_eq!(name.to_dotted(), "60.178.168.192.in-addr.arpa.");
    }

    #[test]
    fn encodes_ipv6_reverse_name() {
        let name =
            Name::from_address(&"fe80::124f:a8ff:fe86:d528".parse().unwrap());
        assert_eq!(
            name.to_dotted(),
            "8.2.5.d.6.8.e.f.f.f.8.a.f.4.2.1.0.0.0.0.0.0.0.0.0.0.0.0.0.8.e.f.\
             ip6.arpa."
        );
    }

    /* ==== Pointer handling ==== */

    #[test]
    fn follows_backward_pointer() {
        // "local" at offset 12; "host" + pointer at offset 19
        let data = frame(
            "0000 0000 0000 0000 0000 0000
             05 6c6f63616c 00
             04 686f7374 c00c",
        );
        let name = Name::new(data, 19);
        assert_eq!(name.to_dotted(), "host.local.");
        assert_eq!(name.size(), 7); // label + pointer, not the target
    }

    #[test]
    fn self_pointer_terminates() {
        let data = frame("0000 0000 0000 0000 0000 0000 c00c");
        let name = Name::new(data, 12);
        assert_eq!(name.labels().count(), 0);
        assert_eq!(name.to_dotted(), "");
    }

    #[test]
    fn forward_pointer_rejected() {
        let data =
            frame("0000 0000 0000 0000 0000 0000 c012 0000 0000 04 74657374 00");
        let name = Name::new(data, 12);
        assert_eq!(name.labels().count(), 0);
    }

    #[test]
    fn pointer_ping_pong_terminates() {
        // Two pointers at 12 and 14; 14 points back to 12, 12 points
        // to itself via 14's rule being offset-decreasing only once.
        let data = frame("0000 0000 0000 0000 0000 0000 c00e c00c");
        let name = Name::new(data, 14);
        assert_eq!(name.labels().count(), 0);
    }

    #[test]
    fn truncated_label_yields_no_labels() {
        let data = frame("0000 0000 0000 0000 0000 0000 0a 6162");
        let name = Name::new(data, 12);
        assert_eq!(name.labels().count(), 0);
    }

    #[test]
    fn name_at_end_of_buffer_is_empty() {
        let data = frame("0000");
        let name = Name::new(data, 7);
        assert!(name.is_empty());
        assert_eq!(name.size(), 0);
    }

    /* ==== Tolerant section decoding ==== */

    #[test]
    fn overdeclared_question_count_stops_cleanly() {
        // Header claims 3 questions, buffer holds 1
        let data = frame(
            "0000 0000 0003 0000 0000 0000
             08 6a75696369666572 05 6c6f63616c 00 0001 0001",
        );
        let message = Message::from_bytes(data);
        assert_eq!(message.question_count(), 3);
        assert_eq!(message.questions().count(), 1);
        assert_eq!(message.responses().count(), 0);
    }

    #[test]
    fn truncated_resource_not_yielded() {
        // One answer whose declared data size overruns the buffer
        let data = frame(
            "0000 8400 0000 0001 0000 0000
             08 6a75696369666572 05 6c6f63616c 00
             0001 0001 00000078 0004 c0a8",
        );
        let message = Message::from_bytes(data);
        assert_eq!(message.answers().count(), 0);
    }

    #[test]
    fn short_buffer_has_empty_header() {
        let message = Message::from_bytes(frame("0000 8400"));
        assert_eq!(message.question_count(), 0);
        assert_eq!(message.answer_count(), 0);
        assert!(message.questions().next().is_none());
    }

    #[test]
    fn typed_accessors_reject_wrong_sizes() {
        // A record with 3-byte payload; AAAA with 4-byte payload
        let data = frame(
            "0000 8400 0000 0002 0000 0000
             01 61 00 0001 0001 00000078 0003 c0a8b2
             01 62 00 001c 0001 00000078 0004 c0a8b23c",
        );
        let message = Message::from_bytes(data);
        let records: Vec<_> = message.answers().collect();
        assert_eq!(records.len(), 2);
        assert!(records[0].address().is_none());
        assert!(records[1].address().is_none());
        assert!(records[0].pointer().is_none());
        assert!(records[0].service().is_none());
        assert!(records[0].text().is_none());
    }

    #[test]
    fn header_flag_accessors() {
        let message = Message::from_bytes(frame(
            "001e 8403 0000 0000 0000 0000",
        ));
        assert_eq!(message.serial(), 30);
        assert!(message.is_response());
        assert!(!message.is_query());
        assert!(message.is_authoritative());
        assert!(!message.is_truncated());
        assert_eq!(message.operation(), Operation::Query);
        assert_eq!(message.response_code(), ResponseCode::NameError);
    }
}
