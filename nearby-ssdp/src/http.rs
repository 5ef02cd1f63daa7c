use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::warn;

// examples from https://www.rfc-editor.org/rfc/rfc9110#section-5.6.7
const RFC1123_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT"; // e.g. "Sun, 06 Nov 1994 08:49:37 GMT"
const RFC850_DATE_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S GMT"; // e.g. "Sunday, 06-Nov-94 08:49:37 GMT"
const ASCTIME_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y"; // e.g. "Sun Nov  6 08:49:37 1994"

const CACHE_CONTROL_NO_CACHE: &str = "no-cache";
const CACHE_CONTROL_MAX_AGE: &str = "max-age=";

const PROTOCOL_PREFIX_HTTP: &str = "HTTP/";

/// A header field name comparing case-insensitively
#[derive(Clone, Debug, Eq)]
pub struct HeaderName(String);

impl HeaderName {
    /// The name as received
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HeaderName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl PartialEq for HeaderName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl PartialEq<str> for HeaderName {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for HeaderName {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Hash for HeaderName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a message is a request or a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// `<verb> <resource> HTTP/1.1`
    Request,
    /// `HTTP/1.1 <code> <phrase>`
    Response,
}

/// One HTTP-framed UDP datagram
///
/// SSDP messages are HTTP/1.1-shaped text in a single datagram: a
/// status line, then `Name: Value` headers until an empty line.
/// Parsing is tolerant: header lines starting with a space or tab
/// continue the previous header's value, and malformed lines are
/// dropped with a warning.
#[derive(Debug, Clone)]
pub struct Message {
    kind: Kind,
    status: [String; 3],
    headers: Vec<(HeaderName, String)>,
}

impl Message {
    /// Parse a datagram; None if it isn't HTTP-shaped
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Message> {
        let text = std::str::from_utf8(data).ok()?;
        let mut lines = text.lines();

        let mut message = Self::parse_status_line(lines.next()?)?;

        for line in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                match message.headers.last_mut() {
                    Some((_, value)) => value.push_str(trimmed),
                    None => {
                        warn!("ignoring invalid header line: {line:?}");
                    }
                }
            } else if let Some((name, value)) = line.split_once(':') {
                message.headers.push((
                    HeaderName::from(name.trim()),
                    value.trim().to_string(),
                ));
            } else {
                warn!("ignoring invalid header line: {line:?}");
            }
        }

        Some(message)
    }

    fn parse_status_line(line: &str) -> Option<Message> {
        let mut fields = line.trim().splitn(3, ' ').map(str::to_string);
        let status = [fields.next()?, fields.next()?, fields.next()?];

        let kind = if status[0].starts_with(PROTOCOL_PREFIX_HTTP) {
            Kind::Response
        } else if status[2].starts_with(PROTOCOL_PREFIX_HTTP) {
            Kind::Request
        } else {
            return None;
        };

        Some(Message {
            kind,
            status,
            headers: Vec::new(),
        })
    }

    /// Request or response?
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The protocol field, e.g. "HTTP/1.1"
    #[must_use]
    pub fn protocol(&self) -> &str {
        match self.kind {
            Kind::Request => &self.status[2],
            Kind::Response => &self.status[0],
        }
    }

    /// The request verb; empty for responses
    #[must_use]
    pub fn verb(&self) -> &str {
        match self.kind {
            Kind::Request => &self.status[0],
            Kind::Response => "",
        }
    }

    /// The request resource; empty for responses
    #[must_use]
    pub fn resource(&self) -> &str {
        match self.kind {
            Kind::Request => &self.status[1],
            Kind::Response => "",
        }
    }

    /// The response status code, if this is a response
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            Kind::Request => None,
            Kind::Response => self.status[1].parse().ok(),
        }
    }

    /// The response status phrase; empty for requests
    #[must_use]
    pub fn status_phrase(&self) -> &str {
        match self.kind {
            Kind::Request => "",
            Kind::Response => &self.status[2],
        }
    }

    /// All headers, in message order, duplicates preserved
    #[must_use]
    pub fn headers(&self) -> &[(HeaderName, String)] {
        &self.headers
    }

    /// The first header with the given name, case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| *header == *name)
            .map(|(_, value)| value.as_str())
    }
}

/// Parse an HTTP date in any of the three RFC 9110 formats
#[must_use]
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = NaiveDateTime::parse_from_str(text, RFC1123_DATE_FORMAT) {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, RFC850_DATE_FORMAT) {
        return Some(Utc.from_utc_datetime(&dt));
    }
    // asctime pads single-digit days with an extra space
    let squeezed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Ok(dt) =
        NaiveDateTime::parse_from_str(&squeezed, ASCTIME_DATE_FORMAT)
    {
        return Some(Utc.from_utc_datetime(&dt));
    }

    None
}

/// When a message's payload stops being valid
///
/// Precedence: `Cache-Control: no-cache` expires immediately;
/// `Cache-Control: max-age=N` expires N seconds from now; otherwise
/// the `Expires` header's date; otherwise never (None).
#[must_use]
pub fn expiry_datetime(
    cache_control: &str,
    expires: &str,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let cache_control: String =
        cache_control.chars().filter(|c| *c != ' ').collect();

    for token in cache_control.split(',') {
        if token.eq_ignore_ascii_case(CACHE_CONTROL_NO_CACHE) {
            return Some(now);
        }
    }
    for token in cache_control.split(',') {
        let prefix = token.get(..CACHE_CONTROL_MAX_AGE.len());
        if prefix.is_some_and(|p| p.eq_ignore_ascii_case(CACHE_CONTROL_MAX_AGE))
        {
            if let Some(seconds) = token
                .get(CACHE_CONTROL_MAX_AGE.len()..)
                .and_then(|v| v.parse::<u32>().ok())
            {
                return Some(now + chrono::Duration::seconds(seconds.into()));
            }
        }
    }

    if !expires.trim().is_empty() {
        return parse_datetime(expires);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iso(text: &str) -> DateTime<Utc> {
        text.parse().unwrap()
    }

    /* ==== Case-insensitive header names ==== */

    #[test]
    fn header_names_compare_case_insensitively() {
        let samples = ["cache-control", "Cache-Control", "CACHE-CONTROL"];
        for a in samples {
            for b in samples {
                assert_eq!(HeaderName::from(a), HeaderName::from(b));
                assert_eq!(HeaderName::from(a), b);
            }
            assert!(HeaderName::from(a) != *"whatever");
        }
    }

    #[test]
    fn header_names_hash_case_insensitively() {
        use std::collections::hash_map::DefaultHasher;

        let hash = |name: &HeaderName| {
            let mut hasher = DefaultHasher::new();
            name.hash(&mut hasher);
            hasher.finish()
        };

        assert_eq!(
            hash(&HeaderName::from("Location")),
            hash(&HeaderName::from("LOCATION"))
        );
    }

    #[test]
    fn header_lookup_ignores_case() {
        let message = Message::parse(
            b"HTTP/1.1 200 OK\r\nCache-Control: max-age=1800\r\n\r\n",
        )
        .unwrap();
        assert_eq!(message.header("cache-control"), Some("max-age=1800"));
        assert_eq!(message.header("CACHE-CONTROL"), Some("max-age=1800"));
        assert_eq!(message.header("cache-controll"), None);
    }

    /* ==== Message framing ==== */

    #[test]
    fn parses_request() {
        let message = Message::parse(
            b"M-SEARCH * HTTP/1.1\r\n\
              HOST: 239.255.255.250:1900\r\n\
              MAN: \"ssdp:discover\"\r\n\
              MX: 1\r\n\
              ST: upnp:rootdevice\r\n\
              \r\n",
        )
        .unwrap();

        assert_eq!(message.kind(), Kind::Request);
        assert_eq!(message.protocol(), "HTTP/1.1");
        assert_eq!(message.verb(), "M-SEARCH");
        assert_eq!(message.resource(), "*");
        assert_eq!(message.status_code(), None);
        assert_eq!(message.status_phrase(), "");
        assert_eq!(message.headers().len(), 4);

        assert_eq!(message.headers()[0].0, "HOST");
        assert_eq!(message.headers()[0].1, "239.255.255.250:1900");
        assert_eq!(message.headers()[1].0, "MAN");
        assert_eq!(message.headers()[1].1, "\"ssdp:discover\"");
        assert_eq!(message.headers()[2].0, "MX");
        assert_eq!(message.headers()[2].1, "1");
        assert_eq!(message.headers()[3].0, "ST");
        assert_eq!(message.headers()[3].1, "upnp:rootdevice");
    }

    #[test]
    fn parses_response() {
        let message = Message::parse(
            b"HTTP/1.1 200 OK\r\n\
              Cache-Control: max-age=1800\r\n\
              Location: http://192.168.0.4:49000/servicedesc.xml\r\n\
              Server: Hyper 6000 UPnP/1.0 Company Hyper 6000 1.2.3\r\n\
              Ext: \r\n\
              ST: upnp:rootdevice\r\n\
              USN: uuid:285fe440-2eee-4a0e-b11c-d051f4caa274:upnp:rootdevice\r\n\
              \r\n",
        )
        .unwrap();

        assert_eq!(message.kind(), Kind::Response);
        assert_eq!(message.protocol(), "HTTP/1.1");
        assert_eq!(message.verb(), "");
        assert_eq!(message.resource(), "");
        assert_eq!(message.status_code(), Some(200));
        assert_eq!(message.status_phrase(), "OK");
        assert_eq!(message.headers().len(), 6);
        assert_eq!(message.headers()[3].0, "Ext");
        assert_eq!(message.headers()[3].1, "");
    }

    #[test]
    fn response_phrase_may_contain_spaces() {
        let message = Message::parse(b"HTTP/1.1 404 Not Found\r\n\r\n").unwrap();
        assert_eq!(message.status_code(), Some(404));
        assert_eq!(message.status_phrase(), "Not Found");
    }

    #[test]
    fn continuation_lines_join_previous_header() {
        let message = Message::parse(
            b"HTTP/1.1 200 OK\r\n\
              AL: <http://one/>\r\n\
              \t<http://two/>\r\n\
              \r\n",
        )
        .unwrap();
        assert_eq!(message.headers().len(), 1);
        assert_eq!(message.header("al"), Some("<http://one/><http://two/>"));
    }

    #[test]
    fn malformed_header_lines_dropped() {
        let message = Message::parse(
            b"HTTP/1.1 200 OK\r\n\
              this line has no colon\r\n\
              ST: upnp:rootdevice\r\n\
              \r\n",
        )
        .unwrap();
        assert_eq!(message.headers().len(), 1);
        assert_eq!(message.header("st"), Some("upnp:rootdevice"));
    }

    #[test]
    fn leading_continuation_dropped() {
        let message = Message::parse(
            b"HTTP/1.1 200 OK\r\n \
              floating continuation\r\n\r\n",
        )
        .unwrap();
        assert!(message.headers().is_empty());
    }

    #[test]
    fn rejects_non_http() {
        assert!(Message::parse(b"").is_none());
        assert!(Message::parse(b"foo-bar").is_none());
        assert!(Message::parse(b"one two three\r\n\r\n").is_none());
        assert!(Message::parse(&[0x80, 0x81]).is_none());
        assert!(Message::parse(&[0, 1, 2, 3, 4, 5]).is_none());
    }

    #[test]
    fn headers_after_blank_line_ignored() {
        let message = Message::parse(
            b"HTTP/1.1 200 OK\r\n\
              ST: upnp:rootdevice\r\n\
              \r\n\
              Trailing: body\r\n",
        )
        .unwrap();
        assert_eq!(message.headers().len(), 1);
    }

    /* ==== Date parsing ==== */

    #[test]
    fn parses_rfc1123_date() {
        assert_eq!(
            parse_datetime("Sun, 06 Nov 1994 08:49:37 GMT"),
            Some(iso("1994-11-06T08:49:37Z"))
        );
    }

    #[test]
    fn parses_rfc850_date() {
        assert_eq!(
            parse_datetime("Sunday, 06-Nov-94 08:49:37 GMT"),
            Some(iso("1994-11-06T08:49:37Z"))
        );
    }

    #[test]
    fn parses_asctime_date() {
        assert_eq!(
            parse_datetime("Sun Nov  6 08:49:37 1994"),
            Some(iso("1994-11-06T08:49:37Z"))
        );
    }

    #[test]
    fn rejects_garbage_date() {
        assert_eq!(parse_datetime("yesterday-ish"), None);
        assert_eq!(parse_datetime(""), None);
    }

    /* ==== Expiry computation ==== */

    #[test]
    fn expiry_precedence() {
        let now = iso("1994-11-06T08:49:37Z");
        let expires = "Sun, 06 Nov 1994 08:54:37 GMT";

        assert_eq!(expiry_datetime("", "", now), None);
        assert_eq!(expiry_datetime("no-cache", "", now), Some(now));
        assert_eq!(
            expiry_datetime("max-age=60", "", now),
            Some(now + chrono::Duration::seconds(60))
        );
        assert_eq!(
            expiry_datetime("", expires, now),
            Some(now + chrono::Duration::seconds(300))
        );
        assert_eq!(
            expiry_datetime("max-age=60, no-cache", expires, now),
            Some(now)
        );
    }

    #[test]
    fn expiry_tolerates_spaces_and_case() {
        let now = iso("1994-11-06T08:49:37Z");
        assert_eq!(
            expiry_datetime("Max-Age = 7393", "", now),
            Some(now + chrono::Duration::seconds(7393))
        );
        assert_eq!(expiry_datetime("NO-CACHE", "", now), Some(now));
    }

    #[test]
    fn expiry_is_monotone_in_now() {
        let now = iso("1994-11-06T08:49:37Z");
        let later = now + chrono::Duration::seconds(120);

        assert_eq!(
            expiry_datetime("no-cache", "", later),
            Some(later)
        );
        assert_eq!(
            expiry_datetime("max-age=60", "", later).unwrap()
                - expiry_datetime("max-age=60", "", now).unwrap(),
            chrono::Duration::seconds(120)
        );
        // a fixed Expires date does not move
        let expires = "Sun, 06 Nov 1994 08:54:37 GMT";
        assert_eq!(
            expiry_datetime("", expires, now),
            expiry_datetime("", expires, later)
        );
    }

    #[test]
    fn bad_max_age_falls_through_to_expires() {
        let now = iso("1994-11-06T08:49:37Z");
        let expires = "Sun, 06 Nov 1994 08:54:37 GMT";
        assert_eq!(
            expiry_datetime("max-age=soon", expires, now),
            Some(now + chrono::Duration::seconds(300))
        );
    }
}
