//! Domain names and labels, and their uncompressed wire encoding.

use std::{
    fmt::{self, Write},
    net::Ipv4Addr,
    str::FromStr,
};

use crate::packet::encoder::Writer;
use crate::Error;

/// A `.`-separated component of a [`DomainName`].
///
/// Labels consist of arbitrary bytes and have a maximum length of 63 bytes. This type can only
/// represent non-empty labels, so the minimum length is 1 byte.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    // Guaranteed to contain >0 and at most `Label::MAX_LEN` bytes.
    bytes: Box<[u8]>,
}

impl Label {
    /// The maximum length of a domain label.
    pub const MAX_LEN: usize = 0b0011_1111;

    /// Creates a [`Label`] from raw bytes or a string slice, panicking if the bytes are an invalid
    /// label.
    ///
    /// # Panics
    ///
    /// This function will panic if `bytes` is empty or contains more than [`Self::MAX_LEN`] bytes.
    pub fn new(label: impl AsRef<[u8]>) -> Self {
        Self::new_impl(label.as_ref())
    }

    fn new_impl(label: &[u8]) -> Self {
        Self::try_new(label)
            .unwrap_or_else(|_| panic!("`Label::new` called with invalid data: {:?}", label))
    }

    /// Creates a [`Label`] from raw bytes or a string slice.
    ///
    /// Returns [`Error::LabelTooLong`] if the label exceeds [`Self::MAX_LEN`] bytes, and
    /// [`Error::InvalidValue`] if it is empty.
    pub fn try_new(label: impl AsRef<[u8]>) -> Result<Self, Error> {
        Self::try_new_impl(label.as_ref())
    }

    fn try_new_impl(label: &[u8]) -> Result<Self, Error> {
        if label.is_empty() {
            return Err(Error::InvalidValue);
        }

        if label.len() > Self::MAX_LEN {
            return Err(Error::LabelTooLong);
        }

        Ok(Self {
            bytes: label.into(),
        })
    }

    /// Returns the raw bytes of this label.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#""{}""#, self.as_bytes().escape_ascii())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_bytes().escape_ascii(), f)
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s)
    }
}

/// A domain name, represented as a list of [`Label`]s.
///
/// On the wire, domain names are terminated by an empty label, but this type omits that label.
#[derive(PartialEq, Eq, Clone)]
pub struct DomainName {
    // Does not include the trailing empty label.
    labels: Vec<Label>,
}

impl DomainName {
    /// The empty root domain `.`.
    pub const ROOT: Self = Self { labels: Vec::new() };

    /// Builds a domain name from `.`-separated segments.
    ///
    /// Empty segments are skipped, so leading, trailing and doubled dots are tolerated.
    pub fn from_dotted(s: &str) -> Result<Self, Error> {
        Self::from_segments(s.split('.'))
    }

    fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Result<Self, Error> {
        segments
            .into_iter()
            .filter(|segment| !segment.is_empty())
            .map(Label::try_new)
            .collect()
    }

    /// Returns the reverse lookup name of `addr`: its octets in reverse order, under
    /// `in-addr.arpa`.
    ///
    /// For `192.168.0.10` this is `10.0.168.192.in-addr.arpa`.
    pub fn reverse_pointer(addr: Ipv4Addr) -> Self {
        addr.octets()
            .iter()
            .rev()
            .map(|octet| Label::new(octet.to_string()))
            .chain([Label::new("in-addr"), Label::new("arpa")])
            .collect()
    }

    /// Returns the `.`-separated labels making up this domain name.
    ///
    /// The trailing empty label is not included.
    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Appends a [`Label`] to the end of this domain name.
    #[inline]
    pub fn push_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    /// Returns the uncompressed wire encoding of this name, including the terminating zero byte.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_domain_name(self);
        w.finish()
    }

    /// Returns the length of [`DomainName::encode`]'s output.
    pub fn encoded_len(&self) -> usize {
        self.labels
            .iter()
            .map(|label| 1 + label.as_bytes().len())
            .sum::<usize>()
            + 1
    }

    /// Formats the name as `.`-joined labels without a trailing dot.
    ///
    /// Label bytes are interpreted as UTF-8, since mDNS host names may contain non-ASCII
    /// characters. Invalid sequences are replaced with U+FFFD.
    pub fn to_dotted(&self) -> String {
        let mut out = String::new();
        for (i, label) in self.labels.iter().enumerate() {
            if i != 0 {
                out.push('.');
            }
            out.push_str(&String::from_utf8_lossy(label.as_bytes()));
        }
        out
    }
}

impl FromIterator<Label> for DomainName {
    fn from_iter<T: IntoIterator<Item = Label>>(iter: T) -> Self {
        Self {
            labels: Vec::from_iter(iter),
        }
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_char('.');
        }
        for label in &self.labels {
            fmt::Display::fmt(label, f)?;
            f.write_char('.')?;
        }
        Ok(())
    }
}

impl FromStr for DomainName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dotted(s)
    }
}

/// Encodes a `.`-separated name as a sequence of length-prefixed labels, terminated by a zero
/// byte.
///
/// Empty segments are skipped. Fails with [`Error::LabelTooLong`] if a segment exceeds 63 bytes.
pub fn encode_forward(dotted: &str) -> Result<Vec<u8>, Error> {
    Ok(DomainName::from_dotted(dotted)?.encode())
}

/// Encodes the reverse lookup name of a dotted IPv4 address.
///
/// The segments of `ipv4_dotted` are emitted in reverse order, followed by `in-addr` and `arpa`.
/// The segments are not checked to be valid octets: a malformed address produces a well-formed
/// query that nobody will answer.
pub fn encode_reverse_ptr(ipv4_dotted: &str) -> Result<Vec<u8>, Error> {
    let mut segments = ipv4_dotted.split('.').collect::<Vec<_>>();
    segments.reverse();
    segments.extend(["in-addr", "arpa"]);
    Ok(DomainName::from_segments(segments)?.encode())
}
