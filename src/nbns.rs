//! NetBIOS Name Service name encoding ([RFC 1001] section 14).
//!
//! NetBIOS names are 16 bytes long: up to 15 characters of name, padded with spaces, followed by
//! a suffix byte identifying the service. On the wire they are "second-level encoded": every byte
//! is split into two nibbles, and each nibble is sent as a letter between `A` and `P`. The
//! resulting 32 letters form a single DNS label.
//!
//! [RFC 1001]: https://datatracker.ietf.org/doc/html/rfc1001

use bitflags::bitflags;

use crate::name::{DomainName, Label};
use crate::packet::decoder::Reader;
use crate::Error;

/// Length of a NetBIOS name in bytes, before encoding.
pub const NAME_LEN: usize = 16;

/// Length of a second-level encoded NetBIOS name.
pub const ENCODED_NAME_LEN: usize = 2 * NAME_LEN;

/// The wildcard name `*`, padded with NUL bytes.
///
/// An `NBSTAT` query for this name asks the target for all names it has registered.
pub const WILDCARD_NAME: [u8; NAME_LEN] = *b"*\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0";

/// Number of name characters in a node status name record, not counting the suffix byte.
const RECORD_NAME_LEN: usize = 15;

/// Size of a node status name record: the name, its suffix byte, and 16 bits of name flags.
pub const NAME_RECORD_LEN: usize = RECORD_NAME_LEN + 3;

/// Applies second-level encoding to `source`.
///
/// Every byte is turned into two letters, the high nibble first, by adding the nibble's value to
/// `'A'`. The output is always twice as long as the input.
pub fn second_level_encode(source: &[u8]) -> String {
    let mut out = String::with_capacity(source.len() * 2);
    for &byte in source {
        out.push(char::from(b'A' + (byte >> 4)));
        out.push(char::from(b'A' + (byte & 0x0f)));
    }
    out
}

/// Reverses [`second_level_encode`].
///
/// Fails with [`Error::InvalidValue`] if `encoded` has an odd length or contains anything but
/// the letters `A` to `P`.
pub fn second_level_decode(encoded: &[u8]) -> Result<Vec<u8>, Error> {
    if encoded.len() % 2 != 0 {
        return Err(Error::InvalidValue);
    }

    let nibble = |letter: u8| match letter {
        b'A'..=b'P' => Ok(letter - b'A'),
        _ => Err(Error::InvalidValue),
    };

    encoded
        .chunks_exact(2)
        .map(|pair| -> Result<u8, Error> { Ok(nibble(pair[0])? << 4 | nibble(pair[1])?) })
        .collect()
}

/// Returns the query name of an `NBSTAT` request: the encoded wildcard name as a single label.
pub fn query_name() -> DomainName {
    let encoded = second_level_encode(&WILDCARD_NAME);
    // 32 letters always fit into a label.
    DomainName::from_iter([Label::new(encoded)])
}

/// Returns the wire form of [`query_name`]: the length byte 32, the 32 encoded letters, and a
/// terminating zero byte.
pub fn build_query_name() -> Vec<u8> {
    query_name().encode()
}

bitflags! {
    /// Flags of a name registered by a NetBIOS node ([RFC 1002] section 4.2.18).
    ///
    /// [RFC 1002]: https://datatracker.ietf.org/doc/html/rfc1002
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NameFlags: u16 {
        /// The name is a group name, rather than a unique name.
        const GROUP = 1 << 15;
        /// Owner node type (B, P, M or H node).
        const OWNER_NODE_TYPE = 0b11 << 13;
        /// The name is being deregistered.
        const DEREGISTERING = 1 << 12;
        /// The name is in conflict.
        const CONFLICT = 1 << 11;
        /// The name is active.
        const ACTIVE = 1 << 10;
        /// The name is permanent.
        const PERMANENT = 1 << 9;
    }
}

/// A name entry from a node status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    /// The name, with trailing padding removed.
    pub name: String,
    /// The 16th byte of the NetBIOS name, identifying the service that registered it.
    ///
    /// `0x00` is the workstation service, `0x20` the file server service.
    pub suffix: u8,
    pub flags: NameFlags,
}

impl NameRecord {
    #[inline]
    pub fn is_group(&self) -> bool {
        self.flags.contains(NameFlags::GROUP)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.flags.contains(NameFlags::ACTIVE)
    }
}

fn decode_record_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

/// Reads `num_names` consecutive name records from the start of `buf`.
///
/// Fails with [`Error::TruncatedMessage`] if `buf` holds fewer than
/// `num_names * NAME_RECORD_LEN` bytes. Bytes after the last record (node statistics) are
/// ignored.
pub fn extract_records(buf: &[u8], num_names: u8) -> Result<Vec<NameRecord>, Error> {
    let mut r = Reader::new(buf);
    if r.remaining() < usize::from(num_names) * NAME_RECORD_LEN {
        return Err(Error::TruncatedMessage);
    }

    (0..num_names)
        .map(|_| -> Result<NameRecord, Error> {
            let name = decode_record_name(r.read_slice(RECORD_NAME_LEN)?);
            let suffix = r.read_u8()?;
            let flags = NameFlags::from_bits_retain(r.read_u16()?);
            Ok(NameRecord {
                name,
                suffix,
                flags,
            })
        })
        .collect()
}

/// Reads `num_names` consecutive name records from the start of `buf`, and returns their names
/// in order.
pub fn extract_names(buf: &[u8], num_names: u8) -> Result<Vec<String>, Error> {
    Ok(extract_records(buf, num_names)?
        .into_iter()
        .map(|record| record.name)
        .collect())
}
