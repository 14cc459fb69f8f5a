//! DNS-style message header and wire constants shared by mDNS and NBNS.

#[macro_use]
mod macros;
pub mod decoder;
pub mod encoder;
mod error;

use core::fmt;
use std::mem::size_of;

use bitflags::bitflags;

use crate::num::U16;

pub use error::Error;

ffi_enum! {
    /// DNS message operation codes.
    pub enum Opcode: u8 {
        /// Query (or response to a query).
        QUERY = 0,
        /// Inverse Query (obsolete).
        IQUERY = 1,
        /// Server status request.
        STATUS = 2,
        NOTIFY = 4,
        UPDATE = 5,
    }
}

ffi_enum! {
    /// Server response codes.
    ///
    /// Only values up to 15 fit into the [`Header`].
    pub enum RCode: u8 {
        /// No error.
        NO_ERROR = 0,
        /// The query sent by the client was erroneous.
        FORM_ERR = 1,
        /// A server-side error prevented processing of the query.
        SERV_FAIL = 2,
        /// The queried name does not exist.
        NX_DOMAIN = 3,
        /// The requested query type is not supported by the server.
        NOT_IMP = 4,
        /// The server refused to answer the query for policy reasons.
        REFUSED = 5,
        /// NBNS: the name is already registered by another node.
        ACT_ERR = 6,
        /// NBNS: name in conflict.
        CFT_ERR = 7,
    }
}

ffi_enum! {
    /// The queried resource type.
    ///
    /// Contains the DNS types this crate sends or expects, and the NetBIOS Name Service types from
    /// [RFC 1002].
    ///
    /// [RFC 1002]: https://datatracker.ietf.org/doc/html/rfc1002
    pub enum QType: u16 {
        A = 1,
        /// Domain name pointer, used for reverse lookups.
        PTR = 12,
        AAAA = 28,
        /// NetBIOS general name service resource record.
        NB = 0x20,
        /// NetBIOS node status resource record.
        NBSTAT = 0x21,
        /// Query is for all record types.
        ALL = 255,
    }
}

ffi_enum! {
    /// The queried resource class.
    pub enum QClass: u16 {
        /// The Internet.
        IN = 1,
        /// Query is for all classes of resource.
        ANY = 255,
    }
}

// Bit positions in the header flags are inverted, because RFC 1035 starts counting at the MSb.
const fn be_pos(pos: u16) -> u16 {
    15 - pos
}

bitflags! {
    #[derive(Debug, Clone, Copy)]
    #[repr(transparent)]
    struct HeaderFlags: u16 {
        /// If set, the message is a response to a query. If unset, it is a query.
        const QR = 1 << be_pos(0);
        const OPCODE = Self::OPCODE_MASK;
        /// Set if the response was sent by an authority for the queried name. mDNS and NBNS
        /// responders always set it.
        const AA = 1 << be_pos(5);
        /// Set if the message was truncated to fit the transmission channel.
        const TC = 1 << be_pos(6);
        /// Recursion Desired.
        const RD = 1 << be_pos(7);
        /// Recursion Available.
        const RA = 1 << be_pos(8);
        const Z = 0b111 << be_pos(11);
        const RCODE = Self::RCODE_MASK;
    }
}

impl HeaderFlags {
    const OPCODE_POS: u16 = 11;
    const OPCODE_MASK: u16 = 0b1111 << Self::OPCODE_POS;

    const RCODE_POS: u16 = 0;
    const RCODE_MASK: u16 = 0b1111 << Self::RCODE_POS;

    fn opcode(&self) -> Opcode {
        Opcode(((self.bits() & Self::OPCODE_MASK) >> Self::OPCODE_POS) as u8)
    }

    fn rcode(&self) -> RCode {
        RCode(((self.bits() & Self::RCODE_MASK) >> Self::RCODE_POS) as u8)
    }

    fn with_field(self, mask: u16, pos: u16, value: u8) -> Self {
        Self::from_bits_retain((self.bits() & !mask) | ((u16::from(value) << pos) & mask))
    }
}

/// The fixed 12-byte message header.
///
/// Every field is stored in network byte order, so the struct can be copied to and from the wire
/// as-is.
#[derive(Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct Header {
    id: U16,
    flags: U16,
    qdcount: U16,
    ancount: U16,
    nscount: U16,
    arcount: U16,
}

impl Header {
    /// Size of the encoded header in bytes.
    pub const LEN: usize = size_of::<Header>();

    /// Creates the header of a single-question query: all flags clear, `qdcount` of 1, and all
    /// other counts zero.
    pub fn query(id: u16) -> Self {
        let mut header = Self::default();
        header.set_id(id);
        header.set_question_count(1);
        header
    }

    /// Decodes a header from the first 12 bytes of `buf`.
    ///
    /// Flags and counts are not validated; responders vary too much in what they set.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        decoder::Reader::new(buf).read_header()
    }

    /// Returns the wire representation of this header.
    #[inline]
    pub fn encode(&self) -> [u8; Self::LEN] {
        bytemuck::cast(*self)
    }

    fn flags(&self) -> HeaderFlags {
        HeaderFlags::from_bits_retain(self.flags.get())
    }

    fn modify_flags(&mut self, with: impl FnOnce(HeaderFlags) -> HeaderFlags) {
        self.flags = with(self.flags()).bits().into();
    }

    /// Returns the 16-bit transaction ID.
    ///
    /// Responders copy this ID to the corresponding response, so that the client can match
    /// responses to its queries.
    #[inline]
    pub fn id(&self) -> u16 {
        self.id.get()
    }

    #[inline]
    pub fn set_id(&mut self, id: u16) {
        self.id = id.into();
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        self.flags().contains(HeaderFlags::QR)
    }

    pub fn set_response(&mut self, is_response: bool) {
        self.modify_flags(|mut f| {
            f.set(HeaderFlags::QR, is_response);
            f
        });
    }

    pub fn is_authority(&self) -> bool {
        self.flags().contains(HeaderFlags::AA)
    }

    pub fn set_authority(&mut self, aa: bool) {
        self.modify_flags(|mut f| {
            f.set(HeaderFlags::AA, aa);
            f
        });
    }

    /// Returns whether the truncation flag is set.
    pub fn is_truncated(&self) -> bool {
        self.flags().contains(HeaderFlags::TC)
    }

    pub fn is_recursion_desired(&self) -> bool {
        self.flags().contains(HeaderFlags::RD)
    }

    pub fn opcode(&self) -> Opcode {
        self.flags().opcode()
    }

    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.modify_flags(|f| {
            f.with_field(HeaderFlags::OPCODE_MASK, HeaderFlags::OPCODE_POS, opcode.0)
        });
    }

    pub fn rcode(&self) -> RCode {
        self.flags().rcode()
    }

    pub fn set_rcode(&mut self, rcode: RCode) {
        self.modify_flags(|f| {
            f.with_field(HeaderFlags::RCODE_MASK, HeaderFlags::RCODE_POS, rcode.0)
        });
    }

    /// Returns the raw 16-bit flags field.
    #[inline]
    pub fn raw_flags(&self) -> u16 {
        self.flags.get()
    }

    pub fn question_count(&self) -> u16 {
        self.qdcount.get()
    }

    pub fn answer_count(&self) -> u16 {
        self.ancount.get()
    }

    pub fn authority_count(&self) -> u16 {
        self.nscount.get()
    }

    pub fn additional_count(&self) -> u16 {
        self.arcount.get()
    }

    pub fn set_question_count(&mut self, qdcount: u16) {
        self.qdcount = qdcount.into();
    }

    pub fn set_answer_count(&mut self, ancount: u16) {
        self.ancount = ancount.into();
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("id", &format_args!("{:#06x}", self.id()))
            .field("flags", &format_args!("{:#06x}", self.raw_flags()))
            .field("qdcount", &self.question_count())
            .field("ancount", &self.answer_count())
            .field("nscount", &self.authority_count())
            .field("arcount", &self.additional_count())
            .finish()
    }
}
