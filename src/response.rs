//! Decoding of lookup responses.
//!
//! Both parsers first check the transaction ID. A mismatch is reported as
//! [`Error::NotOurResponse`], which callers are expected to treat as "keep waiting".

use crate::{
    hex::Hex,
    nbns::{self, NameRecord},
    packet::{decoder::Reader, Header, QType, RCode},
    Error,
};

/// Offset of the name count in a node status response.
///
/// Responders do not echo the question of an `NBSTAT` query; the response consists of the header,
/// the 34-byte encoded wildcard name, type, class, TTL and RDLENGTH, followed by the name count.
pub const NBSTAT_NUM_NAMES_OFFSET: usize = 56;

/// mDNS responders set the top bit of the class field to signal a cache flush.
const CACHE_FLUSH: u16 = 0x8000;

fn check_header(buf: &[u8], expected_transaction_id: u16) -> Result<Header, Error> {
    let header = Header::decode(buf)?;
    if header.id() != expected_transaction_id {
        return Err(Error::NotOurResponse);
    }
    if header.rcode() != RCode::NO_ERROR {
        log::debug!(
            "response {:#06x} has rcode {}, decoding anyway",
            header.id(),
            header.rcode()
        );
    }
    Ok(header)
}

/// Extracts the host name from the `PTR` answer of a reverse lookup response.
///
/// `question_len` is the length of the *Question* section of the query that was sent, which the
/// responder is expected to have echoed. The answer's owner name is skipped (it may be
/// compressed), but the host name in its RDATA must not be.
pub fn parse_mdns_ptr_response(
    buf: &[u8],
    expected_transaction_id: u16,
    question_len: usize,
) -> Result<String, Error> {
    let header = check_header(buf, expected_transaction_id)?;
    if header.answer_count() == 0 {
        log::debug!("response {:#06x} contains no answers", header.id());
        return Err(Error::InvalidValue);
    }

    let mut r = Reader::at(buf, Header::LEN + question_len);
    r.skip_domain_name()?;
    let ty = QType(r.read_u16()?);
    let class = r.read_u16()? & !CACHE_FLUSH;
    let ttl = r.read_u32()?;
    let rdlength = usize::from(r.read_u16()?);
    log::trace!(
        "answer: type={} class={} ttl={} rdlength={}",
        ty,
        class,
        ttl,
        rdlength
    );
    if ty != QType::PTR {
        return Err(Error::InvalidValue);
    }

    let rdata_start = r.pos();
    let name = r.read_domain_name()?;
    if r.pos() - rdata_start > rdlength {
        return Err(Error::TruncatedMessage);
    }

    Ok(name.to_dotted())
}

/// Extracts all name records from a node status response.
pub fn parse_nbns_nbstat_records(
    buf: &[u8],
    expected_transaction_id: u16,
) -> Result<Vec<NameRecord>, Error> {
    check_header(buf, expected_transaction_id)?;

    let num_names = *buf
        .get(NBSTAT_NUM_NAMES_OFFSET)
        .ok_or(Error::TruncatedMessage)?;
    log::trace!(
        "node status lists {} names: {}",
        num_names,
        Hex(&buf[NBSTAT_NUM_NAMES_OFFSET + 1..])
    );
    nbns::extract_records(&buf[NBSTAT_NUM_NAMES_OFFSET + 1..], num_names)
}

/// Extracts the names registered by a host from a node status response, in the order the host
/// listed them.
pub fn parse_nbns_nbstat_response(
    buf: &[u8],
    expected_transaction_id: u16,
) -> Result<Vec<String>, Error> {
    Ok(parse_nbns_nbstat_records(buf, expected_transaction_id)?
        .into_iter()
        .map(|record| record.name)
        .collect())
}
