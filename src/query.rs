//! Construction of the outgoing lookup queries.

use std::net::Ipv4Addr;

use crate::{
    name::{encode_reverse_ptr, DomainName},
    nbns,
    packet::{
        encoder::{QueryEncoder, Question},
        Header, QClass, QType,
    },
    Error,
};

/// An encoded reverse lookup query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdnsPtrQuery {
    /// The complete message.
    pub bytes: Vec<u8>,
    /// Length of the *Question* section.
    ///
    /// Responders echo the question, so the first answer record of a response starts at
    /// `12 + question_len`.
    pub question_len: usize,
}

/// Builds a `PTR` query for the reverse lookup name of the dotted IPv4 address `ipv4_dotted`.
///
/// The address is not validated (see [`encode_reverse_ptr`]). Fails with
/// [`Error::LabelTooLong`] if one of its segments exceeds 63 bytes.
pub fn build_mdns_ptr_query(transaction_id: u16, ipv4_dotted: &str) -> Result<MdnsPtrQuery, Error> {
    let mut bytes = Vec::from(Header::query(transaction_id).encode());
    bytes.extend(encode_reverse_ptr(ipv4_dotted)?);
    bytes.extend(QType::PTR.value().to_be_bytes());
    bytes.extend(QClass::IN.value().to_be_bytes());
    let question_len = bytes.len() - Header::LEN;
    Ok(MdnsPtrQuery {
        bytes,
        question_len,
    })
}

/// Builds a `PTR` query for the reverse lookup name of `addr`.
///
/// The same query works for multicast DNS and for unicast DNS.
pub fn build_mdns_ptr_query_for(transaction_id: u16, addr: Ipv4Addr) -> MdnsPtrQuery {
    let name = DomainName::reverse_pointer(addr);
    let mut enc = QueryEncoder::new(transaction_id);
    let question_len = enc.question(Question::new(&name).ty(QType::PTR));
    MdnsPtrQuery {
        bytes: enc.finish(),
        question_len,
    }
}

/// Builds an `NBSTAT` query for the wildcard NetBIOS name.
pub fn build_nbns_nbstat_query(transaction_id: u16) -> Vec<u8> {
    let name = nbns::query_name();
    let mut enc = QueryEncoder::new(transaction_id);
    enc.question(Question::new(&name).ty(QType::NBSTAT).class(QClass::IN));
    enc.finish()
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;
    use crate::hex::{self, Hex};

    #[test]
    fn mdns_query_bytes() {
        let q = build_mdns_ptr_query(0xF0F0, "10.0.9.10").unwrap();
        assert_eq!(
            q.bytes,
            hex::parse(
                "f0f0 0000 0001 0000 0000 0000
                 023130 0139 0130 023130 07696e2d61646472 0461727061 00
                 000c 0001"
            )
        );
        assert_eq!(q.question_len, 28);
        assert_eq!(q.bytes.len(), Header::LEN + q.question_len);
    }

    #[test]
    fn mdns_query_for_host() {
        let q = build_mdns_ptr_query(0xFEED, "192.168.0.10").unwrap();
        expect![[r#"feed000000010000000000000231300130033136380331393207696e2d61646472046172706100000c0001"#]]
            .assert_eq(&Hex(&q.bytes).to_string());
        assert_eq!(q.question_len, 31);
        assert_eq!(
            q,
            build_mdns_ptr_query_for(0xFEED, Ipv4Addr::new(192, 168, 0, 10))
        );
    }

    #[test]
    fn mdns_query_bad_segment() {
        let addr = format!("1.2.3.{}", "4".repeat(64));
        assert_eq!(build_mdns_ptr_query(1, &addr), Err(Error::LabelTooLong));
    }

    #[test]
    fn nbstat_query_bytes() {
        let bytes = build_nbns_nbstat_query(0xF00D);
        expect![[r#"f00d0000000100000000000020434b4141414141414141414141414141414141414141414141414141414141410000210001"#]]
            .assert_eq(&Hex(&bytes).to_string());
        assert_eq!(bytes.len(), 50);
    }
}
