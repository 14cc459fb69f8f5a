//! Query message encoder.

use bytemuck::NoUninit;

use super::{Header, QClass, QType};
use crate::name::DomainName;

/// Append-only byte buffer for building messages.
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[inline]
    pub(crate) fn pos(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn write_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub(crate) fn write_obj<T: NoUninit>(&mut self, obj: T) {
        self.write_slice(bytemuck::bytes_of(&obj))
    }

    pub(crate) fn write_u8(&mut self, b: u8) {
        self.buf.push(b);
    }

    pub(crate) fn write_u16(&mut self, v: u16) {
        self.write_slice(&v.to_be_bytes());
    }

    pub(crate) fn write_domain_name(&mut self, name: &DomainName) {
        for label in name.labels() {
            // `Label` guarantees a length of at most 63.
            self.write_u8(label.as_bytes().len() as u8);
            self.write_slice(label.as_bytes());
        }
        // Implicit root label at the end.
        self.write_u8(0);
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Encoder for a query message consisting of a header and a *Question* section.
pub struct QueryEncoder {
    w: Writer,
    header: Header,
}

impl QueryEncoder {
    /// Creates an encoder for a query with transaction ID `id`.
    ///
    /// The header is written with all flags cleared. The question count is fixed up by
    /// [`QueryEncoder::finish`].
    pub fn new(id: u16) -> Self {
        let mut header = Header::query(id);
        header.set_question_count(0);
        let mut w = Writer::new();
        w.write_obj(header);
        Self { w, header }
    }

    /// Appends a question and returns the number of bytes it occupies in the message.
    ///
    /// Responders echo the question back in front of their answers, so this length is needed to
    /// find the *Answer* section of the response.
    pub fn question(&mut self, question: Question<'_>) -> usize {
        let start = self.w.pos();
        self.w.write_domain_name(question.name);
        self.w.write_u16(question.ty.0);
        self.w.write_u16(question.class.0);
        let count = self.header.question_count() + 1;
        self.header.set_question_count(count);
        self.w.pos() - start
    }

    /// Finishes encoding and returns the message bytes.
    pub fn finish(self) -> Vec<u8> {
        let mut buf = self.w.finish();
        buf[..Header::LEN].copy_from_slice(&self.header.encode());
        buf
    }
}

/// An entry of the *Question* section.
pub struct Question<'a> {
    name: &'a DomainName,
    class: QClass,
    ty: QType,
}

impl<'a> Question<'a> {
    /// Creates a question asking for all records ([`QType::ALL`]) in the internet class
    /// ([`QClass::IN`]) pertaining to `name`.
    #[inline]
    pub fn new(name: &'a DomainName) -> Self {
        Self {
            name,
            class: QClass::IN,
            ty: QType::ALL,
        }
    }

    /// Sets the record class to query.
    #[inline]
    pub fn class(self, class: QClass) -> Self {
        Self { class, ..self }
    }

    /// Sets the resource type to query.
    #[inline]
    pub fn ty(self, ty: QType) -> Self {
        Self { ty, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_length() {
        let name = DomainName::from_dotted("a.b").unwrap();
        let mut enc = QueryEncoder::new(7);
        let len = enc.question(Question::new(&name).ty(QType::PTR));
        assert_eq!(len, name.encoded_len() + 4);
        let msg = enc.finish();
        assert_eq!(msg.len(), Header::LEN + len);
        assert_eq!(&msg[Header::LEN..], b"\x01a\x01b\x00\x00\x0c\x00\x01");
    }

    #[test]
    fn question_count_is_fixed_up() {
        let msg = QueryEncoder::new(0x1234).finish();
        let h = Header::decode(&msg).unwrap();
        assert_eq!(h.id(), 0x1234);
        assert_eq!(h.question_count(), 0);

        let name = DomainName::ROOT;
        let mut enc = QueryEncoder::new(0x1234);
        enc.question(Question::new(&name));
        let h = Header::decode(&enc.finish()).unwrap();
        assert_eq!(h.question_count(), 1);
    }
}
