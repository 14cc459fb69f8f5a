//! Cursor-based decoding of response messages.

use std::mem::size_of;

use bytemuck::AnyBitPattern;

use super::{Error, Header};
use crate::name::{DomainName, Label};
use crate::num::{U16, U32};

const POINTER_TAG: u8 = 0b1100_0000;

#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    /// The buffer containing the whole message.
    full_buf: &'a [u8],
    /// The current reader position in the buffer.
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            full_buf: buf,
            pos: 0,
        }
    }

    /// Creates a reader positioned at `pos`.
    ///
    /// A position past the end of the buffer is allowed; reading from it fails.
    pub(crate) fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { full_buf: buf, pos }
    }

    #[inline]
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the number of unread bytes.
    pub(crate) fn remaining(&self) -> usize {
        self.full_buf.len().saturating_sub(self.pos)
    }

    pub(crate) fn read_obj<T: AnyBitPattern>(&mut self) -> Result<T, Error> {
        let bytes = self.read_slice(size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    fn peek_u8(&self) -> Result<u8, Error> {
        self.full_buf
            .get(self.pos)
            .copied()
            .ok_or(Error::TruncatedMessage)
    }

    pub(crate) fn read_slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let end = self.pos.checked_add(len).ok_or(Error::TruncatedMessage)?;
        match self.full_buf.get(self.pos..end) {
            Some(slice) => {
                self.pos = end;
                Ok(slice)
            }
            None => Err(Error::TruncatedMessage),
        }
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.read_slice(len).map(drop)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        self.read_obj::<u8>()
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(self.read_obj::<U16>()?.get())
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(self.read_obj::<U32>()?.get())
    }

    pub(crate) fn read_header(&mut self) -> Result<Header, Error> {
        self.read_obj::<Header>()
    }

    /// Reads an uncompressed `<domain-name>` value.
    ///
    /// Fails with [`Error::UnsupportedCompression`] when a name pointer is encountered.
    pub(crate) fn read_domain_name(&mut self) -> Result<DomainName, Error> {
        let mut domain_name = DomainName::ROOT;
        loop {
            let length = self.peek_u8()?;
            match length & POINTER_TAG {
                0b0000_0000 => {
                    self.pos += 1;

                    // Length byte followed by a label of that many bytes.
                    if length == 0 {
                        break;
                    }
                    let label = self.read_slice(length.into())?;
                    domain_name.push_label(Label::try_new(label)?);
                }
                POINTER_TAG => return Err(Error::UnsupportedCompression),
                _ => return Err(Error::InvalidValue), // anything but 00 and 11 in MSb is reserved
            }
        }

        Ok(domain_name)
    }

    /// Advances past a `<domain-name>` value without decoding it.
    ///
    /// Unlike [`Reader::read_domain_name`], this accepts a name ending in a compression pointer:
    /// the 2-byte pointer is consumed, but not followed.
    pub(crate) fn skip_domain_name(&mut self) -> Result<(), Error> {
        loop {
            let length = self.peek_u8()?;
            match length & POINTER_TAG {
                0b0000_0000 => {
                    self.pos += 1;
                    if length == 0 {
                        return Ok(());
                    }
                    self.skip(length.into())?;
                }
                POINTER_TAG => return self.skip(2),
                _ => return Err(Error::InvalidValue),
            }
        }
    }
}

/// Decodes an uncompressed domain name starting at `start` in `buf`.
///
/// Returns the `.`-joined labels (without a trailing dot) and the number of bytes the name
/// occupies, including its terminating zero byte.
pub fn decode_name(buf: &[u8], start: usize) -> Result<(String, usize), Error> {
    let mut r = Reader::at(buf, start);
    let name = r.read_domain_name()?;
    Ok((name.to_dotted(), r.pos() - start))
}
