//! Big-endian integers as they appear on the wire.

/// A `u16` stored in network byte order.
#[derive(Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub(crate) struct U16(u16);

impl U16 {
    #[inline]
    pub(crate) fn get(self) -> u16 {
        u16::from_be(self.0)
    }
}

impl From<u16> for U16 {
    #[inline]
    fn from(value: u16) -> Self {
        Self(value.to_be())
    }
}

/// A `u32` stored in network byte order.
#[derive(Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub(crate) struct U32(u32);

impl U32 {
    #[inline]
    pub(crate) fn get(self) -> u32 {
        u32::from_be(self.0)
    }
}
