//! Little-endian value encoding for the typed access primitives.
//!
//! The access engine is generic over the access width. The contract is
//! little-endian byte order regardless of host endianness, so values are
//! assembled and disassembled explicitly instead of through pointer casts.

/// An unsigned integer that can move through the memory engine.
///
/// Implemented for `u8`, `u16`, `u32`, and `u64`; `SIZE` is the access width
/// in bytes. Sealed to this crate.
pub(crate) trait MemValue: Copy + Into<u64> {
    /// Access width in bytes.
    const SIZE: usize;

    /// Assembles a value from `Self::SIZE` little-endian bytes.
    fn from_le(bytes: &[u8]) -> Self;

    /// Writes the value as `Self::SIZE` little-endian bytes into `out`.
    fn write_le(self, out: &mut [u8]);
}

macro_rules! impl_mem_value {
    ($ty:ty, $size:expr) => {
        impl MemValue for $ty {
            const SIZE: usize = $size;

            #[inline(always)]
            fn from_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; $size];
                raw.copy_from_slice(bytes);
                <$ty>::from_le_bytes(raw)
            }

            #[inline(always)]
            fn write_le(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_le_bytes());
            }
        }
    };
}

impl_mem_value!(u8, 1);
impl_mem_value!(u16, 2);
impl_mem_value!(u32, 4);
impl_mem_value!(u64, 8);
