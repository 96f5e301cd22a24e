//! Bounds-checked little-endian reads over byte slices.
//!
//! Every primitive the CIL decoder consumes (opcode bytes, branch displacements, tokens,
//! integer and floating point immediates) is read through [`read_le_at`], which refuses to
//! read past the end of the slice instead of panicking.

use crate::Result;

/// Primitive values that can be read from a little-endian byte sequence.
pub trait CilIO: Sized {
    /// The fixed-size byte array backing this type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Builds the value from little-endian bytes.
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_cilio {
    ($($ty:ty => $n:literal),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $n];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_cilio! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
    f32 => 4,
    f64 => 8,
}

/// Reads a `T` at `*offset` and advances the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain; the
/// offset is left untouched in that case.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let size = std::mem::size_of::<T>();
    let end = offset
        .checked_add(size)
        .ok_or_else(|| out_of_bounds_error!())?;
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(bytes) = T::Bytes::try_from(&data[*offset..end]) else {
        return Err(malformed_error!("Failed to convert {} bytes at {}", size, offset));
    };

    *offset = end;
    Ok(T::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn read_sequence() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0xFF];
        let mut offset = 0;

        assert_eq!(read_le_at::<u16>(&data, &mut offset).unwrap(), 0x0201);
        assert_eq!(offset, 2);
        assert_eq!(read_le_at::<u32>(&data, &mut offset).unwrap(), 0x0605_0403);
        assert_eq!(offset, 6);
        assert_eq!(read_le_at::<i8>(&data, &mut offset).unwrap(), 0x07);
        assert_eq!(read_le_at::<u8>(&data, &mut offset).unwrap(), 0x08);
        assert_eq!(read_le_at::<i8>(&data, &mut offset).unwrap(), -1);
    }

    #[test]
    fn read_floats() {
        let mut data = Vec::new();
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&(-2.25f64).to_le_bytes());

        let mut offset = 0;
        assert_eq!(read_le_at::<f32>(&data, &mut offset).unwrap(), 1.5);
        assert_eq!(read_le_at::<f64>(&data, &mut offset).unwrap(), -2.25);
        assert_eq!(offset, 12);
    }

    #[test]
    fn read_past_end() {
        let data = [0x01, 0x02, 0x03];
        let mut offset = 0;

        let result = read_le_at::<u32>(&data, &mut offset);
        assert!(matches!(result, Err(Error::OutOfBounds { .. })));
        assert_eq!(offset, 0);

        let mut offset = usize::MAX;
        assert!(read_le_at::<u8>(&data, &mut offset).is_err());
    }
}
