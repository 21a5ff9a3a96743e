use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::SourceQueryError;

/// Borrow `needed` bytes at `offset` from `data`, failing instead of panicking
/// when the packet is too short.
///
/// Mutates `offset` to the index after the bytes.
pub fn take<'a>(
    data: &'a [u8],
    offset: &mut usize,
    needed: usize,
) -> Result<&'a [u8], SourceQueryError> {
    let start: usize = *offset;
    let bytes = start
        .checked_add(needed)
        .and_then(|end| data.get(start..end))
        .ok_or(SourceQueryError::UnexpectedEnd {
            offset: start,
            needed,
            len: data.len(),
        })?;
    *offset += needed;
    Ok(bytes)
}

/// Get the value of a null-terminated string
/// with index 0 at `offset` in an array of bytes.
///
/// Mutates `offset` to the index after the null-termination byte.
/// Servers are not guaranteed to send UTF-8, so invalid sequences are replaced.
pub fn get_string(data: &[u8], offset: &mut usize) -> Result<String, SourceQueryError> {
    let start_offset: usize = *offset;
    let rest: &[u8] = data.get(start_offset..).unwrap_or_default();

    let Some(len) = rest.iter().position(|c| *c == 0) else {
        return Err(SourceQueryError::UnexpectedEnd {
            offset: start_offset,
            needed: rest.len() + 1,
            len: data.len(),
        });
    };
    *offset = start_offset + len + 1;

    Ok(String::from_utf8_lossy(&rest[..len]).into_owned())
}

/// Get the [u8] at index `offset` from `data`.
///
/// Mutates `offset` to the index after the byte.
pub fn get_u8(data: &[u8], offset: &mut usize) -> Result<u8, SourceQueryError> {
    Ok(take(data, offset, 1)?[0])
}

/// Get 2 little-endian bytes (as a [u16]) at index `offset` from `data`.
///
/// Mutates `offset` to the index after the bytes.
pub fn get_u16(data: &[u8], offset: &mut usize) -> Result<u16, SourceQueryError> {
    Ok(LittleEndian::read_u16(take(data, offset, 2)?))
}

/// Get 2 big-endian bytes (as a [u16]) at index `offset` from `data`.
/// Only the master server's port fields use network order.
///
/// Mutates `offset` to the index after the bytes.
pub fn get_u16_be(data: &[u8], offset: &mut usize) -> Result<u16, SourceQueryError> {
    Ok(BigEndian::read_u16(take(data, offset, 2)?))
}

/// Get 4 little-endian bytes (as an [i32]) at index `offset` from `data`.
///
/// Mutates `offset` to the index after the bytes.
pub fn get_i32(data: &[u8], offset: &mut usize) -> Result<i32, SourceQueryError> {
    Ok(LittleEndian::read_i32(take(data, offset, 4)?))
}

/// Get 4 little-endian bytes (as a [u32]) at index `offset` from `data`.
///
/// Mutates `offset` to the index after the bytes.
pub fn get_u32(data: &[u8], offset: &mut usize) -> Result<u32, SourceQueryError> {
    Ok(LittleEndian::read_u32(take(data, offset, 4)?))
}

/// Get 8 little-endian bytes (as a [u64]) at index `offset` from `data`.
///
/// Mutates `offset` to the index after the bytes.
pub fn get_u64(data: &[u8], offset: &mut usize) -> Result<u64, SourceQueryError> {
    Ok(LittleEndian::read_u64(take(data, offset, 8)?))
}

/// Get 4 little-endian bytes (as an [f32]) at index `offset` from `data`.
///
/// Mutates `offset` to the index after the bytes.
pub fn get_f32(data: &[u8], offset: &mut usize) -> Result<f32, SourceQueryError> {
    Ok(LittleEndian::read_f32(take(data, offset, 4)?))
}

/// Append `s` to `payload` followed by a null terminator.
pub fn put_string(payload: &mut Vec<u8>, s: &str) {
    payload.extend_from_slice(s.as_bytes());
    payload.push(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_string_advances_past_terminator() {
        let data = b"hello\0world\0";
        let mut offset = 0;
        assert_eq!(get_string(data, &mut offset).unwrap(), "hello");
        assert_eq!(offset, 6);
        assert_eq!(get_string(data, &mut offset).unwrap(), "world");
        assert_eq!(offset, data.len());
    }

    #[test]
    fn test_get_string_empty() {
        let mut offset = 0;
        assert_eq!(get_string(b"\0", &mut offset).unwrap(), "");
        assert_eq!(offset, 1);
    }

    #[test]
    fn test_get_string_unterminated() {
        let mut offset = 0;
        let err = get_string(b"abc", &mut offset).unwrap_err();
        assert!(matches!(err, SourceQueryError::UnexpectedEnd { .. }));
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_integers_are_little_endian() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xFF];
        let mut offset = 0;
        assert_eq!(get_u16(&data, &mut offset).unwrap(), 0x1234);
        assert_eq!(get_u32(&data, &mut offset).unwrap(), 0x12345678);
        assert_eq!(offset, 6);
        assert!(get_u16(&data, &mut offset).is_err());
        assert_eq!(offset, 6);
        assert_eq!(get_i32(&[0xFF, 0xFF, 0xFF, 0xFF], &mut 0).unwrap(), -1);
    }

    #[test]
    fn test_port_is_big_endian() {
        let mut offset = 0;
        assert_eq!(get_u16_be(&[0x69, 0x87], &mut offset).unwrap(), 27015);
    }

    #[test]
    fn test_get_u64_and_f32() {
        let mut data = 0x0110_0001_0000_0001u64.to_le_bytes().to_vec();
        data.extend_from_slice(&1.5f32.to_le_bytes());
        let mut offset = 0;
        assert_eq!(get_u64(&data, &mut offset).unwrap(), 0x0110_0001_0000_0001);
        assert_eq!(get_f32(&data, &mut offset).unwrap(), 1.5);
        assert!(get_u8(&data, &mut offset).is_err());
    }

    #[test]
    fn test_put_string() {
        let mut payload = vec![0x31];
        put_string(&mut payload, "0.0.0.0:0");
        assert_eq!(payload, b"\x310.0.0.0:0\0");
    }
}
