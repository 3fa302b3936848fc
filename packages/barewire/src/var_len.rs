//! Variable-length integer encodings: unsigned LEB128 and zig-zag signed.
//!
//! `uint` is base-128, little-endian: each byte stores 7 value bits, and the
//! high bit set means "another byte follows". `int` is the zig-zag mapping
//! `z = (v << 1) ^ (v >> 63)` applied before encoding as a `uint`, and its
//! inverse applied after decoding one.

use crate::error::{bail, ensure, Result};
use std::io::{Read, Write};

const MORE_BIT: u8 = 0b1000_0000;
const LO_7_BITS: u8 = 0b0111_1111;

/// Maximum LEB128 byte length needed to cover a 64-bit value.
pub const MAX_UINT_LEN: usize = 10;

/// Write a variable-length unsigned integer (LEB128).
pub fn write_var_len_uint<W: Write>(write: &mut W, mut n: u64) -> Result<()> {
    loop {
        let low_bits = (n & LO_7_BITS as u64) as u8;
        n >>= 7;
        let more = n != 0;
        let byte = low_bits | if more { MORE_BIT } else { 0 };
        write.write_all(&[byte])?;
        if !more {
            break;
        }
    }
    Ok(())
}

/// Number of bytes `write_var_len_uint` would write for `n`.
pub fn var_len_uint_len(mut n: u64) -> usize {
    let mut len = 1;
    n >>= 7;
    while n != 0 {
        len += 1;
        n >>= 7;
    }
    len
}

/// Read a variable-length unsigned integer (LEB128). Returns the decoded
/// value and the number of bytes consumed.
///
/// Fails with `Decoding` on *overlong* (more than [`MAX_UINT_LEN`] bytes
/// without a terminator, which cannot represent a valid 64-bit value) or on
/// *truncated* input (the reader runs dry mid-number).
pub fn read_var_len_uint<R: Read>(read: &mut R) -> Result<(u64, usize)> {
    let mut n: u64 = 0;
    let mut shift = 0u32;
    let mut count = 0usize;
    loop {
        ensure!(
            count < MAX_UINT_LEN,
            Decoding,
            "overlong varint: more than {} bytes",
            MAX_UINT_LEN,
        );
        let mut buf = [0u8; 1];
        read.read_exact(&mut buf).map_err(|_| error_truncated())?;
        count += 1;
        let byte = buf[0];
        let low_bits = (byte & LO_7_BITS) as u64;
        if shift < 64 {
            n |= low_bits << shift;
        }
        shift += 7;
        if byte & MORE_BIT == 0 {
            break;
        }
    }
    Ok((n, count))
}

fn error_truncated() -> crate::error::Error {
    crate::error::Error::new(crate::error::ErrorKind::Decoding, "truncated varint")
}

/// Zig-zag encode a signed 64-bit integer into its unsigned carrier.
pub fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// Invert [`zigzag_encode`].
pub fn zigzag_decode(z: u64) -> i64 {
    ((z >> 1) as i64) ^ -((z & 1) as i64)
}

/// Write a variable-length signed integer: zig-zag map, then LEB128.
pub fn write_var_len_sint<W: Write>(write: &mut W, n: i64) -> Result<()> {
    write_var_len_uint(write, zigzag_encode(n))
}

/// Read a variable-length signed integer: LEB128, then invert zig-zag.
pub fn read_var_len_sint<R: Read>(read: &mut R) -> Result<(i64, usize)> {
    let (z, count) = read_var_len_uint(read)?;
    Ok((zigzag_decode(z), count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_uint(n: u64) {
        let mut buf = Vec::new();
        write_var_len_uint(&mut buf, n).unwrap();
        let (n2, consumed) = read_var_len_uint(&mut buf.as_slice()).unwrap();
        assert_eq!(n, n2);
        assert_eq!(consumed, buf.len());
    }

    fn roundtrip_sint(n: i64) {
        let mut buf = Vec::new();
        write_var_len_sint(&mut buf, n).unwrap();
        let (n2, consumed) = read_var_len_sint(&mut buf.as_slice()).unwrap();
        assert_eq!(n, n2);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn test_var_len_uint_small_range() {
        for n in 0..(2u64 << 10) {
            roundtrip_uint(n);
        }
    }

    #[test]
    fn test_var_len_uint_edges() {
        assert_eq!(encode_uint_hex(0), "00");
        assert_eq!(encode_uint_hex(127), "7F");
        assert_eq!(encode_uint_hex(128), "80 01");
        assert_eq!(encode_uint_hex(16384), "80 80 01");
        roundtrip_uint(u64::MAX);
        let mut buf = Vec::new();
        write_var_len_uint(&mut buf, u64::MAX).unwrap();
        assert!(buf.len() <= MAX_UINT_LEN);
    }

    fn encode_uint_hex(n: u64) -> String {
        let mut buf = Vec::new();
        write_var_len_uint(&mut buf, n).unwrap();
        buf.iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_var_len_uint_overlong_rejected() {
        // 10 continuation bytes then a terminator: 11 bytes total, too long
        // for any 64-bit value.
        let mut buf = vec![0xFF; 10];
        buf.push(0x01);
        let err = read_var_len_uint(&mut buf.as_slice()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Decoding);
    }

    #[test]
    fn test_var_len_uint_truncated() {
        let buf = [0xFF, 0xFF];
        let err = read_var_len_uint(&mut &buf[..]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Decoding);
    }

    #[test]
    fn test_var_len_sint_small_range() {
        for n in -(2i64 << 10)..(2i64 << 10) {
            roundtrip_sint(n);
        }
    }

    #[test]
    fn test_var_len_sint_zigzag_table() {
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(2), 4);
        assert_eq!(zigzag_decode(1), -1);
        assert_eq!(zigzag_decode(2), 1);
        assert_eq!(zigzag_decode(3), -2);
    }

    #[test]
    fn test_var_len_sint_extremes() {
        roundtrip_sint(i64::MIN);
        roundtrip_sint(i64::MAX);
    }
}
