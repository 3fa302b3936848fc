//! Fixed-width primitive codecs: little-endian integers and floats, `bool`,
//! length-prefixed `string`/`data`, and `fixed_data(n)`. Variable-length
//! integer and zig-zag logic lives in [`crate::var_len`].
//!
//! All encoders here take a `&mut impl Write` and advance it; all decoders
//! take a `&mut impl Read` and return `(value, bytes_consumed)` or an error,
//! per the primitive codec's contract.

use crate::error::{ensure, error, Result};
use crate::var_len::{read_var_len_uint, write_var_len_uint};
use std::io::{Read, Write};

macro_rules! le_bytes_primitive {
    ($($write_fn:ident / $read_fn:ident : $ty:ident,)*) => {$(
        pub fn $write_fn<W: Write>(write: &mut W, n: $ty) -> Result<()> {
            write.write_all(&n.to_le_bytes())?;
            Ok(())
        }

        pub fn $read_fn<R: Read>(read: &mut R) -> Result<($ty, usize)> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            read.read_exact(&mut buf)?;
            Ok(($ty::from_le_bytes(buf), buf.len()))
        }
    )*};
}

le_bytes_primitive!(
    write_u8 / read_u8: u8,
    write_u16 / read_u16: u16,
    write_u32 / read_u32: u32,
    write_u64 / read_u64: u64,
    write_i8 / read_i8: i8,
    write_i16 / read_i16: i16,
    write_i32 / read_i32: i32,
    write_i64 / read_i64: i64,
    write_f32 / read_f32: f32,
    write_f64 / read_f64: f64,
);

pub fn write_bool<W: Write>(write: &mut W, b: bool) -> Result<()> {
    write.write_all(&[b as u8])?;
    Ok(())
}

pub fn read_bool<R: Read>(read: &mut R) -> Result<(bool, usize)> {
    let mut buf = [0u8; 1];
    read.read_exact(&mut buf)?;
    match buf[0] {
        0x00 => Ok((false, 1)),
        0x01 => Ok((true, 1)),
        other => Err(error!(
            Decoding,
            "{:#04x} is not a valid bool (must be 0x00 or 0x01)", other
        )),
    }
}

pub fn write_string<W: Write>(write: &mut W, s: &str) -> Result<()> {
    write_var_len_uint(write, s.len() as u64)?;
    write.write_all(s.as_bytes())?;
    Ok(())
}

pub fn read_string<R: Read>(read: &mut R) -> Result<(String, usize)> {
    let (len, len_consumed) = read_var_len_uint(read)?;
    let len = usize_from_u64(len)?;
    let mut buf = vec![0u8; len];
    read.read_exact(&mut buf)?;
    let s = String::from_utf8(buf)
        .map_err(|_| error!(Decoding, "invalid UTF-8 in string"))?;
    Ok((s, len_consumed + len))
}

pub fn write_data<W: Write>(write: &mut W, data: &[u8]) -> Result<()> {
    write_var_len_uint(write, data.len() as u64)?;
    write.write_all(data)?;
    Ok(())
}

pub fn read_data<R: Read>(read: &mut R) -> Result<(Vec<u8>, usize)> {
    let (len, len_consumed) = read_var_len_uint(read)?;
    let len = usize_from_u64(len)?;
    let mut buf = vec![0u8; len];
    read.read_exact(&mut buf)?;
    Ok((buf, len_consumed + len))
}

pub fn write_fixed_data<W: Write>(write: &mut W, n: usize, data: &[u8]) -> Result<()> {
    ensure!(
        data.len() == n,
        Encoding,
        "fixed_data({}) given {} bytes",
        n,
        data.len(),
    );
    write.write_all(data)?;
    Ok(())
}

pub fn read_fixed_data<R: Read>(read: &mut R, n: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = vec![0u8; n];
    read.read_exact(&mut buf)?;
    Ok((buf, n))
}

fn usize_from_u64(n: u64) -> Result<usize> {
    usize::try_from(n).map_err(|_| error!(Decoding, "{} out of range for usize", n))
}
