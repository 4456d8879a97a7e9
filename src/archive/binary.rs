//! Compact binary back-end.
//!
//! # Wire format
//!
//! All multi-byte layouts are little-endian.  Integers use a
//! continuation-bit varint with two bands:
//!
//! - `0..=127` — one byte, the value itself, high bit clear.
//! - everything else — the value is zigzag-folded
//!   (`(n << 1) ^ (n >> 63)`) and emitted as base-128 groups, low group
//!   first, high bit set on every byte but the last.  A folded value that
//!   fits seven bits is padded with a zero terminator byte so the sequence
//!   is always at least two bytes long.
//!
//! A decoder distinguishes the bands by sequence length: one byte is a
//! literal non-negative value, two or more bytes decode through the zigzag
//! fold.  Sequences longer than ten bytes, or overflowing 64 bits, are
//! malformed.  Small magnitudes of either sign stay small on the wire.
//!
//! Strings and buffers are a varint byte length followed by the raw bytes
//! (UTF-8 for strings).  Floats are fixed-width IEEE-754 bits, 4 or 8
//! bytes.  Booleans and 8-bit integers are single bytes.
//!
//! Structural markers carry no bytes except the element count emitted by
//! `start_vector`/`start_map`; record nesting and field order exist only in
//! the call sequence.  The format is compact but strictly order-dependent
//! and not self-describing: a reader must issue the exact call sequence the
//! writer used.

use byteorder::{ByteOrder, LittleEndian};

use crate::archive::{IArchive, OArchive, RecFormat};
use crate::error::{RecError, Result};
use crate::stream::{read_fully, write_fully, InStream, OutStream};

const MAX_VARINT_LEN: usize = 10;

// ── Varint codec ─────────────────────────────────────────────────────────────

fn zigzag(n: i64) -> u64 {
    ((n as u64) << 1) ^ ((n >> 63) as u64)
}

fn unzigzag(z: u64) -> i64 {
    ((z >> 1) as i64) ^ -((z & 1) as i64)
}

/// Encode `n` into `buf`, returning the number of bytes used.
pub(crate) fn encode_varint(n: i64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    if (0..=127).contains(&n) {
        buf[0] = n as u8;
        return 1;
    }
    let mut z = zigzag(n);
    let mut len = 0;
    while z >= 0x80 {
        buf[len] = (z as u8 & 0x7f) | 0x80;
        z >>= 7;
        len += 1;
    }
    buf[len] = z as u8;
    len += 1;
    if len == 1 {
        // Folded value fits seven bits (only small negatives); pad to two
        // bytes so the single-byte band stays reserved for literals.
        buf[1] = 0;
        buf[0] |= 0x80;
        len = 2;
    }
    len
}

pub(crate) fn write_varint<S: OutStream>(stream: &mut S, n: i64) -> Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_varint(n, &mut buf);
    write_fully(stream, &buf[..len])
}

pub(crate) fn read_varint<S: InStream>(stream: &mut S) -> Result<i64> {
    let mut z: u64 = 0;
    let mut shift = 0u32;
    let mut count = 0usize;
    loop {
        let b = read_u8(stream)?;
        count += 1;
        if count > MAX_VARINT_LEN {
            return Err(RecError::format(RecFormat::Binary, "varint longer than 10 bytes"));
        }
        if count == MAX_VARINT_LEN && b & 0x7f > 0x01 {
            return Err(RecError::format(RecFormat::Binary, "varint overflows 64 bits"));
        }
        z |= ((b & 0x7f) as u64) << shift;
        if b & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    if count == 1 {
        Ok(z as i64)
    } else {
        Ok(unzigzag(z))
    }
}

fn read_u8<S: InStream>(stream: &mut S) -> Result<u8> {
    let mut b = [0u8; 1];
    read_fully(stream, &mut b)?;
    Ok(b[0])
}

fn read_len<S: InStream>(stream: &mut S, what: &str) -> Result<usize> {
    let n = read_varint(stream)?;
    usize::try_from(n)
        .map_err(|_| RecError::format(RecFormat::Binary, format!("invalid {what} length {n}")))
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct BinaryOArchive<W: OutStream> {
    stream: W,
}

impl<W: OutStream> BinaryOArchive<W> {
    pub fn new(stream: W) -> Self {
        Self { stream }
    }
}

impl<W: OutStream> OArchive for BinaryOArchive<W> {
    fn write_bool(&mut self, v: bool, _tag: &str) -> Result<()> {
        write_fully(&mut self.stream, &[v as u8])
    }

    fn write_i8(&mut self, v: i8, _tag: &str) -> Result<()> {
        write_fully(&mut self.stream, &[v as u8])
    }

    fn write_i32(&mut self, v: i32, _tag: &str) -> Result<()> {
        write_varint(&mut self.stream, v as i64)
    }

    fn write_i64(&mut self, v: i64, _tag: &str) -> Result<()> {
        write_varint(&mut self.stream, v)
    }

    fn write_f32(&mut self, v: f32, _tag: &str) -> Result<()> {
        let mut buf = [0u8; 4];
        LittleEndian::write_f32(&mut buf, v);
        write_fully(&mut self.stream, &buf)
    }

    fn write_f64(&mut self, v: f64, _tag: &str) -> Result<()> {
        let mut buf = [0u8; 8];
        LittleEndian::write_f64(&mut buf, v);
        write_fully(&mut self.stream, &buf)
    }

    fn write_string(&mut self, v: &str, _tag: &str) -> Result<()> {
        write_varint(&mut self.stream, v.len() as i64)?;
        write_fully(&mut self.stream, v.as_bytes())
    }

    fn write_buffer(&mut self, v: &[u8], _tag: &str) -> Result<()> {
        write_varint(&mut self.stream, v.len() as i64)?;
        write_fully(&mut self.stream, v)
    }

    fn start_record(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn end_record(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn start_vector(&mut self, len: usize, _tag: &str) -> Result<()> {
        write_varint(&mut self.stream, len as i64)
    }

    fn end_vector(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn start_map(&mut self, len: usize, _tag: &str) -> Result<()> {
        write_varint(&mut self.stream, len as i64)
    }

    fn end_map(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.stream.flush()
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct BinaryIArchive<R: InStream> {
    stream: R,
}

impl<R: InStream> BinaryIArchive<R> {
    pub fn new(stream: R) -> Self {
        Self { stream }
    }
}

impl<R: InStream> IArchive for BinaryIArchive<R> {
    fn read_bool(&mut self, _tag: &str) -> Result<bool> {
        match read_u8(&mut self.stream)? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(RecError::format(RecFormat::Binary, format!("invalid boolean byte {b:#04x}"))),
        }
    }

    fn read_i8(&mut self, _tag: &str) -> Result<i8> {
        Ok(read_u8(&mut self.stream)? as i8)
    }

    fn read_i32(&mut self, _tag: &str) -> Result<i32> {
        let n = read_varint(&mut self.stream)?;
        i32::try_from(n)
            .map_err(|_| RecError::format(RecFormat::Binary, format!("value {n} outside i32 range")))
    }

    fn read_i64(&mut self, _tag: &str) -> Result<i64> {
        read_varint(&mut self.stream)
    }

    fn read_f32(&mut self, _tag: &str) -> Result<f32> {
        let mut buf = [0u8; 4];
        read_fully(&mut self.stream, &mut buf)?;
        Ok(LittleEndian::read_f32(&buf))
    }

    fn read_f64(&mut self, _tag: &str) -> Result<f64> {
        let mut buf = [0u8; 8];
        read_fully(&mut self.stream, &mut buf)?;
        Ok(LittleEndian::read_f64(&buf))
    }

    fn read_string(&mut self, _tag: &str) -> Result<String> {
        let len = read_len(&mut self.stream, "string")?;
        let mut bytes = vec![0u8; len];
        read_fully(&mut self.stream, &mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|e| RecError::format(RecFormat::Binary, format!("string is not UTF-8: {e}")))
    }

    fn read_buffer(&mut self, _tag: &str) -> Result<Vec<u8>> {
        let len = read_len(&mut self.stream, "buffer")?;
        let mut bytes = vec![0u8; len];
        read_fully(&mut self.stream, &mut bytes)?;
        Ok(bytes)
    }

    fn start_record(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn end_record(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn start_vector(&mut self, _tag: &str) -> Result<usize> {
        read_len(&mut self.stream, "vector")
    }

    fn end_vector(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn start_map(&mut self, _tag: &str) -> Result<usize> {
        read_len(&mut self.stream, "map")
    }

    fn end_map(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }
}
