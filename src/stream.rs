//! Byte transport contract consumed by the archive layer.
//!
//! [`InStream`] and [`OutStream`] are the only interface between an archive
//! and the outside world: a blocking, byte-oriented read/write pair.  Blanket
//! impls adapt every [`std::io::Read`] / [`std::io::Write`], so files,
//! sockets, `Vec<u8>`, cursors and `&mut` references to any of them all
//! qualify without adapter types.
//!
//! # Transfer contract
//!
//! The archive layer issues exactly one transport call per request and maps
//! any count short of the request to [`RecError::Io`].  It never retries,
//! buffers, or times out; a transport that can legitimately transfer fewer
//! bytes than asked (a raw nonblocking socket, for instance) must be wrapped
//! in a full-transfer adapter by the caller.  Blocking behavior lives
//! entirely in the transport: a stalled `read` stalls the whole record
//! traversal, and cancellation — if needed — must be built into the stream.

use std::io;

use crate::error::{RecError, Result};

/// Blocking byte source.  Returns the number of bytes placed in `buf`.
pub trait InStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Blocking byte sink.  Returns the number of bytes consumed from `buf`.
pub trait OutStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize>;
    fn flush(&mut self) -> Result<()>;
}

impl<R: io::Read> InStream for R {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        io::Read::read(self, buf).map_err(RecError::from)
    }
}

impl<W: io::Write> OutStream for W {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        io::Write::write(self, buf).map_err(RecError::from)
    }

    fn flush(&mut self) -> Result<()> {
        io::Write::flush(self).map_err(RecError::from)
    }
}

/// Fill `buf` with a single transport call.  A short count is an I/O error,
/// never a retry.
pub(crate) fn read_fully<S: InStream>(stream: &mut S, buf: &mut [u8]) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    let n = stream.read(buf)?;
    if n != buf.len() {
        return Err(RecError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("short read: {n} of {} bytes", buf.len()),
        )));
    }
    Ok(())
}

/// Drain `buf` with a single transport call.  A short count is an I/O error.
pub(crate) fn write_fully<S: OutStream>(stream: &mut S, buf: &[u8]) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    let n = stream.write(buf)?;
    if n != buf.len() {
        return Err(RecError::Io(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short write: {n} of {} bytes", buf.len()),
        )));
    }
    Ok(())
}
