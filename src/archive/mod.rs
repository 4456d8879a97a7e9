//! The archive protocol — one tagged encode/decode interface, three wire
//! formats behind it.
//!
//! # Protocol rules
//!
//! An archive is a stateful cursor bound to exactly one stream and one
//! format.  Records drive it through a uniform set of tagged operations:
//! one typed write (or read) per primitive field, plus structural markers
//! for record, vector and map boundaries.  The call sequences for writing
//! and reading the same record MUST match tag-for-tag and order-for-order;
//! a mismatched sequence is a caller error and surfaces as
//! [`RecError::Format`](crate::RecError) at the earliest operation that can
//! detect it.
//!
//! # Format back-ends
//!
//! | Format | Self-describing | Order-sensitive | Notes |
//! |--------|-----------------|-----------------|-------|
//! | [`Binary`](binary) | no | yes | zigzag varints, length-prefixed bytes, markers cost nothing |
//! | [`Xml`](xml) | yes | no (by tag) | tolerant of field reordering, not renaming |
//! | [`Csv`](csv) | no | yes | one line per record, flattened, no structural markers |
//!
//! Tags are interpreted per format: binary ignores them entirely, XML turns
//! them into element names and attributes, CSV ignores them but relies on
//! the declared field order they accompany.
//!
//! # Variant selection
//!
//! [`OArchiveKind`] and [`IArchiveKind`] are tagged-variant factories: a
//! [`RecFormat`] picked at construction selects the concrete back-end, and
//! the enum delegates every operation, so callers hand records a
//! `&mut dyn OArchive` without any runtime type inspection.

use std::fmt;

use crate::error::Result;
use crate::stream::{InStream, OutStream};

pub mod binary;
pub mod csv;
pub mod xml;

pub use binary::{BinaryIArchive, BinaryOArchive};
pub use csv::{CsvIArchive, CsvOArchive};
pub use xml::{XmlIArchive, XmlOArchive};

// ── RecFormat ────────────────────────────────────────────────────────────────

/// Wire format selector, fixed for the lifetime of a reader or writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecFormat {
    Binary,
    Xml,
    Csv,
}

impl RecFormat {
    /// Human-readable name (diagnostics and configuration, never wire data).
    pub fn name(self) -> &'static str {
        match self {
            RecFormat::Binary => "binary",
            RecFormat::Xml    => "xml",
            RecFormat::Csv    => "csv",
        }
    }

    /// Parse a configuration string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "binary" => Some(RecFormat::Binary),
            "xml"    => Some(RecFormat::Xml),
            "csv"    => Some(RecFormat::Csv),
            _        => None,
        }
    }
}

impl fmt::Display for RecFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Output protocol ──────────────────────────────────────────────────────────

/// Tagged encode protocol.  One implementation per wire format.
///
/// Structural markers frame the traversal: `start_record`/`end_record`
/// bracket a record's fields, `start_vector`/`start_map` announce the
/// element count up front so order-dependent formats can encode it.
pub trait OArchive {
    fn write_bool(&mut self, v: bool, tag: &str) -> Result<()>;
    fn write_i8(&mut self, v: i8, tag: &str) -> Result<()>;
    fn write_i32(&mut self, v: i32, tag: &str) -> Result<()>;
    fn write_i64(&mut self, v: i64, tag: &str) -> Result<()>;
    fn write_f32(&mut self, v: f32, tag: &str) -> Result<()>;
    fn write_f64(&mut self, v: f64, tag: &str) -> Result<()>;
    fn write_string(&mut self, v: &str, tag: &str) -> Result<()>;
    fn write_buffer(&mut self, v: &[u8], tag: &str) -> Result<()>;

    fn start_record(&mut self, tag: &str) -> Result<()>;
    fn end_record(&mut self, tag: &str) -> Result<()>;
    fn start_vector(&mut self, len: usize, tag: &str) -> Result<()>;
    fn end_vector(&mut self, tag: &str) -> Result<()>;
    fn start_map(&mut self, len: usize, tag: &str) -> Result<()>;
    fn end_map(&mut self, tag: &str) -> Result<()>;

    /// Push any transient state through to the underlying stream.
    fn flush(&mut self) -> Result<()>;
}

// ── Input protocol ───────────────────────────────────────────────────────────

/// Tagged decode protocol, mirroring [`OArchive`].
///
/// `start_vector` and `start_map` return the element (or pair) count the
/// caller must consume before the matching `end_*`.
pub trait IArchive {
    fn read_bool(&mut self, tag: &str) -> Result<bool>;
    fn read_i8(&mut self, tag: &str) -> Result<i8>;
    fn read_i32(&mut self, tag: &str) -> Result<i32>;
    fn read_i64(&mut self, tag: &str) -> Result<i64>;
    fn read_f32(&mut self, tag: &str) -> Result<f32>;
    fn read_f64(&mut self, tag: &str) -> Result<f64>;
    fn read_string(&mut self, tag: &str) -> Result<String>;
    fn read_buffer(&mut self, tag: &str) -> Result<Vec<u8>>;

    fn start_record(&mut self, tag: &str) -> Result<()>;
    fn end_record(&mut self, tag: &str) -> Result<()>;
    fn start_vector(&mut self, tag: &str) -> Result<usize>;
    fn end_vector(&mut self, tag: &str) -> Result<()>;
    fn start_map(&mut self, tag: &str) -> Result<usize>;
    fn end_map(&mut self, tag: &str) -> Result<()>;
}

// ── Tagged-variant factories ─────────────────────────────────────────────────

/// Concrete output archive selected by a [`RecFormat`].
pub enum OArchiveKind<W: OutStream> {
    Binary(BinaryOArchive<W>),
    Xml(XmlOArchive<W>),
    Csv(CsvOArchive<W>),
}

impl<W: OutStream> OArchiveKind<W> {
    pub fn new(format: RecFormat, stream: W) -> Self {
        match format {
            RecFormat::Binary => OArchiveKind::Binary(BinaryOArchive::new(stream)),
            RecFormat::Xml    => OArchiveKind::Xml(XmlOArchive::new(stream)),
            RecFormat::Csv    => OArchiveKind::Csv(CsvOArchive::new(stream)),
        }
    }

    pub fn format(&self) -> RecFormat {
        match self {
            OArchiveKind::Binary(_) => RecFormat::Binary,
            OArchiveKind::Xml(_)    => RecFormat::Xml,
            OArchiveKind::Csv(_)    => RecFormat::Csv,
        }
    }
}

macro_rules! delegate_o {
    ($self:ident, $a:ident, $body:expr) => {
        match $self {
            OArchiveKind::Binary($a) => $body,
            OArchiveKind::Xml($a)    => $body,
            OArchiveKind::Csv($a)    => $body,
        }
    };
}

impl<W: OutStream> OArchive for OArchiveKind<W> {
    fn write_bool(&mut self, v: bool, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.write_bool(v, tag))
    }
    fn write_i8(&mut self, v: i8, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.write_i8(v, tag))
    }
    fn write_i32(&mut self, v: i32, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.write_i32(v, tag))
    }
    fn write_i64(&mut self, v: i64, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.write_i64(v, tag))
    }
    fn write_f32(&mut self, v: f32, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.write_f32(v, tag))
    }
    fn write_f64(&mut self, v: f64, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.write_f64(v, tag))
    }
    fn write_string(&mut self, v: &str, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.write_string(v, tag))
    }
    fn write_buffer(&mut self, v: &[u8], tag: &str) -> Result<()> {
        delegate_o!(self, a, a.write_buffer(v, tag))
    }
    fn start_record(&mut self, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.start_record(tag))
    }
    fn end_record(&mut self, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.end_record(tag))
    }
    fn start_vector(&mut self, len: usize, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.start_vector(len, tag))
    }
    fn end_vector(&mut self, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.end_vector(tag))
    }
    fn start_map(&mut self, len: usize, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.start_map(len, tag))
    }
    fn end_map(&mut self, tag: &str) -> Result<()> {
        delegate_o!(self, a, a.end_map(tag))
    }
    fn flush(&mut self) -> Result<()> {
        delegate_o!(self, a, a.flush())
    }
}

/// Concrete input archive selected by a [`RecFormat`].
pub enum IArchiveKind<R: InStream> {
    Binary(BinaryIArchive<R>),
    Xml(XmlIArchive<R>),
    Csv(CsvIArchive<R>),
}

impl<R: InStream> IArchiveKind<R> {
    pub fn new(format: RecFormat, stream: R) -> Self {
        match format {
            RecFormat::Binary => IArchiveKind::Binary(BinaryIArchive::new(stream)),
            RecFormat::Xml    => IArchiveKind::Xml(XmlIArchive::new(stream)),
            RecFormat::Csv    => IArchiveKind::Csv(CsvIArchive::new(stream)),
        }
    }

    pub fn format(&self) -> RecFormat {
        match self {
            IArchiveKind::Binary(_) => RecFormat::Binary,
            IArchiveKind::Xml(_)    => RecFormat::Xml,
            IArchiveKind::Csv(_)    => RecFormat::Csv,
        }
    }
}

macro_rules! delegate_i {
    ($self:ident, $a:ident, $body:expr) => {
        match $self {
            IArchiveKind::Binary($a) => $body,
            IArchiveKind::Xml($a)    => $body,
            IArchiveKind::Csv($a)    => $body,
        }
    };
}

impl<R: InStream> IArchive for IArchiveKind<R> {
    fn read_bool(&mut self, tag: &str) -> Result<bool> {
        delegate_i!(self, a, a.read_bool(tag))
    }
    fn read_i8(&mut self, tag: &str) -> Result<i8> {
        delegate_i!(self, a, a.read_i8(tag))
    }
    fn read_i32(&mut self, tag: &str) -> Result<i32> {
        delegate_i!(self, a, a.read_i32(tag))
    }
    fn read_i64(&mut self, tag: &str) -> Result<i64> {
        delegate_i!(self, a, a.read_i64(tag))
    }
    fn read_f32(&mut self, tag: &str) -> Result<f32> {
        delegate_i!(self, a, a.read_f32(tag))
    }
    fn read_f64(&mut self, tag: &str) -> Result<f64> {
        delegate_i!(self, a, a.read_f64(tag))
    }
    fn read_string(&mut self, tag: &str) -> Result<String> {
        delegate_i!(self, a, a.read_string(tag))
    }
    fn read_buffer(&mut self, tag: &str) -> Result<Vec<u8>> {
        delegate_i!(self, a, a.read_buffer(tag))
    }
    fn start_record(&mut self, tag: &str) -> Result<()> {
        delegate_i!(self, a, a.start_record(tag))
    }
    fn end_record(&mut self, tag: &str) -> Result<()> {
        delegate_i!(self, a, a.end_record(tag))
    }
    fn start_vector(&mut self, tag: &str) -> Result<usize> {
        delegate_i!(self, a, a.start_vector(tag))
    }
    fn end_vector(&mut self, tag: &str) -> Result<()> {
        delegate_i!(self, a, a.end_vector(tag))
    }
    fn start_map(&mut self, tag: &str) -> Result<usize> {
        delegate_i!(self, a, a.start_map(tag))
    }
    fn end_map(&mut self, tag: &str) -> Result<()> {
        delegate_i!(self, a, a.end_map(tag))
    }
}
