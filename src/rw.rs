//! High-level [`RecordReader`]/[`RecordWriter`] facade — the primary
//! embedding surface.
//!
//! ```
//! use recio::{IArchive, OArchive, RecError, RecFormat, Record, RecordReader, RecordWriter};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Job {
//!     id: i32,
//!     name: String,
//! }
//!
//! impl Record for Job {
//!     fn validate(&self) -> bool {
//!         !self.name.is_empty()
//!     }
//!     fn serialize(&self, a: &mut dyn OArchive, tag: &str) -> Result<(), RecError> {
//!         a.start_record(tag)?;
//!         a.write_i32(self.id, "id")?;
//!         a.write_string(&self.name, "name")?;
//!         a.end_record(tag)
//!     }
//!     fn deserialize(&mut self, a: &mut dyn IArchive, tag: &str) -> Result<(), RecError> {
//!         a.start_record(tag)?;
//!         self.id = a.read_i32("id")?;
//!         self.name = a.read_string("name")?;
//!         a.end_record(tag)
//!     }
//!     fn type_name(&self) -> &str {
//!         "demo.Job"
//!     }
//!     fn signature(&self) -> &str {
//!         "LJob(id:i,name:s)"
//!     }
//! }
//!
//! let mut buf = Vec::new();
//! let mut writer = RecordWriter::new(&mut buf, RecFormat::Binary);
//! writer.write(&Job { id: 42, name: "abc".into() })?;
//! writer.close()?;
//!
//! let mut decoded = Job::default();
//! let mut reader = RecordReader::new(buf.as_slice(), RecFormat::Binary);
//! reader.read(&mut decoded)?;
//! assert_eq!(decoded, Job { id: 42, name: "abc".into() });
//! # Ok::<(), recio::RecError>(())
//! ```
//!
//! A facade binds one stream and one [`RecFormat`] for its whole lifetime
//! and performs no batching: each `read`/`write` call drives exactly one
//! complete traversal of one record.  Writers flush on [`close`] and again,
//! best-effort, on drop.
//!
//! Streams are taken by value; pass `&mut stream` to keep ownership at the
//! call site (the blanket transport impls cover mutable references), which
//! also guarantees the stream outlives the facade borrowing it.
//!
//! [`close`]: RecordWriter::close

use crate::archive::{IArchiveKind, OArchive, OArchiveKind, RecFormat};
use crate::error::{RecError, Result};
use crate::record::Record;
use crate::stream::{InStream, OutStream};

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct RecordWriter<W: OutStream> {
    archive: OArchiveKind<W>,
}

impl<W: OutStream> RecordWriter<W> {
    pub fn new(stream: W, format: RecFormat) -> Self {
        Self { archive: OArchiveKind::new(format, stream) }
    }

    pub fn format(&self) -> RecFormat {
        self.archive.format()
    }

    /// Serialize one record: exactly one
    /// `record.serialize(archive, record.type_name())` traversal.
    pub fn write(&mut self, record: &dyn Record) -> Result<()> {
        let tag = record.type_name().to_owned();
        record.serialize(&mut self.archive, &tag)
    }

    /// Like [`write`], but refuse records that fail their own `validate()`.
    ///
    /// [`write`]: RecordWriter::write
    pub fn write_validated(&mut self, record: &dyn Record) -> Result<()> {
        if !record.validate() {
            return Err(RecError::validation(record.type_name()));
        }
        self.write(record)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.archive.flush()
    }

    /// Flush and drop the writer, surfacing any flush error that the
    /// best-effort flush on drop would swallow.
    pub fn close(mut self) -> Result<()> {
        self.archive.flush()
    }
}

impl<W: OutStream> Drop for RecordWriter<W> {
    fn drop(&mut self) {
        let _ = self.archive.flush();
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct RecordReader<R: InStream> {
    archive: IArchiveKind<R>,
}

impl<R: InStream> RecordReader<R> {
    pub fn new(stream: R, format: RecFormat) -> Self {
        Self { archive: IArchiveKind::new(format, stream) }
    }

    pub fn format(&self) -> RecFormat {
        self.archive.format()
    }

    /// Deserialize one record: exactly one
    /// `record.deserialize(archive, record.type_name())` traversal.  On
    /// error the record is partially populated and must be discarded.
    pub fn read(&mut self, record: &mut dyn Record) -> Result<()> {
        let tag = record.type_name().to_owned();
        record.deserialize(&mut self.archive, &tag)
    }
}
