//! Hand-expanded stand-ins for schema-generated record types, shared by the
//! integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use recio::{
    IArchive, OArchive, RecError, RecFormat, Record, RecordReader, RecordWriter, Signature,
    TypeSig,
};

// ── test.IdName ──────────────────────────────────────────────────────────────

static ID_NAME_SIG: Lazy<Signature> = Lazy::new(|| {
    Signature::record("IdName", &[("id", TypeSig::Int32), ("name", TypeSig::String)])
});

/// The two-field record of the end-to-end scenario: `{id, name}`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IdName {
    pub id: i32,
    pub name: String,
}

impl Record for IdName {
    fn validate(&self) -> bool {
        !self.name.is_empty()
    }

    fn serialize(&self, a: &mut dyn OArchive, tag: &str) -> Result<(), RecError> {
        a.start_record(tag)?;
        a.write_i32(self.id, "id")?;
        a.write_string(&self.name, "name")?;
        a.end_record(tag)
    }

    fn deserialize(&mut self, a: &mut dyn IArchive, tag: &str) -> Result<(), RecError> {
        a.start_record(tag)?;
        self.id = a.read_i32("id")?;
        self.name = a.read_string("name")?;
        a.end_record(tag)
    }

    fn type_name(&self) -> &str {
        "test.IdName"
    }

    fn signature(&self) -> &str {
        ID_NAME_SIG.canonical()
    }
}

// ── test.Primitives ──────────────────────────────────────────────────────────

static PRIMITIVES_SIG: Lazy<Signature> = Lazy::new(|| {
    Signature::record(
        "Primitives",
        &[
            ("flag", TypeSig::Bool),
            ("tiny", TypeSig::Int8),
            ("medium", TypeSig::Int32),
            ("large", TypeSig::Int64),
            ("ratio", TypeSig::Float32),
            ("measure", TypeSig::Float64),
            ("text", TypeSig::String),
            ("blob", TypeSig::Buffer),
        ],
    )
});

/// One field of every primitive kind; flat, so it round-trips in all three
/// formats including CSV.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Primitives {
    pub flag: bool,
    pub tiny: i8,
    pub medium: i32,
    pub large: i64,
    pub ratio: f32,
    pub measure: f64,
    pub text: String,
    pub blob: Vec<u8>,
}

impl Record for Primitives {
    fn validate(&self) -> bool {
        true
    }

    fn serialize(&self, a: &mut dyn OArchive, tag: &str) -> Result<(), RecError> {
        a.start_record(tag)?;
        a.write_bool(self.flag, "flag")?;
        a.write_i8(self.tiny, "tiny")?;
        a.write_i32(self.medium, "medium")?;
        a.write_i64(self.large, "large")?;
        a.write_f32(self.ratio, "ratio")?;
        a.write_f64(self.measure, "measure")?;
        a.write_string(&self.text, "text")?;
        a.write_buffer(&self.blob, "blob")?;
        a.end_record(tag)
    }

    fn deserialize(&mut self, a: &mut dyn IArchive, tag: &str) -> Result<(), RecError> {
        a.start_record(tag)?;
        self.flag = a.read_bool("flag")?;
        self.tiny = a.read_i8("tiny")?;
        self.medium = a.read_i32("medium")?;
        self.large = a.read_i64("large")?;
        self.ratio = a.read_f32("ratio")?;
        self.measure = a.read_f64("measure")?;
        self.text = a.read_string("text")?;
        self.blob = a.read_buffer("blob")?;
        a.end_record(tag)
    }

    fn type_name(&self) -> &str {
        "test.Primitives"
    }

    fn signature(&self) -> &str {
        PRIMITIVES_SIG.canonical()
    }
}

// ── test.Point ───────────────────────────────────────────────────────────────

static POINT_SIG: Lazy<Signature> = Lazy::new(|| {
    Signature::record("Point", &[("x", TypeSig::Float64), ("y", TypeSig::Float64)])
});

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Record for Point {
    fn validate(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn serialize(&self, a: &mut dyn OArchive, tag: &str) -> Result<(), RecError> {
        a.start_record(tag)?;
        a.write_f64(self.x, "x")?;
        a.write_f64(self.y, "y")?;
        a.end_record(tag)
    }

    fn deserialize(&mut self, a: &mut dyn IArchive, tag: &str) -> Result<(), RecError> {
        a.start_record(tag)?;
        self.x = a.read_f64("x")?;
        self.y = a.read_f64("y")?;
        a.end_record(tag)
    }

    fn type_name(&self) -> &str {
        "test.Point"
    }

    fn signature(&self) -> &str {
        POINT_SIG.canonical()
    }
}

// ── test.Sample ──────────────────────────────────────────────────────────────

static SAMPLE_SIG: Lazy<Signature> = Lazy::new(|| {
    Signature::record(
        "Sample",
        &[
            ("seq", TypeSig::Int64),
            ("origin", TypeSig::nested(&POINT_SIG)),
            ("path", TypeSig::vector(TypeSig::nested(&POINT_SIG))),
            ("readings", TypeSig::vector(TypeSig::Int32)),
            ("labels", TypeSig::map(TypeSig::String, TypeSig::String)),
        ],
    )
});

/// Nested record, vector of records, vector of scalars and a map — the
/// structural round-trip workout for the binary and XML formats.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sample {
    pub seq: i64,
    pub origin: Point,
    pub path: Vec<Point>,
    pub readings: Vec<i32>,
    pub labels: BTreeMap<String, String>,
}

impl Record for Sample {
    fn validate(&self) -> bool {
        self.seq >= 0
    }

    fn serialize(&self, a: &mut dyn OArchive, tag: &str) -> Result<(), RecError> {
        a.start_record(tag)?;
        a.write_i64(self.seq, "seq")?;
        self.origin.serialize(a, "origin")?;
        a.start_vector(self.path.len(), "path")?;
        for p in &self.path {
            p.serialize(a, "item")?;
        }
        a.end_vector("path")?;
        a.start_vector(self.readings.len(), "readings")?;
        for v in &self.readings {
            a.write_i32(*v, "item")?;
        }
        a.end_vector("readings")?;
        a.start_map(self.labels.len(), "labels")?;
        for (k, v) in &self.labels {
            a.write_string(k, "key")?;
            a.write_string(v, "value")?;
        }
        a.end_map("labels")?;
        a.end_record(tag)
    }

    fn deserialize(&mut self, a: &mut dyn IArchive, tag: &str) -> Result<(), RecError> {
        a.start_record(tag)?;
        self.seq = a.read_i64("seq")?;
        self.origin.deserialize(a, "origin")?;
        let n = a.start_vector("path")?;
        self.path.clear();
        for _ in 0..n {
            let mut p = Point::default();
            p.deserialize(a, "item")?;
            self.path.push(p);
        }
        a.end_vector("path")?;
        let n = a.start_vector("readings")?;
        self.readings.clear();
        for _ in 0..n {
            self.readings.push(a.read_i32("item")?);
        }
        a.end_vector("readings")?;
        let n = a.start_map("labels")?;
        self.labels.clear();
        for _ in 0..n {
            let k = a.read_string("key")?;
            let v = a.read_string("value")?;
            self.labels.insert(k, v);
        }
        a.end_map("labels")?;
        a.end_record(tag)
    }

    fn type_name(&self) -> &str {
        "test.Sample"
    }

    fn signature(&self) -> &str {
        SAMPLE_SIG.canonical()
    }
}

// ── test.Sparse ──────────────────────────────────────────────────────────────

static SPARSE_SIG: Lazy<Signature> = Lazy::new(|| {
    Signature::record(
        "Sparse",
        &[
            ("id", TypeSig::Int32),
            ("name", TypeSig::String),
            ("extras", TypeSig::vector(TypeSig::String)),
        ],
    )
});

/// Fixed scalar prefix with a trailing variable-shape vector; the shape CSV
/// can carry but cannot disambiguate.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sparse {
    pub id: i32,
    pub name: String,
    pub extras: Vec<String>,
}

impl Record for Sparse {
    fn validate(&self) -> bool {
        self.id >= 0
    }

    fn serialize(&self, a: &mut dyn OArchive, tag: &str) -> Result<(), RecError> {
        a.start_record(tag)?;
        a.write_i32(self.id, "id")?;
        a.write_string(&self.name, "name")?;
        a.start_vector(self.extras.len(), "extras")?;
        for e in &self.extras {
            a.write_string(e, "item")?;
        }
        a.end_vector("extras")?;
        a.end_record(tag)
    }

    fn deserialize(&mut self, a: &mut dyn IArchive, tag: &str) -> Result<(), RecError> {
        a.start_record(tag)?;
        self.id = a.read_i32("id")?;
        self.name = a.read_string("name")?;
        let n = a.start_vector("extras")?;
        self.extras.clear();
        for _ in 0..n {
            self.extras.push(a.read_string("item")?);
        }
        a.end_vector("extras")?;
        a.end_record(tag)
    }

    fn type_name(&self) -> &str {
        "test.Sparse"
    }

    fn signature(&self) -> &str {
        SPARSE_SIG.canonical()
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Serialize `value` into a fresh buffer with the given format.
pub fn encode<T: Record>(value: &T, format: RecFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut writer = RecordWriter::new(&mut buf, format);
    writer.write(value).expect("write failed");
    writer.close().expect("close failed");
    buf
}

/// Deserialize one record of type `T` from `bytes`.
pub fn decode<T: Record + Default>(bytes: &[u8], format: RecFormat) -> T {
    let mut out = T::default();
    let mut reader = RecordReader::new(bytes, format);
    reader.read(&mut out).expect("read failed");
    out
}

/// Write then read back through the given format.
pub fn roundtrip<T: Record + Default>(value: &T, format: RecFormat) -> T {
    decode(&encode(value, format), format)
}
