//! Structural type identity.
//!
//! A [`Signature`] is the durable identity of a record layout: a canonical
//! string over the field names and types of a concrete record type, in
//! declared order, plus a CRC-32 fingerprint of that string for compact
//! comparison.  It is solely a function of the layout — two instances of
//! the same type always report the same signature, and field values never
//! enter it.  Comparing signatures (or fingerprints) is the structural
//! compatibility check between a producer and a consumer of the same
//! record stream; anything beyond that comparison, such as schema
//! migration, is out of scope.
//!
//! # Canonical grammar
//!
//! ```text
//! record   = "L" name "(" field ("," field)* ")"   |  "L" name "()"
//! field    = name ":" type
//! type     = "z" | "b" | "i" | "l" | "f" | "d" | "s" | "B"
//!          | "[" type "]"                  vector of element type
//!          | "{" type " " type "}"         map of key and value types
//!          | record                        nested record, inlined
//! ```
//!
//! The single-letter codes are boolean, int8, int32, int64, float32,
//! float64, string and buffer respectively.  Nested records inline their
//! full canonical form, so structural changes anywhere in the tree change
//! every enclosing signature.

use std::fmt::Write as _;

/// Field type descriptor used to declare a record layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSig {
    Bool,
    Int8,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Buffer,
    Vector(Box<TypeSig>),
    Map(Box<TypeSig>, Box<TypeSig>),
    /// A nested record, carried as its full canonical form.
    Record(std::string::String),
}

impl TypeSig {
    pub fn vector(elem: TypeSig) -> TypeSig {
        TypeSig::Vector(Box::new(elem))
    }

    pub fn map(key: TypeSig, value: TypeSig) -> TypeSig {
        TypeSig::Map(Box::new(key), Box::new(value))
    }

    /// Descriptor for a field holding another record.
    pub fn nested(sig: &Signature) -> TypeSig {
        TypeSig::Record(sig.canonical().to_owned())
    }

    fn emit(&self, out: &mut std::string::String) {
        match self {
            TypeSig::Bool    => out.push('z'),
            TypeSig::Int8    => out.push('b'),
            TypeSig::Int32   => out.push('i'),
            TypeSig::Int64   => out.push('l'),
            TypeSig::Float32 => out.push('f'),
            TypeSig::Float64 => out.push('d'),
            TypeSig::String  => out.push('s'),
            TypeSig::Buffer  => out.push('B'),
            TypeSig::Vector(elem) => {
                out.push('[');
                elem.emit(out);
                out.push(']');
            }
            TypeSig::Map(key, value) => {
                out.push('{');
                key.emit(out);
                out.push(' ');
                value.emit(out);
                out.push('}');
            }
            TypeSig::Record(canon) => out.push_str(canon),
        }
    }
}

/// Canonical layout signature of one concrete record type.
///
/// Built once per type (generated code holds it in a static) from the
/// type's unqualified name and its declared fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    canonical: String,
    fingerprint: u32,
}

impl Signature {
    pub fn record(name: &str, fields: &[(&str, TypeSig)]) -> Signature {
        let mut canonical = String::with_capacity(name.len() + fields.len() * 8 + 3);
        let _ = write!(canonical, "L{name}(");
        for (i, (field_name, ty)) in fields.iter().enumerate() {
            if i > 0 {
                canonical.push(',');
            }
            canonical.push_str(field_name);
            canonical.push(':');
            ty.emit(&mut canonical);
        }
        canonical.push(')');
        let fingerprint = crc32fast::hash(canonical.as_bytes());
        Signature { canonical, fingerprint }
    }

    /// The canonical layout string; what [`Record::signature`] returns.
    ///
    /// [`Record::signature`]: crate::Record::signature
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// CRC-32 of the canonical string — the compact form for wire-level or
    /// logged compatibility checks.
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }
}
