//! The contract every serializable record type implements.
//!
//! Concrete record types are produced by an external schema/code-generation
//! step; this crate only defines and consumes the contract.  A generated
//! `serialize` brackets its fields with `start_record`/`end_record` and
//! emits one typed write (or nested `serialize`) per field in the type's
//! fixed declared order; `deserialize` mirrors it call-for-call.  The
//! archive owns nothing: records are constructed and kept by the caller.

use crate::archive::{IArchive, OArchive};
use crate::error::Result;

pub trait Record {
    /// Pure structural check, no I/O.  True iff this instance satisfies
    /// every invariant of its type.
    fn validate(&self) -> bool;

    /// Emit this record through `archive` under `tag`: `start_record`, one
    /// write per field in declared order, `end_record`.
    fn serialize(&self, archive: &mut dyn OArchive, tag: &str) -> Result<()>;

    /// Populate this record from `archive`, mirroring [`serialize`]
    /// tag-for-tag and order-for-order.  On failure the instance is left
    /// partially populated and must be discarded by the caller; there is no
    /// rollback.
    ///
    /// [`serialize`]: Record::serialize
    fn deserialize(&mut self, archive: &mut dyn IArchive, tag: &str) -> Result<()>;

    /// Stable namespace-qualified type name, independent of instance state.
    fn type_name(&self) -> &str;

    /// Canonical layout signature, independent of instance state.  Two
    /// instances of one concrete type always agree; structurally different
    /// types differ.  See [`Signature`](crate::signature::Signature).
    fn signature(&self) -> &str;
}
