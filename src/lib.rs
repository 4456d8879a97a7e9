pub mod archive;
pub mod error;
pub mod record;
pub mod rw;
pub mod signature;
pub mod stream;

pub use archive::{IArchive, OArchive, RecFormat};
pub use error::{RecError, Result};
pub use record::Record;
pub use rw::{RecordReader, RecordWriter};
pub use signature::{Signature, TypeSig};
pub use stream::{InStream, OutStream};
