//! tablec-wire: runtime for tablec-generated save/load codecs.
//!
//! Stream layout, all integers little-endian:
//!
//! ```text
//! header   := MAGIC u32:version
//! entities := u32:count (u32:id value*)*
//! chunk    := u64:table_key u32:entries (u32:id u16:fields field*)*
//! field    := u64:field_key u8:tag payload
//! ```
//!
//! Chunks repeat until the end of the stream. See [`value`] for the tag and
//! payload encoding that lets readers skip what they do not know.

pub mod error;
pub mod hash;
pub mod reader;
pub mod value;
pub mod writer;

pub use error::WireError;
pub use hash::{key_of, DEFAULT_SEED};
pub use reader::{ChunkHeader, EntryHeader, FieldHeader, Reader};
pub use value::{FieldTag, WireKind, WireValue};
pub use writer::Writer;

pub const MAGIC: [u8; 4] = *b"TBLC";
pub const FORMAT_VERSION: u32 = 1;
/// Upper bound on a single blob, guarding reads of corrupt streams.
pub const MAX_BLOB_LEN: u32 = 64 * 1024 * 1024;
/// Highest entity id a stream may carry. Ids are slot indexes, so this also
/// bounds the slot list a load can be made to allocate.
pub const MAX_ENTITY_ID: u32 = (1 << 22) - 1;
