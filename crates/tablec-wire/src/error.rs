/// Errors raised while writing or reading a save stream.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream does not start with the save-file magic.
    #[error("not a tablec save stream (magic {found:02x?})")]
    BadMagic { found: [u8; 4] },

    #[error("unsupported save format version {found} (this reader understands {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The stream ended in the middle of a structure.
    #[error("unexpected end of data while reading {context}")]
    Truncated { context: &'static str },

    #[error("invalid field tag byte {0:#04x}")]
    InvalidTag(u8),

    /// A known field was written with a different shape than this reader expects.
    #[error("field {key:#018x} has tag {found:#04x}, expected {expected:#04x}")]
    TagMismatch { key: u64, found: u8, expected: u8 },

    #[error("encoded value is {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },

    #[error("string value is not valid UTF-8")]
    InvalidUtf8,

    #[error("blob of {0} bytes exceeds the format limit")]
    BlobTooLarge(usize),

    #[error("entity id {0} exceeds the format limit")]
    EntityIdOutOfRange(u32),

    #[error("{context} count {count} does not fit the format")]
    CountOverflow { count: usize, context: &'static str },
}
