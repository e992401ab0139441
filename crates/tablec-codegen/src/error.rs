use std::path::PathBuf;

/// Error type for code generation operations.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// Two wire keys hash to the same value.
    #[error("wire key collision: {first} and {second} both hash to {key:#018x}; rename one of them or change hash_seed")]
    KeyCollision {
        first: String,
        second: String,
        key: u64,
    },

    /// Two generated items would get the same Rust name.
    #[error("generated name '{name}' is produced by both {first} and {second}")]
    NameClash {
        name: String,
        first: String,
        second: String,
    },

    #[error("'{name}' is reserved in generated code ({context})")]
    ReservedName { name: String, context: String },

    #[error("{owner} declares an array of '{alias}', which is already an array alias")]
    NestedArray { owner: String, alias: String },

    #[error("alias '{0}' refers back to itself")]
    AliasCycle(String),

    #[error("module name '{0}' is not a valid Rust identifier")]
    InvalidModuleName(String),

    #[error("invalid codegen config: {0}")]
    Config(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
