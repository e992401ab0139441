//! tablec-codegen: turns a checked schema into Rust source.
//!
//! Two artifacts come out of [`generate`]: the declarations module (entity
//! and component records, the closed component and interface enums and the
//! `Storage` container) and a codec module with `save`/`load` functions built
//! on `tablec-wire`.

pub mod codec;
pub mod config;
pub mod declarations;
pub mod error;
pub mod generate;
pub mod schema;
pub mod types;

pub use codec::emit_codec;
pub use config::CodegenConfig;
pub use declarations::emit_declarations;
pub use error::CodegenError;
pub use generate::{generate, render, GeneratedFiles, Rendered};
pub use schema::CodegenSchema;
