//! tablec-core: schema front end for the entity component table compiler.
//!
//! Pipeline: [`lexer::lex`] produces tokens, [`parser::parse`] walks the
//! grammar and builds the [`Top`] model, [`validate::check_semantics`]
//! checks cross-declaration rules. [`compile_source`] and [`compile_file`]
//! run all of it.

pub mod ast;
pub mod compile;
pub mod cursor;
pub mod error;
pub mod lexer;
pub mod naming;
pub mod parser;
pub mod source;
pub mod validate;

pub use ast::{
    FieldDef, FieldFlags, FieldType, MemberFunction, SizeConstant, TableDef, TableFlags, Top,
    TypeAlias,
};
pub use compile::{compile_file, compile_source, compile_with};
pub use cursor::Cursor;
pub use error::{Diagnostic, Phase};
pub use lexer::{lex, Keyword, Punct, Token, TokenKind};
pub use parser::parse;
pub use source::{FileSystemProvider, InMemoryProvider, SourceProvider};
pub use validate::{check, check_semantics, validate};
