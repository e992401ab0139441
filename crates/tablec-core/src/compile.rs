//! Front-end orchestrator: source -> tokens -> grammar -> semantic checks.

use crate::ast::Top;
use crate::error::Diagnostic;
use crate::lexer;
use crate::parser;
use crate::source::{FileSystemProvider, SourceProvider};
use crate::validate;
use std::path::Path;

/// Compile schema text into the model, or the first diagnostic.
pub fn compile_source(src: &str, file: &str) -> Result<Top, Diagnostic> {
    let tokens = lexer::lex(src);
    tracing::debug!(file, tokens = tokens.len(), "lexed schema");

    let top = parser::parse(&tokens, file)?;
    validate::check_semantics(&top, file)?;

    tracing::debug!(
        file,
        tables = top.tables.len(),
        aliases = top.aliases.len(),
        includes = top.includes.len(),
        "parsed schema"
    );
    Ok(top)
}

/// Load a schema through `provider` and compile it.
pub fn compile_with(provider: &dyn SourceProvider, path: &Path) -> Result<Top, Diagnostic> {
    let file = path.display().to_string();
    let src = provider
        .read_source(path)
        .map_err(|e| Diagnostic::load(&file, format!("cannot read schema: {}", e)))?;
    compile_source(&src, &file)
}

pub fn compile_file(path: &Path) -> Result<Top, Diagnostic> {
    compile_with(&FileSystemProvider, path)
}
