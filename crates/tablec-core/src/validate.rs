//! Grammar validation entry points and post-parse semantic checks.

use crate::ast::Top;
use crate::error::Diagnostic;
use crate::lexer::Token;
use crate::parser;
use std::collections::HashMap;

/// Run the grammar over `tokens` without keeping the model.
pub fn check(tokens: &[Token], file: &str) -> Result<(), Diagnostic> {
    parser::parse(tokens, file).map(|_| ())
}

/// Boolean form of [`check`]: the diagnostic goes to the log's error channel.
pub fn validate(tokens: &[Token], file: &str) -> bool {
    match check(tokens, file) {
        Ok(()) => true,
        Err(d) => {
            tracing::error!(
                file = %d.file,
                line = d.line,
                column = d.column,
                "{}",
                d.message
            );
            false
        }
    }
}

/// Checks that need the whole model: uniqueness, interface references and
/// the entity table.
pub fn check_semantics(top: &Top, file: &str) -> Result<(), Diagnostic> {
    check_unique_names(top, file)?;
    check_fields(top, file)?;
    check_interfaces(top, file)?;
    check_entity_table(top, file)?;
    Ok(())
}

fn check_unique_names(top: &Top, file: &str) -> Result<(), Diagnostic> {
    let mut seen: HashMap<&str, u32> = HashMap::new();
    for table in &top.tables {
        if let Some(first) = seen.insert(&table.name, table.line) {
            return Err(Diagnostic::semantic(
                file,
                table.line,
                table.column,
                format!(
                    "duplicate declaration '{}': first declared at line {}",
                    table.name, first
                ),
            ));
        }
    }

    let mut storage: HashMap<&str, &str> = HashMap::new();
    for table in top.components() {
        if let Some(other) = storage.insert(&table.storage_name, &table.name) {
            return Err(Diagnostic::semantic(
                file,
                table.line,
                table.column,
                format!(
                    "storage name '{}' of table '{}' is already used by table '{}'",
                    table.storage_name, table.name, other
                ),
            ));
        }
    }

    let mut aliases: HashMap<&str, u32> = HashMap::new();
    for alias in &top.aliases {
        if let Some(first) = aliases.insert(&alias.name, alias.line) {
            return Err(Diagnostic::semantic(
                file,
                alias.line,
                alias.column,
                format!(
                    "duplicate alias '{}': first declared at line {}",
                    alias.name, first
                ),
            ));
        }
        if let Some(table) = top.table(&alias.name) {
            return Err(Diagnostic::semantic(
                file,
                alias.line,
                alias.column,
                format!(
                    "alias '{}' has the same name as the {} declared at line {}",
                    alias.name,
                    if table.flags.is_interface { "interface" } else { "table" },
                    table.line
                ),
            ));
        }
    }
    Ok(())
}

fn check_fields(top: &Top, file: &str) -> Result<(), Diagnostic> {
    for table in &top.tables {
        let mut seen: HashMap<&str, u32> = HashMap::new();
        for field in &table.fields {
            if let Some(first) = seen.insert(&field.name, field.line) {
                return Err(Diagnostic::semantic(
                    file,
                    field.line,
                    field.column,
                    format!(
                        "duplicate field '{}' in '{}': first declared at line {}",
                        field.name, table.name, first
                    ),
                ));
            }
            // Implicit record fields.
            if table.is_component() && (field.name == "entity" || field.name == "owner") {
                return Err(Diagnostic::semantic(
                    file,
                    field.line,
                    field.column,
                    format!(
                        "field name '{}' in '{}' is reserved for the generated record",
                        field.name, table.name
                    ),
                ));
            }
            if table.flags.entity && (field.name == "id" || field.name == "active") {
                return Err(Diagnostic::semantic(
                    file,
                    field.line,
                    field.column,
                    format!(
                        "field name '{}' is reserved for the entity record",
                        field.name
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn check_interfaces(top: &Top, file: &str) -> Result<(), Diagnostic> {
    for table in &top.tables {
        let Some(parent_name) = table.implements.as_deref() else {
            continue;
        };
        let Some(parent) = top.table(parent_name) else {
            return Err(Diagnostic::semantic(
                file,
                table.line,
                table.column,
                format!(
                    "'{}' implements unknown interface '{}'",
                    table.name, parent_name
                ),
            ));
        };
        if !parent.flags.is_interface {
            return Err(Diagnostic::semantic(
                file,
                table.line,
                table.column,
                format!(
                    "'{}' implements '{}', which is a table, not an interface",
                    table.name, parent_name
                ),
            ));
        }
    }

    // Every chain must end at a declaration without a parent.
    for table in &top.tables {
        let chain = top.interface_chain(table);
        let last = chain.last().copied().unwrap_or(table);
        if last.implements.is_some() {
            return Err(Diagnostic::semantic(
                file,
                table.line,
                table.column,
                format!(
                    "interface chain of '{}' is cyclic (through '{}')",
                    table.name, last.name
                ),
            ));
        }
    }
    Ok(())
}

fn check_entity_table(top: &Top, file: &str) -> Result<(), Diagnostic> {
    let mut entity_tables = top.tables.iter().filter(|t| t.flags.entity);
    let Some(first) = entity_tables.next() else {
        return Ok(());
    };
    if let Some(second) = entity_tables.next() {
        return Err(Diagnostic::semantic(
            file,
            second.line,
            second.column,
            format!(
                "only one #entity table is allowed; '{}' was already declared at line {}",
                first.name, first.line
            ),
        ));
    }
    if first.flags.is_interface || first.implements.is_some() {
        return Err(Diagnostic::semantic(
            file,
            first.line,
            first.column,
            format!(
                "#entity table '{}' cannot be an interface or implement one",
                first.name
            ),
        ));
    }
    Ok(())
}
