//! Schema model produced by the parser.
//!
//! Everything here is built once per compiler run and never mutated after
//! parsing finishes. The emitters only read it.

use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldType {
    pub base: String,
    /// Element count; 1 means scalar.
    pub count: u32,
    pub is_pointer: bool,
}

impl FieldType {
    pub fn scalar(base: impl Into<String>) -> Self {
        FieldType {
            base: base.into(),
            count: 1,
            is_pointer: false,
        }
    }

    pub fn is_array(&self) -> bool {
        self.count > 1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldFlags {
    pub memory_only: bool,
    pub reset: bool,
    pub not_owning: bool,
}

impl FieldFlags {
    /// A non-owning field never needs its reset hook, even when flagged.
    pub fn needs_reset_hook(&self) -> bool {
        self.reset && !self.not_owning
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
    pub flags: FieldFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub line: u32,
    pub column: u32,
}

impl FieldDef {
    pub fn is_serializable(&self) -> bool {
        !self.flags.memory_only && !self.ty.is_pointer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeConstant {
    pub name: String,
    /// Field the constant was derived from.
    pub field: String,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableFlags {
    pub memory_only: bool,
    pub is_interface: bool,
    pub owner_reference: bool,
    /// Fields of this table extend the implicit entity record.
    pub entity: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberFunction {
    /// Opaque target-language signature, passed through untouched.
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDef {
    pub name: String,
    pub storage_name: String,
    pub fields: Vec<FieldDef>,
    pub size_constants: Vec<SizeConstant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implements: Option<String>,
    pub member_functions: Vec<MemberFunction>,
    pub flags: TableFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub line: u32,
    pub column: u32,
}

impl TableDef {
    /// Instantiated as per-entity component storage.
    pub fn is_component(&self) -> bool {
        !self.flags.is_interface && !self.flags.entity
    }

    /// Gets a chunk in the save format.
    pub fn is_serialized(&self) -> bool {
        self.is_component() && !self.flags.memory_only
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn size_constant(&self, field: &str) -> Option<&SizeConstant> {
        self.size_constants.iter().find(|c| c.field == field)
    }

    pub fn serializable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.is_serializable())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeAlias {
    pub name: String,
    pub ty: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub line: u32,
    pub column: u32,
}

impl TypeAlias {
    /// `alias Name;` declares an externally supplied type rather than a synonym.
    pub fn is_forward_declaration(&self) -> bool {
        self.ty.base == self.name && self.ty.count == 1 && !self.ty.is_pointer
    }
}

/// The whole parsed schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Top {
    pub tables: Vec<TableDef>,
    pub aliases: Vec<TypeAlias>,
    pub includes: Vec<String>,
}

impl Top {
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn alias(&self, name: &str) -> Option<&TypeAlias> {
        self.aliases.iter().find(|a| a.name == name)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.iter().filter(|t| t.flags.is_interface)
    }

    /// Component tables in declaration order.
    pub fn components(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.iter().filter(|t| t.is_component())
    }

    pub fn entity_table(&self) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.flags.entity)
    }

    /// Parents of `table` following `implements` links, nearest first.
    ///
    /// Stops at the first missing parent or at the first repeated name, so
    /// the walk terminates even on schemas the semantic checks would reject.
    pub fn interface_chain<'t>(&'t self, table: &'t TableDef) -> Vec<&'t TableDef> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        seen.insert(table.name.as_str());
        let mut next = table.implements.as_deref();
        while let Some(name) = next {
            if !seen.insert(name) {
                break;
            }
            let Some(parent) = self.table(name) else {
                break;
            };
            chain.push(parent);
            next = parent.implements.as_deref();
        }
        chain
    }

    pub fn implements(&self, table: &TableDef, interface: &str) -> bool {
        self.interface_chain(table)
            .iter()
            .any(|parent| parent.name == interface)
    }
}
