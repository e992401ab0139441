//! Parsed schema extracted into codegen-internal typed structs.
//!
//! Both emitters consume [`CodegenSchema`] rather than the raw model: every
//! field type is resolved, wire keys are hashed and every name the
//! generated code will declare is checked for clashes before any text is
//! produced.

use std::collections::HashMap;

use tablec_core::naming::{snake_case, upper_snake_case};
use tablec_core::{FieldDef, TableDef, Top};
use tablec_wire::key_of;

use crate::config::CodegenConfig;
use crate::error::CodegenError;
use crate::types::{resolve, rust_ident, ResolvedType};

/// Type names the declarations artifact always defines.
const GENERATED_TYPES: &[&str] = &[
    "EntityId",
    "Entity",
    "Storage",
    "Component",
    "ComponentKind",
    "ComponentRef",
    "ComponentMut",
    "ComponentHooks",
    "NoHooks",
    "Interface",
    "ResetHooks",
    "Visit",
    "HashMap",
    "Rc",
    "Weak",
];

/// Storage fields the generated `Storage` struct declares itself.
const STORAGE_FIELDS: &[&str] = &["entities"];

#[derive(Debug, Clone)]
pub struct CgField<'a> {
    pub def: &'a FieldDef,
    /// Rust identifier, raw-escaped if needed.
    pub ident: String,
    pub ty: ResolvedType,
    /// Written to the save stream.
    pub serialized: bool,
    /// `FIELD_<TABLE>_<FIELD>_KEY`, present for serialized component fields.
    pub key: Option<WireKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireKey {
    pub const_name: String,
    pub value: u64,
}

#[derive(Debug, Clone)]
pub struct CgTable<'a> {
    pub def: &'a TableDef,
    pub fields: Vec<CgField<'a>>,
    /// Present for tables that get a chunk in the save stream.
    pub key: Option<WireKey>,
}

impl<'a> CgTable<'a> {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn serialized_fields(&self) -> impl Iterator<Item = &CgField<'a>> {
        self.fields.iter().filter(|f| f.serialized)
    }

    pub fn reset_fields(&self) -> impl Iterator<Item = &CgField<'a>> {
        self.fields
            .iter()
            .filter(|f| f.def.flags.needs_reset_hook())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetHook {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone)]
pub struct CgInterface<'a> {
    pub def: &'a TableDef,
    /// Components implementing the interface directly or through a
    /// parent interface, in schema order.
    pub implementors: Vec<&'a TableDef>,
}

#[derive(Debug, Clone)]
pub struct CodegenSchema<'a> {
    pub top: &'a Top,
    pub entity: Option<CgTable<'a>>,
    pub components: Vec<CgTable<'a>>,
    pub interfaces: Vec<CgInterface<'a>>,
    /// Declared aliases (forward declarations excluded) with their Rust type.
    pub aliases: Vec<(&'a tablec_core::TypeAlias, ResolvedType)>,
    /// Distinct reset hooks in first-use order.
    pub reset_hooks: Vec<ResetHook>,
}

impl<'a> CodegenSchema<'a> {
    pub fn from_top(top: &'a Top, config: &CodegenConfig) -> Result<Self, CodegenError> {
        let mut names = NameRegistry::default();
        for name in GENERATED_TYPES {
            names.claim(name, "generated code")?;
        }

        let mut aliases = Vec::new();
        for alias in &top.aliases {
            if alias.is_forward_declaration() {
                continue;
            }
            names.claim_type(&alias.name, &format!("alias '{}'", alias.name))?;
            let ty = resolve(top, &alias.name, &alias.ty, false, None)?;
            aliases.push((alias, ty));
        }

        let mut entity = None;
        let mut components = Vec::new();
        let mut interfaces = Vec::new();
        for table in &top.tables {
            let context = format!("table '{}'", table.name);
            names.claim_type(&table.name, &context)?;
            if !table.member_functions.is_empty() && !table.flags.is_interface {
                names.claim_type(&format!("{}Methods", table.name), &context)?;
            }
            for constant in &table.size_constants {
                names.claim(&constant.name, &context)?;
            }
            if table.flags.is_interface {
                names.claim(
                    &format!("{}_implementations", snake_case(&table.name)),
                    &context,
                )?;
                interfaces.push(CgInterface {
                    def: table,
                    implementors: top
                        .components()
                        .filter(|c| top.implements(c, &table.name))
                        .collect(),
                });
            } else if table.flags.entity {
                entity = Some(build_table(top, table, None, config, &mut names)?);
            } else {
                if STORAGE_FIELDS.contains(&table.storage_name.as_str()) {
                    return Err(CodegenError::ReservedName {
                        name: table.storage_name.clone(),
                        context: format!("storage name of {}", context),
                    });
                }
                plain_ident(&table.storage_name, &format!("storage name of {}", context))?;
                let key = if table.is_serialized() {
                    Some(WireKey {
                        const_name: format!("TABLE_{}_KEY", upper_snake_case(&table.name)),
                        value: key_of(&table.name, config.hash_seed),
                    })
                } else {
                    None
                };
                components.push(build_table(top, table, key, config, &mut names)?);
            }
        }

        check_key_collisions(&components)?;
        let reset_hooks = collect_reset_hooks(entity.iter().chain(&components))?;

        Ok(CodegenSchema {
            top,
            entity,
            components,
            interfaces,
            aliases,
            reset_hooks,
        })
    }

    pub fn serialized_components(&self) -> impl Iterator<Item = &CgTable<'a>> {
        self.components.iter().filter(|c| c.key.is_some())
    }

    /// Interface member functions and table member functions, per declaration.
    pub fn method_traits(&self) -> impl Iterator<Item = (&'a TableDef, String)> + '_ {
        self.top
            .tables
            .iter()
            .filter(|t| !t.member_functions.is_empty())
            .map(|t| {
                let name = if t.flags.is_interface {
                    t.name.clone()
                } else {
                    format!("{}Methods", t.name)
                };
                (t, name)
            })
    }
}

fn build_table<'a>(
    top: &'a Top,
    table: &'a TableDef,
    key: Option<WireKey>,
    config: &CodegenConfig,
    names: &mut NameRegistry,
) -> Result<CgTable<'a>, CodegenError> {
    let mut fields = Vec::with_capacity(table.fields.len());
    for field in &table.fields {
        let context = format!("field '{}.{}'", table.name, field.name);
        let ident = rust_ident(&field.name, &context)?;
        let size_const = table.size_constant(&field.name).map(|c| c.name.as_str());
        let ty = resolve(top, &table.name, &field.ty, field.flags.not_owning, size_const)?;
        let serialized = !field.flags.memory_only && ty.is_wire_compatible();
        let field_key = if serialized && key.is_some() {
            let const_name = format!(
                "FIELD_{}_{}_KEY",
                upper_snake_case(&table.name),
                upper_snake_case(&field.name)
            );
            names.claim(&const_name, &context)?;
            Some(WireKey {
                const_name,
                value: key_of(&field.name, config.hash_seed),
            })
        } else {
            None
        };
        fields.push(CgField {
            def: field,
            ident,
            ty,
            serialized,
            key: field_key,
        });
    }
    if let Some(key) = &key {
        names.claim(&key.const_name, &format!("table '{}'", table.name))?;
    }
    Ok(CgTable {
        def: table,
        fields,
        key,
    })
}

/// Table keys must be distinct across the schema and field keys within a
/// table; either collision would make the loader misroute data.
fn check_key_collisions(components: &[CgTable<'_>]) -> Result<(), CodegenError> {
    let mut tables: HashMap<u64, &str> = HashMap::new();
    for table in components {
        let Some(key) = &table.key else {
            continue;
        };
        if let Some(first) = tables.insert(key.value, table.name()) {
            return Err(CodegenError::KeyCollision {
                first: format!("table '{}'", first),
                second: format!("table '{}'", table.name()),
                key: key.value,
            });
        }
        let mut fields: HashMap<u64, &str> = HashMap::new();
        for field in table.serialized_fields() {
            let Some(field_key) = &field.key else {
                continue;
            };
            if let Some(first) = fields.insert(field_key.value, &field.def.name) {
                return Err(CodegenError::KeyCollision {
                    first: format!("field '{}.{}'", table.name(), first),
                    second: format!("field '{}.{}'", table.name(), field.def.name),
                    key: field_key.value,
                });
            }
        }
    }
    Ok(())
}

fn collect_reset_hooks<'t, 'a: 't>(
    tables: impl Iterator<Item = &'t CgTable<'a>>,
) -> Result<Vec<ResetHook>, CodegenError> {
    let mut hooks: Vec<ResetHook> = Vec::new();
    for table in tables {
        for field in table.reset_fields() {
            let hook = ResetHook {
                name: field.ty.hook_name.clone(),
                ty: field.ty.hook_type.clone(),
            };
            match hooks.iter().find(|h| h.name == hook.name) {
                Some(existing) if existing.ty != hook.ty => {
                    return Err(CodegenError::NameClash {
                        name: hook.name,
                        first: format!("type '{}'", existing.ty),
                        second: format!("type '{}'", hook.ty),
                    });
                }
                Some(_) => {}
                None => hooks.push(hook),
            }
        }
    }
    Ok(hooks)
}

/// Tracks every generated item name and who introduced it.
#[derive(Default)]
struct NameRegistry {
    owners: HashMap<String, String>,
}

impl NameRegistry {
    fn claim(&mut self, name: &str, owner: &str) -> Result<(), CodegenError> {
        if let Some(first) = self.owners.get(name) {
            if first == "generated code" {
                return Err(CodegenError::ReservedName {
                    name: name.to_owned(),
                    context: owner.to_owned(),
                });
            }
            return Err(CodegenError::NameClash {
                name: name.to_owned(),
                first: first.clone(),
                second: owner.to_owned(),
            });
        }
        self.owners.insert(name.to_owned(), owner.to_owned());
        Ok(())
    }

    fn claim_type(&mut self, name: &str, owner: &str) -> Result<(), CodegenError> {
        plain_ident(name, owner)?;
        self.claim(name, owner)
    }
}

/// Type and storage names are emitted verbatim, so keywords are refused.
fn plain_ident(name: &str, context: &str) -> Result<(), CodegenError> {
    if rust_ident(name, context)? != name {
        return Err(CodegenError::ReservedName {
            name: name.to_owned(),
            context: context.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablec_core::compile_source;

    fn schema_err(src: &str) -> CodegenError {
        let top = compile_source(src, "t.tbl").unwrap();
        CodegenSchema::from_top(&top, &CodegenConfig::default()).unwrap_err()
    }

    #[test]
    fn splits_entity_components_and_interfaces() {
        let top = compile_source(
            "#entity table Info { name : string; }\n\
             interface Shape {}\n\
             #implements_interface(Shape) table Circle { r : float; }\n\
             table Tag {}",
            "t.tbl",
        )
        .unwrap();
        let schema = CodegenSchema::from_top(&top, &CodegenConfig::default()).unwrap();
        assert_eq!(schema.entity.as_ref().unwrap().name(), "Info");
        let names: Vec<&str> = schema.components.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Circle", "Tag"]);
        assert_eq!(schema.interfaces.len(), 1);
        assert_eq!(schema.interfaces[0].implementors[0].name, "Circle");
    }

    #[test]
    fn keys_follow_the_seed() {
        let top = compile_source("table Foo { x : int; }", "t.tbl").unwrap();
        let a = CodegenSchema::from_top(&top, &CodegenConfig::default()).unwrap();
        let seeded = CodegenConfig {
            hash_seed: 7,
            ..CodegenConfig::default()
        };
        let b = CodegenSchema::from_top(&top, &seeded).unwrap();
        let key_a = a.components[0].key.as_ref().unwrap();
        let key_b = b.components[0].key.as_ref().unwrap();
        assert_eq!(key_a.const_name, "TABLE_FOO_KEY");
        assert_eq!(key_a.value, key_of("Foo", tablec_wire::DEFAULT_SEED));
        assert_ne!(key_a.value, key_b.value);
        let field = a.components[0].fields[0].key.as_ref().unwrap();
        assert_eq!(field.const_name, "FIELD_FOO_X_KEY");
    }

    #[test]
    fn memory_only_tables_and_fields_have_no_keys() {
        let top = compile_source(
            "alias Texture;\n#memory_only table Cache { n : int; }\n\
             table Sprite { tex : *Texture; #memory_only frame : int; x : int; }",
            "t.tbl",
        )
        .unwrap();
        let schema = CodegenSchema::from_top(&top, &CodegenConfig::default()).unwrap();
        assert!(schema.components[0].key.is_none());
        let sprite = &schema.components[1];
        let serialized: Vec<&str> = sprite
            .serialized_fields()
            .map(|f| f.def.name.as_str())
            .collect();
        assert_eq!(serialized, vec!["x"]);
        assert_eq!(schema.reset_hooks[0].name, "reset_texture_ptr");
    }

    #[test]
    fn generated_type_names_are_reserved() {
        let err = schema_err("table Storage {}");
        assert!(matches!(err, CodegenError::ReservedName { .. }), "{}", err);
    }

    #[test]
    fn clashing_constant_names_are_rejected() {
        let err = schema_err("table FooBar { baz : int; }\ntable Foo { bar_baz : int; }");
        assert!(matches!(err, CodegenError::NameClash { .. }), "{}", err);
    }

    #[test]
    fn entities_storage_name_is_reserved() {
        let err = schema_err("table Thing entities {}");
        assert!(err.to_string().contains("entities"), "{}", err);
    }

    #[test]
    fn keyword_type_and_storage_names_are_rejected() {
        let err = schema_err("table Foo match {}");
        assert!(matches!(err, CodegenError::ReservedName { .. }), "{}", err);
    }

    #[test]
    fn keyword_field_names_are_escaped() {
        let top = compile_source("table Foo { type : int; }", "t.tbl").unwrap();
        let schema = CodegenSchema::from_top(&top, &CodegenConfig::default()).unwrap();
        assert_eq!(schema.components[0].fields[0].ident, "r#type");
    }
}
