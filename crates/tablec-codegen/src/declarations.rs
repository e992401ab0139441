//! Declarations artifact: records, the component enums and the `Storage`
//! container.
//!
//! The output is meant to be pulled into a module with `include!`, so it
//! carries no inner attributes and no `//!` docs.

use tablec_core::MemberFunction;

use crate::schema::{CgTable, CodegenSchema};

/// Emit the declarations artifact for a resolved schema.
pub fn emit_declarations(schema: &CodegenSchema<'_>) -> String {
    let mut out = String::new();
    out.push_str("// @generated by tablec. Do not edit by hand.\n\n");
    emit_imports(schema, &mut out);

    out.push_str("/// Identifier of an entity; equal to its slot index in `Storage::entities`.\n");
    out.push_str("pub type EntityId = u32;\n\n");

    emit_aliases(schema, &mut out);
    emit_size_constants(schema, &mut out);
    emit_reset_hooks(schema, &mut out);
    emit_method_traits(schema, &mut out);
    emit_entity(schema, &mut out);
    for table in &schema.components {
        emit_record(table, &mut out);
    }
    emit_component_kind(schema, &mut out);
    emit_component_refs(schema, &mut out);
    emit_interface_enum(schema, &mut out);
    emit_component_trait(schema, &mut out);
    emit_hooks(&mut out);
    emit_storage(schema, &mut out);
    out
}

// ──────────────────────────────────────────────
// Prelude
// ──────────────────────────────────────────────

fn emit_imports(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str("#[allow(unused_imports)]\n");
    out.push_str("use std::collections::HashMap;\n");
    out.push_str("#[allow(unused_imports)]\n");
    out.push_str("use std::rc::{Rc, Weak};\n");
    for include in &schema.top.includes {
        out.push_str("#[allow(unused_imports)]\n");
        out.push_str(&format!("use {};\n", include.trim_end_matches(';')));
    }
    out.push('\n');
}

fn emit_aliases(schema: &CodegenSchema<'_>, out: &mut String) {
    if schema.aliases.is_empty() {
        return;
    }
    for (alias, ty) in &schema.aliases {
        push_doc(out, "", alias.doc.as_deref());
        out.push_str(&format!("pub type {} = {};\n", alias.name, ty.decl));
    }
    out.push('\n');
}

fn emit_size_constants(schema: &CodegenSchema<'_>, out: &mut String) {
    let constants: Vec<_> = schema
        .top
        .tables
        .iter()
        .flat_map(|t| t.size_constants.iter())
        .collect();
    if constants.is_empty() {
        return;
    }
    for constant in constants {
        out.push_str(&format!(
            "pub const {}: usize = {};\n",
            constant.name, constant.value
        ));
    }
    out.push('\n');
}

fn emit_reset_hooks(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str("/// Release routines for fields flagged `reset`, supplied by the runtime.\n");
    out.push_str("pub trait ResetHooks {\n");
    for hook in &schema.reset_hooks {
        out.push_str(&format!(
            "    fn {}(&mut self, value: &mut {});\n",
            hook.name, hook.ty
        ));
    }
    out.push_str("}\n\n");
}

fn emit_method_traits(schema: &CodegenSchema<'_>, out: &mut String) {
    for (table, trait_name) in schema.method_traits() {
        push_doc(out, "", table.doc.as_deref());
        out.push_str(&format!("pub trait {} {{\n", trait_name));
        for function in &table.member_functions {
            push_doc(out, "    ", function.doc.as_deref());
            out.push_str(&format!("    {}\n", trait_item(function)));
        }
        out.push_str("}\n\n");
    }
}

/// Signatures without a body get a terminating `;`.
fn trait_item(function: &MemberFunction) -> String {
    let sig = function.signature.trim();
    if sig.ends_with(';') || sig.ends_with('}') {
        sig.to_owned()
    } else {
        format!("{};", sig)
    }
}

// ──────────────────────────────────────────────
// Records
// ──────────────────────────────────────────────

fn emit_entity(schema: &CodegenSchema<'_>, out: &mut String) {
    let entity = schema.entity.as_ref();
    push_doc(out, "", entity.and_then(|e| e.def.doc.as_deref()));
    out.push_str("#[derive(Debug, Clone)]\n");
    out.push_str("pub struct Entity {\n");
    out.push_str("    pub id: EntityId,\n");
    out.push_str("    /// False for free slots.\n");
    out.push_str("    pub active: bool,\n");
    if let Some(table) = entity {
        emit_field_decls(table, out);
    }
    out.push_str("}\n\n");

    out.push_str("impl Default for Entity {\n");
    out.push_str("    fn default() -> Self {\n");
    out.push_str("        Entity {\n");
    out.push_str("            id: 0,\n");
    out.push_str("            active: false,\n");
    if let Some(table) = entity {
        emit_field_defaults(table, out);
    }
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    emit_reset_impl("Entity", entity, out);
}

fn emit_record(table: &CgTable<'_>, out: &mut String) {
    let name = table.name();
    push_doc(out, "", table.def.doc.as_deref());
    out.push_str("#[derive(Debug, Clone)]\n");
    out.push_str(&format!("pub struct {} {{\n", name));
    out.push_str("    /// Entity this component belongs to.\n");
    out.push_str("    pub entity: EntityId,\n");
    emit_field_decls(table, out);
    if table.def.flags.owner_reference {
        out.push_str("    /// Non-owning link to the owning entity, set when the record is bound.\n");
        out.push_str("    pub owner: Option<EntityId>,\n");
    }
    out.push_str("}\n\n");

    out.push_str(&format!("impl Default for {} {{\n", name));
    out.push_str("    fn default() -> Self {\n");
    out.push_str(&format!("        {} {{\n", name));
    out.push_str("            entity: 0,\n");
    emit_field_defaults(table, out);
    if table.def.flags.owner_reference {
        out.push_str("            owner: None,\n");
    }
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    emit_reset_impl(name, Some(table), out);
}

fn emit_field_decls(table: &CgTable<'_>, out: &mut String) {
    for field in &table.fields {
        push_doc(out, "    ", field.def.doc.as_deref());
        out.push_str(&format!("    pub {}: {},\n", field.ident, field.ty.decl));
    }
}

fn emit_field_defaults(table: &CgTable<'_>, out: &mut String) {
    for field in &table.fields {
        out.push_str(&format!(
            "            {}: {},\n",
            field.ident,
            field.ty.default_expr()
        ));
    }
}

/// Records without reset-required fields get no `reset_transient_state`.
fn emit_reset_impl(name: &str, table: Option<&CgTable<'_>>, out: &mut String) {
    let fields: Vec<_> = table.map(|t| t.reset_fields().collect()).unwrap_or_default();
    if fields.is_empty() {
        return;
    }
    out.push_str(&format!("impl {} {{\n", name));
    out.push_str("    /// Run the reset hook of every field flagged `reset`.\n");
    out.push_str(
        "    pub fn reset_transient_state<H: ResetHooks + ?Sized>(&mut self, hooks: &mut H) {\n",
    );
    for field in fields {
        if field.ty.own_array {
            out.push_str(&format!(
                "        for value in self.{}.iter_mut() {{\n",
                field.ident
            ));
            out.push_str(&format!("            hooks.{}(value);\n", field.ty.hook_name));
            out.push_str("        }\n");
        } else {
            out.push_str(&format!(
                "        hooks.{}(&mut self.{});\n",
                field.ty.hook_name, field.ident
            ));
        }
    }
    out.push_str("    }\n");
    out.push_str("}\n\n");
}

// ──────────────────────────────────────────────
// Closed component and interface enums
// ──────────────────────────────────────────────

fn emit_component_kind(schema: &CodegenSchema<'_>, out: &mut String) {
    let names: Vec<&str> = schema.components.iter().map(|c| c.name()).collect();
    out.push_str("/// Every component table, in schema order.\n");
    out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]\n");
    out.push_str("pub enum ComponentKind {\n");
    for name in &names {
        out.push_str(&format!("    {},\n", name));
    }
    out.push_str("}\n\n");

    out.push_str("impl ComponentKind {\n");
    out.push_str(&format!(
        "    pub const ALL: [ComponentKind; {}] = [{}];\n\n",
        names.len(),
        names
            .iter()
            .map(|n| format!("ComponentKind::{}", n))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    out.push_str("    pub fn name(self) -> &'static str {\n");
    out.push_str("        match self {\n");
    for name in &names {
        out.push_str(&format!(
            "            ComponentKind::{} => \"{}\",\n",
            name, name
        ));
    }
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");
}

fn emit_component_refs(schema: &CodegenSchema<'_>, out: &mut String) {
    for (enum_name, derive, reference) in [
        ("ComponentRef", "Debug, Clone, Copy", "&'a "),
        ("ComponentMut", "Debug", "&'a mut "),
    ] {
        out.push_str(&format!("#[derive({})]\n", derive));
        out.push_str(&format!("pub enum {}<'a> {{\n", enum_name));
        for table in &schema.components {
            out.push_str(&format!(
                "    {}({}{}),\n",
                table.name(),
                reference,
                table.name()
            ));
        }
        if schema.components.is_empty() {
            out.push_str("    #[doc(hidden)]\n");
            out.push_str("    Unused(std::marker::PhantomData<&'a ()>),\n");
        }
        out.push_str("}\n\n");

        out.push_str(&format!("impl {}<'_> {{\n", enum_name));
        out.push_str("    pub fn kind(&self) -> ComponentKind {\n");
        out.push_str("        match self {\n");
        for table in &schema.components {
            out.push_str(&format!(
                "            {}::{}(_) => ComponentKind::{},\n",
                enum_name,
                table.name(),
                table.name()
            ));
        }
        if schema.components.is_empty() {
            out.push_str(&format!(
                "            {}::Unused(_) => unreachable!(\"schema has no components\"),\n",
                enum_name
            ));
        }
        out.push_str("        }\n");
        out.push_str("    }\n");
        out.push_str("}\n\n");
    }
}

fn emit_interface_enum(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str("/// Every interface declared by the schema.\n");
    out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]\n");
    out.push_str("pub enum Interface {\n");
    for iface in &schema.interfaces {
        out.push_str(&format!("    {},\n", iface.def.name));
    }
    out.push_str("}\n\n");

    out.push_str("impl Interface {\n");
    out.push_str(&format!(
        "    pub const ALL: [Interface; {}] = [{}];\n\n",
        schema.interfaces.len(),
        schema
            .interfaces
            .iter()
            .map(|i| format!("Interface::{}", i.def.name))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    out.push_str("    pub fn name(self) -> &'static str {\n");
    out.push_str("        match self {\n");
    for iface in &schema.interfaces {
        out.push_str(&format!(
            "            Interface::{} => \"{}\",\n",
            iface.def.name, iface.def.name
        ));
    }
    out.push_str("        }\n");
    out.push_str("    }\n\n");

    out.push_str(
        "    /// Component tables implementing this interface directly or through a parent.\n",
    );
    out.push_str("    pub fn implementors(self) -> &'static [ComponentKind] {\n");
    out.push_str("        match self {\n");
    for iface in &schema.interfaces {
        let kinds: Vec<String> = iface
            .implementors
            .iter()
            .map(|t| format!("ComponentKind::{}", t.name))
            .collect();
        out.push_str(&format!(
            "            Interface::{} => &[{}],\n",
            iface.def.name,
            kinds.join(", ")
        ));
    }
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");
}

// ──────────────────────────────────────────────
// Component trait and hooks
// ──────────────────────────────────────────────

fn emit_component_trait(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str("/// A record stored per entity in one of the `Storage` tables.\n");
    out.push_str("pub trait Component: Clone + Default {\n");
    out.push_str("    const KIND: ComponentKind;\n\n");
    out.push_str("    fn table(storage: &Storage) -> &HashMap<EntityId, Self>;\n\n");
    out.push_str("    fn table_mut(storage: &mut Storage) -> &mut HashMap<EntityId, Self>;\n\n");
    out.push_str("    /// Point the record at the entity that owns it.\n");
    out.push_str("    fn bind(&mut self, id: EntityId);\n");
    out.push_str("}\n\n");

    for table in &schema.components {
        let storage = &table.def.storage_name;
        out.push_str(&format!("impl Component for {} {{\n", table.name()));
        out.push_str(&format!(
            "    const KIND: ComponentKind = ComponentKind::{};\n\n",
            table.name()
        ));
        out.push_str("    fn table(storage: &Storage) -> &HashMap<EntityId, Self> {\n");
        out.push_str(&format!("        &storage.{}\n", storage));
        out.push_str("    }\n\n");
        out.push_str("    fn table_mut(storage: &mut Storage) -> &mut HashMap<EntityId, Self> {\n");
        out.push_str(&format!("        &mut storage.{}\n", storage));
        out.push_str("    }\n\n");
        out.push_str("    fn bind(&mut self, id: EntityId) {\n");
        out.push_str("        self.entity = id;\n");
        if table.def.flags.owner_reference {
            out.push_str("        self.owner = Some(id);\n");
        }
        out.push_str("    }\n");
        out.push_str("}\n\n");
    }
}

fn emit_hooks(out: &mut String) {
    out.push_str("/// Callbacks invoked by `Storage::delete`.\n");
    out.push_str("pub trait ComponentHooks {\n");
    out.push_str("    /// Called for each component of the entity before it is removed.\n");
    out.push_str(
        "    fn delete_component(&mut self, _id: EntityId, _component: ComponentMut<'_>) {}\n",
    );
    out.push_str("}\n\n");
    out.push_str("#[derive(Debug, Clone, Copy, Default)]\n");
    out.push_str("pub struct NoHooks;\n\n");
    out.push_str("impl ComponentHooks for NoHooks {}\n\n");

    out.push_str("/// Answer of a `Storage::for_each_component` visitor.\n");
    out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq)]\n");
    out.push_str("pub enum Visit {\n");
    out.push_str("    Continue,\n");
    out.push_str("    /// Attach a default record when the component is absent.\n");
    out.push_str("    Attach,\n");
    out.push_str("}\n\n");
}

// ──────────────────────────────────────────────
// Storage
// ──────────────────────────────────────────────

fn emit_storage(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str("/// Entity slots plus one id-keyed map per component table.\n");
    out.push_str("#[derive(Debug, Clone, Default)]\n");
    out.push_str("pub struct Storage {\n");
    out.push_str("    pub entities: Vec<Entity>,\n");
    for table in &schema.components {
        out.push_str(&format!(
            "    pub {}: HashMap<EntityId, {}>,\n",
            table.def.storage_name,
            table.name()
        ));
    }
    out.push_str("}\n\n");

    out.push_str("impl Storage {\n");
    out.push_str(STORAGE_SLOTS);
    emit_clear(schema, out);
    emit_delete(schema, out);
    emit_copy(schema, out);
    emit_for_each_component(schema, out);
    out.push_str(STORAGE_ACCESS);
    emit_component_lookup(schema, out);
    out.push_str("}\n");
}

const STORAGE_SLOTS: &str = "    pub fn new() -> Self {
        Self::default()
    }

    /// Activate the first free slot, or append one. The id is the slot index.
    pub fn create_entity(&mut self) -> EntityId {
        if let Some(slot) = self.entities.iter_mut().find(|e| !e.active) {
            let id = slot.id;
            *slot = Entity {
                id,
                active: true,
                ..Entity::default()
            };
            return id;
        }
        let id = self.entities.len() as EntityId;
        self.entities.push(Entity {
            id,
            active: true,
            ..Entity::default()
        });
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id as usize)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id as usize)
    }

    /// Slot `id`, growing the slot list with inactive entries as needed.
    pub fn slot_mut(&mut self, id: EntityId) -> &mut Entity {
        let index = id as usize;
        while self.entities.len() <= index {
            let next = self.entities.len() as EntityId;
            self.entities.push(Entity {
                id: next,
                ..Entity::default()
            });
        }
        &mut self.entities[index]
    }

";

const STORAGE_ACCESS: &str = "    pub fn components<T: Component>(&self) -> &HashMap<EntityId, T> {
        T::table(self)
    }

    pub fn components_mut<T: Component>(&mut self) -> &mut HashMap<EntityId, T> {
        T::table_mut(self)
    }

    pub fn get<T: Component>(&self, id: EntityId) -> Option<&T> {
        T::table(self).get(&id)
    }

    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        T::table_mut(self).get_mut(&id)
    }

    /// Bind `component` to `id` and store it, returning any record it replaced.
    pub fn attach<T: Component>(&mut self, id: EntityId, mut component: T) -> Option<T> {
        component.bind(id);
        T::table_mut(self).insert(id, component)
    }

    /// Components of `id` that implement `interface`, in schema order.
    pub fn implementations(&self, interface: Interface, id: EntityId) -> Vec<ComponentRef<'_>> {
        interface
            .implementors()
            .iter()
            .filter_map(|&kind| self.component(kind, id))
            .collect()
    }

";

fn emit_clear(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str("    /// Drop every entity and component.\n");
    out.push_str("    pub fn clear(&mut self) {\n");
    out.push_str("        self.entities.clear();\n");
    for table in &schema.components {
        out.push_str(&format!("        self.{}.clear();\n", table.def.storage_name));
    }
    out.push_str("    }\n\n");
}

fn emit_delete(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str("    /// Remove every component of `id`, reporting each to `hooks` first, and free the slot.\n");
    out.push_str(
        "    pub fn delete<H: ComponentHooks + ?Sized>(&mut self, id: EntityId, hooks: &mut H) {\n",
    );
    if schema.components.is_empty() {
        out.push_str("        let _ = hooks;\n");
    }
    for table in &schema.components {
        let storage = &table.def.storage_name;
        out.push_str(&format!(
            "        if let Some(component) = self.{}.get_mut(&id) {{\n",
            storage
        ));
        out.push_str(&format!(
            "            hooks.delete_component(id, ComponentMut::{}(component));\n",
            table.name()
        ));
        out.push_str(&format!("            self.{}.remove(&id);\n", storage));
        out.push_str("        }\n");
    }
    out.push_str("        if let Some(entity) = self.entities.get_mut(id as usize) {\n");
    out.push_str("            entity.active = false;\n");
    out.push_str("        }\n");
    out.push_str("    }\n\n");
}

fn emit_copy(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str("    /// Duplicate every component of `from_id` onto `new_id`, rebinding the copies.\n");
    out.push_str("    pub fn copy(&mut self, new_id: EntityId, from_id: EntityId) {\n");
    if schema.components.is_empty() {
        out.push_str("        let _ = (new_id, from_id);\n");
    }
    for table in &schema.components {
        let storage = &table.def.storage_name;
        out.push_str(&format!(
            "        if let Some(mut component) = self.{}.get(&from_id).cloned() {{\n",
            storage
        ));
        out.push_str("            component.bind(new_id);\n");
        out.push_str(&format!(
            "            self.{}.insert(new_id, component);\n",
            storage
        ));
        out.push_str("        }\n");
    }
    out.push_str("    }\n\n");
}

fn emit_for_each_component(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str("    /// Visit every component table for live entity `id` in schema order.\n");
    out.push_str("    ///\n");
    out.push_str("    /// The visitor gets `None` for absent components and may answer\n");
    out.push_str("    /// [`Visit::Attach`] to have a default record attached.\n");
    out.push_str("    pub fn for_each_component<F>(&mut self, id: EntityId, mut visit: F)\n");
    out.push_str("    where\n");
    out.push_str(
        "        F: FnMut(EntityId, &Entity, ComponentKind, Option<ComponentMut<'_>>) -> Visit,\n",
    );
    out.push_str("    {\n");
    out.push_str("        let Some(entity) = self.entities.get(id as usize).filter(|e| e.active) else {\n");
    out.push_str("            return;\n");
    out.push_str("        };\n");
    if schema.components.is_empty() {
        out.push_str("        let _ = (entity, &mut visit);\n");
    }
    for table in &schema.components {
        let storage = &table.def.storage_name;
        let name = table.name();
        out.push_str(&format!("        match self.{}.get_mut(&id) {{\n", storage));
        out.push_str("            Some(component) => {\n");
        out.push_str(&format!(
            "                visit(id, entity, ComponentKind::{}, Some(ComponentMut::{}(component)));\n",
            name, name
        ));
        out.push_str("            }\n");
        out.push_str("            None => {\n");
        out.push_str(&format!(
            "                if visit(id, entity, ComponentKind::{}, None) == Visit::Attach {{\n",
            name
        ));
        out.push_str(&format!(
            "                    let mut component = {}::default();\n",
            name
        ));
        out.push_str("                    component.bind(id);\n");
        out.push_str(&format!(
            "                    self.{}.insert(id, component);\n",
            storage
        ));
        out.push_str("                }\n");
        out.push_str("            }\n");
        out.push_str("        }\n");
    }
    out.push_str("    }\n\n");
}

fn emit_component_lookup(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str(
        "    pub fn component(&self, kind: ComponentKind, id: EntityId) -> Option<ComponentRef<'_>> {\n",
    );
    if schema.components.is_empty() {
        out.push_str("        let _ = id;\n");
    }
    out.push_str("        match kind {\n");
    for table in &schema.components {
        out.push_str(&format!(
            "            ComponentKind::{} => self.{}.get(&id).map(ComponentRef::{}),\n",
            table.name(),
            table.def.storage_name,
            table.name()
        ));
    }
    out.push_str("        }\n");
    out.push_str("    }\n");

    for iface in &schema.interfaces {
        out.push('\n');
        out.push_str(&format!(
            "    pub fn {}_implementations(&self, id: EntityId) -> Vec<ComponentRef<'_>> {{\n",
            tablec_core::naming::snake_case(&iface.def.name)
        ));
        out.push_str(&format!(
            "        self.implementations(Interface::{}, id)\n",
            iface.def.name
        ));
        out.push_str("    }\n");
    }
}

fn push_doc(out: &mut String, indent: &str, doc: Option<&str>) {
    let Some(doc) = doc else {
        return;
    };
    for line in doc.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            out.push_str(&format!("{}///\n", indent));
        } else {
            out.push_str(&format!("{}/// {}\n", indent, line.trim_start()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodegenConfig;
    use tablec_core::compile_source;

    fn emit(src: &str) -> String {
        let top = compile_source(src, "t.tbl").unwrap();
        let schema = CodegenSchema::from_top(&top, &CodegenConfig::default()).unwrap();
        emit_declarations(&schema)
    }

    #[test]
    fn record_fields_and_defaults() {
        let out = emit("table Foo { x : int; tag : char[8]; }");
        assert!(out.contains("pub const FOO_TAG_SIZE: usize = 8;"), "{}", out);
        assert!(out.contains("pub struct Foo {"));
        assert!(out.contains("    pub x: i32,\n"));
        assert!(out.contains("    pub tag: [u8; FOO_TAG_SIZE],\n"));
        assert!(out.contains("            x: 0,\n"));
        assert!(out.contains("            tag: [0; FOO_TAG_SIZE],\n"));
        assert!(out.contains("    pub foos: HashMap<EntityId, Foo>,\n"));
    }

    #[test]
    fn no_inner_attributes_or_module_docs() {
        let out = emit("table Foo { x : int; }");
        assert!(!out.contains("#!["));
        assert!(!out.contains("//!"));
    }

    #[test]
    fn entity_table_extends_entity_record() {
        let out = emit("%'Per-entity data.'\n#entity table Info { name : string; }\ntable Foo {}");
        assert!(out.contains("/// Per-entity data.\n#[derive(Debug, Clone)]\npub struct Entity {"));
        assert!(out.contains("    pub name: String,\n"));
        assert!(!out.contains("pub struct Info"));
        assert!(!out.contains("ComponentKind::Info"));
    }

    #[test]
    fn owner_reference_adds_owner_field() {
        let out = emit("#owner_reference table Foo { x : int; }");
        assert!(out.contains("    pub owner: Option<EntityId>,\n"));
        assert!(out.contains("        self.owner = Some(id);\n"));
    }

    #[test]
    fn includes_become_use_items() {
        let out = emit("include 'crate::math::Vec2';\ntable Foo { v : Vec2; }");
        assert!(out.contains("use crate::math::Vec2;\n"));
        assert!(out.contains("            v: Default::default(),\n"));
    }

    #[test]
    fn interface_implementors_include_indirect() {
        let out = emit(
            "interface I {}\n#implements_interface(I) interface J {}\n\
             #implements_interface(I) table A {}\n#implements_interface(J) table B {}\ntable C {}",
        );
        assert!(
            out.contains("Interface::I => &[ComponentKind::A, ComponentKind::B],"),
            "{}",
            out
        );
        assert!(out.contains("Interface::J => &[ComponentKind::B],"));
        assert!(out.contains("pub fn i_implementations(&self, id: EntityId)"));
    }

    #[test]
    fn member_functions_become_traits() {
        let out = emit(
            "interface Shape {\n %'Area in square units.'\n member_function 'fn area(&self) -> f32';\n}\n\
             table Body { member_function 'fn step(&mut self, dt: f32)'; }",
        );
        assert!(out.contains("pub trait Shape {\n    /// Area in square units.\n    fn area(&self) -> f32;\n}"));
        assert!(out.contains("pub trait BodyMethods {\n    fn step(&mut self, dt: f32);\n}"));
    }

    #[test]
    fn reset_hooks_and_transient_state() {
        let out = emit("alias Texture;\ntable Sprite { tex : *Texture; frames : *Texture[2]; }");
        assert!(out.contains("    fn reset_texture_ptr(&mut self, value: &mut Option<Rc<Texture>>);\n"));
        assert!(out.contains("        hooks.reset_texture_ptr(&mut self.tex);\n"));
        assert!(out.contains("        for value in self.frames.iter_mut() {\n"));
        assert!(out.contains("            frames: std::array::from_fn(|_| None),\n"));
    }

    #[test]
    fn records_without_reset_fields_have_no_transient_state() {
        let out = emit(
            "alias Texture;\n#entity table Info { hp : int; }\n\
             table Health { current : int; }\ntable Sprite { tex : *Texture; }",
        );
        assert!(!out.contains("impl Health {"));
        assert!(!out.contains("impl Entity {"));
        assert!(out.contains("impl Sprite {\n    /// Run the reset hook"));
        assert_eq!(out.matches("pub fn reset_transient_state").count(), 1);
        assert!(!out.contains("let _ = hooks;"));
    }

    #[test]
    fn entity_reset_fields_get_transient_state() {
        let out = emit("#entity table Info { #reset frame : uint; }");
        assert!(out.contains("impl Entity {\n    /// Run the reset hook"));
        assert!(out.contains("        hooks.reset_u32(&mut self.frame);\n"));
    }

    #[test]
    fn not_owning_pointer_has_no_hook() {
        let out = emit("table Foo { #not_owning peer : *Foo; }");
        assert!(out.contains("    pub peer: Option<Weak<Foo>>,\n"));
        assert!(!out.contains("hooks.reset_foo_ptr"));
    }

    #[test]
    fn empty_schema_still_declares_storage() {
        let out = emit("");
        assert!(out.contains("pub enum ComponentKind {\n}"));
        assert!(out.contains("pub const ALL: [ComponentKind; 0] = [];"));
        assert!(out.contains("Unused(std::marker::PhantomData<&'a ()>)"));
        assert!(out.contains("pub struct Storage {\n    pub entities: Vec<Entity>,\n}"));
    }

    #[test]
    fn aliases_become_type_items() {
        let out = emit("%'Fixed name.'\nalias Name : char[16];\nalias Texture;\ntable Foo { n : Name; }");
        assert!(out.contains("/// Fixed name.\npub type Name = [u8; 16];\n"));
        assert!(!out.contains("pub type Texture"));
        assert!(out.contains("            n: [0; 16],\n"));
    }
}
