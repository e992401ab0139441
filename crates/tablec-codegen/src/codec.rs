//! Codec artifact: `save` and `load` over the hashed-key chunk format.
//!
//! The entity section is positional; every component chunk is keyed so a
//! loader built from an older schema can skip what it does not know.

use crate::config::CodegenConfig;
use crate::schema::{CgField, CgTable, CodegenSchema};

pub fn emit_codec(schema: &CodegenSchema<'_>, module_name: &str, config: &CodegenConfig) -> String {
    let mut out = String::new();
    out.push_str("// @generated by tablec. Do not edit by hand.\n\n");
    out.push_str("use std::io::{Read, Write};\n\n");
    out.push_str(&format!(
        "use {}::{{Reader, WireError, Writer}};\n\n",
        config.runtime_crate
    ));
    out.push_str("#[allow(unused_imports)]\n");
    out.push_str(&format!("use super::{}::*;\n\n", module_name));

    emit_key_constants(schema, &mut out);
    emit_save(schema, &mut out);
    emit_load(schema, &mut out);
    out
}

fn emit_key_constants(schema: &CodegenSchema<'_>, out: &mut String) {
    for table in schema.serialized_components() {
        let Some(key) = &table.key else {
            continue;
        };
        out.push_str(&format!(
            "pub const {}: u64 = {:#018x};\n",
            key.const_name, key.value
        ));
        for field in table.serialized_fields() {
            if let Some(field_key) = &field.key {
                out.push_str(&format!(
                    "pub const {}: u64 = {:#018x};\n",
                    field_key.const_name, field_key.value
                ));
            }
        }
        out.push('\n');
    }
}

// ──────────────────────────────────────────────
// save
// ──────────────────────────────────────────────

fn emit_save(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str("/// Write the active entities and every persisted component table.\n");
    out.push_str(
        "pub fn save<W: Write>(storage: &Storage, out: W) -> Result<(), WireError> {\n",
    );
    out.push_str("    let mut writer = Writer::new(out);\n");
    out.push_str("    writer.write_header()?;\n\n");

    let entity_fields: Vec<&CgField<'_>> = schema
        .entity
        .iter()
        .flat_map(|t| t.serialized_fields())
        .collect();
    out.push_str("    let live: Vec<&Entity> = storage.entities.iter().filter(|e| e.active).collect();\n");
    out.push_str("    writer.write_entity_count(live.len())?;\n");
    out.push_str("    for entity in live {\n");
    out.push_str("        writer.write_entity_id(entity.id)?;\n");
    for field in &entity_fields {
        if field.ty.is_array() {
            out.push_str(&format!(
                "        writer.write_array(&entity.{}[..], {})?;\n",
                field.ident, field.ty.count_expr
            ));
        } else {
            out.push_str(&format!(
                "        writer.write_value(&entity.{})?;\n",
                field.ident
            ));
        }
    }
    out.push_str("    }\n");

    for table in schema.serialized_components() {
        emit_save_chunk(table, out);
    }
    out.push('\n');
    out.push_str("    writer.finish()?;\n");
    out.push_str("    Ok(())\n");
    out.push_str("}\n\n");
}

fn emit_save_chunk(table: &CgTable<'_>, out: &mut String) {
    let Some(key) = &table.key else {
        return;
    };
    let storage = &table.def.storage_name;
    let fields: Vec<&CgField<'_>> = table.serialized_fields().collect();
    out.push('\n');
    out.push_str(&format!(
        "    writer.begin_chunk({}, storage.{}.len())?;\n",
        key.const_name, storage
    ));
    if fields.is_empty() {
        out.push_str(&format!("    for id in storage.{}.keys() {{\n", storage));
        out.push_str("        writer.begin_entry(*id, 0)?;\n");
        out.push_str("    }\n");
        return;
    }
    out.push_str(&format!("    for (id, record) in &storage.{} {{\n", storage));
    out.push_str(&format!("        writer.begin_entry(*id, {})?;\n", fields.len()));
    for field in fields {
        let Some(field_key) = &field.key else {
            continue;
        };
        if field.ty.is_array() {
            out.push_str(&format!(
                "        writer.write_array_field({}, &record.{}[..], {})?;\n",
                field_key.const_name, field.ident, field.ty.count_expr
            ));
        } else {
            out.push_str(&format!(
                "        writer.write_field({}, &record.{})?;\n",
                field_key.const_name, field.ident
            ));
        }
    }
    out.push_str("    }\n");
}

// ──────────────────────────────────────────────
// load
// ──────────────────────────────────────────────

fn emit_load(schema: &CodegenSchema<'_>, out: &mut String) {
    out.push_str("/// Read a stream written by `save` from this or any other version of the schema.\n");
    out.push_str("///\n");
    out.push_str("/// Unknown tables and fields are skipped; fields missing from the stream keep\n");
    out.push_str("/// their defaults. Any error discards the partially loaded state.\n");
    out.push_str("pub fn load<R: Read>(input: R) -> Result<Storage, WireError> {\n");
    out.push_str("    let mut reader = Reader::new(input);\n");
    out.push_str("    reader.read_header()?;\n");
    out.push_str("    let mut storage = Storage::new();\n\n");

    let entity_fields: Vec<&CgField<'_>> = schema
        .entity
        .iter()
        .flat_map(|t| t.serialized_fields())
        .collect();
    out.push_str("    let entity_count = reader.read_entity_count()?;\n");
    out.push_str("    for _ in 0..entity_count {\n");
    out.push_str("        let id = reader.read_entity_id()?;\n");
    out.push_str("        let entity = storage.slot_mut(id);\n");
    out.push_str("        entity.active = true;\n");
    for field in &entity_fields {
        if field.ty.is_array() {
            out.push_str(&format!(
                "        reader.read_array_into(&mut entity.{}[..])?;\n",
                field.ident
            ));
        } else {
            out.push_str(&format!(
                "        entity.{} = reader.read_value()?;\n",
                field.ident
            ));
        }
    }
    out.push_str("    }\n\n");

    out.push_str("    while let Some(chunk) = reader.next_chunk()? {\n");
    out.push_str("        match chunk.key {\n");
    for table in schema.serialized_components() {
        emit_load_chunk(table, out);
    }
    out.push_str("            _ => reader.skip_chunk(&chunk)?,\n");
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("    Ok(storage)\n");
    out.push_str("}\n");
}

fn emit_load_chunk(table: &CgTable<'_>, out: &mut String) {
    let Some(key) = &table.key else {
        return;
    };
    out.push_str(&format!("            {} => {{\n", key.const_name));
    out.push_str("                for _ in 0..chunk.entries {\n");
    out.push_str("                    let entry = reader.begin_entry()?;\n");
    out.push_str(&format!(
        "                    let mut record = {}::default();\n",
        table.name()
    ));
    out.push_str("                    record.bind(entry.id);\n");
    out.push_str("                    for _ in 0..entry.fields {\n");
    out.push_str("                        let field = reader.read_field_header()?;\n");
    out.push_str("                        match field.key {\n");
    for field in table.serialized_fields() {
        let Some(field_key) = &field.key else {
            continue;
        };
        if field.ty.is_array() {
            out.push_str(&format!(
                "                            {} => reader.read_array_field(&field, &mut record.{}[..])?,\n",
                field_key.const_name, field.ident
            ));
        } else {
            out.push_str(&format!(
                "                            {} => record.{} = reader.read_field(&field)?,\n",
                field_key.const_name, field.ident
            ));
        }
    }
    out.push_str("                            _ => reader.skip_field(&field)?,\n");
    out.push_str("                        }\n");
    out.push_str("                    }\n");
    out.push_str(&format!(
        "                    storage.{}.insert(entry.id, record);\n",
        table.def.storage_name
    ));
    out.push_str("                }\n");
    out.push_str("            }\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablec_core::compile_source;
    use tablec_wire::{key_of, DEFAULT_SEED};

    fn emit(src: &str) -> String {
        let top = compile_source(src, "t.tbl").unwrap();
        let config = CodegenConfig::default();
        let schema = CodegenSchema::from_top(&top, &config).unwrap();
        emit_codec(&schema, "world", &config)
    }

    #[test]
    fn imports_follow_module_and_runtime() {
        let top = compile_source("table Foo {}", "t.tbl").unwrap();
        let config = CodegenConfig {
            runtime_crate: "engine::wire".into(),
            ..CodegenConfig::default()
        };
        let schema = CodegenSchema::from_top(&top, &config).unwrap();
        let out = emit_codec(&schema, "game_state", &config);
        assert!(out.contains("use engine::wire::{Reader, WireError, Writer};"));
        assert!(out.contains("use super::game_state::*;"));
    }

    #[test]
    fn key_constants_are_hashed_names() {
        let out = emit("table Foo { x : int; }");
        assert!(out.contains(&format!(
            "pub const TABLE_FOO_KEY: u64 = {:#018x};",
            key_of("Foo", DEFAULT_SEED)
        )));
        assert!(out.contains(&format!(
            "pub const FIELD_FOO_X_KEY: u64 = {:#018x};",
            key_of("x", DEFAULT_SEED)
        )));
    }

    #[test]
    fn memory_only_and_pointer_fields_are_not_written() {
        let out = emit(
            "alias Texture;\ntable Sprite { tex : *Texture; #memory_only frame : int; x : int; }\n\
             #memory_only table Cache { n : int; }",
        );
        assert!(out.contains("writer.begin_entry(*id, 1)?;"));
        assert!(out.contains("writer.write_field(FIELD_SPRITE_X_KEY, &record.x)?;"));
        assert!(!out.contains("record.tex"));
        assert!(!out.contains("record.frame"));
        assert!(!out.contains("caches"));
    }

    #[test]
    fn arrays_use_their_bound() {
        let out = emit("table Foo { tag : char[8]; }");
        assert!(out.contains("writer.write_array_field(FIELD_FOO_TAG_KEY, &record.tag[..], FOO_TAG_SIZE)?;"));
        assert!(out.contains("FIELD_FOO_TAG_KEY => reader.read_array_field(&field, &mut record.tag[..])?,"));
    }

    #[test]
    fn entity_fields_are_positional() {
        let out = emit("alias Name : char[4];\n#entity table Info { name : Name; hp : int; }");
        assert!(out.contains("        writer.write_array(&entity.name[..], 4)?;\n        writer.write_value(&entity.hp)?;\n"));
        assert!(out.contains("        reader.read_array_into(&mut entity.name[..])?;\n        entity.hp = reader.read_value()?;\n"));
    }

    #[test]
    fn unknown_keys_are_skipped() {
        let out = emit("table Foo { x : int; }");
        assert!(out.contains("_ => reader.skip_field(&field)?,"));
        assert!(out.contains("_ => reader.skip_chunk(&chunk)?,"));
    }

    #[test]
    fn tables_without_fields_still_write_entries() {
        let out = emit("table Tag {}");
        assert!(out.contains("for id in storage.tags.keys() {"));
        assert!(out.contains("writer.begin_entry(*id, 0)?;"));
    }
}
