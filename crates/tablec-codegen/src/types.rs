//! Mapping from schema type names to Rust types.
//!
//! A field's declared type goes through aliases until it reaches a builtin
//! scalar or an external type. The result records everything the emitters
//! need: the Rust type of the field, how to default it, which reset hook
//! handles it and whether it can be written to the save stream.

use tablec_core::naming::snake_case;
use tablec_core::{FieldType, Top};

use crate::error::CodegenError;

const MAX_ALIAS_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Str,
}

impl Scalar {
    pub fn from_name(name: &str) -> Option<Self> {
        let scalar = match name {
            "bool" => Scalar::Bool,
            "char" | "byte" | "u8" | "uint8" => Scalar::U8,
            "i8" | "int8" => Scalar::I8,
            "u16" | "ushort" | "uint16" => Scalar::U16,
            "i16" | "short" | "int16" => Scalar::I16,
            "u32" | "uint" | "uint32" => Scalar::U32,
            "i32" | "int" | "int32" => Scalar::I32,
            "u64" | "ulong" | "uint64" => Scalar::U64,
            "i64" | "long" | "int64" => Scalar::I64,
            "f32" | "float" => Scalar::F32,
            "f64" | "double" => Scalar::F64,
            "string" | "String" => Scalar::Str,
            _ => return None,
        };
        Some(scalar)
    }

    pub fn rust_type(self) -> &'static str {
        match self {
            Scalar::Bool => "bool",
            Scalar::U8 => "u8",
            Scalar::I8 => "i8",
            Scalar::U16 => "u16",
            Scalar::I16 => "i16",
            Scalar::U32 => "u32",
            Scalar::I32 => "i32",
            Scalar::U64 => "u64",
            Scalar::I64 => "i64",
            Scalar::F32 => "f32",
            Scalar::F64 => "f64",
            Scalar::Str => "String",
        }
    }

    pub fn default_expr(self) -> &'static str {
        match self {
            Scalar::Bool => "false",
            Scalar::F32 | Scalar::F64 => "0.0",
            Scalar::Str => "String::new()",
            _ => "0",
        }
    }

    /// Usable in `[expr; N]` array repeat expressions.
    pub fn is_copy(self) -> bool {
        self != Scalar::Str
    }
}

/// A declared type after alias resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    /// Rust type written in the record declaration.
    pub decl: String,
    /// Builtin scalar at the bottom of the alias chain, if any.
    pub scalar: Option<Scalar>,
    /// Element count of the value; 1 for scalars.
    pub count: u32,
    /// Expression used for the array length when `count > 1`.
    pub count_expr: String,
    /// True when the value holds pointers, directly or through an alias.
    pub pointer: bool,
    /// True when the declared field itself is the array (hooks run per element).
    pub own_array: bool,
    /// Type the reset hook receives.
    pub hook_type: String,
    pub hook_name: String,
}

impl ResolvedType {
    pub fn is_array(&self) -> bool {
        self.count > 1
    }

    pub fn default_expr(&self) -> String {
        if self.pointer {
            return if self.is_array() {
                "std::array::from_fn(|_| None)".to_owned()
            } else {
                "None".to_owned()
            };
        }
        match (self.scalar, self.is_array()) {
            (Some(s), false) => s.default_expr().to_owned(),
            (Some(s), true) if s.is_copy() => format!("[{}; {}]", s.default_expr(), self.count_expr),
            (_, true) => "std::array::from_fn(|_| Default::default())".to_owned(),
            (None, false) => "Default::default()".to_owned(),
        }
    }

    /// Stored in the save stream; pointers never are.
    pub fn is_wire_compatible(&self) -> bool {
        !self.pointer
    }
}

/// Resolve `ty` as declared on `owner` (used for error messages).
///
/// `count_expr` names the length of the field's own array, normally its
/// size constant. `not_owning` selects `Weak` for pointer fields.
pub fn resolve(
    top: &Top,
    owner: &str,
    ty: &FieldType,
    not_owning: bool,
    count_expr: Option<&str>,
) -> Result<ResolvedType, CodegenError> {
    resolve_at(top, owner, ty, not_owning, count_expr, 0)
}

fn resolve_at(
    top: &Top,
    owner: &str,
    ty: &FieldType,
    not_owning: bool,
    count_expr: Option<&str>,
    depth: usize,
) -> Result<ResolvedType, CodegenError> {
    if depth > MAX_ALIAS_DEPTH {
        return Err(CodegenError::AliasCycle(ty.base.clone()));
    }

    // What the base name stands for when used as a single value.
    let (inner, base) = match Scalar::from_name(&ty.base) {
        Some(scalar) => (scalar.rust_type().to_owned(), Base::Scalar(scalar)),
        None => match top.alias(&ty.base) {
            Some(alias) if !alias.is_forward_declaration() => {
                let target = resolve_at(top, &alias.name, &alias.ty, false, None, depth + 1)?;
                (alias.name.clone(), Base::Alias(Box::new(target)))
            }
            _ => (ty.base.clone(), Base::External),
        },
    };
    let own_count = count_expr
        .map(str::to_owned)
        .unwrap_or_else(|| ty.count.to_string());

    if ty.is_pointer {
        let wrapper = if not_owning { "Weak" } else { "Rc" };
        let element = format!("Option<{}<{}>>", wrapper, inner);
        let hook_name = format!("reset_{}_ptr", snake_case(&inner));
        let decl = if ty.is_array() {
            format!("[{}; {}]", element, own_count)
        } else {
            element.clone()
        };
        return Ok(ResolvedType {
            decl,
            scalar: None,
            count: ty.count,
            count_expr: own_count,
            pointer: true,
            own_array: ty.is_array(),
            hook_type: element,
            hook_name,
        });
    }

    let hook_name = format!("reset_{}", snake_case(&inner));
    match base {
        Base::Alias(target) if !ty.is_array() => Ok(ResolvedType {
            decl: inner.clone(),
            hook_type: inner,
            hook_name,
            own_array: false,
            ..*target
        }),
        Base::Alias(target) if target.is_array() => Err(CodegenError::NestedArray {
            owner: owner.to_owned(),
            alias: inner,
        }),
        base => {
            let (scalar, pointer) = match base {
                Base::Scalar(s) => (Some(s), false),
                Base::Alias(target) => (target.scalar, target.pointer),
                Base::External => (None, false),
            };
            let decl = if ty.is_array() {
                format!("[{}; {}]", inner, own_count)
            } else {
                inner.clone()
            };
            Ok(ResolvedType {
                decl,
                scalar,
                count: ty.count,
                count_expr: own_count,
                pointer,
                own_array: ty.is_array(),
                hook_type: inner,
                hook_name,
            })
        }
    }
}

enum Base {
    Scalar(Scalar),
    Alias(Box<ResolvedType>),
    External,
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "do", "dyn", "else", "enum",
    "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro",
    "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static", "struct",
    "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where",
    "while", "yield", "abstract", "become",
];

/// Keywords that cannot be written as raw identifiers.
const UNESCAPABLE: &[&str] = &["self", "Self", "super", "crate", "_"];

/// Field name as a Rust identifier, raw-escaped when it is a keyword.
pub fn rust_ident(name: &str, context: &str) -> Result<String, CodegenError> {
    if UNESCAPABLE.contains(&name) {
        return Err(CodegenError::ReservedName {
            name: name.to_owned(),
            context: context.to_owned(),
        });
    }
    if RUST_KEYWORDS.contains(&name) {
        Ok(format!("r#{}", name))
    } else {
        Ok(name.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablec_core::compile_source;

    fn field_type(src: &str, table: &str, field: &str) -> Result<ResolvedType, CodegenError> {
        let top = compile_source(src, "t.tbl").unwrap();
        let def = top.table(table).unwrap().field(field).unwrap().clone();
        let count = top
            .table(table)
            .unwrap()
            .size_constant(field)
            .map(|c| c.name.clone());
        resolve(&top, table, &def.ty, def.flags.not_owning, count.as_deref())
    }

    #[test]
    fn builtin_scalars() {
        let t = field_type("table Foo { x : int; }", "Foo", "x").unwrap();
        assert_eq!(t.decl, "i32");
        assert_eq!(t.default_expr(), "0");
        assert_eq!(t.scalar, Some(Scalar::I32));

        let t = field_type("table Foo { s : string; }", "Foo", "s").unwrap();
        assert_eq!(t.decl, "String");
        assert_eq!(t.default_expr(), "String::new()");
    }

    #[test]
    fn array_uses_size_constant() {
        let t = field_type("table Foo { tag : char[8]; }", "Foo", "tag").unwrap();
        assert_eq!(t.decl, "[u8; FOO_TAG_SIZE]");
        assert_eq!(t.default_expr(), "[0; FOO_TAG_SIZE]");
        assert!(t.own_array);
        assert_eq!(t.hook_type, "u8");
    }

    #[test]
    fn string_arrays_use_from_fn() {
        let t = field_type("table Foo { names : string[3]; }", "Foo", "names").unwrap();
        assert_eq!(
            t.default_expr(),
            "std::array::from_fn(|_| Default::default())"
        );
    }

    #[test]
    fn pointers_become_rc_or_weak() {
        let t = field_type("alias Texture;\ntable Foo { tex : *Texture; }", "Foo", "tex").unwrap();
        assert_eq!(t.decl, "Option<Rc<Texture>>");
        assert_eq!(t.hook_name, "reset_texture_ptr");
        assert_eq!(t.default_expr(), "None");
        assert!(!t.is_wire_compatible());

        let t = field_type(
            "alias Texture;\ntable Foo { #not_owning tex : *Texture; }",
            "Foo",
            "tex",
        )
        .unwrap();
        assert_eq!(t.decl, "Option<Weak<Texture>>");
    }

    #[test]
    fn alias_to_array_keeps_alias_name() {
        let t = field_type("alias Name : char[16];\ntable Foo { n : Name; }", "Foo", "n").unwrap();
        assert_eq!(t.decl, "Name");
        assert_eq!(t.count, 16);
        assert_eq!(t.count_expr, "16");
        assert_eq!(t.default_expr(), "[0; 16]");
        assert!(!t.own_array);
        assert_eq!(t.hook_name, "reset_name");
    }

    #[test]
    fn array_of_scalar_alias() {
        let t = field_type(
            "alias Meters : float;\ntable Foo { d : Meters[4]; }",
            "Foo",
            "d",
        )
        .unwrap();
        assert_eq!(t.decl, "[Meters; FOO_D_SIZE]");
        assert_eq!(t.default_expr(), "[0.0; FOO_D_SIZE]");
    }

    #[test]
    fn pointer_through_alias_is_not_serialized() {
        let t = field_type(
            "alias Texture;\nalias Handle : *Texture;\ntable Foo { h : Handle; }",
            "Foo",
            "h",
        )
        .unwrap();
        assert_eq!(t.decl, "Handle");
        assert!(t.pointer);
        assert!(!t.is_wire_compatible());
        assert_eq!(t.default_expr(), "None");
    }

    #[test]
    fn nested_arrays_are_rejected() {
        let err = field_type("alias Name : char[16];\ntable Foo { n : Name[2]; }", "Foo", "n")
            .unwrap_err();
        assert!(matches!(err, CodegenError::NestedArray { .. }));
    }

    #[test]
    fn alias_cycles_are_rejected() {
        let err = field_type("alias A : B;\nalias B : A;\ntable Foo { x : A; }", "Foo", "x")
            .unwrap_err();
        assert!(matches!(err, CodegenError::AliasCycle(_)));
    }

    #[test]
    fn external_types_default() {
        let t = field_type("table Foo { v : Vec2; }", "Foo", "v").unwrap();
        assert_eq!(t.decl, "Vec2");
        assert_eq!(t.default_expr(), "Default::default()");
        assert!(t.is_wire_compatible());
    }

    #[test]
    fn keywords_are_raw_escaped() {
        assert_eq!(rust_ident("type", "field").unwrap(), "r#type");
        assert_eq!(rust_ident("speed", "field").unwrap(), "speed");
        assert!(rust_ident("self", "field").is_err());
    }
}
