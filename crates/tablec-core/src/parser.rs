//! Schema grammar.
//!
//! A single recursive-descent pass over the token list that either builds a
//! complete [`Top`] or stops at the first grammar error with a positioned
//! [`Diagnostic`]. Grammar validation (see [`crate::validate`]) runs this
//! same code and discards the model, so the two can never disagree.
//!
//! ```text
//! top       := (doc | topattr | table | interface | alias | include)*
//! table     := attr* 'table' NAME [NAME] '{' member* '}'
//! interface := attr* 'interface' NAME [NAME] '{' member* '}'
//! member    := doc | memberfn | field
//! field     := attr* NAME ':' type ';'
//! type      := ['*'] NAME ['[' NUMBER ']']
//! attr      := '#' NAME [ '(' NAME ')' ]
//! alias     := 'alias' NAME [':' type] ';'
//! include   := 'include' "'" PATH "'" [';']
//! doc       := '%' "'" TEXT "'"
//! memberfn  := 'member_function' "'" TEXT "'" ';'
//! ```

use crate::ast::{
    FieldDef, FieldFlags, FieldType, MemberFunction, SizeConstant, TableDef, TableFlags, Top,
    TypeAlias,
};
use crate::cursor::Cursor;
use crate::error::Diagnostic;
use crate::lexer::{Keyword, Punct, Token, TokenKind};
use crate::naming;

// ──────────────────────────────────────────────
// Attribute allow-lists
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Param {
    Forbidden,
    Required,
}

const TABLE_ATTRIBUTES: &[(&str, Param)] = &[
    ("memory_only", Param::Forbidden),
    ("owner_reference", Param::Forbidden),
    ("entity", Param::Forbidden),
    ("implements_interface", Param::Required),
];

const FIELD_ATTRIBUTES: &[(&str, Param)] = &[
    ("memory_only", Param::Forbidden),
    ("reset", Param::Forbidden),
    ("not_owning", Param::Forbidden),
];

#[derive(Debug, Clone)]
struct Attribute {
    name: String,
    param: Option<String>,
    line: u32,
    column: u32,
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    cursor: Cursor<'a>,
    file: String,
    /// Documentation waiting for the next declaration.
    pending_doc: Option<String>,
}

/// Parse a token list into the schema model.
pub fn parse(tokens: &[Token], file: &str) -> Result<Top, Diagnostic> {
    let mut parser = Parser {
        cursor: Cursor::new(tokens),
        file: file.to_owned(),
        pending_doc: None,
    };
    parser.parse_top()
}

impl<'a> Parser<'a> {
    fn err_at(&self, token: &Token, message: impl Into<String>) -> Diagnostic {
        Diagnostic::grammar(&self.file, token.line, token.column, message)
    }

    fn err(&self, message: impl Into<String>) -> Diagnostic {
        self.err_at(self.cursor.peek(), message)
    }

    fn expect_punct(&mut self, punct: Punct, context: &str) -> Result<(), Diagnostic> {
        if self.cursor.peek().is_punct(punct) {
            self.cursor.advance();
            Ok(())
        } else {
            Err(self.err(format!(
                "expected '{}' {}, got {}",
                punct.as_char(),
                context,
                self.cursor.peek().describe()
            )))
        }
    }

    /// Consume an identifier word, returning it with its position.
    fn take_identifier(&mut self, what: &str) -> Result<(String, u32, u32), Diagnostic> {
        let tok = self.cursor.peek();
        if tok.kind == TokenKind::Word && naming::is_identifier(&tok.text) {
            let taken = (tok.text.clone(), tok.line, tok.column);
            self.cursor.advance();
            return Ok(taken);
        }
        let message = match tok.kind {
            TokenKind::Keyword(k) => format!(
                "expected {}, got keyword '{}' (keywords cannot be used as names)",
                what,
                k.as_str()
            ),
            _ => format!("expected {}, got {}", what, tok.describe()),
        };
        Err(self.err(message))
    }

    // -- Top level ------------------------------------------------

    fn parse_top(&mut self) -> Result<Top, Diagnostic> {
        let mut top = Top::default();

        loop {
            let tok = self.cursor.peek().clone();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Word if tok.text == "%" => {
                    let doc = self.parse_doc()?;
                    self.push_doc(doc);
                }
                TokenKind::Punct(Punct::Hash) => {
                    let mut attrs = Vec::new();
                    while self.cursor.peek().is_punct(Punct::Hash) {
                        attrs.push(self.parse_attribute(TABLE_ATTRIBUTES, "table")?);
                    }
                    let next = self.cursor.peek();
                    if next.is_keyword(Keyword::Table) {
                        top.tables.push(self.parse_table(attrs, false)?);
                    } else if next.is_keyword(Keyword::Interface) {
                        top.tables.push(self.parse_table(attrs, true)?);
                    } else {
                        return Err(self.err(format!(
                            "attributes must be followed by 'table' or 'interface', got {}",
                            next.describe()
                        )));
                    }
                }
                TokenKind::Keyword(Keyword::Table) => {
                    top.tables.push(self.parse_table(Vec::new(), false)?);
                }
                TokenKind::Keyword(Keyword::Interface) => {
                    top.tables.push(self.parse_table(Vec::new(), true)?);
                }
                TokenKind::Keyword(Keyword::Alias) => {
                    top.aliases.push(self.parse_alias()?);
                }
                TokenKind::Keyword(Keyword::Include) => {
                    top.includes.push(self.parse_include()?);
                }
                _ => {
                    return Err(self.err_at(
                        &tok,
                        format!(
                            "unexpected {} at top level; expected a table, interface, alias, \
                             include, attribute or documentation comment",
                            tok.describe()
                        ),
                    ));
                }
            }
        }

        if self.pending_doc.is_some() {
            tracing::debug!(file = %self.file, "trailing documentation comment has no declaration");
        }
        Ok(top)
    }

    fn push_doc(&mut self, doc: String) {
        match &mut self.pending_doc {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(&doc);
            }
            None => self.pending_doc = Some(doc),
        }
    }

    // -- Quoted text ----------------------------------------------

    fn parse_quoted(&mut self, what: &str) -> Result<String, Diagnostic> {
        self.expect_punct(Punct::Quote, &format!("to open {}", what))?;
        let tok = self.cursor.peek().clone();
        if tok.kind != TokenKind::Literal {
            return Err(self.err_at(&tok, format!("expected {}, got {}", what, tok.describe())));
        }
        self.cursor.advance();
        if !self.cursor.peek().is_punct(Punct::Quote) {
            return Err(self.err_at(
                &tok,
                format!("unterminated {} (missing closing quote)", what),
            ));
        }
        self.cursor.advance();
        Ok(tok.text)
    }

    fn parse_doc(&mut self) -> Result<String, Diagnostic> {
        // the '%' marker
        self.cursor.advance();
        let text = self.parse_quoted("documentation text")?;
        Ok(text.trim().to_owned())
    }

    // -- Attributes -----------------------------------------------

    fn parse_attribute(
        &mut self,
        allowed: &[(&str, Param)],
        target: &str,
    ) -> Result<Attribute, Diagnostic> {
        let hash = self.cursor.advance().clone();
        let (name, _, _) = self.take_identifier("attribute name after '#'")?;

        let Some(&(_, rule)) = allowed.iter().find(|(n, _)| *n == name) else {
            let names: Vec<&str> = allowed.iter().map(|(n, _)| *n).collect();
            return Err(self.err_at(
                &hash,
                format!(
                    "unknown {} attribute '{}'; expected one of: {}",
                    target,
                    name,
                    names.join(", ")
                ),
            ));
        };

        let param = if self.cursor.peek().is_punct(Punct::LParen) {
            if rule == Param::Forbidden {
                return Err(self.err(format!("attribute '{}' does not take a parameter", name)));
            }
            self.cursor.advance();
            let (param, _, _) =
                self.take_identifier(&format!("parameter of attribute '{}'", name))?;
            self.expect_punct(
                Punct::RParen,
                &format!("to close parameter of attribute '{}'", name),
            )?;
            Some(param)
        } else {
            if rule == Param::Required {
                return Err(self.err(format!(
                    "attribute '{}' requires a parameter, e.g. #{}(Name)",
                    name, name
                )));
            }
            None
        };

        Ok(Attribute {
            name,
            param,
            line: hash.line,
            column: hash.column,
        })
    }

    // -- Tables and interfaces ------------------------------------

    fn parse_table(
        &mut self,
        attrs: Vec<Attribute>,
        is_interface: bool,
    ) -> Result<TableDef, Diagnostic> {
        let doc = self.pending_doc.take();
        let keyword = self.cursor.advance().clone();
        let what = if is_interface { "interface" } else { "table" };

        let (name, _, _) = self.take_identifier(&format!("{} name", what))?;
        let storage_name = if self.cursor.peek().kind == TokenKind::Word {
            self.take_identifier(&format!("storage variable name for '{}'", name))?
                .0
        } else {
            naming::storage_name(&name)
        };

        let mut flags = TableFlags {
            is_interface,
            ..TableFlags::default()
        };
        let mut implements = None;
        for attr in &attrs {
            match attr.name.as_str() {
                "memory_only" => flags.memory_only = true,
                "owner_reference" => flags.owner_reference = true,
                "entity" => flags.entity = true,
                "implements_interface" => {
                    if implements.is_some() {
                        return Err(Diagnostic::grammar(
                            &self.file,
                            attr.line,
                            attr.column,
                            format!("{} '{}' names more than one parent interface", what, name),
                        ));
                    }
                    implements = attr.param.clone();
                }
                _ => {}
            }
        }

        self.expect_punct(
            Punct::LBrace,
            &format!("to open the body of {} '{}'", what, name),
        )?;

        let mut fields = Vec::new();
        let mut member_functions = Vec::new();
        loop {
            let tok = self.cursor.peek().clone();
            match tok.kind {
                TokenKind::Punct(Punct::RBrace) => {
                    self.cursor.advance();
                    break;
                }
                TokenKind::Eof => {
                    return Err(self.err_at(
                        &tok,
                        format!("unterminated body of {} '{}' (missing '}}')", what, name),
                    ));
                }
                TokenKind::Word if tok.text == "%" => {
                    let doc = self.parse_doc()?;
                    self.push_doc(doc);
                }
                TokenKind::Keyword(Keyword::MemberFunction) => {
                    member_functions.push(self.parse_member_function()?);
                }
                TokenKind::Punct(Punct::Hash) | TokenKind::Word => {
                    fields.push(self.parse_field()?);
                }
                _ => {
                    return Err(self.err_at(
                        &tok,
                        format!(
                            "unexpected {} in body of {} '{}'; expected a field, \
                             member_function, documentation comment or '}}'",
                            tok.describe(),
                            what,
                            name
                        ),
                    ));
                }
            }
        }
        // Documentation dangling at the end of a body belongs to nothing.
        self.pending_doc = None;

        let size_constants = fields
            .iter()
            .filter(|f: &&FieldDef| f.ty.is_array())
            .map(|f| SizeConstant {
                name: naming::size_constant_name(&name, &f.name),
                field: f.name.clone(),
                value: f.ty.count,
            })
            .collect();

        Ok(TableDef {
            name,
            storage_name,
            fields,
            size_constants,
            implements,
            member_functions,
            flags,
            doc,
            line: keyword.line,
            column: keyword.column,
        })
    }

    fn parse_member_function(&mut self) -> Result<MemberFunction, Diagnostic> {
        let doc = self.pending_doc.take();
        self.cursor.advance();
        let signature = self.parse_quoted("member function signature")?;
        self.expect_punct(Punct::Semicolon, "after member function signature")?;
        Ok(MemberFunction {
            signature: signature.trim().to_owned(),
            doc,
        })
    }

    // -- Fields and types -----------------------------------------

    fn parse_field(&mut self) -> Result<FieldDef, Diagnostic> {
        let doc = self.pending_doc.take();
        let mut flags = FieldFlags::default();
        while self.cursor.peek().is_punct(Punct::Hash) {
            let attr = self.parse_attribute(FIELD_ATTRIBUTES, "field")?;
            match attr.name.as_str() {
                "memory_only" => flags.memory_only = true,
                "reset" => flags.reset = true,
                "not_owning" => flags.not_owning = true,
                _ => {}
            }
        }

        let (name, line, column) = self.take_identifier("field name")?;
        self.expect_punct(Punct::Colon, &format!("after field name '{}'", name))?;
        let ty = self.parse_type_spec(&format!("field '{}'", name))?;
        self.expect_punct(Punct::Semicolon, &format!("after field '{}'", name))?;

        // Pointers are never serialized or released automatically.
        if ty.is_pointer {
            flags.memory_only = true;
            flags.reset = true;
        }

        Ok(FieldDef {
            name,
            ty,
            flags,
            doc,
            line,
            column,
        })
    }

    fn parse_type_spec(&mut self, owner: &str) -> Result<FieldType, Diagnostic> {
        let is_pointer = if self.cursor.peek().is_word("*") {
            self.cursor.advance();
            true
        } else {
            false
        };

        let (base, _, _) = self.take_identifier(&format!("a type for {}", owner))?;

        let count = if self.cursor.peek().is_punct(Punct::LBracket) {
            self.cursor.advance();
            let tok = self.cursor.peek().clone();
            let count = match tok.text.parse::<u32>() {
                Ok(n) if n >= 1 && tok.kind == TokenKind::Word => n,
                _ => {
                    return Err(self.err_at(
                        &tok,
                        format!(
                            "array size of {} must be a positive integer, got {}",
                            owner,
                            tok.describe()
                        ),
                    ));
                }
            };
            self.cursor.advance();
            self.expect_punct(Punct::RBracket, &format!("to close array size of {}", owner))?;
            count
        } else {
            1
        };

        Ok(FieldType {
            base,
            count,
            is_pointer,
        })
    }

    // -- Aliases and includes -------------------------------------

    fn parse_alias(&mut self) -> Result<TypeAlias, Diagnostic> {
        let doc = self.pending_doc.take();
        self.cursor.advance();
        let (name, line, column) = self.take_identifier("alias name")?;

        let ty = if self.cursor.peek().is_punct(Punct::Colon) {
            self.cursor.advance();
            self.parse_type_spec(&format!("alias '{}'", name))?
        } else {
            FieldType::scalar(name.clone())
        };
        self.expect_punct(Punct::Semicolon, &format!("after alias '{}'", name))?;

        Ok(TypeAlias {
            name,
            ty,
            doc,
            line,
            column,
        })
    }

    fn parse_include(&mut self) -> Result<String, Diagnostic> {
        self.pending_doc = None;
        self.cursor.advance();
        let path = self.parse_quoted("include path")?;
        let path = path.trim().to_owned();
        if path.is_empty() {
            return Err(self.err("include path is empty"));
        }
        if self.cursor.peek().is_punct(Punct::Semicolon) {
            self.cursor.advance();
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_src(src: &str) -> Result<Top, Diagnostic> {
        parse(&lex(src), "test.tbl")
    }

    fn parse_ok(src: &str) -> Top {
        parse_src(src).unwrap_or_else(|d| panic!("unexpected diagnostic: {}", d))
    }

    fn parse_err(src: &str) -> Diagnostic {
        match parse_src(src) {
            Ok(top) => panic!("expected a diagnostic, got {:?}", top),
            Err(d) => d,
        }
    }

    #[test]
    fn basic_table_with_scalar_and_array() {
        let top = parse_ok("table Foo { x : int; tag : char[8]; }");
        assert_eq!(top.tables.len(), 1);
        let foo = &top.tables[0];
        assert_eq!(foo.name, "Foo");
        assert_eq!(foo.storage_name, "foos");
        assert_eq!(foo.fields.len(), 2);
        assert_eq!(foo.fields[0].ty, FieldType::scalar("int"));
        assert_eq!(foo.fields[1].ty.count, 8);
        assert_eq!(
            foo.size_constants,
            vec![SizeConstant {
                name: "FOO_TAG_SIZE".into(),
                field: "tag".into(),
                value: 8,
            }]
        );
    }

    #[test]
    fn explicit_storage_name_is_kept() {
        let top = parse_ok("table Enemy horde { hp : int; }");
        assert_eq!(top.tables[0].storage_name, "horde");
    }

    #[test]
    fn tables_and_interfaces_in_source_order() {
        let top = parse_ok(
            "interface Drawable {}\n table A { x : int; }\n #implements_interface(Drawable) table B {}\n interface Other {}",
        );
        let names: Vec<&str> = top.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Drawable", "A", "B", "Other"]);
        assert!(top.tables[0].flags.is_interface);
        assert!(!top.tables[1].flags.is_interface);
        assert_eq!(top.tables[2].implements.as_deref(), Some("Drawable"));
    }

    #[test]
    fn pointer_fields_are_memory_only_and_reset() {
        let top = parse_ok("table Sprite { tex : *Texture; }");
        let field = &top.tables[0].fields[0];
        assert!(field.ty.is_pointer);
        assert!(field.flags.memory_only);
        assert!(field.flags.reset);
        assert!(!field.is_serializable());
    }

    #[test]
    fn field_attributes_are_recorded() {
        let top = parse_ok("table T { #memory_only #reset cache : Cache; #not_owning #reset peer : *T; }");
        let t = &top.tables[0];
        assert!(t.fields[0].flags.memory_only);
        assert!(t.fields[0].flags.reset);
        assert!(t.fields[0].flags.needs_reset_hook());
        assert!(t.fields[1].flags.not_owning);
        assert!(!t.fields[1].flags.needs_reset_hook());
    }

    #[test]
    fn table_attributes_set_flags() {
        let top = parse_ok("#memory_only #owner_reference table Cache {}\n#entity table Info {}");
        assert!(top.tables[0].flags.memory_only);
        assert!(top.tables[0].flags.owner_reference);
        assert!(top.tables[1].flags.entity);
        assert!(!top.tables[1].is_component());
    }

    #[test]
    fn aliases_and_forward_declarations() {
        let top = parse_ok("alias Texture;\nalias Name : char[16];\nalias Handle : *Texture;");
        assert_eq!(top.aliases.len(), 3);
        assert!(top.aliases[0].is_forward_declaration());
        assert_eq!(top.aliases[1].ty.count, 16);
        assert!(top.aliases[2].ty.is_pointer);
    }

    #[test]
    fn includes_keep_order() {
        let top = parse_ok("include 'crate::math::Vec2'\ninclude 'crate::gfx::Texture';");
        assert_eq!(top.includes, vec!["crate::math::Vec2", "crate::gfx::Texture"]);
    }

    #[test]
    fn docs_attach_to_next_declaration() {
        let top = parse_ok(
            "%'A moving thing.'\ntable Body {\n %'Metres per second.'\n speed : float;\n %'Advance.'\n member_function 'fn step(&mut self)';\n}",
        );
        let body = &top.tables[0];
        assert_eq!(body.doc.as_deref(), Some("A moving thing."));
        assert_eq!(body.fields[0].doc.as_deref(), Some("Metres per second."));
        assert_eq!(
            body.member_functions[0].doc.as_deref(),
            Some("Advance.")
        );
        assert_eq!(body.member_functions[0].signature, "fn step(&mut self)");
    }

    #[test]
    fn missing_field_type_reports_field_line() {
        let d = parse_err("table Foo {\n  x : ;\n}");
        assert_eq!(d.line, 2);
        assert!(d.message.contains("field 'x'"), "{}", d.message);
    }

    #[test]
    fn unknown_field_attribute_is_rejected() {
        let d = parse_err("table Foo { #shiny x : int; }");
        assert!(d.message.contains("unknown field attribute 'shiny'"), "{}", d.message);
    }

    #[test]
    fn parameter_rules_are_enforced() {
        let d = parse_err("#implements_interface table Foo {}");
        assert!(d.message.contains("requires a parameter"), "{}", d.message);
        let d = parse_err("#memory_only(Yes) table Foo {}");
        assert!(d.message.contains("does not take a parameter"), "{}", d.message);
        let d = parse_err("table Foo { #reset(x) y : int; }");
        assert!(d.message.contains("does not take a parameter"), "{}", d.message);
    }

    #[test]
    fn attributes_must_precede_a_table() {
        let d = parse_err("#memory_only alias X;");
        assert!(d.message.contains("must be followed by 'table'"), "{}", d.message);
    }

    #[test]
    fn two_parents_are_rejected() {
        let d = parse_err("#implements_interface(A) #implements_interface(B) table C {}");
        assert!(d.message.contains("more than one parent"), "{}", d.message);
    }

    #[test]
    fn array_size_must_be_positive() {
        let d = parse_err("table Foo { a : int[0]; }");
        assert!(d.message.contains("positive integer"), "{}", d.message);
        let d = parse_err("table Foo { a : int[n]; }");
        assert!(d.message.contains("positive integer"), "{}", d.message);
    }

    #[test]
    fn unterminated_body_is_reported() {
        let d = parse_err("table Foo { x : int;");
        assert!(d.message.contains("missing '}'"), "{}", d.message);
    }

    #[test]
    fn unterminated_quote_is_reported() {
        let d = parse_err("table Foo { member_function 'fn x(&self);\n}");
        assert!(d.message.contains("unterminated"), "{}", d.message);
    }

    #[test]
    fn keyword_as_name_is_reported() {
        let d = parse_err("table table {}");
        assert!(d.message.contains("keywords cannot be used"), "{}", d.message);
    }

    #[test]
    fn member_function_requires_semicolon() {
        let d = parse_err("interface I { member_function 'fn f(&self)' }");
        assert!(d.message.contains("expected ';'"), "{}", d.message);
    }

    #[test]
    fn stray_top_level_token_is_reported() {
        let d = parse_err("table A {}\n;");
        assert_eq!((d.line, d.column), (2, 1));
        assert!(d.message.contains("top level"), "{}", d.message);
    }

    #[test]
    fn empty_schema_is_valid() {
        let top = parse_ok("");
        assert!(top.tables.is_empty());
        assert!(top.aliases.is_empty());
    }
}
