//! Schema lexer.
//!
//! Turns schema text into a flat token list terminated by a single
//! [`TokenKind::Eof`] token. Lexing never fails: anything that is not
//! punctuation, a keyword or quoted text becomes a [`TokenKind::Word`] and
//! the grammar rejects it by context.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Keyword {
    Table,
    Interface,
    Alias,
    Include,
    MemberFunction,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "table" => Some(Keyword::Table),
            "interface" => Some(Keyword::Interface),
            "alias" => Some(Keyword::Alias),
            "include" => Some(Keyword::Include),
            "member_function" => Some(Keyword::MemberFunction),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Table => "table",
            Keyword::Interface => "interface",
            Keyword::Alias => "alias",
            Keyword::Include => "include",
            Keyword::MemberFunction => "member_function",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Punct {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Semicolon,
    Hash,
    LParen,
    RParen,
    Quote,
}

impl Punct {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '{' => Some(Punct::LBrace),
            '}' => Some(Punct::RBrace),
            '[' => Some(Punct::LBracket),
            ']' => Some(Punct::RBracket),
            ':' => Some(Punct::Colon),
            ';' => Some(Punct::Semicolon),
            '#' => Some(Punct::Hash),
            '(' => Some(Punct::LParen),
            ')' => Some(Punct::RParen),
            '\'' => Some(Punct::Quote),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Punct::LBrace => '{',
            Punct::RBrace => '}',
            Punct::LBracket => '[',
            Punct::RBracket => ']',
            Punct::Colon => ':',
            Punct::Semicolon => ';',
            Punct::Hash => '#',
            Punct::LParen => '(',
            Punct::RParen => ')',
            Punct::Quote => '\'',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Identifiers, numbers, `*`, `%` and anything unrecognized.
    Word,
    Keyword(Keyword),
    Punct(Punct),
    /// Verbatim text between two quote tokens.
    Literal,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, column: u32) -> Self {
        Token {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    pub fn eof(line: u32, column: u32) -> Self {
        Token::new(TokenKind::Eof, "", line, column)
    }

    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// True for a `Word` token whose text is exactly `text`.
    pub fn is_word(&self, text: &str) -> bool {
        self.kind == TokenKind::Word && self.text == text
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Short human description used in diagnostics.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Word => format!("'{}'", self.text),
            TokenKind::Keyword(k) => format!("keyword '{}'", k.as_str()),
            TokenKind::Punct(p) => format!("'{}'", p.as_char()),
            TokenKind::Literal => "quoted text".to_owned(),
            TokenKind::Eof => "end of input".to_owned(),
        }
    }
}

/// Characters that terminate a word. `*` and `%` are words of their own.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '*' || c == '%' || Punct::from_char(c).is_some()
}

pub fn lex(src: &str) -> Vec<Token> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut line: u32 = 1;
    let mut column: u32 = 1;

    while pos < chars.len() {
        let c = chars[pos];

        if c == '\n' {
            line += 1;
            column = 1;
            pos += 1;
            continue;
        }
        if c.is_whitespace() {
            column += 1;
            pos += 1;
            continue;
        }

        let (tok_line, tok_column) = (line, column);

        // Quoted region: opening quote, verbatim literal, closing quote if present.
        if c == '\'' {
            tokens.push(Token::new(
                TokenKind::Punct(Punct::Quote),
                "'",
                tok_line,
                tok_column,
            ));
            pos += 1;
            column += 1;

            let (lit_line, lit_column) = (line, column);
            let mut text = String::new();
            while pos < chars.len() && chars[pos] != '\'' {
                if chars[pos] == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
                text.push(chars[pos]);
                pos += 1;
            }
            tokens.push(Token::new(TokenKind::Literal, text, lit_line, lit_column));

            if pos < chars.len() {
                tokens.push(Token::new(
                    TokenKind::Punct(Punct::Quote),
                    "'",
                    line,
                    column,
                ));
                pos += 1;
                column += 1;
            }
            continue;
        }

        if let Some(punct) = Punct::from_char(c) {
            tokens.push(Token::new(
                TokenKind::Punct(punct),
                c.to_string(),
                tok_line,
                tok_column,
            ));
            pos += 1;
            column += 1;
            continue;
        }

        if c == '*' || c == '%' {
            tokens.push(Token::new(
                TokenKind::Word,
                c.to_string(),
                tok_line,
                tok_column,
            ));
            pos += 1;
            column += 1;
            continue;
        }

        let start = pos;
        while pos < chars.len() && !is_delimiter(chars[pos]) {
            pos += 1;
            column += 1;
        }
        let text: String = chars[start..pos].iter().collect();
        let kind = Keyword::from_word(&text).map_or(TokenKind::Word, TokenKind::Keyword);
        tokens.push(Token::new(kind, text, tok_line, tok_column));
    }

    tokens.push(Token::eof(line, column));
    tokens
}
