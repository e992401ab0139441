use crate::lexer::Token;

/// Read position over an immutable token list.
///
/// Reading past the end keeps yielding an end-of-input token positioned
/// after the last real token, so grammar rules never index out of range.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    eof: Token,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let eof = match tokens.last() {
            Some(last) if last.is_eof() => last.clone(),
            Some(last) => Token::eof(last.line, last.column + last.text.chars().count() as u32),
            None => Token::eof(1, 1),
        };
        Cursor {
            tokens,
            pos: 0,
            eof,
        }
    }

    pub fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    pub fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&self.eof)
    }

    /// Consume the current token and return it.
    pub fn advance(&mut self) -> &Token {
        let index = self.pos;
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        self.tokens.get(index).unwrap_or(&self.eof)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.peek().is_eof()
    }
}
