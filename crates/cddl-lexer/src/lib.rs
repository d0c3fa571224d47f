// CDDL lexer -- tokenizer for RFC 8610 CDDL source text.
//
// The lexer produces tokens on demand. All whitespace and `;...` comments
// encountered before a token are attached to that token as leading trivia, so
// that serializing the token stream in order reproduces the source byte for
// byte. Multi-character tokens (`..` vs `...`, the `/` family, `h'...'`,
// `b64'...'`, `.ctl`) are resolved with one character of lookahead.

mod cursor;

use cddl_common::error::ParserError;
use cddl_common::span::Span;
use cddl_common::token::{Token, TokenKind};
use cursor::Cursor;

/// The CDDL lexer. Converts source text into a stream of trivia-carrying
/// tokens, ending with an `Eof` token that holds any trailing trivia.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    source: &'src str,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            source,
        }
    }

    /// Convenience: tokenize the entire source, including the final `Eof`
    /// token, stopping at the first error.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, ParserError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Produce the next token, with its leading trivia attached.
    pub fn next_token(&mut self) -> Result<Token, ParserError> {
        let mut comments = self.read_comments();
        let mut whitespace = String::new();
        // A trailing whitespace run without a comment becomes the token's
        // whitespace rather than an empty trailing comment.
        if comments.last().is_some_and(|c| c.literal.is_empty()) {
            if let Some(run) = comments.pop() {
                whitespace = run.whitespace;
            }
        }

        let mut token = match self.cursor.peek() {
            None => Token::new(TokenKind::Eof, ""),

            Some('=') => {
                self.cursor.bump();
                if self.cursor.peek() == Some('>') {
                    self.cursor.bump();
                    Token::new(TokenKind::Arrow, "")
                } else {
                    Token::new(TokenKind::Assign, "")
                }
            }
            Some('/') => {
                self.cursor.bump();
                match self.cursor.peek() {
                    Some('/') => {
                        self.cursor.bump();
                        if self.cursor.peek() == Some('=') {
                            self.cursor.bump();
                            Token::new(TokenKind::GChoiceAlt, "")
                        } else {
                            Token::new(TokenKind::GChoice, "")
                        }
                    }
                    Some('=') => {
                        self.cursor.bump();
                        Token::new(TokenKind::TChoiceAlt, "")
                    }
                    _ => Token::new(TokenKind::TChoice, ""),
                }
            }
            Some('.') => self.lex_dot()?,

            Some('(') => self.fixed(TokenKind::LParen),
            Some(')') => self.fixed(TokenKind::RParen),
            Some('{') => self.fixed(TokenKind::LBrace),
            Some('}') => self.fixed(TokenKind::RBrace),
            Some('[') => self.fixed(TokenKind::LBrack),
            Some(']') => self.fixed(TokenKind::RBrack),
            Some('<') => self.fixed(TokenKind::Lt),
            Some('>') => self.fixed(TokenKind::Gt),
            Some(',') => self.fixed(TokenKind::Comma),
            Some(':') => self.fixed(TokenKind::Colon),
            Some('?') => self.fixed(TokenKind::Quest),
            Some('*') => self.fixed(TokenKind::Asterisk),
            Some('+') => self.fixed(TokenKind::Plus),
            Some('^') => self.fixed(TokenKind::Caret),
            Some('#') => self.fixed(TokenKind::Hash),
            Some('~') => self.fixed(TokenKind::Tilde),
            Some('&') => self.fixed(TokenKind::Ampersand),

            Some('"') => Token::new(TokenKind::Text, self.read_text_string()?),
            Some('\'') => Token::new(TokenKind::Bytes, self.read_byte_string()?),
            // Comments are normally absorbed as trivia above; this arm only
            // matters for a lexer driven token by token from mid-comment.
            Some(';') => Token::new(TokenKind::Comment, self.read_comment()),

            Some(c) if is_extended_alpha(c) => self.lex_ident_or_tagged_string(c)?,

            Some(c) if c.is_ascii_digit() || c == '-' => {
                let literal = self.read_number_or_float()?;
                let kind = if literal.contains('.') {
                    TokenKind::Float
                } else {
                    TokenKind::Number
                };
                Token::new(kind, literal)
            }

            Some(_) => {
                self.cursor.bump();
                Token::new(TokenKind::Illegal, "")
            }
        };

        token.comments = comments;
        token.whitespace = whitespace;
        Ok(token)
    }

    /// Build an error at the current cursor position.
    ///
    /// Also used by the parser, which reports against the lexer's position
    /// the way the grammar productions observe it.
    pub fn error_here(&self, message: impl Into<String>) -> ParserError {
        self.error_at(self.cursor.offset(), message)
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> ParserError {
        let (line, column, source_line) = locate(self.source, offset);
        let end = self.source[offset.min(self.source.len())..]
            .chars()
            .next()
            .map_or(offset, |c| offset + c.len_utf8());
        ParserError::new(
            message,
            line,
            column,
            Span::new(offset as u32, end as u32),
            source_line,
        )
    }

    // ── Trivia ─────────────────────────────────────────────────────────

    /// Read `(whitespace, comment)` pairs until the next significant
    /// character. A final whitespace run without a comment is recorded as a
    /// comment token with an empty literal; `next_token` unwraps it.
    fn read_comments(&mut self) -> Vec<Token> {
        let mut comments = Vec::new();
        loop {
            let whitespace = self.read_whitespace();
            if self.cursor.peek() != Some(';') {
                if !whitespace.is_empty() {
                    let mut run = Token::new(TokenKind::Comment, "");
                    run.whitespace = whitespace;
                    comments.push(run);
                }
                return comments;
            }
            let mut comment = Token::new(TokenKind::Comment, self.read_comment());
            comment.whitespace = whitespace;
            comments.push(comment);
        }
    }

    fn read_whitespace(&mut self) -> String {
        let from = self.cursor.offset();
        self.cursor
            .eat_while(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
        self.cursor.slice(from, self.cursor.offset()).to_string()
    }

    /// Read a `;` comment up to but excluding the line feed (or end of
    /// input). The `;` is part of the literal.
    fn read_comment(&mut self) -> String {
        let from = self.cursor.offset();
        self.cursor.eat_while(|c| c != '\n');
        self.cursor.slice(from, self.cursor.offset()).to_string()
    }

    // ── Token scanners ─────────────────────────────────────────────────

    /// Consume a single character and produce a fixed-spelling token.
    fn fixed(&mut self, kind: TokenKind) -> Token {
        self.cursor.bump();
        Token::new(kind, "")
    }

    /// Dispatch for `.`: `..`, `...`, a `.ctl` control operator, or an
    /// illegal lone dot.
    fn lex_dot(&mut self) -> Result<Token, ParserError> {
        self.cursor.bump();
        match self.cursor.peek() {
            Some('.') => {
                self.cursor.bump();
                if self.cursor.peek() == Some('.') {
                    self.cursor.bump();
                    Ok(Token::new(TokenKind::ExclRange, ""))
                } else {
                    Ok(Token::new(TokenKind::InclRange, ""))
                }
            }
            Some(c) if is_extended_alpha(c) => {
                Ok(Token::new(TokenKind::Ctlop, self.read_identifier("")?))
            }
            _ => Ok(Token::new(TokenKind::Illegal, "")),
        }
    }

    /// Dispatch for an extended-alpha start: `h'...'`, `b64'...'`, or a
    /// plain identifier.
    fn lex_ident_or_tagged_string(&mut self, first: char) -> Result<Token, ParserError> {
        if first == 'b' && self.cursor.peek2() == Some('6') {
            self.cursor.bump();
            self.cursor.bump();
            if self.cursor.peek() == Some('4') && self.cursor.peek2() == Some('\'') {
                self.cursor.bump();
                return Ok(Token::new(TokenKind::Base64, self.read_byte_string()?));
            }
            // Looked like a b64 byte string, but it is just an identifier
            // starting with "b6".
            return Ok(Token::new(TokenKind::Ident, self.read_identifier("b6")?));
        }
        if first == 'h' && self.cursor.peek2() == Some('\'') {
            self.cursor.bump();
            return Ok(Token::new(TokenKind::Hex, self.read_byte_string()?));
        }
        Ok(Token::new(TokenKind::Ident, self.read_identifier("")?))
    }

    /// Read an identifier starting at the cursor, prefixed with characters
    /// already consumed by the caller. Identifiers may contain `-` and `.`
    /// but must not end in either.
    fn read_identifier(&mut self, consumed: &str) -> Result<String, ParserError> {
        let from = self.cursor.offset();
        self.cursor.eat_while(is_ident_char);
        let mut identifier = String::from(consumed);
        identifier.push_str(self.cursor.slice(from, self.cursor.offset()));
        if identifier.ends_with(['-', '.']) {
            return Err(self.error_here(format!(
                "identifier cannot end with \"-\" or \".\", found \"{identifier}\""
            )));
        }
        Ok(identifier)
    }

    /// Read a `"..."` text string. The cursor is on the opening quote; the
    /// returned literal excludes both quotes.
    fn read_text_string(&mut self) -> Result<String, ParserError> {
        self.cursor.bump();
        let from = self.cursor.offset();
        loop {
            match self.cursor.peek() {
                Some('"') => break,
                Some(c) if is_text_char(c) => {
                    self.cursor.bump();
                }
                Some('\\') => {
                    self.cursor.bump();
                    if self.cursor.peek().is_some_and(is_escapable) {
                        self.cursor.bump();
                    } else {
                        return Err(self.error_here("invalid escape character in text string"));
                    }
                }
                Some('\n') => {
                    self.cursor.bump();
                }
                Some('\r') if self.cursor.peek2() == Some('\n') => {
                    self.cursor.bump();
                    self.cursor.bump();
                }
                _ => return Err(self.error_here("invalid text string")),
            }
        }
        let content = self.cursor.slice(from, self.cursor.offset()).to_string();
        self.cursor.bump();
        Ok(content)
    }

    /// Read a `'...'` byte string (also the payload of `h'...'` and
    /// `b64'...'`). The cursor is on the opening quote.
    fn read_byte_string(&mut self) -> Result<String, ParserError> {
        self.cursor.bump();
        let from = self.cursor.offset();
        loop {
            match self.cursor.peek() {
                Some('\'') => break,
                Some(c) if is_byte_char(c) => {
                    self.cursor.bump();
                }
                Some('\\') => {
                    self.cursor.bump();
                    if self.cursor.peek().is_some_and(is_escapable) {
                        self.cursor.bump();
                    } else {
                        return Err(self.error_here("invalid escape character in byte string"));
                    }
                }
                Some('\n') => {
                    self.cursor.bump();
                }
                Some('\r') if self.cursor.peek2() == Some('\n') => {
                    self.cursor.bump();
                    self.cursor.bump();
                }
                _ => return Err(self.error_here("invalid byte string")),
            }
        }
        let content = self.cursor.slice(from, self.cursor.offset()).to_string();
        self.cursor.bump();
        Ok(content)
    }

    /// Read an integer or float literal. The cursor is on the first digit or
    /// on a leading `-`.
    ///
    /// If two consecutive dots appear while scanning, they are a range
    /// operator and the number ends before the first dot.
    fn read_number_or_float(&mut self) -> Result<String, ParserError> {
        let from = self.cursor.offset();

        if self.cursor.peek() == Some('-') {
            self.cursor.bump();
        }

        if self.cursor.peek() == Some('0') {
            // Zero can open a hex number, a binary number, plain zero, or a
            // float below one.
            self.cursor.bump();
            match self.cursor.peek() {
                Some('x') => {
                    self.cursor.bump();
                    if !self.cursor.peek().is_some_and(is_hex_digit) {
                        return Err(self.error_here("hex number detected but no hex digit found"));
                    }
                    self.cursor.eat_while(is_hex_digit);
                    let mut dot_found = false;
                    if self.cursor.peek() == Some('.') {
                        if self.cursor.peek2() == Some('.') {
                            return Ok(self.cursor.slice(from, self.cursor.offset()).to_string());
                        }
                        dot_found = true;
                        self.cursor.bump();
                        if !self.cursor.peek().is_some_and(is_hex_digit) {
                            return Err(self.error_here(
                                "hex number with fraction detected but no hex digit found in fraction",
                            ));
                        }
                        self.cursor.eat_while(is_hex_digit);
                    }
                    if dot_found && self.cursor.peek() != Some('p') {
                        return Err(self.error_here(
                            "hex number with fraction detected but no exponent found",
                        ));
                    }
                    if self.cursor.peek() == Some('p') {
                        self.cursor.bump();
                        if matches!(self.cursor.peek(), Some('+' | '-')) {
                            self.cursor.bump();
                        }
                        if !self.cursor.peek().is_some_and(|c| c.is_ascii_digit()) {
                            return Err(self.error_here(
                                "hex number with exponent detected but no digit found for exponent",
                            ));
                        }
                        self.cursor.eat_while(|c| c.is_ascii_digit());
                    }
                }
                Some('b') => {
                    self.cursor.bump();
                    if !matches!(self.cursor.peek(), Some('0' | '1')) {
                        return Err(
                            self.error_here("binary number detected but no binary digit found")
                        );
                    }
                    self.cursor.eat_while(|c| matches!(c, '0' | '1'));
                }
                Some('.') => {
                    if self.cursor.peek2() == Some('.') {
                        return Ok(self.cursor.slice(from, self.cursor.offset()).to_string());
                    }
                    self.read_fraction()?;
                    if self.cursor.peek() == Some('e') {
                        self.read_exponent()?;
                    }
                }
                _ => {
                    // The number is zero; the next character belongs to
                    // another production.
                }
            }
        } else {
            self.cursor.eat_while(|c| c.is_ascii_digit());
            if self.cursor.peek() == Some('.') {
                if self.cursor.peek2() == Some('.') {
                    return Ok(self.cursor.slice(from, self.cursor.offset()).to_string());
                }
                self.read_fraction()?;
            }
            if self.cursor.peek() == Some('e') {
                self.read_exponent()?;
            }
        }

        Ok(self.cursor.slice(from, self.cursor.offset()).to_string())
    }

    /// Consume `.` and at least one decimal digit.
    fn read_fraction(&mut self) -> Result<(), ParserError> {
        self.cursor.bump();
        if !self.cursor.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Err(
                self.error_here("number with fraction detected but no digit found in fraction")
            );
        }
        self.cursor.eat_while(|c| c.is_ascii_digit());
        Ok(())
    }

    /// Consume `e`, an optional sign and at least one decimal digit.
    fn read_exponent(&mut self) -> Result<(), ParserError> {
        self.cursor.bump();
        if matches!(self.cursor.peek(), Some('+' | '-')) {
            self.cursor.bump();
        }
        if !self.cursor.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Err(
                self.error_here("number with exponent detected but no digit found in exponent")
            );
        }
        self.cursor.eat_while(|c| c.is_ascii_digit());
        Ok(())
    }
}

// ── Character classes ──────────────────────────────────────────────────

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
}

/// Letters plus the extra characters CDDL identifiers may start with.
fn is_extended_alpha(c: char) -> bool {
    is_letter(c) || matches!(c, '@' | '_' | '$')
}

/// Characters allowed inside an identifier. Identifiers must not *end* in
/// `-` or `.`; `read_identifier` checks that separately.
fn is_ident_char(c: char) -> bool {
    is_extended_alpha(c) || c.is_ascii_digit() || matches!(c, '-' | '.')
}

/// Hex digits are uppercase only in CDDL.
fn is_hex_digit(c: char) -> bool {
    c.is_ascii_digit() || ('A'..='F').contains(&c)
}

/// Characters a text string may contain without escaping.
fn is_text_char(c: char) -> bool {
    matches!(u32::from(c), 0x20..=0x21 | 0x23..=0x5B | 0x5D..=0x7E | 0x80..=0x0010_FFFD)
}

/// Characters a byte string may contain without escaping.
fn is_byte_char(c: char) -> bool {
    matches!(u32::from(c), 0x20..=0x26 | 0x28..=0x5B | 0x5D..=0x0010_FFFD)
}

/// Characters that may follow a `\` escape.
fn is_escapable(c: char) -> bool {
    matches!(u32::from(c), 0x20..=0x7E | 0x80..=0x0010_FFFD)
}

/// Resolve a byte offset to a 1-based line, a 1-based character column and
/// the text of the line (line feed excluded).
fn locate(source: &str, offset: usize) -> (u32, u32, String) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let line = before.matches('\n').count() as u32 + 1;
    let line_end = source[line_start..]
        .find('\n')
        .map_or(source.len(), |i| line_start + i);
    let column = source[line_start..offset].chars().count() as u32 + 1;
    let text = &source[line_start..line_end];
    let text = text.strip_suffix('\r').unwrap_or(text);
    (line, column, text.to_string())
}
