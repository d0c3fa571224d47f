use std::fmt;

use serde::Serialize;

/// The kind of a CDDL token.
///
/// Kinds with a fixed spelling (operators, delimiters) carry no payload; the
/// spelling is recovered from the kind itself. Payload-bearing kinds (`Ident`,
/// `Number`, string literals, ...) store their text in [`Token::literal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// A character sequence no rule of the grammar matches. Spells as nothing.
    Illegal,
    /// End of input. Spells as nothing; its trivia holds trailing comments
    /// and whitespace.
    Eof,

    /// An identifier (typename, groupname or bareword).
    Ident,
    /// A `;...` comment, up to but excluding the line feed.
    Comment,
    /// A `"..."` text string literal; the literal excludes the quotes.
    Text,
    /// An integer literal (decimal, `0x` hex or `0b` binary).
    Number,
    /// A literal containing a fraction dot.
    Float,
    /// A `.name` control operator; the literal excludes the dot.
    Ctlop,
    /// A `'...'` byte string literal; the literal excludes the quotes.
    Bytes,
    /// An `h'...'` hex-encoded byte string; the literal excludes `h'` and `'`.
    Hex,
    /// A `b64'...'` base64 byte string; the literal excludes `b64'` and `'`.
    Base64,

    /// `=`
    Assign,
    /// `=>`
    Arrow,
    /// `/`
    TChoice,
    /// `//`
    GChoice,
    /// `/=`
    TChoiceAlt,
    /// `//=`
    GChoiceAlt,
    /// `..` (inclusive range)
    InclRange,
    /// `...` (upper bound excluded)
    ExclRange,

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBrack,
    /// `]`
    RBrack,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `?`
    Quest,
    /// `*`
    Asterisk,
    /// `+`
    Plus,
    /// `^`
    Caret,
    /// `#`
    Hash,
    /// `~`
    Tilde,
    /// `&`
    Ampersand,
}

impl TokenKind {
    /// The fixed spelling of this kind, or `""` for payload-bearing kinds
    /// (and for `Eof`/`Illegal`).
    pub fn symbol(self) -> &'static str {
        match self {
            TokenKind::Assign => "=",
            TokenKind::Arrow => "=>",
            TokenKind::TChoice => "/",
            TokenKind::GChoice => "//",
            TokenKind::TChoiceAlt => "/=",
            TokenKind::GChoiceAlt => "//=",
            TokenKind::InclRange => "..",
            TokenKind::ExclRange => "...",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBrack => "[",
            TokenKind::RBrack => "]",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Quest => "?",
            TokenKind::Asterisk => "*",
            TokenKind::Plus => "+",
            TokenKind::Caret => "^",
            TokenKind::Hash => "#",
            TokenKind::Tilde => "~",
            TokenKind::Ampersand => "&",
            TokenKind::Illegal
            | TokenKind::Eof
            | TokenKind::Ident
            | TokenKind::Comment
            | TokenKind::Text
            | TokenKind::Number
            | TokenKind::Float
            | TokenKind::Ctlop
            | TokenKind::Bytes
            | TokenKind::Hex
            | TokenKind::Base64 => "",
        }
    }
}

/// A single CDDL token.
///
/// A token owns the trivia that preceded it in the source: the comments, in
/// order, and the whitespace run between the last comment (or the previous
/// token) and the token text itself. Serializing every token of a source in
/// order therefore reproduces the source byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Payload text for payload-bearing kinds, empty otherwise.
    pub literal: String,
    /// Comments that preceded the token, each carrying the whitespace that
    /// preceded *it*.
    pub comments: Vec<Token>,
    /// Whitespace between the last comment (or previous token) and the token.
    pub whitespace: String,
}

impl Token {
    /// Create a token with no leading trivia.
    pub fn new(kind: TokenKind, literal: impl Into<String>) -> Self {
        Self {
            kind,
            literal: literal.into(),
            comments: Vec::new(),
            whitespace: String::new(),
        }
    }

    /// Reconstruct the exact source text of this token: leading comments,
    /// whitespace, then the canonical spelling.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for comment in &self.comments {
            out.push_str(&comment.serialize());
        }
        out.push_str(&self.whitespace);
        match self.kind {
            TokenKind::Ident | TokenKind::Comment | TokenKind::Number | TokenKind::Float => {
                out.push_str(&self.literal);
            }
            TokenKind::Text => {
                out.push('"');
                out.push_str(&self.literal);
                out.push('"');
            }
            TokenKind::Bytes => {
                out.push('\'');
                out.push_str(&self.literal);
                out.push('\'');
            }
            TokenKind::Hex => {
                out.push_str("h'");
                out.push_str(&self.literal);
                out.push('\'');
            }
            TokenKind::Base64 => {
                out.push_str("b64'");
                out.push_str(&self.literal);
                out.push('\'');
            }
            TokenKind::Ctlop => {
                out.push('.');
                out.push_str(&self.literal);
            }
            _ => out.push_str(self.kind.symbol()),
        }
        out
    }

    /// Whether any trivia (whitespace or comments) precedes the token.
    ///
    /// The grammar requires some constructs to abut directly (occurrence
    /// bounds around `*`, `<` after a generic name, digits after `#`); the
    /// parser checks this through here.
    pub fn starts_with_spaces(&self) -> bool {
        !self.whitespace.is_empty() || !self.comments.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}
