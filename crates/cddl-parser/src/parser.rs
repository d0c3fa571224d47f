//! Recursive descent parser for CDDL.
//!
//! The parser buffers two tokens (`cur`, `peek`); each production consumes
//! the tokens it recognizes and stores them in the AST so serialization can
//! reproduce the source exactly. Productions follow the RFC 8610 grammar
//! clauses (`rule`, `grpent`, `type`, `type1`, `type2`, `group`, `occur`,
//! `genericparm`/`genericarg`).
//!
//! Member keys make `type` ambiguous inside a group entry: `tstr` may turn
//! out to be a full type or the key of `tstr => ...`. Rather than backtrack,
//! the type productions take a `loose` flag that widens the accepted grammar
//! (member keys, bare parenthesized groups) and widens the return type to
//! [`LooseType`].

use cddl_common::error::ParserError;
use cddl_common::token::{Token, TokenKind};
use cddl_lexer::Lexer;

use crate::ast::{
    CddlTree, ChoiceFrom, ChoiceTarget, GenericArguments, GenericParameters, Generics, Group,
    GroupChoice, GroupEntry, Memberkey, NodeRef, Occurrence, Operator, Range, RangeBound, Rule,
    RuleRhs, Tag, Type, Type1, Type2, Typename, Value, ValueKind, CONTROL_OPERATORS,
};
use crate::classifier;
use crate::serialize::serialize_node;

/// Result of a loose type parse: a full type, or the key part of a member.
enum LooseType {
    Type(Type),
    Memberkey(Memberkey),
}

pub(crate) struct Parser<'src> {
    lexer: Lexer<'src>,
    cur: Token,
    peek: Token,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(source: &'src str) -> Result<Self, ParserError> {
        let mut lexer = Lexer::new(source);
        let cur = lexer.next_token()?;
        let peek = lexer.next_token()?;
        Ok(Self { lexer, cur, peek })
    }

    /// `cddl = S 1*(rule S)`, then classification.
    pub(crate) fn parse(mut self) -> Result<CddlTree, ParserError> {
        let mut rules = Vec::new();
        while self.cur.kind != TokenKind::Eof {
            rules.push(self.parse_rule()?);
        }

        // The Eof token becomes the tree's trailing separator so that final
        // comments and whitespace survive serialization.
        let separator = self.bump()?;
        let mut tree = CddlTree { rules, separator };

        // Rules parsed as group entries may really be type definitions; only
        // the whole document can tell.
        classifier::classify(&mut tree).map_err(|message| self.error(message))?;

        Ok(tree)
    }

    /// `rule = typename [genericparm] S assign S (type / grpent)`.
    ///
    /// `/=` commits the right-hand side to a type; `=` and `//=` parse a
    /// group entry and leave the decision to the classifier.
    fn parse_rule(&mut self) -> Result<Rule, ParserError> {
        let name = self.parse_typename(true, None)?;
        let assign = self.bump()?;
        let rhs = match assign.kind {
            TokenKind::Assign | TokenKind::GChoiceAlt => {
                RuleRhs::Entry(self.parse_group_entry()?)
            }
            TokenKind::TChoiceAlt => RuleRhs::Type(self.parse_type()?),
            _ => {
                return Err(self.error(format!(
                    "assignment expected, received \"{}\"",
                    assign.serialize()
                )))
            }
        };
        Ok(Rule { name, assign, rhs })
    }

    /// `grpent = [occur S] [memberkey S] type`
    ///        `/ [occur S] groupname [genericarg]`
    ///        `/ [occur S] "(" S group S ")"`
    fn parse_group_entry(&mut self) -> Result<GroupEntry, ParserError> {
        let occurrence = self.parse_occurrence()?;
        match self.parse_type_maybe_key(true)? {
            LooseType::Memberkey(key) => {
                let ty = self.parse_type()?;
                Ok(GroupEntry {
                    occurrence,
                    key: Some(key),
                    ty,
                    separator: None,
                })
            }
            LooseType::Type(ty) => Ok(GroupEntry {
                occurrence,
                key: None,
                ty,
                separator: None,
            }),
        }
    }

    /// `type = type1 *(S "/" S type1)`, member keys rejected.
    fn parse_type(&mut self) -> Result<Type, ParserError> {
        match self.parse_type_maybe_key(false)? {
            LooseType::Type(ty) => Ok(ty),
            LooseType::Memberkey(_) => Err(self.error("member key not allowed in this context")),
        }
    }

    /// The shared body of the `type` production. When `loose`, the parse may
    /// also produce a member key (`type1 ["^"] "=>"` or `type1 ":"`).
    fn parse_type_maybe_key(&mut self, loose: bool) -> Result<LooseType, ParserError> {
        let first = self.parse_type1(loose)?;

        if loose && self.cur.kind == TokenKind::Caret {
            let mut tokens = vec![self.bump()?];
            if self.cur.kind != TokenKind::Arrow {
                return Err(self.error(format!(
                    "expected arrow map, received \"{}{}\"",
                    self.cur.serialize(),
                    self.peek.serialize()
                )));
            }
            tokens.push(self.bump()?);
            return Ok(LooseType::Memberkey(Memberkey {
                ty: first,
                has_cut: true,
                has_colon: false,
                tokens,
            }));
        }
        if loose && self.cur.kind == TokenKind::Arrow {
            let tokens = vec![self.bump()?];
            return Ok(LooseType::Memberkey(Memberkey {
                ty: first,
                has_cut: false,
                has_colon: false,
                tokens,
            }));
        }
        if loose && self.cur.kind == TokenKind::Colon {
            let tokens = vec![self.bump()?];
            return Ok(LooseType::Memberkey(Memberkey {
                ty: first,
                has_cut: true,
                has_colon: true,
                tokens,
            }));
        }

        let mut alternatives = vec![first];
        while self.cur.kind == TokenKind::TChoice {
            let separator = self.bump()?;
            if let Some(last) = alternatives.last_mut() {
                last.set_separator(separator);
            }
            alternatives.push(self.parse_type1(false)?);
        }
        Ok(LooseType::Type(Type {
            alternatives,
            open: None,
            close: None,
            separator: None,
        }))
    }

    /// `type1 = type2 [S (rangeop / ctlop) S type2]`.
    fn parse_type1(&mut self, loose: bool) -> Result<Type1, ParserError> {
        let type2 = self.parse_type2(loose)?;
        match self.cur.kind {
            TokenKind::InclRange | TokenKind::ExclRange => {
                let op = self.bump()?;
                let max2 = self.parse_type2(false)?;
                let min = self.range_bound(type2, "min")?;
                let max = self.range_bound(max2, "max")?;
                Ok(Type1::Range(Range {
                    min,
                    max,
                    op,
                    separator: None,
                }))
            }
            TokenKind::Ctlop => {
                if !CONTROL_OPERATORS.contains(&self.cur.literal.as_str()) {
                    return Err(self.error(format!(
                        "unknown control operator \"{}\"",
                        self.cur.literal
                    )));
                }
                let name = self.bump()?;
                let rhs = self.parse_type2(false)?;
                Ok(Type1::Operator(Operator {
                    lhs: Box::new(type2),
                    name,
                    rhs: Box::new(rhs),
                    separator: None,
                }))
            }
            _ => Ok(Type1::Type2(type2)),
        }
    }

    fn range_bound(&self, type2: Type2, side: &str) -> Result<RangeBound, ParserError> {
        match type2 {
            Type2::Value(value) => Ok(RangeBound::Value(value)),
            Type2::Typename(name) => Ok(RangeBound::Typename(name)),
            other => Err(self.error(format!(
                "range detected but {side} is neither a value nor a typename. Got: {}",
                serialize_node(NodeRef::of_type2(&other))
            ))),
        }
    }

    /// `type2 = value / typename [genericarg] / "(" type ")" / "{" group "}"
    ///        / "[" group "]" / "~" typename / "&" ... / "#" ...`.
    ///
    /// When `loose`, `"(" ... ")"` is a bare group rather than a
    /// parenthesized type.
    fn parse_type2(&mut self, loose: bool) -> Result<Type2, ParserError> {
        match self.cur.kind {
            TokenKind::LParen => {
                let open = self.bump()?;
                if loose {
                    let mut group = self.parse_group()?;
                    group.open = Some(open);
                    if self.cur.kind != TokenKind::RParen {
                        return Err(self.expected("right parenthesis"));
                    }
                    group.close = Some(self.bump()?);
                    Ok(Type2::Group(group))
                } else {
                    let mut ty = self.parse_type()?;
                    ty.open = Some(open);
                    if self.cur.kind != TokenKind::RParen {
                        return Err(self.expected("right parenthesis"));
                    }
                    ty.close = Some(self.bump()?);
                    Ok(Type2::Type(ty))
                }
            }

            TokenKind::LBrace => {
                let open = self.bump()?;
                let mut group = self.parse_group()?;
                group.open = Some(open);
                if self.cur.kind != TokenKind::RBrace {
                    return Err(self.expected("right brace"));
                }
                group.close = Some(self.bump()?);
                Ok(Type2::Map(group))
            }

            TokenKind::LBrack => {
                let open = self.bump()?;
                let mut group = self.parse_group()?;
                group.open = Some(open);
                if self.cur.kind != TokenKind::RBrack {
                    return Err(self.expected("right bracket"));
                }
                group.close = Some(self.bump()?);
                Ok(Type2::Array(group))
            }

            TokenKind::Tilde => {
                let unwrapped = self.bump()?;
                let name = self.parse_typename(false, Some(unwrapped))?;
                Ok(Type2::Typename(name))
            }

            TokenKind::Ampersand => {
                let reference = self.bump()?;
                let target = if self.cur.kind == TokenKind::LParen {
                    let open = self.bump()?;
                    let mut group = self.parse_group()?;
                    group.open = Some(open);
                    if self.cur.kind != TokenKind::RParen {
                        return Err(self.expected("right parenthesis"));
                    }
                    group.close = Some(self.bump()?);
                    ChoiceTarget::Group(group)
                } else {
                    ChoiceTarget::Typename(self.parse_typename(false, None)?)
                };
                Ok(Type2::ChoiceFrom(ChoiceFrom {
                    target,
                    comments: reference.comments,
                    whitespace: reference.whitespace,
                    separator: None,
                }))
            }

            TokenKind::Hash => {
                let hash = self.bump()?;
                let mut tag = Tag {
                    numeric: None,
                    ty: None,
                    comments: hash.comments,
                    whitespace: hash.whitespace,
                    separator: None,
                };
                // The numeric part must abut the `#`.
                if matches!(self.cur.kind, TokenKind::Number | TokenKind::Float)
                    && !self.cur.starts_with_spaces()
                {
                    let numeric = self.bump()?;
                    if numeric.literal.len() > 1
                        && (numeric.literal.as_bytes()[1] != b'.' || numeric.literal.contains('e'))
                    {
                        return Err(self.error(format!(
                            "data item after \"#\" must match DIGIT [\".\" uint], got \"{}\"",
                            numeric.serialize()
                        )));
                    }
                    // `#6.N(type)` applies the tag to the parenthesized type.
                    if numeric.literal.starts_with('6')
                        && self.cur.kind == TokenKind::LParen
                        && !self.cur.starts_with_spaces()
                    {
                        match self.parse_type2(false)? {
                            Type2::Type(ty) => tag.ty = Some(ty),
                            _ => {
                                return Err(
                                    self.error("expected parenthesized type after tag number")
                                )
                            }
                        }
                    }
                    tag.numeric = Some(numeric);
                }
                Ok(Type2::Tag(tag))
            }

            TokenKind::Ident => Ok(Type2::Typename(self.parse_typename(false, None)?)),

            TokenKind::Text => Ok(Type2::Value(self.parse_value(ValueKind::Text)?)),
            TokenKind::Bytes => Ok(Type2::Value(self.parse_value(ValueKind::Bytes)?)),
            TokenKind::Hex => Ok(Type2::Value(self.parse_value(ValueKind::Hex)?)),
            TokenKind::Base64 => Ok(Type2::Value(self.parse_value(ValueKind::Base64)?)),
            // Integer and float literals both produce number values.
            TokenKind::Number | TokenKind::Float => {
                Ok(Type2::Value(self.parse_value(ValueKind::Number)?))
            }

            _ => Err(self.error(format!(
                "invalid type2 production, received \"{}\"",
                self.cur.serialize()
            ))),
        }
    }

    /// Consume the current literal token into a [`Value`], lifting its trivia
    /// onto the node.
    fn parse_value(&mut self, kind: ValueKind) -> Result<Value, ParserError> {
        let Token {
            literal,
            comments,
            whitespace,
            ..
        } = self.bump()?;
        Ok(Value {
            value: literal,
            kind,
            comments,
            whitespace,
            separator: None,
        })
    }

    /// `group = grpchoice *(S "//" S grpchoice)` where
    /// `grpchoice = *(grpent optcom)`.
    ///
    /// Groups only appear bracketed, so the closing token marks the end. The
    /// caller wraps the result as a bare group, map or array and takes the
    /// brackets.
    fn parse_group(&mut self) -> Result<Group, ParserError> {
        let mut choices: Vec<GroupChoice> = Vec::new();
        loop {
            if self.at_group_end() {
                break;
            }
            let mut entries: Vec<GroupEntry> = Vec::new();
            while self.cur.kind != TokenKind::GChoice {
                let mut entry = self.parse_group_entry()?;
                if self.cur.kind == TokenKind::Comma {
                    entry.separator = Some(self.bump()?);
                }
                let done = self.at_group_end();
                entries.push(entry);
                if done {
                    break;
                }
            }
            choices.push(GroupChoice {
                entries,
                separator: None,
            });
            if self.at_group_end() {
                break;
            }
            // `//` separates choices and belongs to the one before it.
            if let Some(choice) = choices.last_mut() {
                choice.separator = Some(self.bump()?);
            }
        }
        Ok(Group {
            choices,
            open: None,
            close: None,
            separator: None,
        })
    }

    fn at_group_end(&self) -> bool {
        matches!(
            self.cur.kind,
            TokenKind::RParen | TokenKind::RBrace | TokenKind::RBrack
        )
    }

    /// `occur = [uint] "*" [uint] / "+" / "?"`.
    ///
    /// Bounds must abut the `*` directly; a spaced number is an ordinary
    /// token of the following production.
    fn parse_occurrence(&mut self) -> Result<Option<Occurrence>, ParserError> {
        match self.cur.kind {
            TokenKind::Quest | TokenKind::Asterisk | TokenKind::Plus => {
                let n = u64::from(self.cur.kind == TokenKind::Plus);
                let mut m = if self.cur.kind == TokenKind::Quest {
                    Some(1)
                } else {
                    None
                };
                let mut tokens = Vec::new();
                if self.cur.kind == TokenKind::Asterisk
                    && self.peek.kind == TokenKind::Number
                    && is_uint(&self.peek.literal)
                    && !self.peek.starts_with_spaces()
                {
                    tokens.push(self.bump()?);
                    m = Some(self.parse_bound()?);
                }
                tokens.push(self.bump()?);
                Ok(Some(Occurrence { n, m, tokens }))
            }

            TokenKind::Number
                if is_uint(&self.cur.literal)
                    && self.peek.kind == TokenKind::Asterisk
                    && !self.peek.starts_with_spaces() =>
            {
                let n = self.parse_bound()?;
                let mut m = None;
                let mut tokens = vec![self.bump()?, self.bump()?];
                if self.cur.kind == TokenKind::Number
                    && is_uint(&self.cur.literal)
                    && !self.cur.starts_with_spaces()
                {
                    m = Some(self.parse_bound()?);
                    tokens.push(self.bump()?);
                }
                Ok(Some(Occurrence { n, m, tokens }))
            }

            _ => Ok(None),
        }
    }

    /// Parse the current token's literal as an occurrence bound.
    fn parse_bound(&self) -> Result<u64, ParserError> {
        self.cur.literal.parse().map_err(|_| {
            self.error(format!(
                "occurrence bound \"{}\" is too large",
                self.cur.literal
            ))
        })
    }

    /// `typename [genericparm]` on a definition, `typename [genericarg]` on a
    /// reference. The `<` must abut the name for generics to apply.
    fn parse_typename(
        &mut self,
        definition: bool,
        unwrapped: Option<Token>,
    ) -> Result<Typename, ParserError> {
        if self.cur.kind != TokenKind::Ident {
            return Err(self.error(format!(
                "group identifier expected, received \"{}\"",
                self.cur.serialize()
            )));
        }
        let ident = self.bump()?;
        let parameters = if definition {
            self.parse_generic_parameters()?.map(Generics::Parameters)
        } else {
            self.parse_generic_arguments()?.map(Generics::Arguments)
        };
        let Token {
            literal,
            comments,
            whitespace,
            ..
        } = ident;
        Ok(Typename {
            name: literal,
            unwrapped,
            parameters,
            comments,
            whitespace,
            separator: None,
        })
    }

    /// `genericparm = "<" S id S *("," S id S) ">"`.
    fn parse_generic_parameters(&mut self) -> Result<Option<GenericParameters>, ParserError> {
        if self.cur.kind != TokenKind::Lt || self.cur.starts_with_spaces() {
            return Ok(None);
        }
        let open = self.bump()?;
        let mut params = vec![self.parse_typename(false, None)?];
        while self.cur.kind == TokenKind::Comma {
            let separator = self.bump()?;
            if let Some(last) = params.last_mut() {
                last.separator = Some(separator);
            }
            params.push(self.parse_typename(false, None)?);
        }
        if self.cur.kind != TokenKind::Gt {
            return Err(self.expected_generic_end());
        }
        let close = self.bump()?;
        Ok(Some(GenericParameters { params, open, close }))
    }

    /// `genericarg = "<" S type1 S *("," S type1 S) ">"`.
    fn parse_generic_arguments(&mut self) -> Result<Option<GenericArguments>, ParserError> {
        if self.cur.kind != TokenKind::Lt || self.cur.starts_with_spaces() {
            return Ok(None);
        }
        let open = self.bump()?;
        let mut params = vec![self.parse_type1(false)?];
        while self.cur.kind == TokenKind::Comma {
            let separator = self.bump()?;
            if let Some(last) = params.last_mut() {
                last.set_separator(separator);
            }
            params.push(self.parse_type1(false)?);
        }
        if self.cur.kind != TokenKind::Gt {
            return Err(self.expected_generic_end());
        }
        let close = self.bump()?;
        Ok(Some(GenericArguments { params, open, close }))
    }

    // ── Token plumbing ─────────────────────────────────────────────────

    /// Consume and return the current token, pulling the next one from the
    /// lexer.
    fn bump(&mut self) -> Result<Token, ParserError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(
            &mut self.cur,
            std::mem::replace(&mut self.peek, next),
        ))
    }

    fn error(&self, message: impl Into<String>) -> ParserError {
        self.lexer.error_here(message)
    }

    fn expected(&self, what: &str) -> ParserError {
        self.error(format!(
            "expected {what}, received \"{}\"",
            self.cur.serialize()
        ))
    }

    fn expected_generic_end(&self) -> ParserError {
        self.error(format!(
            "\">\" character expected to end generic production, received \"{}\"",
            self.cur.serialize()
        ))
    }
}

/// A nonzero unsigned decimal integer, as occurrence bounds require.
fn is_uint(literal: &str) -> bool {
    let mut bytes = literal.bytes();
    matches!(bytes.next(), Some(b'1'..=b'9')) && bytes.all(|b| b.is_ascii_digit())
}
