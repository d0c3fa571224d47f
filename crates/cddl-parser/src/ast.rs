//! The CDDL abstract syntax tree.
//!
//! Every node owns the tokens it consumed, including their leading trivia
//! (comments and whitespace), so serializing the tree reproduces the source
//! byte for byte. List separators (`,` between group entries, `/` between
//! type alternatives, `//` between group choices, the trailing `Eof` blob)
//! hang off the *preceding* element, which makes serialization a plain
//! left-to-right walk.
//!
//! `Type1` and `Type2` are closed enums rather than trait objects so that the
//! classifier's case analysis stays exhaustive.

use cddl_common::token::Token;
use serde::Serialize;

/// Control operator names the parser accepts: RFC 8610 §3.8, RFC 9165, and
/// the freezer draft's `pcre`.
pub const CONTROL_OPERATORS: &[&str] = &[
    // RFC 8610
    "and", "bits", "cbor", "cborseq", "default", "eq", "ge", "gt", "le", "lt", "ne", "regexp",
    "size", "within",
    // RFC 9165
    "plus", "cat", "det", "abnf", "abnfb", "feature",
    // draft-bormann-cbor-cddl-freezer
    "pcre",
];

/// Prelude type names from RFC 8610 Appendix D.
pub const PRELUDE_TYPES: &[&str] = &[
    "any",
    "uint",
    "nint",
    "int",
    "bstr",
    "bytes",
    "tstr",
    "text",
    "tdate",
    "time",
    "number",
    "biguint",
    "bignint",
    "bigint",
    "integer",
    "unsigned",
    "decfrac",
    "bigfloat",
    "eb64url",
    "eb64legacy",
    "eb16",
    "encoded-cbor",
    "uri",
    "b64url",
    "b64legacy",
    "regexp",
    "mime-message",
    "cbor-any",
    "float16",
    "float32",
    "float64",
    "float16-32",
    "float32-64",
    "float",
    "false",
    "true",
    "bool",
    "nil",
    "null",
    "undefined",
];

/// The flavor of a literal [`Value`], deciding its quoting on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueKind {
    Number,
    Text,
    Bytes,
    Hex,
    Base64,
}

impl ValueKind {
    /// The prefix and suffix that wrap the raw value text on output.
    pub fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            ValueKind::Number => ("", ""),
            ValueKind::Text => ("\"", "\""),
            ValueKind::Bytes => ("'", "'"),
            ValueKind::Hex => ("h'", "'"),
            ValueKind::Base64 => ("b64'", "'"),
        }
    }
}

/// Root of a parsed CDDL document: the rules plus the trailing `Eof` token,
/// which keeps any comments and whitespace after the last rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CddlTree {
    pub rules: Vec<Rule>,
    pub separator: Token,
}

/// One `name = type`, `name /= type` or `name //= grpent` rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub name: Typename,
    /// The assignment token: `=`, `/=` or `//=`.
    pub assign: Token,
    pub rhs: RuleRhs,
}

/// The right-hand side of a rule.
///
/// `/=` rules parse directly as a [`Type`]. `=` and `//=` rules parse as a
/// [`GroupEntry`]; once the classifier resolves the rule name as a
/// type-definition, it replaces the entry with its inner type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RuleRhs {
    Type(Type),
    Entry(GroupEntry),
}

/// An entry in a group: optional occurrence, optional member key, and a type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry {
    pub occurrence: Option<Occurrence>,
    pub key: Option<Memberkey>,
    pub ty: Type,
    /// The `,` that followed the entry, if any.
    pub separator: Option<Token>,
}

impl GroupEntry {
    /// Whether the entry can stand alone as a type: no occurrence, no member
    /// key, and not just a bare parenthesized group (maps and arrays are
    /// fine).
    pub fn is_convertible_to_type(&self) -> bool {
        self.occurrence.is_none()
            && self.key.is_none()
            && !matches!(
                self.ty.alternatives.as_slice(),
                [Type1::Type2(Type2::Group(_))]
            )
    }
}

/// A list of group choices. Wrapped in `(`..`)`, `{`..`}` or `[`..`]`
/// depending on the [`Type2`] variant that owns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub choices: Vec<GroupChoice>,
    pub open: Option<Token>,
    pub close: Option<Token>,
    pub separator: Option<Token>,
}

/// One alternative of a group: a sequence of entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupChoice {
    pub entries: Vec<GroupEntry>,
    /// The `//` that separated this choice from the next, if any.
    pub separator: Option<Token>,
}

/// A list of `/`-separated type alternatives, optionally parenthesized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Type {
    pub alternatives: Vec<Type1>,
    pub open: Option<Token>,
    pub close: Option<Token>,
    pub separator: Option<Token>,
}

/// A single type alternative: a plain type, a range, or a control operator
/// application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Type1 {
    Type2(Type2),
    Range(Range),
    Operator(Operator),
}

impl Type1 {
    /// Attach a list separator (`/` or `,`) to this alternative.
    pub fn set_separator(&mut self, token: Token) {
        match self {
            Type1::Type2(t2) => t2.set_separator(token),
            Type1::Range(r) => r.separator = Some(token),
            Type1::Operator(o) => o.separator = Some(token),
        }
    }
}

/// The basic type production.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Type2 {
    Value(Value),
    Typename(Typename),
    /// A parenthesized type.
    Type(Type),
    /// A bare parenthesized group, as it appears in a group entry.
    Group(Group),
    /// `{ ... }`
    Map(Group),
    /// `[ ... ]`
    Array(Group),
    ChoiceFrom(ChoiceFrom),
    Tag(Tag),
}

impl Type2 {
    /// Attach a list separator (`/` or `,`) to this type.
    pub fn set_separator(&mut self, token: Token) {
        match self {
            Type2::Value(v) => v.separator = Some(token),
            Type2::Typename(n) => n.separator = Some(token),
            Type2::Type(t) => t.separator = Some(token),
            Type2::Group(g) | Type2::Map(g) | Type2::Array(g) => g.separator = Some(token),
            Type2::ChoiceFrom(c) => c.separator = Some(token),
            Type2::Tag(t) => t.separator = Some(token),
        }
    }
}

/// A range between two bounds, e.g. `0..10` or `1.5...4.5`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Range {
    pub min: RangeBound,
    pub max: RangeBound,
    /// `..` (upper bound included) or `...` (upper bound excluded).
    pub op: Token,
    pub separator: Option<Token>,
}

/// A range bound: the grammar allows any type2 but only values and typenames
/// make sense, and the parser enforces that.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RangeBound {
    Value(Value),
    Typename(Typename),
}

/// A control operator application, e.g. `tstr .size (1..32)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operator {
    pub lhs: Box<Type2>,
    /// The `.name` control operator token.
    pub name: Token,
    pub rhs: Box<Type2>,
    pub separator: Option<Token>,
}

/// A member key, in one of its three spellings: `type ^ =>`, `type =>`, or
/// `bareword/value :`. The colon form always cuts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Memberkey {
    pub ty: Type1,
    pub has_cut: bool,
    pub has_colon: bool,
    /// The key punctuation in source order (`^` and `=>`, `=>`, or `:`).
    pub tokens: Vec<Token>,
}

/// An occurrence indicator: `?`, `*`, `+`, `*M`, `N*` or `N*M`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occurrence {
    /// Lower bound.
    pub n: u64,
    /// Upper bound; `None` means unbounded.
    pub m: Option<u64>,
    /// The tokens in source order (bounds abut the `*`).
    pub tokens: Vec<Token>,
}

/// A literal value: number, text string, or one of the byte-string forms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Value {
    pub value: String,
    pub kind: ValueKind,
    pub comments: Vec<Token>,
    pub whitespace: String,
    pub separator: Option<Token>,
}

/// A reference to a rule or prelude name, optionally unwrapped (`~name`) and
/// optionally generic (`name<...>`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Typename {
    pub name: String,
    /// The `~` token when the reference unwraps a group or array type.
    pub unwrapped: Option<Token>,
    pub parameters: Option<Generics>,
    pub comments: Vec<Token>,
    pub whitespace: String,
    pub separator: Option<Token>,
}

/// Generic parameters (on a rule definition) or arguments (on a reference).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Generics {
    Parameters(GenericParameters),
    Arguments(GenericArguments),
}

/// `<id, id, ...>` on the left-hand side of a rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericParameters {
    pub params: Vec<Typename>,
    pub open: Token,
    pub close: Token,
}

/// `<type1, type1, ...>` on a typename reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericArguments {
    pub params: Vec<Type1>,
    pub open: Token,
    pub close: Token,
}

/// `& group` or `& groupname`: a type choice built from a group's members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceFrom {
    pub target: ChoiceTarget,
    pub comments: Vec<Token>,
    pub whitespace: String,
    pub separator: Option<Token>,
}

/// The target of a [`ChoiceFrom`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChoiceTarget {
    Group(Group),
    Typename(Typename),
}

/// A `#` tag: `#`, `#N`, `#N.M` or `#6.N(type)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    /// The `N` or `N.M` token; absent for the bare any-type `#`.
    pub numeric: Option<Token>,
    /// The parenthesized content of a `#6.N(type)` tag.
    pub ty: Option<Type>,
    pub comments: Vec<Token>,
    pub whitespace: String,
    pub separator: Option<Token>,
}

/// A borrowed, type-erased view of any AST node.
///
/// `Map` and `Array` share the [`Group`] struct but get distinct views so
/// that consumers (markers, the classifier) can tell the three bracketings
/// apart.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Tree(&'a CddlTree),
    Rule(&'a Rule),
    GroupEntry(&'a GroupEntry),
    Group(&'a Group),
    Map(&'a Group),
    Array(&'a Group),
    GroupChoice(&'a GroupChoice),
    Type(&'a Type),
    Range(&'a Range),
    Operator(&'a Operator),
    Memberkey(&'a Memberkey),
    Occurrence(&'a Occurrence),
    Value(&'a Value),
    Typename(&'a Typename),
    ChoiceFrom(&'a ChoiceFrom),
    Tag(&'a Tag),
    GenericParameters(&'a GenericParameters),
    GenericArguments(&'a GenericArguments),
}

impl<'a> NodeRef<'a> {
    /// View of a type alternative.
    pub fn of_type1(t1: &'a Type1) -> Self {
        match t1 {
            Type1::Type2(t2) => NodeRef::of_type2(t2),
            Type1::Range(r) => NodeRef::Range(r),
            Type1::Operator(o) => NodeRef::Operator(o),
        }
    }

    /// View of a basic type.
    pub fn of_type2(t2: &'a Type2) -> Self {
        match t2 {
            Type2::Value(v) => NodeRef::Value(v),
            Type2::Typename(n) => NodeRef::Typename(n),
            Type2::Type(t) => NodeRef::Type(t),
            Type2::Group(g) => NodeRef::Group(g),
            Type2::Map(g) => NodeRef::Map(g),
            Type2::Array(g) => NodeRef::Array(g),
            Type2::ChoiceFrom(c) => NodeRef::ChoiceFrom(c),
            Type2::Tag(t) => NodeRef::Tag(t),
        }
    }

    /// Child views in source order.
    pub fn children(self) -> Vec<NodeRef<'a>> {
        match self {
            NodeRef::Tree(tree) => tree.rules.iter().map(NodeRef::Rule).collect(),
            NodeRef::Rule(rule) => {
                let rhs = match &rule.rhs {
                    RuleRhs::Type(ty) => NodeRef::Type(ty),
                    RuleRhs::Entry(entry) => NodeRef::GroupEntry(entry),
                };
                vec![NodeRef::Typename(&rule.name), rhs]
            }
            NodeRef::GroupEntry(entry) => {
                let mut children = Vec::new();
                if let Some(occurrence) = &entry.occurrence {
                    children.push(NodeRef::Occurrence(occurrence));
                }
                if let Some(key) = &entry.key {
                    children.push(NodeRef::Memberkey(key));
                }
                children.push(NodeRef::Type(&entry.ty));
                children
            }
            NodeRef::Group(group) | NodeRef::Map(group) | NodeRef::Array(group) => {
                group.choices.iter().map(NodeRef::GroupChoice).collect()
            }
            NodeRef::GroupChoice(choice) => {
                choice.entries.iter().map(NodeRef::GroupEntry).collect()
            }
            NodeRef::Type(ty) => ty.alternatives.iter().map(NodeRef::of_type1).collect(),
            NodeRef::Range(range) => [&range.min, &range.max]
                .into_iter()
                .map(|bound| match bound {
                    RangeBound::Value(v) => NodeRef::Value(v),
                    RangeBound::Typename(n) => NodeRef::Typename(n),
                })
                .collect(),
            NodeRef::Operator(op) => {
                vec![NodeRef::of_type2(&op.lhs), NodeRef::of_type2(&op.rhs)]
            }
            NodeRef::Memberkey(key) => vec![NodeRef::of_type1(&key.ty)],
            NodeRef::Typename(name) => match &name.parameters {
                Some(Generics::Parameters(p)) => vec![NodeRef::GenericParameters(p)],
                Some(Generics::Arguments(a)) => vec![NodeRef::GenericArguments(a)],
                None => Vec::new(),
            },
            NodeRef::ChoiceFrom(choice) => match &choice.target {
                ChoiceTarget::Group(g) => vec![NodeRef::Group(g)],
                ChoiceTarget::Typename(n) => vec![NodeRef::Typename(n)],
            },
            NodeRef::Tag(tag) => tag.ty.iter().map(NodeRef::Type).collect(),
            NodeRef::GenericParameters(params) => {
                params.params.iter().map(NodeRef::Typename).collect()
            }
            NodeRef::GenericArguments(args) => {
                args.params.iter().map(NodeRef::of_type1).collect()
            }
            NodeRef::Occurrence(_) | NodeRef::Value(_) => Vec::new(),
        }
    }
}
