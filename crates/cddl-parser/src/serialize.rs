//! Lossless serialization of the AST, with optional markup.
//!
//! Each node emits its leading trivia, its tokens and its children in source
//! order, then its trailing separator; concatenated over the tree this
//! reproduces the parsed text exactly. A [`Marker`] can intercept token,
//! value and name emission and bracket whole nodes with prefix/suffix markup
//! (e.g. for syntax highlighting).
//!
//! Markers often need to know *where* a node sits (a typename used as a map
//! key reads differently from one used as a type). Instead of storing parent
//! pointers in the tree, the serializer threads an [`Ancestry`] chain of
//! borrowed frames down the walk; `Ancestry::parent` walks toward the root.

use cddl_common::token::{Token, TokenKind};

use crate::ast::{
    CddlTree, ChoiceFrom, ChoiceTarget, GenericArguments, GenericParameters, Generics, Group,
    GroupChoice, GroupEntry, Memberkey, NodeRef, Occurrence, Operator, Range, RangeBound, Rule,
    RuleRhs, Tag, Type, Type1, Type2, Typename, Value,
};

/// Markup around a node's whole output: `(prefix, suffix)`.
pub type Markup = (Option<String>, Option<String>);

/// Hooks for decorating serialized output.
///
/// All hooks default to identity, so an empty `impl Marker for X {}` yields
/// output byte-identical to [`CddlTree::serialize`]. The `node` argument is
/// the frame of the node being emitted; walk `Ancestry::parent` to adapt to
/// context.
pub trait Marker {
    /// Emit a token. Implementations are responsible for the comments and
    /// whitespace the token carries.
    fn serialize_token(&self, token: &Token, node: &Ancestry<'_>) -> String {
        let _ = node;
        token.serialize()
    }

    /// Emit a literal value, given the quoting decided by its kind.
    fn serialize_value(&self, prefix: &str, value: &str, suffix: &str, node: &Ancestry<'_>) -> String {
        let _ = node;
        format!("{prefix}{value}{suffix}")
    }

    /// Emit a typename or groupname.
    fn serialize_name(&self, name: &str, node: &Ancestry<'_>) -> String {
        let _ = node;
        name.to_owned()
    }

    /// Markup wrapped around the node's whole output.
    fn markup_for(&self, node: &Ancestry<'_>) -> Markup {
        let _ = node;
        (None, None)
    }
}

/// A frame of the serializer's walk: the node being emitted and a borrowed
/// link to its parent frame.
pub struct Ancestry<'a> {
    node: NodeRef<'a>,
    parent: Option<&'a Ancestry<'a>>,
}

impl<'a> Ancestry<'a> {
    /// The node this frame emits.
    pub fn node(&self) -> NodeRef<'a> {
        self.node
    }

    /// The enclosing frame, or `None` at the tree root.
    pub fn parent(&self) -> Option<&Ancestry<'a>> {
        self.parent
    }
}

impl CddlTree {
    /// Serialize the tree back to text, byte-identical to the parsed source.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        emit_tree(self, &mut out, None);
        out
    }

    /// Serialize the tree through a [`Marker`].
    pub fn serialize_with(&self, marker: &dyn Marker) -> String {
        let mut out = String::new();
        emit_tree(self, &mut out, Some(marker));
        out
    }
}

/// Serialize any single node (without markup). Used for diagnostics.
pub fn serialize_node(node: NodeRef<'_>) -> String {
    let mut out = String::new();
    emit(node, &mut out, None, None);
    out
}

/// Dispatch a node view to its emitter.
fn emit(node: NodeRef<'_>, out: &mut String, marker: Option<&dyn Marker>, parent: Option<&Ancestry<'_>>) {
    match node {
        NodeRef::Tree(tree) => emit_tree(tree, out, marker),
        NodeRef::Rule(rule) => emit_rule(rule, out, marker, parent),
        NodeRef::GroupEntry(entry) => emit_group_entry(entry, out, marker, parent),
        NodeRef::Group(group) => emit_group(group, NodeRef::Group(group), out, marker, parent),
        NodeRef::Map(group) => emit_group(group, NodeRef::Map(group), out, marker, parent),
        NodeRef::Array(group) => emit_group(group, NodeRef::Array(group), out, marker, parent),
        NodeRef::GroupChoice(choice) => emit_group_choice(choice, out, marker, parent),
        NodeRef::Type(ty) => emit_type(ty, out, marker, parent),
        NodeRef::Range(range) => emit_range(range, out, marker, parent),
        NodeRef::Operator(op) => emit_operator(op, out, marker, parent),
        NodeRef::Memberkey(key) => emit_memberkey(key, out, marker, parent),
        NodeRef::Occurrence(occurrence) => emit_occurrence(occurrence, out, marker, parent),
        NodeRef::Value(value) => emit_value(value, out, marker, parent),
        NodeRef::Typename(name) => emit_typename(name, out, marker, parent),
        NodeRef::ChoiceFrom(choice) => emit_choice_from(choice, out, marker, parent),
        NodeRef::Tag(tag) => emit_tag(tag, out, marker, parent),
        NodeRef::GenericParameters(params) => emit_generic_parameters(params, out, marker, parent),
        NodeRef::GenericArguments(args) => emit_generic_arguments(args, out, marker, parent),
    }
}

// ── Emission helpers ───────────────────────────────────────────────────

fn emit_token(out: &mut String, token: &Token, marker: Option<&dyn Marker>, ctx: &Ancestry<'_>) {
    match marker {
        Some(m) => out.push_str(&m.serialize_token(token, ctx)),
        None => out.push_str(&token.serialize()),
    }
}

fn emit_opt_token(
    out: &mut String,
    token: Option<&Token>,
    marker: Option<&dyn Marker>,
    ctx: &Ancestry<'_>,
) {
    if let Some(token) = token {
        emit_token(out, token, marker, ctx);
    }
}

fn markup_for(marker: Option<&dyn Marker>, ctx: &Ancestry<'_>) -> Markup {
    marker.map_or((None, None), |m| m.markup_for(ctx))
}

fn push_markup(out: &mut String, part: &Option<String>) {
    if let Some(text) = part {
        out.push_str(text);
    }
}

/// Emit the comments and whitespace a trivia-bearing node lifted off its
/// leading token.
fn emit_trivia(
    out: &mut String,
    comments: &[Token],
    whitespace: &str,
    marker: Option<&dyn Marker>,
    ctx: &Ancestry<'_>,
) {
    for comment in comments {
        emit_token(out, comment, marker, ctx);
    }
    out.push_str(whitespace);
}

// ── Node emitters ──────────────────────────────────────────────────────

fn emit_tree(tree: &CddlTree, out: &mut String, marker: Option<&dyn Marker>) {
    let ctx = Ancestry {
        node: NodeRef::Tree(tree),
        parent: None,
    };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    for rule in &tree.rules {
        emit_rule(rule, out, marker, Some(&ctx));
    }
    push_markup(out, &suffix);
    emit_token(out, &tree.separator, marker, &ctx);
}

fn emit_rule(rule: &Rule, out: &mut String, marker: Option<&dyn Marker>, parent: Option<&Ancestry<'_>>) {
    let ctx = Ancestry {
        node: NodeRef::Rule(rule),
        parent,
    };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    emit_typename(&rule.name, out, marker, Some(&ctx));
    emit_token(out, &rule.assign, marker, &ctx);
    match &rule.rhs {
        RuleRhs::Type(ty) => emit_type(ty, out, marker, Some(&ctx)),
        RuleRhs::Entry(entry) => emit_group_entry(entry, out, marker, Some(&ctx)),
    }
    push_markup(out, &suffix);
}

fn emit_group_entry(
    entry: &GroupEntry,
    out: &mut String,
    marker: Option<&dyn Marker>,
    parent: Option<&Ancestry<'_>>,
) {
    let ctx = Ancestry {
        node: NodeRef::GroupEntry(entry),
        parent,
    };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    if let Some(occurrence) = &entry.occurrence {
        emit_occurrence(occurrence, out, marker, Some(&ctx));
    }
    if let Some(key) = &entry.key {
        emit_memberkey(key, out, marker, Some(&ctx));
    }
    emit_type(&entry.ty, out, marker, Some(&ctx));
    push_markup(out, &suffix);
    emit_opt_token(out, entry.separator.as_ref(), marker, &ctx);
}

/// Shared emitter for the three group bracketings; `view` fixes whether the
/// frame reads as a bare group, a map or an array.
fn emit_group(
    group: &Group,
    view: NodeRef<'_>,
    out: &mut String,
    marker: Option<&dyn Marker>,
    parent: Option<&Ancestry<'_>>,
) {
    let ctx = Ancestry { node: view, parent };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    emit_opt_token(out, group.open.as_ref(), marker, &ctx);
    for choice in &group.choices {
        emit_group_choice(choice, out, marker, Some(&ctx));
    }
    emit_opt_token(out, group.close.as_ref(), marker, &ctx);
    push_markup(out, &suffix);
    emit_opt_token(out, group.separator.as_ref(), marker, &ctx);
}

fn emit_group_choice(
    choice: &GroupChoice,
    out: &mut String,
    marker: Option<&dyn Marker>,
    parent: Option<&Ancestry<'_>>,
) {
    let ctx = Ancestry {
        node: NodeRef::GroupChoice(choice),
        parent,
    };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    for entry in &choice.entries {
        emit_group_entry(entry, out, marker, Some(&ctx));
    }
    push_markup(out, &suffix);
    emit_opt_token(out, choice.separator.as_ref(), marker, &ctx);
}

fn emit_type(ty: &Type, out: &mut String, marker: Option<&dyn Marker>, parent: Option<&Ancestry<'_>>) {
    let ctx = Ancestry {
        node: NodeRef::Type(ty),
        parent,
    };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    emit_opt_token(out, ty.open.as_ref(), marker, &ctx);
    for alternative in &ty.alternatives {
        emit_type1(alternative, out, marker, Some(&ctx));
    }
    emit_opt_token(out, ty.close.as_ref(), marker, &ctx);
    push_markup(out, &suffix);
    emit_opt_token(out, ty.separator.as_ref(), marker, &ctx);
}

fn emit_type1(t1: &Type1, out: &mut String, marker: Option<&dyn Marker>, parent: Option<&Ancestry<'_>>) {
    match t1 {
        Type1::Type2(t2) => emit_type2(t2, out, marker, parent),
        Type1::Range(range) => emit_range(range, out, marker, parent),
        Type1::Operator(op) => emit_operator(op, out, marker, parent),
    }
}

fn emit_type2(t2: &Type2, out: &mut String, marker: Option<&dyn Marker>, parent: Option<&Ancestry<'_>>) {
    match t2 {
        Type2::Value(value) => emit_value(value, out, marker, parent),
        Type2::Typename(name) => emit_typename(name, out, marker, parent),
        Type2::Type(ty) => emit_type(ty, out, marker, parent),
        Type2::Group(group) => emit_group(group, NodeRef::Group(group), out, marker, parent),
        Type2::Map(group) => emit_group(group, NodeRef::Map(group), out, marker, parent),
        Type2::Array(group) => emit_group(group, NodeRef::Array(group), out, marker, parent),
        Type2::ChoiceFrom(choice) => emit_choice_from(choice, out, marker, parent),
        Type2::Tag(tag) => emit_tag(tag, out, marker, parent),
    }
}

fn emit_range(range: &Range, out: &mut String, marker: Option<&dyn Marker>, parent: Option<&Ancestry<'_>>) {
    let ctx = Ancestry {
        node: NodeRef::Range(range),
        parent,
    };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    emit_range_bound(&range.min, out, marker, &ctx);
    emit_token(out, &range.op, marker, &ctx);
    emit_range_bound(&range.max, out, marker, &ctx);
    push_markup(out, &suffix);
    emit_opt_token(out, range.separator.as_ref(), marker, &ctx);
}

fn emit_range_bound(bound: &RangeBound, out: &mut String, marker: Option<&dyn Marker>, ctx: &Ancestry<'_>) {
    match bound {
        RangeBound::Value(value) => emit_value(value, out, marker, Some(ctx)),
        RangeBound::Typename(name) => emit_typename(name, out, marker, Some(ctx)),
    }
}

fn emit_operator(op: &Operator, out: &mut String, marker: Option<&dyn Marker>, parent: Option<&Ancestry<'_>>) {
    let ctx = Ancestry {
        node: NodeRef::Operator(op),
        parent,
    };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    emit_type2(&op.lhs, out, marker, Some(&ctx));
    emit_token(out, &op.name, marker, &ctx);
    emit_type2(&op.rhs, out, marker, Some(&ctx));
    push_markup(out, &suffix);
    emit_opt_token(out, op.separator.as_ref(), marker, &ctx);
}

fn emit_memberkey(
    key: &Memberkey,
    out: &mut String,
    marker: Option<&dyn Marker>,
    parent: Option<&Ancestry<'_>>,
) {
    let ctx = Ancestry {
        node: NodeRef::Memberkey(key),
        parent,
    };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    emit_type1(&key.ty, out, marker, Some(&ctx));
    for token in &key.tokens {
        emit_token(out, token, marker, &ctx);
    }
    push_markup(out, &suffix);
}

fn emit_occurrence(
    occurrence: &Occurrence,
    out: &mut String,
    marker: Option<&dyn Marker>,
    parent: Option<&Ancestry<'_>>,
) {
    let ctx = Ancestry {
        node: NodeRef::Occurrence(occurrence),
        parent,
    };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    for token in &occurrence.tokens {
        emit_token(out, token, marker, &ctx);
    }
    push_markup(out, &suffix);
}

fn emit_value(value: &Value, out: &mut String, marker: Option<&dyn Marker>, parent: Option<&Ancestry<'_>>) {
    let ctx = Ancestry {
        node: NodeRef::Value(value),
        parent,
    };
    emit_trivia(out, &value.comments, &value.whitespace, marker, &ctx);
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    let (open, close) = value.kind.delimiters();
    match marker {
        Some(m) => out.push_str(&m.serialize_value(open, &value.value, close, &ctx)),
        None => {
            out.push_str(open);
            out.push_str(&value.value);
            out.push_str(close);
        }
    }
    push_markup(out, &suffix);
    emit_opt_token(out, value.separator.as_ref(), marker, &ctx);
}

fn emit_typename(
    name: &Typename,
    out: &mut String,
    marker: Option<&dyn Marker>,
    parent: Option<&Ancestry<'_>>,
) {
    let ctx = Ancestry {
        node: NodeRef::Typename(name),
        parent,
    };
    // The unwrap `~` precedes the name's own trivia in the source.
    emit_opt_token(out, name.unwrapped.as_ref(), marker, &ctx);
    emit_trivia(out, &name.comments, &name.whitespace, marker, &ctx);
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    match marker {
        Some(m) => out.push_str(&m.serialize_name(&name.name, &ctx)),
        None => out.push_str(&name.name),
    }
    match &name.parameters {
        Some(Generics::Parameters(params)) => {
            emit_generic_parameters(params, out, marker, Some(&ctx));
        }
        Some(Generics::Arguments(args)) => {
            emit_generic_arguments(args, out, marker, Some(&ctx));
        }
        None => {}
    }
    push_markup(out, &suffix);
    emit_opt_token(out, name.separator.as_ref(), marker, &ctx);
}

fn emit_choice_from(
    choice: &ChoiceFrom,
    out: &mut String,
    marker: Option<&dyn Marker>,
    parent: Option<&Ancestry<'_>>,
) {
    let ctx = Ancestry {
        node: NodeRef::ChoiceFrom(choice),
        parent,
    };
    emit_trivia(out, &choice.comments, &choice.whitespace, marker, &ctx);
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    // The `&` trivia was lifted onto the node, so a bare token is emitted.
    emit_token(out, &Token::new(TokenKind::Ampersand, ""), marker, &ctx);
    match &choice.target {
        ChoiceTarget::Group(group) => {
            emit_group(group, NodeRef::Group(group), out, marker, Some(&ctx));
        }
        ChoiceTarget::Typename(name) => emit_typename(name, out, marker, Some(&ctx)),
    }
    push_markup(out, &suffix);
    emit_opt_token(out, choice.separator.as_ref(), marker, &ctx);
}

fn emit_tag(tag: &Tag, out: &mut String, marker: Option<&dyn Marker>, parent: Option<&Ancestry<'_>>) {
    let ctx = Ancestry {
        node: NodeRef::Tag(tag),
        parent,
    };
    emit_trivia(out, &tag.comments, &tag.whitespace, marker, &ctx);
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    emit_token(out, &Token::new(TokenKind::Hash, ""), marker, &ctx);
    emit_opt_token(out, tag.numeric.as_ref(), marker, &ctx);
    if let Some(ty) = &tag.ty {
        emit_type(ty, out, marker, Some(&ctx));
    }
    push_markup(out, &suffix);
    emit_opt_token(out, tag.separator.as_ref(), marker, &ctx);
}

fn emit_generic_parameters(
    params: &GenericParameters,
    out: &mut String,
    marker: Option<&dyn Marker>,
    parent: Option<&Ancestry<'_>>,
) {
    let ctx = Ancestry {
        node: NodeRef::GenericParameters(params),
        parent,
    };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    emit_token(out, &params.open, marker, &ctx);
    for param in &params.params {
        emit_typename(param, out, marker, Some(&ctx));
    }
    emit_token(out, &params.close, marker, &ctx);
    push_markup(out, &suffix);
}

fn emit_generic_arguments(
    args: &GenericArguments,
    out: &mut String,
    marker: Option<&dyn Marker>,
    parent: Option<&Ancestry<'_>>,
) {
    let ctx = Ancestry {
        node: NodeRef::GenericArguments(args),
        parent,
    };
    let (prefix, suffix) = markup_for(marker, &ctx);
    push_markup(out, &prefix);
    emit_token(out, &args.open, marker, &ctx);
    for arg in &args.params {
        emit_type1(arg, out, marker, Some(&ctx));
    }
    emit_token(out, &args.close, marker, &ctx);
    push_markup(out, &suffix);
}
