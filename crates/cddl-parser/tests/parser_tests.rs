//! Structural tests for the parser and classifier, following the RFC 8610
//! constructs the grammar exercises.

use cddl_common::token::TokenKind;
use cddl_parser::ast::{
    CddlTree, Generics, RangeBound, RuleRhs, Type, Type1, Type2, ValueKind,
};
use cddl_parser::parse;
use insta::assert_snapshot;

/// One `name: kind` entry per rule, in document order.
fn classify_summary(source: &str) -> String {
    let tree = parse(source).expect("parse failed");
    tree.rules
        .iter()
        .map(|rule| {
            let kind = match &rule.rhs {
                RuleRhs::Type(_) => "type",
                RuleRhs::Entry(_) => "group-entry",
            };
            format!("{}: {}", rule.name.name, kind)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// The right-hand side of rule `index`, which must have classified as a type.
fn rule_type(tree: &CddlTree, index: usize) -> &Type {
    match &tree.rules[index].rhs {
        RuleRhs::Type(ty) => ty,
        RuleRhs::Entry(_) => panic!("rule {index} did not classify as a type"),
    }
}

fn single_alternative(ty: &Type) -> &Type1 {
    assert_eq!(ty.alternatives.len(), 1, "expected a single alternative");
    &ty.alternatives[0]
}

// ── End-to-end scenarios ───────────────────────────────────────────────

#[test]
fn minimal_group_definition() {
    let source = "person = { age: int, name: tstr }\n";
    let tree = parse(source).expect("parse failed");
    assert_eq!(tree.rules.len(), 1);

    let rule = &tree.rules[0];
    assert_eq!(rule.name.name, "person");
    assert_eq!(rule.assign.kind, TokenKind::Assign);

    let Type1::Type2(Type2::Map(map)) = single_alternative(rule_type(&tree, 0)) else {
        panic!("expected a map");
    };
    assert_eq!(map.choices.len(), 1);
    let entries = &map.choices[0].entries;
    assert_eq!(entries.len(), 2);

    let age = entries[0].key.as_ref().expect("age has no key");
    assert!(age.has_colon);
    assert!(age.has_cut);
    let Type1::Type2(Type2::Typename(key)) = &age.ty else {
        panic!("expected a bareword key");
    };
    assert_eq!(key.name, "age");
    let Type1::Type2(Type2::Typename(age_type)) = single_alternative(&entries[0].ty) else {
        panic!("expected a typename");
    };
    assert_eq!(age_type.name, "int");

    // The comma belongs to the first entry.
    assert!(entries[0].separator.is_some());
    assert!(entries[1].separator.is_none());

    assert_eq!(tree.serialize(), source);
}

#[test]
fn type_alternative_rule() {
    let source = "attire = \"bow tie\" / \"necktie\" / \"Internet attire\"\n";
    let tree = parse(source).expect("parse failed");

    let ty = rule_type(&tree, 0);
    assert_eq!(ty.alternatives.len(), 3);
    for (index, alternative) in ty.alternatives.iter().enumerate() {
        let Type1::Type2(Type2::Value(value)) = alternative else {
            panic!("expected a text value");
        };
        assert_eq!(value.kind, ValueKind::Text);
        // `/` separators hang off the first two alternatives.
        assert_eq!(value.separator.is_some(), index < 2);
    }

    assert_eq!(tree.serialize(), source);
}

#[test]
fn range_occurrence_and_comments() {
    let source = "; sizes\nsquare = [ 1*4 uint .. 100 ]\n";
    let tree = parse(source).expect("parse failed");

    let rule = &tree.rules[0];
    assert_eq!(rule.name.comments.len(), 1);
    assert_eq!(rule.name.comments[0].literal, "; sizes");

    let Type1::Type2(Type2::Array(array)) = single_alternative(rule_type(&tree, 0)) else {
        panic!("expected an array");
    };
    let entry = &array.choices[0].entries[0];
    let occurrence = entry.occurrence.as_ref().expect("no occurrence");
    assert_eq!((occurrence.n, occurrence.m), (1, Some(4)));

    let Type1::Range(range) = single_alternative(&entry.ty) else {
        panic!("expected a range");
    };
    assert_eq!(range.op.kind, TokenKind::InclRange);
    let RangeBound::Typename(min) = &range.min else {
        panic!("expected a typename bound");
    };
    assert_eq!(min.name, "uint");
    let RangeBound::Value(max) = &range.max else {
        panic!("expected a value bound");
    };
    assert_eq!(max.value, "100");
    assert_eq!(max.kind, ValueKind::Number);

    assert_eq!(tree.serialize(), source);
}

#[test]
fn control_operator_application() {
    let source = "name = tstr .size (1..32)\n";
    let tree = parse(source).expect("parse failed");

    let Type1::Operator(operator) = single_alternative(rule_type(&tree, 0)) else {
        panic!("expected an operator");
    };
    let Type2::Typename(lhs) = operator.lhs.as_ref() else {
        panic!("expected a typename lhs");
    };
    assert_eq!(lhs.name, "tstr");
    assert_eq!(operator.name.kind, TokenKind::Ctlop);
    assert_eq!(operator.name.literal, "size");

    let Type2::Type(wrapped) = operator.rhs.as_ref() else {
        panic!("expected a parenthesized rhs");
    };
    assert!(wrapped.open.is_some() && wrapped.close.is_some());
    let Type1::Range(range) = single_alternative(wrapped) else {
        panic!("expected a range");
    };
    let RangeBound::Value(min) = &range.min else {
        panic!("expected a value bound");
    };
    assert_eq!(min.value, "1");

    assert_eq!(tree.serialize(), source);
}

#[test]
fn generics_and_unwrap() {
    let source = "msg<K,V> = { K => V }\nenvelope = ~msg<tstr, int>\n";
    let tree = parse(source).expect("parse failed");

    let msg = &tree.rules[0];
    let Some(Generics::Parameters(params)) = &msg.name.parameters else {
        panic!("expected generic parameters");
    };
    let names: Vec<_> = params.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["K", "V"]);

    // `K => V` keys with a real typename, no cut.
    let Type1::Type2(Type2::Map(map)) = single_alternative(rule_type(&tree, 0)) else {
        panic!("expected a map");
    };
    let key = map.choices[0].entries[0].key.as_ref().expect("no key");
    assert!(!key.has_cut);
    assert!(!key.has_colon);

    let envelope = rule_type(&tree, 1);
    let Type1::Type2(Type2::Typename(reference)) = single_alternative(envelope) else {
        panic!("expected a typename reference");
    };
    assert_eq!(reference.name, "msg");
    let unwrapped = reference.unwrapped.as_ref().expect("missing unwrap token");
    assert_eq!(unwrapped.kind, TokenKind::Tilde);
    let Some(Generics::Arguments(args)) = &reference.parameters else {
        panic!("expected generic arguments");
    };
    assert_eq!(args.params.len(), 2);

    assert_eq!(tree.serialize(), source);
}

#[test]
fn choice_from_group_and_tags() {
    let source = "unit = & ( m: 0, ft: 1 )\nembedded = #6.24(bstr)\nany-tag = #\n";
    let tree = parse(source).expect("parse failed");

    let Type1::Type2(Type2::ChoiceFrom(choice)) = single_alternative(rule_type(&tree, 0)) else {
        panic!("expected a choice-from");
    };
    assert!(matches!(
        choice.target,
        cddl_parser::ast::ChoiceTarget::Group(_)
    ));

    let Type1::Type2(Type2::Tag(tag)) = single_alternative(rule_type(&tree, 1)) else {
        panic!("expected a tag");
    };
    assert_eq!(tag.numeric.as_ref().expect("no numeric part").literal, "6.24");
    assert!(tag.ty.is_some());

    let Type1::Type2(Type2::Tag(any)) = single_alternative(rule_type(&tree, 2)) else {
        panic!("expected a tag");
    };
    assert!(any.numeric.is_none() && any.ty.is_none());

    assert_eq!(tree.serialize(), source);
}

// ── Occurrence forms ───────────────────────────────────────────────────

#[test]
fn occurrence_forms() {
    let source = "top = [ ? a, * b, + c, *5 d, 2* e, 2*5 f ]\n";
    let tree = parse(source).expect("parse failed");
    let Type1::Type2(Type2::Array(array)) = single_alternative(rule_type(&tree, 0)) else {
        panic!("expected an array");
    };
    let bounds: Vec<_> = array.choices[0]
        .entries
        .iter()
        .map(|entry| {
            let occurrence = entry.occurrence.as_ref().expect("no occurrence");
            (occurrence.n, occurrence.m)
        })
        .collect();
    assert_eq!(
        bounds,
        [
            (0, Some(1)),
            (0, None),
            (1, None),
            (0, Some(5)),
            (2, None),
            (2, Some(5)),
        ]
    );
    assert_eq!(tree.serialize(), source);
}

#[test]
fn spaced_occurrence_bound_is_a_separate_value() {
    // `* 3` is an unbounded occurrence followed by the value 3.
    let source = "top = [ * 3 ]\n";
    let tree = parse(source).expect("parse failed");
    let Type1::Type2(Type2::Array(array)) = single_alternative(rule_type(&tree, 0)) else {
        panic!("expected an array");
    };
    let entry = &array.choices[0].entries[0];
    let occurrence = entry.occurrence.as_ref().expect("no occurrence");
    assert_eq!((occurrence.n, occurrence.m), (0, None));
    let Type1::Type2(Type2::Value(value)) = single_alternative(&entry.ty) else {
        panic!("expected a number value");
    };
    assert_eq!(value.value, "3");
    assert_eq!(tree.serialize(), source);
}

// ── Group choices ──────────────────────────────────────────────────────

#[test]
fn group_choices_attach_separators() {
    let source = "top = { a: 1 // b: 2 }\n";
    let tree = parse(source).expect("parse failed");
    let Type1::Type2(Type2::Map(map)) = single_alternative(rule_type(&tree, 0)) else {
        panic!("expected a map");
    };
    assert_eq!(map.choices.len(), 2);
    let first = &map.choices[0];
    let second = &map.choices[1];
    assert_eq!(
        first.separator.as_ref().expect("missing `//`").kind,
        TokenKind::GChoice
    );
    assert!(second.separator.is_none());
    assert_eq!(tree.serialize(), source);
}

// ── Classification summaries ───────────────────────────────────────────

#[test]
fn classification_by_reference() {
    assert_snapshot!(
        classify_summary("top = int\ngrp = (a: 1)\nalias = top\n"),
        @"top: type, grp: group-entry, alias: type"
    );
}

#[test]
fn classification_by_assignment_operator() {
    assert_snapshot!(
        classify_summary("top = int\nattire /= \"necktie\"\nextra //= (a: 1)\n"),
        @"top: type, attire: type, extra: group-entry"
    );
}

#[test]
fn classification_of_prelude_references() {
    assert_snapshot!(
        classify_summary("a = uint\nb = a\nc = { x: b }\n"),
        @"a: type, b: type, c: type"
    );
}

// ── Errors ─────────────────────────────────────────────────────────────

#[test]
fn unknown_control_operator_is_rejected() {
    let err = parse("name = tstr .funky 4\n").expect_err("bad operator accepted");
    assert_eq!(err.message, "unknown control operator \"funky\"");
}

#[test]
fn unterminated_map_is_rejected() {
    let err = parse("a = {\n").expect_err("unterminated map accepted");
    assert!(err.message.starts_with("invalid type2 production"));
}

#[test]
fn tag_numeric_part_is_validated() {
    let err = parse("a = #12\n").expect_err("bad tag accepted");
    assert!(err.message.starts_with("data item after \"#\""));
    assert!(parse("a = #6.24(bstr)\n").is_ok());
    assert!(parse("a = #7.25\n").is_ok());
}

#[test]
fn range_bounds_must_be_values_or_typenames() {
    let err = parse("a = (b: 1)..5\n").expect_err("bad range accepted");
    assert!(err
        .message
        .starts_with("range detected but min is neither a value nor a typename"));
}

#[test]
fn missing_assignment_is_rejected() {
    let err = parse("a b\n").expect_err("missing assignment accepted");
    assert!(err.message.starts_with("assignment expected"));
}

#[test]
fn errors_carry_locations() {
    let err = parse("a = int\nb = {\n").expect_err("bad input accepted");
    assert!(err.line >= 2);
    assert!(err.column >= 1);
    assert!(err.to_string().contains("^"));
}

#[test]
fn caret_memberkey_requires_arrow() {
    assert!(parse("a = { b ^ => int }\n").is_ok());
    let err = parse("a = { b ^ int }\n").expect_err("caret without arrow accepted");
    assert!(err.message.starts_with("expected arrow map"));
}
