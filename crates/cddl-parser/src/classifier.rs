//! Rule-kind resolution.
//!
//! After parsing, a rule's right-hand side is either a [`Type`] (certainly a
//! type definition) or a [`GroupEntry`] (not yet known). This pass partitions
//! rule names into type-definitions and group-definitions, then rewrites the
//! right-hand side of every resolved type rule from its group entry to the
//! entry's inner type.
//!
//! Classification is a whole-document analysis: a name's kind can depend on
//! every rule that mentions it, so definite facts are collected first and
//! then propagated to a fixpoint over the finite set of rule names. Names
//! that stay unknown keep their group-entry form.
//!
//! Errors are reported as plain messages; the parser wraps them with source
//! location.

use rustc_hash::FxHashSet;

use cddl_common::token::TokenKind;

use crate::ast::{
    CddlTree, Group, GroupEntry, NodeRef, RangeBound, RuleRhs, Type1, Type2, Typename,
    PRELUDE_TYPES,
};

/// What a type alternative says about the rule that holds it.
enum Underlying {
    Type,
    Group,
    Unknown,
}

pub(crate) fn classify(tree: &mut CddlTree) -> Result<(), String> {
    let mut rulenames: FxHashSet<&str> = FxHashSet::default();
    let mut typenames: FxHashSet<String> = FxHashSet::default();
    let mut groupnames: FxHashSet<String> = FxHashSet::default();

    for rule in &tree.rules {
        rulenames.insert(rule.name.name.as_str());
    }

    // First pass: rules whose form alone decides their kind.
    for rule in &tree.rules {
        let name = &rule.name.name;

        // The first rule names the type a document describes (RFC 8610
        // section 2.2.4); conflicts surface as errors later.
        if typenames.is_empty() {
            typenames.insert(name.clone());
        }

        let RuleRhs::Entry(entry) = &rule.rhs else {
            typenames.insert(name.clone());
            continue;
        };

        // `/=` and `//=` name their kind outright. The parser already maps
        // `/=` to a Type right-hand side; the check covers assembled trees.
        if rule.assign.kind == TokenKind::TChoiceAlt {
            typenames.insert(name.clone());
        }
        if rule.assign.kind == TokenKind::GChoiceAlt {
            groupnames.insert(name.clone());
        }

        // Unparenthesized alternatives are a type choice.
        if entry.ty.alternatives.len() > 1 && entry.ty.open.is_none() {
            typenames.insert(name.clone());
        }

        // An occurrence or a member key only makes sense in a group, whether
        // it sits on the entry itself or inside a bare parenthesized group.
        if entry.occurrence.is_some() || entry.key.is_some() || entry_wraps_members(entry) {
            groupnames.insert(name.clone());
        }
    }

    // A typename used as a member key in arrow form refers to a type, not a
    // bareword (RFC 8610 section 2.1.2).
    let mut stack = vec![NodeRef::Tree(&*tree)];
    while let Some(node) = stack.pop() {
        if let NodeRef::GroupEntry(entry) = node {
            if let Some(key) = &entry.key {
                if !key.has_colon {
                    if let Type1::Type2(Type2::Typename(keyname)) = &key.ty {
                        if rulenames.contains(keyname.name.as_str()) {
                            typenames.insert(keyname.name.clone());
                        }
                    }
                }
            }
        }
        stack.extend(node.children());
    }

    // Propagate to a fixpoint: a rule of known kind passes that kind to the
    // rule names it references directly, and an `=` rule whose alternatives
    // all resolve the same way takes that kind itself.
    let mut update_found = true;
    while update_found {
        update_found = false;
        for rule in &tree.rules {
            let name = &rule.name.name;
            let entry = match &rule.rhs {
                RuleRhs::Type(ty) => {
                    for alternative in &ty.alternatives {
                        if let Type1::Type2(Type2::Typename(referenced)) = alternative {
                            if rulenames.contains(referenced.name.as_str()) {
                                update_found |= typenames.insert(referenced.name.clone());
                            }
                        }
                    }
                    continue;
                }
                RuleRhs::Entry(entry) => entry,
            };

            if typenames.contains(name) {
                for alternative in &entry.ty.alternatives {
                    if let Type1::Type2(Type2::Typename(referenced)) = alternative {
                        if rulenames.contains(referenced.name.as_str()) {
                            update_found |= typenames.insert(referenced.name.clone());
                        }
                    }
                }
            }
            if groupnames.contains(name) {
                for alternative in &entry.ty.alternatives {
                    if let Type1::Type2(Type2::Typename(referenced)) = alternative {
                        if rulenames.contains(referenced.name.as_str()) {
                            update_found |= groupnames.insert(referenced.name.clone());
                        }
                    }
                }
            }

            if rule.assign.kind == TokenKind::Assign {
                let mut saw_type = false;
                let mut saw_group = false;
                for alternative in &entry.ty.alternatives {
                    match underlying_of_type1(alternative, &typenames, &groupnames) {
                        Underlying::Type => saw_type = true,
                        Underlying::Group => saw_group = true,
                        Underlying::Unknown => {}
                    }
                }
                if saw_type && saw_group {
                    return Err(format!(
                        "rule \"{name}\" targets a mix of type and group rules"
                    ));
                }
                if saw_type {
                    update_found |= typenames.insert(name.clone());
                } else if saw_group {
                    update_found |= groupnames.insert(name.clone());
                }
            }
        }
    }

    // A name resolved both ways is a contradiction in the document.
    let mut overlap: Vec<&str> = typenames
        .intersection(&groupnames)
        .map(String::as_str)
        .collect();
    if !overlap.is_empty() {
        overlap.sort_unstable();
        return Err(format!(
            "mix of type and group definitions for {}",
            overlap.join(", ")
        ));
    }

    // Rewrite resolved type rules from group entry to inner type.
    for rule in &mut tree.rules {
        if !matches!(rule.rhs, RuleRhs::Entry(_)) || !typenames.contains(&rule.name.name) {
            continue;
        }
        let placeholder = RuleRhs::Type(crate::ast::Type {
            alternatives: Vec::new(),
            open: None,
            close: None,
            separator: None,
        });
        if let RuleRhs::Entry(entry) = std::mem::replace(&mut rule.rhs, placeholder) {
            if !entry.is_convertible_to_type() {
                return Err(format!(
                    "rule \"{}\" is a type definition but uses a group entry",
                    rule.name.name
                ));
            }
            rule.rhs = RuleRhs::Type(entry.ty);
        }
    }

    Ok(())
}

/// Whether a rule's entry is a bare parenthesized group whose entries carry
/// member keys or occurrences, which only a group definition can supply.
fn entry_wraps_members(entry: &GroupEntry) -> bool {
    match entry.ty.alternatives.as_slice() {
        [Type1::Type2(Type2::Group(group))] => group_defines_members(group),
        _ => false,
    }
}

fn group_defines_members(group: &Group) -> bool {
    group.choices.iter().any(|choice| {
        choice.entries.iter().any(|entry| {
            entry.occurrence.is_some() || entry.key.is_some() || entry_wraps_members(entry)
        })
    })
}

fn underlying_of_type1(
    alternative: &Type1,
    typenames: &FxHashSet<String>,
    groupnames: &FxHashSet<String>,
) -> Underlying {
    match alternative {
        Type1::Type2(t2) => underlying_of_type2(t2, typenames, groupnames),
        // A range bound is a value or a name standing for one.
        Type1::Range(range) => match &range.min {
            RangeBound::Value(_) => Underlying::Type,
            RangeBound::Typename(name) => name_kind(name, typenames, groupnames),
        },
        // A control operator constrains its left-hand side.
        Type1::Operator(op) => underlying_of_type2(&op.lhs, typenames, groupnames),
    }
}

fn underlying_of_type2(
    t2: &Type2,
    typenames: &FxHashSet<String>,
    groupnames: &FxHashSet<String>,
) -> Underlying {
    match t2 {
        Type2::Value(_) | Type2::Map(_) | Type2::Array(_) | Type2::ChoiceFrom(_) | Type2::Tag(_) => {
            Underlying::Type
        }
        Type2::Typename(name) => name_kind(name, typenames, groupnames),
        Type2::Type(_) | Type2::Group(_) => Underlying::Unknown,
    }
}

fn name_kind(
    name: &Typename,
    typenames: &FxHashSet<String>,
    groupnames: &FxHashSet<String>,
) -> Underlying {
    if typenames.contains(&name.name) || PRELUDE_TYPES.contains(&name.name.as_str()) {
        Underlying::Type
    } else if groupnames.contains(&name.name) {
        Underlying::Group
    } else {
        Underlying::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_source(source: &str) -> Result<CddlTree, String> {
        // Classification runs inside parse(); errors come back with location
        // attached, so compare on the message prefix.
        crate::parse(source).map_err(|e| e.message)
    }

    #[test]
    fn first_rule_becomes_a_typename() {
        let tree = classify_source("a = b\nb = int\n").expect("classification failed");
        assert!(matches!(tree.rules[0].rhs, RuleRhs::Type(_)));
        assert!(matches!(tree.rules[1].rhs, RuleRhs::Type(_)));
    }

    #[test]
    fn group_rule_keeps_its_entry() {
        let tree =
            classify_source("top = int\nextras = ( lat: float, long: float )\n")
                .expect("classification failed");
        assert!(matches!(tree.rules[1].rhs, RuleRhs::Entry(_)));
    }

    #[test]
    fn type_reference_to_keyed_group_is_rejected() {
        let err = classify_source("a = b\nb = (x: int)\n").expect_err("conflict accepted");
        assert_eq!(err, "mix of type and group definitions for b");
    }

    #[test]
    fn bare_member_key_rule_conflicts_with_type_use() {
        let err = classify_source("a = b\nb = x: int\n").expect_err("conflict accepted");
        assert_eq!(err, "mix of type and group definitions for b");
    }

    #[test]
    fn mixed_alternatives_are_rejected() {
        // The operator's left-hand side resolves through the group rule, the
        // second alternative through the prelude.
        let err = classify_source("top = int\ngrp = (a: 1)\nbad = grp .size 4 / int\n")
            .expect_err("mix accepted");
        assert_eq!(err, "rule \"bad\" targets a mix of type and group rules");
    }

    #[test]
    fn group_kind_propagates_through_references() {
        let tree = classify_source("top = int\nbase = (a: 1)\nalias = base\ngrp //= alias\n")
            .expect("classification failed");
        // `alias` is referenced by a group-choice rule, so it stays a group.
        assert!(matches!(tree.rules[2].rhs, RuleRhs::Entry(_)));
    }

    #[test]
    fn parenthesized_alternatives_stay_unresolved() {
        let tree = classify_source("top = int\nmixed = (1 / tstr)\n")
            .expect("classification failed");
        assert!(matches!(tree.rules[1].rhs, RuleRhs::Entry(_)));
    }

    #[test]
    fn choice_alt_assignments_fix_the_kind() {
        let tree = classify_source("top = int\nattire /= \"necktie\"\nextra //= (a: 1)\n")
            .expect("classification failed");
        assert!(matches!(tree.rules[1].rhs, RuleRhs::Type(_)));
        assert!(matches!(tree.rules[2].rhs, RuleRhs::Entry(_)));
    }
}
