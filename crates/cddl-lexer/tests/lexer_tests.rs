use cddl_lexer::Lexer;
use insta::assert_snapshot;

/// Render a token stream as one line of `Kind(literal)` entries.
fn render(source: &str) -> String {
    Lexer::tokenize(source)
        .expect("lexing failed")
        .iter()
        .map(|token| {
            if token.literal.is_empty() {
                format!("{:?}", token.kind)
            } else {
                format!("{:?}({})", token.kind, token.literal)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Concatenating every token's serialization must reproduce the source.
fn assert_token_roundtrip(source: &str) {
    let rebuilt: String = Lexer::tokenize(source)
        .expect("lexing failed")
        .iter()
        .map(|token| token.serialize())
        .collect();
    assert_eq!(rebuilt, source);
}

// ── Fixture round-trips ────────────────────────────────────────────────

#[test]
fn tokens_roundtrip_person() {
    assert_token_roundtrip(include_str!("../../../tests/fixtures/person.cddl"));
}

#[test]
fn tokens_roundtrip_choices() {
    assert_token_roundtrip(include_str!("../../../tests/fixtures/choices.cddl"));
}

#[test]
fn tokens_roundtrip_ranges() {
    assert_token_roundtrip(include_str!("../../../tests/fixtures/ranges.cddl"));
}

#[test]
fn tokens_roundtrip_controls() {
    assert_token_roundtrip(include_str!("../../../tests/fixtures/controls.cddl"));
}

#[test]
fn tokens_roundtrip_generics() {
    assert_token_roundtrip(include_str!("../../../tests/fixtures/generics.cddl"));
}

#[test]
fn tokens_roundtrip_reputation() {
    assert_token_roundtrip(include_str!("../../../tests/fixtures/reputation.cddl"));
}

// ── Boundary cases ─────────────────────────────────────────────────────

#[test]
fn range_after_integer_part() {
    assert_snapshot!(render("0..10"), @"Number(0) InclRange Number(10) Eof");
    assert_snapshot!(render("0...10"), @"Number(0) ExclRange Number(10) Eof");
    assert_token_roundtrip("0..10");
}

#[test]
fn occurrence_bounds_must_abut() {
    assert_snapshot!(render("*3 foo"), @"Asterisk Number(3) Ident(foo) Eof");
    assert_snapshot!(render("* 3 foo"), @"Asterisk Number(3) Ident(foo) Eof");
    // The lexer cannot tell the two apart by kinds; the trivia does.
    let spaced = Lexer::tokenize("* 3 foo").expect("lexing failed");
    assert!(spaced[1].starts_with_spaces());
    let abutting = Lexer::tokenize("*3 foo").expect("lexing failed");
    assert!(!abutting[1].starts_with_spaces());
}

#[test]
fn byte_string_prefixes() {
    assert_snapshot!(render("b64'AA==' b64ident h'DEAD' h"), @"Base64(AA==) Ident(b64ident) Hex(DEAD) Ident(h) Eof");
}

#[test]
fn tag_shapes() {
    assert_snapshot!(render("# #0 #6.24 #7.25"), @"Hash Hash Number(0) Hash Float(6.24) Hash Float(7.25) Eof");
}

#[test]
fn assignment_family() {
    assert_snapshot!(render("a = b /= c //= d => e"), @"Ident(a) Assign Ident(b) TChoiceAlt Ident(c) GChoiceAlt Ident(d) Arrow Ident(e) Eof");
}

#[test]
fn control_operator_after_spaced_dot() {
    assert_snapshot!(render("tstr .size 4"), @"Ident(tstr) Ctlop(size) Number(4) Eof");
    // Without the space the dot continues the identifier.
    assert_snapshot!(render("tstr.size"), @"Ident(tstr.size) Eof");
}

#[test]
fn comments_and_whitespace_are_lossless() {
    let source = "; header\n\nperson = {\t; inline\n  age: int\n}\n";
    assert_token_roundtrip(source);
}

#[test]
fn crlf_is_preserved() {
    assert_token_roundtrip("a = int\r\nb = tstr\r\n");
}

#[test]
fn empty_and_trivia_only_inputs() {
    assert_token_roundtrip("");
    assert_token_roundtrip("   \n\t");
    assert_token_roundtrip("; just a comment");
}
