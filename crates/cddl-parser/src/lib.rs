//! CDDL parser: lossless front-end for RFC 8610 CDDL.
//!
//! The pipeline turns source text into a [`CddlTree`] and back:
//!
//! 1. `cddl-lexer` produces tokens carrying their leading comments and
//!    whitespace.
//! 2. The recursive descent parser builds the AST, recording every consumed
//!    token (brackets, assignment and range operators, list separators) on
//!    the node that owns it.
//! 3. The classifier resolves each rule as a type-definition or a
//!    group-definition and normalizes type rules.
//! 4. [`CddlTree::serialize`] walks the tree back into text, byte-identical
//!    to the input; [`CddlTree::serialize_with`] lets a [`Marker`] decorate
//!    the output.
//!
//! ```
//! let source = "person = { age: int, name: tstr }\n";
//! let tree = cddl_parser::parse(source).unwrap();
//! assert_eq!(tree.serialize(), source);
//! ```

pub mod ast;
mod classifier;
mod parser;
pub mod serialize;

pub use ast::{CddlTree, NodeRef};
pub use cddl_common::error::ParserError;
pub use serialize::{Ancestry, Marker, Markup};

/// Parse CDDL source text into a classified [`CddlTree`].
///
/// Fails with a [`ParserError`] on the first lexer, parser or classification
/// error.
pub fn parse(source: &str) -> Result<CddlTree, ParserError> {
    parser::Parser::new(source)?.parse()
}
