//! Affine expression and map algebra.
//!
//! This crate implements the symbolic core used by the structured-op IR:
//! integer-valued affine expressions over dimension and symbol variables,
//! and ordered collections of such expressions ([`AffineMap`]) that describe
//! how loop-nest coordinates address shaped operands.
//!
//! # Module Organization
//!
//! - [`context`] - Per-compilation interning arena and expression constructors
//! - [`expr`] - Immutable interned expression values
//! - [`map`] - Affine maps: composition, concatenation, permutation inversion
//! - [`parse`] - Textual form (`(d0, d1)[s0] -> (d0 + s0)`)
//!
//! Expressions are hash-consed inside a [`Context`]: structurally identical
//! expressions built through the same context share one allocation, so
//! equality is a cheap ID comparison. Expressions from different contexts
//! must never be mixed; all algebra entry points take the owning context.

pub mod context;
pub mod expr;
pub mod map;
pub mod parse;


pub use context::{BinOp, Context};
pub use expr::{AffineExpr, ExprKind};
pub use map::AffineMap;
pub use parse::ParseError;
