//! Structured operations over shaped operands.
//!
//! This crate defines the affine-indexed structured-operation subsystem: a
//! descriptor for loop-nest-style operations whose operand accesses are
//! described by affine indexing maps, together with its verifier, the
//! reshape/reassociation engine, loop-range inference, and the
//! canonicalization rule set.
//!
//! # Module Organization
//!
//! - [`types`] - Element types, static/dynamic extents, tensor/memref types
//! - [`value`] - IR values with provenance (casts, constants, reshapes)
//! - [`op`] - The structured-op descriptor and its region body
//! - [`verify`] - Structural verification with precise diagnostics
//! - [`ranges`] - Iteration-space loop-range computation
//! - [`reshape`] - Reassociation validation and reshape type inference
//! - [`canonicalize`] - Local rewrite rules (dead-op, casts, dedup, reshape)
//! - [`effects`] - Memory-effect reporting for dependence analysis
//! - [`print`] / [`parser`] - Fixed textual form
//! - [`error`] - Error types and result handling

pub mod canonicalize;
pub mod effects;
pub mod error;
pub mod op;
pub mod parser;
pub mod prelude;
pub mod print;
pub mod ranges;
pub mod reshape;
pub mod types;
pub mod value;
pub mod verify;


pub use error::{Error, Result};
pub use op::{Block, BodyValue, IteratorKind, OpKind, ScalarKind, ScalarOp, SparseDim, StructuredOp};
pub use reshape::ReshapeOp;
pub use types::{ConstValue, DimSize, ElementType, Layout, MemRefType, Shape, ShapedType, TensorType};
pub use value::{Value, ValueDef};

// Re-export the algebra for convenience.
pub use weft_affine::{AffineExpr, AffineMap, Context};
