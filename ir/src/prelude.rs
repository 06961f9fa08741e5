//! Common imports for working with structured ops.
//!
//! This module provides a convenient way to import the most commonly used
//! types:
//!
//! ```rust,ignore
//! use weft_ir::prelude::*;
//! ```

// Core types
pub use crate::op::{Block, BodyValue, IteratorKind, OpKind, ScalarKind, ScalarOp, SparseDim, StructuredOp};
pub use crate::value::{Value, ValueDef};

// Types and shapes
pub use crate::types::{
    static_shape, ConstValue, DimSize, ElementType, Layout, MemRefType, Shape, ShapedType, TensorType,
};

// Reshape engine
pub use crate::reshape::ReshapeOp;

// Verification and rewriting
pub use crate::canonicalize::{canonicalize, StructuredRewrite};
pub use crate::error::{Error, Result};
pub use crate::ranges::{IndexValue, LoopRange};
pub use crate::verify::verify;

// Re-exports from the affine algebra
pub use weft_affine::{AffineExpr, AffineMap, BinOp, Context};
