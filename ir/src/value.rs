//! IR values with provenance.
//!
//! A [`Value`] is a shared handle to a shaped SSA value. The defining
//! operation is recorded where the canonicalization rules need to see it
//! (casts, splat constants, reshapes); anything else is an opaque
//! [`ValueDef::Source`]. Equality and hashing use a stable ID, the same
//! scheme the expression arena uses.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::reshape::ReshapeOp;
use crate::types::{ConstValue, MemRefType, ShapedType, TensorType};

static VALUE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_value_id() -> u64 {
    VALUE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Provenance of a value, limited to the producers canonicalization inspects.
#[derive(Debug)]
pub enum ValueDef {
    /// Opaque producer (function argument, unrelated operation).
    Source,
    /// Splat (uniform-valued) constant.
    Splat(ConstValue),
    /// Tensor-to-tensor shape cast.
    TensorCast(Value),
    /// Memref-to-memref shape cast.
    MemRefCast(Value),
    /// Result of a reshape.
    Reshape(Box<ReshapeOp>),
}

#[derive(Debug)]
struct ValueNode {
    id: u64,
    ty: ShapedType,
    def: ValueDef,
}

/// Shared handle to a shaped value.
#[derive(Clone)]
pub struct Value(Arc<ValueNode>);

impl Value {
    fn new(ty: ShapedType, def: ValueDef) -> Self {
        Self(Arc::new(ValueNode { id: next_value_id(), ty, def }))
    }

    /// A fresh opaque value of the given type.
    pub fn source(ty: impl Into<ShapedType>) -> Self {
        Self::new(ty.into(), ValueDef::Source)
    }

    /// A splat constant of the given shaped type.
    pub fn splat(value: ConstValue, ty: impl Into<ShapedType>) -> Self {
        Self::new(ty.into(), ValueDef::Splat(value))
    }

    /// Result of casting `source` to another tensor type.
    pub fn tensor_cast(source: Value, ty: TensorType) -> Self {
        debug_assert!(source.ty().is_tensor(), "tensor_cast source must be a tensor");
        Self::new(ShapedType::Tensor(ty), ValueDef::TensorCast(source))
    }

    /// Result of casting `source` to another memref type.
    pub fn memref_cast(source: Value, ty: MemRefType) -> Self {
        debug_assert!(source.ty().is_memref(), "memref_cast source must be a memref");
        Self::new(ShapedType::MemRef(ty), ValueDef::MemRefCast(source))
    }

    /// Result value of a reshape operation.
    pub fn from_reshape(op: ReshapeOp) -> Self {
        let ty = op.result_type.clone();
        Self::new(ty, ValueDef::Reshape(Box::new(op)))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn ty(&self) -> &ShapedType {
        &self.0.ty
    }

    pub fn def(&self) -> &ValueDef {
        &self.0.def
    }

    /// The cast source, if this value is produced by a tensor cast.
    pub fn defining_tensor_cast(&self) -> Option<&Value> {
        match self.def() {
            ValueDef::TensorCast(src) => Some(src),
            _ => None,
        }
    }

    /// The cast source, if this value is produced by a memref cast.
    pub fn defining_memref_cast(&self) -> Option<&Value> {
        match self.def() {
            ValueDef::MemRefCast(src) => Some(src),
            _ => None,
        }
    }

    /// The producing reshape, if any.
    pub fn defining_reshape(&self) -> Option<&ReshapeOp> {
        match self.def() {
            ValueDef::Reshape(op) => Some(op),
            _ => None,
        }
    }

    /// The splat payload, if this value is a splat constant.
    pub fn as_splat(&self) -> Option<&ConstValue> {
        match self.def() {
            ValueDef::Splat(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value(id={}, ty={})", self.0.id, crate::print::display_shaped_type(&self.0.ty))
    }
}
