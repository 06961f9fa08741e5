//! The structured-op descriptor and its region body.
//!
//! A structured op applies a scalar body at every point of an iteration
//! space; one affine indexing map per shaped operand translates iteration
//! coordinates into operand indices. The descriptor is immutable after
//! construction: canonicalization produces replacement descriptors via
//! [`StructuredOp::clone_with_operands`], never in-place edits.

use weft_affine::{AffineMap, Context};

use crate::types::{ElementType, ShapedType, TensorType};
use crate::value::Value;

/// The closed set of structured-op kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Scalar body sees one argument per operand.
    Generic,
    /// Scalar body additionally sees one leading index argument per loop.
    IndexedGeneric,
}

impl OpKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generic => "weft.generic",
            Self::IndexedGeneric => "weft.indexed_generic",
        }
    }
}

/// Kind of a single iteration-space dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum IteratorKind {
    Parallel,
    Reduction,
    Window,
}

/// Per-dimension sparsity tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SparseDim {
    Dense,
    Sparse,
}

impl SparseDim {
    /// Single-letter textual form used in the sparse trait attribute.
    pub fn letter(&self) -> &'static str {
        match self {
            Self::Dense => "D",
            Self::Sparse => "S",
        }
    }
}

/// Reference to a value inside the body block: either a block argument or
/// the result of an earlier scalar op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyValue {
    Arg(usize),
    Result(usize),
}

/// Scalar operators permitted in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ScalarKind {
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
}

/// A single scalar operation in the body.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarOp {
    pub kind: ScalarKind,
    pub lhs: BodyValue,
    pub rhs: BodyValue,
    pub ty: ElementType,
}

/// The body block: typed arguments, scalar ops in SSA order, and the yield
/// terminator. Body values are index references, so rebuilding a block with
/// remapped arguments is a pure function over the old one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub args: Vec<ElementType>,
    pub ops: Vec<ScalarOp>,
    pub yields: Vec<BodyValue>,
}

impl Block {
    pub fn new(args: Vec<ElementType>, ops: Vec<ScalarOp>, yields: Vec<BodyValue>) -> Self {
        Self { args, ops, yields }
    }

    /// Type of a body value, if it is defined by this block.
    pub fn value_type(&self, value: BodyValue) -> Option<ElementType> {
        match value {
            BodyValue::Arg(i) => self.args.get(i).copied(),
            BodyValue::Result(i) => self.ops.get(i).map(|op| op.ty),
        }
    }

    /// Rebuild the block with `new_args` as the argument list, rewriting
    /// every argument reference `Arg(i)` to `Arg(arg_map[i])`. Result
    /// references are unaffected.
    pub fn remap_args(&self, arg_map: &[usize], new_args: Vec<ElementType>) -> Block {
        let remap = |v: BodyValue| match v {
            BodyValue::Arg(i) => BodyValue::Arg(arg_map[i]),
            BodyValue::Result(i) => BodyValue::Result(i),
        };
        Block {
            args: new_args,
            ops: self
                .ops
                .iter()
                .map(|op| ScalarOp { kind: op.kind, lhs: remap(op.lhs), rhs: remap(op.rhs), ty: op.ty })
                .collect(),
            yields: self.yields.iter().map(|&v| remap(v)).collect(),
        }
    }
}

/// Affine-indexed structured operation.
///
/// Operand order is inputs, then output buffers, then init tensors; the
/// indexing-map list follows the same order. `result_types` mirrors the init
/// tensors (each init seeds one result tensor).
#[derive(Debug, Clone)]
pub struct StructuredOp {
    pub kind: OpKind,
    pub inputs: Vec<Value>,
    pub output_buffers: Vec<Value>,
    pub init_tensors: Vec<Value>,
    pub result_types: Vec<TensorType>,
    pub indexing_maps: Vec<AffineMap>,
    pub iterator_types: Vec<IteratorKind>,
    /// Body region; verification requires exactly one block.
    pub region: Vec<Block>,
    /// Legacy affordance: operand whose rank supplies the maps' symbol count.
    pub symbol_source: Option<usize>,
    /// Per-operand, per-dimension sparsity tags. Tensor semantics only.
    pub sparse: Option<Vec<Vec<SparseDim>>>,
    pub doc: Option<String>,
    pub library_call: Option<String>,
}

impl StructuredOp {
    /// Plain constructor covering the common case; optional attributes start
    /// empty and are set through the `with_*` methods.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: OpKind,
        inputs: Vec<Value>,
        output_buffers: Vec<Value>,
        init_tensors: Vec<Value>,
        result_types: Vec<TensorType>,
        indexing_maps: Vec<AffineMap>,
        iterator_types: Vec<IteratorKind>,
        block: Block,
    ) -> Self {
        Self {
            kind,
            inputs,
            output_buffers,
            init_tensors,
            result_types,
            indexing_maps,
            iterator_types,
            region: vec![block],
            symbol_source: None,
            sparse: None,
            doc: None,
            library_call: None,
        }
    }

    pub fn with_symbol_source(mut self, operand: usize) -> Self {
        self.symbol_source = Some(operand);
        self
    }

    pub fn with_sparse(mut self, sparse: Vec<Vec<SparseDim>>) -> Self {
        self.sparse = Some(sparse);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_library_call(mut self, library_call: impl Into<String>) -> Self {
        self.library_call = Some(library_call.into());
        self
    }

    /// Iteration-space rank.
    pub fn num_loops(&self) -> usize {
        self.iterator_types.len()
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Output count: output buffers plus init tensors.
    pub fn num_outputs(&self) -> usize {
        self.output_buffers.len() + self.init_tensors.len()
    }

    pub fn num_shaped_operands(&self) -> usize {
        self.inputs.len() + self.num_outputs()
    }

    /// All shaped operands in canonical order.
    pub fn shaped_operands(&self) -> impl Iterator<Item = &Value> {
        self.inputs.iter().chain(&self.output_buffers).chain(&self.init_tensors)
    }

    /// Shaped operand by flat index (inputs, then output buffers, then init
    /// tensors).
    pub fn shaped_operand(&self, index: usize) -> &Value {
        let n_in = self.inputs.len();
        let n_out = self.output_buffers.len();
        if index < n_in {
            &self.inputs[index]
        } else if index < n_in + n_out {
            &self.output_buffers[index - n_in]
        } else {
            &self.init_tensors[index - n_in - n_out]
        }
    }

    pub fn shaped_type(&self, index: usize) -> &ShapedType {
        self.shaped_operand(index).ty()
    }

    /// Output operand by index (output buffers first, then init tensors).
    pub fn output_operand(&self, index: usize) -> &Value {
        self.shaped_operand(self.inputs.len() + index)
    }

    pub fn indexing_map(&self, index: usize) -> &AffineMap {
        &self.indexing_maps[index]
    }

    /// The body block. Only call on verified ops (single-block region).
    pub fn block(&self) -> &Block {
        &self.region[0]
    }

    /// All operands are tensors and there are no output buffers.
    pub fn has_tensor_semantics(&self) -> bool {
        self.output_buffers.is_empty() && self.shaped_operands().all(|v| v.ty().is_tensor())
    }

    /// Memref-typed inputs, with their input indices.
    pub fn input_buffers(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.inputs.iter().enumerate().filter(|(_, v)| v.ty().is_memref())
    }

    /// Concatenation of all indexing maps: the loops-to-shapes map.
    pub fn loops_to_shapes_map(&self) -> AffineMap {
        AffineMap::concat(&self.indexing_maps)
    }

    /// Inverse of the concatenated map, when it is a symbol-free
    /// permutation. `None` is an expected outcome, not an error.
    pub fn shapes_to_loops_map(&self, ctx: &Context) -> Option<AffineMap> {
        self.loops_to_shapes_map().inverse_permutation(ctx)
    }

    /// Clone with substituted operands, result types, indexing maps and
    /// body. Every other attribute is carried over unchanged.
    pub fn clone_with_operands(
        &self,
        inputs: Vec<Value>,
        output_buffers: Vec<Value>,
        init_tensors: Vec<Value>,
        result_types: Vec<TensorType>,
        indexing_maps: Vec<AffineMap>,
        block: Block,
    ) -> StructuredOp {
        StructuredOp {
            kind: self.kind,
            inputs,
            output_buffers,
            init_tensors,
            result_types,
            indexing_maps,
            iterator_types: self.iterator_types.clone(),
            region: vec![block],
            symbol_source: self.symbol_source,
            sparse: self.sparse.clone(),
            doc: self.doc.clone(),
            library_call: self.library_call.clone(),
        }
    }
}
