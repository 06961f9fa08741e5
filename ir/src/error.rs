//! Error types and result handling.
//!
//! The display strings are the observable diagnostic contract of the
//! verifier: downstream tests match on their substrings, so the wording
//! carries the mismatched counts and positions verbatim.

use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    // ---- structured-op verifier ----
    /// Op with no shaped operands and no results at all.
    #[snafu(display("expected at least 1 Shaped operand or return"))]
    NoShapedOperands,

    /// Body region must hold exactly one block.
    #[snafu(display("expected region with 1 block"))]
    SingleBlockRegion,

    /// Generic variant: one block argument per operand.
    #[snafu(display("expected number of block arguments to match number of operands"))]
    BlockArgCount,

    /// Indexed variant: one leading index argument per loop, then one per
    /// operand.
    #[snafu(display("expected number of block arguments to match number of operands + number of loops"))]
    IndexedBlockArgCount,

    /// Leading block argument of the indexed variant has a non-index type.
    #[snafu(display("expected block argument {index} to be an index"))]
    BlockArgNotIndex { index: usize },

    /// Block argument type differs from the operand's element type.
    #[snafu(display(
        "expected block argument {index} of the same type as elemental type of {operand_kind} operand: {ty}",
    ))]
    BlockArgElementType { index: usize, operand_kind: &'static str, ty: String },

    /// `symbol_source` does not name an operand.
    #[snafu(display("symbol_source index out of range"))]
    SymbolSourceOutOfRange,

    /// Indexing-map count differs from the operand count.
    #[snafu(display(
        "expected the number of indexing_map ({maps}) to be equal to the number of inputs and outputs ({operands})",
    ))]
    IndexingMapCount { maps: usize, operands: usize },

    /// Map's symbol count differs from the one implied by `symbol_source`.
    #[snafu(display(
        "expected the number of symbols in indexing_map #{index} to match rank of operand `symbol_source`",
    ))]
    IndexingMapSymbolCount { index: usize },

    /// Map's dimension count differs from the iteration rank.
    #[snafu(display("expected indexing_map #{index} to have {loops} dim(s) to match the number of loops"))]
    IndexingMapDimCount { index: usize, loops: usize },

    /// Map's result count differs from the operand's rank.
    #[snafu(display("expected indexing_map #{index} results to match view rank: {ty}"))]
    IndexingMapResultCount { index: usize, ty: String },

    /// Concatenated indexing map is symbol-free but not invertible.
    #[snafu(display("expected the shape-to-loops map to be non-null"))]
    ShapeToLoopsMapNotInvertible,

    // ---- sparsity annotations ----
    #[snafu(display("expected sparse annotations on tensors only"))]
    SparseOnNonTensors,

    #[snafu(display("expected single output tensor"))]
    SparseSingleOutput,

    #[snafu(display("expected one sparse annotation for each tensor"))]
    SparseAnnotationCount,

    #[snafu(display("expected sparse annotation with rank {rank} for tensor {tensor}"))]
    SparseAnnotationRank { rank: usize, tensor: usize },

    #[snafu(display("sparse output tensors not supported (yet)"))]
    SparseOutputTensor,

    // ---- yield terminator ----
    #[snafu(display(
        "expected number of yield values ({expected}) to match the number of operands of the enclosing structured op ({actual})",
    ))]
    YieldCount { expected: usize, actual: usize },

    #[snafu(display(
        "type of yield operand {index} ({actual}) doesn't match the element type of the enclosing structured op ({expected})",
    ))]
    YieldOperandType { index: usize, actual: String, expected: String },

    /// Yield references a value the block does not define.
    #[snafu(display("yield operand {index} references an undefined body value"))]
    YieldUndefinedValue { index: usize },

    // ---- reshape verifier ----
    #[snafu(display("expected non-zero memref ranks"))]
    ReshapeZeroRank,

    #[snafu(display("expected to collapse or expand dims"))]
    ReshapeSameRank,

    #[snafu(display(
        "invalid to reshape tensor/memref with non-unit extent dimensions to zero-rank tensor/memref",
    ))]
    ReshapeToRankZeroNonUnit,

    #[snafu(display(
        "expected rank of the collapsed type({rank}) to be the number of reassociation maps({maps})",
    ))]
    ReshapeCollapsedRank { rank: usize, maps: usize },

    #[snafu(display(
        "expected reassociation map #{index} of same rank as expanded memref({rank}), but got {got}",
    ))]
    ReassociationMapRank { index: usize, rank: usize, got: usize },

    #[snafu(display("expected reassociation map #{index} to be valid and contiguous"))]
    ReassociationInvalid { index: usize },

    #[snafu(display("expected source and result to be shaped types of the same kind"))]
    ReshapeKindMismatch,

    #[snafu(display("expected collapsed type to be {expected}, but got {actual}"))]
    ReshapeCollapsedType { expected: String, actual: String },

    // ---- loop-range computation ----
    /// No indexing-map result yields a range for this loop dimension.
    #[snafu(display("no loop range found for dimension {dim}"))]
    MissingLoopRange { dim: usize },

    // ---- textual parsing ----
    #[snafu(display("parse error at offset {offset}: {message}"))]
    Parse { message: String, offset: usize },
}
