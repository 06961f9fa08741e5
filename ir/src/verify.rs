//! Structural verification of structured ops.
//!
//! Checks run in a fixed order so a malformed op always reports the same
//! first failure: operand presence, region shape, block arguments, the
//! symbol-source attribute, indexing-map arity, global invertibility, sparse
//! annotations, and finally the yield terminator.

use snafu::ensure;
use weft_affine::{AffineMap, Context};

use crate::error::{self, Result};
use crate::op::{Block, OpKind, SparseDim, StructuredOp};

/// Verify a structured op against all of its structural invariants.
pub fn verify(ctx: &Context, op: &StructuredOp) -> Result<()> {
    let num_loops = op.num_loops();

    ensure!(op.num_shaped_operands() + op.result_types.len() > 0, error::NoShapedOperandsSnafu);

    ensure!(op.region.len() == 1, error::SingleBlockRegionSnafu);
    let block = &op.region[0];
    match op.kind {
        OpKind::Generic => verify_block_args(op, block)?,
        OpKind::IndexedGeneric => verify_indexed_block_args(op, block)?,
    }

    // The symbol source, when present, fixes the symbol count every indexing
    // map must carry.
    let mut expected_num_symbols = 0;
    if let Some(index) = op.symbol_source {
        ensure!(index < op.num_shaped_operands(), error::SymbolSourceOutOfRangeSnafu);
        expected_num_symbols = op.shaped_type(index).rank();
    }

    ensure!(
        op.indexing_maps.len() == op.num_shaped_operands(),
        error::IndexingMapCountSnafu { maps: op.indexing_maps.len(), operands: op.num_shaped_operands() }
    );

    for (index, map) in op.indexing_maps.iter().enumerate() {
        ensure!(map.num_symbols() == expected_num_symbols, error::IndexingMapSymbolCountSnafu { index });
        ensure!(map.num_dims() == num_loops, error::IndexingMapDimCountSnafu { index, loops: num_loops });
        ensure!(
            map.num_results() == op.shaped_type(index).rank(),
            error::IndexingMapResultCountSnafu {
                index,
                ty: crate::print::display_shaped_type(op.shaped_type(index)),
            }
        );
    }

    // Bound inference for maps with symbols is not available, so the
    // invertibility requirement only applies to symbol-free maps.
    let concat = AffineMap::concat(&op.indexing_maps);
    if concat.num_symbols() == 0 {
        ensure!(concat.inverse_permutation(ctx).is_some(), error::ShapeToLoopsMapNotInvertibleSnafu);
    }

    verify_annotations(op)?;
    verify_yield(op, block)
}

/// One block argument per operand, typed as its element type.
fn verify_block_args(op: &StructuredOp, block: &Block) -> Result<()> {
    ensure!(block.args.len() == op.num_shaped_operands(), error::BlockArgCountSnafu);
    for i in 0..op.num_shaped_operands() {
        check_arg_element_type(op, block, i, i)?;
    }
    Ok(())
}

/// One leading index argument per loop, then one argument per operand.
fn verify_indexed_block_args(op: &StructuredOp, block: &Block) -> Result<()> {
    let num_loops = op.num_loops();
    ensure!(block.args.len() == op.num_shaped_operands() + num_loops, error::IndexedBlockArgCountSnafu);
    for i in 0..num_loops {
        ensure!(block.args[i].is_index(), error::BlockArgNotIndexSnafu { index: i + 1 });
    }
    for i in 0..op.num_shaped_operands() {
        check_arg_element_type(op, block, i, i + num_loops)?;
    }
    Ok(())
}

fn check_arg_element_type(op: &StructuredOp, block: &Block, operand: usize, arg: usize) -> Result<()> {
    let ty = op.shaped_type(operand);
    ensure!(
        block.args[arg] == ty.element(),
        error::BlockArgElementTypeSnafu {
            index: arg + 1,
            operand_kind: if operand < op.num_inputs() { "input" } else { "output" },
            ty: crate::print::display_shaped_type(ty),
        }
    );
    Ok(())
}

/// Consistency of the optional sparse annotations.
fn verify_annotations(op: &StructuredOp) -> Result<()> {
    let Some(sparse) = &op.sparse else {
        return Ok(());
    };
    ensure!(op.has_tensor_semantics(), error::SparseOnNonTensorsSnafu);
    ensure!(op.num_outputs() == 1, error::SparseSingleOutputSnafu);
    let num_tensors = op.num_shaped_operands();
    ensure!(sparse.len() == num_tensors, error::SparseAnnotationCountSnafu);
    for (tensor, dims) in sparse.iter().enumerate() {
        let rank = op.shaped_type(tensor).rank();
        ensure!(dims.len() == rank, error::SparseAnnotationRankSnafu { rank, tensor });
        // The output tensor is last; it must stay dense.
        if tensor == num_tensors - 1 {
            ensure!(dims.iter().all(|d| *d == SparseDim::Dense), error::SparseOutputTensorSnafu);
        }
    }
    Ok(())
}

/// The yield terminator: one value per output, each typed as the
/// corresponding output's element type and defined by the block.
fn verify_yield(op: &StructuredOp, block: &Block) -> Result<()> {
    let num_outputs = op.num_outputs();
    ensure!(
        block.yields.len() == num_outputs,
        error::YieldCountSnafu { expected: num_outputs, actual: block.yields.len() }
    );
    for (i, &yielded) in block.yields.iter().enumerate() {
        let Some(actual) = block.value_type(yielded) else {
            return error::YieldUndefinedValueSnafu { index: i + 1 }.fail();
        };
        let expected = op.output_operand(i).ty().element();
        ensure!(
            actual == expected,
            error::YieldOperandTypeSnafu { index: i + 1, actual: actual.to_string(), expected: expected.to_string() }
        );
    }
    Ok(())
}

/// Scalar body well-formedness beyond the yield: every operand of every
/// scalar op refers to an argument or an earlier result, with matching
/// element types.
pub fn verify_body(block: &Block) -> bool {
    block.ops.iter().enumerate().all(|(i, sop)| {
        [sop.lhs, sop.rhs].into_iter().all(|v| match v {
            crate::op::BodyValue::Arg(a) => a < block.args.len(),
            crate::op::BodyValue::Result(r) => r < i,
        }) && block.value_type(sop.lhs) == Some(sop.ty)
            && block.value_type(sop.rhs) == Some(sop.ty)
    })
}
