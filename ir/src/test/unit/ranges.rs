//! Loop-range computation tests.

use weft_affine::{AffineMap, Context};

use crate::op::{IteratorKind, OpKind, StructuredOp};
use crate::ranges::{compute_loop_ranges, flat_operand_dims, IndexValue, LoopRange};
use crate::test::support::{dyn_f32_memref, dyn_f32_tensor, elementwise_block, elementwise_op, f32_memref, f32_tensor};
use crate::value::Value;

#[test]
fn test_flat_operand_dims_mixes_static_and_dynamic() {
    let ctx = Context::new();
    let mut op = elementwise_op(&ctx, 1);
    op.inputs[0] = Value::source(f32_tensor(&[7]));
    assert_eq!(
        flat_operand_dims(&op),
        vec![IndexValue::Const(7), IndexValue::Dim { operand: 1, dim: 0 }]
    );
}

#[test]
fn test_flat_operand_dims_repeats_symbol_source_extents() {
    let ctx = Context::new();
    let op = elementwise_op(&ctx, 1).with_symbol_source(0);
    let dims = flat_operand_dims(&op);
    // Two operand extents, then the source operand's extent once per operand.
    assert_eq!(dims.len(), 4);
    assert_eq!(dims[2], dims[0]);
    assert_eq!(dims[3], dims[0]);
}

#[test]
fn test_bare_dim_ranges_dynamic_extent() {
    let ctx = Context::new();
    let op = elementwise_op(&ctx, 2);
    let ranges = compute_loop_ranges(&ctx, &op).unwrap();
    assert_eq!(
        ranges,
        vec![LoopRange {
            lower: IndexValue::Const(0),
            upper: IndexValue::Dim { operand: 0, dim: 0 },
            step: IndexValue::Const(1),
        }]
    );
}

#[test]
fn test_bare_dim_ranges_static_extent() {
    let ctx = Context::new();
    let mut op = elementwise_op(&ctx, 1);
    op.inputs[0] = Value::source(f32_tensor(&[16]));
    let ranges = compute_loop_ranges(&ctx, &op).unwrap();
    assert_eq!(ranges[0].upper, IndexValue::Const(16));
}

#[test]
fn test_first_matching_result_wins() {
    let ctx = Context::new();
    let mut op = elementwise_op(&ctx, 2);
    // First input is static, second dynamic; the first result fixes loop 0.
    op.inputs[0] = Value::source(f32_tensor(&[4]));
    let ranges = compute_loop_ranges(&ctx, &op).unwrap();
    assert_eq!(ranges[0].upper, IndexValue::Const(4));
}

#[test]
fn test_windowed_access_shifts_bounds() {
    let ctx = Context::new();
    // Convolution-like access: data indexed by d0 + d1 - s0 floordiv 2, the
    // filter by the window dimension, the output by the outer dimension.
    let data_access = ctx.sub(ctx.add(ctx.dim(0), ctx.dim(1)), ctx.floor_div(ctx.symbol(0), ctx.constant(2)));
    let op = StructuredOp::new(
        OpKind::Generic,
        vec![Value::source(f32_tensor(&[10])), Value::source(f32_tensor(&[3]))],
        vec![Value::source(f32_memref(&[8]))],
        Vec::new(),
        Vec::new(),
        vec![
            AffineMap::single(2, 1, data_access),
            AffineMap::new(2, 1, [ctx.dim(1)]),
            AffineMap::new(2, 1, [ctx.dim(0)]),
        ],
        vec![IteratorKind::Parallel, IteratorKind::Window],
        elementwise_block(OpKind::Generic, 2, 2, 1),
    )
    .with_symbol_source(0);

    let ranges = compute_loop_ranges(&ctx, &op).unwrap();
    // Loop 0 over the padded data: [10 floordiv 2, 10 + 10 floordiv 2 + 1 - 10).
    assert_eq!(ranges[0].lower, IndexValue::Const(5));
    assert_eq!(ranges[0].upper, IndexValue::Const(6));
    assert_eq!(ranges[0].step, IndexValue::Const(1));
    // Loop 1 over the filter extent.
    assert_eq!(ranges[1].lower, IndexValue::Const(0));
    assert_eq!(ranges[1].upper, IndexValue::Const(3));
}

#[test]
fn test_windowed_access_with_dynamic_extent_defers() {
    let ctx = Context::new();
    let data_access = ctx.sub(ctx.add(ctx.dim(0), ctx.dim(1)), ctx.floor_div(ctx.symbol(0), ctx.constant(2)));
    let op = StructuredOp::new(
        OpKind::Generic,
        vec![Value::source(dyn_f32_tensor(1)), Value::source(f32_tensor(&[3]))],
        vec![Value::source(dyn_f32_memref(1))],
        Vec::new(),
        Vec::new(),
        vec![
            AffineMap::single(2, 1, data_access),
            AffineMap::new(2, 1, [ctx.dim(1)]),
            AffineMap::new(2, 1, [ctx.dim(0)]),
        ],
        vec![IteratorKind::Parallel, IteratorKind::Window],
        elementwise_block(OpKind::Generic, 2, 2, 1),
    )
    .with_symbol_source(0);

    let ranges = compute_loop_ranges(&ctx, &op).unwrap();
    // The data extent is unknown, so the bounds stay symbolic.
    assert!(matches!(ranges[0].lower, IndexValue::Affine { .. }));
    assert!(matches!(ranges[0].upper, IndexValue::Affine { .. }));
}

#[test]
fn test_uncovered_loop_is_an_error() {
    let ctx = Context::new();
    let mut op = elementwise_op(&ctx, 1);
    // Widen the domain without ever producing a result for the new loop.
    op.iterator_types.push(IteratorKind::Reduction);
    op.indexing_maps = vec![AffineMap::new(2, 0, [ctx.dim(0)]), AffineMap::new(2, 0, [ctx.dim(0)])];
    let err = compute_loop_ranges(&ctx, &op).unwrap_err();
    assert_eq!(err.to_string(), "no loop range found for dimension 1");
}
