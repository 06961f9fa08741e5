//! Canonicalization pattern tests.

use weft_affine::{AffineMap, Context};

use crate::canonicalize::{
    canonicalize, deduplicate_inputs, erase_dead, fold_memref_casts, fold_tensor_casts, StructuredRewrite,
};
use crate::op::{BodyValue, IteratorKind, OpKind, StructuredOp};
use crate::test::support::{dyn_f32_memref, dyn_f32_tensor, elementwise_block, elementwise_op, f32_memref, f32_tensor};
use crate::types::{DimSize, ElementType, MemRefType, TensorType};
use crate::value::Value;

#[test]
fn test_erase_dead_zero_extent_buffer() {
    let ctx = Context::new();
    let mut op = elementwise_op(&ctx, 1);
    op.output_buffers[0] = Value::source(f32_memref(&[0]));
    assert!(erase_dead(&op));

    // Zero-extent tensors still produce a value someone may use.
    let tensor = tensor_variant(&ctx, f32_tensor(&[0]));
    assert!(!erase_dead(&tensor));

    let live = elementwise_op(&ctx, 1);
    assert!(!erase_dead(&live));
}

fn tensor_variant(ctx: &Context, ty: TensorType) -> StructuredOp {
    crate::test::support::tensor_op(ctx, Value::source(ty.clone()), Value::source(ty))
}

#[test]
fn test_fold_tensor_cast_on_input() {
    let ctx = Context::new();
    let source = Value::source(f32_tensor(&[8]));
    let cast = Value::tensor_cast(source.clone(), dyn_f32_tensor(1));
    let mut op = elementwise_op(&ctx, 1);
    op.inputs[0] = cast;

    let folded = fold_tensor_casts(&op).unwrap();
    assert_eq!(folded.inputs[0], source);
    assert!(fold_tensor_casts(&folded).is_none());
}

#[test]
fn test_fold_tensor_cast_on_init_updates_result_type() {
    let ctx = Context::new();
    let init_source = Value::source(f32_tensor(&[4]));
    let cast = Value::tensor_cast(init_source.clone(), dyn_f32_tensor(1));
    let op = crate::test::support::tensor_op(&ctx, Value::source(dyn_f32_tensor(1)), cast);
    assert_eq!(op.result_types[0], dyn_f32_tensor(1));

    let folded = fold_tensor_casts(&op).unwrap();
    assert_eq!(folded.init_tensors[0], init_source);
    assert_eq!(folded.result_types[0], f32_tensor(&[4]));
}

#[test]
fn test_tensor_cast_losing_information_stays() {
    let ctx = Context::new();
    // Dynamic source cast down to a static type: folding would fabricate
    // static extents, so the cast is kept.
    let source = Value::source(dyn_f32_tensor(1));
    let cast = Value::tensor_cast(source, f32_tensor(&[8]));
    let mut op = elementwise_op(&ctx, 1);
    op.inputs[0] = cast;
    assert!(fold_tensor_casts(&op).is_none());
}

#[test]
fn test_fold_memref_cast_on_output_buffer() {
    let ctx = Context::new();
    let source = Value::source(f32_memref(&[8]));
    let cast = Value::memref_cast(source.clone(), dyn_f32_memref(1));
    let mut op = elementwise_op(&ctx, 1);
    op.output_buffers[0] = cast;

    let folded = fold_memref_casts(&op).unwrap();
    assert_eq!(folded.output_buffers[0], source);
}

#[test]
fn test_memref_cast_to_unknown_layout_stays() {
    let ctx = Context::new();
    let source = Value::source(MemRefType::strided(
        crate::types::static_shape(&[8]),
        ElementType::F32,
        DimSize::Dynamic,
        smallvec::smallvec![DimSize::Dynamic],
    ));
    let cast = Value::memref_cast(source, f32_memref(&[8]));
    let mut op = elementwise_op(&ctx, 1);
    op.output_buffers[0] = cast;
    assert!(fold_memref_casts(&op).is_none());
}

#[test]
fn test_deduplicate_identical_inputs() {
    let ctx = Context::new();
    let shared = Value::source(dyn_f32_tensor(1));
    let mut op = elementwise_op(&ctx, 2);
    op.inputs = vec![shared.clone(), shared.clone()];

    let deduped = deduplicate_inputs(&op).unwrap();
    assert_eq!(deduped.inputs, vec![shared]);
    assert_eq!(deduped.indexing_maps.len(), 2);
    // Body: both operands of the add now read the surviving argument.
    let block = deduped.block();
    assert_eq!(block.args, vec![ElementType::F32, ElementType::F32]);
    assert_eq!(block.ops[0].lhs, BodyValue::Arg(0));
    assert_eq!(block.ops[0].rhs, BodyValue::Arg(0));
    assert_eq!(block.yields, vec![BodyValue::Result(0)]);

    assert!(deduplicate_inputs(&deduped).is_none());
}

#[test]
fn test_deduplicate_requires_matching_maps() {
    let ctx = Context::new();
    let shared = Value::source(dyn_f32_tensor(1));
    let mut op = elementwise_op(&ctx, 2);
    op.inputs = vec![shared.clone(), shared];
    // Same value, different access pattern: both reads stay.
    op.indexing_maps[1] = AffineMap::single(1, 0, ctx.add(ctx.dim(0), ctx.constant(1)));
    assert!(deduplicate_inputs(&op).is_none());
}

#[test]
fn test_deduplicate_skips_leading_index_args() {
    let ctx = Context::new();
    let shared = Value::source(dyn_f32_tensor(1));
    let mut op = elementwise_op(&ctx, 2);
    op.kind = OpKind::IndexedGeneric;
    op.inputs = vec![shared.clone(), shared.clone()];
    op.region = vec![elementwise_block(OpKind::IndexedGeneric, 1, 2, 1)];

    let deduped = deduplicate_inputs(&op).unwrap();
    assert_eq!(deduped.inputs, vec![shared]);
    let block = deduped.block();
    assert_eq!(block.args, vec![ElementType::Index, ElementType::F32, ElementType::F32]);
    assert_eq!(block.ops[0].lhs, BodyValue::Arg(1));
    assert_eq!(block.ops[0].rhs, BodyValue::Arg(1));
}

#[test]
fn test_canonicalize_reaches_fixed_point() {
    let ctx = Context::new();
    // One shared input hidden behind two separate casts: the casts fold
    // first, then the duplicates collapse.
    let shared = Value::source(f32_tensor(&[8]));
    let mut op = elementwise_op(&ctx, 2);
    op.inputs = vec![
        Value::tensor_cast(shared.clone(), dyn_f32_tensor(1)),
        Value::tensor_cast(shared.clone(), dyn_f32_tensor(1)),
    ];

    match canonicalize(&op) {
        Some(StructuredRewrite::Rewritten(out)) => {
            assert_eq!(out.inputs, vec![shared]);
            assert_eq!(out.indexing_maps.len(), 2);
        }
        other => panic!("expected a rewrite, got {other:?}"),
    }
}

#[test]
fn test_canonicalize_erases_dead_op() {
    let ctx = Context::new();
    let op = StructuredOp::new(
        OpKind::Generic,
        vec![Value::source(f32_memref(&[0]))],
        vec![Value::source(f32_memref(&[0]))],
        Vec::new(),
        Vec::new(),
        vec![AffineMap::identity(&ctx, 1); 2],
        vec![IteratorKind::Parallel],
        elementwise_block(OpKind::Generic, 1, 1, 1),
    );
    assert!(matches!(canonicalize(&op), Some(StructuredRewrite::Erased)));
}

#[test]
fn test_canonicalize_erases_op_revealed_dead_by_cast_fold() {
    let ctx = Context::new();
    // The zero extent is hidden behind a cast to a dynamic shape, so the op
    // only becomes recognizably dead after the cast folds.
    let dead = Value::source(f32_memref(&[0]));
    let cast = Value::memref_cast(dead, dyn_f32_memref(1));
    let mut op = elementwise_op(&ctx, 1);
    op.output_buffers[0] = cast;

    assert!(!erase_dead(&op));
    assert!(matches!(canonicalize(&op), Some(StructuredRewrite::Erased)));
}

#[test]
fn test_canonicalize_leaves_clean_op_alone() {
    let ctx = Context::new();
    let op = elementwise_op(&ctx, 2);
    assert!(canonicalize(&op).is_none());
}
