//! Textual round-trip and parser error tests.

use test_case::test_case;
use weft_affine::{AffineMap, Context};

use crate::op::{IteratorKind, OpKind, SparseDim, StructuredOp};
use crate::parser::{parse_structured_op, parse_shaped_type};
use crate::test::support::{elementwise_block, elementwise_op, f32_tensor, tensor_op};
use crate::types::{static_shape, DimSize, ElementType, MemRefType, ShapedType, TensorType};
use crate::value::Value;

fn assert_round_trip(ctx: &Context, op: &StructuredOp) {
    let text = op.to_string();
    let parsed = parse_structured_op(ctx, &text).unwrap_or_else(|e| panic!("failed to parse `{text}`: {e}"));
    assert_eq!(parsed.kind, op.kind);
    assert_eq!(parsed.indexing_maps, op.indexing_maps);
    assert_eq!(parsed.iterator_types, op.iterator_types);
    assert_eq!(parsed.region, op.region);
    assert_eq!(parsed.result_types, op.result_types);
    assert_eq!(parsed.symbol_source, op.symbol_source);
    assert_eq!(parsed.sparse, op.sparse);
    assert_eq!(parsed.doc, op.doc);
    assert_eq!(parsed.library_call, op.library_call);
    let tys: Vec<_> = op.shaped_operands().map(|v| v.ty().clone()).collect();
    let parsed_tys: Vec<_> = parsed.shaped_operands().map(|v| v.ty().clone()).collect();
    assert_eq!(parsed_tys, tys);
}

#[test]
fn test_round_trip_elementwise() {
    let ctx = Context::new();
    assert_round_trip(&ctx, &elementwise_op(&ctx, 2));
}

#[test]
fn test_round_trip_tensor_semantics() {
    let ctx = Context::new();
    let op = tensor_op(&ctx, Value::source(f32_tensor(&[4, 8])), Value::source(f32_tensor(&[4, 8])));
    assert_round_trip(&ctx, &op);
}

#[test]
fn test_round_trip_all_attributes() {
    let ctx = Context::new();
    let op = tensor_op(&ctx, Value::source(f32_tensor(&[4])), Value::source(f32_tensor(&[4])))
        .with_symbol_source(0)
        .with_sparse(vec![vec![SparseDim::Sparse], vec![SparseDim::Dense]])
        .with_doc("pointwise copy")
        .with_library_call("extern_copy");
    assert_round_trip(&ctx, &op);
}

#[test]
fn test_round_trip_indexed_multi_result() {
    let ctx = Context::new();
    let op = StructuredOp::new(
        OpKind::IndexedGeneric,
        vec![Value::source(f32_tensor(&[4]))],
        Vec::new(),
        vec![Value::source(f32_tensor(&[4])), Value::source(f32_tensor(&[4]))],
        vec![f32_tensor(&[4]), f32_tensor(&[4])],
        vec![AffineMap::identity(&ctx, 1); 3],
        vec![IteratorKind::Parallel],
        elementwise_block(OpKind::IndexedGeneric, 1, 1, 2),
    );
    assert_round_trip(&ctx, &op);
}

#[test]
fn test_repeated_operand_name_resolves_to_one_value() {
    let ctx = Context::new();
    let text = "weft.generic {indexing_maps = [affine_map<(d0) -> (d0)>, affine_map<(d0) -> (d0)>, \
                 affine_map<(d0) -> (d0)>], iterator_types = [\"parallel\"]} \
                 ins(%a, %a : tensor<?xf32>, tensor<?xf32>) outs(%b : memref<?xf32>) {\n\
                 ^bb0(%arg0: f32, %arg1: f32, %arg2: f32):\n  %t0 = mul %arg0, %arg1 : f32\n  \
                 weft.yield %t0 : f32\n}";
    let op = parse_structured_op(&ctx, text).unwrap();
    assert_eq!(op.inputs[0], op.inputs[1]);
    assert_ne!(op.inputs[0], op.output_buffers[0]);
}

#[test]
fn test_parse_shaped_types() {
    assert_eq!(
        parse_shaped_type("tensor<4x?xf32>").unwrap(),
        ShapedType::Tensor(TensorType::new(
            smallvec::smallvec![DimSize::Static(4), DimSize::Dynamic],
            ElementType::F32,
        ))
    );
    assert_eq!(
        parse_shaped_type("memref<2x8xi8>").unwrap(),
        ShapedType::MemRef(MemRefType::contiguous(static_shape(&[2, 8]), ElementType::I8))
    );
    assert_eq!(
        parse_shaped_type("memref<2x8xf64, strided<[16, ?], offset: 4>>").unwrap(),
        ShapedType::MemRef(MemRefType::strided(
            static_shape(&[2, 8]),
            ElementType::F64,
            DimSize::Static(4),
            smallvec::smallvec![DimSize::Static(16), DimSize::Dynamic],
        ))
    );
}

#[test_case("tensor<4xq7>"; "unknown element type")]
#[test_case("memref<2x4xf32, strided<[1], offset: 0>>"; "stride count mismatch")]
#[test_case("tensor<4xf32> extra"; "trailing input")]
#[test_case("tensor<4xf32"; "unterminated type")]
#[test_case("memref<-4xf32>"; "negative extent")]
#[test_case("tensor<-1x8xf32>"; "negative leading extent")]
fn test_parse_shaped_type_errors(input: &str) {
    assert!(parse_shaped_type(input).is_err());
}

#[test_case("weft.matmul {indexing_maps = [], iterator_types = []} {\n^bb0():\n  weft.yield\n}"; "unknown op")]
#[test_case("weft.generic {flux = 1} {\n^bb0():\n  weft.yield\n}"; "unknown trait attribute")]
#[test_case(
    "weft.generic {indexing_maps = [], iterator_types = [\"spiral\"]} {\n^bb0():\n  weft.yield\n}";
    "unknown iterator type"
)]
#[test_case(
    "weft.generic {indexing_maps = [], iterator_types = []} {\n^bb0(%arg0: f32):\n  weft.yield %nope : f32\n}";
    "unknown body value"
)]
#[test_case(
    "weft.generic {indexing_maps = [], iterator_types = []} {\n^bb0():\n  weft.yield\n} garbage";
    "trailing op input"
)]
#[test_case("weft.generic {indexing_maps = [affine_map<(d0) -> >], iterator_types = []} {\n^bb0():\n  weft.yield\n}"; "bad affine map")]
fn test_parse_op_errors(input: &str) {
    let ctx = Context::new();
    let err = parse_structured_op(&ctx, input).unwrap_err();
    assert!(err.to_string().starts_with("parse error at offset"), "unexpected error: {err}");
}
