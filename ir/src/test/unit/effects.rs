//! Memory-effect reporting tests.

use weft_affine::{AffineMap, Context};

use crate::effects::{effects, Effect, EffectTarget};
use crate::op::{IteratorKind, OpKind, StructuredOp};
use crate::test::support::{dyn_f32_memref, dyn_f32_tensor, elementwise_block, f32_tensor};
use crate::value::Value;

#[test]
fn test_buffer_op_effects() {
    let ctx = Context::new();
    let input_tensor = Value::source(dyn_f32_tensor(1));
    let input_buffer = Value::source(dyn_f32_memref(1));
    let output = Value::source(dyn_f32_memref(1));
    let op = StructuredOp::new(
        OpKind::Generic,
        vec![input_tensor, input_buffer.clone()],
        vec![output.clone()],
        Vec::new(),
        Vec::new(),
        vec![AffineMap::identity(&ctx, 1); 3],
        vec![IteratorKind::Parallel],
        elementwise_block(OpKind::Generic, 1, 2, 1),
    );

    let got = effects(&op);
    // Tensor inputs carry no memory effect; the buffer input is read and the
    // output buffer is read then written.
    assert_eq!(got.len(), 3);
    assert_eq!(got[0].effect, Effect::Read);
    assert_eq!(got[0].target, EffectTarget::Operand(input_buffer));
    assert_eq!(got[1].effect, Effect::Read);
    assert_eq!(got[1].target, EffectTarget::Operand(output.clone()));
    assert_eq!(got[2].effect, Effect::Write);
    assert_eq!(got[2].target, EffectTarget::Operand(output));
}

#[test]
fn test_tensor_op_allocates_results() {
    let ctx = Context::new();
    let op = crate::test::support::tensor_op(
        &ctx,
        Value::source(f32_tensor(&[4])),
        Value::source(f32_tensor(&[4])),
    );
    let got = effects(&op);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].effect, Effect::Allocate);
    assert_eq!(got[0].target, EffectTarget::Result(0));
}
