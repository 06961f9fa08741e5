//! Memory-effect reporting for dependence analysis.

use crate::op::StructuredOp;
use crate::value::Value;

/// Kind of memory effect an operation has on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    Read,
    Write,
    Allocate,
}

/// What an effect instance is attached to.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectTarget {
    /// A result tensor, by result index.
    Result(usize),
    /// A shaped operand value.
    Operand(Value),
}

/// One effect on one target.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectInstance {
    pub effect: Effect,
    pub target: EffectTarget,
}

/// Report the memory effects of a structured op: every result tensor is
/// allocated, every buffer input is read, and every output buffer is both
/// read and written.
pub fn effects(op: &StructuredOp) -> Vec<EffectInstance> {
    let mut out = Vec::new();
    for index in 0..op.result_types.len() {
        out.push(EffectInstance { effect: Effect::Allocate, target: EffectTarget::Result(index) });
    }
    for (_, value) in op.input_buffers() {
        out.push(EffectInstance { effect: Effect::Read, target: EffectTarget::Operand(value.clone()) });
    }
    for value in &op.output_buffers {
        out.push(EffectInstance { effect: Effect::Read, target: EffectTarget::Operand(value.clone()) });
        out.push(EffectInstance { effect: Effect::Write, target: EffectTarget::Operand(value.clone()) });
    }
    out
}
