//! Local rewrite rules for structured ops.
//!
//! Each pattern is a pure function from an op to an optional replacement;
//! [`canonicalize`] drives them to a fixed point. Patterns never mutate in
//! place, they rebuild the descriptor with [`StructuredOp::clone_with_operands`].

use std::collections::HashMap;

use tracing::debug;
use weft_affine::AffineMap;

use crate::op::{OpKind, StructuredOp};
use crate::types::{can_fold_cast, DimSize};
use crate::value::Value;

/// Outcome of canonicalizing one op.
#[derive(Debug)]
pub enum StructuredRewrite {
    /// The op has no observable effect and can be deleted outright.
    Erased,
    /// The op was replaced by a simpler equivalent.
    Rewritten(StructuredOp),
}

/// An op iterating over a zero-extent buffer performs no iterations and has
/// no effect. Only buffer operands qualify: a `tensor<0x..>` value still
/// produces a result that users may consume.
pub fn erase_dead(op: &StructuredOp) -> bool {
    op.inputs
        .iter()
        .chain(&op.output_buffers)
        .filter_map(|v| v.ty().as_memref())
        .any(|m| m.shape.contains(&DimSize::Static(0)))
}

/// Fold tensor casts into the op when the cast source refines the cast
/// result. Inputs and init tensors fold; folding an init tensor also updates
/// the corresponding result type.
pub fn fold_tensor_casts(op: &StructuredOp) -> Option<StructuredOp> {
    let foldable = |v: &Value| {
        v.defining_tensor_cast().is_some_and(|src| can_fold_cast(src.ty(), v.ty()))
    };
    if !op.inputs.iter().chain(&op.init_tensors).any(foldable) {
        return None;
    }

    let fold = |v: &Value| match v.defining_tensor_cast() {
        Some(src) if can_fold_cast(src.ty(), v.ty()) => src.clone(),
        _ => v.clone(),
    };
    let inputs: Vec<Value> = op.inputs.iter().map(fold).collect();
    let init_tensors: Vec<Value> = op.init_tensors.iter().map(fold).collect();
    // Results mirror the init tensors; without inits they are untouched.
    let result_types = if init_tensors.is_empty() {
        op.result_types.clone()
    } else {
        init_tensors
            .iter()
            .map(|v| v.ty().as_tensor().expect("init tensors are tensor-typed").clone())
            .collect()
    };

    Some(op.clone_with_operands(
        inputs,
        op.output_buffers.clone(),
        init_tensors,
        result_types,
        op.indexing_maps.clone(),
        op.block().clone(),
    ))
}

/// Fold memref casts into the op wherever the cast source refines the cast
/// result. Operand types only gain static information, so maps and result
/// types are unaffected.
pub fn fold_memref_casts(op: &StructuredOp) -> Option<StructuredOp> {
    let foldable = |v: &Value| {
        v.defining_memref_cast().is_some_and(|src| can_fold_cast(src.ty(), v.ty()))
    };
    if !op.inputs.iter().chain(&op.output_buffers).any(foldable) {
        return None;
    }

    let fold = |v: &Value| match v.defining_memref_cast() {
        Some(src) if can_fold_cast(src.ty(), v.ty()) => src.clone(),
        _ => v.clone(),
    };
    let inputs: Vec<Value> = op.inputs.iter().map(fold).collect();
    let output_buffers: Vec<Value> = op.output_buffers.iter().map(fold).collect();

    Some(op.clone_with_operands(
        inputs,
        output_buffers,
        op.init_tensors.clone(),
        op.result_types.clone(),
        op.indexing_maps.clone(),
        op.block().clone(),
    ))
}

/// Remove inputs that duplicate an earlier input with the same value and the
/// same indexing map.
///
/// The replacement is rebuilt from scratch: the canonical index of every
/// input is precomputed, the retained inputs and maps are collected in one
/// pass, and the body block is rebuilt with its argument references rewired
/// to the canonical arguments.
pub fn deduplicate_inputs(op: &StructuredOp) -> Option<StructuredOp> {
    let mut canonical: HashMap<(u64, &AffineMap), usize> = HashMap::new();
    let mut canonical_indices = Vec::with_capacity(op.inputs.len());
    for (i, input) in op.inputs.iter().enumerate() {
        let index = *canonical.entry((input.id(), op.indexing_map(i))).or_insert(i);
        canonical_indices.push(index);
    }
    if canonical.len() == op.inputs.len() {
        return None;
    }

    // Position of each retained input in the compressed input list.
    let mut compressed = vec![usize::MAX; op.inputs.len()];
    let mut inputs = Vec::with_capacity(canonical.len());
    let mut indexing_maps = Vec::with_capacity(canonical.len() + op.num_outputs());
    for (i, input) in op.inputs.iter().enumerate() {
        if canonical_indices[i] == i {
            compressed[i] = inputs.len();
            inputs.push(input.clone());
            indexing_maps.push(op.indexing_map(i).clone());
        }
    }
    for i in 0..op.num_outputs() {
        indexing_maps.push(op.indexing_map(op.num_inputs() + i).clone());
    }

    // Rewire the body: redundant input arguments collapse onto their
    // canonical argument, everything else keeps its relative position.
    let arg_offset = match op.kind {
        OpKind::Generic => 0,
        OpKind::IndexedGeneric => op.num_loops(),
    };
    let block = op.block();
    let mut arg_map = Vec::with_capacity(block.args.len());
    let mut new_args = Vec::new();
    for i in 0..arg_offset {
        arg_map.push(i);
        new_args.push(block.args[i]);
    }
    for i in 0..op.inputs.len() {
        arg_map.push(arg_offset + compressed[canonical_indices[i]]);
        if canonical_indices[i] == i {
            new_args.push(block.args[arg_offset + i]);
        }
    }
    for i in 0..op.num_outputs() {
        arg_map.push(arg_offset + inputs.len() + i);
        new_args.push(block.args[arg_offset + op.inputs.len() + i]);
    }

    Some(op.clone_with_operands(
        inputs,
        op.output_buffers.clone(),
        op.init_tensors.clone(),
        op.result_types.clone(),
        indexing_maps,
        block.remap_args(&arg_map, new_args),
    ))
}

/// Drive all patterns to a fixed point.
///
/// Returns `None` when no pattern applies; otherwise the op is either erased
/// or replaced by the fully canonicalized form.
pub fn canonicalize(op: &StructuredOp) -> Option<StructuredRewrite> {
    let mut current: Option<StructuredOp> = None;
    loop {
        let op = current.as_ref().unwrap_or(op);
        // Folds can expose a zero-extent buffer (e.g. a cast from
        // `memref<0xf32>`), so deadness is re-checked every round.
        if erase_dead(op) {
            debug!(op = %op.kind.name(), "erasing structured op over zero-extent buffer");
            return Some(StructuredRewrite::Erased);
        }
        if let Some(next) = fold_tensor_casts(op) {
            debug!(op = %op.kind.name(), "folded tensor casts into structured op");
            current = Some(next);
            continue;
        }
        if let Some(next) = fold_memref_casts(op) {
            debug!(op = %op.kind.name(), "folded memref casts into structured op");
            current = Some(next);
            continue;
        }
        if let Some(next) = deduplicate_inputs(op) {
            debug!(op = %op.kind.name(), "deduplicated structured op inputs");
            current = Some(next);
            continue;
        }
        break;
    }
    current.map(StructuredRewrite::Rewritten)
}
