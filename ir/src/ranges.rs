//! Iteration-space loop-range computation.
//!
//! Ranges are derived from operand shapes through the concatenated
//! loops-to-shapes map. Extents are modelled symbolically: a statically
//! known extent folds to a constant, a dynamic one stays a reference to the
//! operand dimension it was read from, and anything derived through a
//! non-trivial affine expression is kept as a deferred map application.

use weft_affine::{AffineExpr, AffineMap, BinOp, Context};

use crate::error::{self, Result};
use crate::op::StructuredOp;
use crate::types::DimSize;

/// A symbolic index-typed quantity.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    Const(i64),
    /// Runtime extent of one dimension of a shaped operand.
    Dim { operand: usize, dim: usize },
    /// A single-result affine map applied to other index values.
    Affine { map: AffineMap, operands: Vec<IndexValue> },
}

/// Half-open loop range `[lower, upper)` with a step.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopRange {
    pub lower: IndexValue,
    pub upper: IndexValue,
    pub step: IndexValue,
}

/// Flat list of all operand extents in operand order, one entry per
/// dimension.
///
/// When a symbol source is set, the maps' symbols are bound to the source
/// operand's extents; since the concatenated map repeats its symbols for
/// every operand, the source extents are appended once per operand at the
/// end of the list.
pub fn flat_operand_dims(op: &StructuredOp) -> Vec<IndexValue> {
    let mut res = Vec::new();
    let mut ranks = Vec::new();
    for (operand, value) in op.shaped_operands().enumerate() {
        let shape = value.ty().shape();
        ranks.push(shape.len());
        for (dim, size) in shape.iter().enumerate() {
            res.push(match size {
                DimSize::Static(s) => IndexValue::Const(*s),
                DimSize::Dynamic => IndexValue::Dim { operand, dim },
            });
        }
    }

    let Some(source) = op.symbol_source else {
        return res;
    };
    let num_symb = ranks[source];
    let symbols_pos: usize = ranks[..source].iter().sum();
    res.reserve(ranks.len() * num_symb);
    for _ in 0..ranks.len() {
        for idx in 0..num_symb {
            res.push(res[symbols_pos + idx].clone());
        }
    }
    res
}

/// Fold an affine expression against index values bound positionally:
/// dimension `i` to `values[i]`, symbol `k` to `values[num_dims + k]`.
fn apply_expr(
    ctx: &Context,
    expr: &AffineExpr,
    num_dims: usize,
    num_symbols: usize,
    values: &[IndexValue],
) -> IndexValue {
    let known = |v: &IndexValue| match v {
        IndexValue::Const(c) => Some(*c),
        _ => None,
    };
    let dims: Vec<Option<i64>> = values[..num_dims].iter().map(known).collect();
    let syms: Vec<Option<i64>> = values[num_dims..].iter().map(known).collect();
    let folded = expr.partial_eval(ctx, &dims, &syms);

    if let Some(c) = folded.as_constant() {
        return IndexValue::Const(c);
    }
    if let Some(d) = folded.as_dim() {
        return values[d as usize].clone();
    }
    if let Some(s) = folded.as_symbol() {
        return values[num_dims + s as usize].clone();
    }
    IndexValue::Affine { map: AffineMap::single(num_dims, num_symbols, folded), operands: values.to_vec() }
}

/// Recognize the windowed access form `m + n - s floordiv c` with `m`, `n`
/// dimensions and `s` a symbol. Returns the position of `m`, the
/// `s floordiv c` subexpression and `s` itself.
fn match_window_bound(expr: &AffineExpr) -> Option<(usize, AffineExpr, AffineExpr)> {
    let (BinOp::Add, lhs, rhs) = expr.as_binary()? else {
        return None;
    };
    let (BinOp::Add, m, n) = lhs.as_binary()? else {
        return None;
    };
    let (BinOp::Mul, fdiv, minus_one) = rhs.as_binary()? else {
        return None;
    };
    let m_pos = m.as_dim()?;
    n.as_dim()?;
    if minus_one.as_constant() != Some(-1) {
        return None;
    }
    let (BinOp::FloorDiv, s, c) = fdiv.as_binary()? else {
        return None;
    };
    s.as_symbol()?;
    c.as_constant()?;
    Some((m_pos as usize, fdiv.clone(), s.clone()))
}

/// Compute one range per loop dimension.
///
/// A bare-dimension map result `d` binds loop `d` to `[0, extent, 1)`; the
/// first such result per loop wins. The windowed form `m + n - s floordiv c`
/// instead binds loop `m` to `[s floordiv c, size(m) + s floordiv c + 1 - s)`.
/// A loop left without a range is an error.
pub fn compute_loop_ranges(ctx: &Context, op: &StructuredOp) -> Result<Vec<LoopRange>> {
    let map = op.loops_to_shapes_map();
    let num_dims = map.num_dims();
    let num_res = map.num_results();
    let num_sym = map.num_symbols();
    let sizes = flat_operand_dims(op);

    let mut ranges: Vec<Option<LoopRange>> = vec![None; num_dims];
    for idx in 0..num_res {
        let result = map.result(idx);
        if let Some(d) = result.as_dim() {
            let slot = &mut ranges[d as usize];
            if slot.is_none() {
                *slot = Some(LoopRange {
                    lower: IndexValue::Const(0),
                    upper: sizes[idx].clone(),
                    step: IndexValue::Const(1),
                });
            }
            continue;
        }

        let Some((m_pos, fdiv, s)) = match_window_bound(result) else {
            continue;
        };
        // Bind symbol `num_sym` to size(m) on top of the regular symbol
        // block, then evaluate both bounds against the extent list.
        let size_of_m = ctx.symbol(num_sym as u32);
        let upper_expr = ctx.sub(ctx.add(ctx.add(size_of_m, fdiv.clone()), ctx.constant(1)), s);
        let mut values: Vec<IndexValue> = sizes[..num_dims].to_vec();
        values.extend_from_slice(&sizes[num_res..num_res + num_sym]);
        values.push(sizes[m_pos].clone());
        let lower = apply_expr(ctx, &fdiv, num_dims, num_sym + 1, &values);
        let upper = apply_expr(ctx, &upper_expr, num_dims, num_sym + 1, &values);
        ranges[m_pos] = Some(LoopRange { lower, upper, step: IndexValue::Const(1) });
    }

    ranges
        .into_iter()
        .enumerate()
        .map(|(dim, r)| r.ok_or_else(|| error::MissingLoopRangeSnafu { dim }.build()))
        .collect()
}
