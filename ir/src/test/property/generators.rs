//! Generators for property-based testing.
//!
//! Reassociations are generated as band widths and materialized into affine
//! maps on demand; shapes are generated alongside so the expanded rank always
//! matches the grouping's domain.

use proptest::prelude::*;
use weft_affine::{AffineMap, Context};

use crate::types::{DimSize, Shape};

/// Widths of consecutive dimension bands; the expanded rank is their sum.
pub fn arb_band_widths() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(1usize..=3, 1..4)
}

/// Band widths together with one extent per expanded dimension, `None`
/// meaning dynamic.
pub fn arb_collapse_case() -> impl Strategy<Value = (Vec<usize>, Vec<Option<i64>>)> {
    arb_band_widths().prop_flat_map(|widths| {
        let rank: usize = widths.iter().sum();
        let extents = proptest::collection::vec(proptest::option::weighted(0.8, 1i64..=6), rank);
        (Just(widths), extents)
    })
}

/// Materialize band widths into the reassociation grouping over `num_dims`.
pub fn grouping(ctx: &Context, num_dims: usize, widths: &[usize]) -> Vec<AffineMap> {
    let mut next = 0u32;
    widths
        .iter()
        .map(|&w| {
            let results: Vec<_> = (0..w)
                .map(|_| {
                    let d = ctx.dim(next);
                    next += 1;
                    d
                })
                .collect();
            AffineMap::new(num_dims, 0, results)
        })
        .collect()
}

/// Shape from optional extents.
pub fn shape_from(extents: &[Option<i64>]) -> Shape {
    extents.iter().map(|e| e.map_or(DimSize::Dynamic, DimSize::Static)).collect()
}
