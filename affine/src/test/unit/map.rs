//! Affine map algebra tests: identity, permutation, composition, concat.

use crate::{AffineMap, Context};

#[test]
fn test_identity_map() {
    let ctx = Context::new();
    let id = AffineMap::identity(&ctx, 3);
    assert!(id.is_identity());
    assert!(id.is_permutation());
    assert_eq!(id.num_dims(), 3);
    assert_eq!(id.num_results(), 3);
}

#[test]
fn test_permutation_and_inverse() {
    let ctx = Context::new();
    let perm = AffineMap::from_permutation(&ctx, &[2, 0, 1]);
    assert!(perm.is_permutation());
    assert!(!perm.is_identity());

    let inv = perm.inverse_permutation(&ctx).unwrap();
    assert!(inv.compose(&ctx, &perm).is_identity());
    assert!(perm.compose(&ctx, &inv).is_identity());
}

#[test]
fn test_non_permutation_has_no_inverse() {
    let ctx = Context::new();
    // Repeated dimension.
    let repeated = AffineMap::new(2, 0, [ctx.dim(0), ctx.dim(0)]);
    assert!(!repeated.is_permutation());
    assert!(repeated.inverse_permutation(&ctx).is_none());

    // Compound result.
    let compound = AffineMap::new(2, 0, [ctx.add(ctx.dim(0), ctx.dim(1)), ctx.dim(1)]);
    assert!(compound.inverse_permutation(&ctx).is_none());

    // Symbols block inversion even for bare-dim results.
    let symbolic = AffineMap::new(2, 1, [ctx.dim(0), ctx.dim(1)]);
    assert!(symbolic.inverse_permutation(&ctx).is_none());
}

#[test]
fn test_compose_substitutes_results() {
    let ctx = Context::new();
    // (d0, d1) -> (d0 + d1)
    let sum = AffineMap::single(2, 0, ctx.add(ctx.dim(0), ctx.dim(1)));
    // (d0, d1) -> (d1, d0)
    let swap = AffineMap::from_permutation(&ctx, &[1, 0]);
    let composed = sum.compose(&ctx, &swap);
    assert_eq!(composed.num_dims(), 2);
    assert_eq!(composed.num_results(), 1);
    assert_eq!(composed.result(0), &ctx.add(ctx.dim(1), ctx.dim(0)));
}

#[test]
fn test_compose_renumbers_symbols() {
    let ctx = Context::new();
    // (d0)[s0] -> (d0 + s0)
    let outer = AffineMap::single(1, 1, ctx.add(ctx.dim(0), ctx.symbol(0)));
    // (d0)[s0] -> (d0 * s0)
    let inner = AffineMap::single(1, 1, ctx.mul(ctx.dim(0), ctx.symbol(0)));
    let composed = outer.compose(&ctx, &inner);
    assert_eq!(composed.num_dims(), 1);
    assert_eq!(composed.num_symbols(), 2);
    // Outer's s0 stays s0, inner's s0 becomes s1.
    assert_eq!(composed.result(0), &ctx.add(ctx.mul(ctx.dim(0), ctx.symbol(1)), ctx.symbol(0)));
}

#[test]
fn test_compose_associativity() {
    let ctx = Context::new();
    let a = AffineMap::from_permutation(&ctx, &[1, 2, 0]);
    let b = AffineMap::from_permutation(&ctx, &[2, 1, 0]);
    let c = AffineMap::new(3, 0, [ctx.add(ctx.dim(0), ctx.dim(2)), ctx.dim(1), ctx.mul(ctx.dim(2), ctx.constant(3))]);
    let left = a.compose(&ctx, &b).compose(&ctx, &c);
    let right = a.compose(&ctx, &b.compose(&ctx, &c));
    assert_eq!(left, right);
}

#[test]
fn test_concat() {
    let ctx = Context::new();
    let first = AffineMap::new(3, 0, [ctx.dim(0), ctx.dim(1)]);
    let second = AffineMap::single(3, 1, ctx.add(ctx.dim(2), ctx.symbol(0)));
    let concat = AffineMap::concat(&[first.clone(), second]);
    assert_eq!(concat.num_dims(), 3);
    assert_eq!(concat.num_symbols(), 1);
    assert_eq!(concat.num_results(), 3);
    assert_eq!(concat.result(0), first.result(0));
}

#[test]
fn test_concat_empty() {
    let concat = AffineMap::concat(&[]);
    assert_eq!(concat.num_dims(), 0);
    assert_eq!(concat.num_results(), 0);
}

#[test]
fn test_partial_eval() {
    let ctx = Context::new();
    let map = AffineMap::new(2, 1, [ctx.add(ctx.dim(0), ctx.symbol(0)), ctx.dim(1)]);
    let results = map.partial_eval(&ctx, &[Some(2), None], &[Some(5)]);
    assert_eq!(results[0].as_constant(), Some(7));
    assert_eq!(results[1], ctx.dim(1));
}

#[test]
fn test_display_round_trips_through_parse() {
    let ctx = Context::new();
    let maps = [
        AffineMap::identity(&ctx, 2),
        AffineMap::single(2, 1, ctx.add(ctx.dim(0), ctx.floor_div(ctx.symbol(0), ctx.constant(2)))),
        AffineMap::new(3, 0, [ctx.sub(ctx.dim(0), ctx.dim(2)), ctx.mul(ctx.dim(1), ctx.constant(4))]),
    ];
    for map in maps {
        let reparsed = AffineMap::parse(&ctx, &map.to_string()).unwrap();
        assert_eq!(reparsed, map);
    }
}

#[test]
fn test_display_format() {
    let ctx = Context::new();
    let map = AffineMap::single(2, 1, ctx.add(ctx.dim(1), ctx.symbol(0)));
    assert_eq!(map.to_string(), "(d0, d1)[s0] -> (d1 + s0)");
}
