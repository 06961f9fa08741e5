//! Affine maps: ordered result expressions over a fixed (dims, symbols) domain.

use std::fmt;

use smallvec::SmallVec;

use crate::context::Context;
use crate::expr::AffineExpr;
use crate::parse::{self, ParseError};

/// An affine map `(d0, ..)[s0, ..] -> (e0, ..)`.
///
/// Every result expression references only dimensions below `num_dims` and
/// symbols below `num_symbols`. Maps are plain values; the expressions inside
/// are interned handles, so clones are cheap and equality is structural.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AffineMap {
    num_dims: usize,
    num_symbols: usize,
    results: SmallVec<[AffineExpr; 4]>,
}

impl AffineMap {
    /// Build a map from result expressions.
    ///
    /// Debug-asserts that every result stays within the declared domain.
    pub fn new(num_dims: usize, num_symbols: usize, results: impl IntoIterator<Item = AffineExpr>) -> Self {
        let results: SmallVec<[AffineExpr; 4]> = results.into_iter().collect();
        #[cfg(debug_assertions)]
        for r in &results {
            if let Some(d) = r.max_dim_position() {
                debug_assert!((d as usize) < num_dims, "result references d{d} outside domain of {num_dims} dims");
            }
            if let Some(s) = r.max_symbol_position() {
                debug_assert!(
                    (s as usize) < num_symbols,
                    "result references s{s} outside domain of {num_symbols} symbols"
                );
            }
        }
        Self { num_dims, num_symbols, results }
    }

    /// Map with no results.
    pub fn empty(num_dims: usize, num_symbols: usize) -> Self {
        Self { num_dims, num_symbols, results: SmallVec::new() }
    }

    /// The `rank`-dimensional identity map `(d0, .., dN-1) -> (d0, .., dN-1)`.
    pub fn identity(ctx: &Context, rank: usize) -> Self {
        Self::new(rank, 0, (0..rank).map(|i| ctx.dim(i as u32)))
    }

    /// Permutation map with `results[i] = d(permutation[i])`.
    pub fn from_permutation(ctx: &Context, permutation: &[usize]) -> Self {
        Self::new(permutation.len(), 0, permutation.iter().map(|&p| ctx.dim(p as u32)))
    }

    /// Single-result map over the given domain.
    pub fn single(num_dims: usize, num_symbols: usize, result: AffineExpr) -> Self {
        Self::new(num_dims, num_symbols, [result])
    }

    /// Parse the textual form, e.g. `(d0, d1)[s0] -> (d0 + d1 * s0)`.
    pub fn parse(ctx: &Context, input: &str) -> Result<Self, ParseError> {
        parse::parse_map(ctx, input)
    }

    pub fn num_dims(&self) -> usize {
        self.num_dims
    }

    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    pub fn results(&self) -> &[AffineExpr] {
        &self.results
    }

    pub fn result(&self, index: usize) -> &AffineExpr {
        &self.results[index]
    }

    /// True for `(d0, .., dN-1) -> (d0, .., dN-1)` with no symbols.
    pub fn is_identity(&self) -> bool {
        self.num_symbols == 0
            && self.results.len() == self.num_dims
            && self.results.iter().enumerate().all(|(i, r)| r.as_dim() == Some(i as u32))
    }

    /// True when each result is a distinct bare dimension covering
    /// `0..num_dims` exactly once.
    pub fn is_permutation(&self) -> bool {
        if self.results.len() != self.num_dims {
            return false;
        }
        let mut seen = vec![false; self.num_dims];
        for r in &self.results {
            match r.as_dim() {
                Some(d) if !seen[d as usize] => seen[d as usize] = true,
                _ => return false,
            }
        }
        true
    }

    /// Inverse of a map whose results project onto its dimensions.
    ///
    /// Defined for symbol-free maps where every dimension appears as a bare
    /// result at least once; a dimension occurring several times inverts to
    /// its first occurrence, and non-dimension results are ignored. The
    /// inverse maps result positions back to dimensions, so for a square
    /// permutation it is the true inverse.
    ///
    /// Returns `None` otherwise; non-invertible maps are an expected case for
    /// callers (e.g. the structured-op verifier), not an error.
    pub fn inverse_permutation(&self, ctx: &Context) -> Option<AffineMap> {
        if self.num_symbols != 0 {
            return None;
        }
        if self.num_dims == 0 && self.results.is_empty() {
            return Some(self.clone());
        }
        let mut inverted: Vec<Option<AffineExpr>> = vec![None; self.num_dims];
        for (i, r) in self.results.iter().enumerate() {
            if let Some(d) = r.as_dim() {
                let slot = &mut inverted[d as usize];
                if slot.is_none() {
                    *slot = Some(ctx.dim(i as u32));
                }
            }
        }
        let covered: SmallVec<[AffineExpr; 4]> = inverted.into_iter().flatten().collect();
        if covered.len() != self.num_dims {
            return None;
        }
        Some(AffineMap::new(self.results.len(), 0, covered))
    }

    /// Substitute dimensions and symbols in every result, producing a map over
    /// the new domain.
    pub fn replace_dims_and_symbols(
        &self,
        ctx: &Context,
        dims: &[AffineExpr],
        syms: &[AffineExpr],
        new_num_dims: usize,
        new_num_symbols: usize,
    ) -> AffineMap {
        AffineMap::new(
            new_num_dims,
            new_num_symbols,
            self.results.iter().map(|r| r.replace_dims_and_symbols(ctx, dims, syms)),
        )
    }

    /// Functional composition `self . other`: substitute `self`'s dimension
    /// `i` with `other`'s result `i`.
    ///
    /// Requires `self.num_dims() == other.num_results()`. The composed map is
    /// over `other`'s dimensions; `self`'s symbols keep their positions and
    /// `other`'s symbols are renumbered to follow them. Composition is
    /// associative after simplification.
    pub fn compose(&self, ctx: &Context, other: &AffineMap) -> AffineMap {
        assert_eq!(self.num_dims, other.num_results(), "composition rank mismatch");
        let num_dims = other.num_dims();
        let num_symbols = self.num_symbols + other.num_symbols();

        // Renumber other's symbols to start after self's.
        let shifted_syms: Vec<AffineExpr> =
            (0..other.num_symbols()).map(|i| ctx.symbol((self.num_symbols + i) as u32)).collect();
        let identity_dims: Vec<AffineExpr> = (0..num_dims).map(|i| ctx.dim(i as u32)).collect();
        let substituted = other.replace_dims_and_symbols(ctx, &identity_dims, &shifted_syms, num_dims, num_symbols);

        AffineMap::new(
            num_dims,
            num_symbols,
            self.results.iter().map(|r| r.replace_dims_and_symbols(ctx, substituted.results(), &[])),
        )
    }

    /// Concatenate the results of several maps over a unified
    /// (max dims, max symbols) domain.
    pub fn concat(maps: &[AffineMap]) -> AffineMap {
        let num_dims = maps.iter().map(AffineMap::num_dims).max().unwrap_or(0);
        let num_symbols = maps.iter().map(AffineMap::num_symbols).max().unwrap_or(0);
        AffineMap::new(num_dims, num_symbols, maps.iter().flat_map(|m| m.results.iter().cloned()))
    }

    /// Fold each result against partially-known dimension and symbol values.
    pub fn partial_eval(
        &self,
        ctx: &Context,
        dims: &[Option<i64>],
        syms: &[Option<i64>],
    ) -> SmallVec<[AffineExpr; 4]> {
        self.results.iter().map(|r| r.partial_eval(ctx, dims, syms)).collect()
    }
}

impl fmt::Display for AffineMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for i in 0..self.num_dims {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "d{i}")?;
        }
        f.write_str(")")?;
        if self.num_symbols > 0 {
            f.write_str("[")?;
            for i in 0..self.num_symbols {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "s{i}")?;
            }
            f.write_str("]")?;
        }
        f.write_str(" -> (")?;
        for (i, r) in self.results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{r}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for AffineMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
