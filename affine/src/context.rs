//! Interning arena for affine expressions.
//!
//! All expressions are built through a [`Context`], which deduplicates them
//! structurally: building the same expression twice returns the same shared
//! node, so expression equality is an ID comparison. The table serializes
//! concurrent inserts; IDs come from a process-wide counter so they never
//! collide across contexts.
//!
//! Constructors simplify on the way in: constant folding, additive and
//! multiplicative identities, `x * 0`, `x floordiv 1`, `x mod 1`. Anything
//! beyond these local rules is left to callers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use papaya::HashMap;

use crate::expr::{AffineExpr, ExprKind, ExprNode};

// Process-wide so IDs stay unique even across contexts; uniqueness is all
// that is needed, hence Relaxed.
static EXPR_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_expr_id() -> u64 {
    EXPR_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Binary operators of the affine algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Mul,
    FloorDiv,
    CeilDiv,
    Mod,
}

/// Structural interning key: leaf payload or operator plus child IDs.
#[derive(Clone, PartialEq, Eq, Hash)]
enum ExprKey {
    Dim(u32),
    Symbol(u32),
    Constant(i64),
    Binary(BinOp, u64, u64),
}

#[derive(Default)]
struct ContextInner {
    exprs: HashMap<ExprKey, AffineExpr>,
}

/// Per-compilation-unit expression arena.
///
/// Cheap to clone (shared handle). Expressions interned by one context must
/// not be combined with expressions from another; the constructors do not
/// check for this.
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&self, key: ExprKey, kind: ExprKind) -> AffineExpr {
        let exprs = self.inner.exprs.pin();
        exprs
            .get_or_insert_with(key, || AffineExpr(Arc::new(ExprNode { id: next_expr_id(), kind })))
            .clone()
    }

    /// Dimension variable `d<index>`.
    pub fn dim(&self, index: u32) -> AffineExpr {
        self.intern(ExprKey::Dim(index), ExprKind::Dim(index))
    }

    /// Symbol variable `s<index>`.
    pub fn symbol(&self, index: u32) -> AffineExpr {
        self.intern(ExprKey::Symbol(index), ExprKind::Symbol(index))
    }

    /// Integer constant.
    pub fn constant(&self, value: i64) -> AffineExpr {
        self.intern(ExprKey::Constant(value), ExprKind::Constant(value))
    }

    fn binary_raw(&self, op: BinOp, lhs: AffineExpr, rhs: AffineExpr) -> AffineExpr {
        let key = ExprKey::Binary(op, lhs.id(), rhs.id());
        self.intern(key, ExprKind::Binary { op, lhs, rhs })
    }

    /// `lhs + rhs`, simplified. Constants fold and migrate to the right.
    pub fn add(&self, lhs: AffineExpr, rhs: AffineExpr) -> AffineExpr {
        match (lhs.as_constant(), rhs.as_constant()) {
            (Some(a), Some(b)) => self.constant(a + b),
            (_, Some(0)) => lhs,
            (Some(0), _) => rhs,
            (Some(_), None) => self.binary_raw(BinOp::Add, rhs, lhs),
            _ => self.binary_raw(BinOp::Add, lhs, rhs),
        }
    }

    /// `lhs - rhs`, canonicalized to `lhs + rhs * -1`.
    pub fn sub(&self, lhs: AffineExpr, rhs: AffineExpr) -> AffineExpr {
        let neg = self.mul(rhs, self.constant(-1));
        self.add(lhs, neg)
    }

    /// `lhs * rhs`, simplified. Constants fold and migrate to the right.
    pub fn mul(&self, lhs: AffineExpr, rhs: AffineExpr) -> AffineExpr {
        match (lhs.as_constant(), rhs.as_constant()) {
            (Some(a), Some(b)) => self.constant(a * b),
            (Some(0), _) | (_, Some(0)) => self.constant(0),
            (_, Some(1)) => lhs,
            (Some(1), _) => rhs,
            (Some(_), None) => self.binary_raw(BinOp::Mul, rhs, lhs),
            _ => self.binary_raw(BinOp::Mul, lhs, rhs),
        }
    }

    /// `lhs floordiv rhs` (rounding toward negative infinity on constants).
    pub fn floor_div(&self, lhs: AffineExpr, rhs: AffineExpr) -> AffineExpr {
        match (lhs.as_constant(), rhs.as_constant()) {
            (Some(a), Some(b)) if b != 0 => self.constant(floor_div_i64(a, b)),
            (_, Some(1)) => lhs,
            _ => self.binary_raw(BinOp::FloorDiv, lhs, rhs),
        }
    }

    /// `lhs ceildiv rhs` (rounding toward positive infinity on constants).
    pub fn ceil_div(&self, lhs: AffineExpr, rhs: AffineExpr) -> AffineExpr {
        match (lhs.as_constant(), rhs.as_constant()) {
            (Some(a), Some(b)) if b != 0 => self.constant(ceil_div_i64(a, b)),
            (_, Some(1)) => lhs,
            _ => self.binary_raw(BinOp::CeilDiv, lhs, rhs),
        }
    }

    /// `lhs mod rhs`; the result takes the sign of the divisor on constants,
    /// i.e. `a mod b == a - b * (a floordiv b)`.
    pub fn rem(&self, lhs: AffineExpr, rhs: AffineExpr) -> AffineExpr {
        match (lhs.as_constant(), rhs.as_constant()) {
            (Some(a), Some(b)) if b != 0 => self.constant(a - b * floor_div_i64(a, b)),
            (_, Some(1)) => self.constant(0),
            _ => self.binary_raw(BinOp::Mod, lhs, rhs),
        }
    }

    /// Build a binary node by operator tag, going through the simplifying
    /// constructor for that operator.
    pub fn binary(&self, op: BinOp, lhs: AffineExpr, rhs: AffineExpr) -> AffineExpr {
        match op {
            BinOp::Add => self.add(lhs, rhs),
            BinOp::Mul => self.mul(lhs, rhs),
            BinOp::FloorDiv => self.floor_div(lhs, rhs),
            BinOp::CeilDiv => self.ceil_div(lhs, rhs),
            BinOp::Mod => self.rem(lhs, rhs),
        }
    }

    /// Number of distinct interned expressions (diagnostic aid).
    pub fn interned_count(&self) -> usize {
        self.inner.exprs.pin().len()
    }
}

pub(crate) fn floor_div_i64(a: i64, b: i64) -> i64 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

pub(crate) fn ceil_div_i64(a: i64, b: i64) -> i64 {
    -floor_div_i64(-a, b)
}
