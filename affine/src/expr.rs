//! Immutable affine expression values.
//!
//! An [`AffineExpr`] is a handle to an interned expression node owned by a
//! [`Context`](crate::Context). Equality and hashing use the node's stable ID,
//! which is globally unique, so comparing expressions from different contexts
//! is well defined (and always false for distinct nodes).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::context::{BinOp, Context};

/// Interned expression node. Construct through [`Context`] only.
#[derive(Debug)]
pub struct ExprNode {
    pub(crate) id: u64,
    pub(crate) kind: ExprKind,
}

/// The shape of an affine expression.
///
/// Subtraction is represented as `lhs + rhs * -1`, matching the canonical
/// form the constructors produce. The right-hand side of `Mul`, `FloorDiv`,
/// `CeilDiv` and `Mod` is a constant or symbolic expression in well-formed
/// input; the constructors do not enforce this, callers that need the
/// guarantee check it (e.g. the permutation tests in [`crate::AffineMap`]).
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Dimension variable `d<index>`.
    Dim(u32),
    /// Symbol variable `s<index>`.
    Symbol(u32),
    /// Integer constant.
    Constant(i64),
    /// Binary operation; always constructed in simplified form.
    Binary { op: BinOp, lhs: AffineExpr, rhs: AffineExpr },
}

/// Handle to an interned affine expression.
#[derive(Clone)]
pub struct AffineExpr(pub(crate) Arc<ExprNode>);

impl PartialEq for AffineExpr {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for AffineExpr {}

impl Hash for AffineExpr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl AffineExpr {
    /// Stable unique ID of the interned node.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// Dimension position if this is a bare dimension expression.
    pub fn as_dim(&self) -> Option<u32> {
        match self.kind() {
            ExprKind::Dim(i) => Some(*i),
            _ => None,
        }
    }

    /// Symbol position if this is a bare symbol expression.
    pub fn as_symbol(&self) -> Option<u32> {
        match self.kind() {
            ExprKind::Symbol(i) => Some(*i),
            _ => None,
        }
    }

    /// Constant value if this expression folded to a constant.
    pub fn as_constant(&self) -> Option<i64> {
        match self.kind() {
            ExprKind::Constant(v) => Some(*v),
            _ => None,
        }
    }

    /// Operator and operands if this is a binary node.
    pub fn as_binary(&self) -> Option<(BinOp, &AffineExpr, &AffineExpr)> {
        match self.kind() {
            ExprKind::Binary { op, lhs, rhs } => Some((*op, lhs, rhs)),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind(), ExprKind::Constant(_))
    }

    /// Post-order traversal over the expression tree.
    pub fn walk(&self, f: &mut impl FnMut(&AffineExpr)) {
        if let ExprKind::Binary { lhs, rhs, .. } = self.kind() {
            lhs.walk(f);
            rhs.walk(f);
        }
        f(self);
    }

    /// Largest dimension position referenced, if any.
    pub fn max_dim_position(&self) -> Option<u32> {
        let mut max = None;
        self.walk(&mut |e| {
            if let ExprKind::Dim(i) = e.kind() {
                max = Some(max.map_or(*i, |m: u32| m.max(*i)));
            }
        });
        max
    }

    /// Largest symbol position referenced, if any.
    pub fn max_symbol_position(&self) -> Option<u32> {
        let mut max = None;
        self.walk(&mut |e| {
            if let ExprKind::Symbol(i) = e.kind() {
                max = Some(max.map_or(*i, |m: u32| m.max(*i)));
            }
        });
        max
    }

    /// Substitute dimensions and symbols by position.
    ///
    /// `Dim(i)` becomes `dims[i]` and `Symbol(i)` becomes `syms[i]`; positions
    /// past the end of a replacement list are left untouched. The result is
    /// re-simplified bottom-up through the context constructors.
    pub fn replace_dims_and_symbols(&self, ctx: &Context, dims: &[AffineExpr], syms: &[AffineExpr]) -> AffineExpr {
        match self.kind() {
            ExprKind::Dim(i) => dims.get(*i as usize).cloned().unwrap_or_else(|| self.clone()),
            ExprKind::Symbol(i) => syms.get(*i as usize).cloned().unwrap_or_else(|| self.clone()),
            ExprKind::Constant(_) => self.clone(),
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = lhs.replace_dims_and_symbols(ctx, dims, syms);
                let rhs = rhs.replace_dims_and_symbols(ctx, dims, syms);
                ctx.binary(*op, lhs, rhs)
            }
        }
    }

    /// Substitute known positions with constants and fold.
    ///
    /// A `None` entry leaves the variable symbolic; the result is a constant
    /// expression exactly when every referenced position is known.
    pub fn partial_eval(&self, ctx: &Context, dims: &[Option<i64>], syms: &[Option<i64>]) -> AffineExpr {
        match self.kind() {
            ExprKind::Dim(i) => match dims.get(*i as usize).copied().flatten() {
                Some(v) => ctx.constant(v),
                None => self.clone(),
            },
            ExprKind::Symbol(i) => match syms.get(*i as usize).copied().flatten() {
                Some(v) => ctx.constant(v),
                None => self.clone(),
            },
            ExprKind::Constant(_) => self.clone(),
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = lhs.partial_eval(ctx, dims, syms);
                let rhs = rhs.partial_eval(ctx, dims, syms);
                ctx.binary(*op, lhs, rhs)
            }
        }
    }
}

// Printing follows the conventional affine syntax: `d0 + d1 * 4`,
// `s0 floordiv 2`, with `expr + c * -1` rendered as subtraction.
impl fmt::Display for AffineExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_expr(self, f, /*enclosing_tight:*/ false)
    }
}

impl fmt::Debug for AffineExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

fn fmt_expr(expr: &AffineExpr, f: &mut fmt::Formatter<'_>, enclosing_tight: bool) -> fmt::Result {
    match expr.kind() {
        ExprKind::Dim(i) => write!(f, "d{i}"),
        ExprKind::Symbol(i) => write!(f, "s{i}"),
        ExprKind::Constant(v) => write!(f, "{v}"),
        ExprKind::Binary { op: BinOp::Add, lhs, rhs } => {
            if enclosing_tight {
                f.write_str("(")?;
            }
            fmt_expr(lhs, f, false)?;
            // Render `x + c` with negative c, and `x + y * -1`, as subtraction.
            match rhs.kind() {
                ExprKind::Constant(c) if *c < 0 => write!(f, " - {}", -c)?,
                ExprKind::Binary { op: BinOp::Mul, lhs: mlhs, rhs: mrhs }
                    if mrhs.as_constant() == Some(-1) =>
                {
                    f.write_str(" - ")?;
                    fmt_expr(mlhs, f, true)?;
                }
                _ => {
                    f.write_str(" + ")?;
                    fmt_expr(rhs, f, false)?;
                }
            }
            if enclosing_tight {
                f.write_str(")")?;
            }
            Ok(())
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let name = match op {
                BinOp::Add => unreachable!(),
                BinOp::Mul => "*",
                BinOp::FloorDiv => "floordiv",
                BinOp::CeilDiv => "ceildiv",
                BinOp::Mod => "mod",
            };
            // Any binary operand of a tight operator needs parentheses;
            // `d0 ceildiv d0 * d0` would reparse as `(d0 ceildiv d0) * d0`.
            if enclosing_tight {
                f.write_str("(")?;
            }
            fmt_expr(lhs, f, true)?;
            write!(f, " {name} ")?;
            fmt_expr(rhs, f, true)?;
            if enclosing_tight {
                f.write_str(")")?;
            }
            Ok(())
        }
    }
}
