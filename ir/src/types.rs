//! Shaped types: element types, extents, strided layouts.
//!
//! Extents are either statically known or dynamic; there is no symbolic
//! middle ground in this subsystem. Buffer-like operands ([`MemRefType`])
//! carry a strided layout next to their shape, tensor-like operands
//! ([`TensorType`]) carry only extents.

use std::fmt;

use smallvec::SmallVec;

/// Scalar element type of a shaped operand or block argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    F16,
    F32,
    F64,
    I1,
    I8,
    I16,
    I32,
    I64,
    /// Loop-index type; only valid on the leading block arguments of the
    /// indexed op variant, never as an operand element type.
    Index,
}

impl ElementType {
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::F16 => "f16",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::I1 => "i1",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Index => "index",
        };
        f.write_str(s)
    }
}

/// A single extent, stride, or offset: statically known or dynamic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimSize {
    Static(i64),
    Dynamic,
}

impl DimSize {
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic)
    }

    pub fn as_static(&self) -> Option<i64> {
        match self {
            Self::Static(v) => Some(*v),
            Self::Dynamic => None,
        }
    }
}

impl From<i64> for DimSize {
    fn from(v: i64) -> Self {
        Self::Static(v)
    }
}

impl fmt::Display for DimSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(v) => write!(f, "{v}"),
            Self::Dynamic => f.write_str("?"),
        }
    }
}

/// Shape type - ordered extents, inline storage for common ranks.
pub type Shape = SmallVec<[DimSize; 4]>;

/// Build a fully static shape from integers.
pub fn static_shape(dims: &[i64]) -> Shape {
    dims.iter().map(|&d| DimSize::Static(d)).collect()
}

/// True when every extent is statically known.
pub fn is_static_shape(shape: &[DimSize]) -> bool {
    shape.iter().all(DimSize::is_static)
}

/// Strided layout of a buffer-like operand: linear offset plus one stride per
/// dimension. Rank always matches the owning type's shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Layout {
    pub offset: DimSize,
    pub strides: SmallVec<[DimSize; 4]>,
}

impl Layout {
    /// The canonical contiguous (row-major) layout for `shape`: offset 0,
    /// innermost stride 1, each outer stride the product of the inner extents.
    /// A dynamic extent makes every stride outside it dynamic.
    pub fn contiguous(shape: &[DimSize]) -> Self {
        let mut strides: SmallVec<[DimSize; 4]> = SmallVec::with_capacity(shape.len());
        let mut running = DimSize::Static(1);
        for dim in shape.iter().rev() {
            strides.push(running);
            running = match (running, dim) {
                (DimSize::Static(s), DimSize::Static(d)) => DimSize::Static(s * d),
                _ => DimSize::Dynamic,
            };
        }
        strides.reverse();
        Self { offset: DimSize::Static(0), strides }
    }

    pub fn rank(&self) -> usize {
        self.strides.len()
    }
}

/// Tensor-like operand type: extents only, no layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorType {
    pub shape: Shape,
    pub element: ElementType,
}

impl TensorType {
    pub fn new(shape: Shape, element: ElementType) -> Self {
        Self { shape, element }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn has_static_shape(&self) -> bool {
        is_static_shape(&self.shape)
    }
}

/// Buffer-like operand type: extents plus strided layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemRefType {
    pub shape: Shape,
    pub element: ElementType,
    pub layout: Layout,
}

impl MemRefType {
    /// Memref with the canonical contiguous layout.
    pub fn contiguous(shape: Shape, element: ElementType) -> Self {
        let layout = Layout::contiguous(&shape);
        Self { shape, element, layout }
    }

    /// Memref with an explicit strided layout.
    ///
    /// # Panics
    /// Panics if the stride list's length differs from the shape's rank.
    pub fn strided(shape: Shape, element: ElementType, offset: DimSize, strides: SmallVec<[DimSize; 4]>) -> Self {
        assert_eq!(shape.len(), strides.len(), "rank mismatch between shape and strides");
        Self { shape, element, layout: Layout { offset, strides } }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn has_static_shape(&self) -> bool {
        is_static_shape(&self.shape)
    }

    /// True when the layout is exactly the canonical contiguous layout.
    pub fn is_contiguous(&self) -> bool {
        self.layout == Layout::contiguous(&self.shape)
    }
}

/// Tagged union over the two shaped operand kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapedType {
    Tensor(TensorType),
    MemRef(MemRefType),
}

impl ShapedType {
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    pub fn shape(&self) -> &[DimSize] {
        match self {
            Self::Tensor(t) => &t.shape,
            Self::MemRef(m) => &m.shape,
        }
    }

    pub fn element(&self) -> ElementType {
        match self {
            Self::Tensor(t) => t.element,
            Self::MemRef(m) => m.element,
        }
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, Self::Tensor(_))
    }

    pub fn is_memref(&self) -> bool {
        matches!(self, Self::MemRef(_))
    }

    pub fn as_tensor(&self) -> Option<&TensorType> {
        match self {
            Self::Tensor(t) => Some(t),
            Self::MemRef(_) => None,
        }
    }

    pub fn as_memref(&self) -> Option<&MemRefType> {
        match self {
            Self::Tensor(_) => None,
            Self::MemRef(m) => Some(m),
        }
    }

    pub fn has_static_shape(&self) -> bool {
        is_static_shape(self.shape())
    }
}

impl From<TensorType> for ShapedType {
    fn from(t: TensorType) -> Self {
        Self::Tensor(t)
    }
}

impl From<MemRefType> for ShapedType {
    fn from(m: MemRefType) -> Self {
        Self::MemRef(m)
    }
}

/// Whether a cast from `from` to `to` may be folded into a consumer of the
/// cast's result, i.e. the consumer can be rebuilt directly on the cast's
/// source.
///
/// Folding is safe exactly when the source type refines the result type:
/// same kind, same element type, same rank, and every extent (and, for
/// memrefs, every stride and the offset) either matches or is dynamic on the
/// result side. Folding then only ever adds static information.
pub fn can_fold_cast(from: &ShapedType, to: &ShapedType) -> bool {
    let refines = |a: &DimSize, b: &DimSize| b.is_dynamic() || a == b;
    match (from, to) {
        (ShapedType::Tensor(from), ShapedType::Tensor(to)) => {
            from.element == to.element
                && from.rank() == to.rank()
                && from.shape.iter().zip(&to.shape).all(|(a, b)| refines(a, b))
        }
        (ShapedType::MemRef(from), ShapedType::MemRef(to)) => {
            from.element == to.element
                && from.rank() == to.rank()
                && from.shape.iter().zip(&to.shape).all(|(a, b)| refines(a, b))
                && refines(&from.layout.offset, &to.layout.offset)
                && from.layout.strides.iter().zip(&to.layout.strides).all(|(a, b)| refines(a, b))
        }
        _ => false,
    }
}

/// Uniform-valued constant payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}
