//! Reassociation validation and reshape type inference.
//!
//! A reshape merges (collapse) or splits (expand) contiguous bands of
//! dimensions. The grouping is a reassociation: one affine map per dimension
//! of the collapsed type, whose results are consecutive bare dimensions of
//! the expanded type. Type inference works on the expanded side and collapses
//! band by band; for buffers it additionally decides whether each band can be
//! merged without data movement.

use weft_affine::{AffineMap, Context};

use crate::error::{self, Result};
use crate::types::{DimSize, MemRefType, ShapedType, TensorType};
use crate::value::Value;

/// A reshape of a shaped value by a reassociation grouping.
///
/// `reassociation` always describes the expanded (larger-rank) side,
/// whichever of source and result that is.
#[derive(Debug, Clone)]
pub struct ReshapeOp {
    pub src: Value,
    pub reassociation: Vec<AffineMap>,
    pub result_type: ShapedType,
}

impl ReshapeOp {
    pub fn new(src: Value, reassociation: Vec<AffineMap>, result_type: ShapedType) -> Self {
        Self { src, reassociation, result_type }
    }

    pub fn src_type(&self) -> &ShapedType {
        self.src.ty()
    }

    /// True when the result has fewer dimensions than the source.
    pub fn is_collapsing(&self) -> bool {
        self.result_type.rank() < self.src_type().rank()
    }

    /// The underlying buffer a view chain bottoms out in.
    pub fn view_source(&self) -> &Value {
        &self.src
    }
}

/// Check that `reassociation` is a valid grouping: every map ranges over the
/// same dimension count with no symbols, groups at least one dimension, and
/// the results across all maps are exactly `d0, d1, .., dN-1` in order. On
/// failure returns the index of the offending map.
pub fn validate_reassociation(reassociation: &[AffineMap]) -> std::result::Result<(), usize> {
    if reassociation.is_empty() {
        return Ok(());
    }
    let num_dims = reassociation[0].num_dims();
    let mut next_expected = 0u32;
    for (index, map) in reassociation.iter().enumerate() {
        if map.num_dims() != num_dims || map.num_symbols() != 0 || map.num_results() == 0 {
            return Err(index);
        }
        for result in map.results() {
            if result.as_dim() != Some(next_expected) {
                return Err(index);
            }
            next_expected += 1;
        }
    }
    if next_expected as usize != num_dims {
        return Err(reassociation.len() - 1);
    }
    Ok(())
}

/// Build the reassociation grouping from index lists: `indices[i]` holds the
/// expanded dimensions collapsing into dimension `i`. The lists are expected
/// to partition `0..num_dims` in order; [`validate_reassociation`] catches
/// anything else.
pub fn reassociation_indices_to_maps(ctx: &Context, num_dims: usize, indices: &[Vec<usize>]) -> Vec<AffineMap> {
    indices
        .iter()
        .map(|group| AffineMap::new(num_dims, 0, group.iter().map(|&d| ctx.dim(d as u32))))
        .collect()
}

/// Whether dimensions `[dim, dim + extent)` of a strided buffer can be merged
/// into one dimension without moving data: every adjacent pair in the band
/// must have statically known extents and satisfy
/// `stride[i] == stride[i + 1] * size[i + 1]`.
pub fn is_reshapable_dim_band(dim: usize, extent: usize, sizes: &[DimSize], strides: &[DimSize]) -> bool {
    debug_assert_eq!(sizes.len(), strides.len(), "mismatched ranks");
    for idx in dim..dim + extent - 1 {
        let (Some(size), Some(outer), Some(inner)) =
            (sizes[idx + 1].as_static(), strides[idx].as_static(), strides[idx + 1].as_static())
        else {
            // No relation is known between dynamic sizes and dynamic strides.
            return false;
        };
        if sizes[idx].is_dynamic() || outer != inner * size {
            return false;
        }
    }
    true
}

/// Apply a valid `reassociation` to a buffer type, producing the collapsed
/// buffer type. A contiguous input always produces a contiguous output; for
/// other layouts each band collapses to a static extent and the band's
/// innermost stride when reshapable, and to a dynamic extent with an
/// unresolved stride otherwise.
pub fn compute_collapsed_memref_type(ty: &MemRefType, reassociation: &[AffineMap]) -> MemRefType {
    debug_assert!(validate_reassociation(reassociation).is_ok(), "invalid reassociation");
    let sizes = &ty.shape;
    let strides = &ty.layout.strides;

    let mut new_sizes = crate::types::Shape::with_capacity(reassociation.len());
    let mut new_strides: smallvec::SmallVec<[DimSize; 4]> = smallvec::SmallVec::with_capacity(reassociation.len());
    let mut current_dim = 0;
    for map in reassociation {
        let width = map.num_results();
        let band = &sizes[current_dim..current_dim + width];
        if is_reshapable_dim_band(current_dim, width, sizes, strides) && band.iter().all(DimSize::is_static) {
            let size = band.iter().map(|d| d.as_static().expect("static band")).product();
            new_sizes.push(DimSize::Static(size));
            new_strides.push(strides[current_dim + width - 1]);
        } else {
            new_sizes.push(DimSize::Dynamic);
            new_strides.push(DimSize::Dynamic);
        }
        current_dim += width;
    }

    // A contiguous source stays contiguous no matter what the per-band
    // reasoning concluded.
    if ty.is_contiguous() {
        return MemRefType::contiguous(new_sizes, ty.element);
    }
    MemRefType::strided(new_sizes, ty.element, ty.layout.offset, new_strides)
}

/// Apply a valid `reassociation` to a tensor type. Each band collapses to the
/// product of its extents; any dynamic extent in a band makes the collapsed
/// extent dynamic.
pub fn compute_collapsed_tensor_type(ty: &TensorType, reassociation: &[AffineMap]) -> TensorType {
    debug_assert!(validate_reassociation(reassociation).is_ok(), "invalid reassociation");
    let mut new_shape = crate::types::Shape::with_capacity(reassociation.len());
    let mut current_dim = 0;
    for map in reassociation {
        let width = map.num_results();
        let band = &ty.shape[current_dim..current_dim + width];
        if band.iter().all(DimSize::is_static) {
            let size = band.iter().map(|d| d.as_static().expect("static band")).product();
            new_shape.push(DimSize::Static(size));
        } else {
            new_shape.push(DimSize::Dynamic);
        }
        current_dim += width;
    }
    TensorType::new(new_shape, ty.element)
}

/// Collapsed counterpart of an arbitrary shaped type.
pub fn compute_collapsed_type(ty: &ShapedType, reassociation: &[AffineMap]) -> ShapedType {
    match ty {
        ShapedType::Tensor(t) => ShapedType::Tensor(compute_collapsed_tensor_type(t, reassociation)),
        ShapedType::MemRef(m) => ShapedType::MemRef(compute_collapsed_memref_type(m, reassociation)),
    }
}

/// Verify a reshape: source and result of the same kind, rank actually
/// changing, reassociation well-formed against the expanded side, and the
/// collapsed side equal to the type the reassociation computes.
pub fn verify(op: &ReshapeOp) -> Result<()> {
    let src_ty = op.src_type();
    let result_ty = &op.result_type;
    if src_ty.is_tensor() != result_ty.is_tensor() {
        return error::ReshapeKindMismatchSnafu.fail();
    }

    // Orient so `expanded` is the larger-rank side.
    let (expanded, collapsed) =
        if src_ty.rank() > result_ty.rank() { (src_ty, result_ty) } else { (result_ty, src_ty) };
    let expanded_rank = expanded.rank();
    let collapsed_rank = collapsed.rank();
    snafu::ensure!(expanded_rank != 0, error::ReshapeZeroRankSnafu);
    snafu::ensure!(expanded_rank != collapsed_rank, error::ReshapeSameRankSnafu);

    if collapsed_rank == 0 {
        // Collapsing to rank 0 requires every expanded extent to be a static 1.
        let all_unit = expanded.shape().iter().all(|d| d.as_static() == Some(1));
        snafu::ensure!(all_unit, error::ReshapeToRankZeroNonUnitSnafu);
        return Ok(());
    }

    snafu::ensure!(
        collapsed_rank == op.reassociation.len(),
        error::ReshapeCollapsedRankSnafu { rank: collapsed_rank, maps: op.reassociation.len() }
    );
    for (index, map) in op.reassociation.iter().enumerate() {
        snafu::ensure!(
            map.num_dims() == expanded_rank,
            error::ReassociationMapRankSnafu { index, rank: expanded_rank, got: map.num_dims() }
        );
    }
    if let Err(index) = validate_reassociation(&op.reassociation) {
        return error::ReassociationInvalidSnafu { index }.fail();
    }

    let expected = compute_collapsed_type(expanded, &op.reassociation);
    if collapsed != &expected {
        return error::ReshapeCollapsedTypeSnafu {
            expected: crate::print::display_shaped_type(&expected),
            actual: crate::print::display_shaped_type(collapsed),
        }
        .fail();
    }
    Ok(())
}

/// Compose two reassociations applied back to back, producing the grouping
/// that reaches from the producer's expanded side straight to the consumer's
/// collapsed side.
///
/// `None` means the pair does not compose (mismatched ranks). Collapsing all
/// the way to rank 0 yields an empty grouping.
pub fn collapse_reassociation_maps(
    ctx: &Context,
    producer: &[AffineMap],
    consumer: &[AffineMap],
) -> Option<Vec<AffineMap>> {
    if consumer.is_empty() && !producer.is_empty() {
        return Some(Vec::new());
    }
    if producer.is_empty()
        || consumer.is_empty()
        || producer[0].num_dims() < consumer[0].num_dims()
        || producer.len() != consumer[0].num_dims()
    {
        return None;
    }
    let num_lhs_dims = producer[0].num_dims();
    let mut current_dim = 0u32;
    let mut collapsed = Vec::with_capacity(consumer.len());
    for rhs in consumer {
        let mut results = Vec::new();
        for result in rhs.results() {
            let pos = result.as_dim().expect("reassociation results are bare dims") as usize;
            for _ in 0..producer[pos].num_results() {
                results.push(ctx.dim(current_dim));
                current_dim += 1;
            }
        }
        collapsed.push(AffineMap::new(num_lhs_dims, 0, results));
    }
    Some(collapsed)
}

/// Collapse a reshape whose source is itself a reshape, when both steps move
/// rank in the same direction (strictly expanding or strictly collapsing).
pub fn collapse_reshape_pair(ctx: &Context, consumer: &ReshapeOp) -> Option<ReshapeOp> {
    let producer = consumer.src.defining_reshape()?;

    let foldable = |larger: usize, intermediate: usize, smaller: usize| larger > intermediate && intermediate > smaller;

    // Both expanding: the consumer's grouping describes the larger type.
    if foldable(consumer.result_type.rank(), consumer.src_type().rank(), producer.src_type().rank()) {
        let maps = collapse_reassociation_maps(ctx, &consumer.reassociation, &producer.reassociation)?;
        return Some(ReshapeOp::new(producer.src.clone(), maps, consumer.result_type.clone()));
    }
    // Both collapsing: the producer's grouping describes the larger type.
    if foldable(producer.src_type().rank(), consumer.src_type().rank(), consumer.result_type.rank()) {
        let maps = collapse_reassociation_maps(ctx, &producer.reassociation, &consumer.reassociation)?;
        return Some(ReshapeOp::new(producer.src.clone(), maps, consumer.result_type.clone()));
    }
    None
}

/// Fold a reshape to an existing value when possible.
///
/// Two cases fold: a reshape chain that provably round-trips (inner source
/// type equals the outer result type, both fully static), and a reshape of a
/// splat constant, which is a pure metadata change.
pub fn fold_reshape(op: &ReshapeOp) -> Option<Value> {
    if let Some(producer) = op.src.defining_reshape() {
        if producer.src_type().has_static_shape()
            && op.result_type.has_static_shape()
            && producer.src_type() == &op.result_type
        {
            return Some(producer.src.clone());
        }
    }
    if let Some(splat) = op.src.as_splat() {
        return Some(Value::splat(splat.clone(), op.result_type.clone()));
    }
    None
}
