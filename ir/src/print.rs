//! Textual form of types and structured ops.
//!
//! The format round-trips through [`crate::parser`]: a trait dictionary,
//! the `ins`/`outs`/`init` operand groups with their types, the body region,
//! and an optional arrow result-type list.
//!
//! ```text
//! weft.generic {indexing_maps = [affine_map<(d0) -> (d0)>, affine_map<(d0) -> (d0)>],
//!               iterator_types = ["parallel"]}
//!     ins(%v0 : tensor<?xf32>) outs(%v1 : memref<?xf32>) {
//! ^bb0(%arg0: f32, %arg1: f32):
//!   weft.yield %arg0 : f32
//! }
//! ```

use std::fmt;

use crate::op::{BodyValue, OpKind, StructuredOp};
use crate::types::{MemRefType, ShapedType, TensorType};
use crate::value::Value;

pub fn display_tensor_type(ty: &TensorType) -> String {
    let mut out = String::from("tensor<");
    for dim in &ty.shape {
        out.push_str(&format!("{dim}x"));
    }
    out.push_str(&format!("{}>", ty.element));
    out
}

pub fn display_memref_type(ty: &MemRefType) -> String {
    let mut out = String::from("memref<");
    for dim in &ty.shape {
        out.push_str(&format!("{dim}x"));
    }
    out.push_str(&ty.element.to_string());
    if !ty.is_contiguous() {
        out.push_str(", strided<[");
        for (i, stride) in ty.layout.strides.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&stride.to_string());
        }
        out.push_str(&format!("], offset: {}>", ty.layout.offset));
    }
    out.push('>');
    out
}

pub fn display_shaped_type(ty: &ShapedType) -> String {
    match ty {
        ShapedType::Tensor(t) => display_tensor_type(t),
        ShapedType::MemRef(m) => display_memref_type(m),
    }
}

fn write_operand_group(f: &mut fmt::Formatter<'_>, keyword: &str, values: &[Value]) -> fmt::Result {
    if values.is_empty() {
        return Ok(());
    }
    write!(f, " {keyword}(")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "%v{}", v.id())?;
    }
    f.write_str(" : ")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&display_shaped_type(v.ty()))?;
    }
    f.write_str(")")
}

fn write_body_value(f: &mut fmt::Formatter<'_>, value: BodyValue) -> fmt::Result {
    match value {
        BodyValue::Arg(i) => write!(f, "%arg{i}"),
        BodyValue::Result(i) => write!(f, "%t{i}"),
    }
}

impl fmt::Display for StructuredOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{indexing_maps = [", self.kind.name())?;
        for (i, map) in self.indexing_maps.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "affine_map<{map}>")?;
        }
        f.write_str("], iterator_types = [")?;
        for (i, it) in self.iterator_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "\"{}\"", it.as_ref())?;
        }
        f.write_str("]")?;
        if let Some(source) = self.symbol_source {
            write!(f, ", symbol_source = {source}")?;
        }
        if let Some(sparse) = &self.sparse {
            f.write_str(", sparse = [")?;
            for (i, dims) in sparse.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str("[")?;
                for (j, d) in dims.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "\"{}\"", d.letter())?;
                }
                f.write_str("]")?;
            }
            f.write_str("]")?;
        }
        if let Some(doc) = &self.doc {
            write!(f, ", doc = \"{doc}\"")?;
        }
        if let Some(library_call) = &self.library_call {
            write!(f, ", library_call = \"{library_call}\"")?;
        }
        f.write_str("}")?;

        write_operand_group(f, "ins", &self.inputs)?;
        write_operand_group(f, "outs", &self.output_buffers)?;
        write_operand_group(f, "init", &self.init_tensors)?;

        f.write_str(" {\n^bb0(")?;
        let block = &self.region[0];
        for (i, ty) in block.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "%arg{i}: {ty}")?;
        }
        f.write_str("):\n")?;
        for (i, op) in block.ops.iter().enumerate() {
            write!(f, "  %t{i} = {} ", op.kind.as_ref())?;
            write_body_value(f, op.lhs)?;
            f.write_str(", ")?;
            write_body_value(f, op.rhs)?;
            writeln!(f, " : {}", op.ty)?;
        }
        f.write_str("  weft.yield")?;
        for (i, &y) in block.yields.iter().enumerate() {
            f.write_str(if i > 0 { ", " } else { " " })?;
            write_body_value(f, y)?;
        }
        if !block.yields.is_empty() {
            f.write_str(" : ")?;
            for (i, &y) in block.yields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                let ty = block.value_type(y).expect("yield of undefined value");
                write!(f, "{ty}")?;
            }
        }
        f.write_str("\n}")?;

        if !self.result_types.is_empty() {
            f.write_str(" -> ")?;
            if self.result_types.len() == 1 {
                f.write_str(&display_tensor_type(&self.result_types[0]))?;
            } else {
                f.write_str("(")?;
                for (i, ty) in self.result_types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&display_tensor_type(ty))?;
                }
                f.write_str(")")?;
            }
        }
        Ok(())
    }
}

impl OpKind {
    /// Parseable op name including the dialect prefix.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "weft.generic" => Some(Self::Generic),
            "weft.indexed_generic" => Some(Self::IndexedGeneric),
            _ => None,
        }
    }
}
