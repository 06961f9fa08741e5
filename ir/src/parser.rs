//! Parser for the textual structured-op form.
//!
//! Accepts exactly what [`crate::print`] emits: the trait dictionary, the
//! `ins`/`outs`/`init` operand groups, the body region and the optional
//! result-type list. Operand names bind to fresh source values; a name that
//! appears twice resolves to the same value.

use std::collections::HashMap;
use std::str::FromStr;

use weft_affine::{AffineMap, Context};

use crate::error::{Error, Result};
use crate::op::{Block, BodyValue, IteratorKind, OpKind, ScalarKind, ScalarOp, SparseDim, StructuredOp};
use crate::types::{DimSize, ElementType, Layout, MemRefType, Shape, ShapedType, TensorType};
use crate::value::Value;

/// Parse one structured op from `input`.
pub fn parse_structured_op(ctx: &Context, input: &str) -> Result<StructuredOp> {
    let mut parser = Parser::new(ctx, input);
    let op = parser.parse_op()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("trailing input after op"));
    }
    Ok(op)
}

/// Parse a single shaped type, e.g. `tensor<4x?xf32>`.
pub fn parse_shaped_type(input: &str) -> Result<ShapedType> {
    let ctx = Context::new();
    let mut parser = Parser::new(&ctx, input);
    let ty = parser.parse_type()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("trailing input after type"));
    }
    Ok(ty)
}

struct Parser<'a> {
    ctx: &'a Context,
    input: &'a str,
    pos: usize,
    values: HashMap<String, Value>,
}

impl<'a> Parser<'a> {
    fn new(ctx: &'a Context, input: &'a str) -> Self {
        Self { ctx, input, pos: 0, values: HashMap::new() }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse { message: message.into(), offset: self.pos }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{token}`")))
        }
    }

    fn ident(&mut self) -> Result<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_alphanumeric() || *c == '_' || (*c == '.' && *i > 0)))
            .map_or(rest.len(), |(i, _)| i);
        if end == 0 || rest.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(self.error("expected identifier"));
        }
        self.pos += end;
        Ok(&rest[..end])
    }

    fn integer(&mut self) -> Result<i64> {
        self.skip_ws();
        let rest = self.rest();
        let negative = rest.starts_with('-');
        let digits = &rest[negative as usize..];
        let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
        if end == 0 {
            return Err(self.error("expected integer"));
        }
        let text = &rest[..negative as usize + end];
        let value = text.parse().map_err(|_| self.error("integer out of range"))?;
        self.pos += text.len();
        Ok(value)
    }

    fn string(&mut self) -> Result<String> {
        self.expect("\"")?;
        let rest = self.rest();
        let end = rest.find('"').ok_or_else(|| self.error("unterminated string"))?;
        let value = rest[..end].to_string();
        self.pos += end + 1;
        Ok(value)
    }

    fn percent_name(&mut self) -> Result<String> {
        self.expect("%")?;
        Ok(format!("%{}", self.ident()?))
    }

    // -------- types --------

    fn dim_size(&mut self) -> Result<DimSize> {
        if self.eat("?") {
            Ok(DimSize::Dynamic)
        } else {
            Ok(DimSize::Static(self.integer()?))
        }
    }

    fn element_type(&mut self) -> Result<ElementType> {
        let name = self.ident()?;
        match name {
            "f16" => Ok(ElementType::F16),
            "f32" => Ok(ElementType::F32),
            "f64" => Ok(ElementType::F64),
            "i1" => Ok(ElementType::I1),
            "i8" => Ok(ElementType::I8),
            "i16" => Ok(ElementType::I16),
            "i32" => Ok(ElementType::I32),
            "i64" => Ok(ElementType::I64),
            "index" => Ok(ElementType::Index),
            other => Err(self.error(format!("unknown element type `{other}`"))),
        }
    }

    /// Dimension list and element type, `4x?x..xf32`.
    fn shape_and_element(&mut self) -> Result<(Shape, ElementType)> {
        let mut shape = Shape::new();
        loop {
            self.skip_ws();
            match self.rest().chars().next() {
                Some(c) if c.is_ascii_digit() || c == '?' => {
                    shape.push(self.dim_size()?);
                    self.expect("x")?;
                }
                _ => break,
            }
        }
        Ok((shape, self.element_type()?))
    }

    fn parse_type(&mut self) -> Result<ShapedType> {
        if self.eat("tensor") {
            self.expect("<")?;
            let (shape, element) = self.shape_and_element()?;
            self.expect(">")?;
            return Ok(ShapedType::Tensor(TensorType::new(shape, element)));
        }
        self.expect("memref")?;
        self.expect("<")?;
        let (shape, element) = self.shape_and_element()?;
        let ty = if self.eat(",") {
            self.expect("strided")?;
            self.expect("<")?;
            self.expect("[")?;
            let mut strides = smallvec::SmallVec::new();
            if self.peek() != Some(']') {
                loop {
                    strides.push(self.dim_size()?);
                    if !self.eat(",") {
                        break;
                    }
                }
            }
            self.expect("]")?;
            self.expect(",")?;
            self.expect("offset")?;
            self.expect(":")?;
            let offset = self.dim_size()?;
            self.expect(">")?;
            if strides.len() != shape.len() {
                return Err(self.error("stride count does not match memref rank"));
            }
            MemRefType { shape, element, layout: Layout { offset, strides } }
        } else {
            MemRefType::contiguous(shape, element)
        };
        self.expect(">")?;
        Ok(ShapedType::MemRef(ty))
    }

    // -------- trait attributes --------

    fn affine_map(&mut self) -> Result<AffineMap> {
        self.expect("affine_map")?;
        self.expect("<")?;
        // The payload's only `>` characters belong to `->`.
        let rest = self.rest();
        let mut end = None;
        let mut prev = '\0';
        for (i, c) in rest.char_indices() {
            if c == '>' && prev != '-' {
                end = Some(i);
                break;
            }
            prev = c;
        }
        let end = end.ok_or_else(|| self.error("unterminated affine_map"))?;
        let map = AffineMap::parse(self.ctx, &rest[..end])
            .map_err(|e| self.error(format!("invalid affine map: {e}")))?;
        self.pos += end + 1;
        Ok(map)
    }

    fn string_list(&mut self) -> Result<Vec<String>> {
        self.expect("[")?;
        let mut out = Vec::new();
        if self.peek() != Some(']') {
            loop {
                out.push(self.string()?);
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect("]")?;
        Ok(out)
    }

    #[allow(clippy::type_complexity)]
    fn trait_attrs(
        &mut self,
    ) -> Result<(Vec<AffineMap>, Vec<IteratorKind>, Option<usize>, Option<Vec<Vec<SparseDim>>>, Option<String>, Option<String>)>
    {
        let mut indexing_maps = Vec::new();
        let mut iterator_types = Vec::new();
        let mut symbol_source = None;
        let mut sparse = None;
        let mut doc = None;
        let mut library_call = None;

        self.expect("{")?;
        loop {
            let key = self.ident()?;
            self.expect("=")?;
            match key {
                "indexing_maps" => {
                    self.expect("[")?;
                    if self.peek() != Some(']') {
                        loop {
                            indexing_maps.push(self.affine_map()?);
                            if !self.eat(",") {
                                break;
                            }
                        }
                    }
                    self.expect("]")?;
                }
                "iterator_types" => {
                    for name in self.string_list()? {
                        let kind = IteratorKind::from_str(&name)
                            .map_err(|_| self.error(format!("unknown iterator type `{name}`")))?;
                        iterator_types.push(kind);
                    }
                }
                "symbol_source" => {
                    let value = self.integer()?;
                    if value < 0 {
                        return Err(self.error("symbol_source must be non-negative"));
                    }
                    symbol_source = Some(value as usize);
                }
                "sparse" => {
                    self.expect("[")?;
                    let mut tensors = Vec::new();
                    if self.peek() != Some(']') {
                        loop {
                            let mut dims = Vec::new();
                            for letter in self.string_list()? {
                                dims.push(match letter.as_str() {
                                    "D" => SparseDim::Dense,
                                    "S" => SparseDim::Sparse,
                                    other => {
                                        return Err(
                                            self.error(format!("unknown sparse annotation `{other}`"))
                                        )
                                    }
                                });
                            }
                            tensors.push(dims);
                            if !self.eat(",") {
                                break;
                            }
                        }
                    }
                    self.expect("]")?;
                    sparse = Some(tensors);
                }
                "doc" => doc = Some(self.string()?),
                "library_call" => library_call = Some(self.string()?),
                other => return Err(self.error(format!("unknown trait attribute `{other}`"))),
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok((indexing_maps, iterator_types, symbol_source, sparse, doc, library_call))
    }

    // -------- operand groups --------

    fn operand_group(&mut self, keyword: &str) -> Result<Vec<Value>> {
        if !self.eat(keyword) {
            return Ok(Vec::new());
        }
        self.expect("(")?;
        let mut names = Vec::new();
        loop {
            names.push(self.percent_name()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(":")?;
        let mut types = Vec::new();
        loop {
            types.push(self.parse_type()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        if names.len() != types.len() {
            return Err(self.error("operand and type counts differ"));
        }
        let mut out = Vec::with_capacity(names.len());
        for (name, ty) in names.into_iter().zip(types) {
            let value = self.values.entry(name).or_insert_with(|| Value::source(ty)).clone();
            out.push(value);
        }
        Ok(out)
    }

    // -------- region --------

    fn body_value(&mut self, names: &HashMap<String, BodyValue>) -> Result<BodyValue> {
        let name = self.percent_name()?;
        names.get(&name).copied().ok_or_else(|| self.error(format!("unknown body value `{name}`")))
    }

    fn region(&mut self) -> Result<Block> {
        self.expect("{")?;
        self.expect("^bb0")?;
        self.expect("(")?;
        let mut names: HashMap<String, BodyValue> = HashMap::new();
        let mut args = Vec::new();
        if self.peek() != Some(')') {
            loop {
                let name = self.percent_name()?;
                self.expect(":")?;
                let ty = self.element_type()?;
                names.insert(name, BodyValue::Arg(args.len()));
                args.push(ty);
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        self.expect(":")?;

        let mut ops = Vec::new();
        loop {
            if self.eat("weft.yield") {
                break;
            }
            let name = self.percent_name()?;
            self.expect("=")?;
            let kind = {
                let word = self.ident()?;
                ScalarKind::from_str(word).map_err(|_| self.error(format!("unknown scalar op `{word}`")))?
            };
            let lhs = self.body_value(&names)?;
            self.expect(",")?;
            let rhs = self.body_value(&names)?;
            self.expect(":")?;
            let ty = self.element_type()?;
            names.insert(name, BodyValue::Result(ops.len()));
            ops.push(ScalarOp { kind, lhs, rhs, ty });
        }

        let mut yields = Vec::new();
        if self.peek() == Some('%') {
            loop {
                yields.push(self.body_value(&names)?);
                if !self.eat(",") {
                    break;
                }
            }
            self.expect(":")?;
            for i in 0..yields.len() {
                self.element_type()?;
                if i + 1 < yields.len() {
                    self.expect(",")?;
                }
            }
        }
        self.expect("}")?;
        Ok(Block::new(args, ops, yields))
    }

    fn result_types(&mut self) -> Result<Vec<TensorType>> {
        if !self.eat("->") {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        let tensor_only = |parser: &Self, ty: ShapedType| {
            ty.as_tensor().cloned().ok_or_else(|| parser.error("result types must be tensors"))
        };
        if self.eat("(") {
            loop {
                let ty = self.parse_type()?;
                out.push(tensor_only(self, ty)?);
                if !self.eat(",") {
                    break;
                }
            }
            self.expect(")")?;
        } else {
            let ty = self.parse_type()?;
            out.push(tensor_only(self, ty)?);
        }
        Ok(out)
    }

    fn parse_op(&mut self) -> Result<StructuredOp> {
        let name = self.ident()?;
        let kind =
            OpKind::from_name(name).ok_or_else(|| self.error(format!("unknown operation `{name}`")))?;
        let (indexing_maps, iterator_types, symbol_source, sparse, doc, library_call) = self.trait_attrs()?;

        let inputs = self.operand_group("ins")?;
        let output_buffers = self.operand_group("outs")?;
        let init_tensors = self.operand_group("init")?;
        let block = self.region()?;
        let result_types = self.result_types()?;

        Ok(StructuredOp {
            kind,
            inputs,
            output_buffers,
            init_tensors,
            result_types,
            indexing_maps,
            iterator_types,
            region: vec![block],
            symbol_source,
            sparse,
            doc,
            library_call,
        })
    }
}
