// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Expression model shared by procedures and functions.
//!
//! Expressions live in an [`ExprArena`] owned by their
//! procedure body and reference children by [`ExprId`].
//! Every constructor on the arena checks the dimensional
//! contract of the node it creates, so a node that exists
//! is always well-shaped. Passes walk the tree through
//! [`ExprArena::fold`] with an [`ExprFolder`].

use crate::error::Error;
use serde::Serialize;
use std::fmt;

/// Shape of an expression value.
///
/// Scalars are `(0, 0)`, vectors of length `n` are
/// `(n, 0)` and matrices are `(rows, cols)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Dimensions {
    pub rows: usize,
    pub cols: usize,
}

impl Dimensions {
    pub const SCALAR: Dimensions = Dimensions { rows: 0, cols: 0 };

    pub fn scalar() -> Self {
        Self::SCALAR
    }

    pub fn vector(len: usize) -> Self {
        Self { rows: len, cols: 0 }
    }

    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn is_scalar(&self) -> bool {
        self.rows == 0 && self.cols == 0
    }

    pub fn is_vector(&self) -> bool {
        self.rows > 0 && self.cols == 0
    }

    pub fn is_matrix(&self) -> bool {
        self.rows > 0 && self.cols > 0
    }

    pub fn is_same(&self, other: &Dimensions) -> bool {
        self == other
    }

    /// Number of field elements held by a value of this shape.
    pub fn element_count(&self) -> usize {
        match (self.rows, self.cols) {
            (0, _) => 1,
            (r, 0) => r,
            (r, c) => r * c,
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scalar() {
            write!(f, "scalar")
        } else if self.is_vector() {
            write!(f, "vector {}", self.rows)
        } else {
            write!(f, "matrix {} {}", self.rows, self.cols)
        }
    }
}

/// Constant value of field elements.
///
/// Elements are stored as canonical integers
/// below the module's field modulus.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    Scalar(u128),
    Vector(Vec<u128>),
    Matrix(Vec<Vec<u128>>),
}

impl LiteralValue {
    pub fn dimensions(&self) -> Dimensions {
        match self {
            LiteralValue::Scalar(_) => Dimensions::scalar(),
            LiteralValue::Vector(v) => Dimensions::vector(v.len()),
            LiteralValue::Matrix(m) => {
                Dimensions::matrix(m.len(), m.first().map(Vec::len).unwrap_or(0))
            }
        }
    }

    pub fn as_scalar(&self) -> Option<u128> {
        match self {
            LiteralValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSource {
    Const,
    Trace,
    Static,
    Local,
    Param,
}

impl LoadSource {
    pub fn keyword(&self) -> &'static str {
        match self {
            LoadSource::Const => "load.const",
            LoadSource::Trace => "load.trace",
            LoadSource::Static => "load.static",
            LoadSource::Local => "load.local",
            LoadSource::Param => "load.param",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Exp,
    Prod,
}

impl BinaryOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Exp => "exp",
            BinaryOp::Prod => "prod",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        Some(match s {
            "add" => BinaryOp::Add,
            "sub" => BinaryOp::Sub,
            "mul" => BinaryOp::Mul,
            "div" => BinaryOp::Div,
            "exp" => BinaryOp::Exp,
            "prod" => BinaryOp::Prod,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Inv,
}

impl UnaryOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Inv => "inv",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "neg" => Some(UnaryOp::Neg),
            "inv" => Some(UnaryOp::Inv),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(i: usize) -> Self {
        ExprId(i as u32)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Literal(LiteralValue),
    Load {
        source: LoadSource,
        index: usize,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    MakeVector(Vec<ExprId>),
    GetElement {
        source: ExprId,
        index: usize,
    },
    // inclusive end
    Slice {
        source: ExprId,
        start: usize,
        end: usize,
    },
    MakeMatrix(Vec<Vec<ExprId>>),
    Call {
        function: usize,
        args: Vec<ExprId>,
    },
    // contiguous run of registers of one trace row
    TraceSegment {
        row: usize,
        start: usize,
        end: usize,
    },
}

impl ExprKind {
    /// Children in evaluation order; matrix
    /// elements are listed row by row.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            ExprKind::Literal(_) | ExprKind::Load { .. } | ExprKind::TraceSegment { .. } => {
                Vec::new()
            }
            ExprKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            ExprKind::Unary { operand, .. } => vec![*operand],
            ExprKind::MakeVector(elements) => elements.clone(),
            ExprKind::GetElement { source, .. } | ExprKind::Slice { source, .. } => vec![*source],
            ExprKind::MakeMatrix(rows) => rows.iter().flatten().copied().collect(),
            ExprKind::Call { args, .. } => args.clone(),
        }
    }

    /// Same node with its children replaced, in [`ExprKind::children`] order.
    pub fn with_children(&self, new: &[ExprId]) -> ExprKind {
        debug_assert_eq!(new.len(), self.children().len());
        match self {
            ExprKind::Literal(_) | ExprKind::Load { .. } | ExprKind::TraceSegment { .. } => {
                self.clone()
            }
            ExprKind::Binary { op, .. } => ExprKind::Binary {
                op: *op,
                lhs: new[0],
                rhs: new[1],
            },
            ExprKind::Unary { op, .. } => ExprKind::Unary {
                op: *op,
                operand: new[0],
            },
            ExprKind::MakeVector(_) => ExprKind::MakeVector(new.to_vec()),
            ExprKind::GetElement { index, .. } => ExprKind::GetElement {
                source: new[0],
                index: *index,
            },
            ExprKind::Slice { start, end, .. } => ExprKind::Slice {
                source: new[0],
                start: *start,
                end: *end,
            },
            ExprKind::MakeMatrix(rows) => {
                let mut it = new.iter().copied();
                ExprKind::MakeMatrix(
                    rows.iter()
                        .map(|r| it.by_ref().take(r.len()).collect())
                        .collect(),
                )
            }
            ExprKind::Call { function, .. } => ExprKind::Call {
                function: *function,
                args: new.to_vec(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub dims: Dimensions,
}

/// Signature used to type-check calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Dimensions>,
    pub result: Dimensions,
}

/// Post-order traversal contract.
///
/// `children` holds the folded outputs of the node's
/// children in [`ExprKind::children`] order.
pub trait ExprFolder {
    type Output;
    type Error;

    fn fold_node(
        &mut self,
        id: ExprId,
        expr: &Expr,
        children: Vec<Self::Output>,
    ) -> Result<Self::Output, Self::Error>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExprArena {
    nodes: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()]
    }

    pub fn dims(&self, id: ExprId) -> Dimensions {
        self.get(id).dims
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExprId, &Expr)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, e)| (ExprId::from_index(i), e))
    }

    /// Append a node whose shape has already been checked.
    pub(crate) fn push(&mut self, kind: ExprKind, dims: Dimensions) -> ExprId {
        let id = ExprId::from_index(self.nodes.len());
        self.nodes.push(Expr { kind, dims });
        id
    }

    pub fn fold<F: ExprFolder>(&self, root: ExprId, folder: &mut F) -> Result<F::Output, F::Error> {
        let expr = self.get(root);
        let mut outs = Vec::new();
        for child in expr.kind.children() {
            outs.push(self.fold(child, folder)?);
        }

        folder.fold_node(root, expr, outs)
    }

    /// Number of nodes in the subtree rooted at `root`.
    pub fn weight(&self, root: ExprId) -> usize {
        1 + self
            .get(root)
            .kind
            .children()
            .into_iter()
            .map(|c| self.weight(c))
            .sum::<usize>()
    }

    /// Copy a subtree into `dest`, rewriting load indices
    /// through `remap`. Children land before parents.
    pub(crate) fn copy_into(
        &self,
        root: ExprId,
        dest: &mut ExprArena,
        remap: &impl Fn(LoadSource, usize) -> usize,
    ) -> ExprId {
        let expr = self.get(root);
        let children: Vec<ExprId> = expr
            .kind
            .children()
            .into_iter()
            .map(|c| self.copy_into(c, dest, remap))
            .collect();

        let kind = match &expr.kind {
            ExprKind::Load { source, index } => ExprKind::Load {
                source: *source,
                index: remap(*source, *index),
            },
            other => other.with_children(&children),
        };

        dest.push(kind, expr.dims)
    }

    // CONSTRUCTORS

    pub fn literal(&mut self, value: LiteralValue) -> Result<ExprId, Error> {
        let dims = value.dimensions();
        let empty = match &value {
            LiteralValue::Scalar(_) => false,
            LiteralValue::Vector(v) => v.is_empty(),
            LiteralValue::Matrix(m) => {
                m.is_empty() || dims.cols == 0 || m.iter().any(|r| r.len() != dims.cols)
            }
        };

        if empty {
            return Err(Error::DimensionMismatch(
                "literal must be non-empty and rectangular".into(),
            ));
        }

        Ok(self.push(ExprKind::Literal(value), dims))
    }

    /// Load node; the caller resolves `dims` and
    /// validates `index` against its source.
    pub fn load(&mut self, source: LoadSource, index: usize, dims: Dimensions) -> ExprId {
        self.push(ExprKind::Load { source, index }, dims)
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> Result<ExprId, Error> {
        let (ld, rd) = (self.dims(lhs), self.dims(rhs));
        let dims = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                if ld.is_same(&rd) || rd.is_scalar() {
                    ld
                } else if ld.is_scalar() {
                    rd
                } else {
                    return Err(Error::DimensionMismatch(format!(
                        "cannot {} {ld} and {rd}",
                        op.keyword()
                    )));
                }
            }
            BinaryOp::Exp => {
                let constant = matches!(
                    self.get(rhs).kind,
                    ExprKind::Literal(LiteralValue::Scalar(_))
                        | ExprKind::Load {
                            source: LoadSource::Const,
                            ..
                        }
                );

                if !rd.is_scalar() || !constant {
                    return Err(Error::DimensionMismatch(
                        "exponent must be a constant scalar".into(),
                    ));
                }

                ld
            }
            BinaryOp::Prod => prod_dims(ld, rd)?,
        };

        Ok(self.push(ExprKind::Binary { op, lhs, rhs }, dims))
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        let dims = self.dims(operand);
        self.push(ExprKind::Unary { op, operand }, dims)
    }

    pub fn make_vector(&mut self, elements: Vec<ExprId>) -> Result<ExprId, Error> {
        let mut len = 0;
        for &e in &elements {
            let d = self.dims(e);
            if d.is_scalar() {
                len += 1;
            } else if d.is_vector() {
                len += d.rows;
            } else {
                return Err(Error::DimensionMismatch(
                    "vector elements must be scalars or vectors".into(),
                ));
            }
        }

        if len == 0 {
            return Err(Error::DimensionMismatch("vector must not be empty".into()));
        }

        Ok(self.push(ExprKind::MakeVector(elements), Dimensions::vector(len)))
    }

    pub fn make_matrix(&mut self, rows: Vec<Vec<ExprId>>) -> Result<ExprId, Error> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || cols == 0 || rows.iter().any(|r| r.len() != cols) {
            return Err(Error::DimensionMismatch(
                "matrix rows must be non-empty and of equal length".into(),
            ));
        }

        if rows.iter().flatten().any(|&e| !self.dims(e).is_scalar()) {
            return Err(Error::DimensionMismatch(
                "matrix elements must be scalars".into(),
            ));
        }

        let dims = Dimensions::matrix(rows.len(), cols);
        Ok(self.push(ExprKind::MakeMatrix(rows), dims))
    }

    pub fn get_element(&mut self, source: ExprId, index: usize) -> Result<ExprId, Error> {
        let d = self.dims(source);
        if !d.is_vector() {
            return Err(Error::DimensionMismatch(format!(
                "cannot get element of {d}"
            )));
        }

        if index >= d.rows {
            return Err(Error::DimensionMismatch(format!(
                "element index {index} out of bounds for vector {}",
                d.rows
            )));
        }

        Ok(self.push(
            ExprKind::GetElement { source, index },
            Dimensions::scalar(),
        ))
    }

    /// Slice with an inclusive `end`. Slices of a trace row
    /// become [`ExprKind::TraceSegment`] nodes.
    pub fn slice(&mut self, source: ExprId, start: usize, end: usize) -> Result<ExprId, Error> {
        let d = self.dims(source);
        if !d.is_vector() {
            return Err(Error::DimensionMismatch(format!("cannot slice {d}")));
        }

        if start > end || end >= d.rows {
            return Err(Error::DimensionMismatch(format!(
                "slice {start}..={end} out of bounds for vector {}",
                d.rows
            )));
        }

        let dims = Dimensions::vector(end - start + 1);
        if let ExprKind::Load {
            source: LoadSource::Trace,
            index: row,
        } = self.get(source).kind
        {
            return Ok(self.push(ExprKind::TraceSegment { row, start, end }, dims));
        }

        Ok(self.push(ExprKind::Slice { source, start, end }, dims))
    }

    pub fn call(
        &mut self,
        function: usize,
        signature: &Signature,
        args: Vec<ExprId>,
    ) -> Result<ExprId, Error> {
        if args.len() != signature.params.len() {
            return Err(Error::DimensionMismatch(format!(
                "function {function} expects {} arguments (got {})",
                signature.params.len(),
                args.len()
            )));
        }

        for (i, (&a, p)) in args.iter().zip(&signature.params).enumerate() {
            let d = self.dims(a);
            if !d.is_same(p) {
                return Err(Error::DimensionMismatch(format!(
                    "argument {i} of function {function} must be {p} (got {d})"
                )));
            }
        }

        Ok(self.push(ExprKind::Call { function, args }, signature.result))
    }
}

fn prod_dims(ld: Dimensions, rd: Dimensions) -> Result<Dimensions, Error> {
    let mismatch = || Error::DimensionMismatch(format!("cannot prod {ld} and {rd}"));
    if ld.is_vector() && rd.is_vector() {
        return if ld.rows == rd.rows {
            Ok(Dimensions::scalar())
        } else {
            Err(mismatch())
        };
    }

    if ld.is_matrix() && rd.is_vector() {
        return if ld.cols == rd.rows {
            Ok(Dimensions::vector(ld.rows))
        } else {
            Err(mismatch())
        };
    }

    if ld.is_matrix() && rd.is_matrix() && ld.cols == rd.rows {
        return Ok(Dimensions::matrix(ld.rows, rd.cols));
    }

    Err(mismatch())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_row(a: &mut ExprArena, width: usize) -> ExprId {
        a.load(LoadSource::Trace, 0, Dimensions::vector(width))
    }

    #[test]
    fn scalar_broadcasts_over_vector() {
        let mut a = ExprArena::new();
        let r = trace_row(&mut a, 3);
        let s = a.literal(LiteralValue::Scalar(2)).unwrap();

        let lhs = a.binary(BinaryOp::Add, r, s).unwrap();
        let rhs = a.binary(BinaryOp::Mul, s, r).unwrap();

        assert_eq!(a.dims(lhs), Dimensions::vector(3));
        assert_eq!(a.dims(rhs), Dimensions::vector(3));
    }

    #[test]
    fn elementwise_rejects_different_vectors() {
        let mut a = ExprArena::new();
        let r = trace_row(&mut a, 3);
        let v = a.load(LoadSource::Static, 0, Dimensions::vector(2));

        let err = a.binary(BinaryOp::Sub, r, v).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }

    #[test]
    fn prod_contracts_shapes() {
        let mut a = ExprArena::new();
        let one = a.literal(LiteralValue::Scalar(1)).unwrap();
        let m = a.make_matrix(vec![vec![one, one, one], vec![one, one, one]]).unwrap();
        let v = trace_row(&mut a, 3);
        let w = trace_row(&mut a, 3);

        let mv = a.binary(BinaryOp::Prod, m, v).unwrap();
        let dot = a.binary(BinaryOp::Prod, v, w).unwrap();

        assert_eq!(a.dims(mv), Dimensions::vector(2));
        assert!(a.dims(dot).is_scalar());
        assert!(a.binary(BinaryOp::Prod, v, m).is_err());
    }

    #[test]
    fn exp_requires_constant_exponent() {
        let mut a = ExprArena::new();
        let r = trace_row(&mut a, 1);
        let e = a.get_element(r, 0).unwrap();

        assert!(a.binary(BinaryOp::Exp, r, e).is_err());

        let three = a.literal(LiteralValue::Scalar(3)).unwrap();
        assert!(a.binary(BinaryOp::Exp, r, three).is_ok());
    }

    #[test]
    fn get_and_slice_bounds() {
        let mut a = ExprArena::new();
        let k = a.load(LoadSource::Static, 0, Dimensions::vector(4));

        assert!(a.get_element(k, 3).is_ok());
        assert!(a.get_element(k, 4).is_err());
        let s = a.slice(k, 1, 3).unwrap();
        assert_eq!(a.dims(s), Dimensions::vector(3));
        assert!(a.slice(k, 2, 4).is_err());
        assert!(a.slice(k, 3, 2).is_err());
    }

    #[test]
    fn slice_of_trace_row_is_segment() {
        let mut a = ExprArena::new();
        let r = a.load(LoadSource::Trace, 1, Dimensions::vector(4));
        let s = a.slice(r, 1, 2).unwrap();

        assert_eq!(
            a.get(s).kind,
            ExprKind::TraceSegment {
                row: 1,
                start: 1,
                end: 2
            }
        );
    }

    #[test]
    fn vector_concatenates_elements() {
        let mut a = ExprArena::new();
        let r = trace_row(&mut a, 2);
        let s = a.literal(LiteralValue::Scalar(5)).unwrap();
        let v = a.make_vector(vec![r, s, r]).unwrap();

        assert_eq!(a.dims(v), Dimensions::vector(5));
    }

    #[test]
    fn with_children_rebuilds_matrix_rows() {
        let kind = ExprKind::MakeMatrix(vec![
            vec![ExprId(0), ExprId(1)],
            vec![ExprId(2), ExprId(3)],
        ]);
        let new = [ExprId(7), ExprId(6), ExprId(5), ExprId(4)];

        assert_eq!(
            kind.with_children(&new),
            ExprKind::MakeMatrix(vec![
                vec![ExprId(7), ExprId(6)],
                vec![ExprId(5), ExprId(4)]
            ])
        );
    }
}
