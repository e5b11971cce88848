// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Algebraic degree inference.
//!
//! Degrees are measured in the trace and static register
//! variables: every `load.trace` and `load.static` element
//! is degree 1, constants are degree 0. Division and
//! inversion by a non-constant operand are charged a
//! configured flat cost since rational functions are not
//! tracked.

use crate::error::Error;
use crate::expr::{
    BinaryOp, Dimensions, Expr, ExprArena, ExprFolder, ExprId, ExprKind, LiteralValue,
    LoadSource, UnaryOp,
};
use crate::procedure::{Body, FunctionDef};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Degree {
    Scalar(u32),
    Vector(Vec<u32>),
    Matrix(Vec<Vec<u32>>),
}

impl Degree {
    pub fn uniform(dims: Dimensions, d: u32) -> Self {
        if dims.is_scalar() {
            Degree::Scalar(d)
        } else if dims.is_vector() {
            Degree::Vector(vec![d; dims.rows])
        } else {
            Degree::Matrix(vec![vec![d; dims.cols]; dims.rows])
        }
    }

    pub fn zero(dims: Dimensions) -> Self {
        Self::uniform(dims, 0)
    }

    /// Elements in row-major order.
    pub fn elements(&self) -> Vec<u32> {
        match self {
            Degree::Scalar(d) => vec![*d],
            Degree::Vector(v) => v.clone(),
            Degree::Matrix(m) => m.iter().flatten().copied().collect(),
        }
    }

    pub fn max(&self) -> u32 {
        self.elements().into_iter().max().unwrap_or(0)
    }

    pub fn is_constant(&self) -> bool {
        self.max() == 0
    }

    pub fn map(&self, f: impl Fn(u32) -> u32) -> Degree {
        match self {
            Degree::Scalar(d) => Degree::Scalar(f(*d)),
            Degree::Vector(v) => Degree::Vector(v.iter().map(|&d| f(d)).collect()),
            Degree::Matrix(m) => {
                Degree::Matrix(m.iter().map(|r| r.iter().map(|&d| f(d)).collect()).collect())
            }
        }
    }

    /// Elementwise combination with scalar broadcast.
    pub fn zip_with(&self, other: &Degree, f: impl Fn(u32, u32) -> u32) -> Result<Degree, Error> {
        Ok(match (self, other) {
            (Degree::Scalar(a), Degree::Scalar(b)) => Degree::Scalar(f(*a, *b)),
            (Degree::Scalar(a), rhs) => rhs.map(|b| f(*a, b)),
            (lhs, Degree::Scalar(b)) => lhs.map(|a| f(a, *b)),
            (Degree::Vector(a), Degree::Vector(b)) if a.len() == b.len() => {
                Degree::Vector(a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect())
            }
            (Degree::Matrix(a), Degree::Matrix(b)) if a.len() == b.len() => Degree::Matrix(
                a.iter()
                    .zip(b)
                    .map(|(ra, rb)| ra.iter().zip(rb).map(|(&x, &y)| f(x, y)).collect())
                    .collect(),
            ),
            _ => {
                return Err(Error::DimensionMismatch(
                    "degree operands have different shapes".into(),
                ));
            }
        })
    }

    fn as_vector(&self) -> Option<&[u32]> {
        match self {
            Degree::Vector(v) => Some(v),
            _ => None,
        }
    }
}

/// Composition factor for a maximum constraint degree:
/// the least power of two covering it.
pub fn composition_factor(max_degree: u32) -> usize {
    (max_degree.max(1) as usize).next_power_of_two()
}

/// Degree inference over bodies of one schema.
///
/// Functions are analyzed at every call site with the
/// argument degrees bound to their parameters.
#[derive(Clone, Copy, Debug)]
pub struct DegreeAnalyzer<'a> {
    constants: &'a [LiteralValue],
    functions: &'a [FunctionDef],
    inverse_cost: u32,
}

impl<'a> DegreeAnalyzer<'a> {
    pub fn new(
        constants: &'a [LiteralValue],
        functions: &'a [FunctionDef],
        inverse_cost: u32,
    ) -> Self {
        Self {
            constants,
            functions,
            inverse_cost,
        }
    }

    /// Degree of the body result, with `params`
    /// bound to the body's `load.param` slots.
    pub fn analyze_body(&self, body: &Body, params: &[Degree]) -> Result<Degree, Error> {
        let mut locals: Vec<Option<Degree>> = vec![None; body.locals().len()];
        for s in body.subroutines() {
            let d = self.analyze_expr(body.arena(), s.value, &locals, params)?;
            locals[s.local] = Some(d);
        }

        self.analyze_expr(body.arena(), body.result(), &locals, params)
    }

    pub fn analyze_expr(
        &self,
        arena: &ExprArena,
        root: ExprId,
        locals: &[Option<Degree>],
        params: &[Degree],
    ) -> Result<Degree, Error> {
        let mut folder = DegreeFolder {
            analyzer: self,
            arena,
            locals,
            params,
        };

        arena.fold(root, &mut folder)
    }

    fn exponent(&self, arena: &ExprArena, id: ExprId) -> Result<u32, Error> {
        let value = match &arena.get(id).kind {
            ExprKind::Literal(LiteralValue::Scalar(v)) => Some(*v),
            ExprKind::Load {
                source: LoadSource::Const,
                index,
            } => self.constants.get(*index).and_then(LiteralValue::as_scalar),
            _ => None,
        };

        value
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .ok_or_else(|| Error::DimensionMismatch("exponent must be a constant scalar".into()))
    }

    fn inverse(&self, d: u32) -> u32 {
        if d == 0 { 0 } else { self.inverse_cost }
    }
}

struct DegreeFolder<'a, 'b> {
    analyzer: &'b DegreeAnalyzer<'a>,
    arena: &'b ExprArena,
    locals: &'b [Option<Degree>],
    params: &'b [Degree],
}

impl ExprFolder for DegreeFolder<'_, '_> {
    type Output = Degree;
    type Error = Error;

    fn fold_node(
        &mut self,
        _id: ExprId,
        expr: &Expr,
        children: Vec<Degree>,
    ) -> Result<Degree, Error> {
        let dims = expr.dims;
        let d = match &expr.kind {
            ExprKind::Literal(_) => Degree::zero(dims),
            ExprKind::Load { source, index } => match source {
                LoadSource::Const => Degree::zero(dims),
                LoadSource::Trace | LoadSource::Static => Degree::uniform(dims, 1),
                LoadSource::Local => self
                    .locals
                    .get(*index)
                    .cloned()
                    .flatten()
                    .ok_or_else(|| {
                        Error::UndefinedReference(format!("local {index} has no stored value"))
                    })?,
                LoadSource::Param => self.params.get(*index).cloned().ok_or_else(|| {
                    Error::UndefinedReference(format!("parameter {index} is not bound"))
                })?,
            },
            ExprKind::TraceSegment { .. } => Degree::uniform(dims, 1),
            ExprKind::Binary { op, rhs, .. } => {
                let (a, b) = (&children[0], &children[1]);
                match op {
                    BinaryOp::Add | BinaryOp::Sub => a.zip_with(b, u32::max)?,
                    BinaryOp::Mul => a.zip_with(b, u32::saturating_add)?,
                    BinaryOp::Div => {
                        let cost = |x: u32, y: u32| x.saturating_add(self.analyzer.inverse(y));
                        a.zip_with(b, cost)?
                    }
                    BinaryOp::Exp => {
                        let e = self.analyzer.exponent(self.arena, *rhs)?;
                        a.map(|x| x.saturating_mul(e))
                    }
                    BinaryOp::Prod => prod_degree(a, b)?,
                }
            }
            ExprKind::Unary { op, .. } => match op {
                UnaryOp::Neg => children[0].clone(),
                UnaryOp::Inv => children[0].map(|x| self.analyzer.inverse(x)),
            },
            ExprKind::MakeVector(_) => {
                Degree::Vector(children.iter().flat_map(Degree::elements).collect())
            }
            ExprKind::MakeMatrix(rows) => {
                let mut it = children.iter().flat_map(Degree::elements);
                Degree::Matrix(
                    rows.iter()
                        .map(|r| it.by_ref().take(r.len()).collect())
                        .collect(),
                )
            }
            ExprKind::GetElement { index, .. } => {
                let v = vector_of(&children[0])?;
                Degree::Scalar(v[*index])
            }
            ExprKind::Slice { start, end, .. } => {
                let v = vector_of(&children[0])?;
                Degree::Vector(v[*start..=*end].to_vec())
            }
            ExprKind::Call { function, .. } => {
                let f = self.analyzer.functions.get(*function).ok_or_else(|| {
                    Error::UndefinedReference(format!("function {function} is not declared"))
                })?;

                self.analyzer.analyze_body(f.body(), &children)?
            }
        };

        Ok(d)
    }
}

fn vector_of(d: &Degree) -> Result<&[u32], Error> {
    d.as_vector()
        .ok_or_else(|| Error::DimensionMismatch("expected vector degree".into()))
}

fn prod_degree(a: &Degree, b: &Degree) -> Result<Degree, Error> {
    let dot = |x: &[u32], y: &mut dyn Iterator<Item = u32>| {
        x.iter()
            .zip(y)
            .map(|(&p, q)| p.saturating_add(q))
            .max()
            .unwrap_or(0)
    };

    match (a, b) {
        (Degree::Vector(x), Degree::Vector(y)) => Ok(Degree::Scalar(dot(x, &mut y.iter().copied()))),
        (Degree::Matrix(m), Degree::Vector(v)) => Ok(Degree::Vector(
            m.iter().map(|row| dot(row, &mut v.iter().copied())).collect(),
        )),
        (Degree::Matrix(m), Degree::Matrix(n)) => {
            let cols = n.first().map(Vec::len).unwrap_or(0);
            Ok(Degree::Matrix(
                m.iter()
                    .map(|row| {
                        (0..cols)
                            .map(|j| dot(row, &mut n.iter().map(|r| r[j])))
                            .collect()
                    })
                    .collect(),
            ))
        }
        _ => Err(Error::DimensionMismatch("cannot prod degrees".into())),
    }
}
