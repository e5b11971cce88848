// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Informational report over a compiled schema.
//!
//! [`AnalysisReport`] summarizes registers, procedure
//! sizes, field operation counts and constraint degrees
//! so tooling can inspect the cost of a schema without
//! walking its expression trees.

use crate::degree::Degree;
use crate::expr::{
    BinaryOp, Expr, ExprArena, ExprFolder, ExprId, ExprKind, LiteralValue, LoadSource, UnaryOp,
};
use crate::procedure::{Body, FunctionDef, Procedure};
use crate::registers::StaticRegister;
use crate::schema::{AirSchema, ConstraintDescriptor};
use serde::Serialize;
use std::convert::Infallible;
use std::ops::AddAssign;

/// Field operations needed for one evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OpCounts {
    pub add: usize,
    pub mul: usize,
    pub inv: usize,
}

impl AddAssign for OpCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.add += rhs.add;
        self.mul += rhs.mul;
        self.inv += rhs.inv;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegisterSummary {
    pub index: usize,
    pub kind: &'static str,
    pub secret: bool,
    pub binary: bool,
    pub rank: Option<usize>,
    pub period: Option<usize>,
    pub degree: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcedureSummary {
    pub name: String,
    pub span: Option<usize>,
    pub width: usize,
    pub locals: usize,
    pub subroutines: usize,
    pub nodes: usize,
    pub ops: OpCounts,
    pub degree: Option<Degree>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub modulus: String,
    pub trace_registers: usize,
    pub static_registers: Vec<RegisterSummary>,
    pub functions: Vec<ProcedureSummary>,
    pub transition: ProcedureSummary,
    pub evaluation: ProcedureSummary,
    pub constraints: Vec<ConstraintDescriptor>,
    pub max_constraint_degree: u32,
    pub composition_factor: usize,
    pub commitment: String,
}

impl AnalysisReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn analyze(schema: &AirSchema) -> AnalysisReport {
    let registers = schema.static_registers();
    let static_registers = registers
        .iter()
        .enumerate()
        .map(|(index, r)| {
            let (binary, rank, period) = match r {
                StaticRegister::Input(ir) => (ir.binary, Some(ir.rank), None),
                StaticRegister::Cyclic(c) => (false, None, Some(c.period())),
                StaticRegister::Mask(_) => (true, None, None),
            };

            RegisterSummary {
                index,
                kind: r.kind_name(),
                secret: registers.is_secret(index),
                binary,
                rank,
                period,
                degree: 1,
            }
        })
        .collect();

    let counter = OpCounter {
        constants: schema.constants(),
        functions: schema.functions(),
    };

    let functions = schema
        .functions()
        .iter()
        .enumerate()
        .map(|(i, f)| summarize_function(&counter, i, f))
        .collect();

    let evaluation_degree = Degree::Vector(schema.constraints().iter().map(|c| c.degree).collect());
    let commitment = hex::encode(schema.commitment());

    let report = AnalysisReport {
        modulus: schema.field().modulus.to_string(),
        trace_registers: schema.trace_register_count(),
        static_registers,
        functions,
        transition: summarize(
            &counter,
            schema.transition(),
            schema.transition_degree().clone(),
        ),
        evaluation: summarize(&counter, schema.evaluation(), evaluation_degree),
        constraints: schema.constraints().to_vec(),
        max_constraint_degree: schema.max_constraint_degree(),
        composition_factor: schema.composition_factor(),
        commitment,
    };

    tracing::debug!(
        target = "compiler.analyze",
        transition_ops = ?report.transition.ops,
        evaluation_ops = ?report.evaluation.ops,
        "schema analyzed"
    );

    report
}

fn summarize(counter: &OpCounter<'_>, p: &Procedure, degree: Degree) -> ProcedureSummary {
    ProcedureSummary {
        name: p.kind().keyword().to_string(),
        span: Some(p.span()),
        width: p.width(),
        locals: p.body().locals().len(),
        subroutines: p.body().subroutines().len(),
        nodes: p.body().node_count(),
        ops: counter.body(p.body()),
        degree: Some(degree),
    }
}

fn summarize_function(counter: &OpCounter<'_>, index: usize, f: &FunctionDef) -> ProcedureSummary {
    ProcedureSummary {
        name: format!("function {index}"),
        span: None,
        width: f.result_dims().element_count(),
        locals: f.body().locals().len(),
        subroutines: f.body().subroutines().len(),
        nodes: f.body().node_count(),
        ops: counter.body(f.body()),
        degree: None,
    }
}

struct OpCounter<'a> {
    constants: &'a [LiteralValue],
    functions: &'a [FunctionDef],
}

impl OpCounter<'_> {
    fn body(&self, body: &Body) -> OpCounts {
        let mut total = OpCounts::default();
        for s in body.subroutines() {
            total += self.expr(body.arena(), s.value);
        }

        total += self.expr(body.arena(), body.result());
        total
    }

    fn expr(&self, arena: &ExprArena, root: ExprId) -> OpCounts {
        let mut folder = CountFolder {
            counter: self,
            arena,
        };

        match arena.fold(root, &mut folder) {
            Ok(c) => c,
            Err(never) => match never {},
        }
    }

    /// Square-and-multiply cost of `x^e`.
    fn exp_cost(&self, arena: &ExprArena, exponent: ExprId) -> usize {
        let e = match &arena.get(exponent).kind {
            ExprKind::Literal(LiteralValue::Scalar(v)) => *v,
            ExprKind::Load {
                source: LoadSource::Const,
                index,
            } => self
                .constants
                .get(*index)
                .and_then(LiteralValue::as_scalar)
                .unwrap_or(0),
            _ => 0,
        };

        if e < 2 {
            return 0;
        }

        let bits = (u128::BITS - e.leading_zeros()) as usize;
        (bits - 1) + (e.count_ones() as usize - 1)
    }
}

struct CountFolder<'a, 'b> {
    counter: &'b OpCounter<'a>,
    arena: &'b ExprArena,
}

impl ExprFolder for CountFolder<'_, '_> {
    type Output = OpCounts;
    type Error = Infallible;

    fn fold_node(
        &mut self,
        _id: ExprId,
        expr: &Expr,
        children: Vec<OpCounts>,
    ) -> Result<OpCounts, Infallible> {
        let mut c = OpCounts::default();
        for child in children {
            c += child;
        }

        let n = expr.dims.element_count();
        match &expr.kind {
            ExprKind::Binary { op, rhs, .. } => match op {
                BinaryOp::Add | BinaryOp::Sub => c.add += n,
                BinaryOp::Mul => c.mul += n,
                BinaryOp::Div => {
                    c.mul += n;
                    c.inv += n;
                }
                BinaryOp::Exp => c.mul += n * self.counter.exp_cost(self.arena, *rhs),
                BinaryOp::Prod => {
                    // inner dimension of the contraction
                    let k = self.arena.dims(*rhs).rows;
                    c.mul += n * k;
                    c.add += n * k.saturating_sub(1);
                }
            },
            ExprKind::Unary { op, .. } => match op {
                UnaryOp::Neg => c.add += n,
                UnaryOp::Inv => c.inv += n,
            },
            ExprKind::Call { function, .. } => {
                if let Some(f) = self.counter.functions.get(*function) {
                    c += self.counter.body(f.body());
                }
            }
            _ => {}
        }

        Ok(c)
    }
}
