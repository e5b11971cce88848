// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Lowering of expression trees into evaluation closures.
//!
//! Every node becomes a boxed closure over its children's
//! closures; constants and literals are converted once and
//! captured by value.

use crate::error::{Error, Result};
use crate::field::BaseElement as BE;
use crate::value::Value;
use air_assembly_compiler::{
    BinaryOp, Body, Expr, ExprArena, ExprFolder, ExprId, ExprKind, LiteralValue, LoadSource,
    UnaryOp,
};
use std::sync::Arc;

pub(crate) type Eval = Box<dyn Fn(&Frame<'_>) -> Result<Value> + Send + Sync>;

/// Everything a lowered expression can read.
pub(crate) struct Frame<'a> {
    pub rows: &'a [&'a [BE]],
    pub statics: &'a [BE],
    pub params: &'a [Value],
    pub locals: &'a [Option<Value>],
}

/// A lowered procedure or function body.
pub(crate) struct CompiledBody {
    locals: usize,
    stores: Vec<(usize, Eval)>,
    result: Eval,
}

impl CompiledBody {
    pub(crate) fn run(&self, rows: &[&[BE]], statics: &[BE], params: &[Value]) -> Result<Value> {
        let mut locals: Vec<Option<Value>> = vec![None; self.locals];
        for (slot, eval) in &self.stores {
            let v = eval(&Frame {
                rows,
                statics,
                params,
                locals: &locals,
            })?;

            locals[*slot] = Some(v);
        }

        (self.result)(&Frame {
            rows,
            statics,
            params,
            locals: &locals,
        })
    }
}

pub(crate) fn lower_body(
    body: &Body,
    constants: &[LiteralValue],
    functions: &[Arc<CompiledBody>],
) -> Result<CompiledBody> {
    let mut lowerer = Lowerer {
        arena: body.arena(),
        constants,
        functions,
    };

    let stores = body
        .subroutines()
        .iter()
        .map(|s| Ok((s.local, body.arena().fold(s.value, &mut lowerer)?)))
        .collect::<Result<Vec<_>>>()?;

    let result = body.arena().fold(body.result(), &mut lowerer)?;

    Ok(CompiledBody {
        locals: body.locals().len(),
        stores,
        result,
    })
}

struct Lowerer<'a> {
    arena: &'a ExprArena,
    constants: &'a [LiteralValue],
    functions: &'a [Arc<CompiledBody>],
}

impl Lowerer<'_> {
    fn constant(&self, index: usize) -> Result<&LiteralValue> {
        self.constants
            .get(index)
            .ok_or_else(|| Error::Shape(format!("constant {index} is not defined")))
    }

    fn exponent(&self, id: ExprId) -> Result<u128> {
        let value = match &self.arena.get(id).kind {
            ExprKind::Literal(lit) => lit.as_scalar(),
            ExprKind::Load {
                source: LoadSource::Const,
                index,
            } => self.constant(*index)?.as_scalar(),
            _ => None,
        };

        value.ok_or_else(|| Error::Shape("exponent must be a constant scalar".into()))
    }
}

fn pair(children: Vec<Eval>) -> Result<(Eval, Eval)> {
    let mut it = children.into_iter();
    match (it.next(), it.next()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(Error::Shape("binary node needs two operands".into())),
    }
}

fn single(children: Vec<Eval>) -> Result<Eval> {
    children
        .into_iter()
        .next()
        .ok_or_else(|| Error::Shape("node needs an operand".into()))
}

fn constant(value: Value) -> Eval {
    Box::new(move |_: &Frame<'_>| Ok(value.clone()))
}

impl ExprFolder for Lowerer<'_> {
    type Output = Eval;
    type Error = Error;

    fn fold_node(&mut self, _id: ExprId, expr: &Expr, children: Vec<Eval>) -> Result<Eval> {
        let eval: Eval = match &expr.kind {
            ExprKind::Literal(lit) => constant(Value::from_literal(lit)),
            ExprKind::Load { source, index } => {
                let index = *index;
                match source {
                    LoadSource::Const => constant(Value::from_literal(self.constant(index)?)),
                    LoadSource::Trace => Box::new(move |f: &Frame<'_>| {
                        f.rows
                            .get(index)
                            .map(|r| Value::Vector(r.to_vec()))
                            .ok_or_else(|| Error::Shape(format!("trace row {index} not bound")))
                    }),
                    LoadSource::Static => {
                        Box::new(move |f: &Frame<'_>| Ok(Value::Vector(f.statics.to_vec())))
                    }
                    LoadSource::Local => Box::new(move |f: &Frame<'_>| {
                        f.locals
                            .get(index)
                            .cloned()
                            .flatten()
                            .ok_or_else(|| Error::Shape(format!("local {index} read before store")))
                    }),
                    LoadSource::Param => Box::new(move |f: &Frame<'_>| {
                        f.params
                            .get(index)
                            .cloned()
                            .ok_or_else(|| Error::Shape(format!("parameter {index} not bound")))
                    }),
                }
            }
            ExprKind::Binary { op, rhs, .. } => {
                let apply: fn(&Value, &Value) -> Result<Value> = match op {
                    BinaryOp::Add => Value::add,
                    BinaryOp::Sub => Value::sub,
                    BinaryOp::Mul => Value::mul,
                    BinaryOp::Div => Value::div,
                    BinaryOp::Prod => Value::prod,
                    BinaryOp::Exp => {
                        // the exponent is folded; only the base is evaluated
                        let e = self.exponent(*rhs)?;
                        let base = single(children)?;
                        let eval: Eval = Box::new(move |f: &Frame<'_>| base(f)?.exp(e));
                        return Ok(eval);
                    }
                };

                let (a, b) = pair(children)?;
                Box::new(move |f: &Frame<'_>| apply(&a(f)?, &b(f)?))
            }
            ExprKind::Unary { op, .. } => {
                let x = single(children)?;
                match op {
                    UnaryOp::Neg => Box::new(move |f: &Frame<'_>| x(f)?.neg()),
                    UnaryOp::Inv => Box::new(move |f: &Frame<'_>| x(f)?.inv()),
                }
            }
            ExprKind::MakeVector(_) => Box::new(move |f: &Frame<'_>| {
                let parts = children.iter().map(|c| c(f)).collect::<Result<Vec<_>>>()?;
                Value::concat(parts)
            }),
            ExprKind::MakeMatrix(rows) => {
                let widths: Vec<usize> = rows.iter().map(Vec::len).collect();
                Box::new(move |f: &Frame<'_>| {
                    let mut it = children.iter();
                    let mut out = Vec::with_capacity(widths.len());
                    for &w in &widths {
                        let row = it
                            .by_ref()
                            .take(w)
                            .map(|c| c(f)?.as_scalar())
                            .collect::<Result<Vec<_>>>()?;
                        out.push(row);
                    }

                    Ok(Value::Matrix(out))
                })
            }
            ExprKind::GetElement { index, .. } => {
                let (x, index) = (single(children)?, *index);
                Box::new(move |f: &Frame<'_>| x(f)?.get(index))
            }
            ExprKind::Slice { start, end, .. } => {
                let (x, start, end) = (single(children)?, *start, *end);
                Box::new(move |f: &Frame<'_>| x(f)?.slice(start, end))
            }
            ExprKind::TraceSegment { row, start, end } => {
                let (row, start, end) = (*row, *start, *end);
                Box::new(move |f: &Frame<'_>| {
                    let r = f
                        .rows
                        .get(row)
                        .ok_or_else(|| Error::Shape(format!("trace row {row} not bound")))?;

                    r.get(start..=end)
                        .map(|s| Value::Vector(s.to_vec()))
                        .ok_or_else(|| Error::Shape(format!("segment {start}..={end} out of row")))
                })
            }
            ExprKind::Call { function, .. } => {
                let callee = self
                    .functions
                    .get(*function)
                    .cloned()
                    .ok_or_else(|| Error::Shape(format!("function {function} is not defined")))?;

                Box::new(move |f: &Frame<'_>| {
                    let args = children.iter().map(|c| c(f)).collect::<Result<Vec<_>>>()?;
                    callee.run(&[], &[], &args)
                })
            }
        };

        Ok(eval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use air_assembly_compiler::{CompileOptions, compile};

    fn row(xs: &[u128]) -> Vec<BE> {
        xs.iter().map(|&x| BE::new(x)).collect()
    }

    #[test]
    fn lowers_locals_and_calls() {
        let src = "
            (module
              (field prime 340282366920938463463374607393113505793)
              (const vector 2 3)
              (function (result vector 2) (param vector 2)
                (mul (load.param 0) (load.const 0)))
              (transition (span 1) (result vector 2)
                (local vector 2)
                (store.local 0 (call 0 (load.trace 0)))
                (add (load.local 0) (slice (load.trace 0) 0 1)))
              (evaluation (span 2) (result vector 2)
                (sub (load.trace 1) (load.trace 0))))";

        let schema = compile(src, &CompileOptions::default()).unwrap();
        let f = Arc::new(
            lower_body(schema.functions()[0].body(), schema.constants(), &[]).unwrap(),
        );
        let t = lower_body(schema.transition().body(), schema.constants(), &[f]).unwrap();

        let r = row(&[5, 7]);
        let out = t.run(&[&r], &[], &[]).unwrap();

        // 5*2 + 5, 7*3 + 7
        assert_eq!(out, Value::Vector(row(&[15, 28])));
    }

    #[test]
    fn division_by_zero_surfaces() {
        let src = "
            (module
              (field prime 340282366920938463463374607393113505793)
              (transition (span 1) (result vector 1) (inv (load.trace 0)))
              (evaluation (span 2) (result vector 1) (load.trace 1)))";

        let schema = compile(src, &CompileOptions::default()).unwrap();
        let t = lower_body(schema.transition().body(), schema.constants(), &[]).unwrap();

        let zero = row(&[0]);
        assert_eq!(t.run(&[&zero], &[], &[]), Err(Error::DivisionByZero));
    }
}
