// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Canonical AirAssembly text for compiled schemas.
//!
//! The output re-parses into an equivalent schema.

use crate::expr::{Expr, ExprArena, ExprFolder, ExprId, ExprKind, LiteralValue};
use crate::procedure::{Body, Procedure};
use crate::registers::{CycleSource, StaticRegister};
use crate::schema::AirSchema;
use std::convert::Infallible;
use std::fmt;

struct Printer;

impl ExprFolder for Printer {
    type Output = String;
    type Error = Infallible;

    fn fold_node(
        &mut self,
        _id: ExprId,
        expr: &Expr,
        children: Vec<String>,
    ) -> Result<String, Infallible> {
        let s = match &expr.kind {
            ExprKind::Literal(v) => format!("({})", literal_body(v)),
            ExprKind::Load { source, index } => format!("({} {index})", source.keyword()),
            ExprKind::Binary { op, .. } => {
                format!("({} {} {})", op.keyword(), children[0], children[1])
            }
            ExprKind::Unary { op, .. } => format!("({} {})", op.keyword(), children[0]),
            ExprKind::MakeVector(_) => format!("(vector {})", children.join(" ")),
            ExprKind::GetElement { index, .. } => format!("(get {} {index})", children[0]),
            ExprKind::Slice { start, end, .. } => {
                format!("(slice {} {start} {end})", children[0])
            }
            ExprKind::MakeMatrix(rows) => {
                let mut it = children.into_iter();
                let rows: Vec<String> = rows
                    .iter()
                    .map(|r| {
                        let row: Vec<String> = it.by_ref().take(r.len()).collect();
                        format!("({})", row.join(" "))
                    })
                    .collect();

                format!("(matrix {})", rows.join(" "))
            }
            ExprKind::Call { function, .. } => {
                if children.is_empty() {
                    format!("(call {function})")
                } else {
                    format!("(call {function} {})", children.join(" "))
                }
            }
            ExprKind::TraceSegment { row, start, end } => {
                format!("(slice (load.trace {row}) {start} {end})")
            }
        };

        Ok(s)
    }
}

fn join(values: &[u128]) -> String {
    values
        .iter()
        .map(u128::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `scalar 1`, `vector 1 2`, `matrix (1 2) (3 4)`
fn literal_body(v: &LiteralValue) -> String {
    match v {
        LiteralValue::Scalar(x) => format!("scalar {x}"),
        LiteralValue::Vector(xs) => format!("vector {}", join(xs)),
        LiteralValue::Matrix(rows) => {
            let rows: Vec<String> = rows.iter().map(|r| format!("({})", join(r))).collect();
            format!("matrix {}", rows.join(" "))
        }
    }
}

/// Render one expression subtree.
pub fn render_expr(arena: &ExprArena, root: ExprId) -> String {
    match arena.fold(root, &mut Printer) {
        Ok(s) => s,
        Err(never) => match never {},
    }
}

fn write_body(f: &mut fmt::Formatter<'_>, body: &Body, indent: &str) -> fmt::Result {
    for l in body.locals() {
        write!(f, "\n{indent}(local {l})")?;
    }

    for s in body.subroutines() {
        write!(
            f,
            "\n{indent}(store.local {} {})",
            s.local,
            render_expr(body.arena(), s.value)
        )?;
    }

    write!(f, "\n{indent}{})", render_expr(body.arena(), body.result()))
}

fn write_procedure(f: &mut fmt::Formatter<'_>, p: &Procedure) -> fmt::Result {
    write!(
        f,
        "\n  ({}\n    (span {})\n    (result vector {})",
        p.kind().keyword(),
        p.span(),
        p.width()
    )?;

    write_body(f, p.body(), "    ")
}

impl fmt::Display for StaticRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticRegister::Input(r) => {
                let visibility = if r.secret { "secret" } else { "public" };
                let binary = if r.binary { " binary" } else { "" };
                let binding = match (r.scalar, r.parent) {
                    (true, _) => "scalar".to_string(),
                    (false, Some(p)) => format!("(parent {p})"),
                    (false, None) => "vector".to_string(),
                };
                let pattern = match r.steps {
                    Some(s) => format!("(steps {s})"),
                    None => "filled".to_string(),
                };

                write!(f, "(input {visibility}{binary} {binding} {pattern})")
            }
            StaticRegister::Cyclic(c) => match &c.source {
                CycleSource::Values(v) => write!(f, "(cycle {})", join(v)),
                CycleSource::Prng { seed, count } => {
                    write!(f, "(cycle (prng blake3 0x{} {count}))", hex::encode(seed))
                }
                CycleSource::Power { base, count } => {
                    write!(f, "(cycle (power {base} {count}))")
                }
            },
            StaticRegister::Mask(m) => write!(f, "(mask {} {})", m.source, m.value),
        }
    }
}

impl fmt::Display for AirSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(module\n  (field prime {})", self.field().modulus)?;

        for c in self.constants() {
            write!(f, "\n  (const {})", literal_body(c))?;
        }

        for func in self.functions() {
            write!(f, "\n  (function\n    (result {})", func.result_dims())?;
            for p in func.params() {
                write!(f, "\n    (param {p})")?;
            }

            write_body(f, func.body(), "    ")?;
        }

        if !self.static_registers().is_empty() {
            write!(f, "\n  (static")?;
            for r in self.static_registers().iter() {
                write!(f, "\n    {r}")?;
            }

            write!(f, ")")?;
        }

        write_procedure(f, self.transition())?;
        write_procedure(f, self.evaluation())?;

        write!(f, ")")
    }
}
