// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Backend-agnostic compiler for the AirAssembly language.
//!
//! This crate lexes and parses AirAssembly source into a
//! validated [`AirSchema`]: typed expression trees for the
//! transition function and transition constraints, the
//! static register declarations, per-constraint degrees and
//! a Blake3 commitment over the canonical rendering. It knows
//! nothing about proof systems; runtimes consume the schema.

mod compressor;
mod degree;
mod diagnostics;
mod error;
mod limits;
mod render;
mod schema;

pub mod expr;
pub mod lexer;
pub mod parser;
pub mod procedure;
pub mod registers;

pub use compressor::{CompressorOptions, compress, normalize};
pub use degree::{Degree, DegreeAnalyzer, composition_factor};
pub use diagnostics::{AnalysisReport, OpCounts, ProcedureSummary, RegisterSummary, analyze};
pub use error::{CompileError, Error, Position};
pub use expr::{
    BinaryOp, Dimensions, Expr, ExprArena, ExprFolder, ExprId, ExprKind, LiteralValue, LoadSource,
    UnaryOp,
};
pub use limits::{CompileOptions, StarkLimits};
pub use procedure::{Body, FunctionDef, Procedure, ProcedureKind, Subroutine};
pub use registers::{
    CycleSource, CyclicRegister, InputRegister, MaskRegister, StaticRegister, StaticRegisterSet,
};
pub use render::render_expr;
pub use schema::{AirSchema, ConstraintDescriptor, FieldDescriptor, SchemaBuilder};

use tracing::{debug, instrument};

/// Compile AirAssembly source into a schema.
///
/// Every independent error found is reported
/// in the returned [`CompileError`].
#[instrument(level = "info", skip(src, options))]
pub fn compile(src: &str, options: &CompileOptions) -> Result<AirSchema, CompileError> {
    let tokens = lexer::lex(src)?;
    debug!(toks_len = tokens.len(), "lexed");

    let builder = parser::parse(&tokens)?;
    debug!(
        constants = builder.constants().len(),
        functions = builder.functions().len(),
        "parsed"
    );

    let schema = builder.build(options)?;
    debug!(
        trace_registers = schema.trace_register_count(),
        static_registers = schema.static_register_count(),
        max_constraint_degree = schema.max_constraint_degree(),
        "schema built"
    );

    Ok(schema)
}

/// Compile raw source bytes, which must be UTF-8.
pub fn compile_bytes(src: &[u8], options: &CompileOptions) -> Result<AirSchema, CompileError> {
    let text = std::str::from_utf8(src).map_err(|e| {
        // 1-based position of the first invalid byte
        let valid = &src[..e.valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
        let column = valid.iter().rev().take_while(|&&b| b != b'\n').count() as u32 + 1;

        Error::Lex {
            message: "source is not valid UTF-8".into(),
            pos: Position::new(line, column),
        }
    })?;

    compile(text, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "(module
        (field prime 97)
        (transition (span 1) (result vector 1) (add (load.trace 0) (scalar 1)))
        (evaluation (span 2) (result vector 1)
            (sub (load.trace 1) (add (load.trace 0) (scalar 1)))))";

    #[test]
    fn compiles_minimal_module() {
        let schema = compile(MINIMAL, &CompileOptions::default()).unwrap();

        assert_eq!(schema.field().modulus, 97);
        assert_eq!(schema.trace_register_count(), 1);
        assert_eq!(schema.max_constraint_degree(), 1);
        assert_eq!(schema.composition_factor(), 1);
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut bytes = b"(module\n  ".to_vec();
        bytes.push(0xff);

        let err = compile_bytes(&bytes, &CompileOptions::default()).unwrap_err();
        match &err.errors()[0] {
            Error::Lex { pos, .. } => assert_eq!(*pos, Position::new(2, 3)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn commitment_is_stable() {
        let a = compile(MINIMAL, &CompileOptions::default()).unwrap();
        let b = compile(MINIMAL, &CompileOptions::default()).unwrap();

        assert_eq!(a.commitment(), b.commitment());
    }
}
