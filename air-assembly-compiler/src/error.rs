// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Error taxonomy of the AirAssembly compiler.
//!
//! Individual problems are reported as [`Error`] values;
//! a single `compile` call gathers every independent
//! problem it finds into one [`CompileError`].

use std::fmt;

/// 1-based source location of a token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("lex: {message} at {pos}")]
    Lex { message: String, pos: Position },
    #[error("parse: expected {expected} at {pos}")]
    Parse { expected: String, pos: Position },
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("register declaration: {0}")]
    RegisterDeclaration(String),
    #[error("degree limit exceeded: {0}")]
    DegreeLimitExceeded(String),
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("undefined reference: {0}")]
    UndefinedReference(String),
}

impl Error {
    pub(crate) fn parse(expected: impl Into<String>, pos: Position) -> Self {
        Error::Parse {
            expected: expected.into(),
            pos,
        }
    }

    /// Attach a source location to errors
    /// raised without one (model-level checks).
    pub(crate) fn located(self, pos: Position) -> Self {
        match self {
            Error::DimensionMismatch(m) => Error::DimensionMismatch(format!("{m} at {pos}")),
            Error::RegisterDeclaration(m) => Error::RegisterDeclaration(format!("{m} at {pos}")),
            Error::UndefinedReference(m) => Error::UndefinedReference(format!("{m} at {pos}")),
            other => other,
        }
    }
}

/// Aggregate of every error found by one compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileError {
    errors: Vec<Error>,
}

impl CompileError {
    pub fn new(errors: Vec<Error>) -> Self {
        debug_assert!(!errors.is_empty());
        Self { errors }
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    /// True when any collected error satisfies `pred`.
    pub fn any(&self, pred: impl Fn(&Error) -> bool) -> bool {
        self.errors.iter().any(pred)
    }
}

impl From<Error> for CompileError {
    fn from(err: Error) -> Self {
        Self { errors: vec![err] }
    }
}

impl From<Vec<Error>> for CompileError {
    fn from(errors: Vec<Error>) -> Self {
        Self::new(errors)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [single] = self.errors.as_slice() {
            return write!(f, "{single}");
        }

        write!(f, "compilation failed with {} errors:", self.errors.len())?;
        for e in &self.errors {
            write!(f, "\n  - {e}")?;
        }

        Ok(())
    }
}

impl std::error::Error for CompileError {}
