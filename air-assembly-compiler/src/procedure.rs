// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Procedure and function bodies.
//!
//! A [`Body`] is a list of `store.local` statements
//! ([`Subroutine`]s) followed by a result expression,
//! all allocated in one [`ExprArena`]. Bodies are
//! assembled with a [`BodyBuilder`] and immutable after.

use crate::error::Error;
use crate::expr::{Dimensions, ExprArena, ExprId, Signature};

/// One `store.local` statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subroutine {
    pub local: usize,
    pub value: ExprId,
    pub dims: Dimensions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Body {
    locals: Vec<Dimensions>,
    subroutines: Vec<Subroutine>,
    arena: ExprArena,
    result: ExprId,
}

impl Body {
    pub(crate) fn from_parts(
        locals: Vec<Dimensions>,
        subroutines: Vec<Subroutine>,
        arena: ExprArena,
        result: ExprId,
    ) -> Self {
        Self {
            locals,
            subroutines,
            arena,
            result,
        }
    }

    pub fn locals(&self) -> &[Dimensions] {
        &self.locals
    }

    pub fn subroutines(&self) -> &[Subroutine] {
        &self.subroutines
    }

    pub fn arena(&self) -> &ExprArena {
        &self.arena
    }

    pub fn result(&self) -> ExprId {
        self.result
    }

    pub fn result_dims(&self) -> Dimensions {
        self.arena.dims(self.result)
    }

    /// Number of nodes reachable from the statements.
    pub fn node_count(&self) -> usize {
        self.subroutines
            .iter()
            .map(|s| self.arena.weight(s.value))
            .sum::<usize>()
            + self.arena.weight(self.result)
    }
}

#[derive(Debug)]
pub struct BodyBuilder {
    locals: Vec<Dimensions>,
    stored: Vec<bool>,
    subroutines: Vec<Subroutine>,
    arena: ExprArena,
}

impl Default for BodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self {
            locals: Vec::new(),
            stored: Vec::new(),
            subroutines: Vec::new(),
            arena: ExprArena::new(),
        }
    }

    pub fn declare_local(&mut self, dims: Dimensions) -> usize {
        self.locals.push(dims);
        self.stored.push(false);
        self.locals.len() - 1
    }

    pub fn arena_mut(&mut self) -> &mut ExprArena {
        &mut self.arena
    }

    pub fn arena(&self) -> &ExprArena {
        &self.arena
    }

    /// Dimensions of a local that may be read at this
    /// point, i.e. one that has been stored to.
    pub fn readable_local(&self, index: usize) -> Result<Dimensions, Error> {
        match (self.locals.get(index), self.stored.get(index)) {
            (Some(d), Some(true)) => Ok(*d),
            (Some(_), _) => Err(Error::UndefinedReference(format!(
                "local {index} is read before it is stored"
            ))),
            _ => Err(Error::UndefinedReference(format!(
                "local {index} is not declared"
            ))),
        }
    }

    pub fn store(&mut self, local: usize, value: ExprId) -> Result<(), Error> {
        let Some(&dims) = self.locals.get(local) else {
            return Err(Error::UndefinedReference(format!(
                "local {local} is not declared"
            )));
        };

        let got = self.arena.dims(value);
        if !got.is_same(&dims) {
            return Err(Error::DimensionMismatch(format!(
                "local {local} is {dims} but stored value is {got}"
            )));
        }

        self.subroutines.push(Subroutine { local, value, dims });
        self.stored[local] = true;

        Ok(())
    }

    /// Mark a local as written after a failed store
    /// so later reads do not cascade into more errors.
    pub fn assume_stored(&mut self, local: usize) {
        if let Some(s) = self.stored.get_mut(local) {
            *s = true;
        }
    }

    pub fn finish(self, result: ExprId) -> Body {
        Body::from_parts(self.locals, self.subroutines, self.arena, result)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcedureKind {
    Transition,
    Evaluation,
}

impl ProcedureKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            ProcedureKind::Transition => "transition",
            ProcedureKind::Evaluation => "evaluation",
        }
    }

    /// Consecutive trace rows the procedure reads.
    pub fn span(&self) -> usize {
        match self {
            ProcedureKind::Transition => 1,
            ProcedureKind::Evaluation => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Procedure {
    kind: ProcedureKind,
    width: usize,
    body: Body,
}

impl Procedure {
    pub fn new(kind: ProcedureKind, width: usize, body: Body) -> Result<Self, Error> {
        let got = body.result_dims();
        if width == 0 || !got.is_same(&Dimensions::vector(width)) {
            return Err(Error::DimensionMismatch(format!(
                "{} result must be vector {width} (got {got})",
                kind.keyword()
            )));
        }

        Ok(Self { kind, width, body })
    }

    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    pub fn span(&self) -> usize {
        self.kind.span()
    }

    /// Length of the result vector.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub(crate) fn with_body(&self, body: Body) -> Self {
        Self {
            kind: self.kind,
            width: self.width,
            body,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDef {
    params: Vec<Dimensions>,
    result: Dimensions,
    body: Body,
}

impl FunctionDef {
    pub fn new(params: Vec<Dimensions>, result: Dimensions, body: Body) -> Result<Self, Error> {
        let got = body.result_dims();
        if !got.is_same(&result) {
            return Err(Error::DimensionMismatch(format!(
                "function result must be {result} (got {got})"
            )));
        }

        Ok(Self {
            params,
            result,
            body,
        })
    }

    pub fn params(&self) -> &[Dimensions] {
        &self.params
    }

    pub fn result_dims(&self) -> Dimensions {
        self.result
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn signature(&self) -> Signature {
        Signature {
            params: self.params.clone(),
            result: self.result,
        }
    }

    pub(crate) fn with_body(&self, body: Body) -> Self {
        Self {
            params: self.params.clone(),
            result: self.result,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, LiteralValue, LoadSource};

    #[test]
    fn load_local_requires_prior_store() {
        let mut b = BodyBuilder::new();
        let l = b.declare_local(Dimensions::scalar());
        assert!(b.readable_local(l).is_err());

        let v = b.arena_mut().literal(LiteralValue::Scalar(7)).unwrap();
        b.store(l, v).unwrap();
        assert_eq!(b.readable_local(l).unwrap(), Dimensions::scalar());
        assert!(b.readable_local(l + 1).is_err());
    }

    #[test]
    fn store_checks_declared_dimensions() {
        let mut b = BodyBuilder::new();
        let l = b.declare_local(Dimensions::vector(2));
        let v = b.arena_mut().literal(LiteralValue::Scalar(7)).unwrap();

        let err = b.store(l, v).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }

    #[test]
    fn procedure_result_must_match_width() {
        let mut b = BodyBuilder::new();
        let r = b
            .arena_mut()
            .load(LoadSource::Trace, 0, Dimensions::vector(2));
        let one = b.arena_mut().literal(LiteralValue::Scalar(1)).unwrap();
        let sum = b.arena_mut().binary(BinaryOp::Add, r, one).unwrap();
        let body = b.finish(sum);

        assert!(Procedure::new(ProcedureKind::Transition, 3, body.clone()).is_err());

        let p = Procedure::new(ProcedureKind::Evaluation, 2, body).unwrap();
        assert_eq!(p.span(), 2);
        assert_eq!(p.body().node_count(), 3);
    }
}
