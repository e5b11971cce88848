// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Verifier-side context: constraint evaluation at a
//! single out-of-domain point.

use crate::domain::interpolate_columns;
use crate::error::{Error, Result};
use crate::field::BaseElement as BE;
use crate::module::AirModule;
use crate::registers::StaticEvaluator;
use std::fmt;
use winterfell::math::polynom;

/// Where the value of one static register at
/// an arbitrary point comes from.
#[derive(Clone, Debug)]
enum StaticSource {
    /// Polynomial interpolating a public column.
    Column(Vec<BE>),
    /// Index of the cyclic register in the module.
    Cyclic(usize),
    /// Position in the secret value vector.
    Secret(usize),
}

pub struct VerificationObject<'a> {
    module: &'a AirModule,
    trace_length: usize,
    sources: Vec<StaticSource>,
}

impl fmt::Debug for VerificationObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = self
            .sources
            .iter()
            .filter(|s| matches!(s, StaticSource::Secret(_)))
            .count();

        f.debug_struct("VerificationObject")
            .field("module", self.module)
            .field("trace_length", &self.trace_length)
            .field("static_register_count", &self.sources.len())
            .field("secret_register_count", &secret)
            .finish_non_exhaustive()
    }
}

impl<'a> VerificationObject<'a> {
    pub(crate) fn new(
        module: &'a AirModule,
        trace_length: usize,
        columns: Vec<Option<Vec<BE>>>,
    ) -> Result<Self> {
        let public: Vec<Vec<BE>> = columns
            .iter()
            .zip(module.statics())
            .filter(|(_, e)| !e.is_secret() && !matches!(e, StaticEvaluator::Cyclic(_)))
            .map(|(c, _)| c.clone())
            .collect::<Option<_>>()
            .ok_or_else(|| Error::Shape("public static register left unresolved".into()))?;

        let mut polys = interpolate_columns(&public, module.backend()).into_iter();
        let mut secret = 0;

        let mut sources = Vec::with_capacity(columns.len());
        for (i, e) in module.statics().iter().enumerate() {
            let source = match e {
                StaticEvaluator::Cyclic(_) => StaticSource::Cyclic(i),
                _ if e.is_secret() => {
                    secret += 1;
                    StaticSource::Secret(secret - 1)
                }
                _ => StaticSource::Column(
                    polys
                        .next()
                        .ok_or_else(|| Error::Shape("missing public column".into()))?,
                ),
            };

            sources.push(source);
        }

        Ok(Self {
            module,
            trace_length,
            sources,
        })
    }

    pub fn trace_length(&self) -> usize {
        self.trace_length
    }

    /// Static register values at `x`; `h` holds the secret
    /// register values in [`AirModule::secret_registers`] order.
    pub fn static_values_at(&self, x: BE, h: &[BE]) -> Result<Vec<BE>> {
        let secret = self.module.secret_registers().len();
        if h.len() != secret {
            return Err(Error::Shape(format!(
                "expected {secret} secret register values (got {})",
                h.len()
            )));
        }

        self.sources
            .iter()
            .map(|s| match s {
                StaticSource::Column(p) => Ok(polynom::eval(p, x)),
                StaticSource::Cyclic(i) => match &self.module.statics()[*i] {
                    StaticEvaluator::Cyclic(c) => Ok(c.evaluate_at(x, self.trace_length)),
                    _ => Err(Error::Shape(format!("static register {i} is not cyclic"))),
                },
                StaticSource::Secret(j) => Ok(h[*j]),
            })
            .collect()
    }

    /// Constraint values at `x` given the trace
    /// values `r` at `x` and `n` at the next point.
    pub fn evaluate_constraints_at(&self, x: BE, r: &[BE], n: &[BE], h: &[BE]) -> Result<Vec<BE>> {
        let k = self.static_values_at(x, h)?;
        self.module.evaluate(r, n, &k)
    }
}
