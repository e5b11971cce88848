// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Prover-side context: execution trace generation,
//! low-degree extension and constraint composition.

use crate::domain::{Domain, evaluate_columns, interpolate_columns};
use crate::error::{Error, Result};
use crate::field::BaseElement as BE;
use crate::module::AirModule;
use crate::options::Backend;
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, instrument};
use winterfell::math::FieldElement;
use winterfell::{Trace, TraceTable};

pub struct ProofObject<'a> {
    module: &'a AirModule,
    execution: Domain,
    evaluation: Domain,
    composition: Domain,
    /// Static register columns over the execution domain.
    statics: Vec<Vec<BE>>,
}

impl fmt::Debug for ProofObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofObject")
            .field("module", self.module)
            .field("trace_length", &self.execution.size())
            .field("evaluation_size", &self.evaluation.size())
            .field("composition_size", &self.composition.size())
            .field("static_register_count", &self.statics.len())
            .finish_non_exhaustive()
    }
}

impl<'a> ProofObject<'a> {
    pub(crate) fn new(
        module: &'a AirModule,
        trace_length: usize,
        statics: Vec<Vec<BE>>,
    ) -> Result<Self> {
        Ok(Self {
            module,
            execution: Domain::new(trace_length)?,
            evaluation: Domain::new(trace_length * module.extension_factor())?,
            composition: Domain::new(trace_length * module.composition_factor())?,
            statics,
        })
    }

    pub fn module(&self) -> &AirModule {
        self.module
    }

    pub fn trace_length(&self) -> usize {
        self.execution.size()
    }

    pub fn execution_domain(&self) -> &Domain {
        &self.execution
    }

    pub fn evaluation_domain(&self) -> &Domain {
        &self.evaluation
    }

    pub fn composition_domain(&self) -> &Domain {
        &self.composition
    }

    /// Values of all static registers at `step`.
    pub fn static_values_at(&self, step: usize) -> Vec<BE> {
        let step = step % self.trace_length();
        self.statics.iter().map(|col| col[step]).collect()
    }

    /// Static register columns over the execution domain.
    pub fn static_columns(&self) -> &[Vec<BE>] {
        &self.statics
    }

    /// Run the transition function from the zero state.
    #[instrument(level = "debug", skip(self))]
    pub fn generate_execution_trace(&self) -> Result<TraceTable<BE>> {
        let width = self.module.trace_register_count();
        let n = self.trace_length();

        let mut trace = TraceTable::new(width, n);
        let mut row = vec![BE::ZERO; width];
        for step in 0..n {
            for (col, &v) in row.iter().enumerate() {
                trace.set(col, step, v);
            }

            if step + 1 < n {
                row = self.module.transition(&row, &self.static_values_at(step))?;
            }
        }

        debug!(width, length = trace.length(), "execution trace generated");

        Ok(trace)
    }

    /// Coefficients of each trace column's polynomial.
    pub fn interpolate_trace(&self, trace: &TraceTable<BE>) -> Result<Vec<Vec<BE>>> {
        if trace.length() != self.trace_length() || trace.width() != self.module.trace_register_count()
        {
            return Err(Error::Shape(format!(
                "trace is {}x{}, expected {}x{}",
                trace.width(),
                trace.length(),
                self.module.trace_register_count(),
                self.trace_length()
            )));
        }

        let columns: Vec<Vec<BE>> = (0..trace.width())
            .map(|c| (0..trace.length()).map(|r| trace.get(c, r)).collect())
            .collect();

        Ok(interpolate_columns(&columns, self.module.backend()))
    }

    /// Evaluations of the trace polynomials
    /// over the evaluation domain.
    pub fn evaluate_trace_polynomials(&self, polys: &[Vec<BE>]) -> Result<Vec<Vec<BE>>> {
        self.check_polys(polys)?;
        Ok(evaluate_columns(
            polys,
            self.evaluation.size(),
            self.module.backend(),
        ))
    }

    /// Low-degree extension of every secret static
    /// register, in [`AirModule::secret_registers`] order.
    pub fn secret_register_traces(&self) -> Vec<Vec<BE>> {
        let secret: Vec<Vec<BE>> = self
            .module
            .secret_registers()
            .iter()
            .map(|&i| self.statics[i].clone())
            .collect();

        let polys = interpolate_columns(&secret, self.module.backend());
        evaluate_columns(&polys, self.evaluation.size(), self.module.backend())
    }

    /// Constraint values over the composition domain, one
    /// column per constraint. The next-row value of point
    /// `j` is read at `j + composition_factor`.
    #[instrument(level = "debug", skip(self, polys))]
    pub fn evaluate_transition_constraints(&self, polys: &[Vec<BE>]) -> Result<Vec<Vec<BE>>> {
        self.check_polys(polys)?;

        let backend = self.module.backend();
        let m = self.composition.size();
        let cf = self.module.composition_factor();

        let trace = evaluate_columns(polys, m, backend);
        let statics = evaluate_columns(
            &interpolate_columns(&self.statics, backend),
            m,
            backend,
        );

        let point = |j: usize| -> Result<Vec<BE>> {
            let next = (j + cf) % m;
            let r: Vec<BE> = trace.iter().map(|c| c[j]).collect();
            let n: Vec<BE> = trace.iter().map(|c| c[next]).collect();
            let k: Vec<BE> = statics.iter().map(|c| c[j]).collect();

            self.module.evaluate(&r, &n, &k)
        };

        let rows = match backend {
            Backend::Serial => (0..m).map(point).collect::<Result<Vec<_>>>()?,
            Backend::Parallel => (0..m).into_par_iter().map(point).collect::<Result<Vec<_>>>()?,
        };

        let width = self.module.constraint_count();
        let columns = (0..width)
            .map(|q| rows.iter().map(|row| row[q]).collect())
            .collect();

        debug!(points = m, constraints = width, "constraints evaluated");

        Ok(columns)
    }

    fn check_polys(&self, polys: &[Vec<BE>]) -> Result<()> {
        let width = self.module.trace_register_count();
        let n = self.trace_length();
        if polys.len() != width || polys.iter().any(|p| p.len() != n) {
            return Err(Error::Shape(format!(
                "expected {width} trace polynomials of {n} coefficients"
            )));
        }

        Ok(())
    }
}
