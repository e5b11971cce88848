// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Executable modules built from compiled schemas.

use crate::error::{Error, Result};
use crate::field::BaseElement as BE;
use crate::inputs::{InputDescriptor, InputTree, Layout};
use crate::lower::{CompiledBody, lower_body};
use crate::options::{Backend, InstantiateOptions};
use crate::proof::ProofObject;
use crate::registers::{StaticEvaluator, static_columns};
use crate::verify::VerificationObject;
use air_assembly_compiler::{AirSchema, StarkLimits};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use winterfell::math::StarkField;

/// A schema lowered over the AirAssembly prime field.
///
/// Modules are immutable; proof and verification
/// contexts borrow them per invocation.
pub struct AirModule {
    transition: CompiledBody,
    evaluation: CompiledBody,
    statics: Vec<StaticEvaluator>,
    inputs: Vec<InputDescriptor>,
    secret_registers: Vec<usize>,
    trace_register_count: usize,
    constraint_count: usize,
    max_constraint_degree: u32,
    composition_factor: usize,
    extension_factor: usize,
    limits: StarkLimits,
    backend: Backend,
}

impl fmt::Debug for AirModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirModule")
            .field("trace_register_count", &self.trace_register_count)
            .field("static_register_count", &self.statics.len())
            .field("constraint_count", &self.constraint_count)
            .field("composition_factor", &self.composition_factor)
            .field("extension_factor", &self.extension_factor)
            .finish_non_exhaustive()
    }
}

/// Lower `schema` into an [`AirModule`].
#[instrument(level = "info", skip(schema, options))]
pub fn instantiate(schema: &AirSchema, options: &InstantiateOptions) -> Result<AirModule> {
    let modulus = schema.field().modulus;
    if modulus != BE::MODULUS {
        return Err(Error::UnsupportedField(modulus));
    }

    schema
        .validate_limits(&options.limits)
        .map_err(|e| Error::LimitExceeded(e.to_string()))?;

    let constants = schema.constants();
    let mut functions: Vec<Arc<CompiledBody>> = Vec::with_capacity(schema.functions().len());
    for f in schema.functions() {
        let body = lower_body(f.body(), constants, &functions)?;
        functions.push(Arc::new(body));
    }

    let transition = lower_body(schema.transition().body(), constants, &functions)?;
    let evaluation = lower_body(schema.evaluation().body(), constants, &functions)?;

    let registers = schema.static_registers();
    let statics = StaticEvaluator::from_registers(registers)?;
    let inputs = InputDescriptor::from_registers(registers);

    let composition_factor = schema.composition_factor();
    let extension_factor = options.resolve_extension_factor(composition_factor)?;

    let module = AirModule {
        transition,
        evaluation,
        statics,
        inputs,
        secret_registers: registers.secret_registers(),
        trace_register_count: schema.trace_register_count(),
        constraint_count: schema.constraints().len(),
        max_constraint_degree: schema.max_constraint_degree(),
        composition_factor,
        extension_factor,
        limits: options.limits,
        backend: options.backend,
    };

    info!(
        trace_registers = module.trace_register_count,
        static_registers = module.statics.len(),
        constraints = module.constraint_count,
        composition_factor,
        extension_factor,
        "module instantiated"
    );

    Ok(module)
}

impl AirModule {
    pub fn trace_register_count(&self) -> usize {
        self.trace_register_count
    }

    pub fn static_register_count(&self) -> usize {
        self.statics.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraint_count
    }

    pub fn max_constraint_degree(&self) -> u32 {
        self.max_constraint_degree
    }

    pub fn composition_factor(&self) -> usize {
        self.composition_factor
    }

    pub fn extension_factor(&self) -> usize {
        self.extension_factor
    }

    pub fn input_descriptors(&self) -> &[InputDescriptor] {
        &self.inputs
    }

    /// Static register indices of secret registers, in the
    /// order their values are expected by verification.
    pub fn secret_registers(&self) -> &[usize] {
        &self.secret_registers
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub(crate) fn statics(&self) -> &[StaticEvaluator] {
        &self.statics
    }

    /// Next trace row from row `r` and static values `k`.
    pub fn transition(&self, r: &[BE], k: &[BE]) -> Result<Vec<BE>> {
        self.check_row("current row", r)?;
        self.check_statics(k)?;

        let next = self.transition.run(&[r], k, &[])?.into_vector()?;
        self.check_width("transition result", next.len(), self.trace_register_count)?;

        Ok(next)
    }

    /// Constraint values for rows `r` and `n` under
    /// static values `k`; all zero on a valid step.
    pub fn evaluate(&self, r: &[BE], n: &[BE], k: &[BE]) -> Result<Vec<BE>> {
        self.check_row("current row", r)?;
        self.check_row("next row", n)?;
        self.check_statics(k)?;

        let q = self.evaluation.run(&[r, n], k, &[])?.into_vector()?;
        self.check_width("evaluation result", q.len(), self.constraint_count)?;

        Ok(q)
    }

    /// Prepare trace generation for one set of inputs,
    /// one tree per input register.
    #[instrument(level = "info", skip(self, inputs))]
    pub fn init_proof(&self, inputs: &[InputTree]) -> Result<ProofObject<'_>> {
        if inputs.len() != self.inputs.len() {
            return Err(Error::InvalidInput(format!(
                "expected {} input trees (got {})",
                self.inputs.len(),
                inputs.len()
            )));
        }

        let mut shapes = Vec::with_capacity(inputs.len());
        let mut values = Vec::with_capacity(inputs.len());
        for (d, tree) in self.inputs.iter().zip(inputs) {
            let (shape, v) = d.values(tree)?;
            shapes.push(shape);
            values.push(v);
        }

        let layout = self.layout(&shapes)?;
        let input_columns = values
            .iter()
            .enumerate()
            .map(|(i, v)| Some(layout.column(i, v)))
            .collect();

        let columns = static_columns(&self.statics, input_columns, layout.trace_length())
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::Shape("static register column left unresolved".into()))?;

        debug!(
            trace_length = layout.trace_length(),
            static_registers = columns.len(),
            "proof context ready"
        );

        ProofObject::new(self, layout.trace_length(), columns)
    }

    /// Prepare point evaluation from the shapes of all input
    /// registers and the trees of the public ones, in order.
    #[instrument(level = "info", skip(self, input_shapes, public_inputs))]
    pub fn init_verification(
        &self,
        input_shapes: &[Vec<usize>],
        public_inputs: &[InputTree],
    ) -> Result<VerificationObject<'_>> {
        let public = self.inputs.iter().filter(|d| !d.secret).count();
        if public_inputs.len() != public {
            return Err(Error::InvalidInput(format!(
                "expected {public} public input trees (got {})",
                public_inputs.len()
            )));
        }

        let layout = self.layout(input_shapes)?;

        let mut trees = public_inputs.iter();
        let mut input_columns = Vec::with_capacity(self.inputs.len());
        for (i, d) in self.inputs.iter().enumerate() {
            if d.secret {
                input_columns.push(None);
                continue;
            }

            let tree = trees
                .next()
                .ok_or_else(|| Error::InvalidInput("missing public input".into()))?;
            let (shape, values) = d.values(tree)?;
            if shape != input_shapes[i] {
                return Err(Error::InvalidInput(format!(
                    "public input of register {} does not match its declared shape",
                    d.register
                )));
            }

            input_columns.push(Some(layout.column(i, &values)));
        }

        let columns = static_columns(&self.statics, input_columns, layout.trace_length());

        debug!(
            trace_length = layout.trace_length(),
            secret_registers = self.secret_registers.len(),
            "verification context ready"
        );

        VerificationObject::new(self, layout.trace_length(), columns)
    }

    fn layout(&self, shapes: &[Vec<usize>]) -> Result<Layout> {
        let max_period = self
            .statics
            .iter()
            .filter_map(|s| match s {
                StaticEvaluator::Cyclic(c) => Some(c.period()),
                _ => None,
            })
            .max()
            .unwrap_or(0);

        Layout::new(&self.inputs, shapes, max_period, &self.limits)
    }

    fn check_row(&self, what: &str, row: &[BE]) -> Result<()> {
        self.check_width(what, row.len(), self.trace_register_count)
    }

    fn check_statics(&self, k: &[BE]) -> Result<()> {
        self.check_width("static values", k.len(), self.statics.len())
    }

    fn check_width(&self, what: &str, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(Error::Shape(format!(
                "{what} has {got} elements, expected {expected}"
            )));
        }

        Ok(())
    }
}
