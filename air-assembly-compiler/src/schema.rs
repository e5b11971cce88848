// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! The compiled, immutable [`AirSchema`].
//!
//! A [`SchemaBuilder`] collects the parsed parts of a
//! module; [`SchemaBuilder::build`] compresses the bodies,
//! infers constraint degrees and checks [`StarkLimits`]
//! before handing out the schema.

use crate::compressor;
use crate::degree::{self, Degree, DegreeAnalyzer};
use crate::error::{CompileError, Error};
use crate::expr::LiteralValue;
use crate::limits::{CompileOptions, StarkLimits};
use crate::procedure::{FunctionDef, Procedure};
use crate::registers::{StaticRegister, StaticRegisterSet};
use serde::Serialize;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub modulus: u128,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ConstraintDescriptor {
    pub degree: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AirSchema {
    field: FieldDescriptor,
    constants: Vec<LiteralValue>,
    functions: Vec<FunctionDef>,
    static_registers: StaticRegisterSet,
    transition: Procedure,
    evaluation: Procedure,
    transition_degree: Degree,
    constraints: Vec<ConstraintDescriptor>,
    max_constraint_degree: u32,
}

impl AirSchema {
    pub fn field(&self) -> FieldDescriptor {
        self.field
    }

    pub fn constants(&self) -> &[LiteralValue] {
        &self.constants
    }

    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    pub fn static_registers(&self) -> &StaticRegisterSet {
        &self.static_registers
    }

    pub fn transition(&self) -> &Procedure {
        &self.transition
    }

    pub fn evaluation(&self) -> &Procedure {
        &self.evaluation
    }

    /// Per-register degree of the transition function.
    pub fn transition_degree(&self) -> &Degree {
        &self.transition_degree
    }

    pub fn constraints(&self) -> &[ConstraintDescriptor] {
        &self.constraints
    }

    pub fn max_constraint_degree(&self) -> u32 {
        self.max_constraint_degree
    }

    pub fn trace_register_count(&self) -> usize {
        self.transition.width()
    }

    pub fn static_register_count(&self) -> usize {
        self.static_registers.len()
    }

    pub fn composition_factor(&self) -> usize {
        degree::composition_factor(self.max_constraint_degree)
    }

    /// Check the schema against `limits`,
    /// reporting every violation found.
    pub fn validate_limits(&self, limits: &StarkLimits) -> Result<(), CompileError> {
        let mut errors = Vec::new();

        if self.trace_register_count() > limits.max_trace_registers {
            errors.push(Error::LimitExceeded(format!(
                "{} trace registers exceed the limit of {}",
                self.trace_register_count(),
                limits.max_trace_registers
            )));
        }

        if self.static_register_count() > limits.max_static_registers {
            errors.push(Error::LimitExceeded(format!(
                "{} static registers exceed the limit of {}",
                self.static_register_count(),
                limits.max_static_registers
            )));
        }

        if self.constraints.len() > limits.max_constraint_count {
            errors.push(Error::LimitExceeded(format!(
                "{} constraints exceed the limit of {}",
                self.constraints.len(),
                limits.max_constraint_count
            )));
        }

        for (i, r) in self.static_registers.iter().enumerate() {
            let span = match r {
                StaticRegister::Cyclic(c) => c.period() as u64,
                StaticRegister::Input(ir) => ir.steps.unwrap_or(0),
                StaticRegister::Mask(_) => 0,
            };

            if span > limits.max_trace_length as u64 {
                errors.push(Error::LimitExceeded(format!(
                    "static register {i} spans {span} steps, over the trace length limit of {}",
                    limits.max_trace_length
                )));
            }
        }

        if self.max_constraint_degree > limits.max_constraint_degree {
            let worst = self
                .constraints
                .iter()
                .position(|c| c.degree == self.max_constraint_degree)
                .unwrap_or(0);

            errors.push(Error::DegreeLimitExceeded(format!(
                "constraint {worst} has degree {} over the limit of {}",
                self.max_constraint_degree, limits.max_constraint_degree
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CompileError::new(errors))
        }
    }

    /// blake3 hash of the canonical rendering.
    pub fn commitment(&self) -> [u8; 32] {
        blake3::hash(self.to_string().as_bytes()).into()
    }
}

#[derive(Debug)]
pub struct SchemaBuilder {
    field: FieldDescriptor,
    constants: Vec<LiteralValue>,
    functions: Vec<FunctionDef>,
    static_registers: StaticRegisterSet,
    transition: Option<Procedure>,
    evaluation: Option<Procedure>,
}

impl SchemaBuilder {
    pub fn new(field: FieldDescriptor) -> Self {
        Self {
            field,
            constants: Vec::new(),
            functions: Vec::new(),
            static_registers: StaticRegisterSet::default(),
            transition: None,
            evaluation: None,
        }
    }

    pub fn field(&self) -> FieldDescriptor {
        self.field
    }

    pub fn constants(&self) -> &[LiteralValue] {
        &self.constants
    }

    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    pub fn add_constant(&mut self, value: LiteralValue) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    pub fn add_function(&mut self, function: FunctionDef) -> usize {
        self.functions.push(function);
        self.functions.len() - 1
    }

    pub fn set_static_registers(&mut self, registers: StaticRegisterSet) {
        self.static_registers = registers;
    }

    pub fn set_transition(&mut self, procedure: Procedure) {
        self.transition = Some(procedure);
    }

    pub fn set_evaluation(&mut self, procedure: Procedure) {
        self.evaluation = Some(procedure);
    }

    pub fn build(self, options: &CompileOptions) -> Result<AirSchema, CompileError> {
        let (Some(transition), Some(evaluation)) = (self.transition, self.evaluation) else {
            return Err(Error::UndefinedReference(
                "module must define transition and evaluation procedures".into(),
            )
            .into());
        };

        let copts = &options.compressor;
        let functions: Vec<FunctionDef> = self
            .functions
            .iter()
            .map(|f| f.with_body(compressor::compress(f.body(), copts)))
            .collect();
        let transition = transition.with_body(compressor::compress(transition.body(), copts));
        let evaluation = evaluation.with_body(compressor::compress(evaluation.body(), copts));

        let analyzer = DegreeAnalyzer::new(&self.constants, &functions, options.inverse_cost());
        let transition_degree = analyzer.analyze_body(transition.body(), &[])?;
        let evaluation_degree = analyzer.analyze_body(evaluation.body(), &[])?;

        let constraints: Vec<ConstraintDescriptor> = evaluation_degree
            .elements()
            .into_iter()
            .map(|degree| ConstraintDescriptor { degree })
            .collect();
        let max_constraint_degree = evaluation_degree.max();

        debug!(
            constraints = constraints.len(),
            max_constraint_degree,
            transition_max = transition_degree.max(),
            "degrees inferred"
        );

        let schema = AirSchema {
            field: self.field,
            constants: self.constants,
            functions,
            static_registers: self.static_registers,
            transition,
            evaluation,
            transition_degree,
            constraints,
            max_constraint_degree,
        };

        schema.validate_limits(&options.limits)?;

        Ok(schema)
    }
}
