// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

use crate::compressor::CompressorOptions;

/// Upper bounds a schema must respect
/// to be usable by a STARK prover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StarkLimits {
    pub max_trace_length: usize,
    pub max_trace_registers: usize,
    pub max_static_registers: usize,
    pub max_constraint_count: usize,
    pub max_constraint_degree: u32,
}

impl Default for StarkLimits {
    fn default() -> Self {
        Self {
            max_trace_length: 1 << 20,
            max_trace_registers: 64,
            max_static_registers: 64,
            max_constraint_count: 1024,
            max_constraint_degree: 16,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub limits: StarkLimits,
    pub compressor: CompressorOptions,
    /// Degree charged for dividing by or inverting a
    /// non-constant operand; `None` means the limit's
    /// `max_constraint_degree`.
    pub inverse_degree_cost: Option<u32>,
}

impl CompileOptions {
    pub fn with_limits(mut self, limits: StarkLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_compressor(mut self, compressor: CompressorOptions) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn inverse_cost(&self) -> u32 {
        self.inverse_degree_cost
            .unwrap_or(self.limits.max_constraint_degree)
    }
}
