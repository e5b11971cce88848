// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

use crate::error::{Error, Result};
use air_assembly_compiler::StarkLimits;

pub const MAX_EXTENSION_FACTOR: usize = 128;

/// How column-wide work (interpolation, extension,
/// constraint evaluation) is scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    Serial,
    #[default]
    Parallel,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstantiateOptions {
    pub limits: StarkLimits,
    pub backend: Backend,
    /// Blowup of the evaluation domain; defaults
    /// to twice the composition factor.
    pub extension_factor: Option<usize>,
}

impl InstantiateOptions {
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_extension_factor(mut self, factor: usize) -> Self {
        self.extension_factor = Some(factor);
        self
    }

    pub(crate) fn resolve_extension_factor(&self, composition_factor: usize) -> Result<usize> {
        let min = 2 * composition_factor;
        let Some(ef) = self.extension_factor else {
            return Ok(min);
        };

        if !ef.is_power_of_two() || ef < min || ef > MAX_EXTENSION_FACTOR {
            return Err(Error::InvalidOptions(format!(
                "extension factor must be a power of two in [{min}, {MAX_EXTENSION_FACTOR}] (got {ef})"
            )));
        }

        Ok(ef)
    }
}
