// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! AirAssembly compiler and STARK runtime generator.
//!
//! Source text is compiled into an [`AirSchema`] by
//! [`compile`], then lowered by [`instantiate`] into an
//! [`AirModule`] which generates execution traces and
//! evaluates transition constraints.
//!
//! ```no_run
//! use air_assembly::{CompileOptions, InstantiateOptions, compile, instantiate};
//!
//! # fn run(src: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let schema = compile(src, &CompileOptions::default())?;
//! let module = instantiate(&schema, &InstantiateOptions::default())?;
//! let proof = module.init_proof(&[])?;
//! let trace = proof.generate_execution_trace()?;
//! # let _ = trace;
//! # Ok(())
//! # }
//! ```

pub mod logging;

pub use air_assembly_compiler as compiler;
pub use air_assembly_winterfell as runtime;

pub use air_assembly_compiler::{
    AirSchema, AnalysisReport, CompileError, CompileOptions, CompressorOptions, StarkLimits,
    analyze, compile, compile_bytes,
};
pub use air_assembly_winterfell::{
    AirModule, Backend, BaseElement, InputTree, InstantiateOptions, ProofObject,
    VerificationObject, instantiate,
};
