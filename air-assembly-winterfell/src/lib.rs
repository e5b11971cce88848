// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Winterfell-backed runtime for AirAssembly schemas.
//!
//! [`instantiate`] lowers a compiled [`AirSchema`] into an
//! [`AirModule`] over the AirAssembly prime field. A module
//! generates execution traces, extends them over larger
//! domains and evaluates transition constraints, either
//! across the composition domain ([`ProofObject`]) or at a
//! single point ([`VerificationObject`]).
//!
//! [`AirSchema`]: air_assembly_compiler::AirSchema

pub mod domain;
pub mod error;
pub mod field;
pub mod inputs;
pub mod module;
pub mod options;
pub mod proof;
pub mod registers;
pub mod value;
pub mod verify;

mod lower;

pub use domain::Domain;
pub use error::{Error, Result};
pub use inputs::{InputDescriptor, InputTree};
pub use module::{AirModule, instantiate};
pub use options::{Backend, InstantiateOptions};
pub use proof::ProofObject;
pub use value::Value;
pub use verify::VerificationObject;

pub use field::BaseElement;
