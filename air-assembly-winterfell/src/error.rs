// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unsupported field: modulus {0} is not the backend field")]
    UnsupportedField(u128),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
}

pub type Result<T> = std::result::Result<T, Error>;
