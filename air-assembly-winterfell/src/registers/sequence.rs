// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Generated value sequences for cyclic registers.

use crate::field::BaseElement as BE;
use winterfell::math::{FieldElement, StarkField, get_power_series};

/// Deterministic sequence indexed from zero.
pub trait Sequence {
    fn value_at(&self, i: usize) -> BE;

    fn take(&self, count: usize) -> Vec<BE> {
        (0..count).map(|i| self.value_at(i)).collect()
    }
}

/// `base^i`
#[derive(Clone, Copy, Debug)]
pub struct PowerSequence {
    base: BE,
}

impl PowerSequence {
    pub fn new(base: BE) -> Self {
        Self { base }
    }
}

impl Sequence for PowerSequence {
    fn value_at(&self, i: usize) -> BE {
        self.base.exp(i as u128)
    }

    fn take(&self, count: usize) -> Vec<BE> {
        get_power_series(self.base, count)
    }
}

/// First 16 bytes of `blake3(seed || le64(i))`
/// as a little-endian integer reduced into the field.
#[derive(Clone, Debug)]
pub struct PrngSequence {
    seed: Vec<u8>,
}

impl PrngSequence {
    pub fn new(seed: impl Into<Vec<u8>>) -> Self {
        Self { seed: seed.into() }
    }
}

impl Sequence for PrngSequence {
    fn value_at(&self, i: usize) -> BE {
        let mut h = blake3::Hasher::new();
        h.update(&self.seed);
        h.update(&(i as u64).to_le_bytes());

        let digest = h.finalize();
        let mut lo = [0u8; 16];
        lo.copy_from_slice(&digest.as_bytes()[..16]);

        BE::new(u128::from_le_bytes(lo) % BE::MODULUS)
    }
}
