// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Multiplicative subgroups and column-wise FFT helpers.

use crate::error::{Error, Result};
use crate::field::BaseElement as BE;
use crate::options::Backend;
use rayon::prelude::*;
use winterfell::math::{FieldElement, StarkField, fft, get_power_series};

/// The subgroup of size `size` generated by
/// the primitive `size`-th root of unity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Domain {
    size: usize,
    generator: BE,
}

impl Domain {
    /// Fails unless `size` is a power of two
    /// no larger than `2^TWO_ADICITY`.
    pub fn new(size: usize) -> Result<Self> {
        if !size.is_power_of_two() || size.ilog2() > BE::TWO_ADICITY {
            return Err(Error::Shape(format!("no subgroup of size {size}")));
        }

        let generator = match size.ilog2() {
            0 => BE::ONE,
            log => BE::get_root_of_unity(log),
        };

        Ok(Self { size, generator })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn generator(&self) -> BE {
        self.generator
    }

    pub fn point(&self, i: usize) -> BE {
        self.generator.exp((i % self.size) as u128)
    }

    pub fn points(&self) -> Vec<BE> {
        get_power_series(self.generator, self.size)
    }
}

/// Coefficients of the polynomials taking each
/// column's values over the subgroup of its length.
pub(crate) fn interpolate_columns(columns: &[Vec<BE>], backend: Backend) -> Vec<Vec<BE>> {
    let Some(n) = columns.first().map(Vec::len) else {
        return Vec::new();
    };

    if n < 2 {
        return columns.to_vec();
    }

    let inv_twiddles = fft::get_inv_twiddles::<BE>(n);
    let run = |col: &Vec<BE>| {
        let mut p = col.clone();
        fft::interpolate_poly(&mut p, &inv_twiddles);
        p
    };

    match backend {
        Backend::Serial => columns.iter().map(run).collect(),
        Backend::Parallel => columns.par_iter().map(run).collect(),
    }
}

/// Evaluate each polynomial over the subgroup of `size`,
/// which must be at least the polynomial length.
pub(crate) fn evaluate_columns(polys: &[Vec<BE>], size: usize, backend: Backend) -> Vec<Vec<BE>> {
    if size < 2 {
        return polys
            .iter()
            .map(|p| vec![p.first().copied().unwrap_or(BE::ZERO)])
            .collect();
    }

    let twiddles = fft::get_twiddles::<BE>(size);
    let run = |p: &Vec<BE>| {
        let mut evals = p.clone();
        evals.resize(size, BE::ZERO);
        fft::evaluate_poly(&mut evals, &twiddles);
        evals
    };

    match backend {
        Backend::Serial => polys.iter().map(run).collect(),
        Backend::Parallel => polys.par_iter().map(run).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winterfell::math::polynom;

    #[test]
    fn generator_has_exact_order() {
        let d = Domain::new(16).unwrap();
        let g = d.generator();

        assert_eq!(g.exp(16), BE::ONE);
        assert_ne!(g.exp(8), BE::ONE);
        assert_eq!(d.points().len(), 16);
        assert_eq!(d.point(17), g);
    }

    #[test]
    fn interpolation_round_trips_through_extension() {
        let col: Vec<BE> = (1..=8u128).map(|v| BE::new(v * v)).collect();
        let polys = interpolate_columns(std::slice::from_ref(&col), Backend::Serial);

        let d = Domain::new(8).unwrap();
        for (i, x) in d.points().into_iter().enumerate() {
            assert_eq!(polynom::eval(&polys[0], x), col[i]);
        }

        // every 4th point of the 32-subgroup lies in the 8-subgroup
        let lde = evaluate_columns(&polys, 32, Backend::Parallel);
        for i in 0..8 {
            assert_eq!(lde[0][4 * i], col[i]);
        }
    }

    #[test]
    fn domain_sizes_are_checked() {
        assert!(matches!(Domain::new(0), Err(Error::Shape(_))));
        assert!(matches!(Domain::new(24), Err(Error::Shape(_))));
        assert!(matches!(Domain::new(1 << 33), Err(Error::Shape(_))));

        let one = Domain::new(1).unwrap();
        assert_eq!(one.generator(), BE::ONE);
        assert_eq!(one.points(), vec![BE::ONE]);
    }
}
