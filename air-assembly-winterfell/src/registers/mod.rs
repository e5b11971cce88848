// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Runtime evaluators for static registers.

pub mod sequence;

pub use sequence::{PowerSequence, PrngSequence, Sequence};

use crate::domain::interpolate_columns;
use crate::error::{Error, Result};
use crate::field::BaseElement as BE;
use crate::options::Backend;
use air_assembly_compiler::{CycleSource, StaticRegister, StaticRegisterSet};
use winterfell::math::{FieldElement, StarkField, polynom};

/// Cycle values and the polynomial
/// interpolating them over one period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CyclicColumn {
    values: Vec<BE>,
    poly: Vec<BE>,
}

impl CyclicColumn {
    pub fn new(source: &CycleSource) -> Result<Self> {
        let values = match source {
            CycleSource::Values(vs) => vs
                .iter()
                .map(|&v| field_element(v))
                .collect::<Result<Vec<_>>>()?,
            CycleSource::Prng { seed, count } => PrngSequence::new(seed.clone()).take(*count),
            CycleSource::Power { base, count } => {
                PowerSequence::new(field_element(*base)?).take(*count)
            }
        };

        let poly = interpolate_columns(std::slice::from_ref(&values), Backend::Serial)
            .pop()
            .unwrap_or_default();

        Ok(Self { values, poly })
    }

    pub fn period(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[BE] {
        &self.values
    }

    pub fn value_at(&self, step: usize) -> BE {
        self.values[step % self.values.len()]
    }

    /// Value at an arbitrary point `x` of a trace of
    /// `trace_length` rows: `P(x^(trace_length / period))`.
    pub fn evaluate_at(&self, x: BE, trace_length: usize) -> BE {
        let cycles = (trace_length / self.period()) as u128;
        polynom::eval(&self.poly, x.exp(cycles))
    }
}

fn field_element(v: u128) -> Result<BE> {
    if v >= BE::MODULUS {
        return Err(Error::InvalidInput(format!("{v} is outside the field")));
    }

    Ok(BE::new(v))
}

/// How one static register obtains its values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StaticEvaluator {
    /// Position among the input registers.
    Input { input: usize, secret: bool },
    Cyclic(CyclicColumn),
    Mask {
        source: usize,
        value: BE,
        secret: bool,
    },
}

impl StaticEvaluator {
    pub fn from_registers(set: &StaticRegisterSet) -> Result<Vec<Self>> {
        let mut inputs = 0;
        set.iter()
            .enumerate()
            .map(|(i, r)| {
                Ok(match r {
                    StaticRegister::Input(ir) => {
                        inputs += 1;
                        StaticEvaluator::Input {
                            input: inputs - 1,
                            secret: ir.secret,
                        }
                    }
                    StaticRegister::Cyclic(c) => {
                        StaticEvaluator::Cyclic(CyclicColumn::new(&c.source)?)
                    }
                    StaticRegister::Mask(m) => StaticEvaluator::Mask {
                        source: m.source,
                        value: field_element(m.value)?,
                        secret: set.is_secret(i),
                    },
                })
            })
            .collect()
    }

    pub fn is_secret(&self) -> bool {
        match self {
            StaticEvaluator::Input { secret, .. } | StaticEvaluator::Mask { secret, .. } => {
                *secret
            }
            StaticEvaluator::Cyclic(_) => false,
        }
    }
}

/// Expand every static register over the trace.
///
/// `inputs` holds the expanded column of each input
/// register, or `None` where the values are unknown;
/// masks over unknown sources stay unknown.
pub(crate) fn static_columns(
    evaluators: &[StaticEvaluator],
    mut inputs: Vec<Option<Vec<BE>>>,
    trace_length: usize,
) -> Vec<Option<Vec<BE>>> {
    let mut columns: Vec<Option<Vec<BE>>> = Vec::with_capacity(evaluators.len());

    for e in evaluators {
        let col = match e {
            StaticEvaluator::Input { input, .. } => inputs.get_mut(*input).and_then(Option::take),
            StaticEvaluator::Cyclic(c) => Some((0..trace_length).map(|s| c.value_at(s)).collect()),
            StaticEvaluator::Mask { source, value, .. } => {
                columns.get(*source).cloned().flatten().map(|src| {
                    src.into_iter()
                        .map(|v| if v == *value { BE::ONE } else { BE::ZERO })
                        .collect()
                })
            }
        };

        columns.push(col);
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_column_evaluates_periodically() {
        let c = CyclicColumn::new(&CycleSource::Values(vec![5, 6, 7, 8])).unwrap();
        let n: usize = 16;
        let g = BE::get_root_of_unity(n.ilog2());

        for step in 0..n {
            let x = g.exp(step as u128);
            assert_eq!(c.evaluate_at(x, n), c.value_at(step), "step {step}");
        }
    }

    #[test]
    fn masks_follow_their_source() {
        let evaluators = vec![
            StaticEvaluator::Cyclic(CyclicColumn::new(&CycleSource::Values(vec![1, 0])).unwrap()),
            StaticEvaluator::Mask {
                source: 0,
                value: BE::ONE,
                secret: false,
            },
            StaticEvaluator::Input {
                input: 0,
                secret: true,
            },
            StaticEvaluator::Mask {
                source: 2,
                value: BE::ZERO,
                secret: true,
            },
        ];

        let cols = static_columns(&evaluators, vec![None], 8);

        let mask = cols[1].as_ref().unwrap();
        assert_eq!(mask[0], BE::ONE);
        assert_eq!(mask[1], BE::ZERO);
        assert!(cols[2].is_none());
        assert!(cols[3].is_none());
    }

    #[test]
    fn power_cycles_are_generated() {
        let c = CyclicColumn::new(&CycleSource::Power { base: 2, count: 4 }).unwrap();
        assert_eq!(c.values(), &[1u128, 2, 4, 8].map(BE::new));
    }
}
