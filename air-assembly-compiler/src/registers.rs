// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Static register declarations.
//!
//! Input registers form a forest of nested loops: a
//! register with a `parent` iterates once per value of
//! that parent, and leaves (registers declared with
//! `steps`) hold each value for `steps` trace rows.
//! Cyclic registers repeat a power-of-two sequence;
//! mask registers flag rows where another register
//! holds a given value.

use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputRegister {
    pub secret: bool,
    pub binary: bool,
    /// `scalar` binding: exactly one value.
    pub scalar: bool,
    pub rank: usize,
    pub parent: Option<usize>,
    /// Present on leaves only.
    pub steps: Option<u64>,
}

impl InputRegister {
    pub fn is_leaf(&self) -> bool {
        self.steps.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleSource {
    Values(Vec<u128>),
    /// blake3-seeded pseudo-random stream.
    Prng { seed: Vec<u8>, count: usize },
    /// `base^0 .. base^(count-1)`
    Power { base: u128, count: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CyclicRegister {
    pub source: CycleSource,
}

impl CyclicRegister {
    pub fn period(&self) -> usize {
        match &self.source {
            CycleSource::Values(v) => v.len(),
            CycleSource::Prng { count, .. } | CycleSource::Power { count, .. } => *count,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskRegister {
    pub source: usize,
    pub value: u128,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StaticRegister {
    Input(InputRegister),
    Cyclic(CyclicRegister),
    Mask(MaskRegister),
}

impl StaticRegister {
    pub fn kind_name(&self) -> &'static str {
        match self {
            StaticRegister::Input(_) => "input",
            StaticRegister::Cyclic(_) => "cycle",
            StaticRegister::Mask(_) => "mask",
        }
    }

    pub fn as_input(&self) -> Option<&InputRegister> {
        match self {
            StaticRegister::Input(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticRegisterSet {
    registers: Vec<StaticRegister>,
}

impl StaticRegisterSet {
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StaticRegister> {
        self.registers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StaticRegister> {
        self.registers.iter()
    }

    /// Input registers with their static register index.
    pub fn inputs(&self) -> impl Iterator<Item = (usize, &InputRegister)> {
        self.registers
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_input().map(|ir| (i, ir)))
    }

    pub fn input_count(&self) -> usize {
        self.inputs().count()
    }

    /// Input registers whose parent is `index`.
    pub fn children_of(&self, index: usize) -> Vec<usize> {
        self.inputs()
            .filter(|(_, r)| r.parent == Some(index))
            .map(|(i, _)| i)
            .collect()
    }

    /// Steps shared by every leaf input register.
    pub fn leaf_steps(&self) -> Option<u64> {
        self.inputs().find_map(|(_, r)| r.steps)
    }

    /// Secret inputs are secret; masks inherit
    /// the secrecy of their source.
    pub fn is_secret(&self, index: usize) -> bool {
        match self.registers.get(index) {
            Some(StaticRegister::Input(r)) => r.secret,
            Some(StaticRegister::Mask(m)) => self.is_secret(m.source),
            _ => false,
        }
    }

    pub fn secret_registers(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.is_secret(i)).collect()
    }

    pub fn max_cycle_period(&self) -> usize {
        self.registers
            .iter()
            .filter_map(|r| match r {
                StaticRegister::Cyclic(c) => Some(c.period()),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

/// Two-phase builder: registers are checked as they
/// are added, cross-register rules on [`Self::build`].
#[derive(Debug)]
pub struct StaticRegisterSetBuilder {
    modulus: u128,
    registers: Vec<StaticRegister>,
}

impl StaticRegisterSetBuilder {
    pub fn new(modulus: u128) -> Self {
        Self {
            modulus,
            registers: Vec::new(),
        }
    }

    /// Index the next added register will get.
    pub fn next_index(&self) -> usize {
        self.registers.len()
    }

    pub fn add_input(
        &mut self,
        secret: bool,
        binary: bool,
        scalar: bool,
        parent: Option<usize>,
        steps: Option<u64>,
    ) -> Result<usize, Error> {
        let rank = match parent {
            None => 0,
            Some(p) => match self.registers.get(p) {
                Some(StaticRegister::Input(pr)) if pr.is_leaf() => {
                    return Err(Error::RegisterDeclaration(format!(
                        "parent register {p} is a leaf (declared with steps)"
                    )));
                }
                Some(StaticRegister::Input(pr)) => pr.rank + 1,
                _ => {
                    return Err(Error::RegisterDeclaration(format!(
                        "parent {p} is not a previously declared input register"
                    )));
                }
            },
        };

        if scalar && parent.is_some() {
            return Err(Error::RegisterDeclaration(
                "scalar input cannot have a parent".into(),
            ));
        }

        if let Some(s) = steps {
            if s == 0 || !s.is_power_of_two() {
                return Err(Error::RegisterDeclaration(format!(
                    "input steps must be a power of two (got {s})"
                )));
            }
        }

        self.registers.push(StaticRegister::Input(InputRegister {
            secret,
            binary,
            scalar,
            rank,
            parent,
            steps,
        }));

        Ok(self.registers.len() - 1)
    }

    pub fn add_cyclic(&mut self, source: CycleSource) -> Result<usize, Error> {
        if let CycleSource::Values(values) = &source {
            if let Some(v) = values.iter().find(|&&v| v >= self.modulus) {
                return Err(Error::RegisterDeclaration(format!(
                    "cycle value {v} is not a field element"
                )));
            }
        }

        if let CycleSource::Power { base, .. } = &source {
            if *base >= self.modulus {
                return Err(Error::RegisterDeclaration(format!(
                    "power base {base} is not a field element"
                )));
            }
        }

        let register = CyclicRegister { source };
        let period = register.period();
        if period == 0 || !period.is_power_of_two() {
            return Err(Error::RegisterDeclaration(format!(
                "cycle length must be a power of two (got {period})"
            )));
        }

        self.registers.push(StaticRegister::Cyclic(register));
        Ok(self.registers.len() - 1)
    }

    pub fn add_mask(&mut self, source: usize, value: u128) -> Result<usize, Error> {
        if source >= self.registers.len() {
            return Err(Error::RegisterDeclaration(format!(
                "mask source {source} must reference an earlier register"
            )));
        }

        if value >= self.modulus {
            return Err(Error::RegisterDeclaration(format!(
                "mask value {value} is not a field element"
            )));
        }

        self.registers
            .push(StaticRegister::Mask(MaskRegister { source, value }));
        Ok(self.registers.len() - 1)
    }

    pub fn build(self) -> Result<StaticRegisterSet, Vec<Error>> {
        let set = StaticRegisterSet {
            registers: self.registers,
        };

        let mut errors = Vec::new();
        for (i, r) in set.inputs() {
            let has_children = !set.children_of(i).is_empty();
            if !r.is_leaf() && !has_children {
                errors.push(Error::RegisterDeclaration(format!(
                    "filled input register {i} has no child registers"
                )));
            }
        }

        let leaf_steps: Vec<(usize, u64)> = set
            .inputs()
            .filter_map(|(i, r)| r.steps.map(|s| (i, s)))
            .collect();
        if let Some(&(_, first)) = leaf_steps.first() {
            for &(i, s) in &leaf_steps[1..] {
                if s != first {
                    errors.push(Error::RegisterDeclaration(format!(
                        "leaf input register {i} has {s} steps; all leaves must share {first}"
                    )));
                }
            }
        }

        if errors.is_empty() {
            Ok(set)
        } else {
            Err(errors)
        }
    }
}
