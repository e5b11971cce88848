// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Input trees and their layout over the trace.
//!
//! A rank-`r` input register receives a tree nested `r + 1`
//! lists deep. Its innermost lists (groups) hold, in order,
//! the values attached to each value of its parent. The
//! execution trace walks the leaf values in order and holds
//! each of them for `steps` rows; an ancestor's value stays
//! in place for every leaf step below it.

use crate::error::{Error, Result};
use air_assembly_compiler::{StarkLimits, StaticRegisterSet};
use crate::field::BaseElement as BE;
use winterfell::math::StarkField;

pub const MIN_TRACE_LENGTH: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputTree {
    Value(u128),
    List(Vec<InputTree>),
}

impl From<u128> for InputTree {
    fn from(v: u128) -> Self {
        InputTree::Value(v)
    }
}

impl<T: Into<InputTree>> From<Vec<T>> for InputTree {
    fn from(items: Vec<T>) -> Self {
        InputTree::List(items.into_iter().map(Into::into).collect())
    }
}

impl InputTree {
    /// Flatten a tree of `rank + 1` list levels into
    /// its group lengths and values.
    pub fn flatten(&self, rank: usize) -> Result<(Vec<usize>, Vec<u128>)> {
        let mut shape = Vec::new();
        let mut values = Vec::new();
        self.collect(rank + 1, &mut shape, &mut values)?;

        Ok((shape, values))
    }

    fn collect(&self, depth: usize, shape: &mut Vec<usize>, values: &mut Vec<u128>) -> Result<()> {
        match (self, depth) {
            (InputTree::List(items), 1) => {
                shape.push(items.len());
                for item in items {
                    match item {
                        InputTree::Value(v) => values.push(*v),
                        InputTree::List(_) => {
                            return Err(Error::InvalidInput("input tree is nested too deep".into()));
                        }
                    }
                }

                Ok(())
            }
            (InputTree::List(items), _) => items
                .iter()
                .try_for_each(|item| item.collect(depth - 1, shape, values)),
            (InputTree::Value(_), _) => Err(Error::InvalidInput(
                "input tree is not nested deep enough".into(),
            )),
        }
    }
}

/// Input register metadata exposed by a module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputDescriptor {
    /// Index in the static register set.
    pub register: usize,
    pub rank: usize,
    pub secret: bool,
    pub binary: bool,
    pub scalar: bool,
    /// Position of the parent among the input registers.
    pub parent: Option<usize>,
    pub steps: Option<u64>,
}

impl InputDescriptor {
    pub(crate) fn from_registers(set: &StaticRegisterSet) -> Vec<Self> {
        let positions: Vec<usize> = set.inputs().map(|(i, _)| i).collect();

        set.inputs()
            .map(|(register, r)| InputDescriptor {
                register,
                rank: r.rank,
                secret: r.secret,
                binary: r.binary,
                scalar: r.scalar,
                parent: r
                    .parent
                    .and_then(|p| positions.iter().position(|&q| q == p)),
                steps: r.steps,
            })
            .collect()
    }

    pub fn is_leaf(&self) -> bool {
        self.steps.is_some()
    }

    /// Check and convert one register's input values.
    pub(crate) fn values(&self, tree: &InputTree) -> Result<(Vec<usize>, Vec<BE>)> {
        let (shape, raw) = match (tree, self.scalar) {
            (InputTree::Value(v), true) => (vec![1], vec![*v]),
            _ => tree.flatten(self.rank)?,
        };

        let mut values = Vec::with_capacity(raw.len());
        for v in raw {
            if v >= BE::MODULUS {
                return Err(Error::InvalidInput(format!(
                    "value {v} of register {} is outside the field",
                    self.register
                )));
            }

            if self.binary && v > 1 {
                return Err(Error::InvalidInput(format!(
                    "binary register {} received {v}",
                    self.register
                )));
            }

            values.push(BE::new(v));
        }

        Ok((shape, values))
    }
}

/// Mapping from trace rows to input values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    trace_length: usize,
    steps: usize,
    /// Per input register, the value index
    /// for each leaf iteration.
    maps: Vec<Vec<usize>>,
}

impl Layout {
    /// Validate group shapes and derive the trace length.
    pub(crate) fn new(
        inputs: &[InputDescriptor],
        shapes: &[Vec<usize>],
        max_cycle_period: usize,
        limits: &StarkLimits,
    ) -> Result<Self> {
        if shapes.len() != inputs.len() {
            return Err(Error::InvalidInput(format!(
                "expected shapes of {} input registers (got {})",
                inputs.len(),
                shapes.len()
            )));
        }

        let totals: Vec<usize> = shapes.iter().map(|s| s.iter().sum()).collect();
        for (i, (d, shape)) in inputs.iter().zip(shapes).enumerate() {
            let groups = match d.parent {
                Some(p) => totals[p],
                None => 1,
            };

            if shape.len() != groups {
                return Err(Error::InvalidInput(format!(
                    "register {} needs {groups} value groups (got {})",
                    d.register,
                    shape.len()
                )));
            }

            if shape.contains(&0) {
                return Err(Error::InvalidInput(format!(
                    "register {} has an empty value group",
                    d.register
                )));
            }

            if d.scalar && totals[i] != 1 {
                return Err(Error::InvalidInput(format!(
                    "scalar register {} takes exactly one value",
                    d.register
                )));
            }
        }

        let leaves: Vec<usize> = (0..inputs.len()).filter(|&i| inputs[i].is_leaf()).collect();
        if let Some((&first, rest)) = leaves.split_first() {
            if let Some(&other) = rest.iter().find(|&&i| shapes[i] != shapes[first]) {
                return Err(Error::InvalidInput(format!(
                    "leaf registers {} and {} have different shapes",
                    inputs[first].register, inputs[other].register
                )));
            }
        }

        let leaf_count = leaves.first().map(|&i| totals[i]).unwrap_or(0);
        let steps = leaves
            .first()
            .and_then(|&i| inputs[i].steps)
            .unwrap_or(1) as usize;

        let mut maps: Vec<Vec<usize>> = vec![Vec::new(); inputs.len()];
        for i in (0..inputs.len()).rev() {
            if inputs[i].is_leaf() {
                maps[i] = (0..leaf_count).collect();
                continue;
            }

            let mut map: Option<Vec<usize>> = None;
            for c in (i + 1..inputs.len()).filter(|&c| inputs[c].parent == Some(i)) {
                let through: Vec<usize> = maps[c]
                    .iter()
                    .map(|&idx| group_of(&shapes[c], idx))
                    .collect();

                match &map {
                    Some(m) if *m != through => {
                        return Err(Error::InvalidInput(format!(
                            "register {} maps inconsistently through its children",
                            inputs[i].register
                        )));
                    }
                    Some(_) => {}
                    None => map = Some(through),
                }
            }

            maps[i] = map.unwrap_or_default();
        }

        let trace_length = if inputs.is_empty() {
            max_cycle_period.max(MIN_TRACE_LENGTH)
        } else {
            leaf_count * steps
        };

        if !trace_length.is_power_of_two() || trace_length < MIN_TRACE_LENGTH {
            return Err(Error::InvalidInput(format!(
                "trace length {trace_length} must be a power of two of at least {MIN_TRACE_LENGTH}"
            )));
        }

        if trace_length > limits.max_trace_length {
            return Err(Error::LimitExceeded(format!(
                "trace length {trace_length} exceeds {}",
                limits.max_trace_length
            )));
        }

        if max_cycle_period > 0 && trace_length % max_cycle_period != 0 {
            return Err(Error::InvalidInput(format!(
                "trace length {trace_length} is not a multiple of cycle period {max_cycle_period}"
            )));
        }

        Ok(Self {
            trace_length,
            steps,
            maps,
        })
    }

    pub(crate) fn trace_length(&self) -> usize {
        self.trace_length
    }

    /// Expand one register's values over the trace.
    pub(crate) fn column(&self, input: usize, values: &[BE]) -> Vec<BE> {
        let map = &self.maps[input];
        (0..self.trace_length)
            .map(|row| values[map[row / self.steps]])
            .collect()
    }
}

/// Index of the group holding value `idx`.
fn group_of(shape: &[usize], idx: usize) -> usize {
    let mut end = 0;
    for (g, len) in shape.iter().enumerate() {
        end += len;
        if idx < end {
            return g;
        }
    }

    shape.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(
        register: usize,
        rank: usize,
        parent: Option<usize>,
        steps: Option<u64>,
    ) -> InputDescriptor {
        InputDescriptor {
            register,
            rank,
            secret: false,
            binary: false,
            scalar: false,
            parent,
            steps,
        }
    }

    fn tree_inputs() -> Vec<InputDescriptor> {
        vec![
            input(0, 0, None, None),
            input(1, 1, Some(0), Some(4)),
            input(2, 1, Some(0), Some(4)),
        ]
    }

    #[test]
    fn flattens_nested_trees() {
        let t = InputTree::from(vec![vec![1u128, 2], vec![3, 4, 5]]);
        let (shape, values) = t.flatten(1).unwrap();

        assert_eq!(shape, vec![2, 3]);
        assert_eq!(values, vec![1, 2, 3, 4, 5]);

        assert!(t.flatten(0).is_err());
        assert!(t.flatten(2).is_err());
    }

    #[test]
    fn parent_values_hold_across_their_groups() {
        let shapes = vec![vec![4], vec![2, 2, 2, 2], vec![2, 2, 2, 2]];
        let layout =
            Layout::new(&tree_inputs(), &shapes, 8, &StarkLimits::default()).unwrap();

        assert_eq!(layout.trace_length(), 32);

        let parent = [10u128, 20, 30, 40].map(BE::new);
        let col = layout.column(0, &parent);
        assert_eq!(col[0], BE::new(10));
        assert_eq!(col[7], BE::new(10));
        assert_eq!(col[8], BE::new(20));
        assert_eq!(col[31], BE::new(40));

        let leaf: Vec<BE> = (0..8u128).map(BE::new).collect();
        let col = layout.column(1, &leaf);
        assert_eq!(col[3], BE::new(0));
        assert_eq!(col[4], BE::new(1));
        assert_eq!(col[29], BE::new(7));
    }

    #[test]
    fn leaves_must_share_shape() {
        let shapes = vec![vec![4], vec![2, 2, 2, 2], vec![1, 3, 2, 2]];
        let err = Layout::new(&tree_inputs(), &shapes, 0, &StarkLimits::default());
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn group_count_follows_parent() {
        let shapes = vec![vec![4], vec![2, 2, 4], vec![2, 2, 4]];
        let err = Layout::new(&tree_inputs(), &shapes, 0, &StarkLimits::default());
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn trace_length_must_be_power_of_two() {
        let shapes = vec![vec![3], vec![2, 2, 2], vec![2, 2, 2]];
        let err = Layout::new(&tree_inputs(), &shapes, 0, &StarkLimits::default());
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn trace_length_respects_limit() {
        let limits = StarkLimits {
            max_trace_length: 16,
            ..StarkLimits::default()
        };
        let shapes = vec![vec![4], vec![2, 2, 2, 2], vec![2, 2, 2, 2]];
        let err = Layout::new(&tree_inputs(), &shapes, 0, &limits);
        assert!(matches!(err, Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn cycle_period_must_divide_trace() {
        let shapes = vec![vec![4], vec![2, 2, 2, 2], vec![2, 2, 2, 2]];
        let err = Layout::new(&tree_inputs(), &shapes, 64, &StarkLimits::default());
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn no_inputs_uses_cycle_period() {
        let layout = Layout::new(&[], &[], 16, &StarkLimits::default()).unwrap();
        assert_eq!(layout.trace_length(), 16);

        let layout = Layout::new(&[], &[], 2, &StarkLimits::default()).unwrap();
        assert_eq!(layout.trace_length(), 8);
    }

    #[test]
    fn binary_and_field_checks() {
        let mut d = input(0, 0, None, Some(8));
        d.binary = true;

        assert!(d.values(&InputTree::from(vec![0u128, 1])).is_ok());
        assert!(matches!(
            d.values(&InputTree::from(vec![2u128])),
            Err(Error::InvalidInput(_))
        ));

        d.binary = false;
        assert!(matches!(
            d.values(&InputTree::from(vec![BE::MODULUS])),
            Err(Error::InvalidInput(_))
        ));
    }
}
