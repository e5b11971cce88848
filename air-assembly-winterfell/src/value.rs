// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Runtime values of lowered expressions.

use crate::error::{Error, Result};
use air_assembly_compiler::LiteralValue;
use crate::field::BaseElement as BE;
use winterfell::math::FieldElement;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Scalar(BE),
    Vector(Vec<BE>),
    Matrix(Vec<Vec<BE>>),
}

impl Value {
    pub fn from_literal(lit: &LiteralValue) -> Self {
        match lit {
            LiteralValue::Scalar(v) => Value::Scalar(BE::new(*v)),
            LiteralValue::Vector(vs) => Value::Vector(vs.iter().map(|&v| BE::new(v)).collect()),
            LiteralValue::Matrix(rows) => Value::Matrix(
                rows.iter()
                    .map(|r| r.iter().map(|&v| BE::new(v)).collect())
                    .collect(),
            ),
        }
    }

    pub fn as_scalar(&self) -> Result<BE> {
        match self {
            Value::Scalar(x) => Ok(*x),
            other => Err(Error::Shape(format!("expected scalar, got {}", other.kind()))),
        }
    }

    pub fn into_vector(self) -> Result<Vec<BE>> {
        match self {
            Value::Vector(v) => Ok(v),
            other => Err(Error::Shape(format!("expected vector, got {}", other.kind()))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Vector(_) => "vector",
            Value::Matrix(_) => "matrix",
        }
    }

    pub fn map(&self, f: impl Fn(BE) -> Result<BE>) -> Result<Value> {
        Ok(match self {
            Value::Scalar(x) => Value::Scalar(f(*x)?),
            Value::Vector(v) => Value::Vector(v.iter().map(|&x| f(x)).collect::<Result<_>>()?),
            Value::Matrix(m) => Value::Matrix(
                m.iter()
                    .map(|r| r.iter().map(|&x| f(x)).collect::<Result<_>>())
                    .collect::<Result<_>>()?,
            ),
        })
    }

    /// Elementwise combination; a scalar
    /// operand is broadcast over the other.
    pub fn zip_with(&self, other: &Value, f: impl Fn(BE, BE) -> Result<BE>) -> Result<Value> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(f(*a, *b)?)),
            (lhs, Value::Scalar(b)) => lhs.map(|a| f(a, *b)),
            (Value::Scalar(a), rhs) => rhs.map(|b| f(*a, b)),
            (Value::Vector(a), Value::Vector(b)) if a.len() == b.len() => Ok(Value::Vector(
                a.iter()
                    .zip(b)
                    .map(|(&x, &y)| f(x, y))
                    .collect::<Result<_>>()?,
            )),
            (Value::Matrix(a), Value::Matrix(b))
                if a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.len() == y.len()) =>
            {
                Ok(Value::Matrix(
                    a.iter()
                        .zip(b)
                        .map(|(ra, rb)| {
                            ra.iter()
                                .zip(rb)
                                .map(|(&x, &y)| f(x, y))
                                .collect::<Result<_>>()
                        })
                        .collect::<Result<_>>()?,
                ))
            }
            (a, b) => Err(Error::Shape(format!(
                "cannot combine {} and {}",
                a.kind(),
                b.kind()
            ))),
        }
    }

    pub fn add(&self, other: &Value) -> Result<Value> {
        self.zip_with(other, |a, b| Ok(a + b))
    }

    pub fn sub(&self, other: &Value) -> Result<Value> {
        self.zip_with(other, |a, b| Ok(a - b))
    }

    pub fn mul(&self, other: &Value) -> Result<Value> {
        self.zip_with(other, |a, b| Ok(a * b))
    }

    pub fn div(&self, other: &Value) -> Result<Value> {
        self.zip_with(other, |a, b| Ok(a * inverse(b)?))
    }

    pub fn exp(&self, e: u128) -> Result<Value> {
        self.map(|a| Ok(a.exp(e)))
    }

    pub fn neg(&self) -> Result<Value> {
        self.map(|a| Ok(-a))
    }

    pub fn inv(&self) -> Result<Value> {
        self.map(inverse)
    }

    /// Dot product, matrix-vector or matrix-matrix product.
    pub fn prod(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Vector(a), Value::Vector(b)) if a.len() == b.len() => {
                Ok(Value::Scalar(dot(a, b)))
            }
            (Value::Matrix(m), Value::Vector(v)) if m.iter().all(|r| r.len() == v.len()) => {
                Ok(Value::Vector(m.iter().map(|r| dot(r, v)).collect()))
            }
            (Value::Matrix(a), Value::Matrix(b))
                if a.iter().all(|r| r.len() == b.len()) && !b.is_empty() =>
            {
                let cols = b[0].len();
                Ok(Value::Matrix(
                    a.iter()
                        .map(|r| {
                            (0..cols)
                                .map(|c| {
                                    r.iter()
                                        .zip(b)
                                        .fold(BE::ZERO, |acc, (&x, row)| acc + x * row[c])
                                })
                                .collect()
                        })
                        .collect(),
                ))
            }
            (a, b) => Err(Error::Shape(format!(
                "cannot prod {} and {}",
                a.kind(),
                b.kind()
            ))),
        }
    }

    pub fn get(&self, index: usize) -> Result<Value> {
        match self {
            Value::Vector(v) => v
                .get(index)
                .map(|&x| Value::Scalar(x))
                .ok_or_else(|| Error::Shape(format!("element {index} out of bounds"))),
            other => Err(Error::Shape(format!("cannot index {}", other.kind()))),
        }
    }

    /// Inclusive `start..=end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Value> {
        match self {
            Value::Vector(v) if start <= end && end < v.len() => {
                Ok(Value::Vector(v[start..=end].to_vec()))
            }
            Value::Vector(v) => Err(Error::Shape(format!(
                "slice {start}..={end} out of bounds for {}",
                v.len()
            ))),
            other => Err(Error::Shape(format!("cannot slice {}", other.kind()))),
        }
    }

    /// Concatenate scalars and vectors.
    pub fn concat(parts: Vec<Value>) -> Result<Value> {
        let mut out = Vec::with_capacity(parts.len());
        for p in parts {
            match p {
                Value::Scalar(x) => out.push(x),
                Value::Vector(v) => out.extend(v),
                Value::Matrix(_) => {
                    return Err(Error::Shape("matrix inside a vector".into()));
                }
            }
        }

        Ok(Value::Vector(out))
    }
}

fn dot(a: &[BE], b: &[BE]) -> BE {
    a.iter().zip(b).fold(BE::ZERO, |acc, (&x, &y)| acc + x * y)
}

fn inverse(x: BE) -> Result<BE> {
    if x == BE::ZERO {
        return Err(Error::DivisionByZero);
    }

    Ok(x.inv())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(xs: &[u128]) -> Value {
        Value::Vector(xs.iter().map(|&x| BE::new(x)).collect())
    }

    #[test]
    fn scalar_broadcasts() {
        let v = vector(&[1, 2, 3]);
        let s = Value::Scalar(BE::new(10));

        assert_eq!(v.add(&s).unwrap(), vector(&[11, 12, 13]));
        assert_eq!(s.sub(&v).unwrap(), vector(&[9, 8, 7]));
    }

    #[test]
    fn products() {
        let m = Value::Matrix(vec![
            vec![BE::new(1), BE::new(2)],
            vec![BE::new(3), BE::new(4)],
        ]);
        let v = vector(&[5, 6]);

        assert_eq!(v.prod(&v).unwrap(), Value::Scalar(BE::new(61)));
        assert_eq!(m.prod(&v).unwrap(), vector(&[17, 39]));
        assert_eq!(
            m.prod(&m).unwrap(),
            Value::Matrix(vec![
                vec![BE::new(7), BE::new(10)],
                vec![BE::new(15), BE::new(22)],
            ])
        );
    }

    #[test]
    fn division_by_zero_is_reported() {
        let v = vector(&[1, 2]);
        let z = vector(&[1, 0]);

        assert_eq!(v.div(&z), Err(Error::DivisionByZero));
        assert_eq!(z.inv(), Err(Error::DivisionByZero));
        assert_eq!(v.div(&v).unwrap(), vector(&[1, 1]));
    }

    #[test]
    fn slice_is_inclusive() {
        let v = vector(&[1, 2, 3, 4]);
        assert_eq!(v.slice(1, 2).unwrap(), vector(&[2, 3]));
        assert!(v.slice(2, 4).is_err());
    }

    #[test]
    fn mismatched_vectors_fail() {
        assert!(matches!(
            vector(&[1, 2]).add(&vector(&[1])),
            Err(Error::Shape(_))
        ));
    }
}
