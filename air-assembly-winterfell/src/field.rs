// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! The AirAssembly prime field, modulus `2^128 - 9 * 2^32 + 1`.
//!
//! Elements are kept canonical in `[0, M)` on a `u128`.
//! Products are reduced with `2^128 = C (mod M)` where
//! `C = 9 * 2^32 - 1`. The type implements winterfell's
//! field traits so its `fft`, `polynom` and `TraceTable`
//! work over it unchanged.

use std::fmt::{self, Debug, Display, Formatter};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::{mem, slice};
use winter_utils::{
    AsBytes, ByteReader, ByteWriter, Deserializable, DeserializationError, Randomizable,
    Serializable,
};
use winterfell::math::{FieldElement, StarkField};

/// Field modulus.
pub const M: u128 = 340282366920938463463374607393113505793;

// 2^128 - M
const C: u128 = 38654705663;

// GENERATOR^((M - 1) / 2^32)
const G: u128 = 16233777346252436484685755432349885146;

const ELEMENT_BYTES: usize = mem::size_of::<u128>();

const LO: u128 = u64::MAX as u128;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct BaseElement(u128);

impl BaseElement {
    /// Reduces `value` into the field.
    pub const fn new(value: u128) -> Self {
        BaseElement(if value < M { value } else { value - M })
    }
}

impl FieldElement for BaseElement {
    type PositiveInteger = u128;
    type BaseField = Self;

    const EXTENSION_DEGREE: usize = 1;
    const ZERO: Self = BaseElement(0);
    const ONE: Self = BaseElement(1);
    const ELEMENT_BYTES: usize = ELEMENT_BYTES;
    const IS_CANONICAL: bool = true;

    /// Zero maps to zero.
    fn inv(self) -> Self {
        if self.0 == 0 {
            return self;
        }

        self.exp(M - 2)
    }

    fn conjugate(&self) -> Self {
        *self
    }

    fn base_element(&self, i: usize) -> Self::BaseField {
        assert_eq!(i, 0, "element index must be 0");
        *self
    }

    fn slice_as_base_elements(elements: &[Self]) -> &[Self::BaseField] {
        elements
    }

    fn slice_from_base_elements(elements: &[Self::BaseField]) -> &[Self] {
        elements
    }

    fn elements_as_bytes(elements: &[Self]) -> &[u8] {
        let len = elements.len() * ELEMENT_BYTES;
        // repr(transparent) over u128
        unsafe { slice::from_raw_parts(elements.as_ptr() as *const u8, len) }
    }

    unsafe fn bytes_as_elements(bytes: &[u8]) -> Result<&[Self], DeserializationError> {
        if bytes.len() % ELEMENT_BYTES != 0 {
            return Err(DeserializationError::InvalidValue(format!(
                "{} bytes do not divide into field elements",
                bytes.len()
            )));
        }

        let p = bytes.as_ptr();
        if (p as usize) % mem::align_of::<u128>() != 0 {
            return Err(DeserializationError::InvalidValue(
                "slice is not aligned for field elements".into(),
            ));
        }

        Ok(unsafe { slice::from_raw_parts(p as *const Self, bytes.len() / ELEMENT_BYTES) })
    }
}

impl StarkField for BaseElement {
    const MODULUS: Self::PositiveInteger = M;
    const MODULUS_BITS: u32 = 128;
    const GENERATOR: Self = BaseElement(3);
    const TWO_ADICITY: u32 = 32;
    const TWO_ADIC_ROOT_OF_UNITY: Self = BaseElement(G);

    fn get_modulus_le_bytes() -> Vec<u8> {
        M.to_le_bytes().to_vec()
    }

    fn as_int(&self) -> Self::PositiveInteger {
        self.0
    }
}

// ARITHMETIC
// ================================================================================================

fn add(a: u128, b: u128) -> u128 {
    match a.overflowing_add(b) {
        // a + b - M = s + 2^128 - M
        (s, true) => s + C,
        (s, false) if s >= M => s - M,
        (s, false) => s,
    }
}

fn sub(a: u128, b: u128) -> u128 {
    if a >= b { a - b } else { M - b + a }
}

/// Full 256-bit product as `(lo, hi)`.
fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    let (a0, a1) = (a & LO, a >> 64);
    let (b0, b1) = (b & LO, b >> 64);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    let mid = (p00 >> 64) + (p01 & LO) + (p10 & LO);
    let lo = (p00 & LO) | ((mid & LO) << 64);
    let hi = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);

    (lo, hi)
}

fn reduce(lo: u128, hi: u128) -> u128 {
    // hi * 2^128 + lo = hi * C + lo; hi * C spans at most 164 bits
    let (t_lo, t_hi) = mul_wide(hi, C);

    let (s, carry) = t_lo.overflowing_add(lo);
    let extra = t_hi * C + if carry { C } else { 0 };

    let s = match s.overflowing_add(extra) {
        (s, true) => s + C,
        (s, false) => s,
    };

    if s >= M { s - M } else { s }
}

fn mul(a: u128, b: u128) -> u128 {
    let (lo, hi) = mul_wide(a, b);
    reduce(lo, hi)
}

// OPERATORS
// ================================================================================================

impl Add for BaseElement {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(add(self.0, rhs.0))
    }
}

impl AddAssign for BaseElement {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for BaseElement {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(sub(self.0, rhs.0))
    }
}

impl SubAssign for BaseElement {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for BaseElement {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(mul(self.0, rhs.0))
    }
}

impl MulAssign for BaseElement {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Div for BaseElement {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, rhs: Self) -> Self {
        self * rhs.inv()
    }
}

impl DivAssign for BaseElement {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl Neg for BaseElement {
    type Output = Self;

    fn neg(self) -> Self {
        Self(sub(0, self.0))
    }
}

// CONVERSIONS
// ================================================================================================

impl From<u64> for BaseElement {
    fn from(value: u64) -> Self {
        BaseElement(value as u128)
    }
}

impl From<u32> for BaseElement {
    fn from(value: u32) -> Self {
        BaseElement(value as u128)
    }
}

impl From<u16> for BaseElement {
    fn from(value: u16) -> Self {
        BaseElement(value as u128)
    }
}

impl From<u8> for BaseElement {
    fn from(value: u8) -> Self {
        BaseElement(value as u128)
    }
}

impl TryFrom<u128> for BaseElement {
    type Error = String;

    fn try_from(value: u128) -> Result<Self, Self::Error> {
        if value >= M {
            return Err(format!("{value} is not below the field modulus"));
        }

        Ok(BaseElement(value))
    }
}

impl TryFrom<&'_ [u8]> for BaseElement {
    type Error = String;

    /// Little-endian, exactly 16 bytes.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let raw: [u8; ELEMENT_BYTES] = bytes.try_into().map_err(|e| format!("{e}"))?;
        Self::try_from(u128::from_le_bytes(raw))
    }
}

impl AsBytes for BaseElement {
    fn as_bytes(&self) -> &[u8] {
        Self::elements_as_bytes(slice::from_ref(self))
    }
}

impl Randomizable for BaseElement {
    const VALUE_SIZE: usize = ELEMENT_BYTES;

    fn from_random_bytes(bytes: &[u8]) -> Option<Self> {
        Self::try_from(bytes).ok()
    }
}

impl Serializable for BaseElement {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        target.write_bytes(&self.0.to_le_bytes());
    }
}

impl Deserializable for BaseElement {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        let value = source.read_u128()?;
        Self::try_from(value).map_err(DeserializationError::InvalidValue)
    }
}

impl Debug for BaseElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for BaseElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
