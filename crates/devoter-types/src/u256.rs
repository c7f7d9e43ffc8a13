use crate::error::TypesError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// 256-bit unsigned integer for token amounts and voting power.
///
/// Stored as 4 x u64 in little-endian limb order. No operator impls: all
/// arithmetic goes through the `checked_*` methods.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256([u64; 4]);

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        for i in (0..4).rev() {
            match self.0[i].cmp(&other.0[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl U256 {
    pub const ZERO: Self = Self([0, 0, 0, 0]);
    pub const ONE: Self = Self([1, 0, 0, 0]);
    pub const MAX: Self = Self([u64::MAX, u64::MAX, u64::MAX, u64::MAX]);

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self(limbs)
    }

    pub const fn as_limbs(&self) -> &[u64; 4] {
        &self.0
    }

    pub const fn from_u64(val: u64) -> Self {
        Self([val, 0, 0, 0])
    }

    pub const fn from_u128(val: u128) -> Self {
        Self([val as u64, (val >> 64) as u64, 0, 0])
    }

    /// `2^bits - 1`, for `bits <= 256`.
    pub fn low_mask(bits: u32) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let lo = i as u32 * 64;
            if bits >= lo + 64 {
                *limb = u64::MAX;
            } else if bits > lo {
                *limb = (1u64 << (bits - lo)) - 1;
            }
        }
        Self(limbs)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&l| l == 0)
    }

    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        let mut result = [0u64; 4];
        let mut carry = false;

        for (i, out) in result.iter_mut().enumerate() {
            let (sum1, o1) = self.0[i].overflowing_add(rhs.0[i]);
            let (sum2, o2) = sum1.overflowing_add(carry as u64);
            *out = sum2;
            carry = o1 || o2;
        }

        if carry {
            None
        } else {
            Some(Self(result))
        }
    }

    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        match self.overflowing_sub(rhs) {
            (_, true) => None,
            (diff, false) => Some(diff),
        }
    }

    pub fn checked_mul(&self, rhs: &Self) -> Option<Self> {
        let mut result = [0u64; 4];

        for i in 0..4 {
            if self.0[i] == 0 {
                continue;
            }
            let mut carry: u128 = 0;
            for j in 0..4 {
                let product = self.0[i] as u128 * rhs.0[j] as u128;
                if i + j >= 4 {
                    if product != 0 || carry != 0 {
                        return None;
                    }
                    continue;
                }
                // (2^64-1)^2 + 2 * (2^64-1) == 2^128 - 1, so this never wraps
                let t = result[i + j] as u128 + product + carry;
                result[i + j] = t as u64;
                carry = t >> 64;
            }
            if carry != 0 {
                return None;
            }
        }

        Some(Self(result))
    }

    /// Truncating division. `None` on division by zero.
    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        self.div_rem(rhs).map(|(q, _)| q)
    }

    pub fn checked_rem(&self, rhs: &Self) -> Option<Self> {
        self.div_rem(rhs).map(|(_, r)| r)
    }

    pub fn checked_pow(&self, exp: u32) -> Option<Self> {
        let mut result = Self::ONE;
        let mut base = *self;
        let mut exp = exp;

        while exp > 0 {
            if exp & 1 == 1 {
                result = result.checked_mul(&base)?;
            }
            exp >>= 1;
            if exp > 0 {
                base = base.checked_mul(&base)?;
            }
        }

        Some(result)
    }

    /// `floor(self * numerator / denominator)`, failing if the intermediate
    /// product does not fit or the denominator is zero.
    pub fn checked_mul_div(&self, numerator: &Self, denominator: &Self) -> Option<Self> {
        self.checked_mul(numerator)?.checked_div(denominator)
    }

    /// Binary long division.
    fn div_rem(&self, rhs: &Self) -> Option<(Self, Self)> {
        if rhs.is_zero() {
            return None;
        }
        if self < rhs {
            return Some((Self::ZERO, *self));
        }

        let mut quotient = Self::ZERO;
        let mut remainder = Self::ZERO;

        for i in (0..self.bit_len()).rev() {
            let (shifted, carried) = remainder.shl1();
            remainder = shifted;
            if self.bit(i) {
                remainder.0[0] |= 1;
            }
            if carried || remainder >= *rhs {
                // true value is < 2 * rhs, so the wrapped difference is exact
                remainder = remainder.overflowing_sub(rhs).0;
                quotient.0[(i / 64) as usize] |= 1u64 << (i % 64);
            }
        }

        Some((quotient, remainder))
    }

    fn overflowing_sub(&self, rhs: &Self) -> (Self, bool) {
        let mut result = [0u64; 4];
        let mut borrow = false;

        for (i, out) in result.iter_mut().enumerate() {
            let (d1, u1) = self.0[i].overflowing_sub(rhs.0[i]);
            let (d2, u2) = d1.overflowing_sub(borrow as u64);
            *out = d2;
            borrow = u1 || u2;
        }

        (Self(result), borrow)
    }

    fn shl1(&self) -> (Self, bool) {
        let mut result = [0u64; 4];
        let mut carry = 0u64;
        for (i, out) in result.iter_mut().enumerate() {
            *out = (self.0[i] << 1) | carry;
            carry = self.0[i] >> 63;
        }
        (Self(result), carry != 0)
    }

    pub fn bit(&self, pos: u32) -> bool {
        if pos >= 256 {
            return false;
        }
        (self.0[(pos / 64) as usize] >> (pos % 64)) & 1 != 0
    }

    /// Position of highest set bit + 1
    pub fn bit_len(&self) -> u32 {
        for i in (0..4).rev() {
            if self.0[i] != 0 {
                return (i as u32 + 1) * 64 - self.0[i].leading_zeros();
            }
        }
        0
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for i in 0..4 {
            bytes[i * 8..(i + 1) * 8].copy_from_slice(&self.0[3 - i].to_be_bytes());
        }
        bytes
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for i in 0..4 {
            let mut limb_bytes = [0u8; 8];
            limb_bytes.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            limbs[3 - i] = u64::from_be_bytes(limb_bytes);
        }
        Self(limbs)
    }

    pub fn from_decimal_str(s: &str) -> Result<Self, TypesError> {
        if s.is_empty() {
            return Err(TypesError::InvalidU256String(s.to_string()));
        }

        let ten = Self::from_u64(10);
        let mut result = Self::ZERO;

        for c in s.chars() {
            let digit = c
                .to_digit(10)
                .ok_or_else(|| TypesError::InvalidU256String(s.to_string()))?;
            result = result
                .checked_mul(&ten)
                .and_then(|r| r.checked_add(&Self::from_u64(digit as u64)))
                .ok_or(TypesError::U256Overflow)?;
        }

        Ok(result)
    }
}

impl From<u64> for U256 {
    fn from(val: u64) -> Self {
        Self::from_u64(val)
    }
}

impl From<u128> for U256 {
    fn from(val: u128) -> Self {
        Self::from_u128(val)
    }
}

impl From<u8> for U256 {
    fn from(val: u8) -> Self {
        Self::from_u64(val as u64)
    }
}

impl TryFrom<U256> for u64 {
    type Error = TypesError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        if value.0[1..].iter().any(|&l| l != 0) {
            Err(TypesError::U256Overflow)
        } else {
            Ok(value.0[0])
        }
    }
}

impl TryFrom<U256> for u128 {
    type Error = TypesError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        if value.0[2] != 0 || value.0[3] != 0 {
            Err(TypesError::U256Overflow)
        } else {
            Ok((value.0[1] as u128) << 64 | value.0[0] as u128)
        }
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }

        // peel off 19 decimal digits at a time
        let chunk = Self::from_u64(10_000_000_000_000_000_000);
        let mut parts = Vec::new();
        let mut n = *self;
        while !n.is_zero() {
            let (q, r) = n.div_rem(&chunk).ok_or(fmt::Error)?;
            parts.push(r.0[0]);
            n = q;
        }

        let mut out = String::new();
        for (i, part) in parts.iter().rev().enumerate() {
            if i == 0 {
                out.push_str(&part.to_string());
            } else {
                out.push_str(&format!("{:019}", part));
            }
        }
        f.pad(&out)
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({})", self)
    }
}

impl fmt::LowerHex for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_be_bytes()))
    }
}

impl FromStr for U256 {
    type Err = TypesError;

    /// Decimal, or big-endian hex with a 0x prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().replace('_', "");
        if let Some(stripped) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let padded = if stripped.len() % 2 == 1 {
                format!("0{}", stripped)
            } else {
                stripped.to_string()
            };
            let bytes = hex::decode(padded)?;
            if bytes.len() > 32 {
                return Err(TypesError::U256Overflow);
            }
            let mut buf = [0u8; 32];
            buf[32 - bytes.len()..].copy_from_slice(&bytes);
            Ok(Self::from_be_bytes(buf))
        } else {
            Self::from_decimal_str(&s)
        }
    }
}
