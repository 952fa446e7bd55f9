//! Exact dyadic rationals `±m · 2^e`.
//!
//! These are the midpoints of every ball. Ring operations are exact; the
//! `*_round` methods round to a given number of significant bits and report
//! an upper bound for the rounding error.

use dashu::base::BitTest;
use dashu::integer::UBig;
use num_traits::{One, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::ops::{Add, Mul, Neg, Sub};

use super::mag::Mag;

/// Rounding direction used by [`Dyadic::round`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Round {
    Nearest,
    /// Toward negative infinity.
    Floor,
    /// Toward positive infinity.
    Ceil,
}

/// Exact binary rational. The mantissa is kept odd (or zero) so equal values
/// have equal representations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dyadic {
    neg: bool,
    man: UBig,
    exp: i64,
}

impl Dyadic {
    pub(crate) fn from_parts(neg: bool, man: UBig, exp: i64) -> Self {
        if man.is_zero() {
            return Self {
                neg: false,
                man,
                exp: 0,
            };
        }
        let tz = man.trailing_zeros().unwrap_or(0);
        let man = if tz > 0 { man >> tz } else { man };
        Self {
            neg,
            man,
            exp: exp + tz as i64,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        Self::from_parts(value < 0, UBig::from(value.unsigned_abs()), 0)
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_parts(false, UBig::from(value), 0)
    }

    pub fn from_ubig(value: UBig) -> Self {
        Self::from_parts(false, value, 0)
    }

    /// Exact conversion; `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value == 0.0 {
            return Some(Self::zero());
        }
        let bits = value.to_bits();
        let neg = bits >> 63 == 1;
        let biased = ((bits >> 52) & 0x7ff) as i64;
        let frac = bits & ((1u64 << 52) - 1);
        let (man, exp) = if biased == 0 {
            (frac, -1074)
        } else {
            (frac | (1u64 << 52), biased - 1075)
        };
        Some(Self::from_parts(neg, UBig::from(man), exp))
    }

    /// `2^e`.
    pub fn two_pow(e: i64) -> Self {
        Self::from_parts(false, UBig::ONE, e)
    }

    pub fn is_negative(&self) -> bool {
        self.neg
    }

    pub fn is_positive(&self) -> bool {
        !self.neg && !self.man.is_zero()
    }

    pub fn mantissa(&self) -> &UBig {
        &self.man
    }

    pub fn exponent(&self) -> i64 {
        self.exp
    }

    /// Number of significant bits.
    pub fn bits(&self) -> usize {
        self.man.bit_len()
    }

    /// `t` such that `2^(t-1) <= |x| < 2^t`; `None` for zero.
    pub fn top(&self) -> Option<i64> {
        if self.man.is_zero() {
            None
        } else {
            Some(self.exp + self.man.bit_len() as i64)
        }
    }

    pub fn abs(&self) -> Self {
        Self {
            neg: false,
            man: self.man.clone(),
            exp: self.exp,
        }
    }

    pub fn mul_2exp(&self, k: i64) -> Self {
        if self.man.is_zero() {
            return self.clone();
        }
        Self {
            neg: self.neg,
            man: self.man.clone(),
            exp: self.exp + k,
        }
    }

    pub fn pow(&self, n: u32) -> Self {
        if n == 0 {
            return Self::one();
        }
        Self::from_parts(
            self.neg && n % 2 == 1,
            self.man.pow(n as usize),
            self.exp * n as i64,
        )
    }

    pub fn is_integer(&self) -> bool {
        self.man.is_zero() || self.exp >= 0
    }

    /// Largest integer not above `self`.
    pub fn floor(&self) -> Self {
        if self.is_integer() {
            return self.clone();
        }
        // Odd mantissa with a negative exponent: never an integer.
        let q = &self.man >> (-self.exp) as usize;
        if self.neg {
            Self::from_parts(true, q + UBig::ONE, 0)
        } else {
            Self::from_parts(false, q, 0)
        }
    }

    pub fn ceil(&self) -> Self {
        -(-self).floor()
    }

    pub fn cmp_abs(&self, other: &Self) -> Ordering {
        match (self.top(), other.top()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(ta), Some(tb)) if ta != tb => ta.cmp(&tb),
            _ => {
                let e = self.exp.min(other.exp);
                let a = &self.man << (self.exp - e) as usize;
                let b = &other.man << (other.exp - e) as usize;
                a.cmp(&b)
            }
        }
    }

    /// Rounds to `prec` significant bits. The second value bounds
    /// `|result - self|`.
    pub fn round(&self, prec: u32, mode: Round) -> (Self, Mag) {
        let prec = prec.max(1) as usize;
        let bits = self.man.bit_len();
        if bits <= prec {
            return (self.clone(), Mag::zero());
        }
        let shift = bits - prec;
        let q = &self.man >> shift;
        let up = match mode {
            Round::Nearest => self.man.bit(shift - 1),
            Round::Floor => self.neg,
            Round::Ceil => !self.neg,
        };
        let q = if up { q + UBig::ONE } else { q };
        let exp = self.exp + shift as i64;
        let err = match mode {
            Round::Nearest => Mag::two_pow(exp - 1),
            Round::Floor | Round::Ceil => Mag::two_pow(exp),
        };
        (Self::from_parts(self.neg, q, exp), err)
    }

    /// Rounded sum. Operands far below the rounding position of the other
    /// are folded into the error term instead of being shifted in.
    pub fn add_round(&self, other: &Self, prec: u32) -> (Self, Mag) {
        match (self.top(), other.top()) {
            (None, _) => other.round(prec, Round::Nearest),
            (_, None) => self.round(prec, Round::Nearest),
            (Some(ta), Some(tb)) => {
                let gap = prec as i64 + 4;
                if tb < ta - gap {
                    let (r, err) = self.round(prec, Round::Nearest);
                    (r, err.add(Mag::from_dyadic(other)))
                } else if ta < tb - gap {
                    let (r, err) = other.round(prec, Round::Nearest);
                    (r, err.add(Mag::from_dyadic(self)))
                } else {
                    (self + other).round(prec, Round::Nearest)
                }
            }
        }
    }

    pub fn sub_round(&self, other: &Self, prec: u32) -> (Self, Mag) {
        self.add_round(&-other, prec)
    }

    pub fn mul_round(&self, other: &Self, prec: u32) -> (Self, Mag) {
        (self * other).round(prec, Round::Nearest)
    }

    /// Rounded quotient.
    ///
    /// # Panics
    /// Panics when `other` is zero; callers check for a zero divisor first.
    pub fn div_round(&self, other: &Self, prec: u32) -> (Self, Mag) {
        assert!(!other.is_zero(), "dyadic division by zero");
        if self.is_zero() {
            return (Self::zero(), Mag::zero());
        }
        let p = prec.max(1) as usize;
        let shift = (p + 2 + other.man.bit_len()).saturating_sub(self.man.bit_len());
        let num = &self.man << shift;
        let q = &num / &other.man;
        let exact = &q * &other.man == num;
        let exp = self.exp - other.exp - shift as i64;
        let truncated = Self::from_parts(self.neg != other.neg, q, exp);
        let (r, err) = truncated.round(prec, Round::Nearest);
        if exact {
            (r, err)
        } else {
            (r, err.add(Mag::two_pow(exp)))
        }
    }

    /// Rounded square root of a non-negative value.
    ///
    /// # Panics
    /// Panics on negative input.
    pub fn sqrt_round(&self, prec: u32) -> (Self, Mag) {
        assert!(!self.neg, "square root of a negative dyadic");
        if self.is_zero() {
            return (Self::zero(), Mag::zero());
        }
        let p = prec.max(1) as usize;
        let mut shift = (2 * p + 4).saturating_sub(self.man.bit_len()) as i64;
        if (self.exp - shift).rem_euclid(2) != 0 {
            shift += 1;
        }
        let n = &self.man << shift as usize;
        let r = isqrt(&n);
        let exact = &r * &r == n;
        let exp = (self.exp - shift) / 2;
        let truncated = Self::from_parts(false, r, exp);
        let (res, err) = truncated.round(prec, Round::Nearest);
        if exact {
            (res, err)
        } else {
            (res, err.add(Mag::two_pow(exp)))
        }
    }

    /// Nearest `f64`; saturates to infinity outside the `f64` range.
    pub fn to_f64(&self) -> f64 {
        if self.man.is_zero() {
            return 0.0;
        }
        let bits = self.man.bit_len();
        let (m, e) = if bits > 64 {
            (&self.man >> (bits - 64), self.exp + (bits - 64) as i64)
        } else {
            (self.man.clone(), self.exp)
        };
        let m = u64::try_from(m).unwrap_or(u64::MAX) as f64;
        let value = ldexp(m, e);
        if self.neg {
            -value
        } else {
            value
        }
    }

    /// Approximate `log2 |x|`; `-inf` for zero.
    pub fn log2_approx(&self) -> f64 {
        match self.top() {
            None => f64::NEG_INFINITY,
            Some(top) => {
                let bits = self.man.bit_len();
                let lead = if bits > 60 {
                    &self.man >> (bits - 60)
                } else {
                    self.man.clone()
                };
                let lead_bits = lead.bit_len() as i64;
                let m = u64::try_from(lead).unwrap_or(u64::MAX) as f64;
                m.log2() - lead_bits as f64 + top as f64
            }
        }
    }
}

pub(crate) fn ldexp(x: f64, e: i64) -> f64 {
    let e = e.clamp(-4000, 4000) as i32;
    let half = e / 2;
    x * 2f64.powi(half) * 2f64.powi(e - half)
}

/// Floor of the square root.
pub(crate) fn isqrt(n: &UBig) -> UBig {
    if n.is_zero() {
        return UBig::ZERO;
    }
    let mut x = UBig::ONE << ((n.bit_len() + 1) / 2);
    loop {
        let y = (&x + n / &x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}

impl Zero for Dyadic {
    fn zero() -> Self {
        Self {
            neg: false,
            man: UBig::ZERO,
            exp: 0,
        }
    }

    fn is_zero(&self) -> bool {
        self.man.is_zero()
    }
}

impl One for Dyadic {
    fn one() -> Self {
        Self {
            neg: false,
            man: UBig::ONE,
            exp: 0,
        }
    }
}

impl ToPrimitive for Dyadic {
    fn to_i64(&self) -> Option<i64> {
        if !self.is_integer() {
            return None;
        }
        let magnitude = u64::try_from(&self.man << self.exp.max(0) as usize).ok()?;
        if self.neg {
            0i64.checked_sub_unsigned(magnitude)
        } else {
            i64::try_from(magnitude).ok()
        }
    }

    fn to_u64(&self) -> Option<u64> {
        if !self.is_integer() || self.neg {
            return None;
        }
        u64::try_from(&self.man << self.exp.max(0) as usize).ok()
    }

    fn to_f64(&self) -> Option<f64> {
        Some(Dyadic::to_f64(self))
    }
}

impl Ord for Dyadic {
    fn cmp(&self, other: &Self) -> Ordering {
        let sa = if self.is_zero() { 0 } else if self.neg { -1 } else { 1 };
        let sb = if other.is_zero() { 0 } else if other.neg { -1 } else { 1 };
        if sa != sb {
            return sa.cmp(&sb);
        }
        let by_abs = self.cmp_abs(other);
        if sa < 0 {
            by_abs.reverse()
        } else {
            by_abs
        }
    }
}

impl PartialOrd for Dyadic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Neg for Dyadic {
    type Output = Dyadic;
    fn neg(self) -> Dyadic {
        if self.man.is_zero() {
            return self;
        }
        Dyadic {
            neg: !self.neg,
            ..self
        }
    }
}

impl Neg for &Dyadic {
    type Output = Dyadic;
    fn neg(self) -> Dyadic {
        -self.clone()
    }
}

impl Add for &Dyadic {
    type Output = Dyadic;
    fn add(self, rhs: &Dyadic) -> Dyadic {
        if self.is_zero() {
            return rhs.clone();
        }
        if rhs.is_zero() {
            return self.clone();
        }
        let e = self.exp.min(rhs.exp);
        let a = &self.man << (self.exp - e) as usize;
        let b = &rhs.man << (rhs.exp - e) as usize;
        if self.neg == rhs.neg {
            return Dyadic::from_parts(self.neg, a + b, e);
        }
        match a.cmp(&b) {
            Ordering::Greater => Dyadic::from_parts(self.neg, a - b, e),
            Ordering::Less => Dyadic::from_parts(rhs.neg, b - a, e),
            Ordering::Equal => Dyadic::zero(),
        }
    }
}

impl Add for Dyadic {
    type Output = Dyadic;
    fn add(self, rhs: Dyadic) -> Dyadic {
        &self + &rhs
    }
}

impl Sub for &Dyadic {
    type Output = Dyadic;
    fn sub(self, rhs: &Dyadic) -> Dyadic {
        self + &(-rhs)
    }
}

impl Sub for Dyadic {
    type Output = Dyadic;
    fn sub(self, rhs: Dyadic) -> Dyadic {
        &self - &rhs
    }
}

impl Mul for &Dyadic {
    type Output = Dyadic;
    fn mul(self, rhs: &Dyadic) -> Dyadic {
        Dyadic::from_parts(self.neg != rhs.neg, &self.man * &rhs.man, self.exp + rhs.exp)
    }
}

impl Mul for Dyadic {
    type Output = Dyadic;
    fn mul(self, rhs: Dyadic) -> Dyadic {
        &self * &rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: f64) -> Dyadic {
        Dyadic::from_f64(value).expect("finite literal")
    }

    #[test]
    fn from_f64_is_exact_and_normalized() {
        let x = d(0.375);
        assert_eq!(x.mantissa(), &UBig::from(3u64));
        assert_eq!(x.exponent(), -3);
        assert_eq!(d(-6.0), Dyadic::from_i64(-6));
        assert!(Dyadic::from_f64(f64::NAN).is_none());
    }

    #[test]
    fn exact_ring_operations() {
        assert_eq!(d(1.5) + d(-2.25), d(-0.75));
        assert_eq!(d(1.5) - d(1.5), Dyadic::zero());
        assert_eq!(d(-1.5) * d(0.5), d(-0.75));
        assert_eq!(d(3.0).pow(3), Dyadic::from_i64(27));
    }

    #[test]
    fn floor_and_ceil_follow_sign() {
        assert_eq!(d(2.5).floor(), Dyadic::from_i64(2));
        assert_eq!(d(-2.5).floor(), Dyadic::from_i64(-3));
        assert_eq!(d(-2.5).ceil(), Dyadic::from_i64(-2));
        assert_eq!(d(7.0).floor(), Dyadic::from_i64(7));
    }

    #[test]
    fn ordering_handles_signs_and_scales() {
        assert!(d(-3.0) < d(-2.0));
        assert!(d(-0.5) < Dyadic::zero());
        assert!(d(1024.0) > d(1023.75));
        assert_eq!(d(0.25).cmp_abs(&d(-0.25)), Ordering::Equal);
    }

    #[test]
    fn rounding_reports_bounded_error() {
        // 0b1011 rounded to two bits is 0b1100 (nearest), error 1 <= 2^(2-1)
        let x = Dyadic::from_i64(11);
        let (r, err) = x.round(2, Round::Nearest);
        assert_eq!(r, Dyadic::from_i64(12));
        assert!(Mag::from_dyadic(&(&r - &x)) <= err);

        let (down, _) = x.round(2, Round::Floor);
        assert_eq!(down, Dyadic::from_i64(8));
        let (up, _) = x.round(2, Round::Ceil);
        assert_eq!(up, Dyadic::from_i64(12));
    }

    #[test]
    fn division_error_covers_true_quotient() {
        let one = Dyadic::one();
        let three = Dyadic::from_i64(3);
        let (q, err) = one.div_round(&three, 40);
        // |3q - 1| <= 3 err
        let residual = Mag::from_dyadic(&(&(&q * &three) - &one));
        assert!(residual <= err.mul(Mag::from_u64(3)));
        assert!((q.to_f64() - 1.0 / 3.0).abs() < 1e-11);
    }

    #[test]
    fn sqrt_round_brackets_root() {
        let (s, err) = Dyadic::from_i64(2).sqrt_round(50);
        assert!((s.to_f64() - 2f64.sqrt()).abs() < 1e-14);
        assert!(err <= Mag::two_pow(-48));
        let (four, err) = Dyadic::from_i64(16).sqrt_round(10);
        assert_eq!(four, Dyadic::from_i64(4));
        assert!(err.is_zero());
    }

    #[test]
    fn far_apart_addition_folds_into_error() {
        let big = Dyadic::one();
        let tiny = Dyadic::two_pow(-500);
        let (sum, err) = big.add_round(&tiny, 64);
        assert_eq!(sum, Dyadic::one());
        assert!(err >= Mag::two_pow(-500));
    }

    #[test]
    fn to_i64_only_for_integers() {
        assert_eq!(Dyadic::from_i64(-42).to_i64(), Some(-42));
        assert_eq!(d(0.5).to_i64(), None);
        assert_eq!(Dyadic::from_u64(9).to_u64(), Some(9));
    }
}
