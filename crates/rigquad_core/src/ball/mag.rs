//! Low-precision upper bounds for non-negative reals.
//!
//! A `Mag` stores at most [`MAG_BITS`] mantissa bits and an unbounded binary
//! exponent. Every operation rounds toward `+inf` unless its name ends in
//! `_lower`, in which case the result is a lower bound instead.

use std::cmp::Ordering;
use std::f64::consts::LOG2_E;

use super::dyadic::Dyadic;
use dashu::base::BitTest;
use dashu::integer::UBig;

pub const MAG_BITS: u32 = 30;

const INF_MAN: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mag {
    man: u64,
    exp: i64,
}

impl Mag {
    pub const fn zero() -> Self {
        Self { man: 0, exp: 0 }
    }

    pub const fn one() -> Self {
        Self { man: 1, exp: 0 }
    }

    pub const fn inf() -> Self {
        Self {
            man: INF_MAN,
            exp: 0,
        }
    }

    pub const fn two_pow(e: i64) -> Self {
        Self { man: 1, exp: e }
    }

    fn from_wide(man: u128, exp: i64, up: bool) -> Self {
        if man == 0 {
            return Self::zero();
        }
        let bits = 128 - man.leading_zeros();
        let (mut m, mut e) = (man, exp);
        if bits > MAG_BITS {
            let s = bits - MAG_BITS;
            let lost = m & ((1u128 << s) - 1) != 0;
            m >>= s;
            if up && lost {
                m += 1;
            }
            e += s as i64;
        }
        let tz = m.trailing_zeros();
        m >>= tz;
        e += tz as i64;
        Self { man: m as u64, exp: e }
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_wide(value as u128, 0, true)
    }

    pub fn from_u64_lower(value: u64) -> Self {
        Self::from_wide(value as u128, 0, false)
    }

    fn from_dyadic_dir(d: &Dyadic, up: bool) -> Self {
        let man = d.mantissa();
        let bits = man.bit_len();
        if bits == 0 {
            return Self::zero();
        }
        if bits <= 64 {
            let m = u64::try_from(man.clone()).unwrap_or(u64::MAX);
            return Self::from_wide(m as u128, d.exponent(), up);
        }
        let shift = bits - 64;
        let head: UBig = man >> shift;
        let m = u64::try_from(head).unwrap_or(u64::MAX) as u128;
        // Normalized mantissas are odd, so bits were dropped.
        let m = if up { m + 1 } else { m };
        Self::from_wide(m, d.exponent() + shift as i64, up)
    }

    /// Upper bound for `|d|`.
    pub fn from_dyadic(d: &Dyadic) -> Self {
        Self::from_dyadic_dir(d, true)
    }

    /// Lower bound for `|d|`.
    pub fn from_dyadic_lower(d: &Dyadic) -> Self {
        Self::from_dyadic_dir(d, false)
    }

    /// Upper bound for `|x|`; infinite for NaN and infinities.
    pub fn from_f64(x: f64) -> Self {
        match Dyadic::from_f64(x) {
            Some(d) => Self::from_dyadic(&d),
            None => Self::inf(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.man == 0
    }

    pub fn is_inf(&self) -> bool {
        self.man == INF_MAN
    }

    pub fn is_finite(&self) -> bool {
        !self.is_inf()
    }

    /// Exact value, `None` when infinite.
    pub fn to_dyadic(&self) -> Option<Dyadic> {
        if self.is_inf() {
            return None;
        }
        Some(Dyadic::from_parts(false, UBig::from(self.man), self.exp))
    }

    pub fn to_f64(&self) -> f64 {
        if self.is_inf() {
            return f64::INFINITY;
        }
        super::dyadic::ldexp(self.man as f64, self.exp)
    }

    pub fn log2_approx(&self) -> f64 {
        if self.is_inf() {
            f64::INFINITY
        } else if self.is_zero() {
            f64::NEG_INFINITY
        } else {
            (self.man as f64).log2() + self.exp as f64
        }
    }

    /// `t` with `2^(t-1) <= self < 2^t`; `None` for zero and infinity.
    pub fn top(&self) -> Option<i64> {
        if self.is_zero() || self.is_inf() {
            None
        } else {
            Some(self.exp + (64 - self.man.leading_zeros()) as i64)
        }
    }

    pub fn add(self, other: Mag) -> Mag {
        if self.is_inf() || other.is_inf() {
            return Self::inf();
        }
        if self.is_zero() {
            return other;
        }
        if other.is_zero() {
            return self;
        }
        let (hi, lo) = if self.exp >= other.exp {
            (self, other)
        } else {
            (other, self)
        };
        let d = hi.exp - lo.exp;
        if d > 90 {
            // lo is below one unit in the last of MAG_BITS places of hi.
            let sh = MAG_BITS - (64 - hi.man.leading_zeros());
            return Self::from_wide(((hi.man as u128) << sh) + 1, hi.exp - sh as i64, true);
        }
        Self::from_wide(((hi.man as u128) << d) + lo.man as u128, lo.exp, true)
    }

    pub fn add_lower(self, other: Mag) -> Mag {
        if self.is_inf() || other.is_inf() {
            return Self::inf();
        }
        if self.is_zero() {
            return other;
        }
        if other.is_zero() {
            return self;
        }
        let (hi, lo) = if self.exp >= other.exp {
            (self, other)
        } else {
            (other, self)
        };
        let d = hi.exp - lo.exp;
        if d > 90 {
            return hi;
        }
        Self::from_wide(((hi.man as u128) << d) + lo.man as u128, lo.exp, false)
    }

    /// `max(self - other, 0)` rounded down.
    pub fn sub_lower(self, other: Mag) -> Mag {
        if other.is_inf() {
            return Self::zero();
        }
        if self.is_inf() {
            return Self::inf();
        }
        match (self.to_dyadic(), other.to_dyadic()) {
            (Some(a), Some(b)) if a > b => Self::from_dyadic_lower(&(&a - &b)),
            _ => Self::zero(),
        }
    }

    fn mul_dir(self, other: Mag, up: bool) -> Mag {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        if self.is_inf() || other.is_inf() {
            return Self::inf();
        }
        Self::from_wide(
            self.man as u128 * other.man as u128,
            self.exp + other.exp,
            up,
        )
    }

    pub fn mul(self, other: Mag) -> Mag {
        self.mul_dir(other, true)
    }

    pub fn mul_lower(self, other: Mag) -> Mag {
        self.mul_dir(other, false)
    }

    fn div_dir(self, den: Mag, up: bool) -> Mag {
        if self.is_zero() || den.is_inf() {
            return Self::zero();
        }
        if self.is_inf() || den.is_zero() {
            return Self::inf();
        }
        let num = (self.man as u128) << 64;
        let den_man = den.man as u128;
        let mut q = num / den_man;
        if up && num % den_man != 0 {
            q += 1;
        }
        Self::from_wide(q, self.exp - den.exp - 64, up)
    }

    /// Upper bound for `self / den`; pass a lower bound for `den`.
    pub fn div(self, den: Mag) -> Mag {
        self.div_dir(den, true)
    }

    /// Lower bound for `self / den`; pass an upper bound for `den`.
    pub fn div_lower(self, den: Mag) -> Mag {
        self.div_dir(den, false)
    }

    pub fn mul_2exp(self, k: i64) -> Mag {
        if self.is_zero() || self.is_inf() {
            return self;
        }
        Self {
            man: self.man,
            exp: self.exp + k,
        }
    }

    pub fn pow(self, n: u32) -> Mag {
        let mut result = Self::one();
        let mut base = self;
        let mut n = n;
        while n > 0 {
            if n & 1 == 1 {
                result = result.mul(base);
            }
            base = base.mul(base);
            n >>= 1;
        }
        result
    }

    pub fn pow_lower(self, n: u32) -> Mag {
        let mut result = Self::one();
        let mut base = self;
        let mut n = n;
        while n > 0 {
            if n & 1 == 1 {
                result = result.mul_lower(base);
            }
            base = base.mul_lower(base);
            n >>= 1;
        }
        result
    }

    fn sqrt_dir(self, up: bool) -> Mag {
        if self.is_zero() || self.is_inf() {
            return self;
        }
        let bits = 64 - self.man.leading_zeros() as i64;
        let mut shift = 62 - bits;
        if (self.exp - shift).rem_euclid(2) != 0 {
            shift += 1;
        }
        let n = (self.man as u128) << shift;
        let mut r = (n as f64).sqrt() as u128;
        while r * r > n {
            r -= 1;
        }
        while (r + 1) * (r + 1) <= n {
            r += 1;
        }
        if up && r * r != n {
            r += 1;
        }
        Self::from_wide(r, (self.exp - shift) / 2, up)
    }

    pub fn sqrt(self) -> Mag {
        self.sqrt_dir(true)
    }

    pub fn sqrt_lower(self) -> Mag {
        self.sqrt_dir(false)
    }

    /// Upper bound for `e^self - 1`.
    pub fn expm1(self) -> Mag {
        if self.is_zero() || self.is_inf() {
            return self;
        }
        if self <= Self::one() {
            // e^r - 1 <= r + r^2 on [0, 1]
            return self.add(self.mul(self));
        }
        let r = self.to_f64();
        if !r.is_finite() || r > (1u64 << 40) as f64 {
            return Self::inf();
        }
        Self::two_pow((r * LOG2_E).ceil() as i64 + 1)
    }

    /// Upper bound for `e^self`.
    pub fn exp(self) -> Mag {
        self.expm1().add(Self::one())
    }

    pub fn max(self, other: Mag) -> Mag {
        if self >= other {
            self
        } else {
            other
        }
    }

    pub fn min(self, other: Mag) -> Mag {
        if self <= other {
            self
        } else {
            other
        }
    }
}

impl Ord for Mag {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_inf(), other.is_inf()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        match (self.top(), other.top()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(ta), Some(tb)) if ta != tb => ta.cmp(&tb),
            _ => {
                let e = self.exp.min(other.exp);
                let a = (self.man as u128) << (self.exp - e);
                let b = (other.man as u128) << (other.exp - e);
                a.cmp(&b)
            }
        }
    }
}

impl PartialOrd for Mag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_goes_up_and_down() {
        let odd = (1u64 << 40) + 1;
        let up = Mag::from_u64(odd);
        let down = Mag::from_u64_lower(odd);
        assert!(down < up);
        assert!(up.to_f64() >= odd as f64);
        assert!(down.to_f64() <= odd as f64);
    }

    #[test]
    fn addition_bounds_sum() {
        let a = Mag::from_f64(0.1);
        let b = Mag::from_f64(0.2);
        assert!(a.add(b).to_f64() >= 0.1 + 0.2 - 1e-17);
        let tiny = Mag::two_pow(-400);
        assert!(Mag::one().add(tiny) > Mag::one());
    }

    #[test]
    fn negligible_terms_cost_one_unit_in_the_last_place() {
        let base = Mag::two_pow(-64);
        let sum = base.add(Mag::two_pow(-200));
        assert!(sum > base);
        // 2^-64 (1 + 2^-29)
        let ulp_above = Mag::from_u64((1 << 29) + 1).mul_2exp(-64 - 29);
        assert!(sum <= ulp_above);

        let mut acc = base;
        for _ in 0..10 {
            acc = acc.add(Mag::two_pow(-160));
        }
        assert!(acc.to_f64() < base.to_f64() * (1.0 + 1e-7));
    }

    #[test]
    fn inf_absorbs_and_zero_annihilates() {
        assert!(Mag::inf().add(Mag::one()).is_inf());
        assert!(Mag::zero().mul(Mag::inf()).is_zero());
        assert!(Mag::one().div(Mag::zero()).is_inf());
        assert!(Mag::one().div(Mag::inf()).is_zero());
        assert!(Mag::inf() > Mag::two_pow(1_000_000));
    }

    #[test]
    fn division_and_sqrt_bracket() {
        let third_up = Mag::one().div(Mag::from_u64(3));
        let third_down = Mag::one().div_lower(Mag::from_u64(3));
        assert!(third_down.to_f64() <= 1.0 / 3.0 + 1e-16);
        assert!(third_up.to_f64() >= 1.0 / 3.0 - 1e-16);
        assert!(third_down < third_up);

        let s = Mag::from_u64(2).sqrt();
        let s_low = Mag::from_u64(2).sqrt_lower();
        assert!(s_low.to_f64() <= 2f64.sqrt() && 2f64.sqrt() <= s.to_f64());
        assert_eq!(Mag::from_u64(16).sqrt(), Mag::from_u64(4));
        assert_eq!(Mag::two_pow(-8).sqrt(), Mag::two_pow(-4));
    }

    #[test]
    fn expm1_is_an_upper_bound() {
        for &r in &[1e-6, 0.3, 1.0, 2.5, 40.0] {
            let bound = Mag::from_f64(r).expm1().to_f64();
            assert!(bound >= r.exp_m1(), "expm1({r}) bound {bound}");
        }
        assert!(Mag::from_f64(1e15).expm1().is_inf());
    }

    #[test]
    fn sub_lower_clamps_at_zero() {
        assert!(Mag::one().sub_lower(Mag::from_u64(2)).is_zero());
        let d = Mag::from_u64(5).sub_lower(Mag::from_u64(2));
        assert_eq!(d, Mag::from_u64(3));
    }
}
