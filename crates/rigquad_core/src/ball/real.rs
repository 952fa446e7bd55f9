use num_traits::{One, Zero};

use super::dyadic::Dyadic;
use super::mag::Mag;

/// Real enclosure `[mid - rad, mid + rad]`. An infinite radius means the
/// value is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ball {
    mid: Dyadic,
    rad: Mag,
}

impl Ball {
    pub fn new(mid: Dyadic, rad: Mag) -> Self {
        if rad.is_inf() {
            return Self::indeterminate();
        }
        Self { mid, rad }
    }

    pub fn exact(mid: Dyadic) -> Self {
        Self {
            mid,
            rad: Mag::zero(),
        }
    }

    pub fn zero() -> Self {
        Self::exact(Dyadic::zero())
    }

    pub fn one() -> Self {
        Self::exact(Dyadic::one())
    }

    pub fn from_i64(value: i64) -> Self {
        Self::exact(Dyadic::from_i64(value))
    }

    /// Exact for finite input, indeterminate otherwise.
    pub fn from_f64(value: f64) -> Self {
        match Dyadic::from_f64(value) {
            Some(d) => Self::exact(d),
            None => Self::indeterminate(),
        }
    }

    pub fn indeterminate() -> Self {
        Self {
            mid: Dyadic::zero(),
            rad: Mag::inf(),
        }
    }

    /// `[0 +/- 1]`.
    pub fn unit_interval() -> Self {
        Self {
            mid: Dyadic::zero(),
            rad: Mag::one(),
        }
    }

    /// Smallest ball around `[lo, hi]` with an exact midpoint.
    pub fn from_endpoints(lo: &Dyadic, hi: &Dyadic) -> Self {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let mid = (lo + hi).mul_2exp(-1);
        let rad = Mag::from_dyadic(&(hi - &mid));
        Self { mid, rad }
    }

    pub fn mid(&self) -> &Dyadic {
        &self.mid
    }

    pub fn rad(&self) -> Mag {
        self.rad
    }

    pub fn is_finite(&self) -> bool {
        self.rad.is_finite()
    }

    pub fn is_exact(&self) -> bool {
        self.rad.is_zero()
    }

    /// Exactly zero.
    pub fn is_zero(&self) -> bool {
        self.is_exact() && self.mid.is_zero()
    }

    fn rad_dyadic(&self) -> Option<Dyadic> {
        self.rad.to_dyadic()
    }

    /// `(mid - rad, mid + rad)`, or `None` when indeterminate.
    pub fn endpoints(&self) -> Option<(Dyadic, Dyadic)> {
        let r = self.rad_dyadic()?;
        Some((&self.mid - &r, &self.mid + &r))
    }

    pub fn contains_zero(&self) -> bool {
        match self.rad_dyadic() {
            None => true,
            Some(r) => self.mid.cmp_abs(&r) != std::cmp::Ordering::Greater,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self.endpoints(), Some((lo, _)) if lo.is_positive())
    }

    pub fn is_negative(&self) -> bool {
        matches!(self.endpoints(), Some((_, hi)) if hi.is_negative())
    }

    /// Some point of the ball is `<= 0`.
    pub fn contains_nonpositive(&self) -> bool {
        !matches!(self.endpoints(), Some((lo, _)) if lo.is_positive())
    }

    pub fn contains_int(&self) -> bool {
        match self.endpoints() {
            None => true,
            Some((lo, hi)) => lo.ceil() <= hi,
        }
    }

    pub fn contains_dyadic(&self, x: &Dyadic) -> bool {
        match self.endpoints() {
            None => true,
            Some((lo, hi)) => &lo <= x && x <= &hi,
        }
    }

    /// Every point of `other` lies in `self`.
    pub fn contains(&self, other: &Ball) -> bool {
        match (self.endpoints(), other.endpoints()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some((lo, hi)), Some((olo, ohi))) => lo <= olo && ohi <= hi,
        }
    }

    pub fn overlaps(&self, other: &Ball) -> bool {
        match (self.rad_dyadic(), other.rad_dyadic()) {
            (Some(ra), Some(rb)) => {
                let gap = (&self.mid - &other.mid).abs();
                gap <= &ra + &rb
            }
            _ => true,
        }
    }

    /// Upper bound for `|x|`.
    pub fn mag(&self) -> Mag {
        Mag::from_dyadic(&self.mid).add(self.rad)
    }

    /// Lower bound for `|x|`.
    pub fn mag_lower(&self) -> Mag {
        if !self.is_finite() {
            return Mag::zero();
        }
        Mag::from_dyadic_lower(&self.mid).sub_lower(self.rad)
    }

    pub fn add_error(&mut self, err: Mag) {
        self.rad = self.rad.add(err);
        if self.rad.is_inf() {
            *self = Self::indeterminate();
        }
    }

    pub fn with_error(mut self, err: Mag) -> Self {
        self.add_error(err);
        self
    }

    /// Rounds the midpoint to `prec` bits, widening the radius.
    pub fn round(&self, prec: u32) -> Ball {
        if !self.is_finite() {
            return Self::indeterminate();
        }
        let (mid, err) = self.mid.round(prec, super::Round::Nearest);
        Self {
            mid,
            rad: self.rad.add(err),
        }
    }

    pub fn neg(&self) -> Ball {
        Self {
            mid: -&self.mid,
            rad: self.rad,
        }
    }

    pub fn mul_2exp(&self, k: i64) -> Ball {
        Self {
            mid: self.mid.mul_2exp(k),
            rad: self.rad.mul_2exp(k),
        }
    }

    pub fn add(&self, other: &Ball, prec: u32) -> Ball {
        if !self.is_finite() || !other.is_finite() {
            return Self::indeterminate();
        }
        let (mid, err) = self.mid.add_round(&other.mid, prec);
        Self::new(mid, self.rad.add(other.rad).add(err))
    }

    pub fn sub(&self, other: &Ball, prec: u32) -> Ball {
        self.add(&other.neg(), prec)
    }

    pub fn mul(&self, other: &Ball, prec: u32) -> Ball {
        if !self.is_finite() || !other.is_finite() {
            return Self::indeterminate();
        }
        let (mid, err) = self.mid.mul_round(&other.mid, prec);
        let am = Mag::from_dyadic(&self.mid);
        let bm = Mag::from_dyadic(&other.mid);
        let rad = am
            .mul(other.rad)
            .add(bm.mul(self.rad))
            .add(self.rad.mul(other.rad))
            .add(err);
        Self::new(mid, rad)
    }

    /// Square; tight `[0, U]` when the ball straddles zero.
    pub fn sqr(&self, prec: u32) -> Ball {
        if !self.is_finite() {
            return Self::indeterminate();
        }
        if self.contains_zero() {
            let upper = self.mag();
            let half = upper.mul(upper).mul_2exp(-1);
            return match half.to_dyadic() {
                Some(mid) => Self { mid, rad: half },
                None => Self::indeterminate(),
            };
        }
        self.mul(self, prec)
    }

    pub fn pow_u(&self, n: u32, prec: u32) -> Ball {
        if n == 0 {
            return Self::one();
        }
        let mut result: Option<Ball> = None;
        let mut base = self.clone();
        let mut n = n;
        loop {
            if n & 1 == 1 {
                result = Some(match result {
                    None => base.clone(),
                    Some(r) => r.mul(&base, prec),
                });
            }
            n >>= 1;
            if n == 0 {
                break;
            }
            base = base.sqr(prec);
        }
        result.unwrap_or_else(Self::one)
    }

    /// Reciprocal; indeterminate when the ball contains zero.
    pub fn inv(&self, prec: u32) -> Ball {
        if self.contains_zero() {
            return Self::indeterminate();
        }
        let (mid, err) = Dyadic::one().div_round(&self.mid, prec);
        if self.is_exact() {
            return Self { mid, rad: err };
        }
        // |1/x - 1/m| <= r / (|m| (|m| - r))
        let m_low = Mag::from_dyadic_lower(&self.mid);
        let gap = self.mag_lower();
        let rad = self.rad.div(m_low.mul_lower(gap)).add(err);
        Self::new(mid, rad)
    }

    pub fn div(&self, other: &Ball, prec: u32) -> Ball {
        if other.contains_zero() || !self.is_finite() {
            return Self::indeterminate();
        }
        if other.is_exact() {
            let (mid, err) = self.mid.div_round(&other.mid, prec);
            let rad = self
                .rad
                .div(Mag::from_dyadic_lower(&other.mid))
                .add(err);
            return Self::new(mid, rad);
        }
        self.mul(&other.inv(prec + 8), prec)
    }

    pub fn div_u64(&self, n: u64, prec: u32) -> Ball {
        self.div(&Ball::exact(Dyadic::from_u64(n)), prec)
    }

    pub fn sqrt(&self, prec: u32) -> Ball {
        let Some((lo, hi)) = self.endpoints() else {
            return Self::indeterminate();
        };
        if hi.is_negative() {
            return Self::indeterminate();
        }
        if !lo.is_positive() {
            let half = Mag::from_dyadic(&hi).sqrt().mul_2exp(-1);
            return match half.to_dyadic() {
                Some(mid) => Self { mid, rad: half },
                None => Self::indeterminate(),
            };
        }
        let (mid, err) = self.mid.sqrt_round(prec);
        if self.is_exact() {
            return Self { mid, rad: err };
        }
        // |sqrt(m + d) - sqrt(m)| <= r / sqrt(lo)
        let root_lo = Mag::from_dyadic_lower(&lo).sqrt_lower();
        Self::new(mid, self.rad.div(root_lo).add(err))
    }

    /// `e^x`, enclosed by its values at the two endpoints.
    pub fn exp(&self, prec: u32) -> Ball {
        if self.is_exact() {
            return exp_point(&self.mid, prec);
        }
        let Some((lo, hi)) = self.endpoints() else {
            return Self::indeterminate();
        };
        let wp = prec + 8;
        let Some((_, top)) = exp_point(&hi, wp).endpoints() else {
            return Self::indeterminate();
        };
        let bottom = match exp_point(&lo, wp).endpoints() {
            Some((b, _)) if b.is_positive() => b,
            _ => Dyadic::zero(),
        };
        Self::from_endpoints(&bottom, &top).round(prec)
    }

    /// `cosh x`; even and increasing in `|x|`, so never below one.
    pub fn cosh(&self, prec: u32) -> Ball {
        let wp = prec + 8;
        if self.is_exact() {
            return cosh_point(&self.mid, wp).round(prec);
        }
        let (Some(near), Some(far)) = (self.mag_lower().to_dyadic(), self.mag().to_dyadic()) else {
            return Self::indeterminate();
        };
        let Some((_, top)) = cosh_point(&far, wp).endpoints() else {
            return Self::indeterminate();
        };
        let one = Dyadic::one();
        let bottom = match cosh_point(&near, wp).endpoints() {
            Some((b, _)) if b > one => b,
            _ => one,
        };
        Self::from_endpoints(&bottom, &top).round(prec)
    }

    /// `(sin x, cos x)`.
    pub fn sin_cos(&self, prec: u32) -> (Ball, Ball) {
        if !self.is_finite() {
            return (Self::unit_interval(), Self::unit_interval());
        }
        let (s, c) = sin_cos_point(&self.mid, prec);
        // Both functions are 1-Lipschitz.
        let s = clamp_unit(s.with_error(self.rad));
        let c = clamp_unit(c.with_error(self.rad));
        (s, c)
    }

    pub fn sin(&self, prec: u32) -> Ball {
        self.sin_cos(prec).0
    }

    pub fn cos(&self, prec: u32) -> Ball {
        self.sin_cos(prec).1
    }

    /// `(cosh x, sinh x)`.
    pub fn cosh_sinh(&self, prec: u32) -> (Ball, Ball) {
        let wp = prec + 8;
        let e = self.exp(wp);
        let ei = self.neg().exp(wp);
        let cosh = e.add(&ei, prec).mul_2exp(-1);
        let sinh = e.sub(&ei, prec).mul_2exp(-1);
        (cosh, sinh)
    }

    pub fn floor(&self) -> Ball {
        match self.endpoints() {
            None => Self::indeterminate(),
            Some((lo, hi)) => {
                let (flo, fhi) = (lo.floor(), hi.floor());
                if flo == fhi {
                    Self::exact(flo)
                } else {
                    Self::from_endpoints(&flo, &fhi)
                }
            }
        }
    }

    /// `|x|`, tight when the ball straddles zero.
    pub fn abs(&self) -> Ball {
        if !self.is_finite() {
            return Self::indeterminate();
        }
        if !self.contains_zero() {
            return if self.mid.is_negative() {
                self.neg()
            } else {
                self.clone()
            };
        }
        let upper = self.mag();
        match upper.to_dyadic() {
            Some(u) => Self::from_endpoints(&Dyadic::zero(), &u),
            None => Self::indeterminate(),
        }
    }

    /// Smallest ball containing both.
    pub fn union(&self, other: &Ball) -> Ball {
        match (self.endpoints(), other.endpoints()) {
            (Some((alo, ahi)), Some((blo, bhi))) => {
                let lo = if alo <= blo { alo } else { blo };
                let hi = if ahi >= bhi { ahi } else { bhi };
                Self::from_endpoints(&lo, &hi)
            }
            _ => Self::indeterminate(),
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.mid.to_f64()
    }
}

fn clamp_unit(b: Ball) -> Ball {
    if b.rad >= Mag::from_u64(2) {
        Ball::unit_interval()
    } else {
        b
    }
}

/// Enclosure of `e^x` for an exact `x`.
fn exp_point(x: &Dyadic, prec: u32) -> Ball {
    let Some(top) = x.top() else {
        return Ball::one();
    };
    if top > 40 {
        if x.is_negative() {
            // e^x <= 2^(x log2 e + 1), with the product pulled toward zero.
            let e = (x.to_f64() * std::f64::consts::LOG2_E * (1.0 - 1e-12)).floor();
            let e = if e.is_finite() { e as i64 + 1 } else { i64::MIN / 4 };
            return Ball::new(Dyadic::zero(), Mag::two_pow(e));
        }
        return Ball::indeterminate();
    }
    // Scale so that |t| < 2^-8 and square back afterwards.
    let k = (top + 8).max(0) as u32;
    let wp = prec + k + 16;
    let t = Ball::exact(x.mul_2exp(-(k as i64)));
    let eps = Mag::two_pow(-(wp as i64) - 4);
    let mut sum = Ball::one();
    let mut term = Ball::one();
    let mut j = 1u64;
    loop {
        term = term.mul(&t, wp).div_u64(j, wp);
        sum = sum.add(&term, wp);
        if term.mag() <= eps {
            break;
        }
        j += 1;
    }
    // Remaining terms shrink by a factor below 2^-8 each.
    sum.add_error(term.mag());
    for _ in 0..k {
        sum = sum.sqr(wp);
    }
    sum.round(prec)
}

fn cosh_point(x: &Dyadic, prec: u32) -> Ball {
    exp_point(x, prec)
        .add(&exp_point(&-x, prec), prec)
        .mul_2exp(-1)
}

/// Enclosures of `sin x` and `cos x` for an exact `x`.
fn sin_cos_point(x: &Dyadic, prec: u32) -> (Ball, Ball) {
    let Some(top) = x.top() else {
        return (Ball::zero(), Ball::one());
    };
    if top > 30 {
        return (Ball::unit_interval(), Ball::unit_interval());
    }
    let k = (top + 4).max(0) as u32;
    let wp = prec + 2 * k + 16;
    let t = Ball::exact(x.mul_2exp(-(k as i64)));
    let t2 = t.mul(&t, wp);
    let eps = Mag::two_pow(-(wp as i64) - 4);
    let mut s = t.clone();
    let mut c = Ball::one();
    let mut term_s = t;
    let mut term_c = Ball::one();
    let mut j = 1u64;
    loop {
        term_s = term_s.mul(&t2, wp).div_u64((2 * j) * (2 * j + 1), wp).neg();
        term_c = term_c.mul(&t2, wp).div_u64((2 * j - 1) * (2 * j), wp).neg();
        s = s.add(&term_s, wp);
        c = c.add(&term_c, wp);
        if term_s.mag() <= eps && term_c.mag() <= eps {
            break;
        }
        j += 1;
    }
    // Alternating series with decreasing terms.
    s.add_error(term_s.mag());
    c.add_error(term_c.mag());
    let one = Ball::one();
    for _ in 0..k {
        let s2 = s.mul(&c, wp).mul_2exp(1);
        let c2 = one.sub(&s.sqr(wp).mul_2exp(1), wp);
        s = s2;
        c = c2;
    }
    (s.round(prec), c.round(prec))
}
