use num_complex::Complex;

use super::dyadic::Dyadic;
use super::mag::Mag;
use super::real::Ball;

/// Rectangular complex enclosure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexBall {
    re: Ball,
    im: Ball,
}

impl ComplexBall {
    pub fn new(re: Ball, im: Ball) -> Self {
        Self { re, im }
    }

    pub fn from_real(re: Ball) -> Self {
        Self {
            re,
            im: Ball::zero(),
        }
    }

    pub fn zero() -> Self {
        Self::from_real(Ball::zero())
    }

    pub fn one() -> Self {
        Self::from_real(Ball::one())
    }

    pub fn i() -> Self {
        Self::new(Ball::zero(), Ball::one())
    }

    pub fn from_i64(value: i64) -> Self {
        Self::from_real(Ball::from_i64(value))
    }

    pub fn from_f64(re: f64, im: f64) -> Self {
        Self::new(Ball::from_f64(re), Ball::from_f64(im))
    }

    pub fn indeterminate() -> Self {
        Self::new(Ball::indeterminate(), Ball::indeterminate())
    }

    pub fn re(&self) -> &Ball {
        &self.re
    }

    pub fn im(&self) -> &Ball {
        &self.im
    }

    /// Both parts have finite radii.
    pub fn is_finite(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    /// Imaginary part is exactly zero.
    pub fn is_real(&self) -> bool {
        self.im.is_zero()
    }

    pub fn is_exact(&self) -> bool {
        self.re.is_exact() && self.im.is_exact()
    }

    pub fn contains(&self, other: &ComplexBall) -> bool {
        self.re.contains(&other.re) && self.im.contains(&other.im)
    }

    pub fn overlaps(&self, other: &ComplexBall) -> bool {
        self.re.overlaps(&other.re) && self.im.overlaps(&other.im)
    }

    /// Upper bound for `|z|`.
    pub fn mag(&self) -> Mag {
        self.re.mag().add(self.im.mag())
    }

    /// Lower bound for `|z|`.
    pub fn mag_lower(&self) -> Mag {
        self.re.mag_lower().max(self.im.mag_lower())
    }

    /// Largest of the two radii.
    pub fn rad(&self) -> Mag {
        self.re.rad().max(self.im.rad())
    }

    pub fn add_error(&mut self, err: Mag) {
        self.re.add_error(err);
        self.im.add_error(err);
    }

    pub fn round(&self, prec: u32) -> Self {
        Self::new(self.re.round(prec), self.im.round(prec))
    }

    pub fn neg(&self) -> Self {
        Self::new(self.re.neg(), self.im.neg())
    }

    pub fn conj(&self) -> Self {
        Self::new(self.re.clone(), self.im.neg())
    }

    pub fn mul_i(&self) -> Self {
        Self::new(self.im.neg(), self.re.clone())
    }

    pub fn div_i(&self) -> Self {
        Self::new(self.im.clone(), self.re.neg())
    }

    pub fn mul_2exp(&self, k: i64) -> Self {
        Self::new(self.re.mul_2exp(k), self.im.mul_2exp(k))
    }

    pub fn add(&self, other: &ComplexBall, prec: u32) -> Self {
        Self::new(self.re.add(&other.re, prec), self.im.add(&other.im, prec))
    }

    pub fn sub(&self, other: &ComplexBall, prec: u32) -> Self {
        Self::new(self.re.sub(&other.re, prec), self.im.sub(&other.im, prec))
    }

    pub fn add_real(&self, x: &Ball, prec: u32) -> Self {
        Self::new(self.re.add(x, prec), self.im.clone())
    }

    pub fn mul_real(&self, x: &Ball, prec: u32) -> Self {
        Self::new(self.re.mul(x, prec), self.im.mul(x, prec))
    }

    pub fn mul(&self, other: &ComplexBall, prec: u32) -> Self {
        if other.is_real() {
            return self.mul_real(&other.re, prec);
        }
        if self.is_real() {
            return other.mul_real(&self.re, prec);
        }
        let wp = prec + 4;
        let re = self
            .re
            .mul(&other.re, wp)
            .sub(&self.im.mul(&other.im, wp), prec);
        let im = self
            .re
            .mul(&other.im, wp)
            .add(&self.im.mul(&other.re, wp), prec);
        Self::new(re, im)
    }

    pub fn sqr(&self, prec: u32) -> Self {
        if self.is_real() {
            return Self::from_real(self.re.sqr(prec));
        }
        let wp = prec + 4;
        let re = self.re.sqr(wp).sub(&self.im.sqr(wp), prec);
        let im = self.re.mul(&self.im, prec).mul_2exp(1);
        Self::new(re, im)
    }

    pub fn pow_u(&self, n: u32, prec: u32) -> Self {
        if n == 0 {
            return Self::one();
        }
        let mut result: Option<ComplexBall> = None;
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

    /// `1/z`; indeterminate when `|z|^2` may vanish.
    pub fn inv(&self, prec: u32) -> Self {
        if self.is_real() {
            let inv = self.re.inv(prec);
            return if inv.is_finite() {
                Self::from_real(inv)
            } else {
                Self::indeterminate()
            };
        }
        let wp = prec + 8;
        let den = self.re.sqr(wp).add(&self.im.sqr(wp), wp);
        if den.contains_zero() {
            return Self::indeterminate();
        }
        let inv = den.inv(wp);
        Self::new(self.re.mul(&inv, prec), self.im.neg().mul(&inv, prec))
    }

    pub fn div(&self, other: &ComplexBall, prec: u32) -> Self {
        if other.is_real() {
            if other.re.contains_zero() {
                return Self::indeterminate();
            }
            return Self::new(self.re.div(&other.re, prec), self.im.div(&other.re, prec));
        }
        self.mul(&other.inv(prec + 8), prec)
    }

    pub fn exp(&self, prec: u32) -> Self {
        if self.is_real() {
            return Self::from_real(self.re.exp(prec));
        }
        let wp = prec + 4;
        let e = self.re.exp(wp);
        let (s, c) = self.im.sin_cos(wp);
        Self::new(e.mul(&c, prec), e.mul(&s, prec))
    }

    pub fn sin(&self, prec: u32) -> Self {
        if self.is_real() {
            return Self::from_real(self.re.sin(prec));
        }
        let wp = prec + 4;
        let (s, c) = self.re.sin_cos(wp);
        let (ch, sh) = self.im.cosh_sinh(wp);
        Self::new(s.mul(&ch, prec), c.mul(&sh, prec))
    }

    pub fn cos(&self, prec: u32) -> Self {
        if self.is_real() {
            return Self::from_real(self.re.cos(prec));
        }
        let wp = prec + 4;
        let (s, c) = self.re.sin_cos(wp);
        let (ch, sh) = self.im.cosh_sinh(wp);
        Self::new(c.mul(&ch, prec), s.mul(&sh, prec).neg())
    }

    pub fn cosh(&self, prec: u32) -> Self {
        if self.is_real() {
            return Self::from_real(self.re.cosh(prec));
        }
        let wp = prec + 4;
        let e = self.exp(wp);
        let ei = self.neg().exp(wp);
        e.add(&ei, prec).mul_2exp(-1)
    }

    pub fn sech(&self, prec: u32) -> Self {
        self.cosh(prec + 8).inv(prec)
    }

    /// Principal square root. Points straddling the cut on the negative real
    /// axis get a box covering both branches.
    pub fn sqrt(&self, prec: u32) -> Self {
        if !self.is_finite() {
            return Self::indeterminate();
        }
        if self.is_real() && !self.re.contains_nonpositive() {
            return Self::from_real(self.re.sqrt(prec));
        }
        let touches_cut = self.re.contains_nonpositive() && self.im.contains_zero();
        if touches_cut {
            // |sqrt z| <= sqrt |z|, and the principal root has re >= 0.
            let s = self.mag().sqrt();
            let half = s.mul_2exp(-1);
            return match half.to_dyadic() {
                Some(mid) => Self::new(Ball::new(mid, half), Ball::new(Dyadic::from_i64(0), s)),
                None => Self::indeterminate(),
            };
        }
        let wp = prec + 8;
        let m = Self::new(Ball::exact(self.re.mid().clone()), Ball::exact(self.im.mid().clone()));
        let mut root = sqrt_point(&m, wp);
        // |sqrt(z) - sqrt(m)| <= R / (2 sqrt(|m| - R)) on the disk |z - m| <= R
        let r = self.re.rad().add(self.im.rad());
        if !r.is_zero() {
            let gap = m.mag_lower_euclid().sub_lower(r);
            if gap.is_zero() {
                return Self::indeterminate();
            }
            root.add_error(r.div(gap.sqrt_lower().mul_2exp(1)));
        }
        root.round(prec)
    }

    /// Lower bound for the Euclidean modulus.
    fn mag_lower_euclid(&self) -> Mag {
        let a = self.re.mag_lower();
        let b = self.im.mag_lower();
        a.mul_lower(a).add_lower(b.mul_lower(b)).sqrt_lower()
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &ComplexBall) -> Self {
        Self::new(self.re.union(&other.re), self.im.union(&other.im))
    }

    /// Midpoints as `f64`.
    pub fn to_complex(&self) -> Complex<f64> {
        Complex::new(self.re.to_f64(), self.im.to_f64())
    }
}

/// `sqrt` of an exact point off the negative real axis.
fn sqrt_point(z: &ComplexBall, prec: u32) -> ComplexBall {
    let wp = prec + 8;
    let (a, b) = (z.re(), z.im());
    if b.is_zero() {
        return ComplexBall::from_real(a.sqrt(prec));
    }
    // t = sqrt((|a| + |z|)/2); for a >= 0 the root is t + i b/(2t),
    // otherwise |b|/(2t) + i sign(b) t.
    let modulus = a.sqr(wp).add(&b.sqr(wp), wp).sqrt(wp);
    let t = a.abs().add(&modulus, wp).mul_2exp(-1).sqrt(wp);
    let other = b.abs().div(&t.mul_2exp(1), wp);
    if !a.mid().is_negative() {
        let im = if b.mid().is_negative() { other.neg() } else { other };
        ComplexBall::new(t, im).round(prec)
    } else {
        let im = if b.mid().is_negative() { t.neg() } else { t };
        ComplexBall::new(other, im).round(prec)
    }
}

impl From<Complex<f64>> for ComplexBall {
    fn from(z: Complex<f64>) -> Self {
        Self::from_f64(z.re, z.im)
    }
}

impl From<Ball> for ComplexBall {
    fn from(re: Ball) -> Self {
        Self::from_real(re)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> ComplexBall {
        ComplexBall::from_f64(re, im)
    }

    fn close(z: &ComplexBall, w: Complex<f64>) -> bool {
        let approx = z.to_complex();
        (approx - w).norm() <= 1e-13 * w.norm().max(1.0) && z.rad().to_f64() < 1e-12
    }

    #[test]
    fn multiplication_and_inverse() {
        let z = c(1.5, -2.0);
        let w = c(0.25, 3.0);
        let p = z.mul(&w, 64);
        assert!(close(&p, Complex::new(1.5, -2.0) * Complex::new(0.25, 3.0)));
        let q = z.inv(64);
        assert!(close(&q, Complex::new(1.0, 0.0) / Complex::new(1.5, -2.0)));
        assert!(!ComplexBall::zero().inv(64).is_finite());
    }

    #[test]
    fn exp_and_trig_match_num_complex() {
        let z = Complex::new(0.7, -1.3);
        let b = ComplexBall::from(z);
        assert!(close(&b.exp(64), z.exp()));
        assert!(close(&b.sin(64), z.sin()));
        assert!(close(&b.cos(64), z.cos()));
        assert!(close(&b.sech(64), Complex::new(1.0, 0.0) / z.cosh()));
    }

    #[test]
    fn sqrt_principal_branch() {
        for &(re, im) in &[(3.0, 4.0), (-3.0, 4.0), (-3.0, -4.0), (0.5, -0.1)] {
            let z = Complex::new(re, im);
            assert!(close(&c(re, im).sqrt(64), z.sqrt()), "sqrt({z})");
        }
    }

    #[test]
    fn sqrt_across_cut_covers_both_branches() {
        let z = ComplexBall::new(Ball::from_f64(-1.0), Ball::new(Dyadic::from_i64(0), Mag::two_pow(-4)));
        let root = z.sqrt(64);
        assert!(root.is_finite());
        assert!(root.contains(&c(0.0, 1.0)));
        assert!(root.contains(&c(0.0, -1.0)));
    }

    #[test]
    fn pow_matches_repeated_product() {
        let z = c(0.5, 0.5);
        let p = z.pow_u(5, 64);
        assert!(close(&p, Complex::new(0.5, 0.5).powu(5)));
    }

    #[test]
    fn sech_of_a_wide_real_box_is_finite() {
        // 1000 (x - 0.6) for x in [0, 1]
        let x = ComplexBall::from_real(Ball::new(Dyadic::from_i64(-100), Mag::from_u64(500)));
        let c = x.cosh(64);
        assert!(c.is_real());
        assert!(c.re().is_positive());
        let s = x.sech(64);
        assert!(s.is_finite());
        assert!(s.re().contains_dyadic(&Dyadic::from_i64(1)));
        assert!(s.re().mag() <= Mag::from_u64(2));
    }

    #[test]
    fn real_inputs_stay_real() {
        let x = c(0.3, 0.0);
        assert!(x.exp(64).is_real());
        assert!(x.sin(64).is_real());
        assert!(x.mul(&x, 64).is_real());
    }
}
