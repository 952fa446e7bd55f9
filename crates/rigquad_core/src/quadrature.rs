//! Gauss–Legendre quadrature on one straight segment with a rigorous
//! truncation bound.
//!
//! With `z(t) = c + h t` and `f` holomorphic and bounded by `M` inside the
//! Bernstein ellipse `E_rho` around `[-1, 1]`, the `n`-point rule satisfies
//! `|I - I_n| <= |h| 64 M / (15 (rho^2 - 1) rho^(2n))`.

use tracing::trace;

use crate::ball::{Ball, ComplexBall, Dyadic, Mag};
use crate::legendre::gauss_legendre;
use crate::traits::{Evaluator, Integrand};

/// Ellipse parameters tried from the largest down.
const RHOS: [f64; 6] = [8.0, 4.0, 2.0, 1.5, 1.25, 1.125];

#[derive(Debug, Clone, PartialEq)]
pub enum Quadrature {
    Accepted { value: ComplexBall, degree: usize },
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `f` could not be certified holomorphic on the segment itself.
    NotHolomorphic,
    /// No ellipse around the segment gave a finite bound.
    NoEllipse,
    /// The degree needed for the tolerance exceeds the ceiling.
    DegreeLimit(usize),
    /// A node evaluation was indeterminate at this degree.
    Indeterminate(usize),
}

impl Quadrature {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Quadrature::Accepted { .. })
    }

    pub fn value(&self) -> Option<&ComplexBall> {
        match self {
            Quadrature::Accepted { value, .. } => Some(value),
            Quadrature::Rejected(_) => None,
        }
    }
}

/// Rounds a degree up to `1..=8`, then to multiples of `2^(bitlen(n) - 3)`.
pub fn ladder_degree(n: usize) -> usize {
    if n <= 8 {
        return n.max(1);
    }
    let bits = usize::BITS - n.leading_zeros();
    let step = 1usize << (bits - 3);
    n.div_ceil(step) * step
}

fn bit_len(n: usize) -> u32 {
    usize::BITS - n.leading_zeros()
}

/// Rigorous upper bound for the Gauss–Legendre error at degree `n`.
pub fn truncation_bound(n: usize, rho: &Dyadic, max_abs: Mag, half_len: Mag) -> Mag {
    let rho_low = Mag::from_dyadic_lower(rho);
    let rho_sq_minus_one = Mag::from_dyadic_lower(&(&(rho * rho) - &Dyadic::from_i64(1)));
    let exponent = u32::try_from(2 * n).unwrap_or(u32::MAX);
    let den = Mag::from_u64_lower(15)
        .mul_lower(rho_sq_minus_one)
        .mul_lower(rho_low.pow_lower(exponent));
    half_len.mul(max_abs).mul_2exp(6).div(den)
}

/// Least `n` with `E(n) <= tol`, estimated in floating point.
fn estimate_degree(rho: f64, max_abs: Mag, half_len: Mag, tol: Mag) -> Option<usize> {
    let lhs = half_len.log2_approx() + 6.0 + max_abs.log2_approx()
        - 15f64.log2()
        - (rho * rho - 1.0).log2()
        - tol.log2_approx();
    if lhs.is_nan() || lhs == f64::INFINITY {
        return None;
    }
    let n = (lhs / (2.0 * rho.log2())).ceil().max(1.0);
    if n > 1.0e7 {
        None
    } else {
        Some(n as usize)
    }
}

/// Box containing the Bernstein ellipse `E_rho` mapped onto the segment.
fn ellipse_box(centre: &ComplexBall, half: &ComplexBall, rho: &Dyadic, prec: u32) -> ComplexBall {
    let rho_ball = Ball::exact(rho.clone());
    let inv = rho_ball.inv(prec);
    let alpha = rho_ball.add(&inv, prec).mul_2exp(-1).mag();
    let beta = rho_ball.sub(&inv, prec).mul_2exp(-1).mag();
    let t = ComplexBall::new(
        Ball::new(Dyadic::from_i64(0), alpha),
        Ball::new(Dyadic::from_i64(0), beta),
    );
    centre.add(&half.mul(&t, prec), prec)
}

/// Integrates `f` over the segment `[a, b]`, accepting only when the rigorous
/// truncation bound is at most `tol`.
pub fn integrate_segment<F: Integrand + ?Sized>(
    eval: &Evaluator<'_, F>,
    a: &ComplexBall,
    b: &ComplexBall,
    tol: Mag,
    deg_limit: usize,
    prec: u32,
) -> Quadrature {
    let gp = prec + 16;
    let centre = a.add(b, gp).mul_2exp(-1);
    let half = b.sub(a, gp).mul_2exp(-1);
    let half_len = half.mag();

    if !eval.evaluate(&a.union(b), 1, prec).is_finite() {
        return Quadrature::Rejected(Rejection::NotHolomorphic);
    }

    let mut best: Option<(usize, Dyadic, Mag)> = None;
    for &rho in &RHOS {
        let Some(rho_exact) = Dyadic::from_f64(rho) else {
            continue;
        };
        let region = ellipse_box(&centre, &half, &rho_exact, gp);
        let bound = eval.evaluate(&region, 1, prec);
        if !bound.is_finite() {
            if best.is_some() {
                break;
            }
            continue;
        }
        let max_abs = bound.mag();
        let Some(n) = estimate_degree(rho, max_abs, half_len, tol) else {
            continue;
        };
        match &best {
            Some((best_n, _, _)) if n >= *best_n => break,
            _ => best = Some((n, rho_exact, max_abs)),
        }
    }
    let Some((estimate, rho, max_abs)) = best else {
        return Quadrature::Rejected(Rejection::NoEllipse);
    };

    let mut n = ladder_degree(estimate);
    let mut error = truncation_bound(n, &rho, max_abs, half_len);
    while error > tol {
        n = ladder_degree(n + 1);
        if n > deg_limit {
            break;
        }
        error = truncation_bound(n, &rho, max_abs, half_len);
    }
    if n > deg_limit {
        return Quadrature::Rejected(Rejection::DegreeLimit(n));
    }

    let wp = prec + 2 * bit_len(n) + 8;
    let rule = gauss_legendre(n, wp);
    let mut sum = ComplexBall::zero();
    for (x, w) in rule.iter() {
        let z = centre.add(&half.mul_real(x, wp), wp);
        let v = eval.evaluate(&z, 0, wp);
        if !v.is_finite() || !w.is_finite() {
            return Quadrature::Rejected(Rejection::Indeterminate(n));
        }
        sum = sum.add(&v.mul_real(w, wp), wp);
    }
    let mut value = sum.mul(&half, wp);
    value.add_error(error);
    trace!(degree = n, rho = rho.to_f64(), error = error.to_f64(), "segment quadrature");
    Quadrature::Accepted { value, degree: n }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::holomorphic;

    fn exp_integrand(z: &ComplexBall, _order: u32, prec: u32) -> ComplexBall {
        z.exp(prec)
    }

    #[test]
    fn ladder_rounds_up() {
        let ladder: Vec<usize> = [1, 5, 8, 9, 10, 11, 15, 16, 17, 21, 33].iter().map(|&n| ladder_degree(n)).collect();
        assert_eq!(ladder, vec![1, 5, 8, 10, 10, 12, 16, 16, 20, 24, 40]);
        assert_eq!(ladder_degree(0), 1);
    }

    #[test]
    fn truncation_bound_matches_formula() {
        let rho = Dyadic::from_i64(4);
        let e8 = truncation_bound(8, &rho, Mag::one(), Mag::one());
        let e16 = truncation_bound(16, &rho, Mag::one(), Mag::one());
        assert!(e16 < e8);
        // 64 / (15 (rho^2 - 1) rho^(2n)) with rho^2 - 1 = 15
        for (bound, n) in [(e8, 8), (e16, 16)] {
            let expected = 64.0 / (15.0 * 15.0 * 4f64.powi(2 * n));
            assert!(bound.to_f64() >= expected);
            assert!(bound.to_f64() <= expected * (1.0 + 1e-6));
        }
    }

    #[test]
    fn exp_over_unit_interval_is_enclosed() {
        let eval = Evaluator::new(&exp_integrand);
        let a = ComplexBall::zero();
        let b = ComplexBall::one();
        let result = integrate_segment(&eval, &a, &b, Mag::two_pow(-70), 200, 80);
        let value = result.value().expect("exp is entire");
        let e_minus_one = Ball::one().exp(100).sub(&Ball::one(), 100);
        assert!(value.re().overlaps(&e_minus_one));
        assert!(value.im().contains_zero());
        assert!(value.rad() < Mag::two_pow(-68));
    }

    #[test]
    fn cut_on_the_segment_is_rejected() {
        let sqrt = |z: &ComplexBall, order: u32, prec: u32| {
            if holomorphic(order) && z.re().contains_nonpositive() && z.im().contains_zero() {
                ComplexBall::indeterminate()
            } else {
                z.sqrt(prec)
            }
        };
        let eval = Evaluator::new(&sqrt);
        let a = ComplexBall::from_i64(-1);
        let b = ComplexBall::from_i64(1);
        let result = integrate_segment(&eval, &a, &b, Mag::two_pow(-30), 100, 64);
        assert_eq!(result, Quadrature::Rejected(Rejection::NotHolomorphic));
        assert_eq!(eval.count(), 1);
    }

    #[test]
    fn degree_ceiling_rejects() {
        let eval = Evaluator::new(&exp_integrand);
        let a = ComplexBall::zero();
        let b = ComplexBall::from_i64(40);
        let result = integrate_segment(&eval, &a, &b, Mag::two_pow(-200), 4, 64);
        assert!(matches!(result, Quadrature::Rejected(Rejection::DegreeLimit(n)) if n > 4));
    }
}
