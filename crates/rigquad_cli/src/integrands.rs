//! Integrands of the catalogue.
//!
//! Functions that are only piecewise holomorphic (`abs`, `floor`, `sqrt`)
//! report an indeterminate value when asked to certify holomorphy on a region
//! that meets their non-holomorphic locus.

use rigquad_core::{holomorphic, Ball, ComplexBall, Integrand};

/// `|z|` on the real line, extended as `z` on the right half plane and `-z`
/// on the left.
pub fn holomorphic_abs(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    if !z.is_finite() || (holomorphic(order) && z.re().contains_zero()) {
        return ComplexBall::indeterminate();
    }
    if z.re().is_positive() {
        z.round(prec)
    } else if z.re().is_negative() {
        z.neg().round(prec)
    } else {
        z.union(&z.neg())
    }
}

/// `floor` on the real part, holomorphic in vertical strips between integers.
pub fn holomorphic_floor(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    if !z.is_finite() || (holomorphic(order) && z.re().contains_int()) {
        return ComplexBall::indeterminate();
    }
    ComplexBall::new(z.re().floor(), z.im().round(prec))
}

/// Principal square root, cut along the non-positive real axis.
pub fn holomorphic_sqrt(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    if !z.is_finite()
        || (holomorphic(order) && z.im().contains_zero() && z.re().contains_nonpositive())
    {
        return ComplexBall::indeterminate();
    }
    z.sqrt(prec)
}

pub fn sin(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    z.sin(prec)
}

pub fn floor(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic_floor(z, order, prec)
}

/// `sqrt(1 - z^2)`, taken as real on `[-1, 1]`.
pub fn circle(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    let t = ComplexBall::one().sub(&z.sqr(prec), prec);
    let root = holomorphic_sqrt(&t, order, prec);
    if holomorphic(order) {
        root
    } else {
        // Rounding may push |z| past 1 near the endpoints.
        ComplexBall::from_real(root.re().clone())
    }
}

/// `1 / (1 + z^2)`
pub fn atan_derivative(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    z.sqr(prec).add(&ComplexBall::one(), prec).inv(prec)
}

/// `sin(z + e^z)`, Rump's oscillatory example.
pub fn rump(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    z.exp(prec).add(z, prec).sin(prec)
}

/// `|z^4 + 10 z^3 + 19 z^2 - 6 z - 6| e^z`
pub fn helfgott(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    let mut p = ComplexBall::one();
    for c in [10, 19, -6, -6] {
        p = p.mul(z, prec).add(&ComplexBall::from_i64(c), prec);
    }
    let p = holomorphic_abs(&p, order, prec);
    if !p.is_finite() {
        return p;
    }
    p.mul(&z.exp(prec), prec)
}

/// `e^z / z`
pub fn exp_over_z(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    z.exp(prec).mul(&z.inv(prec), prec)
}

/// `sin(1/z)`; on a real segment through the origin only the plain value is
/// available, bounded by the unit interval.
pub fn essential_sin(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    if !holomorphic(order) && z.is_real() && z.re().contains_zero() {
        return ComplexBall::from_real(Ball::unit_interval());
    }
    z.inv(prec).sin(prec)
}

/// `z sin(1/z)`
pub fn damped_essential_sin(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    essential_sin(z, order, prec).mul(z, prec)
}

/// `z^1000 e^-z`
pub fn factorial_1000(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    z.pow_u(1000, prec).mul(&z.neg().exp(prec), prec)
}

/// `sin z + e^(-200 - z^2)`
pub fn sin_plus_small(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    let bump = z
        .sqr(prec)
        .add(&ComplexBall::from_i64(200), prec)
        .neg()
        .exp(prec);
    z.sin(prec).add(&bump, prec)
}

pub fn exp(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    z.exp(prec)
}

/// `e^(-z^2)`
pub fn gaussian(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    z.sqr(prec).neg().exp(prec)
}

/// `sech^2(10(z - 0.2)) + sech^4(100(z - 0.4)) + sech^6(1000(z - 0.6))`
pub fn spikes(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    let term = |scale: i64, shift: i64, power: u32| {
        z.mul_real(&Ball::from_i64(scale), prec)
            .sub(&ComplexBall::from_i64(shift), prec)
            .sech(prec)
            .pow_u(power, prec)
    };
    term(10, 2, 2)
        .add(&term(100, 40, 4), prec)
        .add(&term(1000, 600, 6), prec)
}

/// `(e^z - floor(e^z)) sin(z + e^z)`
pub fn fractional_rump(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    let t = z.exp(prec);
    let whole = holomorphic_floor(&t, order, prec);
    if !whole.is_finite() {
        return whole;
    }
    t.sub(&whole, prec).mul(&t.add(z, prec).sin(prec), prec)
}

pub fn sech(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    z.sech(prec)
}

pub fn sech_cubed(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    z.sech(prec).pow_u(3, prec)
}

/// `z e^-z / (1 + e^-z)`
pub fn log_div1p_transformed(z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
    holomorphic(order);
    let t = z.neg().exp(prec);
    let den = t.add(&ComplexBall::one(), prec);
    t.div(&den, prec).mul(z, prec)
}

/// `e^z / z^(n+1)`, whose residue at the origin is `1/n!`.
#[derive(Debug, Clone, Copy)]
pub struct LaurentCoefficient {
    pub n: u32,
}

impl Integrand for LaurentCoefficient {
    fn evaluate(&self, z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
        holomorphic(order);
        z.exp(prec).mul(&z.inv(prec).pow_u(self.n + 1, prec), prec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn real_box(lo: f64, hi: f64) -> ComplexBall {
        let a = Ball::from_f64(lo);
        ComplexBall::from_real(a.union(&Ball::from_f64(hi)))
    }

    #[test]
    fn abs_refuses_to_certify_across_zero() {
        let z = real_box(-0.5, 0.5);
        assert!(!holomorphic_abs(&z, 1, 64).is_finite());
        let plain = holomorphic_abs(&z, 0, 64);
        assert!(plain.is_finite());
        assert!(plain.re().contains(&Ball::from_f64(0.25)));
        assert!(plain.re().contains(&Ball::from_f64(0.5)));

        let left = real_box(-2.0, -1.0);
        let value = holomorphic_abs(&left, 1, 64);
        assert!(value.re().is_positive());
    }

    #[test]
    fn floor_is_holomorphic_between_integers() {
        assert!(holomorphic_floor(&real_box(2.25, 2.75), 1, 64)
            .re()
            .contains_dyadic(&rigquad_core::Dyadic::from_i64(2)));
        assert!(!holomorphic_floor(&real_box(2.5, 3.5), 1, 64).is_finite());
        let straddle = holomorphic_floor(&real_box(2.5, 3.5), 0, 64);
        assert!(straddle.re().contains_dyadic(&rigquad_core::Dyadic::from_i64(2)));
        assert!(straddle.re().contains_dyadic(&rigquad_core::Dyadic::from_i64(3)));
    }

    #[test]
    fn sqrt_detects_the_cut() {
        assert!(!holomorphic_sqrt(&real_box(-1.0, 1.0), 1, 64).is_finite());
        assert!(holomorphic_sqrt(&real_box(0.5, 1.0), 1, 64).is_finite());
        let above = ComplexBall::from_f64(-1.0, 0.5);
        assert!(holomorphic_sqrt(&above, 1, 64).is_finite());
    }

    #[test]
    fn circle_is_real_on_the_interval() {
        let decimal = |text: &str| Ball::from_decimal_str(text, 64).expect("valid literal");
        let value = circle(&ComplexBall::from_real(decimal("0.6")), 0, 64);
        assert!(value.im().is_zero());
        assert!(value.re().overlaps(&decimal("0.8")));
    }

    #[test]
    fn essential_singularity_falls_back_to_unit_interval() {
        let z = real_box(0.0, 0.5);
        let value = essential_sin(&z, 0, 64);
        assert_eq!(value.re(), &Ball::unit_interval());
        assert!(!essential_sin(&z, 1, 64).is_finite());
    }

    #[test]
    fn laurent_integrand_carries_its_order() {
        let f = LaurentCoefficient { n: 2 };
        // e^1 / 1^3
        let value = f.evaluate(&ComplexBall::one(), 0, 64);
        assert!(value.re().overlaps(&Ball::one().exp(64)));
    }

    #[test]
    #[should_panic(expected = "unsupported derivative order")]
    fn higher_orders_are_fatal() {
        sin(&ComplexBall::zero(), 2, 64);
    }
}
