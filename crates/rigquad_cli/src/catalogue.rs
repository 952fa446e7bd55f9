//! The numbered integrals the binary can compute.

use rigquad_core::{
    integrate, integrate_path, pi, Ball, ComplexBall, Dyadic, Integral, IntegrationError,
    Integrand, Mag,
};

use crate::cli::RunSettings;
use crate::integrands::{self, LaurentCoefficient};

type Compute = fn(&RunSettings) -> Result<Integral, IntegrationError>;

pub struct Entry {
    pub description: &'static str,
    compute: Compute,
}

impl Entry {
    pub fn compute(&self, settings: &RunSettings) -> Result<Integral, IntegrationError> {
        (self.compute)(settings)
    }
}

pub static ENTRIES: [Entry; 20] = [
    Entry {
        description: "int_0^100 sin(x) dx",
        compute: sin_0_100,
    },
    Entry {
        description: "4 int_0^1 1/(1+x^2) dx",
        compute: four_atan,
    },
    Entry {
        description: "2 int_0^{inf} 1/(1+x^2) dx   (using domain truncation)",
        compute: two_atan_infinite,
    },
    Entry {
        description: "4 int_0^1 sqrt(1-x^2) dx",
        compute: quarter_circle,
    },
    Entry {
        description: "int_0^8 sin(x+exp(x)) dx",
        compute: rump,
    },
    Entry {
        description: "int_1^101 floor(x) dx",
        compute: floor,
    },
    Entry {
        description: "int_0^1 |x^4+10x^3+19x^2-6x-6| exp(x) dx",
        compute: helfgott,
    },
    Entry {
        description: "1/(2 pi i) int exp(z)/z dz  (closed square around z = 0)",
        compute: residue_exp_over_z,
    },
    Entry {
        description: "int_0^1 sin(1/x) dx  (slow convergence, use -heap and/or -tol)",
        compute: essential,
    },
    Entry {
        description: "int_0^1 x sin(1/x) dx  (slow convergence, use -heap and/or -tol)",
        compute: damped_essential,
    },
    Entry {
        description: "int_0^10000 x^1000 exp(-x) dx",
        compute: factorial_1000,
    },
    Entry {
        description: "int_{-10}^{10} sin(x) + exp(-200-x^2) dx",
        compute: sin_plus_small,
    },
    Entry {
        description: "int_{-1020}^{-1010} exp(x) dx  (use -tol 0 for relative error)",
        compute: tiny_exp,
    },
    Entry {
        description: "int_0^{inf} exp(-x^2) dx   (using domain truncation)",
        compute: gaussian,
    },
    Entry {
        description: "int_0^1 sech(10(x-0.2))^2 + sech(100(x-0.4))^4 + sech(1000(x-0.6))^6 dx",
        compute: spikes,
    },
    Entry {
        description: "int_0^8 (exp(x)-floor(exp(x))) sin(x+exp(x)) dx  (use higher -eval)",
        compute: fractional_rump,
    },
    Entry {
        description: "int_0^{inf} sech(x) dx   (using domain truncation)",
        compute: sech,
    },
    Entry {
        description: "int_0^{inf} sech^3(x) dx   (using domain truncation)",
        compute: sech_cubed,
    },
    Entry {
        description: "int_0^{inf} x exp(-x)/(1+exp(-x)) dx   (using domain truncation)",
        compute: log_div1p,
    },
    Entry {
        description: "1/(2 pi i) int exp(z)/z^11 dz  (10th Laurent coefficient of exp, 1/10!)",
        compute: laurent_exp,
    },
];

fn real(x: i64) -> ComplexBall {
    ComplexBall::from_i64(x)
}

fn segment<F: Integrand + ?Sized>(
    s: &RunSettings,
    f: &F,
    a: ComplexBall,
    b: ComplexBall,
) -> Result<Integral, IntegrationError> {
    integrate(f, &a, &b, s.goal, s.tol, &s.options, s.prec)
}

/// Integral over the square with corners `+/-1 +/-i`, divided by `2 pi i`.
fn residue<F: Integrand + ?Sized>(s: &RunSettings, f: &F) -> Result<Integral, IntegrationError> {
    let square = [
        ComplexBall::from_f64(1.0, -1.0),
        ComplexBall::from_f64(1.0, 1.0),
        ComplexBall::from_f64(-1.0, 1.0),
        ComplexBall::from_f64(-1.0, -1.0),
    ];
    let mut result = integrate_path(f, &square, true, s.goal, s.tol, &s.options, s.prec)?;
    let two_pi = pi(s.prec).mul_2exp(1);
    result.value = result.value.div_i().mul_real(&two_pi.inv(s.prec), s.prec);
    Ok(result)
}

fn bit_len(n: u32) -> u32 {
    u32::BITS - n.leading_zeros()
}

/// Truncation point `ceil(x)` for the infinite tails below.
fn cutoff(x: f64) -> i64 {
    x.ceil() as i64
}

fn sin_0_100(s: &RunSettings) -> Result<Integral, IntegrationError> {
    segment(s, &integrands::sin, real(0), real(100))
}

fn four_atan(s: &RunSettings) -> Result<Integral, IntegrationError> {
    let mut result = segment(s, &integrands::atan_derivative, real(0), real(1))?;
    result.value = result.value.mul_2exp(2);
    Ok(result)
}

fn two_atan_infinite(s: &RunSettings) -> Result<Integral, IntegrationError> {
    let end = ComplexBall::from_real(Ball::exact(Dyadic::two_pow(i64::from(s.goal))));
    let mut result = segment(s, &integrands::atan_derivative, real(0), end)?;
    // The tail beyond 2^goal is below 2^-goal.
    result.add_real_error(Mag::two_pow(-i64::from(s.goal)));
    result.value = result.value.mul_2exp(1);
    Ok(result)
}

fn quarter_circle(s: &RunSettings) -> Result<Integral, IntegrationError> {
    let mut result = segment(s, &integrands::circle, real(0), real(1))?;
    result.value = result.value.mul_2exp(2);
    Ok(result)
}

fn rump(s: &RunSettings) -> Result<Integral, IntegrationError> {
    segment(s, &integrands::rump, real(0), real(8))
}

fn floor(s: &RunSettings) -> Result<Integral, IntegrationError> {
    segment(s, &integrands::floor, real(1), real(101))
}

fn helfgott(s: &RunSettings) -> Result<Integral, IntegrationError> {
    segment(s, &integrands::helfgott, real(0), real(1))
}

fn residue_exp_over_z(s: &RunSettings) -> Result<Integral, IntegrationError> {
    residue(s, &integrands::exp_over_z)
}

fn essential(s: &RunSettings) -> Result<Integral, IntegrationError> {
    segment(s, &integrands::essential_sin, real(0), real(1))
}

fn damped_essential(s: &RunSettings) -> Result<Integral, IntegrationError> {
    segment(s, &integrands::damped_essential_sin, real(0), real(1))
}

fn factorial_1000(s: &RunSettings) -> Result<Integral, IntegrationError> {
    segment(s, &integrands::factorial_1000, real(0), real(10_000))
}

fn sin_plus_small(s: &RunSettings) -> Result<Integral, IntegrationError> {
    segment(s, &integrands::sin_plus_small, real(-10), real(10))
}

fn tiny_exp(s: &RunSettings) -> Result<Integral, IntegrationError> {
    segment(s, &integrands::exp, real(-1020), real(-1010))
}

fn gaussian(s: &RunSettings) -> Result<Integral, IntegrationError> {
    let b = cutoff((f64::from(s.goal) * std::f64::consts::LN_2).sqrt() + 1.0);
    let mut result = segment(s, &integrands::gaussian, real(0), real(b))?;
    // int_b^inf e^(-x^2) <= e^(-b^2) for b >= 1
    let tail = Ball::from_i64(-(b * b)).exp(s.prec);
    result.add_real_error(tail.mag());
    Ok(result)
}

fn spikes(s: &RunSettings) -> Result<Integral, IntegrationError> {
    segment(s, &integrands::spikes, real(0), real(1))
}

fn fractional_rump(s: &RunSettings) -> Result<Integral, IntegrationError> {
    segment(s, &integrands::fractional_rump, real(0), real(8))
}

fn sech(s: &RunSettings) -> Result<Integral, IntegrationError> {
    let b = cutoff(f64::from(s.goal) * std::f64::consts::LN_2 + 1.0);
    let mut result = segment(s, &integrands::sech, real(0), real(b))?;
    // sech x <= 2 e^-x
    let tail = Ball::from_i64(-b).exp(s.prec).mul_2exp(1);
    result.add_real_error(tail.mag());
    Ok(result)
}

fn sech_cubed(s: &RunSettings) -> Result<Integral, IntegrationError> {
    let b = cutoff(f64::from(s.goal) * std::f64::consts::LN_2 / 3.0 + 2.0);
    let mut result = segment(s, &integrands::sech_cubed, real(0), real(b))?;
    // sech^3 x <= 8 e^(-3x)
    let tail = Ball::from_i64(-3 * b)
        .exp(s.prec)
        .mul_2exp(3)
        .div_u64(3, s.prec);
    result.add_real_error(tail.mag());
    Ok(result)
}

fn log_div1p(s: &RunSettings) -> Result<Integral, IntegrationError> {
    let n = i64::from(s.goal) + i64::from(bit_len(s.goal));
    let mut result = segment(s, &integrands::log_div1p_transformed, real(0), real(n))?;
    // int_N^inf x e^-x / (1 + e^-x) <= (N + 1) e^-N
    let tail = Ball::from_i64(-n)
        .exp(s.prec)
        .mul(&Ball::from_i64(n + 1), s.prec);
    result.add_real_error(tail.mag());
    Ok(result)
}

fn laurent_exp(s: &RunSettings) -> Result<Integral, IntegrationError> {
    residue(s, &LaurentCoefficient { n: 10 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigquad_core::{Options, QueueDiscipline};

    fn settings(prec: u32) -> RunSettings {
        RunSettings {
            prec,
            goal: prec,
            tol: Mag::two_pow(-i64::from(prec)),
            options: Options::default(),
        }
    }

    fn decimal(text: &str) -> Ball {
        Ball::from_decimal_str(text, 128).expect("valid literal")
    }

    /// Runs entry `index` with both queue disciplines at 64 bits and checks
    /// that each result is complete, tight and consistent with the other.
    fn assert_disciplines_agree(index: usize, expected: &Ball) {
        let stack = settings(64);
        let mut heap = settings(64);
        heap.options.discipline = QueueDiscipline::Heap;
        let s = ENTRIES[index].compute(&stack).expect("integral runs");
        let h = ENTRIES[index].compute(&heap).expect("integral runs");
        for (name, result) in [("stack", &s), ("heap", &h)] {
            assert!(result.is_complete(), "I{index} {name}: {:?}", result.status);
            assert!(result.value.re().overlaps(expected), "I{index} {name}: {}", result.value);
            assert!(result.value.rad() < Mag::two_pow(-56), "I{index} {name}: {}", result.value);
        }
        let gap = Mag::from_dyadic(&(s.value.re().mid() - h.value.re().mid()));
        assert!(
            gap <= s.value.re().rad().min(h.value.re().rad()),
            "I{index}: stack {} heap {}",
            s.value,
            h.value
        );
    }

    #[test]
    fn four_atan_encloses_pi() {
        let result = ENTRIES[1].compute(&settings(64)).expect("integral runs");
        assert!(result.is_complete());
        assert!(result.value.re().overlaps(&pi(128)));
        assert!(result.value.rad() < Mag::two_pow(-58));
    }

    #[test]
    fn residue_of_exp_over_z_is_one() {
        let result = ENTRIES[7].compute(&settings(48)).expect("integral runs");
        assert!(result.value.overlaps(&ComplexBall::one()));
        assert!(result.value.rad() < Mag::two_pow(-40));
    }

    #[test]
    fn laurent_coefficient_is_inverse_factorial() {
        let result = ENTRIES[19].compute(&settings(48)).expect("integral runs");
        let expected = Ball::one().div_u64(3_628_800, 128);
        assert!(result.value.re().overlaps(&expected));
        assert!(result.value.im().contains_zero());
    }

    #[test]
    fn truncated_gaussian_includes_its_tail() {
        let result = ENTRIES[13].compute(&settings(32)).expect("integral runs");
        // sqrt(pi) / 2
        let expected = decimal("0.88622692545275801364908374167057259139877472806119");
        assert!(result.value.re().overlaps(&expected));
        assert!(result.value.re().rad() > Mag::zero());
    }

    #[test]
    fn quarter_circle_agrees_across_disciplines() {
        assert_disciplines_agree(3, &pi(128));
    }

    #[test]
    fn helfgott_agrees_across_disciplines() {
        let expected = decimal("11.147310550057139734").with_error(Mag::two_pow(-56));
        assert_disciplines_agree(6, &expected);
    }

    #[test]
    fn sech_spikes_agree_across_disciplines() {
        let expected = decimal("0.21080273550054927").with_error(Mag::two_pow(-50));
        assert_disciplines_agree(14, &expected);
    }

    #[test]
    fn descriptions_are_unique() {
        for (i, a) in ENTRIES.iter().enumerate() {
            for b in &ENTRIES[i + 1..] {
                assert_ne!(a.description, b.description);
            }
        }
    }
}
