use std::sync::{Mutex, OnceLock};

use dashu::integer::UBig;

use super::dyadic::Dyadic;
use super::mag::Mag;
use super::real::Ball;

static PI_CACHE: OnceLock<Mutex<Option<(u32, Ball)>>> = OnceLock::new();

/// Enclosure of π at `prec` bits. The most precise value computed so far is
/// kept for the lifetime of the process.
pub fn pi(prec: u32) -> Ball {
    let cache = PI_CACHE.get_or_init(|| Mutex::new(None));
    let mut guard = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some((cached_prec, value)) = guard.as_ref() {
        if *cached_prec >= prec {
            return value.round(prec);
        }
    }
    let value = pi_machin(prec);
    *guard = Some((prec, value.clone()));
    value
}

/// π = 16 atan(1/5) - 4 atan(1/239).
fn pi_machin(prec: u32) -> Ball {
    let wp = prec + 20;
    let a = atan_inv(5, wp).mul_2exp(4);
    let b = atan_inv(239, wp).mul_2exp(2);
    a.sub(&b, wp).round(prec)
}

/// `atan(1/n)` by its alternating Taylor series.
fn atan_inv(n: u64, wp: u32) -> Ball {
    let eps = Mag::two_pow(-(wp as i64) - 2);
    let n2 = UBig::from(n * n);
    let mut power = UBig::from(n);
    let mut sum = Ball::zero();
    let mut k = 0u64;
    loop {
        let den = &power * UBig::from(2 * k + 1);
        let term = Ball::one().div(&Ball::exact(Dyadic::from_ubig(den)), wp);
        if term.mag() < eps {
            // Remainder of an alternating series with shrinking terms.
            sum.add_error(term.mag());
            break;
        }
        sum = if k % 2 == 0 {
            sum.add(&term, wp)
        } else {
            sum.sub(&term, wp)
        };
        power = power * &n2;
        k += 1;
    }
    sum
}
