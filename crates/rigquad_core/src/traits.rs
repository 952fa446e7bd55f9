use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ball::ComplexBall;

/// A function that can be integrated rigorously.
///
/// `evaluate` must return a ball containing `f(z)` for every `z` in the input
/// ball. With `order == 1` the result must additionally certify that `f` is
/// holomorphic on the input: implementations that are not holomorphic
/// everywhere return an indeterminate ball whenever the input meets their
/// non-holomorphic locus. Returning an indeterminate ball is always allowed.
pub trait Integrand {
    /// z: evaluation region
    /// order: 0 for a plain value, 1 to also certify holomorphy
    /// prec: working precision in bits
    fn evaluate(&self, z: &ComplexBall, order: u32, prec: u32) -> ComplexBall;
}

impl<F: ?Sized> Integrand for F
where
    F: Fn(&ComplexBall, u32, u32) -> ComplexBall,
{
    fn evaluate(&self, z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
        self(z, order, prec)
    }
}

/// Whether the caller asked for a holomorphy certificate.
///
/// # Panics
/// Panics for `order > 1`; derivatives are never requested by the integrator.
pub fn holomorphic(order: u32) -> bool {
    assert!(order <= 1, "unsupported derivative order {order}");
    order == 1
}

/// Counts integrand invocations for one run.
pub struct Evaluator<'a, F: Integrand + ?Sized> {
    f: &'a F,
    count: AtomicUsize,
}

impl<'a, F: Integrand + ?Sized> Evaluator<'a, F> {
    pub fn new(f: &'a F) -> Self {
        Self {
            f,
            count: AtomicUsize::new(0),
        }
    }

    pub fn evaluate(&self, z: &ComplexBall, order: u32, prec: u32) -> ComplexBall {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.f.evaluate(z, order, prec)
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_integrands_and_calls_are_counted() {
        let f = |z: &ComplexBall, _order: u32, prec: u32| z.mul(z, prec);
        let eval = Evaluator::new(&f);
        let z = ComplexBall::from_f64(0.0, 2.0);
        let w = eval.evaluate(&z, 0, 64);
        assert_eq!(w, ComplexBall::from_i64(-4));
        eval.evaluate(&z, 1, 64);
        assert_eq!(eval.count(), 2);
    }

    #[test]
    #[should_panic(expected = "unsupported derivative order")]
    fn second_derivative_is_fatal() {
        holomorphic(2);
    }
}
