//! Arbitrary-precision ball arithmetic.
//!
//! A ball is an exact dyadic midpoint with an upward-rounded radius. Every
//! operation returns a ball containing all results consistent with its
//! inputs; an infinite radius marks an indeterminate value.

mod complex;
mod consts;
mod dyadic;
mod format;
mod mag;
mod real;

pub use complex::ComplexBall;
pub use consts::pi;
pub use dyadic::{Dyadic, Round};
pub use format::ParseBallError;
pub use mag::{Mag, MAG_BITS};
pub use real::Ball;
