pub mod ball;
pub mod error;
pub mod integrate;
pub mod legendre;
pub mod quadrature;
pub mod scheduler;
/// The `rigquad_core` crate computes certified enclosures of complex line
/// integrals.
///
/// Key components:
/// - **Ball arithmetic**: `Ball` and `ComplexBall`, dyadic midpoints with upward-rounded radii.
/// - **Legendre**: certified Gauss–Legendre nodes and weights, cached per degree and precision.
/// - **Quadrature**: one segment with a rigorous Bernstein-ellipse error bound.
/// - **Scheduler**: adaptive bisection with error budgets and resource limits.
/// - **Integrate**: the public entry points for segments and polygonal contours.
pub mod traits;

pub use ball::{pi, Ball, ComplexBall, Dyadic, Mag};
pub use error::IntegrationError;
pub use integrate::{
    integrate, integrate_path, integrate_path_cancellable, Integral, Limits, Options,
    QueueDiscipline,
};
pub use scheduler::{RunStats, Status};
pub use traits::{holomorphic, Evaluator, Integrand};
