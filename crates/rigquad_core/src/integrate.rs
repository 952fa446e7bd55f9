//! Entry points: options, straight-line integration and polygonal contours.

use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ball::{ComplexBall, Mag};
use crate::error::IntegrationError;
use crate::scheduler::{RunStats, Scheduler, Status};
use crate::traits::Integrand;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueDiscipline {
    /// Depth-first, left half first.
    #[default]
    Stack,
    /// Widest crude enclosure first.
    Heap,
}

/// Run options. A limit of `0` is derived from the precision by
/// [`Options::resolve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub deg_limit: usize,
    pub eval_limit: usize,
    pub depth_limit: usize,
    pub discipline: QueueDiscipline,
    pub verbose: u8,
}

/// Concrete limits for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub deg_limit: usize,
    pub eval_limit: usize,
    pub depth_limit: usize,
}

impl Options {
    pub fn resolve(&self, prec: u32, goal: u32) -> Limits {
        let p = prec as usize;
        let pick = |value: usize, derived: usize| if value == 0 { derived } else { value };
        Limits {
            deg_limit: pick(self.deg_limit, (prec.min(goal) / 2) as usize + 60),
            eval_limit: pick(self.eval_limit, 1000 * p + p * p),
            depth_limit: pick(self.depth_limit, 2 * p),
        }
    }
}

/// Enclosure of an integral together with how it was obtained.
#[derive(Debug, Clone)]
pub struct Integral {
    pub value: ComplexBall,
    pub status: Status,
    pub stats: RunStats,
}

impl Integral {
    /// Widens both parts by `err`, e.g. to account for a truncated domain.
    pub fn add_error(&mut self, err: Mag) {
        self.value.add_error(err);
    }

    /// Widens only the real part.
    pub fn add_real_error(&mut self, err: Mag) {
        let mut re = self.value.re().clone();
        re.add_error(err);
        self.value = ComplexBall::new(re, self.value.im().clone());
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }
}

fn check_inputs(points: &[ComplexBall], tol: Mag, prec: u32) -> Result<(), IntegrationError> {
    if prec == 0 {
        return Err(IntegrationError::ZeroPrecision);
    }
    if points.len() < 2 {
        return Err(IntegrationError::TooFewPoints(points.len()));
    }
    if let Some(index) = points.iter().position(|p| !p.is_finite()) {
        return Err(IntegrationError::NonFiniteEndpoint(index));
    }
    if !tol.is_finite() {
        return Err(IntegrationError::NonFiniteTolerance);
    }
    Ok(())
}

/// Integrates `f` along the straight segment from `a` to `b`.
///
/// The result contains the exact integral. It aims for an absolute error of
/// `max(tol, 2^-goal |I|)`; when a limit is hit the enclosure may be wider and
/// the corresponding [`Status`] flag is set.
pub fn integrate<F: Integrand + ?Sized>(
    f: &F,
    a: &ComplexBall,
    b: &ComplexBall,
    goal: u32,
    tol: Mag,
    options: &Options,
    prec: u32,
) -> Result<Integral, IntegrationError> {
    integrate_path(f, &[a.clone(), b.clone()], false, goal, tol, options, prec)
}

/// Integrates along the polygon through `points`; `closed` adds the leg back
/// to the first point. Each leg is a separate run with the same tolerance,
/// and the degree, evaluation and depth limits apply to every leg on its own:
/// a closed square may use up to four times `eval_limit` evaluations.
pub fn integrate_path<F: Integrand + ?Sized>(
    f: &F,
    points: &[ComplexBall],
    closed: bool,
    goal: u32,
    tol: Mag,
    options: &Options,
    prec: u32,
) -> Result<Integral, IntegrationError> {
    integrate_path_cancellable(f, points, closed, goal, tol, options, prec, None)
}

/// As [`integrate_path`], stopping early once `cancel` is set.
#[allow(clippy::too_many_arguments)]
pub fn integrate_path_cancellable<F: Integrand + ?Sized>(
    f: &F,
    points: &[ComplexBall],
    closed: bool,
    goal: u32,
    tol: Mag,
    options: &Options,
    prec: u32,
    cancel: Option<&AtomicBool>,
) -> Result<Integral, IntegrationError> {
    check_inputs(points, tol, prec)?;
    let limits = options.resolve(prec, goal);
    let mut scheduler = Scheduler::new(goal, tol, prec, limits, options.discipline, options.verbose);
    if let Some(flag) = cancel {
        scheduler = scheduler.with_cancel(flag);
    }

    let mut legs: Vec<(&ComplexBall, &ComplexBall)> = points.windows(2).map(|w| (&w[0], &w[1])).collect();
    if closed {
        if let (Some(last), Some(first)) = (points.last(), points.first()) {
            legs.push((last, first));
        }
    }

    let wp = prec + 16;
    let mut total = Integral {
        value: ComplexBall::zero(),
        status: Status::default(),
        stats: RunStats::default(),
    };
    for (a, b) in legs {
        let run = scheduler.run(f, a, b);
        total.value = total.value.add(&run.value, wp);
        total.status.merge(run.status);
        total.stats.merge(run.stats);
    }
    if options.verbose >= 1 {
        info!(
            evaluations = total.stats.evaluations,
            complete = total.status.is_complete(),
            "integration finished"
        );
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ball::{pi, Ball};

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T, IntegrationError>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn sin(z: &ComplexBall, _order: u32, prec: u32) -> ComplexBall {
        z.sin(prec)
    }

    fn quarter_circle_density(z: &ComplexBall, _order: u32, prec: u32) -> ComplexBall {
        // 4 / (1 + z^2)
        z.sqr(prec).add(&ComplexBall::one(), prec).inv(prec).mul_2exp(2)
    }

    fn run(f: &dyn Fn(&ComplexBall, u32, u32) -> ComplexBall, a: f64, b: f64, prec: u32, options: &Options) -> Integral {
        integrate(
            f,
            &ComplexBall::from_f64(a, 0.0),
            &ComplexBall::from_f64(b, 0.0),
            prec,
            Mag::two_pow(-(prec as i64)),
            options,
            prec,
        )
        .expect("valid inputs should integrate")
    }

    #[test]
    fn default_limits_follow_precision() {
        let limits = Options::default().resolve(64, 64);
        assert_eq!(limits.deg_limit, 92);
        assert_eq!(limits.eval_limit, 1000 * 64 + 64 * 64);
        assert_eq!(limits.depth_limit, 128);
        let explicit = Options {
            deg_limit: 10,
            ..Options::default()
        };
        assert_eq!(explicit.resolve(64, 20).deg_limit, 10);
        assert_eq!(Options::default().resolve(200, 20).deg_limit, 70);
    }

    #[test]
    fn options_deserialize_partially() {
        let options: Options = serde_json::from_str(r#"{"eval_limit": 500, "discipline": "heap"}"#)
            .expect("options should deserialize");
        assert_eq!(options.eval_limit, 500);
        assert_eq!(options.discipline, QueueDiscipline::Heap);
        assert_eq!(options.deg_limit, 0);
        let text = serde_json::to_string(&options).expect("options should serialize");
        assert!(text.contains("\"heap\""));
    }

    #[test]
    fn invalid_inputs_are_errors() {
        let options = Options::default();
        let z = ComplexBall::zero();
        assert_err_contains(integrate(&sin, &z, &z, 64, Mag::zero(), &options, 0), "precision");
        assert_err_contains(
            integrate_path(&sin, &[z.clone()], false, 64, Mag::zero(), &options, 64),
            "at least two points",
        );
        assert_err_contains(
            integrate(&sin, &z, &ComplexBall::indeterminate(), 64, Mag::zero(), &options, 64),
            "point 1 is not finite",
        );
        assert_err_contains(integrate(&sin, &z, &z, 64, Mag::inf(), &options, 64), "tolerance");
    }

    #[test]
    fn pi_from_arctangent_density() {
        let result = run(&quarter_circle_density, 0.0, 1.0, 64, &Options::default());
        assert!(result.is_complete());
        assert!(result.value.re().overlaps(&pi(128)));
        assert!(result.value.rad() < Mag::two_pow(-60));
    }

    #[test]
    fn sine_over_long_interval() {
        let result = run(&sin, 0.0, 100.0, 64, &Options::default());
        // 1 - cos(100)
        let exact = Ball::one().sub(&Ball::from_i64(100).cos(128), 128);
        assert!(result.value.re().overlaps(&exact));
        assert!(result.value.re().rad() < Mag::two_pow(-55));
        assert!(result.is_complete());
    }

    #[test]
    fn tightens_with_precision() {
        let coarse = run(&sin, 0.0, 100.0, 32, &Options::default());
        let fine = run(&sin, 0.0, 100.0, 96, &Options::default());
        assert!(fine.value.rad() < coarse.value.rad());
        assert!(coarse.value.overlaps(&fine.value));
    }

    #[test]
    fn disciplines_agree() {
        let stack = run(&quarter_circle_density, 0.0, 1.0, 64, &Options::default());
        let heap = run(
            &quarter_circle_density,
            0.0,
            1.0,
            64,
            &Options {
                discipline: QueueDiscipline::Heap,
                ..Options::default()
            },
        );
        assert!(stack.is_complete() && heap.is_complete());
        let gap = Mag::from_dyadic(&(stack.value.re().mid() - heap.value.re().mid()));
        assert!(gap <= stack.value.re().rad().min(heap.value.re().rad()));
    }

    #[test]
    fn eval_limit_one_is_flagged_and_sound() {
        let options = Options {
            eval_limit: 1,
            ..Options::default()
        };
        let result = run(&sin, 0.0, 100.0, 64, &options);
        assert!(result.status.eval_limit_hit);
        let exact = Ball::one().sub(&Ball::from_i64(100).cos(128), 128);
        assert!(result.value.re().overlaps(&exact));
    }

    #[test]
    fn closed_contour_around_pole() {
        // 1/(2 pi i) times the integral of e^z / z around the origin is 1.
        let f = |z: &ComplexBall, _order: u32, prec: u32| z.exp(prec).div(z, prec);
        let square = [
            ComplexBall::from_f64(1.0, -1.0),
            ComplexBall::from_f64(1.0, 1.0),
            ComplexBall::from_f64(-1.0, 1.0),
            ComplexBall::from_f64(-1.0, -1.0),
        ];
        let result = integrate_path(&f, &square, true, 48, Mag::two_pow(-48), &Options::default(), 48)
            .expect("square contour should integrate");
        let two_pi = pi(64).mul_2exp(1);
        let residue = result.value.div_i().mul_real(&two_pi.inv(64), 64);
        assert!(residue.overlaps(&ComplexBall::one()));
        assert!(residue.rad() < Mag::two_pow(-40));
        assert!(result.stats.accepted >= 4);
    }

    #[test]
    fn evaluation_limit_applies_per_leg() {
        let options = Options {
            eval_limit: 1,
            ..Options::default()
        };
        let square = [
            ComplexBall::from_f64(1.0, -1.0),
            ComplexBall::from_f64(1.0, 1.0),
            ComplexBall::from_f64(-1.0, 1.0),
            ComplexBall::from_f64(-1.0, -1.0),
        ];
        let result = integrate_path(&sin, &square, true, 32, Mag::two_pow(-32), &options, 32)
            .expect("square contour should integrate");
        assert!(result.status.eval_limit_hit);
        assert_eq!(result.stats.evaluations, 4);
        // sin is entire, so the closed integral is zero.
        assert!(result.value.overlaps(&ComplexBall::zero()));
    }

    #[test]
    fn tail_errors_widen_the_enclosure() {
        let mut result = run(&sin, 0.0, 1.0, 32, &Options::default());
        let before = result.value.clone();
        result.add_real_error(Mag::two_pow(-10));
        assert!(result.value.re().rad() >= Mag::two_pow(-10));
        assert_eq!(result.value.im(), before.im());
        result.add_error(Mag::two_pow(-8));
        assert!(result.value.im().rad() >= Mag::two_pow(-8));
        assert!(result.value.contains(&before));
    }
}
