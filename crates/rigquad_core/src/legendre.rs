//! Certified Gauss–Legendre nodes and weights.
//!
//! Floating-point node guesses come from the Golub–Welsch eigenproblem, are
//! polished by Newton iteration in ball arithmetic and then certified with an
//! interval Newton step. A node that cannot be certified is returned as an
//! indeterminate ball, which makes every quadrature using it fail safely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use nalgebra::{DMatrix, SymmetricEigen};
use tracing::trace;

use crate::ball::{Ball, Dyadic, Mag, Round};

/// Nodes on `[-1, 1]` with matching weights.
#[derive(Debug, Clone)]
pub struct GaussLegendreRule {
    degree: usize,
    prec: u32,
    nodes: Vec<Ball>,
    weights: Vec<Ball>,
}

impl GaussLegendreRule {
    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn prec(&self) -> u32 {
        self.prec
    }

    pub fn nodes(&self) -> &[Ball] {
        &self.nodes
    }

    pub fn weights(&self) -> &[Ball] {
        &self.weights
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ball, &Ball)> {
        self.nodes.iter().zip(self.weights.iter())
    }

    /// Every node and weight has a finite enclosure.
    pub fn is_certified(&self) -> bool {
        self.nodes.iter().chain(self.weights.iter()).all(Ball::is_finite)
    }
}

type RuleCache = Mutex<HashMap<(usize, u32), Arc<GaussLegendreRule>>>;

static RULES: OnceLock<RuleCache> = OnceLock::new();

/// The `n`-point rule at `prec` bits, computed once per process.
pub fn gauss_legendre(n: usize, prec: u32) -> Arc<GaussLegendreRule> {
    let cache = RULES.get_or_init(|| Mutex::new(HashMap::new()));
    if let Some(rule) = cache
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&(n, prec))
    {
        return Arc::clone(rule);
    }
    let rule = Arc::new(compute_rule(n.max(1), prec));
    let mut guard = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(guard.entry((n, prec)).or_insert(rule))
}

fn compute_rule(n: usize, prec: u32) -> GaussLegendreRule {
    // Guard bits for the three-term recurrence and the final rounding.
    let lp = prec + 2 * n as u32 + 32;
    let guesses = initial_nodes(n);
    let half = n / 2;
    let mut positive = Vec::with_capacity(half + 1);
    for &guess in guesses.iter().take(half) {
        positive.push(certify_node(n, guess, lp));
    }
    if n % 2 == 1 {
        positive.push(certify_node(n, 0.0, lp));
    }

    let mut nodes = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);
    for node in &positive {
        let (x, w) = match node {
            Some(x) => (x.round(prec), weight(n, x, lp).round(prec)),
            None => (Ball::indeterminate(), Ball::indeterminate()),
        };
        nodes.push(x);
        weights.push(w);
    }
    for k in (0..half).rev() {
        nodes.push(nodes[k].neg());
        weights.push(weights[k].clone());
    }
    let rule = GaussLegendreRule {
        degree: n,
        prec,
        nodes,
        weights,
    };
    trace!(degree = n, prec, certified = rule.is_certified(), "computed Gauss-Legendre rule");
    rule
}

/// Eigenvalues of the Jacobi matrix, largest first.
fn initial_nodes(n: usize) -> Vec<f64> {
    let mut jacobi = DMatrix::<f64>::zeros(n, n);
    for k in 1..n {
        let kf = k as f64;
        let b = kf / (4.0 * kf * kf - 1.0).sqrt();
        jacobi[(k - 1, k)] = b;
        jacobi[(k, k - 1)] = b;
    }
    let eig = SymmetricEigen::new(jacobi);
    let mut values: Vec<f64> = eig.eigenvalues.iter().copied().collect();
    values.sort_by(|a, b| b.total_cmp(a));
    values
}

/// `(P_n(x), P_{n-1}(x))` by the three-term recurrence.
fn legendre_pair(n: usize, x: &Ball, prec: u32) -> (Ball, Ball) {
    let mut prev = Ball::one();
    let mut cur = x.clone();
    for k in 1..n as i64 {
        // (k+1) P_{k+1} = (2k+1) x P_k - k P_{k-1}
        let a = x.mul(&cur, prec).mul(&Ball::from_i64(2 * k + 1), prec);
        let b = prev.mul(&Ball::from_i64(k), prec);
        let next = a.sub(&b, prec).div_u64(k as u64 + 1, prec);
        prev = cur;
        cur = next;
    }
    (cur, prev)
}

/// `P'_n(x) = n (x P_n - P_{n-1}) / (x^2 - 1)`.
fn derivative(n: usize, x: &Ball, p: &Ball, q: &Ball, prec: u32) -> Ball {
    let num = x
        .mul(p, prec)
        .sub(q, prec)
        .mul(&Ball::from_i64(n as i64), prec);
    let den = x.sqr(prec).sub(&Ball::one(), prec);
    num.div(&den, prec)
}

/// `max |P''_n|` on `[-1, 1]`, attained at the endpoints.
fn second_derivative_bound(n: usize) -> Mag {
    let n = n as u64;
    Mag::from_u64((n.saturating_sub(1)) * n)
        .mul(Mag::from_u64((n + 1) * (n + 2)))
        .mul_2exp(-3)
}

fn newton_steps(lp: u32) -> u32 {
    let mut bits = 40u32;
    let mut steps = 1;
    while bits < lp {
        bits = bits.saturating_mul(2);
        steps += 1;
    }
    steps
}

/// Polishes a node guess and certifies it; `None` when the interval Newton
/// step fails to contract.
fn certify_node(n: usize, guess: f64, lp: u32) -> Option<Ball> {
    let mut x = Dyadic::from_f64(guess)?;
    for _ in 0..newton_steps(lp) {
        let xb = Ball::exact(x.clone());
        let (p, q) = legendre_pair(n, &xb, lp);
        let step = p.div(&derivative(n, &xb, &p, &q, lp), lp);
        if !step.is_finite() {
            return None;
        }
        x = (&x - step.mid()).round(lp, Round::Nearest).0;
    }

    let xb = Ball::exact(x.clone());
    let (p, q) = legendre_pair(n, &xb, lp);
    let dp = derivative(n, &xb, &p, &q, lp);
    let m2 = second_derivative_bound(n);
    // Recurrence rounding dominates the residual, so size the search region
    // from the Newton step itself.
    let step = p.mag().div(dp.mag_lower());
    let floor = Mag::two_pow(8 - lp as i64);
    for shift in [2i64, 8, 16] {
        let eps = step.mul_2exp(shift).max(floor);
        if !eps.is_finite() {
            return None;
        }
        // P' over [x - eps, x + eps]
        let dp_region = dp.clone().with_error(eps.mul(m2));
        let candidate = xb.sub(&p.div(&dp_region, lp), lp);
        let region = Ball::new(x.clone(), eps);
        if candidate.is_finite() && region.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// `w = 2 / ((1 - x^2) P'_n(x)^2)` for the root enclosed by `node`.
fn weight(n: usize, node: &Ball, lp: u32) -> Ball {
    let centre = Ball::exact(node.mid().clone());
    let (p, q) = legendre_pair(n, &centre, lp);
    let dp = derivative(n, &centre, &p, &q, lp)
        .with_error(node.rad().mul(second_derivative_bound(n)));
    let one_minus = Ball::one().sub(&node.sqr(lp), lp);
    Ball::from_i64(2).div(&one_minus.mul(&dp.sqr(lp), lp), lp)
}
