//! Adaptive subdivision of one path segment.
//!
//! Pending segments live in an explicit work queue. Each pop either accepts
//! the segment (from its crude enclosure or from Gauss–Legendre quadrature),
//! splits it in half, or folds its crude enclosure into the result when a
//! budget runs out. Folding keeps the result rigorous; it only widens it.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ball::{Ball, ComplexBall, Mag};
use crate::integrate::{Limits, QueueDiscipline};
use crate::quadrature::{integrate_segment, Quadrature};
use crate::traits::{Evaluator, Integrand};

/// Budget and limit flags of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub depth_limit_hit: bool,
    pub eval_limit_hit: bool,
    pub cancelled: bool,
}

impl Status {
    /// No budget was exhausted.
    pub fn is_complete(&self) -> bool {
        !(self.depth_limit_hit || self.eval_limit_hit || self.cancelled)
    }

    pub fn merge(&mut self, other: Status) {
        self.depth_limit_hit |= other.depth_limit_hit;
        self.eval_limit_hit |= other.eval_limit_hit;
        self.cancelled |= other.cancelled;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub evaluations: usize,
    pub accepted: usize,
    pub crude_accepted: usize,
    pub splits: usize,
    pub folded: usize,
    pub max_depth: usize,
}

impl RunStats {
    pub fn merge(&mut self, other: RunStats) {
        self.evaluations += other.evaluations;
        self.accepted += other.accepted;
        self.crude_accepted += other.crude_accepted;
        self.splits += other.splits;
        self.folded += other.folded;
        self.max_depth = self.max_depth.max(other.max_depth);
    }
}

/// A pending piece of the path with its crude enclosure.
#[derive(Debug, Clone)]
pub struct Segment {
    pub a: ComplexBall,
    pub b: ComplexBall,
    pub depth: usize,
    /// `(b - a) f(box(a, b))`, a rigorous enclosure of the segment integral.
    pub crude: ComplexBall,
    seq: u64,
}

impl Segment {
    /// Width of the crude enclosure; wider is more urgent.
    pub fn difficulty(&self) -> Mag {
        self.crude.rad()
    }
}

struct Widest(Segment);

impl PartialEq for Widest {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Widest {}

impl PartialOrd for Widest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Widest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .difficulty()
            .cmp(&other.0.difficulty())
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

enum WorkQueue {
    Stack(Vec<Segment>),
    Heap(BinaryHeap<Widest>),
}

impl WorkQueue {
    fn new(discipline: QueueDiscipline) -> Self {
        match discipline {
            QueueDiscipline::Stack => WorkQueue::Stack(Vec::new()),
            QueueDiscipline::Heap => WorkQueue::Heap(BinaryHeap::new()),
        }
    }

    fn push(&mut self, segment: Segment) {
        match self {
            WorkQueue::Stack(stack) => stack.push(segment),
            WorkQueue::Heap(heap) => heap.push(Widest(segment)),
        }
    }

    fn pop(&mut self) -> Option<Segment> {
        match self {
            WorkQueue::Stack(stack) => stack.pop(),
            WorkQueue::Heap(heap) => heap.pop().map(|w| w.0),
        }
    }

    fn drain(&mut self) -> Vec<Segment> {
        match self {
            WorkQueue::Stack(stack) => std::mem::take(stack),
            WorkQueue::Heap(heap) => std::mem::take(heap).into_iter().map(|w| w.0).collect(),
        }
    }
}

/// Outcome of one scheduler run.
#[derive(Debug, Clone)]
pub struct SegmentRun {
    pub value: ComplexBall,
    pub status: Status,
    pub stats: RunStats,
}

pub struct Scheduler<'a> {
    goal: u32,
    tol: Mag,
    prec: u32,
    limits: Limits,
    discipline: QueueDiscipline,
    verbose: u8,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        goal: u32,
        tol: Mag,
        prec: u32,
        limits: Limits,
        discipline: QueueDiscipline,
        verbose: u8,
    ) -> Self {
        Self {
            goal,
            tol,
            prec,
            limits,
            discipline,
            verbose,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Guard precision of the accumulator.
    fn acc_prec(&self) -> u32 {
        self.prec + 16
    }

    /// Evaluation precision at `depth`: one extra bit per level, rounded up to
    /// a multiple of 16 so nearby depths share cached rules.
    fn segment_prec(&self, depth: usize) -> u32 {
        let extra = u32::try_from(depth).unwrap_or(u32::MAX / 2);
        self.prec + extra.next_multiple_of(16)
    }

    fn make_segment<F: Integrand + ?Sized>(
        &self,
        eval: &Evaluator<'_, F>,
        a: ComplexBall,
        b: ComplexBall,
        depth: usize,
        seq: u64,
    ) -> Segment {
        let wp = self.acc_prec().max(self.segment_prec(depth));
        let values = eval.evaluate(&a.union(&b), 0, self.segment_prec(depth));
        let crude = b.sub(&a, wp).mul(&values, wp);
        Segment {
            a,
            b,
            depth,
            crude,
            seq,
        }
    }

    /// Integrates `f` from `a` to `b`.
    pub fn run<F: Integrand + ?Sized>(&self, f: &F, a: &ComplexBall, b: &ComplexBall) -> SegmentRun {
        let eval = Evaluator::new(f);
        let ap = self.acc_prec();
        let mut acc = ComplexBall::zero();
        let mut status = Status::default();
        let mut stats = RunStats::default();
        let mut queue = WorkQueue::new(self.discipline);
        let mut seq = 0u64;

        let root = self.make_segment(&eval, a.clone(), b.clone(), 0, seq);
        // A lower bound never overstates the magnitude of the integral.
        let mut magnitude = root.crude.mag_lower();
        queue.push(root);

        while let Some(segment) = queue.pop() {
            stats.max_depth = stats.max_depth.max(segment.depth);

            if self.cancel.is_some_and(|flag| flag.load(AtomicOrdering::Relaxed)) {
                status.cancelled = true;
                self.fold(&mut acc, &segment, &mut stats);
                break;
            }
            if eval.count() >= self.limits.eval_limit {
                if !status.eval_limit_hit && self.verbose >= 1 {
                    warn!(evaluations = eval.count(), limit = self.limits.eval_limit, "evaluation limit reached");
                }
                status.eval_limit_hit = true;
                self.fold(&mut acc, &segment, &mut stats);
                break;
            }

            magnitude = magnitude.max(acc.mag_lower());
            let global = self.tol.max(magnitude.mul_2exp(-(self.goal as i64)));
            let budget = global.mul_2exp(-(segment.depth as i64));

            if segment.difficulty() <= budget {
                acc = acc.add(&segment.crude, ap);
                stats.accepted += 1;
                stats.crude_accepted += 1;
                if self.verbose >= 2 {
                    debug!(depth = segment.depth, "accepted crude enclosure");
                }
                continue;
            }

            let sp = self.segment_prec(segment.depth);
            match integrate_segment(&eval, &segment.a, &segment.b, budget, self.limits.deg_limit, sp) {
                Quadrature::Accepted { value, degree } => {
                    acc = acc.add(&value, ap);
                    stats.accepted += 1;
                    if self.verbose >= 2 {
                        debug!(depth = segment.depth, degree, "accepted quadrature");
                    }
                }
                Quadrature::Rejected(reason) => {
                    if segment.depth >= self.limits.depth_limit {
                        if !status.depth_limit_hit && self.verbose >= 1 {
                            warn!(depth = segment.depth, "depth limit reached");
                        }
                        status.depth_limit_hit = true;
                        self.fold(&mut acc, &segment, &mut stats);
                        continue;
                    }
                    if self.verbose >= 2 {
                        debug!(depth = segment.depth, ?reason, "splitting segment");
                    }
                    let mid = midpoint(&segment.a, &segment.b, sp + 16);
                    let depth = segment.depth + 1;
                    let left = self.make_segment(&eval, segment.a, mid.clone(), depth, seq + 1);
                    let right = self.make_segment(&eval, mid, segment.b, depth, seq + 2);
                    seq += 2;
                    stats.splits += 1;
                    // Stack order pops the left half first.
                    queue.push(right);
                    queue.push(left);
                }
            }
        }

        for segment in queue.drain() {
            self.fold(&mut acc, &segment, &mut stats);
        }
        stats.evaluations = eval.count();
        if self.verbose >= 1 {
            info!(
                evaluations = stats.evaluations,
                accepted = stats.accepted,
                splits = stats.splits,
                max_depth = stats.max_depth,
                complete = status.is_complete(),
                "segment finished"
            );
        }
        SegmentRun {
            value: acc,
            status,
            stats,
        }
    }

    fn fold(&self, acc: &mut ComplexBall, segment: &Segment, stats: &mut RunStats) {
        *acc = acc.add(&segment.crude, self.acc_prec());
        stats.folded += 1;
    }
}

/// Exact midpoint when both endpoints are exact.
fn midpoint(a: &ComplexBall, b: &ComplexBall, prec: u32) -> ComplexBall {
    if a.is_exact() && b.is_exact() {
        let re = Ball::exact((a.re().mid() + b.re().mid()).mul_2exp(-1));
        let im = Ball::exact((a.im().mid() + b.im().mid()).mul_2exp(-1));
        return ComplexBall::new(re, im);
    }
    a.add(b, prec).mul_2exp(-1)
}
