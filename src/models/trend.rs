use std::cell::RefCell;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Triangular};

use crate::Tick;

/// `start × (1 + growth_rate)^t`
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricTrend {
    pub start: f64,
    pub growth_rate: f64,
}

impl GeometricTrend {
    pub fn new(start: f64, growth_rate: f64) -> Self {
        Self { start, growth_rate }
    }

    pub fn value(&self, tick: Tick) -> f64 {
        self.start * (1.0 + self.growth_rate).powi(tick as i32)
    }
}

/// Piecewise-constant trend that moves by `increment` every `duration` ticks
/// and never drops below `min_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTrend {
    pub start: f64,
    pub duration: Tick,
    pub increment: f64,
    pub min_value: f64,
}

impl StepTrend {
    pub fn new(start: f64, duration: Tick, increment: f64, min_value: f64) -> Self {
        Self { start, duration, increment, min_value }
    }

    pub fn value(&self, tick: Tick) -> f64 {
        let steps = tick.div_euclid(self.duration.max(1)) as f64;
        (self.start + steps * self.increment).max(self.min_value)
    }
}

#[derive(Debug, Clone)]
struct TriangularPath {
    values: Vec<f64>,
    rng: StdRng,
}

/// Bounded random walk. Each tick scales the previous value by a multiplier
/// drawn around `top`, bounded by `min` and `max`.
///
/// The walk is path dependent, so generated values are memoized: once index
/// `t` has been produced it never changes for the lifetime of the trend, and
/// producing `t` always produces every index below it first.
#[derive(Debug, Clone)]
pub struct TriangularTrend {
    pub start: f64,
    pub top: f64,
    pub min: f64,
    pub max: f64,
    path: RefCell<TriangularPath>,
}

impl TriangularTrend {
    pub fn new(start: f64, top: f64, min: f64, max: f64, seed: u64) -> Self {
        Self {
            start,
            top,
            min,
            max,
            path: RefCell::new(TriangularPath {
                values: vec![start],
                rng: StdRng::seed_from_u64(seed),
            }),
        }
    }

    /// Maps a draw in [-1, 1] onto a multiplier in [min, max].
    pub fn multiplier(&self, draw: f64) -> f64 {
        if draw < 0.0 {
            self.top + draw * (self.top - self.min)
        } else {
            self.top + draw * (self.max - self.top)
        }
    }

    /// Returns `None` for negative ticks, which have no place in the sequence.
    pub fn value(&self, tick: Tick) -> Option<f64> {
        let index = usize::try_from(tick).ok()?;
        let mut path = self.path.borrow_mut();
        if index >= path.values.len() {
            let distribution = Triangular::new(-1.0, 1.0, 0.0).ok()?;
            while path.values.len() <= index {
                let previous = *path.values.last()?;
                let draw = distribution.sample(&mut path.rng);
                path.values.push(previous * self.multiplier(draw));
            }
        }
        path.values.get(index).copied()
    }

    /// Number of indices generated so far.
    pub fn generated_len(&self) -> usize {
        self.path.borrow().values.len()
    }
}

#[derive(Debug, Clone)]
pub enum Trend {
    Geometric(GeometricTrend),
    Step(StepTrend),
    Triangular(TriangularTrend),
}

impl Trend {
    pub fn value(&self, tick: Tick) -> Option<f64> {
        match self {
            Trend::Geometric(trend) => Some(trend.value(tick)),
            Trend::Step(trend) => Some(trend.value(tick)),
            Trend::Triangular(trend) => trend.value(tick),
        }
    }

    /// A trend that always yields `value`.
    pub fn constant(value: f64) -> Self {
        Trend::Geometric(GeometricTrend::new(value, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometric_trend_compounds_growth() {
        let trend = GeometricTrend::new(100.0, 0.05);
        for t in 0..30 {
            assert_eq!(trend.value(t), 100.0 * 1.05f64.powi(t as i32));
        }
        assert_eq!(trend.value(0), 100.0);
    }

    #[test]
    fn step_trend_never_drops_below_minimum() {
        let trend = StepTrend::new(10.0, 3, -2.5, 1.0);
        assert_eq!(trend.value(0), 10.0);
        assert_eq!(trend.value(2), 10.0);
        assert_eq!(trend.value(3), 7.5);
        for t in 0..100 {
            assert!(trend.value(t) >= 1.0);
        }
        assert_eq!(trend.value(99), 1.0);
    }

    #[test]
    fn triangular_trend_stays_within_multiplier_bounds() {
        let trend = TriangularTrend::new(50.0, 1.0, 0.9, 1.2, 7);
        for t in 1..200 {
            let previous = trend.value(t - 1).unwrap();
            let current = trend.value(t).unwrap();
            let ratio = current / previous;
            assert!(ratio >= 0.9 - 1e-12 && ratio <= 1.2 + 1e-12, "ratio {} at {}", ratio, t);
        }
    }

    #[test]
    fn triangular_trend_is_stable_across_reads() {
        let trend = TriangularTrend::new(20.0, 1.01, 0.97, 1.05, 42);
        let late = trend.value(12).unwrap();
        let early = trend.value(4).unwrap();
        assert_eq!(trend.value(12), Some(late));
        assert_eq!(trend.value(4), Some(early));
        assert_eq!(trend.generated_len(), 13);
        assert_eq!(trend.value(0), Some(20.0));
    }

    #[test]
    fn triangular_trend_is_reproducible_for_a_seed() {
        let a = TriangularTrend::new(1.0, 1.0, 0.8, 1.3, 99);
        let b = TriangularTrend::new(1.0, 1.0, 0.8, 1.3, 99);
        // b is filled out of order, a sequentially
        let b_last = b.value(25).unwrap();
        for t in 0..25 {
            a.value(t).unwrap();
        }
        assert_eq!(a.value(25).unwrap(), b_last);
    }

    #[test]
    fn triangular_trend_rejects_negative_ticks() {
        let trend = TriangularTrend::new(1.0, 1.0, 0.8, 1.3, 1);
        assert_eq!(trend.value(-1), None);
        assert_eq!(Trend::Triangular(trend).value(-3), None);
    }

    #[test]
    fn multiplier_maps_draw_endpoints_to_bounds() {
        let trend = TriangularTrend::new(1.0, 1.0, 0.8, 1.3, 1);
        assert!((trend.multiplier(-1.0) - 0.8).abs() < 1e-12);
        assert!((trend.multiplier(0.0) - 1.0).abs() < 1e-12);
        assert!((trend.multiplier(1.0) - 1.3).abs() < 1e-12);
    }
}
