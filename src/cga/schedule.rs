//! Decaying tournament-size schedule.
//!
//! Maps run progress `p ∈ [0, 1]` (spent evaluations over the budget) to
//! the tournament parameter used by cluster selection:
//!
//! ```text
//! size(p) = min + (max - min) · exp(-decay · p)
//! ```
//!
//! Selection pressure therefore starts at `max` and relaxes towards `min`
//! as the budget is consumed.

/// Exponential tournament-size schedule.
///
/// # Examples
///
/// ```
/// use u_cga::cga::TournamentSchedule;
///
/// let schedule = TournamentSchedule::new(10.0, 150.0, 5.0);
/// assert!((schedule.size(0.0) - 150.0).abs() < 1e-12);
/// assert!(schedule.size(1.0) < 11.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TournamentSchedule {
    min_size: f64,
    max_size: f64,
    decay: f64,
}

impl TournamentSchedule {
    /// Creates a schedule from its bounds and decay constant.
    pub fn new(min_size: f64, max_size: f64, decay: f64) -> Self {
        Self {
            min_size,
            max_size,
            decay,
        }
    }

    pub fn min_size(&self) -> f64 {
        self.min_size
    }

    pub fn max_size(&self) -> f64 {
        self.max_size
    }

    /// `exp(-decay · p)` with `p` clamped to `[0, 1]`.
    pub fn decay_factor(&self, progress: f64) -> f64 {
        (-self.decay * progress.clamp(0.0, 1.0)).exp()
    }

    /// Tournament parameter at `progress`.
    pub fn size(&self, progress: f64) -> f64 {
        self.min_size + (self.max_size - self.min_size) * self.decay_factor(progress)
    }

    /// Tournament parameter after `cost` of `budget` evaluations.
    pub fn size_at_cost(&self, cost: usize, budget: usize) -> f64 {
        if budget == 0 {
            return self.size(1.0);
        }
        self.size(cost as f64 / budget as f64)
    }
}
