//! Produces the randomized, non-repeating sequence of goal positions that
//! make up one test.

use crate::error::TrackerError;
use rand::{rngs::ThreadRng, Rng};

/// Holds the goal queue for the current session, plus the random source used
/// to shuffle it.
#[derive(Debug)]
pub struct GoalScheduler<R: Rng = ThreadRng> {
    // Consumed from the end with `pop()`.
    goals: Vec<f64>,
    rng: R,
}

impl GoalScheduler<ThreadRng> {
    /// A scheduler driven by the thread-local random generator.
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for GoalScheduler<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> GoalScheduler<R> {
    /// A scheduler driven by the provided random generator.
    pub fn with_rng(rng: R) -> Self {
        Self {
            goals: Vec::new(),
            rng,
        }
    }

    /// Throws away any remaining goals and builds a fresh queue of `n`
    /// positions, evenly spaced over `[min, max]`, in a uniformly random
    /// order. A single goal sits at the midpoint.
    pub fn repopulate(&mut self, n: usize, min: f64, max: f64) {
        self.goals.clear();

        if n > 1 {
            let separation = (max - min) / (n - 1) as f64;
            let mut indices: Vec<usize> = (0..n).collect();
            self.goals.reserve_exact(n);

            while !indices.is_empty() {
                let picked = self.rng.gen_range(0..indices.len());
                let goal_index = indices.remove(picked);
                self.goals.push(min + goal_index as f64 * separation);
            }
        } else if n == 1 {
            self.goals.push((min + max) / 2.0);
        }
    }

    /// Takes the next scheduled goal.
    pub fn next(&mut self) -> Result<f64, TrackerError> {
        self.goals.pop().ok_or(TrackerError::Exhausted)
    }

    /// A random position in `[0, 1)`, unrelated to the scheduled queue.
    pub fn pick_random(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// How many scheduled goals have not been handed out yet.
    pub fn remaining(&self) -> usize {
        self.goals.len()
    }
}
