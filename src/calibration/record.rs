//! Best-score bookkeeping shared by calibration workers.

use std::cmp::Ordering;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Direction in which scores improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Higher is better (ground-truth match count).
    Maximize,
    /// Lower is better (recognition error).
    Minimize,
}

impl Objective {
    /// Orders two scores so that `Greater` means `a` is better than `b`.
    ///
    /// NaN is worse than every number.
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Objective::Maximize => ord,
            Objective::Minimize => ord.reverse(),
        }
    }

    /// Returns true if `score` is at least as good as `target`.
    pub fn reaches(&self, score: f64, target: f64) -> bool {
        self.compare(score, target) != Ordering::Less
    }
}

/// A parameter combination together with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredParameterSet<P> {
    /// The evaluated parameters.
    pub parameters: P,
    /// The score under the search objective.
    pub score: f64,
    /// Position of the combination in the search grid.
    pub grid_index: usize,
}

impl<P> ScoredParameterSet<P> {
    /// Creates a scored entry.
    pub fn new(parameters: P, score: f64, grid_index: usize) -> Self {
        Self {
            parameters,
            score,
            grid_index,
        }
    }
}

/// The best scored combination seen so far.
///
/// This is the only state workers share; every update goes through
/// [`offer`](Self::offer). A candidate replaces the incumbent if it scores
/// strictly better, or equally well at a lower grid index, so the final
/// result does not depend on the order workers finish in.
#[derive(Debug)]
pub struct BestRecord<P> {
    objective: Objective,
    best: Mutex<Option<ScoredParameterSet<P>>>,
}

impl<P: Clone> BestRecord<P> {
    /// Creates an empty record.
    pub fn new(objective: Objective) -> Self {
        Self {
            objective,
            best: Mutex::new(None),
        }
    }

    /// The objective scores are compared under.
    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Offers a candidate; returns true if it became the new best.
    pub fn offer(&self, candidate: ScoredParameterSet<P>) -> bool {
        let mut best = self.best.lock().unwrap_or_else(|e| e.into_inner());
        let replace = match best.as_ref() {
            None => !candidate.score.is_nan(),
            Some(current) => match self.objective.compare(candidate.score, current.score) {
                Ordering::Greater => true,
                Ordering::Equal => candidate.grid_index < current.grid_index,
                Ordering::Less => false,
            },
        };
        if replace {
            *best = Some(candidate);
        }
        replace
    }

    /// A copy of the current best.
    pub fn best(&self) -> Option<ScoredParameterSet<P>> {
        self.best.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Consumes the record and returns the best entry.
    pub fn into_best(self) -> Option<ScoredParameterSet<P>> {
        self.best.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}
