//! Budget tracking for the refinement phase of the matcher

use std::time::{Duration, Instant};

use crate::config::DiffOptions;
use crate::error::{BudgetLimit, MatcherBudgetExceeded};

/// Node-visit and wall-clock budget for one matcher run.
#[derive(Debug, Clone)]
pub struct MatchBudget {
    /// Total node visits available
    pub total_visits: u64,
    /// Visits spent so far
    pub visits_used: u64,
    /// Ceiling on one sibling alignment table
    pub max_sibling_cells: usize,
    time_limit: Duration,
    started: Instant,
    exhausted: bool,
    exceeded: Option<MatcherBudgetExceeded>,
}

impl MatchBudget {
    pub fn new(total_visits: u64, max_sibling_cells: usize, time_limit: Duration) -> Self {
        Self {
            total_visits,
            visits_used: 0,
            max_sibling_cells,
            time_limit,
            started: Instant::now(),
            exhausted: false,
            exceeded: None,
        }
    }

    pub fn from_options(options: &DiffOptions) -> Self {
        Self::new(
            options.node_visit_budget,
            options.max_sibling_cells,
            Duration::from_millis(options.time_budget_ms),
        )
    }

    /// Check if there's enough budget for an estimated cost
    pub fn has_budget(&self, cost: u64) -> bool {
        !self.exhausted && self.visits_used.saturating_add(cost) <= self.total_visits
    }

    /// Try to spend `cost` visits. Records the first overrun.
    pub fn spend(&mut self, cost: u64) -> bool {
        if self.exhausted {
            return false;
        }
        if !self.has_budget(cost) {
            self.trip(BudgetLimit::NodeVisits);
            self.exhausted = true;
            return false;
        }
        if self.started.elapsed() > self.time_limit {
            self.trip(BudgetLimit::WallClock);
            self.exhausted = true;
            return false;
        }
        self.visits_used += cost;
        true
    }

    /// Whether a sibling table of `cells` entries may be built. An oversized
    /// table only refuses this one pair.
    pub fn admits_table(&mut self, cells: usize) -> bool {
        if cells > self.max_sibling_cells {
            self.trip(BudgetLimit::SiblingCells);
            return false;
        }
        self.spend(cells as u64)
    }

    fn trip(&mut self, limit: BudgetLimit) {
        if self.exceeded.is_none() {
            let exceeded = MatcherBudgetExceeded {
                limit,
                visits: self.visits_used,
                elapsed_ms: self.started.elapsed().as_millis() as u64,
            };
            tracing::warn!("{}; falling back to coarse delete+insert", exceeded);
            self.exceeded = Some(exceeded);
        }
    }

    /// Get remaining visits
    pub fn remaining(&self) -> u64 {
        self.total_visits.saturating_sub(self.visits_used)
    }

    /// Get usage percentage
    pub fn usage_percentage(&self) -> f32 {
        if self.total_visits == 0 {
            return 0.0;
        }
        (self.visits_used as f32 / self.total_visits as f32) * 100.0
    }

    /// Check if budget is exhausted
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn exceeded(&self) -> Option<&MatcherBudgetExceeded> {
        self.exceeded.as_ref()
    }
}

impl Default for MatchBudget {
    fn default() -> Self {
        Self::from_options(&DiffOptions::default())
    }
}
