//! Process-lifetime repair counters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters shared by the resolver and the health monitor.
#[derive(Debug, Default)]
pub struct RepairStatistics {
    total_checked: AtomicU64,
    total_fixed: AtomicU64,
    cycles_completed: AtomicU64,
    last_cycle_checked: AtomicU64,
    last_cycle_fixed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_checked: u64,
    pub total_fixed: u64,
    pub cycles_completed: u64,
    pub last_cycle_checked: u64,
    pub last_cycle_fixed: u64,
}

impl StatisticsSnapshot {
    /// Fixed over checked, 0 when nothing was checked.
    pub fn fix_ratio(&self) -> f64 {
        if self.total_checked == 0 {
            0.0
        } else {
            self.total_fixed as f64 / self.total_checked as f64
        }
    }
}

impl fmt::Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checked: {}, Fixed: {}, Fix ratio: {:.2}",
            self.total_checked,
            self.total_fixed,
            self.fix_ratio()
        )
    }
}

impl RepairStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// One per `resolve()` call.
    pub fn record_check(&self) {
        self.total_checked.fetch_add(1, Ordering::Relaxed);
    }

    /// One per resolution that replaced a configured path.
    pub fn record_fix(&self) {
        self.total_fixed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle(&self, checked: u64, fixed: u64) {
        self.last_cycle_checked.store(checked, Ordering::Relaxed);
        self.last_cycle_fixed.store(fixed, Ordering::Relaxed);
        self.cycles_completed.fetch_add(1, Ordering::Release);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            total_checked: self.total_checked.load(Ordering::Relaxed),
            total_fixed: self.total_fixed.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Acquire),
            last_cycle_checked: self.last_cycle_checked.load(Ordering::Relaxed),
            last_cycle_fixed: self.last_cycle_fixed.load(Ordering::Relaxed),
        }
    }

    pub fn get_statistics(&self) -> String {
        self.snapshot().to_string()
    }
}
