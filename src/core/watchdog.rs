//! # HangWatchdog: per-worker progress ages.
//!
//! The watchdog never talks to workers. The polling loop feeds it counter
//! values; it remembers when each counter last **changed** and reports how long
//! ago that was.
//!
//! ```text
//! refresh(i, c):  c == last[i]  → nothing
//!                 c != last[i]  → last[i] = c, changed_at[i] = elapsed
//!
//! age_of_update(i) = elapsed − changed_at[i]
//! ```
//!
//! ## Rules
//! - `changed_at[i]` is monotonic non-decreasing.
//! - Refreshing with an unchanged value never advances it; a changed value always does.
//! - Only the polling loop mutates the watchdog (`&mut self`), so no locks.
//!
//! The clock is [`tokio::time::Instant`], which lets tests drive it with
//! `tokio::time::pause`/`advance`.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Progress {
    last_counter: u64,
    changed_at: Duration,
}

/// Tracks time since each worker's counter last changed.
#[derive(Debug)]
pub struct HangWatchdog {
    start: Instant,
    records: Vec<Progress>,
}

impl HangWatchdog {
    /// Creates a watchdog for `workers` workers; every age starts at zero now.
    pub fn new(workers: usize) -> Self {
        Self {
            start: Instant::now(),
            records: vec![
                Progress {
                    last_counter: 0,
                    changed_at: Duration::ZERO,
                };
                workers
            ],
        }
    }

    /// Feeds the latest counter of worker `index`. Returns `true` if it changed.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn refresh(&mut self, index: usize, counter: u64) -> bool {
        let now = self.start.elapsed();
        let rec = &mut self.records[index];
        if rec.last_counter == counter {
            return false;
        }
        rec.last_counter = counter;
        rec.changed_at = rec.changed_at.max(now);
        true
    }

    /// Time since worker `index` last made progress.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn age_of_update(&self, index: usize) -> Duration {
        self.age_at(self.start.elapsed(), index)
    }

    /// Largest age over all workers, sampled at one instant.
    pub fn oldest_update(&self) -> Duration {
        let now = self.start.elapsed();
        (0..self.records.len())
            .map(|i| self.age_at(now, i))
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Indices of workers whose age strictly exceeds `limit`.
    pub fn hung(&self, limit: Duration) -> Vec<usize> {
        let now = self.start.elapsed();
        (0..self.records.len())
            .filter(|&i| self.age_at(now, i) > limit)
            .collect()
    }

    /// Snapshot for the periodic status line.
    pub fn summarize(&self) -> Summary {
        let now = self.start.elapsed();
        Summary {
            total: self.records.iter().map(|r| r.last_counter).sum(),
            ages: (0..self.records.len()).map(|i| self.age_at(now, i)).collect(),
        }
    }

    /// Last counter value seen for worker `index`.
    pub fn last_counter(&self, index: usize) -> u64 {
        self.records[index].last_counter
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn age_at(&self, now: Duration, index: usize) -> Duration {
        now.saturating_sub(self.records[index].changed_at)
    }
}

/// Counter total and per-worker ages at one polling cycle.
///
/// Displays as the total followed by each age in seconds, fixed width with
/// one decimal:
/// ```text
/// 48213    0.0    0.4    1.0   12.3
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: u64,
    pub ages: Vec<Duration>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.total)?;
        for age in &self.ages {
            write!(f, " {:>6.1}", age.as_secs_f64())?;
        }
        Ok(())
    }
}
