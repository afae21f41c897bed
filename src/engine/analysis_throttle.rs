//! Analysis throttle
//!
//! Decides when a new reading warrants a (re)computation of the derived
//! insight and tracks the single outstanding analysis call. The trigger policy
//! is a pure function of two explicit readings and explicit timestamps.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    analysis::{AnalysisClient, AnalysisError},
    models::{DerivedInsight, Reading},
};

/// Default relative change above which a reading is re-analyzed.
pub const DEFAULT_SIGNIFICANT_CHANGE_RATIO: f64 = 0.1;

/// Default maximum age of the derived insight while the sensor is quiescent.
pub const DEFAULT_FALLBACK_PERIOD: Duration = Duration::from_secs(30 * 60);

/// Returns `true` when any pollutant's relative change from `previous` to
/// `next` exceeds `ratio`.
///
/// A transition from exactly `0` to a non-zero value is significant; `0` to
/// `0` is not.
pub fn is_significant_change(previous: &Reading, next: &Reading, ratio: f64) -> bool {
    previous.iter().zip(next.iter()).any(|((_, prev), (_, curr))| {
        if prev == 0.0 {
            curr != 0.0
        } else {
            (curr - prev).abs() / prev > ratio
        }
    })
}

/// Trigger policy for the analysis collaborator.
#[derive(Debug, Clone)]
pub struct AnalysisThrottle {
    significant_change_ratio: f64,
    fallback_period: TimeDelta,
}

impl AnalysisThrottle {
    /// Creates a throttle with the given change ratio and fallback period.
    pub fn new(significant_change_ratio: f64, fallback_period: Duration) -> Self {
        Self {
            significant_change_ratio,
            fallback_period: TimeDelta::from_std(fallback_period).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Decides whether `new_reading` should be analyzed.
    ///
    /// Never triggers while a call is in flight; always triggers when nothing
    /// has been analyzed yet (first reading, or sensor back online); otherwise
    /// triggers on a significant change.
    pub fn should_trigger(
        &self,
        new_reading: &Reading,
        last_analyzed: Option<&Reading>,
        in_flight: bool,
    ) -> bool {
        if in_flight {
            return false;
        }
        match last_analyzed {
            None => true,
            Some(previous) => {
                is_significant_change(previous, new_reading, self.significant_change_ratio)
            }
        }
    }

    /// Decides whether the periodic fallback should analyze the current
    /// reading because no analysis has started within the fallback period.
    pub fn fallback_due(
        &self,
        last_started_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        in_flight: bool,
    ) -> bool {
        if in_flight {
            return false;
        }
        match last_started_at {
            None => true,
            Some(started) => now - started >= self.fallback_period,
        }
    }
}

impl Default for AnalysisThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNIFICANT_CHANGE_RATIO, DEFAULT_FALLBACK_PERIOD)
    }
}

/// Performs one analysis attempt. Failures are returned as-is; the caller
/// decides what to display and no retry is attempted here.
pub async fn run<C: AnalysisClient + ?Sized>(
    client: &C,
    reading: Reading,
) -> Result<DerivedInsight, AnalysisError> {
    client.analyze(&reading).await
}

/// The outstanding analysis call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InFlightAnalysis {
    /// Generation tag carried back by the completion.
    pub generation: u64,
    /// The reading being analyzed.
    pub reading: Reading,
}

/// Bookkeeping for the at-most-one analysis call of a session.
#[derive(Debug, Default)]
pub struct AnalysisTracker {
    last_analyzed: Option<Reading>,
    last_started_at: Option<DateTime<Utc>>,
    in_flight: Option<InFlightAnalysis>,
    // An invalidated call that has not reported back yet.
    draining: Option<u64>,
    generation: u64,
}

impl AnalysisTracker {
    /// Returns `true` while a call for the current generation is outstanding.
    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns `true` while any call has not reported back, including one
    /// that was invalidated. No new call may begin until this is `false`.
    pub fn outstanding(&self) -> bool {
        self.in_flight.is_some() || self.draining.is_some()
    }

    /// The reading the last completed analysis was computed for.
    pub fn last_analyzed(&self) -> Option<&Reading> {
        self.last_analyzed.as_ref()
    }

    /// When the most recent call was issued.
    pub fn last_started_at(&self) -> Option<DateTime<Utc>> {
        self.last_started_at
    }

    /// Marks a call for `reading` as in flight and returns its generation.
    ///
    /// Returns `None` if a call is already outstanding, invalidated or not.
    pub fn begin(&mut self, reading: Reading, now: DateTime<Utc>) -> Option<u64> {
        if self.outstanding() {
            return None;
        }
        self.generation += 1;
        self.in_flight = Some(InFlightAnalysis { generation: self.generation, reading });
        self.last_started_at = Some(now);
        Some(self.generation)
    }

    /// Records the completion of call `generation`.
    ///
    /// Returns `false` for a stale completion, which must be discarded. A
    /// stale completion of the invalidated call ends the drain. On a matching
    /// generation the in-flight flag is cleared and, if `succeeded`, the
    /// analyzed reading becomes the new comparison baseline.
    pub fn complete(&mut self, generation: u64, succeeded: bool) -> bool {
        match self.in_flight {
            Some(current) if current.generation == generation => {
                self.in_flight = None;
                if succeeded {
                    self.last_analyzed = Some(current.reading);
                }
                true
            }
            _ => {
                if self.draining == Some(generation) {
                    self.draining = None;
                }
                false
            }
        }
    }

    /// Forgets the comparison baseline so the next valid reading is analyzed
    /// unconditionally.
    pub fn forget_last_analyzed(&mut self) {
        self.last_analyzed = None;
    }

    /// Invalidates any outstanding call so its completion will be discarded.
    ///
    /// The invalidated call keeps blocking [`begin`](Self::begin) until its
    /// completion arrives.
    pub fn invalidate(&mut self) {
        if let Some(stale) = self.in_flight.take() {
            tracing::debug!(generation = stale.generation, "Invalidated in-flight analysis.");
            self.draining = Some(stale.generation);
        }
        self.generation += 1;
        self.last_analyzed = None;
    }
}
