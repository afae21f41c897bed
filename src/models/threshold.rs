//! Per-pollutant alert thresholds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::reading::Pollutant;

/// Largest value the dashboard ever stored to mean "no limit configured".
pub const UNSET_THRESHOLD_SENTINEL: f64 = 9_007_199_254_740_991.0;

/// Mapping from pollutant to a numeric limit.
///
/// A pollutant without a finite limit never alerts. Missing entries,
/// non-finite values and the legacy "unset" sentinel are all treated as
/// infinite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdSet {
    limits: BTreeMap<Pollutant, f64>,
}

impl ThresholdSet {
    /// A set in which no pollutant ever alerts.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Returns the finite limit configured for `pollutant`, if any.
    pub fn limit(&self, pollutant: Pollutant) -> Option<f64> {
        self.limits.get(&pollutant).copied().filter(|v| is_finite_limit(*v))
    }

    /// Sets or clears (`None`, NaN, infinity) the limit for `pollutant`.
    pub fn set(&mut self, pollutant: Pollutant, limit: Option<f64>) {
        match limit.filter(|v| is_finite_limit(*v)) {
            Some(v) => {
                self.limits.insert(pollutant, v);
            }
            None => {
                self.limits.remove(&pollutant);
            }
        }
    }

    /// Builder-style variant of [`ThresholdSet::set`].
    pub fn with(mut self, pollutant: Pollutant, limit: f64) -> Self {
        self.set(pollutant, Some(limit));
        self
    }

    /// Iterates over the pollutants that have a finite limit.
    pub fn iter(&self) -> impl Iterator<Item = (Pollutant, f64)> + '_ {
        self.limits.iter().map(|(p, v)| (*p, *v)).filter(|(_, v)| is_finite_limit(*v))
    }

    /// Returns `true` when no pollutant has a finite limit.
    pub fn is_unlimited(&self) -> bool {
        self.iter().next().is_none()
    }
}

fn is_finite_limit(v: f64) -> bool {
    v.is_finite() && v < UNSET_THRESHOLD_SENTINEL
}
