//! This module contains the data models for the breatheasy application.

pub mod alert;
pub mod insight;
pub mod reading;
pub mod session;
pub mod threshold;

pub use alert::Alert;
pub use insight::{DerivedInsight, InsightStatus};
pub use reading::{HistoricalEntry, Pollutant, Reading, UnknownPollutant};
pub use session::{SessionPhase, SessionSnapshot};
pub use threshold::ThresholdSet;
