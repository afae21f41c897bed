//! Pure building blocks of the coordinator: payload normalization, the
//! bounded reading history, threshold alerting and the analysis throttle.

pub mod alert_manager;
pub mod analysis_throttle;
pub mod history;
pub mod normalizer;
