#![warn(missing_docs)]
//! BreathEasy aggregates live air-quality telemetry into a session: a bounded
//! reading history, cooled-down threshold alerts, and a throttled AI-derived
//! insight, exposed through a small HTTP API.

pub mod analysis;
pub mod cmd;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod http_server;
pub mod models;
pub mod notification;
pub mod persistence;
pub mod providers;
pub mod supervisor;
pub mod test_helpers;
