//! Subcommands other than the long-running service.

pub mod replay;

pub use replay::ReplayArgs;
