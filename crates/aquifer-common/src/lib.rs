//! Shared plumbing for the aquifer crates: errors, configuration, telemetry.

pub mod config;
pub mod error;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use crate::config::{EngineConfig, FileStore, Loader, PopupConfig, Saver, SyntaxConfig};
pub use crate::error::{AquiferError, ConfigError, Result, UnresolvedMentionError};
