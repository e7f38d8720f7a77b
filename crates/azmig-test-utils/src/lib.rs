//! Testing utilities for the azmig workspace
//!
//! Shared fixtures and recording test doubles.

#![allow(missing_docs)]

pub mod doubles;
pub mod fixtures;

pub use doubles::{CallLog, FailingBackupStore, MemoryBackupStore, RecordingProvider, StaticConfirmation};
pub use fixtures::*;
