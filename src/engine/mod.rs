// src/engine/mod.rs

//! Optional async driver for hosts without their own tick loop.
//!
//! The core ([`crate::manager::BuildManager`]) is pure and synchronous:
//! it is polled with explicit timestamps and fed completions by whoever
//! owns the loop. [`runtime::Runtime`] is the IO shell around it: a
//! `select!` loop that pumps interval ticks and [`EngineEvent`]s into
//! the core.

pub mod runtime;

use crate::exec::BuildCompletion;

/// Events flowing into the runtime from the host and the build subsystem.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Start a new build pass.
    RunRequested,
    /// Abort polling immediately.
    CancelRequested,
    /// The build subsystem finished one work item.
    BuildCompleted(BuildCompletion),
    /// Stop the runtime loop.
    Shutdown,
}

pub use runtime::Runtime;
