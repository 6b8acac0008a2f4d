// src/exec/mod.rs

//! Boundary to the external asynchronous build subsystem.
//!
//! - [`backend`] provides the [`BuildBackend`] trait, the request/completion
//!   types and a concrete [`ChannelBackend`] that production hosts use,
//!   and which tests can replace with a fake implementation.

pub mod backend;

pub use backend::{BuildBackend, BuildCompletion, BuildRequest, ChannelBackend, WorkTicket};
