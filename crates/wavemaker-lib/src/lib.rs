//! Library for the wavemaker load generator
//!
//! This crate provides the core functionality for:
//! - Parsing resource request strings into typed quantity mappings
//! - Bounded, cancellation-aware condition polling
//! - Creating and tearing down labeled batches of placeholder pods
//! - The wave life-cycle controller driving the create/hold/delete cycle

pub mod batch;
pub mod client;
pub mod names;
pub mod poll;
pub mod requests;
pub mod wave;

#[cfg(test)]
pub(crate) mod testutil;

pub use client::{KubeWorkloadClient, WorkloadClient, DISCOVERY_LABEL, PLACEHOLDER_IMAGE};
pub use poll::{poll_until, PollError, PollPolicy, PollState};
pub use requests::{ParseError, ResourceRequests};
pub use wave::{ExhaustionPolicy, WaveConfig, WaveController};
