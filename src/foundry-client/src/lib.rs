#![deny(unsafe_code)]

//! A client for the asynchronous job protocol of a Cloud-Foundry-style control plane: mutations
//! the server executes in the background hand back a job, which is polled until it finishes,
//! fails or runs out of time.

/// Shared constants (default intervals, api paths).
pub mod constants;

/// Deserializable configuration schemas.
pub mod config;

/// The error type used across the crate.
pub mod errors;

/// The job resource model + completion poller.
pub mod jobs;

/// The http client.
pub mod client;

/// Resource operations that wait on their jobs.
pub mod operations;

pub use client::Client;
pub use errors::Error;
pub use jobs::{Job, JobReference, JobStatus, PollOutcome, PollSettings, Poller};
pub use operations::{ControlPlane, Operations, Resource};
