//! Docgate - Rate-Limited Document Submission Client
//!
//! This crate guards outbound calls to a single document-submission endpoint
//! with an in-process fixed-window rate limiter shared by every caller in the
//! process. Callers acquire admission from the limiter, then the payload is
//! handed to a transport that performs the HTTP call.

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod ratelimit;
pub mod transport;

pub use client::DocumentClient;
pub use error::{GuardError, Result};
pub use ratelimit::{Admission, Permit, Policy, RateLimiter, RateLimiterConfig, TimeWindow};
