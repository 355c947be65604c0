//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (blockchain RPC, logging, HTTP servers). Each
//! sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `chain`: JSON-RPC wallet via alloy-rs
//! - `metrics`: Prometheus metrics export and health checks
//! - `notify`: Tracing-backed notification sink

pub mod chain;
pub mod metrics;
pub mod notify;
