//! # Utility Modules
//!
//! Supporting utilities for compression, logging, metrics, and timing.
//!
//! ## Components
//! - **Compression**: zlib with the protocol's threshold rules and size limits
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Per-session traffic counters
//! - **Timeout**: Async timeout wrappers
//!
//! ## Security
//! - Decompression bomb protection (8MB limit)
//! - Inflated size must match the size the peer declared

pub mod compression;
pub mod logging;
pub mod metrics;
pub mod timeout;

pub use metrics::{MetricsSnapshot, SessionMetrics};
