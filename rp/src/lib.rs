//! RequestPacer - throttled outbound GET dispatcher
//!
//! Callers submit HTTP GETs; the pacer executes them in randomly sized
//! batches with randomized pauses between batches and a rotating User-Agent,
//! so the outbound cadence never settles into a machine-regular rhythm the
//! remote service could fingerprint and block.
//!
//! # Core Concepts
//!
//! - **One pacer per process**: a lock-guarded shared instance with an
//!   explicit configure/shutdown/reset lifecycle
//! - **Batched dispatch**: queued requests drain into batches of 3-5,
//!   executed concurrently, with a randomized 5-10 s pause between batches
//! - **Per-request delivery**: every submission resolves exactly once,
//!   with the body or the transport error that sank it
//!
//! # Modules
//!
//! - [`pacer`] - singleton lifecycle, submission and shutdown
//! - [`config`] - tunables and config-file loading
//! - [`error`] - caller-facing error taxonomy
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod pacer;

mod identity;
mod operation;
mod queue;
mod scheduler;

// Re-export commonly used types
pub use config::Config;
pub use error::PacerError;
pub use pacer::RequestPacer;
