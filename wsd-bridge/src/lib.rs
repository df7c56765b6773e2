//! WSD Bridge - client for the saldowsd word-sense-disambiguation sidecar
//!
//! This crate disambiguates word senses for tokenized Swedish text by
//! delegating scoring to the external saldowsd vector classifier and merging
//! the returned probabilities back onto the existing candidate-sense
//! annotation.
//!
//! # Architecture
//!
//! The classifier runs as a separate process reached over a tab-separated
//! pipe protocol:
//! - Request Builder ([`request`]) frames per-sentence token annotations
//!   into the classifier's input format
//! - Worker Lifecycle Manager ([`workers`]) owns the process handle,
//!   choosing between a persistent pipe and one-shot invocation, with
//!   health checks and restart-on-failure
//! - Response Reader ([`response`]) re-segments the output stream under
//!   strict ordering assumptions
//! - Sense Merger ([`merge`]) reconciles returned probabilities with the
//!   original candidate senses and serializes the result
//!
//! # Example
//!
//! ```ignore
//! use wsd_bridge::{annotate, TokenAnnotations, WorkerManager, WsdConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = WsdConfig::from_file("wsd.toml")?;
//!     let mut workers = WorkerManager::new(&config);
//!     workers.preload().await?;
//!
//!     let out = annotate(&config, &mut workers, &annotations, &sentences, &[]).await?;
//!     for value in out {
//!         println!("{value}");
//!     }
//!     workers.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod annot;
pub mod annotate;
pub mod config;
pub mod error;
pub mod merge;
pub mod request;
pub mod response;
pub mod workers;

// Re-export main types for convenience
pub use annot::TokenAnnotations;
pub use annotate::annotate;
pub use config::WsdConfig;
pub use error::WsdError;
pub use workers::WorkerManager;
