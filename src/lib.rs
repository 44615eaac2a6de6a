//! Huella - per-user behavioral biometric authentication
//!
//! Each user accumulates behavioral feature vectors (keystroke timing,
//! mouse dynamics, device signals). Every enrollment augments the user's
//! real samples into a balanced training set, trains three classifier
//! families, keeps the one with the best held-out F1, and persists it as
//! the user's single live model. Authentication scores a fresh vector
//! against that model with a strict 0.5 probability threshold.
//!
//! # Example
//!
//! ```no_run
//! use huella::config::HuellaConfig;
//! use huella::engine::Huella;
//!
//! # fn main() -> anyhow::Result<()> {
//! let engine = Huella::open(HuellaConfig::default())?;
//! let sample = vec![0.12; 27];
//! let outcome = engine.enroll("alice", &sample)?;
//! println!("selected {} (f1 {:.2})", outcome.family, outcome.f1_score);
//!
//! let decision = engine.authenticate("alice", &sample)?;
//! assert!(decision.confidence >= 0.0 && decision.confidence <= 1.0);
//! # Ok(())
//! # }
//! ```

pub mod augment;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod enrollment;
pub mod error;
pub mod features;
pub mod metrics;
pub mod output;
pub mod payload;
pub mod scorer;
pub mod selection;
pub mod store;

pub use engine::Huella;
pub use error::{HuellaError, Result};
