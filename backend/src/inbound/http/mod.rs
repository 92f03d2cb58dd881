//! HTTP inbound adapter: handlers, envelopes and failure classification.
//!
//! Handlers return [`crate::domain::ApiResult`]. The
//! [`crate::middleware::Normalize`] middleware then wraps successful bodies
//! in a [`envelope::SuccessEnvelope`] and renders every failure through the
//! [`classifier::Classifier`].

pub mod classifier;
pub mod demo;
pub mod envelope;
pub mod error;
pub mod health;
pub mod state;

pub use classifier::{Classifier, ErrorEnvelope};
pub use envelope::SuccessEnvelope;
