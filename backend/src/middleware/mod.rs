//! Actix middleware shared across the HTTP surface.

pub mod normalize;

pub use normalize::Normalize;
