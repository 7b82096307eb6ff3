//! Shared types and models for the BodaSafe Shield quote tool
//!
//! This crate contains the pure quoting logic shared between the backend
//! server and the browser (via WASM): input validation, the rain-risk
//! trigger, the model feature vector and the premium formula.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
