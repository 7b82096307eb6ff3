//! Business logic services

pub mod quote;
pub mod risk_model;

pub use quote::QuoteService;
pub use risk_model::{ModelHandle, ModelInfo};
