//! HTTP request handlers

pub mod health;
pub mod page;
pub mod quote;

pub use health::health_check;
pub use page::{quote_page, submit_quote};
pub use quote::{create_quote, get_model_info};
