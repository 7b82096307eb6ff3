//! Domain models for the BodaSafe Shield quote tool

mod features;
mod premium;
mod quote;

pub use features::*;
pub use premium::*;
pub use quote::*;
