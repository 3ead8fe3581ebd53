//! Core types for stratified trait models
//!
//! This crate defines the foundational types used throughout the system:
//! - RawValue: tagged union of the values a stratum can hold
//! - ObjectValue: field map used by object-shaped traits
//! - TraitError: error type hierarchy
//! - StratumOrder: the global precedence policy over stratum ids
//! - Limits: bounds applied to values loaded from JSON

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod strata;
pub mod value;

pub use error::{Result, TraitError};
pub use limits::{LimitError, MAX_ARRAY_SIZE, MAX_NESTING_DEPTH};
pub use strata::{common, global_order, global_order_mut, StratumBand, StratumOrder};
pub use value::{json_depth, ObjectValue, RawValue};
