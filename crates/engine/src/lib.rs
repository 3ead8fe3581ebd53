//! Schema, strata and resolution engine for stratified models
//!
//! This crate builds on the core value types:
//! - TraitDefinition: one typed property with its JSON codec and merge rule
//! - Schema / SchemaRegistry: per-class trait sets, frozen on first use
//! - Stratum: one validated layer of values
//! - Model: owned strata plus memoized effective-value resolution
//! - Serializer: partial JSON loads and schema-ordered saves
//! - EngineConfig: `stratified.toml`
//!
//! Resolution is synchronous and never suspends; it only reads strata
//! already resident in the model.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod model;
pub mod resolve;
pub mod schema;
pub mod serializer;
pub mod stratum;
pub mod trait_def;

pub use config::{EngineConfig, CONFIG_FILE_NAME};
pub use model::Model;
pub use resolve::resolve;
pub use schema::{Schema, SchemaBuilder, SchemaRegistry};
pub use serializer::{
    load_from_json, save_model_stratum, save_stratum_to_json, stratum_from_json, LoadIssue,
    LoadOptions, LoadReport, LoadedTrait,
};
pub use stratum::Stratum;
pub use trait_def::{
    json_type_name, IdProperty, MergeStrategy, ObjectArrayKind, PrimitiveType, RemovalMarker,
    TraitDefinition, TraitKind,
};

pub use stratified_core::{common, ObjectValue, RawValue, Result, TraitError};
