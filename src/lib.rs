//! Stratified - layered, schema-validated trait models
//!
//! A model's properties ("traits") are stored in named layers ("strata").
//! Reading a trait resolves it across the strata in a fixed global order:
//! primitives take the top-most value, objects merge field by field, and
//! arrays of objects merge element by element, keyed by identity.
//!
//! # Quick Start
//!
//! ```ignore
//! use stratified::{Catalog, LoadOptions, ModelFactory, SchemaRegistry, common};
//! use std::sync::Arc;
//!
//! let factory = ModelFactory::with_builtins(Arc::new(SchemaRegistry::new()))?;
//! let mut catalog = Catalog::new();
//! catalog.load_init(&factory, &init_json, &LoadOptions::default())?;
//!
//! let roads = catalog.get_mut("roads").unwrap().model_mut();
//! roads.set_trait(common::USER, "opacity", 0.5)?;
//! let shared = catalog.share_state().to_json()?;
//! ```
//!
//! # Architecture
//!
//! - `stratified-core`: values, errors and the stratum order
//! - `stratified-engine`: trait definitions, schemas, strata, resolution
//!   and JSON serialization
//! - `stratified-catalog`: capabilities, model types, the catalog, share
//!   state and search

pub use stratified_catalog::*;
pub use stratified_core::{
    common, global_order, global_order_mut, json_depth, LimitError, ObjectValue, RawValue,
    Result, StratumBand, StratumOrder, TraitError, MAX_ARRAY_SIZE, MAX_NESTING_DEPTH,
};
pub use stratified_engine::{
    load_from_json, register_traits, resolve, save_model_stratum, save_stratum_to_json,
    stratum_from_json, EngineConfig, IdProperty, LoadIssue, LoadOptions, LoadReport,
    LoadedTrait, MergeStrategy, Model, ObjectArrayKind, PrimitiveType, RemovalMarker, Schema,
    SchemaBuilder, SchemaRegistry, Stratum, TraitDefinition, TraitKind, CONFIG_FILE_NAME,
};
