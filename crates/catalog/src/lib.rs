//! Capability layer and catalog for stratified models
//!
//! Capabilities add behaviour to a [`Model`](stratified_engine::Model)
//! through Rust traits that are composed onto concrete model types:
//!
//! - `CatalogMember`: name and description
//! - `Mappable`: map items and renderer overlays
//! - `Clipping`: a clipping box
//! - `Group`: ordered member ids
//! - `SearchProvider`: cancellable free-text search
//!
//! A [`ModelFactory`] builds models from their `type` discriminator, and a
//! [`Catalog`] owns them, loads init JSON and captures share state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod catalog;
pub mod catalog_member;
pub mod clipping;
pub mod factory;
pub mod group;
pub mod mappable;
pub mod models;
pub mod operation;
pub mod search;
pub mod search_provider;
pub mod share;
pub mod traits;

pub use capability::{
    Capability, CatalogModel, Composition, HasModel, RequiredKind, Requirement,
};
pub use catalog::Catalog;
pub use catalog_member::CatalogMember;
pub use clipping::{ClipDirection, Clipping, ClippingBox, Dimensions, Position, Rotation};
pub use factory::{boxed, Constructor, ModelFactory};
pub use group::Group;
pub use mappable::{MapItem, Mappable, OverlayHandle, OverlaySet, Rectangle};
pub use models::{CatalogGroup, GeoJsonItem, PlainModel};
pub use operation::{CancellationToken, OperationState, SearchResult, SearchResults, SearchSlot};
pub use search::{search_catalog, CatalogIndex, CatalogIndexSearchProvider, IndexEntry};
pub use search_provider::{run_search, SearchFuture, SearchProvider};
pub use share::{ShareState, SharedModel, SHARE_STATE_VERSION};
pub use traits::register_builtin_traits;
