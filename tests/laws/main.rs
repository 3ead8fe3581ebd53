#[path = "../common/mod.rs"]
mod common;

mod cancellation;
mod catalog_flow;
mod merge;
mod mixins;
mod precedence;
mod serialization;
