//! Shared fixtures for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use serde_json::json;
use std::sync::{Arc, Once};
pub use stratified::*;

static INIT_TRACING: Once = Once::new();

/// Install a test-writer subscriber once per process
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Factory with the built-in model types over a private registry
pub fn factory() -> ModelFactory {
    init_tracing();
    ModelFactory::with_builtins(Arc::new(SchemaRegistry::new())).unwrap()
}

/// Style element schema: `id`, `color`, `removed`
pub fn style_schema() -> Arc<Schema> {
    Schema::builder("TestStyleTraits")
        .with(TraitDefinition::primitive("id", PrimitiveType::String))
        .with(TraitDefinition::primitive("color", PrimitiveType::String))
        .with(TraitDefinition::primitive("removed", PrimitiveType::Boolean))
        .build()
}

/// Schema covering every trait kind
pub fn layer_schema() -> Arc<Schema> {
    let point = Schema::builder("TestPointTraits")
        .with(TraitDefinition::primitive("a", PrimitiveType::Integer))
        .with(TraitDefinition::primitive("b", PrimitiveType::Integer))
        .build();
    Schema::builder("TestLayerTraits")
        .with(TraitDefinition::primitive("name", PrimitiveType::String))
        .with(TraitDefinition::primitive("opacity", PrimitiveType::Number))
        .with(TraitDefinition::primitive("zoom", PrimitiveType::Integer))
        .with(TraitDefinition::primitive("show", PrimitiveType::Boolean))
        .with(TraitDefinition::primitive("url", PrimitiveType::String).nullable())
        .with(TraitDefinition::object("point", point))
        .with(TraitDefinition::enum_array("tags", PrimitiveType::String))
        .with(
            TraitDefinition::object_array("styles", style_schema(), IdProperty::Key("id".into()))
                .with_removal(RemovalMarker::Flag("removed")),
        )
        .build()
}

/// Fresh model over [`layer_schema`]
pub fn layer_model(id: &str) -> Model {
    init_tracing();
    Model::new(id, "test-layer", layer_schema())
}

/// Small init document: one group holding two layers
pub fn init_document() -> serde_json::Value {
    json!({"catalog": [
        {"id": "transport", "type": "group", "name": "Transport", "members": [
            {"id": "roads", "type": "geojson", "name": "Roads", "opacity": 0.6,
             "styles": [{"id": "motorway", "fill": "#ff0000"}]},
            {"id": "rail", "type": "geojson", "name": "Railway"}
        ]},
        {"id": "readme", "type": "plain", "name": "Read me"}
    ]})
}
