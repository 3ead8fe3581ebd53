//! Built-in trait classes
//!
//! Capability classes hold the traits a capability requires; leaf
//! classes combine them (multi-parent) and add their own traits.
//!
//! | Leaf class | Parents | Own traits |
//! |------------|---------|------------|
//! | `PlainTraits` | CatalogMember | |
//! | `CatalogGroupTraits` | CatalogMember, Group | |
//! | `GeoJsonCatalogItemTraits` | CatalogMember, Mappable, Clipping | `url`, `styles` |
//! | `CatalogIndexSearchProviderTraits` | SearchProvider | `maxResults` |

use std::sync::Arc;
use stratified_core::Result;
use stratified_engine::{
    register_traits, IdProperty, MergeStrategy, PrimitiveType, RemovalMarker, Schema,
    SchemaRegistry, TraitDefinition,
};

/// Name and description
pub const CATALOG_MEMBER_TRAITS: &str = "CatalogMemberTraits";
/// Show, opacity and extent
pub const MAPPABLE_TRAITS: &str = "MappableTraits";
/// Clipping box
pub const CLIPPING_TRAITS: &str = "ClippingTraits";
/// Member list
pub const GROUP_TRAITS: &str = "GroupTraits";
/// Search provider settings
pub const SEARCH_PROVIDER_TRAITS: &str = "SearchProviderTraits";

/// Catalog member with no other capability
pub const PLAIN_TRAITS: &str = "PlainTraits";
/// Catalog group
pub const CATALOG_GROUP_TRAITS: &str = "CatalogGroupTraits";
/// GeoJSON layer
pub const GEOJSON_TRAITS: &str = "GeoJsonCatalogItemTraits";
/// Search over the catalog index
pub const CATALOG_INDEX_SEARCH_PROVIDER_TRAITS: &str = "CatalogIndexSearchProviderTraits";

fn rectangle_schema() -> Arc<Schema> {
    let edge = |id: &str, description: &str| {
        TraitDefinition::primitive(id, PrimitiveType::Number).with_description(description)
    };
    Schema::builder("RectangleTraits")
        .with(edge("west", "Western longitude in degrees"))
        .with(edge("south", "Southern latitude in degrees"))
        .with(edge("east", "Eastern longitude in degrees"))
        .with(edge("north", "Northern latitude in degrees"))
        .build()
}

fn number_triple(class: &str, ids: [&str; 3]) -> Arc<Schema> {
    ids.iter()
        .fold(Schema::builder(class), |builder, id| {
            builder.with(TraitDefinition::primitive(*id, PrimitiveType::Number))
        })
        .build()
}

fn clipping_box_schema() -> Arc<Schema> {
    let position = number_triple("PositionTraits", ["longitude", "latitude", "height"]);
    let dimensions = number_triple("DimensionsTraits", ["length", "width", "height"]);
    let rotation = number_triple("HeadingPitchRollTraits", ["heading", "pitch", "roll"]);
    Schema::builder("ClippingBoxTraits")
        .with(TraitDefinition::primitive("enableFeature", PrimitiveType::Boolean))
        .with(TraitDefinition::primitive("clipModel", PrimitiveType::Boolean))
        .with(
            TraitDefinition::primitive("clipDirection", PrimitiveType::String)
                .with_allowed_values(["inside", "outside"]),
        )
        .with(TraitDefinition::primitive("showClippingBox", PrimitiveType::Boolean))
        .with(TraitDefinition::object("position", position))
        .with(TraitDefinition::object("dimensions", dimensions))
        .with(TraitDefinition::object("rotation", rotation))
        .build()
}

fn style_schema() -> Arc<Schema> {
    Schema::builder("GeoJsonStyleTraits")
        .with(TraitDefinition::primitive("id", PrimitiveType::String))
        .with(TraitDefinition::primitive("fill", PrimitiveType::String))
        .with(TraitDefinition::primitive("stroke", PrimitiveType::String))
        .with(TraitDefinition::primitive("strokeWidth", PrimitiveType::Number))
        .with(TraitDefinition::primitive("removed", PrimitiveType::Boolean))
        .build()
}

/// Register the built-in classes into `registry`
///
/// Classes already declared are left alone, so calling this again (also
/// after an earlier call failed partway) only adds what is missing.
pub fn register_builtin_traits(registry: &SchemaRegistry) -> Result<()> {
    let missing = |class: &str| !registry.contains_class(class);

    if missing(CATALOG_MEMBER_TRAITS) {
        register_traits!(registry, CATALOG_MEMBER_TRAITS, traits: [
            TraitDefinition::primitive("name", PrimitiveType::String)
                .with_name("Name")
                .with_description("The name of the catalog item"),
            TraitDefinition::primitive("description", PrimitiveType::String)
                .with_name("Description")
                .with_description("The description of the catalog item"),
        ])?;
    }

    if missing(MAPPABLE_TRAITS) {
        register_traits!(registry, MAPPABLE_TRAITS, traits: [
            TraitDefinition::primitive("show", PrimitiveType::Boolean)
                .with_name("Show")
                .with_description("Show or hide the item on the map"),
            TraitDefinition::primitive("opacity", PrimitiveType::Number)
                .with_name("Opacity")
                .with_description("Opacity from 0.0 to 1.0"),
            TraitDefinition::object("rectangle", rectangle_schema())
                .with_name("Rectangle")
                .with_description("The bounding box of the item"),
        ])?;
    }

    if missing(CLIPPING_TRAITS) {
        register_traits!(registry, CLIPPING_TRAITS, traits: [
            TraitDefinition::object("clippingBox", clipping_box_schema())
                .with_name("Clipping box")
                .with_description("A user-positioned box that clips the model"),
        ])?;
    }

    if missing(GROUP_TRAITS) {
        register_traits!(registry, GROUP_TRAITS, traits: [
            TraitDefinition::enum_array("members", PrimitiveType::String)
                .with_name("Members")
                .with_description("Ids of the models in this group"),
            TraitDefinition::primitive("isOpen", PrimitiveType::Boolean)
                .with_name("Is open")
                .with_description("Whether the group is expanded"),
        ])?;
    }

    if missing(SEARCH_PROVIDER_TRAITS) {
        register_traits!(registry, SEARCH_PROVIDER_TRAITS, traits: [
            TraitDefinition::primitive("name", PrimitiveType::String)
                .with_name("Name")
                .with_description("Name shown above the results"),
            TraitDefinition::primitive("minCharacters", PrimitiveType::Integer)
                .with_name("Minimum characters")
                .with_description("Shortest query that triggers a search"),
        ])?;
    }

    if missing(PLAIN_TRAITS) {
        register_traits!(registry, PLAIN_TRAITS, extends: [CATALOG_MEMBER_TRAITS], traits: [])?;
    }

    if missing(CATALOG_GROUP_TRAITS) {
        register_traits!(
            registry,
            CATALOG_GROUP_TRAITS,
            extends: [CATALOG_MEMBER_TRAITS, GROUP_TRAITS],
            traits: []
        )?;
    }

    if missing(GEOJSON_TRAITS) {
        register_traits!(
            registry,
            GEOJSON_TRAITS,
            extends: [CATALOG_MEMBER_TRAITS, MAPPABLE_TRAITS, CLIPPING_TRAITS],
            traits: [
                TraitDefinition::primitive("url", PrimitiveType::String)
                    .nullable()
                    .with_name("URL")
                    .with_description("Location of the GeoJSON document"),
                TraitDefinition::object_array(
                    "styles",
                    style_schema(),
                    IdProperty::Key("id".to_string()),
                )
                .with_merge(MergeStrategy::All)
                .with_removal(RemovalMarker::Flag("removed"))
                .with_name("Styles")
                .with_description("Per-feature-class style overrides"),
            ]
        )?;
    }

    if missing(CATALOG_INDEX_SEARCH_PROVIDER_TRAITS) {
        register_traits!(
            registry,
            CATALOG_INDEX_SEARCH_PROVIDER_TRAITS,
            extends: [SEARCH_PROVIDER_TRAITS],
            traits: [
                TraitDefinition::primitive("maxResults", PrimitiveType::Integer)
                    .with_name("Maximum results")
                    .with_description("Upper bound on results returned"),
            ]
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let registry = SchemaRegistry::new();
        register_builtin_traits(&registry).unwrap();
        registry.schema(GEOJSON_TRAITS).unwrap();
        register_builtin_traits(&registry).unwrap();
    }

    #[test]
    fn test_register_completes_partial_registration() {
        let registry = SchemaRegistry::new();
        register_traits!(registry, CATALOG_MEMBER_TRAITS, traits: [
            TraitDefinition::primitive("name", PrimitiveType::String),
        ])
        .unwrap();
        registry.schema(CATALOG_MEMBER_TRAITS).unwrap();

        register_builtin_traits(&registry).unwrap();
        assert!(registry.contains_class(GEOJSON_TRAITS));
        assert!(registry.schema(PLAIN_TRAITS).unwrap().contains("name"));
        register_builtin_traits(&registry).unwrap();
    }

    #[test]
    fn test_geojson_inherits_all_parents() {
        let registry = SchemaRegistry::new();
        register_builtin_traits(&registry).unwrap();
        let schema = registry.schema(GEOJSON_TRAITS).unwrap();
        let ids: Vec<&str> = schema.trait_ids().collect();
        assert_eq!(
            ids,
            vec![
                "name",
                "description",
                "show",
                "opacity",
                "rectangle",
                "clippingBox",
                "url",
                "styles",
            ]
        );
    }

    #[test]
    fn test_lookup_walks_parents() {
        let registry = SchemaRegistry::new();
        register_builtin_traits(&registry).unwrap();
        let def = registry.lookup(CATALOG_GROUP_TRAITS, "members").unwrap();
        assert_eq!(def.name(), "Members");
    }
}
