//! Capability marker scenario and construction-time requirement checks

use crate::common::*;
use stratified::{catalog_member, clipping, group, mappable, search_provider};

#[test]
fn plain_model_is_not_mappable() {
    let factory = factory();
    let plain = PlainModel::new("p", factory.registry()).unwrap();
    assert!(!mappable::is_mixed_into(&plain));
    assert!(catalog_member::is_mixed_into(&plain));
}

#[test]
fn composed_model_carries_every_marker() {
    let factory = factory();
    let item = factory.create(GeoJsonItem::TYPE, "g").unwrap();
    assert!(mappable::is_mixed_into(item.as_ref()));
    assert!(clipping::is_mixed_into(item.as_ref()));
    assert!(catalog_member::is_mixed_into(item.as_ref()));
    assert!(!group::is_mixed_into(item.as_ref()));
    assert!(!search_provider::is_mixed_into(item.as_ref()));
}

#[test]
fn unmet_requirement_fails_at_construction() {
    let factory = factory();
    let err = Composition::new("plain-on-map", "PlainTraits")
        .with(&mappable::CAPABILITY)
        .build(factory.registry(), "x")
        .unwrap_err();
    match err {
        TraitError::MixinConstraintUnmet { capability, missing, .. } => {
            assert_eq!(capability, "Mappable");
            assert_eq!(missing, vec!["show", "opacity", "rectangle"]);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn registration_after_first_model_is_rejected() {
    let factory = factory();
    factory.create(PlainModel::TYPE, "p").unwrap();
    let err = factory
        .registry()
        .register(
            "PlainTraits",
            TraitDefinition::primitive("late", PrimitiveType::String),
        )
        .unwrap_err();
    assert!(matches!(err, TraitError::SchemaFrozen { .. }));
}

#[test]
fn schema_introspection_lists_inherited_traits() {
    let factory = factory();
    let schema = factory.registry().schema("GeoJsonCatalogItemTraits").unwrap();
    let ids: Vec<_> = schema.trait_ids().collect();
    assert_eq!(
        ids,
        vec!["name", "description", "show", "opacity", "rectangle", "clippingBox", "url", "styles"]
    );
    let styles = factory.registry().lookup("GeoJsonCatalogItemTraits", "styles").unwrap();
    assert_eq!(styles.name(), "Styles");
    assert!(styles.as_object_array().is_some());
}
