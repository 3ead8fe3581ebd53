//! Init load, user edits, share state and teardown through the facade

use crate::common::*;
use serde_json::json;

#[test]
fn init_edit_share_rehydrate() {
    let factory = factory();
    let mut catalog = Catalog::new();
    let report = catalog
        .load_init(&factory, &init_document(), &LoadOptions::default())
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.warning());
    assert_eq!(catalog.ids(), &["transport", "roads", "rail", "readme"]);

    {
        let roads = catalog.get_mut("roads").unwrap().model_mut();
        let stroke = RawValue::from("#000000");
        roads
            .set_object_trait(common::USER, "styles", "motorway", "stroke", stroke)
            .unwrap();
        roads.set_trait(common::USER, "opacity", 1.0).unwrap();
    }
    let shared = catalog.share_state().to_json().unwrap();

    let mut fresh = Catalog::new();
    fresh
        .load_init(&factory, &init_document(), &LoadOptions::default())
        .unwrap();
    let state = ShareState::from_json(&shared).unwrap();
    let report = fresh
        .apply_share_state(&factory, &state, &LoadOptions::default())
        .unwrap();
    assert!(report.is_clean());

    let roads = fresh.get_as::<GeoJsonItem>("roads").unwrap();
    assert_eq!(roads.opacity().unwrap(), 1.0);
    let motorway = roads.model().element("styles", "motorway").unwrap().unwrap();
    assert_eq!(motorway.get("fill"), Some(&RawValue::from("#ff0000")));
    assert_eq!(motorway.get("stroke"), Some(&RawValue::from("#000000")));
}

#[test]
fn share_state_json_shape() {
    let factory = factory();
    let mut catalog = Catalog::new();
    catalog
        .load_init(&factory, &init_document(), &LoadOptions::default())
        .unwrap();
    catalog
        .get_mut("readme")
        .unwrap()
        .model_mut()
        .set_trait(common::USER, "name", "Read me first")
        .unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&catalog.share_state().to_json().unwrap()).unwrap();
    assert_eq!(
        value,
        json!({
            "version": SHARE_STATE_VERSION,
            "models": {"readme": {"type": "plain", "user": {"name": "Read me first"}}}
        })
    );
}

#[test]
fn removing_a_mappable_model_releases_overlays() {
    let factory = factory();
    let mut catalog = Catalog::new();
    catalog
        .load_init(&factory, &init_document(), &LoadOptions::default())
        .unwrap();
    for id in ["roads", "rail"] {
        catalog
            .get_mut(id)
            .unwrap()
            .as_mappable_mut()
            .unwrap()
            .sync_overlays()
            .unwrap();
    }
    let removed = catalog.remove("roads").unwrap();
    assert!(removed.as_mappable().unwrap().overlays().is_empty());
    assert_eq!(catalog.get_as::<GeoJsonItem>("rail").unwrap().overlays().len(), 1);

    catalog.clear();
    assert!(catalog.is_empty());
}

#[test]
fn catalog_search_finds_nested_layers() {
    let factory = factory();
    let mut catalog = Catalog::new();
    catalog
        .load_init(&factory, &init_document(), &LoadOptions::default())
        .unwrap();
    let results = search_catalog(&catalog, "rail", &CancellationToken::new()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, vec!["Transport"]);
}
