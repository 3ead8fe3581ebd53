//! Object field-merge and object-array identity-merge laws

use crate::common::*;
use serde_json::json;

fn raw(value: serde_json::Value) -> RawValue {
    RawValue::from(value)
}

#[test]
fn object_fields_merge_across_strata() {
    let mut m = layer_model("m");
    m.set_trait(common::DEFINITION, "point", raw(json!({"a": 1, "b": 2}))).unwrap();
    m.set_trait(common::USER, "point", raw(json!({"b": 3}))).unwrap();
    assert_eq!(m.get_trait("point").unwrap(), Some(raw(json!({"a": 1, "b": 3}))));
}

#[test]
fn object_array_merges_by_identity_in_first_seen_order() {
    let mut m = layer_model("m");
    m.set_trait(common::DEFINITION, "styles", raw(json!([{"id": "x", "color": "red"}])))
        .unwrap();
    m.set_trait(
        common::USER,
        "styles",
        raw(json!([{"id": "x", "color": "blue"}, {"id": "y", "color": "green"}])),
    )
    .unwrap();
    assert_eq!(
        m.get_trait("styles").unwrap(),
        Some(raw(json!([{"id": "x", "color": "blue"}, {"id": "y", "color": "green"}])))
    );
}

#[test]
fn higher_stratum_order_does_not_reorder_existing_ids() {
    let mut m = layer_model("m");
    m.set_trait(
        common::DEFINITION,
        "styles",
        raw(json!([{"id": "a", "color": "red"}, {"id": "b", "color": "red"}])),
    )
    .unwrap();
    m.set_trait(
        common::USER,
        "styles",
        raw(json!([{"id": "c"}, {"id": "b", "color": "blue"}])),
    )
    .unwrap();
    assert_eq!(m.element_ids("styles").unwrap(), vec!["a", "b", "c"]);
    assert_eq!(
        m.element("styles", "b").unwrap(),
        Some(raw(json!({"id": "b", "color": "blue"})).as_object().cloned().unwrap())
    );
}

#[test]
fn sparse_element_edit_keeps_lower_fields() {
    let mut m = layer_model("m");
    m.set_trait(
        common::DEFINITION,
        "styles",
        raw(json!([{"id": "x", "color": "red", "removed": false}])),
    )
    .unwrap();
    m.set_object_trait(common::USER, "styles", "x", "color", RawValue::from("blue"))
        .unwrap();
    assert_eq!(
        m.stratum(common::USER).unwrap().get("styles"),
        Some(&raw(json!([{"id": "x", "color": "blue"}])))
    );
    assert_eq!(
        m.get_trait("styles").unwrap(),
        Some(raw(json!([{"id": "x", "color": "blue", "removed": false}])))
    );
}

#[test]
fn removal_marker_hides_lower_element_until_re_added() {
    let mut m = layer_model("m");
    m.set_trait(
        common::DEFINITION,
        "styles",
        raw(json!([{"id": "x", "color": "red"}, {"id": "y", "color": "red"}])),
    )
    .unwrap();
    assert!(m.remove_object(common::USER, "styles", "x").unwrap());
    assert_eq!(m.element_ids("styles").unwrap(), vec!["y"]);

    // re-adding in the same stratum replaces the marker, so the lower
    // element contributes again
    m.add_object(common::USER, "styles", Some("x")).unwrap();
    assert_eq!(m.element_ids("styles").unwrap(), vec!["x", "y"]);
    assert_eq!(
        m.element("styles", "x").unwrap().unwrap().get("color"),
        Some(&RawValue::from("red"))
    );
}

#[test]
fn group_members_follow_top_stratum() {
    let factory = factory();
    let mut catalog = Catalog::new();
    catalog
        .load_init(&factory, &init_document(), &LoadOptions::default())
        .unwrap();
    let group = catalog.get_mut("transport").unwrap().as_group_mut().unwrap();
    assert!(group.remove_member(common::USER, "rail").unwrap());
    assert_eq!(group.member_ids().unwrap(), vec!["roads"]);
    assert_eq!(catalog.root_ids(), vec!["transport", "rail", "readme"]);
}
