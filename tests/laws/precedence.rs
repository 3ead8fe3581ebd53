//! Precedence law and stratum ordering

use crate::common::*;
use proptest::prelude::*;

#[test]
fn user_beats_definition_either_write_order() {
    let mut m = layer_model("a");
    m.set_trait(common::USER, "name", "user").unwrap();
    m.set_trait(common::DEFINITION, "name", "definition").unwrap();
    assert_eq!(m.get_string("name").unwrap().as_deref(), Some("user"));

    let mut m = layer_model("b");
    m.set_trait(common::DEFINITION, "name", "definition").unwrap();
    m.set_trait(common::USER, "name", "user").unwrap();
    assert_eq!(m.get_string("name").unwrap().as_deref(), Some("user"));
}

#[test]
fn unregistered_stratum_ranks_below_defaults() {
    let mut m = layer_model("m");
    m.set_trait("zz-unregistered", "zoom", 1).unwrap();
    m.set_trait(common::DEFAULTS, "zoom", 2).unwrap();
    assert_eq!(m.get_integer("zoom").unwrap(), Some(2));
    m.clear_trait(common::DEFAULTS, "zoom").unwrap();
    assert_eq!(m.get_integer("zoom").unwrap(), Some(1));
}

#[test]
fn registering_a_load_stratum_reorders_existing_models() {
    let mut m = layer_model("m");
    m.set_trait("lawsCapabilities", "zoom", 7).unwrap();
    m.set_trait("lawsLegacyDoc", "zoom", 3).unwrap();
    // both unregistered: the lexically smaller id ranks higher
    assert_eq!(m.get_integer("zoom").unwrap(), Some(7));

    global_order_mut().add_load_stratum("lawsLegacyDoc").unwrap();
    assert_eq!(m.get_integer("zoom").unwrap(), Some(3));

    m.set_trait(common::UNDERRIDE, "zoom", 1).unwrap();
    assert_eq!(m.get_integer("zoom").unwrap(), Some(1));
}

#[test]
fn explicit_null_overrides_lower_strata() {
    let mut m = layer_model("m");
    m.set_trait(common::DEFINITION, "url", "https://example.com/a.geojson").unwrap();
    m.set_trait(common::USER, "url", ()).unwrap();
    assert_eq!(m.get_trait("url").unwrap(), Some(RawValue::Null));
    assert!(m.set_trait(common::USER, "name", ()).is_err());
}

#[test]
fn re_resolution_is_pure() {
    let mut m = layer_model("m");
    let point = RawValue::from(serde_json::json!({"a": 1, "b": 2}));
    m.set_trait(common::DEFINITION, "point", point).unwrap();
    m.set_trait(common::USER, "point", RawValue::from(serde_json::json!({"b": 3}))).unwrap();
    let first = m.get_trait("point").unwrap();
    let second = m.get_trait("point").unwrap();
    assert_eq!(first, second);
}

fn well_known() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        common::USER,
        common::OVERRIDE,
        common::DEFINITION,
        common::UNDERRIDE,
        common::DEFAULTS,
    ])
}

proptest! {
    #[test]
    fn prop_top_stratum_wins_regardless_of_write_order(
        writes in prop::collection::vec((well_known(), any::<i32>()), 1..12)
    ) {
        let mut m = layer_model("p");
        for (stratum, value) in &writes {
            m.set_trait(stratum, "zoom", *value).unwrap();
        }
        let order = global_order();
        let top = order
            .sort_top_to_bottom(writes.iter().map(|(s, _)| *s))
            .into_iter()
            .next()
            .unwrap();
        drop(order);
        let expected = writes.iter().rev().find(|(s, _)| *s == top).map(|(_, v)| *v as i64);
        prop_assert_eq!(m.get_integer("zoom").unwrap(), expected);
    }
}
