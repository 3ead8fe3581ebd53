//! Partial loads, the round-trip law and config-driven load options

use crate::common::*;
use proptest::prelude::*;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn one_bad_field_does_not_lose_the_other_nine() {
    let mut m = layer_model("m");
    let report = load_from_json(
        &mut m,
        common::DEFINITION,
        &json!({
            "name": "Roads",
            "opacity": "very",
            "zoom": 4,
            "show": true,
            "url": null,
            "point": {"a": 1},
            "tags": ["a", "b"],
            "styles": [{"id": "x", "color": "red"}],
            "unknownOne": 1,
            "unknownTwo": {"deep": true}
        }),
        &LoadOptions::default(),
    )
    .unwrap();

    assert_eq!(report.loaded_count(), 7);
    assert_eq!(report.issues().len(), 1);
    assert!(matches!(
        &report.issues()[0].error,
        TraitError::SchemaViolation { trait_id, .. } if trait_id == "opacity"
    ));
    assert_eq!(m.get_string("name").unwrap().as_deref(), Some("Roads"));
    assert_eq!(m.get_number("opacity").unwrap(), None);

    let warning = report.warning().unwrap();
    assert_eq!(warning.lines().count(), 2);
    assert!(warning.contains("m: Schema violation at 'opacity'"));
}

#[test]
fn nine_valid_one_invalid() {
    let schema = {
        let mut builder = Schema::builder("TenNumbers");
        for i in 0..10 {
            let def = TraitDefinition::primitive(format!("n{}", i), PrimitiveType::Number);
            builder = builder.with(def);
        }
        builder.build()
    };
    let mut doc = serde_json::Map::new();
    for i in 0..9 {
        doc.insert(format!("n{}", i), json!(i));
    }
    doc.insert("n9".to_string(), json!("nine"));
    let (stratum, report) = stratum_from_json(
        &schema,
        common::DEFINITION,
        &serde_json::Value::Object(doc),
        &LoadOptions::default(),
    )
    .unwrap();
    assert_eq!(stratum.len(), 9);
    assert_eq!(report.loaded_count(), 9);
    assert_eq!(report.errors().count(), 1);
}

#[test]
fn strict_load_rejects_unknown_keys_before_writing() {
    let mut m = layer_model("m");
    let err = load_from_json(
        &mut m,
        common::DEFINITION,
        &json!({"name": "Roads", "colour": "red"}),
        &LoadOptions::strict(),
    )
    .unwrap_err();
    assert!(matches!(err, TraitError::UnknownProperty { ref property, .. } if property == "colour"));
    assert!(!m.has_stratum(common::DEFINITION));
}

#[test]
fn config_file_drives_load_options() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "strict_load = true\nmax_nesting_depth = 3\n").unwrap();
    let config = EngineConfig::from_file(&path).unwrap();
    let options = config.load_options();

    let mut m = layer_model("m");
    let err = load_from_json(
        &mut m,
        common::DEFINITION,
        &json!({"styles": [{"id": "x", "color": {"nested": [1]}}]}),
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, TraitError::Limit(_)));
}

fn json_value_strategy() -> impl Strategy<Value = serde_json::Value> {
    (
        proptest::option::of("[a-z ]{0,12}"),
        proptest::option::of(-1.0e6f64..1.0e6),
        proptest::option::of(any::<i32>()),
        proptest::option::of(any::<bool>()),
        proptest::option::of((any::<i16>(), any::<i16>())),
        proptest::option::of(prop::collection::vec("[a-z]{1,4}", 0..4)),
        proptest::option::of(prop::collection::btree_map(
            "[a-z]{1,3}",
            ("[a-z]{0,5}", any::<bool>()),
            0..4,
        )),
        proptest::option::of(proptest::option::of("[a-z:/.]{1,12}")),
    )
        .prop_map(|(name, opacity, zoom, show, point, tags, styles, url)| {
            let mut doc = serde_json::Map::new();
            if let Some(url) = url {
                doc.insert("url".into(), json!(url));
            }
            if let Some(name) = name {
                doc.insert("name".into(), json!(name));
            }
            if let Some(opacity) = opacity {
                doc.insert("opacity".into(), json!(opacity));
            }
            if let Some(zoom) = zoom {
                doc.insert("zoom".into(), json!(zoom));
            }
            if let Some(show) = show {
                doc.insert("show".into(), json!(show));
            }
            if let Some((a, b)) = point {
                doc.insert("point".into(), json!({"a": a, "b": b}));
            }
            if let Some(tags) = tags {
                doc.insert("tags".into(), json!(tags));
            }
            if let Some(styles) = styles {
                let elements: Vec<_> = styles
                    .into_iter()
                    .map(|(id, (color, removed))| {
                        if removed {
                            json!({"id": id, "removed": true})
                        } else {
                            json!({"id": id, "color": color})
                        }
                    })
                    .collect();
                doc.insert("styles".into(), json!(elements));
            }
            serde_json::Value::Object(doc)
        })
}

proptest! {
    #[test]
    fn prop_load_save_load_is_stable(doc in json_value_strategy()) {
        let schema = layer_schema();
        let (first, report) =
            stratum_from_json(&schema, common::USER, &doc, &LoadOptions::default()).unwrap();
        prop_assert!(report.is_clean());

        let saved = save_stratum_to_json(&schema, &first);
        let (second, report) =
            stratum_from_json(&schema, common::USER, &saved, &LoadOptions::default()).unwrap();
        prop_assert!(report.is_clean());
        prop_assert_eq!(first.values(), second.values());
    }

    #[test]
    fn prop_non_finite_opacity_is_refused_at_the_write(
        bad in prop_oneof![Just(f64::NAN), Just(f64::INFINITY), Just(f64::NEG_INFINITY)],
    ) {
        let mut m = layer_model("m");
        m.set_trait(common::USER, "opacity", 0.5).unwrap();
        let err = m.set_trait(common::USER, "opacity", bad).unwrap_err();
        prop_assert!(
            matches!(err, TraitError::SchemaViolation { ref expected, .. } if expected == "finite number"),
            "unexpected error: {:?}",
            err
        );
        prop_assert_eq!(m.get_number("opacity").unwrap(), Some(0.5));
        prop_assert_eq!(save_model_stratum(&m, common::USER), Some(json!({"opacity": 0.5})));
    }
}
