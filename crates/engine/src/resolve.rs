//! Effective-value resolution
//!
//! Pure functions from a trait definition and the values each stratum
//! holds for it (highest priority first) to the effective value. Nothing
//! here touches a model, a lock or the global order; [`crate::Model`]
//! sorts its strata and memoizes the result.
//!
//! ## Rules
//!
//! - Primitive, EnumArray: the top-most value wins.
//! - Object: fields are resolved one by one, each with its own kind's
//!   rule, so lower strata still contribute fields a higher one left out.
//! - ObjectArray: elements are matched by id and merged like objects.
//!   Output order is first-seen, walking strata bottom to top.
//! - An explicit `null` on an Object or ObjectArray hides every stratum
//!   below it.

use crate::schema::Schema;
use crate::trait_def::{MergeStrategy, ObjectArrayKind, TraitDefinition, TraitKind};
use std::collections::HashSet;
use stratified_core::{ObjectValue, RawValue};

/// Resolve one trait from its per-stratum values, top-most first
///
/// Returns `None` when no layer holds a value.
pub fn resolve(def: &TraitDefinition, layers: &[&RawValue]) -> Option<RawValue> {
    match def.kind() {
        TraitKind::Primitive(_) | TraitKind::EnumArray(_) => layers.first().map(|v| (*v).clone()),
        TraitKind::Object(schema) => resolve_object(schema, layers),
        TraitKind::ObjectArray(kind) => resolve_object_array(kind, layers),
    }
}

/// Layers above the top-most explicit null
///
/// `None` means the top-most layer itself is null.
fn above_null<'a, 'v>(layers: &'a [&'v RawValue]) -> Option<&'a [&'v RawValue]> {
    match layers.iter().position(|v| v.is_null()) {
        Some(0) => None,
        Some(end) => Some(&layers[..end]),
        None => Some(layers),
    }
}

fn resolve_object(schema: &Schema, layers: &[&RawValue]) -> Option<RawValue> {
    if layers.is_empty() {
        return None;
    }
    let Some(layers) = above_null(layers) else {
        return Some(RawValue::Null);
    };
    let objects: Vec<&ObjectValue> = layers.iter().filter_map(|v| v.as_object()).collect();
    Some(RawValue::Object(merge_fields(schema, &objects)))
}

/// Merge object layers (top-most first) field by field
pub(crate) fn merge_fields(schema: &Schema, objects: &[&ObjectValue]) -> ObjectValue {
    let mut merged = ObjectValue::new();
    for def in schema.iter() {
        let field_layers: Vec<&RawValue> = objects.iter().filter_map(|o| o.get(def.id())).collect();
        if let Some(value) = resolve(def, &field_layers) {
            merged.insert(def.id().to_string(), value);
        }
    }
    merged
}

fn resolve_object_array(kind: &ObjectArrayKind, layers: &[&RawValue]) -> Option<RawValue> {
    if layers.is_empty() {
        return None;
    }
    let Some(layers) = above_null(layers) else {
        return Some(RawValue::Null);
    };

    // (id, element) per layer, top-most layer first
    let keyed: Vec<Vec<(String, &RawValue)>> = layers
        .iter()
        .filter_map(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| kind.element_id(item, i).map(|id| (id, item)))
                .collect()
        })
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for layer in keyed.iter().rev() {
        for (id, item) in layer {
            if !kind.is_removal(item) && seen.insert(id.as_str()) {
                order.push(id.as_str());
            }
        }
    }

    let top_ids: Option<HashSet<&str>> = match kind.merge {
        MergeStrategy::TopStratum => Some(
            keyed
                .first()
                .map(|layer| {
                    layer
                        .iter()
                        .filter(|(_, item)| !kind.is_removal(item))
                        .map(|(id, _)| id.as_str())
                        .collect()
                })
                .unwrap_or_default(),
        ),
        _ => None,
    };

    let mut resolved = Vec::with_capacity(order.len());
    for id in order {
        if let Some(top) = &top_ids {
            if !top.contains(id) {
                continue;
            }
        }
        let occurrences = element_layers(kind, &keyed, id);
        let Some(first) = occurrences.first() else {
            continue;
        };
        let element = match kind.merge {
            MergeStrategy::None => (*first).clone(),
            _ => merge_fields(&kind.schema, &occurrences),
        };
        resolved.push(RawValue::Object(element));
    }
    Some(RawValue::Array(resolved))
}

/// Occurrences of `id`, top-most first, up to the first removal element
///
/// Empty when the top-most occurrence is itself a removal.
fn element_layers<'v>(
    kind: &ObjectArrayKind,
    keyed: &[Vec<(String, &'v RawValue)>],
    id: &str,
) -> Vec<&'v ObjectValue> {
    let mut occurrences = Vec::new();
    for layer in keyed {
        for (element_id, item) in layer {
            if element_id != id {
                continue;
            }
            if kind.is_removal(item) {
                return occurrences;
            }
            if let Some(fields) = item.as_object() {
                occurrences.push(fields);
            }
        }
    }
    occurrences
}
