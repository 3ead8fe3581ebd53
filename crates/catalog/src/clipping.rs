//! Clipping capability: a box that clips the model's rendered geometry
//!
//! The box lives in the `clippingBox` object trait. Its nested objects
//! (`position`, `dimensions`, `rotation`) merge field by field across
//! strata like any other object, so a user stratum can move the box
//! without restating its size.

use crate::capability::{Capability, CatalogModel, HasModel, RequiredKind, Requirement};
use stratified_core::{ObjectValue, RawValue, Result};

/// Descriptor for [`Clipping`]
pub static CAPABILITY: Capability = Capability {
    name: "Clipping",
    marker: "hasClippingMixin",
    requires: &[Requirement {
        trait_id: "clippingBox",
        kind: RequiredKind::Object,
    }],
};

/// Edge length used for unset box dimensions, in metres
pub const DEFAULT_DIMENSION: f64 = 100.0;

/// Which side of the box is clipped away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipDirection {
    /// Keep what is inside the box
    #[default]
    Inside,
    /// Keep what is outside the box
    Outside,
}

/// Box centre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Degrees
    pub longitude: f64,
    /// Degrees
    pub latitude: f64,
    /// Metres
    pub height: f64,
}

/// Box size in metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    /// Along the heading
    pub length: f64,
    /// Across the heading
    pub width: f64,
    /// Vertical
    pub height: f64,
}

/// Box orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    /// Heading
    pub heading: f64,
    /// Pitch
    pub pitch: f64,
    /// Roll
    pub roll: f64,
}

/// Resolved clipping box
#[derive(Debug, Clone, PartialEq)]
pub struct ClippingBox {
    /// Clipping feature enabled
    pub enabled: bool,
    /// Clip the model itself
    pub clip_model: bool,
    /// Side that is kept
    pub direction: ClipDirection,
    /// Draw the box outline
    pub show_box: bool,
    /// Centre; unset until the user places the box
    pub position: Option<Position>,
    /// Size
    pub dimensions: Dimensions,
    /// Orientation
    pub rotation: Rotation,
}

fn number(fields: Option<&ObjectValue>, name: &str) -> Option<f64> {
    fields?.get(name)?.as_number()
}

fn flag(fields: &ObjectValue, name: &str) -> bool {
    fields.get(name).and_then(|v| v.as_bool()).unwrap_or(false)
}

impl ClippingBox {
    /// Build from the resolved `clippingBox` object
    pub fn from_object(fields: &ObjectValue) -> Self {
        let nested = |name: &str| fields.get(name).and_then(|v| v.as_object());
        let position = nested("position");
        let dimensions = nested("dimensions");
        let rotation = nested("rotation");
        Self {
            enabled: flag(fields, "enableFeature"),
            clip_model: flag(fields, "clipModel"),
            direction: match fields.get("clipDirection").and_then(|v| v.as_str()) {
                Some("outside") => ClipDirection::Outside,
                _ => ClipDirection::Inside,
            },
            show_box: flag(fields, "showClippingBox"),
            position: match (
                number(position, "longitude"),
                number(position, "latitude"),
            ) {
                (Some(longitude), Some(latitude)) => Some(Position {
                    longitude,
                    latitude,
                    height: number(position, "height").unwrap_or(0.0),
                }),
                _ => None,
            },
            dimensions: Dimensions {
                length: number(dimensions, "length").unwrap_or(DEFAULT_DIMENSION),
                width: number(dimensions, "width").unwrap_or(DEFAULT_DIMENSION),
                height: number(dimensions, "height").unwrap_or(DEFAULT_DIMENSION),
            },
            rotation: Rotation {
                heading: number(rotation, "heading").unwrap_or(0.0),
                pitch: number(rotation, "pitch").unwrap_or(0.0),
                roll: number(rotation, "roll").unwrap_or(0.0),
            },
        }
    }

    /// True when the model geometry is actually clipped
    pub fn is_clipping(&self) -> bool {
        self.enabled && self.clip_model
    }
}

/// A model whose rendering can be clipped by a box
pub trait Clipping: HasModel {
    /// Capability marker
    fn has_clipping_mixin(&self) -> bool {
        true
    }

    /// Resolved clipping box
    fn clipping_box(&self) -> Result<ClippingBox> {
        let fields = self.model().get_object("clippingBox")?.unwrap_or_default();
        Ok(ClippingBox::from_object(&fields))
    }

    /// Set one `clippingBox` field in one stratum, leaving its other fields alone
    fn set_clipping_field(&mut self, stratum_id: &str, field: &str, value: RawValue) -> Result<()> {
        let model = self.model_mut();
        let mut own = model
            .stratum(stratum_id)
            .and_then(|s| s.get("clippingBox"))
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        own.insert(field.to_string(), value);
        model.set_trait(stratum_id, "clippingBox", RawValue::Object(own))
    }

    /// Turn the clipping feature on or off in one stratum
    fn set_clipping_enabled(&mut self, stratum_id: &str, enabled: bool) -> Result<()> {
        self.set_clipping_field(stratum_id, "enableFeature", RawValue::Bool(enabled))
    }
}

/// Whether `model` composes [`Clipping`]
pub fn is_mixed_into(model: &dyn CatalogModel) -> bool {
    model
        .as_clipping()
        .map(|clipping| clipping.has_clipping_mixin())
        .unwrap_or(false)
}
