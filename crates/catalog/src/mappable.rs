//! Mappable capability: map items derived from resolved traits
//!
//! A mappable model owns an [`OverlaySet`] of renderer handles. The
//! handles belong to the capability, not the model, and are released by
//! [`CatalogModel::teardown`](crate::CatalogModel::teardown) when the
//! model leaves the catalog.

use crate::capability::{Capability, CatalogModel, HasModel, RequiredKind, Requirement};
use std::sync::atomic::{AtomicU64, Ordering};
use stratified_core::{ObjectValue, Result};
use stratified_engine::PrimitiveType;

/// Descriptor for [`Mappable`]
pub static CAPABILITY: Capability = Capability {
    name: "Mappable",
    marker: "hasMappableMixin",
    requires: &[
        Requirement {
            trait_id: "show",
            kind: RequiredKind::Primitive(PrimitiveType::Boolean),
        },
        Requirement {
            trait_id: "opacity",
            kind: RequiredKind::Primitive(PrimitiveType::Number),
        },
        Requirement {
            trait_id: "rectangle",
            kind: RequiredKind::Object,
        },
    ],
};

/// Opacity used when no stratum sets one
pub const DEFAULT_OPACITY: f64 = 0.8;

/// Geographic extent in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Western longitude
    pub west: f64,
    /// Southern latitude
    pub south: f64,
    /// Eastern longitude
    pub east: f64,
    /// Northern latitude
    pub north: f64,
}

impl Rectangle {
    /// Build from a resolved `rectangle` object; all four edges are required
    pub fn from_object(fields: &ObjectValue) -> Option<Self> {
        let edge = |name: &str| fields.get(name).and_then(|v| v.as_number());
        Some(Self {
            west: edge("west")?,
            south: edge("south")?,
            east: edge("east")?,
            north: edge("north")?,
        })
    }
}

/// Something the map should draw for a model
#[derive(Debug, Clone, PartialEq)]
pub struct MapItem {
    /// Owning model
    pub model_id: String,
    /// Opacity in `0.0..=1.0`
    pub opacity: f64,
    /// Extent, when known
    pub rectangle: Option<Rectangle>,
}

/// Handle to one renderer overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayHandle(u64);

static NEXT_OVERLAY: AtomicU64 = AtomicU64::new(1);

/// Renderer overlays owned by a mappable model
#[derive(Debug, Default)]
pub struct OverlaySet {
    handles: Vec<OverlayHandle>,
}

impl OverlaySet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new overlay
    pub fn attach(&mut self) -> OverlayHandle {
        let handle = OverlayHandle(NEXT_OVERLAY.fetch_add(1, Ordering::Relaxed));
        self.handles.push(handle);
        handle
    }

    /// Release every overlay, returning how many were held
    pub fn release_all(&mut self) -> usize {
        let released = self.handles.len();
        self.handles.clear();
        released
    }

    /// Live overlays
    pub fn handles(&self) -> &[OverlayHandle] {
        &self.handles
    }

    /// Number of live overlays
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True when nothing is attached
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// A model that can be shown on the map
pub trait Mappable: HasModel {
    /// Capability marker
    fn has_mappable_mixin(&self) -> bool {
        true
    }

    /// Overlays owned by this model
    fn overlays(&self) -> &OverlaySet;

    /// Overlays owned by this model, mutably
    fn overlays_mut(&mut self) -> &mut OverlaySet;

    /// Resolved `show` (defaults to true)
    fn is_shown(&self) -> Result<bool> {
        Ok(self.model().get_bool("show")?.unwrap_or(true))
    }

    /// Resolved `opacity`
    fn opacity(&self) -> Result<f64> {
        Ok(self.model().get_number("opacity")?.unwrap_or(DEFAULT_OPACITY))
    }

    /// Resolved `rectangle`, when complete
    fn rectangle(&self) -> Result<Option<Rectangle>> {
        Ok(self
            .model()
            .get_object("rectangle")?
            .and_then(|fields| Rectangle::from_object(&fields)))
    }

    /// Items to draw; empty when hidden
    fn map_items(&self) -> Result<Vec<MapItem>> {
        if !self.is_shown()? {
            return Ok(Vec::new());
        }
        Ok(vec![MapItem {
            model_id: self.model().id().to_string(),
            opacity: self.opacity()?,
            rectangle: self.rectangle()?,
        }])
    }

    /// Replace the overlays with one per current map item
    fn sync_overlays(&mut self) -> Result<usize> {
        let items = self.map_items()?;
        let overlays = self.overlays_mut();
        overlays.release_all();
        for _ in &items {
            overlays.attach();
        }
        Ok(items.len())
    }

    /// Release every overlay
    fn release_overlays(&mut self) -> usize {
        self.overlays_mut().release_all()
    }
}

/// Whether `model` composes [`Mappable`]
pub fn is_mixed_into(model: &dyn CatalogModel) -> bool {
    model
        .as_mappable()
        .map(|mappable| mappable.has_mappable_mixin())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratified_core::RawValue;

    #[test]
    fn test_rectangle_requires_all_edges() {
        let mut fields = ObjectValue::new();
        fields.insert("west".into(), RawValue::Int(-10));
        fields.insert("south".into(), RawValue::Float(-5.5));
        fields.insert("east".into(), RawValue::Int(10));
        assert_eq!(Rectangle::from_object(&fields), None);
        fields.insert("north".into(), RawValue::Int(5));
        assert_eq!(
            Rectangle::from_object(&fields),
            Some(Rectangle {
                west: -10.0,
                south: -5.5,
                east: 10.0,
                north: 5.0
            })
        );
    }

    #[test]
    fn test_overlay_set_release() {
        let mut overlays = OverlaySet::new();
        let a = overlays.attach();
        let b = overlays.attach();
        assert_ne!(a, b);
        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays.release_all(), 2);
        assert!(overlays.is_empty());
    }
}
