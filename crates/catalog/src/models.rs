//! Concrete catalog model types
//!
//! Each type composes its capabilities through a
//! [`Composition`](crate::capability::Composition) at construction, so a
//! schema missing a required trait fails here rather than on first use.

use crate::capability::{CatalogModel, Composition, HasModel};
use crate::catalog_member::{self, CatalogMember};
use crate::clipping::{self, Clipping};
use crate::group::{self, Group};
use crate::mappable::{self, Mappable, OverlaySet};
use crate::traits;
use std::any::Any;
use stratified_core::Result;
use stratified_engine::{Model, SchemaRegistry};

macro_rules! impl_has_model {
    ($ty:ty) => {
        impl HasModel for $ty {
            fn model(&self) -> &Model {
                &self.model
            }

            fn model_mut(&mut self) -> &mut Model {
                &mut self.model
            }
        }
    };
}

// =============================================================================
// PlainModel
// =============================================================================

/// Catalog member with no further capabilities
#[derive(Debug, Clone)]
pub struct PlainModel {
    model: Model,
}

impl PlainModel {
    /// Type discriminator
    pub const TYPE: &'static str = "plain";

    /// Composition used by [`PlainModel::new`]
    pub fn composition() -> Composition {
        Composition::new(Self::TYPE, traits::PLAIN_TRAITS).with(&catalog_member::CAPABILITY)
    }

    /// Construct with an empty set of strata
    pub fn new(id: &str, registry: &SchemaRegistry) -> Result<Self> {
        Ok(Self {
            model: Self::composition().build(registry, id)?,
        })
    }
}

impl_has_model!(PlainModel);

impl CatalogMember for PlainModel {}

impl CatalogModel for PlainModel {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_catalog_member(&self) -> Option<&dyn CatalogMember> {
        Some(self)
    }
}

// =============================================================================
// CatalogGroup
// =============================================================================

/// Group of catalog models
#[derive(Debug, Clone)]
pub struct CatalogGroup {
    model: Model,
}

impl CatalogGroup {
    /// Type discriminator
    pub const TYPE: &'static str = "group";

    /// Composition used by [`CatalogGroup::new`]
    pub fn composition() -> Composition {
        Composition::new(Self::TYPE, traits::CATALOG_GROUP_TRAITS)
            .with(&catalog_member::CAPABILITY)
            .with(&group::CAPABILITY)
    }

    /// Construct with no members
    pub fn new(id: &str, registry: &SchemaRegistry) -> Result<Self> {
        Ok(Self {
            model: Self::composition().build(registry, id)?,
        })
    }
}

impl_has_model!(CatalogGroup);

impl CatalogMember for CatalogGroup {}

impl Group for CatalogGroup {}

impl CatalogModel for CatalogGroup {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_catalog_member(&self) -> Option<&dyn CatalogMember> {
        Some(self)
    }

    fn as_group(&self) -> Option<&dyn Group> {
        Some(self)
    }

    fn as_group_mut(&mut self) -> Option<&mut dyn Group> {
        Some(self)
    }
}

// =============================================================================
// GeoJsonItem
// =============================================================================

/// GeoJSON layer: mappable and clippable
#[derive(Debug)]
pub struct GeoJsonItem {
    model: Model,
    overlays: OverlaySet,
}

impl GeoJsonItem {
    /// Type discriminator
    pub const TYPE: &'static str = "geojson";

    /// Composition used by [`GeoJsonItem::new`]
    pub fn composition() -> Composition {
        Composition::new(Self::TYPE, traits::GEOJSON_TRAITS)
            .with(&catalog_member::CAPABILITY)
            .with(&mappable::CAPABILITY)
            .with(&clipping::CAPABILITY)
    }

    /// Construct with no overlays attached
    pub fn new(id: &str, registry: &SchemaRegistry) -> Result<Self> {
        Ok(Self {
            model: Self::composition().build(registry, id)?,
            overlays: OverlaySet::new(),
        })
    }
}

impl_has_model!(GeoJsonItem);

impl CatalogMember for GeoJsonItem {}

impl Mappable for GeoJsonItem {
    fn overlays(&self) -> &OverlaySet {
        &self.overlays
    }

    fn overlays_mut(&mut self) -> &mut OverlaySet {
        &mut self.overlays
    }
}

impl Clipping for GeoJsonItem {}

impl CatalogModel for GeoJsonItem {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_catalog_member(&self) -> Option<&dyn CatalogMember> {
        Some(self)
    }

    fn as_mappable(&self) -> Option<&dyn Mappable> {
        Some(self)
    }

    fn as_mappable_mut(&mut self) -> Option<&mut dyn Mappable> {
        Some(self)
    }

    fn as_clipping(&self) -> Option<&dyn Clipping> {
        Some(self)
    }

    fn as_clipping_mut(&mut self) -> Option<&mut dyn Clipping> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search_provider;
    use crate::traits::register_builtin_traits;
    use stratified_core::{common, RawValue};

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        register_builtin_traits(&registry).unwrap();
        registry
    }

    #[test]
    fn test_plain_model_has_only_catalog_member() {
        let plain = PlainModel::new("p", &registry()).unwrap();
        assert!(catalog_member::is_mixed_into(&plain));
        assert!(!mappable::is_mixed_into(&plain));
        assert!(!group::is_mixed_into(&plain));
        assert!(!search_provider::is_mixed_into(&plain));
    }

    #[test]
    fn test_geojson_keeps_every_composed_marker() {
        let item = GeoJsonItem::new("g", &registry()).unwrap();
        assert!(catalog_member::is_mixed_into(&item));
        assert!(mappable::is_mixed_into(&item));
        assert!(clipping::is_mixed_into(&item));
        assert!(!group::is_mixed_into(&item));
        assert_eq!(
            GeoJsonItem::composition().markers(),
            vec!["hasCatalogMemberMixin", "hasMappableMixin", "hasClippingMixin"]
        );
    }

    #[test]
    fn test_mappable_onto_plain_traits_is_rejected() {
        let err = PlainModel::composition()
            .with(&mappable::CAPABILITY)
            .build(&registry(), "p")
            .unwrap_err();
        assert!(matches!(
            err,
            stratified_core::TraitError::MixinConstraintUnmet { capability: "Mappable", .. }
        ));
    }

    #[test]
    fn test_map_items_follow_show_and_opacity() {
        let mut item = GeoJsonItem::new("g", &registry()).unwrap();
        item.model_mut().set_trait(common::DEFINITION, "opacity", 0.5).unwrap();
        let items = item.map_items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].opacity, 0.5);
        assert_eq!(items[0].rectangle, None);

        item.model_mut().set_trait(common::USER, "show", false).unwrap();
        assert!(item.map_items().unwrap().is_empty());
    }

    #[test]
    fn test_overlays_released_on_teardown() {
        let mut item = GeoJsonItem::new("g", &registry()).unwrap();
        assert_eq!(item.sync_overlays().unwrap(), 1);
        assert_eq!(item.overlays().len(), 1);
        item.teardown();
        assert!(item.overlays().is_empty());
    }

    #[test]
    fn test_clipping_sparse_write_merges_with_definition() {
        let mut item = GeoJsonItem::new("g", &registry()).unwrap();
        item.model_mut()
            .set_trait(
                common::DEFINITION,
                "clippingBox",
                RawValue::from(serde_json::json!({
                    "clipModel": true,
                    "dimensions": {"length": 20}
                })),
            )
            .unwrap();
        item.set_clipping_enabled(common::USER, true).unwrap();
        let clip = item.clipping_box().unwrap();
        assert!(clip.is_clipping());
        assert_eq!(clip.dimensions.length, 20.0);
        assert!(item
            .set_clipping_field(common::USER, "clipDirection", RawValue::from("sideways"))
            .is_err());
    }

    #[test]
    fn test_group_members() {
        let mut group = CatalogGroup::new("grp", &registry()).unwrap();
        assert!(group.add_member(common::DEFINITION, "a").unwrap());
        assert!(group.add_member(common::USER, "b").unwrap());
        assert!(!group.add_member(common::USER, "a").unwrap());
        assert_eq!(group.member_ids().unwrap(), vec!["a", "b"]);
        assert!(group.remove_member(common::USER, "a").unwrap());
        assert_eq!(group.member_ids().unwrap(), vec!["b"]);
        assert!(!group.is_open().unwrap());
    }
}
