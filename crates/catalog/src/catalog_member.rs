//! Catalog member capability: a name and description shown in the catalog

use crate::capability::{Capability, CatalogModel, HasModel, RequiredKind, Requirement};
use stratified_core::Result;
use stratified_engine::PrimitiveType;

/// Descriptor for [`CatalogMember`]
pub static CAPABILITY: Capability = Capability {
    name: "CatalogMember",
    marker: "hasCatalogMemberMixin",
    requires: &[
        Requirement {
            trait_id: "name",
            kind: RequiredKind::Primitive(PrimitiveType::String),
        },
        Requirement {
            trait_id: "description",
            kind: RequiredKind::Primitive(PrimitiveType::String),
        },
    ],
};

/// A model that appears in the catalog tree
pub trait CatalogMember: HasModel {
    /// Capability marker
    fn has_catalog_member_mixin(&self) -> bool {
        true
    }

    /// Resolved `name`
    fn name(&self) -> Result<Option<String>> {
        self.model().get_string("name")
    }

    /// Resolved `description`
    fn description(&self) -> Result<Option<String>> {
        self.model().get_string("description")
    }

    /// Name to display, falling back to the model id
    fn display_name(&self) -> String {
        match self.name() {
            Ok(Some(name)) if !name.is_empty() => name,
            _ => self.model().id().to_string(),
        }
    }
}

/// Whether `model` composes [`CatalogMember`]
pub fn is_mixed_into(model: &dyn CatalogModel) -> bool {
    model
        .as_catalog_member()
        .map(|member| member.has_catalog_member_mixin())
        .unwrap_or(false)
}
