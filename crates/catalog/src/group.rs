//! Group capability: an ordered list of member model ids
//!
//! Members live in the `members` string array. It merges like any
//! EnumArray (the top-most stratum's list wins), so edits read the
//! resolved list and write the whole list back to one stratum.

use crate::capability::{Capability, CatalogModel, HasModel, RequiredKind, Requirement};
use stratified_core::{RawValue, Result};
use stratified_engine::PrimitiveType;

/// Descriptor for [`Group`]
pub static CAPABILITY: Capability = Capability {
    name: "Group",
    marker: "hasGroupMixin",
    requires: &[
        Requirement {
            trait_id: "members",
            kind: RequiredKind::EnumArray(PrimitiveType::String),
        },
        Requirement {
            trait_id: "isOpen",
            kind: RequiredKind::Primitive(PrimitiveType::Boolean),
        },
    ],
};

/// A model containing other catalog models
pub trait Group: HasModel {
    /// Capability marker
    fn has_group_mixin(&self) -> bool {
        true
    }

    /// Resolved member ids
    fn member_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .model()
            .get_array("members")?
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    /// Append `id` to the members in `stratum_id`; false if already a member
    fn add_member(&mut self, stratum_id: &str, id: &str) -> Result<bool> {
        let mut members = self.member_ids()?;
        if members.iter().any(|m| m == id) {
            return Ok(false);
        }
        members.push(id.to_string());
        write_members(self.model_mut(), stratum_id, members)?;
        Ok(true)
    }

    /// Drop `id` from the members in `stratum_id`; false if not a member
    fn remove_member(&mut self, stratum_id: &str, id: &str) -> Result<bool> {
        let mut members = self.member_ids()?;
        let before = members.len();
        members.retain(|m| m != id);
        if members.len() == before {
            return Ok(false);
        }
        write_members(self.model_mut(), stratum_id, members)?;
        Ok(true)
    }

    /// Whether the group is expanded in the catalog tree
    fn is_open(&self) -> Result<bool> {
        Ok(self.model().get_bool("isOpen")?.unwrap_or(false))
    }
}

fn write_members(
    model: &mut stratified_engine::Model,
    stratum_id: &str,
    members: Vec<String>,
) -> Result<()> {
    let value = RawValue::Array(members.into_iter().map(RawValue::String).collect());
    model.set_trait(stratum_id, "members", value)
}

/// Whether `model` composes [`Group`]
pub fn is_mixed_into(model: &dyn CatalogModel) -> bool {
    model
        .as_group()
        .map(|group| group.has_group_mixin())
        .unwrap_or(false)
}
