//! Stratum ids and the global stratum ordering policy
//!
//! Order is never stored on a stratum. Every model resolves its strata
//! through one process-wide [`StratumOrder`], so two models holding the
//! same stratum ids always agree on precedence.
//!
//! ## Bands (top to bottom)
//!
//! | Band | Base | Well-known ids |
//! |------|------|----------------|
//! | User | 3000 | `user` |
//! | Definition | 2000 | `override`, `definition`, `underride` |
//! | Load | 1000 | registered at runtime (e.g. server capabilities) |
//! | Default | 0 | `defaults` |
//!
//! Within a band, later registrations rank higher. Ids that were never
//! registered rank below every registered id and are ordered lexically
//! among themselves, so resolution never fails on an unfamiliar id.

use crate::error::{Result, TraitError};
use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Well-known stratum ids
pub mod common {
    /// Edits made by the user in this session; shared via share-state JSON
    pub const USER: &str = "user";
    /// Catalog-level overrides applied on top of the definition
    pub const OVERRIDE: &str = "override";
    /// Values from the catalog / init JSON
    pub const DEFINITION: &str = "definition";
    /// Values applied beneath the definition (e.g. by a parent group)
    pub const UNDERRIDE: &str = "underride";
    /// Programmatic defaults
    pub const DEFAULTS: &str = "defaults";
}

const BAND_SIZE: u32 = 1000;
const DEFAULT_BASE: u32 = 0;
const LOAD_BASE: u32 = 1000;
const DEFINITION_BASE: u32 = 2000;
const USER_BASE: u32 = 3000;

/// Priority band of a registered stratum id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StratumBand {
    /// Programmatic defaults
    Default,
    /// Values loaded from remote metadata
    Load,
    /// Catalog definitions
    Definition,
    /// User edits
    User,
}

impl StratumBand {
    fn base(self) -> u32 {
        match self {
            StratumBand::Default => DEFAULT_BASE,
            StratumBand::Load => LOAD_BASE,
            StratumBand::Definition => DEFINITION_BASE,
            StratumBand::User => USER_BASE,
        }
    }
}

/// Total order over stratum ids
#[derive(Debug, Clone)]
pub struct StratumOrder {
    priorities: HashMap<String, u32>,
    next: HashMap<u32, u32>,
    generation: u64,
}

impl Default for StratumOrder {
    fn default() -> Self {
        Self::new()
    }
}

impl StratumOrder {
    /// Create the policy with the well-known ids registered
    pub fn new() -> Self {
        let mut order = Self {
            priorities: HashMap::new(),
            next: HashMap::new(),
            generation: 0,
        };
        // Registration order inside a band sets precedence.
        let well_known = [
            (common::DEFAULTS, StratumBand::Default),
            (common::UNDERRIDE, StratumBand::Definition),
            (common::DEFINITION, StratumBand::Definition),
            (common::OVERRIDE, StratumBand::Definition),
            (common::USER, StratumBand::User),
        ];
        for (id, band) in well_known {
            order.insert(id, band);
        }
        order
    }

    /// Register `id` in `band`, ranking it above earlier ids of that band
    ///
    /// Re-registering a known id is a no-op and returns its priority.
    pub fn add(&mut self, id: &str, band: StratumBand) -> Result<u32> {
        if let Some(priority) = self.priorities.get(id) {
            return Ok(*priority);
        }
        if self.next.get(&band.base()).copied().unwrap_or(0) >= BAND_SIZE {
            return Err(TraitError::InvalidOperation(format!(
                "stratum band {:?} is full; cannot register '{}'",
                band, id
            )));
        }
        Ok(self.insert(id, band))
    }

    /// Assign `id` the next free priority of `band`; the band must have room
    fn insert(&mut self, id: &str, band: StratumBand) -> u32 {
        let base = band.base();
        let offset = self.next.entry(base).or_insert(0);
        let priority = base + *offset;
        *offset += 1;
        self.priorities.insert(id.to_string(), priority);
        self.generation += 1;
        priority
    }

    /// Register a load stratum (remote metadata)
    pub fn add_load_stratum(&mut self, id: &str) -> Result<u32> {
        self.add(id, StratumBand::Load)
    }

    /// Register a definition stratum
    pub fn add_definition_stratum(&mut self, id: &str) -> Result<u32> {
        self.add(id, StratumBand::Definition)
    }

    /// Register a user stratum
    pub fn add_user_stratum(&mut self, id: &str) -> Result<u32> {
        self.add(id, StratumBand::User)
    }

    /// Register a default stratum
    pub fn add_default_stratum(&mut self, id: &str) -> Result<u32> {
        self.add(id, StratumBand::Default)
    }

    /// Priority of a registered id (higher wins)
    pub fn priority(&self, id: &str) -> Option<u32> {
        self.priorities.get(id).copied()
    }

    /// Whether `id` has been registered
    pub fn is_known(&self, id: &str) -> bool {
        self.priorities.contains_key(id)
    }

    /// Counter bumped by every registration
    ///
    /// Caches that depend on precedence compare this to detect reordering.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Compare two ids, highest priority first
    pub fn compare_top_to_bottom(&self, a: &str, b: &str) -> Ordering {
        match (self.priority(a), self.priority(b)) {
            (Some(pa), Some(pb)) => pb.cmp(&pa),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    /// Sort ids from highest to lowest priority
    pub fn sort_top_to_bottom<'a, I>(&self, ids: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut ids: Vec<&'a str> = ids.into_iter().collect();
        ids.sort_by(|a, b| self.compare_top_to_bottom(a, b));
        ids
    }

    /// Sort ids from lowest to highest priority
    pub fn sort_bottom_to_top<'a, I>(&self, ids: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut ids = self.sort_top_to_bottom(ids);
        ids.reverse();
        ids
    }
}

// =============================================================================
// Global Stratum Order
// =============================================================================
//
// One policy per process. Uses parking_lot::RwLock so a panicking writer
// does not poison every later resolution.

static GLOBAL_ORDER: Lazy<RwLock<StratumOrder>> = Lazy::new(|| RwLock::new(StratumOrder::new()));

/// Read access to the process-wide stratum order
pub fn global_order() -> RwLockReadGuard<'static, StratumOrder> {
    GLOBAL_ORDER.read()
}

/// Write access to the process-wide stratum order
///
/// Registrations bump the generation, which invalidates every model's
/// resolution cache on its next read.
pub fn global_order_mut() -> RwLockWriteGuard<'static, StratumOrder> {
    GLOBAL_ORDER.write()
}
