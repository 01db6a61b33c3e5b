//! Handler store: per extension point, handlers partitioned into tiers.
//!
//! Resource-scoped points keep three tiers (global, per resource type,
//! wildcard). Unscoped points keep everything in the global tier, which is
//! then simply the registration-order list.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::definitions::{Cardinality, ExtensionPoint, PrecedenceFamily};

/// Resource type literal meaning "every resource type".
pub const WILDCARD: &str = "*";

/// Resource type literal meaning "registered without a resource type".
pub const GLOBAL: &str = "__global__";

/// Tier a handler is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKey {
    /// Registered with no resource type.
    Global,
    /// Registered for one concrete resource type.
    Resource(String),
    /// Registered for `"*"`.
    Wildcard,
}

impl ScopeKey {
    /// Maps a resource type literal to its tier; `"*"` and `"__global__"` are sentinels.
    pub fn resource(resource_type: &str) -> Self {
        match resource_type {
            WILDCARD => Self::Wildcard,
            GLOBAL => Self::Global,
            other => Self::Resource(other.to_string()),
        }
    }

    /// Maps an optional resource type to its tier, using `default` when absent.
    pub fn from_option(resource_type: Option<&str>, default: ScopeKey) -> Self {
        resource_type.map(Self::resource).unwrap_or(default)
    }

    /// Tier used when a registration for `point` names no resource type.
    pub fn default_for(point: ExtensionPoint) -> Self {
        match point.cardinality() {
            Cardinality::Scoped(PrecedenceFamily::Policy) => Self::Wildcard,
            Cardinality::Indexed => Self::Wildcard,
            Cardinality::Scoped(PrecedenceFamily::Lifecycle) | Cardinality::Unscoped => {
                Self::Global
            }
        }
    }

    /// Normalizes a tier for the point's cardinality.
    ///
    /// Unscoped points have only the flat list; policy points have no global tier.
    pub fn normalize(self, point: ExtensionPoint) -> Self {
        match (point.cardinality(), self) {
            (Cardinality::Unscoped, _) => Self::Global,
            (Cardinality::Scoped(PrecedenceFamily::Policy), Self::Global) => Self::Wildcard,
            (_, scope) => scope,
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "{GLOBAL}"),
            Self::Resource(resource_type) => write!(f, "{resource_type}"),
            Self::Wildcard => write!(f, "{WILDCARD}"),
        }
    }
}

impl From<&str> for ScopeKey {
    fn from(resource_type: &str) -> Self {
        Self::resource(resource_type)
    }
}

/// The three tiers of one extension point.
#[derive(Debug, Clone)]
pub struct TieredHandlers<H> {
    global: Vec<H>,
    specific: HashMap<String, Vec<H>>,
    wildcard: Vec<H>,
}

impl<H: Clone> TieredHandlers<H> {
    /// Creates empty tiers.
    pub fn new() -> Self {
        Self {
            global: Vec::new(),
            specific: HashMap::new(),
            wildcard: Vec::new(),
        }
    }

    /// Appends a handler to a tier.
    pub fn push(&mut self, scope: ScopeKey, handler: H) {
        match scope {
            ScopeKey::Global => self.global.push(handler),
            ScopeKey::Resource(resource_type) => {
                self.specific.entry(resource_type).or_default().push(handler);
            }
            ScopeKey::Wildcard => self.wildcard.push(handler),
        }
    }

    /// Handlers stored under one tier, in registration order.
    pub fn tier(&self, scope: &ScopeKey) -> &[H] {
        match scope {
            ScopeKey::Global => &self.global,
            ScopeKey::Resource(resource_type) => self
                .specific
                .get(resource_type)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            ScopeKey::Wildcard => &self.wildcard,
        }
    }

    /// Ordered handlers for a resource type under a precedence family.
    ///
    /// Returns a fresh vector; callers may mutate it freely.
    ///
    /// Lifecycle: global, then the type's tier, then wildcard; a sentinel
    /// query (`*` or `__global__`) has no type tier. Policy: wildcard, then
    /// the tier stored under the queried key, so `*` yields the wildcard
    /// tier twice.
    pub fn resolve(&self, family: PrecedenceFamily, resource_type: &str) -> Vec<H> {
        let queried = ScopeKey::resource(resource_type);

        let mut handlers = Vec::with_capacity(self.len() + self.wildcard.len());
        match family {
            PrecedenceFamily::Lifecycle => {
                let specific = match queried {
                    ScopeKey::Resource(_) => self.tier(&queried),
                    ScopeKey::Global | ScopeKey::Wildcard => &[],
                };
                handlers.extend_from_slice(&self.global);
                handlers.extend_from_slice(specific);
                handlers.extend_from_slice(&self.wildcard);
            }
            PrecedenceFamily::Policy => {
                handlers.extend_from_slice(&self.wildcard);
                handlers.extend_from_slice(self.tier(&queried));
            }
        }
        handlers
    }

    /// The flat list of an unscoped point.
    pub fn flat(&self) -> Vec<H> {
        self.global.clone()
    }

    /// Non-empty tiers, global first, then resource types by name, then wildcard.
    pub fn tiers(&self) -> Vec<(ScopeKey, &[H])> {
        let mut tiers = Vec::new();
        if !self.global.is_empty() {
            tiers.push((ScopeKey::Global, self.global.as_slice()));
        }
        let specific: BTreeMap<&String, &Vec<H>> = self.specific.iter().collect();
        for (resource_type, handlers) in specific {
            tiers.push((ScopeKey::Resource(resource_type.clone()), handlers.as_slice()));
        }
        if !self.wildcard.is_empty() {
            tiers.push((ScopeKey::Wildcard, self.wildcard.as_slice()));
        }
        tiers
    }

    /// Total number of handlers across all tiers.
    pub fn len(&self) -> usize {
        self.global.len() + self.wildcard.len() + self.specific.values().map(Vec::len).sum::<usize>()
    }

    /// Whether no handler is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H: Clone> Default for TieredHandlers<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handlers of every extension point.
#[derive(Debug, Clone)]
pub struct HandlerStore<H> {
    points: HashMap<ExtensionPoint, TieredHandlers<H>>,
}

impl<H: Clone> HandlerStore<H> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            points: HashMap::new(),
        }
    }

    /// Appends a handler under a point and tier, normalizing the tier first.
    ///
    /// Never deduplicates: the same handler inserted twice is stored twice.
    pub fn insert(&mut self, point: ExtensionPoint, scope: ScopeKey, handler: H) {
        let scope = scope.normalize(point);
        self.points.entry(point).or_default().push(scope, handler);
    }

    /// Ordered handlers of a point for a resource type.
    ///
    /// Unscoped points ignore the resource type. Never fails; an unknown
    /// point or type yields an empty vector.
    pub fn resolve(&self, point: ExtensionPoint, resource_type: &str) -> Vec<H> {
        let Some(tiers) = self.points.get(&point) else {
            return Vec::new();
        };
        match point.cardinality() {
            Cardinality::Scoped(family) => tiers.resolve(family, resource_type),
            Cardinality::Unscoped => tiers.flat(),
            Cardinality::Indexed => Vec::new(),
        }
    }

    /// Tiers of a point, if anything was registered for it.
    pub fn tiers(&self, point: ExtensionPoint) -> Option<&TieredHandlers<H>> {
        self.points.get(&point)
    }

    /// Number of handlers registered for a point.
    pub fn handler_count(&self, point: ExtensionPoint) -> usize {
        self.points.get(&point).map(TieredHandlers::len).unwrap_or(0)
    }

    /// Total number of handlers in the store.
    pub fn len(&self) -> usize {
        self.points.values().map(TieredHandlers::len).sum()
    }

    /// Whether the store holds no handler.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H: Clone> Default for HandlerStore<H> {
    fn default() -> Self {
        Self::new()
    }
}
