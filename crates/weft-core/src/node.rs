// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-component mutable state: activation load, ordering, forwarding ports,
//! and the bracket-context stacks.
//!
//! Stacks are keyed by the composite [`BracketKey`] so partitions in
//! different scopes, ports, or directions never interact. Spent stacks are
//! recycled through a small pool to avoid allocation churn on
//! high-frequency firings; [`NodeState::evict_scope`] returns a scope's
//! stacks to the pool once its invocation chain completes.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::context::BracketContext;
use crate::packet::{PortIndex, Scope};

/// Direction qualifier for bracket-context stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    /// Input-side stacks, owned by the gateway.
    In,
    /// Output-side stacks, owned by the emission layer.
    Out,
}

/// Composite identity of one bracket-context stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BracketKey {
    /// Which side of the component the stack belongs to.
    pub direction: Direction,
    /// The port the brackets arrived on.
    pub port: String,
    /// The scope partition the brackets belong to.
    pub scope: Scope,
    /// The addressable sub-channel, when the port has one.
    pub index: Option<PortIndex>,
}

impl BracketKey {
    /// Builds an input-side key.
    #[must_use]
    pub fn input(port: impl Into<String>, scope: Scope, index: Option<PortIndex>) -> Self {
        Self {
            direction: Direction::In,
            port: port.into(),
            scope,
            index,
        }
    }

    /// Builds an output-side key.
    #[must_use]
    pub fn output(port: impl Into<String>, scope: Scope, index: Option<PortIndex>) -> Self {
        Self {
            direction: Direction::Out,
            port: port.into(),
            scope,
            index,
        }
    }
}

/// Upper bound on recycled stacks kept around between invocations.
const STACK_POOL_LIMIT: usize = 32;

/// Per-component mutable state shared by every invocation of one node.
#[derive(Debug)]
pub struct NodeState<P> {
    id: String,
    ordered: bool,
    forwarding: BTreeSet<String>,
    load: u64,
    stacks: FxHashMap<BracketKey, Vec<BracketContext<P>>>,
    pool: Vec<Vec<BracketContext<P>>>,
}

impl<P> NodeState<P> {
    /// Creates state for node `id`: unordered, with no forwarding ports.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ordered: false,
            forwarding: BTreeSet::new(),
            load: 0,
            stacks: FxHashMap::default(),
            pool: Vec::new(),
        }
    }

    /// Returns the node identifier (used in error messages).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declares whether output must be released in invocation-start order.
    pub fn set_ordered(&mut self, ordered: bool) {
        self.ordered = ordered;
    }

    /// Returns `true` for ordered components.
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Registers `name` as an order-forwarding input port.
    pub fn mark_forwarding_inport(&mut self, name: impl Into<String>) {
        self.forwarding.insert(name.into());
    }

    /// Returns `true` when `name` is registered as order-forwarding.
    pub fn is_forwarding_inport(&self, name: &str) -> bool {
        self.forwarding.contains(name)
    }

    /// Current in-flight invocation count, as tracked by the owning runtime.
    pub fn load(&self) -> u64 {
        self.load
    }

    /// Records an invocation activation.
    pub fn activate(&mut self) {
        self.load += 1;
        #[cfg(feature = "telemetry")]
        crate::telemetry::activate(&self.id, self.load);
    }

    /// Records an invocation completing; saturates at zero.
    pub fn retire(&mut self) {
        self.load = self.load.saturating_sub(1);
    }

    /// Returns the stack for `key`, when one has been materialised.
    pub fn stack(&self, key: &BracketKey) -> Option<&[BracketContext<P>]> {
        self.stacks.get(key).map(Vec::as_slice)
    }

    /// Returns the stack for `key`, materialising it (from the pool when
    /// possible) on first use.
    pub fn stack_mut(&mut self, key: BracketKey) -> &mut Vec<BracketContext<P>> {
        self.stacks
            .entry(key)
            .or_insert_with(|| self.pool.pop().unwrap_or_default())
    }

    /// Drops every stack belonging to `scope`, recycling the backing
    /// allocations.
    ///
    /// Call this once a scope's invocation chain has completed; stale frames
    /// from an abandoned scope must not leak into a future correlation that
    /// happens to reuse the key.
    pub fn evict_scope(&mut self, scope: &Scope) {
        let spent: Vec<BracketKey> = self
            .stacks
            .keys()
            .filter(|key| key.scope == *scope)
            .cloned()
            .collect();
        for key in spent {
            if let Some(mut stack) = self.stacks.remove(&key) {
                if self.pool.len() < STACK_POOL_LIMIT {
                    stack.clear();
                    self.pool.push(stack);
                }
            }
        }
    }
}
