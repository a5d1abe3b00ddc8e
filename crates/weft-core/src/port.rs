// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Input-port buffers: per-`(scope, index)` FIFO partitions plus attachment
//! bookkeeping.
//!
//! The port owns the actual packet queues. The gateway never reaches into a
//! queue directly; it goes through the predicate-based peek
//! ([`InPort::has_matching`]) and the head-gated destructive dequeue
//! ([`InPort::dequeue_matching`]), which together keep consumption strictly
//! FIFO per partition.

use std::collections::{BTreeMap, VecDeque};

use thiserror::Error;

use crate::packet::{Packet, PortIndex, Scope};

/// Error returned by [`InPort::receive`].
///
/// The addressability of a port is fixed at construction; a packet whose
/// index presence disagrees with it is rejected rather than coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReceiveError {
    /// The port is addressable but the packet carries no index.
    #[error("addressable port requires an indexed packet")]
    IndexRequired,
    /// The port is not addressable but the packet carries an index.
    #[error("plain port cannot accept an indexed packet")]
    IndexForbidden,
}

/// A named input port holding an unbounded FIFO queue of packets per
/// `(scope, index)` partition.
///
/// Partitions are materialised lazily on first receive and dropped again once
/// drained, so an idle scope costs nothing.
#[derive(Debug, Clone)]
pub struct InPort<P> {
    name: String,
    addressable: bool,
    buffers: BTreeMap<Scope, BTreeMap<Option<PortIndex>, VecDeque<Packet<P>>>>,
    attached: Vec<PortIndex>,
}

impl<P> InPort<P> {
    /// Creates a plain (non-addressable) port.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addressable: false,
            buffers: BTreeMap::new(),
            attached: Vec::new(),
        }
    }

    /// Creates an addressable port with numbered sub-channels.
    #[must_use]
    pub fn addressable(name: impl Into<String>) -> Self {
        Self {
            addressable: true,
            ..Self::new(name)
        }
    }

    /// Returns the port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` when the port exposes numbered sub-channels.
    pub fn is_addressable(&self) -> bool {
        self.addressable
    }

    /// Records an upstream attachment on sub-channel `index`.
    ///
    /// Attachments are kept in attach order; re-attaching an index is a
    /// no-op.
    pub fn attach(&mut self, index: PortIndex) {
        if !self.attached.contains(&index) {
            self.attached.push(index);
        }
    }

    /// Removes the attachment on sub-channel `index`, if present.
    pub fn detach(&mut self, index: PortIndex) {
        self.attached.retain(|i| *i != index);
    }

    /// Returns the attached sub-channel indices in attach order.
    pub fn list_attached(&self) -> &[PortIndex] {
        &self.attached
    }

    /// Enqueues `packet` into the partition derived from its own scope and
    /// index.
    ///
    /// # Errors
    ///
    /// - [`ReceiveError::IndexRequired`] if the port is addressable and the
    ///   packet carries no index
    /// - [`ReceiveError::IndexForbidden`] if the port is plain and the packet
    ///   carries one
    pub fn receive(&mut self, packet: Packet<P>) -> Result<(), ReceiveError> {
        match (self.addressable, packet.index()) {
            (true, None) => Err(ReceiveError::IndexRequired),
            (false, Some(_)) => Err(ReceiveError::IndexForbidden),
            _ => {
                self.buffers
                    .entry(packet.scope().clone())
                    .or_default()
                    .entry(packet.index())
                    .or_default()
                    .push_back(packet);
                Ok(())
            }
        }
    }

    /// Returns `true` if any buffered packet in the partition matches
    /// `predicate`. Packets are offered in FIFO order and never consumed.
    ///
    /// The predicate is `FnMut`, so callers may run a stateful scan over the
    /// buffer (this is how complete-stream detection works).
    pub fn has_matching(
        &self,
        scope: &Scope,
        index: Option<PortIndex>,
        mut predicate: impl FnMut(&Packet<P>) -> bool,
    ) -> bool {
        self.partition(scope, index)
            .is_some_and(|queue| queue.iter().any(|packet| predicate(packet)))
    }

    /// Dequeues the partition head if `predicate` accepts it.
    ///
    /// Consumption is strictly FIFO: only the head is ever offered, and a
    /// non-matching head dequeues nothing. Returns `None` when the partition
    /// is empty or the head does not match.
    pub fn dequeue_matching(
        &mut self,
        scope: &Scope,
        index: Option<PortIndex>,
        mut predicate: impl FnMut(&Packet<P>) -> bool,
    ) -> Option<Packet<P>> {
        let by_index = self.buffers.get_mut(scope)?;
        let queue = by_index.get_mut(&index)?;
        let head = queue.front()?;
        if !predicate(head) {
            return None;
        }
        let packet = queue.pop_front();
        // Drop drained buckets so idle partitions cost nothing.
        if queue.is_empty() {
            by_index.remove(&index);
            if by_index.is_empty() {
                self.buffers.remove(scope);
            }
        }
        packet
    }

    /// Returns the number of packets buffered in the partition.
    pub fn len(&self, scope: &Scope, index: Option<PortIndex>) -> usize {
        self.partition(scope, index).map_or(0, VecDeque::len)
    }

    /// Returns `true` when the partition holds no packets.
    pub fn is_empty(&self, scope: &Scope, index: Option<PortIndex>) -> bool {
        self.len(scope, index) == 0
    }

    fn partition(&self, scope: &Scope, index: Option<PortIndex>) -> Option<&VecDeque<Packet<P>>> {
        self.buffers.get(scope).and_then(|by_index| by_index.get(&index))
    }
}

/// Named collection of input ports for one node.
#[derive(Debug, Clone)]
pub struct InPorts<P> {
    ports: BTreeMap<String, InPort<P>>,
}

impl<P> Default for InPorts<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> InPorts<P> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: BTreeMap::new(),
        }
    }

    /// Inserts `port`, replacing any existing port of the same name.
    pub fn insert(&mut self, port: InPort<P>) {
        self.ports.insert(port.name().to_owned(), port);
    }

    /// Returns the named port, if registered.
    pub fn get(&self, name: &str) -> Option<&InPort<P>> {
        self.ports.get(name)
    }

    /// Returns the named port mutably, if registered.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut InPort<P>> {
        self.ports.get_mut(name)
    }

    /// Returns `true` when a port of that name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    /// Iterates over registered port names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ports.keys().map(String::as_str)
    }
}
