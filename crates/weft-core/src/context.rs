// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-invocation accumulator and bracket-context frames.
//!
//! One [`InvocationResult`] is constructed fresh per firing and passed by
//! `&mut` into every gateway call for that firing. It never escapes the
//! invocation's lifetime and there is no ambient shared state: everything
//! the downstream release logic needs (ordering flag, bracket framing to
//! replay on output) accumulates here.

use std::collections::{BTreeMap, BTreeSet};

use crate::packet::Packet;

/// Stack frame recording one open bracket awaiting its close.
///
/// Pushed when an `OpenBracket` is consumed ahead of data on a forwarding
/// port; popped — and completed with the close packet — when the matching
/// `CloseBracket` is consumed. Frames are scoped per
/// `(direction, port, scope, index)`, so stacks in different scopes never
/// interact.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketContext<P> {
    open: Packet<P>,
    close: Option<Packet<P>>,
    contributing_ports: BTreeSet<String>,
    origin_port: String,
}

impl<P> BracketContext<P> {
    /// Creates a frame for `open`, originating on `origin_port`.
    #[must_use]
    pub fn new(open: Packet<P>, origin_port: impl Into<String>) -> Self {
        Self {
            open,
            close: None,
            contributing_ports: BTreeSet::new(),
            origin_port: origin_port.into(),
        }
    }

    /// Returns the bracket packet that opened this frame.
    pub fn open(&self) -> &Packet<P> {
        &self.open
    }

    /// Returns the close packet, once the frame has been popped.
    pub fn close(&self) -> Option<&Packet<P>> {
        self.close.as_ref()
    }

    /// Returns the port the open bracket arrived on.
    pub fn origin_port(&self) -> &str {
        &self.origin_port
    }

    /// Returns the set of ports that contributed output under this frame.
    pub fn contributing_ports(&self) -> &BTreeSet<String> {
        &self.contributing_ports
    }

    /// Records that `port` emitted output under this frame.
    pub fn add_contributing_port(&mut self, port: impl Into<String>) {
        self.contributing_ports.insert(port.into());
    }

    pub(crate) fn complete(&mut self, close: Packet<P>) {
        self.close = Some(close);
    }
}

/// Mutable result accumulator for one firing of a component.
///
/// `resolved` is meaningful only on ordered nodes: it starts `false` at first
/// activation and must be set by the component logic (via
/// [`InvocationResult::mark_resolved`]) before downstream release logic lets
/// the invocation's output go out in start order. Unordered nodes never read
/// it.
#[derive(Debug, Clone)]
pub struct InvocationResult<P> {
    activated: bool,
    resolved: bool,
    brackets_closed_before_data: Vec<BracketContext<P>>,
    bracket_context_by_port: BTreeMap<String, Vec<BracketContext<P>>>,
}

impl<P> Default for InvocationResult<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> InvocationResult<P> {
    /// Creates an empty accumulator for a fresh firing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            activated: false,
            resolved: false,
            brackets_closed_before_data: Vec::new(),
            bracket_context_by_port: BTreeMap::new(),
        }
    }

    /// Returns `true` once the invocation has activated (read at least once).
    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Returns whether the component logic has marked this invocation done.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Marks the invocation resolved, releasing it for ordered output.
    pub fn mark_resolved(&mut self) {
        self.resolved = true;
    }

    /// Bracket frames whose close arrived before the first data packet of
    /// this invocation, in consumption order.
    pub fn brackets_closed_before_data(&self) -> &[BracketContext<P>] {
        &self.brackets_closed_before_data
    }

    /// Snapshot of `port`'s open-bracket stack, captured when its data was
    /// read.
    pub fn bracket_context(&self, port: &str) -> Option<&[BracketContext<P>]> {
        self.bracket_context_by_port
            .get(port)
            .map(Vec::as_slice)
    }

    /// All captured per-port stack snapshots.
    pub fn bracket_context_by_port(&self) -> &BTreeMap<String, Vec<BracketContext<P>>> {
        &self.bracket_context_by_port
    }

    pub(crate) fn mark_activated(&mut self) {
        self.activated = true;
    }

    pub(crate) fn defer_resolution(&mut self) {
        self.resolved = false;
    }

    pub(crate) fn push_closed_before_data(&mut self, frame: BracketContext<P>) {
        self.brackets_closed_before_data.push(frame);
    }

    pub(crate) fn set_bracket_context(&mut self, port: &str, snapshot: Vec<BracketContext<P>>) {
        self.bracket_context_by_port
            .insert(port.to_owned(), snapshot);
    }
}
