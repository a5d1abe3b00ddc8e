// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The input gateway: firing preconditions and consuming reads for one
//! invocation of a component.
//!
//! Contract, in the order component logic uses it:
//! 1. The scheduler consults the precondition queries ([`has_packets`],
//!    [`has_data`], [`has_stream`]) — read-only, no side effects, `false`
//!    simply means "not yet".
//! 2. Once committed to firing, the logic reads through [`read_one`] /
//!    [`read_many`] (or the derived [`read_value`] / [`read_stream`]
//!    forms). The first read of an invocation activates it: the node's load
//!    counter increments and, on ordered nodes, the invocation result's
//!    `resolved` flag is initialised to `false`.
//! 3. For ports registered as order-forwarding, brackets consumed ahead of
//!    data are folded into the node's bracket-context stacks and snapshotted
//!    into the invocation result, so output emission can re-wrap whatever
//!    the component produces with the same sub-stream framing.
//!
//! All operations are synchronous and never block; waiting for more packets
//! is the surrounding scheduler's job.
//!
//! [`has_packets`]: InputGateway::has_packets
//! [`has_data`]: InputGateway::has_data
//! [`has_stream`]: InputGateway::has_stream
//! [`read_one`]: InputGateway::read_one
//! [`read_many`]: InputGateway::read_many
//! [`read_value`]: InputGateway::read_value
//! [`read_stream`]: InputGateway::read_stream

use crate::context::{BracketContext, InvocationResult};
use crate::error::GatewayError;
use crate::node::{BracketKey, NodeState};
use crate::packet::{Packet, PacketKind, PortIndex, Scope};
use crate::port::{InPort, InPorts};

/// Conventional default input port consulted by empty port requests.
pub const DEFAULT_IN_PORT: &str = "in";

const DEFAULT_REQUEST: &[PortRef<'static>] = &[PortRef {
    name: DEFAULT_IN_PORT,
    index: None,
}];

/// Reference to a port within a request: a plain name, or a name plus the
/// sub-channel index of an addressable port.
///
/// Requests are explicit — the gateway never guesses whether an index was
/// meant. A plain reference to an addressable port (or an indexed reference
/// to a plain one) fails with
/// [`GatewayError::AddressabilityMismatch`] before anything else happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRef<'a> {
    /// The port name.
    pub name: &'a str,
    /// The addressable sub-channel, when the port has them.
    pub index: Option<PortIndex>,
}

impl<'a> PortRef<'a> {
    /// References a plain (non-addressable) port.
    #[must_use]
    pub fn named(name: &'a str) -> Self {
        Self { name, index: None }
    }

    /// References sub-channel `index` of an addressable port.
    #[must_use]
    pub fn indexed(name: &'a str, index: PortIndex) -> Self {
        Self {
            name,
            index: Some(index),
        }
    }
}

impl<'a> From<&'a str> for PortRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::named(name)
    }
}

impl<'a> From<(&'a str, PortIndex)> for PortRef<'a> {
    fn from((name, index): (&'a str, PortIndex)) -> Self {
        Self::indexed(name, index)
    }
}

/// The read-side contract one invocation of a component holds on its node.
///
/// Constructed fresh per firing with the invocation's scope and a fresh
/// [`InvocationResult`]; the exclusive borrows guarantee no other invocation
/// can touch the same partitions while this one is executing.
#[derive(Debug)]
pub struct InputGateway<'a, P> {
    ports: &'a mut InPorts<P>,
    node: &'a mut NodeState<P>,
    result: &'a mut InvocationResult<P>,
    scope: Scope,
}

impl<'a, P> InputGateway<'a, P> {
    /// Binds a gateway to one invocation.
    pub fn new(
        ports: &'a mut InPorts<P>,
        node: &'a mut NodeState<P>,
        result: &'a mut InvocationResult<P>,
        scope: Scope,
    ) -> Self {
        Self {
            ports,
            node,
            result,
            scope,
        }
    }

    /// Returns the scope this invocation reads from.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns `true` iff every requested port buffers at least one packet
    /// matching `predicate`.
    ///
    /// Logical AND across ports, short-circuiting on the first miss;
    /// read-only — consumes nothing regardless of outcome. An empty request
    /// means the conventional `"in"` port.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UnknownPort`] for an unregistered name
    /// - [`GatewayError::AddressabilityMismatch`] when a reference's index
    ///   presence disagrees with the port
    pub fn has_packets(
        &self,
        ports: &[PortRef<'_>],
        mut predicate: impl FnMut(&Packet<P>) -> bool,
    ) -> Result<bool, GatewayError> {
        for request in Self::effective(ports) {
            let port = self.resolve(*request)?;
            if !port.has_matching(&self.scope, request.index, &mut predicate) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// [`has_packets`](Self::has_packets) with the predicate fixed to
    /// "is a data packet".
    ///
    /// # Errors
    ///
    /// As [`has_packets`](Self::has_packets).
    pub fn has_data(&self, ports: &[PortRef<'_>]) -> Result<bool, GatewayError> {
        self.has_packets(ports, Packet::is_data)
    }

    /// Returns `true` iff every requested port buffers one complete framed
    /// sub-stream (or a bare data packet, which is a valid one-element
    /// stream).
    ///
    /// The scan walks the buffered packets in order without consuming them,
    /// tracking bracket depth per port. `stream_predicate` is invoked for
    /// every data packet together with the labels of the brackets currently
    /// open around it; at depth zero its verdict alone decides, inside a
    /// frame the most recent verdict is remembered and judged when the frame
    /// closes. A frame that closes without data does not complete the
    /// stream.
    ///
    /// # Errors
    ///
    /// As [`has_packets`](Self::has_packets).
    pub fn has_stream(
        &self,
        ports: &[PortRef<'_>],
        mut stream_predicate: impl FnMut(&Packet<P>, &[Option<P>]) -> bool,
    ) -> Result<bool, GatewayError>
    where
        P: Clone,
    {
        for request in Self::effective(ports) {
            let port = self.resolve(*request)?;
            let mut depth = 0usize;
            let mut open_labels: Vec<Option<P>> = Vec::new();
            let mut frame_has_data = false;
            let mut frame_verdict = false;
            let complete = port.has_matching(&self.scope, request.index, |packet| {
                match packet.kind() {
                    PacketKind::OpenBracket => {
                        depth += 1;
                        open_labels.push(packet.label().cloned());
                        false
                    }
                    PacketKind::Data => {
                        let verdict = stream_predicate(packet, &open_labels);
                        if depth == 0 {
                            // Unbracketed data is itself a complete stream.
                            verdict
                        } else {
                            frame_has_data = true;
                            frame_verdict = verdict;
                            false
                        }
                    }
                    PacketKind::CloseBracket => {
                        depth = depth.saturating_sub(1);
                        open_labels.pop();
                        if depth == 0 {
                            let done = frame_has_data && frame_verdict;
                            frame_has_data = false;
                            frame_verdict = false;
                            done
                        } else {
                            false
                        }
                    }
                }
            });
            if !complete {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Dequeues the next packet from one port.
    ///
    /// Activates the invocation (once) even when the port turns out to be
    /// empty — the caller already committed to firing. On forwarding ports
    /// the bracket prefix is folded into the node's context stacks first;
    /// see the module docs.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UnknownPort`] /
    ///   [`GatewayError::AddressabilityMismatch`] — surfaced before any
    ///   activation or consumption
    /// - [`GatewayError::UnbalancedBracket`] when a forwarding port's close
    ///   bracket has no matching open frame
    pub fn read_one<'p>(
        &mut self,
        port: impl Into<PortRef<'p>>,
    ) -> Result<Option<Packet<P>>, GatewayError>
    where
        P: Clone,
    {
        let request = port.into();
        self.resolve(request)?;
        self.activate();
        self.consume(request)
    }

    /// Dequeues the next packet from each requested port, positionally
    /// aligned with the request.
    ///
    /// Every reference is validated before any activation or consumption, so
    /// a failed call has no side effects at all.
    ///
    /// # Errors
    ///
    /// As [`read_one`](Self::read_one).
    pub fn read_many(
        &mut self,
        ports: &[PortRef<'_>],
    ) -> Result<Vec<Option<Packet<P>>>, GatewayError>
    where
        P: Clone,
    {
        let request = Self::effective(ports);
        for r in request {
            self.resolve(*r)?;
        }
        self.activate();
        let mut packets = Vec::with_capacity(request.len());
        for r in request {
            packets.push(self.consume(*r)?);
        }
        Ok(packets)
    }

    /// Reads payload values only: brackets are discarded until a data packet
    /// arrives, `None` when the port drains first.
    ///
    /// # Errors
    ///
    /// As [`read_one`](Self::read_one).
    pub fn read_value<'p>(
        &mut self,
        port: impl Into<PortRef<'p>>,
    ) -> Result<Option<P>, GatewayError>
    where
        P: Clone,
    {
        let request = port.into();
        self.resolve(request)?;
        self.activate();
        self.value_from(request)
    }

    /// [`read_value`](Self::read_value) over several ports, positionally
    /// aligned; absent entries stay distinguishable per port.
    ///
    /// # Errors
    ///
    /// As [`read_one`](Self::read_one).
    pub fn read_values(&mut self, ports: &[PortRef<'_>]) -> Result<Vec<Option<P>>, GatewayError>
    where
        P: Clone,
    {
        let request = Self::effective(ports);
        for r in request {
            self.resolve(*r)?;
        }
        self.activate();
        let mut values = Vec::with_capacity(request.len());
        for r in request {
            values.push(self.value_from(*r)?);
        }
        Ok(values)
    }

    /// Accumulates one complete framed sub-stream from a port.
    ///
    /// A bare data packet at depth zero is a complete one-element stream. An
    /// open bracket starting a fresh outer frame discards any prior partial
    /// accumulation — the assembler favours the newest frame. Buffer
    /// exhaustion mid-stream returns the partial accumulation as-is; callers
    /// must tolerate truncated streams (upstream may simply not have
    /// produced the close yet).
    ///
    /// # Errors
    ///
    /// As [`read_one`](Self::read_one), plus
    /// [`GatewayError::UnbalancedBracket`] for a close bracket at depth
    /// zero.
    pub fn read_stream<'p>(
        &mut self,
        port: impl Into<PortRef<'p>>,
    ) -> Result<Vec<Packet<P>>, GatewayError>
    where
        P: Clone,
    {
        let request = port.into();
        self.resolve(request)?;
        self.activate();
        self.stream_from(request)
    }

    /// [`read_stream`](Self::read_stream) over several ports, positionally
    /// aligned.
    ///
    /// # Errors
    ///
    /// As [`read_stream`](Self::read_stream).
    pub fn read_streams(
        &mut self,
        ports: &[PortRef<'_>],
    ) -> Result<Vec<Vec<Packet<P>>>, GatewayError>
    where
        P: Clone,
    {
        let request = Self::effective(ports);
        for r in request {
            self.resolve(*r)?;
        }
        self.activate();
        let mut streams = Vec::with_capacity(request.len());
        for r in request {
            streams.push(self.stream_from(*r)?);
        }
        Ok(streams)
    }

    /// Returns each named port's attached sub-channel indices.
    ///
    /// Pure read: no packet consumption, no activation. An empty request
    /// means the conventional `"in"` port.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UnknownPort`] for an unregistered name
    pub fn list_attached(&self, names: &[&str]) -> Result<Vec<Vec<PortIndex>>, GatewayError> {
        let names: &[&str] = if names.is_empty() {
            &[DEFAULT_IN_PORT]
        } else {
            names
        };
        names
            .iter()
            .map(|name| self.list_attached_one(name))
            .collect()
    }

    /// Single-port form of [`list_attached`](Self::list_attached).
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UnknownPort`] for an unregistered name
    pub fn list_attached_one(&self, name: &str) -> Result<Vec<PortIndex>, GatewayError> {
        self.ports
            .get(name)
            .map(|port| port.list_attached().to_vec())
            .ok_or_else(|| self.unknown_port(name))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn effective<'r>(ports: &'r [PortRef<'r>]) -> &'r [PortRef<'r>] {
        if ports.is_empty() {
            DEFAULT_REQUEST
        } else {
            ports
        }
    }

    /// Looks up a request's port and checks that index presence matches the
    /// port's addressability.
    fn resolve(&self, request: PortRef<'_>) -> Result<&InPort<P>, GatewayError> {
        let port = self
            .ports
            .get(request.name)
            .ok_or_else(|| self.unknown_port(request.name))?;
        if port.is_addressable() != request.index.is_some() {
            return Err(GatewayError::AddressabilityMismatch {
                node: self.node.id().to_owned(),
                port: request.name.to_owned(),
                port_addressable: port.is_addressable(),
            });
        }
        Ok(port)
    }

    fn unknown_port(&self, name: &str) -> GatewayError {
        GatewayError::UnknownPort {
            node: self.node.id().to_owned(),
            port: name.to_owned(),
        }
    }

    /// Activates the invocation exactly once, no matter how many reads
    /// follow.
    fn activate(&mut self) {
        if self.result.is_activated() {
            return;
        }
        if self.node.is_ordered() {
            // Ordered components defer output release until the logic marks
            // the invocation resolved.
            self.result.defer_resolution();
        }
        self.result.mark_activated();
        self.node.activate();
    }

    fn consume(&mut self, request: PortRef<'_>) -> Result<Option<Packet<P>>, GatewayError>
    where
        P: Clone,
    {
        if self.node.is_forwarding_inport(request.name) {
            return self.forwarding_read(request);
        }
        let Some(port) = self.ports.get_mut(request.name) else {
            return Err(self.unknown_port(request.name));
        };
        Ok(port.dequeue_matching(&self.scope, request.index, |_| true))
    }

    /// Dequeues up to the next data packet, folding the bracket prefix into
    /// the node's context stack and snapshotting that stack into the
    /// invocation result.
    fn forwarding_read(&mut self, request: PortRef<'_>) -> Result<Option<Packet<P>>, GatewayError>
    where
        P: Clone,
    {
        let mut prefix: Vec<Packet<P>> = Vec::new();
        let data = {
            let Some(port) = self.ports.get_mut(request.name) else {
                return Err(self.unknown_port(request.name));
            };
            loop {
                match port.dequeue_matching(&self.scope, request.index, |_| true) {
                    None => break None,
                    Some(packet) if packet.is_data() => break Some(packet),
                    Some(bracket) => prefix.push(bracket),
                }
            }
        };

        let key = BracketKey::input(request.name, self.scope.clone(), request.index);
        let node_id = self.node.id().to_owned();
        let stack = self.node.stack_mut(key);
        for bracket in prefix {
            match bracket.kind() {
                PacketKind::CloseBracket => {
                    let Some(mut frame) = stack.pop() else {
                        #[cfg(feature = "telemetry")]
                        crate::telemetry::unbalanced(&node_id, request.name);
                        return Err(GatewayError::UnbalancedBracket {
                            node: node_id,
                            port: request.name.to_owned(),
                            scope: self.scope.clone(),
                        });
                    };
                    frame.complete(bracket);
                    self.result.push_closed_before_data(frame);
                }
                PacketKind::OpenBracket => {
                    stack.push(BracketContext::new(bracket, request.name));
                }
                PacketKind::Data => {
                    // The prefix loop above breaks on data.
                    debug_assert!(false, "data packet in bracket prefix");
                }
            }
        }
        // Snapshot (copy) the live stack: later mutation must not alter what
        // this invocation observed.
        let snapshot = stack.clone();
        self.result.set_bracket_context(request.name, snapshot);
        Ok(data)
    }

    fn value_from(&mut self, request: PortRef<'_>) -> Result<Option<P>, GatewayError>
    where
        P: Clone,
    {
        loop {
            match self.consume(request)? {
                None => return Ok(None),
                Some(packet) if packet.is_data() => return Ok(packet.into_payload()),
                // Framing is discarded here; forwarding ports never surface
                // brackets in the first place.
                Some(_) => {}
            }
        }
    }

    fn stream_from(&mut self, request: PortRef<'_>) -> Result<Vec<Packet<P>>, GatewayError>
    where
        P: Clone,
    {
        let mut items: Vec<Packet<P>> = Vec::new();
        let mut depth = 0usize;
        let mut seen_data = false;
        loop {
            let Some(packet) = self.consume(request)? else {
                // Buffer drained mid-stream: a legitimate partial result.
                return Ok(items);
            };
            match packet.kind() {
                PacketKind::OpenBracket => {
                    if depth == 0 || seen_data {
                        // A fresh outer frame begins; any prior partial
                        // accumulation is stale and the newest frame wins.
                        items.clear();
                        seen_data = false;
                        depth = 0;
                    }
                    depth += 1;
                    items.push(packet);
                }
                PacketKind::Data => {
                    seen_data = true;
                    items.push(packet);
                    if depth == 0 {
                        return Ok(items);
                    }
                }
                PacketKind::CloseBracket => {
                    if depth == 0 {
                        return Err(GatewayError::UnbalancedBracket {
                            node: self.node.id().to_owned(),
                            port: request.name.to_owned(),
                            scope: self.scope.clone(),
                        });
                    }
                    depth -= 1;
                    items.push(packet);
                    if depth == 0 && seen_data {
                        return Ok(items);
                    }
                }
            }
        }
    }
}
