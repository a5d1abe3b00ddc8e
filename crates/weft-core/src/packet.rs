// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Information packets and the keys that partition them.
//!
//! A [`Packet`] is the typed unit of data flowing between components. Besides
//! plain data, packets carry the open/close bracket delimiters that frame
//! sub-streams within a port buffer. Packets are generic over the payload
//! type `P`, so hosts pick their own value representation (bytes, enums,
//! decoded trees) without the gateway caring.

/// Logical sub-channel selector for addressable ports.
pub type PortIndex = u32;

/// Correlation key partitioning one port's buffer into independent streams.
///
/// Two packets with different scopes never share a buffer partition or a
/// bracket-context stack. This is what lets several invocations of one
/// component be in flight concurrently without cross-talk: each invocation
/// only ever touches the partitions keyed to its own scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scope {
    /// The default partition, used when no correlation key is in play.
    #[default]
    Root,
    /// An isolated partition keyed by an opaque correlation id.
    Keyed(String),
}

impl Scope {
    /// Builds a keyed scope from a correlation id.
    pub fn keyed(key: impl Into<String>) -> Self {
        Self::Keyed(key.into())
    }
}

/// Three-way packet type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PacketKind {
    /// A payload-carrying packet.
    Data,
    /// Opens a sub-stream; may carry a label correlating nested frames.
    OpenBracket,
    /// Closes the innermost open sub-stream; may carry a label.
    CloseBracket,
}

/// A typed unit flowing through a port buffer.
///
/// Data packets always carry a payload; bracket packets carry an optional
/// label in the same slot. The kind/payload pairing is fixed at construction
/// and immutable afterwards — only the routing scope and addressable index
/// can be set via the builder methods before the packet is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Packet<P> {
    kind: PacketKind,
    payload: Option<P>,
    scope: Scope,
    index: Option<PortIndex>,
}

impl<P> Packet<P> {
    /// Creates a data packet carrying `payload` in the root scope.
    pub fn data(payload: P) -> Self {
        Self {
            kind: PacketKind::Data,
            payload: Some(payload),
            scope: Scope::Root,
            index: None,
        }
    }

    /// Creates an unlabelled open bracket in the root scope.
    pub fn open() -> Self {
        Self {
            kind: PacketKind::OpenBracket,
            payload: None,
            scope: Scope::Root,
            index: None,
        }
    }

    /// Creates an open bracket labelled with `label`.
    pub fn open_labelled(label: P) -> Self {
        Self {
            kind: PacketKind::OpenBracket,
            payload: Some(label),
            scope: Scope::Root,
            index: None,
        }
    }

    /// Creates an unlabelled close bracket in the root scope.
    pub fn close() -> Self {
        Self {
            kind: PacketKind::CloseBracket,
            payload: None,
            scope: Scope::Root,
            index: None,
        }
    }

    /// Creates a close bracket labelled with `label`.
    pub fn close_labelled(label: P) -> Self {
        Self {
            kind: PacketKind::CloseBracket,
            payload: Some(label),
            scope: Scope::Root,
            index: None,
        }
    }

    /// Routes the packet through `scope` instead of the root partition.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Targets sub-channel `index` of an addressable port.
    #[must_use]
    pub fn with_index(mut self, index: PortIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Returns the packet's type tag.
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Returns `true` for data packets.
    pub fn is_data(&self) -> bool {
        self.kind == PacketKind::Data
    }

    /// Returns `true` for open brackets.
    pub fn is_open(&self) -> bool {
        self.kind == PacketKind::OpenBracket
    }

    /// Returns `true` for close brackets.
    pub fn is_close(&self) -> bool {
        self.kind == PacketKind::CloseBracket
    }

    /// Returns the data payload; `None` on bracket packets.
    pub fn payload(&self) -> Option<&P> {
        match self.kind {
            PacketKind::Data => self.payload.as_ref(),
            PacketKind::OpenBracket | PacketKind::CloseBracket => None,
        }
    }

    /// Returns the bracket label; `None` on data packets and unlabelled
    /// brackets.
    pub fn label(&self) -> Option<&P> {
        match self.kind {
            PacketKind::Data => None,
            PacketKind::OpenBracket | PacketKind::CloseBracket => self.payload.as_ref(),
        }
    }

    /// Returns the routing scope.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns the addressable sub-channel, when one was set.
    pub fn index(&self) -> Option<PortIndex> {
        self.index
    }

    /// Consumes the packet and returns its data payload, if it was a data
    /// packet.
    pub fn into_payload(self) -> Option<P> {
        match self.kind {
            PacketKind::Data => self.payload,
            PacketKind::OpenBracket | PacketKind::CloseBracket => None,
        }
    }
}
