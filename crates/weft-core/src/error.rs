// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Caller-visible failure taxonomy for the input gateway.

use thiserror::Error;

use crate::packet::Scope;

/// Errors surfaced by gateway reads and precondition queries.
///
/// Every variant is a programmer or upstream-wiring defect, synchronous and
/// fatal to the current call; nothing here is retried internally. "Not yet
/// satisfied" outcomes (`false`, `None`, a partial stream) are never errors —
/// re-checking preconditions later is the scheduler's job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// A requested port name is not registered on the node.
    #[error("node {node}: no such input port: {port}")]
    UnknownPort {
        /// Identifier of the node the request was made against.
        node: String,
        /// The unregistered port name.
        port: String,
    },
    /// A plain reference was used against an addressable port, or an indexed
    /// reference against a plain one. Never silently coerced.
    #[error("node {node}: addressability mismatch on port {port} (port addressable: {port_addressable})")]
    AddressabilityMismatch {
        /// Identifier of the node the request was made against.
        node: String,
        /// The misused port name.
        port: String,
        /// Whether the port itself is addressable.
        port_addressable: bool,
    },
    /// A close bracket arrived with no matching open frame.
    ///
    /// Popping an empty bracket-context stack signals a malformed upstream
    /// packet source. Continuing would corrupt the framing of every later
    /// read on the port, so the violation is surfaced instead.
    #[error("node {node}: close bracket without matching open on port {port} (scope {scope:?})")]
    UnbalancedBracket {
        /// Identifier of the node the request was made against.
        node: String,
        /// The port whose stack was popped below empty.
        port: String,
        /// The scope partition the violation occurred in.
        scope: Scope,
    },
}
