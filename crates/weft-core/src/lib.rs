// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! weft-core: inbound-packet gateway for flow-based process networks.
//!
//! A component (node) in a weft network receives typed packets on named,
//! possibly addressable input ports. Before its logic runs, the surrounding
//! scheduler asks this gateway whether the node's firing preconditions hold;
//! once committed, the logic reads its input through the gateway, which
//! records activation and preserves the bracket framing that demarcates
//! sub-streams — including, on forwarding ports, capturing that framing so
//! output emission can replay it.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod context;
mod error;
mod gateway;
mod node;
mod packet;
mod port;
mod telemetry;

// Re-exports for stable public API
/// Per-invocation accumulator and bracket-context frames.
pub use context::{BracketContext, InvocationResult};
/// Gateway error taxonomy.
pub use error::GatewayError;
/// The input gateway, port requests, and the conventional default port.
pub use gateway::{InputGateway, PortRef, DEFAULT_IN_PORT};
/// Node-side state: ordering, forwarding membership, bracket stacks.
pub use node::{BracketKey, Direction, NodeState};
/// Packets and the keys that partition them.
pub use packet::{Packet, PacketKind, PortIndex, Scope};
/// Input-port buffers and the named port collection.
pub use port::{InPort, InPorts, ReceiveError};
