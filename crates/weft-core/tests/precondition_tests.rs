// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Precondition evaluator tests: purity, AND semantics, complete-stream
//! detection.

#![allow(missing_docs)]

use weft_core::{
    GatewayError, InPort, InPorts, InputGateway, InvocationResult, NodeState, Packet, PortRef,
    Scope,
};

fn single_port_rig() -> (InPorts<&'static str>, NodeState<&'static str>) {
    let mut ports = InPorts::new();
    ports.insert(InPort::new("in"));
    (ports, NodeState::new("test/node"))
}

#[test]
fn empty_request_means_the_conventional_in_port() {
    let (mut ports, mut node) = single_port_rig();
    ports
        .get_mut("in")
        .expect("port registered")
        .receive(Packet::data("x"))
        .expect("receive");
    let mut result = InvocationResult::new();
    let gateway = InputGateway::new(&mut ports, &mut node, &mut result, Scope::Root);

    assert_eq!(gateway.has_packets(&[], |_| true), Ok(true));
    assert_eq!(gateway.has_data(&[]), Ok(true));
}

#[test]
fn precondition_checks_never_consume() {
    let (mut ports, mut node) = single_port_rig();
    ports
        .get_mut("in")
        .expect("port registered")
        .receive(Packet::data("only"))
        .expect("receive");
    let mut result = InvocationResult::new();
    let mut gateway = InputGateway::new(&mut ports, &mut node, &mut result, Scope::Root);

    // Any number of checks, in any mix, leave the buffer untouched.
    for _ in 0..3 {
        assert_eq!(gateway.has_packets(&[], |_| true), Ok(true));
        assert_eq!(gateway.has_data(&[]), Ok(true));
        assert_eq!(gateway.has_stream(&[], |_, _| true), Ok(true));
    }

    let packet = gateway.read_one("in").expect("read");
    assert_eq!(packet.as_ref().and_then(|p| p.payload()), Some(&"only"));
}

#[test]
fn has_packets_is_the_and_across_ports() {
    let mut ports = InPorts::new();
    ports.insert(InPort::new("a"));
    ports.insert(InPort::new("b"));
    ports
        .get_mut("a")
        .expect("port registered")
        .receive(Packet::data("x"))
        .expect("receive");
    let mut node: NodeState<&str> = NodeState::new("test/node");
    let mut result = InvocationResult::new();
    let gateway = InputGateway::new(&mut ports, &mut node, &mut result, Scope::Root);

    let a = [PortRef::named("a")];
    let b = [PortRef::named("b")];
    let both = [PortRef::named("a"), PortRef::named("b")];
    assert_eq!(gateway.has_packets(&a, |_| true), Ok(true));
    assert_eq!(gateway.has_packets(&b, |_| true), Ok(false));
    assert_eq!(gateway.has_packets(&both, |_| true), Ok(false));
}

#[test]
fn has_data_ignores_bare_brackets() {
    let (mut ports, mut node) = single_port_rig();
    {
        let port = ports.get_mut("in").expect("port registered");
        port.receive(Packet::open()).expect("receive");
        port.receive(Packet::close()).expect("receive");
    }
    let mut result = InvocationResult::new();
    let gateway = InputGateway::new(&mut ports, &mut node, &mut result, Scope::Root);

    assert_eq!(gateway.has_packets(&[], |_| true), Ok(true));
    assert_eq!(gateway.has_data(&[]), Ok(false));
}

#[test]
fn complete_stream_appears_only_once_fully_buffered() {
    let (mut ports, mut node) = single_port_rig();

    // Feed [open, data, data, close] one packet at a time; completeness
    // flips only on the final close.
    let sequence = [
        Packet::open_labelled("frame"),
        Packet::data("one"),
        Packet::data("two"),
        Packet::close_labelled("frame"),
    ];
    for (i, packet) in sequence.into_iter().enumerate() {
        ports
            .get_mut("in")
            .expect("port registered")
            .receive(packet)
            .expect("receive");
        let mut result = InvocationResult::new();
        let gateway = InputGateway::new(&mut ports, &mut node, &mut result, Scope::Root);
        let expected = i == 3;
        assert_eq!(gateway.has_stream(&[], |_, _| true), Ok(expected));
    }
}

#[test]
fn bare_data_is_a_complete_stream() {
    let (mut ports, mut node) = single_port_rig();
    ports
        .get_mut("in")
        .expect("port registered")
        .receive(Packet::data("solo"))
        .expect("receive");
    let mut result = InvocationResult::new();
    let gateway = InputGateway::new(&mut ports, &mut node, &mut result, Scope::Root);

    assert_eq!(gateway.has_stream(&[], |_, _| true), Ok(true));
}

#[test]
fn stream_predicate_sees_the_open_labels() {
    let (mut ports, mut node) = single_port_rig();
    {
        let port = ports.get_mut("in").expect("port registered");
        port.receive(Packet::open_labelled("outer")).expect("receive");
        port.receive(Packet::open()).expect("receive");
        port.receive(Packet::data("x")).expect("receive");
        port.receive(Packet::close()).expect("receive");
        port.receive(Packet::close_labelled("outer")).expect("receive");
    }
    let mut result = InvocationResult::new();
    let gateway = InputGateway::new(&mut ports, &mut node, &mut result, Scope::Root);

    let mut observed: Vec<Vec<Option<&str>>> = Vec::new();
    let complete = gateway.has_stream(&[], |_, labels| {
        observed.push(labels.to_vec());
        true
    });
    assert_eq!(complete, Ok(true));
    assert_eq!(observed, vec![vec![Some("outer"), None]]);
}

#[test]
fn rejected_stream_predicate_blocks_completion() {
    let (mut ports, mut node) = single_port_rig();
    {
        let port = ports.get_mut("in").expect("port registered");
        port.receive(Packet::open()).expect("receive");
        port.receive(Packet::data("bad")).expect("receive");
        port.receive(Packet::close()).expect("receive");
    }
    let mut result = InvocationResult::new();
    let gateway = InputGateway::new(&mut ports, &mut node, &mut result, Scope::Root);

    assert_eq!(gateway.has_stream(&[], |_, _| false), Ok(false));
    assert_eq!(
        gateway.has_stream(&[], |packet, _| packet.payload() != Some(&"bad")),
        Ok(false)
    );
}

#[test]
fn empty_frames_do_not_complete_a_stream() {
    let (mut ports, mut node) = single_port_rig();
    {
        let port = ports.get_mut("in").expect("port registered");
        port.receive(Packet::open()).expect("receive");
        port.receive(Packet::close()).expect("receive");
    }
    let mut result = InvocationResult::new();
    let gateway = InputGateway::new(&mut ports, &mut node, &mut result, Scope::Root);

    assert_eq!(gateway.has_stream(&[], |_, _| true), Ok(false));
}

#[test]
fn unknown_port_is_an_error_not_a_false() {
    let (mut ports, mut node) = single_port_rig();
    let mut result = InvocationResult::new();
    let gateway = InputGateway::new(&mut ports, &mut node, &mut result, Scope::Root);

    let missing = [PortRef::named("sideband")];
    assert_eq!(
        gateway.has_packets(&missing, |_| true),
        Err(GatewayError::UnknownPort {
            node: "test/node".to_owned(),
            port: "sideband".to_owned(),
        })
    );
}

#[test]
fn addressability_mismatch_fails_preconditions_immediately() {
    let mut ports = InPorts::new();
    ports.insert(InPort::addressable("fan"));
    let mut node: NodeState<&str> = NodeState::new("test/node");
    let mut result = InvocationResult::new();
    let gateway = InputGateway::new(&mut ports, &mut node, &mut result, Scope::Root);

    let plain = [PortRef::named("fan")];
    assert_eq!(
        gateway.has_packets(&plain, |_| true),
        Err(GatewayError::AddressabilityMismatch {
            node: "test/node".to_owned(),
            port: "fan".to_owned(),
            port_addressable: true,
        })
    );
}
