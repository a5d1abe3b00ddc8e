// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

// Telemetry helpers for JSONL logging when the `telemetry` feature is enabled.
// Manually formats JSON to avoid a serde_json dependency in the core.

#[cfg(feature = "telemetry")]
fn ts_micros() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros()
}

/// Emits an activation telemetry event when an invocation first reads.
///
/// Logs the node id and its new load as a JSON line to stdout when the
/// `telemetry` feature is enabled. Best-effort: I/O errors are ignored and
/// timestamps fall back to 0 on clock errors.
#[cfg(feature = "telemetry")]
pub(crate) fn activate(node: &str, load: u64) {
    use std::io::Write as _;
    let mut out = std::io::stdout().lock();
    let _ = write!(
        out,
        r#"{{"timestamp_micros":{},"event":"activate","node":"{}","load":{}}}"#,
        ts_micros(),
        node,
        load
    );
    let _ = out.write_all(b"\n");
}

/// Emits an unbalanced-bracket telemetry event when a close arrives with no
/// matching open frame.
///
/// Logs the node and port ids as a JSON line to stdout when the `telemetry`
/// feature is enabled. Best-effort: I/O errors are ignored and timestamps
/// fall back to 0 on clock errors.
#[cfg(feature = "telemetry")]
pub(crate) fn unbalanced(node: &str, port: &str) {
    use std::io::Write as _;
    let mut out = std::io::stdout().lock();
    let _ = write!(
        out,
        r#"{{"timestamp_micros":{},"event":"unbalanced_bracket","node":"{}","port":"{}"}}"#,
        ts_micros(),
        node,
        port
    );
    let _ = out.write_all(b"\n");
}
